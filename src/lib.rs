//! EduCenter - REST backend for an education center directory
//!
//! This library provides the core functionality: configuration, storage,
//! domain services and the HTTP API.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
