//! Region service

use crate::db::repositories::RegionRepository;
use crate::models::{ListParams, PagedResult, Region, RegionSort};
use crate::services::error::{check_length, ServiceError, ServiceResult};
use anyhow::Context;
use std::sync::Arc;

pub struct RegionService {
    repo: Arc<dyn RegionRepository>,
}

impl RegionService {
    pub fn new(repo: Arc<dyn RegionRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, name: &str) -> ServiceResult<Region> {
        let name = check_length("name", name, 2, 55)?;

        self.repo
            .create(&name)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Region '{}' already exists", name)))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Region> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get region")?
            .ok_or_else(|| ServiceError::not_found("Region", id))
    }

    pub async fn update(&self, id: i64, name: &str) -> ServiceResult<Region> {
        let name = check_length("name", name, 2, 55)?;
        self.get(id).await?;

        self.repo
            .update(id, &name)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("Region '{}' already exists", name)))
    }

    /// Delete a region nothing refers to
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.get(id).await?;

        let references = self
            .repo
            .count_references(id)
            .await
            .context("Failed to count region references")?;
        if references > 0 {
            return Err(ServiceError::Conflict(format!(
                "Region {} is still used by {} education center(s) or branch(es)",
                id, references
            )));
        }

        self.repo
            .delete(id)
            .await
            .map_err(|e| ServiceError::from_write(e, "Region is still in use"))
    }

    pub async fn list(&self, params: &ListParams<RegionSort>) -> ServiceResult<PagedResult<Region>> {
        let (regions, total) = self.repo.list(params).await.context("Failed to list regions")?;
        Ok(PagedResult::new(regions, total, params))
    }
}
