//! Request extractors
//!
//! - [`ValidatedJson`]: JSON body deserialized and checked with `validator`
//! - [`ValidQuery`]: query string whose rejections become `VALIDATION_ERROR`
//! - [`ClientMeta`]: client IP and parsed `User-Agent`

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, FromRequest, FromRequestParts, Query, Request},
    http::{header, request::Parts, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;
use std::net::{IpAddr, SocketAddr};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::api::middleware::{ApiError, AppState};
use crate::models::DeviceInfo;
use crate::services::{parse_user_agent, ClientInfo};

/// JSON body that has passed its `#[validate]` rules.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation_error(e.body_text()))?;

        value.validate().map_err(validation_failure)?;

        Ok(ValidatedJson(value))
    }
}

/// Query string parameters; malformed values are a 400, not axum's plain text.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::validation_error(e.body_text()))?;

        Ok(ValidQuery(value))
    }
}

/// Turn `validator` errors into a `VALIDATION_ERROR` with per-field messages
pub fn validation_failure(errors: ValidationErrors) -> ApiError {
    let mut fields = serde_json::Map::new();
    let mut summary = Vec::new();

    let mut field_errors: Vec<_> = errors.field_errors().into_iter().collect();
    field_errors.sort_by_key(|(field, _)| *field);

    for (field, errs) in field_errors {
        let messages: Vec<String> = errs.iter().map(|e| describe(field, e)).collect();
        summary.extend(messages.iter().cloned());
        fields.insert(field.to_string(), serde_json::json!(messages));
    }

    ApiError::with_details(
        "VALIDATION_ERROR",
        summary.join(", "),
        serde_json::Value::Object(fields),
    )
}

fn describe(field: &str, error: &ValidationError) -> String {
    error
        .message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| format!("{} is invalid", field))
}

/// Where the request came from, for sessions and rate limiting.
#[derive(Debug, Clone)]
pub struct ClientMeta {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    pub fn ip_string(&self) -> String {
        self.ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn device(&self) -> DeviceInfo {
        parse_user_agent(self.user_agent.as_deref())
    }

    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            ip: self.ip_string(),
            device: self.device(),
        }
    }
}

impl ClientMeta {
    /// Read the client address from the socket peer, or from the proxy
    /// headers when the server sits behind a trusted reverse proxy.
    pub fn from_parts(parts: &Parts, trust_proxy: bool) -> Self {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let ip = if trust_proxy {
            forwarded_ip(&parts.headers).or(peer)
        } else {
            peer
        };

        ClientMeta {
            ip,
            user_agent: parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|h| h.to_str().ok())
                .map(String::from),
        }
    }
}

impl FromRequestParts<AppState> for ClientMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta::from_parts(parts, state.trust_proxy))
    }
}

/// First address of `X-Forwarded-For`, else `X-Real-IP`
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
        })
}
