//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signed-in device. Tokens carry the session id, so deleting the row
/// revokes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (uuid)
    pub id: String,
    pub user_id: i64,
    /// Client IP the session was opened from
    pub ip: String,
    pub device: DeviceInfo,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Device details parsed from the `User-Agent` header, stored as JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub browser: String,
    pub os: String,
    pub device_type: String,
    #[serde(default)]
    pub user_agent: String,
}

/// A session as shown to its owner
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    /// Whether the request was made with this session
    pub current: bool,
}
