#[cfg(any(test, feature = "test-support"))]
use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DashboardUid(pub String);

impl DashboardUid {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DashboardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The slice of dashboard metadata the sharing flows need.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dashboard {
    pub uid: DashboardUid,
    pub title: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DashboardError {
    #[error("dashboard `{0}` not found")]
    NotFound(String),
    #[error("dashboard lookup unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn get_dashboard(&self, uid: &DashboardUid) -> Result<Dashboard, DashboardError>;
}

/// Dashboard lookup backed by a map, for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Debug, Default)]
pub struct InMemoryDashboardService {
    dashboards: HashMap<DashboardUid, Dashboard>,
    outage: Option<String>,
}

#[cfg(any(test, feature = "test-support"))]
impl InMemoryDashboardService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dashboard(mut self, uid: impl Into<String>, title: impl Into<String>) -> Self {
        let uid = DashboardUid::new(uid);
        self.dashboards.insert(uid.clone(), Dashboard { uid, title: title.into() });
        self
    }

    /// Every lookup fails with `DashboardError::Unavailable`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { dashboards: HashMap::new(), outage: Some(reason.into()) }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl DashboardService for InMemoryDashboardService {
    async fn get_dashboard(&self, uid: &DashboardUid) -> Result<Dashboard, DashboardError> {
        if let Some(reason) = &self.outage {
            return Err(DashboardError::Unavailable(reason.clone()));
        }

        self.dashboards.get(uid).cloned().ok_or_else(|| DashboardError::NotFound(uid.to_string()))
    }
}
