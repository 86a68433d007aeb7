//! Startup configuration and storage mode detection.

use serde::{Deserialize, Serialize};
use shared::DEFAULT_COST;

use crate::error::CalendarError;

/// Query parameter naming the service being edited
pub const SERVICE_ID_PARAM: &str = "service_id";
/// Short alias accepted for [`SERVICE_ID_PARAM`]
pub const ID_PARAM: &str = "id";
/// Remote table holding one row per priced date
pub const DEFAULT_PERIODS_TABLE: &str = "available_periods";

/// Where the price table lives; decided once at startup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StorageMode {
    /// Creation flow: every month is kept in browser key-value storage
    #[default]
    Local,
    /// Edit flow: rows of the remote periods table for one service
    #[serde(rename_all = "camelCase")]
    Remote { service_id: String },
}

impl StorageMode {
    /// Pick the mode from page context.
    ///
    /// The first non-blank of the `service_id` query parameter, the `id`
    /// query parameter and the `service_id` form field selects remote mode.
    pub fn detect(
        query_service_id: Option<&str>,
        query_id: Option<&str>,
        form_service_id: Option<&str>,
    ) -> Self {
        [query_service_id, query_id, form_service_id]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(|service_id| StorageMode::Remote { service_id: service_id.to_string() })
            .unwrap_or(StorageMode::Local)
    }

    pub fn service_id(&self) -> Option<&str> {
        match self {
            StorageMode::Local => None,
            StorageMode::Remote { service_id } => Some(service_id),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StorageMode::Remote { .. })
    }
}

/// Connection details for the remote periods table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteConfig {
    /// Base URL of the REST endpoint, e.g. `https://project.example.co/rest/v1`
    pub base_url: String,
    pub api_key: String,
    pub table: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            table: DEFAULT_PERIODS_TABLE.to_string(),
        }
    }
}

impl RemoteConfig {
    /// Whether enough is configured to reach the remote store
    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

/// Engine configuration, injectable by the host page as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub mode: StorageMode,
    /// Price used when neither the page nor storage provide a default cost
    pub fallback_default_cost: u32,
    pub remote: RemoteConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::Local,
            fallback_default_cost: DEFAULT_COST,
            remote: RemoteConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, CalendarError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        if config.fallback_default_cost == 0 {
            return Err(CalendarError::InvalidConfig(
                "fallbackDefaultCost must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn with_mode(mut self, mode: StorageMode) -> Self {
        self.mode = mode;
        self
    }
}
