//! Startup context read from the page: configuration and storage mode.

use log::{info, warn};
use pricing_calendar::config::{ID_PARAM, SERVICE_ID_PARAM};
use pricing_calendar::{EngineConfig, StorageMode};
use web_sys::{Document, UrlSearchParams};

use crate::dom;

/// Engine configuration from the page's config script, else defaults
pub fn load_config(document: &Document) -> EngineConfig {
    let text = dom::query(document, dom::CONFIG_SCRIPT).and_then(|script| script.text_content());
    config_from_text(text.as_deref())
}

pub fn config_from_text(text: Option<&str>) -> EngineConfig {
    match text.map(str::trim).filter(|text| !text.is_empty()) {
        Some(text) => EngineConfig::from_json(text).unwrap_or_else(|e| {
            warn!("Ignoring calendar configuration: {}", e);
            EngineConfig::default()
        }),
        None => EngineConfig::default(),
    }
}

/// Storage mode from the query string and the service form field
pub fn detect_mode(document: &Document) -> StorageMode {
    let search = web_sys::window()
        .and_then(|window| window.location().search().ok())
        .unwrap_or_default();
    let params = UrlSearchParams::new_with_str(&search).ok();
    let query = |name: &str| params.as_ref().and_then(|params| params.get(name));

    let mode = StorageMode::detect(
        query(SERVICE_ID_PARAM).as_deref(),
        query(ID_PARAM).as_deref(),
        dom::input_value(document, dom::SERVICE_ID_INPUT).as_deref(),
    );
    match mode.service_id() {
        Some(service_id) => info!("Edit mode for service {}", service_id),
        None => info!("Create mode, prices kept in local storage"),
    }
    mode
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_text() {
        assert_eq!(config_from_text(None), EngineConfig::default());
        assert_eq!(config_from_text(Some("  ")), EngineConfig::default());
        assert_eq!(config_from_text(Some("{broken")), EngineConfig::default());

        let config = config_from_text(Some(
            r#"{"fallbackDefaultCost": 9500, "remote": {"baseUrl": "https://db.example.co/rest/v1", "apiKey": "anon"}}"#,
        ));
        assert_eq!(config.fallback_default_cost, 9500);
        assert!(config.remote.is_configured());
        assert_eq!(config.remote.table, "available_periods");
    }
}
