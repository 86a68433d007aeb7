//! # Local Store
//!
//! Creation-flow persistence on a [`KeyValueStore`].
//!
//! ## Keys
//!
//! ```text
//! calendarGlobalSettings   {"defaultCost":8000}
//! monthData-YYYY-MM        {"prices":[{"date":"DD.MM.YYYY","price":8000}],"defaultCost":8000}
//! blockedDatesMap          {"YYYY-MM":[{"date":"DD.MM.YYYY","price":0}]}
//! weekendDiscountEnabled   "true" | anything else
//! weekendDiscountPercent   numeric string
//! ```

use anyhow::{Context, Result};
use log::debug;
use shared::{GlobalSettings, MonthKey, MonthPrices, WeekendDiscount};

use super::traits::KeyValueStore;
use crate::domain::BlockedDates;

pub const SETTINGS_KEY: &str = "calendarGlobalSettings";
pub const MONTH_KEY_PREFIX: &str = "monthData-";
pub const BLOCKED_DATES_KEY: &str = "blockedDatesMap";
pub const WEEKEND_ENABLED_KEY: &str = "weekendDiscountEnabled";
pub const WEEKEND_PERCENT_KEY: &str = "weekendDiscountPercent";

/// Typed access to the calendar's key-value entries
pub struct LocalStore {
    kv: Box<dyn KeyValueStore>,
}

impl LocalStore {
    pub fn new(kv: Box<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn month_storage_key(key: MonthKey) -> String {
        format!("{}{}", MONTH_KEY_PREFIX, key)
    }

    pub fn load_settings(&self) -> Result<Option<GlobalSettings>> {
        self.load_json(SETTINGS_KEY)
    }

    pub fn save_settings(&self, settings: &GlobalSettings) -> Result<()> {
        self.save_json(SETTINGS_KEY, settings)
    }

    pub fn load_month(&self, key: MonthKey) -> Result<Option<MonthPrices>> {
        self.load_json(&Self::month_storage_key(key))
    }

    pub fn save_month(&self, key: MonthKey, prices: &MonthPrices) -> Result<()> {
        self.save_json(&Self::month_storage_key(key), prices)
    }

    pub fn load_blocked(&self) -> Result<BlockedDates> {
        Ok(self.load_json(BLOCKED_DATES_KEY)?.unwrap_or_default())
    }

    /// Write the blocked-dates map; an empty map removes the key
    pub fn save_blocked(&self, blocked: &BlockedDates) -> Result<()> {
        if blocked.is_empty() {
            return self.kv.remove(BLOCKED_DATES_KEY);
        }
        self.save_json(BLOCKED_DATES_KEY, blocked)
    }

    pub fn load_weekend(&self) -> Result<WeekendDiscount> {
        let enabled = self.kv.get(WEEKEND_ENABLED_KEY)?.as_deref() == Some("true");
        let percent = self
            .kv
            .get(WEEKEND_PERCENT_KEY)?
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|percent| percent.is_finite())
            .unwrap_or(0.0);
        Ok(WeekendDiscount { enabled, percent })
    }

    /// Store the weekend flag; the percent is kept only while the rule is on
    pub fn save_weekend(&self, weekend: &WeekendDiscount) -> Result<()> {
        self.kv
            .set(WEEKEND_ENABLED_KEY, if weekend.enabled { "true" } else { "false" })?;
        if !weekend.enabled {
            self.kv.remove(WEEKEND_PERCENT_KEY)?;
        } else if weekend.percent > 0.0 {
            self.kv.set(WEEKEND_PERCENT_KEY, &weekend.percent.to_string())?;
        }
        Ok(())
    }

    /// Remove every month table, the blocked map and the weekend rule.
    ///
    /// Global settings survive.
    pub fn clear_selection_data(&self) -> Result<usize> {
        let mut removed = 0;
        for key in self.kv.keys()? {
            let selection_key = key.starts_with(MONTH_KEY_PREFIX)
                || key == BLOCKED_DATES_KEY
                || key == WEEKEND_ENABLED_KEY
                || key == WEEKEND_PERCENT_KEY;
            if selection_key {
                self.kv.remove(&key)?;
                removed += 1;
            }
        }
        debug!("Removed {} stored calendar entries", removed);
        Ok(removed)
    }

    fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.kv.get(key)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw)
                    .with_context(|| format!("malformed JSON under '{}'", key))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn save_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("failed to serialize '{}'", key))?;
        self.kv.set(key, &raw)
    }
}
