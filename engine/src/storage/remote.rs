//! Remote period rows.
//!
//! The remote table holds one row per priced date of a service. Saving
//! replaces every row of the service; loading groups rows back into month
//! tables and blocked lists.

use anyhow::{Context, Result};
use log::{info, warn};
use shared::{BlockedDate, CalendarDate, MonthPrices, PeriodRow};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::traits::PeriodStore;
use crate::domain::{BasePrices, BlockedDates};

/// Rows of a service regrouped for the engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedPeriods {
    pub base_prices: BasePrices,
    /// Rows whose price is 0
    pub blocked: BlockedDates,
    /// First positive price in date order
    pub first_valid_price: Option<u32>,
    /// Timestamps of every date present remotely
    pub dates: BTreeSet<i64>,
}

impl LoadedPeriods {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Turn priced dates into rows, each with a fresh identifier
pub fn flatten_rows<I>(service_id: &str, prices: I) -> Vec<PeriodRow>
where
    I: IntoIterator<Item = (CalendarDate, u32)>,
{
    prices
        .into_iter()
        .map(|(date, price)| PeriodRow {
            id: Uuid::new_v4().to_string(),
            service_id: service_id.to_string(),
            date: date.iso(),
            price,
        })
        .collect()
}

/// Group rows by month. Zero-priced rows are also listed as blocked.
///
/// Rows with an unreadable date are skipped with a warning. Month tables
/// created here carry `default_cost`.
pub fn group_rows(rows: &[PeriodRow], default_cost: u32) -> LoadedPeriods {
    let mut loaded = LoadedPeriods::default();

    for row in rows {
        let date = match CalendarDate::parse_iso(&row.date) {
            Ok(date) => date,
            Err(e) => {
                warn!("Skipping period row {}: {}", row.id, e);
                continue;
            }
        };

        let key = date.month_key();
        loaded
            .base_prices
            .entry(key)
            .or_insert_with(|| MonthPrices::new(default_cost))
            .upsert(date.dotted(), row.price);

        if row.price == 0 {
            let bucket = loaded.blocked.entry(key).or_default();
            let entry = BlockedDate::new(&date);
            if !bucket.contains(&entry) {
                bucket.push(entry);
            }
        } else if loaded.first_valid_price.is_none() {
            loaded.first_valid_price = Some(row.price);
        }

        loaded.dates.insert(date.timestamp());
    }

    loaded
}

/// Fetch and group every row of a service
pub async fn load_periods(
    store: &dyn PeriodStore,
    service_id: &str,
    default_cost: u32,
) -> Result<LoadedPeriods> {
    let rows = store
        .fetch_periods(service_id)
        .await
        .with_context(|| format!("failed to fetch periods of service {}", service_id))?;
    info!("Loaded {} period rows for service {}", rows.len(), service_id);
    Ok(group_rows(&rows, default_cost))
}

/// Replace every row of a service: delete, then insert the new set.
///
/// The two calls are not atomic; a failed insert leaves the service empty.
pub async fn replace_periods(
    store: &dyn PeriodStore,
    service_id: &str,
    rows: &[PeriodRow],
) -> Result<()> {
    let deleted = store
        .delete_periods(service_id)
        .await
        .with_context(|| format!("failed to delete periods of service {}", service_id))?;
    store
        .insert_periods(rows)
        .await
        .with_context(|| format!("failed to insert periods of service {}", service_id))?;
    info!(
        "Replaced periods of service {}: {} removed, {} inserted",
        service_id,
        deleted,
        rows.len()
    );
    Ok(())
}
