//! # Storage Traits
//!
//! Both traits take `&self`; implementations use interior mutability the
//! way browser storage does. Futures are not `Send` because everything runs
//! on the page's single thread.

use anyhow::Result;
use async_trait::async_trait;
use shared::PeriodRow;

/// String key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Every key currently stored
    fn keys(&self) -> Result<Vec<String>>;
}

/// The remote table of priced dates, partitioned by service identifier
#[async_trait(?Send)]
pub trait PeriodStore {
    /// All rows of a service ordered by date ascending
    async fn fetch_periods(&self, service_id: &str) -> Result<Vec<PeriodRow>>;

    /// Delete every row of a service; returns the number of rows removed
    /// when the backend reports it
    async fn delete_periods(&self, service_id: &str) -> Result<u64>;

    async fn insert_periods(&self, rows: &[PeriodRow]) -> Result<()>;
}
