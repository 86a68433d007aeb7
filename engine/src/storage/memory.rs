//! In-memory stores. Clones share the same contents, so a test can keep a
//! handle and inspect what the engine wrote.

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::PeriodRow;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use super::traits::{KeyValueStore, PeriodStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a key without going through the trait
    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }
}

/// Periods table held in memory; can be switched to fail every call
#[derive(Debug, Clone, Default)]
pub struct MemoryPeriodStore {
    rows: Rc<RefCell<Vec<PeriodRow>>>,
    failing: Rc<Cell<bool>>,
}

impl MemoryPeriodStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<PeriodRow>) -> Self {
        let store = Self::default();
        store.rows.replace(rows);
        store
    }

    /// Make every subsequent call fail, simulating a transport error
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn rows(&self) -> Vec<PeriodRow> {
        self.rows.borrow().clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.get() {
            bail!("period store unavailable");
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl PeriodStore for MemoryPeriodStore {
    async fn fetch_periods(&self, service_id: &str) -> Result<Vec<PeriodRow>> {
        self.check_available()?;
        let mut rows: Vec<PeriodRow> = self
            .rows
            .borrow()
            .iter()
            .filter(|row| row.service_id == service_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(rows)
    }

    async fn delete_periods(&self, service_id: &str) -> Result<u64> {
        self.check_available()?;
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|row| row.service_id != service_id);
        Ok((before - rows.len()) as u64)
    }

    async fn insert_periods(&self, rows: &[PeriodRow]) -> Result<()> {
        self.check_available()?;
        self.rows.borrow_mut().extend_from_slice(rows);
        Ok(())
    }
}
