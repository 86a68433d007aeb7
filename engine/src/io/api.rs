//! Host-facing calendar API.
//!
//! The engine sits in an `Rc<RefCell<_>>` shared with the DOM handlers. A
//! borrow is never held across an await: state is read out, the remote call
//! runs, and the result is written back in a fresh borrow.

use log::{error, info, warn};
use shared::{CalendarDate, CalendarSnapshot, MonthView};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::domain::CalendarEngine;
use crate::error::CalendarError;
use crate::storage::remote::{load_periods, replace_periods};
use crate::storage::PeriodStore;

/// Holds the save flag up until dropped, including when the save future
/// itself is dropped mid-flight
struct SavingFlag<'a>(&'a Cell<bool>);

impl<'a> SavingFlag<'a> {
    fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for SavingFlag<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct CalendarApi {
    engine: Rc<RefCell<CalendarEngine>>,
    periods: Option<Rc<dyn PeriodStore>>,
    saving: Cell<bool>,
}

impl CalendarApi {
    /// `periods` is required for remote mode and ignored in local mode
    pub fn new(engine: CalendarEngine, periods: Option<Rc<dyn PeriodStore>>) -> Self {
        Self {
            engine: Rc::new(RefCell::new(engine)),
            periods,
            saving: Cell::new(false),
        }
    }

    /// Shared handle for input handlers
    pub fn engine(&self) -> Rc<RefCell<CalendarEngine>> {
        Rc::clone(&self.engine)
    }

    pub fn is_saving(&self) -> bool {
        self.saving.get()
    }

    /// Startup load. A failed remote fetch is logged and the calendar comes
    /// up on defaults.
    pub async fn load(&self) -> MonthView {
        if let Err(e) = self.fetch().await {
            error!("Initial calendar load failed: {}", e);
        }
        let mut engine = self.engine.borrow_mut();
        engine.mark_initialized();
        engine.refresh()
    }

    /// Re-read the backend and re-render
    pub async fn reload(&self) -> Result<MonthView, CalendarError> {
        self.fetch().await?;
        Ok(self.engine.borrow_mut().refresh())
    }

    async fn fetch(&self) -> Result<(), CalendarError> {
        let (service_id, default_cost) = {
            let mut engine = self.engine.borrow_mut();
            match engine.mode().service_id() {
                Some(service_id) => (service_id.to_string(), engine.default_cost()),
                None => {
                    engine.reload_local();
                    return Ok(());
                }
            }
        };
        let store = self.periods.clone().ok_or(CalendarError::RemoteUnavailable)?;

        let loaded = load_periods(store.as_ref(), &service_id, default_cost).await?;
        self.engine.borrow_mut().apply_loaded_periods(loaded);
        Ok(())
    }

    /// Replace the service's remote rows with the current prices.
    ///
    /// Returns the number of rows written. Only one save runs at a time; a
    /// second call while one is pending fails with
    /// [`CalendarError::SaveInFlight`].
    pub async fn save_to_remote(&self) -> Result<usize, CalendarError> {
        if self.saving.get() {
            warn!("Save requested while another save is running");
            return Err(CalendarError::SaveInFlight);
        }
        let store = self.periods.clone().ok_or(CalendarError::RemoteUnavailable)?;
        let (service_id, rows) = {
            let engine = self.engine.borrow();
            let service_id = engine
                .mode()
                .service_id()
                .ok_or(CalendarError::RemoteUnavailable)?
                .to_string();
            (service_id, engine.remote_rows()?)
        };

        let result = {
            let _guard = SavingFlag::raise(&self.saving);
            replace_periods(store.as_ref(), &service_id, &rows).await
        };

        if let Err(e) = result {
            error!("Saving periods failed: {:#}", e);
            return Err(e.into());
        }
        self.engine.borrow_mut().mark_persisted(&rows);
        info!("Saved {} periods for service {}", rows.len(), service_id);
        Ok(rows.len())
    }

    pub fn status(&self) -> CalendarSnapshot {
        self.engine.borrow().snapshot()
    }

    /// Set the price of a day of the displayed month
    pub fn set_price(&self, day: u32, price: u32) -> Result<MonthView, CalendarError> {
        let mut engine = self.engine.borrow_mut();
        engine.set_price(day, price)?;
        Ok(engine.refresh())
    }

    pub fn set_default_cost(&self, cost: u32) -> Result<MonthView, CalendarError> {
        let mut engine = self.engine.borrow_mut();
        engine.set_default_cost(cost)?;
        Ok(engine.refresh())
    }

    /// Unblock a date given as `DD.MM.YYYY` or `YYYY-MM-DD`.
    ///
    /// Returns whether the date was blocked.
    pub fn unblock_date(&self, text: &str) -> Result<bool, CalendarError> {
        let text = text.trim();
        let date = CalendarDate::parse_dotted(text).or_else(|_| CalendarDate::parse_iso(text))?;
        let mut engine = self.engine.borrow_mut();
        let removed = engine.unblock(&date);
        if removed {
            engine.refresh();
        }
        Ok(removed)
    }

    pub fn clear_all(&self) -> MonthView {
        let mut engine = self.engine.borrow_mut();
        engine.clear_all();
        engine.refresh()
    }

    pub fn fix_prices(&self) -> MonthView {
        self.engine.borrow_mut().fix_prices()
    }
}
