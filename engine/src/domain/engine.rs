//! # Calendar Engine
//!
//! [`CalendarEngine`] owns every piece of calendar state for one page
//! session: the displayed month, the per-month price records, blocked
//! dates, the range selection and the weekend rule.
//!
//! Input handlers mutate the engine synchronously and then ask for a
//! [`MonthView`] via [`CalendarEngine::refresh`], which is a pure projection
//! of state. In local mode every refresh also writes the month tables and
//! blocked dates back to key-value storage. Remote persistence is driven
//! from outside (see [`crate::io::CalendarApi`]) through
//! [`CalendarEngine::remote_rows`] and [`CalendarEngine::apply_loaded_periods`].
//!
//! Storage failures never escape the engine: they are logged and the
//! in-memory state stays authoritative.

use log::{debug, info, warn};
use shared::{
    BlockedDate, CalendarDate, CalendarSnapshot, CellTag, CellView, DateRange, GlobalSettings,
    MonthKey, MonthPrices, MonthView, PeriodRow, PriceEntry, WeekendDiscount, GRID_SLOTS,
};
use std::collections::BTreeSet;

use super::grid::{self, MonthGrid};
use super::pricing::{self, apply_discount, parse_percent, PricingContext, Resolution};
use super::selection::{ClickOutcome, SelectionState};
use super::{BasePrices, BlockedDates};
use crate::config::{EngineConfig, StorageMode};
use crate::error::CalendarError;
use crate::storage::remote::{flatten_rows, LoadedPeriods};
use crate::storage::{KeyValueStore, LocalStore};

/// What the apply action did with the most recent range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeAction {
    /// Discount stored for `days` dates at `price`
    Discounted { price: u32, days: usize },
    /// `days` dates newly blocked; the range itself was dropped
    Blocked { days: usize },
    NoRange,
}

pub struct CalendarEngine {
    mode: StorageMode,
    local: LocalStore,
    today: CalendarDate,
    view: MonthKey,
    default_cost: u32,
    /// Default cost came from the page or the user, not from storage
    cost_pinned: bool,
    base_prices: BasePrices,
    blocked: BlockedDates,
    selection: SelectionState,
    weekend: WeekendDiscount,
    /// Dates known to exist in the remote table
    persisted: BTreeSet<i64>,
    initialized: bool,
}

impl CalendarEngine {
    /// Build the engine and restore whatever local storage holds.
    ///
    /// Global settings and blocked dates are read in local mode only; the
    /// weekend rule is read in both modes.
    pub fn new(config: &EngineConfig, kv: Box<dyn KeyValueStore>, today: CalendarDate) -> Self {
        let local = LocalStore::new(kv);
        let mut default_cost = config.fallback_default_cost;
        let mut blocked = BlockedDates::new();

        if !config.mode.is_remote() {
            match local.load_settings() {
                Ok(Some(settings)) if settings.default_cost > 0 => {
                    default_cost = settings.default_cost
                }
                Ok(_) => {}
                Err(e) => warn!("Ignoring stored settings: {:#}", e),
            }
            match local.load_blocked() {
                Ok(stored) => blocked = stored,
                Err(e) => warn!("Ignoring stored blocked dates: {:#}", e),
            }
        }

        let weekend = local.load_weekend().unwrap_or_else(|e| {
            warn!("Ignoring stored weekend discount: {:#}", e);
            WeekendDiscount::default()
        });

        info!(
            "Calendar engine created in {} mode, default cost {}",
            if config.mode.is_remote() { "remote" } else { "local" },
            default_cost
        );

        Self {
            mode: config.mode.clone(),
            local,
            today,
            view: today.month_key(),
            default_cost,
            cost_pinned: false,
            base_prices: BasePrices::new(),
            blocked,
            selection: SelectionState::new(),
            weekend,
            persisted: BTreeSet::new(),
            initialized: false,
        }
    }

    pub fn mode(&self) -> &StorageMode {
        &self.mode
    }

    pub fn today(&self) -> CalendarDate {
        self.today
    }

    pub fn displayed_month(&self) -> MonthKey {
        self.view
    }

    pub fn default_cost(&self) -> u32 {
        self.default_cost
    }

    pub fn weekend(&self) -> WeekendDiscount {
        self.weekend
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn base_prices(&self) -> &BasePrices {
        &self.base_prices
    }

    pub fn blocked(&self) -> &BlockedDates {
        &self.blocked
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Take the default cost from the page's cost input when it holds a
    /// positive integer. Returns whether the input was used.
    pub fn adopt_input_cost(&mut self, input: &str) -> bool {
        match pricing::parse_positive_price(input) {
            Some(cost) => self.set_default_cost(cost).is_ok(),
            None => false,
        }
    }

    /// Change the default cost.
    ///
    /// Future records that still carry the previous default follow the new
    /// one; explicit prices and past dates are kept.
    pub fn set_default_cost(&mut self, cost: u32) -> Result<(), CalendarError> {
        if cost == 0 {
            return Err(CalendarError::InvalidPrice(cost.to_string()));
        }

        let today = self.today;
        for month in self.base_prices.values_mut() {
            rebase_month(month, cost, today);
        }
        self.default_cost = cost;
        self.cost_pinned = true;
        info!("Default cost set to {}", cost);

        if !self.mode.is_remote() {
            if let Err(e) = self.local.save_settings(&GlobalSettings { default_cost: cost }) {
                warn!("Failed to store global settings: {:#}", e);
            }
            self.persist_local();
        }
        Ok(())
    }

    /// [`set_default_cost`](Self::set_default_cost) from input text
    pub fn set_default_cost_text(&mut self, input: &str) -> Result<(), CalendarError> {
        let cost = pricing::parse_positive_price(input)
            .ok_or_else(|| CalendarError::InvalidPrice(input.to_string()))?;
        self.set_default_cost(cost)
    }

    // -----------------------------------------------------------------
    // Navigation and rendering
    // -----------------------------------------------------------------

    pub fn can_go_back(&self) -> bool {
        grid::can_go_back(self.view, self.today.month_key())
    }

    /// Move the displayed month one step forward (`step > 0`) or back
    /// (`step < 0`). Returns whether the month changed.
    pub fn navigate(&mut self, step: i32) -> bool {
        let target = match step.signum() {
            1 => self.view.next(),
            -1 if self.can_go_back() => self.view.previous(),
            _ => return false,
        };

        self.view = target;
        self.selection.leave();
        self.ensure_month(target);
        debug!("Navigated to {}", target);
        true
    }

    /// Make sure a month has a record for every real day.
    ///
    /// In local mode a month not yet in memory is first read from storage.
    /// Missing days are appended at 0 when past, else at the default cost.
    pub fn ensure_month(&mut self, key: MonthKey) {
        if !self.mode.is_remote() && !self.base_prices.contains_key(&key) {
            match self.local.load_month(key) {
                Ok(Some(stored)) => {
                    debug!("Restored {} stored prices for {}", stored.prices.len(), key);
                    self.base_prices.insert(key, stored);
                }
                Ok(None) => {}
                Err(e) => warn!("Ignoring stored prices for {}: {:#}", key, e),
            }
        }

        let today = self.today;
        let default_cost = self.default_cost;
        let month = self
            .base_prices
            .entry(key)
            .or_insert_with(|| MonthPrices::new(default_cost));
        rebase_month(month, default_cost, today);

        for date in key.dates() {
            let dotted = date.dotted();
            if !month.contains(&dotted) {
                let price = if date < today { 0 } else { default_cost };
                month.prices.push(PriceEntry { date: dotted, price });
            }
        }
    }

    /// Recompute the displayed month; in local mode also persist
    pub fn refresh(&mut self) -> MonthView {
        self.ensure_month(self.view);
        self.persist_local();
        self.month_view()
    }

    /// Project current state onto the 42 slots of the displayed month
    pub fn month_view(&self) -> MonthView {
        let grid = MonthGrid::build(self.view);
        let context = self.pricing_context();

        let cells = (0..GRID_SLOTS)
            .map(|slot| match grid.day_at(slot).and_then(|day| self.view.date(day)) {
                Some(date) => self.cell(slot, &date, &context),
                None => CellView {
                    slot,
                    day: None,
                    price: None,
                    tags: vec![CellTag::NotExist],
                },
            })
            .collect();

        MonthView {
            key: self.view,
            label: self.view.label(),
            can_go_back: self.can_go_back(),
            cells,
        }
    }

    fn cell(&self, slot: usize, date: &CalendarDate, context: &PricingContext<'_>) -> CellView {
        let resolution = context.resolve(date);
        let mut tags: Vec<CellTag> = resolution.effect.tag().into_iter().collect();

        if self.mode.is_remote() && self.persisted.contains(&date.timestamp()) {
            tags.push(CellTag::LoadedFromRemote);
        }
        if self.selection.is_selected(date) {
            tags.push(CellTag::Selected);
        }
        if self.selection.is_anchor(date) {
            tags.push(CellTag::Waiting);
        }
        if self.selection.in_hover(date) && !resolution.effect.is_unavailable() {
            tags.push(CellTag::HoverRange);
        }

        CellView {
            slot,
            day: Some(date.day()),
            price: Some(resolution.price),
            tags,
        }
    }

    pub fn pricing_context(&self) -> PricingContext<'_> {
        PricingContext {
            today: self.today,
            default_cost: self.default_cost,
            weekend: self.weekend,
            base_prices: &self.base_prices,
            blocked: &self.blocked,
            excluded: self.selection.excluded(),
            discounts: self.selection.discounts(),
        }
    }

    pub fn resolve(&self, date: &CalendarDate) -> Resolution {
        self.pricing_context().resolve(date)
    }

    // -----------------------------------------------------------------
    // Interaction
    // -----------------------------------------------------------------

    fn displayed_date(&self, day: u32) -> Result<CalendarDate, CalendarError> {
        self.view.date(day).ok_or_else(|| CalendarError::DayOutOfMonth {
            day,
            month: self.view.label(),
        })
    }

    /// Click on a day of the displayed month
    pub fn click(&mut self, day: u32) -> Result<ClickOutcome, CalendarError> {
        let date = self.displayed_date(day)?;
        let blocked = pricing::is_blocked(&self.blocked, &date);
        let outcome = self.selection.click(date, self.today, blocked);
        debug!("Click on {}: {:?}", date, outcome);
        Ok(outcome)
    }

    /// Pointer over a day of the displayed month; returns whether the
    /// preview changed
    pub fn hover(&mut self, day: u32) -> bool {
        let Ok(date) = self.displayed_date(day) else {
            return false;
        };
        let selectable = date >= self.today && !pricing::is_blocked(&self.blocked, &date);
        self.selection.hover(date, selectable)
    }

    pub fn leave(&mut self) -> bool {
        self.selection.leave()
    }

    /// Confirm the most recent range.
    ///
    /// In blocking mode every non-past day of the range is blocked, the
    /// range is dropped and blocking mode ends. Otherwise the percent text
    /// is turned into a price stored for the range's days.
    pub fn apply(&mut self, percent_text: &str) -> RangeAction {
        let Some(range) = self.selection.last_range() else {
            return RangeAction::NoRange;
        };

        if self.selection.blocking_mode() {
            let days = self.block_range(range);
            self.selection.set_blocking_mode(false);
            self.selection.cancel_last();
            info!("Blocked {} dates between {} and {}", days, range.start(), range.end());
            return RangeAction::Blocked { days };
        }

        let percent = parse_percent(percent_text);
        let price = apply_discount(self.default_cost, percent);
        let days = self.selection.apply_discount(price, self.today);
        info!(
            "Applied {}% ({}) to {} dates between {} and {}",
            percent,
            price,
            days,
            range.start(),
            range.end()
        );
        RangeAction::Discounted { price, days }
    }

    /// Drop the most recent range; also leaves blocking mode
    pub fn cancel(&mut self) -> Option<DateRange> {
        self.selection.set_blocking_mode(false);
        let canceled = self.selection.cancel_last();
        if let Some(range) = canceled {
            debug!("Canceled range {} - {}", range.start(), range.end());
        }
        canceled
    }

    pub fn enter_blocking_mode(&mut self) {
        self.selection.set_blocking_mode(true);
    }

    pub fn exit_blocking_mode(&mut self) {
        self.selection.set_blocking_mode(false);
    }

    pub fn is_blocking_mode(&self) -> bool {
        self.selection.blocking_mode()
    }

    fn block_range(&mut self, range: DateRange) -> usize {
        let today = self.today;
        let mut added = 0;
        for date in range.days().filter(|date| *date >= today) {
            let bucket = self.blocked.entry(date.month_key()).or_default();
            let entry = BlockedDate::new(&date);
            if !bucket.contains(&entry) {
                bucket.push(entry);
                added += 1;
            }
        }
        added
    }

    /// Remove a date from the blocked list.
    ///
    /// Its price record is dropped too, so the next refresh recreates it at
    /// the default cost. Returns false if the date was not blocked.
    pub fn unblock(&mut self, date: &CalendarDate) -> bool {
        let key = date.month_key();
        let dotted = date.dotted();
        let Some(bucket) = self.blocked.get_mut(&key) else {
            return false;
        };

        let before = bucket.len();
        bucket.retain(|entry| entry.date != dotted);
        let removed = bucket.len() != before;
        if bucket.is_empty() {
            self.blocked.remove(&key);
        }

        if removed {
            if let Some(month) = self.base_prices.get_mut(&key) {
                month.prices.retain(|entry| entry.date != dotted);
            }
            info!("Unblocked {}", date);
        }
        removed
    }

    /// Turn the standing weekend discount on or off and store it
    pub fn set_weekend_discount(&mut self, enabled: bool, percent: f64) {
        let percent = if percent.is_finite() { percent } else { 0.0 };
        self.weekend = WeekendDiscount { enabled, percent };
        if let Err(e) = self.local.save_weekend(&self.weekend) {
            warn!("Failed to store weekend discount: {:#}", e);
        }
        info!("Weekend discount {} at {}%", if enabled { "enabled" } else { "disabled" }, percent);
    }

    /// Drop the in-memory month tables and re-read local storage.
    ///
    /// Does nothing in remote mode.
    pub fn reload_local(&mut self) {
        if self.mode.is_remote() {
            return;
        }
        self.base_prices.clear();
        match self.local.load_blocked() {
            Ok(stored) => self.blocked = stored,
            Err(e) => warn!("Ignoring stored blocked dates: {:#}", e),
        }
        debug!("Reloaded local calendar data");
    }

    /// Set the stored price of a day of the displayed month
    pub fn set_price(&mut self, day: u32, price: u32) -> Result<(), CalendarError> {
        let date = self.displayed_date(day)?;
        self.ensure_month(self.view);
        self.base_prices
            .entry(self.view)
            .or_insert_with(|| MonthPrices::new(self.default_cost))
            .upsert(date.dotted(), price);
        debug!("Price of {} set to {}", date, price);
        self.persist_local();
        Ok(())
    }

    /// Reset every non-past record of the displayed month to the default
    /// cost and re-render.
    ///
    /// Every visible upcoming price in the returned view is the default,
    /// blocked days excepted. Range discounts and the weekend rule are left
    /// in place and show again on the next refresh.
    pub fn fix_prices(&mut self) -> MonthView {
        self.ensure_month(self.view);
        let today = self.today;
        let default_cost = self.default_cost;
        if let Some(month) = self.base_prices.get_mut(&self.view) {
            for entry in month.prices.iter_mut() {
                let upcoming = CalendarDate::parse_dotted(&entry.date)
                    .map(|date| date >= today)
                    .unwrap_or(false);
                if upcoming {
                    entry.price = default_cost;
                }
            }
        }
        warn!("Prices of {} reset to {}", self.view, default_cost);

        let mut view = self.refresh();
        for cell in view.cells.iter_mut() {
            let fixed = cell.price.is_some()
                && !cell.has(CellTag::Past)
                && !cell.has(CellTag::Blocked);
            if fixed {
                cell.price = Some(default_cost);
            }
        }
        view
    }

    /// Forget every range, exclusion, discount and block, and disable the
    /// weekend rule. Stored month tables are dropped in local mode.
    pub fn clear_all(&mut self) {
        let blocked = std::mem::take(&mut self.blocked);
        for entry in blocked.values().flatten() {
            if let Ok(date) = CalendarDate::parse_dotted(&entry.date) {
                if let Some(month) = self.base_prices.get_mut(&date.month_key()) {
                    month.prices.retain(|record| record.date != entry.date);
                }
            }
        }

        self.selection.clear();
        self.weekend = WeekendDiscount::default();
        if !self.mode.is_remote() {
            self.base_prices.clear();
        }

        match self.local.clear_selection_data() {
            Ok(removed) => info!("Cleared calendar data ({} stored entries)", removed),
            Err(e) => warn!("Failed to clear stored calendar data: {:#}", e),
        }
    }

    // -----------------------------------------------------------------
    // Status and persistence
    // -----------------------------------------------------------------

    /// Label for the chosen-dates panel, from the most recent range
    pub fn chosen_dates_label(&self) -> Option<String> {
        self.selection.last_range().map(|range| chosen_dates_label(&range))
    }

    pub fn snapshot(&self) -> CalendarSnapshot {
        CalendarSnapshot {
            base_prices: self.base_prices.clone(),
            blocked_dates: self.blocked.clone(),
            date_ranges: self.selection.ranges().to_vec(),
            excluded_days: self.selection.excluded().iter().copied().collect(),
            date_discounts: self.selection.discounts().clone(),
            weekend_discount: self.weekend,
            default_cost: self.default_cost,
            service_id: self.mode.service_id().map(str::to_string),
            is_edit_mode: self.mode.is_remote(),
            is_initialized: self.initialized,
        }
    }

    fn persist_local(&self) {
        if self.mode.is_remote() {
            return;
        }
        for (key, month) in &self.base_prices {
            if let Err(e) = self.local.save_month(*key, month) {
                warn!("Failed to store prices for {}: {:#}", key, e);
            }
        }
        if let Err(e) = self.local.save_blocked(&self.blocked) {
            warn!("Failed to store blocked dates: {:#}", e);
        }
    }

    /// Flatten everything known into remote rows priced as displayed.
    ///
    /// Covers every recorded, discounted or blocked date.
    pub fn remote_rows(&self) -> Result<Vec<PeriodRow>, CalendarError> {
        let service_id = self.mode.service_id().ok_or(CalendarError::RemoteUnavailable)?;

        let recorded = self
            .base_prices
            .values()
            .flat_map(|month| month.prices.iter().map(|entry| entry.date.as_str()));
        let blocked = self
            .blocked
            .values()
            .flat_map(|entries| entries.iter().map(|entry| entry.date.as_str()));

        let mut dates: BTreeSet<CalendarDate> = recorded
            .chain(blocked)
            .filter_map(|text| CalendarDate::parse_dotted(text).ok())
            .collect();
        dates.extend(
            self.selection
                .discounts()
                .keys()
                .filter_map(|timestamp| CalendarDate::from_timestamp(*timestamp)),
        );

        let context = self.pricing_context();
        let rows = flatten_rows(
            service_id,
            dates.into_iter().map(|date| (date, context.resolve(&date).price)),
        );
        if rows.is_empty() {
            return Err(CalendarError::NothingToSave);
        }
        Ok(rows)
    }

    /// Adopt rows loaded from the remote table.
    ///
    /// The loaded months and blocked dates replace what is in memory. The
    /// first positive remote price becomes the default cost unless the page
    /// or the user already set one.
    pub fn apply_loaded_periods(&mut self, mut loaded: LoadedPeriods) {
        if !self.cost_pinned {
            if let Some(price) = loaded.first_valid_price {
                self.default_cost = price;
            }
        }
        for month in loaded.base_prices.values_mut() {
            month.default_cost = self.default_cost;
        }

        info!(
            "Adopted {} remote dates across {} months, default cost {}",
            loaded.dates.len(),
            loaded.base_prices.len(),
            self.default_cost
        );
        self.base_prices = loaded.base_prices;
        self.blocked = loaded.blocked;
        self.persisted = loaded.dates;
        self.ensure_month(self.view);
    }

    /// Record rows as present in the remote table
    pub fn mark_persisted(&mut self, rows: &[PeriodRow]) {
        self.persisted.extend(
            rows.iter()
                .filter_map(|row| CalendarDate::parse_iso(&row.date).ok())
                .map(|date| date.timestamp()),
        );
    }

    pub fn is_persisted(&self, date: &CalendarDate) -> bool {
        self.persisted.contains(&date.timestamp())
    }
}

/// Move future records that follow a month's default onto a new default
fn rebase_month(month: &mut MonthPrices, default_cost: u32, today: CalendarDate) {
    if month.default_cost == default_cost {
        return;
    }
    let previous = month.default_cost;
    for entry in month.prices.iter_mut().filter(|entry| entry.price == previous) {
        let upcoming = CalendarDate::parse_dotted(&entry.date)
            .map(|date| date >= today)
            .unwrap_or(false);
        if upcoming {
            entry.price = default_cost;
        }
    }
    month.default_cost = default_cost;
}

/// `"DD - DD <Month>"` within one month, else `"DD <Month> - DD <Month>"`
pub fn chosen_dates_label(range: &DateRange) -> String {
    let (start, end) = (range.start(), range.end());
    let start_month = start.month_key();
    let end_month = end.month_key();

    if start_month == end_month {
        format!("{:02} - {:02} {}", start.day(), end.day(), start_month.month_name())
    } else {
        format!(
            "{:02} {} - {:02} {}",
            start.day(),
            start_month.month_name(),
            end.day(),
            end_month.month_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::selection::IgnoreReason;
    use crate::storage::remote::group_rows;
    use crate::storage::MemoryKeyValueStore;

    // Wednesday; June 2025 starts on a Sunday, so day N sits in slot N + 5
    fn today() -> CalendarDate {
        CalendarDate::new(2025, 6, 11).unwrap()
    }

    fn june(day: u32) -> CalendarDate {
        CalendarDate::new(2025, 6, day).unwrap()
    }

    fn local_engine() -> (CalendarEngine, MemoryKeyValueStore) {
        let kv = MemoryKeyValueStore::new();
        let engine = CalendarEngine::new(&EngineConfig::default(), Box::new(kv.clone()), today());
        (engine, kv)
    }

    fn remote_engine() -> CalendarEngine {
        let config = EngineConfig::default().with_mode(StorageMode::Remote {
            service_id: "svc-1".to_string(),
        });
        CalendarEngine::new(&config, Box::new(MemoryKeyValueStore::new()), today())
    }

    fn row(iso: &str, price: u32) -> PeriodRow {
        PeriodRow {
            id: format!("row-{}", iso),
            service_id: "svc-1".to_string(),
            date: iso.to_string(),
            price,
        }
    }

    fn pick(engine: &mut CalendarEngine, first: u32, second: u32) {
        assert!(matches!(engine.click(first).unwrap(), ClickOutcome::Anchored(_)));
        assert!(matches!(engine.click(second).unwrap(), ClickOutcome::RangeClosed(_)));
    }

    #[test]
    fn test_stored_settings_set_default_cost() {
        let kv = MemoryKeyValueStore::new();
        kv.set("calendarGlobalSettings", r#"{"defaultCost":9000}"#).unwrap();
        let engine = CalendarEngine::new(&EngineConfig::default(), Box::new(kv), today());
        assert_eq!(engine.default_cost(), 9000);
    }

    #[test]
    fn test_malformed_storage_falls_back() {
        let kv = MemoryKeyValueStore::new();
        kv.set("calendarGlobalSettings", "oops").unwrap();
        kv.set("blockedDatesMap", "[1,2").unwrap();
        let engine = CalendarEngine::new(&EngineConfig::default(), Box::new(kv), today());
        assert_eq!(engine.default_cost(), 8000);
        assert!(engine.blocked().is_empty());
    }

    #[test]
    fn test_refresh_populates_and_persists_month() {
        let (mut engine, kv) = local_engine();
        let view = engine.refresh();

        assert_eq!(view.label, "June 2025");
        assert!(!view.can_go_back);
        assert_eq!(view.cells.len(), 42);
        for slot in 0..6 {
            assert_eq!(view.cells[slot].tags, vec![CellTag::NotExist]);
            assert_eq!(view.cells[slot].price, None);
        }
        assert_eq!(view.cells[6].day, Some(1));
        assert!(view.cells[6].has(CellTag::Past));
        assert_eq!(view.cells[6].price, Some(0));
        assert_eq!(view.cell_for_day(11).unwrap().price, Some(8000));
        assert!(!view.cell_for_day(11).unwrap().has(CellTag::Past));
        assert_eq!(view.cells[36].tags, vec![CellTag::NotExist]);

        let stored = &engine.base_prices()[&june(1).month_key()];
        assert_eq!(stored.prices.len(), 30);
        assert_eq!(stored.price_for("10.06.2025"), Some(0));
        assert_eq!(stored.price_for("11.06.2025"), Some(8000));
        assert!(kv.value("monthData-2025-06").is_some());
    }

    #[test]
    fn test_range_discount_flow() {
        let (mut engine, _kv) = local_engine();
        engine.refresh();

        assert_eq!(
            engine.click(10).unwrap(),
            ClickOutcome::Ignored(IgnoreReason::NotSelectable)
        );
        pick(&mut engine, 16, 12);
        assert!(engine.selection().is_awaiting_confirmation());
        assert_eq!(engine.chosen_dates_label().as_deref(), Some("12 - 16 June"));
        assert_eq!(
            engine.click(20).unwrap(),
            ClickOutcome::Ignored(IgnoreReason::AwaitingConfirmation)
        );

        assert_eq!(engine.apply("20%"), RangeAction::Discounted { price: 6400, days: 5 });
        let view = engine.refresh();
        let cell = view.cell_for_day(12).unwrap();
        assert_eq!(cell.price, Some(6400));
        assert!(cell.has(CellTag::Active));
        assert!(cell.has(CellTag::Selected));
        assert_eq!(view.cell_for_day(17).unwrap().price, Some(8000));
    }

    #[test]
    fn test_exclusion_restores_default() {
        let (mut engine, _kv) = local_engine();
        engine.refresh();
        pick(&mut engine, 12, 16);
        engine.apply("50");

        assert_eq!(engine.click(13).unwrap(), ClickOutcome::Excluded(june(13)));
        let view = engine.refresh();
        let cell = view.cell_for_day(13).unwrap();
        assert_eq!(cell.price, Some(8000));
        assert!(cell.tags.is_empty());

        assert_eq!(engine.click(13).unwrap(), ClickOutcome::Reincluded(june(13)));
        assert_eq!(engine.selection().anchor(), Some(june(13)));
        let cell = engine.refresh().cell_for_day(13).cloned().unwrap();
        assert!(cell.has(CellTag::Selected));
        assert!(cell.has(CellTag::Waiting));
        assert_eq!(cell.price, Some(8000));
    }

    #[test]
    fn test_hover_preview_tags() {
        let (mut engine, _kv) = local_engine();
        engine.click(20).unwrap();
        assert!(engine.hover(23));
        assert!(!engine.hover(10));

        let view = engine.refresh();
        assert!(view.cell_for_day(20).unwrap().has(CellTag::Waiting));
        assert!(view.cell_for_day(21).unwrap().has(CellTag::HoverRange));
        assert!(!view.cell_for_day(24).unwrap().has(CellTag::HoverRange));

        assert!(engine.leave());
        assert!(!engine.refresh().cell_for_day(21).unwrap().has(CellTag::HoverRange));
    }

    #[test]
    fn test_hover_reaches_today() {
        let (mut engine, _kv) = local_engine();
        engine.click(20).unwrap();
        assert!(engine.hover(11));

        let view = engine.refresh();
        let cell = view.cell_for_day(11).unwrap();
        assert!(cell.has(CellTag::HoverRange));
        assert_eq!(cell.price, Some(8000));
        assert!(!view.cell_for_day(10).unwrap().has(CellTag::HoverRange));
    }

    #[test]
    fn test_blocking_flow() {
        let (mut engine, kv) = local_engine();
        engine.refresh();
        engine.enter_blocking_mode();
        pick(&mut engine, 20, 22);

        assert_eq!(engine.apply(""), RangeAction::Blocked { days: 3 });
        assert!(!engine.is_blocking_mode());
        assert!(engine.selection().ranges().is_empty());
        assert!(!engine.selection().is_awaiting_confirmation());

        let view = engine.refresh();
        let cell = view.cell_for_day(21).unwrap();
        assert_eq!(cell.price, Some(0));
        assert!(cell.has(CellTag::Blocked));
        assert_eq!(engine.click(21).unwrap(), ClickOutcome::Ignored(IgnoreReason::Blocked));
        assert!(kv.value("blockedDatesMap").unwrap().contains("21.06.2025"));
    }

    #[test]
    fn test_blocked_beats_weekend_and_discount() {
        let (mut engine, _kv) = local_engine();
        engine.refresh();
        engine.set_weekend_discount(true, 25.0);
        engine.enter_blocking_mode();
        pick(&mut engine, 14, 14);
        engine.apply("");
        pick(&mut engine, 13, 15);
        assert_eq!(engine.apply("10"), RangeAction::Discounted { price: 7200, days: 3 });

        let view = engine.refresh();
        assert_eq!(view.cell_for_day(14).unwrap().price, Some(0));
        assert_eq!(view.cell_for_day(15).unwrap().price, Some(7200));
    }

    #[test]
    fn test_unblock_restores_default() {
        let (mut engine, kv) = local_engine();
        engine.refresh();
        engine.enter_blocking_mode();
        pick(&mut engine, 20, 20);
        engine.apply("");
        engine.refresh();

        assert!(engine.unblock(&june(20)));
        assert!(!engine.unblock(&june(20)));
        let view = engine.refresh();
        assert_eq!(view.cell_for_day(20).unwrap().price, Some(8000));
        assert!(engine.blocked().is_empty());
        assert_eq!(kv.value("blockedDatesMap"), None);
    }

    #[test]
    fn test_weekend_discount_and_precedence() {
        let (mut engine, kv) = local_engine();
        engine.refresh();
        engine.set_weekend_discount(true, 25.0);
        assert_eq!(kv.value("weekendDiscountPercent").as_deref(), Some("25"));

        let view = engine.refresh();
        let saturday = view.cell_for_day(14).unwrap();
        assert_eq!(saturday.price, Some(6000));
        assert!(saturday.has(CellTag::WeekendDiscount));
        assert_eq!(view.cell_for_day(13).unwrap().price, Some(8000));

        pick(&mut engine, 13, 15);
        engine.apply("10");
        assert_eq!(engine.refresh().cell_for_day(14).unwrap().price, Some(7200));

        engine.click(14).unwrap();
        let cell = engine.refresh().cell_for_day(14).cloned().unwrap();
        assert_eq!(cell.price, Some(8000));
        assert!(!cell.has(CellTag::WeekendDiscount));
    }

    #[test]
    fn test_weekend_restored_in_remote_mode() {
        let kv = MemoryKeyValueStore::new();
        kv.set("weekendDiscountEnabled", "true").unwrap();
        kv.set("weekendDiscountPercent", "10").unwrap();
        let config = EngineConfig::default().with_mode(StorageMode::Remote {
            service_id: "svc-1".to_string(),
        });
        let engine = CalendarEngine::new(&config, Box::new(kv), today());
        assert_eq!(engine.weekend(), WeekendDiscount { enabled: true, percent: 10.0 });
    }

    #[test]
    fn test_cancel_in_blocking_mode() {
        let (mut engine, _kv) = local_engine();
        engine.enter_blocking_mode();
        pick(&mut engine, 20, 22);
        assert!(engine.cancel().is_some());
        assert!(!engine.is_blocking_mode());
        assert!(engine.blocked().is_empty());
        assert_eq!(engine.apply("10"), RangeAction::NoRange);
    }

    #[test]
    fn test_navigation_bounds() {
        let (mut engine, _kv) = local_engine();
        assert!(!engine.can_go_back());
        assert!(!engine.navigate(-1));
        assert!(!engine.navigate(0));

        assert!(engine.navigate(1));
        assert_eq!(engine.displayed_month(), MonthKey::new(2025, 7).unwrap());
        assert!(engine.can_go_back());
        assert!(engine.base_prices().contains_key(&MonthKey::new(2025, 7).unwrap()));

        assert!(engine.navigate(-1));
        assert_eq!(engine.displayed_month(), MonthKey::new(2025, 6).unwrap());
    }

    #[test]
    fn test_cross_month_label() {
        let (mut engine, _kv) = local_engine();
        engine.click(28).unwrap();
        engine.navigate(1);
        engine.click(3).unwrap();
        assert_eq!(engine.chosen_dates_label().as_deref(), Some("28 June - 03 July"));
    }

    #[test]
    fn test_set_default_cost_rewrites_following_records() {
        let (mut engine, kv) = local_engine();
        engine.refresh();
        engine.set_price(20, 5000).unwrap();

        engine.set_default_cost(9000).unwrap();
        let june_prices = &engine.base_prices()[&june(1).month_key()];
        assert_eq!(june_prices.price_for("20.06.2025"), Some(5000));
        assert_eq!(june_prices.price_for("21.06.2025"), Some(9000));
        assert_eq!(june_prices.price_for("05.06.2025"), Some(0));
        assert_eq!(
            kv.value("calendarGlobalSettings").as_deref(),
            Some(r#"{"defaultCost":9000}"#)
        );

        assert!(engine.set_default_cost(0).is_err());
        assert!(engine.set_default_cost_text("abc").is_err());
        assert_eq!(engine.default_cost(), 9000);
    }

    #[test]
    fn test_stored_month_follows_new_default() {
        let kv = MemoryKeyValueStore::new();
        kv.set("calendarGlobalSettings", r#"{"defaultCost":9000}"#).unwrap();
        kv.set(
            "monthData-2025-06",
            r#"{"prices":[{"date":"20.06.2025","price":8000},{"date":"21.06.2025","price":4000}],"defaultCost":8000}"#,
        )
        .unwrap();

        let mut engine = CalendarEngine::new(&EngineConfig::default(), Box::new(kv), today());
        let view = engine.refresh();
        assert_eq!(view.cell_for_day(20).unwrap().price, Some(9000));
        assert_eq!(view.cell_for_day(21).unwrap().price, Some(4000));
        assert_eq!(view.cell_for_day(22).unwrap().price, Some(9000));
    }

    #[test]
    fn test_set_price_rejects_missing_day() {
        let (mut engine, _kv) = local_engine();
        assert!(matches!(
            engine.set_price(31, 100),
            Err(CalendarError::DayOutOfMonth { day: 31, .. })
        ));
        engine.set_price(25, 100).unwrap();
        assert_eq!(engine.refresh().cell_for_day(25).unwrap().price, Some(100));
    }

    #[test]
    fn test_fix_prices_resets_upcoming_days() {
        let (mut engine, _kv) = local_engine();
        engine.refresh();
        engine.set_price(20, 5000).unwrap();

        let view = engine.fix_prices();
        assert_eq!(view.cell_for_day(20).unwrap().price, Some(8000));
        assert_eq!(view.cell_for_day(2).unwrap().price, Some(0));
    }

    #[test]
    fn test_fix_prices_shows_default_over_discounts() {
        let (mut engine, _kv) = local_engine();
        engine.refresh();
        engine.set_weekend_discount(true, 10.0);
        pick(&mut engine, 12, 13);
        engine.apply("50");
        engine.enter_blocking_mode();
        pick(&mut engine, 24, 24);
        engine.apply("");

        let view = engine.fix_prices();
        assert_eq!(view.cell_for_day(12).unwrap().price, Some(8000));
        assert_eq!(view.cell_for_day(14).unwrap().price, Some(8000));
        assert_eq!(view.cell_for_day(24).unwrap().price, Some(0));
        assert_eq!(view.cell_for_day(2).unwrap().price, Some(0));

        let view = engine.refresh();
        assert_eq!(view.cell_for_day(12).unwrap().price, Some(4000));
        assert_eq!(view.cell_for_day(14).unwrap().price, Some(7200));
    }

    #[test]
    fn test_clear_all() {
        let (mut engine, kv) = local_engine();
        engine.refresh();
        engine.set_default_cost(9000).unwrap();
        engine.set_weekend_discount(true, 10.0);
        pick(&mut engine, 12, 13);
        engine.apply("10");
        engine.enter_blocking_mode();
        pick(&mut engine, 20, 21);
        engine.apply("");
        engine.refresh();

        engine.clear_all();
        assert!(!engine.selection().has_selection());
        assert!(engine.blocked().is_empty());
        assert!(!engine.weekend().enabled);
        assert_eq!(kv.keys().unwrap(), vec!["calendarGlobalSettings".to_string()]);

        let view = engine.refresh();
        assert_eq!(view.cell_for_day(20).unwrap().price, Some(9000));
        assert_eq!(view.cell_for_day(12).unwrap().price, Some(9000));
    }

    #[test]
    fn test_remote_rows_need_remote_mode() {
        let (mut engine, _kv) = local_engine();
        engine.refresh();
        assert!(matches!(engine.remote_rows(), Err(CalendarError::RemoteUnavailable)));
    }

    #[test]
    fn test_loaded_periods_drive_default_and_tags() {
        let mut engine = remote_engine();
        let loaded = group_rows(&[row("2025-06-12", 0), row("2025-06-13", 9000)], 8000);
        engine.apply_loaded_periods(loaded);

        assert_eq!(engine.default_cost(), 9000);
        let view = engine.refresh();
        let blocked = view.cell_for_day(12).unwrap();
        assert!(blocked.has(CellTag::Blocked));
        assert!(blocked.has(CellTag::LoadedFromRemote));
        assert!(view.cell_for_day(13).unwrap().has(CellTag::LoadedFromRemote));
        assert!(!view.cell_for_day(14).unwrap().has(CellTag::LoadedFromRemote));
        assert_eq!(view.cell_for_day(14).unwrap().price, Some(9000));
    }

    #[test]
    fn test_input_cost_outranks_remote_price() {
        let mut engine = remote_engine();
        assert!(engine.adopt_input_cost("7000"));
        assert!(!engine.adopt_input_cost(""));
        engine.apply_loaded_periods(group_rows(&[row("2025-06-13", 9000)], 8000));

        assert_eq!(engine.default_cost(), 7000);
        assert_eq!(engine.refresh().cell_for_day(13).unwrap().price, Some(9000));
    }

    #[test]
    fn test_remote_rows_use_displayed_prices() {
        let mut engine = remote_engine();
        engine.refresh();
        pick(&mut engine, 12, 13);
        engine.apply("20");
        engine.enter_blocking_mode();
        pick(&mut engine, 20, 20);
        engine.apply("");

        let rows = engine.remote_rows().unwrap();
        assert_eq!(rows.len(), 30);
        let price_of = |iso: &str| rows.iter().find(|row| row.date == iso).map(|row| row.price);
        assert_eq!(price_of("2025-06-01"), Some(0));
        assert_eq!(price_of("2025-06-12"), Some(6400));
        assert_eq!(price_of("2025-06-20"), Some(0));
        assert_eq!(price_of("2025-06-25"), Some(8000));
        assert!(rows.iter().all(|row| row.service_id == "svc-1"));

        engine.mark_persisted(&rows);
        assert!(engine.is_persisted(&june(25)));
    }

    #[test]
    fn test_empty_remote_state_has_nothing_to_save() {
        let engine = remote_engine();
        assert!(matches!(engine.remote_rows(), Err(CalendarError::NothingToSave)));
    }

    #[test]
    fn test_snapshot_reports_mode() {
        let mut engine = remote_engine();
        engine.mark_initialized();
        let snapshot = engine.snapshot();
        assert!(snapshot.is_edit_mode);
        assert!(snapshot.is_initialized);
        assert_eq!(snapshot.service_id.as_deref(), Some("svc-1"));
        assert_eq!(snapshot.default_cost, 8000);
    }
}
