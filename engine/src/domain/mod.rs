//! # Domain Module
//!
//! Calendar rules with no knowledge of the page or of any backend.
//!
//! - [`grid`]: lays a month out over the 42 fixed slots
//! - [`pricing`]: resolves the price of one date from current state
//! - [`selection`]: the two-click range state machine
//! - [`engine`]: [`CalendarEngine`], owning all state and projecting the
//!   displayed month into a [`shared::MonthView`]

pub mod engine;
pub mod grid;
pub mod pricing;
pub mod selection;

use shared::{BlockedDate, MonthKey, MonthPrices};
use std::collections::BTreeMap;

/// Per-month price records keyed by month
pub type BasePrices = BTreeMap<MonthKey, MonthPrices>;

/// Per-month blocked dates keyed by month
pub type BlockedDates = BTreeMap<MonthKey, Vec<BlockedDate>>;

pub use engine::{CalendarEngine, RangeAction};
pub use grid::{can_go_back, first_weekday_offset, MonthGrid};
pub use pricing::{
    apply_discount, parse_percent, parse_positive_price, PriceEffect, PricingContext, Resolution,
};
pub use selection::{ClickOutcome, IgnoreReason, SelectionState};
