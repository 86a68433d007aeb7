//! Month grid layout.
//!
//! The page always has 42 day slots (six Monday-first weeks). A month is
//! laid out by placing day 1 under its weekday and filling forward; every
//! slot before day 1 or after the last day does not exist.

use chrono::Datelike;
use log::debug;
use shared::{CalendarDate, MonthKey, GRID_SLOTS};

/// Slot-to-day mapping for one month
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    key: MonthKey,
    slots: [Option<u32>; GRID_SLOTS],
}

impl MonthGrid {
    /// Lay out the given month over the 42 fixed slots
    pub fn build(key: MonthKey) -> Self {
        let offset = first_weekday_offset(key);
        let days_in_month = key.days_in_month();
        let mut slots = [None; GRID_SLOTS];

        for (day, slot) in (1..=days_in_month).zip(slots.iter_mut().skip(offset)) {
            *slot = Some(day);
        }

        debug!(
            "Built grid for {}: {} days starting at slot {}",
            key, days_in_month, offset
        );
        Self { key, slots }
    }

    pub fn key(&self) -> MonthKey {
        self.key
    }

    pub fn slots(&self) -> &[Option<u32>; GRID_SLOTS] {
        &self.slots
    }

    /// Day shown in a slot, `None` when the slot does not exist
    pub fn day_at(&self, slot: usize) -> Option<u32> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn slot_of(&self, day: u32) -> Option<usize> {
        self.slots.iter().position(|candidate| *candidate == Some(day))
    }

    /// Every existing slot together with its date
    pub fn dates(&self) -> impl Iterator<Item = (usize, CalendarDate)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(slot, day)| Some((slot, self.key.date((*day)?)?)))
    }
}

/// Column of day 1 in a Monday-first week (Monday = 0, Sunday = 6)
pub fn first_weekday_offset(key: MonthKey) -> usize {
    // chrono counts from Sunday = 0; Sunday moves to the end of the week
    match key.first_day().naive().weekday().num_days_from_sunday() {
        0 => 6,
        weekday => weekday as usize - 1,
    }
}

/// Backward navigation never goes before the current real month
pub fn can_go_back(displayed: MonthKey, current: MonthKey) -> bool {
    displayed.previous() >= current
}
