//! Two-click range selection.
//!
//! ```text
//! Idle --click--> Anchored --click--> Idle + awaiting confirmation
//!                                        |
//!                 apply / cancel <-------+
//! ```
//!
//! While a closed range awaits a discount (or a cancel) no new anchor can be
//! set. Clicking a day already covered by a range punches it out of the
//! range instead of starting a new one; clicking a punched-out day brings it
//! back and anchors a new pick there.

use serde::{Deserialize, Serialize};
use shared::{CalendarDate, DateRange};
use std::collections::{BTreeMap, BTreeSet};

/// Result of a click on a day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Ignored(IgnoreReason),
    /// Day was inside a range and is now excluded from it
    Excluded(CalendarDate),
    /// Previously excluded day is part of its range again and anchors the
    /// next pick
    Reincluded(CalendarDate),
    /// First endpoint of a new range
    Anchored(CalendarDate),
    /// Second endpoint; the range now waits for apply or cancel
    RangeClosed(DateRange),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// Before today
    NotSelectable,
    Blocked,
    AwaitingConfirmation,
}

/// Ranges, exclusions, per-date discounts and the in-progress pick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    ranges: Vec<DateRange>,
    excluded: BTreeSet<i64>,
    discounts: BTreeMap<i64, u32>,
    anchor: Option<CalendarDate>,
    hover: Option<DateRange>,
    awaiting_confirmation: bool,
    blocking_mode: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a click on `date`.
    ///
    /// `blocked` tells whether the date is currently blocked; `today` bounds
    /// what can be picked (days before today are not selectable).
    pub fn click(&mut self, date: CalendarDate, today: CalendarDate, blocked: bool) -> ClickOutcome {
        if date.timestamp() < today.timestamp() {
            return ClickOutcome::Ignored(IgnoreReason::NotSelectable);
        }
        if blocked {
            return ClickOutcome::Ignored(IgnoreReason::Blocked);
        }
        if self.awaiting_confirmation {
            return ClickOutcome::Ignored(IgnoreReason::AwaitingConfirmation);
        }

        let timestamp = date.timestamp();
        if self.in_ranges(&date) && !self.excluded.contains(&timestamp) {
            self.exclude(&date);
            self.anchor = None;
            self.hover = None;
            return ClickOutcome::Excluded(date);
        }

        match self.anchor.take() {
            None => {
                let reincluded = self.include(&date);
                self.anchor = Some(date);
                if reincluded {
                    ClickOutcome::Reincluded(date)
                } else {
                    ClickOutcome::Anchored(date)
                }
            }
            Some(anchor) => {
                let range = DateRange::new(anchor, date);
                self.ranges.push(range);
                self.awaiting_confirmation = true;
                self.hover = None;
                ClickOutcome::RangeClosed(range)
            }
        }
    }

    /// Preview the range between the pending anchor and a hovered day.
    ///
    /// Returns whether the preview changed. Hovering an unselectable day
    /// keeps the previous preview.
    pub fn hover(&mut self, date: CalendarDate, selectable: bool) -> bool {
        let Some(anchor) = self.anchor else {
            return false;
        };
        if !selectable {
            return false;
        }
        let preview = Some(DateRange::new(anchor, date));
        let changed = self.hover != preview;
        self.hover = preview;
        changed
    }

    /// Pointer left the calendar
    pub fn leave(&mut self) -> bool {
        self.hover.take().is_some()
    }

    /// Store `price` for every day of the most recent range that is not
    /// past and not excluded, then release the confirmation lock.
    ///
    /// Returns how many days received the price.
    pub fn apply_discount(&mut self, price: u32, today: CalendarDate) -> usize {
        let Some(range) = self.ranges.last().copied() else {
            return 0;
        };

        let mut applied = 0;
        for day in range.days() {
            let timestamp = day.timestamp();
            if timestamp < today.timestamp() || self.excluded.contains(&timestamp) {
                continue;
            }
            self.discounts.insert(timestamp, price);
            applied += 1;
        }

        self.awaiting_confirmation = false;
        applied
    }

    /// Drop the most recent range and every discount inside it.
    ///
    /// Exclusions are left alone.
    pub fn cancel_last(&mut self) -> Option<DateRange> {
        let range = self.ranges.pop()?;
        self.discounts
            .retain(|timestamp, _| !range.contains_timestamp(*timestamp));
        self.awaiting_confirmation = false;
        self.hover = None;
        Some(range)
    }

    /// Carve a day out of the ranges; false if it was already excluded
    pub fn exclude(&mut self, date: &CalendarDate) -> bool {
        let inserted = self.excluded.insert(date.timestamp());
        if inserted {
            self.discounts.remove(&date.timestamp());
        }
        inserted
    }

    /// Undo an exclusion; false if the day was not excluded
    pub fn include(&mut self, date: &CalendarDate) -> bool {
        self.excluded.remove(&date.timestamp())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn in_ranges(&self, date: &CalendarDate) -> bool {
        self.ranges.iter().any(|range| range.contains(date))
    }

    /// Inside a confirmed range and not excluded
    pub fn is_selected(&self, date: &CalendarDate) -> bool {
        self.in_ranges(date) && !self.is_excluded(date)
    }

    pub fn is_excluded(&self, date: &CalendarDate) -> bool {
        self.excluded.contains(&date.timestamp())
    }

    pub fn is_anchor(&self, date: &CalendarDate) -> bool {
        self.anchor.as_ref() == Some(date)
    }

    pub fn in_hover(&self, date: &CalendarDate) -> bool {
        self.hover.is_some_and(|range| range.contains(date))
    }

    /// Any range or exclusion exists
    pub fn has_selection(&self) -> bool {
        !self.ranges.is_empty() || !self.excluded.is_empty()
    }

    pub fn ranges(&self) -> &[DateRange] {
        &self.ranges
    }

    pub fn last_range(&self) -> Option<DateRange> {
        self.ranges.last().copied()
    }

    pub fn excluded(&self) -> &BTreeSet<i64> {
        &self.excluded
    }

    pub fn discounts(&self) -> &BTreeMap<i64, u32> {
        &self.discounts
    }

    pub fn anchor(&self) -> Option<CalendarDate> {
        self.anchor
    }

    pub fn hover_range(&self) -> Option<DateRange> {
        self.hover
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.awaiting_confirmation
    }

    pub fn blocking_mode(&self) -> bool {
        self.blocking_mode
    }

    pub fn set_blocking_mode(&mut self, enabled: bool) {
        self.blocking_mode = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> CalendarDate {
        CalendarDate::new(2025, 6, day).unwrap()
    }

    fn today() -> CalendarDate {
        date(10)
    }

    fn select(state: &mut SelectionState, first: u32, second: u32) -> DateRange {
        assert_eq!(state.click(date(first), today(), false), ClickOutcome::Anchored(date(first)));
        match state.click(date(second), today(), false) {
            ClickOutcome::RangeClosed(range) => range,
            other => panic!("expected a closed range, got {:?}", other),
        }
    }

    #[test]
    fn test_two_clicks_close_a_range_in_either_order() {
        let mut state = SelectionState::new();
        let range = select(&mut state, 20, 15);

        assert_eq!(range.start(), date(15));
        assert_eq!(range.end(), date(20));
        assert!(range.start().timestamp() <= range.end().timestamp());
        assert!(state.is_awaiting_confirmation());
        assert_eq!(state.anchor(), None);
    }

    #[test]
    fn test_past_is_not_selectable() {
        let mut state = SelectionState::new();
        assert_eq!(
            state.click(date(9), today(), false),
            ClickOutcome::Ignored(IgnoreReason::NotSelectable)
        );
        assert_eq!(state.anchor(), None);
    }

    #[test]
    fn test_today_can_start_a_range() {
        let mut state = SelectionState::new();
        assert_eq!(state.click(today(), today(), false), ClickOutcome::Anchored(today()));
        assert_eq!(state.anchor(), Some(today()));
    }

    #[test]
    fn test_blocked_dates_are_not_selectable() {
        let mut state = SelectionState::new();
        assert_eq!(
            state.click(date(12), today(), true),
            ClickOutcome::Ignored(IgnoreReason::Blocked)
        );
    }

    #[test]
    fn test_pending_confirmation_blocks_new_anchor() {
        let mut state = SelectionState::new();
        select(&mut state, 12, 14);

        assert_eq!(
            state.click(date(20), today(), false),
            ClickOutcome::Ignored(IgnoreReason::AwaitingConfirmation)
        );

        state.apply_discount(6400, today());
        assert_eq!(state.click(date(20), today(), false), ClickOutcome::Anchored(date(20)));
    }

    #[test]
    fn test_click_inside_range_excludes_and_drops_discount() {
        let mut state = SelectionState::new();
        select(&mut state, 12, 16);
        state.apply_discount(6400, today());
        assert_eq!(state.discounts().get(&date(14).timestamp()), Some(&6400));

        assert_eq!(state.click(date(14), today(), false), ClickOutcome::Excluded(date(14)));
        assert!(state.is_excluded(&date(14)));
        assert!(!state.is_selected(&date(14)));
        assert_eq!(state.discounts().get(&date(14).timestamp()), None);

        assert_eq!(state.click(date(14), today(), false), ClickOutcome::Reincluded(date(14)));
        assert!(!state.is_excluded(&date(14)));
        assert!(state.is_selected(&date(14)));
        assert_eq!(state.anchor(), Some(date(14)));
    }

    #[test]
    fn test_reincluded_day_starts_the_next_range() {
        let mut state = SelectionState::new();
        select(&mut state, 12, 16);
        state.apply_discount(6400, today());
        state.click(date(14), today(), false);
        state.click(date(14), today(), false);

        match state.click(date(20), today(), false) {
            ClickOutcome::RangeClosed(range) => {
                assert_eq!(range.start(), date(14));
                assert_eq!(range.end(), date(20));
            }
            other => panic!("expected a closed range, got {:?}", other),
        }
        assert_eq!(state.ranges().len(), 2);
        assert!(state.is_awaiting_confirmation());
    }

    #[test]
    fn test_exclusion_is_idempotent() {
        let mut state = SelectionState::new();
        assert!(state.exclude(&date(14)));
        assert!(!state.exclude(&date(14)));
        assert_eq!(state.excluded().len(), 1);
        assert!(state.include(&date(14)));
        assert!(!state.include(&date(14)));
    }

    #[test]
    fn test_apply_skips_excluded_days() {
        let mut state = SelectionState::new();
        select(&mut state, 12, 16);
        state.apply_discount(6400, today());
        state.click(date(13), today(), false);

        // the second pick starts and ends outside the first range
        select(&mut state, 11, 18);
        let applied = state.apply_discount(5000, today());

        assert_eq!(applied, 7);
        assert_eq!(state.discounts().get(&date(13).timestamp()), None);
        assert_eq!(state.discounts().get(&date(14).timestamp()), Some(&5000));
        assert_eq!(state.discounts().get(&date(18).timestamp()), Some(&5000));
    }

    #[test]
    fn test_cancel_removes_only_last_range_discounts() {
        let mut state = SelectionState::new();
        select(&mut state, 12, 13);
        state.apply_discount(7000, today());
        state.exclude(&date(25));

        select(&mut state, 20, 22);
        state.apply_discount(6000, today());

        let canceled = state.cancel_last().unwrap();
        assert_eq!(canceled.start(), date(20));
        assert_eq!(state.ranges().len(), 1);
        assert_eq!(state.discounts().len(), 2);
        assert_eq!(state.discounts().get(&date(12).timestamp()), Some(&7000));
        assert!(state.is_excluded(&date(25)));
        assert!(!state.is_awaiting_confirmation());
    }

    #[test]
    fn test_cancel_without_ranges_is_noop() {
        let mut state = SelectionState::new();
        assert_eq!(state.cancel_last(), None);
        assert_eq!(state, SelectionState::new());
    }

    #[test]
    fn test_hover_preview_follows_pointer() {
        let mut state = SelectionState::new();
        assert!(!state.hover(date(15), true));

        state.click(date(15), today(), false);
        assert!(state.hover(date(12), true));
        assert!(state.in_hover(&date(13)));
        assert!(!state.in_hover(&date(16)));

        assert!(!state.hover(date(12), true));
        assert!(!state.hover(date(20), false));
        assert_eq!(state.hover_range().unwrap().start(), date(12));

        assert!(state.leave());
        assert!(!state.in_hover(&date(13)));
        assert!(!state.leave());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut state = SelectionState::new();
        select(&mut state, 12, 13);
        state.set_blocking_mode(true);
        state.clear();
        assert_eq!(state, SelectionState::new());
        assert!(!state.has_selection());
    }
}
