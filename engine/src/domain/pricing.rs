//! Price resolution.
//!
//! Each date is priced independently from the current state. The first
//! matching rule wins:
//!
//! 1. strictly before today → 0
//! 2. blocked → 0
//! 3. excluded from a range → default cost
//! 4. explicit per-date discount → that stored price
//! 5. active weekend discount on Saturday/Sunday → discounted default
//! 6. stored per-date price, else default cost

use serde::{Deserialize, Serialize};
use shared::{CalendarDate, CellTag, WeekendDiscount};
use std::collections::{BTreeMap, BTreeSet};

use super::{BasePrices, BlockedDates};

/// Which rule produced a resolved price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceEffect {
    Past,
    Blocked,
    Excluded,
    Discounted,
    WeekendDiscount,
    Stored,
    Default,
}

impl PriceEffect {
    /// Visual tag implied by the rule, if any
    pub fn tag(&self) -> Option<CellTag> {
        match self {
            PriceEffect::Past => Some(CellTag::Past),
            PriceEffect::Blocked => Some(CellTag::Blocked),
            PriceEffect::Discounted => Some(CellTag::Active),
            PriceEffect::WeekendDiscount => Some(CellTag::WeekendDiscount),
            PriceEffect::Excluded | PriceEffect::Stored | PriceEffect::Default => None,
        }
    }

    /// Past and blocked dates can never be picked
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PriceEffect::Past | PriceEffect::Blocked)
    }
}

/// Outcome of pricing one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub price: u32,
    pub effect: PriceEffect,
}

/// Borrowed view of everything that influences a price
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub today: CalendarDate,
    pub default_cost: u32,
    pub weekend: WeekendDiscount,
    pub base_prices: &'a BasePrices,
    pub blocked: &'a BlockedDates,
    pub excluded: &'a BTreeSet<i64>,
    pub discounts: &'a BTreeMap<i64, u32>,
}

impl PricingContext<'_> {
    /// Price a single date
    pub fn resolve(&self, date: &CalendarDate) -> Resolution {
        let timestamp = date.timestamp();

        if timestamp < self.today.timestamp() {
            return Resolution { price: 0, effect: PriceEffect::Past };
        }
        if is_blocked(self.blocked, date) {
            return Resolution { price: 0, effect: PriceEffect::Blocked };
        }
        if self.excluded.contains(&timestamp) {
            return Resolution { price: self.default_cost, effect: PriceEffect::Excluded };
        }
        if let Some(price) = self.discounts.get(&timestamp) {
            return Resolution { price: *price, effect: PriceEffect::Discounted };
        }
        if self.weekend.is_active() && date.is_weekend() {
            return Resolution {
                price: apply_discount(self.default_cost, self.weekend.percent),
                effect: PriceEffect::WeekendDiscount,
            };
        }

        match stored_price(self.base_prices, date) {
            Some(price) => Resolution { price, effect: PriceEffect::Stored },
            None => Resolution { price: self.default_cost, effect: PriceEffect::Default },
        }
    }
}

/// Whether the date is listed in its month's blocked dates
pub fn is_blocked(blocked: &BlockedDates, date: &CalendarDate) -> bool {
    let dotted = date.dotted();
    blocked
        .get(&date.month_key())
        .is_some_and(|entries| entries.iter().any(|entry| entry.date == dotted))
}

/// Price recorded for the date in its month's table
pub fn stored_price(base_prices: &BasePrices, date: &CalendarDate) -> Option<u32> {
    base_prices
        .get(&date.month_key())
        .and_then(|month| month.price_for(&date.dotted()))
}

/// Apply a percentage to a base price.
///
/// Up to 100 the percent is a reduction (`base * (100 - p) / 100`, with `p`
/// clamped to 0..=100); above 100 it is a multiplier (`base * p / 100`).
/// Non-finite input counts as 0.
pub fn apply_discount(base: u32, percent: f64) -> u32 {
    let percent = if percent.is_finite() { percent } else { 0.0 };
    let base = f64::from(base);
    let price = if percent > 100.0 {
        base * percent / 100.0
    } else {
        base * (100.0 - percent.clamp(0.0, 100.0)) / 100.0
    };
    price.round() as u32
}

/// Read a percent from free-form input text.
///
/// Everything except digits and dots is dropped, then the longest leading
/// decimal number is taken; anything unreadable is 0.
pub fn parse_percent(input: &str) -> f64 {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let mut seen_dot = false;
    let end = cleaned
        .char_indices()
        .find(|(_, c)| {
            if *c != '.' {
                return false;
            }
            let second_dot = seen_dot;
            seen_dot = true;
            second_dot
        })
        .map_or(cleaned.len(), |(index, _)| index);

    cleaned[..end].parse::<f64>().unwrap_or(0.0)
}

/// Read a positive whole price from input text (leading integer, rest ignored)
pub fn parse_positive_price(input: &str) -> Option<u32> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end].parse::<u32>().ok()?;

    (!negative && value > 0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{BlockedDate, MonthKey, MonthPrices};

    fn date(year: i32, month: u32, day: u32) -> CalendarDate {
        CalendarDate::new(year, month, day).unwrap()
    }

    struct Fixture {
        base_prices: BasePrices,
        blocked: BlockedDates,
        excluded: BTreeSet<i64>,
        discounts: BTreeMap<i64, u32>,
        weekend: WeekendDiscount,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                base_prices: BasePrices::new(),
                blocked: BlockedDates::new(),
                excluded: BTreeSet::new(),
                discounts: BTreeMap::new(),
                weekend: WeekendDiscount::default(),
            }
        }

        fn context(&self) -> PricingContext<'_> {
            PricingContext {
                today: date(2025, 6, 10),
                default_cost: 8000,
                weekend: self.weekend,
                base_prices: &self.base_prices,
                blocked: &self.blocked,
                excluded: &self.excluded,
                discounts: &self.discounts,
            }
        }

        fn block(&mut self, day: CalendarDate) {
            self.blocked.entry(day.month_key()).or_default().push(BlockedDate::new(&day));
        }
    }

    #[test]
    fn test_apply_discount_math() {
        assert_eq!(apply_discount(8000, 20.0), 6400);
        assert_eq!(apply_discount(8000, 0.0), 8000);
        assert_eq!(apply_discount(8000, 150.0), 12000);
        assert_eq!(apply_discount(8000, -10.0), 8000);
        assert_eq!(apply_discount(8000, f64::NAN), 8000);
    }

    #[test]
    fn test_apply_discount_boundary_at_one_hundred() {
        // 100 is still a reduction, 101 switches to the multiplier
        assert_eq!(apply_discount(8000, 100.0), 0);
        assert_eq!(apply_discount(8000, 101.0), 8080);
    }

    #[test]
    fn test_apply_discount_rounds_half_up() {
        assert_eq!(apply_discount(8001, 50.0), 4001);
        assert_eq!(apply_discount(8000, 33.3), 5336);
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("20%"), 20.0);
        assert_eq!(parse_percent(" 12.5 % "), 12.5);
        assert_eq!(parse_percent("1.2.3"), 1.2);
        assert_eq!(parse_percent(".5"), 0.5);
        assert_eq!(parse_percent("abc"), 0.0);
        assert_eq!(parse_percent("."), 0.0);
        assert_eq!(parse_percent(""), 0.0);
    }

    #[test]
    fn test_parse_positive_price() {
        assert_eq!(parse_positive_price("9000"), Some(9000));
        assert_eq!(parse_positive_price(" 7500 rub"), Some(7500));
        assert_eq!(parse_positive_price("0"), None);
        assert_eq!(parse_positive_price("-5"), None);
        assert_eq!(parse_positive_price("abc"), None);
        assert_eq!(parse_positive_price(""), None);
    }

    #[test]
    fn test_past_dates_are_free() {
        let mut fixture = Fixture::new();
        let yesterday = date(2025, 6, 9);
        fixture.discounts.insert(yesterday.timestamp(), 5000);

        let resolution = fixture.context().resolve(&yesterday);
        assert_eq!(resolution, Resolution { price: 0, effect: PriceEffect::Past });

        // today itself is not past
        let today = fixture.context().resolve(&date(2025, 6, 10));
        assert_eq!(today.effect, PriceEffect::Default);
    }

    #[test]
    fn test_blocked_beats_everything_else() {
        let mut fixture = Fixture::new();
        let saturday = date(2025, 6, 14);
        fixture.block(saturday);
        fixture.discounts.insert(saturday.timestamp(), 5000);
        fixture.weekend = WeekendDiscount { enabled: true, percent: 20.0 };
        fixture
            .base_prices
            .entry(saturday.month_key())
            .or_insert_with(|| MonthPrices::new(8000))
            .upsert(saturday.dotted(), 9000);

        let resolution = fixture.context().resolve(&saturday);
        assert_eq!(resolution, Resolution { price: 0, effect: PriceEffect::Blocked });
        assert!(resolution.effect.is_unavailable());
    }

    #[test]
    fn test_exclusion_overrides_discounts() {
        let mut fixture = Fixture::new();
        let saturday = date(2025, 6, 14);
        fixture.excluded.insert(saturday.timestamp());
        fixture.discounts.insert(saturday.timestamp(), 5000);
        fixture.weekend = WeekendDiscount { enabled: true, percent: 20.0 };

        let resolution = fixture.context().resolve(&saturday);
        assert_eq!(resolution, Resolution { price: 8000, effect: PriceEffect::Excluded });
        assert_eq!(resolution.effect.tag(), None);
    }

    #[test]
    fn test_per_date_discount_beats_weekend_rule() {
        let mut fixture = Fixture::new();
        let sunday = date(2025, 6, 15);
        fixture.discounts.insert(sunday.timestamp(), 7000);
        fixture.weekend = WeekendDiscount { enabled: true, percent: 50.0 };

        let resolution = fixture.context().resolve(&sunday);
        assert_eq!(resolution, Resolution { price: 7000, effect: PriceEffect::Discounted });
        assert_eq!(resolution.effect.tag(), Some(CellTag::Active));
    }

    #[test]
    fn test_weekend_rule_needs_enabled_and_percent() {
        let mut fixture = Fixture::new();
        let saturday = date(2025, 6, 14);
        let monday = date(2025, 6, 16);

        fixture.weekend = WeekendDiscount { enabled: true, percent: 0.0 };
        assert_eq!(fixture.context().resolve(&saturday).effect, PriceEffect::Default);

        fixture.weekend = WeekendDiscount { enabled: false, percent: 25.0 };
        assert_eq!(fixture.context().resolve(&saturday).effect, PriceEffect::Default);

        fixture.weekend = WeekendDiscount { enabled: true, percent: 25.0 };
        assert_eq!(
            fixture.context().resolve(&saturday),
            Resolution { price: 6000, effect: PriceEffect::WeekendDiscount }
        );
        assert_eq!(fixture.context().resolve(&monday).effect, PriceEffect::Default);
    }

    #[test]
    fn test_weekend_rule_beats_stored_price() {
        let mut fixture = Fixture::new();
        let saturday = date(2025, 6, 14);
        let key = MonthKey::new(2025, 6).unwrap();
        fixture.base_prices.insert(key, MonthPrices::new(8000));
        fixture.base_prices.get_mut(&key).unwrap().upsert(saturday.dotted(), 9500);
        fixture.weekend = WeekendDiscount { enabled: true, percent: 150.0 };

        assert_eq!(fixture.context().resolve(&saturday).price, 12000);
    }

    #[test]
    fn test_stored_price_then_default() {
        let mut fixture = Fixture::new();
        let stored = date(2025, 6, 11);
        let missing = date(2025, 6, 12);
        fixture
            .base_prices
            .entry(stored.month_key())
            .or_insert_with(|| MonthPrices::new(8000))
            .upsert(stored.dotted(), 9100);

        assert_eq!(
            fixture.context().resolve(&stored),
            Resolution { price: 9100, effect: PriceEffect::Stored }
        );
        assert_eq!(
            fixture.context().resolve(&missing),
            Resolution { price: 8000, effect: PriceEffect::Default }
        );
    }
}
