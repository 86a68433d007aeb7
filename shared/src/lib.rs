use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fallback nightly price used when neither the page nor storage provide one
pub const DEFAULT_COST: u32 = 8000;

/// Number of fixed day slots in the month grid (6 weeks x 7 days)
pub const GRID_SLOTS: usize = 42;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Days between 0001-01-01 (day 1 of the common era) and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Get the English month name for a month number (1-12)
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month.checked_sub(1)? as usize).copied()
}

/// Get the month number (1-12) for an English month name
pub fn month_from_name(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|candidate| *candidate == name)
        .map(|index| index as u32 + 1)
}

/// Errors raised while parsing the text formats exchanged with the page and storage
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateParseError {
    #[error("invalid DD.MM.YYYY date: {0}")]
    InvalidDottedDate(String),
    #[error("invalid ISO date: {0}")]
    InvalidIsoDate(String),
    #[error("invalid month key: {0}")]
    InvalidMonthKey(String),
    #[error("invalid month/year label: {0}")]
    InvalidLabel(String),
    #[error("date does not exist: {year}-{month:02}-{day:02}")]
    NonexistentDate { year: i32, month: u32, day: u32 },
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// A single calendar day.
///
/// The timestamp is milliseconds since the Unix epoch at UTC midnight of the
/// day, and is the key used for equality, ordering and every per-date map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "CalendarDateRecord")]
pub struct CalendarDate {
    timestamp: i64,
    year: i32,
    month: u32,
    day: u32,
}

#[derive(Deserialize)]
struct CalendarDateRecord {
    year: i32,
    month: u32,
    day: u32,
}

impl TryFrom<CalendarDateRecord> for CalendarDate {
    type Error = DateParseError;

    fn try_from(record: CalendarDateRecord) -> Result<Self, Self::Error> {
        CalendarDate::new(record.year, record.month, record.day).ok_or(
            DateParseError::NonexistentDate {
                year: record.year,
                month: record.month,
                day: record.day,
            },
        )
    }
}

impl CalendarDate {
    /// Build a date from its parts; `None` when the day does not exist
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from_naive)
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        let days = i64::from(date.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE;
        Self {
            timestamp: days * MILLIS_PER_DAY,
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// Rebuild a date from a midnight timestamp (any time within the day maps to that day)
    pub fn from_timestamp(timestamp: i64) -> Option<Self> {
        let days = timestamp.div_euclid(MILLIS_PER_DAY) + UNIX_EPOCH_DAYS_FROM_CE;
        let days = i32::try_from(days).ok()?;
        NaiveDate::from_num_days_from_ce_opt(days).map(Self::from_naive)
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn naive(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).unwrap_or_default()
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey { year: self.year, month: self.month }
    }

    /// Saturday or Sunday
    pub fn is_weekend(&self) -> bool {
        matches!(self.naive().weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// The following calendar day
    pub fn succ(&self) -> Option<Self> {
        self.naive().succ_opt().map(Self::from_naive)
    }

    /// Format as `DD.MM.YYYY`
    pub fn dotted(&self) -> String {
        format!("{:02}.{:02}.{}", self.day, self.month, self.year)
    }

    /// Format as `YYYY-MM-DD`
    pub fn iso(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// Parse a `DD.MM.YYYY` date
    pub fn parse_dotted(text: &str) -> Result<Self, DateParseError> {
        let invalid = || DateParseError::InvalidDottedDate(text.to_string());
        let mut parts = text.trim().split('.');
        let (Some(day), Some(month), Some(year), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let day = day.parse::<u32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        Self::new(year, month, day).ok_or(DateParseError::NonexistentDate { year, month, day })
    }

    /// Parse a `YYYY-MM-DD` date; a trailing time part (`T...`) is ignored
    pub fn parse_iso(text: &str) -> Result<Self, DateParseError> {
        let date_part = text.trim().split('T').next().unwrap_or_default();
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map(Self::from_naive)
            .map_err(|_| DateParseError::InvalidIsoDate(text.to_string()))
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

/// An inclusive range of days; `start <= end` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: CalendarDate,
    end: CalendarDate,
}

impl DateRange {
    /// Build a range from two endpoints picked in any order
    pub fn new(first: CalendarDate, second: CalendarDate) -> Self {
        if first.timestamp() <= second.timestamp() {
            Self { start: first, end: second }
        } else {
            Self { start: second, end: first }
        }
    }

    pub fn start(&self) -> CalendarDate {
        self.start
    }

    pub fn end(&self) -> CalendarDate {
        self.end
    }

    pub fn contains(&self, date: &CalendarDate) -> bool {
        self.contains_timestamp(date.timestamp())
    }

    pub fn contains_timestamp(&self, timestamp: i64) -> bool {
        timestamp >= self.start.timestamp() && timestamp <= self.end.timestamp()
    }

    /// Every day of the range, in order
    pub fn days(&self) -> impl Iterator<Item = CalendarDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |date| {
            date.succ().filter(|next| next.timestamp() <= end.timestamp())
        })
    }
}

/// Identifies one displayed month; serialized as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn month_name(&self) -> &'static str {
        month_name(self.month).unwrap_or("January")
    }

    /// The `"<FullMonthName> <Year>"` label shown above the grid
    pub fn label(&self) -> String {
        format!("{} {}", self.month_name(), self.year)
    }

    /// Parse a `"<FullMonthName> <Year>"` label
    pub fn parse_label(text: &str) -> Result<Self, DateParseError> {
        let invalid = || DateParseError::InvalidLabel(text.to_string());
        let mut parts = text.split_whitespace();
        let (Some(name), Some(year), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };
        let month = month_from_name(name).ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        Ok(Self { year, month })
    }

    pub fn first_day(&self) -> CalendarDate {
        CalendarDate::new(self.year, self.month, 1)
            .unwrap_or_else(|| CalendarDate::from_naive(NaiveDate::default()))
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month {
            2 => {
                if is_leap_year(self.year) {
                    29
                } else {
                    28
                }
            }
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// Every real day of the month, in order
    pub fn dates(&self) -> impl Iterator<Item = CalendarDate> {
        let key = *self;
        (1..=self.days_in_month()).filter_map(move |day| CalendarDate::new(key.year, key.month, day))
    }

    pub fn date(&self, day: u32) -> Option<CalendarDate> {
        CalendarDate::new(self.year, self.month, day)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }
}

/// Gregorian leap year rule
pub fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = DateParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || DateParseError::InvalidMonthKey(text.to_string());
        let (year, month) = text.split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = DateParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

// ---------------------------------------------------------------------------
// Price records
// ---------------------------------------------------------------------------

/// One stored per-date price; the date is `DD.MM.YYYY`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub date: String,
    pub price: u32,
}

/// The per-date price record of one month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthPrices {
    #[serde(default)]
    pub prices: Vec<PriceEntry>,
    #[serde(default = "default_cost")]
    pub default_cost: u32,
}

fn default_cost() -> u32 {
    DEFAULT_COST
}

impl MonthPrices {
    pub fn new(default_cost: u32) -> Self {
        Self { prices: Vec::new(), default_cost }
    }

    /// Stored price for a `DD.MM.YYYY` date
    pub fn price_for(&self, date: &str) -> Option<u32> {
        self.prices.iter().find(|entry| entry.date == date).map(|entry| entry.price)
    }

    pub fn contains(&self, date: &str) -> bool {
        self.prices.iter().any(|entry| entry.date == date)
    }

    /// Update the entry for a date, appending it when missing
    pub fn upsert(&mut self, date: String, price: u32) {
        match self.prices.iter_mut().find(|entry| entry.date == date) {
            Some(entry) => entry.price = price,
            None => self.prices.push(PriceEntry { date, price }),
        }
    }
}

/// A date marked unavailable; always resolves to price 0.
///
/// Older stored data held bare `"DD.MM.YYYY"` strings instead of records,
/// both shapes deserialize into this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredBlockedDate")]
pub struct BlockedDate {
    pub date: String,
    pub price: u32,
}

impl BlockedDate {
    pub fn new(date: &CalendarDate) -> Self {
        Self { date: date.dotted(), price: 0 }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredBlockedDate {
    Bare(String),
    Record {
        date: String,
        #[serde(default)]
        #[allow(dead_code)]
        price: Option<u32>,
    },
}

impl From<StoredBlockedDate> for BlockedDate {
    fn from(stored: StoredBlockedDate) -> Self {
        let date = match stored {
            StoredBlockedDate::Bare(date) => date,
            StoredBlockedDate::Record { date, .. } => date,
        };
        Self { date, price: 0 }
    }
}

/// Settings shared by every month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub default_cost: u32,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self { default_cost: DEFAULT_COST }
    }
}

/// Standing Saturday/Sunday discount
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeekendDiscount {
    pub enabled: bool,
    pub percent: f64,
}

impl WeekendDiscount {
    /// Whether the rule currently changes any price
    pub fn is_active(&self) -> bool {
        self.enabled && self.percent > 0.0
    }
}

/// One row of the remote `available_periods` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub id: String,
    pub service_id: String,
    /// ISO-8601 date (`YYYY-MM-DD`)
    pub date: String,
    pub price: u32,
}

// ---------------------------------------------------------------------------
// Rendering projection
// ---------------------------------------------------------------------------

/// Visual state of a grid cell; each maps to one CSS class on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellTag {
    /// Slot has no real day in the displayed month
    NotExist,
    Past,
    Blocked,
    LoadedFromRemote,
    /// Inside a confirmed range and not excluded
    Selected,
    /// Carries an explicit per-date discount
    Active,
    /// Pending range anchor
    Waiting,
    /// Inside the hover preview of a pending range
    HoverRange,
    WeekendDiscount,
}

impl CellTag {
    pub const ALL: [CellTag; 9] = [
        CellTag::NotExist,
        CellTag::Past,
        CellTag::Blocked,
        CellTag::LoadedFromRemote,
        CellTag::Selected,
        CellTag::Active,
        CellTag::Waiting,
        CellTag::HoverRange,
        CellTag::WeekendDiscount,
    ];

    /// CSS class carried by the cell wrapper
    pub fn css_class(&self) -> &'static str {
        match self {
            CellTag::NotExist => "not_exist",
            CellTag::Past => "is-past",
            CellTag::Blocked => "is-blocked",
            CellTag::LoadedFromRemote => "is-database-loaded",
            CellTag::Selected => "is-selected",
            CellTag::Active => "is-active",
            CellTag::Waiting => "is-wait",
            CellTag::HoverRange => "is-hover-range",
            CellTag::WeekendDiscount => "is-weekend-discount",
        }
    }
}

/// One of the 42 grid slots as it should be displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    pub slot: usize,
    /// Day of month, `None` for slots outside the month
    pub day: Option<u32>,
    /// Displayed price, `None` when the price is hidden
    pub price: Option<u32>,
    pub tags: Vec<CellTag>,
}

impl CellView {
    pub fn has(&self, tag: CellTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Everything needed to paint the displayed month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub key: MonthKey,
    pub label: String,
    pub can_go_back: bool,
    pub cells: Vec<CellView>,
}

impl MonthView {
    /// Cell holding a given day of the month
    pub fn cell_for_day(&self, day: u32) -> Option<&CellView> {
        self.cells.iter().find(|cell| cell.day == Some(day))
    }
}

/// Full state dump handed to the host page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSnapshot {
    pub base_prices: BTreeMap<MonthKey, MonthPrices>,
    pub blocked_dates: BTreeMap<MonthKey, Vec<BlockedDate>>,
    pub date_ranges: Vec<DateRange>,
    pub excluded_days: Vec<i64>,
    pub date_discounts: BTreeMap<i64, u32>,
    pub weekend_discount: WeekendDiscount,
    pub default_cost: u32,
    pub service_id: Option<String>,
    pub is_edit_mode: bool,
    pub is_initialized: bool,
}
