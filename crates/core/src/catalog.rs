//! Filter and pagination model for the catalog query surface.
//!
//! The HTTP layer parses request parameters into an [`EventFilter`]; the
//! database layer turns it into a WHERE clause. Keyword resolution (date
//! windows, price brackets) happens here so it stays independently testable.

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::event::CategoryId;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Relative date window selected by a fixed keyword. Every window starts at
/// the supplied `today`; unknown keywords are ignored by the caller rather
/// than rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateWindow {
    Today,
    ThisWeek,
    ThisMonth,
    #[serde(rename = "within-2-weeks")]
    WithinTwoWeeks,
    #[serde(rename = "within-1-month")]
    WithinOneMonth,
}

impl DateWindow {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "this-week" => Some(Self::ThisWeek),
            "this-month" => Some(Self::ThisMonth),
            "within-2-weeks" => Some(Self::WithinTwoWeeks),
            "within-1-month" => Some(Self::WithinOneMonth),
            _ => None,
        }
    }

    /// Inclusive `(start, end)` bounds. `this-week` runs to the next-or-same
    /// Sunday, `this-month` to the last day of the current month.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = match self {
            Self::Today => today,
            Self::ThisWeek => next_or_same_sunday(today),
            Self::ThisMonth => last_day_of_month(today),
            Self::WithinTwoWeeks => today.checked_add_days(Days::new(14)).unwrap_or(today),
            Self::WithinOneMonth => today.checked_add_months(Months::new(1)).unwrap_or(today),
        };
        (today, end)
    }
}

fn next_or_same_sunday(date: NaiveDate) -> NaiveDate {
    let days_ahead = (7 - date.weekday().num_days_from_sunday()) % 7;
    date.checked_add_days(Days::new(days_ahead as u64)).unwrap_or(date)
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next_month| next_month.pred_opt())
        .unwrap_or(date)
}

/// Headline-price bracket selected by a fixed keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceBracket {
    Free,
    #[serde(rename = "under-30")]
    UnderThirty,
    #[serde(rename = "between-30-and-100")]
    ThirtyToHundred,
    #[serde(rename = "over-100")]
    OverHundred,
}

impl PriceBracket {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "under-30" => Some(Self::UnderThirty),
            "between-30-and-100" => Some(Self::ThirtyToHundred),
            "over-100" => Some(Self::OverHundred),
            _ => None,
        }
    }

    pub fn bounds(&self) -> (Option<Decimal>, Option<Decimal>) {
        match self {
            Self::Free => (Some(Decimal::ZERO), Some(Decimal::ZERO)),
            Self::UnderThirty => (None, Some(Decimal::from(30))),
            Self::ThirtyToHundred => (Some(Decimal::from(30)), Some(Decimal::from(100))),
            Self::OverHundred => (Some(Decimal::from(100)), None),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EventFilter {
    pub categories: Vec<CategoryId>,
    pub date: Option<DateWindow>,
    pub price: Option<PriceBracket>,
    pub search: Option<String>,
    pub location: Option<String>,
}

impl EventFilter {
    /// Drops blank search/location strings so the query layer only sees
    /// filters that actually constrain something.
    pub fn normalized(mut self) -> Self {
        self.search = self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self.location = self.location.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.categories.is_empty()
            && self.date.is_none()
            && self.price.is_none()
            && self.search.is_none()
            && self.location.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PER_PAGE }
    }
}

impl PageRequest {
    /// 1-based page, per-page clamped to `1..=MAX_PER_PAGE`.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page: page.max(1), per_page: per_page.clamp(1, MAX_PER_PAGE) }
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.per_page as u64);
        Self { items, page: request.page, per_page: request.per_page, total_items, total_pages }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{DateWindow, EventFilter, Page, PageRequest, PriceBracket};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn today_window_is_a_single_day() {
        let today = date(2026, 8, 7);
        assert_eq!(DateWindow::Today.bounds(today), (today, today));
    }

    #[test]
    fn this_week_ends_next_or_same_sunday() {
        // 2026-08-07 is a Friday; the following Sunday is the 9th.
        assert_eq!(DateWindow::ThisWeek.bounds(date(2026, 8, 7)).1, date(2026, 8, 9));
        // A Sunday maps to itself.
        assert_eq!(DateWindow::ThisWeek.bounds(date(2026, 8, 9)).1, date(2026, 8, 9));
    }

    #[test]
    fn this_month_ends_at_month_border() {
        assert_eq!(DateWindow::ThisMonth.bounds(date(2026, 8, 7)).1, date(2026, 8, 31));
        assert_eq!(DateWindow::ThisMonth.bounds(date(2026, 2, 1)).1, date(2026, 2, 28));
        assert_eq!(DateWindow::ThisMonth.bounds(date(2028, 2, 10)).1, date(2028, 2, 29));
    }

    #[test]
    fn rolling_windows_add_their_span() {
        assert_eq!(DateWindow::WithinTwoWeeks.bounds(date(2026, 8, 7)).1, date(2026, 8, 21));
        assert_eq!(DateWindow::WithinOneMonth.bounds(date(2026, 8, 31)).1, date(2026, 9, 30));
    }

    #[test]
    fn unknown_keywords_parse_to_none() {
        assert_eq!(DateWindow::parse("next-year"), None);
        assert_eq!(DateWindow::parse("This-Week"), Some(DateWindow::ThisWeek));
        assert_eq!(PriceBracket::parse("cheap"), None);
        assert_eq!(PriceBracket::parse("FREE"), Some(PriceBracket::Free));
    }

    #[test]
    fn price_brackets_resolve_documented_bounds() {
        assert_eq!(PriceBracket::Free.bounds(), (Some(Decimal::ZERO), Some(Decimal::ZERO)));
        assert_eq!(PriceBracket::UnderThirty.bounds(), (None, Some(Decimal::from(30))));
        assert_eq!(
            PriceBracket::ThirtyToHundred.bounds(),
            (Some(Decimal::from(30)), Some(Decimal::from(100)))
        );
        assert_eq!(PriceBracket::OverHundred.bounds(), (Some(Decimal::from(100)), None));
    }

    #[test]
    fn blank_search_terms_are_dropped() {
        let filter = EventFilter {
            search: Some("   ".to_string()),
            location: Some(" Berlin ".to_string()),
            ..EventFilter::default()
        }
        .normalized();

        assert_eq!(filter.search, None);
        assert_eq!(filter.location.as_deref(), Some("Berlin"));
        assert!(!filter.is_unfiltered());
    }

    #[test]
    fn page_requests_clamp_and_paginate() {
        let request = PageRequest::new(0, 500);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, super::MAX_PER_PAGE);

        let request = PageRequest::new(3, 10);
        assert_eq!(request.offset(), 20);

        let page = Page::new(vec![1, 2, 3], request, 23);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
    }
}
