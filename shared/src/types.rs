//! Common types used across the platform

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Limit/offset pagination as accepted by the list endpoints
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Pagination {
    /// Build a page from optional query values, capping the limit at `max`
    pub fn from_query(limit: Option<u32>, offset: Option<u32>, default: u32, max: u32) -> Self {
        let limit = limit.unwrap_or(default).clamp(1, max.max(1));
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

/// Inclusive calendar-day range used by the history filters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Lower bound, start of `from`
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.from
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// Exclusive upper bound, start of the day after `to`
    pub fn end_exclusive(&self) -> Option<DateTime<Utc>> {
        self.to
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start().map_or(true, |s| at >= s) && self.end_exclusive().map_or(true, |e| at < e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn pagination_caps_limit() {
        let page = Pagination::from_query(Some(500), None, 10, 100);
        assert_eq!(page.limit, 100);
        assert_eq!(page.offset, 0);

        let page = Pagination::from_query(None, Some(20), 50, 100);
        assert_eq!(page.limit, 50);
        assert_eq!(page.offset, 20);
    }

    #[test]
    fn date_range_includes_whole_end_day() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 3, 1),
            to: NaiveDate::from_ymd_opt(2024, 3, 2),
        };

        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 2, 23, 59, 59).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 2, 29, 23, 0, 0).unwrap()));
    }

    #[test]
    fn open_range_contains_everything() {
        let range = DateRange::default();
        assert!(range.contains(Utc::now()));
    }
}
