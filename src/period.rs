//! Calendar date ranges and the overlap test used by every period filter.
//!
//! DESIGN
//! ======
//! Ranges are inclusive on both ends. A range whose start falls after its end
//! is treated as empty: it overlaps nothing, so a reversed filter shows no
//! rows instead of a confusing partial list.

use time::Date;
use time::macros::format_description;

#[cfg(test)]
#[path = "period_test.rs"]
mod tests;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("invalid date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Inclusive calendar range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    #[must_use]
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// Build a range from two optional bounds; `None` unless both are set.
    #[must_use]
    pub fn from_bounds(start: Option<Date>, end: Option<Date>) -> Option<Self> {
        Some(Self::new(start?, end?))
    }

    /// Parse `YYYY-MM-DD` bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodError::InvalidDate`] for either malformed bound.
    pub fn parse(start: &str, end: &str) -> Result<Self, PeriodError> {
        Ok(Self::new(parse_date(start)?, parse_date(end)?))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        !self.is_empty() && self.start <= date && date <= self.end
    }

    /// True when the two ranges share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &DateRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start <= other.end && self.end >= other.start
    }
}

/// Parse a backend date. Accepts a bare `YYYY-MM-DD` or the date part of an
/// ISO timestamp (`YYYY-MM-DDTHH:MM:SS...`).
///
/// # Errors
///
/// Returns [`PeriodError::InvalidDate`] when the date part does not parse.
pub fn parse_date(raw: &str) -> Result<Date, PeriodError> {
    let format = format_description!("[year]-[month]-[day]");
    let trimmed = raw.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    Date::parse(date_part, &format).map_err(|_| PeriodError::InvalidDate(raw.to_owned()))
}

/// Render as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

/// Render as `dd/mm/yyyy`, the display format used on screens.
#[must_use]
pub fn format_date_fr(date: Date) -> String {
    format!("{:02}/{:02}/{:04}", date.day(), u8::from(date.month()), date.year())
}
