//! The `yyyymmdd` token embedded in every artifact file name.

use std::fmt;

use chrono::{Local, NaiveDate};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// An observation date, rendered as `yyyymmdd` in file names.
pub struct DateStamp(NaiveDate);

impl DateStamp {
    /// Parses exactly eight ASCII digits that form a real calendar date.
    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PipelineError::InvalidDate(s.to_string()));
        }

        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(DateStamp)
            .map_err(|_| PipelineError::InvalidDate(s.to_string()))
    }

    pub fn today() -> Self {
        DateStamp(Local::now().date_naive())
    }

    /// `20250801`
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// `2025-08-01`
    pub fn dashed(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compact())
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_accept_compact_date() {
        let d = DateStamp::parse("20250801").unwrap();
        assert_eq!(d.compact(), "20250801");
        assert_eq!(d.dashed(), "2025-08-01");
    }

    #[test]
    fn should_reject_dashed_date() {
        assert!(DateStamp::parse("2025-08-01").is_err());
    }

    #[test]
    fn should_reject_seven_digits() {
        assert!(DateStamp::parse("2025080").is_err());
        assert!(DateStamp::parse("202508011").is_err());
    }

    #[test]
    fn should_reject_impossible_date() {
        assert!(DateStamp::parse("20250231").is_err());
        assert!(DateStamp::parse("2025080a").is_err());
    }

    #[test]
    fn should_accept_leap_day() {
        let d = DateStamp::parse("20240229").unwrap();
        assert_eq!(d.to_string(), "20240229");
    }
}
