//! Budget period value type.
//!
//! A period is the "MM-YYYY" string tagging the month a budget applies to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned for malformed period strings.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid budget period: {0} (expected MM-YYYY)")]
pub struct PeriodParseError(pub String);

/// A budget period in "MM-YYYY" form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    /// Calendar year.
    pub year: u16,
    /// Month, 1-12.
    pub month: u8,
}

impl Period {
    /// Creates a period, validating the month.
    pub fn new(month: u8, year: u16) -> Result<Self, PeriodParseError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodParseError(format!("{month:02}-{year:04}")));
        }
        Ok(Self { year, month })
    }
}

impl FromStr for Period {
    type Err = PeriodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PeriodParseError(s.to_string());
        let (month, year) = s.split_once('-').ok_or_else(err)?;
        if month.len() != 2 || year.len() != 4 {
            return Err(err());
        }
        let month: u8 = month.parse().map_err(|_| err())?;
        let year: u16 = year.parse().map_err(|_| err())?;
        Self::new(month, year).map_err(|_| err())
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("01-2026", 1, 2026)]
    #[case("12-1999", 12, 1999)]
    fn test_parse_valid(#[case] input: &str, #[case] month: u8, #[case] year: u16) {
        let period: Period = input.parse().unwrap();
        assert_eq!(period.month, month);
        assert_eq!(period.year, year);
        assert_eq!(period.to_string(), input);
    }

    #[rstest]
    #[case("13-2026")]
    #[case("00-2026")]
    #[case("1-2026")]
    #[case("01-26")]
    #[case("2026-01")]
    #[case("garbage")]
    fn test_parse_invalid(#[case] input: &str) {
        assert!(input.parse::<Period>().is_err());
    }

    #[test]
    fn test_ordering() {
        let a: Period = "12-2025".parse().unwrap();
        let b: Period = "01-2026".parse().unwrap();
        assert!(a < b);
    }
}
