//! Shared utility functions for the basin crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, Month, NaiveDate};

    /// Calendar months in January..December order.
    pub const MONTHS: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Calendar month of any date-like value.
    pub fn month_of<D: Datelike>(date: &D) -> Month {
        MONTHS[date.month0() as usize]
    }

    /// Zero-based position of a month (January = 0).
    pub fn month_index(month: Month) -> usize {
        month.number_from_month() as usize - 1
    }

    /// Resolve a month from its full name or three-letter abbreviation,
    /// ignoring case and surrounding whitespace.
    pub fn month_from_name(name: &str) -> Option<Month> {
        let lowered = name.trim().to_lowercase();
        if lowered.len() < 3 {
            return None;
        }
        MONTHS.iter().copied().find(|month| {
            let full = month.name().to_lowercase();
            full == lowered || (lowered.len() == 3 && full.starts_with(&lowered))
        })
    }

}

/// Physical unit conversions.
///
/// Each conversion is a fixed scalar multiplication; the constants are part of
/// the public contract.
pub mod units {
    use crate::error::UnitError;

    /// Square metres in one square mile.
    pub const M2_PER_MI2: f64 = 2_589_988.110336;

    /// Square metres in one square kilometre.
    pub const M2_PER_KM2: f64 = 1_000_000.0;

    /// Cubic feet in one US gallon.
    pub const FT3_PER_GAL: f64 = 0.133681;

    /// Seconds in one day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;

    /// 1 Mgal/day = 1,000,000 x 0.133681 / 86,400 ft3/s (about 1.5472 ft3/s).
    pub const CFS_PER_MGD: f64 = 1_000_000.0 * FT3_PER_GAL / SECONDS_PER_DAY;

    /// Cubic feet in one cubic metre.
    pub const FT3_PER_M3: f64 = 35.314_666_7;

    pub fn to_mi2(area_m2: f64) -> f64 {
        area_m2 / M2_PER_MI2
    }

    pub fn mi2_to_m2(area_mi2: f64) -> f64 {
        area_mi2 * M2_PER_MI2
    }

    pub fn to_km2(area_m2: f64) -> f64 {
        area_m2 / M2_PER_KM2
    }

    /// Million gallons per day to cubic feet per second.
    pub fn to_cfs(mgal_per_day: f64) -> f64 {
        mgal_per_day * CFS_PER_MGD
    }

    /// Cubic feet per second to million gallons per day.
    pub fn cfs_to_mgd(cfs: f64) -> f64 {
        cfs / CFS_PER_MGD
    }

    /// Cubic metres per second to cubic feet per second.
    pub fn cms_to_cfs(cms: f64) -> f64 {
        cms * FT3_PER_M3
    }

    /// Parse a textual quantity and convert it, failing fast on non-numeric input.
    pub fn convert_str(value: &str, conversion: fn(f64) -> f64) -> Result<f64, UnitError> {
        let trimmed = value.trim();
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(conversion(v)),
            _ => Err(UnitError(format!("not a finite number: {trimmed:?}"))),
        }
    }

}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug)]
    pub struct UnitError(pub String);

    impl fmt::Display for UnitError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Unit conversion error: {}", self.0)
        }
    }

    impl std::error::Error for UnitError {}
}
