use crate::{
    error::Result,
    factors::{ApplicationMode, MonthlyFactorMap},
    series::TimeSeries,
};
use basin_utils::dates::month_of;
use chrono::Datelike;

/// Apply each value's calendar-month factor and return a new series.
///
/// The input is left untouched. No rounding is applied and NaN values stay
/// NaN. Fails when the series' dates and values differ in length.
pub fn apply<D: Datelike + Clone>(
    series: &TimeSeries<D>,
    factors: &MonthlyFactorMap,
    mode: ApplicationMode,
) -> Result<TimeSeries<D>> {
    series.check_lengths()?;
    let values = series
        .iter()
        .map(|(date, value)| mode.combine(value, factors.get(month_of(date))))
        .collect();
    Ok(TimeSeries {
        dates: series.dates.clone(),
        values,
    })
}
