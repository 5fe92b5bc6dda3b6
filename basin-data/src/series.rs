use crate::error::{DataError, Result};
use basin_utils::dates::{format_date, parse_date};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::warn;
use std::{
    io::{Read, Write},
    path::Path,
};

/// Parallel arrays of dates and values.
///
/// Dates may be any [`chrono::Datelike`] type (daily `NaiveDate` in practice,
/// `NaiveDateTime` for sub-daily data) and need not be sorted. The fields are
/// public so callers can assemble series freely; [`TimeSeries::check_lengths`]
/// guards every operation that pairs dates with values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<D = NaiveDate> {
    pub dates: Vec<D>,
    pub values: Vec<f64>,
}

impl<D> TimeSeries<D> {
    /// Build a series, failing if the arrays differ in length.
    pub fn new(dates: Vec<D>, values: Vec<f64>) -> Result<TimeSeries<D>> {
        let series = TimeSeries { dates, values };
        series.check_lengths()?;
        Ok(series)
    }

    pub fn check_lengths(&self) -> Result<()> {
        if self.dates.len() == self.values.len() {
            Ok(())
        } else {
            Err(DataError::LengthMismatch {
                dates: self.dates.len(),
                values: self.values.len(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&D, f64)> {
        self.dates.iter().zip(self.values.iter().copied())
    }
}

impl TimeSeries<NaiveDate> {
    /// Parse `date,value` CSV with a header. Dates are `YYYY-MM-DD`; empty or
    /// non-numeric values become NaN with a warning.
    pub fn from_reader<R: Read>(reader: R, name: &str) -> Result<TimeSeries<NaiveDate>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut dates = Vec::new();
        let mut values = Vec::new();
        for result in rdr.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let date_str = record.get(0).unwrap_or_default();
            if record.len() == 1 && date_str.is_empty() {
                continue;
            }
            let date = parse_date(date_str).map_err(|_| DataError::DateParse {
                line,
                value: date_str.to_string(),
            })?;
            let value_str = record.get(1).unwrap_or_default();
            let value = match value_str.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    warn!("{name} line {line}: value {value_str:?} is not numeric, using NaN");
                    f64::NAN
                }
            };
            dates.push(date);
            values.push(value);
        }
        Ok(TimeSeries { dates, values })
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        self.check_lengths()?;
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(["date", "value"])?;
        for (date, value) in self.iter() {
            let value = if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            };
            wtr.write_record([format_date(date), value])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Read a daily `date,value` series from disk.
pub fn read_series<P: AsRef<Path>>(path: P) -> Result<TimeSeries<NaiveDate>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    TimeSeries::from_reader(file, &path.display().to_string())
}

/// Write a daily series as `date,value` CSV; NaN values are written empty.
pub fn write_series<P: AsRef<Path>>(path: P, series: &TimeSeries<NaiveDate>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    series.to_writer(file)
}
