use crate::error::{DataError, Result};
use basin_utils::dates::{month_from_name, month_index, MONTHS};
use chrono::Month;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    io::{Read, Write},
};

/// How a monthly factor combines with a series value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationMode {
    /// `value * factor`; identity 1.0
    Multiplicative,
    /// `value + factor`; identity 0.0
    Additive,
}

impl ApplicationMode {
    pub fn identity(self) -> f64 {
        match self {
            ApplicationMode::Multiplicative => 1.0,
            ApplicationMode::Additive => 0.0,
        }
    }

    pub fn combine(self, value: f64, factor: f64) -> f64 {
        match self {
            ApplicationMode::Multiplicative => value * factor,
            ApplicationMode::Additive => value + factor,
        }
    }
}

/// Twelve named monthly scalars, January through December.
///
/// Every month always has a value; months never assigned hold the identity of
/// the application mode the map was created for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyFactorMap {
    values: [f64; 12],
}

impl MonthlyFactorMap {
    pub fn identity(mode: ApplicationMode) -> MonthlyFactorMap {
        MonthlyFactorMap {
            values: [mode.identity(); 12],
        }
    }

    pub fn from_values(values: [f64; 12]) -> MonthlyFactorMap {
        MonthlyFactorMap { values }
    }

    pub fn get(&self, month: Month) -> f64 {
        self.values[month_index(month)]
    }

    /// Look up by full English month name or three-letter abbreviation.
    pub fn by_name(&self, name: &str) -> Option<f64> {
        month_from_name(name).map(|month| self.get(month))
    }

    pub fn set(&mut self, month: Month, value: f64) {
        self.values[month_index(month)] = value;
    }

    pub fn values(&self) -> &[f64; 12] {
        &self.values
    }

    /// (month, value) pairs in calendar order.
    pub fn iter(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        MONTHS.iter().copied().zip(self.values.iter().copied())
    }

    /// A new map with `f` applied to every month.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> MonthlyFactorMap {
        MonthlyFactorMap {
            values: self.values.map(f),
        }
    }

    pub fn is_identity(&self, mode: ApplicationMode) -> bool {
        self.values.iter().all(|v| *v == mode.identity())
    }
}

/// Write `basin,January,...,December` rows for every basin.
pub fn write_factor_table<W: Write>(
    writer: W,
    factors: &BTreeMap<String, MonthlyFactorMap>,
) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    let mut header = vec!["basin"];
    header.extend(MONTHS.iter().map(|m| m.name()));
    wtr.write_record(&header)?;
    for (basin, map) in factors {
        let mut row = vec![basin.clone()];
        row.extend(map.values().iter().map(|v| v.to_string()));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a table produced by [`write_factor_table`].
///
/// Months missing from the header keep `mode`'s identity; unparsable cells
/// are NaN.
pub fn read_factor_table<R: Read>(
    reader: R,
    mode: ApplicationMode,
) -> Result<BTreeMap<String, MonthlyFactorMap>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let columns = rdr
        .headers()?
        .iter()
        .skip(1)
        .map(|h| month_from_name(h).ok_or_else(|| DataError::UnknownMonth(h.to_string())))
        .collect::<Result<Vec<Month>>>()?;

    let mut table = BTreeMap::new();
    for result in rdr.records() {
        let record = result?;
        let basin = record.get(0).unwrap_or_default().to_string();
        let mut map = MonthlyFactorMap::identity(mode);
        for (month, cell) in columns.iter().zip(record.iter().skip(1)) {
            let value = match cell.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    warn!(
                        "factor table: basin {basin}, {}: {cell:?} is not a number, using NaN",
                        month.name()
                    );
                    f64::NAN
                }
            };
            map.set(*month, value);
        }
        table.insert(basin, map);
    }
    Ok(table)
}
