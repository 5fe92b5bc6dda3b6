//! Operator-editable substitution table for basins that failed to intersect.
//!
//! # Format
//!
//! One header line, then one comma-delimited line per basin:
//!
//! ```text
//! basin_id,aux_ids
//! 01100000,000
//! 01200000,31,32
//! ```
//!
//! A basin listed with only the special id receives a neutral effect.

use crate::{
    error::{GeoError, Result},
    join::JoinResult,
};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{info, warn};
use std::{
    collections::BTreeMap,
    io::{Read, Write},
    path::Path,
};

/// Default placeholder id meaning "no real auxiliary data".
pub const DEFAULT_SPECIAL_ID: &str = "000";

/// Header written as the first line of every fallback file.
pub const FALLBACK_HEADER: [&str; 2] = ["basin_id", "aux_ids"];

/// Mapping of basin identity to substitute auxiliary ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl FallbackTable {
    /// A table listing every basin of `unresolved` with just the special id.
    pub fn placeholder(unresolved: &JoinResult, special_id: &str) -> FallbackTable {
        FallbackTable {
            entries: unresolved
                .keys()
                .map(|basin| (basin.clone(), vec![special_id.to_string()]))
                .collect(),
        }
    }

    /// The matched basins of a join result, in the same line format.
    pub fn from_resolved(resolved: &JoinResult) -> FallbackTable {
        FallbackTable {
            entries: resolved
                .iter()
                .filter_map(|(basin, outcome)| outcome.ids().map(|ids| (basin.clone(), ids.to_vec())))
                .collect(),
        }
    }

    pub fn insert(&mut self, basin: String, ids: Vec<String>) -> Option<Vec<String>> {
        self.entries.insert(basin, ids)
    }

    pub fn get(&self, basin: &str) -> Option<&[String]> {
        self.entries.get(basin).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a fallback table.
    ///
    /// Blank lines are skipped. Any other line must carry a basin id and at
    /// least one auxiliary id, otherwise the whole read fails.
    pub fn from_reader<R: Read>(reader: R) -> Result<FallbackTable> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut table = FallbackTable::default();
        for result in rdr.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            if record.len() == 1 && record.get(0).is_some_and(str::is_empty) {
                continue;
            }
            let basin = match record.get(0) {
                Some(b) if !b.is_empty() => b.to_string(),
                _ => {
                    return Err(GeoError::FallbackParse {
                        line,
                        reason: "missing basin id".to_string(),
                    })
                }
            };
            let ids = record
                .iter()
                .skip(1)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect::<Vec<String>>();
            if ids.is_empty() {
                return Err(GeoError::FallbackParse {
                    line,
                    reason: format!("basin {basin} has no auxiliary ids"),
                });
            }
            if table.insert(basin.clone(), ids).is_some() {
                warn!("fallback table lists basin {basin} more than once; line {line} wins");
            }
        }
        Ok(table)
    }

    pub fn parse(text: &str) -> Result<FallbackTable> {
        FallbackTable::from_reader(text.as_bytes())
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().flexible(true).from_writer(writer);
        wtr.write_record(FALLBACK_HEADER)?;
        for (basin, ids) in &self.entries {
            let mut row = Vec::with_capacity(ids.len() + 1);
            row.push(basin.as_str());
            row.extend(ids.iter().map(String::as_str));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the table to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.to_writer(file)
    }
}

/// Read a fallback table from disk.
pub fn read_fallback<P: AsRef<Path>>(path: P) -> Result<FallbackTable> {
    let file = std::fs::File::open(path.as_ref())?;
    let table = FallbackTable::from_reader(file)?;
    info!(
        "read {} fallback entries from {}",
        table.len(),
        path.as_ref().display()
    );
    Ok(table)
}

/// Write a placeholder fallback table for every unresolved basin and return it.
pub fn write_fallback<P: AsRef<Path>>(
    path: P,
    unresolved: &JoinResult,
    special_id: &str,
) -> Result<FallbackTable> {
    let table = FallbackTable::placeholder(unresolved, special_id);
    table.save(path.as_ref())?;
    info!(
        "wrote {} unresolved basins to fallback table {}",
        table.len(),
        path.as_ref().display()
    );
    Ok(table)
}
