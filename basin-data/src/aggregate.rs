//! Monthly aggregation of per-feature values into one factor map per basin.

use crate::{factors::MonthlyFactorMap, variable::AggregationMode, variable::Variable};
use basin_utils::dates::{month_index, MONTHS};
use chrono::Month;
use log::{debug, warn};
use std::collections::HashSet;

/// One auxiliary feature's twelve monthly values; NaN marks missing data.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyValueRow {
    pub id: String,
    pub values: [f64; 12],
}

impl MonthlyValueRow {
    pub fn new(id: &str, values: [f64; 12]) -> MonthlyValueRow {
        MonthlyValueRow {
            id: id.to_string(),
            values,
        }
    }

    pub fn value(&self, month: Month) -> f64 {
        self.values[month_index(month)]
    }
}

/// Rows from one source file together with the months that file defines.
///
/// A full table defines all twelve months; a seasonal (quarterly) file
/// defines three.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySource {
    pub name: String,
    pub months: Vec<Month>,
    pub rows: Vec<MonthlyValueRow>,
    /// Cells replaced with NaN while reading.
    pub substitutions: usize,
}

impl MonthlySource {
    /// A copy with `f` applied to every cell; NaN cells stay NaN.
    pub fn map_values<F: Fn(f64) -> f64>(&self, f: F) -> MonthlySource {
        MonthlySource {
            name: self.name.clone(),
            months: self.months.clone(),
            substitutions: self.substitutions,
            rows: self
                .rows
                .iter()
                .map(|row| MonthlyValueRow {
                    id: row.id.clone(),
                    values: row.values.map(|v| if v.is_nan() { v } else { f(v) }),
                })
                .collect(),
        }
    }
}

fn is_special(ids: &[String], special_id: Option<&str>) -> bool {
    match (ids, special_id) {
        ([only], Some(special)) => only == special,
        _ => false,
    }
}

fn aggregate_months(
    rows: &[MonthlyValueRow],
    ids: &[String],
    variable: &Variable,
    months: &[Month],
    factors: &mut MonthlyFactorMap,
) {
    let wanted = ids.iter().map(String::as_str).collect::<HashSet<&str>>();
    let selected = rows
        .iter()
        .filter(|row| wanted.contains(row.id.as_str()))
        .collect::<Vec<_>>();
    if selected.is_empty() {
        warn!("{}: none of ids {:?} have source rows", variable.name, ids);
    }

    for &month in months {
        let contributing = selected
            .iter()
            .map(|row| row.value(month))
            .filter(|v| !v.is_nan())
            .collect::<Vec<f64>>();
        if contributing.is_empty() {
            debug!(
                "{}: no data for {}, keeping identity",
                variable.name,
                month.name()
            );
            factors.set(month, variable.application.identity());
            continue;
        }
        let total = contributing.iter().sum::<f64>();
        let value = match variable.aggregation {
            AggregationMode::Sum => total,
            AggregationMode::Mean => total / contributing.len() as f64,
        };
        factors.set(month, value);
    }
}

/// Aggregate the rows whose id is in `ids` into a twelve-month factor map.
///
/// NaN cells are excluded per month. A month with no contributing value keeps
/// the identity of the variable's application mode. When `ids` is exactly
/// `[special_id]` no lookup happens and the identity map is returned.
/// Rows are reduced in `rows` order, so the result does not depend on the
/// order of `ids`.
pub fn aggregate(
    rows: &[MonthlyValueRow],
    ids: &[String],
    variable: &Variable,
    special_id: Option<&str>,
) -> MonthlyFactorMap {
    let mut factors = MonthlyFactorMap::identity(variable.application);
    if is_special(ids, special_id) {
        debug!("{}: special id, neutral factors", variable.name);
        return factors;
    }
    aggregate_months(rows, ids, variable, &MONTHS, &mut factors);
    factors
}

/// Aggregate across several source files, each defining some of the months.
///
/// Sources are processed in the given order; when two sources define the same
/// month the later one's value is kept.
pub fn aggregate_seasonal(
    sources: &[MonthlySource],
    ids: &[String],
    variable: &Variable,
    special_id: Option<&str>,
) -> MonthlyFactorMap {
    let mut factors = MonthlyFactorMap::identity(variable.application);
    if is_special(ids, special_id) {
        debug!("{}: special id, neutral factors", variable.name);
        return factors;
    }
    let mut claimed: [Option<&str>; 12] = [None; 12];
    for source in sources {
        for month in &source.months {
            if let Some(previous) = claimed[month_index(*month)] {
                warn!(
                    "{}: {} from {} overrides {}",
                    variable.name,
                    month.name(),
                    source.name,
                    previous
                );
            }
            claimed[month_index(*month)] = Some(source.name.as_str());
        }
        aggregate_months(&source.rows, ids, variable, &source.months, &mut factors);
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{factors::ApplicationMode, variable};

    const NAN: f64 = f64::NAN;

    fn row(id: &str, first: &[f64]) -> MonthlyValueRow {
        let mut values = [NAN; 12];
        values[..first.len()].copy_from_slice(first);
        MonthlyValueRow::new(id, values)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn water_use() -> Variable {
        Variable::known(variable::WATER_USE).unwrap()
    }

    fn precipitation() -> Variable {
        Variable::known(variable::PRECIPITATION).unwrap()
    }

    #[test]
    fn test_nan_aware_sum() {
        let rows = vec![row("a", &[1.0, NAN]), row("b", &[3.0, 5.0])];
        let factors = aggregate(&rows, &ids(&["a", "b"]), &water_use(), None);
        assert_eq!(factors.get(Month::January), 4.0);
        assert_eq!(factors.get(Month::February), 5.0);
        // No data at all for March: additive identity.
        assert_eq!(factors.get(Month::March), 0.0);
    }

    #[test]
    fn test_mean_over_tiles() {
        let rows = vec![
            row("11", &[1.1, 0.9]),
            row("21", &[1.3, NAN]),
            row("99", &[5.0, 5.0]),
        ];
        let factors = aggregate(&rows, &ids(&["11", "21"]), &precipitation(), None);
        assert!((factors.get(Month::January) - 1.2).abs() < 1e-12);
        assert!((factors.get(Month::February) - 0.9).abs() < 1e-12);
        // Multiplicative identity for months without data.
        assert_eq!(factors.get(Month::December), 1.0);
    }

    #[test]
    fn test_commutative_in_ids() {
        let rows = vec![
            row("31", &[0.1, 0.2, 0.3]),
            row("32", &[0.7, 0.11, 0.13]),
            row("21", &[0.17, 0.19, 0.23]),
            row("11", &[0.29, 0.31, 0.37]),
        ];
        let forward = aggregate(&rows, &ids(&["31", "32", "21", "11"]), &precipitation(), None);
        let reversed = aggregate(&rows, &ids(&["11", "21", "32", "31"]), &precipitation(), None);
        let shuffled = aggregate(&rows, &ids(&["21", "11", "31", "32"]), &precipitation(), None);
        assert_eq!(forward, reversed);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_special_id_is_neutral() {
        let rows = vec![row("000", &[9.0; 12])];
        let additive = aggregate(&rows, &ids(&["000"]), &water_use(), Some("000"));
        assert!(additive.values().iter().all(|v| *v == 0.0));
        let multiplicative = aggregate(&rows, &ids(&["000"]), &precipitation(), Some("000"));
        assert!(multiplicative.is_identity(ApplicationMode::Multiplicative));
        // Special id alongside real ids is an ordinary lookup.
        let mixed = aggregate(&rows, &ids(&["000", "x"]), &water_use(), Some("000"));
        assert_eq!(mixed.get(Month::June), 9.0);
    }

    fn quarter(name: &str, months: &[Month], rows: Vec<MonthlyValueRow>) -> MonthlySource {
        MonthlySource {
            name: name.to_string(),
            months: months.to_vec(),
            rows,
            substitutions: 0,
        }
    }

    #[test]
    fn test_seasonal_sources_fill_their_months() {
        let mut jfm = [NAN; 12];
        jfm[0..3].copy_from_slice(&[1.1, 1.2, 1.3]);
        let mut amj = [NAN; 12];
        amj[3..6].copy_from_slice(&[0.9, 0.8, 0.7]);
        let sources = vec![
            quarter(
                "jfm",
                &[Month::January, Month::February, Month::March],
                vec![MonthlyValueRow::new("11", jfm)],
            ),
            quarter(
                "amj",
                &[Month::April, Month::May, Month::June],
                vec![MonthlyValueRow::new("11", amj)],
            ),
        ];
        let factors = aggregate_seasonal(&sources, &ids(&["11"]), &precipitation(), Some("000"));
        assert_eq!(factors.get(Month::February), 1.2);
        assert_eq!(factors.get(Month::May), 0.8);
        assert_eq!(factors.get(Month::October), 1.0);
    }

    #[test]
    fn test_map_values_keeps_months_and_nan() {
        let source = quarter(
            "jfm",
            &[Month::January],
            vec![row("11", &[2.0, NAN]), row("21", &[4.0])],
        );
        let doubled = source.map_values(|v| v * 2.0);
        assert_eq!(doubled.months, vec![Month::January]);
        assert_eq!(doubled.rows[0].value(Month::January), 4.0);
        assert!(doubled.rows[0].value(Month::February).is_nan());
        assert_eq!(doubled.rows[1].value(Month::January), 8.0);
    }

    #[test]
    fn test_seasonal_later_source_wins() {
        let mut early = [NAN; 12];
        early[2] = 2.0;
        let mut late = [NAN; 12];
        late[2] = 3.0;
        let sources = vec![
            quarter("first", &[Month::March], vec![MonthlyValueRow::new("11", early)]),
            quarter("second", &[Month::March], vec![MonthlyValueRow::new("11", late)]),
        ];
        let factors = aggregate_seasonal(&sources, &ids(&["11"]), &precipitation(), None);
        assert_eq!(factors.get(Month::March), 3.0);

        let reversed = vec![sources[1].clone(), sources[0].clone()];
        let factors = aggregate_seasonal(&reversed, &ids(&["11"]), &precipitation(), None);
        assert_eq!(factors.get(Month::March), 2.0);
    }
}
