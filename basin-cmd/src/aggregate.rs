//! `aggregate` command: monthly factors for every basin of a mapping file.

use crate::{
    config::Conversion,
    pipeline::{basin_factors, write_factors},
};
use anyhow::{anyhow, Context};
use basin_data::{table::read_monthly_table, AggregationMode, ApplicationMode, Variable};
use basin_geo::{fallback::read_fallback, JoinResult};
use std::path::{Path, PathBuf};

/// Aggregate `sources` for every basin listed in `mapping` and write the
/// factor table to `output`.
///
/// `mapping` uses the fallback table format, so both the resolved mapping
/// written by `join` and an operator-edited fallback table are accepted.
#[allow(clippy::too_many_arguments)]
pub fn run_aggregate(
    mapping: &Path,
    sources: &[PathBuf],
    id_column: &str,
    variable: &str,
    aggregation: Option<AggregationMode>,
    application: Option<ApplicationMode>,
    conversion: Option<Conversion>,
    special_id: &str,
    output: &Path,
) -> anyhow::Result<()> {
    let variable = Variable::resolve(variable, aggregation, application).ok_or_else(|| {
        anyhow!("unknown variable {variable:?}: pass --aggregation and --application")
    })?;
    let conversion = conversion.unwrap_or(if variable.name == basin_data::variable::WATER_USE {
        Conversion::MgdToCfs
    } else {
        Conversion::None
    });

    let table = read_fallback(mapping)
        .with_context(|| format!("failed to read basin mapping {}", mapping.display()))?;
    let mut resolved = JoinResult::new();
    resolved.merge_fallback(&table);

    let sources = sources
        .iter()
        .map(|path| {
            read_monthly_table(path, id_column)
                .with_context(|| format!("failed to read value table {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let factors = basin_factors(&variable, conversion, &sources, &resolved, special_id);
    write_factors(output, &factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use basin_data::factors::read_factor_table;
    use chrono::Month;

    #[test]
    fn test_aggregate_seasonal_files() {
        let dir = tempfile::tempdir().unwrap();
        let mapping = dir.path().join("resolved.csv");
        std::fs::write(&mapping, "basin_id,aux_ids\nA,11,21\nB,000\n").unwrap();
        let jfm = dir.path().join("jfm.txt");
        std::fs::write(&jfm, include_str!("../../fixtures/precip_delta_jfm.txt")).unwrap();
        let amj = dir.path().join("amj.txt");
        std::fs::write(&amj, include_str!("../../fixtures/precip_delta_amj.txt")).unwrap();
        let output = dir.path().join("out").join("precip.csv");

        run_aggregate(
            &mapping,
            &[jfm, amj],
            "GRID_ID",
            basin_data::variable::PRECIPITATION,
            None,
            None,
            None,
            "000",
            &output,
        )
        .unwrap();

        let file = std::fs::File::open(&output).unwrap();
        let table = read_factor_table(file, ApplicationMode::Multiplicative).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table["B"].is_identity(ApplicationMode::Multiplicative));
        // Tile 21's February cell is unreadable, so tile 11 alone counts.
        assert_eq!(table["A"].get(Month::February), 1.05);
        assert!((table["A"].get(Month::January) - 1.2).abs() < 1e-12);
        assert!((table["A"].get(Month::April) - 1.0).abs() < 1e-12);
        assert_eq!(table["A"].get(Month::December), 1.0);
    }

    #[test]
    fn test_unknown_variable_needs_modes() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_aggregate(
            &dir.path().join("missing.csv"),
            &[],
            "ID",
            "Snowpack",
            None,
            None,
            None,
            "000",
            &dir.path().join("out.csv"),
        );
        assert!(err.is_err());
    }
}
