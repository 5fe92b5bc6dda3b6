//! `apply` command: adjust one basin's series with its monthly factors.

use anyhow::{anyhow, Context};
use basin_data::{
    apply,
    factors::read_factor_table,
    series::{read_series, write_series},
    ApplicationMode,
};
use log::info;
use std::path::Path;

pub fn run_apply(
    series: &Path,
    factors: &Path,
    basin: &str,
    mode: ApplicationMode,
    output: &Path,
) -> anyhow::Result<()> {
    let file = std::fs::File::open(factors)
        .with_context(|| format!("failed to open factor table {}", factors.display()))?;
    let table = read_factor_table(file, mode)
        .with_context(|| format!("invalid factor table {}", factors.display()))?;
    let map = table
        .get(basin)
        .ok_or_else(|| anyhow!("basin {basin} not found in {}", factors.display()))?;

    let input = read_series(series)
        .with_context(|| format!("failed to read series {}", series.display()))?;
    let adjusted = apply(&input, map, mode)?;
    write_series(output, &adjusted)
        .with_context(|| format!("failed to write series {}", output.display()))?;
    info!(
        "adjusted {} values for basin {basin} -> {}",
        adjusted.len(),
        output.display()
    );
    Ok(())
}
