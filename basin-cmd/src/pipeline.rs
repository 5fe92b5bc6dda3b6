//! End-to-end pipeline: join, partition, fallback substitution, monthly
//! aggregation and factor application for every configured variable.

use crate::config::{Conversion, PipelineConfig, VariableConfig};
use anyhow::Context;
use basin_data::{
    aggregate_seasonal, apply,
    factors::write_factor_table,
    series::{read_series, write_series},
    table::read_monthly_table,
    MonthlyFactorMap, MonthlySource, Variable,
};
use basin_geo::{
    fallback::{read_fallback, FallbackTable},
    join,
    shapefile_layer::read_shapefile,
    FeatureLayer, JoinResult,
};
use log::{info, warn};
use serde::Serialize;
use std::{collections::BTreeMap, path::Path};

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Basins with auxiliary ids after fallback substitution.
    pub resolved: Vec<String>,
    /// Basins left for manual follow-up in the fallback table.
    pub unresolved: Vec<String>,
    /// Basins whose ids came from the fallback table.
    pub substituted: Vec<String>,
    pub adjusted_series: usize,
    /// `(variable, basin)` pairs whose input series did not exist.
    pub missing_series: Vec<(String, String)>,
    /// Source cells replaced with NaN while reading value tables.
    pub nan_substitutions: usize,
    /// Whether the fallback table was created or extended.
    pub fallback_written: bool,
}

/// Read both layers named by `config` and run the pipeline.
pub fn run_pipeline(config: &PipelineConfig) -> anyhow::Result<RunReport> {
    let basins = read_shapefile(&config.basins)
        .with_context(|| format!("failed to read basin layer {}", config.basins.display()))?;
    let features = read_shapefile(&config.features).with_context(|| {
        format!(
            "failed to read auxiliary layer {}",
            config.features.display()
        )
    })?;
    run_with_layers(config, &basins, &features)
}

/// Run the pipeline against layers already in memory.
///
/// Unresolved basins that the fallback table does not cover are appended to
/// it with the special id and skipped for this run. Once the table lists
/// them (edited or not) a later run processes them like any other basin.
pub fn run_with_layers<B, A>(
    config: &PipelineConfig,
    basins: &B,
    features: &A,
) -> anyhow::Result<RunReport>
where
    B: FeatureLayer + ?Sized,
    A: FeatureLayer + ?Sized,
{
    let joined = match join(
        basins,
        features,
        &config.feature_key,
        config.basin_key.as_deref(),
    ) {
        Ok(joined) => joined,
        Err(err) if err.is_schema_error() => {
            return Err(anyhow::Error::new(err)
                .context("basin and auxiliary layers are incompatible, aborting run"))
        }
        Err(err) => return Err(err.into()),
    };
    let (mut resolved, unresolved) = joined.partition();
    let mut report = RunReport::default();

    let mut table = if config.fallback.exists() {
        read_fallback(&config.fallback).with_context(|| {
            format!("invalid fallback table {}", config.fallback.display())
        })?
    } else {
        FallbackTable::default()
    };

    let mut pending = JoinResult::new();
    for basin in unresolved.keys() {
        if table.get(basin).is_some() {
            report.substituted.push(basin.clone());
        } else {
            warn!("basin {basin} intersects no auxiliary features; added to fallback table");
            pending.insert_no_match(basin.clone());
        }
    }
    // Only entries for basins in this run's layers take part.
    let mut applicable = FallbackTable::default();
    for (basin, ids) in table.iter() {
        if unresolved.contains(basin) || resolved.contains(basin) {
            applicable.insert(basin.clone(), ids.clone());
        }
    }
    let merged = resolved.merge_fallback(&applicable);
    if merged > 0 {
        info!("merged {merged} fallback entries into the resolved set");
    }

    if !pending.is_empty() {
        for basin in pending.keys() {
            table.insert(basin.clone(), vec![config.special_id.clone()]);
        }
        table.save(&config.fallback).with_context(|| {
            format!("failed to write fallback table {}", config.fallback.display())
        })?;
        info!(
            "fallback table {} now lists {} basins ({} new)",
            config.fallback.display(),
            table.len(),
            pending.len()
        );
        report.fallback_written = true;
    }

    report.resolved = resolved.keys().cloned().collect();
    report.unresolved = pending.keys().cloned().collect();

    for variable in &config.variables {
        process_variable(config, variable, &resolved, &mut report)?;
    }

    info!(
        "run complete: {} resolved, {} unresolved, {} adjusted series",
        report.resolved.len(),
        report.unresolved.len(),
        report.adjusted_series
    );
    Ok(report)
}

/// Read a variable's value tables in the configured order.
pub fn read_sources(variable: &VariableConfig) -> anyhow::Result<Vec<MonthlySource>> {
    variable
        .sources
        .iter()
        .map(|path| {
            read_monthly_table(path, &variable.id_column)
                .with_context(|| format!("failed to read value table {}", path.display()))
        })
        .collect()
}

/// Aggregate factors for every resolved basin.
///
/// `conversion` is applied to the source values before aggregation, so months
/// without contributing data keep the identity of the variable's application
/// mode.
pub fn basin_factors(
    variable: &Variable,
    conversion: Conversion,
    sources: &[MonthlySource],
    resolved: &JoinResult,
    special_id: &str,
) -> BTreeMap<String, MonthlyFactorMap> {
    let converted = sources
        .iter()
        .map(|source| source.map_values(conversion.function()))
        .collect::<Vec<MonthlySource>>();
    resolved
        .iter()
        .filter_map(|(basin, outcome)| outcome.ids().map(|ids| (basin, ids)))
        .map(|(basin, ids)| {
            (
                basin.clone(),
                aggregate_seasonal(&converted, ids, variable, Some(special_id)),
            )
        })
        .collect()
}

fn process_variable(
    config: &PipelineConfig,
    variable: &VariableConfig,
    resolved: &JoinResult,
    report: &mut RunReport,
) -> anyhow::Result<()> {
    let semantics = variable.variable()?;
    let sources = read_sources(variable)?;
    report.nan_substitutions += sources.iter().map(|s| s.substitutions).sum::<usize>();

    let factors = basin_factors(
        &semantics,
        variable.conversion(),
        &sources,
        resolved,
        &config.special_id,
    );

    if let Some(dir) = &config.factors_dir {
        let path = dir.join(format!("{}.csv", file_stem(&variable.name)));
        write_factors(&path, &factors)?;
    }

    for (basin, map) in &factors {
        let input = variable.input_path(basin);
        if !input.exists() {
            warn!(
                "{}: no input series for basin {basin} at {}",
                variable.name,
                input.display()
            );
            report
                .missing_series
                .push((variable.name.clone(), basin.clone()));
            continue;
        }
        let series = read_series(&input)
            .with_context(|| format!("failed to read series {}", input.display()))?;
        let adjusted = apply(&series, map, semantics.application)
            .with_context(|| format!("basin {basin}, variable {}", variable.name))?;
        let output = variable.output_path(basin);
        write_series(&output, &adjusted)
            .with_context(|| format!("failed to write series {}", output.display()))?;
        info!(
            "{}: adjusted {} values for basin {basin} -> {}",
            variable.name,
            adjusted.len(),
            output.display()
        );
        report.adjusted_series += 1;
    }
    Ok(())
}

/// Write a factor table, creating the parent directory if needed.
pub fn write_factors(
    path: &Path,
    factors: &BTreeMap<String, MonthlyFactorMap>,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_factor_table(file, factors)?;
    info!("wrote {} basin factor rows to {}", factors.len(), path.display());
    Ok(())
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
