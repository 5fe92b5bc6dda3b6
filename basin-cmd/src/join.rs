//! `join` command: spatial join of two shapefile layers.

use anyhow::Context;
use basin_geo::{
    fallback::{write_fallback, FallbackTable},
    join, FeatureLayer,
    shapefile_layer::read_shapefile,
};
use log::{info, warn};
use std::path::Path;

/// Join `basins` against `features`, write the resolved mapping to
/// `resolved_csv` and, when some basins matched nothing, a placeholder
/// fallback table to `fallback`.
pub fn run_join(
    basins: &Path,
    basin_key: Option<&str>,
    features: &Path,
    feature_key: &str,
    resolved_csv: &Path,
    fallback: &Path,
    special_id: &str,
) -> anyhow::Result<()> {
    let basin_layer = read_shapefile(basins)
        .with_context(|| format!("failed to read basin layer {}", basins.display()))?;
    let feature_layer = read_shapefile(features)
        .with_context(|| format!("failed to read auxiliary layer {}", features.display()))?;
    join_layers(
        &basin_layer,
        basin_key,
        &feature_layer,
        feature_key,
        resolved_csv,
        fallback,
        special_id,
    )
}

pub fn join_layers<B, A>(
    basins: &B,
    basin_key: Option<&str>,
    features: &A,
    feature_key: &str,
    resolved_csv: &Path,
    fallback: &Path,
    special_id: &str,
) -> anyhow::Result<()>
where
    B: FeatureLayer + ?Sized,
    A: FeatureLayer + ?Sized,
{
    let (resolved, unresolved) = join(basins, features, feature_key, basin_key)?.partition();

    FallbackTable::from_resolved(&resolved)
        .save(resolved_csv)
        .with_context(|| format!("failed to write {}", resolved_csv.display()))?;
    info!(
        "wrote {} resolved basins to {}",
        resolved.len(),
        resolved_csv.display()
    );

    if !unresolved.is_empty() {
        for basin in unresolved.keys() {
            warn!("basin {basin} intersects no auxiliary features");
        }
        write_fallback(fallback, &unresolved, special_id)
            .with_context(|| format!("failed to write fallback table {}", fallback.display()))?;
    }
    Ok(())
}
