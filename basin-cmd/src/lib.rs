//! Command implementations for the basin CLI.
//!
//! Provides subcommands for joining basin and auxiliary layers, aggregating
//! monthly factors, applying them to series, and running the whole pipeline
//! from a JSON configuration.

use basin_data::{AggregationMode, ApplicationMode};
use basin_geo::DEFAULT_SPECIAL_ID;
use clap::Subcommand;
use log::info;
use std::path::PathBuf;

pub mod aggregate;
pub mod apply;
pub mod config;
pub mod convert;
pub mod join;
pub mod pipeline;

pub use config::{Conversion, PipelineConfig, VariableConfig};
pub use pipeline::{run_pipeline, RunReport};

fn parse_aggregation(s: &str) -> Result<AggregationMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "sum" => Ok(AggregationMode::Sum),
        "mean" => Ok(AggregationMode::Mean),
        _ => Err(format!("expected sum or mean, got {s:?}")),
    }
}

fn parse_application(s: &str) -> Result<ApplicationMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "multiplicative" => Ok(ApplicationMode::Multiplicative),
        "additive" => Ok(ApplicationMode::Additive),
        _ => Err(format!("expected multiplicative or additive, got {s:?}")),
    }
}

/// What a command hands back to the binary for display.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    None,
    Report(RunReport),
    Value(f64),
}

#[derive(Subcommand)]
pub enum Command {
    /// Spatially join basins to auxiliary features
    Join {
        /// Basin polygon shapefile
        #[arg(short = 'b', long)]
        basins: PathBuf,

        /// Basin identity field (positional index when omitted)
        #[arg(long)]
        basin_key: Option<String>,

        /// Auxiliary feature shapefile (wells, grid tiles)
        #[arg(short = 'f', long)]
        features: PathBuf,

        /// Auxiliary feature identity field
        #[arg(long)]
        feature_key: String,

        /// Output path for the resolved basin mapping
        #[arg(short = 'o', long)]
        resolved_csv: PathBuf,

        /// Output path for the fallback table of unresolved basins
        #[arg(long)]
        fallback: PathBuf,

        #[arg(long, default_value = DEFAULT_SPECIAL_ID)]
        special_id: String,
    },

    /// Aggregate monthly value tables into per-basin factors
    Aggregate {
        /// Basin mapping in fallback-table format
        #[arg(short = 'm', long)]
        mapping: PathBuf,

        /// Monthly value tables, later files win on shared months
        #[arg(short = 's', long = "source", required = true)]
        sources: Vec<PathBuf>,

        /// Identity column in the value tables
        #[arg(long)]
        id_column: String,

        /// Variable name, e.g. "Water Use" or ClimaticPrecipitationSeries
        #[arg(long)]
        variable: String,

        #[arg(long, value_parser = parse_aggregation)]
        aggregation: Option<AggregationMode>,

        #[arg(long, value_parser = parse_application)]
        application: Option<ApplicationMode>,

        /// Unit conversion applied to aggregated values
        #[arg(long, value_enum)]
        conversion: Option<Conversion>,

        #[arg(long, default_value = DEFAULT_SPECIAL_ID)]
        special_id: String,

        /// Output path for the factor table
        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Apply a basin's monthly factors to a date,value series
    Apply {
        #[arg(short = 'i', long)]
        series: PathBuf,

        /// Factor table written by `aggregate`
        #[arg(long)]
        factors: PathBuf,

        #[arg(long)]
        basin: String,

        #[arg(long, value_parser = parse_application)]
        application: ApplicationMode,

        #[arg(short = 'o', long)]
        output: PathBuf,
    },

    /// Run the complete pipeline from a JSON configuration
    Run {
        #[arg(short = 'c', long)]
        config: PathBuf,
    },

    /// Print a unit conversion of a single value
    Convert {
        #[arg(value_enum)]
        conversion: Conversion,

        value: String,
    },
}

pub fn run(command: Command) -> anyhow::Result<Output> {
    match command {
        Command::Join {
            basins,
            basin_key,
            features,
            feature_key,
            resolved_csv,
            fallback,
            special_id,
        } => {
            join::run_join(
                &basins,
                basin_key.as_deref(),
                &features,
                &feature_key,
                &resolved_csv,
                &fallback,
                &special_id,
            )?;
            Ok(Output::None)
        }
        Command::Aggregate {
            mapping,
            sources,
            id_column,
            variable,
            aggregation,
            application,
            conversion,
            special_id,
            output,
        } => {
            aggregate::run_aggregate(
                &mapping,
                &sources,
                &id_column,
                &variable,
                aggregation,
                application,
                conversion,
                &special_id,
                &output,
            )?;
            Ok(Output::None)
        }
        Command::Apply {
            series,
            factors,
            basin,
            application,
            output,
        } => {
            apply::run_apply(&series, &factors, &basin, application, &output)?;
            Ok(Output::None)
        }
        Command::Run { config } => {
            let config = PipelineConfig::from_path(&config)?;
            let report = run_pipeline(&config)?;
            if !report.unresolved.is_empty() {
                info!(
                    "{} basins need auxiliary ids in {}",
                    report.unresolved.len(),
                    config.fallback.display()
                );
            }
            Ok(Output::Report(report))
        }
        Command::Convert { conversion, value } => Ok(Output::Value(
            convert::convert_value(conversion, &value)?,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_returns_value() {
        let output = run(Command::Convert {
            conversion: Conversion::MgdToCfs,
            value: "2".to_string(),
        })
        .unwrap();
        match output {
            Output::Value(v) => {
                assert!((v - 2.0 * basin_utils::units::CFS_PER_MGD).abs() < 1e-12)
            }
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!(parse_aggregation("Mean"), Ok(AggregationMode::Mean));
        assert_eq!(parse_application("additive"), Ok(ApplicationMode::Additive));
        assert!(parse_aggregation("median").is_err());
    }
}
