//! JSON run configuration for the full pipeline.
//!
//! ```json
//! {
//!   "basins": "layers/basins.shp",
//!   "basin_key": "STAID",
//!   "features": "layers/grid.shp",
//!   "feature_key": "GRID_ID",
//!   "fallback": "fallback.csv",
//!   "factors_dir": "factors",
//!   "variables": [
//!     {
//!       "name": "ClimaticPrecipitationSeries",
//!       "sources": ["deltas/jfm.txt", "deltas/amj.txt", "deltas/jas.txt", "deltas/ond.txt"],
//!       "id_column": "GRID_ID",
//!       "input": "series/{basin}/precip.csv",
//!       "output": "adjusted/{basin}/precip.csv"
//!     }
//!   ]
//! }
//! ```

use anyhow::{bail, Context};
use basin_data::{AggregationMode, ApplicationMode, Variable};
use basin_geo::DEFAULT_SPECIAL_ID;
use basin_utils::units;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the basin identity in series path templates.
pub const BASIN_PLACEHOLDER: &str = "{basin}";

/// Scalar unit conversion applied to aggregated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Conversion {
    None,
    M2ToMi2,
    Mi2ToM2,
    M2ToKm2,
    MgdToCfs,
    CfsToMgd,
    CmsToCfs,
}

impl Conversion {
    pub fn function(self) -> fn(f64) -> f64 {
        match self {
            Conversion::None => |v| v,
            Conversion::M2ToMi2 => units::to_mi2,
            Conversion::Mi2ToM2 => units::mi2_to_m2,
            Conversion::M2ToKm2 => units::to_km2,
            Conversion::MgdToCfs => units::to_cfs,
            Conversion::CfsToMgd => units::cfs_to_mgd,
            Conversion::CmsToCfs => units::cms_to_cfs,
        }
    }

    pub fn apply(self, value: f64) -> f64 {
        (self.function())(value)
    }
}

fn default_special_id() -> String {
    DEFAULT_SPECIAL_ID.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    #[serde(default)]
    pub aggregation: Option<AggregationMode>,
    #[serde(default)]
    pub application: Option<ApplicationMode>,
    /// Monthly value tables in processing order; later files win on shared months.
    pub sources: Vec<PathBuf>,
    pub id_column: String,
    /// Defaults to Mgal/day to ft3/s for water use and no conversion otherwise.
    #[serde(default)]
    pub conversion: Option<Conversion>,
    /// Input series path template containing `{basin}`.
    pub input: String,
    /// Output series path template containing `{basin}`.
    pub output: String,
}

impl VariableConfig {
    pub fn variable(&self) -> anyhow::Result<Variable> {
        match Variable::resolve(&self.name, self.aggregation, self.application) {
            Some(variable) => Ok(variable),
            None => bail!(
                "variable {:?} is not a known variable; set both aggregation and application",
                self.name
            ),
        }
    }

    pub fn conversion(&self) -> Conversion {
        match self.conversion {
            Some(conversion) => conversion,
            None if self.name == basin_data::variable::WATER_USE => Conversion::MgdToCfs,
            None => Conversion::None,
        }
    }

    pub fn input_path(&self, basin: &str) -> PathBuf {
        PathBuf::from(self.input.replace(BASIN_PLACEHOLDER, basin))
    }

    pub fn output_path(&self, basin: &str) -> PathBuf {
        PathBuf::from(self.output.replace(BASIN_PLACEHOLDER, basin))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    /// Basin polygon shapefile.
    pub basins: PathBuf,
    /// Basin identity field; the positional index is used when absent.
    #[serde(default)]
    pub basin_key: Option<String>,
    /// Auxiliary feature shapefile.
    pub features: PathBuf,
    pub feature_key: String,
    #[serde(default = "default_special_id")]
    pub special_id: String,
    pub fallback: PathBuf,
    /// Directory for per-variable factor tables; not written when absent.
    #[serde(default)]
    pub factors_dir: Option<PathBuf>,
    pub variables: Vec<VariableConfig>,
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> anyhow::Result<PipelineConfig> {
        let config: PipelineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<PipelineConfig> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        PipelineConfig::from_json(&text)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.special_id.trim().is_empty() {
            bail!("special_id must not be empty");
        }
        for variable in &self.variables {
            variable.variable()?;
            if variable.sources.is_empty() {
                bail!("variable {:?} lists no source files", variable.name);
            }
            for template in [&variable.input, &variable.output] {
                if !template.contains(BASIN_PLACEHOLDER) {
                    bail!(
                        "variable {:?}: path template {:?} must contain {}",
                        variable.name,
                        template,
                        BASIN_PLACEHOLDER
                    );
                }
            }
            if variable.input == variable.output {
                bail!("variable {:?}: input and output templates are identical", variable.name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "basins": "basins.shp",
        "basin_key": "STAID",
        "features": "wells.shp",
        "feature_key": "SITE_ID",
        "fallback": "fallback.csv",
        "variables": [
            {
                "name": "Water Use",
                "sources": ["water_use.csv"],
                "id_column": "SITE_ID",
                "input": "series/{basin}.csv",
                "output": "adjusted/{basin}.csv"
            },
            {
                "name": "Snowpack",
                "aggregation": "mean",
                "application": "multiplicative",
                "conversion": "none",
                "sources": ["swe.csv"],
                "id_column": "GRID",
                "input": "snow/{basin}.csv",
                "output": "snow_adj/{basin}.csv"
            }
        ]
    }"#;

    #[test]
    fn test_parse_config() {
        let config = PipelineConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.special_id, "000");
        assert_eq!(config.factors_dir, None);
        assert_eq!(config.variables.len(), 2);

        let water_use = &config.variables[0];
        assert_eq!(water_use.conversion(), Conversion::MgdToCfs);
        assert_eq!(water_use.variable().unwrap().aggregation, AggregationMode::Sum);
        assert_eq!(
            water_use.input_path("01100000"),
            PathBuf::from("series/01100000.csv")
        );

        let snow = &config.variables[1];
        assert_eq!(snow.conversion(), Conversion::None);
        assert_eq!(
            snow.variable().unwrap().application,
            ApplicationMode::Multiplicative
        );
    }

    #[test]
    fn test_unknown_variable_needs_modes() {
        let text = CONFIG.replace(r#""aggregation": "mean","#, "");
        assert!(PipelineConfig::from_json(&text).is_err());
    }

    #[test]
    fn test_template_needs_placeholder() {
        let text = CONFIG.replace("adjusted/{basin}.csv", "adjusted.csv");
        assert!(PipelineConfig::from_json(&text).is_err());
    }

    #[test]
    fn test_conversions() {
        assert!((Conversion::MgdToCfs.apply(2.0) - 2.0 * units::CFS_PER_MGD).abs() < 1e-12);
        assert_eq!(Conversion::None.apply(4.5), 4.5);
    }
}
