use crate::factors::ApplicationMode;
use serde::{Deserialize, Serialize};

/// How per-feature values combine into one basin value for a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    /// Total across features, e.g. extraction from every well in a basin.
    Sum,
    /// Arithmetic mean across features, e.g. climate-model tiles over a basin.
    Mean,
}

pub const DISCHARGE: &str = "Discharge";
pub const PRECIPITATION: &str = "ClimaticPrecipitationSeries";
pub const TEMPERATURE: &str = "ClimaticTemperatureSeries";
pub const WATER_USE: &str = "Water Use";

/// A named series variable with its aggregation and application semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub aggregation: AggregationMode,
    pub application: ApplicationMode,
}

impl Variable {
    pub fn new(name: &str, aggregation: AggregationMode, application: ApplicationMode) -> Variable {
        Variable {
            name: name.to_string(),
            aggregation,
            application,
        }
    }

    /// Default semantics for the variables the pipeline knows by name.
    pub fn known(name: &str) -> Option<Variable> {
        let (aggregation, application) = match name {
            WATER_USE => (AggregationMode::Sum, ApplicationMode::Additive),
            PRECIPITATION => (AggregationMode::Mean, ApplicationMode::Multiplicative),
            TEMPERATURE => (AggregationMode::Mean, ApplicationMode::Additive),
            DISCHARGE => (AggregationMode::Mean, ApplicationMode::Multiplicative),
            _ => return None,
        };
        Some(Variable::new(name, aggregation, application))
    }

    /// Known defaults with optional overrides; an unknown name needs both modes.
    pub fn resolve(
        name: &str,
        aggregation: Option<AggregationMode>,
        application: Option<ApplicationMode>,
    ) -> Option<Variable> {
        match (Variable::known(name), aggregation, application) {
            (Some(known), agg, app) => Some(Variable::new(
                name,
                agg.unwrap_or(known.aggregation),
                app.unwrap_or(known.application),
            )),
            (None, Some(agg), Some(app)) => Some(Variable::new(name, agg, app)),
            (None, _, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_variables() {
        let temperature = Variable::known(TEMPERATURE).unwrap();
        assert_eq!(temperature.aggregation, AggregationMode::Mean);
        assert_eq!(temperature.application, ApplicationMode::Additive);
        let water_use = Variable::known(WATER_USE).unwrap();
        assert_eq!(water_use.aggregation, AggregationMode::Sum);
        assert!(Variable::known("Snowpack").is_none());
    }

    #[test]
    fn test_resolve_overrides() {
        let precip = Variable::resolve(PRECIPITATION, Some(AggregationMode::Sum), None).unwrap();
        assert_eq!(precip.aggregation, AggregationMode::Sum);
        assert_eq!(precip.application, ApplicationMode::Multiplicative);
        assert!(Variable::resolve("Snowpack", Some(AggregationMode::Mean), None).is_none());
        let snow = Variable::resolve(
            "Snowpack",
            Some(AggregationMode::Mean),
            Some(ApplicationMode::Multiplicative),
        )
        .unwrap();
        assert_eq!(snow.name, "Snowpack");
    }
}
