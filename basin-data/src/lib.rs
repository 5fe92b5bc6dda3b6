//! Monthly factor aggregation and application for basin time series.
//!
//! Per-feature monthly values (water-use rates, climate-model deltas) are
//! read from delimited tables, reduced to one [`factors::MonthlyFactorMap`]
//! per basin and variable, then applied to the basin's existing series by
//! calendar month.

pub mod aggregate;
pub mod apply;
pub mod error;
pub mod factors;
pub mod series;
pub mod table;
pub mod variable;

pub use aggregate::{aggregate, aggregate_seasonal, MonthlySource, MonthlyValueRow};
pub use apply::apply;
pub use error::{DataError, Result};
pub use factors::{ApplicationMode, MonthlyFactorMap};
pub use series::TimeSeries;
pub use variable::{AggregationMode, Variable};
