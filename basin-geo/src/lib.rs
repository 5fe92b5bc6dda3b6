//! Basin and auxiliary-feature layers, the spatial join between them, and
//! the fallback table used to resolve basins that matched nothing.
//!
//! # Flow
//!
//! 1. Read both layers (see [`shapefile_layer::read_shapefile`]).
//! 2. [`join::join`] every basin against every auxiliary feature.
//! 3. [`join::JoinResult::partition`] into resolved and unresolved basins.
//! 4. Write a [`fallback::FallbackTable`] for the unresolved ones; on a later
//!    run read it back and [`join::JoinResult::merge_fallback`] it.

pub mod crs;
pub mod error;
pub mod fallback;
pub mod intersect;
pub mod join;
pub mod layer;
pub mod shapefile_layer;

pub use crs::Crs;
pub use error::{GeoError, Result};
pub use fallback::{read_fallback, write_fallback, FallbackTable, DEFAULT_SPECIAL_ID};
pub use join::{join, JoinMatch, JoinResult};
pub use layer::{AttributeValue, Feature, FeatureLayer, Layer};
