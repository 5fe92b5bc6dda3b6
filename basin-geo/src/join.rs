use crate::{
    error::{GeoError, Result},
    fallback::FallbackTable,
    intersect::{extract_field, overlaps},
    layer::FeatureLayer,
};
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Outcome of joining one basin against the auxiliary layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinMatch {
    /// Auxiliary identities in auxiliary-layer iteration order; never empty.
    Matched(Vec<String>),
    /// The basin was checked and nothing intersected it.
    NoMatch,
}

impl JoinMatch {
    pub fn ids(&self) -> Option<&[String]> {
        match self {
            JoinMatch::Matched(ids) => Some(ids),
            JoinMatch::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, JoinMatch::Matched(_))
    }
}

/// Mapping from basin identity to its join outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinResult {
    entries: BTreeMap<String, JoinMatch>,
}

impl JoinResult {
    pub fn new() -> JoinResult {
        JoinResult::default()
    }

    /// Record a basin's outcome. An empty id list is stored as `NoMatch`.
    pub fn insert(&mut self, basin: String, ids: Vec<String>) -> Option<JoinMatch> {
        let outcome = if ids.is_empty() {
            JoinMatch::NoMatch
        } else {
            JoinMatch::Matched(ids)
        };
        self.entries.insert(basin, outcome)
    }

    pub fn insert_no_match(&mut self, basin: String) -> Option<JoinMatch> {
        self.entries.insert(basin, JoinMatch::NoMatch)
    }

    pub fn get(&self, basin: &str) -> Option<&JoinMatch> {
        self.entries.get(basin)
    }

    /// Matched auxiliary ids of a basin; `None` when unknown or unmatched.
    pub fn ids(&self, basin: &str) -> Option<&[String]> {
        self.entries.get(basin).and_then(JoinMatch::ids)
    }

    pub fn contains(&self, basin: &str) -> bool {
        self.entries.contains_key(basin)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JoinMatch)> {
        self.entries.iter()
    }

    /// Split into (resolved, unresolved). Every key lands in exactly one half.
    pub fn partition(self) -> (JoinResult, JoinResult) {
        let (resolved, unresolved): (BTreeMap<_, _>, BTreeMap<_, _>) = self
            .entries
            .into_iter()
            .partition(|(_, outcome)| outcome.is_match());
        (
            JoinResult { entries: resolved },
            JoinResult {
                entries: unresolved,
            },
        )
    }

    /// Insert every fallback table entry as a resolved match, replacing any
    /// existing outcome for that basin. Returns the number of entries merged.
    pub fn merge_fallback(&mut self, table: &FallbackTable) -> usize {
        let mut merged = 0;
        for (basin, ids) in table.iter() {
            if let Some(JoinMatch::Matched(previous)) = self.entries.get(basin) {
                debug!("fallback table replaces ids {previous:?} for basin {basin}");
            }
            self.insert(basin.clone(), ids.to_vec());
            merged += 1;
        }
        merged
    }
}

impl FromIterator<(String, JoinMatch)> for JoinResult {
    fn from_iter<T: IntoIterator<Item = (String, JoinMatch)>>(iter: T) -> Self {
        JoinResult {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Join every basin against every auxiliary feature.
///
/// The basin identity is the value of `basin_key_field`, or the basin's
/// positional index when no field is given. Each overlapping auxiliary
/// feature contributes its `aux_key_field` value once per basin. Basins with
/// no overlap are recorded as `NoMatch`.
///
/// Fails before any geometry test when the layers' CRS differ or a key field
/// is missing from a schema. A basin without a value in `basin_key_field` is
/// also a schema failure; auxiliary features without a key value are skipped
/// with a warning.
pub fn join<B, A>(
    basins: &B,
    aux: &A,
    aux_key_field: &str,
    basin_key_field: Option<&str>,
) -> Result<JoinResult>
where
    B: FeatureLayer + ?Sized,
    A: FeatureLayer + ?Sized,
{
    if basins.crs() != aux.crs() {
        return Err(GeoError::CrsMismatch {
            basin: basins.crs().to_string(),
            aux: aux.crs().to_string(),
        });
    }
    aux.require_field(aux_key_field)?;
    if let Some(field) = basin_key_field {
        basins.require_field(field)?;
    }

    let aux_keys = aux
        .features()
        .iter()
        .map(|feature| {
            let key = extract_field(feature, aux_key_field);
            if key.is_none() {
                warn!(
                    "{} feature {} has no {} value and will never match",
                    aux.name(),
                    feature.index(),
                    aux_key_field
                );
            }
            key
        })
        .collect::<Vec<Option<String>>>();

    let mut result = JoinResult::new();
    for basin in basins.features() {
        let basin_id = match basin_key_field {
            Some(field) => match extract_field(basin, field) {
                Some(id) => id,
                None => {
                    return Err(GeoError::MissingField {
                        layer: format!("{} (feature {})", basins.name(), basin.index()),
                        field: field.to_string(),
                    })
                }
            },
            None => basin.index().to_string(),
        };

        let ids = aux
            .features()
            .iter()
            .zip(aux_keys.iter())
            .filter_map(|(feature, key)| match key {
                Some(key) if overlaps(basin, feature) => Some(key.clone()),
                _ => None,
            })
            .collect::<Vec<String>>();

        debug!("basin {basin_id}: {} intersecting features", ids.len());
        if result.insert(basin_id.clone(), ids).is_some() {
            warn!(
                "duplicate basin identity {basin_id} in {}; the later feature wins",
                basins.name()
            );
        }
    }

    let matched = result.iter().filter(|(_, m)| m.is_match()).count();
    info!(
        "joined {} basins against {} {} features: {} resolved, {} unresolved",
        basins.features().len(),
        aux.features().len(),
        aux.name(),
        matched,
        result.len() - matched
    );
    Ok(result)
}
