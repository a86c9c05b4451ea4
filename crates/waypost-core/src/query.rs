use crate::errors::{Error, Result};
use crate::geo::LatLon;
use crate::model::{normalize_tags, Place};

pub type PlacePredicate = Box<dyn Fn(&Place) -> bool + Send + Sync>;

/// Geographic radius criterion: origin plus a positive radius in kilometers.
#[derive(Debug, Clone, Copy)]
pub struct RadiusFilter {
    pub origin: LatLon,
    pub radius_km: f64,
}

impl RadiusFilter {
    pub fn new(origin: LatLon, radius_km: f64) -> Result<Self> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(Error::InvalidFilter(format!(
                "radius_km must be positive, got {radius_km}"
            )));
        }
        Ok(Self { origin, radius_km })
    }
}

/// Up to four optional criteria over places, AND-combined. An unset
/// criterion contributes no constraint, so the empty filter accepts
/// every place.
#[derive(Debug, Clone, Default)]
pub struct PlaceFilter {
    pub text_search: Option<String>,
    pub max_cost: Option<u8>,
    pub tags_any: Vec<String>,
    pub within: Option<RadiusFilter>,
}

impl PlaceFilter {
    /// Compiles the set criteria into independent predicates. Callers
    /// evaluate them conjunctively; order is irrelevant.
    pub fn predicates(&self) -> Vec<PlacePredicate> {
        let mut preds: Vec<PlacePredicate> = Vec::new();

        if let Some(text) = self.text_search.as_deref() {
            let needle = text.trim().to_lowercase();
            if !needle.is_empty() {
                preds.push(Box::new(move |p: &Place| {
                    p.name.to_lowercase().contains(&needle)
                        || p.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(&needle))
                }));
            }
        }

        if let Some(max) = self.max_cost {
            // unknown cost is never excluded by a ceiling
            preds.push(Box::new(move |p: &Place| p.cost.map_or(true, |c| c <= max)));
        }

        // query tags match under the same normalization as stored tags;
        // a set that normalizes to empty is treated as unset
        let wanted = normalize_tags(self.tags_any.iter().map(String::as_str));
        if !wanted.is_empty() {
            preds.push(Box::new(move |p: &Place| {
                p.tags.iter().any(|t| wanted.iter().any(|w| w == t))
            }));
        }

        if let Some(within) = self.within {
            preds.push(Box::new(move |p: &Place| {
                p.geom
                    .map_or(false, |g| g.distance_km(&within.origin) <= within.radius_km)
            }));
        }

        preds
    }

    pub fn matches(&self, place: &Place) -> bool {
        self.predicates().iter().all(|pred| pred(place))
    }
}
