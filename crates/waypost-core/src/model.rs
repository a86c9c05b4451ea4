use crate::errors::{Error, Result};
use crate::geo::LatLon;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub type PlaceId = i64;
pub type VisitId = i64;

/// Lower-cases, trims, drops empties and de-duplicates while preserving
/// insertion order.
pub fn normalize_tags<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let tag = item.as_ref().trim().to_lowercase();
        if tag.is_empty() || out.contains(&tag) {
            continue;
        }
        out.push(tag);
    }
    out
}

/// A normalized tag set. Deserializes from either a sequence of strings or
/// one comma-delimited string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagList(pub Vec<String>);

impl<'de> Deserialize<'de> for TagList {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Input {
            Joined(String),
            Items(Vec<String>),
        }
        let items = match Input::deserialize(deserializer)? {
            Input::Joined(s) => s.split(',').map(str::to_owned).collect(),
            Input::Items(v) => v,
        };
        Ok(TagList(normalize_tags(items)))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub google_place_id: Option<String>,
    pub location_summary: Option<String>,
    /// Normalized `"lat,lon"` string, 6 decimals. Set and cleared in lockstep
    /// with `geom`.
    pub location: Option<String>,
    #[serde(skip_serializing)]
    pub geom: Option<LatLon>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub cost: Option<u8>,
    pub google_maps_url: Option<Url>,
    pub website_url: Option<Url>,
    pub created_at: DateTime<Utc>,
    pub visits: Vec<Visit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Visit {
    pub id: VisitId,
    #[serde(skip_serializing)]
    pub place_id: PlaceId,
    pub visit_date: NaiveDate,
    pub rating: Option<u8>,
    pub notes: Option<String>,
}

/// Creation payload for a place. URL fields are validated by the `url`
/// crate at deserialization time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceDraft {
    pub name: String,
    #[serde(default)]
    pub google_place_id: Option<String>,
    #[serde(default)]
    pub location_summary: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<TagList>,
    #[serde(default)]
    pub cost: Option<u8>,
    #[serde(default)]
    pub google_maps_url: Option<Url>,
    #[serde(default)]
    pub website_url: Option<Url>,
}

/// Partial-update payload for a place. Double-`Option` fields distinguish
/// "absent from the payload" (outer `None`, field untouched) from
/// "explicitly null" (inner `None`, field cleared). `name` is required on
/// the record, so it can be overwritten but not cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub google_place_id: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub location_summary: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub tags: Option<Option<TagList>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub cost: Option<Option<u8>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub google_maps_url: Option<Option<Url>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub website_url: Option<Option<Url>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitDraft {
    pub visit_date: NaiveDate,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisitPatch {
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub rating: Option<Option<u8>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub notes: Option<Option<String>>,
}

fn check_cost(cost: Option<u8>) -> Result<()> {
    match cost {
        Some(c) if c > 3 => Err(Error::InvalidInput(format!(
            "cost must be between 0 and 3, got {c}"
        ))),
        _ => Ok(()),
    }
}

fn check_rating(rating: Option<u8>) -> Result<()> {
    match rating {
        Some(r) if !(1..=5).contains(&r) => Err(Error::InvalidInput(format!(
            "rating must be between 1 and 5, got {r}"
        ))),
        _ => Ok(()),
    }
}

impl Place {
    /// Validates and normalizes a draft into a full record. Fails before the
    /// caller commits anything to the store.
    pub fn from_draft(id: PlaceId, created_at: DateTime<Utc>, draft: PlaceDraft) -> Result<Self> {
        check_cost(draft.cost)?;
        let mut place = Self {
            id,
            name: draft.name,
            google_place_id: draft.google_place_id,
            location_summary: draft.location_summary,
            location: None,
            geom: None,
            description: draft.description,
            tags: draft.tags.unwrap_or_default().0,
            cost: draft.cost,
            google_maps_url: draft.google_maps_url,
            website_url: draft.website_url,
            created_at,
            visits: Vec::new(),
        };
        place.set_location(draft.location.as_deref())?;
        Ok(place)
    }

    /// Sets `location` and `geom` together from a raw coordinate string, or
    /// clears both. Blank input clears, matching the boundary contract.
    pub fn set_location(&mut self, raw: Option<&str>) -> Result<()> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => {
                let point = LatLon::parse(s)?;
                self.location = Some(point.normalized());
                self.geom = Some(point);
            }
            None => {
                self.location = None;
                self.geom = None;
            }
        }
        Ok(())
    }

    /// Field-wise overwrite; fields absent from the patch stay untouched.
    /// `geom` is re-derived only when `location` is present in the patch.
    pub fn apply(&mut self, patch: PlacePatch) -> Result<()> {
        if let Some(cost) = patch.cost {
            check_cost(cost)?;
            self.cost = cost;
        }
        if let Some(location) = patch.location {
            self.set_location(location.as_deref())?;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(v) = patch.google_place_id {
            self.google_place_id = v;
        }
        if let Some(v) = patch.location_summary {
            self.location_summary = v;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags.unwrap_or_default().0;
        }
        if let Some(v) = patch.google_maps_url {
            self.google_maps_url = v;
        }
        if let Some(v) = patch.website_url {
            self.website_url = v;
        }
        Ok(())
    }
}

impl Visit {
    pub fn from_draft(id: VisitId, place_id: PlaceId, draft: VisitDraft) -> Result<Self> {
        check_rating(draft.rating)?;
        Ok(Self {
            id,
            place_id,
            visit_date: draft.visit_date,
            rating: draft.rating,
            notes: draft.notes,
        })
    }

    pub fn apply(&mut self, patch: VisitPatch) -> Result<()> {
        if let Some(rating) = patch.rating {
            check_rating(rating)?;
            self.rating = rating;
        }
        if let Some(date) = patch.visit_date {
            self.visit_date = date;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        Ok(())
    }
}
