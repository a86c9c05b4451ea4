use crate::traits::Store;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;
use waypost_core::{
    Error, Place, PlaceDraft, PlaceFilter, PlaceId, PlacePatch, Result, Visit, VisitDraft,
    VisitId, VisitPatch,
};

pub const TAG_VOCABULARY_LIMIT: usize = 10;

/// In-memory reference store. Every mutation runs inside a single write-lock
/// critical section, which stands in for the per-request transaction of a
/// SQL backend: a cascade delete commits as one unit, and a failed patch
/// leaves the record untouched.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    places: HashMap<PlaceId, Place>,
    // visit id -> owning place id; visits live inside their place
    visit_index: HashMap<VisitId, PlaceId>,
    next_place_id: PlaceId,
    next_visit_id: VisitId,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Eagerly-loaded view of one place: visits sorted by date descending.
fn assemble(place: &Place) -> Place {
    let mut out = place.clone();
    out.visits
        .sort_by(|a, b| b.visit_date.cmp(&a.visit_date).then(a.id.cmp(&b.id)));
    out
}

#[async_trait::async_trait]
impl Store for InMemoryStore {
    async fn create_place(&self, draft: PlaceDraft) -> Result<Place> {
        let mut inner = self.inner.write();
        let id = inner.next_place_id + 1;
        // validation happens before anything is written
        let place = Place::from_draft(id, Utc::now(), draft)?;
        inner.next_place_id = id;
        inner.places.insert(id, place.clone());
        debug!(id, name = %place.name, "place created");
        Ok(place)
    }

    async fn get_place(&self, id: PlaceId) -> Result<Place> {
        let inner = self.inner.read();
        inner
            .places
            .get(&id)
            .map(assemble)
            .ok_or(Error::PlaceNotFound)
    }

    async fn list_places(&self, filter: PlaceFilter) -> Result<Vec<Place>> {
        let inner = self.inner.read();
        let preds = filter.predicates();
        let mut out: Vec<Place> = inner
            .places
            .values()
            .filter(|p| preds.iter().all(|pred| pred(p)))
            .map(assemble)
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(out)
    }

    async fn update_place(&self, id: PlaceId, patch: PlacePatch) -> Result<Place> {
        let mut inner = self.inner.write();
        let place = inner.places.get_mut(&id).ok_or(Error::PlaceNotFound)?;
        // patch a scratch copy so a rejected payload leaves the record intact
        let mut updated = place.clone();
        updated.apply(patch)?;
        *place = updated.clone();
        Ok(assemble(&updated))
    }

    async fn delete_place(&self, id: PlaceId) -> Result<()> {
        let mut inner = self.inner.write();
        let place = inner.places.remove(&id).ok_or(Error::PlaceNotFound)?;
        // cascade under the same critical section: parent and visits go together
        for visit in &place.visits {
            inner.visit_index.remove(&visit.id);
        }
        debug!(id, visits = place.visits.len(), "place deleted");
        Ok(())
    }

    async fn create_visit(&self, place_id: PlaceId, draft: VisitDraft) -> Result<Visit> {
        let mut inner = self.inner.write();
        if !inner.places.contains_key(&place_id) {
            return Err(Error::PlaceNotFound);
        }
        let id = inner.next_visit_id + 1;
        let visit = Visit::from_draft(id, place_id, draft)?;
        inner.next_visit_id = id;
        inner.visit_index.insert(id, place_id);
        if let Some(place) = inner.places.get_mut(&place_id) {
            place.visits.push(visit.clone());
        }
        Ok(visit)
    }

    async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> Result<Visit> {
        let mut inner = self.inner.write();
        let place_id = *inner.visit_index.get(&id).ok_or(Error::VisitNotFound)?;
        let place = inner.places.get_mut(&place_id).ok_or(Error::VisitNotFound)?;
        let visit = place
            .visits
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or(Error::VisitNotFound)?;
        let mut updated = visit.clone();
        updated.apply(patch)?;
        *visit = updated.clone();
        Ok(updated)
    }

    async fn delete_visit(&self, id: VisitId) -> Result<()> {
        let mut inner = self.inner.write();
        let place_id = inner.visit_index.remove(&id).ok_or(Error::VisitNotFound)?;
        if let Some(place) = inner.places.get_mut(&place_id) {
            place.visits.retain(|v| v.id != id);
        }
        Ok(())
    }

    async fn tag_vocabulary(&self) -> Result<Vec<String>> {
        let inner = self.inner.read();
        let mut tags = BTreeSet::new();
        for place in inner.places.values() {
            // stored tags are already normalized at every write path
            for tag in &place.tags {
                tags.insert(tag.clone());
            }
        }
        Ok(tags.into_iter().take(TAG_VOCABULARY_LIMIT).collect())
    }
}
