use waypost_core::{
    Place, PlaceDraft, PlaceFilter, PlaceId, PlacePatch, Result, Visit, VisitDraft, VisitId,
    VisitPatch,
};

/// The durable-store boundary the catalog core runs against.
///
/// Implementations must give each write operation atomic-commit semantics:
/// in particular `delete_place` removes the place and every one of its
/// visits as one unit, or not at all. Returned places carry their visit
/// history eagerly, visits ordered by `visit_date` descending.
#[async_trait::async_trait]
pub trait Store: Send + Sync + 'static {
    async fn create_place(&self, draft: PlaceDraft) -> Result<Place>;
    async fn get_place(&self, id: PlaceId) -> Result<Place>;
    /// Evaluates the filter conjunctively and returns matches ordered by
    /// `created_at` descending, ties broken by id ascending.
    async fn list_places(&self, filter: PlaceFilter) -> Result<Vec<Place>>;
    async fn update_place(&self, id: PlaceId, patch: PlacePatch) -> Result<Place>;
    async fn delete_place(&self, id: PlaceId) -> Result<()>;

    /// Fails with `PlaceNotFound` when the parent place does not exist.
    async fn create_visit(&self, place_id: PlaceId, draft: VisitDraft) -> Result<Visit>;
    async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> Result<Visit>;
    async fn delete_visit(&self, id: VisitId) -> Result<()>;

    /// Distinct lower-cased tags in use, sorted ascending, at most
    /// [`TAG_VOCABULARY_LIMIT`](crate::mem::TAG_VOCABULARY_LIMIT) entries.
    async fn tag_vocabulary(&self) -> Result<Vec<String>>;
}
