use std::sync::Arc;

use qatrail_application::{
    ActivityRecorder, ChangeFeed, ImportService, ProfileRepository, ProjectRepository,
    QaItemService, ReviewService, TimelineService, TransitionService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// QA item reads and status-preserving edits.
    pub item_service: QaItemService,
    /// Status transition engine.
    pub transition_service: TransitionService,
    /// Review ledger.
    pub review_service: ReviewService,
    /// Recorder for attachment and import events.
    pub recorder: ActivityRecorder,
    /// Bulk import.
    pub import_service: ImportService,
    /// Enriched timeline read path.
    pub timeline_service: TimelineService,
    /// Live change feed with cursor backfill.
    pub feed: ChangeFeed,
    /// Project/phase reference reads.
    pub projects: Arc<dyn ProjectRepository>,
    /// Profile/role reference reads.
    pub profiles: Arc<dyn ProfileRepository>,
}
