//! Application services and ports for the QA lifecycle engine.

#![forbid(unsafe_code)]

mod activity_recorder;
mod change_feed;
mod enrichment;
mod import_service;
mod item_service;
mod ports;
mod review_service;
mod timeline;
mod transition_service;

#[cfg(test)]
pub(crate) mod test_support;

pub use activity_recorder::ActivityRecorder;
pub use change_feed::{ChangeFeed, FeedSubscription};
pub use enrichment::{
    DisplayEntry, EnrichmentResolver, ProjectSummary, QaItemSummary, RefResolution, UserSummary,
};
pub use import_service::{ImportItemInput, ImportService, ImportSummary};
pub use item_service::QaItemService;
pub use ports::{
    ActivityLogRepository, FeedScope, ItemMutation, NewActivityEntry, ProfileRepository,
    ProjectRepository, QaItemDraft, QaItemEdit, QaItemRepository, ReviewRepository,
    TimelineFilter,
};
pub use review_service::{ReviewService, ReviewSubmission, ReviewTransition};
pub use timeline::{TimelinePage, TimelineQuery, TimelineService};
pub use transition_service::{TransitionOutcome, TransitionService};
