//! Request and response payloads with TypeScript exports.

mod conversions;
mod types;

pub use conversions::{
    parse_date, parse_discipline, parse_phase_id, parse_severity, parse_status, parse_user_id,
    parse_version,
};
pub use types::{
    ActivityEntryResponse, AttachmentEventRequest, DisplayEntryResponse, EditItemRequest,
    FeedResponse, HealthResponse, ImportItemRequest, ImportRequest, ImportSummaryResponse,
    PhaseResponse, ProfileResponse, ProjectRefResponse, ProjectResponse, QaItemRefResponse,
    QaItemResponse, ReviewResponse, ReviewSubmissionResponse, SubmitReviewRequest,
    TimelinePageResponse, TransitionRequest, UserRefResponse,
};
