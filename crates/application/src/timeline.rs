use std::sync::Arc;

use chrono::{DateTime, Utc};
use qatrail_core::AppResult;
use qatrail_domain::{ActivityType, FeedCursor, ProjectId};

use crate::enrichment::{DisplayEntry, EnrichmentResolver};
use crate::ports::{ActivityLogRepository, QaItemRepository, TimelineFilter};

/// Upper bound on timeline page size.
const MAX_PAGE_SIZE: usize = 200;

/// Conjunctive query over the enriched activity timeline.
#[derive(Debug, Clone, Default)]
pub struct TimelineQuery {
    /// Case-insensitive text matched against descriptions and enriched
    /// item numbers/titles.
    pub free_text: Option<String>,
    /// Restrict to one activity type.
    pub activity_type: Option<ActivityType>,
    /// Restrict to one project.
    pub project_id: Option<ProjectId>,
    /// Inclusive lower bound on creation time.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on creation time.
    pub until: Option<DateTime<Utc>>,
    /// Opaque cursor from a previous page's `next_cursor`.
    pub cursor: Option<String>,
    /// Requested page size; clamped server-side.
    pub limit: usize,
}

/// One page of enriched entries, newest first.
#[derive(Debug, Clone)]
pub struct TimelinePage {
    /// Enriched entries for this page.
    pub entries: Vec<DisplayEntry>,
    /// Cursor for the next page, absent on the last page.
    ///
    /// Keyset-based: concurrent inserts never shift previously returned
    /// pages.
    pub next_cursor: Option<String>,
}

/// Filterable, paginated read path over enriched log entries.
#[derive(Clone)]
pub struct TimelineService {
    log: Arc<dyn ActivityLogRepository>,
    items: Arc<dyn QaItemRepository>,
    resolver: EnrichmentResolver,
}

impl TimelineService {
    /// Creates the timeline from the log, item search and resolver.
    #[must_use]
    pub fn new(
        log: Arc<dyn ActivityLogRepository>,
        items: Arc<dyn QaItemRepository>,
        resolver: EnrichmentResolver,
    ) -> Self {
        Self {
            log,
            items,
            resolver,
        }
    }

    /// Runs one timeline query and enriches the resulting page.
    pub async fn query(&self, query: TimelineQuery) -> AppResult<TimelinePage> {
        let before = query
            .cursor
            .as_deref()
            .map(FeedCursor::parse_token)
            .transpose()?;

        let limit = query.limit.clamp(1, MAX_PAGE_SIZE);

        // Free text also matches items by number/title; resolve the id set
        // first so the log filter can OR it with the description match.
        let matching_item_ids = match query.free_text.as_deref() {
            Some(free_text) if !free_text.trim().is_empty() => {
                self.items.search_item_ids(free_text.trim()).await?
            }
            _ => Vec::new(),
        };

        let entries = self
            .log
            .query(TimelineFilter {
                free_text: query
                    .free_text
                    .as_deref()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(ToOwned::to_owned),
                matching_item_ids,
                activity_type: query.activity_type,
                project_id: query.project_id,
                from: query.from,
                until: query.until,
                before,
                limit,
            })
            .await?;

        let next_cursor = (entries.len() == limit)
            .then(|| entries.last().map(|entry| entry.cursor().as_token()))
            .flatten();

        let entries = self.resolver.enrich(entries).await?;

        Ok(TimelinePage {
            entries,
            next_cursor,
        })
    }
}
