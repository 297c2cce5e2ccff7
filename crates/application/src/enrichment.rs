use std::collections::HashMap;
use std::sync::Arc;

use qatrail_core::AppResult;
use qatrail_domain::{ActivityLogEntry, ProjectId, QaItemId, UserId};

use crate::ports::{ProfileRepository, ProjectRepository, QaItemRepository};

/// Outcome of resolving one foreign key in a log entry.
///
/// The log is normalized, so a referenced entity may have been removed
/// since the entry was written; that resolves to an explicit marker rather
/// than failing the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefResolution<T> {
    /// The referenced entity still exists.
    Resolved(T),
    /// The reference dangles; render an "unknown" placeholder.
    Missing,
}

/// Display fields for a referenced user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    /// Profile identifier.
    pub id: UserId,
    /// Display name, if set.
    pub full_name: Option<String>,
    /// Email, if known.
    pub email: Option<String>,
}

/// Display fields for a referenced QA item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaItemSummary {
    /// Item identifier.
    pub id: QaItemId,
    /// Human-facing item number.
    pub item_number: String,
    /// Item title.
    pub title: String,
}

/// Display fields for a referenced project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    /// Project identifier.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
}

/// One log entry joined with its referenced entities for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEntry {
    /// The raw, normalized log entry.
    pub entry: ActivityLogEntry,
    /// Resolved acting user, when the entry references one.
    pub user: Option<RefResolution<UserSummary>>,
    /// Resolved QA item, when the entry references one.
    pub qa_item: Option<RefResolution<QaItemSummary>>,
    /// Resolved project, when the entry references one.
    pub project: Option<RefResolution<ProjectSummary>>,
}

/// Joins raw log entries with their referenced entities at read time.
///
/// Lookups are batched per entity kind, one round trip each, regardless of
/// batch size.
#[derive(Clone)]
pub struct EnrichmentResolver {
    profiles: Arc<dyn ProfileRepository>,
    items: Arc<dyn QaItemRepository>,
    projects: Arc<dyn ProjectRepository>,
}

impl EnrichmentResolver {
    /// Creates the resolver from the reference repositories.
    #[must_use]
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        items: Arc<dyn QaItemRepository>,
        projects: Arc<dyn ProjectRepository>,
    ) -> Self {
        Self {
            profiles,
            items,
            projects,
        }
    }

    /// Resolves every reference in `entries` into display form.
    pub async fn enrich(&self, entries: Vec<ActivityLogEntry>) -> AppResult<Vec<DisplayEntry>> {
        let mut user_ids: Vec<UserId> = Vec::new();
        let mut item_ids: Vec<QaItemId> = Vec::new();
        let mut project_ids: Vec<ProjectId> = Vec::new();

        for entry in &entries {
            if let Some(user_id) = entry.user_id {
                if !user_ids.contains(&user_id) {
                    user_ids.push(user_id);
                }
            }
            if let Some(qa_item_id) = entry.qa_item_id {
                if !item_ids.contains(&qa_item_id) {
                    item_ids.push(qa_item_id);
                }
            }
            if let Some(project_id) = entry.project_id {
                if !project_ids.contains(&project_id) {
                    project_ids.push(project_id);
                }
            }
        }

        let profiles: HashMap<UserId, UserSummary> = self
            .profiles
            .find_profiles(&user_ids)
            .await?
            .into_iter()
            .map(|profile| {
                (
                    profile.id,
                    UserSummary {
                        id: profile.id,
                        full_name: profile.full_name,
                        email: profile.email,
                    },
                )
            })
            .collect();

        let items: HashMap<QaItemId, QaItemSummary> = self
            .items
            .find_items(&item_ids)
            .await?
            .into_iter()
            .map(|item| {
                (
                    item.id,
                    QaItemSummary {
                        id: item.id,
                        item_number: item.item_number,
                        title: item.title,
                    },
                )
            })
            .collect();

        let projects: HashMap<ProjectId, ProjectSummary> = self
            .projects
            .find_projects(&project_ids)
            .await?
            .into_iter()
            .map(|project| {
                (
                    project.id,
                    ProjectSummary {
                        id: project.id,
                        name: project.name,
                    },
                )
            })
            .collect();

        Ok(entries
            .into_iter()
            .map(|entry| {
                let user = entry.user_id.map(|id| {
                    profiles
                        .get(&id)
                        .cloned()
                        .map_or(RefResolution::Missing, RefResolution::Resolved)
                });
                let qa_item = entry.qa_item_id.map(|id| {
                    items
                        .get(&id)
                        .cloned()
                        .map_or(RefResolution::Missing, RefResolution::Resolved)
                });
                let project = entry.project_id.map(|id| {
                    projects
                        .get(&id)
                        .cloned()
                        .map_or(RefResolution::Missing, RefResolution::Resolved)
                });

                DisplayEntry {
                    entry,
                    user,
                    qa_item,
                    project,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qatrail_domain::{ActivityType, QaStatus, UserId};

    use super::{EnrichmentResolver, RefResolution};
    use crate::ports::{ActivityLogRepository, NewActivityEntry};
    use crate::test_support::TestStore;

    fn resolver(store: &Arc<TestStore>) -> EnrichmentResolver {
        EnrichmentResolver::new(store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn enrich_joins_user_item_and_project() {
        let store = Arc::new(TestStore::new());
        let profile = store.seed_profile("Sarah Johnson").await;
        let item = store.seed_item(QaStatus::Open).await;

        let entry = store
            .append(NewActivityEntry {
                activity_type: ActivityType::ReviewAdded,
                description: "Added review comment on QA item".to_owned(),
                old_value: None,
                new_value: None,
                metadata: None,
                project_id: Some(item.project_id),
                phase_id: None,
                qa_item_id: Some(item.id),
                user_id: Some(profile.id),
            })
            .await;
        assert!(entry.is_ok());

        let enriched = resolver(&store)
            .enrich(vec![entry.unwrap_or_else(|_| unreachable!())])
            .await;
        assert!(enriched.is_ok());
        let enriched = enriched.unwrap_or_default();
        assert_eq!(enriched.len(), 1);

        let display = &enriched[0];
        assert!(matches!(
            &display.user,
            Some(RefResolution::Resolved(user)) if user.full_name.as_deref() == Some("Sarah Johnson")
        ));
        assert!(matches!(
            &display.qa_item,
            Some(RefResolution::Resolved(summary)) if summary.item_number == item.item_number
        ));
        assert!(matches!(&display.project, Some(RefResolution::Resolved(_))));
    }

    #[tokio::test]
    async fn dangling_references_resolve_to_missing_markers() {
        let store = Arc::new(TestStore::new());
        let item = store.seed_item(QaStatus::Open).await;

        // The acting user was never stored (or has since been removed).
        let entry = store
            .append(NewActivityEntry {
                activity_type: ActivityType::ItemEdited,
                description: "Updated item details".to_owned(),
                old_value: None,
                new_value: None,
                metadata: None,
                project_id: Some(item.project_id),
                phase_id: None,
                qa_item_id: Some(item.id),
                user_id: Some(UserId::new()),
            })
            .await;
        assert!(entry.is_ok());

        let enriched = resolver(&store)
            .enrich(vec![entry.unwrap_or_else(|_| unreachable!())])
            .await;
        assert!(enriched.is_ok());
        let enriched = enriched.unwrap_or_default();

        assert!(matches!(&enriched[0].user, Some(RefResolution::Missing)));
        assert!(matches!(
            &enriched[0].qa_item,
            Some(RefResolution::Resolved(_))
        ));
    }

    #[tokio::test]
    async fn entries_without_references_stay_unadorned() {
        let store = Arc::new(TestStore::new());

        let entry = store
            .append(NewActivityEntry {
                activity_type: ActivityType::ImportPerformed,
                description: "Imported 5 QA items".to_owned(),
                old_value: None,
                new_value: Some("5 items".to_owned()),
                metadata: None,
                project_id: None,
                phase_id: None,
                qa_item_id: None,
                user_id: None,
            })
            .await;
        assert!(entry.is_ok());

        let enriched = resolver(&store)
            .enrich(vec![entry.unwrap_or_else(|_| unreachable!())])
            .await;
        assert!(enriched.is_ok());
        let enriched = enriched.unwrap_or_default();

        assert!(enriched[0].user.is_none());
        assert!(enriched[0].qa_item.is_none());
        assert!(enriched[0].project.is_none());
    }
}
