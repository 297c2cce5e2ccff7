use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{
    ActivityLogEntry, ActivityType, Actor, Discipline, PhaseId, ProjectId, QaStatus, Severity,
    UserId,
};

use crate::activity_recorder::ActivityRecorder;
use crate::ports::{
    NewActivityEntry, ProjectRepository, QaItemDraft, QaItemEdit, QaItemRepository,
};
use crate::transition_service::TransitionService;

/// One row of a bulk import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItemInput {
    /// Existing item number to update, or `None` to create a new item
    /// with a generated number.
    pub item_number: Option<String>,
    /// Finding title.
    pub title: String,
    /// Finding description.
    pub description: Option<String>,
    /// Free-form category label.
    pub category: Option<String>,
    /// Discipline the finding belongs to.
    pub discipline: Discipline,
    /// Finding severity.
    pub severity: Severity,
    /// Desired status; new items default to `noted` when absent.
    pub status: Option<QaStatus>,
    /// Phase assignment, if any.
    pub phase_id: Option<PhaseId>,
    /// Assignee, if any.
    pub assigned_to: Option<UserId>,
    /// Due date, if any.
    pub due_date: Option<NaiveDate>,
}

/// Result of one bulk import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    /// Items newly created.
    pub created: usize,
    /// Existing items the import altered.
    pub updated: usize,
    /// The single `import_performed` summary entry.
    pub summary_entry: ActivityLogEntry,
}

/// Bulk ingestion of QA items for one project.
///
/// Emits exactly one `import_performed` entry per run summarizing the
/// processed count, plus one `item_edited` or `status_change` entry per
/// existing item it actually altered. Newly created rows carry no
/// per-item entry. Each item's write is its own atomic unit; the run as a
/// whole is not a transaction.
#[derive(Clone)]
pub struct ImportService {
    items: Arc<dyn QaItemRepository>,
    projects: Arc<dyn ProjectRepository>,
    transitions: TransitionService,
    recorder: ActivityRecorder,
}

impl ImportService {
    /// Creates the importer from its collaborators.
    #[must_use]
    pub fn new(
        items: Arc<dyn QaItemRepository>,
        projects: Arc<dyn ProjectRepository>,
        transitions: TransitionService,
        recorder: ActivityRecorder,
    ) -> Self {
        Self {
            items,
            projects,
            transitions,
            recorder,
        }
    }

    /// Imports a batch of items into one project.
    ///
    /// The whole batch is validated before any write: unknown project,
    /// empty titles, duplicate numbers within the batch, or a status an
    /// existing item cannot reach in one edge all reject the run.
    pub async fn import_items(
        &self,
        actor: &Actor,
        project_id: ProjectId,
        inputs: Vec<ImportItemInput>,
    ) -> AppResult<ImportSummary> {
        if self.projects.find_project(project_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "project '{project_id}' does not exist"
            )));
        }
        if inputs.is_empty() {
            return Err(AppError::Validation(
                "import batch must contain at least one item".to_owned(),
            ));
        }

        let mut seen_numbers = HashSet::new();
        for input in &inputs {
            if input.title.trim().is_empty() {
                return Err(AppError::Validation(
                    "imported items must have a title".to_owned(),
                ));
            }
            if let Some(number) = &input.item_number {
                if !seen_numbers.insert(number.clone()) {
                    return Err(AppError::Validation(format!(
                        "item number '{number}' appears more than once in the batch"
                    )));
                }
            }
        }

        let mut created = 0;
        let mut updated = 0;

        for input in inputs.iter() {
            let existing = match &input.item_number {
                Some(number) => self.items.find_by_item_number(project_id, number).await?,
                None => None,
            };

            match existing {
                Some(item) => {
                    let edit = QaItemEdit {
                        title: Some(input.title.clone()),
                        description: input.description.clone(),
                        category: input.category.clone(),
                        discipline: Some(input.discipline),
                        severity: Some(input.severity),
                        phase_id: input.phase_id,
                        assigned_to: input.assigned_to,
                        due_date: input.due_date,
                    };

                    let entry = NewActivityEntry {
                        activity_type: ActivityType::ItemEdited,
                        description: format!("Updated item {} during import", item.item_number),
                        old_value: None,
                        new_value: None,
                        metadata: None,
                        project_id: Some(item.project_id),
                        phase_id: item.phase_id,
                        qa_item_id: Some(item.id),
                        user_id: Some(actor.user_id),
                    };

                    let mutation = self
                        .items
                        .apply_edit(item.id, item.version(), edit, entry)
                        .await?;
                    updated += 1;

                    // Status changes go through the engine so the graph
                    // and role gates hold for imports too.
                    if let Some(status) = input.status {
                        if status != mutation.item.status {
                            self.transitions
                                .attempt_transition(
                                    actor,
                                    item.id,
                                    status,
                                    mutation.item.version(),
                                )
                                .await?;
                        }
                    }
                }
                None => {
                    let item_number = match &input.item_number {
                        Some(number) => number.clone(),
                        None => self.generate_item_number(project_id).await?,
                    };

                    self.items
                        .insert_item(QaItemDraft {
                            project_id,
                            phase_id: input.phase_id,
                            item_number,
                            title: input.title.clone(),
                            description: input.description.clone(),
                            category: input.category.clone(),
                            discipline: input.discipline,
                            severity: input.severity,
                            status: input.status.unwrap_or(QaStatus::Noted),
                            assigned_to: input.assigned_to,
                            due_date: input.due_date,
                            created_by: Some(actor.user_id),
                        })
                        .await?;
                    created += 1;
                }
            }
        }

        let summary_entry = self
            .recorder
            .record_import(actor, project_id, inputs.len())
            .await?;

        Ok(ImportSummary {
            created,
            updated,
            summary_entry,
        })
    }

    /// Generates the next `QA-<year>-<seq>` number for a project.
    async fn generate_item_number(&self, project_id: ProjectId) -> AppResult<String> {
        let sequence = self.items.next_item_sequence(project_id).await?;
        Ok(format!("QA-{}-{sequence:03}", Utc::now().year()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use qatrail_domain::{ActivityType, Actor, Discipline, QaStatus, Role, Severity, UserId};

    use super::{ImportItemInput, ImportService};
    use crate::activity_recorder::ActivityRecorder;
    use crate::change_feed::ChangeFeed;
    use crate::ports::{ActivityLogRepository, QaItemRepository, TimelineFilter};
    use crate::test_support::TestStore;
    use crate::transition_service::TransitionService;

    fn importer(store: &Arc<TestStore>) -> ImportService {
        let feed = ChangeFeed::new(store.clone(), 16);
        let transitions = TransitionService::new(store.clone(), feed.clone());
        let recorder = ActivityRecorder::new(store.clone(), store.clone(), feed);
        ImportService::new(store.clone(), store.clone(), transitions, recorder)
    }

    fn row(title: &str) -> ImportItemInput {
        ImportItemInput {
            item_number: None,
            title: title.to_owned(),
            description: None,
            category: None,
            discipline: Discipline::Mechanical,
            severity: Severity::High,
            status: None,
            phase_id: None,
            assigned_to: None,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn import_creates_items_with_generated_numbers_and_one_summary() {
        let store = Arc::new(TestStore::new());
        let project = store.seed_project("Riverside Apartments").await;
        let importer = importer(&store);
        let actor = Actor::new(UserId::new(), Role::Pm);

        let summary = importer
            .import_items(
                &actor,
                project.id,
                vec![row("Duct clearance conflict"), row("Valve tagging missing")],
            )
            .await;
        assert!(summary.is_ok());

        let summary = summary.unwrap_or_else(|_| unreachable!());
        assert_eq!(summary.created, 2);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.summary_entry.description, "Imported 2 QA items");

        let items = store.list_project_items(project.id).await;
        assert!(items.is_ok());
        let items = items.unwrap_or_default();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|item| item.item_number.starts_with("QA-")));
        assert!(items.iter().all(|item| item.status == QaStatus::Noted));
    }

    #[tokio::test]
    async fn import_updates_existing_items_with_per_item_entries() {
        let store = Arc::new(TestStore::new());
        let project = store.seed_project("Medical Center Expansion").await;
        let existing = store.seed_item_in(project.id, QaStatus::Noted).await;
        let importer = importer(&store);
        let actor = Actor::new(UserId::new(), Role::Pm);

        let mut update = row("Fire safety clearance issue");
        update.item_number = Some(existing.item_number.clone());
        update.status = Some(QaStatus::Open);

        let summary = importer
            .import_items(&actor, project.id, vec![update, row("New finding")])
            .await;
        assert!(summary.is_ok());

        let summary = summary.unwrap_or_else(|_| unreachable!());
        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);

        let entries = store.entries_for(existing.id).await;
        let edited = entries
            .iter()
            .filter(|entry| entry.activity_type == ActivityType::ItemEdited)
            .count();
        let transitioned = entries
            .iter()
            .filter(|entry| entry.activity_type == ActivityType::StatusChange)
            .count();
        assert_eq!(edited, 1);
        assert_eq!(transitioned, 1);

        let refreshed = store.item(existing.id).await;
        assert_eq!(refreshed.status, QaStatus::Open);
        assert_eq!(refreshed.title, "Fire safety clearance issue");

        // One summary entry for the whole run.
        let summaries = store
            .query(TimelineFilter {
                activity_type: Some(ActivityType::ImportPerformed),
                limit: 10,
                ..TimelineFilter::default()
            })
            .await;
        assert!(summaries.is_ok());
        assert_eq!(summaries.unwrap_or_default().len(), 1);
    }

    #[tokio::test]
    async fn batch_with_duplicate_numbers_is_rejected_before_any_write() {
        let store = Arc::new(TestStore::new());
        let project = store.seed_project("Downtown Office Tower").await;
        let importer = importer(&store);
        let actor = Actor::new(UserId::new(), Role::Pm);

        let mut left = row("First");
        left.item_number = Some("QA-2026-001".to_owned());
        let mut right = row("Second");
        right.item_number = Some("QA-2026-001".to_owned());

        let result = importer
            .import_items(&actor, project.id, vec![left, right])
            .await;
        assert!(matches!(
            result,
            Err(qatrail_core::AppError::Validation(_))
        ));

        let items = store.list_project_items(project.id).await;
        assert!(items.is_ok());
        assert!(items.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn import_into_missing_project_is_not_found() {
        let store = Arc::new(TestStore::new());
        let importer = importer(&store);
        let actor = Actor::new(UserId::new(), Role::Pm);

        let result = importer
            .import_items(
                &actor,
                qatrail_domain::ProjectId::new(),
                vec![row("Orphan finding")],
            )
            .await;
        assert!(matches!(result, Err(qatrail_core::AppError::NotFound(_))));
    }
}
