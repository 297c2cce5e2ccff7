use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use qatrail_application::{
    ActivityLogRepository, FeedScope, ItemMutation, NewActivityEntry, ProfileRepository,
    ProjectRepository, QaItemDraft, QaItemEdit, QaItemRepository, ReviewRepository,
    TimelineFilter,
};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{
    ActivityId, ActivityLogEntry, FeedCursor, PhaseId, Profile, Project, ProjectId, ProjectPhase,
    QaItem, QaItemId, QaStatus, Review, UserId, UserRole,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreState {
    items: HashMap<QaItemId, QaItem>,
    reviews: Vec<Review>,
    entries: Vec<ActivityLogEntry>,
    projects: HashMap<ProjectId, Project>,
    phases: HashMap<PhaseId, ProjectPhase>,
    profiles: HashMap<UserId, Profile>,
    roles: Vec<UserRole>,
    last_instant: Option<DateTime<Utc>>,
}

impl StoreState {
    /// Strictly increasing commit clock: version stamps and entry cursors
    /// never tie, even for back-to-back commits within one microsecond.
    fn next_instant(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_instant {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_instant = Some(next);
        next
    }

    /// Appends an entry at the same instant as the mutation it documents.
    fn append_entry_at(&mut self, entry: NewActivityEntry, at: DateTime<Utc>) -> ActivityLogEntry {
        let entry = ActivityLogEntry {
            id: ActivityId::generate(),
            activity_type: entry.activity_type,
            description: entry.description,
            old_value: entry.old_value,
            new_value: entry.new_value,
            metadata: entry.metadata,
            project_id: entry.project_id,
            phase_id: entry.phase_id,
            qa_item_id: entry.qa_item_id,
            user_id: entry.user_id,
            created_at: at,
        };
        self.entries.push(entry.clone());
        entry
    }
}

/// In-memory implementation of every repository port.
///
/// The atomic unit (row mutation plus audit entry) is one write-lock
/// critical section, mirroring the single transaction the PostgreSQL
/// adapters use. Intended for tests and local development.
#[derive(Default)]
pub struct InMemoryQaStore {
    state: RwLock<StoreState>,
}

impl InMemoryQaStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a project row.
    pub async fn insert_project(&self, project: Project) {
        self.state
            .write()
            .await
            .projects
            .insert(project.id, project);
    }

    /// Seeds a phase row.
    pub async fn insert_phase(&self, phase: ProjectPhase) {
        self.state.write().await.phases.insert(phase.id, phase);
    }

    /// Seeds a profile row.
    pub async fn insert_profile(&self, profile: Profile) {
        self.state
            .write()
            .await
            .profiles
            .insert(profile.id, profile);
    }

    /// Seeds a role assignment row.
    pub async fn insert_user_role(&self, role: UserRole) {
        self.state.write().await.roles.push(role);
    }
}

#[async_trait]
impl QaItemRepository for InMemoryQaStore {
    async fn find_item(&self, qa_item_id: QaItemId) -> AppResult<Option<QaItem>> {
        Ok(self.state.read().await.items.get(&qa_item_id).cloned())
    }

    async fn find_items(&self, qa_item_ids: &[QaItemId]) -> AppResult<Vec<QaItem>> {
        let state = self.state.read().await;
        Ok(qa_item_ids
            .iter()
            .filter_map(|id| state.items.get(id).cloned())
            .collect())
    }

    async fn list_project_items(&self, project_id: ProjectId) -> AppResult<Vec<QaItem>> {
        let state = self.state.read().await;
        let mut items: Vec<QaItem> = state
            .items
            .values()
            .filter(|item| item.project_id == project_id)
            .cloned()
            .collect();
        items.sort_by(|left, right| left.item_number.cmp(&right.item_number));
        Ok(items)
    }

    async fn find_by_item_number(
        &self,
        project_id: ProjectId,
        item_number: &str,
    ) -> AppResult<Option<QaItem>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .find(|item| item.project_id == project_id && item.item_number == item_number)
            .cloned())
    }

    async fn search_item_ids(&self, free_text: &str) -> AppResult<Vec<QaItemId>> {
        let needle = free_text.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .filter(|item| {
                item.item_number.to_lowercase().contains(&needle)
                    || item.title.to_lowercase().contains(&needle)
            })
            .map(|item| item.id)
            .collect())
    }

    async fn next_item_sequence(&self, project_id: ProjectId) -> AppResult<u32> {
        let state = self.state.read().await;
        let count = state
            .items
            .values()
            .filter(|item| item.project_id == project_id)
            .count();
        Ok(count as u32 + 1)
    }

    async fn insert_item(&self, draft: QaItemDraft) -> AppResult<QaItem> {
        let mut state = self.state.write().await;

        if state
            .items
            .values()
            .any(|item| item.project_id == draft.project_id && item.item_number == draft.item_number)
        {
            return Err(AppError::Conflict(format!(
                "item number '{}' already exists in project '{}'",
                draft.item_number, draft.project_id
            )));
        }

        let now = state.next_instant();
        let item = QaItem {
            id: QaItemId::new(),
            project_id: draft.project_id,
            phase_id: draft.phase_id,
            item_number: draft.item_number,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            discipline: draft.discipline,
            severity: draft.severity,
            status: draft.status,
            assigned_to: draft.assigned_to,
            due_date: draft.due_date,
            started_at: None,
            resolved_at: None,
            verified_at: None,
            closed_at: None,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn apply_transition(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        target: QaStatus,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation> {
        let mut state = self.state.write().await;
        let at = state.next_instant();

        let item = state
            .items
            .get_mut(&qa_item_id)
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))?;
        if item.updated_at != expected_version {
            return Err(AppError::Conflict(format!(
                "QA item '{qa_item_id}' changed since it was read; re-read and retry"
            )));
        }

        item.apply_status(target, at);
        let item = item.clone();
        let entry = state.append_entry_at(entry, at);
        Ok(ItemMutation { item, entry })
    }

    async fn apply_edit(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        edit: QaItemEdit,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation> {
        let mut state = self.state.write().await;
        let at = state.next_instant();

        let item = state
            .items
            .get_mut(&qa_item_id)
            .ok_or_else(|| AppError::NotFound(format!("QA item '{qa_item_id}' does not exist")))?;
        if item.updated_at != expected_version {
            return Err(AppError::Conflict(format!(
                "QA item '{qa_item_id}' changed since it was read; re-read and retry"
            )));
        }

        if let Some(title) = edit.title {
            item.title = title;
        }
        if let Some(description) = edit.description {
            item.description = Some(description);
        }
        if let Some(category) = edit.category {
            item.category = Some(category);
        }
        if let Some(discipline) = edit.discipline {
            item.discipline = discipline;
        }
        if let Some(severity) = edit.severity {
            item.severity = severity;
        }
        if let Some(phase_id) = edit.phase_id {
            item.phase_id = Some(phase_id);
        }
        if let Some(assigned_to) = edit.assigned_to {
            item.assigned_to = Some(assigned_to);
        }
        if let Some(due_date) = edit.due_date {
            item.due_date = Some(due_date);
        }
        item.updated_at = at;

        let item = item.clone();
        let entry = state.append_entry_at(entry, at);
        Ok(ItemMutation { item, entry })
    }
}

#[async_trait]
impl ReviewRepository for InMemoryQaStore {
    async fn append_review(
        &self,
        review: Review,
        entry: NewActivityEntry,
    ) -> AppResult<(Review, ActivityLogEntry)> {
        let mut state = self.state.write().await;
        let at = state.next_instant();
        state.reviews.push(review.clone());
        let entry = state.append_entry_at(entry, at);
        Ok((review, entry))
    }

    async fn list_reviews(&self, qa_item_id: QaItemId) -> AppResult<Vec<Review>> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .filter(|review| review.qa_item_id() == qa_item_id)
            .cloned()
            .collect();
        reviews.sort_by(|left, right| right.created_at().cmp(&left.created_at()));
        Ok(reviews)
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryQaStore {
    async fn append(&self, entry: NewActivityEntry) -> AppResult<ActivityLogEntry> {
        let mut state = self.state.write().await;
        let at = state.next_instant();
        Ok(state.append_entry_at(entry, at))
    }

    async fn entries_for_item(&self, qa_item_id: QaItemId) -> AppResult<Vec<ActivityLogEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<ActivityLogEntry> = state
            .entries
            .iter()
            .filter(|entry| entry.qa_item_id == Some(qa_item_id))
            .cloned()
            .collect();
        entries.sort_by_key(ActivityLogEntry::cursor);
        Ok(entries)
    }

    async fn entries_since(
        &self,
        scope: &FeedScope,
        cursor: Option<FeedCursor>,
        limit: usize,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<ActivityLogEntry> = state
            .entries
            .iter()
            .filter(|entry| scope.matches(entry))
            .filter(|entry| cursor.is_none_or(|cursor| entry.cursor() > cursor))
            .cloned()
            .collect();
        entries.sort_by_key(ActivityLogEntry::cursor);
        entries.truncate(limit);
        Ok(entries)
    }

    async fn query(&self, filter: TimelineFilter) -> AppResult<Vec<ActivityLogEntry>> {
        let state = self.state.read().await;
        let needle = filter.free_text.as_deref().map(str::to_lowercase);
        let mut entries: Vec<ActivityLogEntry> = state
            .entries
            .iter()
            .filter(|entry| {
                needle.as_deref().is_none_or(|needle| {
                    entry.description.to_lowercase().contains(needle)
                        || entry
                            .qa_item_id
                            .is_some_and(|id| filter.matching_item_ids.contains(&id))
                })
            })
            .filter(|entry| {
                filter
                    .activity_type
                    .is_none_or(|activity_type| entry.activity_type == activity_type)
            })
            .filter(|entry| {
                filter
                    .project_id
                    .is_none_or(|project_id| entry.project_id == Some(project_id))
            })
            .filter(|entry| filter.from.is_none_or(|from| entry.created_at >= from))
            .filter(|entry| filter.until.is_none_or(|until| entry.created_at <= until))
            .filter(|entry| filter.before.is_none_or(|before| entry.cursor() < before))
            .cloned()
            .collect();
        entries.sort_by_key(ActivityLogEntry::cursor);
        entries.reverse();
        entries.truncate(filter.limit);
        Ok(entries)
    }
}

#[async_trait]
impl ProjectRepository for InMemoryQaStore {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(&project_id).cloned())
    }

    async fn find_projects(&self, project_ids: &[ProjectId]) -> AppResult<Vec<Project>> {
        let state = self.state.read().await;
        Ok(project_ids
            .iter()
            .filter_map(|id| state.projects.get(id).cloned())
            .collect())
    }

    async fn list_projects(&self) -> AppResult<Vec<Project>> {
        let state = self.state.read().await;
        let mut projects: Vec<Project> = state.projects.values().cloned().collect();
        projects.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(projects)
    }

    async fn find_phase(&self, phase_id: PhaseId) -> AppResult<Option<ProjectPhase>> {
        Ok(self.state.read().await.phases.get(&phase_id).cloned())
    }

    async fn list_project_phases(&self, project_id: ProjectId) -> AppResult<Vec<ProjectPhase>> {
        let state = self.state.read().await;
        let mut phases: Vec<ProjectPhase> = state
            .phases
            .values()
            .filter(|phase| phase.project_id == project_id)
            .cloned()
            .collect();
        phases.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(phases)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryQaStore {
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<Profile>> {
        Ok(self.state.read().await.profiles.get(&user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[UserId]) -> AppResult<Vec<Profile>> {
        let state = self.state.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn list_profiles(&self) -> AppResult<Vec<Profile>> {
        let state = self.state.read().await;
        let mut profiles: Vec<Profile> = state.profiles.values().cloned().collect();
        profiles.sort_by(|left, right| left.full_name.cmp(&right.full_name));
        Ok(profiles)
    }

    async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<UserRole>> {
        let state = self.state.read().await;
        Ok(state
            .roles
            .iter()
            .filter(|role| role.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use qatrail_application::{
        ActivityLogRepository, FeedScope, NewActivityEntry, QaItemDraft, QaItemRepository,
        TimelineFilter,
    };
    use qatrail_domain::{
        ActivityType, Discipline, ProjectId, QaItemId, QaStatus, Severity,
    };

    use super::InMemoryQaStore;

    fn draft(project_id: ProjectId, item_number: &str) -> QaItemDraft {
        QaItemDraft {
            project_id,
            phase_id: None,
            item_number: item_number.to_owned(),
            title: "Window waterproofing".to_owned(),
            description: None,
            category: None,
            discipline: Discipline::Architectural,
            severity: Severity::Medium,
            status: QaStatus::Noted,
            assigned_to: None,
            due_date: None,
            created_by: None,
        }
    }

    fn entry_for(qa_item_id: QaItemId, description: &str) -> NewActivityEntry {
        NewActivityEntry {
            activity_type: ActivityType::StatusChange,
            description: description.to_owned(),
            old_value: Some("noted".to_owned()),
            new_value: Some("open".to_owned()),
            metadata: None,
            project_id: None,
            phase_id: None,
            qa_item_id: Some(qa_item_id),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn failed_version_check_writes_neither_row_nor_entry() {
        let store = InMemoryQaStore::new();
        let project_id = ProjectId::new();
        let item = store.insert_item(draft(project_id, "QA-2026-001")).await;
        assert!(item.is_ok());
        let item = item.unwrap_or_else(|_| unreachable!());

        let stale = Utc::now() - chrono::Duration::hours(1);
        let result = store
            .apply_transition(item.id, stale, QaStatus::Open, entry_for(item.id, "x"))
            .await;
        assert!(matches!(result, Err(qatrail_core::AppError::Conflict(_))));

        let entries = store.entries_for_item(item.id).await;
        assert!(entries.is_ok());
        assert!(entries.unwrap_or_default().is_empty());

        let current = store.find_item(item.id).await;
        assert!(current.is_ok());
        assert_eq!(
            current.ok().flatten().map(|item| item.status),
            Some(QaStatus::Noted)
        );
    }

    #[tokio::test]
    async fn transition_commits_row_and_entry_at_one_instant() {
        let store = InMemoryQaStore::new();
        let project_id = ProjectId::new();
        let item = store.insert_item(draft(project_id, "QA-2026-001")).await;
        let item = item.unwrap_or_else(|_| unreachable!());

        let mutation = store
            .apply_transition(
                item.id,
                item.version(),
                QaStatus::Open,
                entry_for(item.id, "Changed status from Noted to Open"),
            )
            .await;
        assert!(mutation.is_ok());
        let mutation = mutation.unwrap_or_else(|_| unreachable!());

        assert_eq!(mutation.item.updated_at, mutation.entry.created_at);
        assert_eq!(mutation.item.started_at, Some(mutation.entry.created_at));
    }

    #[tokio::test]
    async fn duplicate_item_numbers_conflict_within_a_project() {
        let store = InMemoryQaStore::new();
        let project_id = ProjectId::new();

        let first = store.insert_item(draft(project_id, "QA-2026-007")).await;
        assert!(first.is_ok());
        let second = store.insert_item(draft(project_id, "QA-2026-007")).await;
        assert!(matches!(second, Err(qatrail_core::AppError::Conflict(_))));

        // The same number in another project is fine.
        let elsewhere = store
            .insert_item(draft(ProjectId::new(), "QA-2026-007"))
            .await;
        assert!(elsewhere.is_ok());
    }

    #[tokio::test]
    async fn entries_since_pages_forward_through_the_scope() {
        let store = InMemoryQaStore::new();
        let qa_item_id = QaItemId::new();
        let other_item_id = QaItemId::new();

        for number in 1..=5 {
            let appended = store
                .append(entry_for(qa_item_id, &format!("entry {number}")))
                .await;
            assert!(appended.is_ok());
        }
        let noise = store.append(entry_for(other_item_id, "noise")).await;
        assert!(noise.is_ok());

        let scope = FeedScope::Item(qa_item_id);
        let first_page = store.entries_since(&scope, None, 2).await;
        assert!(first_page.is_ok());
        let first_page = first_page.unwrap_or_default();
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].description, "entry 1");

        let rest = store
            .entries_since(&scope, first_page.last().map(|entry| entry.cursor()), 10)
            .await;
        assert!(rest.is_ok());
        let rest = rest.unwrap_or_default();
        assert_eq!(rest.len(), 3);
        assert_eq!(rest[0].description, "entry 3");
        assert_eq!(rest[2].description, "entry 5");
    }

    #[tokio::test]
    async fn timeline_query_is_newest_first_and_keyset_bounded() {
        let store = InMemoryQaStore::new();
        let qa_item_id = QaItemId::new();

        for number in 1..=4 {
            let appended = store
                .append(entry_for(qa_item_id, &format!("entry {number}")))
                .await;
            assert!(appended.is_ok());
        }

        let page = store
            .query(TimelineFilter {
                limit: 2,
                ..TimelineFilter::default()
            })
            .await;
        assert!(page.is_ok());
        let page = page.unwrap_or_default();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].description, "entry 4");
        assert_eq!(page[1].description, "entry 3");

        let next = store
            .query(TimelineFilter {
                limit: 2,
                before: page.last().map(|entry| entry.cursor()),
                ..TimelineFilter::default()
            })
            .await;
        assert!(next.is_ok());
        let next = next.unwrap_or_default();
        assert_eq!(next.len(), 2);
        assert_eq!(next[0].description, "entry 2");
        assert_eq!(next[1].description, "entry 1");
    }
}
