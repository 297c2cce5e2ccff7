//! Shared in-memory fakes for service tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{
    ActivityId, ActivityLogEntry, Discipline, PhaseId, Profile, Project, ProjectId, ProjectPhase,
    QaItem, QaItemId, QaStatus, Review, Severity, UserId, UserRole,
};
use tokio::sync::Mutex;

use crate::ports::{
    ActivityLogRepository, FeedScope, ItemMutation, NewActivityEntry, ProfileRepository,
    ProjectRepository, QaItemDraft, QaItemEdit, QaItemRepository, ReviewRepository,
    TimelineFilter,
};

#[derive(Default)]
struct Inner {
    items: HashMap<QaItemId, QaItem>,
    reviews: Vec<Review>,
    entries: Vec<ActivityLogEntry>,
    projects: HashMap<ProjectId, Project>,
    phases: HashMap<PhaseId, ProjectPhase>,
    profiles: HashMap<UserId, Profile>,
    roles: Vec<UserRole>,
    last_instant: Option<DateTime<Utc>>,
}

impl Inner {
    /// Strictly increasing commit clock so versions and cursors never tie.
    fn next_instant(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_instant {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_instant = Some(next);
        next
    }

    fn materialize(&mut self, entry: NewActivityEntry) -> ActivityLogEntry {
        let at = self.next_instant();
        self.materialize_at(entry, at)
    }

    /// Commits an entry at the same instant as the mutation it documents,
    /// so replaying the log reproduces the item's timestamps exactly.
    fn materialize_at(&mut self, entry: NewActivityEntry, at: DateTime<Utc>) -> ActivityLogEntry {
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

/// In-memory store implementing every repository port.
#[derive(Default)]
pub struct TestStore {
    inner: Mutex<Inner>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_project(&self, name: &str) -> Project {
        let mut inner = self.inner.lock().await;
        let now = inner.next_instant();
        let project = Project {
            id: ProjectId::new(),
            name: name.to_owned(),
            description: None,
            client: None,
            status: Some("active".to_owned()),
            start_date: None,
            end_date: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        inner.projects.insert(project.id, project.clone());
        project
    }

    pub async fn seed_profile(&self, full_name: &str) -> Profile {
        let mut inner = self.inner.lock().await;
        let now = inner.next_instant();
        let profile = Profile {
            id: UserId::new(),
            full_name: Some(full_name.to_owned()),
            email: Some(format!(
                "{}@example.com",
                full_name.to_lowercase().replace(' ', ".")
            )),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        inner.profiles.insert(profile.id, profile.clone());
        profile
    }

    pub async fn seed_item(&self, status: QaStatus) -> QaItem {
        let project = self.seed_project("Test Project").await;
        self.seed_item_in(project.id, status).await
    }

    pub async fn seed_item_in(&self, project_id: ProjectId, status: QaStatus) -> QaItem {
        let mut inner = self.inner.lock().await;
        let now = inner.next_instant();
        let sequence = inner
            .items
            .values()
            .filter(|item| item.project_id == project_id)
            .count()
            + 1;
        let item = QaItem {
            id: QaItemId::new(),
            project_id,
            phase_id: None,
            item_number: format!("QA-2026-{sequence:03}"),
            title: format!("Seeded finding {sequence}"),
            description: None,
            category: None,
            discipline: Discipline::Electrical,
            severity: Severity::Medium,
            status,
            assigned_to: None,
            due_date: None,
            started_at: None,
            resolved_at: None,
            verified_at: None,
            closed_at: None,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        inner.items.insert(item.id, item.clone());
        item
    }

    pub async fn item(&self, qa_item_id: QaItemId) -> QaItem {
        let inner = self.inner.lock().await;
        inner
            .items
            .get(&qa_item_id)
            .cloned()
            .unwrap_or_else(|| unreachable!("item seeded by the test"))
    }

    pub async fn entries_for(&self, qa_item_id: QaItemId) -> Vec<ActivityLogEntry> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<ActivityLogEntry> = inner
            .entries
            .iter()
            .filter(|entry| entry.qa_item_id == Some(qa_item_id))
            .cloned()
            .collect();
        entries.sort_by_key(ActivityLogEntry::cursor);
        entries
    }

    pub async fn all_reviews(&self) -> Vec<Review> {
        self.inner.lock().await.reviews.clone()
    }
}

#[async_trait]
impl QaItemRepository for TestStore {
    async fn find_item(&self, qa_item_id: QaItemId) -> AppResult<Option<QaItem>> {
        Ok(self.inner.lock().await.items.get(&qa_item_id).cloned())
    }

    async fn find_items(&self, qa_item_ids: &[QaItemId]) -> AppResult<Vec<QaItem>> {
        let inner = self.inner.lock().await;
        Ok(qa_item_ids
            .iter()
            .filter_map(|id| inner.items.get(id).cloned())
            .collect())
    }

    async fn list_project_items(&self, project_id: ProjectId) -> AppResult<Vec<QaItem>> {
        let inner = self.inner.lock().await;
        let mut items: Vec<QaItem> = inner
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
        let inner = self.inner.lock().await;
        Ok(inner
            .items
            .values()
            .find(|item| item.project_id == project_id && item.item_number == item_number)
            .cloned())
    }

    async fn search_item_ids(&self, free_text: &str) -> AppResult<Vec<QaItemId>> {
        let needle = free_text.to_lowercase();
        let inner = self.inner.lock().await;
        Ok(inner
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
        let inner = self.inner.lock().await;
        let count = inner
            .items
            .values()
            .filter(|item| item.project_id == project_id)
            .count();
        Ok(count as u32 + 1)
    }

    async fn insert_item(&self, draft: QaItemDraft) -> AppResult<QaItem> {
        let mut inner = self.inner.lock().await;
        let now = inner.next_instant();
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
        inner.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn apply_transition(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        target: QaStatus,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation> {
        let mut inner = self.inner.lock().await;
        let at = inner.next_instant();

        let item = inner
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
        let entry = inner.materialize_at(entry, at);
        Ok(ItemMutation { item, entry })
    }

    async fn apply_edit(
        &self,
        qa_item_id: QaItemId,
        expected_version: DateTime<Utc>,
        edit: QaItemEdit,
        entry: NewActivityEntry,
    ) -> AppResult<ItemMutation> {
        let mut inner = self.inner.lock().await;
        let at = inner.next_instant();

        let item = inner
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
        let entry = inner.materialize_at(entry, at);
        Ok(ItemMutation { item, entry })
    }
}

#[async_trait]
impl ReviewRepository for TestStore {
    async fn append_review(
        &self,
        review: Review,
        entry: NewActivityEntry,
    ) -> AppResult<(Review, ActivityLogEntry)> {
        let mut inner = self.inner.lock().await;
        inner.reviews.push(review.clone());
        let entry = inner.materialize(entry);
        Ok((review, entry))
    }

    async fn list_reviews(&self, qa_item_id: QaItemId) -> AppResult<Vec<Review>> {
        let inner = self.inner.lock().await;
        let mut reviews: Vec<Review> = inner
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
impl ActivityLogRepository for TestStore {
    async fn append(&self, entry: NewActivityEntry) -> AppResult<ActivityLogEntry> {
        let mut inner = self.inner.lock().await;
        Ok(inner.materialize(entry))
    }

    async fn entries_for_item(&self, qa_item_id: QaItemId) -> AppResult<Vec<ActivityLogEntry>> {
        Ok(self.entries_for(qa_item_id).await)
    }

    async fn entries_since(
        &self,
        scope: &FeedScope,
        cursor: Option<qatrail_domain::FeedCursor>,
        limit: usize,
    ) -> AppResult<Vec<ActivityLogEntry>> {
        let inner = self.inner.lock().await;
        let mut entries: Vec<ActivityLogEntry> = inner
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
        let inner = self.inner.lock().await;
        let needle = filter.free_text.as_deref().map(str::to_lowercase);
        let mut entries: Vec<ActivityLogEntry> = inner
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
impl ProjectRepository for TestStore {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.inner.lock().await.projects.get(&project_id).cloned())
    }

    async fn find_projects(&self, project_ids: &[ProjectId]) -> AppResult<Vec<Project>> {
        let inner = self.inner.lock().await;
        Ok(project_ids
            .iter()
            .filter_map(|id| inner.projects.get(id).cloned())
            .collect())
    }

    async fn list_projects(&self) -> AppResult<Vec<Project>> {
        let inner = self.inner.lock().await;
        let mut projects: Vec<Project> = inner.projects.values().cloned().collect();
        projects.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(projects)
    }

    async fn find_phase(&self, phase_id: PhaseId) -> AppResult<Option<ProjectPhase>> {
        Ok(self.inner.lock().await.phases.get(&phase_id).cloned())
    }

    async fn list_project_phases(&self, project_id: ProjectId) -> AppResult<Vec<ProjectPhase>> {
        let inner = self.inner.lock().await;
        let mut phases: Vec<ProjectPhase> = inner
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
impl ProfileRepository for TestStore {
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<Profile>> {
        Ok(self.inner.lock().await.profiles.get(&user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[UserId]) -> AppResult<Vec<Profile>> {
        let inner = self.inner.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| inner.profiles.get(id).cloned())
            .collect())
    }

    async fn list_profiles(&self) -> AppResult<Vec<Profile>> {
        let inner = self.inner.lock().await;
        let mut profiles: Vec<Profile> = inner.profiles.values().cloned().collect();
        profiles.sort_by(|left, right| left.full_name.cmp(&right.full_name));
        Ok(profiles)
    }

    async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<UserRole>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .roles
            .iter()
            .filter(|role| role.user_id == user_id)
            .cloned()
            .collect())
    }
}
