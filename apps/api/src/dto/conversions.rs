use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use qatrail_application::{
    DisplayEntry, ProjectSummary, QaItemSummary, RefResolution, UserSummary,
};
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{
    ActivityLogEntry, Discipline, PhaseId, Profile, Project, ProjectPhase, QaItem, QaStatus,
    Review, Severity, UserId,
};
use uuid::Uuid;

use super::types::{
    ActivityEntryResponse, DisplayEntryResponse, PhaseResponse, ProfileResponse,
    ProjectRefResponse, ProjectResponse, QaItemRefResponse, QaItemResponse, ReviewResponse,
    UserRefResponse,
};

/// Parses a status code from a request body.
pub fn parse_status(value: &str) -> AppResult<QaStatus> {
    QaStatus::from_str(value)
}

/// Parses a severity code from a request body.
pub fn parse_severity(value: &str) -> AppResult<Severity> {
    Severity::from_str(value)
}

/// Parses a discipline code from a request body.
pub fn parse_discipline(value: &str) -> AppResult<Discipline> {
    Discipline::from_str(value)
}

/// Parses an RFC3339 version stamp from a request body.
pub fn parse_version(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|stamp| stamp.with_timezone(&Utc))
        .map_err(|_| {
            AppError::Validation(format!("expected_version '{value}' is not an RFC3339 timestamp"))
        })
}

/// Parses a `YYYY-MM-DD` date from a request body.
pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::from_str(value)
        .map_err(|_| AppError::Validation(format!("'{value}' is not a YYYY-MM-DD date")))
}

/// Parses a user id from a request body.
pub fn parse_user_id(value: &str) -> AppResult<UserId> {
    Uuid::parse_str(value)
        .map(UserId::from_uuid)
        .map_err(|_| AppError::Validation(format!("user id '{value}' is not a UUID")))
}

/// Parses a phase id from a request body.
pub fn parse_phase_id(value: &str) -> AppResult<PhaseId> {
    Uuid::parse_str(value)
        .map(PhaseId::from_uuid)
        .map_err(|_| AppError::Validation(format!("phase id '{value}' is not a UUID")))
}

impl From<QaItem> for QaItemResponse {
    fn from(item: QaItem) -> Self {
        Self {
            id: item.id.to_string(),
            project_id: item.project_id.to_string(),
            phase_id: item.phase_id.map(|id| id.to_string()),
            item_number: item.item_number,
            title: item.title,
            description: item.description,
            category: item.category,
            discipline: item.discipline.as_str().to_owned(),
            severity: item.severity.as_str().to_owned(),
            status: item.status.as_str().to_owned(),
            assigned_to: item.assigned_to.map(|id| id.to_string()),
            due_date: item.due_date.map(|date| date.to_string()),
            started_at: item.started_at.map(|at| at.to_rfc3339()),
            resolved_at: item.resolved_at.map(|at| at.to_rfc3339()),
            verified_at: item.verified_at.map(|at| at.to_rfc3339()),
            closed_at: item.closed_at.map(|at| at.to_rfc3339()),
            created_by: item.created_by.map(|id| id.to_string()),
            created_at: item.created_at.to_rfc3339(),
            updated_at: item.updated_at.to_rfc3339(),
        }
    }
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id().to_string(),
            qa_item_id: review.qa_item_id().to_string(),
            reviewer_id: review.reviewer_id().to_string(),
            reviewer_role: review.reviewer_role().as_str().to_owned(),
            proposed_status: review.proposed_status().as_str().to_owned(),
            comment: review.comment().to_owned(),
            created_at: review.created_at().to_rfc3339(),
        }
    }
}

impl From<ActivityLogEntry> for ActivityEntryResponse {
    fn from(entry: ActivityLogEntry) -> Self {
        let cursor = entry.cursor().as_token();
        Self {
            id: entry.id.to_string(),
            activity_type: entry.activity_type.as_str().to_owned(),
            description: entry.description,
            old_value: entry.old_value,
            new_value: entry.new_value,
            metadata: entry.metadata,
            project_id: entry.project_id.map(|id| id.to_string()),
            phase_id: entry.phase_id.map(|id| id.to_string()),
            qa_item_id: entry.qa_item_id.map(|id| id.to_string()),
            user_id: entry.user_id.map(|id| id.to_string()),
            created_at: entry.created_at.to_rfc3339(),
            cursor,
        }
    }
}

impl From<RefResolution<UserSummary>> for UserRefResponse {
    fn from(resolution: RefResolution<UserSummary>) -> Self {
        match resolution {
            RefResolution::Resolved(user) => Self::Resolved {
                id: user.id.to_string(),
                full_name: user.full_name,
                email: user.email,
            },
            RefResolution::Missing => Self::Unknown,
        }
    }
}

impl From<RefResolution<QaItemSummary>> for QaItemRefResponse {
    fn from(resolution: RefResolution<QaItemSummary>) -> Self {
        match resolution {
            RefResolution::Resolved(item) => Self::Resolved {
                id: item.id.to_string(),
                item_number: item.item_number,
                title: item.title,
            },
            RefResolution::Missing => Self::Unknown,
        }
    }
}

impl From<RefResolution<ProjectSummary>> for ProjectRefResponse {
    fn from(resolution: RefResolution<ProjectSummary>) -> Self {
        match resolution {
            RefResolution::Resolved(project) => Self::Resolved {
                id: project.id.to_string(),
                name: project.name,
            },
            RefResolution::Missing => Self::Unknown,
        }
    }
}

impl From<DisplayEntry> for DisplayEntryResponse {
    fn from(display: DisplayEntry) -> Self {
        Self {
            entry: display.entry.into(),
            user: display.user.map(UserRefResponse::from),
            qa_item: display.qa_item.map(QaItemRefResponse::from),
            project: display.project.map(ProjectRefResponse::from),
        }
    }
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id.to_string(),
            name: project.name,
            description: project.description,
            client: project.client,
            status: project.status,
            start_date: project.start_date.map(|date| date.to_string()),
            end_date: project.end_date.map(|date| date.to_string()),
            created_at: project.created_at.to_rfc3339(),
        }
    }
}

impl From<ProjectPhase> for PhaseResponse {
    fn from(phase: ProjectPhase) -> Self {
        Self {
            id: phase.id.to_string(),
            project_id: phase.project_id.to_string(),
            name: phase.name,
            description: phase.description,
            discipline: phase.discipline.as_str().to_owned(),
        }
    }
}

impl ProfileResponse {
    /// Builds the response from a profile and its resolved roles.
    #[must_use]
    pub fn from_profile_with_roles(profile: Profile, roles: Vec<qatrail_domain::Role>) -> Self {
        Self {
            id: profile.id.to_string(),
            full_name: profile.full_name,
            email: profile.email,
            avatar_url: profile.avatar_url,
            roles: roles.into_iter().map(|role| role.as_str().to_owned()).collect(),
        }
    }
}
