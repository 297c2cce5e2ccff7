use chrono::{DateTime, Utc};
use qatrail_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::{Role, UserId};
use crate::qa_item::QaItemId;
use crate::status::QaStatus;

/// Unique identifier for a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(Uuid);

impl ReviewId {
    /// Creates a new random review identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a review identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// One reviewer comment proposing a status for a QA item.
///
/// Immutable once created. The reviewer's role is captured at submission
/// time so historical reviews stay accurate if the user's role later
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    id: ReviewId,
    qa_item_id: QaItemId,
    reviewer_id: UserId,
    reviewer_role: Role,
    proposed_status: QaStatus,
    comment: NonEmptyString,
    created_at: DateTime<Utc>,
}

impl Review {
    /// Creates a review with a validated, non-empty comment.
    pub fn new(
        qa_item_id: QaItemId,
        reviewer_id: UserId,
        reviewer_role: Role,
        proposed_status: QaStatus,
        comment: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id: ReviewId::new(),
            qa_item_id,
            reviewer_id,
            reviewer_role,
            proposed_status,
            comment: NonEmptyString::new(comment)?,
            created_at,
        })
    }

    /// Rehydrates a review from stored fields.
    pub fn from_parts(
        id: ReviewId,
        qa_item_id: QaItemId,
        reviewer_id: UserId,
        reviewer_role: Role,
        proposed_status: QaStatus,
        comment: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            qa_item_id,
            reviewer_id,
            reviewer_role,
            proposed_status,
            comment: NonEmptyString::new(comment)?,
            created_at,
        })
    }

    /// Returns the review identifier.
    #[must_use]
    pub fn id(&self) -> ReviewId {
        self.id
    }

    /// Returns the reviewed item.
    #[must_use]
    pub fn qa_item_id(&self) -> QaItemId {
        self.qa_item_id
    }

    /// Returns the reviewing user.
    #[must_use]
    pub fn reviewer_id(&self) -> UserId {
        self.reviewer_id
    }

    /// Returns the reviewer's role at submission time.
    #[must_use]
    pub fn reviewer_role(&self) -> Role {
        self.reviewer_role
    }

    /// Returns the status the reviewer proposed.
    #[must_use]
    pub fn proposed_status(&self) -> QaStatus {
        self.proposed_status
    }

    /// Returns the review comment.
    #[must_use]
    pub fn comment(&self) -> &str {
        self.comment.as_str()
    }

    /// Returns the submission timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::Review;
    use crate::profile::{Role, UserId};
    use crate::qa_item::QaItemId;
    use crate::status::QaStatus;

    #[test]
    fn review_requires_a_comment() {
        let result = Review::new(
            QaItemId::new(),
            UserId::new(),
            Role::SeniorEngineer,
            QaStatus::Resolved,
            "   ",
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn review_captures_role_at_submission() {
        let review = Review::new(
            QaItemId::new(),
            UserId::new(),
            Role::Pm,
            QaStatus::Verified,
            "verified against the revised drawings",
            Utc::now(),
        );
        assert!(review.is_ok());
        assert_eq!(
            review.map(|review| review.reviewer_role()).ok(),
            Some(Role::Pm)
        );
    }
}
