use std::str::FromStr;

use qatrail_core::AppError;
use serde::{Deserialize, Serialize};

use crate::profile::Role;

/// Lifecycle status of a QA item.
///
/// The five-state enum is the authoritative set; values that only ever
/// appeared in illustrative front-end data (`IN_PROGRESS`, `NEEDS_INFO`)
/// are rejected at every boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaStatus {
    /// Finding recorded, not yet being worked.
    Noted,
    /// Actively being worked by the assignee.
    Open,
    /// Work claimed complete, awaiting verification.
    Resolved,
    /// Resolution verified by a reviewer empowered to sign off.
    Verified,
    /// Item closed out.
    Closed,
}

impl QaStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noted => "noted",
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Verified => "verified",
            Self::Closed => "closed",
        }
    }

    /// Returns the human-readable name used in activity descriptions.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Noted => "Noted",
            Self::Open => "Open",
            Self::Resolved => "Resolved",
            Self::Verified => "Verified",
            Self::Closed => "Closed",
        }
    }

    /// Returns all statuses in lifecycle order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[QaStatus] = &[
            QaStatus::Noted,
            QaStatus::Open,
            QaStatus::Resolved,
            QaStatus::Verified,
            QaStatus::Closed,
        ];

        ALL
    }

    /// Minimum role an actor needs for an item to *enter* this state.
    ///
    /// Forward edges gate on the target state; corrective edges gate on the
    /// state being left, so anyone who could have advanced an item may also
    /// reopen it.
    #[must_use]
    pub fn minimum_entry_role(&self) -> Role {
        match self {
            Self::Noted | Self::Open => Role::JuniorEngineer,
            Self::Resolved => Role::SeniorEngineer,
            Self::Verified | Self::Closed => Role::Pm,
        }
    }

    /// Looks up the transition rule for `self -> target`, if the edge exists.
    #[must_use]
    pub fn transition_to(&self, target: QaStatus) -> Option<&'static TransitionRule> {
        TRANSITIONS
            .iter()
            .find(|rule| rule.from == *self && rule.to == target)
    }

    /// Returns the statuses reachable from this one in a single edge.
    #[must_use]
    pub fn reachable_targets(&self) -> Vec<QaStatus> {
        TRANSITIONS
            .iter()
            .filter(|rule| rule.from == *self)
            .map(|rule| rule.to)
            .collect()
    }
}

impl FromStr for QaStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "noted" => Ok(Self::Noted),
            "open" => Ok(Self::Open),
            "resolved" => Ok(Self::Resolved),
            "verified" => Ok(Self::Verified),
            "closed" => Ok(Self::Closed),
            _ => Err(AppError::Validation(format!("unknown status '{value}'"))),
        }
    }
}

/// Direction of a transition edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Normal lifecycle progression.
    Forward,
    /// Rework edge reopening an item one step back.
    Corrective,
}

/// One permitted edge in the status transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    /// Source status.
    pub from: QaStatus,
    /// Target status.
    pub to: QaStatus,
    /// Whether the edge advances or reopens.
    pub kind: TransitionKind,
}

impl TransitionRule {
    /// Minimum role allowed to take this edge.
    #[must_use]
    pub fn required_role(&self) -> Role {
        match self.kind {
            TransitionKind::Forward => self.to.minimum_entry_role(),
            TransitionKind::Corrective => self.from.minimum_entry_role(),
        }
    }
}

/// The complete status transition graph.
///
/// Four forward edges and their four corrective mirrors; every other
/// status pair is unreachable in one step.
pub const TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: QaStatus::Noted,
        to: QaStatus::Open,
        kind: TransitionKind::Forward,
    },
    TransitionRule {
        from: QaStatus::Open,
        to: QaStatus::Resolved,
        kind: TransitionKind::Forward,
    },
    TransitionRule {
        from: QaStatus::Resolved,
        to: QaStatus::Verified,
        kind: TransitionKind::Forward,
    },
    TransitionRule {
        from: QaStatus::Verified,
        to: QaStatus::Closed,
        kind: TransitionKind::Forward,
    },
    TransitionRule {
        from: QaStatus::Open,
        to: QaStatus::Noted,
        kind: TransitionKind::Corrective,
    },
    TransitionRule {
        from: QaStatus::Resolved,
        to: QaStatus::Open,
        kind: TransitionKind::Corrective,
    },
    TransitionRule {
        from: QaStatus::Verified,
        to: QaStatus::Resolved,
        kind: TransitionKind::Corrective,
    },
    TransitionRule {
        from: QaStatus::Closed,
        to: QaStatus::Verified,
        kind: TransitionKind::Corrective,
    },
];
