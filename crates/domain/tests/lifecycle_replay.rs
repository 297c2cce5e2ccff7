//! Property tests: the activity log deterministically reconstructs item state.

use chrono::{Duration, Utc};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

use qatrail_domain::{
    ActivityId, ActivityLogEntry, ActivityType, Discipline, ProjectId, QaItem, QaItemId, QaStatus,
    Severity, replay_lifecycle,
};

fn fresh_item(now: chrono::DateTime<Utc>) -> QaItem {
    QaItem {
        id: QaItemId::new(),
        project_id: ProjectId::new(),
        phase_id: None,
        item_number: "QA-2026-100".to_owned(),
        title: "Generated walk".to_owned(),
        description: None,
        category: None,
        discipline: Discipline::Civil,
        severity: Severity::Medium,
        status: QaStatus::Noted,
        assigned_to: None,
        due_date: None,
        started_at: None,
        resolved_at: None,
        verified_at: None,
        closed_at: None,
        created_by: None,
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    /// Any walk along valid edges replays to exactly the state the walk
    /// left the item in, including first-entry phase timestamps.
    #[test]
    fn replay_agrees_with_any_valid_walk(choices in proptest::collection::vec(0usize..4, 0..32)) {
        let base = Utc::now();
        let mut item = fresh_item(base);
        let mut entries: Vec<ActivityLogEntry> = Vec::new();

        for (step, choice) in choices.iter().enumerate() {
            let targets = item.status.reachable_targets();
            prop_assert!(!targets.is_empty());
            let target = targets[choice % targets.len()];
            let at = base + Duration::minutes(step as i64 + 1);

            entries.push(ActivityLogEntry {
                id: ActivityId::generate(),
                activity_type: ActivityType::StatusChange,
                description: format!(
                    "Changed status from {} to {}",
                    item.status.display_name(),
                    target.display_name()
                ),
                old_value: Some(item.status.as_str().to_owned()),
                new_value: Some(target.as_str().to_owned()),
                metadata: None,
                project_id: Some(item.project_id),
                phase_id: None,
                qa_item_id: Some(item.id),
                user_id: None,
                created_at: at,
            });
            item.apply_status(target, at);
        }

        let replayed = replay_lifecycle(&entries);
        prop_assert!(replayed.is_ok());
        let replayed = replayed.map_err(|_| TestCaseError::fail("replay failed"))?;

        prop_assert_eq!(replayed.status, item.status);
        prop_assert_eq!(replayed.started_at, item.started_at);
        prop_assert_eq!(replayed.resolved_at, item.resolved_at);
        prop_assert_eq!(replayed.verified_at, item.verified_at);
        prop_assert_eq!(replayed.closed_at, item.closed_at);
    }

    /// Every status has at least one outgoing edge and at most two, and no
    /// edge ever skips more than one lifecycle step.
    #[test]
    fn transition_graph_stays_local(index in 0usize..5) {
        let status = QaStatus::all()[index];
        let targets = status.reachable_targets();
        prop_assert!(!targets.is_empty());
        prop_assert!(targets.len() <= 2);
        for target in targets {
            let from = QaStatus::all().iter().position(|s| s == &status);
            let to = QaStatus::all().iter().position(|s| s == &target);
            let (from, to) = (from.map_or(0, |v| v as i64), to.map_or(0, |v| v as i64));
            prop_assert_eq!((from - to).abs(), 1);
        }
    }
}
