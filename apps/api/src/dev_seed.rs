//! Demo data for in-memory storage mode.

use std::sync::Arc;

use chrono::Utc;
use qatrail_application::ImportItemInput;
use qatrail_core::AppResult;
use qatrail_domain::{
    Actor, Discipline, PhaseId, Profile, Project, ProjectId, ProjectPhase, QaStatus, Role,
    Severity, UserId, UserRole, UserRoleId,
};
use qatrail_infrastructure::InMemoryQaStore;

use crate::state::AppState;

/// Seeds a small project with items, transitions and a review so the feed
/// and timeline have something to show out of the box.
pub async fn seed_demo_data(state: &AppState, store: &Arc<InMemoryQaStore>) -> AppResult<()> {
    let now = Utc::now();

    let pm = Profile {
        id: UserId::new(),
        full_name: Some("Sarah Johnson".to_owned()),
        email: Some("sarah.j@example.com".to_owned()),
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };
    let senior = Profile {
        id: UserId::new(),
        full_name: Some("Michael Chen".to_owned()),
        email: Some("michael.c@example.com".to_owned()),
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };
    let junior = Profile {
        id: UserId::new(),
        full_name: Some("David Park".to_owned()),
        email: Some("david.p@example.com".to_owned()),
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };

    for (profile, role) in [
        (&pm, Role::Pm),
        (&senior, Role::SeniorEngineer),
        (&junior, Role::JuniorEngineer),
    ] {
        store.insert_profile(profile.clone()).await;
        store
            .insert_user_role(UserRole {
                id: UserRoleId::new(),
                user_id: profile.id,
                role,
                created_at: now,
            })
            .await;
    }

    let project = Project {
        id: ProjectId::new(),
        name: "Downtown Office Tower".to_owned(),
        description: Some("24-storey commercial build-out".to_owned()),
        client: Some("Meridian Development".to_owned()),
        status: Some("active".to_owned()),
        start_date: None,
        end_date: None,
        created_by: Some(pm.id),
        created_at: now,
        updated_at: now,
    };
    store.insert_project(project.clone()).await;

    let phase = ProjectPhase {
        id: PhaseId::new(),
        project_id: project.id,
        name: "Electrical Rough-In".to_owned(),
        description: None,
        discipline: Discipline::Electrical,
        created_at: now,
        updated_at: now,
    };
    store.insert_phase(phase.clone()).await;

    let pm_actor = Actor::new(pm.id, Role::Pm);
    state
        .import_service
        .import_items(
            &pm_actor,
            project.id,
            vec![
                ImportItemInput {
                    item_number: None,
                    title: "Electrical conduit routing issue".to_owned(),
                    description: Some("Conduit clashes with return duct at grid C-4".to_owned()),
                    category: Some("coordination".to_owned()),
                    discipline: Discipline::Electrical,
                    severity: Severity::High,
                    status: None,
                    phase_id: Some(phase.id),
                    assigned_to: Some(junior.id),
                    due_date: None,
                },
                ImportItemInput {
                    item_number: None,
                    title: "HVAC duct clearance conflict".to_owned(),
                    description: None,
                    category: None,
                    discipline: Discipline::Mechanical,
                    severity: Severity::Medium,
                    status: None,
                    phase_id: None,
                    assigned_to: Some(senior.id),
                    due_date: None,
                },
                ImportItemInput {
                    item_number: None,
                    title: "Concrete pour quality concern".to_owned(),
                    description: None,
                    category: None,
                    discipline: Discipline::Civil,
                    severity: Severity::Critical,
                    status: None,
                    phase_id: None,
                    assigned_to: None,
                    due_date: None,
                },
            ],
        )
        .await?;

    // Walk the first item into review so the timeline shows a real
    // history: noted -> open, then a senior review resolving it.
    let items = state.item_service.list_project_items(project.id).await?;
    if let Some(first) = items.first() {
        let junior_actor = Actor::new(junior.id, Role::JuniorEngineer);
        let opened = state
            .transition_service
            .attempt_transition(&junior_actor, first.id, QaStatus::Open, first.version())
            .await?;

        let senior_actor = Actor::new(senior.id, Role::SeniorEngineer);
        state
            .review_service
            .submit_review(
                &senior_actor,
                opened.item.id,
                QaStatus::Resolved,
                "Rerouted per RFI-112; verified clearances on site",
            )
            .await?;
    }

    Ok(())
}
