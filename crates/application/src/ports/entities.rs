use async_trait::async_trait;
use qatrail_core::AppResult;
use qatrail_domain::{PhaseId, Profile, Project, ProjectId, ProjectPhase, UserId, UserRole};

/// Port for project and phase reference data.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Looks up one project.
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>>;

    /// Looks up many projects at once; missing ids are simply absent.
    async fn find_projects(&self, project_ids: &[ProjectId]) -> AppResult<Vec<Project>>;

    /// Lists all projects ordered by name.
    async fn list_projects(&self) -> AppResult<Vec<Project>>;

    /// Looks up one phase.
    async fn find_phase(&self, phase_id: PhaseId) -> AppResult<Option<ProjectPhase>>;

    /// Lists a project's phases ordered by name.
    async fn list_project_phases(&self, project_id: ProjectId) -> AppResult<Vec<ProjectPhase>>;
}

/// Port for user profile and role reference data.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Looks up one profile.
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<Profile>>;

    /// Looks up many profiles at once; missing ids are simply absent.
    async fn find_profiles(&self, user_ids: &[UserId]) -> AppResult<Vec<Profile>>;

    /// Lists all profiles ordered by name.
    async fn list_profiles(&self) -> AppResult<Vec<Profile>>;

    /// Lists role assignments for one user.
    async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<UserRole>>;
}
