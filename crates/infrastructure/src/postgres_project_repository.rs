use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use qatrail_application::ProjectRepository;
use qatrail_core::{AppError, AppResult};
use qatrail_domain::{Discipline, PhaseId, Project, ProjectId, ProjectPhase, UserId};

use crate::store_error::store_error;

const SELECT_PROJECT: &str = r"
    SELECT id, name, description, client, status, start_date, end_date,
           created_by, created_at, updated_at
    FROM projects
";

/// PostgreSQL-backed repository for project reference data.
#[derive(Clone)]
pub struct PostgresProjectRepository {
    pool: PgPool,
}

impl PostgresProjectRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    client: Option<String>,
    status: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: ProjectId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            client: row.client,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PhaseRow {
    id: Uuid,
    project_id: Uuid,
    name: String,
    description: Option<String>,
    discipline: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PhaseRow {
    fn into_domain(self) -> AppResult<ProjectPhase> {
        Ok(ProjectPhase {
            id: PhaseId::from_uuid(self.id),
            project_id: ProjectId::from_uuid(self.project_id),
            name: self.name,
            description: self.description,
            discipline: Discipline::from_str(&self.discipline)
                .map_err(|error| AppError::Internal(error.to_string()))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl ProjectRepository for PostgresProjectRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!("{SELECT_PROJECT} WHERE id = $1"))
            .bind(project_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| store_error("failed to load project", error))?;

        Ok(row.map(Project::from))
    }

    async fn find_projects(&self, project_ids: &[ProjectId]) -> AppResult<Vec<Project>> {
        let ids: Vec<Uuid> = project_ids.iter().map(ProjectId::as_uuid).collect();
        let rows = sqlx::query_as::<_, ProjectRow>(&format!("{SELECT_PROJECT} WHERE id = ANY($1)"))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_error("failed to load projects", error))?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn list_projects(&self) -> AppResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!("{SELECT_PROJECT} ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| store_error("failed to list projects", error))?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn find_phase(&self, phase_id: PhaseId) -> AppResult<Option<ProjectPhase>> {
        let row = sqlx::query_as::<_, PhaseRow>(
            r"
            SELECT id, project_id, name, description, discipline, created_at, updated_at
            FROM project_phases
            WHERE id = $1
            ",
        )
        .bind(phase_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| store_error("failed to load phase", error))?;

        row.map(PhaseRow::into_domain).transpose()
    }

    async fn list_project_phases(&self, project_id: ProjectId) -> AppResult<Vec<ProjectPhase>> {
        let rows = sqlx::query_as::<_, PhaseRow>(
            r"
            SELECT id, project_id, name, description, discipline, created_at, updated_at
            FROM project_phases
            WHERE project_id = $1
            ORDER BY name
            ",
        )
        .bind(project_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| store_error("failed to list phases", error))?;

        rows.into_iter().map(PhaseRow::into_domain).collect()
    }
}
