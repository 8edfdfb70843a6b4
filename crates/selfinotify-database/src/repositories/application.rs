//! Application repository implementation.

use sqlx::PgPool;

use selfinotify_core::error::{AppError, ErrorKind};
use selfinotify_core::result::AppResult;
use selfinotify_entity::application::{Application, CreateApplication};

/// Repository for application (tenant channel) CRUD.
#[derive(Debug, Clone)]
pub struct ApplicationRepository {
    pool: PgPool,
}

impl ApplicationRepository {
    /// Create a new application repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new application with a freshly generated token.
    pub async fn create(&self, data: &CreateApplication, app_token: &str) -> AppResult<Application> {
        sqlx::query_as::<_, Application>(
            "INSERT INTO applications (name, description, platform, app_token) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.platform)
        .bind(app_token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create application", e)
        })
    }

    /// Find an application by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Application>> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find application", e)
            })
    }

    /// Find an application by its channel token.
    ///
    /// A regenerated token replaces the stored value, so lookups with the
    /// old token miss and the caller reports `InvalidToken`.
    pub async fn find_by_token(&self, app_token: &str) -> AppResult<Option<Application>> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE app_token = $1")
            .bind(app_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find application by token", e)
            })
    }

    /// List all applications, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<Application>> {
        sqlx::query_as::<_, Application>("SELECT * FROM applications ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list applications", e)
            })
    }

    /// Update name, description, and platform.
    pub async fn update(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        platform: &str,
    ) -> AppResult<Option<Application>> {
        sqlx::query_as::<_, Application>(
            "UPDATE applications SET name = $2, description = $3, platform = $4, \
             updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(platform)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update application", e)
        })
    }

    /// Replace the application's token, preserving its id.
    pub async fn update_token(&self, id: i64, app_token: &str) -> AppResult<Option<Application>> {
        sqlx::query_as::<_, Application>(
            "UPDATE applications SET app_token = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(app_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to regenerate token", e)
        })
    }

    /// Delete an application; notification history cascades.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete application", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
