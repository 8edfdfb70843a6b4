//! Application registration, token lifecycle, and channel eviction.

use std::sync::Arc;

use tracing::info;

use selfinotify_core::error::AppError;
use selfinotify_core::result::AppResult;
use selfinotify_core::token::generate_app_token;
use selfinotify_database::repositories::ApplicationRepository;
use selfinotify_entity::application::{Application, CreateApplication};
use selfinotify_realtime::ConnectionRegistry;

/// Manages application registration and token lifecycle.
#[derive(Debug, Clone)]
pub struct ApplicationService {
    /// Application repository.
    applications: Arc<ApplicationRepository>,
    /// Connection registry, for evicting sessions on token changes.
    registry: Arc<ConnectionRegistry>,
}

impl ApplicationService {
    /// Creates a new application service.
    pub fn new(applications: Arc<ApplicationRepository>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            applications,
            registry,
        }
    }

    /// Registers a new application with a freshly generated token.
    pub async fn create(&self, data: CreateApplication) -> AppResult<Application> {
        if data.name.trim().is_empty() {
            return Err(AppError::validation("Application name must not be empty"));
        }

        let token = generate_app_token();
        let application = self.applications.create(&data, &token).await?;

        info!(
            application_id = application.id,
            name = %application.name,
            "Application registered"
        );
        Ok(application)
    }

    /// Lists all applications, newest first.
    pub async fn list(&self) -> AppResult<Vec<Application>> {
        self.applications.find_all().await
    }

    /// Gets an application by id.
    pub async fn get(&self, id: i64) -> AppResult<Application> {
        self.applications
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Application {id} not found")))
    }

    /// Updates an application's name, description, and platform.
    ///
    /// The token is never touched here; that requires explicit regeneration.
    pub async fn update(&self, id: i64, data: CreateApplication) -> AppResult<Application> {
        if data.name.trim().is_empty() {
            return Err(AppError::validation("Application name must not be empty"));
        }

        self.applications
            .update(id, &data.name, data.description.as_deref(), &data.platform)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Application {id} not found")))
    }

    /// Replaces the application's token and evicts its connected sessions.
    ///
    /// Sessions authenticated with the old token are disconnected; they must
    /// re-authenticate with the new value to keep receiving notifications.
    pub async fn regenerate_token(&self, id: i64) -> AppResult<Application> {
        let existing = self.get(id).await?;
        let old_token = existing.app_token;

        let new_token = generate_app_token();
        let updated = self
            .applications
            .update_token(id, &new_token)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Application {id} not found")))?;

        let evicted = self.registry.disconnect_channel(&old_token);
        info!(application_id = id, evicted, "Application token regenerated");

        Ok(updated)
    }

    /// Deletes an application, its notification history, and its sessions.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let existing = self.get(id).await?;

        if !self.applications.delete(id).await? {
            return Err(AppError::not_found(format!("Application {id} not found")));
        }

        let evicted = self.registry.disconnect_channel(&existing.app_token);
        info!(application_id = id, evicted, "Application deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selfinotify_core::error::ErrorKind;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_service() -> ApplicationService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://selfinotify@localhost/selfinotify_test")
            .unwrap();
        ApplicationService::new(
            Arc::new(ApplicationRepository::new(pool)),
            Arc::new(ConnectionRegistry::new(16)),
        )
    }

    #[tokio::test]
    async fn create_rejects_empty_name() {
        let service = lazy_service();
        let err = service
            .create(CreateApplication {
                name: "  ".to_string(),
                description: None,
                platform: "web".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn update_rejects_empty_name() {
        let service = lazy_service();
        let err = service
            .update(
                1,
                CreateApplication {
                    name: String::new(),
                    description: None,
                    platform: "web".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
