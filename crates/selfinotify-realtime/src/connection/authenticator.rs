//! Channel authentication — resolves an application token before a session
//! may join the channel it names.

use selfinotify_core::error::AppError;
use selfinotify_core::result::AppResult;
use selfinotify_database::repositories::ApplicationRepository;
use selfinotify_entity::application::Application;

/// Authenticates sessions against known application tokens.
#[derive(Debug, Clone)]
pub struct ChannelAuthenticator {
    /// Application lookup.
    applications: ApplicationRepository,
}

impl ChannelAuthenticator {
    /// Create a new channel authenticator.
    pub fn new(applications: ApplicationRepository) -> Self {
        Self { applications }
    }

    /// Resolve a token to its owning application.
    ///
    /// An unknown token fails with `InvalidToken`; this is never retried —
    /// it indicates a misconfigured or malicious client, or a token that
    /// has since been regenerated.
    pub async fn verify(&self, app_token: &str) -> AppResult<Application> {
        self.applications
            .find_by_token(app_token)
            .await?
            .ok_or_else(|| AppError::invalid_token("Invalid app token"))
    }
}
