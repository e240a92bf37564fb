use std::sync::Arc;
use tracing::{info, warn};
use tradedesk_core::*;

use crate::session::SessionStore;

/// Failures of the authentication flows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("User not authenticated")]
    NotAuthenticated,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Text to show the user; backend detail when available.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AuthError::NotAuthenticated => "User not authenticated".to_string(),
            AuthError::Invalid(message) => message.clone(),
            AuthError::Api(e) if e.is_transport() => "Could not connect to server".to_string(),
            AuthError::Api(e) => e.message_or(fallback),
        }
    }
}

/// Sign-in, registration and profile flows. Successful sign-ins become the
/// active session.
pub struct Authenticator {
    api: Arc<dyn AuthApi>,
    session: Arc<SessionStore>,
}

impl Authenticator {
    pub fn new(api: Arc<dyn AuthApi>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Invalid("Email and password are required".to_string()));
        }
        let token = self.api.login(email.trim(), password).await?;
        Ok(self.adopt(token).await)
    }

    pub async fn sign_in_with_google(&self, id_token: &str) -> Result<Session, AuthError> {
        let token = self.api.google_login(id_token).await?;
        Ok(self.adopt(token).await)
    }

    pub async fn sign_in_with_facebook(&self, access_token: &str) -> Result<Session, AuthError> {
        let token = self.api.facebook_login(access_token).await?;
        Ok(self.adopt(token).await)
    }

    /// Create an account with an OTP previously sent to the email address.
    pub async fn register(&self, request: &RegisterRequest) -> Result<Session, AuthError> {
        if request.password.chars().count() < 8 {
            return Err(AuthError::Invalid(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        let token = self.api.register(request).await?;
        Ok(self.adopt(token).await)
    }

    pub async fn send_otp(&self, email: &str, name: &str) -> Result<String, AuthError> {
        let response = self.api.send_otp(email, name).await?;
        Ok(response.message.unwrap_or_else(|| "OTP sent".to_string()))
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<String, AuthError> {
        let response = self.api.verify_otp(email, otp).await?;
        Ok(response.message.unwrap_or_else(|| "OTP verified".to_string()))
    }

    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        let response = self.api.forgot_password(email).await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Password reset code sent".to_string()))
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<String, AuthError> {
        let response = self.api.reset_password(email, otp, new_password).await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Password reset successfully".to_string()))
    }

    /// Send profile changes and fold the backend's answer into the session.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Session, AuthError> {
        let token = self.session.token().ok_or(AuthError::NotAuthenticated)?;
        if update.is_empty() {
            return self.session.current().ok_or(AuthError::NotAuthenticated);
        }

        let user = self.api.update_profile(&token, update).await?;
        let updated = match self.session.modify(|s| s.apply_user_record(user)).await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(AuthError::NotAuthenticated),
            Err(e) => {
                warn!(error = %e, "Profile updated but not persisted");
                self.session.current().ok_or(AuthError::NotAuthenticated)?
            }
        };
        info!(
            user_id = %updated.user_id,
            complete = updated.is_profile_complete(),
            "Profile updated"
        );
        Ok(updated)
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, AuthError> {
        let token = self.session.token().ok_or(AuthError::NotAuthenticated)?;
        let response = self
            .api
            .change_password(&token, current_password, new_password)
            .await?;
        Ok(response
            .message
            .unwrap_or_else(|| "Password changed successfully".to_string()))
    }

    pub async fn sign_out(&self) {
        self.session.clear().await;
    }

    async fn adopt(&self, token: TokenResponse) -> Session {
        let session = token.into_session();
        // A session that could not be persisted still works until restart.
        if self.session.establish(session.clone()).await.is_err() {
            warn!(user_id = %session.user_id, "Signed in without persistence");
        }
        session
    }
}
