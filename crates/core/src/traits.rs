use crate::models::*;
use crate::records::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors returned by backend calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response: connection refused, DNS failure, timeout.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The response arrived but could not be decoded.
    #[error("Malformed response: {0}")]
    Malformed(String),
    /// The token was missing, expired or refused.
    #[error("Unauthorized ({status})")]
    Unauthorized { status: u16, message: Option<String> },
    /// The backend understood the request and refused it.
    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Rejected { status: u16, message: Option<String> },
}

impl ApiError {
    pub fn rejected(status: u16, message: Option<String>) -> Self {
        match status {
            401 | 403 => ApiError::Unauthorized { status, message },
            _ => ApiError::Rejected { status, message },
        }
    }

    /// True when the server could not be reached or answered with garbage.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Malformed(_))
    }

    /// The backend-supplied explanation, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message, .. } | ApiError::Rejected { message, .. } => {
                message.as_deref().filter(|m| !m.trim().is_empty())
            }
            _ => None,
        }
    }

    /// The backend message, or `fallback` when there is none.
    pub fn message_or(&self, fallback: &str) -> String {
        self.backend_message().unwrap_or(fallback).to_string()
    }
}

/// Errors from session persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Backend Trait
// ---------------------------------------------------------------------------

/// Account and trade endpoints. Every call carries the bearer token.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Accounts owned by `user_id`.
    async fn list_accounts(&self, token: &str, user_id: &str)
        -> Result<Vec<AccountRecord>, ApiError>;

    /// Trades recorded against one account.
    async fn list_trades(&self, token: &str, account_id: i64)
        -> Result<Vec<TradeRecord>, ApiError>;

    /// Verify MT5 credentials and link a new account.
    async fn create_account(
        &self,
        token: &str,
        request: &CreateAccountRequest,
    ) -> Result<CreateAccountResponse, ApiError>;

    async fn delete_account(&self, token: &str, account_id: i64)
        -> Result<MessageResponse, ApiError>;

    /// Close a single position by its MT5 ticket.
    async fn close_trade(&self, token: &str, ticket: i64) -> Result<CloseTradeResponse, ApiError>;
}

// ---------------------------------------------------------------------------
// Auth Trait
// ---------------------------------------------------------------------------

/// Authentication and profile endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError>;

    async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, ApiError>;

    async fn google_login(&self, id_token: &str) -> Result<TokenResponse, ApiError>;

    async fn facebook_login(&self, access_token: &str) -> Result<TokenResponse, ApiError>;

    /// Email a one-time code used by registration.
    async fn send_otp(&self, email: &str, name: &str) -> Result<MessageResponse, ApiError>;

    async fn verify_otp(&self, email: &str, otp: &str) -> Result<MessageResponse, ApiError>;

    async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError>;

    async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError>;

    async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<UserRecord, ApiError>;

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError>;
}

// ---------------------------------------------------------------------------
// Session Storage Trait
// ---------------------------------------------------------------------------

/// Durable home for the single active session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Load the persisted session, `None` if nothing was stored.
    async fn load(&self) -> Result<Option<Session>, StorageError>;

    /// Persist `session`, replacing whatever was stored.
    async fn save(&self, session: &Session) -> Result<(), StorageError>;

    /// Remove the persisted session. Removing nothing is not an error.
    async fn remove(&self) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_statuses_map_to_unauthorized() {
        let err = ApiError::rejected(401, Some("Invalid email or password".to_string()));
        assert!(matches!(err, ApiError::Unauthorized { status: 401, .. }));
        assert_eq!(err.backend_message(), Some("Invalid email or password"));
    }

    #[test]
    fn test_message_or_falls_back() {
        let err = ApiError::rejected(500, None);
        assert_eq!(err.message_or("Failed to fetch accounts"), "Failed to fetch accounts");

        let err = ApiError::rejected(400, Some("  ".to_string()));
        assert_eq!(err.message_or("fallback"), "fallback");

        let err = ApiError::Transport("connection refused".to_string());
        assert!(err.is_transport());
        assert_eq!(err.message_or("fallback"), "fallback");
    }

    #[test]
    fn test_malformed_counts_as_transport() {
        assert!(ApiError::Malformed("eof".to_string()).is_transport());
        assert!(!ApiError::rejected(404, None).is_transport());
    }

    #[test]
    fn test_rejected_display() {
        let err = ApiError::rejected(404, Some("Account not found".to_string()));
        assert_eq!(err.to_string(), "Request rejected (404): Account not found");
        assert!(ApiError::rejected(500, None).to_string().contains("no details"));
    }
}
