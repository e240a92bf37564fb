use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use tradedesk_core::*;

use crate::aggregator::AccountAggregator;
use crate::session::SessionStore;
use crate::transform;

pub const NOT_AUTHENTICATED: &str = "User not authenticated";
pub const CONNECTION_FAILED: &str = "Could not connect to server";

/// Why a mutation did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No active session; nothing was sent.
    NotAuthenticated,
    /// The input failed local validation; nothing was sent.
    Invalid,
    /// The backend refused the request.
    Rejected,
    /// The backend could not be reached or answered with garbage.
    Transport,
}

/// What a caller gets back from every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub success: bool,
    pub message: String,
    pub failure: Option<FailureKind>,
    /// Broker details returned when an account is added.
    pub account_info: Option<AccountInfoSummary>,
}

impl MutationOutcome {
    fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            failure: None,
            account_info: None,
        }
    }

    fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            failure: Some(kind),
            account_info: None,
        }
    }

    fn from_error(err: &ApiError, fallback: &str) -> Self {
        if err.is_transport() {
            Self::failed(FailureKind::Transport, CONNECTION_FAILED)
        } else {
            Self::failed(FailureKind::Rejected, err.message_or(fallback))
        }
    }
}

/// Writes to the backend. The snapshot is only ever updated by asking the
/// aggregator to refresh.
pub struct MutationGateway {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    aggregator: Arc<AccountAggregator>,
    error: watch::Sender<Option<String>>,
    events: broadcast::Sender<SyncEvent>,
}

impl MutationGateway {
    pub fn new(
        backend: Arc<dyn Backend>,
        session: Arc<SessionStore>,
        aggregator: Arc<AccountAggregator>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        let (error, _) = watch::channel(None);
        Self {
            backend,
            session,
            aggregator,
            error,
            events,
        }
    }

    /// Submit a new trading account. The snapshot is refreshed only if the
    /// backend accepts it.
    pub async fn add_account(&self, draft: &AccountDraft) -> MutationOutcome {
        let Some((user_id, token)) = self.credentials() else {
            return self.finish(MutationKind::AddAccount, not_authenticated());
        };
        if let Err(message) = draft.validate() {
            return self.finish(
                MutationKind::AddAccount,
                MutationOutcome::failed(FailureKind::Invalid, message),
            );
        }

        let request = CreateAccountRequest::from_draft(&user_id, draft);
        let outcome = match self.backend.create_account(&token, &request).await {
            Ok(response) if response.success => {
                info!(login = ?draft.login_number, "Account added");
                self.aggregator.refresh(false).await;
                let mut outcome = MutationOutcome::succeeded(
                    response
                        .message
                        .unwrap_or_else(|| "Account added successfully".to_string()),
                );
                outcome.account_info = response
                    .mt5_info
                    .as_ref()
                    .map(transform::account_info_from_record);
                outcome
            }
            Ok(response) => MutationOutcome::failed(
                FailureKind::Rejected,
                response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Failed to add account".to_string()),
            ),
            Err(e) => {
                warn!(error = %e, "Add account failed");
                MutationOutcome::from_error(&e, "Failed to add account")
            }
        };
        self.finish(MutationKind::AddAccount, outcome)
    }

    /// Delete an account, then resync whatever the result.
    pub async fn remove_account(&self, account_id: i64) -> MutationOutcome {
        let Some((_, token)) = self.credentials() else {
            return self.finish(MutationKind::RemoveAccount, not_authenticated());
        };

        let result = self.backend.delete_account(&token, account_id).await;
        self.aggregator.refresh(false).await;

        let outcome = match result {
            Ok(response) => MutationOutcome::succeeded(
                response
                    .message
                    .unwrap_or_else(|| "Account deleted successfully".to_string()),
            ),
            Err(e) => {
                warn!(account_id, error = %e, "Remove account failed");
                MutationOutcome::from_error(&e, "Failed to delete account")
            }
        };
        self.finish(MutationKind::RemoveAccount, outcome)
    }

    /// Close one trade by ticket, then resync whatever the result.
    pub async fn close_trade(&self, ticket: i64) -> MutationOutcome {
        let Some((_, token)) = self.credentials() else {
            return self.finish(MutationKind::CloseTrade, not_authenticated());
        };

        let result = self.backend.close_trade(&token, ticket).await;
        self.aggregator.refresh(false).await;

        let outcome = match result {
            Ok(response) if response.success => MutationOutcome::succeeded(
                response
                    .message
                    .unwrap_or_else(|| "Trade closed successfully".to_string()),
            ),
            Ok(response) => MutationOutcome::failed(
                FailureKind::Rejected,
                response
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "Failed to close trade".to_string()),
            ),
            Err(e) => {
                warn!(ticket, error = %e, "Close trade failed");
                MutationOutcome::from_error(&e, "Failed to close trade")
            }
        };
        self.finish(MutationKind::CloseTrade, outcome)
    }

    /// Message of the most recent failed mutation, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    fn credentials(&self) -> Option<(String, String)> {
        let session = self.session.current()?;
        let token = session.token()?.to_string();
        Some((session.user_id, token))
    }

    fn finish(&self, kind: MutationKind, outcome: MutationOutcome) -> MutationOutcome {
        self.error.send_replace(if outcome.success {
            None
        } else {
            Some(outcome.message.clone())
        });
        let _ = self.events.send(SyncEvent::Mutation(MutationEvent {
            kind,
            success: outcome.success,
            message: outcome.message.clone(),
        }));
        outcome
    }
}

fn not_authenticated() -> MutationOutcome {
    MutationOutcome::failed(FailureKind::NotAuthenticated, NOT_AUTHENTICATED)
}
