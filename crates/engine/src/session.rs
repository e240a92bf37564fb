use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};
use tradedesk_core::*;

/// Holds the active session in memory and mirrors it to durable storage.
///
/// Readers get the current value through [`SessionStore::current`] or follow
/// changes through [`SessionStore::subscribe`].
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    current: watch::Sender<Option<Session>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, events: broadcast::Sender<SyncEvent>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            storage,
            current,
            events,
        }
    }

    /// Load a previously persisted session and make it active.
    ///
    /// Missing or unreadable storage is not an error: the caller simply has
    /// no session. The in-memory session is left alone in that case.
    pub async fn restore(&self) -> Option<Session> {
        match self.storage.load().await {
            Ok(Some(session)) => {
                info!(user_id = %session.user_id, "Restored session");
                self.current.send_replace(Some(session.clone()));
                self.emit(SessionEvent::Restored {
                    user_id: session.user_id.clone(),
                });
                Some(session)
            }
            Ok(None) => {
                debug!("No persisted session");
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session; continuing signed out");
                None
            }
        }
    }

    /// Make `session` active and persist it.
    ///
    /// The session is active in memory even if persisting fails; the error is
    /// returned so the caller can decide whether it matters.
    pub async fn establish(&self, session: Session) -> Result<(), StorageError> {
        info!(user_id = %session.user_id, "Session established");
        let user_id = session.user_id.clone();
        let persisted = self.storage.save(&session).await;
        self.current.send_replace(Some(session));
        self.emit(SessionEvent::Established { user_id });

        if let Err(e) = &persisted {
            warn!(error = %e, "Failed to persist session");
        }
        persisted
    }

    /// Drop the active session from memory and storage.
    pub async fn clear(&self) {
        let previous = self.current.send_replace(None);
        if let Err(e) = self.storage.remove().await {
            warn!(error = %e, "Failed to remove persisted session");
        }
        if let Some(session) = previous {
            info!(user_id = %session.user_id, "Session cleared");
        }
        self.emit(SessionEvent::Cleared);
    }

    /// Apply `update` to the active session and persist the result.
    ///
    /// Returns `Ok(None)` when there is no session to update.
    pub async fn modify<F>(&self, update: F) -> Result<Option<Session>, StorageError>
    where
        F: FnOnce(&mut Session),
    {
        let Some(mut session) = self.current() else {
            return Ok(None);
        };
        update(&mut session);
        self.current.send_replace(Some(session.clone()));
        self.emit(SessionEvent::ProfileUpdated {
            user_id: session.user_id.clone(),
        });
        self.storage.save(&session).await?;
        Ok(Some(session))
    }

    pub fn current(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    /// Bearer token of the active session.
    pub fn token(&self) -> Option<String> {
        self.current
            .borrow()
            .as_ref()
            .and_then(Session::token)
            .map(str::to_string)
    }

    /// True when a session with a usable token is active.
    pub fn is_active(&self) -> bool {
        self.token().is_some()
    }

    pub fn is_profile_complete(&self) -> bool {
        self.current
            .borrow()
            .as_ref()
            .is_some_and(Session::is_profile_complete)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(SyncEvent::Session(event));
    }
}
