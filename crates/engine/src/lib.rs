//! Client-side sync layer: session store, account aggregator and mutation
//! gateway, wired together by [`SyncEngine`].

pub mod aggregator;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod session;
pub mod snapshot;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{AccountAggregator, RefreshOutcome};
pub use auth::{AuthError, Authenticator};
pub use config::SyncConfig;
pub use gateway::{FailureKind, MutationGateway, MutationOutcome};
pub use session::SessionStore;
pub use snapshot::Snapshot;

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tradedesk_core::{AuthApi, Backend, Session, SessionStorage, SyncEvent};

const EVENT_CAPACITY: usize = 256;

/// One session store shared by the aggregator, the gateway and the
/// authentication flows.
pub struct SyncEngine {
    pub session: Arc<SessionStore>,
    pub aggregator: Arc<AccountAggregator>,
    pub gateway: MutationGateway,
    pub auth: Authenticator,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new<B>(backend: Arc<B>, storage: Arc<dyn SessionStorage>, config: SyncConfig) -> Self
    where
        B: Backend + AuthApi + 'static,
    {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let session = Arc::new(SessionStore::new(storage, events.clone()));
        let aggregator = Arc::new(AccountAggregator::new(
            backend.clone(),
            session.clone(),
            config,
            events.clone(),
        ));
        let gateway = MutationGateway::new(
            backend.clone(),
            session.clone(),
            aggregator.clone(),
            events.clone(),
        );
        let auth = Authenticator::new(backend, session.clone());
        Self {
            session,
            aggregator,
            gateway,
            auth,
            events,
        }
    }

    /// Restore any persisted session and, if one exists, start polling.
    pub async fn start(&self) -> Option<Session> {
        let session = self.session.restore().await?;
        self.aggregator.start_polling();
        Some(session)
    }

    /// Clear the session and everything derived from it.
    pub async fn sign_out(&self) {
        self.aggregator.stop_polling();
        self.auth.sign_out().await;
        self.aggregator.reset();
        info!("Signed out");
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use std::time::Duration;
    use tradedesk_core::{SessionEvent, SnapshotEvent};
    use tradedesk_data::MemorySessionStorage;

    #[tokio::test(start_paused = true)]
    async fn test_start_restores_and_polls() {
        let backend = FakeBackend::new();
        backend.set_accounts(Ok(vec![account_record(1, "1234.50")]));
        let storage = Arc::new(MemorySessionStorage::with_session(session("7", "tok")));
        let engine = SyncEngine::new(backend.clone(), storage, SyncConfig::default());
        let mut events = engine.subscribe_events();

        assert!(engine.start().await.is_some());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let snapshot = engine.aggregator.snapshot();
        assert_eq!(snapshot.accounts.len(), 1);
        assert_eq!(snapshot.accounts[0].balance, rust_decimal_macros::dec!(1234.5));
        assert_eq!(snapshot.accounts[0].open_trade_count, 0);
        assert_eq!(
            events.recv().await.unwrap(),
            SyncEvent::Session(SessionEvent::Restored {
                user_id: "7".to_string()
            })
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::Snapshot(SnapshotEvent::Replaced { accounts: 1, .. })
        ));

        engine.sign_out().await;
        assert!(!engine.aggregator.is_polling());
        assert!(engine.aggregator.snapshot().is_empty());
        assert!(engine.session.current().is_none());
    }

    #[tokio::test]
    async fn test_start_without_session() {
        let backend = FakeBackend::new();
        let engine = SyncEngine::new(
            backend.clone(),
            Arc::new(MemorySessionStorage::new()),
            SyncConfig::default(),
        );
        assert!(engine.start().await.is_none());
        assert!(!engine.aggregator.is_polling());
        assert_eq!(backend.network_calls(), 0);
    }
}
