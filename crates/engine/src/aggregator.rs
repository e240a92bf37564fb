use chrono::Utc;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tradedesk_core::*;

use crate::config::SyncConfig;
use crate::session::SessionStore;
use crate::snapshot::Snapshot;
use crate::transform;

const ACCOUNTS_FALLBACK: &str = "Failed to fetch accounts";

/// Result of a single refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No active session; nothing was fetched.
    NoSession,
    /// A silent refresh found another refresh in flight and skipped.
    Busy,
    /// The snapshot was replaced.
    Refreshed {
        accounts: usize,
        failed_accounts: usize,
    },
    /// The account list could not be fetched; the snapshot is unchanged.
    Failed { message: String },
}

/// Builds and publishes the account/trade snapshot for the active session.
pub struct AccountAggregator {
    backend: Arc<dyn Backend>,
    session: Arc<SessionStore>,
    config: SyncConfig,
    snapshot: watch::Sender<Arc<Snapshot>>,
    error: watch::Sender<Option<String>>,
    events: broadcast::Sender<SyncEvent>,
    /// Serialises refreshes so snapshots are published in order.
    refresh_lock: Mutex<()>,
    poller: StdMutex<Option<JoinHandle<()>>>,
}

impl AccountAggregator {
    pub fn new(
        backend: Arc<dyn Backend>,
        session: Arc<SessionStore>,
        config: SyncConfig,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::default()));
        let (error, _) = watch::channel(None);
        Self {
            backend,
            session,
            config,
            snapshot,
            error,
            events,
            refresh_lock: Mutex::new(()),
            poller: StdMutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Fetch accounts and their trades and replace the snapshot.
    ///
    /// A non-silent refresh clears the last error first, waits for any
    /// in-flight refresh, and records a failure to fetch the account list.
    /// A silent refresh skips if one is already running and never touches
    /// the error slot.
    pub async fn refresh(&self, silent: bool) -> RefreshOutcome {
        let Some(session) = self.session.current() else {
            return RefreshOutcome::NoSession;
        };
        let Some(token) = session.token().map(str::to_string) else {
            return RefreshOutcome::NoSession;
        };

        let _guard = if silent {
            match self.refresh_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("Refresh already in flight; skipping tick");
                    return RefreshOutcome::Busy;
                }
            }
        } else {
            self.refresh_lock.lock().await
        };

        if !silent {
            self.error.send_replace(None);
        }
        debug!(silent, user_id = %session.user_id, "Refreshing accounts");

        let records = match self.backend.list_accounts(&token, &session.user_id).await {
            Ok(records) => records,
            Err(e) => {
                let message = e.message_or(ACCOUNTS_FALLBACK);
                warn!(error = %e, silent, "Failed to fetch accounts");
                if silent {
                    return RefreshOutcome::Failed { message };
                }
                let recorded = self.error.send_if_modified(|slot| {
                    if !self.is_current(&token) {
                        return false;
                    }
                    *slot = Some(message.clone());
                    true
                });
                if !recorded {
                    debug!("Session changed during refresh; dropping error");
                    return RefreshOutcome::NoSession;
                }
                self.emit(SnapshotEvent::RefreshFailed {
                    message: message.clone(),
                });
                return RefreshOutcome::Failed { message };
            }
        };

        let mut entries = Vec::with_capacity(records.len());
        let mut failed_accounts = 0;
        for record in &records {
            let account = transform::account_from_record(record, &self.config);
            let trades: Vec<Trade> = match self.backend.list_trades(&token, record.id).await {
                Ok(trades) => trades
                    .iter()
                    .map(|t| transform::trade_from_record(t, record.id, &self.config.status_mapping))
                    .collect(),
                Err(e) => {
                    failed_accounts += 1;
                    warn!(account_id = record.id, error = %e, "Failed to fetch trades; showing none");
                    Vec::new()
                }
            };
            entries.push((account, trades));
        }

        let snapshot = Arc::new(Snapshot::build(entries, Utc::now()));
        let accounts = snapshot.accounts.len();

        // A sign-out or account switch during the fetch makes these results
        // stale. Checked under the channel lock so a concurrent reset wins.
        let published = self.snapshot.send_if_modified(|current| {
            if !self.is_current(&token) {
                return false;
            }
            *current = snapshot;
            true
        });
        if !published {
            debug!("Session changed during refresh; discarding results");
            return RefreshOutcome::NoSession;
        }
        self.emit(SnapshotEvent::Replaced {
            accounts,
            failed_accounts,
        });
        info!(accounts, failed_accounts, silent, "Snapshot replaced");

        RefreshOutcome::Refreshed {
            accounts,
            failed_accounts,
        }
    }

    fn is_current(&self, token: &str) -> bool {
        self.session.token().as_deref() == Some(token)
    }

    /// Drop the snapshot and error, e.g. after sign-out.
    pub fn reset(&self) {
        self.snapshot.send_replace(Arc::new(Snapshot::default()));
        self.error.send_replace(None);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.borrow().clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.snapshot.borrow().accounts.clone()
    }

    pub fn trades_for(&self, account_id: i64) -> Vec<Trade> {
        self.snapshot.borrow().trades_for(account_id).to_vec()
    }

    pub fn history_for(&self, account_id: i64) -> Vec<Trade> {
        self.snapshot.borrow().history_for(account_id).to_vec()
    }

    pub fn all_history(&self) -> Vec<Trade> {
        self.snapshot.borrow().all_history().to_vec()
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot.subscribe()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    /// Start silent refreshes every poll interval, the first immediately.
    ///
    /// Polling ends on its own when the session goes away. Returns false if
    /// there is no session to poll for.
    pub fn start_polling(self: &Arc<Self>) -> bool {
        let mut poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if poller.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Polling already running");
            return true;
        }
        if !self.session.is_active() {
            debug!("No session; not polling");
            return false;
        }

        let period = self.config.poll_interval();
        let mut session_rx = self.session.subscribe();
        let this: Weak<Self> = Arc::downgrade(self);

        *poller = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_ms = period.as_millis() as u64, "Polling started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(aggregator) = this.upgrade() else { break };
                        if !aggregator.session.is_active() {
                            break;
                        }
                        aggregator.refresh(true).await;
                    }
                    changed = session_rx.changed() => {
                        let active = changed.is_ok()
                            && session_rx
                                .borrow_and_update()
                                .as_ref()
                                .is_some_and(|s| s.token().is_some());
                        if !active {
                            break;
                        }
                    }
                }
            }
            info!("Polling stopped");
        }));
        true
    }

    pub fn stop_polling(&self) {
        let handle = self.poller.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
            info!("Polling cancelled");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    fn emit(&self, event: SnapshotEvent) {
        let _ = self.events.send(SyncEvent::Snapshot(event));
    }
}

impl Drop for AccountAggregator {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}
