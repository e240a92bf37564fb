use serde::{Deserialize, Serialize};

/// Notifications emitted by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncEvent {
    Session(SessionEvent),
    Snapshot(SnapshotEvent),
    Mutation(MutationEvent),
}

/// Session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    Established { user_id: String },
    Restored { user_id: String },
    ProfileUpdated { user_id: String },
    Cleared,
}

/// Aggregator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotEvent {
    /// A new snapshot replaced the previous one.
    Replaced {
        accounts: usize,
        failed_accounts: usize,
    },
    /// The account list could not be fetched; the snapshot is unchanged.
    RefreshFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    AddAccount,
    RemoveAccount,
    CloseTrade,
}

/// Completed write through the mutation gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub kind: MutationKind,
    pub success: bool,
    pub message: String,
}
