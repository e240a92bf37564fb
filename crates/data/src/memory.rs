use async_trait::async_trait;
use std::sync::Mutex;
use tradedesk_core::{Session, SessionStorage, StorageError};

/// Process-local session storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `session` already persisted.
    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }

    pub fn stored(&self) -> Option<Session> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self.stored())
    }

    async fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let storage = MemorySessionStorage::new();
        assert!(storage.load().await.unwrap().is_none());

        let session = Session {
            user_id: "1".to_string(),
            display_name: "A".to_string(),
            email_address: "a@example.com".to_string(),
            auth_token: None,
            phone: None,
            address: None,
            id_document_number: None,
            date_of_birth: None,
        };
        storage.save(&session).await.unwrap();
        assert_eq!(storage.stored(), Some(session));

        storage.remove().await.unwrap();
        assert!(storage.stored().is_none());
    }
}
