//! Scripted backend and storage doubles shared by the engine tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tradedesk_core::*;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn session(user_id: &str, token: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        display_name: "Ana Trader".to_string(),
        email_address: "ana@example.com".to_string(),
        auth_token: Some(token.to_string()),
        phone: None,
        address: None,
        id_document_number: None,
        date_of_birth: None,
    }
}

pub fn account_record(id: i64, balance: &str) -> AccountRecord {
    AccountRecord {
        id,
        login_number: Some(5_000_000 + id),
        balance: Some(balance.to_string()),
        account_type: Some("1".to_string()),
        ..Default::default()
    }
}

pub fn trade_record(id: i64, account_id: i64, status: &str, profit: &str) -> TradeRecord {
    TradeRecord {
        id,
        account_id: Some(account_id),
        ticket: Some(900_000 + id),
        trade_type: Some("1".to_string()),
        symbol: Some("EURUSD".to_string()),
        open_price: Some("1.0850".to_string()),
        open_time: Some(format!("2024-05-01T10:{:02}:00", id % 60)),
        profit: Some(profit.to_string()),
        status: Some(status.to_string()),
        ..Default::default()
    }
}

#[derive(Debug, Default)]
pub struct Calls {
    pub accounts: AtomicUsize,
    pub trades: AtomicUsize,
    pub create: AtomicUsize,
    pub delete: AtomicUsize,
    pub close: AtomicUsize,
    pub auth: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Backend whose responses are set up front by each test.
pub struct FakeBackend {
    pub calls: Calls,
    accounts: Mutex<Result<Vec<AccountRecord>, ApiError>>,
    trades: Mutex<HashMap<i64, Result<Vec<TradeRecord>, ApiError>>>,
    create: Mutex<Result<CreateAccountResponse, ApiError>>,
    delete: Mutex<Result<MessageResponse, ApiError>>,
    close: Mutex<Result<CloseTradeResponse, ApiError>>,
    token: Mutex<Result<TokenResponse, ApiError>>,
    profile: Mutex<Result<UserRecord, ApiError>>,
    message: Mutex<Result<MessageResponse, ApiError>>,
    last_create: Mutex<Option<CreateAccountRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            calls: Calls::default(),
            accounts: Mutex::new(Ok(Vec::new())),
            trades: Mutex::new(HashMap::new()),
            create: Mutex::new(Ok(CreateAccountResponse {
                success: true,
                message: Some("Account verified and added successfully!".to_string()),
                ..Default::default()
            })),
            delete: Mutex::new(Ok(MessageResponse {
                message: Some("Account deleted successfully".to_string()),
            })),
            close: Mutex::new(Ok(CloseTradeResponse {
                success: true,
                message: Some("Trade closed".to_string()),
            })),
            token: Mutex::new(Err(ApiError::Transport("not scripted".to_string()))),
            profile: Mutex::new(Err(ApiError::Transport("not scripted".to_string()))),
            message: Mutex::new(Ok(MessageResponse {
                message: Some("ok".to_string()),
            })),
            last_create: Mutex::new(None),
            delay: Mutex::new(None),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_accounts(&self, accounts: Result<Vec<AccountRecord>, ApiError>) {
        *lock(&self.accounts) = accounts;
    }

    pub fn set_trades(&self, account_id: i64, trades: Result<Vec<TradeRecord>, ApiError>) {
        lock(&self.trades).insert(account_id, trades);
    }

    pub fn set_create(&self, response: Result<CreateAccountResponse, ApiError>) {
        *lock(&self.create) = response;
    }

    pub fn set_delete(&self, response: Result<MessageResponse, ApiError>) {
        *lock(&self.delete) = response;
    }

    pub fn set_close(&self, response: Result<CloseTradeResponse, ApiError>) {
        *lock(&self.close) = response;
    }

    pub fn set_token(&self, response: Result<TokenResponse, ApiError>) {
        *lock(&self.token) = response;
    }

    pub fn set_profile(&self, response: Result<UserRecord, ApiError>) {
        *lock(&self.profile) = response;
    }

    pub fn set_message(&self, response: Result<MessageResponse, ApiError>) {
        *lock(&self.message) = response;
    }

    /// Make every account-list call take `delay` before answering.
    pub fn set_delay(&self, delay: Duration) {
        *lock(&self.delay) = Some(delay);
    }

    pub fn last_create(&self) -> Option<CreateAccountRequest> {
        lock(&self.last_create).clone()
    }

    pub fn account_calls(&self) -> usize {
        Calls::get(&self.calls.accounts)
    }

    pub fn network_calls(&self) -> usize {
        [
            &self.calls.accounts,
            &self.calls.trades,
            &self.calls.create,
            &self.calls.delete,
            &self.calls.close,
            &self.calls.auth,
        ]
        .iter()
        .map(|c| Calls::get(c))
        .sum()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_accounts(&self, _token: &str, _user_id: &str) -> Result<Vec<AccountRecord>, ApiError> {
        self.calls.accounts.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.accounts).clone()
    }

    async fn list_trades(&self, _token: &str, account_id: i64) -> Result<Vec<TradeRecord>, ApiError> {
        self.calls.trades.fetch_add(1, Ordering::SeqCst);
        lock(&self.trades)
            .get(&account_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn create_account(
        &self,
        _token: &str,
        request: &CreateAccountRequest,
    ) -> Result<CreateAccountResponse, ApiError> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_create) = Some(request.clone());
        lock(&self.create).clone()
    }

    async fn delete_account(&self, _token: &str, _account_id: i64) -> Result<MessageResponse, ApiError> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        lock(&self.delete).clone()
    }

    async fn close_trade(&self, _token: &str, _ticket: i64) -> Result<CloseTradeResponse, ApiError> {
        self.calls.close.fetch_add(1, Ordering::SeqCst);
        lock(&self.close).clone()
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn login(&self, _email: &str, _password: &str) -> Result<TokenResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.token).clone()
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<TokenResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.token).clone()
    }

    async fn google_login(&self, _id_token: &str) -> Result<TokenResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.token).clone()
    }

    async fn facebook_login(&self, _access_token: &str) -> Result<TokenResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.token).clone()
    }

    async fn send_otp(&self, _email: &str, _name: &str) -> Result<MessageResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.message).clone()
    }

    async fn verify_otp(&self, _email: &str, _otp: &str) -> Result<MessageResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.message).clone()
    }

    async fn forgot_password(&self, _email: &str) -> Result<MessageResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.message).clone()
    }

    async fn reset_password(
        &self,
        _email: &str,
        _otp: &str,
        _new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.message).clone()
    }

    async fn update_profile(&self, _token: &str, _update: &ProfileUpdate) -> Result<UserRecord, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.profile).clone()
    }

    async fn change_password(
        &self,
        _token: &str,
        _current_password: &str,
        _new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        self.calls.auth.fetch_add(1, Ordering::SeqCst);
        lock(&self.message).clone()
    }
}

/// Storage that fails every operation.
#[derive(Debug, Default)]
pub struct BrokenStorage;

fn broken() -> StorageError {
    StorageError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
}

#[async_trait]
impl SessionStorage for BrokenStorage {
    async fn load(&self) -> Result<Option<Session>, StorageError> {
        Err(broken())
    }

    async fn save(&self, _session: &Session) -> Result<(), StorageError> {
        Err(broken())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        Err(broken())
    }
}
