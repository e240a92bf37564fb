//! Wire shapes exchanged with the account backend.
//!
//! The backend serialises decimals as strings but some deployments emit
//! plain JSON numbers, and ids occasionally arrive quoted. Fields are
//! therefore read leniently and kept as text; conversion to display types
//! happens in the engine.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::models::{AccountDraft, Session};

// ---------------------------------------------------------------------------
// Lenient field readers
// ---------------------------------------------------------------------------

/// Read a string, number or bool as text. Null and missing become `None`.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Read an integer id given as a number or a numeric string.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = lenient_text(deserializer)?;
    Ok(text.and_then(|t| t.trim().parse::<i64>().ok()))
}

fn required_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_id(deserializer)?.ok_or_else(|| serde::de::Error::custom("missing or non-numeric id"))
}

/// Write a user id as a JSON number when it is numeric.
fn id_as_number<S>(id: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match id.trim().parse::<i64>() {
        Ok(n) => serializer.serialize_i64(n),
        Err(_) => serializer.serialize_str(id),
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Account record as returned by `GET /api/accounts`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "AccountID", deserialize_with = "required_id")]
    pub id: i64,
    #[serde(rename = "AccountName", default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(rename = "AccountLoginNumber", default, deserialize_with = "lenient_id")]
    pub login_number: Option<i64>,
    #[serde(rename = "AccountBalance", default, deserialize_with = "lenient_text")]
    pub balance: Option<String>,
    #[serde(rename = "Currency", default, deserialize_with = "lenient_text")]
    pub currency: Option<String>,
    #[serde(rename = "ServerID", default, deserialize_with = "lenient_id")]
    pub server_id: Option<i64>,
    #[serde(
        rename = "ServerName",
        alias = "AccountLoginServer",
        default,
        deserialize_with = "lenient_text"
    )]
    pub server_name: Option<String>,
    #[serde(rename = "AccountType", default, deserialize_with = "lenient_text")]
    pub account_type: Option<String>,
    #[serde(rename = "RiskPercentage", default, deserialize_with = "lenient_text")]
    pub risk_percentage: Option<String>,
    #[serde(rename = "TradingStrategy", default, deserialize_with = "lenient_text")]
    pub strategy: Option<String>,
}

/// Body of `POST /api/accounts`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAccountRequest {
    #[serde(rename = "UserID", serialize_with = "id_as_number")]
    pub user_id: String,
    #[serde(rename = "AccountName", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "AccountLoginNumber")]
    pub login_number: Option<i64>,
    #[serde(rename = "AccountLoginPassword")]
    pub password: String,
    #[serde(rename = "ServerID", skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,
    #[serde(rename = "AccountLoginServer", skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(rename = "RiskPercentage", with = "rust_decimal::serde::str")]
    pub risk_percentage: rust_decimal::Decimal,
    #[serde(rename = "TradingStrategy")]
    pub strategy: crate::models::TradingStrategy,
}

impl CreateAccountRequest {
    pub fn from_draft(user_id: &str, draft: &AccountDraft) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: draft
                .name
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            login_number: draft.login_number,
            password: draft.password.clone(),
            server_id: draft.server_id,
            server_name: draft.server_name.clone(),
            risk_percentage: draft.risk_percentage,
            strategy: draft.strategy,
        }
    }
}

/// MT5 details echoed back after account verification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MtInfoRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub balance: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub equity: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub leverage: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub server: Option<String>,
}

/// Response of `POST /api/accounts`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateAccountResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default)]
    pub account: Option<AccountRecord>,
    #[serde(default)]
    pub mt5_info: Option<MtInfoRecord>,
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

/// Trade record as returned by `GET /api/trades`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TradeRecord {
    #[serde(rename = "TradeID", deserialize_with = "required_id")]
    pub id: i64,
    #[serde(rename = "AccountID", default, deserialize_with = "lenient_id")]
    pub account_id: Option<i64>,
    #[serde(rename = "TradeTicket", default, deserialize_with = "lenient_id")]
    pub ticket: Option<i64>,
    #[serde(rename = "TradeType", default, deserialize_with = "lenient_text")]
    pub trade_type: Option<String>,
    #[serde(
        rename = "TradeAsset",
        alias = "TradeSymbol",
        alias = "PairName",
        default,
        deserialize_with = "lenient_text"
    )]
    pub symbol: Option<String>,
    #[serde(rename = "TradingPairID", default, deserialize_with = "lenient_id")]
    pub pair_id: Option<i64>,
    #[serde(rename = "TradeLotsize", default, deserialize_with = "lenient_text")]
    pub lot_size: Option<String>,
    #[serde(rename = "TradeOpenPrice", default, deserialize_with = "lenient_text")]
    pub open_price: Option<String>,
    #[serde(rename = "TradeClosePrice", default, deserialize_with = "lenient_text")]
    pub close_price: Option<String>,
    #[serde(rename = "TradeOpenTime", default, deserialize_with = "lenient_text")]
    pub open_time: Option<String>,
    #[serde(rename = "TradeCloseTime", default, deserialize_with = "lenient_text")]
    pub close_time: Option<String>,
    #[serde(rename = "TradeSL", default, deserialize_with = "lenient_text")]
    pub stop_loss: Option<String>,
    #[serde(rename = "TradeTP", default, deserialize_with = "lenient_text")]
    pub take_profit: Option<String>,
    #[serde(rename = "TradeProfitLose", default, deserialize_with = "lenient_text")]
    pub profit: Option<String>,
    #[serde(rename = "TradeStatus", default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
}

/// Response of `POST /api/trades/{ticket}/close`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CloseTradeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
}

/// Generic `{"message": ...}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// User object embedded in token responses and returned by profile updates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "UserID", default, deserialize_with = "lenient_text")]
    pub user_id: Option<String>,
    #[serde(
        rename = "UserName",
        alias = "UserIDCardName",
        alias = "UserIDcardrName",
        default,
        deserialize_with = "lenient_text"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "UserEmail",
        alias = "Email",
        default,
        deserialize_with = "lenient_text"
    )]
    pub email: Option<String>,
    #[serde(rename = "PhoneNumber", default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(rename = "Address", default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(rename = "DateOfBirth", default, deserialize_with = "lenient_text")]
    pub date_of_birth: Option<String>,
    #[serde(
        rename = "UserIDCardrNumber",
        alias = "UserIDCardNumber",
        default,
        deserialize_with = "lenient_text"
    )]
    pub id_document_number: Option<String>,
}

/// Response of the login/register/OAuth endpoints.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: UserRecord,
}

impl TokenResponse {
    pub fn into_session(self) -> Session {
        let user = self.user;
        Session {
            user_id: user.user_id.unwrap_or_default(),
            display_name: user.name.unwrap_or_default(),
            email_address: user.email.unwrap_or_default(),
            auth_token: Some(self.access_token),
            phone: user.phone,
            address: user.address,
            id_document_number: user.id_document_number,
            date_of_birth: user.date_of_birth,
        }
    }
}

impl Session {
    /// Overwrite profile fields with whatever the backend returned.
    pub fn apply_user_record(&mut self, user: UserRecord) {
        if let Some(name) = user.name {
            self.display_name = name;
        }
        if let Some(email) = user.email {
            self.email_address = email;
        }
        if user.phone.is_some() {
            self.phone = user.phone;
        }
        if user.address.is_some() {
            self.address = user.address;
        }
        if user.id_document_number.is_some() {
            self.id_document_number = user.id_document_number;
        }
        if user.date_of_birth.is_some() {
            self.date_of_birth = user.date_of_birth;
        }
    }
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub otp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_card_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}
