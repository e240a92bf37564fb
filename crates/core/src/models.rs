use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The authenticated identity held by the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
    pub email_address: String,
    /// Bearer token for authenticated backend calls.
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// National identity card / passport number.
    #[serde(default)]
    pub id_document_number: Option<String>,
    /// ISO date (`YYYY-MM-DD`).
    #[serde(default)]
    pub date_of_birth: Option<String>,
}

impl Session {
    /// The bearer token, if present and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn is_profile_complete(&self) -> bool {
        is_profile_complete(self)
    }
}

/// True iff phone, address, identity document number and date of birth are
/// all present and non-blank.
pub fn is_profile_complete(session: &Session) -> bool {
    [
        &session.phone,
        &session.address,
        &session.id_document_number,
        &session.date_of_birth,
    ]
    .iter()
    .all(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
}

/// Editable profile fields. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(rename = "UserIDCardName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "PhoneNumber", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(rename = "Address", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "UserIDCardNumber", skip_serializing_if = "Option::is_none")]
    pub id_document_number: Option<String>,
    #[serde(rename = "DateOfBirth", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// Whether an account trades on a demo or a real-money server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Demo,
    Real,
    Unknown,
}

impl AccountKind {
    /// Map the backend's account type (`1`/`demo`, `2`/`real`).
    pub fn from_code(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return AccountKind::Unknown;
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "demo" => AccountKind::Demo,
            "2" | "real" | "live" => AccountKind::Real,
            _ => AccountKind::Unknown,
        }
    }

    pub fn code(&self) -> Option<u8> {
        match self {
            AccountKind::Demo => Some(1),
            AccountKind::Real => Some(2),
            AccountKind::Unknown => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Demo => "Demo",
            AccountKind::Real => "Real",
            AccountKind::Unknown => "Unknown",
        }
    }
}

/// Strategy the automated trader runs on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TradingStrategy {
    /// FVG + trend + price prediction + voting.
    #[default]
    #[serde(rename = "All")]
    All,
    #[serde(rename = "FVG + Trend")]
    FvgTrend,
    #[serde(rename = "Voting")]
    Voting,
}

impl TradingStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            TradingStrategy::All => "All",
            TradingStrategy::FvgTrend => "FVG + Trend",
            TradingStrategy::Voting => "Voting",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(TradingStrategy::All),
            "fvg + trend" | "fvg+trend" | "fvg_trend" | "fvg-trend" => {
                Some(TradingStrategy::FvgTrend)
            }
            "voting" => Some(TradingStrategy::Voting),
            _ => None,
        }
    }
}

/// Display-ready trading account, rebuilt on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub display_name: String,
    pub login_number: Option<i64>,
    pub balance: Decimal,
    pub currency: String,
    /// Sum of profit over the account's open trades.
    pub profit: Decimal,
    pub open_trade_count: usize,
    pub server_label: String,
    pub kind: AccountKind,
    pub risk_percentage: Decimal,
    pub strategy_label: String,
}

/// Fields submitted when linking a new MT5 account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountDraft {
    pub name: Option<String>,
    pub login_number: Option<i64>,
    pub password: String,
    pub server_id: Option<i64>,
    pub server_name: Option<String>,
    pub risk_percentage: Decimal,
    pub strategy: TradingStrategy,
}

impl AccountDraft {
    pub const MAX_RISK_PERCENTAGE: Decimal = Decimal::TEN;

    /// Check the draft against the backend's acceptance rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.login_number.is_none() {
            return Err("MT5 login number is required".to_string());
        }
        if self.password.trim().is_empty() {
            return Err("MT5 password is required".to_string());
        }
        let has_server_name = self
            .server_name
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if self.server_id.is_none() && !has_server_name {
            return Err("MT5 server is required".to_string());
        }
        if self.risk_percentage.is_sign_negative() {
            return Err("Risk percentage cannot be negative".to_string());
        }
        if self.risk_percentage > Self::MAX_RISK_PERCENTAGE {
            return Err("Risk percentage cannot exceed 10%".to_string());
        }
        Ok(())
    }
}

/// Broker-side summary returned after a new account is verified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountInfoSummary {
    pub balance: Option<Decimal>,
    pub equity: Option<Decimal>,
    pub leverage: Option<u32>,
    pub currency: Option<String>,
    pub server: Option<String>,
    pub company: Option<String>,
}

// ---------------------------------------------------------------------------
// Trade
// ---------------------------------------------------------------------------

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    /// Map the backend's trade type (`1`/`buy`, `2`/`sell`).
    pub fn from_code(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("2") | Some("sell") | Some("short") => TradeDirection::Sell,
            Some("1") | Some("buy") | Some("long") => TradeDirection::Buy,
            other => {
                tracing::debug!(code = ?other, "Unrecognised trade type, treating as buy");
                TradeDirection::Buy
            }
        }
    }
}

/// Lifecycle of a trade as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    Open,
    Win,
    Loss,
    Closed,
}

impl TradeStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, TradeStatus::Open)
    }
}

/// Display-ready trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub account_id: i64,
    pub symbol: String,
    pub direction: TradeDirection,
    pub open_price: Decimal,
    /// Close price once closed; the open price until then.
    pub current_price: Decimal,
    pub profit: Decimal,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub status: TradeStatus,
    pub ticket: Option<i64>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub lot_size: Option<Decimal>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Most recent activity time, used for recency ordering.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.closed_at.or(self.opened_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn session() -> Session {
        Session {
            user_id: "7".to_string(),
            display_name: "Jordan".to_string(),
            email_address: "jordan@example.com".to_string(),
            auth_token: Some("tok".to_string()),
            phone: Some("+201000000000".to_string()),
            address: Some("12 Nile St".to_string()),
            id_document_number: Some("29801011234567".to_string()),
            date_of_birth: Some("1998-01-01".to_string()),
        }
    }

    fn draft() -> AccountDraft {
        AccountDraft {
            name: Some("Main".to_string()),
            login_number: Some(5_123_456),
            password: "secret".to_string(),
            server_id: Some(3),
            server_name: None,
            risk_percentage: dec!(1.5),
            strategy: TradingStrategy::All,
        }
    }

    #[test]
    fn test_profile_complete_when_all_fields_present() {
        assert!(is_profile_complete(&session()));
    }

    #[test]
    fn test_profile_incomplete_for_each_missing_field() {
        let clears: [fn(&mut Session); 4] = [
            |s| s.phone = None,
            |s| s.address = Some(String::new()),
            |s| s.id_document_number = None,
            |s| s.date_of_birth = Some("   ".to_string()),
        ];
        for clear in clears {
            let mut s = session();
            clear(&mut s);
            assert!(!s.is_profile_complete());
        }
    }

    #[test]
    fn test_token_ignores_blank() {
        let mut s = session();
        assert_eq!(s.token(), Some("tok"));
        s.auth_token = Some("  ".to_string());
        assert_eq!(s.token(), None);
        s.auth_token = None;
        assert_eq!(s.token(), None);
    }

    #[test]
    fn test_session_deserializes_without_optional_fields() {
        let s: Session = serde_json::from_str(
            r#"{"user_id":"1","display_name":"A","email_address":"a@b.c"}"#,
        )
        .unwrap();
        assert!(s.auth_token.is_none());
        assert!(!s.is_profile_complete());
    }

    #[test]
    fn test_account_kind_codes() {
        assert_eq!(AccountKind::from_code(Some("1")), AccountKind::Demo);
        assert_eq!(AccountKind::from_code(Some("Real")), AccountKind::Real);
        assert_eq!(AccountKind::from_code(Some("9")), AccountKind::Unknown);
        assert_eq!(AccountKind::from_code(None), AccountKind::Unknown);
    }

    #[test]
    fn test_trade_direction_codes() {
        assert_eq!(TradeDirection::from_code(Some("2")), TradeDirection::Sell);
        assert_eq!(TradeDirection::from_code(Some("BUY")), TradeDirection::Buy);
        assert_eq!(TradeDirection::from_code(None), TradeDirection::Buy);
    }

    #[test]
    fn test_strategy_serde_labels() {
        let json = serde_json::to_string(&TradingStrategy::FvgTrend).unwrap();
        assert_eq!(json, "\"FVG + Trend\"");
        assert_eq!(TradingStrategy::parse("voting"), Some(TradingStrategy::Voting));
        assert_eq!(TradingStrategy::parse("martingale"), None);
    }

    #[test]
    fn test_draft_validation() {
        assert!(draft().validate().is_ok());

        let mut d = draft();
        d.login_number = None;
        assert!(d.validate().unwrap_err().contains("login"));

        let mut d = draft();
        d.server_id = None;
        d.server_name = Some(" ".to_string());
        assert!(d.validate().unwrap_err().contains("server"));

        let mut d = draft();
        d.risk_percentage = dec!(10.01);
        assert!(d.validate().unwrap_err().contains("exceed"));

        let mut d = draft();
        d.risk_percentage = dec!(-1);
        assert!(d.validate().unwrap_err().contains("negative"));
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("1".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
