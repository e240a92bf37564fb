//! Conversion of raw backend records into display models.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;
use tradedesk_core::*;

use crate::config::SyncConfig;

/// Parse a decimal string. Blank or unparseable input yields `None`.
pub fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    let s = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)) {
        Ok(d) => Some(d),
        Err(e) => {
            debug!(value = s, error = %e, "Unparseable decimal field");
            None
        }
    }
}

/// Parse a backend timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let s = raw.map(str::trim).filter(|s| !s.is_empty())?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in &formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
        }
    }

    if let Some(naive) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    if let Ok(ts) = s.parse::<i64>() {
        return DateTime::from_timestamp(ts, 0);
    }

    debug!(value = s, "Unparseable timestamp field");
    None
}

/// Name shown for an account that has none of its own.
pub fn placeholder_name(record: &AccountRecord) -> String {
    match record.login_number {
        Some(login) => format!("Account {login}"),
        None => format!("Account #{}", record.id),
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build a display account. Profit and open-trade count start at zero and are
/// filled in once the account's trades are partitioned.
pub fn account_from_record(record: &AccountRecord, config: &SyncConfig) -> Account {
    let server_label = non_blank(record.server_name.as_ref())
        .or_else(|| record.server_id.map(|id| format!("Server {id}")))
        .unwrap_or_else(|| "Unknown server".to_string());

    Account {
        id: record.id,
        display_name: non_blank(record.name.as_ref()).unwrap_or_else(|| placeholder_name(record)),
        login_number: record.login_number,
        balance: parse_decimal(record.balance.as_deref()).unwrap_or(Decimal::ZERO),
        currency: non_blank(record.currency.as_ref())
            .unwrap_or_else(|| config.default_currency.clone()),
        profit: Decimal::ZERO,
        open_trade_count: 0,
        server_label,
        kind: AccountKind::from_code(record.account_type.as_deref()),
        risk_percentage: parse_decimal(record.risk_percentage.as_deref()).unwrap_or(Decimal::ZERO),
        strategy_label: non_blank(record.strategy.as_ref()).unwrap_or_else(|| "None".to_string()),
    }
}

/// Build a display trade belonging to `account_id`.
///
/// Until a close price is recorded the current price shows the open price;
/// there is no live quote at this layer.
pub fn trade_from_record(record: &TradeRecord, account_id: i64, mapping: &StatusMapping) -> Trade {
    let open_price = parse_decimal(record.open_price.as_deref()).unwrap_or(Decimal::ZERO);
    let current_price = parse_decimal(record.close_price.as_deref()).unwrap_or(open_price);

    let symbol = non_blank(record.symbol.as_ref())
        .or_else(|| record.pair_id.map(|id| format!("PAIR-{id}")))
        .unwrap_or_else(|| "-".to_string());

    Trade {
        id: record.id,
        account_id,
        symbol,
        direction: TradeDirection::from_code(record.trade_type.as_deref()),
        open_price,
        current_price,
        profit: parse_decimal(record.profit.as_deref()).unwrap_or(Decimal::ZERO),
        opened_at: parse_timestamp(record.open_time.as_deref()),
        closed_at: parse_timestamp(record.close_time.as_deref()),
        status: mapping.classify(record.status.as_deref()),
        ticket: record.ticket,
        stop_loss: parse_decimal(record.stop_loss.as_deref()),
        take_profit: parse_decimal(record.take_profit.as_deref()),
        lot_size: parse_decimal(record.lot_size.as_deref()),
    }
}

/// Summarise the MT5 details echoed back by account creation.
pub fn account_info_from_record(info: &MtInfoRecord) -> AccountInfoSummary {
    AccountInfoSummary {
        balance: parse_decimal(info.balance.as_deref()),
        equity: parse_decimal(info.equity.as_deref()),
        leverage: parse_decimal(info.leverage.as_deref()).and_then(|l| l.trunc().to_u32()),
        currency: non_blank(info.currency.as_ref()),
        server: non_blank(info.server.as_ref()),
        company: non_blank(info.company.as_ref()),
    }
}
