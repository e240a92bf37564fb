//! Plain-text rendering for terminal output.

use rust_decimal::Decimal;
use tradedesk_core::*;
use tradedesk_engine::{MutationOutcome, Snapshot};

fn direction(d: TradeDirection) -> &'static str {
    match d {
        TradeDirection::Buy => "BUY",
        TradeDirection::Sell => "SELL",
    }
}

fn status(s: TradeStatus) -> &'static str {
    match s {
        TradeStatus::Open => "open",
        TradeStatus::Win => "win",
        TradeStatus::Loss => "loss",
        TradeStatus::Closed => "closed",
    }
}

fn opt_decimal(value: Option<Decimal>) -> String {
    value.map(|d| d.normalize().to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn dashboard(snapshot: &Snapshot) -> String {
    let sep = "=".repeat(78);
    let mut out = String::new();
    out.push_str(&format!("{sep}\n"));
    match snapshot.refreshed_at {
        Some(at) => out.push_str(&format!("  ACCOUNTS (as of {})\n", at.format("%Y-%m-%d %H:%M:%S UTC"))),
        None => out.push_str("  ACCOUNTS\n"),
    }
    out.push_str(&format!("{sep}\n"));

    if snapshot.is_empty() {
        out.push_str("  No accounts linked yet.\n");
        out.push_str(&format!("{sep}\n"));
        return out;
    }

    out.push_str(&format!(
        "  {:<6} {:<22} {:<6} {:>14} {:>12} {:>5}  {}\n",
        "ID", "Name", "Type", "Balance", "Profit", "Open", "Server"
    ));
    for account in &snapshot.accounts {
        out.push_str(&format!(
            "  {:<6} {:<22} {:<6} {:>10.2} {:<3} {:>12.2} {:>5}  {}\n",
            account.id,
            truncate(&account.display_name, 22),
            account.kind.label(),
            account.balance,
            account.currency,
            account.profit,
            account.open_trade_count,
            account.server_label
        ));
        for trade in snapshot.trades_for(account.id) {
            out.push_str(&format!("      {}\n", trade_line(trade)));
        }
    }
    out.push_str(&format!("{sep}\n"));
    out.push_str(&format!(
        "  Total balance: {:.2}   Floating profit: {:.2}\n",
        snapshot.total_balance(),
        snapshot.total_profit()
    ));
    out.push_str(&format!("{sep}\n"));
    out
}

pub fn trade_line(trade: &Trade) -> String {
    format!(
        "#{:<10} {:<4} {:<10} lots {:<6} open {:<10} now {:<10} P/L {:>10.2}  {}",
        trade.ticket.map(|t| t.to_string()).unwrap_or_else(|| trade.id.to_string()),
        direction(trade.direction),
        trade.symbol,
        opt_decimal(trade.lot_size),
        trade.open_price.normalize(),
        trade.current_price.normalize(),
        trade.profit,
        status(trade.status)
    )
}

/// History lines, newest activity first.
pub fn history(trades: &[Trade]) -> String {
    if trades.is_empty() {
        return "No closed trades.\n".to_string();
    }
    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));

    let mut out = String::new();
    for trade in sorted {
        let when = trade
            .last_activity()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{when:<16}  acct {:<6} {}\n", trade.account_id, trade_line(trade)));
    }
    out
}

pub fn profile(session: &Session) -> String {
    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "(missing)".to_string());
    let mut out = String::new();
    out.push_str(&format!("User:     {} <{}>\n", session.display_name, session.email_address));
    out.push_str(&format!("User ID:  {}\n", session.user_id));
    out.push_str(&format!("Phone:    {}\n", field(&session.phone)));
    out.push_str(&format!("Address:  {}\n", field(&session.address)));
    out.push_str(&format!("ID no.:   {}\n", field(&session.id_document_number)));
    out.push_str(&format!("Born:     {}\n", field(&session.date_of_birth)));
    if session.is_profile_complete() {
        out.push_str("Profile complete.\n");
    } else {
        out.push_str("Profile incomplete: run `tradedesk profile` to fill in the missing fields.\n");
    }
    out
}

pub fn outcome(outcome: &MutationOutcome) -> String {
    let mut out = if outcome.success {
        format!("OK: {}\n", outcome.message)
    } else {
        format!("FAILED: {}\n", outcome.message)
    };
    if let Some(info) = &outcome.account_info {
        out.push_str(&format!(
            "  Balance: {}  Equity: {}  Leverage: {}  Server: {}\n",
            opt_decimal(info.balance),
            opt_decimal(info.equity),
            info.leverage.map(|l| format!("1:{l}")).unwrap_or_else(|| "-".to_string()),
            info.server.as_deref().unwrap_or("-")
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max - 1).collect();
        t.push('~');
        t
    }
}
