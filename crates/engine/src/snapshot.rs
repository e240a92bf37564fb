use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;
use tradedesk_core::{Account, Trade};

/// Everything the aggregator knows after one refresh.
///
/// A snapshot is never mutated once built; a refresh replaces it whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    open_trades: HashMap<i64, Vec<Trade>>,
    history: HashMap<i64, Vec<Trade>>,
    all_history: Vec<Trade>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Partition each account's trades into open and history and derive the
    /// account's open-trade count and floating profit from the open set.
    ///
    /// Account ids are unique in a snapshot: a repeated id keeps its first entry.
    pub fn build(entries: Vec<(Account, Vec<Trade>)>, refreshed_at: DateTime<Utc>) -> Self {
        let mut snapshot = Snapshot {
            refreshed_at: Some(refreshed_at),
            ..Default::default()
        };

        for (mut account, trades) in entries {
            if snapshot.open_trades.contains_key(&account.id) {
                warn!(account_id = account.id, "Duplicate account in listing, skipped");
                continue;
            }
            let (open, history): (Vec<Trade>, Vec<Trade>) =
                trades.into_iter().partition(Trade::is_open);

            account.open_trade_count = open.len();
            account.profit = open.iter().map(|t| t.profit).sum::<Decimal>();

            snapshot.all_history.extend(history.iter().cloned());
            snapshot.open_trades.insert(account.id, open);
            snapshot.history.insert(account.id, history);
            snapshot.accounts.push(account);
        }

        // Most recent activity first.
        snapshot
            .all_history
            .sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));
        snapshot
    }

    /// Open trades of `account_id`; empty for unknown ids.
    pub fn trades_for(&self, account_id: i64) -> &[Trade] {
        self.open_trades
            .get(&account_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Non-open trades of `account_id`; empty for unknown ids.
    pub fn history_for(&self, account_id: i64) -> &[Trade] {
        self.history
            .get(&account_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every non-open trade across all accounts.
    pub fn all_history(&self) -> &[Trade] {
        &self.all_history
    }

    pub fn account(&self, account_id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Floating profit across all accounts.
    pub fn total_profit(&self) -> Decimal {
        self.accounts.iter().map(|a| a.profit).sum()
    }

    /// Sum of balances across all accounts, regardless of currency.
    pub fn total_balance(&self) -> Decimal {
        self.accounts.iter().map(|a| a.balance).sum()
    }
}
