use serde::{Deserialize, Serialize};

use crate::models::TradeStatus;

/// Maps backend trade status codes and labels onto [`TradeStatus`].
///
/// Numeric values are matched against the code lists; anything else is
/// matched case-insensitively against the label lists. Unmatched or missing
/// statuses classify as [`TradeStatus::Closed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusMapping {
    pub open_codes: Vec<i64>,
    pub win_codes: Vec<i64>,
    pub loss_codes: Vec<i64>,
    pub open_labels: Vec<String>,
    pub win_labels: Vec<String>,
    pub loss_labels: Vec<String>,
}

impl Default for StatusMapping {
    fn default() -> Self {
        Self {
            open_codes: vec![1],
            win_codes: vec![2],
            loss_codes: vec![3],
            open_labels: vec!["open".to_string()],
            win_labels: vec!["win".to_string(), "winning".to_string()],
            loss_labels: vec!["loss".to_string(), "losing".to_string()],
        }
    }
}

impl StatusMapping {
    pub fn classify(&self, raw: Option<&str>) -> TradeStatus {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return TradeStatus::Closed;
        };

        if let Ok(code) = raw.parse::<i64>() {
            return if self.open_codes.contains(&code) {
                TradeStatus::Open
            } else if self.win_codes.contains(&code) {
                TradeStatus::Win
            } else if self.loss_codes.contains(&code) {
                TradeStatus::Loss
            } else {
                TradeStatus::Closed
            };
        }

        let matches = |labels: &[String]| labels.iter().any(|l| l.eq_ignore_ascii_case(raw));
        if matches(&self.open_labels) {
            TradeStatus::Open
        } else if matches(&self.win_labels) {
            TradeStatus::Win
        } else if matches(&self.loss_labels) {
            TradeStatus::Loss
        } else {
            TradeStatus::Closed
        }
    }
}
