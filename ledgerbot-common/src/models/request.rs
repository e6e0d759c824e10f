// File: ledgerbot-common/src/models/request.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AccountId;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Withdrawal,
    Deposit,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Withdrawal => "withdrawal",
            RequestKind::Deposit => "deposit",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "withdrawal" | "withdraw" => Ok(RequestKind::Withdrawal),
            "deposit" | "payment" => Ok(RequestKind::Deposit),
            _ => Err(format!("Unknown request kind: {}", s)),
        }
    }
}

/// Lifecycle of a request. `Pending` is the only non-terminal state.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(format!("Unknown request status: {}", s)),
        }
    }
}

/// Admin verdict on a pending request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }

    /// Balance change applied to the requester when this decision resolves a
    /// request of `kind`. Withdrawals were escrowed at creation, so only a
    /// rejection moves funds (the refund); deposits only move on approval.
    pub fn balance_effect(&self, kind: RequestKind, amount: i64) -> i64 {
        match (kind, self) {
            (RequestKind::Deposit, Decision::Approve) => amount,
            (RequestKind::Withdrawal, Decision::Reject) => amount,
            _ => 0,
        }
    }
}

/// A withdrawal or deposit request. Withdrawals and deposits live in
/// separate tables, so `request_id` is only unique per `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    pub request_id: i64,
    pub kind: RequestKind,
    pub requester: AccountId,
    pub amount: i64,
    pub status: RequestStatus,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_effect_matrix() {
        assert_eq!(Decision::Approve.balance_effect(RequestKind::Deposit, 40), 40);
        assert_eq!(Decision::Reject.balance_effect(RequestKind::Deposit, 40), 0);
        assert_eq!(Decision::Approve.balance_effect(RequestKind::Withdrawal, 150), 0);
        assert_eq!(Decision::Reject.balance_effect(RequestKind::Withdrawal, 150), 150);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("Approved".parse::<RequestStatus>().unwrap(), RequestStatus::Approved);
        assert!("done".parse::<RequestStatus>().is_err());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
    }
}
