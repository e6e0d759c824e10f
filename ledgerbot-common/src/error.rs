// ================================================================
// File: ledgerbot-common/src/error.rs
// ================================================================

use thiserror::Error;

use crate::models::request::{RequestKind, RequestStatus};
use crate::models::AccountId;

#[derive(Debug, Error)]
pub enum Error {
    // ---- user-facing outcomes ----
    #[error("Already claimed today")]
    AlreadyClaimed,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid transaction reference (need at least {min_len} characters)")]
    InvalidReference { min_len: usize },

    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("Out of stock")]
    OutOfStock,

    #[error("Item unavailable")]
    ItemUnavailable,

    #[error("Withdraw locked: streak {streak}/{required_streak}, balance {balance}/{min_balance}")]
    Locked {
        streak: i32,
        required_streak: i32,
        balance: i64,
        min_balance: i64,
    },

    /// Approve/reject/reference on a request that is not pending. `status` is
    /// `None` when the id is unknown.
    #[error("Invalid or already processed {kind} request {request_id}")]
    InvalidRequestState {
        kind: RequestKind,
        request_id: i64,
        status: Option<RequestStatus>,
    },

    #[error("User {0} not found")]
    UserNotFound(AccountId),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Membership required")]
    NotMember,

    // ---- infrastructure ----
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// True for outcomes that are rendered back to the caller instead of
    /// being treated as an operational failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::AlreadyClaimed
                | Error::InvalidAmount(_)
                | Error::InvalidReference { .. }
                | Error::InsufficientFunds { .. }
                | Error::OutOfStock
                | Error::ItemUnavailable
                | Error::Locked { .. }
                | Error::InvalidRequestState { .. }
                | Error::UserNotFound(_)
                | Error::Unauthorized
                | Error::NotMember
        )
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_split() {
        assert!(Error::OutOfStock.is_user_facing());
        assert!(Error::Unauthorized.is_user_facing());
        assert!(!Error::Notify("boom".into()).is_user_facing());
        assert!(!Error::Config("missing".into()).is_user_facing());
    }

    #[test]
    fn test_locked_message_reports_thresholds() {
        let e = Error::Locked { streak: 3, required_streak: 7, balance: 40, min_balance: 100 };
        assert_eq!(e.to_string(), "Withdraw locked: streak 3/7, balance 40/100");
    }
}
