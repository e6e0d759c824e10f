// File: ledgerbot-common/src/models/account.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AccountId;

/// A user's ledger record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Account {
    pub account_id: AccountId,
    pub balance: i64,
    pub streak: i32,
    pub last_claim_date: Option<NaiveDate>,
    pub referred_by: Option<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            balance: 0,
            streak: 0,
            last_claim_date: None,
            referred_by: None,
            created_at: Utc::now(),
        }
    }
}
