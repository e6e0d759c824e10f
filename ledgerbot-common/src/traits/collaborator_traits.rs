// File: ledgerbot-common/src/traits/collaborator_traits.rs
//
// Narrow interfaces to the outside world: membership lookups, message
// delivery and the calendar.

use async_trait::async_trait;
use chrono::NaiveDate;
use mockall::automock;

use crate::error::Error;
use crate::models::{AccountId, Notification};

/// Channel/group membership lookup against the chat platform.
#[automock]
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn is_member(&self, account_id: AccountId) -> Result<bool, Error>;
}

/// Delivers a message to one account. Callers treat delivery as best-effort.
#[automock]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: AccountId, notification: &Notification) -> Result<(), Error>;
}

/// Source of "today" for daily claims.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}
