// File: ledgerbot-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use ledgerbot_common::models::{Account, AccountId, Notification};
use ledgerbot_common::traits::collaborator_traits::{MembershipChecker, Notifier};
use ledgerbot_common::traits::repository_traits::AccountRepository;
use ledgerbot_core::http::AllowAllMembership;
use ledgerbot_core::repositories::{LedgerRepos, MemoryLedgerStore};
use ledgerbot_core::utils::time::FixedClock;
use ledgerbot_core::{Error, LedgerBot, LedgerConfig};

pub const ADMIN: AccountId = 1;

/// Forwards every notification into a channel the test can drain.
pub struct RecordingNotifier {
    tx: UnboundedSender<(AccountId, Notification)>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: AccountId, notification: &Notification) -> Result<(), Error> {
        let _ = self.tx.send((recipient, notification.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub bot: LedgerBot,
    pub store: MemoryLedgerStore,
    pub clock: Arc<FixedClock>,
    pub notes: UnboundedReceiver<(AccountId, Notification)>,
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn test_config() -> LedgerConfig {
    LedgerConfig { admin_id: Some(ADMIN), notify_timeout_ms: 500, ..Default::default() }
}

pub fn harness() -> Harness {
    harness_with(test_config(), Arc::new(AllowAllMembership))
}

pub fn harness_with(config: LedgerConfig, membership: Arc<dyn MembershipChecker>) -> Harness {
    let store = MemoryLedgerStore::new();
    let clock = Arc::new(FixedClock::new(day(2024, 3, 1)));
    let (tx, notes) = unbounded_channel();
    let bot = LedgerBot::new(
        LedgerRepos::memory(store.clone()),
        membership,
        Arc::new(RecordingNotifier { tx }),
        clock.clone(),
        config,
    );
    Harness { bot, store, clock, notes }
}

impl Harness {
    /// Creates the account if needed and sets its balance and streak.
    pub async fn seed(&self, account_id: AccountId, balance: i64, streak: i32) {
        self.store.get_or_create_account(account_id).await.unwrap();
        self.store
            .update_account(account_id, &move |acc: &Account| {
                let mut next = acc.clone();
                next.balance = balance;
                next.streak = streak;
                Ok(next)
            })
            .await
            .unwrap();
    }

    pub async fn balance(&self, account_id: AccountId) -> i64 {
        self.store.get_account(account_id).await.unwrap().unwrap().balance
    }

    /// Next delivered notification, or `None` after a short wait.
    pub async fn next_note(&mut self) -> Option<(AccountId, Notification)> {
        tokio::time::timeout(Duration::from_secs(1), self.notes.recv())
            .await
            .ok()
            .flatten()
    }
}
