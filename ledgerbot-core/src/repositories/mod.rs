// ledgerbot-core/src/repositories/mod.rs

use std::sync::Arc;
use ledgerbot_common::traits::repository_traits::{AccountRepository, CouponRepository, RequestRepository};
use crate::db::Database;

pub mod postgres;
pub mod memory;

pub use memory::MemoryLedgerStore;
pub use postgres::{PostgresAccountRepository, PostgresCouponRepository, PostgresRequestRepository};

/// The three stores the engine works against.
#[derive(Clone)]
pub struct LedgerRepos {
    pub accounts: Arc<dyn AccountRepository + Send + Sync>,
    pub coupons: Arc<dyn CouponRepository + Send + Sync>,
    pub requests: Arc<dyn RequestRepository + Send + Sync>,
}

impl LedgerRepos {
    pub fn postgres(db: &Database) -> Self {
        Self {
            accounts: Arc::new(PostgresAccountRepository::new(db.pool().clone())),
            coupons: Arc::new(PostgresCouponRepository::new(db.pool().clone())),
            requests: Arc::new(PostgresRequestRepository::new(db.pool().clone())),
        }
    }

    /// All three views share one in-memory state.
    pub fn memory(store: MemoryLedgerStore) -> Self {
        Self {
            accounts: Arc::new(store.clone()),
            coupons: Arc::new(store.clone()),
            requests: Arc::new(store),
        }
    }
}
