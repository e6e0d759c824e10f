use async_trait::async_trait;
use crate::error::Error;
use crate::models::{Account, AccountId, CouponLot, Decision, LotKey, LotSummary, NewCoupon, Request, RequestKind};

/// Decision run against a locked account row; returns the row to persist.
pub type AccountUpdate<'a> = dyn Fn(&Account) -> Result<Account, Error> + Send + Sync + 'a;

/// Eligibility check run against a locked account row; returns the amount
/// to move into escrow.
pub type EscrowCheck<'a> = dyn Fn(&Account) -> Result<i64, Error> + Send + Sync + 'a;

/// Ledger store. Every method is one transaction over the rows it names.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, Error>;

    /// Returns the account plus `true` if this call created it.
    async fn get_or_create_account(&self, account_id: AccountId) -> Result<(Account, bool), Error>;

    /// Locks the row, runs `update`, and writes back balance, streak and
    /// last claim date. An `Err` from `update` aborts without writing.
    async fn update_account(
        &self,
        account_id: AccountId,
        update: &AccountUpdate<'_>,
    ) -> Result<Account, Error>;

    /// Sets `referred_by` on `account_id` and credits `reward` to the
    /// referrer, only if `referred_by` was unset and the referrer exists.
    /// Returns `false` when nothing changed.
    async fn link_referral(
        &self,
        account_id: AccountId,
        referrer_id: AccountId,
        reward: i64,
    ) -> Result<bool, Error>;

    async fn count_referrals(&self, referrer_id: AccountId) -> Result<i64, Error>;

    /// Adds `amount` to an existing account (`UserNotFound` otherwise).
    async fn credit(&self, account_id: AccountId, amount: i64) -> Result<Account, Error>;

    async fn clear_balance(&self, account_id: AccountId) -> Result<(), Error>;

    /// Returns the number of accounts touched.
    async fn clear_all_balances(&self) -> Result<u64, Error>;
}

/// Inventory store.
#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<CouponLot, Error>;
    async fn get_coupon(&self, coupon_id: i64) -> Result<Option<CouponLot>, Error>;

    /// Active lots grouped by `(name, cost)`, ordered by name then cost.
    /// Tokens are left unset.
    async fn list_shop(&self) -> Result<Vec<LotSummary>, Error>;

    /// Every `(name, cost)` group, active or not.
    async fn list_groups(&self) -> Result<Vec<LotKey>, Error>;

    /// Debits `lot.cost` from the buyer and consumes one unit of one active,
    /// in-stock row of the lot, atomically. Checks funds before stock.
    async fn purchase(&self, account_id: AccountId, lot: &LotKey) -> Result<(CouponLot, Account), Error>;

    /// Reprices every row named `name`; returns rows changed.
    async fn change_price(&self, name: &str, new_cost: i64) -> Result<u64, Error>;

    async fn set_lot_active(&self, lot: &LotKey, active: bool) -> Result<u64, Error>;

    /// Deletes deactivated rows; returns rows removed.
    async fn purge_inactive(&self) -> Result<u64, Error>;
}

/// Withdrawal and deposit requests.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Locks the requester, runs `check`, zeroes out the escrowed amount and
    /// inserts a pending withdrawal, in one transaction.
    async fn open_withdrawal(
        &self,
        account_id: AccountId,
        check: &EscrowCheck<'_>,
    ) -> Result<Request, Error>;

    async fn create_deposit(&self, account_id: AccountId, amount: i64) -> Result<Request, Error>;

    /// Stores the payment reference on a pending deposit.
    async fn attach_reference(&self, request_id: i64, reference: &str) -> Result<Request, Error>;

    async fn get_request(&self, kind: RequestKind, request_id: i64) -> Result<Option<Request>, Error>;

    /// Moves a pending request to its terminal state and applies
    /// `decision.balance_effect` to the requester in the same transaction.
    async fn resolve_request(
        &self,
        kind: RequestKind,
        request_id: i64,
        decision: Decision,
    ) -> Result<Request, Error>;

    /// Oldest first.
    async fn list_pending(&self, kind: RequestKind, limit: i64) -> Result<Vec<Request>, Error>;
}
