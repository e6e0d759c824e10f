// File: ledgerbot-core/src/repositories/memory.rs
//
// In-process store behind one async mutex. Each trait method takes the lock
// once, so every operation is atomic with respect to every other.

use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use ledgerbot_common::error::Error;
use ledgerbot_common::models::{
    Account, AccountId, CouponLot, Decision, LotKey, LotSummary, NewCoupon, Request, RequestKind,
    RequestStatus,
};
use ledgerbot_common::traits::repository_traits::{
    AccountRepository, AccountUpdate, CouponRepository, EscrowCheck, RequestRepository,
};
use crate::engine::rules;

#[derive(Default)]
struct LedgerState {
    accounts: BTreeMap<AccountId, Account>,
    coupons: BTreeMap<i64, CouponLot>,
    withdrawals: BTreeMap<i64, Request>,
    deposits: BTreeMap<i64, Request>,
    next_coupon_id: i64,
    next_withdrawal_id: i64,
    next_deposit_id: i64,
}

impl LedgerState {
    fn requests(&self, kind: RequestKind) -> &BTreeMap<i64, Request> {
        match kind {
            RequestKind::Withdrawal => &self.withdrawals,
            RequestKind::Deposit => &self.deposits,
        }
    }

    fn requests_mut(&mut self, kind: RequestKind) -> &mut BTreeMap<i64, Request> {
        match kind {
            RequestKind::Withdrawal => &mut self.withdrawals,
            RequestKind::Deposit => &mut self.deposits,
        }
    }

    fn insert_request(&mut self, kind: RequestKind, requester: AccountId, amount: i64) -> Request {
        let id = match kind {
            RequestKind::Withdrawal => {
                self.next_withdrawal_id += 1;
                self.next_withdrawal_id
            }
            RequestKind::Deposit => {
                self.next_deposit_id += 1;
                self.next_deposit_id
            }
        };
        let request = Request {
            request_id: id,
            kind,
            requester,
            amount,
            status: RequestStatus::Pending,
            reference: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.requests_mut(kind).insert(id, request.clone());
        request
    }

    fn account_mut(&mut self, account_id: AccountId) -> Result<&mut Account, Error> {
        self.accounts
            .get_mut(&account_id)
            .ok_or(Error::UserNotFound(account_id))
    }
}

/// Ledger, inventory and request stores over shared in-memory state.
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryLedgerStore {
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, Error> {
        Ok(self.state.lock().await.accounts.get(&account_id).cloned())
    }

    async fn get_or_create_account(&self, account_id: AccountId) -> Result<(Account, bool), Error> {
        let mut st = self.state.lock().await;
        if let Some(acc) = st.accounts.get(&account_id) {
            return Ok((acc.clone(), false));
        }
        let acc = Account::new(account_id);
        st.accounts.insert(account_id, acc.clone());
        Ok((acc, true))
    }

    async fn update_account(
        &self,
        account_id: AccountId,
        update: &AccountUpdate<'_>,
    ) -> Result<Account, Error> {
        let mut st = self.state.lock().await;
        let current = st.account_mut(account_id)?;
        let next = update(&*current)?;
        current.balance = next.balance;
        current.streak = next.streak;
        current.last_claim_date = next.last_claim_date;
        Ok(current.clone())
    }

    async fn link_referral(
        &self,
        account_id: AccountId,
        referrer_id: AccountId,
        reward: i64,
    ) -> Result<bool, Error> {
        if account_id == referrer_id {
            return Ok(false);
        }
        let mut st = self.state.lock().await;
        let Some(referrer_balance) = st.accounts.get(&referrer_id).map(|a| a.balance) else {
            return Ok(false);
        };
        match st.accounts.get(&account_id) {
            Some(acc) if acc.referred_by.is_none() => {}
            _ => return Ok(false),
        }
        let credited = rules::add_to_balance(referrer_balance, reward)?;
        st.account_mut(account_id)?.referred_by = Some(referrer_id);
        st.account_mut(referrer_id)?.balance = credited;
        Ok(true)
    }

    async fn count_referrals(&self, referrer_id: AccountId) -> Result<i64, Error> {
        let st = self.state.lock().await;
        Ok(st
            .accounts
            .values()
            .filter(|a| a.referred_by == Some(referrer_id))
            .count() as i64)
    }

    async fn credit(&self, account_id: AccountId, amount: i64) -> Result<Account, Error> {
        let mut st = self.state.lock().await;
        let acc = st.account_mut(account_id)?;
        acc.balance = rules::add_to_balance(acc.balance, amount)?;
        Ok(acc.clone())
    }

    async fn clear_balance(&self, account_id: AccountId) -> Result<(), Error> {
        let mut st = self.state.lock().await;
        st.account_mut(account_id)?.balance = 0;
        Ok(())
    }

    async fn clear_all_balances(&self) -> Result<u64, Error> {
        let mut st = self.state.lock().await;
        let mut touched = 0;
        for acc in st.accounts.values_mut().filter(|a| a.balance != 0) {
            acc.balance = 0;
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl CouponRepository for MemoryLedgerStore {
    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<CouponLot, Error> {
        let mut st = self.state.lock().await;
        st.next_coupon_id += 1;
        let row = CouponLot {
            coupon_id: st.next_coupon_id,
            name: coupon.name.clone(),
            code: coupon.code.clone(),
            cost: coupon.cost,
            stock: coupon.stock,
            active: true,
            created_at: Utc::now(),
        };
        st.coupons.insert(row.coupon_id, row.clone());
        Ok(row)
    }

    async fn get_coupon(&self, coupon_id: i64) -> Result<Option<CouponLot>, Error> {
        Ok(self.state.lock().await.coupons.get(&coupon_id).cloned())
    }

    async fn list_shop(&self) -> Result<Vec<LotSummary>, Error> {
        let st = self.state.lock().await;
        let mut lots: BTreeMap<LotKey, i64> = BTreeMap::new();
        for c in st.coupons.values().filter(|c| c.active) {
            *lots.entry(LotKey::new(c.name.clone(), c.cost)).or_insert(0) += i64::from(c.stock);
        }
        Ok(lots
            .into_iter()
            .map(|(key, total_stock)| LotSummary {
                name: key.name,
                cost: key.cost,
                total_stock,
                in_stock: total_stock > 0,
                token: None,
            })
            .collect())
    }

    async fn list_groups(&self) -> Result<Vec<LotKey>, Error> {
        let st = self.state.lock().await;
        let mut groups: Vec<LotKey> = st
            .coupons
            .values()
            .map(|c| LotKey::new(c.name.clone(), c.cost))
            .collect();
        groups.sort();
        groups.dedup();
        Ok(groups)
    }

    async fn purchase(&self, account_id: AccountId, lot: &LotKey) -> Result<(CouponLot, Account), Error> {
        let mut st = self.state.lock().await;
        let buyer = st.accounts.get(&account_id).ok_or(Error::UserNotFound(account_id))?;
        rules::ensure_affordable(buyer, lot.cost)?;

        let in_lot = |c: &CouponLot| c.active && c.name == lot.name && c.cost == lot.cost;
        let picked_id = st
            .coupons
            .values()
            .find(|c| in_lot(*c) && c.stock > 0)
            .map(|c| c.coupon_id);
        let picked_id = match picked_id {
            Some(id) => id,
            None if st.coupons.values().any(|c| in_lot(c)) => return Err(Error::OutOfStock),
            None => return Err(Error::ItemUnavailable),
        };

        let coupon = match st.coupons.get_mut(&picked_id) {
            Some(c) => {
                c.stock -= 1;
                c.clone()
            }
            None => return Err(Error::OutOfStock),
        };
        let buyer = st.account_mut(account_id)?;
        buyer.balance -= lot.cost;
        Ok((coupon, buyer.clone()))
    }

    async fn change_price(&self, name: &str, new_cost: i64) -> Result<u64, Error> {
        let mut st = self.state.lock().await;
        let mut changed = 0;
        for c in st.coupons.values_mut().filter(|c| c.name == name) {
            c.cost = new_cost;
            changed += 1;
        }
        Ok(changed)
    }

    async fn set_lot_active(&self, lot: &LotKey, active: bool) -> Result<u64, Error> {
        let mut st = self.state.lock().await;
        let mut changed = 0;
        for c in st
            .coupons
            .values_mut()
            .filter(|c| c.name == lot.name && c.cost == lot.cost)
        {
            c.active = active;
            changed += 1;
        }
        Ok(changed)
    }

    async fn purge_inactive(&self) -> Result<u64, Error> {
        let mut st = self.state.lock().await;
        let before = st.coupons.len();
        st.coupons.retain(|_, c| c.active);
        Ok((before - st.coupons.len()) as u64)
    }
}

#[async_trait]
impl RequestRepository for MemoryLedgerStore {
    async fn open_withdrawal(
        &self,
        account_id: AccountId,
        check: &EscrowCheck<'_>,
    ) -> Result<Request, Error> {
        let mut st = self.state.lock().await;
        let requester = st.account_mut(account_id)?;
        let amount = check(&*requester)?;
        requester.balance -= amount;
        Ok(st.insert_request(RequestKind::Withdrawal, account_id, amount))
    }

    async fn create_deposit(&self, account_id: AccountId, amount: i64) -> Result<Request, Error> {
        let mut st = self.state.lock().await;
        if !st.accounts.contains_key(&account_id) {
            return Err(Error::UserNotFound(account_id));
        }
        Ok(st.insert_request(RequestKind::Deposit, account_id, amount))
    }

    async fn attach_reference(&self, request_id: i64, reference: &str) -> Result<Request, Error> {
        let mut st = self.state.lock().await;
        match st.deposits.get_mut(&request_id) {
            Some(req) if req.status == RequestStatus::Pending => {
                req.reference = Some(reference.to_string());
                Ok(req.clone())
            }
            other => Err(Error::InvalidRequestState {
                kind: RequestKind::Deposit,
                request_id,
                status: other.map(|r| r.status),
            }),
        }
    }

    async fn get_request(&self, kind: RequestKind, request_id: i64) -> Result<Option<Request>, Error> {
        Ok(self.state.lock().await.requests(kind).get(&request_id).cloned())
    }

    async fn resolve_request(
        &self,
        kind: RequestKind,
        request_id: i64,
        decision: Decision,
    ) -> Result<Request, Error> {
        let mut st = self.state.lock().await;
        let (requester, amount) = match st.requests(kind).get(&request_id) {
            Some(req) if req.status == RequestStatus::Pending => (req.requester, req.amount),
            other => {
                return Err(Error::InvalidRequestState {
                    kind,
                    request_id,
                    status: other.map(|r| r.status),
                });
            }
        };

        let effect = decision.balance_effect(kind, amount);
        if effect != 0 {
            let acc = st.account_mut(requester)?;
            acc.balance = rules::add_to_balance(acc.balance, effect)?;
        }

        let req = st
            .requests_mut(kind)
            .get_mut(&request_id)
            .ok_or(Error::InvalidRequestState { kind, request_id, status: None })?;
        req.status = decision.target_status();
        req.resolved_at = Some(Utc::now());
        Ok(req.clone())
    }

    async fn list_pending(&self, kind: RequestKind, limit: i64) -> Result<Vec<Request>, Error> {
        let st = self.state.lock().await;
        Ok(st
            .requests(kind)
            .values()
            .filter(|r| r.status == RequestStatus::Pending)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
