// File: ledgerbot-core/src/services/ledger_bot.rs
//
// The surface a chat transport talks to. Every inbound action arrives here
// with the caller's account id; outcomes go back as values or user-facing
// errors for the transport to render.

use std::sync::Arc;
use tracing::{debug, error};
use ledgerbot_common::models::views::{
    BalanceView, ClaimResult, DepositDescriptor, PurchaseResult, ReferenceAck, ReferralView, WelcomeView,
    WithdrawResult,
};
use ledgerbot_common::models::{AccountId, CouponLot, LotKey, LotSummary, NewCoupon, Request, RequestKind};
use ledgerbot_common::traits::collaborator_traits::{Clock, MembershipChecker, Notifier};
use crate::config::LedgerConfig;
use crate::engine::dialog::{self, DialogEffect, DialogState, Prompt, Transition};
use crate::repositories::LedgerRepos;
use crate::services::access::{AdminGate, MembershipGate};
use crate::services::approval_service::ApprovalService;
use crate::services::inventory_service::InventoryService;
use crate::services::lot_tokens::LotTokenTable;
use crate::services::notification::NotificationDispatcher;
use crate::services::reward_service::RewardService;
use crate::services::session_store::SessionStore;
use crate::Error;

/// Admin inventory commands that complete in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryOp {
    AddSingle(NewCoupon),
    AddBulk { name: String, cost: i64, codes: Vec<String> },
    ChangePrice { name: String, cost: i64 },
    SetLotActive { lot: LotKey, active: bool },
    PurgeInactive,
    ListGroups,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryOutcome {
    Added(CouponLot),
    BulkAdded { name: String, count: usize },
    Repriced { name: String, cost: i64, rows: u64 },
    ActiveChanged { rows: u64 },
    Purged { rows: u64 },
    Groups(Vec<LotGroup>),
}

/// A lot as the admin sees it, with a token for picking it in a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotGroup {
    pub lot: LotKey,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    All,
    User(AccountId),
}

/// Admin dialogs. Dialogs about an existing lot name it by a token from
/// `InventoryOp::ListGroups`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminDialog {
    AddCoupon,
    AddBulk,
    AddToLot { token: String },
    ChangePrice { token: String },
    ClearUser,
}

/// What a free-text message produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogReply {
    /// No dialog open for this account.
    Idle,
    /// Ask this next (or again).
    Prompt(Prompt),
    /// Deposit opened; the dialog now waits for the payment reference.
    DepositReady(DepositDescriptor),
    ReferenceAccepted(ReferenceAck),
    CouponAdded(CouponLot),
    BulkAdded { name: String, count: usize },
    BalanceCleared(AccountId),
    PriceChanged { name: String, cost: i64, rows: u64 },
}

pub struct LedgerBot {
    rewards: RewardService,
    approvals: ApprovalService,
    inventory: InventoryService,
    admin: AdminGate,
    membership: MembershipGate,
    sessions: SessionStore,
    lot_tokens: Arc<LotTokenTable>,
    config: LedgerConfig,
}

impl LedgerBot {
    pub fn new(
        repos: LedgerRepos,
        membership: Arc<dyn MembershipChecker>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        let admin = AdminGate::new(config.admin_id);
        let notifications = NotificationDispatcher::new(notifier, config.notify_timeout(), config.admin_id);
        let lot_tokens = Arc::new(LotTokenTable::new(config.lot_token_ttl()));

        let rewards = RewardService::new(
            repos.accounts.clone(),
            repos.coupons.clone(),
            repos.requests.clone(),
            clock,
            notifications.clone(),
            lot_tokens.clone(),
            config.clone(),
        );
        let approvals = ApprovalService::new(repos.requests.clone(), notifications.clone());
        let inventory = InventoryService::new(repos.accounts, repos.coupons, notifications);

        Self {
            rewards,
            approvals,
            inventory,
            admin,
            membership: MembershipGate::new(membership, admin),
            sessions: SessionStore::new(),
            lot_tokens,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn is_admin(&self, caller: AccountId) -> bool {
        self.admin.is_admin(caller)
    }

    /// Drops lot tokens past their TTL; returns how many went.
    pub fn purge_expired_tokens(&self) -> usize {
        self.lot_tokens.purge_expired()
    }

    // ------------------------------------------------------------------
    // User operations
    // ------------------------------------------------------------------

    pub async fn handle_start(&self, account_id: AccountId, referral_code: Option<&str>) -> Result<WelcomeView, Error> {
        logged(self.rewards.start(account_id, referral_code).await)
    }

    /// Re-checks group membership, e.g. after the user pressed "I joined".
    pub async fn handle_verify(&self, account_id: AccountId) -> Result<(), Error> {
        self.membership.ensure_member(account_id).await
    }

    pub async fn handle_daily_claim(&self, account_id: AccountId) -> Result<ClaimResult, Error> {
        self.membership.ensure_member(account_id).await?;
        logged(self.rewards.daily_claim(account_id).await)
    }

    pub async fn handle_balance_query(&self, account_id: AccountId) -> Result<BalanceView, Error> {
        self.membership.ensure_member(account_id).await?;
        logged(self.rewards.balance(account_id).await)
    }

    pub async fn handle_referral_link(&self, account_id: AccountId) -> Result<ReferralView, Error> {
        self.membership.ensure_member(account_id).await?;
        Ok(self.rewards.referral_link(account_id))
    }

    pub async fn handle_shop_list(&self) -> Result<Vec<LotSummary>, Error> {
        logged(self.rewards.shop().await)
    }

    pub async fn handle_purchase(&self, account_id: AccountId, lot_name: &str, lot_cost: i64) -> Result<PurchaseResult, Error> {
        self.membership.ensure_member(account_id).await?;
        logged(self.rewards.purchase(account_id, &LotKey::new(lot_name, lot_cost)).await)
    }

    pub async fn handle_purchase_token(&self, account_id: AccountId, token: &str) -> Result<PurchaseResult, Error> {
        self.membership.ensure_member(account_id).await?;
        logged(self.rewards.purchase_token(account_id, token).await)
    }

    pub async fn handle_withdraw(&self, account_id: AccountId) -> Result<WithdrawResult, Error> {
        self.membership.ensure_member(account_id).await?;
        logged(self.rewards.withdraw(account_id).await)
    }

    /// Opens the deposit dialog and returns its first question.
    pub async fn handle_deposit_start(&self, account_id: AccountId) -> Result<Prompt, Error> {
        self.membership.ensure_member(account_id).await?;
        let state = DialogState::DepositAmount;
        let prompt = state.prompt();
        self.sessions.start(account_id, state);
        Ok(prompt)
    }

    pub async fn handle_deposit_init(&self, account_id: AccountId, amount: i64) -> Result<DepositDescriptor, Error> {
        self.membership.ensure_member(account_id).await?;
        logged(self.rewards.deposit_init(account_id, amount).await)
    }

    pub async fn handle_deposit_reference(&self, request_id: i64, reference: &str) -> Result<ReferenceAck, Error> {
        logged(self.rewards.deposit_reference(request_id, reference).await)
    }

    pub fn handle_cancel(&self, account_id: AccountId) -> Option<DialogState> {
        self.sessions.end(account_id)
    }

    /// Feeds free text into the account's open dialog. A committed step
    /// that fails leaves the dialog where it was, unless the failure is
    /// `Unauthorized` or a request that is no longer pending.
    pub async fn handle_text(&self, account_id: AccountId, text: &str) -> Result<DialogReply, Error> {
        let Some(state) = self.sessions.get(account_id) else {
            return Ok(DialogReply::Idle);
        };
        if state.is_admin() {
            if let Err(e) = self.admin.authorize(account_id) {
                self.sessions.end(account_id);
                return Err(e);
            }
        }

        match dialog::advance(&state, text, self.rewards.policy()) {
            Transition::Advance(next) => {
                let prompt = next.prompt();
                self.sessions.start(account_id, next);
                Ok(DialogReply::Prompt(prompt))
            }
            Transition::Retry(prompt) => Ok(DialogReply::Prompt(prompt)),
            Transition::Commit(effect) => match self.commit(account_id, effect).await {
                Ok(reply) => Ok(reply),
                Err(e) => {
                    // No later input can make these succeed.
                    if matches!(e, Error::Unauthorized | Error::InvalidRequestState { .. }) {
                        self.sessions.end(account_id);
                    }
                    logged(Err(e))
                }
            },
        }
    }

    async fn commit(&self, account_id: AccountId, effect: DialogEffect) -> Result<DialogReply, Error> {
        let reply = match effect {
            DialogEffect::InitDeposit { amount } => {
                let descriptor = self.rewards.deposit_init(account_id, amount).await?;
                self.sessions.start(
                    account_id,
                    DialogState::DepositReference { request_id: descriptor.request_id, amount },
                );
                return Ok(DialogReply::DepositReady(descriptor));
            }
            DialogEffect::SubmitReference { request_id, reference } => {
                DialogReply::ReferenceAccepted(self.rewards.deposit_reference(request_id, &reference).await?)
            }
            DialogEffect::AddCoupon(coupon) => DialogReply::CouponAdded(self.inventory.add_single(coupon).await?),
            DialogEffect::AddBulk { name, cost, codes } => {
                let count = self.inventory.add_bulk(&name, cost, &codes).await?;
                DialogReply::BulkAdded { name, count }
            }
            DialogEffect::ClearUser(target) => {
                self.inventory.clear_user(target).await?;
                DialogReply::BalanceCleared(target)
            }
            DialogEffect::ChangePrice { name, cost } => {
                let rows = self.inventory.change_price(&name, cost).await?;
                DialogReply::PriceChanged { name, cost, rows }
            }
        };
        self.sessions.end(account_id);
        Ok(reply)
    }

    // ------------------------------------------------------------------
    // Admin operations
    // ------------------------------------------------------------------

    pub async fn handle_admin_approve(&self, caller: AccountId, request_id: i64, kind: RequestKind) -> Result<Request, Error> {
        self.admin.authorize(caller)?;
        logged(self.approvals.approve(kind, request_id).await)
    }

    pub async fn handle_admin_reject(&self, caller: AccountId, request_id: i64, kind: RequestKind) -> Result<Request, Error> {
        self.admin.authorize(caller)?;
        logged(self.approvals.reject(kind, request_id).await)
    }

    pub async fn handle_admin_pending(&self, caller: AccountId, kind: RequestKind) -> Result<Vec<Request>, Error> {
        self.admin.authorize(caller)?;
        logged(self.approvals.list_pending(kind, self.config.pending_list_limit).await)
    }

    pub async fn handle_admin_inventory_op(&self, caller: AccountId, op: InventoryOp) -> Result<InventoryOutcome, Error> {
        self.admin.authorize(caller)?;
        let outcome = match op {
            InventoryOp::AddSingle(coupon) => self.inventory.add_single(coupon).await.map(InventoryOutcome::Added),
            InventoryOp::AddBulk { name, cost, codes } => self
                .inventory
                .add_bulk(&name, cost, &codes)
                .await
                .map(|count| InventoryOutcome::BulkAdded { name, count }),
            InventoryOp::ChangePrice { name, cost } => self
                .inventory
                .change_price(&name, cost)
                .await
                .map(|rows| InventoryOutcome::Repriced { name, cost, rows }),
            InventoryOp::SetLotActive { lot, active } => self
                .inventory
                .set_lot_active(&lot, active)
                .await
                .map(|rows| InventoryOutcome::ActiveChanged { rows }),
            InventoryOp::PurgeInactive => self
                .inventory
                .purge_inactive()
                .await
                .map(|rows| InventoryOutcome::Purged { rows }),
            InventoryOp::ListGroups => self.inventory.list_groups().await.map(|lots| {
                InventoryOutcome::Groups(
                    lots.into_iter()
                        .map(|lot| LotGroup { token: self.lot_tokens.issue(lot.clone()), lot })
                        .collect(),
                )
            }),
        };
        logged(outcome)
    }

    /// Returns the recipient's new balance.
    pub async fn handle_admin_gift(&self, caller: AccountId, account_id: AccountId, amount: i64) -> Result<i64, Error> {
        self.admin.authorize(caller)?;
        logged(self.inventory.gift(account_id, amount).await)
    }

    /// Returns the number of accounts cleared.
    pub async fn handle_admin_clear(&self, caller: AccountId, target: ClearTarget) -> Result<u64, Error> {
        self.admin.authorize(caller)?;
        let cleared = match target {
            ClearTarget::All => self.inventory.clear_all().await,
            ClearTarget::User(account_id) => self.inventory.clear_user(account_id).await.map(|_| 1),
        };
        logged(cleared)
    }

    pub async fn handle_admin_start_dialog(&self, caller: AccountId, which: AdminDialog) -> Result<Prompt, Error> {
        self.admin.authorize(caller)?;
        let state = match which {
            AdminDialog::AddCoupon => DialogState::CouponName,
            AdminDialog::AddBulk => DialogState::BulkName,
            AdminDialog::AddToLot { token } => {
                let lot = self.lot_tokens.resolve(&token).ok_or(Error::ItemUnavailable)?;
                DialogState::BulkCodes { name: lot.name, cost: lot.cost }
            }
            AdminDialog::ChangePrice { token } => {
                let lot = self.lot_tokens.resolve(&token).ok_or(Error::ItemUnavailable)?;
                DialogState::NewPrice { name: lot.name }
            }
            AdminDialog::ClearUser => DialogState::ClearUserId,
        };
        let prompt = state.prompt();
        self.sessions.start(caller, state);
        Ok(prompt)
    }
}

/// Logs operational failures; user-facing outcomes pass through quietly.
fn logged<T>(result: Result<T, Error>) -> Result<T, Error> {
    if let Err(e) = &result {
        if e.is_user_facing() {
            debug!("Rejected: {}", e);
        } else {
            error!("Ledger operation failed: {:?}", e);
        }
    }
    result
}
