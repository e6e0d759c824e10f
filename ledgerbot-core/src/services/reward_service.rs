// File: ledgerbot-core/src/services/reward_service.rs

use std::sync::Arc;
use tracing::{debug, info};
use ledgerbot_common::models::views::{
    BalanceView, ClaimResult, DepositDescriptor, PurchaseResult, ReferenceAck, ReferralOutcome,
    ReferralView, WelcomeView, WithdrawResult,
};
use ledgerbot_common::models::{Account, AccountId, LotKey, LotSummary, Notification, RequestKind};
use ledgerbot_common::traits::collaborator_traits::Clock;
use ledgerbot_common::traits::repository_traits::{AccountRepository, CouponRepository, RequestRepository};
use crate::config::LedgerConfig;
use crate::engine::rules::{self, RewardPolicy};
use crate::services::lot_tokens::LotTokenTable;
use crate::services::notification::NotificationDispatcher;
use crate::Error;

/// User-side ledger operations: claims, referrals, shop, withdrawals and
/// deposits.
pub struct RewardService {
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    coupons: Arc<dyn CouponRepository + Send + Sync>,
    requests: Arc<dyn RequestRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
    notifications: NotificationDispatcher,
    lot_tokens: Arc<LotTokenTable>,
    policy: RewardPolicy,
    config: LedgerConfig,
}

impl RewardService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: Arc<dyn AccountRepository + Send + Sync>,
        coupons: Arc<dyn CouponRepository + Send + Sync>,
        requests: Arc<dyn RequestRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
        notifications: NotificationDispatcher,
        lot_tokens: Arc<LotTokenTable>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            accounts,
            coupons,
            requests,
            clock,
            notifications,
            lot_tokens,
            policy: RewardPolicy::from(&config),
            config,
        }
    }

    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    /// First contact (or a repeat /start). Referral codes only count for an
    /// account created by this very call.
    pub async fn start(&self, account_id: AccountId, referral_code: Option<&str>) -> Result<WelcomeView, Error> {
        let (account, is_new) = self.accounts.get_or_create_account(account_id).await?;
        if is_new {
            info!("New account {}", account_id);
        }

        let referral = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            None => ReferralOutcome::NotRequested,
            Some(_) if !is_new => ReferralOutcome::Ignored,
            Some(code) => self.apply_referral(account_id, code).await?,
        };

        Ok(WelcomeView {
            account_id,
            balance: account.balance,
            streak: account.streak,
            is_new,
            referral,
        })
    }

    async fn apply_referral(&self, account_id: AccountId, code: &str) -> Result<ReferralOutcome, Error> {
        let Some(referrer) = rules::parse_referrer(code, account_id) else {
            debug!("Ignoring referral code '{}' for {}", code, account_id);
            return Ok(ReferralOutcome::Ignored);
        };
        let reward = self.policy.referral_reward;
        if !self.accounts.link_referral(account_id, referrer, reward).await? {
            return Ok(ReferralOutcome::Ignored);
        }

        info!("Account {} referred by {} (+{})", account_id, referrer, reward);
        self.notifications.dispatch(
            referrer,
            Notification::text(format!("🎉 New referral! You earned +{} points.", reward)),
        );
        Ok(ReferralOutcome::Credited { referrer })
    }

    pub async fn daily_claim(&self, account_id: AccountId) -> Result<ClaimResult, Error> {
        self.accounts.get_or_create_account(account_id).await?;
        let today = self.clock.today();
        let reward = self.policy.daily_reward;

        let account = self
            .accounts
            .update_account(account_id, &|acc: &Account| rules::apply_daily_claim(acc, today, reward))
            .await?;

        debug!("Daily claim by {}: streak={}, balance={}", account_id, account.streak, account.balance);
        Ok(ClaimResult { reward, balance: account.balance, streak: account.streak })
    }

    pub async fn balance(&self, account_id: AccountId) -> Result<BalanceView, Error> {
        let (account, _) = self.accounts.get_or_create_account(account_id).await?;
        let referrals = self.accounts.count_referrals(account_id).await?;
        Ok(BalanceView { balance: account.balance, streak: account.streak, referrals })
    }

    pub fn referral_link(&self, account_id: AccountId) -> ReferralView {
        ReferralView {
            referral_code: account_id.to_string(),
            reward_per_referral: self.policy.referral_reward,
        }
    }

    /// Active lots, each in-stock lot carrying a fresh purchase token.
    pub async fn shop(&self) -> Result<Vec<LotSummary>, Error> {
        self.lot_tokens.purge_expired();
        let mut lots = self.coupons.list_shop().await?;
        for lot in lots.iter_mut().filter(|l| l.in_stock) {
            lot.token = Some(self.lot_tokens.issue(LotKey::new(lot.name.clone(), lot.cost)));
        }
        Ok(lots)
    }

    pub async fn purchase(&self, account_id: AccountId, lot: &LotKey) -> Result<PurchaseResult, Error> {
        self.accounts.get_or_create_account(account_id).await?;
        let (coupon, account) = self.coupons.purchase(account_id, lot).await?;
        info!(
            "Account {} bought '{}' (coupon {}) for {}",
            account_id, coupon.name, coupon.coupon_id, lot.cost
        );
        Ok(PurchaseResult {
            name: coupon.name,
            code: coupon.code,
            cost: lot.cost,
            balance: account.balance,
        })
    }

    pub async fn purchase_token(&self, account_id: AccountId, token: &str) -> Result<PurchaseResult, Error> {
        let lot = self.lot_tokens.resolve(token).ok_or(Error::ItemUnavailable)?;
        self.purchase(account_id, &lot).await
    }

    /// Escrows the whole balance into a pending withdrawal.
    pub async fn withdraw(&self, account_id: AccountId) -> Result<WithdrawResult, Error> {
        self.accounts.get_or_create_account(account_id).await?;
        let policy = self.policy;
        let request = self
            .requests
            .open_withdrawal(account_id, &|acc: &Account| rules::withdrawal_amount(acc, &policy))
            .await?;

        info!("Withdrawal #{} opened by {} for {}", request.request_id, account_id, request.amount);
        self.notifications.notify_admin(Notification::with_review(
            format!(
                "🚨 Withdrawal request #{}\nUser: {}\nAmount: {}",
                request.request_id, account_id, request.amount
            ),
            RequestKind::Withdrawal,
            request.request_id,
        ));
        Ok(WithdrawResult { request_id: request.request_id, amount: request.amount })
    }

    pub async fn deposit_init(&self, account_id: AccountId, amount: i64) -> Result<DepositDescriptor, Error> {
        let amount = rules::validate_positive(amount)?;
        self.accounts.get_or_create_account(account_id).await?;
        let request = self.requests.create_deposit(account_id, amount).await?;
        info!("Deposit #{} opened by {} for {}", request.request_id, account_id, amount);

        Ok(DepositDescriptor {
            request_id: request.request_id,
            payee_id: self.config.payee_id.clone(),
            payee_name: self.config.payee_name.clone(),
            amount,
            currency: self.config.currency.clone(),
            memo: self.config.payment_memo.clone(),
        })
    }

    pub async fn deposit_reference(&self, request_id: i64, reference: &str) -> Result<ReferenceAck, Error> {
        let reference = rules::validate_reference(reference, self.policy.min_reference_len)?;
        let request = self.requests.attach_reference(request_id, &reference).await?;

        info!("Deposit #{} reference submitted", request_id);
        self.notifications.notify_admin(Notification::with_review(
            format!(
                "💰 Deposit request #{}\nUser: {}\nAmount: {}\nRef: {}",
                request.request_id, request.requester, request.amount, reference
            ),
            RequestKind::Deposit,
            request.request_id,
        ));
        Ok(ReferenceAck { request_id: request.request_id, amount: request.amount })
    }
}
