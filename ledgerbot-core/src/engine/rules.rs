// File: ledgerbot-core/src/engine/rules.rs

use chrono::NaiveDate;
use ledgerbot_common::models::{Account, AccountId};
use crate::config::LedgerConfig;
use crate::utils::time::days_between;
use crate::Error;

/// The reward constants the engine decides with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPolicy {
    pub daily_reward: i64,
    pub referral_reward: i64,
    pub withdraw_streak: i32,
    pub min_withdraw: i64,
    pub min_reference_len: usize,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for RewardPolicy {
    fn from(cfg: &LedgerConfig) -> Self {
        Self {
            daily_reward: cfg.daily_reward,
            referral_reward: cfg.referral_reward,
            withdraw_streak: cfg.withdraw_streak,
            min_withdraw: cfg.min_withdraw,
            min_reference_len: cfg.min_reference_len,
        }
    }
}

/// Streak after a claim on `today`. A claim exactly one day after the last
/// continues the streak; anything else starts over at 1. A last claim on or
/// after `today` means the day was already claimed.
pub fn next_streak(last_claim: Option<NaiveDate>, streak: i32, today: NaiveDate) -> Result<i32, Error> {
    match last_claim {
        None => Ok(1),
        Some(last) => match days_between(last, today) {
            d if d <= 0 => Err(Error::AlreadyClaimed),
            1 => Ok(streak.saturating_add(1)),
            _ => Ok(1),
        },
    }
}

/// The account row after a daily claim on `today`.
pub fn apply_daily_claim(account: &Account, today: NaiveDate, reward: i64) -> Result<Account, Error> {
    let streak = next_streak(account.last_claim_date, account.streak, today)?;
    let mut next = account.clone();
    next.balance = add_to_balance(account.balance, reward)?;
    next.streak = streak;
    next.last_claim_date = Some(today);
    Ok(next)
}

/// `balance + amount`, refusing credits the balance column cannot hold.
pub fn add_to_balance(balance: i64, amount: i64) -> Result<i64, Error> {
    balance
        .checked_add(amount)
        .ok_or_else(|| Error::InvalidAmount(format!("crediting {} would overflow the balance", amount)))
}

/// Parses a start payload into a referrer id. Malformed codes and
/// self-referrals yield `None`.
pub fn parse_referrer(code: &str, new_account: AccountId) -> Option<AccountId> {
    let referrer: AccountId = code.trim().parse().ok()?;
    if referrer == new_account || referrer <= 0 {
        return None;
    }
    Some(referrer)
}

/// Amount to escrow for a withdrawal: the entire balance, once both the
/// streak and balance thresholds are met.
pub fn withdrawal_amount(account: &Account, policy: &RewardPolicy) -> Result<i64, Error> {
    if account.streak < policy.withdraw_streak
        || account.balance < policy.min_withdraw
        || account.balance <= 0
    {
        return Err(Error::Locked {
            streak: account.streak,
            required_streak: policy.withdraw_streak,
            balance: account.balance,
            min_balance: policy.min_withdraw,
        });
    }
    Ok(account.balance)
}

/// Funds check done under the buyer's row lock.
pub fn ensure_affordable(account: &Account, cost: i64) -> Result<(), Error> {
    if account.balance < cost {
        return Err(Error::InsufficientFunds { needed: cost, available: account.balance });
    }
    Ok(())
}

pub fn validate_positive(amount: i64) -> Result<i64, Error> {
    if amount <= 0 {
        return Err(Error::InvalidAmount(format!("{} is not a positive amount", amount)));
    }
    Ok(amount)
}

/// Positive whole number typed by a user.
pub fn parse_positive_amount(text: &str) -> Result<i64, Error> {
    let amount: i64 = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(format!("'{}' is not a number", text.trim())))?;
    validate_positive(amount)
}

/// Non-negative price typed by the admin.
pub fn parse_price(text: &str) -> Result<i64, Error> {
    let price: i64 = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(format!("'{}' is not a number", text.trim())))?;
    validate_price(price)
}

pub fn validate_price(price: i64) -> Result<i64, Error> {
    if price < 0 {
        return Err(Error::InvalidAmount(format!("price {} is negative", price)));
    }
    Ok(price)
}

pub fn parse_stock(text: &str) -> Result<i32, Error> {
    let stock: i32 = text
        .trim()
        .parse()
        .map_err(|_| Error::InvalidAmount(format!("'{}' is not a stock count", text.trim())))?;
    if stock < 0 {
        return Err(Error::InvalidAmount(format!("stock {} is negative", stock)));
    }
    Ok(stock)
}

pub fn parse_account_id(text: &str) -> Option<AccountId> {
    text.trim().parse::<AccountId>().ok().filter(|id| *id > 0)
}

/// Trimmed transaction reference of at least `min_len` characters.
pub fn validate_reference(text: &str, min_len: usize) -> Result<String, Error> {
    let reference = text.trim();
    if reference.chars().count() < min_len {
        return Err(Error::InvalidReference { min_len });
    }
    Ok(reference.to_string())
}

/// One code per line, blank lines dropped.
pub fn parse_code_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
