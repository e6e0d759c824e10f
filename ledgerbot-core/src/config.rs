// File: ledgerbot-core/src/config.rs

use std::time::Duration;
use serde::{Deserialize, Serialize};
use ledgerbot_common::models::AccountId;
use crate::Error;

/// Reward constants, payee details and runtime limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// The single administrator. With no admin configured every admin
    /// operation is refused.
    pub admin_id: Option<AccountId>,

    pub daily_reward: i64,
    pub referral_reward: i64,
    pub withdraw_streak: i32,
    pub min_withdraw: i64,
    pub min_reference_len: usize,

    pub payee_id: String,
    pub payee_name: String,
    pub currency: String,
    pub payment_memo: String,

    pub notify_timeout_ms: u64,
    pub lot_token_ttl_secs: u64,
    pub pending_list_limit: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            admin_id: None,
            daily_reward: 5,
            referral_reward: 5,
            withdraw_streak: 7,
            min_withdraw: 100,
            min_reference_len: 6,
            payee_id: "ledger@upi".to_string(),
            payee_name: "Ledger Official".to_string(),
            currency: "INR".to_string(),
            payment_memo: "LEDGER".to_string(),
            notify_timeout_ms: 5_000,
            lot_token_ttl_secs: 3_600,
            pending_list_limit: 10,
        }
    }
}

impl LedgerConfig {
    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Unset or empty
    /// values keep the default; unparsable values are a config error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("ADMIN_ID") {
            cfg.admin_id = Some(parse_var("ADMIN_ID", &v)?);
        }
        if let Some(v) = get("LEDGER_DAILY_REWARD") {
            cfg.daily_reward = parse_var("LEDGER_DAILY_REWARD", &v)?;
        }
        if let Some(v) = get("LEDGER_REFERRAL_REWARD") {
            cfg.referral_reward = parse_var("LEDGER_REFERRAL_REWARD", &v)?;
        }
        if let Some(v) = get("LEDGER_WITHDRAW_STREAK") {
            cfg.withdraw_streak = parse_var("LEDGER_WITHDRAW_STREAK", &v)?;
        }
        if let Some(v) = get("LEDGER_MIN_WITHDRAW") {
            cfg.min_withdraw = parse_var("LEDGER_MIN_WITHDRAW", &v)?;
        }
        if let Some(v) = get("LEDGER_MIN_REFERENCE_LEN") {
            cfg.min_reference_len = parse_var("LEDGER_MIN_REFERENCE_LEN", &v)?;
        }
        if let Some(v) = get("UPI_ID") {
            cfg.payee_id = v;
        }
        if let Some(v) = get("UPI_NAME") {
            cfg.payee_name = v;
        }
        if let Some(v) = get("LEDGER_CURRENCY") {
            cfg.currency = v;
        }
        if let Some(v) = get("LEDGER_PAYMENT_MEMO") {
            cfg.payment_memo = v;
        }
        if let Some(v) = get("LEDGER_NOTIFY_TIMEOUT_MS") {
            cfg.notify_timeout_ms = parse_var("LEDGER_NOTIFY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("LEDGER_LOT_TOKEN_TTL_SECS") {
            cfg.lot_token_ttl_secs = parse_var("LEDGER_LOT_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = get("LEDGER_PENDING_LIST_LIMIT") {
            cfg.pending_list_limit = parse_var("LEDGER_PENDING_LIST_LIMIT", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.daily_reward < 0 || self.referral_reward < 0 {
            return Err(Error::Config("rewards must not be negative".into()));
        }
        if self.withdraw_streak < 0 || self.min_withdraw < 0 {
            return Err(Error::Config("withdraw thresholds must not be negative".into()));
        }
        if self.pending_list_limit <= 0 {
            return Err(Error::Config("pending_list_limit must be positive".into()));
        }
        Ok(())
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }

    pub fn lot_token_ttl(&self) -> Duration {
        Duration::from_secs(self.lot_token_ttl_secs)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| Error::Config(format!("{}='{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reward_constants() {
        let cfg = LedgerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.daily_reward, 5);
        assert_eq!(cfg.referral_reward, 5);
        assert_eq!(cfg.withdraw_streak, 7);
        assert_eq!(cfg.min_withdraw, 100);
        assert_eq!(cfg.min_reference_len, 6);
        assert_eq!(cfg.admin_id, None);
    }

    #[test]
    fn test_env_overrides() {
        let cfg = LedgerConfig::from_lookup(lookup_from(&[
            ("ADMIN_ID", "424242"),
            ("LEDGER_MIN_WITHDRAW", "250"),
            ("UPI_NAME", "Shop"),
            ("LEDGER_CURRENCY", "  "),
        ]))
        .unwrap();
        assert_eq!(cfg.admin_id, Some(424242));
        assert_eq!(cfg.min_withdraw, 250);
        assert_eq!(cfg.payee_name, "Shop");
        assert_eq!(cfg.currency, "INR");
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let err = LedgerConfig::from_lookup(lookup_from(&[("ADMIN_ID", "not-a-number")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
