// File: ledgerbot-common/src/models/views.rs
//
// Outcomes returned to the transport layer for rendering.

use serde::{Deserialize, Serialize};

use crate::models::AccountId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// No referral code accompanied the start.
    NotRequested,
    Credited { referrer: AccountId },
    /// Self-referral, unknown referrer, malformed code or already referred.
    Ignored,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WelcomeView {
    pub account_id: AccountId,
    pub balance: i64,
    pub streak: i32,
    pub is_new: bool,
    pub referral: ReferralOutcome,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimResult {
    pub reward: i64,
    pub balance: i64,
    pub streak: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceView {
    pub balance: i64,
    pub streak: i32,
    pub referrals: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferralView {
    pub referral_code: String,
    pub reward_per_referral: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseResult {
    pub name: String,
    pub code: String,
    pub cost: i64,
    pub balance: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WithdrawResult {
    pub request_id: i64,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceAck {
    pub request_id: i64,
    pub amount: i64,
}

/// Everything an external renderer needs to draw a payment QR code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepositDescriptor {
    pub request_id: i64,
    pub payee_id: String,
    pub payee_name: String,
    pub amount: i64,
    pub currency: String,
    pub memo: String,
}

impl DepositDescriptor {
    /// UPI deep link understood by most payment apps.
    pub fn payment_uri(&self) -> String {
        format!(
            "upi://pay?pa={}&pn={}&am={}&cu={}&tn={}",
            urlencoding::encode(&self.payee_id),
            urlencoding::encode(&self.payee_name),
            self.amount,
            urlencoding::encode(&self.currency),
            urlencoding::encode(&self.memo),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_uri_escapes_payee_name() {
        let d = DepositDescriptor {
            request_id: 3,
            payee_id: "shop@bank".into(),
            payee_name: "Ledger Official".into(),
            amount: 250,
            currency: "INR".into(),
            memo: "LEDGER".into(),
        };
        assert_eq!(
            d.payment_uri(),
            "upi://pay?pa=shop%40bank&pn=Ledger%20Official&am=250&cu=INR&tn=LEDGER"
        );
    }
}
