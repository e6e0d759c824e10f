// File: ledgerbot-core/src/engine/dialog.rs
//
// Multi-step conversations as an explicit state machine. Each state carries
// exactly the input gathered so far; `advance` is total over
// (state, text) and never touches a store.

use std::fmt;
use serde::{Deserialize, Serialize};
use ledgerbot_common::models::{AccountId, NewCoupon};
use crate::engine::rules::{self, RewardPolicy};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogState {
    // Deposit
    DepositAmount,
    DepositReference { request_id: i64, amount: i64 },

    // Admin: single coupon
    CouponName,
    CouponCode { name: String },
    CouponCost { name: String, code: String },
    CouponStock { name: String, code: String, cost: i64 },

    // Admin: bulk coupons
    BulkName,
    BulkCost { name: String },
    BulkCodes { name: String, cost: i64 },

    // Admin: balances and prices
    ClearUserId,
    NewPrice { name: String },
}

impl DialogState {
    /// States only the administrator may be in.
    pub fn is_admin(&self) -> bool {
        !matches!(self, DialogState::DepositAmount | DialogState::DepositReference { .. })
    }

    /// The question a user in this state is answering.
    pub fn prompt(&self) -> Prompt {
        match self {
            DialogState::DepositAmount => Prompt::DepositAmount,
            DialogState::DepositReference { amount, .. } => Prompt::DepositReference { amount: *amount },
            DialogState::CouponName => Prompt::CouponName,
            DialogState::CouponCode { .. } => Prompt::CouponCode,
            DialogState::CouponCost { .. } => Prompt::CouponCost,
            DialogState::CouponStock { .. } => Prompt::CouponStock,
            DialogState::BulkName => Prompt::BulkName,
            DialogState::BulkCost { name } => Prompt::BulkCost { name: name.clone() },
            DialogState::BulkCodes { name, cost } => Prompt::BulkCodes { name: name.clone(), cost: *cost },
            DialogState::ClearUserId => Prompt::ClearUserId,
            DialogState::NewPrice { name } => Prompt::NewPrice { name: name.clone() },
        }
    }
}

/// What to ask the user next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prompt {
    DepositAmount,
    InvalidDepositAmount,
    DepositReference { amount: i64 },
    InvalidReference { min_len: usize },
    CouponName,
    CouponCode,
    CouponCost,
    CouponStock,
    InvalidCost,
    InvalidStock,
    BulkName,
    BulkCost { name: String },
    BulkCodes { name: String, cost: i64 },
    NoCodes,
    ClearUserId,
    InvalidUserId,
    NewPrice { name: String },
    InvalidPrice,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::DepositAmount => write!(f, "💳 Enter amount:"),
            Prompt::InvalidDepositAmount => write!(f, "❌ Invalid amount. Enter a whole number above zero:"),
            Prompt::DepositReference { amount } => write!(
                f,
                "Pay {} and send the transaction reference (UTR) below:",
                amount
            ),
            Prompt::InvalidReference { min_len } => write!(
                f,
                "❌ Invalid reference. Send the transaction ID (at least {} characters):",
                min_len
            ),
            Prompt::CouponName => write!(f, "Enter coupon NAME:"),
            Prompt::CouponCode => write!(f, "Enter coupon CODE:"),
            Prompt::CouponCost => write!(f, "Enter cost:"),
            Prompt::CouponStock => write!(f, "Enter stock:"),
            Prompt::InvalidCost => write!(f, "❌ Invalid cost. Enter a whole number above zero:"),
            Prompt::InvalidStock => write!(f, "❌ Invalid stock. Enter a whole number:"),
            Prompt::BulkName => write!(f, "Enter the NAME for new bulk coupons:"),
            Prompt::BulkCost { name } => write!(f, "Name set to: {}\nEnter cost for these coupons:", name),
            Prompt::BulkCodes { name, cost } => write!(
                f,
                "Adding codes for: {}\nCost: {}\n\nSend the CODES (one per line):",
                name, cost
            ),
            Prompt::NoCodes => write!(f, "❌ No codes found. Send the CODES (one per line):"),
            Prompt::ClearUserId => write!(f, "👤 Enter the User ID to clear balance:"),
            Prompt::InvalidUserId => write!(f, "❌ Invalid User ID. Enter numeric ID:"),
            Prompt::NewPrice { name } => write!(f, "Changing price for: {}\nEnter the NEW price:", name),
            Prompt::InvalidPrice => write!(f, "❌ Invalid price. Enter numeric value:"),
        }
    }
}

/// Work to commit once a dialog has gathered everything it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogEffect {
    InitDeposit { amount: i64 },
    SubmitReference { request_id: i64, reference: String },
    AddCoupon(NewCoupon),
    AddBulk { name: String, cost: i64, codes: Vec<String> },
    ClearUser(AccountId),
    ChangePrice { name: String, cost: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Move to the next state and ask its question.
    Advance(DialogState),
    /// Input rejected; stay put and ask again.
    Retry(Prompt),
    /// Input complete; run the effect and end the dialog.
    Commit(DialogEffect),
}

/// Next step for `state` given the user's `input`.
pub fn advance(state: &DialogState, input: &str, policy: &RewardPolicy) -> Transition {
    let text = input.trim();
    match state {
        DialogState::DepositAmount => match rules::parse_positive_amount(text) {
            Ok(amount) => Transition::Commit(DialogEffect::InitDeposit { amount }),
            Err(_) => Transition::Retry(Prompt::InvalidDepositAmount),
        },
        DialogState::DepositReference { request_id, .. } => {
            match rules::validate_reference(text, policy.min_reference_len) {
                Ok(reference) => Transition::Commit(DialogEffect::SubmitReference {
                    request_id: *request_id,
                    reference,
                }),
                Err(_) => Transition::Retry(Prompt::InvalidReference { min_len: policy.min_reference_len }),
            }
        }

        DialogState::CouponName => match non_empty(text) {
            Some(name) => Transition::Advance(DialogState::CouponCode { name }),
            None => Transition::Retry(Prompt::CouponName),
        },
        DialogState::CouponCode { name } => match non_empty(text) {
            Some(code) => Transition::Advance(DialogState::CouponCost { name: name.clone(), code }),
            None => Transition::Retry(Prompt::CouponCode),
        },
        DialogState::CouponCost { name, code } => match rules::parse_positive_amount(text) {
            Ok(cost) => Transition::Advance(DialogState::CouponStock {
                name: name.clone(),
                code: code.clone(),
                cost,
            }),
            Err(_) => Transition::Retry(Prompt::InvalidCost),
        },
        DialogState::CouponStock { name, code, cost } => match rules::parse_stock(text) {
            Ok(stock) => Transition::Commit(DialogEffect::AddCoupon(NewCoupon {
                name: name.clone(),
                code: code.clone(),
                cost: *cost,
                stock,
            })),
            Err(_) => Transition::Retry(Prompt::InvalidStock),
        },

        DialogState::BulkName => match non_empty(text) {
            Some(name) => Transition::Advance(DialogState::BulkCost { name }),
            None => Transition::Retry(Prompt::BulkName),
        },
        DialogState::BulkCost { name } => match rules::parse_positive_amount(text) {
            Ok(cost) => Transition::Advance(DialogState::BulkCodes { name: name.clone(), cost }),
            Err(_) => Transition::Retry(Prompt::InvalidCost),
        },
        DialogState::BulkCodes { name, cost } => {
            let codes = rules::parse_code_list(input);
            if codes.is_empty() {
                Transition::Retry(Prompt::NoCodes)
            } else {
                Transition::Commit(DialogEffect::AddBulk { name: name.clone(), cost: *cost, codes })
            }
        }

        DialogState::ClearUserId => match rules::parse_account_id(text) {
            Some(id) => Transition::Commit(DialogEffect::ClearUser(id)),
            None => Transition::Retry(Prompt::InvalidUserId),
        },
        DialogState::NewPrice { name } => match rules::parse_price(text) {
            Ok(cost) => Transition::Commit(DialogEffect::ChangePrice { name: name.clone(), cost }),
            Err(_) => Transition::Retry(Prompt::InvalidPrice),
        },
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() { None } else { Some(text.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RewardPolicy {
        RewardPolicy::default()
    }

    #[test]
    fn test_deposit_amount_commits_or_retries() {
        assert_eq!(
            advance(&DialogState::DepositAmount, "250", &policy()),
            Transition::Commit(DialogEffect::InitDeposit { amount: 250 })
        );
        assert_eq!(
            advance(&DialogState::DepositAmount, "zero", &policy()),
            Transition::Retry(Prompt::InvalidDepositAmount)
        );
        assert_eq!(
            advance(&DialogState::DepositAmount, "0", &policy()),
            Transition::Retry(Prompt::InvalidDepositAmount)
        );
    }

    #[test]
    fn test_reference_length_enforced() {
        let state = DialogState::DepositReference { request_id: 9, amount: 100 };
        assert_eq!(
            advance(&state, "12345", &policy()),
            Transition::Retry(Prompt::InvalidReference { min_len: 6 })
        );
        assert_eq!(
            advance(&state, " 123456789012 ", &policy()),
            Transition::Commit(DialogEffect::SubmitReference {
                request_id: 9,
                reference: "123456789012".into()
            })
        );
    }

    #[test]
    fn test_single_coupon_walkthrough() {
        let p = policy();
        let s1 = match advance(&DialogState::CouponName, "VIP", &p) {
            Transition::Advance(s) => s,
            other => panic!("unexpected {:?}", other),
        };
        let s2 = match advance(&s1, "CODE-1", &p) {
            Transition::Advance(s) => s,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(advance(&s2, "abc", &p), Transition::Retry(Prompt::InvalidCost));
        let s3 = match advance(&s2, "50", &p) {
            Transition::Advance(s) => s,
            other => panic!("unexpected {:?}", other),
        };
        match advance(&s3, "1", &p) {
            Transition::Commit(DialogEffect::AddCoupon(c)) => {
                assert_eq!((c.name.as_str(), c.code.as_str(), c.cost, c.stock), ("VIP", "CODE-1", 50, 1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bulk_codes_need_at_least_one_line() {
        let state = DialogState::BulkCodes { name: "Gift".into(), cost: 20 };
        assert_eq!(advance(&state, "\n  \n", &policy()), Transition::Retry(Prompt::NoCodes));
        assert_eq!(
            advance(&state, "A1\nB2\n", &policy()),
            Transition::Commit(DialogEffect::AddBulk {
                name: "Gift".into(),
                cost: 20,
                codes: vec!["A1".into(), "B2".into()],
            })
        );
    }

    #[test]
    fn test_price_allows_zero_but_not_negative() {
        let state = DialogState::NewPrice { name: "VIP".into() };
        assert_eq!(
            advance(&state, "0", &policy()),
            Transition::Commit(DialogEffect::ChangePrice { name: "VIP".into(), cost: 0 })
        );
        assert_eq!(advance(&state, "-4", &policy()), Transition::Retry(Prompt::InvalidPrice));
    }

    #[test]
    fn test_admin_flag() {
        assert!(!DialogState::DepositAmount.is_admin());
        assert!(DialogState::ClearUserId.is_admin());
        assert!(DialogState::BulkName.is_admin());
    }
}
