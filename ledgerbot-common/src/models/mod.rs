// File: ledgerbot-common/src/models/mod.rs
pub mod account;
pub mod coupon;
pub mod request;
pub mod notification;
pub mod views;

/// Externally assigned chat user identifier.
pub type AccountId = i64;

pub use account::Account;
pub use coupon::{CouponLot, LotKey, LotSummary, NewCoupon};
pub use request::{Decision, Request, RequestKind, RequestStatus};
pub use notification::{Notification, NotificationAction};
