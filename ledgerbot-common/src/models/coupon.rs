// File: ledgerbot-common/src/models/coupon.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of redeemable inventory. Rows sharing `(name, cost)` form a lot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct CouponLot {
    pub coupon_id: i64,
    pub name: String,
    pub code: String,
    pub cost: i64,
    pub stock: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a coupon row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewCoupon {
    pub name: String,
    pub code: String,
    pub cost: i64,
    pub stock: i32,
}

/// Identifies a lot for purchase and admin operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LotKey {
    pub name: String,
    pub cost: i64,
}

impl LotKey {
    pub fn new(name: impl Into<String>, cost: i64) -> Self {
        Self { name: name.into(), cost }
    }
}

/// Shop listing entry, aggregated over every active row of a lot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LotSummary {
    pub name: String,
    pub cost: i64,
    pub total_stock: i64,
    pub in_stock: bool,
    /// Opaque purchase token, present only while the lot has stock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
