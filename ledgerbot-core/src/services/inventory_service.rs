// File: ledgerbot-core/src/services/inventory_service.rs

use std::sync::Arc;
use tracing::{info, warn};
use ledgerbot_common::models::{AccountId, CouponLot, LotKey, NewCoupon, Notification};
use ledgerbot_common::traits::repository_traits::{AccountRepository, CouponRepository};
use crate::engine::rules;
use crate::services::notification::NotificationDispatcher;
use crate::Error;

/// Admin inventory and balance maintenance.
pub struct InventoryService {
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    coupons: Arc<dyn CouponRepository + Send + Sync>,
    notifications: NotificationDispatcher,
}

impl InventoryService {
    pub fn new(
        accounts: Arc<dyn AccountRepository + Send + Sync>,
        coupons: Arc<dyn CouponRepository + Send + Sync>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self { accounts, coupons, notifications }
    }

    pub async fn add_single(&self, coupon: NewCoupon) -> Result<CouponLot, Error> {
        let name = coupon.name.trim();
        let code = coupon.code.trim();
        if name.is_empty() || code.is_empty() {
            return Err(Error::InvalidAmount("coupon name and code must not be empty".into()));
        }
        rules::validate_positive(coupon.cost)?;
        if coupon.stock < 0 {
            return Err(Error::InvalidAmount(format!("stock {} is negative", coupon.stock)));
        }
        let row = self
            .coupons
            .insert_coupon(&NewCoupon {
                name: name.to_string(),
                code: code.to_string(),
                cost: coupon.cost,
                stock: coupon.stock,
            })
            .await?;
        info!("Added coupon {} to lot '{}' at {}", row.coupon_id, row.name, row.cost);
        Ok(row)
    }

    /// One stock-1 row per code. Each insert stands alone; a failure part
    /// way through keeps the rows already added. Returns the number inserted.
    pub async fn add_bulk(&self, name: &str, cost: i64, codes: &[String]) -> Result<usize, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidAmount("coupon name must not be empty".into()));
        }
        rules::validate_positive(cost)?;

        let mut added = 0;
        for code in codes.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            let coupon = NewCoupon { name: name.to_string(), code: code.to_string(), cost, stock: 1 };
            match self.coupons.insert_coupon(&coupon).await {
                Ok(_) => added += 1,
                Err(e) => {
                    warn!("Bulk add to '{}' stopped after {} codes: {:?}", name, added, e);
                    return Err(e);
                }
            }
        }
        info!("Bulk added {} codes to lot '{}' at {}", added, name, cost);
        Ok(added)
    }

    pub async fn change_price(&self, name: &str, new_cost: i64) -> Result<u64, Error> {
        let new_cost = rules::validate_price(new_cost)?;
        let changed = self.coupons.change_price(name, new_cost).await?;
        info!("Repriced {} rows of '{}' to {}", changed, name, new_cost);
        Ok(changed)
    }

    pub async fn set_lot_active(&self, lot: &LotKey, active: bool) -> Result<u64, Error> {
        let changed = self.coupons.set_lot_active(lot, active).await?;
        info!("Lot '{}' at {} active={} ({} rows)", lot.name, lot.cost, active, changed);
        Ok(changed)
    }

    pub async fn purge_inactive(&self) -> Result<u64, Error> {
        let removed = self.coupons.purge_inactive().await?;
        info!("Purged {} inactive coupon rows", removed);
        Ok(removed)
    }

    pub async fn list_groups(&self) -> Result<Vec<LotKey>, Error> {
        self.coupons.list_groups().await
    }

    pub async fn clear_all(&self) -> Result<u64, Error> {
        let cleared = self.accounts.clear_all_balances().await?;
        warn!("Cleared balances of {} accounts", cleared);
        Ok(cleared)
    }

    pub async fn clear_user(&self, account_id: AccountId) -> Result<(), Error> {
        self.accounts.clear_balance(account_id).await?;
        warn!("Cleared balance of account {}", account_id);
        Ok(())
    }

    pub async fn gift(&self, account_id: AccountId, amount: i64) -> Result<i64, Error> {
        let amount = rules::validate_positive(amount)?;
        let account = self.accounts.credit(account_id, amount).await?;
        info!("Gifted {} to {} (balance {})", amount, account_id, account.balance);
        self.notifications.dispatch(
            account_id,
            Notification::text(format!("🎁 Admin gifted you {} points!", amount)),
        );
        Ok(account.balance)
    }
}
