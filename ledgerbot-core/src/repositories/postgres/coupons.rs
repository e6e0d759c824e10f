// File: ledgerbot-core/src/repositories/postgres/coupons.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use ledgerbot_common::error::Error;
use ledgerbot_common::models::{Account, AccountId, CouponLot, LotKey, LotSummary, NewCoupon};
use ledgerbot_common::traits::repository_traits::CouponRepository;
use crate::engine::rules;

const COUPON_COLUMNS: &str = "coupon_id, name, code, cost, stock, active, created_at";

pub struct PostgresCouponRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresCouponRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CouponRepository for PostgresCouponRepository {
    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<CouponLot, Error> {
        let row = sqlx::query_as::<_, CouponLot>(&format!(
            r#"
            INSERT INTO coupons (name, code, cost, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING {COUPON_COLUMNS}
            "#
        ))
            .bind(&coupon.name)
            .bind(&coupon.code)
            .bind(coupon.cost)
            .bind(coupon.stock)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_coupon(&self, coupon_id: i64) -> Result<Option<CouponLot>, Error> {
        let row = sqlx::query_as::<_, CouponLot>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE coupon_id = $1"
        ))
            .bind(coupon_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_shop(&self) -> Result<Vec<LotSummary>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT name, cost, COALESCE(SUM(stock), 0)::BIGINT AS total_stock
            FROM coupons
            WHERE active
            GROUP BY name, cost
            ORDER BY name ASC, cost ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        let mut list = Vec::new();
        for r in rows {
            let total_stock: i64 = r.try_get("total_stock")?;
            list.push(LotSummary {
                name: r.try_get("name")?,
                cost: r.try_get("cost")?,
                total_stock,
                in_stock: total_stock > 0,
                token: None,
            });
        }
        Ok(list)
    }

    async fn list_groups(&self) -> Result<Vec<LotKey>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT name, cost
            FROM coupons
            ORDER BY name ASC, cost ASC
            "#,
        )
            .fetch_all(&self.pool)
            .await?;

        let mut list = Vec::new();
        for r in rows {
            list.push(LotKey {
                name: r.try_get("name")?,
                cost: r.try_get("cost")?,
            });
        }
        Ok(list)
    }

    async fn purchase(&self, account_id: AccountId, lot: &LotKey) -> Result<(CouponLot, Account), Error> {
        let mut tx = self.pool.begin().await?;

        let buyer = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, balance, streak, last_claim_date, referred_by, created_at
            FROM accounts
            WHERE account_id = $1
            FOR UPDATE
            "#,
        )
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::UserNotFound(account_id))?;

        rules::ensure_affordable(&buyer, lot.cost)?;

        // Rows held by a concurrent buyer are skipped.
        let picked = sqlx::query_as::<_, CouponLot>(&format!(
            r#"
            SELECT {COUPON_COLUMNS}
            FROM coupons
            WHERE name = $1 AND cost = $2 AND active AND stock > 0
            ORDER BY coupon_id ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#
        ))
            .bind(&lot.name)
            .bind(lot.cost)
            .fetch_optional(&mut *tx)
            .await?;

        let picked = match picked {
            Some(c) => c,
            None => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM coupons WHERE name = $1 AND cost = $2 AND active)",
                )
                    .bind(&lot.name)
                    .bind(lot.cost)
                    .fetch_one(&mut *tx)
                    .await?;
                return Err(if exists { Error::OutOfStock } else { Error::ItemUnavailable });
            }
        };

        let consumed = sqlx::query_as::<_, CouponLot>(&format!(
            r#"
            UPDATE coupons
            SET stock = stock - 1
            WHERE coupon_id = $1
            RETURNING {COUPON_COLUMNS}
            "#
        ))
            .bind(picked.coupon_id)
            .fetch_one(&mut *tx)
            .await?;

        let buyer = sqlx::query_as::<_, Account>(
            r#"
            UPDATE accounts
            SET balance = balance - $1
            WHERE account_id = $2
            RETURNING account_id, balance, streak, last_claim_date, referred_by, created_at
            "#,
        )
            .bind(lot.cost)
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((consumed, buyer))
    }

    async fn change_price(&self, name: &str, new_cost: i64) -> Result<u64, Error> {
        let done = sqlx::query("UPDATE coupons SET cost = $1 WHERE name = $2")
            .bind(new_cost)
            .bind(name)
            .execute(&self.pool)
            .await?;
        debug!("Repriced {} coupon row(s) named '{}' to {}", done.rows_affected(), name, new_cost);
        Ok(done.rows_affected())
    }

    async fn set_lot_active(&self, lot: &LotKey, active: bool) -> Result<u64, Error> {
        let done = sqlx::query("UPDATE coupons SET active = $1 WHERE name = $2 AND cost = $3")
            .bind(active)
            .bind(&lot.name)
            .bind(lot.cost)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }

    async fn purge_inactive(&self) -> Result<u64, Error> {
        let done = sqlx::query("DELETE FROM coupons WHERE NOT active")
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}
