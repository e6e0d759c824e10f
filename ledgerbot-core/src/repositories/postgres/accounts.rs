// File: ledgerbot-core/src/repositories/postgres/accounts.rs

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use ledgerbot_common::error::Error;
use ledgerbot_common::models::{Account, AccountId};
use ledgerbot_common::traits::repository_traits::{AccountRepository, AccountUpdate};
use super::credit_error;

const ACCOUNT_COLUMNS: &str =
    "account_id, balance, streak, last_claim_date, referred_by, created_at";

pub struct PostgresAccountRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresAccountRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn get_account(&self, account_id: AccountId) -> Result<Option<Account>, Error> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1"
        ))
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_or_create_account(&self, account_id: AccountId) -> Result<(Account, bool), Error> {
        let inserted = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (account_id)
            VALUES ($1)
            ON CONFLICT (account_id) DO NOTHING
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(acc) = inserted {
            debug!("Created account {}", account_id);
            return Ok((acc, true));
        }

        let existing = self
            .get_account(account_id)
            .await?
            .ok_or(Error::UserNotFound(account_id))?;
        Ok((existing, false))
    }

    async fn update_account(
        &self,
        account_id: AccountId,
        update: &AccountUpdate<'_>,
    ) -> Result<Account, Error> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1 FOR UPDATE"
        ))
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::UserNotFound(account_id))?;

        // An Err here drops `tx`, which rolls back.
        let next = update(&current)?;

        let saved = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET balance = $1,
                streak = $2,
                last_claim_date = $3
            WHERE account_id = $4
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
            .bind(next.balance)
            .bind(next.streak)
            .bind(next.last_claim_date)
            .bind(account_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn link_referral(
        &self,
        account_id: AccountId,
        referrer_id: AccountId,
        reward: i64,
    ) -> Result<bool, Error> {
        if account_id == referrer_id {
            return Ok(false);
        }
        let mut tx = self.pool.begin().await?;

        // Both rows, locked in ascending id order.
        let mut ids = vec![account_id, referrer_id];
        ids.sort_unstable();
        let rows = sqlx::query(
            r#"
            SELECT account_id, referred_by
            FROM accounts
            WHERE account_id = ANY($1)
            ORDER BY account_id
            FOR UPDATE
            "#,
        )
            .bind(&ids)
            .fetch_all(&mut *tx)
            .await?;

        let mut referrer_exists = false;
        let mut already_referred = true;
        for r in rows {
            let id: AccountId = r.try_get("account_id")?;
            let referred_by: Option<AccountId> = r.try_get("referred_by")?;
            if id == referrer_id {
                referrer_exists = true;
            }
            if id == account_id {
                already_referred = referred_by.is_some();
            }
        }
        if !referrer_exists || already_referred {
            return Ok(false);
        }

        sqlx::query("UPDATE accounts SET referred_by = $1 WHERE account_id = $2")
            .bind(referrer_id)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE account_id = $2")
            .bind(reward)
            .bind(referrer_id)
            .execute(&mut *tx)
            .await
            .map_err(credit_error(reward))?;

        tx.commit().await?;
        Ok(true)
    }

    async fn count_referrals(&self, referrer_id: AccountId) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE referred_by = $1")
            .bind(referrer_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn credit(&self, account_id: AccountId, amount: i64) -> Result<Account, Error> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE accounts
            SET balance = balance + $1
            WHERE account_id = $2
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
            .bind(amount)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(credit_error(amount))?;
        row.ok_or(Error::UserNotFound(account_id))
    }

    async fn clear_balance(&self, account_id: AccountId) -> Result<(), Error> {
        let done = sqlx::query("UPDATE accounts SET balance = 0 WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(Error::UserNotFound(account_id));
        }
        Ok(())
    }

    async fn clear_all_balances(&self) -> Result<u64, Error> {
        let done = sqlx::query("UPDATE accounts SET balance = 0 WHERE balance <> 0")
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}
