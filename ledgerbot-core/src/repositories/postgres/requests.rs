// File: ledgerbot-core/src/repositories/postgres/requests.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use ledgerbot_common::error::Error;
use ledgerbot_common::models::{Account, AccountId, Decision, Request, RequestKind, RequestStatus};
use ledgerbot_common::traits::repository_traits::{EscrowCheck, RequestRepository};
use super::credit_error;

pub struct PostgresRequestRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRequestRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn table(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Withdrawal => "withdrawals",
        RequestKind::Deposit => "deposits",
    }
}

/// Withdrawals have no reference column.
fn columns(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Withdrawal => {
            "request_id, account_id, amount, status, NULL::TEXT AS reference, created_at, resolved_at"
        }
        RequestKind::Deposit => {
            "request_id, account_id, amount, status, reference, created_at, resolved_at"
        }
    }
}

fn row_to_request(kind: RequestKind, r: &PgRow) -> Result<Request, Error> {
    let status: String = r.try_get("status")?;
    Ok(Request {
        request_id: r.try_get("request_id")?,
        kind,
        requester: r.try_get("account_id")?,
        amount: r.try_get("amount")?,
        status: status.parse::<RequestStatus>()?,
        reference: r.try_get("reference")?,
        created_at: r.try_get::<DateTime<Utc>, _>("created_at")?,
        resolved_at: r.try_get::<Option<DateTime<Utc>>, _>("resolved_at")?,
    })
}

#[async_trait]
impl RequestRepository for PostgresRequestRepository {
    async fn open_withdrawal(
        &self,
        account_id: AccountId,
        check: &EscrowCheck<'_>,
    ) -> Result<Request, Error> {
        let mut tx = self.pool.begin().await?;

        let requester = sqlx::query_as::<_, Account>(
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

        let amount = check(&requester)?;

        sqlx::query("UPDATE accounts SET balance = balance - $1 WHERE account_id = $2")
            .bind(amount)
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!(
            "INSERT INTO withdrawals (account_id, amount) VALUES ($1, $2) RETURNING {}",
            columns(RequestKind::Withdrawal)
        ))
            .bind(account_id)
            .bind(amount)
            .fetch_one(&mut *tx)
            .await?;
        let request = row_to_request(RequestKind::Withdrawal, &row)?;

        tx.commit().await?;
        info!("Withdrawal {} opened: account={} amount={}", request.request_id, account_id, amount);
        Ok(request)
    }

    async fn create_deposit(&self, account_id: AccountId, amount: i64) -> Result<Request, Error> {
        let row = sqlx::query(&format!(
            "INSERT INTO deposits (account_id, amount) VALUES ($1, $2) RETURNING {}",
            columns(RequestKind::Deposit)
        ))
            .bind(account_id)
            .bind(amount)
            .fetch_one(&self.pool)
            .await?;
        row_to_request(RequestKind::Deposit, &row)
    }

    async fn attach_reference(&self, request_id: i64, reference: &str) -> Result<Request, Error> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE deposits
            SET reference = $1
            WHERE request_id = $2 AND status = 'pending'
            RETURNING {}
            "#,
            columns(RequestKind::Deposit)
        ))
            .bind(reference)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => row_to_request(RequestKind::Deposit, &r),
            None => {
                let status = self
                    .get_request(RequestKind::Deposit, request_id)
                    .await?
                    .map(|r| r.status);
                Err(Error::InvalidRequestState { kind: RequestKind::Deposit, request_id, status })
            }
        }
    }

    async fn get_request(&self, kind: RequestKind, request_id: i64) -> Result<Option<Request>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE request_id = $1",
            columns(kind),
            table(kind)
        ))
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| row_to_request(kind, &r)).transpose()
    }

    async fn resolve_request(
        &self,
        kind: RequestKind,
        request_id: i64,
        decision: Decision,
    ) -> Result<Request, Error> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM {} WHERE request_id = $1 FOR UPDATE",
            columns(kind),
            table(kind)
        ))
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await?;
        let current = match row {
            Some(r) => row_to_request(kind, &r)?,
            None => return Err(Error::InvalidRequestState { kind, request_id, status: None }),
        };
        if current.status.is_terminal() {
            return Err(Error::InvalidRequestState { kind, request_id, status: Some(current.status) });
        }

        let effect = decision.balance_effect(kind, current.amount);
        if effect != 0 {
            sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE account_id = $2")
                .bind(effect)
                .bind(current.requester)
                .execute(&mut *tx)
                .await
                .map_err(credit_error(effect))?;
        }

        let row = sqlx::query(&format!(
            r#"
            UPDATE {}
            SET status = $1, resolved_at = now()
            WHERE request_id = $2
            RETURNING {}
            "#,
            table(kind),
            columns(kind)
        ))
            .bind(decision.target_status().as_str())
            .bind(request_id)
            .fetch_one(&mut *tx)
            .await?;
        let resolved = row_to_request(kind, &row)?;

        tx.commit().await?;
        Ok(resolved)
    }

    async fn list_pending(&self, kind: RequestKind, limit: i64) -> Result<Vec<Request>, Error> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM {}
            WHERE status = 'pending'
            ORDER BY request_id ASC
            LIMIT $1
            "#,
            columns(kind),
            table(kind)
        ))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut list = Vec::new();
        for r in rows {
            list.push(row_to_request(kind, &r)?);
        }
        Ok(list)
    }
}
