// ledgerbot-core/src/repositories/postgres/mod.rs

use ledgerbot_common::error::Error;

pub mod accounts;
pub mod coupons;
pub mod requests;

pub use accounts::PostgresAccountRepository;
pub use coupons::PostgresCouponRepository;
pub use requests::PostgresRequestRepository;

/// Maps Postgres `numeric_value_out_of_range` on a balance credit to the
/// same error the in-memory store reports.
pub(crate) fn credit_error(amount: i64) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| {
        let out_of_range = matches!(
            &e,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("22003")
        );
        if out_of_range {
            Error::InvalidAmount(format!("crediting {} would overflow the balance", amount))
        } else {
            Error::Database(e)
        }
    }
}
