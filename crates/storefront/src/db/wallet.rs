//! Wallet (store credit) repository.
//!
//! The balance lives on `users.wallet_balance`; every change also writes a
//! `wallet_transactions` row carrying the balance after the change. The
//! `*_in` functions run inside a caller's transaction so checkout and
//! cancellation can move money atomically with the order.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use wholesale_core::{OrderId, UserId, WalletTransactionKind};

use super::RepositoryError;
use crate::models::WalletTransaction;

const WALLET_COLUMNS: &str = "id, user_id, kind, amount, balance_after, reason, order_id, created_at";

pub struct WalletRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WalletRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current balance and the latest `limit` transactions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn summary(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<(Decimal, Vec<WalletTransaction>), RepositoryError> {
        let balance: Decimal = sqlx::query_scalar("SELECT wallet_balance FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let transactions = sqlx::query_as::<_, WalletTransaction>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallet_transactions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok((balance, transactions))
    }

    /// Credit a wallet outside any other transaction (admin adjustment).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn credit(
        &self,
        user_id: UserId,
        amount: Decimal,
        reason: &str,
    ) -> Result<WalletTransaction, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let entry = credit_in(&mut tx, user_id, amount, reason, None).await?;
        tx.commit().await?;
        Ok(entry)
    }
}

/// Add `amount` to a wallet inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the user does not exist.
pub async fn credit_in(
    conn: &mut PgConnection,
    user_id: UserId,
    amount: Decimal,
    reason: &str,
    order_id: Option<OrderId>,
) -> Result<WalletTransaction, RepositoryError> {
    let balance: Decimal = sqlx::query_scalar(
        "UPDATE users SET wallet_balance = wallet_balance + $2, updated_at = NOW()
         WHERE id = $1
         RETURNING wallet_balance",
    )
    .bind(user_id)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;

    record(conn, user_id, WalletTransactionKind::Credit, amount, balance, reason, order_id).await
}

/// Take `amount` from a wallet inside an open transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the balance is insufficient.
pub async fn debit_in(
    conn: &mut PgConnection,
    user_id: UserId,
    amount: Decimal,
    reason: &str,
    order_id: Option<OrderId>,
) -> Result<WalletTransaction, RepositoryError> {
    let balance: Decimal = sqlx::query_scalar(
        "UPDATE users SET wallet_balance = wallet_balance - $2, updated_at = NOW()
         WHERE id = $1 AND wallet_balance >= $2
         RETURNING wallet_balance",
    )
    .bind(user_id)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| RepositoryError::Conflict("insufficient wallet balance".to_owned()))?;

    record(conn, user_id, WalletTransactionKind::Debit, amount, balance, reason, order_id).await
}

async fn record(
    conn: &mut PgConnection,
    user_id: UserId,
    kind: WalletTransactionKind,
    amount: Decimal,
    balance_after: Decimal,
    reason: &str,
    order_id: Option<OrderId>,
) -> Result<WalletTransaction, RepositoryError> {
    let entry = sqlx::query_as::<_, WalletTransaction>(&format!(
        "INSERT INTO wallet_transactions (user_id, kind, amount, balance_after, reason, order_id)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {WALLET_COLUMNS}"
    ))
    .bind(user_id)
    .bind(kind)
    .bind(amount)
    .bind(balance_after)
    .bind(reason)
    .bind(order_id)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}
