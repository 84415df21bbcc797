//! Store-credit ledger entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use wholesale_core::{OrderId, UserId, WalletTransactionId, WalletTransactionKind};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: WalletTransactionId,
    pub user_id: UserId,
    pub kind: WalletTransactionKind,
    /// Always positive; `kind` gives the direction.
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub reason: String,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Amount with a sign: credits positive, debits negative.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            WalletTransactionKind::Credit => self.amount,
            WalletTransactionKind::Debit => -self.amount,
        }
    }
}
