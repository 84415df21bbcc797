//! Order repository.
//!
//! Placing and cancelling orders touch stock, coupons, the wallet and the
//! cart; each runs as a single transaction.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use wholesale_core::{
    CouponId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId,
};

use super::{RepositoryError, wallet};
use crate::models::{Order, OrderItem, ShippingAddress};

pub(crate) const ORDER_COLUMNS: &str = "id, order_number, user_id, items, shipping_address, \
                                        subtotal, discount, shipping_fee, wallet_used, total, \
                                        coupon_code, payment_method, payment_status, status, \
                                        razorpay_order_id, invoice_number, waybill, \
                                        shipment_status, created_at, updated_at";

/// Everything needed to insert an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub wallet_used: Decimal,
    pub total: Decimal,
    pub coupon: Option<(CouponId, String)>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
}

pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order: reserve stock, redeem the coupon, debit the wallet,
    /// insert the order and empty the cart.
    ///
    /// Orders that start out confirmed (cash on delivery, or fully paid from
    /// the wallet) get their invoice number here.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if stock, coupon usage or wallet
    /// balance ran out since the cart was priced.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn place(&self, new: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for item in &new.items {
            take_stock(&mut tx, item).await?;
        }

        if let Some((coupon_id, _)) = &new.coupon {
            let redeemed = sqlx::query(
                "UPDATE coupons SET used_count = used_count + 1
                 WHERE id = $1 AND is_active
                   AND (usage_limit IS NULL OR used_count < usage_limit)",
            )
            .bind(coupon_id)
            .execute(&mut *tx)
            .await?;
            if redeemed.rows_affected() == 0 {
                return Err(RepositoryError::Conflict(
                    "coupon is no longer available".to_owned(),
                ));
            }
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (order_number, user_id, items, shipping_address, subtotal,
                                 discount, shipping_fee, wallet_used, total, coupon_code,
                                 payment_method, payment_status, status, invoice_number)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                     CASE WHEN $13 <> 'pending'::order_status
                          THEN 'INV-' || to_char(NOW(), 'YYYY') || '-'
                               || lpad(nextval('invoice_number_seq')::text, 6, '0')
                     END)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(&new.order_number)
        .bind(new.user_id)
        .bind(Json(&new.items))
        .bind(Json(&new.shipping_address))
        .bind(new.subtotal)
        .bind(new.discount)
        .bind(new.shipping_fee)
        .bind(new.wallet_used)
        .bind(new.total)
        .bind(new.coupon.as_ref().map(|(_, code)| code.as_str()))
        .bind(new.payment_method)
        .bind(new.payment_status)
        .bind(new.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::unique(e, "order number already exists"))?;

        if new.wallet_used > Decimal::ZERO {
            let reason = format!("Used on order {}", order.order_number);
            wallet::debit_in(&mut tx, new.user_id, new.wallet_used, &reason, Some(order.id))
                .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(new.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_razorpay_order_id(
        &self,
        razorpay_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE razorpay_order_id = $1"
        ))
        .bind(razorpay_order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// A user's orders, newest first, plus their total count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool)
            .await?;

        Ok((orders, total))
    }

    /// All orders, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Order>, i64), RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE $1::order_status IS NULL OR status = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE $1::order_status IS NULL OR status = $1",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_razorpay_order_id(
        &self,
        id: OrderId,
        razorpay_order_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET razorpay_order_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(razorpay_order_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Move an order from `from` to `to`. Fails if the order changed meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order is no longer in `from`.
    pub async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $3, updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("order status changed".to_owned()))
    }

    /// Cancel an order: restore stock and refund `refund` to the wallet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order can no longer be
    /// cancelled.
    pub async fn cancel(&self, order: &Order, refund: Decimal) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let cancelled = sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET
                status = 'cancelled',
                payment_status = CASE
                    WHEN payment_status = 'completed' OR wallet_used > 0 THEN 'refunded'::payment_status
                    ELSE payment_status
                END,
                updated_at = NOW()
             WHERE id = $1 AND status IN ('pending', 'confirmed', 'processing')
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::Conflict("order can no longer be cancelled".to_owned()))?;

        for item in &order.items {
            return_stock(&mut tx, item).await?;
        }

        if refund > Decimal::ZERO {
            let reason = format!("Refund for cancelled order {}", order.order_number);
            wallet::credit_in(&mut tx, order.user_id, refund, &reason, Some(order.id)).await?;
        }

        tx.commit().await?;
        Ok(cancelled)
    }
}

/// Decrement stock for one order line, failing if not enough is left.
async fn take_stock(conn: &mut PgConnection, item: &OrderItem) -> Result<(), RepositoryError> {
    let result = match variant_position(item)? {
        Some(index) => {
            sqlx::query(
                "UPDATE products SET
                    variants = jsonb_set(variants, ARRAY[$2::text, 'stock'],
                                         to_jsonb((variants -> $2 ->> 'stock')::int - $3)),
                    updated_at = NOW()
                 WHERE id = $1 AND (variants -> $2 ->> 'stock')::int >= $3",
            )
            .bind(item.product_id)
            .bind(index)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?
        }
        None => {
            sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = NOW()
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(item.product_id)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        return Err(RepositoryError::Conflict(format!(
            "insufficient stock for {}",
            item.name
        )));
    }
    Ok(())
}

async fn return_stock(conn: &mut PgConnection, item: &OrderItem) -> Result<(), RepositoryError> {
    match variant_position(item)? {
        Some(index) => {
            sqlx::query(
                "UPDATE products SET
                    variants = jsonb_set(variants, ARRAY[$2::text, 'stock'],
                                         to_jsonb(COALESCE((variants -> $2 ->> 'stock')::int, 0) + $3)),
                    updated_at = NOW()
                 WHERE id = $1 AND jsonb_array_length(variants) > $2",
            )
            .bind(item.product_id)
            .bind(index)
            .bind(item.quantity)
            .execute(&mut *conn)
            .await?;
        }
        None => {
            sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
                .bind(item.product_id)
                .bind(item.quantity)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

fn variant_position(item: &OrderItem) -> Result<Option<i32>, RepositoryError> {
    item.variant_index
        .map(|i| {
            i32::try_from(i).map_err(|_| {
                RepositoryError::DataCorruption(format!("variant index {i} out of range"))
            })
        })
        .transpose()
}
