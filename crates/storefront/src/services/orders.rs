//! Checkout and order cancellation.

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use wholesale_core::{AddressId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, UserId};

use super::pricing;
use crate::db::orders::NewOrder;
use crate::db::{
    AddressRepository, CartRepository, CouponRepository, OrderRepository, ProductRepository,
    RepositoryError, ShipmentRepository, UserRepository,
};
use crate::delhivery::{DelhiveryClient, DelhiveryError};
use crate::models::coupon::CouponRejection;
use crate::models::{CartLine, CurrentUser, Order, OrderItem, Product, ShippingAddress};

/// Orders at or above this subtotal ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// Flat shipping fee below the threshold.
pub const SHIPPING_FEE: Decimal = Decimal::from_parts(150, 0, 0, false, 0);

/// Checkout payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub use_wallet: bool,
}

/// Errors from checkout and cancellation.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Your cart is empty")]
    EmptyCart,

    /// A cart line cannot be ordered as is.
    #[error("{0}")]
    CartProblem(String),

    #[error("Address not found")]
    AddressNotFound,

    #[error("Order not found")]
    NotFound,

    #[error("{0}")]
    Coupon(#[from] CouponRejection),

    #[error("Delivery is not available to pincode {0}")]
    NotServiceable(String),

    #[error("Cash on delivery is not available for pincode {0}")]
    CodUnavailable(String),

    #[error("Orders that are {0} cannot be cancelled")]
    NotCancellable(OrderStatus),

    #[error("courier error: {0}")]
    Delhivery(#[from] DelhiveryError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Shipping fee for a subtotal.
#[must_use]
pub fn shipping_fee_for(subtotal: Decimal) -> Decimal {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        SHIPPING_FEE
    }
}

/// Money breakdown of a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_fee: Decimal,
    pub wallet_used: Decimal,
    /// Left to pay through the chosen method.
    pub total: Decimal,
}

impl Totals {
    /// Compute totals, drawing on up to `wallet_balance` when it is positive.
    #[must_use]
    pub fn compute(subtotal: Decimal, discount: Decimal, wallet_balance: Decimal) -> Self {
        let discount = discount.min(subtotal);
        let shipping_fee = shipping_fee_for(subtotal);
        let payable = subtotal - discount + shipping_fee;
        let wallet_used = wallet_balance.max(Decimal::ZERO).min(payable);
        Self {
            subtotal,
            discount,
            shipping_fee,
            wallet_used,
            total: payable - wallet_used,
        }
    }

    /// Initial payment and order status for a method.
    #[must_use]
    pub fn initial_status(&self, method: PaymentMethod) -> (PaymentStatus, OrderStatus) {
        if self.total.is_zero() {
            (PaymentStatus::Completed, OrderStatus::Confirmed)
        } else {
            match method {
                PaymentMethod::Cod => (PaymentStatus::Pending, OrderStatus::Confirmed),
                PaymentMethod::Razorpay => (PaymentStatus::Pending, OrderStatus::Pending),
            }
        }
    }
}

/// `WH` + `YYMMDD` + six random uppercase alphanumerics.
#[must_use]
pub fn generate_order_number() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("WH{}{suffix}", Utc::now().format("%y%m%d"))
}

fn order_item(line: &CartLine, product: &Product) -> OrderItem {
    let variant = product.variant(line.variant_index);
    OrderItem {
        product_id: line.product_id,
        variant_index: line.variant_index,
        name: line.name.clone(),
        variant_name: line.variant_name.clone(),
        sku: variant.and_then(|v| v.sku.clone()),
        hsn_code: product.hsn_code.clone(),
        gst_rate: product.gst_rate,
        unit_price: line.unit_price,
        quantity: line.quantity,
        line_total: line.line_total,
        weight_grams: product.weight_grams,
        image: line.image.clone(),
    }
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
    delhivery: &'a DelhiveryClient,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, delhivery: &'a DelhiveryClient) -> Self {
        Self { pool, delhivery }
    }

    /// Turn the user's cart into an order.
    ///
    /// # Errors
    ///
    /// Returns an `OrderError` naming what blocks the checkout; stock, coupon
    /// or wallet races surface as `RepositoryError::Conflict`.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: &CheckoutRequest,
    ) -> Result<Order, OrderError> {
        let items = CartRepository::new(self.pool).list(user_id).await?;
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let mut ids: Vec<_> = items.iter().map(|i| i.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;
        let cart = pricing::price_cart(&items, &products);

        if !cart.is_orderable() {
            let problem = cart.items.iter().find_map(|line| {
                line.problem
                    .as_ref()
                    .map(|p| OrderError::CartProblem(format!("{}: {p}", line.name)))
            });
            return Err(problem.unwrap_or(OrderError::EmptyCart));
        }

        let address = AddressRepository::new(self.pool)
            .get(user_id, request.address_id)
            .await?
            .ok_or(OrderError::AddressNotFound)?;

        let pincode = address.pincode.to_string();
        let serviceability = self.delhivery.check_pincode(&pincode).await?;
        if !serviceability.serviceable {
            return Err(OrderError::NotServiceable(pincode));
        }
        if !serviceability.accepts(request.payment_method) {
            return Err(match request.payment_method {
                PaymentMethod::Cod => OrderError::CodUnavailable(pincode),
                PaymentMethod::Razorpay => OrderError::NotServiceable(pincode),
            });
        }

        let coupon = match request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => Some(
                CouponRepository::new(self.pool)
                    .get_by_code(code)
                    .await?
                    .ok_or(CouponRejection::Unknown)?,
            ),
            None => None,
        };
        let discount = match &coupon {
            Some(c) => c.discount_for(cart.subtotal, Utc::now())?,
            None => Decimal::ZERO,
        };

        let wallet_balance = if request.use_wallet {
            UserRepository::new(self.pool)
                .get_by_id(user_id)
                .await?
                .map_or(Decimal::ZERO, |u| u.wallet_balance)
        } else {
            Decimal::ZERO
        };

        let totals = Totals::compute(cart.subtotal, discount, wallet_balance);
        let (payment_status, status) = totals.initial_status(request.payment_method);

        let order_items = cart
            .items
            .iter()
            .filter_map(|line| {
                products
                    .iter()
                    .find(|p| p.id == line.product_id)
                    .map(|p| order_item(line, p))
            })
            .collect();

        let new = NewOrder {
            order_number: generate_order_number(),
            user_id,
            items: order_items,
            shipping_address: ShippingAddress::from(&address),
            subtotal: totals.subtotal,
            discount: totals.discount,
            shipping_fee: totals.shipping_fee,
            wallet_used: totals.wallet_used,
            total: totals.total,
            coupon: coupon.map(|c| (c.id, c.code)),
            payment_method: request.payment_method,
            payment_status,
            status,
        };

        let order = OrderRepository::new(self.pool).place(&new).await?;
        info!(
            order_number = %order.order_number,
            total = %order.total,
            method = %order.payment_method,
            "Order placed"
        );
        Ok(order)
    }

    /// An order visible to `user`: their own, or any order for admins.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to someone else.
    pub async fn get_for(&self, user: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        OrderRepository::new(self.pool)
            .get(id)
            .await?
            .filter(|o| o.user_id == user.id || user.is_admin())
            .ok_or(OrderError::NotFound)
    }

    /// Cancel an order, returning stock and refunding to the wallet.
    ///
    /// An active courier shipment is cancelled afterwards; failure there is
    /// logged and does not undo the cancellation.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotCancellable` once the order has shipped.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn cancel(&self, user: &CurrentUser, id: OrderId) -> Result<Order, OrderError> {
        let order = self.get_for(user, id).await?;
        if !order.status.is_cancellable() {
            return Err(OrderError::NotCancellable(order.status));
        }

        let refund = order.refundable_amount();
        let cancelled = OrderRepository::new(self.pool)
            .cancel(&order, refund)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => OrderError::NotCancellable(order.status),
                other => other.into(),
            })?;

        info!(order_number = %order.order_number, refund = %refund, "Order cancelled");

        let shipments = ShipmentRepository::new(self.pool);
        if let Some(shipment) = shipments.active_for_order(order.id).await? {
            match self.delhivery.cancel_shipment(&shipment.waybill).await {
                Ok(_) => {
                    shipments.mark_cancelled(&shipment.waybill).await?;
                }
                Err(e) => {
                    warn!(waybill = %shipment.waybill, error = %e, "Courier cancellation failed");
                    sentry::capture_error(&e);
                }
            }
        }

        Ok(cancelled)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shipping_fee_threshold() {
        assert_eq!(shipping_fee_for(Decimal::from(4999)), SHIPPING_FEE);
        assert_eq!(shipping_fee_for(Decimal::from(5000)), Decimal::ZERO);
    }

    #[test]
    fn test_totals_without_wallet() {
        let t = Totals::compute(Decimal::from(1000), Decimal::from(100), Decimal::ZERO);
        assert_eq!(t.shipping_fee, Decimal::from(150));
        assert_eq!(t.total, Decimal::from(1050));
        assert_eq!(t.wallet_used, Decimal::ZERO);
    }

    #[test]
    fn test_wallet_covers_part() {
        let t = Totals::compute(Decimal::from(6000), Decimal::ZERO, Decimal::from(500));
        assert_eq!(t.wallet_used, Decimal::from(500));
        assert_eq!(t.total, Decimal::from(5500));
        assert_eq!(
            t.initial_status(PaymentMethod::Razorpay),
            (PaymentStatus::Pending, OrderStatus::Pending)
        );
    }

    #[test]
    fn test_wallet_covers_everything() {
        let t = Totals::compute(Decimal::from(1000), Decimal::ZERO, Decimal::from(5000));
        assert_eq!(t.wallet_used, Decimal::from(1150));
        assert!(t.total.is_zero());
        assert_eq!(
            t.initial_status(PaymentMethod::Razorpay),
            (PaymentStatus::Completed, OrderStatus::Confirmed)
        );
    }

    #[test]
    fn test_cod_confirmed_immediately() {
        let t = Totals::compute(Decimal::from(1000), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(
            t.initial_status(PaymentMethod::Cod),
            (PaymentStatus::Pending, OrderStatus::Confirmed)
        );
    }

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number();
        assert_eq!(number.len(), 14);
        assert!(number.starts_with("WH"));
        assert!(
            number
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }
}
