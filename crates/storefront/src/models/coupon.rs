//! Discount coupons.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wholesale_core::{CouponId, DiscountType};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    /// Stored uppercase.
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_value: Decimal,
    /// Cap for percentage coupons.
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a coupon cannot be applied. The message is shown to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Invalid coupon code")]
    Unknown,
    #[error("This coupon is no longer active")]
    Inactive,
    #[error("This coupon is not valid yet")]
    NotYetValid,
    #[error("This coupon has expired")]
    Expired,
    #[error("This coupon has reached its usage limit")]
    UsageLimitReached,
    #[error("Minimum order value for this coupon is ₹{0}")]
    BelowMinimum(Decimal),
}

impl Coupon {
    /// Discount this coupon gives on `subtotal` at time `now`.
    ///
    /// Percentage discounts are rounded to paise and capped by
    /// `max_discount`; no discount exceeds the subtotal.
    ///
    /// # Errors
    ///
    /// Returns the reason the coupon does not apply.
    pub fn discount_for(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Inactive);
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return Err(CouponRejection::NotYetValid);
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return Err(CouponRejection::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(CouponRejection::UsageLimitReached);
        }
        if subtotal < self.min_order_value {
            return Err(CouponRejection::BelowMinimum(self.min_order_value));
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = (subtotal * self.value / Decimal::ONE_HUNDRED)
                    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
                self.max_discount.map_or(pct, |cap| pct.min(cap))
            }
            DiscountType::Flat => self.value,
        };

        Ok(raw.min(subtotal).max(Decimal::ZERO))
    }
}

/// Admin payload for creating a coupon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: Decimal,
    #[serde(default)]
    pub min_order_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl CouponInput {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("code is required".to_string());
        }
        if self.value <= Decimal::ZERO {
            return Err("value must be positive".to_string());
        }
        if self.discount_type == DiscountType::Percentage && self.value > Decimal::ONE_HUNDRED {
            return Err("percentage cannot exceed 100".to_string());
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until)
            && until < from
        {
            return Err("validUntil is before validFrom".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub fn normalized_code(&self) -> String {
        self.code.trim().to_uppercase()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use chrono::Duration;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn coupon(discount_type: DiscountType, value: &str) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "BULK10".to_string(),
            description: None,
            discount_type,
            value: dec(value),
            min_order_value: Decimal::ZERO,
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: None,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_percentage_discount_is_capped() {
        let mut c = coupon(DiscountType::Percentage, "10");
        assert_eq!(c.discount_for(dec("2500"), Utc::now()).unwrap(), dec("250"));

        c.max_discount = Some(dec("200"));
        assert_eq!(c.discount_for(dec("2500"), Utc::now()).unwrap(), dec("200"));
    }

    #[test]
    fn test_flat_discount_never_exceeds_subtotal() {
        let c = coupon(DiscountType::Flat, "500");
        assert_eq!(c.discount_for(dec("300"), Utc::now()).unwrap(), dec("300"));
    }

    #[test]
    fn test_rejections() {
        let now = Utc::now();

        let mut c = coupon(DiscountType::Flat, "100");
        c.is_active = false;
        assert_eq!(c.discount_for(dec("1000"), now), Err(CouponRejection::Inactive));

        let mut c = coupon(DiscountType::Flat, "100");
        c.valid_until = Some(now - Duration::days(1));
        assert_eq!(c.discount_for(dec("1000"), now), Err(CouponRejection::Expired));

        let mut c = coupon(DiscountType::Flat, "100");
        c.valid_from = Some(now + Duration::days(1));
        assert_eq!(
            c.discount_for(dec("1000"), now),
            Err(CouponRejection::NotYetValid)
        );

        let mut c = coupon(DiscountType::Flat, "100");
        c.usage_limit = Some(3);
        c.used_count = 3;
        assert_eq!(
            c.discount_for(dec("1000"), now),
            Err(CouponRejection::UsageLimitReached)
        );

        let mut c = coupon(DiscountType::Flat, "100");
        c.min_order_value = dec("2000");
        assert_eq!(
            c.discount_for(dec("1000"), now),
            Err(CouponRejection::BelowMinimum(dec("2000")))
        );
    }
}
