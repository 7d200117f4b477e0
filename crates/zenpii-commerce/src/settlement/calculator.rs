//! Settlement calculations.
//!
//! Pure functions over line items and rate records. No I/O, no clamping:
//! a negative effective commission rate is computed as-is and must be
//! rejected by the caller via [`check_commission_rate`].

use crate::money::{apply_discount, Currency};
use crate::settlement::{CommissionRate, Level, LineItem, OrderQuote};
use crate::CommerceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Product sums for a cart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ProductTotals {
    /// Sum of listed prices. Display only (crossed-out price).
    pub total_list_price: Decimal,
    /// Sum of sale prices.
    pub total_sale_price: Decimal,
    /// Sale sum after the buyer level discount.
    pub buyer_discounted_subtotal: Decimal,
}

/// Shipping fee before and after the buyer level discount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ShippingSplit {
    pub fee_before_discount: Decimal,
    pub fee_after_discount: Decimal,
}

/// Commission owed by the store and the store's payout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct CommissionSplit {
    /// Effective commission rate in percent.
    pub effective_rate: Decimal,
    /// Platform's cut after the store level discount.
    pub amount_from_store: Decimal,
    pub amount_to_store: Decimal,
}

fn sum_list(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::list_total).sum()
}

fn sum_sale(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::sale_total).sum()
}

/// Sum list and sale prices, then discount the sale sum for the buyer's level.
pub fn compute_product_totals(items: &[LineItem], buyer_level: Option<&Level>) -> ProductTotals {
    let total_list_price = sum_list(items);
    let total_sale_price = sum_sale(items);
    ProductTotals {
        total_list_price,
        total_sale_price,
        buyer_discounted_subtotal: apply_discount(
            total_sale_price,
            Level::discount_of(buyer_level),
        ),
    }
}

/// Discount a quoted shipping fee for the buyer's level.
pub fn compute_shipping_split(quoted_fee: Decimal, buyer_level: Option<&Level>) -> ShippingSplit {
    ShippingSplit {
        fee_before_discount: quoted_fee,
        fee_after_discount: apply_discount(quoted_fee, Level::discount_of(buyer_level)),
    }
}

/// `commission fee - store level discount`, unclamped.
pub fn effective_commission_rate(
    store_level: Option<&Level>,
    commission: Option<&CommissionRate>,
) -> Decimal {
    let fee = commission.map(|c| c.fee_percent).unwrap_or(Decimal::ZERO);
    fee - Level::discount_of(store_level)
}

/// Reject a configuration whose effective commission rate is negative.
pub fn check_commission_rate(
    store_level: Option<&Level>,
    commission: Option<&CommissionRate>,
) -> Result<Decimal, CommerceError> {
    let effective = effective_commission_rate(store_level, commission);
    if effective < Decimal::ZERO {
        return Err(CommerceError::NegativeCommissionRate {
            effective,
            fee: commission.map(|c| c.fee_percent).unwrap_or(Decimal::ZERO),
            discount: Level::discount_of(store_level),
        });
    }
    Ok(effective)
}

/// Split the sale total between platform and store.
pub fn compute_commission_split(
    items: &[LineItem],
    store_level: Option<&Level>,
    commission: Option<&CommissionRate>,
) -> CommissionSplit {
    let total_sale_price = sum_sale(items);
    let effective_rate = effective_commission_rate(store_level, commission);
    let amount_from_store = total_sale_price * effective_rate / dec!(100);
    CommissionSplit {
        effective_rate,
        amount_from_store,
        amount_to_store: total_sale_price - amount_from_store,
    }
}

/// Fold the partial results into one quote.
///
/// `amount_to_zenpii` is derived from `amount_from_user` and
/// `amount_to_store` here and nowhere else.
pub fn compose_quote(
    totals: &ProductTotals,
    shipping: &ShippingSplit,
    commission: &CommissionSplit,
    currency: Currency,
) -> OrderQuote {
    let amount_from_user = totals.buyer_discounted_subtotal + shipping.fee_after_discount;
    OrderQuote {
        currency,
        total_list_price: totals.total_list_price,
        total_sale_price: totals.total_sale_price,
        buyer_discounted_subtotal: totals.buyer_discounted_subtotal,
        shipping_fee_before_discount: shipping.fee_before_discount,
        shipping_fee_after_discount: shipping.fee_after_discount,
        effective_commission_rate: commission.effective_rate,
        amount_from_store: commission.amount_from_store,
        amount_to_store: commission.amount_to_store,
        amount_from_user,
        amount_to_zenpii: amount_from_user - commission.amount_to_store,
    }
}

/// Run the whole calculation in one go.
pub fn settle(
    items: &[LineItem],
    buyer_level: Option<&Level>,
    store_level: Option<&Level>,
    commission: Option<&CommissionRate>,
    quoted_shipping_fee: Decimal,
    currency: Currency,
) -> OrderQuote {
    let totals = compute_product_totals(items, buyer_level);
    let shipping = compute_shipping_split(quoted_shipping_fee, buyer_level);
    let split = compute_commission_split(items, store_level, commission);
    compose_quote(&totals, &shipping, &split, currency)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<LineItem> {
        vec![
            LineItem::new("x", dec!(100000), dec!(90000), 2, "s1").unwrap(),
            LineItem::new("y", dec!(50000), dec!(50000), 1, "s1").unwrap(),
        ]
    }

    #[test]
    fn test_product_totals() {
        let level = Level::new(0, dec!(10)).unwrap();
        let totals = compute_product_totals(&items(), Some(&level));
        assert_eq!(totals.total_list_price, dec!(250000));
        assert_eq!(totals.total_sale_price, dec!(230000));
        assert_eq!(totals.buyer_discounted_subtotal, dec!(207000));
    }

    #[test]
    fn test_product_totals_without_level() {
        let totals = compute_product_totals(&items(), None);
        assert_eq!(totals.buyer_discounted_subtotal, dec!(230000));
    }

    #[test]
    fn test_commission_split() {
        let store_level = Level::new(0, dec!(3)).unwrap();
        let commission = CommissionRate::new("c1", "s1", dec!(10)).unwrap();
        let split = compute_commission_split(&items(), Some(&store_level), Some(&commission));
        assert_eq!(split.effective_rate, dec!(7));
        assert_eq!(split.amount_from_store, dec!(16100));
        assert_eq!(split.amount_to_store, dec!(213900));
    }

    #[test]
    fn test_negative_rate_is_computed_but_flagged() {
        let store_level = Level::new(0, dec!(15)).unwrap();
        let commission = CommissionRate::new("c1", "s1", dec!(10)).unwrap();
        let split = compute_commission_split(&items(), Some(&store_level), Some(&commission));
        assert_eq!(split.effective_rate, dec!(-5));
        assert!(split.amount_to_store > dec!(230000));
        assert!(matches!(
            check_commission_rate(Some(&store_level), Some(&commission)),
            Err(CommerceError::NegativeCommissionRate { .. })
        ));
    }

    #[test]
    fn test_missing_commission_means_zero_fee() {
        let split = compute_commission_split(&items(), None, None);
        assert_eq!(split.amount_from_store, Decimal::ZERO);
        assert_eq!(split.amount_to_store, dec!(230000));
    }

    #[test]
    fn test_settle_scenario() {
        let buyer = Level::new(0, dec!(10)).unwrap();
        let store = Level::new(0, dec!(3)).unwrap();
        let commission = CommissionRate::new("c1", "s1", dec!(10)).unwrap();
        let quote = settle(
            &items(),
            Some(&buyer),
            Some(&store),
            Some(&commission),
            dec!(30000),
            Currency::VND,
        );
        assert_eq!(quote.shipping_fee_after_discount, dec!(27000));
        assert_eq!(quote.amount_from_user, dec!(234000));
        assert_eq!(quote.amount_to_zenpii, dec!(20100));
        assert_eq!(
            quote.amount_from_user,
            quote.amount_to_store + quote.amount_to_zenpii
        );
    }
}
