//! The derived order quote.

use crate::money::{Currency, Money};
use crate::CommerceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Every amount quoted to the buyer for one checkout.
///
/// Recomputed from scratch on every relevant input change and never
/// patched field by field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrderQuote {
    pub currency: Currency,
    pub total_list_price: Decimal,
    pub total_sale_price: Decimal,
    pub buyer_discounted_subtotal: Decimal,
    pub shipping_fee_before_discount: Decimal,
    pub shipping_fee_after_discount: Decimal,
    /// Commission percent actually applied to the store.
    pub effective_commission_rate: Decimal,
    /// Platform's cut of the store's sales.
    pub amount_from_store: Decimal,
    pub amount_to_store: Decimal,
    /// Buyer's total charge.
    pub amount_from_user: Decimal,
    /// Platform's net: `amount_from_user - amount_to_store`.
    pub amount_to_zenpii: Decimal,
}

impl OrderQuote {
    /// Check `amount_from_user == amount_to_store + amount_to_zenpii`.
    pub fn verify_balanced(&self) -> Result<(), CommerceError> {
        if self.amount_from_user != self.amount_to_store + self.amount_to_zenpii {
            return Err(CommerceError::UnbalancedSettlement {
                from_user: self.amount_from_user,
                to_store: self.amount_to_store,
                to_platform: self.amount_to_zenpii,
            });
        }
        Ok(())
    }

    /// Amount the buyer level knocked off the products.
    pub fn buyer_discount(&self) -> Decimal {
        self.total_sale_price - self.buyer_discounted_subtotal
    }

    /// Amount the buyer level knocked off shipping.
    pub fn shipping_discount(&self) -> Decimal {
        self.shipping_fee_before_discount - self.shipping_fee_after_discount
    }

    /// Savings from sale prices against listed prices.
    pub fn sale_savings(&self) -> Decimal {
        self.total_list_price - self.total_sale_price
    }

    /// The buyer's charge as money.
    pub fn charge(&self) -> Money {
        Money::new(self.amount_from_user, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn quote() -> OrderQuote {
        OrderQuote {
            currency: Currency::VND,
            total_list_price: dec!(250000),
            total_sale_price: dec!(230000),
            buyer_discounted_subtotal: dec!(207000),
            shipping_fee_before_discount: dec!(30000),
            shipping_fee_after_discount: dec!(27000),
            effective_commission_rate: dec!(7),
            amount_from_store: dec!(16100),
            amount_to_store: dec!(213900),
            amount_from_user: dec!(234000),
            amount_to_zenpii: dec!(20100),
        }
    }

    #[test]
    fn test_balanced_quote() {
        assert!(quote().verify_balanced().is_ok());
    }

    #[test]
    fn test_tampered_quote_is_rejected() {
        let mut q = quote();
        q.amount_to_zenpii = dec!(20000);
        assert!(matches!(
            q.verify_balanced(),
            Err(CommerceError::UnbalancedSettlement { .. })
        ));
    }

    #[test]
    fn test_summary_lines() {
        let q = quote();
        assert_eq!(q.buyer_discount(), dec!(23000));
        assert_eq!(q.shipping_discount(), dec!(3000));
        assert_eq!(q.sale_savings(), dec!(20000));
        assert_eq!(q.charge().display(), "234.000\u{20ab}");
    }
}
