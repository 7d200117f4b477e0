//! Settlement inputs: line items, levels and commission rates.

use crate::ids::{CommissionId, ProductId, StoreId};
use crate::money::ensure_percent;
use crate::CommerceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product line in a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub product_id: ProductId,
    /// Listed price per unit.
    pub unit_price: Decimal,
    /// Current selling price per unit. Never above `unit_price`.
    pub unit_sale_price: Decimal,
    pub quantity: u32,
    pub store_id: StoreId,
}

impl LineItem {
    /// Create a validated line item.
    pub fn new(
        product_id: impl Into<ProductId>,
        unit_price: Decimal,
        unit_sale_price: Decimal,
        quantity: u32,
        store_id: impl Into<StoreId>,
    ) -> Result<Self, CommerceError> {
        let item = Self {
            product_id: product_id.into(),
            unit_price,
            unit_sale_price,
            quantity,
            store_id: store_id.into(),
        };
        item.validate()?;
        Ok(item)
    }

    /// Check the line item invariants.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.quantity == 0 {
            return Err(CommerceError::InvalidQuantity {
                product_id: self.product_id.to_string(),
                quantity: 0,
            });
        }
        if self.unit_sale_price > self.unit_price {
            return Err(CommerceError::SalePriceAboveListPrice {
                product_id: self.product_id.to_string(),
                price: self.unit_price,
                sale_price: self.unit_sale_price,
            });
        }
        Ok(())
    }

    pub fn list_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn sale_total(&self) -> Decimal {
        self.unit_sale_price * Decimal::from(self.quantity)
    }
}

/// A loyalty tier. Buyer levels discount the subtotal and shipping,
/// store levels discount the commission owed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Level {
    /// Points needed to reach the tier.
    pub min_point: u64,
    /// Discount in percent, 0..=100.
    pub discount_percent: Decimal,
}

impl Level {
    pub fn new(min_point: u64, discount_percent: Decimal) -> Result<Self, CommerceError> {
        Ok(Self {
            min_point,
            discount_percent: ensure_percent(discount_percent)?,
        })
    }

    /// Discount of an optional level; an absent level discounts nothing.
    pub fn discount_of(level: Option<&Level>) -> Decimal {
        level.map(|l| l.discount_percent).unwrap_or(Decimal::ZERO)
    }
}

/// The platform's base cut of a store's sales.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommissionRate {
    pub id: CommissionId,
    pub store_id: StoreId,
    /// Fee in percent, 0..=100.
    pub fee_percent: Decimal,
}

impl CommissionRate {
    pub fn new(
        id: impl Into<CommissionId>,
        store_id: impl Into<StoreId>,
        fee_percent: Decimal,
    ) -> Result<Self, CommerceError> {
        Ok(Self {
            id: id.into(),
            store_id: store_id.into(),
            fee_percent: ensure_percent(fee_percent)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_item_rejects_sale_above_price() {
        let err = LineItem::new("p1", dec!(100), dec!(120), 1, "s1").unwrap_err();
        assert!(matches!(err, CommerceError::SalePriceAboveListPrice { .. }));
    }

    #[test]
    fn test_line_item_rejects_zero_quantity() {
        let err = LineItem::new("p1", dec!(100), dec!(90), 0, "s1").unwrap_err();
        assert!(matches!(err, CommerceError::InvalidQuantity { .. }));
    }

    #[test]
    fn test_line_item_totals() {
        let item = LineItem::new("x", dec!(100000), dec!(90000), 2, "s1").unwrap();
        assert_eq!(item.list_total(), dec!(200000));
        assert_eq!(item.sale_total(), dec!(180000));
    }

    #[test]
    fn test_level_range() {
        assert!(Level::new(0, dec!(101)).is_err());
        assert!(Level::new(0, dec!(-1)).is_err());
        assert_eq!(Level::discount_of(None), Decimal::ZERO);
        let level = Level::new(100, dec!(10)).unwrap();
        assert_eq!(Level::discount_of(Some(&level)), dec!(10));
    }
}
