//! Cart description files.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zenpii_commerce::checkout::CartSnapshot;
use zenpii_commerce::settlement::{settle, CommissionRate, Level, LineItem, OrderQuote};
use zenpii_commerce::{CartId, Currency, StoreId};

/// A cart as written by hand for `zenpii quote` and `zenpii checkout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartFile {
    /// Required for live checkouts.
    #[serde(default)]
    pub cart_id: Option<String>,
    pub store_id: String,
    /// Ship-from address.
    #[serde(default)]
    pub store_address: String,
    pub items: Vec<CartItem>,
    /// Rates used by the offline quote.
    #[serde(default)]
    pub pricing: OfflinePricing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: String,
    pub price: Decimal,
    /// Defaults to `price`.
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Percentages and fee used in place of live lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OfflinePricing {
    #[serde(default)]
    pub buyer_level: Option<Decimal>,
    #[serde(default)]
    pub store_level: Option<Decimal>,
    #[serde(default)]
    pub commission: Option<Decimal>,
    #[serde(default)]
    pub shipping_fee: Decimal,
}

impl CartFile {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cart file: {}", path.display()))?;
        Self::parse(&path.to_string_lossy(), &content)
    }

    pub fn parse(path: &str, content: &str) -> Result<Self> {
        let cart: CartFile = if path.ends_with(".json") {
            serde_json::from_str(content).with_context(|| format!("Failed to parse JSON cart: {}", path))?
        } else {
            toml::from_str(content).with_context(|| format!("Failed to parse TOML cart: {}", path))?
        };
        if cart.items.is_empty() {
            bail!("Cart {} has no items", path);
        }
        Ok(cart)
    }

    /// Validated line items, all attributed to the cart's store.
    pub fn line_items(&self) -> Result<Vec<LineItem>> {
        self.items
            .iter()
            .map(|item| {
                LineItem::new(
                    item.product_id.as_str(),
                    item.price,
                    item.sale_price.unwrap_or(item.price),
                    item.quantity,
                    self.store_id.as_str(),
                )
                .with_context(|| format!("Invalid item {}", item.product_id))
            })
            .collect()
    }

    pub fn snapshot(&self) -> Result<CartSnapshot> {
        let cart_id = self
            .cart_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .context("cart_id is required for a live checkout")?;
        Ok(CartSnapshot {
            id: CartId::new(cart_id),
            store_id: StoreId::new(self.store_id.as_str()),
            store_address: self.store_address.clone(),
            items: self.line_items()?,
        })
    }

    /// Settle the cart with the file's own rates and fee.
    pub fn offline_quote(&self, currency: Currency) -> Result<OrderQuote> {
        let items = self.line_items()?;
        let pricing = &self.pricing;
        let buyer_level = pricing.buyer_level.map(|d| Level::new(0, d)).transpose()?;
        let store_level = pricing.store_level.map(|d| Level::new(0, d)).transpose()?;
        let commission = pricing
            .commission
            .map(|fee| CommissionRate::new("offline", self.store_id.as_str(), fee))
            .transpose()?;

        let quote = settle(
            &items,
            buyer_level.as_ref(),
            store_level.as_ref(),
            commission.as_ref(),
            pricing.shipping_fee,
            currency,
        );
        quote.verify_balanced()?;
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE_CART: &str = r#"
store_id = "store1"
cart_id = "cart1"

[[items]]
product_id = "shirt"
price = "100000"
sale_price = "90000"
quantity = 2

[pricing]
buyer_level = "10"
store_level = "5"
commission = "20"
shipping_fee = "30000"
"#;

    #[test]
    fn test_offline_quote_breakdown() {
        let cart = CartFile::parse("cart.toml", SAMPLE_CART).unwrap();
        let quote = cart.offline_quote(Currency::VND).unwrap();
        assert_eq!(quote.total_list_price, dec!(200000));
        assert_eq!(quote.buyer_discounted_subtotal, dec!(162000));
        assert_eq!(quote.shipping_fee_after_discount, dec!(27000));
        assert_eq!(quote.amount_from_user, dec!(189000));
        assert_eq!(quote.amount_from_store, dec!(27000));
        assert_eq!(quote.amount_to_store, dec!(153000));
        assert_eq!(quote.amount_to_zenpii, dec!(36000));
    }

    #[test]
    fn test_sale_price_defaults_to_price() {
        let cart = CartFile::parse(
            "cart.json",
            r#"{"store_id": "s1", "items": [{"product_id": "p", "price": 50000}]}"#,
        )
        .unwrap();
        let items = cart.line_items().unwrap();
        assert_eq!(items[0].unit_sale_price, dec!(50000));
        assert_eq!(items[0].quantity, 1);
        assert!(cart.snapshot().is_err());
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert!(CartFile::parse("cart.json", r#"{"store_id": "s1", "items": []}"#).is_err());
    }

    #[test]
    fn test_out_of_range_level_rejected() {
        let mut cart = CartFile::parse("cart.toml", SAMPLE_CART).unwrap();
        cart.pricing.buyer_level = Some(dec!(120));
        assert!(cart.offline_quote(Currency::VND).is_err());
    }
}
