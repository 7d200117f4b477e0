//! Engine configuration.
//!
//! Every field has a default so a partial TOML/JSON file is enough.

use crate::money::Currency;
use crate::CommerceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Checkout engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Currency the storefront prices in.
    pub currency: Currency,
    /// Shipping quote settings.
    pub shipping: ShippingConfig,
    /// Card/wallet conversion settings.
    pub exchange: ExchangeConfig,
    /// Redirect gateway settings.
    pub gateway: GatewayConfig,
    /// Silent retries for each quote input lookup.
    pub quote_retries: u32,
    /// Order-creation retries after a payment has been taken.
    pub reconciliation_attempts: u32,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: Currency::VND,
            shipping: ShippingConfig::default(),
            exchange: ExchangeConfig::default(),
            gateway: GatewayConfig::default(),
            quote_retries: 1,
            reconciliation_attempts: 1,
        }
    }
}

impl CheckoutConfig {
    /// Check values that would otherwise fail late.
    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.exchange.fallback_rate <= Decimal::ZERO {
            return Err(CommerceError::InvalidConfig(
                "exchange.fallback_rate must be positive".into(),
            ));
        }
        if self.exchange.settlement_currency == self.currency {
            return Err(CommerceError::InvalidConfig(
                "exchange.settlement_currency must differ from currency".into(),
            ));
        }
        if self.shipping.package.weight_grams == 0 {
            return Err(CommerceError::InvalidConfig(
                "shipping.package.weight_grams must be positive".into(),
            ));
        }
        if self.reconciliation_attempts > 3 {
            return Err(CommerceError::InvalidConfig(
                "reconciliation_attempts above 3 risks duplicate orders on servers without idempotency".into(),
            ));
        }
        Ok(())
    }
}

/// Fixed package size sent to the carrier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageDimensions {
    pub height_cm: u32,
    pub length_cm: u32,
    pub width_cm: u32,
    pub weight_grams: u32,
}

impl Default for PackageDimensions {
    fn default() -> Self {
        Self {
            height_cm: 15,
            length_cm: 15,
            width_cm: 15,
            weight_grams: 1000,
        }
    }
}

/// Shipping quote settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShippingConfig {
    /// Carrier service used when none is listed for a route.
    pub default_service_id: u32,
    pub package: PackageDimensions,
    /// District used when the store address cannot be resolved.
    pub default_origin_district: u32,
    /// District used when the buyer address cannot be resolved.
    pub default_destination_district: u32,
    /// Ward used when the buyer address cannot be resolved.
    pub default_destination_ward: String,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            default_service_id: 53321,
            package: PackageDimensions::default(),
            default_origin_district: 3440,
            default_destination_district: 3695,
            default_destination_ward: "90758".to_string(),
        }
    }
}

/// Exchange settings for the hosted card/wallet path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Currency the hosted provider settles in.
    pub settlement_currency: Currency,
    /// Rate used when the exchange-rate service is unavailable.
    #[serde(with = "rust_decimal::serde::str")]
    pub fallback_rate: Decimal,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            settlement_currency: Currency::USD,
            fallback_rate: dec!(0.00004),
        }
    }
}

/// Redirect payment gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Merchant terminal code.
    pub tmn_code: String,
    /// Shared secret for signing and verifying payloads.
    pub secure_secret: String,
    /// Gateway host.
    pub host: String,
    /// Path of the payment page on the host.
    pub payment_path: String,
    /// Storefront page the buyer returns to.
    pub return_url: String,
    /// Client IP reported to the gateway.
    pub ip_addr: String,
    pub locale: String,
    /// How long a pending redirect order stays claimable.
    pub pending_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tmn_code: String::new(),
            secure_secret: String::new(),
            host: "https://sandbox.vnpayment.vn".to_string(),
            payment_path: "/paymentv2/vpcpay.html".to_string(),
            return_url: "http://localhost:3000/cart".to_string(),
            ip_addr: "127.0.0.1".to_string(),
            locale: "vn".to_string(),
            pending_ttl_secs: 1800,
        }
    }
}
