//! Endpoints and credentials for the remote services.

use serde::{Deserialize, Serialize};

/// Where the adapters send their requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    /// Marketplace REST API root.
    pub base_url: String,
    pub carrier: CarrierConfig,
    /// Exchange-rate service root; the source currency is appended.
    pub exchange_rate_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            carrier: CarrierConfig::default(),
            exchange_rate_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
        }
    }
}

/// Shipping carrier credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CarrierConfig {
    pub base_url: String,
    pub token: String,
    pub shop_id: u64,
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            base_url: "https://online-gateway.ghn.vn/shiip/public-api/v2/shipping-order".to_string(),
            token: String::new(),
            shop_id: 0,
        }
    }
}

impl CarrierConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && self.shop_id != 0
    }
}
