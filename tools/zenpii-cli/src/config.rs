//! CLI configuration.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;
use zenpii_commerce::checkout::BuyerAccount;
use zenpii_commerce::commit::BuyerAuth;
use zenpii_commerce::{CheckoutConfig, UserId};
use zenpii_data::ApiConfig;
use zenpii_observability::LoggingConfig;

/// Environment variable consulted when the config carries no access token.
pub const ACCESS_TOKEN_ENV: &str = "ZENPII_ACCESS_TOKEN";

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Remote service endpoints.
    #[serde(default)]
    pub api: ApiConfig,

    /// Engine settings.
    #[serde(default)]
    pub checkout: CheckoutConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// The signed-in buyer used for live checkouts.
    #[serde(default)]
    pub buyer: BuyerProfile,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,
}

impl CliConfig {
    /// Load config from a file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        Self::parse(path, &content)
    }

    /// Parse by file extension: `.json` is JSON, anything else TOML.
    pub fn parse(path: &str, content: &str) -> Result<Self> {
        if path.ends_with(".json") {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            toml::from_str(content).with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Get environment-specific config.
    pub fn for_environment(&self, env: &str) -> Result<CliConfig> {
        let env_config = self
            .environments
            .get(env)
            .with_context(|| format!("Unknown environment: {}", env))?;

        let mut config = self.clone();
        if let Some(ref api) = env_config.api {
            config.api = api.clone();
        }
        if let Some(ref checkout) = env_config.checkout {
            config.checkout = checkout.clone();
        }
        if let Some(ref logging) = env_config.logging {
            config.logging = logging.clone();
        }
        Ok(config)
    }

    /// Problems that would make a live checkout fail. Empty when usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Err(e) = self.checkout.validate() {
            problems.push(e.to_string());
        }
        if let Err(e) = Url::parse(&self.api.base_url) {
            problems.push(format!("api.base_url is not a URL: {}", e));
        }
        if !self.api.carrier.is_configured() {
            problems.push("api.carrier.token and api.carrier.shop_id are required for shipping quotes".into());
        }
        if self.buyer.id.trim().is_empty() {
            problems.push("buyer.id is required for live checkouts".into());
        }
        problems
    }

    /// Redirect gateway credentials present.
    pub fn gateway_configured(&self) -> bool {
        let gateway = &self.checkout.gateway;
        !gateway.tmn_code.is_empty() && !gateway.secure_secret.is_empty()
    }
}

/// Buyer details as written in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyerProfile {
    #[serde(default)]
    pub id: String,
    /// Falls back to `ZENPII_ACCESS_TOKEN` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    /// Saved addresses, default first.
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl BuyerProfile {
    pub fn to_account(&self, env_token: Option<String>) -> Result<BuyerAccount> {
        let access_token = if self.access_token.is_empty() {
            env_token.filter(|t| !t.is_empty()).with_context(|| {
                format!("No access token: set buyer.access_token or {}", ACCESS_TOKEN_ENV)
            })?
        } else {
            self.access_token.clone()
        };

        Ok(BuyerAccount {
            auth: BuyerAuth {
                buyer_id: UserId::new(self.id.clone()),
                access_token,
            },
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            addresses: self.addresses.clone(),
        })
    }
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub checkout: Option<CheckoutConfig>,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

/// Generate a default zenpii.toml config file.
pub fn generate_default_config() -> String {
    r#"# Zenpii checkout configuration

[api]
base_url = "http://localhost:5000"
exchange_rate_url = "https://api.exchangerate-api.com/v4/latest"

[api.carrier]
base_url = "https://online-gateway.ghn.vn/shiip/public-api/v2/shipping-order"
token = ""
shop_id = 0

[checkout]
currency = "VND"
quote_retries = 1
reconciliation_attempts = 1

[checkout.exchange]
settlement_currency = "USD"
fallback_rate = "0.00004"

[checkout.shipping]
default_service_id = 53321
default_origin_district = 3440
default_destination_district = 3695
default_destination_ward = "90758"

[checkout.gateway]
tmn_code = ""
secure_secret = ""
host = "https://sandbox.vnpayment.vn"
return_url = "http://localhost:3000/cart"
pending_ttl_secs = 1800

[logging]
level = "info"
format = "human"

[buyer]
id = ""
# access_token is read from ZENPII_ACCESS_TOKEN when unset
first_name = ""
last_name = ""
phone = ""
addresses = []

[environments.staging.api]
base_url = "https://staging-api.zenpii.example"

[environments.production.api]
base_url = "https://api.zenpii.example"

[environments.production.logging]
level = "warn"
format = "json"
"#
    .to_string()
}
