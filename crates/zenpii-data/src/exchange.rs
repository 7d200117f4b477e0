//! Exchange-rate service adapter.

use crate::client::FetchClient;
use crate::dependency::DependencyTag;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use zenpii_commerce::money::ServerDecimal;
use zenpii_commerce::ports::ExchangeRateSource;
use zenpii_commerce::{ApiError, Currency};

#[derive(Debug, Deserialize)]
struct LatestRates {
    #[serde(default)]
    rates: HashMap<String, ServerDecimal>,
}

/// [`ExchangeRateSource`] reading `{base_url}/{FROM}` and picking `rates[TO]`.
#[derive(Debug, Clone)]
pub struct ExchangeRateApi {
    client: FetchClient,
    base_url: String,
}

impl ExchangeRateApi {
    pub fn new(client: FetchClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ExchangeRateSource for ExchangeRateApi {
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, ApiError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), from.code());
        let latest: LatestRates = self.client.get(&url, DependencyTag::ExchangeRate).await?;
        latest
            .rates
            .get(to.code())
            .map(ServerDecimal::value)
            .ok_or_else(|| ApiError::Decode(format!("no {} rate in response", to.code())))
    }
}
