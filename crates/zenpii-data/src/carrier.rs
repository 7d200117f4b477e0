//! Shipping carrier adapter.

use crate::client::FetchClient;
use crate::config::CarrierConfig;
use crate::dependency::DependencyTag;
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use zenpii_commerce::money::ServerDecimal;
use zenpii_commerce::ports::CarrierApi;
use zenpii_commerce::shipping::FeeRequest;
use zenpii_commerce::ApiError;

#[derive(Debug, Serialize)]
struct ServicesBody {
    shop_id: u64,
    from_district: u32,
    to_district: u32,
}

#[derive(Debug, Deserialize)]
struct ServicesResponse {
    #[serde(default)]
    data: Option<Vec<ServiceRecord>>,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    service_id: u32,
}

#[derive(Debug, Serialize, PartialEq)]
struct FeeBody<'a> {
    service_id: u32,
    insurance_value: i64,
    coupon: Option<&'a str>,
    from_district_id: u32,
    from_ward_code: Option<&'a str>,
    to_district_id: u32,
    to_ward_code: Option<&'a str>,
    height: u32,
    length: u32,
    weight: u32,
    width: u32,
}

impl<'a> From<&'a FeeRequest> for FeeBody<'a> {
    fn from(req: &'a FeeRequest) -> Self {
        Self {
            service_id: req.service_id,
            // The carrier only accepts whole units.
            insurance_value: req.insurance_value.round().to_i64().unwrap_or(i64::MAX),
            coupon: req.coupon.as_deref(),
            from_district_id: req.from_district_id,
            from_ward_code: req.from_ward_code.as_deref(),
            to_district_id: req.to_district_id,
            to_ward_code: req.to_ward_code.as_deref(),
            height: req.package.height_cm,
            length: req.package.length_cm,
            weight: req.package.weight_grams,
            width: req.package.width_cm,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeeResponse {
    data: Option<FeeData>,
}

#[derive(Debug, Deserialize)]
struct FeeData {
    #[serde(default)]
    total: ServerDecimal,
}

/// [`CarrierApi`] over the GHN shipping-order API.
#[derive(Debug, Clone)]
pub struct GhnCarrier {
    client: FetchClient,
    config: CarrierConfig,
}

impl GhnCarrier {
    pub fn new(client: FetchClient, config: CarrierConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned + Send,
    {
        let url = self.url(path);
        let shop_id = self.config.shop_id.to_string();
        let value = self
            .client
            .execute(&url, DependencyTag::Carrier, |http| {
                http.post(&url)
                    .header("Token", &self.config.token)
                    .header("ShopId", &shop_id)
                    .json(body)
            })
            .await?;
        Ok(value)
    }
}

#[async_trait]
impl CarrierApi for GhnCarrier {
    async fn available_services(&self, from_district: u32, to_district: u32) -> Result<Vec<u32>, ApiError> {
        let body = ServicesBody {
            shop_id: self.config.shop_id,
            from_district,
            to_district,
        };
        let resp: ServicesResponse = self.post("available-services", &body).await?;
        Ok(resp
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.service_id)
            .collect())
    }

    async fn quote_fee(&self, request: &FeeRequest) -> Result<Decimal, ApiError> {
        let resp: FeeResponse = self.post("fee", &FeeBody::from(request)).await?;
        resp.data
            .map(|d| d.total.value())
            .ok_or_else(|| ApiError::Decode("fee response without data".into()))
    }
}
