//! Marketplace REST adapter.

use crate::client::{FetchClient, FetchError};
use crate::dependency::DependencyTag;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;
use zenpii_commerce::commit::{BuyerAuth, CreatedOrder, OrderBody};
use zenpii_commerce::money::ServerDecimal;
use zenpii_commerce::ports::MarketplaceApi;
use zenpii_commerce::settlement::{CommissionRate, Level};
use zenpii_commerce::shipping::LocationCode;
use zenpii_commerce::{ApiError, CartId, OrderId, StoreId, UserId};

#[derive(Debug, Deserialize)]
struct LevelEnvelope {
    level: Option<LevelRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LevelRecord {
    #[serde(default)]
    min_point: u64,
    #[serde(default)]
    discount: ServerDecimal,
}

#[derive(Debug, Deserialize)]
struct CommissionEnvelope {
    commission: Option<CommissionRecord>,
}

#[derive(Debug, Deserialize)]
struct CommissionRecord {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    fee: ServerDecimal,
}

#[derive(Debug, Deserialize)]
struct AddressRecord {
    #[serde(rename = "districtID", default)]
    district_id: Value,
    #[serde(rename = "wardID", default)]
    ward_id: Value,
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: OrderRecord,
    #[serde(default)]
    user: Option<Value>,
}

/// `createOrder` answers 200 with either an order or an `{"error"}` body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrderResponse {
    Created(OrderEnvelope),
    Rejected { error: Value },
}

#[derive(Debug, Deserialize)]
struct OrderRecord {
    #[serde(rename = "_id")]
    id: String,
}

/// [`MarketplaceApi`] over the marketplace's JSON API.
#[derive(Debug, Clone)]
pub struct RestMarketplace {
    client: FetchClient,
    base_url: Url,
}

impl RestMarketplace {
    pub fn new(client: FetchClient, base_url: &str) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::Connection(format!("invalid base url: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Base URL plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Connection(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch a lookup, treating a missing record as `None`.
    async fn lookup(&self, url: Url, tag: DependencyTag) -> Result<Option<Value>, ApiError> {
        match self.client.get::<Value>(url.as_str(), tag).await {
            Ok(Value::Null) => Ok(None),
            Ok(value) if value.get("error").is_some() => {
                debug!(dependency = %tag, url = %url, error = %value["error"], "record not found");
                Ok(None)
            }
            Ok(value) => Ok(Some(value)),
            Err(FetchError::Http { status: 404, .. }) => Ok(None),
            Err(FetchError::Rejected { status, message }) if status < 500 => {
                debug!(dependency = %tag, url = %url, status, error = %message, "record not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn level(&self, segments: &[&str]) -> Result<Option<Level>, ApiError> {
        let Some(value) = self.lookup(self.endpoint(segments)?, DependencyTag::Levels).await? else {
            return Ok(None);
        };
        let envelope: LevelEnvelope = serde_json::from_value(value)?;
        envelope
            .level
            .map(|l| Level::new(l.min_point, l.discount.value()))
            .transpose()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MarketplaceApi for RestMarketplace {
    async fn store_level(&self, store_id: &StoreId) -> Result<Option<Level>, ApiError> {
        self.level(&["store", "level", store_id.as_str()]).await
    }

    async fn buyer_level(&self, buyer_id: &UserId) -> Result<Option<Level>, ApiError> {
        self.level(&["user", "level", buyer_id.as_str()]).await
    }

    async fn commission_by_store(&self, store_id: &StoreId) -> Result<Option<CommissionRate>, ApiError> {
        let url = self.endpoint(&["store", "commission", store_id.as_str()])?;
        let Some(value) = self.lookup(url, DependencyTag::Commission).await? else {
            return Ok(None);
        };
        let envelope: CommissionEnvelope = serde_json::from_value(value)?;
        envelope
            .commission
            .map(|c| CommissionRate::new(c.id, store_id.clone(), c.fee.value()))
            .transpose()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn resolve_location(&self, address: &str) -> Result<Option<LocationCode>, ApiError> {
        let url = self.endpoint(&["cacheAddress", address])?;
        let Some(value) = self.lookup(url, DependencyTag::AddressCache).await? else {
            return Ok(None);
        };
        let record: AddressRecord = serde_json::from_value(value)?;
        Ok(location_from(&record))
    }

    async fn create_order(
        &self,
        auth: &BuyerAuth,
        cart_id: &CartId,
        body: &OrderBody,
    ) -> Result<CreatedOrder, ApiError> {
        let url = self.endpoint(&["order", "create", cart_id.as_str(), auth.buyer_id.as_str()])?;
        let response: OrderResponse = self
            .client
            .execute(url.as_str(), DependencyTag::Orders, |http| {
                http.post(url.as_str())
                    .bearer_auth(&auth.access_token)
                    .header("Idempotency-Key", body.idempotency_key.as_str())
                    .json(body)
            })
            .await?;
        match response {
            OrderResponse::Created(envelope) => Ok(CreatedOrder {
                order_id: OrderId::new(envelope.order.id),
                user: envelope.user,
            }),
            OrderResponse::Rejected { error } => Err(ApiError::Server(match error {
                Value::String(message) => message,
                other => other.to_string(),
            })),
        }
    }
}

/// The address cache stores ids as numbers or strings depending on who wrote them.
fn location_from(record: &AddressRecord) -> Option<LocationCode> {
    let district_id = match &record.district_id {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    let ward_code = match &record.ward_id {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    };
    Some(LocationCode::new(district_id, ward_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> AddressRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_location_accepts_strings_and_numbers() {
        let loc = location_from(&record(json!({"districtID": "1443", "wardID": 20109}))).unwrap();
        assert_eq!(loc, LocationCode::new(1443, Some("20109".into())));

        let loc = location_from(&record(json!({"districtID": 1442}))).unwrap();
        assert_eq!(loc, LocationCode::new(1442, None));
    }

    #[test]
    fn test_location_without_district_is_unresolved() {
        assert_eq!(location_from(&record(json!({"wardID": "1"}))), None);
        assert_eq!(location_from(&record(json!({"districtID": "abc"}))), None);
    }

    #[test]
    fn test_endpoint_encodes_address() {
        let client = FetchClient::new().unwrap();
        let api = RestMarketplace::new(client, "http://localhost:5000/api/").unwrap();
        let url = api.endpoint(&["cacheAddress", "1 Le Loi, Q1/2"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/cacheAddress/1%20Le%20Loi,%20Q1%2F2");
    }
}
