//! Two-step shipping quote against the carrier.

use crate::config::ShippingConfig;
use crate::ports::CarrierApi;
use crate::retry::with_retries;
use crate::shipping::{FeeRequest, LocationCode, QuoteStatus, ShippingQuote};
use crate::ApiError;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};

/// Quotes shipping fees, never failing: an unreachable carrier yields a
/// degraded zero-fee quote that blocks submission.
#[derive(Clone)]
pub struct ShippingQuoter {
    carrier: Arc<dyn CarrierApi>,
    config: ShippingConfig,
    retries: u32,
}

impl ShippingQuoter {
    pub fn new(carrier: Arc<dyn CarrierApi>, config: ShippingConfig) -> Self {
        Self {
            carrier,
            config,
            retries: 1,
        }
    }

    /// Set how many times each carrier call is silently retried.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Fill unresolved store locations with the configured default.
    pub fn origin_or_default(&self, resolved: Option<LocationCode>) -> LocationCode {
        resolved.unwrap_or_else(|| LocationCode::new(self.config.default_origin_district, None))
    }

    /// Fill unresolved buyer locations with the configured default.
    pub fn destination_or_default(&self, resolved: Option<LocationCode>) -> LocationCode {
        match resolved {
            Some(LocationCode {
                district_id,
                ward_code: None,
            }) => LocationCode::new(
                district_id,
                Some(self.config.default_destination_ward.clone()),
            ),
            Some(code) => code,
            None => LocationCode::new(
                self.config.default_destination_district,
                Some(self.config.default_destination_ward.clone()),
            ),
        }
    }

    /// Quote a shipment of `insured_value` from `origin` to `destination`.
    pub async fn quote(
        &self,
        origin: LocationCode,
        destination: LocationCode,
        insured_value: Decimal,
    ) -> ShippingQuote {
        let service_id = self.select_service(&origin, &destination).await;

        let service_id = match service_id {
            Ok(id) => id,
            Err(e) => return self.degraded(origin, destination, insured_value, self.config.default_service_id, e),
        };

        let request = FeeRequest {
            service_id,
            insurance_value: insured_value,
            coupon: None,
            from_district_id: origin.district_id,
            from_ward_code: origin.ward_code.clone(),
            to_district_id: destination.district_id,
            to_ward_code: destination.ward_code.clone(),
            package: self.config.package,
        };

        let carrier = &self.carrier;
        let request_ref = &request;
        match with_retries("shipping_fee", self.retries, move || async move {
            carrier.quote_fee(request_ref).await
        })
        .await
        {
            Ok(fee) => {
                debug!(service_id, %fee, "shipping quoted");
                ShippingQuote {
                    origin,
                    destination,
                    insured_value,
                    carrier_service_id: service_id,
                    fee_before_discount: fee,
                    status: QuoteStatus::Live,
                }
            }
            Err(e) => self.degraded(origin, destination, insured_value, service_id, e),
        }
    }

    async fn select_service(
        &self,
        origin: &LocationCode,
        destination: &LocationCode,
    ) -> Result<u32, ApiError> {
        let carrier = &self.carrier;
        let (from, to) = (origin.district_id, destination.district_id);
        let services = with_retries("shipping_services", self.retries, move || async move {
            carrier.available_services(from, to).await
        })
        .await?;

        Ok(services.first().copied().unwrap_or_else(|| {
            debug!(from, to, "no carrier service listed, using default");
            self.config.default_service_id
        }))
    }

    fn degraded(
        &self,
        origin: LocationCode,
        destination: LocationCode,
        insured_value: Decimal,
        service_id: u32,
        error: ApiError,
    ) -> ShippingQuote {
        warn!(error = %error, "shipping quote degraded to zero fee");
        ShippingQuote {
            origin,
            destination,
            insured_value,
            carrier_service_id: service_id,
            fee_before_discount: Decimal::ZERO,
            status: QuoteStatus::Degraded {
                reason: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCarrier {
        services: Vec<u32>,
        fee: Option<Decimal>,
        fail_services: bool,
        requests: Mutex<Vec<FeeRequest>>,
    }

    #[async_trait]
    impl CarrierApi for FakeCarrier {
        async fn available_services(&self, _from: u32, _to: u32) -> Result<Vec<u32>, ApiError> {
            if self.fail_services {
                return Err(ApiError::Connection("carrier down".into()));
            }
            Ok(self.services.clone())
        }

        async fn quote_fee(&self, request: &FeeRequest) -> Result<Decimal, ApiError> {
            self.requests.lock().unwrap().push(request.clone());
            self.fee.ok_or_else(|| ApiError::Timeout("fee".into()))
        }
    }

    fn quoter(carrier: Arc<FakeCarrier>) -> ShippingQuoter {
        ShippingQuoter::new(carrier, ShippingConfig::default())
    }

    #[tokio::test]
    async fn test_live_quote_uses_first_service() {
        let carrier = Arc::new(FakeCarrier {
            services: vec![100039, 53320],
            fee: Some(dec!(30000)),
            ..Default::default()
        });
        let q = quoter(carrier.clone())
            .quote(LocationCode::new(1, None), LocationCode::new(2, Some("w".into())), dec!(250000))
            .await;
        assert!(q.is_chargeable());
        assert_eq!(q.carrier_service_id, 100039);
        assert_eq!(q.fee_before_discount, dec!(30000));

        let requests = carrier.requests.lock().unwrap();
        assert_eq!(requests[0].package.weight_grams, 1000);
        assert_eq!(requests[0].insurance_value, dec!(250000));
    }

    #[tokio::test]
    async fn test_default_service_when_none_listed() {
        let carrier = Arc::new(FakeCarrier {
            fee: Some(dec!(22000)),
            ..Default::default()
        });
        let q = quoter(carrier)
            .quote(LocationCode::new(1, None), LocationCode::new(2, None), dec!(1))
            .await;
        assert_eq!(q.carrier_service_id, 53321);
        assert!(q.is_chargeable());
    }

    #[tokio::test]
    async fn test_fee_failure_degrades_to_zero() {
        let carrier = Arc::new(FakeCarrier {
            services: vec![7],
            ..Default::default()
        });
        let q = quoter(carrier.clone())
            .quote(LocationCode::new(1, None), LocationCode::new(2, None), dec!(1))
            .await;
        assert!(!q.is_chargeable());
        assert_eq!(q.fee_before_discount, Decimal::ZERO);
        // one call plus one silent retry
        assert_eq!(carrier.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_service_failure_degrades_to_zero() {
        let carrier = Arc::new(FakeCarrier {
            fail_services: true,
            fee: Some(dec!(1)),
            ..Default::default()
        });
        let q = quoter(carrier)
            .quote(LocationCode::new(1, None), LocationCode::new(2, None), dec!(1))
            .await;
        assert!(matches!(q.status, QuoteStatus::Degraded { .. }));
    }

    #[test]
    fn test_location_defaults() {
        let q = quoter(Arc::new(FakeCarrier::default()));
        assert_eq!(q.origin_or_default(None).district_id, 3440);
        let dest = q.destination_or_default(None);
        assert_eq!(dest.district_id, 3695);
        assert_eq!(dest.ward_code.as_deref(), Some("90758"));
        let resolved = q.destination_or_default(Some(LocationCode::new(1442, Some("20109".into()))));
        assert_eq!(resolved.ward_code.as_deref(), Some("20109"));
    }
}
