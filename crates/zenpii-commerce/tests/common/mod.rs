//! In-memory collaborators for checkout tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use zenpii_commerce::commit::CreatedOrder;
use zenpii_commerce::payment::{CaptureReceipt, PaymentIntent};
use zenpii_commerce::prelude::*;
use zenpii_commerce::shipping::FeeRequest;

#[derive(Default)]
pub struct FakeMarketplace {
    pub store_level: Option<Level>,
    pub buyer_level: Option<Level>,
    pub commission: Option<CommissionRate>,
    pub fail_levels: bool,
    pub fail_commission: bool,
    pub locations: HashMap<String, LocationCode>,
    /// Address whose lookup waits for the notify.
    pub slow_address: Option<(String, Arc<Notify>)>,
    pub order_results: Mutex<VecDeque<Result<CreatedOrder, ApiError>>>,
    pub orders: Mutex<Vec<OrderBody>>,
    pub level_calls: AtomicU32,
    /// `create_order` yields to the scheduler before answering.
    pub yield_on_order: bool,
}

impl FakeMarketplace {
    /// Levels and commission from the worked example.
    pub fn worked_example() -> Self {
        let mut locations = HashMap::new();
        locations.insert(STORE_ADDRESS.to_string(), LocationCode::new(1442, Some("20109".into())));
        locations.insert(BUYER_ADDRESS.to_string(), LocationCode::new(1443, Some("20201".into())));
        Self {
            store_level: Some(Level::new(100, dec!(3)).unwrap()),
            buyer_level: Some(Level::new(20, dec!(10)).unwrap()),
            commission: Some(CommissionRate::new("comm1", STORE_ID, dec!(10)).unwrap()),
            locations,
            ..Default::default()
        }
    }

    pub fn script_orders(&self, results: Vec<Result<CreatedOrder, ApiError>>) {
        self.order_results.lock().unwrap().extend(results);
    }

    pub fn order_calls(&self) -> usize {
        self.orders.lock().unwrap().len()
    }
}

#[async_trait]
impl MarketplaceApi for FakeMarketplace {
    async fn store_level(&self, _store_id: &StoreId) -> Result<Option<Level>, ApiError> {
        self.level_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_levels {
            return Err(ApiError::Timeout("store level".into()));
        }
        Ok(self.store_level.clone())
    }

    async fn buyer_level(&self, _buyer_id: &UserId) -> Result<Option<Level>, ApiError> {
        self.level_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_levels {
            return Err(ApiError::Timeout("buyer level".into()));
        }
        Ok(self.buyer_level.clone())
    }

    async fn commission_by_store(
        &self,
        _store_id: &StoreId,
    ) -> Result<Option<CommissionRate>, ApiError> {
        if self.fail_commission {
            return Err(ApiError::Http {
                status: 503,
                url: "/store/commission".into(),
            });
        }
        Ok(self.commission.clone())
    }

    async fn resolve_location(&self, address: &str) -> Result<Option<LocationCode>, ApiError> {
        if let Some((slow, gate)) = &self.slow_address {
            if slow == address {
                gate.notified().await;
            }
        }
        Ok(self.locations.get(address).cloned())
    }

    async fn create_order(
        &self,
        _auth: &BuyerAuth,
        _cart_id: &CartId,
        body: &OrderBody,
    ) -> Result<CreatedOrder, ApiError> {
        if self.yield_on_order {
            tokio::task::yield_now().await;
        }
        self.orders.lock().unwrap().push(body.clone());
        self.order_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(CreatedOrder {
                    order_id: OrderId::new("ord_1"),
                    user: Some(serde_json::json!({ "_id": "u1", "point": 12 })),
                })
            })
    }
}

/// Fee of 30,000 for the worked example, otherwise 10,000 per district digit.
pub struct FakeCarrier;

#[async_trait]
impl CarrierApi for FakeCarrier {
    async fn available_services(&self, _from: u32, _to: u32) -> Result<Vec<u32>, ApiError> {
        Ok(vec![53320])
    }

    async fn quote_fee(&self, request: &FeeRequest) -> Result<Decimal, ApiError> {
        Ok(match request.to_district_id {
            1443 => dec!(30000),
            d => Decimal::from(d) * dec!(10000),
        })
    }
}

#[derive(Default)]
pub struct FakeProvider {
    pub fail_intent: bool,
    pub fail_capture: bool,
    /// Capture times out with the outcome unknown.
    pub capture_times_out: bool,
    pub intents: AtomicU32,
    pub captures: AtomicU32,
}

#[async_trait]
impl HostedCaptureProvider for FakeProvider {
    async fn create_intent(
        &self,
        amount: Money,
        reference: &CheckoutId,
    ) -> Result<PaymentIntent, ApiError> {
        self.intents.fetch_add(1, Ordering::SeqCst);
        if self.fail_intent {
            return Err(ApiError::Connection("provider unreachable".into()));
        }
        Ok(PaymentIntent {
            id: "pi_1".into(),
            amount,
            reference: reference.clone(),
        })
    }

    async fn capture(&self, intent: &PaymentIntent) -> Result<CaptureReceipt, ApiError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.capture_times_out {
            return Err(ApiError::Timeout("capture".into()));
        }
        if self.fail_capture {
            return Err(ApiError::Declined("card declined".into()));
        }
        Ok(CaptureReceipt {
            intent_id: intent.id.clone(),
            capture_id: "cap_1".into(),
            amount: intent.amount,
        })
    }
}

pub struct FixedRate(pub Decimal);

#[async_trait]
impl ExchangeRateSource for FixedRate {
    async fn rate(&self, _from: Currency, _to: Currency) -> Result<Decimal, ApiError> {
        Ok(self.0)
    }
}

pub const STORE_ID: &str = "store1";
pub const STORE_ADDRESS: &str = "2 Hai Ba Trung, Q1";
pub const BUYER_ADDRESS: &str = "1 Le Loi, Q1";

pub fn buyer() -> BuyerAccount {
    BuyerAccount {
        auth: BuyerAuth {
            buyer_id: UserId::new("u1"),
            access_token: "token".into(),
        },
        first_name: "An".into(),
        last_name: "Tran".into(),
        phone: "0981234567".into(),
        addresses: vec![BUYER_ADDRESS.into()],
    }
}

pub fn cart() -> CartSnapshot {
    CartSnapshot {
        id: CartId::new("cart1"),
        store_id: StoreId::new(STORE_ID),
        store_address: STORE_ADDRESS.into(),
        items: vec![
            LineItem::new("x", dec!(100000), dec!(90000), 2, STORE_ID).unwrap(),
            LineItem::new("y", dec!(50000), dec!(50000), 1, STORE_ID).unwrap(),
        ],
    }
}

pub fn deps(market: Arc<FakeMarketplace>, config: CheckoutConfig) -> CheckoutDeps {
    let shipping = ShippingQuoter::new(Arc::new(FakeCarrier), config.shipping.clone());
    CheckoutDeps::new(market, shipping, config)
}

pub fn session(market: Arc<FakeMarketplace>) -> CheckoutSession {
    CheckoutSession::new(deps(market, CheckoutConfig::default()), buyer(), cart())
}
