//! Contracts the engine needs from the outside world.
//!
//! The engine only depends on these traits. `zenpii-data` implements them
//! over HTTP; tests implement them in memory.

use crate::commit::{BuyerAuth, CreatedOrder, OrderBody, OrderNotification, ReconciliationCase};
use crate::ids::{CartId, CheckoutId, StoreId, UserId};
use crate::money::{Currency, Money};
use crate::payment::{CaptureReceipt, PaymentIntent};
use crate::settlement::{CommissionRate, Level};
use crate::shipping::{FeeRequest, LocationCode};
use crate::ApiError;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// The marketplace REST API.
///
/// Lookups return `Ok(None)` when the record does not exist; the engine
/// treats that as a zero discount or zero fee, not as a failure.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn store_level(&self, store_id: &StoreId) -> Result<Option<Level>, ApiError>;

    async fn buyer_level(&self, buyer_id: &UserId) -> Result<Option<Level>, ApiError>;

    async fn commission_by_store(
        &self,
        store_id: &StoreId,
    ) -> Result<Option<CommissionRate>, ApiError>;

    /// Resolve a free-text address to carrier location codes.
    async fn resolve_location(&self, address: &str) -> Result<Option<LocationCode>, ApiError>;

    /// Persist the order and consume the cart. The server is authoritative.
    async fn create_order(
        &self,
        auth: &BuyerAuth,
        cart_id: &CartId,
        body: &OrderBody,
    ) -> Result<CreatedOrder, ApiError>;
}

/// The shipping carrier's quoting API.
#[async_trait]
pub trait CarrierApi: Send + Sync {
    /// Service ids available between two districts, best first.
    async fn available_services(
        &self,
        from_district: u32,
        to_district: u32,
    ) -> Result<Vec<u32>, ApiError>;

    /// Fee for one service and package.
    async fn quote_fee(&self, request: &FeeRequest) -> Result<Decimal, ApiError>;
}

/// Exchange-rate lookups.
#[async_trait]
pub trait ExchangeRateSource: Send + Sync {
    /// Units of `to` per unit of `from`.
    async fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, ApiError>;
}

/// A hosted card/wallet payment provider.
#[async_trait]
pub trait HostedCaptureProvider: Send + Sync {
    /// Open a payment for `amount`. No money moves yet.
    async fn create_intent(
        &self,
        amount: Money,
        reference: &CheckoutId,
    ) -> Result<PaymentIntent, ApiError>;

    /// Capture an approved intent. Success means the buyer has paid.
    async fn capture(&self, intent: &PaymentIntent) -> Result<CaptureReceipt, ApiError>;
}

/// Best-effort side channel for order events.
pub trait OrderNotifier: Send + Sync {
    fn notify(&self, notification: OrderNotification);
}

/// Where paid-but-orderless checkouts go for manual or server-side repair.
#[async_trait]
pub trait ReconciliationSink: Send + Sync {
    async fn escalate(&self, case: ReconciliationCase) -> Result<(), ApiError>;
}

/// Notifier that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl OrderNotifier for NoopNotifier {
    fn notify(&self, _notification: OrderNotification) {}
}
