//! Escalation of paid checkouts that have no order.

use super::order::{OrderBody, PaymentMethod};
use crate::ids::{CartId, CheckoutId, StoreId, UserId};
use crate::ports::ReconciliationSink;
use crate::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use zenpii_cache::{Cache, Session, SessionId};

/// A payment that needs an order created out of band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationCase {
    /// Provider's payment reference, shown to the buyer.
    pub reference: String,
    pub checkout_id: CheckoutId,
    pub method: PaymentMethod,
    pub buyer_id: UserId,
    pub cart_id: CartId,
    pub store_id: StoreId,
    /// The exact body that failed, idempotency key included.
    pub body: OrderBody,
    pub last_error: String,
    pub raised_at: DateTime<Utc>,
}

/// Open cases kept in the cache.
#[derive(Clone)]
pub struct CacheReconciliationQueue {
    cases: Session<Vec<ReconciliationCase>>,
}

impl CacheReconciliationQueue {
    pub fn new(cache: Cache) -> Self {
        Self {
            cases: Session::new(cache, "reconciliation"),
        }
    }

    fn queue_id() -> SessionId {
        SessionId::new("open")
    }

    pub fn open_cases(&self) -> Result<Vec<ReconciliationCase>, ApiError> {
        self.cases
            .get(&Self::queue_id())
            .map(Option::unwrap_or_default)
            .map_err(storage_error)
    }

    /// Close a case once its order exists.
    pub fn resolve(&self, reference: &str) -> Result<(), ApiError> {
        self.cases
            .update(&Self::queue_id(), |cases| cases.retain(|c| c.reference != reference))
            .map(|_| ())
            .map_err(storage_error)
    }
}

fn storage_error(e: zenpii_cache::CacheError) -> ApiError {
    ApiError::Connection(format!("reconciliation queue: {}", e))
}

#[async_trait]
impl ReconciliationSink for CacheReconciliationQueue {
    async fn escalate(&self, case: ReconciliationCase) -> Result<(), ApiError> {
        error!(
            reference = %case.reference,
            checkout = %case.checkout_id,
            buyer = %case.buyer_id,
            amount = %case.body.amount_from_user,
            "paid checkout has no order, queued for reconciliation"
        );
        self.cases
            .update(&Self::queue_id(), |cases| {
                if !cases.iter().any(|c| c.reference == case.reference) {
                    cases.push(case.clone());
                }
            })
            .map(|_| ())
            .map_err(storage_error)
    }
}
