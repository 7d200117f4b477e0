//! Pending redirect checkouts, kept across the trip to the gateway.

use crate::checkout::Submission;
use crate::ids::OrderId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use zenpii_cache::{Cache, CacheError, Session, SessionId};

/// Where a redirect checkout stands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PendingStatus {
    AwaitingReturn,
    /// A verified return has claimed the record and is creating the order.
    Processing,
    Completed { order_id: OrderId },
    /// Paid without an order; handed to reconciliation.
    Escalated { reason: String },
}

/// A frozen submission waiting for the gateway to send the buyer back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRedirect {
    pub correlation_id: SessionId,
    pub submission: Submission,
    pub status: PendingStatus,
    pub created_at: DateTime<Utc>,
}

/// Store of pending redirects, keyed by correlation id.
#[derive(Clone)]
pub struct PendingRedirects {
    records: Session<PendingRedirect>,
}

impl PendingRedirects {
    /// Records expire `ttl` after they are created.
    pub fn new(cache: Cache, ttl: Duration) -> Self {
        Self {
            records: Session::new(cache, "pending_redirect").with_ttl(ttl),
        }
    }

    pub fn save(&self, record: &PendingRedirect) -> Result<(), CacheError> {
        self.records.set(&record.correlation_id, record)
    }

    pub fn load(&self, id: &SessionId) -> Result<Option<PendingRedirect>, CacheError> {
        self.records.get(id)
    }

    /// Move an awaiting record to `Processing`.
    ///
    /// Exactly one caller wins; everyone else gets the status that beat them.
    pub fn claim(&self, id: &SessionId) -> Result<Result<(), PendingStatus>, CacheError> {
        let won = self.records.try_modify(id, |r| {
            if r.status != PendingStatus::AwaitingReturn {
                return false;
            }
            r.status = PendingStatus::Processing;
            true
        })?;
        if won.is_some() {
            return Ok(Ok(()));
        }
        let current = self
            .records
            .get(id)?
            .ok_or_else(|| CacheError::NotFound(id.to_string()))?;
        Ok(Err(current.status))
    }

    pub fn mark_completed(&self, id: &SessionId, order_id: &OrderId) -> Result<(), CacheError> {
        self.records
            .modify(id, |r| {
                r.status = PendingStatus::Completed {
                    order_id: order_id.clone(),
                }
            })
            .map(|_| ())
    }

    pub fn mark_escalated(&self, id: &SessionId, reason: &str) -> Result<(), CacheError> {
        self.records
            .modify(id, |r| {
                r.status = PendingStatus::Escalated {
                    reason: reason.to_string(),
                }
            })
            .map(|_| ())
    }

    /// Forget a checkout the buyer abandoned at the gateway.
    pub fn discard(&self, id: &SessionId) -> Result<(), CacheError> {
        self.records.delete(id)
    }
}
