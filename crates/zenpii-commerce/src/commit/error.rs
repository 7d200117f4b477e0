//! Commit failures and how they are shown to the buyer.

use super::order::PaymentMethod;
use crate::checkout::{CheckoutValidation, SessionState};
use crate::payment::GatewayError;
use crate::{ApiError, CommerceError};
use rust_decimal::Decimal;
use thiserror::Error;

/// Why an order could not be committed.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommitError {
    /// One or more fields block submission.
    #[error("checkout is not ready: {0}")]
    Validation(CheckoutValidation),

    /// The quote for the latest inputs has not resolved yet.
    #[error("quote is still being computed")]
    QuoteNotReady,

    /// The action is not allowed in the session's current state.
    #[error("cannot {action} while {state}")]
    InvalidState {
        state: SessionState,
        action: &'static str,
    },

    /// The order body failed its own consistency check and was not sent.
    #[error("order amounts are inconsistent: {0}")]
    Inconsistent(CommerceError),

    /// Failed before any money moved.
    #[error("{} payment failed before charging: {source}", .method.as_str())]
    PrePayment {
        method: PaymentMethod,
        #[source]
        source: ApiError,
    },

    /// The buyer paid and no order could be created.
    #[error("{} payment {reference} was taken but the order was not created: {source}", .method.as_str())]
    PostPayment {
        method: PaymentMethod,
        reference: String,
        #[source]
        source: ApiError,
    },

    /// The gateway return could not be trusted.
    #[error("gateway return rejected: {0}")]
    Gateway(#[from] GatewayError),

    /// The gateway reported that the buyer did not pay.
    #[error("gateway reported payment not completed (code {code})")]
    PaymentNotCompleted { code: String },

    /// No pending checkout matches the gateway return.
    #[error("no pending checkout for gateway reference {0}")]
    UnknownRedirect(String),

    /// The gateway charged a different amount than was quoted.
    #[error("gateway amount {got} does not match quoted {expected}")]
    AmountMismatch { expected: Decimal, got: Decimal },

    /// Another return for the same checkout is creating the order.
    #[error("gateway reference {0} is already being processed")]
    RedirectInProgress(String),

    /// This gateway return was already turned into an order.
    #[error("gateway reference {reference} already produced order {order_id}")]
    AlreadyCompleted { reference: String, order_id: String },

    /// Pending checkout storage failed.
    #[error("checkout storage error: {0}")]
    Storage(String),
}

impl From<zenpii_cache::CacheError> for CommitError {
    fn from(e: zenpii_cache::CacheError) -> Self {
        CommitError::Storage(e.to_string())
    }
}

impl CommitError {
    /// Money may have moved without an order.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, CommitError::PostPayment { .. })
    }

    /// Whether the inline message may disappear on its own.
    pub fn is_dismissible(&self) -> bool {
        !matches!(
            self,
            CommitError::PostPayment { .. }
                | CommitError::AmountMismatch { .. }
                | CommitError::Storage(_)
        )
    }

    /// Message for the buyer.
    pub fn user_message(&self) -> String {
        match self {
            CommitError::Validation(_) => "Please check the highlighted fields.".to_string(),
            CommitError::QuoteNotReady => "Your total is still being calculated.".to_string(),
            CommitError::InvalidState { .. } => "This checkout can no longer be changed.".to_string(),
            CommitError::Inconsistent(_) => {
                "We could not verify your order total. Please try again.".to_string()
            }
            CommitError::PrePayment { source, .. } => match source {
                ApiError::Server(msg) | ApiError::Declined(msg) => msg.clone(),
                _ => "Server Error".to_string(),
            },
            CommitError::PostPayment { reference, .. } => format!(
                "Your payment was received but your order could not be created. \
                 Please contact support with reference {}.",
                reference
            ),
            CommitError::Gateway(_) | CommitError::UnknownRedirect(_) => {
                "We could not confirm this payment.".to_string()
            }
            CommitError::PaymentNotCompleted { .. } => "The payment was not completed.".to_string(),
            CommitError::AmountMismatch { .. } => {
                "The amount paid does not match your order. Please contact support.".to_string()
            }
            CommitError::RedirectInProgress(_) => {
                "Your payment is being confirmed. Please wait.".to_string()
            }
            CommitError::AlreadyCompleted { order_id, .. } => {
                format!("This payment already created order {}.", order_id)
            }
            CommitError::Storage(_) => {
                "We could not find your checkout. Please contact support.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_payment_is_sticky() {
        let err = CommitError::PostPayment {
            method: PaymentMethod::HostedCapture,
            reference: "cap_123".into(),
            source: ApiError::Timeout("create order".into()),
        };
        assert!(!err.is_dismissible());
        assert!(err.needs_reconciliation());
        assert!(err.user_message().contains("cap_123"));
    }

    #[test]
    fn test_pre_payment_server_message_passes_through() {
        let err = CommitError::PrePayment {
            method: PaymentMethod::CashOnDelivery,
            source: ApiError::Server("Cart is empty".into()),
        };
        assert!(err.is_dismissible());
        assert_eq!(err.user_message(), "Cart is empty");
        assert!(err.to_string().starts_with("cod payment failed"));
    }
}
