//! Commerce error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the settlement engine itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    /// Line item quantity must be positive.
    #[error("Invalid quantity for {product_id}: {quantity}")]
    InvalidQuantity { product_id: String, quantity: i64 },

    /// A sale price above the listed price.
    #[error("Sale price {sale_price} exceeds listed price {price} for {product_id}")]
    SalePriceAboveListPrice {
        product_id: String,
        price: Decimal,
        sale_price: Decimal,
    },

    /// Percent outside 0..=100.
    #[error("Percentage out of range: {0}")]
    PercentOutOfRange(Decimal),

    /// The store's level discount exceeds its commission fee.
    #[error("Negative effective commission rate {effective}% (fee {fee}%, store discount {discount}%)")]
    NegativeCommissionRate {
        effective: Decimal,
        fee: Decimal,
        discount: Decimal,
    },

    /// Cart contains items from more than one store.
    #[error("Cart mixes stores: expected {expected}, found {found}")]
    MixedStores { expected: String, found: String },

    /// `amountFromUser != amountToStore + amountToZenpii`.
    #[error("Unbalanced settlement: from user {from_user}, to store {to_store}, to platform {to_platform}")]
    UnbalancedSettlement {
        from_user: Decimal,
        to_store: Decimal,
        to_platform: Decimal,
    },

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failure of a call to an external collaborator.
///
/// Every remote call returns `Result<T, ApiError>`. A server that answers
/// with an `{"error": "..."}` body maps to [`ApiError::Server`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Non-success HTTP status.
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    /// The call timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The remote could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The server reported an error in the response body.
    #[error("Server error: {0}")]
    Server(String),

    /// The payment provider declined or cancelled the payment.
    #[error("Payment declined: {0}")]
    Declined(String),
}

impl ApiError {
    /// Whether the request may have reached the server before failing.
    ///
    /// Timeouts and dropped connections leave the outcome unknown; an
    /// explicit server rejection does not.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, ApiError::Timeout(_) | ApiError::Connection(_))
            || matches!(self, ApiError::Http { status, .. } if *status >= 500)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_unknown() {
        assert!(ApiError::Timeout("create order".into()).outcome_unknown());
        assert!(ApiError::Http { status: 502, url: "/order".into() }.outcome_unknown());
        assert!(!ApiError::Http { status: 400, url: "/order".into() }.outcome_unknown());
        assert!(!ApiError::Server("Cart is empty".into()).outcome_unknown());
    }
}
