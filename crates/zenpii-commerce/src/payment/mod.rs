//! Payment helpers: currency conversion for the hosted provider and the
//! redirect gateway's URL signing and return verification.

mod exchange;
mod gateway;

pub use exchange::{Conversion, CurrencyConverter};
pub use gateway::{GatewayError, GatewayPaymentRequest, GatewayReturn, RedirectGateway};

use crate::ids::CheckoutId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A payment opened with a hosted provider. No money has moved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentIntent {
    /// Provider's id for the payment.
    pub id: String,
    /// Amount in the provider's settlement currency.
    pub amount: Money,
    /// Checkout the intent was opened for.
    pub reference: CheckoutId,
}

/// Proof that a hosted provider captured the buyer's money.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureReceipt {
    pub intent_id: String,
    /// Provider's capture id; quoted to support on failures.
    pub capture_id: String,
    pub amount: Money,
}
