//! Checkout settlement engine for the Zenpii marketplace.
//!
//! This crate turns a single-store cart into a committed order:
//!
//! - **Settlement**: exact-decimal split of the buyer's payment between the
//!   store payout and the platform's net
//! - **Shipping**: carrier quotes that degrade to a non-chargeable zero fee
//! - **Checkout**: the session state machine and its submission gate
//! - **Commit**: cash on delivery, hosted capture and redirect gateway paths
//!
//! Remote collaborators are reached through the traits in [`ports`].
//!
//! # Example
//!
//! ```rust,ignore
//! use zenpii_commerce::prelude::*;
//!
//! let mut session = CheckoutSession::new(deps, buyer, cart);
//! session.refresh().await?;
//!
//! let quote = session.quote().unwrap().quote;
//! println!("Total: {}", quote.charge().display());
//!
//! let order = committer.cash_on_delivery(&mut session).await?;
//! ```

pub mod checkout;
pub mod commit;
pub mod config;
pub mod error;
pub mod ids;
pub mod money;
pub mod payment;
pub mod ports;
pub mod settlement;
pub mod shipping;

mod retry;

pub use config::CheckoutConfig;
pub use error::{ApiError, CommerceError};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::CheckoutConfig;
    pub use crate::error::{ApiError, CommerceError};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Settlement
    pub use crate::settlement::{CommissionRate, Level, LineItem, OrderQuote};

    // Shipping
    pub use crate::shipping::{LocationCode, ShippingQuote, ShippingQuoter};

    // Checkout
    pub use crate::checkout::{
        BuyerAccount, CartSnapshot, CheckoutDeps, CheckoutSession, CheckoutValidation,
        ContactInfo, QuoteApplied, SessionState,
    };

    // Commit
    pub use crate::commit::{
        BuyerAuth, CommitError, Order, OrderBody, OrderCommitter, PaymentMethod, RedirectTicket,
    };

    // Payment
    pub use crate::payment::{CurrencyConverter, RedirectGateway};

    pub use crate::ports::{
        CarrierApi, ExchangeRateSource, HostedCaptureProvider, MarketplaceApi, OrderNotifier,
        ReconciliationSink,
    };
}
