//! Checkout session: one buyer, one cart, one store.
//!
//! The session owns the current quote. Every edit that can change an amount
//! bumps the quote generation and hands back a [`QuoteTicket`]; resolving the
//! ticket fans out to every quote input and fans back in before a quote is
//! composed, and [`CheckoutSession::apply_quote`] drops any outcome whose
//! generation is no longer current.

mod contact;
mod session;
mod validation;

pub use contact::{is_valid_address, is_valid_name, is_valid_phone, ContactInfo, ContactValidity};
pub use session::{
    BuyerAccount, CartSnapshot, CheckoutDeps, CheckoutSession, QuoteApplied, QuoteInput,
    QuoteOutcome, QuoteTicket, ResolvedQuote, SessionState, Submission,
};
pub use validation::{CheckoutValidation, RequiredField};
