//! HTTP adapters for the checkout engine.
//!
//! This crate provides:
//! - `FetchClient` - JSON over HTTP with per-dependency timeouts and retries
//! - `DependencyTag` - Semantic dependency categories
//! - `RestMarketplace` - Levels, commissions, address cache and order creation
//! - `GhnCarrier` - Carrier service lookup and fee quotes
//! - `ExchangeRateApi` - Live exchange rates

mod carrier;
mod client;
mod config;
mod dependency;
mod exchange;
mod marketplace;
mod retry;
mod timeout;

pub use carrier::GhnCarrier;
pub use client::*;
pub use config::{ApiConfig, CarrierConfig};
pub use dependency::*;
pub use exchange::ExchangeRateApi;
pub use marketplace::RestMarketplace;
pub use retry::*;
pub use timeout::*;
