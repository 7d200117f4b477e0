//! Shipping quote adapter.
//!
//! Turns an origin/destination pair into a quoted carrier fee in two remote
//! steps: pick a carrier service for the route, then price it.

mod quoter;

pub use quoter::ShippingQuoter;

use crate::config::PackageDimensions;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Carrier location codes for an address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationCode {
    pub district_id: u32,
    pub ward_code: Option<String>,
}

impl LocationCode {
    pub fn new(district_id: u32, ward_code: Option<String>) -> Self {
        Self {
            district_id,
            ward_code,
        }
    }
}

/// Fee request for one carrier service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeeRequest {
    pub service_id: u32,
    /// Declared value of the parcel.
    pub insurance_value: Decimal,
    pub coupon: Option<String>,
    pub from_district_id: u32,
    pub from_ward_code: Option<String>,
    pub to_district_id: u32,
    pub to_ward_code: Option<String>,
    pub package: PackageDimensions,
}

/// Whether a quote can be charged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuoteStatus {
    /// Priced by the carrier.
    Live,
    /// A zero placeholder shown while the carrier is unreachable.
    Degraded { reason: String },
}

/// A priced shipment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShippingQuote {
    pub origin: LocationCode,
    pub destination: LocationCode,
    pub insured_value: Decimal,
    pub carrier_service_id: u32,
    pub fee_before_discount: Decimal,
    pub status: QuoteStatus,
}

impl ShippingQuote {
    /// Only a live quote may be charged to the buyer.
    pub fn is_chargeable(&self) -> bool {
        matches!(self.status, QuoteStatus::Live)
    }
}
