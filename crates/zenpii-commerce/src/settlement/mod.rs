//! Settlement module.
//!
//! Splits a buyer's payment into the store payout and the platform's net.

mod calculator;
mod quote;
mod rates;

pub use calculator::{
    check_commission_rate, compose_quote, compute_commission_split, compute_product_totals,
    compute_shipping_split, effective_commission_rate, settle, CommissionSplit, ProductTotals,
    ShippingSplit,
};
pub use quote::OrderQuote;
pub use rates::{CommissionRate, Level, LineItem};
