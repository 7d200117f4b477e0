//! Conversion of the buyer's charge into the hosted provider's currency.

use crate::money::{Currency, Money};
use crate::ports::ExchangeRateSource;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a conversion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Conversion {
    /// Converted amount, rounded to the target currency's minor unit.
    pub amount: Money,
    pub rate: Decimal,
    /// True when the configured fallback rate was used.
    pub used_fallback: bool,
}

/// Converts with a live rate, falling back to a configured approximate rate
/// when the rate service is unavailable.
#[derive(Clone)]
pub struct CurrencyConverter {
    source: Arc<dyn ExchangeRateSource>,
    target: Currency,
    fallback_rate: Decimal,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn ExchangeRateSource>, target: Currency, fallback_rate: Decimal) -> Self {
        Self {
            source,
            target,
            fallback_rate,
        }
    }

    pub fn target(&self) -> Currency {
        self.target
    }

    /// Convert `amount` into the target currency. Never fails.
    pub async fn convert(&self, amount: Money) -> Conversion {
        if amount.currency == self.target {
            return Conversion {
                amount: amount.rounded(),
                rate: Decimal::ONE,
                used_fallback: false,
            };
        }

        match self.source.rate(amount.currency, self.target).await {
            Ok(rate) if rate > Decimal::ZERO => {
                debug!(from = %amount.currency, to = %self.target, %rate, "exchange rate fetched");
                Conversion {
                    amount: amount.convert(rate, self.target),
                    rate,
                    used_fallback: false,
                }
            }
            Ok(rate) => self.fallback(amount, &format!("non-positive rate {}", rate)),
            Err(e) => self.fallback(amount, &e.to_string()),
        }
    }

    fn fallback(&self, amount: Money, reason: &str) -> Conversion {
        warn!(
            from = %amount.currency,
            to = %self.target,
            fallback_rate = %self.fallback_rate,
            reason,
            "exchange rate unavailable, using fallback rate"
        );
        Conversion {
            amount: amount.convert(self.fallback_rate, self.target),
            rate: self.fallback_rate,
            used_fallback: true,
        }
    }
}
