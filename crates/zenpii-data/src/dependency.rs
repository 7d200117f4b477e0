//! Dependency tagging for semantic categorization.

use std::time::Duration;

/// Remote dependencies of the checkout engine.
///
/// Each tag carries a default timeout and transport-level retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyTag {
    /// Buyer and store level lookups.
    Levels,
    /// Commission rate lookups.
    Commission,
    /// Address to carrier location resolution.
    AddressCache,
    /// Shipping carrier.
    Carrier,
    /// Exchange rates.
    ExchangeRate,
    /// Order creation.
    Orders,
}

impl DependencyTag {
    /// Get the default timeout for this dependency type.
    pub fn default_timeout(&self) -> Duration {
        match self {
            Self::Levels | Self::Commission | Self::AddressCache => Duration::from_secs(3),
            Self::ExchangeRate => Duration::from_secs(3),
            Self::Carrier => Duration::from_secs(5),
            Self::Orders => Duration::from_secs(15),
        }
    }

    /// Get the default transport retries for this dependency type.
    ///
    /// Quote inputs and orders are retried by the checkout engine itself,
    /// so only exchange rates are replayed here.
    pub fn default_max_retries(&self) -> u32 {
        match self {
            Self::ExchangeRate => 1,
            _ => 0,
        }
    }

    /// Get the name of this dependency.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Levels => "levels",
            Self::Commission => "commission",
            Self::AddressCache => "address_cache",
            Self::Carrier => "carrier",
            Self::ExchangeRate => "exchange_rate",
            Self::Orders => "orders",
        }
    }
}

impl std::fmt::Display for DependencyTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_retried_dependencies_have_no_transport_retries() {
        for tag in [
            DependencyTag::Levels,
            DependencyTag::Commission,
            DependencyTag::AddressCache,
            DependencyTag::Carrier,
            DependencyTag::Orders,
        ] {
            assert_eq!(tag.default_max_retries(), 0, "{}", tag);
        }
        assert_eq!(DependencyTag::ExchangeRate.default_max_retries(), 1);
    }
}
