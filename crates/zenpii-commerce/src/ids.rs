//! Newtype IDs for type-safe identifiers.
//!
//! The marketplace API hands out opaque string ids for stores, carts,
//! buyers and commissions. Wrapping each in its own type keeps a store id
//! from ever being passed where a cart id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a new locally unique ID.
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the server handed out an empty id.
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// A product listed by a store.
    ProductId, "prod"
);
define_id!(
    /// A seller's store.
    StoreId, "store"
);
define_id!(
    /// A buyer's cart. One cart holds the items of a single store.
    CartId, "cart"
);
define_id!(
    /// A registered buyer.
    UserId, "user"
);
define_id!(
    /// A commission record assigned to a store.
    CommissionId, "comm"
);
define_id!(
    /// An order persisted by the server.
    OrderId, "ord"
);
define_id!(
    /// One checkout attempt. Doubles as the idempotency key of the order it commits.
    CheckoutId, "chk"
);

/// Generate a unique ID from the clock and a process-wide counter.
fn generate_id(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

    format!("{}_{:x}{:04x}", prefix, timestamp, counter & 0xffff)
}
