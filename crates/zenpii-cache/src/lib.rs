//! Type-safe key-value cache for Zenpii checkout.
//!
//! Values are stored as JSON in a process-local store. Named stores are
//! shared by every handle opened with the same name, so a checkout started
//! in one task can be completed by another.
//!
//! # Example
//!
//! ```rust,ignore
//! use zenpii_cache::Cache;
//! use std::time::Duration;
//!
//! let cache = Cache::open("checkout");
//!
//! cache.set_with_ttl("pending:sess_abc", &pending, Duration::from_secs(1800))?;
//! let pending: Option<PendingRedirect> = cache.get("pending:sess_abc")?;
//! cache.delete("pending:sess_abc")?;
//! ```

mod error;
mod kv;
mod session;

pub use error::CacheError;
pub use kv::Cache;
pub use session::{Session, SessionData, SessionId};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, Session, SessionId};
}
