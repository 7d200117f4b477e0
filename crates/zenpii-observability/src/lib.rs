//! Observability for the checkout engine.
//!
//! Every crate logs through `tracing`; this crate installs the subscriber.
//! JSON output is meant for log aggregation, human output for terminals.

mod logging;

pub use logging::*;
