//! Order commit protocol.
//!
//! Cash on delivery, hosted capture and redirect gateway all end in one
//! `createOrder` call. Once a provider has taken the buyer's money, order
//! creation is retried at most the configured number of times with the same
//! idempotency key and then escalated, never re-charged.

mod committer;
mod error;
mod notify;
mod order;
mod pending;
mod reconcile;

pub use committer::{OrderCommitter, RedirectTicket};
pub use error::CommitError;
pub use notify::{ChannelNotifier, OrderNotification, ORDER_EVENT};
pub use order::{BuyerAuth, CreatedOrder, Order, OrderBody, PaymentMethod};
pub use pending::{PendingRedirect, PendingRedirects, PendingStatus};
pub use reconcile::{CacheReconciliationQueue, ReconciliationCase};
