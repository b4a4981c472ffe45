//! Reconciliation of this handler's subscriptions on the watched collection.
//!
//! - Collection lookup and lazy creation (locator)
//! - Purge and registration of owned subscriptions (subscriptions)

mod error;
mod locator;
mod subscriptions;

pub use error::ReconcileError;
pub use locator::{ensure_collection, find_collection};
pub use subscriptions::{OWNED_EVENT_KINDS, ReconcileResult, SubscriptionReconciler};
