//! # eventhook-remote
//!
//! Batched session abstraction over the remote platform that hosts the
//! watched collection.
//!
//! ## Overview
//!
//! A [`RemoteSession`] queues [`Command`]s and executes them together in one
//! round trip on [`commit`](RemoteSession::commit). Sessions are produced per
//! inbound event by a [`SessionFactory`], which returns `None` when the event
//! carries no usable context.
//!
//! ```ignore
//! use eventhook_remote::{Command, RemoteSession};
//!
//! async fn titles(session: &mut dyn RemoteSession) -> Result<usize, RemoteError> {
//!     let ticket = session.enqueue(Command::FindCollections {
//!         title: "MyList".into(),
//!         include_subscriptions: true,
//!     });
//!     let mut result = session.commit().await?;
//!     Ok(result.take(ticket)?.into_collections()?.len())
//! }
//! ```
//!
//! ## Backends
//!
//! - [`HttpSessionFactory`] ships each batch as one JSON POST to the site.
//! - [`InMemoryRemote`] keeps the object graph in process, for tests and
//!   local runs.

mod batch;
mod error;
pub mod http;
pub mod memory;
mod session;
mod types;

pub use batch::{Batch, Command, CommitResult, Reply, Ticket};
pub use error::RemoteError;
pub use http::{HttpRemoteSession, HttpSessionFactory};
pub use memory::{InMemoryRemote, InMemorySession};
pub use session::{DynSessionFactory, EventContext, RemoteSession, SessionFactory, SessionScope};
pub use types::{
    Collection, CollectionCreation, CollectionId, CollectionTemplate, EventKind, Subscription,
    SubscriptionCreation, SubscriptionId, Synchronization,
};
