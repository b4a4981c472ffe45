pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod reconcile;
pub mod result;
pub mod server;

use std::sync::Arc;

use eventhook_remote::{DynSessionFactory, HttpSessionFactory, InMemoryRemote, RemoteError};

pub use config::{AppConfig, LoggingConfig, ReconcileConfig, RemoteBackend, RemoteConfig, ServerConfig};
pub use dispatcher::{DispatchError, EventDispatcher, EventOutcome, InboundEvent, ReconciliationOutcome};
pub use observability::init_tracing;
pub use reconcile::{ReconcileError, SubscriptionReconciler};
pub use server::{AppState, EventhookServer, ServerBuilder, build_app};

/// Create the session factory named by `remote.backend`.
///
/// ## Backends
///
/// - **http**: each commit is POSTed to the site named by the event context
/// - **memory**: process-local object graph, lost on restart
pub fn create_session_factory(config: &RemoteConfig) -> Result<DynSessionFactory, RemoteError> {
    match config.backend {
        RemoteBackend::Http => {
            tracing::info!(
                batch_path = %config.batch_path,
                timeout_ms = config.timeout_ms,
                "Using HTTP remote sessions"
            );
            let factory = HttpSessionFactory::new(config.timeout(), config.batch_path.clone())?;
            Ok(Arc::new(factory))
        }
        RemoteBackend::Memory => {
            tracing::warn!("Using in-memory remote; subscriptions are not persisted");
            Ok(Arc::new(InMemoryRemote::new()))
        }
    }
}
