//! Session and session-factory traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::batch::{Command, CommitResult, Ticket};
use crate::error::RemoteError;

/// An authenticated, batched command context against the remote object graph.
///
/// Commands are queued with [`enqueue`](RemoteSession::enqueue) and executed
/// together by [`commit`](RemoteSession::commit), in queue order, in a single
/// round trip. Committing an empty batch performs no round trip.
///
/// Sessions are released when dropped; commands still queued at that point
/// are discarded.
#[async_trait]
pub trait RemoteSession: Send {
    /// Queues a command for the next commit.
    fn enqueue(&mut self, command: Command) -> Ticket;

    /// Executes every queued command in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Rejected` if the remote refuses a command, in
    /// which case none of the batch is applied, and transport errors for
    /// failed round trips.
    async fn commit(&mut self) -> Result<CommitResult, RemoteError>;
}

/// Which site a session is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    /// The site the extension is installed into.
    HostWeb,
    /// The extension's own isolated site.
    AppWeb,
}

/// Security context of an inbound event, as handed to a [`SessionFactory`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    pub context_token: Option<String>,
    pub host_web_url: Option<String>,
    pub app_web_url: Option<String>,
}

impl EventContext {
    pub fn site_url(&self, scope: SessionScope) -> Option<&str> {
        match scope {
            SessionScope::HostWeb => self.host_web_url.as_deref(),
            SessionScope::AppWeb => self.app_web_url.as_deref(),
        }
        .filter(|url| !url.is_empty())
    }

    /// Token and site URL for `scope`, if the event carries both.
    pub fn credentials(&self, scope: SessionScope) -> Option<(&str, &str)> {
        let token = self.context_token.as_deref().filter(|t| !t.is_empty())?;
        Some((token, self.site_url(scope)?))
    }
}

/// Produces sessions for inbound events.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Opens a session scoped to `scope`.
    ///
    /// Returns `Ok(None)` when the event carries no usable context, e.g. an
    /// uninstall delivered after the extension's context was torn down.
    async fn open(
        &self,
        context: &EventContext,
        scope: SessionScope,
    ) -> Result<Option<Box<dyn RemoteSession>>, RemoteError>;
}

/// Type alias for a shareable session factory.
pub type DynSessionFactory = Arc<dyn SessionFactory>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_require_token_and_site() {
        let full = EventContext {
            context_token: Some("t".into()),
            host_web_url: Some("https://host.test/sites/a".into()),
            app_web_url: None,
        };
        assert_eq!(
            full.credentials(SessionScope::HostWeb),
            Some(("t", "https://host.test/sites/a"))
        );
        assert_eq!(full.credentials(SessionScope::AppWeb), None);

        let no_token = EventContext {
            context_token: Some(String::new()),
            ..full.clone()
        };
        assert_eq!(no_token.credentials(SessionScope::HostWeb), None);
        assert_eq!(EventContext::default().credentials(SessionScope::HostWeb), None);
    }
}
