//! HTTP-backed remote sessions.
//!
//! A commit ships the queued commands as one JSON POST to the site's batch
//! endpoint, authenticated with the inbound event's context token:
//!
//! ```text
//! POST {site}/_api/eventhook/batch
//! Authorization: Bearer <context token>
//!
//! { "commands": [ { "op": "findCollections", ... }, ... ] }
//! ```
//!
//! The remote answers with one reply per command, or with an error naming the
//! refused command:
//!
//! ```text
//! { "replies": [ { "kind": "collections", ... }, ... ] }
//! { "replies": [], "error": { "index": 1, "message": "..." } }
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::batch::{Batch, Command, CommitResult, Reply, Ticket};
use crate::error::{RemoteError, error_chain};
use crate::session::{EventContext, RemoteSession, SessionFactory, SessionScope};

pub const DEFAULT_BATCH_PATH: &str = "/_api/eventhook/batch";

#[derive(Serialize)]
struct BatchRequest<'a> {
    commands: &'a [Command],
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    replies: Vec<Reply>,
    #[serde(default)]
    error: Option<BatchFault>,
}

#[derive(Deserialize)]
struct BatchFault {
    index: usize,
    message: String,
}

/// Opens [`HttpRemoteSession`]s for events that carry a context token.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    http_client: Client,
    batch_path: String,
}

impl HttpSessionFactory {
    pub fn new(timeout: Duration, batch_path: impl Into<String>) -> Result<Self, RemoteError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            batch_path: batch_path.into(),
        })
    }
}

/// Resolves the batch endpoint beneath a site URL, keeping the site's own path.
pub fn batch_url(site: &str, batch_path: &str) -> Result<Url, RemoteError> {
    let mut base =
        Url::parse(site).map_err(|e| RemoteError::InvalidAddress(format!("{site}: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(batch_path.trim_start_matches('/'))
        .map_err(|e| RemoteError::InvalidAddress(format!("{site}: {e}")))
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    async fn open(
        &self,
        context: &EventContext,
        scope: SessionScope,
    ) -> Result<Option<Box<dyn RemoteSession>>, RemoteError> {
        let Some((token, site)) = context.credentials(scope) else {
            tracing::debug!(scope = ?scope, "Event carries no remote context");
            return Ok(None);
        };
        let url = batch_url(site, &self.batch_path)?;
        Ok(Some(Box::new(HttpRemoteSession {
            http_client: self.http_client.clone(),
            url,
            token: token.to_string(),
            batch: Batch::new(),
        })))
    }
}

/// Session that commits batches over HTTP.
pub struct HttpRemoteSession {
    http_client: Client,
    url: Url,
    token: String,
    batch: Batch,
}

impl fmt::Debug for HttpRemoteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemoteSession")
            .field("url", &self.url.as_str())
            .field("token", &"<redacted>")
            .field("batch", &self.batch)
            .finish()
    }
}

#[async_trait]
impl RemoteSession for HttpRemoteSession {
    fn enqueue(&mut self, command: Command) -> Ticket {
        self.batch.push(command)
    }

    async fn commit(&mut self) -> Result<CommitResult, RemoteError> {
        if self.batch.is_empty() {
            return Ok(CommitResult::default());
        }
        let commands = self.batch.take();
        tracing::debug!(url = %self.url, commands = commands.len(), "Committing remote batch");

        let response = self
            .http_client
            .post(self.url.clone())
            .bearer_auth(&self.token)
            .json(&BatchRequest {
                commands: &commands,
            })
            .send()
            .await
            .map_err(|e| RemoteError::Transport(error_chain(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body: BatchResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(error_chain(&e)))?;

        if let Some(fault) = body.error {
            return Err(RemoteError::rejected(fault.index, fault.message));
        }
        if body.replies.len() != commands.len() {
            return Err(RemoteError::ReplyMismatch(format!(
                "sent {} commands, received {} replies",
                commands.len(),
                body.replies.len()
            )));
        }
        Ok(CommitResult::new(body.replies))
    }
}
