//! In-process remote object graph.
//!
//! [`InMemoryRemote`] holds collections and their subscriptions behind a
//! mutex and hands out [`InMemorySession`]s that commit against it. Batches
//! are applied atomically: if any command is refused, none of the batch takes
//! effect. Every non-empty commit counts as one round trip, which makes the
//! backend suitable for asserting round-trip budgets in tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::batch::{Batch, Command, CommitResult, Reply, Ticket};
use crate::error::RemoteError;
use crate::session::{EventContext, RemoteSession, SessionFactory, SessionScope};
use crate::types::{
    Collection, CollectionCreation, CollectionId, CollectionTemplate, Subscription,
    SubscriptionCreation, SubscriptionId,
};

const FIRST_SEQUENCE_NUMBER: i32 = 10000;

#[derive(Debug, Clone)]
struct StoredCollection {
    id: CollectionId,
    title: String,
    url: String,
    template: CollectionTemplate,
    subscriptions: Vec<Subscription>,
    next_sequence: i32,
}

impl StoredCollection {
    fn to_collection(&self, include_subscriptions: bool) -> Collection {
        Collection {
            id: self.id.clone(),
            title: self.title.clone(),
            template: self.template,
            subscriptions: include_subscriptions.then(|| self.subscriptions.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct RemoteState {
    collections: Vec<StoredCollection>,
    round_trips: usize,
    fail_next: Option<String>,
}

/// Shared in-memory remote. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session directly, bypassing context checks.
    pub fn session(&self) -> InMemorySession {
        InMemorySession {
            remote: self.clone(),
            batch: Batch::new(),
        }
    }

    /// Number of round trips committed so far.
    pub fn round_trips(&self) -> usize {
        self.state.lock().round_trips
    }

    /// Makes the next non-empty commit fail with a transport error.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        self.state.lock().fail_next = Some(message.into());
    }

    /// Snapshot of every collection, subscriptions included.
    pub fn collections(&self) -> Vec<Collection> {
        self.state
            .lock()
            .collections
            .iter()
            .map(|c| c.to_collection(true))
            .collect()
    }

    /// Snapshot of the first collection titled `title`, subscriptions included.
    pub fn collection(&self, title: &str) -> Option<Collection> {
        self.state
            .lock()
            .collections
            .iter()
            .find(|c| c.title == title)
            .map(|c| c.to_collection(true))
    }

    /// Creates a collection without a round trip.
    pub fn seed_collection(&self, title: &str, template: CollectionTemplate) -> CollectionId {
        let mut state = self.state.lock();
        let stored = new_collection(&CollectionCreation {
            title: title.to_string(),
            url: title.to_string(),
            template,
        });
        let id = stored.id.clone();
        state.collections.push(stored);
        id
    }

    /// Adds a subscription without a round trip.
    pub fn seed_subscription(
        &self,
        collection: &CollectionId,
        creation: SubscriptionCreation,
    ) -> Result<Subscription, RemoteError> {
        let mut state = self.state.lock();
        let target = find_mut(&mut state.collections, collection)?;
        Ok(add_subscription(target, creation))
    }

    fn execute(&self, commands: Vec<Command>) -> Result<CommitResult, RemoteError> {
        let mut state = self.state.lock();
        state.round_trips += 1;

        if let Some(message) = state.fail_next.take() {
            return Err(RemoteError::Transport(message));
        }

        // Work on a copy so a refused command leaves the graph untouched.
        let mut collections = state.collections.clone();
        let mut replies = Vec::with_capacity(commands.len());
        for (index, command) in commands.into_iter().enumerate() {
            let op = command.name();
            let reply = apply(&mut collections, command)
                .map_err(|e| RemoteError::rejected(index, format!("{op}: {e}")))?;
            replies.push(reply);
        }
        state.collections = collections;

        Ok(CommitResult::new(replies))
    }
}

fn new_collection(creation: &CollectionCreation) -> StoredCollection {
    StoredCollection {
        id: CollectionId(Uuid::new_v4().to_string()),
        title: creation.title.clone(),
        url: creation.url.clone(),
        template: creation.template,
        subscriptions: Vec::new(),
        next_sequence: FIRST_SEQUENCE_NUMBER,
    }
}

fn add_subscription(target: &mut StoredCollection, creation: SubscriptionCreation) -> Subscription {
    let subscription = Subscription {
        id: SubscriptionId(Uuid::new_v4().to_string()),
        name: creation.name,
        event_kind: creation.event_kind,
        endpoint: creation.endpoint,
        synchronization: creation.synchronization,
        sequence_number: target.next_sequence,
    };
    target.next_sequence += 1;
    target.subscriptions.push(subscription.clone());
    subscription
}

fn find_mut<'a>(
    collections: &'a mut [StoredCollection],
    id: &CollectionId,
) -> Result<&'a mut StoredCollection, RemoteError> {
    collections
        .iter_mut()
        .find(|c| &c.id == id)
        .ok_or_else(|| RemoteError::not_found("Collection", id.to_string()))
}

fn apply(collections: &mut Vec<StoredCollection>, command: Command) -> Result<Reply, RemoteError> {
    match command {
        Command::FindCollections {
            title,
            include_subscriptions,
        } => Ok(Reply::Collections {
            collections: collections
                .iter()
                .filter(|c| c.title == title)
                .map(|c| c.to_collection(include_subscriptions))
                .collect(),
        }),
        Command::CreateCollection { creation } => {
            if collections
                .iter()
                .any(|c| c.title == creation.title || c.url == creation.url)
            {
                return Err(RemoteError::Internal(format!(
                    "A collection with title or url '{}' already exists",
                    creation.title
                )));
            }
            let stored = new_collection(&creation);
            // Freshly created collections have an empty, already loaded subscription list.
            let collection = stored.to_collection(true);
            collections.push(stored);
            Ok(Reply::Collection { collection })
        }
        Command::LoadSubscriptions { collection } => {
            let target = find_mut(collections, &collection)?;
            Ok(Reply::Subscriptions {
                subscriptions: target.subscriptions.clone(),
            })
        }
        Command::DeleteSubscription {
            collection,
            subscription,
        } => {
            let target = find_mut(collections, &collection)?;
            let position = target
                .subscriptions
                .iter()
                .position(|s| s.id == subscription)
                .ok_or_else(|| RemoteError::not_found("Subscription", subscription.to_string()))?;
            target.subscriptions.remove(position);
            Ok(Reply::Deleted)
        }
        Command::AddSubscription {
            collection,
            creation,
        } => {
            let target = find_mut(collections, &collection)?;
            if target.subscriptions.iter().any(|s| s.name == creation.name) {
                return Err(RemoteError::Internal(format!(
                    "A subscription named '{}' already exists",
                    creation.name
                )));
            }
            Ok(Reply::Subscription {
                subscription: add_subscription(target, creation),
            })
        }
    }
}

/// Session against an [`InMemoryRemote`].
#[derive(Debug)]
pub struct InMemorySession {
    remote: InMemoryRemote,
    batch: Batch,
}

#[async_trait]
impl RemoteSession for InMemorySession {
    fn enqueue(&mut self, command: Command) -> Ticket {
        self.batch.push(command)
    }

    async fn commit(&mut self) -> Result<CommitResult, RemoteError> {
        if self.batch.is_empty() {
            return Ok(CommitResult::default());
        }
        let commands = self.batch.take();
        tracing::debug!(commands = commands.len(), "Committing in-memory batch");
        self.remote.execute(commands)
    }
}

#[async_trait]
impl SessionFactory for InMemoryRemote {
    async fn open(
        &self,
        context: &EventContext,
        scope: SessionScope,
    ) -> Result<Option<Box<dyn RemoteSession>>, RemoteError> {
        if context.credentials(scope).is_none() {
            return Ok(None);
        }
        Ok(Some(Box::new(self.session())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventKind, Synchronization};

    fn creation(name: &str) -> SubscriptionCreation {
        SubscriptionCreation {
            name: name.into(),
            event_kind: EventKind::ItemAdding,
            endpoint: "https://handler.test/events".into(),
            synchronization: Synchronization::Synchronous,
        }
    }

    #[tokio::test]
    async fn commit_applies_commands_in_order() {
        let remote = InMemoryRemote::new();
        let id = remote.seed_collection("MyList", CollectionTemplate::DocumentLibrary);
        let mut session = remote.session();

        session.enqueue(Command::AddSubscription {
            collection: id.clone(),
            creation: creation("A.ItemAdding"),
        });
        let load = session.enqueue(Command::LoadSubscriptions { collection: id });
        let mut result = session.commit().await.unwrap();

        let subs = result.take(load).unwrap().into_subscriptions().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].sequence_number, FIRST_SEQUENCE_NUMBER);
        assert_eq!(remote.round_trips(), 1);
    }

    #[tokio::test]
    async fn refused_command_rolls_back_batch() {
        let remote = InMemoryRemote::new();
        let id = remote.seed_collection("MyList", CollectionTemplate::DocumentLibrary);
        remote.seed_subscription(&id, creation("A.ItemAdding")).unwrap();

        let mut session = remote.session();
        session.enqueue(Command::AddSubscription {
            collection: id.clone(),
            creation: creation("B.ItemAdding"),
        });
        session.enqueue(Command::AddSubscription {
            collection: id,
            creation: creation("A.ItemAdding"),
        });
        let err = session.commit().await.unwrap_err();

        assert!(matches!(err, RemoteError::Rejected { index: 1, .. }));
        let stored = remote.collection("MyList").unwrap();
        let names: Vec<_> = stored
            .subscriptions
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["A.ItemAdding".to_string()]);
    }

    #[tokio::test]
    async fn empty_commit_is_not_a_round_trip() {
        let remote = InMemoryRemote::new();
        let mut session = remote.session();
        let mut result = session.commit().await.unwrap();
        assert!(matches!(
            result.take(Ticket(0)),
            Err(RemoteError::ReplyMismatch(_))
        ));
        assert_eq!(remote.round_trips(), 0);
    }

    #[tokio::test]
    async fn injected_failure_hits_next_commit_only() {
        let remote = InMemoryRemote::new();
        remote.fail_next_commit("connection reset");
        let mut session = remote.session();

        session.enqueue(Command::FindCollections {
            title: "MyList".into(),
            include_subscriptions: false,
        });
        let err = session.commit().await.unwrap_err();
        assert_eq!(err.to_string(), "Remote transport error: connection reset");

        session.enqueue(Command::FindCollections {
            title: "MyList".into(),
            include_subscriptions: false,
        });
        assert!(session.commit().await.is_ok());
        assert_eq!(remote.round_trips(), 2);
    }

    #[tokio::test]
    async fn factory_requires_context() {
        let remote = InMemoryRemote::new();
        let none = remote
            .open(&EventContext::default(), SessionScope::HostWeb)
            .await
            .unwrap();
        assert!(none.is_none());

        let context = EventContext {
            context_token: Some("token".into()),
            host_web_url: Some("https://host.test".into()),
            app_web_url: None,
        };
        assert!(remote.open(&context, SessionScope::HostWeb).await.unwrap().is_some());
        assert!(remote.open(&context, SessionScope::AppWeb).await.unwrap().is_none());
    }
}
