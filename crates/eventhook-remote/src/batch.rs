//! Command batches and their replies.
//!
//! A session queues [`Command`]s into a [`Batch`]; committing the batch executes
//! every queued command in one round trip, in queue order, and yields one
//! [`Reply`] per command. The [`Ticket`] returned on enqueue retrieves that
//! command's reply from the [`CommitResult`].

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::types::{
    Collection, CollectionCreation, CollectionId, Subscription, SubscriptionCreation,
    SubscriptionId,
};

/// A read or mutation queued against the remote object graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Command {
    /// Collections whose title equals `title` exactly.
    #[serde(rename_all = "camelCase")]
    FindCollections {
        title: String,
        include_subscriptions: bool,
    },
    CreateCollection { creation: CollectionCreation },
    LoadSubscriptions { collection: CollectionId },
    DeleteSubscription {
        collection: CollectionId,
        subscription: SubscriptionId,
    },
    AddSubscription {
        collection: CollectionId,
        creation: SubscriptionCreation,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FindCollections { .. } => "findCollections",
            Self::CreateCollection { .. } => "createCollection",
            Self::LoadSubscriptions { .. } => "loadSubscriptions",
            Self::DeleteSubscription { .. } => "deleteSubscription",
            Self::AddSubscription { .. } => "addSubscription",
        }
    }
}

/// Outcome of one committed command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Reply {
    Collections { collections: Vec<Collection> },
    Collection { collection: Collection },
    Subscriptions { subscriptions: Vec<Subscription> },
    Subscription { subscription: Subscription },
    Deleted,
}

impl Reply {
    pub fn into_collections(self) -> Result<Vec<Collection>, RemoteError> {
        match self {
            Self::Collections { collections } => Ok(collections),
            other => Err(mismatch("collections", &other)),
        }
    }

    pub fn into_collection(self) -> Result<Collection, RemoteError> {
        match self {
            Self::Collection { collection } => Ok(collection),
            other => Err(mismatch("collection", &other)),
        }
    }

    pub fn into_subscriptions(self) -> Result<Vec<Subscription>, RemoteError> {
        match self {
            Self::Subscriptions { subscriptions } => Ok(subscriptions),
            other => Err(mismatch("subscriptions", &other)),
        }
    }

    pub fn into_subscription(self) -> Result<Subscription, RemoteError> {
        match self {
            Self::Subscription { subscription } => Ok(subscription),
            other => Err(mismatch("subscription", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Reply) -> RemoteError {
    RemoteError::ReplyMismatch(format!("expected {expected}, got {got:?}"))
}

/// Position of a command within the batch it was queued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(pub(crate) usize);

impl Ticket {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Commands queued since the last commit.
///
/// Dropping a batch with queued commands discards them.
#[derive(Debug, Default)]
pub struct Batch {
    commands: Vec<Command>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) -> Ticket {
        self.commands.push(command);
        Ticket(self.commands.len() - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Removes and returns every queued command, leaving the batch empty.
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        if !self.commands.is_empty() {
            tracing::warn!(
                discarded = self.commands.len(),
                "Remote session released with uncommitted commands"
            );
        }
    }
}

/// Replies of one committed batch, indexed by [`Ticket`].
#[derive(Debug, Default)]
pub struct CommitResult {
    replies: Vec<Option<Reply>>,
}

impl CommitResult {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into_iter().map(Some).collect(),
        }
    }

    /// Takes the reply for `ticket`. Each reply can be taken once.
    pub fn take(&mut self, ticket: Ticket) -> Result<Reply, RemoteError> {
        self.replies
            .get_mut(ticket.index())
            .and_then(Option::take)
            .ok_or_else(|| {
                RemoteError::ReplyMismatch(format!("no reply for command #{}", ticket.index()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tickets_follow_queue_order() {
        let mut batch = Batch::new();
        let first = batch.push(Command::LoadSubscriptions {
            collection: CollectionId("a".into()),
        });
        let second = batch.push(Command::LoadSubscriptions {
            collection: CollectionId("b".into()),
        });
        assert_eq!(first.index(), 0);
        assert_eq!(second.index(), 1);
        assert_eq!(batch.take().len(), 2);
        assert!(batch.is_empty());
    }

    #[test]
    fn reply_can_be_taken_once() {
        let mut batch = Batch::new();
        let ticket = batch.push(Command::DeleteSubscription {
            collection: CollectionId("c".into()),
            subscription: SubscriptionId("s".into()),
        });
        batch.take();

        let mut result = CommitResult::new(vec![Reply::Deleted]);
        assert_eq!(result.take(ticket).unwrap(), Reply::Deleted);
        assert!(matches!(
            result.take(ticket),
            Err(RemoteError::ReplyMismatch(_))
        ));
    }

    #[test]
    fn wrong_reply_kind_is_a_mismatch() {
        let err = Reply::Deleted.into_collection().unwrap_err();
        assert!(matches!(err, RemoteError::ReplyMismatch(_)));
    }

    #[test]
    fn command_wire_shape() {
        let cmd = Command::FindCollections {
            title: "MyList".into(),
            include_subscriptions: true,
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({ "op": "findCollections", "title": "MyList", "includeSubscriptions": true })
        );
        assert_eq!(serde_json::to_value(Reply::Deleted).unwrap(), json!({ "kind": "deleted" }));
    }
}
