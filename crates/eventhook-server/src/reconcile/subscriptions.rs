//! Owned-subscription reconciliation.

use eventhook_remote::{
    Collection, Command, EventKind, RemoteError, RemoteSession, Subscription,
    SubscriptionCreation, Synchronization,
};

/// Event kinds this handler keeps a subscription for.
pub const OWNED_EVENT_KINDS: [EventKind; 2] = [EventKind::ItemAdding, EventKind::ItemUpdating];

/// Names of subscriptions removed and added by one reconciliation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub created: Vec<String>,
    pub deleted: Vec<String>,
}

/// Purges and registers the subscriptions claimed by an owner prefix.
///
/// A subscription is owned iff its name starts with the prefix. Owned
/// subscriptions are named `{prefix}.{event kind}`.
#[derive(Debug, Clone)]
pub struct SubscriptionReconciler {
    owner_prefix: String,
}

impl SubscriptionReconciler {
    pub fn new(owner_prefix: impl Into<String>) -> Self {
        Self {
            owner_prefix: owner_prefix.into(),
        }
    }

    pub fn subscription_name(&self, kind: EventKind) -> String {
        format!("{}.{}", self.owner_prefix, kind)
    }

    pub fn owns(&self, subscription: &Subscription) -> bool {
        subscription.is_owned_by(&self.owner_prefix)
    }

    /// Delete every owned subscription on `collection`.
    ///
    /// Loads the subscription list first if the handle does not carry it.
    /// Deletes are committed together in one round trip; nothing is
    /// committed when no owned subscription exists. On success the handle's
    /// list no longer contains owned subscriptions.
    pub async fn purge_owned(
        &self,
        session: &mut dyn RemoteSession,
        collection: &mut Collection,
    ) -> Result<Vec<String>, RemoteError> {
        let subscriptions = match collection.subscriptions.take() {
            Some(loaded) => loaded,
            None => {
                let ticket = session.enqueue(Command::LoadSubscriptions {
                    collection: collection.id.clone(),
                });
                let mut result = session.commit().await?;
                result.take(ticket)?.into_subscriptions()?
            }
        };

        // Fixed list of targets, decoupled from the handle's live list.
        let owned: Vec<Subscription> = subscriptions
            .iter()
            .filter(|s| self.owns(s))
            .cloned()
            .collect();
        collection.subscriptions = Some(subscriptions);

        if owned.is_empty() {
            return Ok(Vec::new());
        }

        for subscription in &owned {
            session.enqueue(Command::DeleteSubscription {
                collection: collection.id.clone(),
                subscription: subscription.id.clone(),
            });
        }
        session.commit().await?;

        if let Some(remaining) = collection.subscriptions.as_mut() {
            remaining.retain(|s| !self.owns(s));
        }

        let deleted: Vec<String> = owned.into_iter().map(|s| s.name).collect();
        tracing::debug!(collection = %collection.id, deleted = deleted.len(), "Owned subscriptions purged");
        Ok(deleted)
    }

    /// Replace the owned subscriptions on `collection` with one synchronous
    /// subscription per [`OWNED_EVENT_KINDS`] entry, all pointed at `endpoint`.
    ///
    /// Always purges first and commits the deletes before the creates are
    /// queued, so a stale and a fresh subscription of the same name never
    /// coexist. Repeating the call converges to the same two subscriptions.
    pub async fn register_owned(
        &self,
        session: &mut dyn RemoteSession,
        collection: &mut Collection,
        endpoint: &str,
    ) -> Result<ReconcileResult, RemoteError> {
        let deleted = self.purge_owned(session, collection).await?;

        let tickets: Vec<_> = OWNED_EVENT_KINDS
            .iter()
            .map(|&kind| {
                session.enqueue(Command::AddSubscription {
                    collection: collection.id.clone(),
                    creation: SubscriptionCreation {
                        name: self.subscription_name(kind),
                        event_kind: kind,
                        endpoint: endpoint.to_string(),
                        synchronization: Synchronization::Synchronous,
                    },
                })
            })
            .collect();
        let mut result = session.commit().await?;

        let mut created = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let subscription = result.take(ticket)?.into_subscription()?;
            created.push(subscription.name.clone());
            collection
                .subscriptions
                .get_or_insert_with(Vec::new)
                .push(subscription);
        }

        Ok(ReconcileResult { created, deleted })
    }
}
