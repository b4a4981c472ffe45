//! Routing of inbound remote events.
//!
//! | Event | Action | Round trips |
//! |-------|--------|-------------|
//! | `AppInstalled` | ensure collection, re-register owned subscriptions | 2-4 |
//! | `AppUninstalling` | purge owned subscriptions if the collection exists | 0-2 |
//! | `ItemAdding` / `ItemUpdating` | stamp the extended description field | 0 |
//! | anything else | reject with "Unsupported event" | 0 |

use std::collections::BTreeMap;

use eventhook_api::{RemoteEventProperties, RemoteEventType};
use eventhook_remote::{DynSessionFactory, EventContext, SessionScope};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::ReconcileConfig;
use crate::reconcile::{ReconcileError, SubscriptionReconciler, ensure_collection, find_collection};

/// An inbound event, reduced to what the dispatcher acts on.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub kind: RemoteEventType,
    pub context: EventContext,
    /// Address the event was delivered to; future subscriptions point here.
    pub source_endpoint: Option<String>,
    /// Pending item fields, for item mutation events.
    pub mutable_fields: BTreeMap<String, serde_json::Value>,
}

impl InboundEvent {
    pub fn from_properties(properties: RemoteEventProperties, source_endpoint: Option<String>) -> Self {
        let app = properties.app_event_properties.unwrap_or_default();
        let item = properties.item_event_properties.unwrap_or_default();

        Self {
            kind: properties.event_type,
            context: EventContext {
                context_token: properties.context_token,
                host_web_url: app.host_web_full_url.or(item.web_url),
                app_web_url: app.app_web_full_url,
            },
            source_endpoint,
            mutable_fields: item.after_properties,
        }
    }
}

/// Successful handling of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Field assignments to apply to the item before it is committed.
    pub changed_item_properties: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The event classification is not handled.
    #[error("Unsupported event")]
    Unsupported(RemoteEventType),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type ReconciliationOutcome = Result<EventOutcome, DispatchError>;

pub struct EventDispatcher {
    sessions: DynSessionFactory,
    reconciler: SubscriptionReconciler,
    collection_title: String,
    extended_description_field: String,
}

impl EventDispatcher {
    pub fn new(sessions: DynSessionFactory, config: &ReconcileConfig) -> Self {
        Self {
            sessions,
            reconciler: SubscriptionReconciler::new(config.owner_prefix.clone()),
            collection_title: config.collection_title.clone(),
            extended_description_field: config.extended_description_field.clone(),
        }
    }

    /// Handle one event. Failures are returned, never raised past this point.
    pub async fn handle(&self, event: &InboundEvent) -> ReconciliationOutcome {
        tracing::info!(event_type = %event.kind, "Dispatching remote event");

        let outcome = match &event.kind {
            RemoteEventType::AppInstalled => self.install(event).await.map(|()| EventOutcome::default()),
            RemoteEventType::AppUninstalling => {
                self.uninstall(event).await.map(|()| EventOutcome::default())
            }
            kind if kind.is_item_mutation() => Ok(self.annotate_item()),
            other => Err(DispatchError::Unsupported(other.clone())),
        };

        match &outcome {
            Ok(_) => {}
            Err(DispatchError::Unsupported(kind)) => {
                tracing::info!(event_type = %kind, "Rejecting unsupported event");
            }
            Err(e) => {
                tracing::warn!(event_type = %event.kind, error = %e, "Event handling failed");
            }
        }
        outcome
    }

    async fn install(&self, event: &InboundEvent) -> Result<(), DispatchError> {
        let endpoint = event
            .source_endpoint
            .as_deref()
            .ok_or(ReconcileError::MissingEndpoint)?;

        let Some(mut session) = self
            .sessions
            .open(&event.context, SessionScope::HostWeb)
            .await
            .map_err(ReconcileError::from)?
        else {
            return Err(ReconcileError::NoSession {
                event: event.kind.to_string(),
            }
            .into());
        };

        let mut collection = ensure_collection(session.as_mut(), &self.collection_title)
            .await
            .map_err(ReconcileError::from)?;
        let result = self
            .reconciler
            .register_owned(session.as_mut(), &mut collection, endpoint)
            .await
            .map_err(ReconcileError::from)?;

        tracing::info!(
            collection = %collection.id,
            endpoint,
            created = result.created.len(),
            deleted = result.deleted.len(),
            "Owned subscriptions reconciled"
        );
        Ok(())
    }

    async fn uninstall(&self, event: &InboundEvent) -> Result<(), DispatchError> {
        let Some(mut session) = self
            .sessions
            .open(&event.context, SessionScope::HostWeb)
            .await
            .map_err(ReconcileError::from)?
        else {
            tracing::info!("No remote context on uninstall; nothing to clean up");
            return Ok(());
        };

        let Some(mut collection) = find_collection(session.as_mut(), &self.collection_title)
            .await
            .map_err(ReconcileError::from)?
        else {
            tracing::info!(title = %self.collection_title, "Collection not found; nothing to clean up");
            return Ok(());
        };

        let deleted = self
            .reconciler
            .purge_owned(session.as_mut(), &mut collection)
            .await
            .map_err(ReconcileError::from)?;

        tracing::info!(
            collection = %collection.id,
            deleted = deleted.len(),
            "Owned subscriptions removed"
        );
        Ok(())
    }

    fn annotate_item(&self) -> EventOutcome {
        let now = OffsetDateTime::now_utc();
        let stamp = now.format(&Rfc3339).unwrap_or_else(|_| now.to_string());

        let mut changed_item_properties = BTreeMap::new();
        changed_item_properties.insert(
            self.extended_description_field.clone(),
            format!("Changed from RER ({stamp})"),
        );
        EventOutcome {
            changed_item_properties,
        }
    }
}
