//! Values materialized from the remote object graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Remote-assigned identifier of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(pub String);

/// Remote-assigned identifier of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event kinds a subscription can be bound to.
///
/// Discriminants are the platform's numeric codes; the wire form is the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ItemAdding = 1,
    ItemUpdating = 2,
    ItemDeleting = 3,
    ItemAdded = 10001,
    ItemUpdated = 10002,
    ItemDeleted = 10003,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ItemAdding => "ItemAdding",
            Self::ItemUpdating => "ItemUpdating",
            Self::ItemDeleting => "ItemDeleting",
            Self::ItemAdded => "ItemAdded",
            Self::ItemUpdated => "ItemUpdated",
            Self::ItemDeleted => "ItemDeleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Synchronization {
    Synchronous,
    Asynchronous,
}

/// Template a collection is created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionTemplate {
    GenericList = 100,
    DocumentLibrary = 101,
}

/// A registered event hook on a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub name: String,
    pub event_kind: EventKind,
    pub endpoint: String,
    pub synchronization: Synchronization,
    /// Ordering assigned by the remote on creation.
    #[serde(default)]
    pub sequence_number: i32,
}

impl Subscription {
    /// Whether the subscription was registered under the given owner prefix.
    pub fn is_owned_by(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
    }
}

/// Parameters of a subscription to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCreation {
    pub name: String,
    pub event_kind: EventKind,
    pub endpoint: String,
    pub synchronization: Synchronization,
}

/// A remote collection. `subscriptions` is `None` until loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: CollectionId,
    pub title: String,
    pub template: CollectionTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Vec<Subscription>>,
}

/// Parameters of a collection to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCreation {
    pub title: String,
    /// URL segment of the collection under its site.
    pub url: String,
    pub template: CollectionTemplate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(name: &str) -> Subscription {
        Subscription {
            id: SubscriptionId("1".into()),
            name: name.into(),
            event_kind: EventKind::ItemAdding,
            endpoint: "https://example.test/events".into(),
            synchronization: Synchronization::Synchronous,
            sequence_number: 10000,
        }
    }

    #[test]
    fn ownership_is_a_name_prefix() {
        let ours = subscription("Acme.Receivers.Handler.ItemAdding");
        let theirs = subscription("Other.Handler.ItemAdding");
        assert!(ours.is_owned_by("Acme.Receivers.Handler"));
        assert!(!theirs.is_owned_by("Acme.Receivers.Handler"));
    }

    #[test]
    fn kinds_and_templates_carry_platform_codes() {
        assert_eq!(EventKind::ItemAdding as i32, 1);
        assert_eq!(EventKind::ItemUpdated as i32, 10002);
        assert_eq!(EventKind::ItemUpdating.to_string(), "ItemUpdating");
        assert_eq!(CollectionTemplate::DocumentLibrary as i32, 101);
        assert_eq!(
            serde_json::to_value(EventKind::ItemAdding).unwrap(),
            serde_json::json!("ItemAdding")
        );
    }
}
