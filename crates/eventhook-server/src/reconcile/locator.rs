//! Lookup and lazy creation of the canonical collection.

use eventhook_remote::{
    Collection, CollectionCreation, CollectionTemplate, Command, RemoteError, RemoteSession,
};

/// Find the collection titled `title`, with its subscriptions loaded.
///
/// One round trip. Titles are compared exactly; if the remote ever returns
/// several matches the first one wins.
pub async fn find_collection(
    session: &mut dyn RemoteSession,
    title: &str,
) -> Result<Option<Collection>, RemoteError> {
    let ticket = session.enqueue(Command::FindCollections {
        title: title.to_string(),
        include_subscriptions: true,
    });
    let mut result = session.commit().await?;
    let found = result
        .take(ticket)?
        .into_collections()?
        .into_iter()
        .find(|c| c.title == title);

    Ok(found)
}

/// Find the collection titled `title`, creating it as a document library if absent.
///
/// Costs the lookup round trip, plus one more when the collection is created.
pub async fn ensure_collection(
    session: &mut dyn RemoteSession,
    title: &str,
) -> Result<Collection, RemoteError> {
    if let Some(existing) = find_collection(session, title).await? {
        tracing::debug!(collection = %existing.id, title, "Collection found");
        return Ok(existing);
    }

    let ticket = session.enqueue(Command::CreateCollection {
        creation: CollectionCreation {
            title: title.to_string(),
            url: title.to_string(),
            template: CollectionTemplate::DocumentLibrary,
        },
    });
    let mut result = session.commit().await?;
    let mut created = result.take(ticket)?.into_collection()?;
    // A new collection has no subscriptions yet.
    created.subscriptions.get_or_insert_with(Vec::new);

    tracing::info!(collection = %created.id, title, "Collection created");
    Ok(created)
}
