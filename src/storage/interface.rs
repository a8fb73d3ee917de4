use crate::error::ForumResult;

pub(crate) const STORAGE_ID_PREFIX: &str = "cloud://";

/// True for opaque cloud storage references such as
/// `cloud://env.bucket/images/a.jpg`. These are not fetchable by the
/// moderation provider and must be resolved first.
pub(crate) fn is_storage_id(reference: &str) -> bool {
    reference.starts_with(STORAGE_ID_PREFIX)
        && reference.len() > STORAGE_ID_PREFIX.len()
}

#[async_trait::async_trait]
pub(crate) trait StorageResolver: Send + Sync {
    /// Temporary download URL for a storage id.
    async fn resolve(&self, storage_id: &str) -> ForumResult<String>;
}

/// Returns `reference` unchanged when it is already fetchable, otherwise the
/// resolved download URL.
pub(crate) async fn fetchable_url(
    resolver: &dyn StorageResolver,
    reference: &str,
) -> ForumResult<String> {
    if is_storage_id(reference) {
        resolver.resolve(reference).await
    } else {
        Ok(reference.to_string())
    }
}
