use tracing::debug;

/// Seam for the external blob-storage collaborator. The core only ever
/// releases references it no longer needs — upload happens out of band and
/// comments carry the resulting reference opaquely.
pub trait BlobStore: Send + Sync {
    fn delete_blob(&self, reference: &str) -> anyhow::Result<()>;
}

/// Default wiring when no blob service is attached: dropping a reference
/// is a no-op.
pub struct DiscardBlobStore;

impl BlobStore for DiscardBlobStore {
    fn delete_blob(&self, reference: &str) -> anyhow::Result<()> {
        debug!("no blob store attached, dropping reference {}", reference);
        Ok(())
    }
}
