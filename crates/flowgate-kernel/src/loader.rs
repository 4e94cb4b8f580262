//! Catalog loader capability.

use crate::catalog::CatalogDocuments;
use crate::error::ConfigError;
use async_trait::async_trait;

/// Kernel contract for supplying raw catalog documents.
///
/// The persistence mechanism is out of scope: implementations may read JSON
/// files, query a datastore, or synthesize documents in tests.  The snapshot
/// builder in the runtime crate calls [`load`](CatalogLoader::load) and
/// freezes the result.
#[async_trait]
pub trait CatalogLoader: Send + Sync {
    /// Produce the full document set for one snapshot build.
    async fn load(&self) -> Result<CatalogDocuments, ConfigError>;
}
