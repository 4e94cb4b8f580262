//! Filesystem-backed catalog loader.
//!
//! [`FileCatalogLoader`] reads every `*.json` file in one directory.  Each
//! file holds a single document with a top-level `kind` discriminator
//! (`catalog`, `product`, `api`, `subscription`).  Files are read in
//! filename order, so API insertion order — and therefore candidate
//! tie-breaking — is deterministic for a given directory.
//!
//! A file that fails to parse is skipped with a warning; the rest of the
//! catalog still loads.  Only a directory-level failure (missing directory,
//! I/O error) aborts the load.

use async_trait::async_trait;
use flowgate_kernel::{
    ApiDocument, CatalogDocument, CatalogDocuments, CatalogLoader, ConfigError, Product,
    Subscription,
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One document file, discriminated by its `kind` field.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum DocumentFile {
    Catalog(CatalogDocument),
    Product(Product),
    Api(ApiDocument),
    Subscription(Subscription),
}

/// Loads catalog documents from a directory of JSON files.
pub struct FileCatalogLoader {
    dir: PathBuf,
}

impl FileCatalogLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CatalogLoader for FileCatalogLoader {
    async fn load(&self) -> Result<CatalogDocuments, ConfigError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ConfigError::CatalogLoad(format!("{}: {e}", self.dir.display())))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ConfigError::CatalogLoad(format!("{}: {e}", self.dir.display())))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut docs = CatalogDocuments::new();
        for path in paths {
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable catalog file");
                    continue;
                }
            };
            match serde_json::from_str::<DocumentFile>(&text) {
                Ok(DocumentFile::Catalog(c)) => docs.catalogs.push(c),
                Ok(DocumentFile::Product(p)) => docs.products.push(p),
                Ok(DocumentFile::Api(a)) => docs.apis.push(a),
                Ok(DocumentFile::Subscription(s)) => docs.subscriptions.push(s),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping malformed catalog file");
                }
            }
        }

        debug!(
            dir = %self.dir.display(),
            catalogs = docs.catalogs.len(),
            products = docs.products.len(),
            apis = docs.apis.len(),
            subscriptions = docs.subscriptions.len(),
            "catalog directory loaded"
        );
        Ok(docs)
    }
}

// =============================================================================
// Tests
// =============================================================================
