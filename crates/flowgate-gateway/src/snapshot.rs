//! Immutable catalog snapshots and their reference-counted lifecycle.
//!
//! A [`Snapshot`] freezes one full catalog load: documents plus the path
//! match entries compiled from every API.  Document content never mutates
//! after build; the only mutable state is the atomic reference count, which
//! tracks in-flight requests reading the snapshot.
//!
//! [`SnapshotManager`] owns snapshot creation and the "current" pointer.
//! Loading a new catalog installs a new latest snapshot without retiring
//! older ones — requests holding a reference keep reading their version.
//! Actual retirement of idle, superseded snapshots is a policy left to an
//! external collaborator; the manager exposes refcount and is-latest via
//! [`statuses`](SnapshotManager::statuses) so it can decide.
//!
//! Acquire/release are atomic read-modify-write operations: no interleaving
//! of concurrent requests can lose an update.  [`SnapshotGuard`] ties the
//! release to `Drop`, so an aborted connection or a mid-pipeline failure
//! still returns the reference.

use crate::error::GatewayError;
use crate::matcher::MatchEntry;
use chrono::{DateTime, Utc};
use flowgate_kernel::{validate_api, CatalogDocuments};
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{error, info, warn};

/// Length of the random alphanumeric snapshot id token.
const ID_LEN: usize = 5;

// ─────────────────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// An immutable, refcounted version of the full API catalog.
pub struct Snapshot {
    id: String,
    created_at: DateTime<Utc>,
    refs: AtomicI64,
    docs: CatalogDocuments,
    entries: Vec<MatchEntry>,
}

impl Snapshot {
    /// Build a snapshot from raw catalog documents.
    ///
    /// Every API is validated and its match entries compiled exactly once
    /// here.  An API failing validation (or pattern compilation) is rejected
    /// *individually* with an error log — the rest of the catalog still
    /// loads.  The fresh snapshot starts with a zero refcount.
    pub fn build(docs: CatalogDocuments) -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(ID_LEN)
            .map(char::from)
            .collect();

        let mut kept = CatalogDocuments {
            catalogs: docs.catalogs,
            products: docs.products,
            apis: Vec::with_capacity(docs.apis.len()),
            subscriptions: docs.subscriptions,
        };
        let mut entries = Vec::new();

        for api in docs.apis {
            if let Err(e) = validate_api(&api) {
                error!(snapshot_id = %id, api = %api.name, error = %e, "rejecting API document");
                continue;
            }
            let api_index = kept.apis.len();
            let mut compiled = Vec::new();
            let mut ok = true;
            for (template, methods) in &api.paths {
                let method_names: Vec<String> = methods.keys().cloned().collect();
                match MatchEntry::compile(api_index, &api.base_path, template, method_names) {
                    Ok(entry) => compiled.push(entry),
                    Err(e) => {
                        error!(
                            snapshot_id = %id,
                            api = %api.name,
                            template = %template,
                            error = %e,
                            "rejecting API document: path template does not compile"
                        );
                        ok = false;
                        break;
                    }
                }
            }
            if ok {
                entries.extend(compiled);
                kept.apis.push(api);
            }
        }

        Self {
            id,
            created_at: Utc::now(),
            refs: AtomicI64::new(0),
            docs: kept,
            entries,
        }
    }

    /// Short random id token.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current reference count (never negative).
    pub fn refcount(&self) -> i64 {
        self.refs.load(Ordering::SeqCst)
    }

    /// The frozen document set.
    pub fn docs(&self) -> &CatalogDocuments {
        &self.docs
    }

    /// Pre-compiled match entries across all APIs, in API insertion order.
    pub fn entries(&self) -> &[MatchEntry] {
        &self.entries
    }

    fn acquire_ref(&self) {
        self.refs.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the refcount, clamped at zero.  Over-release indicates a
    /// caller bug; it is logged and otherwise a no-op.
    fn release_ref(&self) {
        let result = self
            .refs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                if n > 0 { Some(n - 1) } else { None }
            });
        if result.is_err() {
            warn!(snapshot_id = %self.id, "release of snapshot with zero refcount ignored");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SnapshotGuard
// ─────────────────────────────────────────────────────────────────────────────

/// RAII handle for one request's hold on a snapshot.
///
/// The reference is released on `Drop`, which covers every exit path of the
/// request pipeline — success, policy failure, and connection abort.
pub struct SnapshotGuard {
    snapshot: Arc<Snapshot>,
}

impl Deref for SnapshotGuard {
    type Target = Snapshot;

    fn deref(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl Drop for SnapshotGuard {
    fn drop(&mut self) {
        self.snapshot.release_ref();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SnapshotManager
// ─────────────────────────────────────────────────────────────────────────────

/// Refcount / latest view of one retained snapshot, for the external
/// retirement collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotStatus {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub refcount: i64,
    pub is_latest: bool,
}

/// Owns snapshot creation and the "current" pointer.
///
/// The manager is passed explicitly through the request pipeline — it is a
/// plain handle, never an ambient singleton.
#[derive(Default)]
pub struct SnapshotManager {
    /// Retained snapshots, oldest first; the last element is latest.
    snapshots: RwLock<Vec<Arc<Snapshot>>>,
}

impl SnapshotManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from `docs` and install it as latest.
    ///
    /// Older snapshots remain valid (and retained) while referenced.
    pub fn load(&self, docs: CatalogDocuments) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::build(docs));
        info!(
            snapshot_id = %snapshot.id(),
            apis = snapshot.docs().apis.len(),
            subscriptions = snapshot.docs().subscriptions.len(),
            "catalog snapshot installed"
        );
        let mut snapshots = self.snapshots.write();
        snapshots.push(Arc::clone(&snapshot));
        snapshot
    }

    /// Acquire the current (latest) snapshot, incrementing its refcount.
    ///
    /// Reads a cached pointer — no I/O on the steady-state path.  Fails with
    /// [`GatewayError::NoSnapshot`] when no catalog has been loaded.
    pub fn acquire_current(&self) -> Result<SnapshotGuard, GatewayError> {
        let snapshot = {
            let snapshots = self.snapshots.read();
            snapshots.last().cloned().ok_or(GatewayError::NoSnapshot)?
        };
        snapshot.acquire_ref();
        Ok(SnapshotGuard { snapshot })
    }

    /// Release one reference on the snapshot with the given id.
    ///
    /// Normally unnecessary — [`SnapshotGuard`] releases on drop — but kept
    /// for collaborators that track ids rather than guards.
    pub fn release(&self, snapshot_id: &str) {
        let snapshots = self.snapshots.read();
        match snapshots.iter().find(|s| s.id() == snapshot_id) {
            Some(s) => s.release_ref(),
            None => warn!(snapshot_id, "release of unknown snapshot ignored"),
        }
    }

    /// Refcount / is-latest view of every retained snapshot.
    pub fn statuses(&self) -> Vec<SnapshotStatus> {
        let snapshots = self.snapshots.read();
        let last = snapshots.len().saturating_sub(1);
        snapshots
            .iter()
            .enumerate()
            .map(|(i, s)| SnapshotStatus {
                id: s.id().to_string(),
                created_at: s.created_at(),
                refcount: s.refcount(),
                is_latest: i == last,
            })
            .collect()
    }

    /// Drop retained snapshots that are idle (zero refcount) and superseded.
    /// Exposed for the external retirement collaborator; never called on the
    /// request path.
    pub fn retire_idle(&self) -> usize {
        let mut snapshots = self.snapshots.write();
        let len = snapshots.len();
        if len <= 1 {
            return 0;
        }
        let latest = Arc::clone(&snapshots[len - 1]);
        let before = len;
        snapshots.retain(|s| s.refcount() > 0 || Arc::ptr_eq(s, &latest));
        before - snapshots.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
