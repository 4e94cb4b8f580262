//! Candidate resolution: from (method, path) to ranked operation candidates.

use crate::matcher;
use crate::snapshot::Snapshot;
use flowgate_kernel::{ApiDocument, Operation};
use serde_json::Value;

/// A single (API, path template, method) match for an incoming request.
///
/// Candidates are ephemeral and owned exclusively by the request that
/// created them.  The `auth` field is populated by the security stage.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Index of the matched API document in the snapshot.
    pub api_index: usize,
    /// The matched path template.
    pub template: String,
    /// Uppercase request method.
    pub method: String,
    /// Specificity score of the matched template.
    pub score: u32,
    /// Authorization outcome, set by the security evaluator.
    pub auth: Option<AuthOutcome>,
}

/// Result of evaluating a candidate's security requirements.
#[derive(Debug, Clone, Default)]
pub struct AuthOutcome {
    pub authenticated: bool,
    /// True when the operation declares zero security requirements — such a
    /// candidate always passes.
    pub no_security_reqs: bool,
    /// Derived secret payload from the passing scheme, if any.
    pub resolved_secret: Option<Value>,
    /// Subscription that authorized the candidate, if any.
    pub subscription_id: Option<String>,
}

impl Candidate {
    /// The matched API document within `snapshot`.
    pub fn api<'a>(&self, snapshot: &'a Snapshot) -> &'a ApiDocument {
        &snapshot.docs().apis[self.api_index]
    }

    /// The matched operation within `snapshot`.
    pub fn operation<'a>(&self, snapshot: &'a Snapshot) -> Option<&'a Operation> {
        self.api(snapshot)
            .paths
            .get(&self.template)?
            .get(&self.method)
    }

    /// Whether the security stage let this candidate through.
    pub fn authorized(&self) -> bool {
        self.auth
            .as_ref()
            .is_some_and(|a| a.authenticated || a.no_security_reqs)
    }
}

/// Resolve `(method, path)` against a snapshot into ranked candidates.
///
/// The list is ordered by descending specificity score (ties in snapshot
/// insertion order); an empty list is the normal "no API matches" outcome —
/// the pipeline maps it to an error response without invoking the security
/// evaluator.
pub fn resolve(snapshot: &Snapshot, method: &str, path: &str) -> Vec<Candidate> {
    matcher::match_entries(snapshot.entries(), method, path)
        .into_iter()
        .map(|entry| Candidate {
            api_index: entry.api_index,
            template: entry.template.clone(),
            method: method.to_uppercase(),
            score: entry.score,
            auth: None,
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use flowgate_kernel::{ApiDocument, CatalogDocuments, Operation};

    fn snapshot(apis: Vec<ApiDocument>) -> Snapshot {
        let mut docs = CatalogDocuments::new();
        for api in apis {
            docs = docs.with_api(api);
        }
        Snapshot::build(docs)
    }

    #[test]
    fn scores_are_non_increasing_and_ties_keep_insertion_order() {
        let snap = snapshot(vec![
            ApiDocument::new("a", "/v")
                .with_operation("/items/{id}", "get", Operation::new()),
            ApiDocument::new("b", "/v")
                .with_operation("/{kind}/{id}", "get", Operation::new()),
            ApiDocument::new("c", "/v")
                .with_operation("/items/{id}", "get", Operation::new()),
        ]);
        let candidates = resolve(&snap, "GET", "/v/items/42");
        assert_eq!(candidates.len(), 3);
        for pair in candidates.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // "a" and "c" tie; insertion order wins.
        let names: Vec<&str> = candidates.iter().map(|c| c.api(&snap).name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn method_disambiguates_shared_paths() {
        let snap = snapshot(vec![
            ApiDocument::new("reader", "/v").with_operation("/thing", "get", Operation::new()),
            ApiDocument::new("writer", "/v").with_operation("/thing", "post", Operation::new()),
        ]);
        let posts = resolve(&snap, "POST", "/v/thing");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].api(&snap).name, "writer");

        let gets = resolve(&snap, "GET", "/v/thing");
        assert_eq!(gets.len(), 1);
        assert_eq!(gets[0].api(&snap).name, "reader");
    }

    #[test]
    fn no_match_yields_empty_list() {
        let snap = snapshot(vec![
            ApiDocument::new("a", "/v").with_operation("/x", "get", Operation::new()),
        ]);
        assert!(resolve(&snap, "GET", "/nope").is_empty());
    }

    #[test]
    fn candidate_resolves_its_operation() {
        let op = Operation::new().with_operation_id("get-thing");
        let snap = snapshot(vec![ApiDocument::new("a", "/v").with_operation("/x", "get", op)]);
        let candidates = resolve(&snap, "get", "/v/x");
        let operation = candidates[0].operation(&snap).unwrap();
        assert_eq!(operation.operation_id.as_deref(), Some("get-thing"));
    }
}
