//! Champion selection among authorized candidates.
//!
//! The default champion is the first (highest-score) authorized candidate.
//! When several remain and the request carries an explicit plan-id hint
//! (the `x-plan-id` header), the first candidate whose authorizing
//! subscription matches the hinted plan wins instead.
//!
//! Terminal checks on the champion:
//! - security required + subscription missing/inactive/suspended owner ⇒ 401
//! - matched API suspended ⇒ 503
//! - no champion at all ⇒ 401

use crate::error::GatewayError;
use crate::resolver::Candidate;
use crate::snapshot::Snapshot;
use flowgate_kernel::ApiState;
use tracing::debug;

/// Header carrying the explicit plan-id hint.
pub const PLAN_HINT_HEADER: &str = "x-plan-id";

/// Pick the single candidate that will handle the request.
///
/// `candidates` must already be filtered to authorized ones, in descending
/// score order.
pub fn select(
    snapshot: &Snapshot,
    candidates: Vec<Candidate>,
    plan_hint: Option<&str>,
) -> Result<Candidate, GatewayError> {
    if candidates.is_empty() {
        return Err(GatewayError::Unauthorized(
            "no authorized API candidate".to_string(),
        ));
    }

    let mut chosen = 0usize;
    if candidates.len() > 1 {
        if let Some(hint) = plan_hint {
            let hinted = candidates.iter().position(|c| {
                subscription_plan(snapshot, c).is_some_and(|plan| plan == hint)
            });
            if let Some(i) = hinted {
                debug!(plan = hint, "plan hint overrides champion");
                chosen = i;
            }
        }
    }
    let champion = candidates.into_iter().nth(chosen).expect("index in range");

    // Terminal checks, authorization first: an unusable subscription is
    // reported as 401 even when the API is also suspended.
    let auth = champion.auth.clone().unwrap_or_default();
    if !auth.no_security_reqs {
        let usable = auth
            .subscription_id
            .as_deref()
            .and_then(|id| snapshot.docs().subscriptions.iter().find(|s| s.id == id))
            .is_some_and(|sub| sub.usable());
        if !usable {
            return Err(GatewayError::Unauthorized(
                "subscription is not active".to_string(),
            ));
        }
    }

    let api = champion.api(snapshot);
    if api.state == ApiState::Suspended {
        return Err(GatewayError::SuspendedApi(api.name.clone()));
    }

    Ok(champion)
}

fn subscription_plan<'a>(snapshot: &'a Snapshot, candidate: &Candidate) -> Option<&'a str> {
    let id = candidate.auth.as_ref()?.subscription_id.as_deref()?;
    snapshot
        .docs()
        .subscriptions
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.plan_id.as_str())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::AuthOutcome;
    use flowgate_kernel::{
        ApiDocument, AppState, Application, CatalogDocuments, Operation, Subscription,
    };

    fn subscription(id: &str, plan: &str, active: bool, app_state: AppState) -> Subscription {
        Subscription {
            id: id.to_string(),
            application: Application {
                name: format!("{id}-app"),
                state: app_state,
                credentials: vec![],
            },
            plan_id: plan.to_string(),
            product: "p".to_string(),
            apis: vec![],
            active,
        }
    }

    fn snapshot(apis: Vec<ApiDocument>, subs: Vec<Subscription>) -> Snapshot {
        let mut docs = CatalogDocuments::new();
        for api in apis {
            docs = docs.with_api(api);
        }
        for sub in subs {
            docs = docs.with_subscription(sub);
        }
        Snapshot::build(docs)
    }

    fn candidate(api_index: usize, score: u32, auth: AuthOutcome) -> Candidate {
        Candidate {
            api_index,
            template: "/x".to_string(),
            method: "GET".to_string(),
            score,
            auth: Some(auth),
        }
    }

    fn authenticated(sub: &str) -> AuthOutcome {
        AuthOutcome {
            authenticated: true,
            no_security_reqs: false,
            resolved_secret: None,
            subscription_id: Some(sub.to_string()),
        }
    }

    fn open() -> AuthOutcome {
        AuthOutcome {
            no_security_reqs: true,
            ..AuthOutcome::default()
        }
    }

    fn one_api(name: &str) -> ApiDocument {
        ApiDocument::new(name, format!("/{name}")).with_operation("/x", "get", Operation::new())
    }

    #[test]
    fn first_candidate_wins_by_default() {
        let snap = snapshot(vec![one_api("a"), one_api("b")], vec![]);
        let champion = select(
            &snap,
            vec![candidate(0, 5, open()), candidate(1, 1, open())],
            None,
        )
        .unwrap();
        assert_eq!(champion.api_index, 0);
    }

    #[test]
    fn plan_hint_overrides_the_champion() {
        let subs = vec![
            subscription("s-gold", "gold", true, AppState::Active),
            subscription("s-silver", "silver", true, AppState::Active),
        ];
        let snap = snapshot(vec![one_api("a"), one_api("b")], subs);
        let champion = select(
            &snap,
            vec![
                candidate(0, 5, authenticated("s-gold")),
                candidate(1, 1, authenticated("s-silver")),
            ],
            Some("silver"),
        )
        .unwrap();
        assert_eq!(champion.api_index, 1);
    }

    #[test]
    fn hint_is_ignored_for_a_single_candidate() {
        let subs = vec![subscription("s1", "gold", true, AppState::Active)];
        let snap = snapshot(vec![one_api("a")], subs);
        let champion = select(
            &snap,
            vec![candidate(0, 5, authenticated("s1"))],
            Some("silver"),
        )
        .unwrap();
        assert_eq!(champion.api_index, 0);
    }

    #[test]
    fn empty_candidates_is_unauthorized() {
        let snap = snapshot(vec![one_api("a")], vec![]);
        assert!(matches!(
            select(&snap, vec![], None),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn inactive_subscription_fails_the_champion() {
        let subs = vec![subscription("s1", "gold", false, AppState::Active)];
        let snap = snapshot(vec![one_api("a")], subs);
        assert!(matches!(
            select(&snap, vec![candidate(0, 5, authenticated("s1"))], None),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn suspended_application_fails_the_champion() {
        let subs = vec![subscription("s1", "gold", true, AppState::Suspended)];
        let snap = snapshot(vec![one_api("a")], subs);
        assert!(matches!(
            select(&snap, vec![candidate(0, 5, authenticated("s1"))], None),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn unusable_subscription_outranks_the_suspended_api_check() {
        // Both checks fail; the authorization failure is the one reported.
        let subs = vec![subscription("s1", "gold", false, AppState::Active)];
        let api = one_api("a").with_state(ApiState::Suspended);
        let snap = snapshot(vec![api], subs);
        assert!(matches!(
            select(&snap, vec![candidate(0, 5, authenticated("s1"))], None),
            Err(GatewayError::Unauthorized(_))
        ));
    }

    #[test]
    fn suspended_api_maps_to_service_unavailable() {
        let api = one_api("a").with_state(ApiState::Suspended);
        let snap = snapshot(vec![api], vec![]);
        assert!(matches!(
            select(&snap, vec![candidate(0, 5, open())], None),
            Err(GatewayError::SuspendedApi(_))
        ));
    }

    #[test]
    fn open_operation_needs_no_subscription() {
        let snap = snapshot(vec![one_api("a")], vec![]);
        assert!(select(&snap, vec![candidate(0, 0, open())], None).is_ok());
    }
}
