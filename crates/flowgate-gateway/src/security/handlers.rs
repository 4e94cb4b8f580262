//! Subscription-backed default [`SecurityHandler`].
//!
//! Verifies credentials against the snapshot's subscription documents: a
//! credential passes when a usable subscription (active, owning application
//! `ACTIVE`) whose plan covers the candidate API carries a matching client
//! id (and secret, when one was supplied).
//!
//! The OAuth2 method accepts a bearer token equal to a registered client
//! secret; deployments with a real token service inject their own handler.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flowgate_kernel::{
    ApiKeyCredentials, GatewayRequest, HandlerError, SchemeOutcome, SecurityHandler, Subscription,
};
use serde_json::json;

/// Default handler resolving credentials to subscriptions.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubscriptionHandler;

impl SubscriptionHandler {
    pub fn new() -> Self {
        Self
    }

    /// Find a usable, covering subscription matching the id/secret pair.
    fn find_match<'a>(
        subscriptions: &'a [Subscription],
        api: &str,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Option<&'a Subscription> {
        subscriptions.iter().find(|sub| {
            sub.usable()
                && sub.covers(api)
                && sub.application.credentials.iter().any(|cred| {
                    cred.client_id == client_id
                        && match client_secret {
                            Some(secret) => cred.client_secret.as_deref() == Some(secret),
                            None => true,
                        }
                })
        })
    }

    fn outcome(sub: &Subscription, client_id: &str) -> SchemeOutcome {
        SchemeOutcome {
            pass: true,
            secret: Some(json!({ "client-id": client_id, "plan": sub.plan_id })),
            subscription_id: Some(sub.id.clone()),
        }
    }
}

#[async_trait]
impl SecurityHandler for SubscriptionHandler {
    async fn eval_api_key(
        &self,
        _request: &GatewayRequest,
        subscriptions: &[Subscription],
        api: &str,
        keys: &ApiKeyCredentials,
    ) -> Result<SchemeOutcome, HandlerError> {
        let Some(client_id) = keys.client_id.as_deref() else {
            return Ok(SchemeOutcome::reject());
        };
        Ok(
            match Self::find_match(subscriptions, api, client_id, keys.client_secret.as_deref()) {
                Some(sub) => Self::outcome(sub, client_id),
                None => SchemeOutcome::reject(),
            },
        )
    }

    async fn eval_basic(
        &self,
        _request: &GatewayRequest,
        subscriptions: &[Subscription],
        api: &str,
        credential: &str,
    ) -> Result<SchemeOutcome, HandlerError> {
        let encoded = credential
            .strip_prefix("Basic ")
            .ok_or_else(|| HandlerError::new("malformed basic credential"))?;
        let decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| HandlerError::new(format!("basic credential is not base64: {e}")))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| HandlerError::new("basic credential is not utf-8"))?;
        let Some((user, pass)) = decoded.split_once(':') else {
            return Ok(SchemeOutcome::reject());
        };
        Ok(match Self::find_match(subscriptions, api, user, Some(pass)) {
            Some(sub) => Self::outcome(sub, user),
            None => SchemeOutcome::reject(),
        })
    }

    async fn eval_oauth2(
        &self,
        _request: &GatewayRequest,
        subscriptions: &[Subscription],
        api: &str,
        token: &str,
    ) -> Result<SchemeOutcome, HandlerError> {
        let matched = subscriptions.iter().find(|sub| {
            sub.usable()
                && sub.covers(api)
                && sub
                    .application
                    .credentials
                    .iter()
                    .any(|cred| cred.client_secret.as_deref() == Some(token))
        });
        Ok(match matched {
            Some(sub) => {
                let client_id = sub
                    .application
                    .credentials
                    .first()
                    .map(|c| c.client_id.clone())
                    .unwrap_or_default();
                Self::outcome(sub, &client_id)
            }
            None => SchemeOutcome::reject(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use flowgate_kernel::{AppState, Application, ClientCredentials, HttpMethod};

    fn sub(id: &str, client_id: &str, secret: &str, active: bool, app_state: AppState) -> Subscription {
        Subscription {
            id: id.to_string(),
            application: Application {
                name: format!("{id}-app"),
                state: app_state,
                credentials: vec![ClientCredentials {
                    client_id: client_id.to_string(),
                    client_secret: Some(secret.to_string()),
                }],
            },
            plan_id: "gold".to_string(),
            product: "p1".to_string(),
            apis: vec!["stock".to_string()],
            active,
        }
    }

    fn req() -> GatewayRequest {
        GatewayRequest::new("r", "/stock/quote", HttpMethod::Get)
    }

    #[tokio::test]
    async fn api_key_matches_active_subscription() {
        let subs = vec![sub("s1", "id-1", "sec-1", true, AppState::Active)];
        let keys = ApiKeyCredentials {
            client_id: Some("id-1".to_string()),
            client_secret: None,
        };
        let out = SubscriptionHandler::new()
            .eval_api_key(&req(), &subs, "stock", &keys)
            .await
            .unwrap();
        assert!(out.pass);
        assert_eq!(out.subscription_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let subs = vec![sub("s1", "id-1", "sec-1", true, AppState::Active)];
        let keys = ApiKeyCredentials {
            client_id: Some("id-1".to_string()),
            client_secret: Some("wrong".to_string()),
        };
        let out = SubscriptionHandler::new()
            .eval_api_key(&req(), &subs, "stock", &keys)
            .await
            .unwrap();
        assert!(!out.pass);
    }

    #[tokio::test]
    async fn inactive_subscription_never_authenticates() {
        let subs = vec![sub("s1", "id-1", "sec-1", false, AppState::Active)];
        let keys = ApiKeyCredentials {
            client_id: Some("id-1".to_string()),
            client_secret: None,
        };
        let out = SubscriptionHandler::new()
            .eval_api_key(&req(), &subs, "stock", &keys)
            .await
            .unwrap();
        assert!(!out.pass);
    }

    #[tokio::test]
    async fn uncovered_api_is_rejected() {
        let subs = vec![sub("s1", "id-1", "sec-1", true, AppState::Active)];
        let keys = ApiKeyCredentials {
            client_id: Some("id-1".to_string()),
            client_secret: None,
        };
        let out = SubscriptionHandler::new()
            .eval_api_key(&req(), &subs, "weather", &keys)
            .await
            .unwrap();
        assert!(!out.pass);
    }

    #[tokio::test]
    async fn basic_credentials_decode_and_match() {
        let subs = vec![sub("s1", "id-1", "sec-1", true, AppState::Active)];
        let encoded = BASE64.encode("id-1:sec-1");
        let out = SubscriptionHandler::new()
            .eval_basic(&req(), &subs, "stock", &format!("Basic {encoded}"))
            .await
            .unwrap();
        assert!(out.pass);
    }

    #[tokio::test]
    async fn garbage_basic_credential_raises_a_handler_error() {
        let subs = vec![sub("s1", "id-1", "sec-1", true, AppState::Active)];
        let err = SubscriptionHandler::new()
            .eval_basic(&req(), &subs, "stock", "Basic %%%not-base64%%%")
            .await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn bearer_token_matches_client_secret() {
        let subs = vec![sub("s1", "id-1", "sec-1", true, AppState::Active)];
        let out = SubscriptionHandler::new()
            .eval_oauth2(&req(), &subs, "stock", "sec-1")
            .await
            .unwrap();
        assert!(out.pass);
        assert_eq!(out.subscription_id.as_deref(), Some("s1"));
    }
}
