//! Credential lifecycle for the dealer-management API.
//!
//! [`CredentialCache`] holds at most one access token and is the only place
//! that reads or replaces it. When the cached token is missing or inside its
//! safety margin, the next caller starts a password-grant exchange and every
//! concurrent caller awaits that same exchange (single-flight), so a burst of
//! requests never produces more than one token request.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dealerlink_core::{AuthError, Credential, DealerConfig};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::Client;

/// Obtains a fresh credential from the identity provider.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self) -> Result<Credential, AuthError>;
}

/// OAuth password grant against the fixed token endpoint.
pub struct PasswordGrant {
    http: Client,
    token_url: String,
    client_id: String,
    username: String,
    password: String,
}

impl PasswordGrant {
    pub fn new(http: Client, config: &DealerConfig) -> Self {
        Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

#[async_trait]
impl TokenExchange for PasswordGrant {
    async fn exchange(&self) -> Result<Credential, AuthError> {
        let form = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| {
                    v.get("error_description")
                        .or_else(|| v.get("error"))
                        .and_then(|m| m.as_str())
                        .map(String::from)
                })
                .unwrap_or(body);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        parse_token_response(&body)
    }
}

/// Parse `{ "access_token": "...", "expires_in": 3600 }`.
///
/// Some deployments send `expires_in` as a numeric string.
fn parse_token_response(body: &str) -> Result<Credential, AuthError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AuthError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let token = value
        .get("access_token")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::MalformedResponse("missing access_token".to_string()))?;

    let expires_in = match value.get("expires_in") {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .filter(|secs| *secs > 0)
    .ok_or_else(|| AuthError::MalformedResponse("missing or invalid expires_in".to_string()))?;

    Credential::try_issued_now(token, expires_in).ok_or_else(|| {
        AuthError::MalformedResponse(format!("expires_in {} is out of range", expires_in))
    })
}

type SharedExchange = Shared<BoxFuture<'static, Result<Credential, AuthError>>>;

#[derive(Default)]
struct CacheState {
    current: Option<Credential>,
    in_flight: Option<(u64, SharedExchange)>,
    next_exchange_id: u64,
}

/// Process-wide owner of the access credential.
pub struct CredentialCache {
    exchanger: Arc<dyn TokenExchange>,
    safety_margin: Duration,
    state: Mutex<CacheState>,
}

impl CredentialCache {
    pub fn new(exchanger: Arc<dyn TokenExchange>, safety_margin: Duration) -> Self {
        Self {
            exchanger,
            safety_margin,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Cache backed by the password grant for `config`.
    pub fn password_grant(http: Client, config: &DealerConfig) -> Self {
        Self::new(
            Arc::new(PasswordGrant::new(http, config)),
            config.token_safety_margin,
        )
    }

    /// Return a usable credential, exchanging for a new one if needed.
    ///
    /// Concurrent callers arriving while an exchange is running share its
    /// outcome. A failed exchange leaves the cache empty.
    pub async fn get_credential(&self) -> Result<Credential, AuthError> {
        let (exchange_id, exchange) = {
            let mut state = self.state.lock();

            if let Some(credential) = state.current.as_ref() {
                if credential.is_valid(self.safety_margin) {
                    return Ok(credential.clone());
                }
            }

            match state.in_flight.as_ref() {
                Some((id, exchange)) => (*id, exchange.clone()),
                None => {
                    state.next_exchange_id += 1;
                    let id = state.next_exchange_id;
                    let exchanger = self.exchanger.clone();
                    // A panic must still resolve the shared future, or every
                    // later caller would replay it.
                    let exchange = AssertUnwindSafe(async move { exchanger.exchange().await })
                        .catch_unwind()
                        .map(|outcome| {
                            outcome.unwrap_or_else(|_| {
                                Err(AuthError::Request(
                                    "credential exchange panicked".to_string(),
                                ))
                            })
                        })
                        .boxed()
                        .shared();
                    state.in_flight = Some((id, exchange.clone()));
                    tracing::debug!(exchange_id = id, "Starting credential exchange");
                    (id, exchange)
                }
            }
        };

        let result = exchange.await;

        let mut state = self.state.lock();
        // The first waiter to finish publishes the outcome.
        if state.in_flight.as_ref().map(|(id, _)| *id) == Some(exchange_id) {
            state.in_flight = None;
            match &result {
                Ok(credential) => {
                    tracing::info!(
                        expires_at = %credential.expires_at(),
                        "Obtained access credential"
                    );
                    if credential.lifetime() <= self.safety_margin {
                        tracing::warn!(
                            lifetime_secs = credential.lifetime().as_secs(),
                            safety_margin_secs = self.safety_margin.as_secs(),
                            "Credential lifetime does not exceed the safety margin; every request will re-authenticate"
                        );
                    }
                    state.current = Some(credential.clone());
                }
                Err(e) => {
                    tracing::error!(error = %e, "Credential exchange failed");
                    state.current = None;
                }
            }
        }

        result
    }

    /// Discard the cached credential unconditionally.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        if state.current.take().is_some() {
            tracing::debug!("Cached credential invalidated");
        }
    }

    /// Discard the cached credential only if it is still `rejected`.
    ///
    /// A concurrent request may already have replaced it with a fresh one.
    pub fn invalidate_credential(&self, rejected: &Credential) {
        let mut state = self.state.lock();
        if state.current.as_ref() == Some(rejected) {
            state.current = None;
            tracing::debug!("Rejected credential invalidated");
        }
    }

    /// True iff a credential is cached and outside its safety margin. No I/O.
    pub fn is_valid(&self) -> bool {
        self.state
            .lock()
            .current
            .as_ref()
            .is_some_and(|c| c.is_valid(self.safety_margin))
    }

    pub fn safety_margin(&self) -> Duration {
        self.safety_margin
    }
}
