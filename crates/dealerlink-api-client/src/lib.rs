//! Shared HTTP client for the dealer-management API.
//!
//! [`ApiClient`] is the authenticated transport: every request asks the
//! [`CredentialCache`] for a credential, attaches it as a bearer token, and on
//! a 401/403 invalidates it and retries exactly once with a fresh one. Other
//! failures are surfaced as typed [`ApiError`]s and never retried here, since
//! only the caller knows whether an operation is idempotent.

pub mod api;
pub mod auth;

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use dealerlink_core::{ApiError, AuthError, Credential, DealerConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;

pub use api::{extract_image_id, ImageUpload};
pub use auth::{CredentialCache, PasswordGrant, TokenExchange};

/// Request body, rebuilt for every attempt since multipart forms are single-use.
#[derive(Clone, Debug)]
pub enum RequestBody {
    Json(serde_json::Value),
    Bytes {
        data: Bytes,
        content_type: String,
    },
    Multipart {
        file_field: String,
        data: Bytes,
        filename: String,
        content_type: String,
        fields: Vec<(String, String)>,
    },
}

impl RequestBody {
    fn apply(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ApiError> {
        match self {
            RequestBody::Json(value) => Ok(request.json(value)),
            RequestBody::Bytes { data, content_type } => Ok(request
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone())),
            RequestBody::Multipart {
                file_field,
                data,
                filename,
                content_type,
                fields,
            } => {
                let part = reqwest::multipart::Part::bytes(data.to_vec())
                    .file_name(filename.clone())
                    .mime_str(content_type)
                    .map_err(|e| {
                        ApiError::InvalidRequest(format!("Invalid content type: {}", e))
                    })?;
                let form = fields.iter().fold(
                    reqwest::multipart::Form::new().part(file_field.clone(), part),
                    |form, (name, value)| form.text(name.clone(), value.clone()),
                );
                Ok(request.multipart(form))
            }
        }
    }
}

/// One logical request against the remote API.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_pairs<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn json(self, body: serde_json::Value) -> Self {
        self.body(RequestBody::Json(body))
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Header override; applied after the bearer token so it can replace it.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

fn is_credential_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Authenticated HTTP client for the dealer-management API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    company_id: String,
    dealer_id: Option<String>,
    credentials: Arc<CredentialCache>,
}

impl ApiClient {
    /// Client authenticating with the password grant from `config`.
    pub fn new(config: &DealerConfig) -> Result<Self> {
        let client = build_http_client(config)?;
        let credentials = Arc::new(CredentialCache::password_grant(client.clone(), config));
        Ok(Self::from_parts(client, config, credentials))
    }

    /// Client sharing an existing credential cache.
    pub fn with_credentials(
        config: &DealerConfig,
        credentials: Arc<CredentialCache>,
    ) -> Result<Self> {
        let client = build_http_client(config)?;
        Ok(Self::from_parts(client, config, credentials))
    }

    /// Create client from environment (see [`DealerConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        let config = DealerConfig::from_env().context("Failed to load dealer configuration")?;
        Self::new(&config)
    }

    fn from_parts(client: Client, config: &DealerConfig, credentials: Arc<CredentialCache>) -> Self {
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            company_id: config.company_id.clone(),
            dealer_id: config.dealer_id.clone(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn dealer_id(&self) -> Option<&str> {
        self.dealer_id.as_deref()
    }

    pub fn credentials(&self) -> &Arc<CredentialCache> {
        &self.credentials
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, refreshing the credential once if it is rejected.
    ///
    /// Returns the JSON response body, or `Value::Null` for an empty body.
    pub async fn send(&self, request: &ApiRequest) -> Result<serde_json::Value, ApiError> {
        let credential = self.credentials.get_credential().await?;
        let response = self.attempt(request, &credential).await?;

        if !is_credential_rejection(response.status()) {
            return handle_response(response).await;
        }

        tracing::warn!(
            status = response.status().as_u16(),
            method = %request.method,
            path = %request.path,
            "Credential rejected, refreshing and retrying once"
        );
        self.credentials.invalidate_credential(&credential);

        let credential = self.credentials.get_credential().await?;
        let response = self.attempt(request, &credential).await?;

        if is_credential_rejection(response.status()) {
            let status = response.status().as_u16();
            tracing::error!(
                status,
                method = %request.method,
                path = %request.path,
                "Fresh credential rejected"
            );
            self.credentials.invalidate_credential(&credential);
            return Err(ApiError::Auth(AuthError::RejectedTwice { status }));
        }

        handle_response(response).await
    }

    async fn attempt(
        &self,
        request: &ApiRequest,
        credential: &Credential,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.build_url(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .bearer_auth(credential.token())
            .headers(request.headers.clone());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = body.apply(builder)?;
        }

        builder.send().await.map_err(|e| {
            tracing::warn!(
                error = %e,
                timeout = e.is_timeout(),
                method = %request.method,
                path = %request.path,
                "Request did not complete"
            );
            transport_error(e)
        })
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = ApiRequest::get(path).query_pairs(query.iter().map(|(k, v)| (*k, v.clone())));
        let value = self.send(&request).await?;
        decode(value)
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let value = self.send(&ApiRequest::post(path).json(body)).await?;
        decode(value)
    }

    /// PATCH JSON body and deserialize response.
    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let value = self.send(&ApiRequest::patch(path).json(body)).await?;
        decode(value)
    }

    /// DELETE request. Returns Ok(()) on success.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(&ApiRequest::delete(path)).await.map(|_| ())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("company_id", &self.company_id)
            .field("dealer_id", &self.dealer_id)
            .field("credential_valid", &self.credentials.is_valid())
            .finish()
    }
}

fn build_http_client(config: &DealerConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .build()
        .context("Failed to create HTTP client")
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_builder() {
        return ApiError::InvalidRequest(e.to_string());
    }
    ApiError::Transport {
        timeout: e.is_timeout(),
        message: e.to_string(),
    }
}

fn decode<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("Unexpected response shape: {}", e)))
}

/// Parse an HTTP response: JSON body on success, [`ApiError::Remote`] otherwise.
async fn handle_response(response: reqwest::Response) -> Result<serde_json::Value, ApiError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        return serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid JSON: {}", e)));
    }

    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body.clone()
            }
        });

    Err(ApiError::Remote {
        status: status.as_u16(),
        message,
        body: parsed,
    })
}

/// Pull a human-readable message out of a structured error body.
fn error_message(value: &serde_json::Value) -> Option<String> {
    for key in ["message", "error_description", "error", "detail"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) => return Some(s.clone()),
            Some(nested @ serde_json::Value::Object(_)) => {
                if let Some(s) = nested.get("message").and_then(|m| m.as_str()) {
                    return Some(s.to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dealerlink_core::ErrorMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Hands out token-1, token-2, ... and counts exchanges.
    #[derive(Default)]
    struct SequentialTokens {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenExchange for SequentialTokens {
        async fn exchange(&self) -> Result<Credential, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Credential::issued_now(format!("token-{}", n), 3600))
        }
    }

    fn client_for(base_url: &str) -> (ApiClient, Arc<SequentialTokens>) {
        let tokens = Arc::new(SequentialTokens::default());
        let mut config = DealerConfig::new("user", "pass", "c1");
        config.api_base_url = base_url.to_string();
        config.request_timeout = Duration::from_secs(5);
        let cache = Arc::new(CredentialCache::new(tokens.clone(), Duration::from_secs(60)));
        let client = ApiClient::with_credentials(&config, cache).unwrap();
        (client, tokens)
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/companies/c1/vehicles/v1")
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_body(r#"{"id":"v1","make":"Honda"}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, tokens) = client_for(&server.url());
        let body = client
            .send(&ApiRequest::get("/companies/c1/vehicles/v1"))
            .await
            .unwrap();

        assert_eq!(body["make"], "Honda");
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_once_after_rejection() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer token-1")
            .with_status(401)
            .with_body(r#"{"error":"token expired"}"#)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("GET", "/ping")
            .match_header("authorization", "Bearer token-2")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, tokens) = client_for(&server.url());
        let body = client.send(&ApiRequest::get("/ping")).await.unwrap();

        assert_eq!(body["ok"], true);
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 2);
        rejected.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_rejection_is_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ping")
            .with_status(403)
            .with_body(r#"{"error":"forbidden"}"#)
            .expect(2)
            .create_async()
            .await;

        let (client, tokens) = client_for(&server.url());
        let err = client
            .send(&ApiRequest::post("/ping").json(serde_json::json!({})))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Auth(AuthError::RejectedTwice { status: 403 })
        ));
        assert_eq!(err.error_code(), "AuthFailure");
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 2);
        assert!(!client.credentials().is_valid());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_error_keeps_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/companies/c1/vehicles/missing")
            .with_status(404)
            .with_body(r#"{"error":{"code":"NOT_FOUND","message":"Vehicle not found"}}"#)
            .expect(1)
            .create_async()
            .await;

        let (client, _) = client_for(&server.url());
        let err = client
            .send(&ApiRequest::get("/companies/c1/vehicles/missing"))
            .await
            .unwrap_err();

        match err {
            ApiError::Remote {
                status,
                message,
                body,
            } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Vehicle not found");
                assert_eq!(body.unwrap()["error"]["code"], "NOT_FOUND");
            }
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let (client, tokens) = client_for(&server.url());
        let err = client.send(&ApiRequest::get("/ping")).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/companies/c1/vehicles/v1/images/9")
            .with_status(204)
            .create_async()
            .await;

        let (client, _) = client_for(&server.url());
        client
            .delete("/companies/c1/vehicles/v1/images/9")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        // Nothing listens on port 1.
        let (client, _) = client_for("http://127.0.0.1:1");
        let err = client.send(&ApiRequest::get("/ping")).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { timeout: false, .. }));
        assert_eq!(err.error_code(), "TransportFailure");
    }

    #[tokio::test]
    async fn test_query_and_header_overrides() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/companies/c1/vehicles")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("make".into(), "Ford".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .match_header("x-dealer-id", "d-42")
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let (client, _) = client_for(&server.url());
        let request = ApiRequest::get("/companies/c1/vehicles")
            .query("make", "Ford")
            .query("limit", "5")
            .header(
                HeaderName::from_static("x-dealer-id"),
                HeaderValue::from_static("d-42"),
            );
        let body = client.send(&request).await.unwrap();

        assert!(body.as_array().unwrap().is_empty());
        mock.assert_async().await;
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(&serde_json::json!({ "message": "boom" })),
            Some("boom".to_string())
        );
        assert_eq!(
            error_message(&serde_json::json!({ "error": { "message": "nested" } })),
            Some("nested".to_string())
        );
        assert_eq!(error_message(&serde_json::json!({ "code": 1 })), None);
    }
}
