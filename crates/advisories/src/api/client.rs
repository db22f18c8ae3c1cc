//! HTTP client for the advisory REST API.
//!
//! Every exchange goes through [`ApiClient::send`], which attaches the bearer
//! token, tags the exchange with a correlation id in the logs, and maps
//! non-success answers onto [`ClientError`]:
//! 1. 401 becomes `SessionExpired` so callers can force a new login
//! 2. other failures become `Api { status, message }` using the body's `message`
//! 3. a 2xx body with `"success": false` is treated as a failure as well

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use rand::Rng;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Thin wrapper over `reqwest` bound to one API base URL and, once logged
/// in, one bearer token. Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl ApiClient {
    /// Creates an unauthenticated client.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.api_base_url.trim_end_matches('/')),
            token: None,
        })
    }

    /// Returns a copy of this client that sends `token` on every request.
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(Arc::from(token)),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json");
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    /// GET returning the envelope's `data` decoded as `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let body = self.send(Method::GET, path, self.request(Method::GET, path)).await?;
        decode_data(body)
    }

    /// GET for collection endpoints: a missing or null `data` is an empty list.
    pub async fn get_list<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Vec<T>> {
        let body = self.send(Method::GET, path, self.request(Method::GET, path)).await?;
        match envelope_data(body) {
            Value::Null => Ok(Vec::new()),
            data => Ok(serde_json::from_value(data)?),
        }
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let builder = self.request(Method::POST, path).json(body);
        let body = self.send(Method::POST, path, builder).await?;
        decode_data(body)
    }

    /// POST that only cares whether the server accepted the call.
    pub async fn post_empty(&self, path: &str) -> ClientResult<()> {
        self.send(Method::POST, path, self.request(Method::POST, path))
            .await
            .map(|_| ())
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let builder = self.request(Method::PUT, path).json(body);
        let body = self.send(Method::PUT, path, builder).await?;
        decode_data(body)
    }

    /// PUT whose response body is ignored.
    pub async fn put_unit<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ClientResult<()> {
        let builder = self.request(Method::PUT, path).json(body);
        self.send(Method::PUT, path, builder).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(Method::DELETE, path, self.request(Method::DELETE, path))
            .await
            .map(|_| ())
    }

    /// GET for binary documents (PDF reports).
    pub async fn get_bytes(&self, path: &str, query: &[(&str, String)]) -> ClientResult<Vec<u8>> {
        let correlation_id = generate_correlation_id();
        let start = Instant::now();
        info!(correlation_id = %correlation_id, path = %path, "GET (binary)");

        let response = self.request(Method::GET, path).query(query).send().await?;
        let response = check_status(response, &correlation_id).await?;
        let bytes = response.bytes().await?;

        info!(
            correlation_id = %correlation_id,
            bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Binary download finished"
        );
        Ok(bytes.to_vec())
    }

    /// Sends one request and returns the parsed JSON body of a success answer.
    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> ClientResult<Value> {
        let correlation_id = generate_correlation_id();
        let start = Instant::now();
        info!(correlation_id = %correlation_id, method = %method, path = %path, "API request");

        let response = builder.send().await.map_err(|e| {
            warn!(correlation_id = %correlation_id, error = %e, "Request did not reach the server");
            ClientError::from(e)
        })?;
        let response = check_status(response, &correlation_id).await?;

        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let message = message_of(&body).unwrap_or_else(|| "request was not successful".into());
            warn!(correlation_id = %correlation_id, message = %message, "API reported failure");
            return Err(ClientError::Api {
                status: StatusCode::OK.as_u16(),
                message,
            });
        }

        debug!(
            correlation_id = %correlation_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "API request finished"
        );
        Ok(body)
    }
}

/// Maps non-success statuses to errors, consuming the body for its message.
async fn check_status(response: Response, correlation_id: &str) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| message_of(&v))
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status.to_string()
            } else {
                text.clone()
            }
        });

    warn!(
        correlation_id = %correlation_id,
        status = status.as_u16(),
        message = %message,
        "API request failed"
    );

    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::SessionExpired { message });
    }
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

fn message_of(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Unwraps `{ "data": ... }`; bodies without an envelope are returned as-is.
pub fn envelope_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode_data<T: DeserializeOwned>(body: Value) -> ClientResult<T> {
    Ok(serde_json::from_value(envelope_data(body))?)
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
