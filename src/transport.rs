//! Network Transport
//!
//! The seam between the orchestrator and the network, a `reqwest`
//! implementation of it, and the rules that turn a raw response into either
//! a body or a `FetchError`.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::models::FetchRequest;

/// What came back over the wire, before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// JSON body; non-JSON text is carried as a JSON string, an empty body as null
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }
}

// == Transport Trait ==
/// Issues one request. Implementations should stop waiting once `token` is
/// cancelled and report that as a transport failure.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &FetchRequest,
        token: &CancellationToken,
    ) -> Result<TransportResponse>;
}

// == Reqwest Transport ==
/// HTTP transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a client honoring `request_timeout` from the config.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &FetchRequest,
        token: &CancellationToken,
    ) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            Ok::<_, FetchError>(TransportResponse::new(status, parse_body(&text)))
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(FetchError::Transport("request cancelled".to_string())),
            result = exchange => result,
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

// == Classification ==
/// Splits a transport response into a usable body or a failure.
///
/// A JSON object carrying a non-null, non-false `error` field is an
/// application error whatever the HTTP status. Otherwise any non-2xx status
/// is a status error.
pub fn classify_response(response: TransportResponse) -> Result<Value> {
    if let Some(err) = application_error(&response) {
        return Err(err);
    }

    if !(200..300).contains(&response.status) {
        let message = match &response.body {
            Value::String(text) if !text.is_empty() => text.clone(),
            _ => format!("HTTP {}", response.status),
        };
        return Err(FetchError::Status {
            status: response.status,
            message,
        });
    }

    Ok(response.body)
}

fn application_error(response: &TransportResponse) -> Option<FetchError> {
    let object = response.body.as_object()?;
    let flag = object
        .get("error")
        .filter(|v| !v.is_null() && **v != Value::Bool(false))?;

    let error = match flag {
        Value::String(label) => label.clone(),
        Value::Bool(true) => "Error".to_string(),
        other => other.to_string(),
    };

    let message = match object.get("message") {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|p| p.as_str().map(String::from).unwrap_or_else(|| p.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        _ => error.clone(),
    };

    let status_code = object
        .get("statusCode")
        .and_then(Value::as_i64)
        .and_then(|code| i32::try_from(code).ok())
        .unwrap_or_else(|| i32::from(response.status));

    Some(FetchError::Application {
        status_code,
        error,
        message,
    })
}
