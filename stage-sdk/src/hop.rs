//! # Hop Client
//!
//! One forwarding call from a stage (or the gateway) to the next stage.
//! Every call is a single attempt bounded by the hop timeout; a failure is
//! classified and handed back as data, never retried here.

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use config_rs::ServiceConfig;
use error_handling_rs::{ErrorInfo, ErrorKind};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types_rs::wire::IMAGE_FIELD;
use shared_types_rs::{ImagePayload, StageName, REQUEST_ID_HEADER};
use thiserror::Error;
use tracing::{debug, warn};

// Longest slice of an error body quoted in a BadStatus detail
const MAX_QUOTED_BODY: usize = 200;

const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Classified failure of a single hop
#[derive(Error, Debug)]
pub enum HopError {
    #[error("{0}")]
    Unreachable(String),

    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("status code {status}: {message}")]
    BadStatus { status: u16, message: String },

    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl HopError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HopError::Unreachable(_) => ErrorKind::Unreachable,
            HopError::Timeout(_) => ErrorKind::Timeout,
            HopError::BadStatus { .. } => ErrorKind::BadStatus,
            HopError::MalformedBody(_) => ErrorKind::BadPayload,
        }
    }

    /// Attribute the failure to the stage that was called.
    pub fn into_error_info(self, target: StageName) -> ErrorInfo {
        ErrorInfo::new(self.kind(), self.to_string(), target.as_str())
    }
}

// reqwest's Display hides the root cause ("error sending request for url")
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

// Pull a readable message out of a non-success body: `{error}`, `{message}`
// or the raw text.
fn error_body_message(body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Some(text) = json
            .get("error")
            .or_else(|| json.get("message"))
            .and_then(|v| v.as_str())
        {
            return text.to_string();
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "empty body".to_string();
    }
    text.chars().take(MAX_QUOTED_BODY).collect()
}

/// Client for the hop into one stage.
#[derive(Debug, Clone)]
pub struct HopClient {
    client: Client,
    target: StageName,
    base_url: String,
    timeout: Duration,
}

impl HopClient {
    pub fn new(target: StageName, base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, target, base_url, timeout))
    }

    /// Address and timeout for `target` as `config` sees them.
    pub fn from_config(config: &ServiceConfig, target: StageName) -> Result<Self, reqwest::Error> {
        Self::new(
            target,
            config.get_client_address(target.service_key()),
            config.get_hop_timeout(target.service_key()),
        )
    }

    pub fn with_client(client: Client, target: StageName, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            target,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn target(&self) -> StageName {
        self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.base_url, self.target.endpoint())
    }

    /// Re-attach the image (and any text fields) as multipart and post it.
    pub async fn post_image<T>(
        &self,
        request_id: &str,
        image: &ImagePayload,
        fields: &[(&str, &str)],
    ) -> Result<T, ErrorInfo>
    where
        T: DeserializeOwned,
    {
        let form = fields.iter().fold(
            Form::new().part(IMAGE_FIELD, image_part(image)),
            |form, (name, value)| form.text(name.to_string(), value.to_string()),
        );

        let request = self.client.post(self.endpoint_url()).multipart(form);
        self.send(request_id, request).await
    }

    pub async fn post_json<B, T>(&self, request_id: &str, body: &B) -> Result<T, ErrorInfo>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.endpoint_url()).json(body);
        self.send(request_id, request).await
    }

    /// Whether the target answers `GET /health` with a success status.
    pub async fn probe_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.timeout.min(HEALTH_PROBE_TIMEOUT))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(target_stage = %self.target, error = %describe(&e), "Health probe failed");
                false
            }
        }
    }

    async fn send<T>(&self, request_id: &str, request: RequestBuilder) -> Result<T, ErrorInfo>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        let result = self.exchange(request_id, request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                debug!(target_stage = %self.target, elapsed_ms, "Hop completed");
                Ok(value)
            }
            Err(err) => {
                warn!(target_stage = %self.target, elapsed_ms, kind = %err.kind(), error = %err, "Hop failed");
                Err(err.into_error_info(self.target))
            }
        }
    }

    async fn exchange<T>(&self, request_id: &str, request: RequestBuilder) -> Result<T, HopError>
    where
        T: DeserializeOwned,
    {
        let response = request
            .header(REQUEST_ID_HEADER, request_id)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(HopError::BadStatus {
                status: status.as_u16(),
                message: error_body_message(&body),
            });
        }

        serde_json::from_slice::<T>(&body).map_err(|e| HopError::MalformedBody(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> HopError {
        if err.is_timeout() {
            HopError::Timeout(self.timeout)
        } else if err.is_body() || err.is_decode() {
            HopError::MalformedBody(describe(&err))
        } else {
            // connect, DNS and any other failure to get a response
            HopError::Unreachable(describe(&err))
        }
    }
}

fn image_part(image: &ImagePayload) -> Part {
    let part = || {
        Part::stream_with_length(image.bytes().clone(), image.len() as u64)
            .file_name(image.filename().to_string())
    };
    part().mime_str(image.content_type()).unwrap_or_else(|_| part())
}
