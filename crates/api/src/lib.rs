//! Remote variable client.
//!
//! This crate talks to the regional variable API on behalf of the widget:
//!
//! - Mapping a region code to its base endpoint ([`endpoint`])
//! - Reading a variable (`GET /organization/{org}/cad-variable/{id}`)
//! - Writing a new default value (`PUT` on the same resource)
//! - Normalizing transport and HTTP failures into [`ApiError`]
//!
//! Both operations are stateless functions of a [`Configuration`] snapshot
//! (plus the new value for writes), so callers never hold session state.
//! The [`VariableApi`] trait is the seam the widget driver depends on;
//! [`VariableClient`] is the `reqwest` implementation.
//!
//! # Example
//!
//! ```ignore
//! use advisory_api::{ClientOptions, VariableApi, VariableClient};
//!
//! let client = VariableClient::new(ClientOptions::default())?;
//! let variable = client.fetch_variable(&config).await?;
//! println!("{}", variable.default_value);
//! ```

use std::env;
use std::time::Duration;

use advisory_types::{ApiError, Configuration, RemoteVariable, VariablePayload, VariableUpdate, normalize_region};
use advisory_util::redact_sensitive;
use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Environment variable overriding the regional endpoint (local testing).
pub const BASE_URL_ENV: &str = "ADVISORY_API_BASE";

/// Upper bound for a single request when the host does not choose one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Allowed base domains for non-local overrides. Subdomains are allowed too.
const ALLOWED_API_DOMAINS: &[&str] = &["cisco.com"];
/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Base endpoint for a region code.
///
/// The code is lower-cased and substituted as-is; unknown regions are not
/// rejected because the service may add regions at any time. A blank code
/// selects the default region.
///
/// ```rust
/// assert_eq!(advisory_api::endpoint("EU2"), "https://api.wxcc-eu2.cisco.com");
/// assert_eq!(advisory_api::endpoint(""), "https://api.wxcc-us1.cisco.com");
/// ```
pub fn endpoint(region: &str) -> String {
    format!("https://api.wxcc-{}.cisco.com", normalize_region(Some(region)))
}

/// Operations the widget needs from the remote variable service.
#[async_trait]
pub trait VariableApi: Send + Sync {
    /// Read the current variable. Absent payload fields become placeholders.
    async fn fetch_variable(&self, config: &Configuration) -> Result<RemoteVariable, ApiError>;

    /// Replace the variable's default value. The response body is ignored;
    /// callers re-fetch to observe the stored state.
    async fn put_variable(&self, config: &Configuration, new_value: &str) -> Result<(), ApiError>;
}

/// Construction options for [`VariableClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Replaces the regional endpoint when set. Validated on construction.
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for the variable API.
pub struct VariableClient {
    http: Client,
    base_override: Option<String>,
    request_timeout: Duration,
    user_agent: String,
}

impl VariableClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        if let Some(base) = options.base_url.as_deref() {
            validate_base_url(base)?;
        }

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(options.request_timeout)
            .build()
            .context("build http client")?;

        Ok(Self {
            http,
            base_override: options.base_url.map(|base| base.trim_end_matches('/').to_string()),
            request_timeout: options.request_timeout,
            user_agent: format!("advisory-widget/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Base URL used for `config`: the override when present, otherwise the
    /// regional endpoint.
    pub fn base_url(&self, config: &Configuration) -> String {
        match &self.base_override {
            Some(base) => base.clone(),
            None => endpoint(&config.region),
        }
    }

    /// Full resource URL of the configured variable.
    pub fn variable_url(&self, config: &Configuration) -> String {
        format!(
            "{}/organization/{}/cad-variable/{}",
            self.base_url(config),
            utf8_percent_encode(&config.organization_id, PATH_SEGMENT),
            utf8_percent_encode(&config.variable_id, PATH_SEGMENT),
        )
    }

    fn request(&self, method: Method, config: &Configuration) -> RequestBuilder {
        let url = self.variable_url(config);
        debug!(%method, %url, "building request");

        self.http
            .request(method, url)
            .bearer_auth(&config.credential)
            .header(header::USER_AGENT, &self.user_agent)
    }

    fn transport_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::transport(format!("request timed out after {}s", self.request_timeout.as_secs_f32()))
        } else if error.is_connect() {
            ApiError::transport(format!("connection failed: {error}"))
        } else {
            ApiError::transport(format!("network error: {error}"))
        }
    }
}

#[async_trait]
impl VariableApi for VariableClient {
    async fn fetch_variable(&self, config: &Configuration) -> Result<RemoteVariable, ApiError> {
        ensure_complete(config)?;
        let response = self
            .request(Method::GET, config)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;
        let response = ensure_success(response).await?;
        let text = response.text().await.map_err(|error| self.transport_error(error))?;

        Ok(decode_payload(&text)?.into_variable(&config.variable_id))
    }

    async fn put_variable(&self, config: &Configuration, new_value: &str) -> Result<(), ApiError> {
        ensure_complete(config)?;
        let body = VariableUpdate {
            default_value: new_value.to_string(),
        };
        let response = self
            .request(Method::PUT, config)
            .json(&body)
            .send()
            .await
            .map_err(|error| self.transport_error(error))?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// An empty body decodes to an empty payload. Anything else must be a JSON
/// object; serde would otherwise accept an array as a positional struct.
fn decode_payload(text: &str) -> Result<VariablePayload, ApiError> {
    if text.trim().is_empty() {
        return Ok(VariablePayload::default());
    }
    let value: Value = serde_json::from_str(text).map_err(|error| ApiError::decode(error.to_string()))?;
    if !value.is_object() {
        return Err(ApiError::decode("expected a JSON object"));
    }
    serde_json::from_value(value).map_err(|error| ApiError::decode(error.to_string()))
}

fn ensure_complete(config: &Configuration) -> Result<(), ApiError> {
    let missing = config.missing_fields();
    if missing.is_empty() { Ok(()) } else { Err(ApiError::configuration(missing)) }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    // Error bodies are shown to the operator; some services echo request headers.
    let body = response.text().await.ok().map(|text| redact_sensitive(&text));
    debug!(status = status.as_u16(), body = body.as_deref().unwrap_or_default(), "remote error response");
    Err(ApiError::remote(
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status"),
        body.as_deref(),
    ))
}

/// Validate that a base URL override is acceptable.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and the host must be one of the allowed
///   API domains or a subdomain thereof
pub fn validate_base_url(base: &str) -> Result<(), ApiError> {
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };

    let parsed = Url::parse(base).map_err(|error| invalid(error.to_string()))?;
    let host_name = parsed.host_str().ok_or_else(|| invalid("missing host".into()))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(invalid(format!(
            "must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        )));
    }

    let is_allowed_domain = ALLOWED_API_DOMAINS.iter().any(|&allowed_domain| {
        host_name.eq_ignore_ascii_case(allowed_domain) || host_name.ends_with(&format!(".{allowed_domain}"))
    });
    if !is_allowed_domain {
        return Err(invalid(format!(
            "host '{host_name}' is not allowed; must be one of {ALLOWED_API_DOMAINS:?} or a subdomain, or localhost"
        )));
    }

    Ok(())
}
