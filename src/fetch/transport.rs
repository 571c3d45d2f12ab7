//! HTTP transport for URL requests

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::redirect::Policy;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::config::HttpSettings;
use crate::error::Error;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig::from(&HttpSettings::default())
    }
}

impl From<&HttpSettings> for HttpConfig {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
            user_agent: settings.user_agent.clone(),
            max_redirects: settings.max_redirects,
        }
    }
}

/// Per-request options passed along with a URL
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Defaults to `GET`
    pub method: Option<reqwest::Method>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl RequestOptions {
    pub fn method(mut self, method: reqwest::Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// A received HTTP response, whatever its status
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Object view used for status extraction and handler contexts.
    ///
    /// `body` is the parsed JSON when the body is JSON, the text otherwise.
    pub fn to_value(&self) -> Value {
        let headers: Map<String, Value> = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();

        let body = self.json().unwrap_or_else(|_| Value::String(self.text()));

        json!({
            "status": self.status,
            "statusText": self.status_text,
            "ok": self.ok(),
            "url": self.url,
            "headers": headers,
            "body": body,
        })
    }
}

/// Sends URL requests on behalf of `fetch`
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, Error>;
}

/// [`Transport`] backed by a `reqwest` client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, Error> {
        let redirect = match config.max_redirects {
            0 => Policy::none(),
            limit => Policy::limited(limit),
        };

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect)
            .build()
            .map_err(Error::Client)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, Error> {
        let method = options.method.clone().unwrap_or(reqwest::Method::GET);
        debug!(url, %method, "Sending request");

        let mut request = self.client.request(method, url);
        for (name, value) in &options.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        let transport_error = |source| Error::Transport {
            url: url.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(transport_error)?;

        debug!(url, status = status.as_u16(), size = body.len(), "Response received");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            url: final_url,
            headers,
            body,
        })
    }
}
