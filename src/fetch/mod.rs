//! Request dispatch with status checking
//!
//! A fetch runs a URL request through the [`Transport`] or calls a
//! caller-supplied [`RequestFn`], reads the status from the result, and when
//! the status is an error routes a [`Context`] to the matching status
//! handler (or `failed`). The call then stops with a handled signal so the
//! wrapping entry function still runs `finally` without treating it as an
//! ordinary error.
//!
//! ## Key Components
//!
//! - [`FetchConfig`] - The request descriptor, built with `FetchConfig::builder()`
//! - [`FetchResponse`] - The untouched response of a successful request
//! - [`Transport`] / [`ReqwestTransport`] - URL requests

mod transport;

pub use transport::{HttpConfig, HttpResponse, ReqwestTransport, RequestOptions, Transport};

use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::validate_fetch_config;
use crate::error::{Error, Failure, Signal};
use crate::handlers::{BoxFuture, Context, Registry};
use crate::status::{HandlerName, StatusError, StatusPath, StatusResolver};

/// A caller-supplied request, e.g. an SDK call
#[derive(Clone)]
pub struct RequestFn(Arc<dyn Fn() -> BoxFuture<Result<Value, Error>> + Send + Sync>);

impl RequestFn {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        Self(Arc::new(move || Box::pin(f())))
    }

    fn call(&self) -> BoxFuture<Result<Value, Error>> {
        (self.0)()
    }
}

impl fmt::Debug for RequestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestFn")
    }
}

/// What to request and how to read its status
#[derive(Debug, Clone, bon::Builder)]
pub struct FetchConfig {
    /// `module.task` the request belongs to
    #[builder(into)]
    pub key: String,

    #[builder(into)]
    pub url: Option<String>,

    pub request_fn: Option<RequestFn>,

    #[builder(default)]
    pub options: RequestOptions,

    /// Passed to status handlers in the context, `{}` when absent
    pub data: Option<Value>,

    /// Skip status checking; the request succeeds whatever it returns
    #[builder(default)]
    pub no_status: bool,

    /// Defaults to the instance's status path
    #[builder(into)]
    pub status_path: Option<StatusPath>,
}

/// The response of a request whose status was not an error
#[derive(Debug, Clone)]
pub enum FetchResponse {
    Http(HttpResponse),
    /// What the request function returned, or the intercepted error object
    Json(Value),
}

impl FetchResponse {
    pub fn to_value(&self) -> Value {
        match self {
            FetchResponse::Http(response) => response.to_value(),
            FetchResponse::Json(value) => value.clone(),
        }
    }

    pub fn as_http(&self) -> Option<&HttpResponse> {
        match self {
            FetchResponse::Http(response) => Some(response),
            FetchResponse::Json(_) => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            FetchResponse::Http(response) => response.to_value(),
            FetchResponse::Json(value) => value,
        }
    }
}

/// What the request produced, before the status is looked at
struct Executed {
    response: FetchResponse,
    /// Where the status is read from; `None` skips the check
    source: Option<Value>,
    /// The error whose object view is `source`, kept to rethrow it unchanged
    intercepted: Option<Error>,
}

/// Everything a fetch reads from its instance
pub(crate) struct Dispatch {
    pub registry: Arc<Registry>,
    pub transport: Option<Arc<dyn Transport>>,
    pub default_status_path: StatusPath,
}

impl Dispatch {
    pub async fn run(self, config: FetchConfig) -> Result<FetchResponse, Failure> {
        validate_fetch_config(&config)?;

        let FetchConfig {
            key,
            url,
            request_fn,
            options,
            data,
            no_status,
            status_path,
        } = config;

        let status_path = status_path.unwrap_or_else(|| self.default_status_path.clone());

        let executed = match (url, request_fn) {
            (Some(url), _) if !url.is_empty() => self.fetch_url(&url, &options).await?,
            (_, Some(request_fn)) => call_request_fn(&key, &request_fn, &status_path).await?,
            _ => return Err(Error::InvalidUsage("nothing to request".into()).into()),
        };

        let Executed {
            response,
            source,
            intercepted,
        } = executed;

        let source = match source {
            Some(source) if !no_status => source,
            _ => return Ok(response),
        };

        let resolver = StatusResolver::new(&key, &status_path, self.registry.error_codes());
        let resolved = match resolver.resolve(&source) {
            Ok(resolved) => resolved,
            // An unreadable status rethrows what it was read from
            Err(err @ StatusError::InvalidStatus { .. }) => {
                return Err(match intercepted {
                    Some(original) => original.into(),
                    None => err.into(),
                });
            }
            Err(err) => return Err(err.into()),
        };

        if !resolved.is_error() {
            return Ok(response);
        }

        let slot = resolved.slot;
        let (module, task) = key.split_once('.').unwrap_or(("unknown", "unknown"));

        let context = Context {
            data: data.unwrap_or_else(|| json!({})),
            response: source,
            status_text: slot.status_text(),
            status_code: resolved.code(),
            module: module.to_string(),
            task: task.to_string(),
            handler: slot,
        };

        let handler = self
            .registry
            .resolve_status(module, task, slot)
            .or_else(|| self.registry.resolve_status(module, task, HandlerName::Failed));

        match handler {
            Some(handler) => {
                debug!(key = %key, %slot, "Routing error status to handler");
                handler.call(context).settle().await?;
            }
            None => warn!(key = %key, %slot, "No handler for error status"),
        }

        Err(Failure::Handled(Signal { key, handler: slot }))
    }

    async fn fetch_url(&self, url: &str, options: &RequestOptions) -> Result<Executed, Error> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| Error::InvalidUsage("no transport is available for URL requests".into()))?;

        let response = transport.send(url, options).await?;
        let source = response.to_value();

        Ok(Executed {
            response: FetchResponse::Http(response),
            source: Some(source),
            intercepted: None,
        })
    }
}

async fn call_request_fn(
    key: &str,
    request_fn: &RequestFn,
    status_path: &StatusPath,
) -> Result<Executed, Error> {
    match request_fn.call().await {
        Ok(value) => {
            // In catch-block mode a returned value carries no status.
            let source = (!status_path.in_catch_block).then(|| value.clone());
            Ok(Executed {
                response: FetchResponse::Json(value),
                source,
                intercepted: None,
            })
        }
        Err(err)
            if status_path.in_catch_block
                && status_path.error_name.as_deref() == Some(err.name().as_str()) =>
        {
            debug!(key, error = %err.name(), "Reading status from returned error");
            let source = err.to_value();
            Ok(Executed {
                response: FetchResponse::Json(source.clone()),
                source: Some(source),
                intercepted: Some(err),
            })
        }
        Err(err) => Err(err),
    }
}
