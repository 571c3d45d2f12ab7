use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::status::{HandlerKind, HandlerName, StatusCode};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Per-failure record passed to status handlers and `failed`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Auxiliary data from the fetch descriptor
    pub data: Value,
    /// The response (or error object) the status was read from
    pub response: Value,
    pub status_text: String,
    pub status_code: StatusCode,
    pub module: String,
    pub task: String,
    /// The slot the status resolved to, even when `failed` handles it
    pub handler: HandlerName,
}

/// What a handler returns: done already, or still running
pub enum HandlerOutput {
    Ready(Result<(), Error>),
    Pending(BoxFuture<Result<(), Error>>),
}

impl HandlerOutput {
    pub fn done() -> Self {
        HandlerOutput::Ready(Ok(()))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        HandlerOutput::Pending(Box::pin(future))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, HandlerOutput::Pending(_))
    }

    /// Wait for the handler to finish, whichever way it returned
    pub async fn settle(self) -> Result<(), Error> {
        match self {
            HandlerOutput::Ready(result) => result,
            HandlerOutput::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for HandlerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerOutput::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            HandlerOutput::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl From<()> for HandlerOutput {
    fn from(_: ()) -> Self {
        HandlerOutput::done()
    }
}

impl From<Result<(), Error>> for HandlerOutput {
    fn from(result: Result<(), Error>) -> Self {
        HandlerOutput::Ready(result)
    }
}

macro_rules! handler_type {
    ($(#[$doc:meta])* $name:ident, ($($arg:ident: $ty:ty),*)) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn Fn($($ty),*) -> HandlerOutput + Send + Sync>);

        impl $name {
            /// Wrap a callback that completes synchronously
            pub fn new<F, R>(f: F) -> Self
            where
                F: Fn($($ty),*) -> R + Send + Sync + 'static,
                R: Into<HandlerOutput>,
            {
                Self(Arc::new(move |$($arg),*| f($($arg),*).into()))
            }

            /// Wrap a callback returning a future
            pub fn future<F, Fut>(f: F) -> Self
            where
                F: Fn($($ty),*) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<(), Error>> + Send + 'static,
            {
                Self(Arc::new(move |$($arg),*| HandlerOutput::pending(f($($arg),*))))
            }

            pub fn call(&self, $($arg: $ty),*) -> HandlerOutput {
                (self.0)($($arg),*)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

handler_type!(
    /// Handles an error status; also the shape of `failed`
    StatusHandler,
    (context: Context)
);

handler_type!(
    /// Receives an application error the entry function returned
    CatchHandler,
    (error: Error)
);

handler_type!(
    /// Runs once per invocation after everything else
    FinallyHandler,
    ()
);

/// A handler of any slot kind
#[derive(Debug, Clone)]
pub enum Handler {
    Status(StatusHandler),
    Catch(CatchHandler),
    Finally(FinallyHandler),
}

impl Handler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Handler::Status(_) => HandlerKind::Status,
            Handler::Catch(_) => HandlerKind::Catch,
            Handler::Finally(_) => HandlerKind::Finally,
        }
    }

    pub fn as_status(&self) -> Option<&StatusHandler> {
        match self {
            Handler::Status(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_catch(&self) -> Option<&CatchHandler> {
        match self {
            Handler::Catch(handler) => Some(handler),
            _ => None,
        }
    }

    pub fn as_finally(&self) -> Option<&FinallyHandler> {
        match self {
            Handler::Finally(handler) => Some(handler),
            _ => None,
        }
    }
}

impl From<StatusHandler> for Handler {
    fn from(handler: StatusHandler) -> Self {
        Handler::Status(handler)
    }
}

impl From<CatchHandler> for Handler {
    fn from(handler: CatchHandler) -> Self {
        Handler::Catch(handler)
    }
}

impl From<FinallyHandler> for Handler {
    fn from(handler: FinallyHandler) -> Self {
        Handler::Finally(handler)
    }
}

/// Handlers as written in a configuration, keyed by slot name.
///
/// Names are checked against the known slots when the configuration is
/// validated, not here.
#[derive(Debug, Clone, Default)]
pub struct Handlers(BTreeMap<String, Handler>);

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, handler: impl Into<Handler>) -> Self {
        self.0.insert(name.into(), handler.into());
        self
    }

    pub fn on(self, slot: HandlerName, handler: StatusHandler) -> Self {
        self.with(slot.as_str(), handler)
    }

    pub fn catch(self, handler: CatchHandler) -> Self {
        self.with(HandlerName::Catch.as_str(), handler)
    }

    pub fn finally(self, handler: FinallyHandler) -> Self {
        self.with(HandlerName::Finally.as_str(), handler)
    }

    pub fn failed(self, handler: StatusHandler) -> Self {
        self.with(HandlerName::Failed.as_str(), handler)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Handler)> {
        self.0.iter().map(|(name, handler)| (name.as_str(), handler))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validated handlers keyed by slot
#[derive(Debug, Clone, Default)]
pub struct HandlerSet(BTreeMap<HandlerName, Handler>);

impl HandlerSet {
    pub fn get(&self, slot: HandlerName) -> Option<&Handler> {
        self.0.get(&slot)
    }

    pub(crate) fn insert(&mut self, slot: HandlerName, handler: Handler) {
        self.0.insert(slot, handler);
    }

    pub fn slots(&self) -> impl Iterator<Item = HandlerName> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
