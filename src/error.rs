use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use crate::config::ConfigError;
use crate::status::{HandlerName, StatusError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Label prefixed to the name of a [`LovitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageType {
    #[default]
    Error,
    Warning,
    Info,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MessageType::Error => "Error",
            MessageType::Warning => "Warning",
            MessageType::Info => "Info",
        })
    }
}

/// Tagged error carrying a message type and arbitrary extra properties
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LovitError {
    message: String,
    message_type: MessageType,
    meta: Map<String, Value>,
}

impl LovitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            message_type: MessageType::default(),
            meta: Map::new(),
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// `"Lovit Error"`, `"Lovit Warning"` or `"Lovit Info"`
    pub fn name(&self) -> String {
        format!("Lovit {}", self.message_type)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Object view: `name`, `message` and every extra property
    pub fn to_value(&self) -> Value {
        let mut object = self.meta.clone();
        object.insert("name".into(), Value::String(self.name()));
        object.insert("message".into(), Value::String(self.message.clone()));
        Value::Object(object)
    }
}

/// Input accepted by [`throw_error`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThrowErrorOptions {
    pub message: String,
    pub meta: Map<String, Value>,
}

impl From<&str> for ThrowErrorOptions {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
            meta: Map::new(),
        }
    }
}

impl From<String> for ThrowErrorOptions {
    fn from(message: String) -> Self {
        Self {
            message,
            meta: Map::new(),
        }
    }
}

/// Builds a [`LovitError`] from a message or options and returns it as `Err`.
///
/// ```
/// use lovit::{MessageType, throw_error};
///
/// let result: Result<(), _> = throw_error("Session expired", MessageType::Warning);
/// assert_eq!(result.unwrap_err().name(), "Lovit Warning");
/// ```
pub fn throw_error<T>(
    input: impl Into<ThrowErrorOptions>,
    message_type: MessageType,
) -> Result<T, LovitError> {
    let ThrowErrorOptions { message, meta } = input.into();
    Err(LovitError {
        message,
        message_type,
        meta,
    })
}

/// A named error returned by a request function, e.g. `FirebaseError`
/// with a `code` property holding a custom status.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name}: {message}")]
pub struct ServiceError {
    name: String,
    message: String,
    fields: Map<String, Value>,
}

impl ServiceError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("name".into(), Value::String(self.name.clone()));
        object.insert("message".into(), Value::String(self.message.clone()));
        Value::Object(object)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("Invalid usage: {0}.")]
    InvalidUsage(String),

    #[error(transparent)]
    Lovit(#[from] LovitError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn other(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Other(error.into())
    }

    /// Identifying name, used to decide whether a returned error carries a status
    pub fn name(&self) -> String {
        match self {
            Error::Lovit(err) => err.name(),
            Error::Service(err) => err.name().to_string(),
            Error::Config(_) | Error::Status(_) | Error::InvalidUsage(_) => "Lovit Error".into(),
            Error::Client(_) | Error::Transport { .. } => "TransportError".into(),
            Error::Other(_) => "Error".into(),
        }
    }

    /// Object view of the error, inspectable by status path
    pub fn to_value(&self) -> Value {
        match self {
            Error::Lovit(err) => err.to_value(),
            Error::Service(err) => err.to_value(),
            other => serde_json::json!({
                "name": other.name(),
                "message": other.to_string(),
            }),
        }
    }
}

/// Marks a call whose error status was already routed to a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub key: String,
    pub handler: HandlerName,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" stopped after {} handler", self.key, self.handler)
    }
}

/// Error channel of an entry function.
///
/// `Handled` stops the entry function after a status handler ran; the
/// wrapper swallows it and never shows it to `catch`. `Error` is an
/// ordinary application error routed to `catch`.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("Internal Signal: {0}")]
    Handled(Signal),

    #[error(transparent)]
    Error(#[from] Error),
}

impl Failure {
    pub fn is_handled(&self) -> bool {
        matches!(self, Failure::Handled(_))
    }
}

impl From<ConfigError> for Failure {
    fn from(value: ConfigError) -> Self {
        Failure::Error(value.into())
    }
}

impl From<StatusError> for Failure {
    fn from(value: StatusError) -> Self {
        Failure::Error(value.into())
    }
}

impl From<LovitError> for Failure {
    fn from(value: LovitError) -> Self {
        Failure::Error(value.into())
    }
}

impl From<ServiceError> for Failure {
    fn from(value: ServiceError) -> Self {
        Failure::Error(value.into())
    }
}
