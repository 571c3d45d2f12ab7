use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::{HandlerName, StatusCode, slot_name_for};
use crate::path;
use crate::shape::Shape;

const DEFAULT_STATUS_PATH: &str = "status";

#[derive(Debug, Error)]
pub enum StatusError {
    #[error(
        "Invalid type for response from \"{key}\": {response}. Status could not be determined. Expected Valid response object."
    )]
    NotExtractable { key: String, response: Value },

    #[error(
        "Invalid type for status: {found}. From \"{key}\" response at status path \"{path}\". Expected valid string or number status."
    )]
    InvalidStatus {
        key: String,
        path: String,
        found: String,
        response: Value,
    },

    #[error(
        "The status \"{status}\" extracted from \"{key}\" response wasn't found in either errorCodeMap or errorCodeMapper."
    )]
    Unmapped { status: String, key: String },
}

/// Where to read the status from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPath {
    /// Dotted path into the response (or error)
    #[serde(default = "default_path")]
    pub path: String,
    /// Read the status from the error returned by the request function
    #[serde(default)]
    pub in_catch_block: bool,
    /// Name of the error that carries the status; required with `in_catch_block`
    #[serde(default)]
    pub error_name: Option<String>,
}

fn default_path() -> String {
    DEFAULT_STATUS_PATH.to_string()
}

impl Default for StatusPath {
    fn default() -> Self {
        Self {
            path: default_path(),
            in_catch_block: false,
            error_name: None,
        }
    }
}

impl StatusPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Read `path` from errors named `error_name` instead of the success value
    pub fn in_error(path: impl Into<String>, error_name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            in_catch_block: true,
            error_name: Some(error_name.into()),
        }
    }
}

impl From<&str> for StatusPath {
    fn from(path: &str) -> Self {
        StatusPath::new(path)
    }
}

impl From<String> for StatusPath {
    fn from(path: String) -> Self {
        StatusPath::new(path)
    }
}

pub type ErrorCodeMapper = Arc<dyn Fn(&str) -> Option<u16> + Send + Sync>;

/// Custom string status -> numeric code: the map first, the mapper as fallback
#[derive(Clone, Default)]
pub struct ErrorCodes {
    map: BTreeMap<String, u16>,
    mapper: Option<ErrorCodeMapper>,
}

impl fmt::Debug for ErrorCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCodes")
            .field("map", &self.map)
            .field("mapper", &self.mapper.is_some())
            .finish()
    }
}

impl ErrorCodes {
    pub fn new(map: BTreeMap<String, u16>, mapper: Option<ErrorCodeMapper>) -> Self {
        Self { map, mapper }
    }

    pub fn lookup(&self, status: &str) -> Option<u16> {
        self.map
            .get(status)
            .copied()
            .or_else(|| self.mapper.as_ref().and_then(|mapper| mapper(status)))
            .filter(|code| *code != 0)
    }

    pub fn map(&self) -> &BTreeMap<String, u16> {
        &self.map
    }

    pub fn has_mapper(&self) -> bool {
        self.mapper.is_some()
    }
}

/// A status read from a response and its slot
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStatus {
    /// The numeric status as found, or as mapped from a custom string status
    pub raw: Value,
    pub slot: HandlerName,
}

impl ResolvedStatus {
    pub fn is_error(&self) -> bool {
        self.slot != HandlerName::Unknown
    }

    pub fn code(&self) -> StatusCode {
        self.slot.status_code()
    }
}

/// Extracts and classifies the status of one request's response
pub struct StatusResolver<'a> {
    key: &'a str,
    status_path: &'a StatusPath,
    codes: &'a ErrorCodes,
}

impl<'a> StatusResolver<'a> {
    pub fn new(key: &'a str, status_path: &'a StatusPath, codes: &'a ErrorCodes) -> Self {
        Self {
            key,
            status_path,
            codes,
        }
    }

    /// Resolve the status of `source`.
    ///
    /// A source that is not an object cannot carry a status. A value at the
    /// status path that is missing, falsy, or neither string nor number is
    /// rejected rather than treated as success.
    pub fn resolve(&self, source: &Value) -> Result<ResolvedStatus, StatusError> {
        if !Shape::Object.matches(source) {
            return Err(StatusError::NotExtractable {
                key: self.key.to_string(),
                response: source.clone(),
            });
        }

        let status_shape = Shape::union([Shape::String, Shape::Number]);
        let found = path::get(source, &self.status_path.path);

        let status = match found {
            Some(value) if status_shape.matches(value) && is_truthy(value) => value,
            _ => {
                let found = found.map_or_else(|| "undefined".to_string(), Value::to_string);
                error!(
                    key = self.key,
                    path = %self.status_path.path,
                    found = %found,
                    "Response status is not a valid string or number"
                );
                return Err(StatusError::InvalidStatus {
                    key: self.key.to_string(),
                    path: self.status_path.path.clone(),
                    found,
                    response: source.clone(),
                });
            }
        };

        let resolved = match status {
            Value::String(custom) => {
                let code = self.codes.lookup(custom).ok_or_else(|| StatusError::Unmapped {
                    status: custom.clone(),
                    key: self.key.to_string(),
                })?;
                debug!(key = self.key, status = %custom, code, "Mapped custom status");
                ResolvedStatus {
                    raw: Value::from(code),
                    slot: slot_name_for(code),
                }
            }
            number => ResolvedStatus {
                raw: number.clone(),
                slot: slot_name_for(number),
            },
        };

        Ok(resolved)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => true,
    }
}
