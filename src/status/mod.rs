//! Status classification
//!
//! Maps HTTP error statuses onto named handler slots (`404` -> `notFound`)
//! and decides whether a status counts as an error at all. The status table
//! covers the standard client and server error codes; anything outside it
//! resolves to [`HandlerName::Unknown`] and is not an error.
//!
//! ## Key Components
//!
//! - [`HandlerName`] - Every slot a handler can be registered under
//! - [`StatusCode`] - A classified numeric status, or `unknown`
//! - [`StatusResolver`] - Extracts a status from a response or a returned error

mod resolver;

pub use resolver::{
    ErrorCodeMapper, ErrorCodes, ResolvedStatus, StatusError, StatusPath, StatusResolver,
};

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Every slot a handler function can be registered under.
///
/// Status slots are named after the HTTP status they handle. `Catch`,
/// `Finally` and `Failed` are structural slots used by the entry function
/// wrapper and the status-check orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerName {
    BadRequest,
    Unauthorized,
    PaymentRequired,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    ProxyAuthRequired,
    RequestTimeout,
    Conflict,
    Gone,
    LengthRequired,
    PreconditionFailed,
    ContentTooLarge,
    UriTooLong,
    UnsupportedMediaType,
    RangeNotSatisfiable,
    ExpectationFailed,
    ImATeapot,
    MisdirectedRequest,
    UnprocessableContent,
    Locked,
    FailedDependency,
    TooEarly,
    UpgradeRequired,
    PreconditionRequired,
    TooManyRequests,
    RequestHeaderFieldsTooLarge,
    UnavailableForLegalReasons,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    HttpVersionNotSupported,
    VariantAlsoNegotiates,
    InsufficientStorage,
    LoopDetected,
    NotExtended,
    NetworkAuthRequired,
    Unknown,
    Catch,
    Finally,
    Failed,
}

/// Status table, see <https://developer.mozilla.org/en-US/docs/Web/HTTP/Status>
pub const STATUS_HANDLERS: [(u16, HandlerName); 40] = [
    (400, HandlerName::BadRequest),
    (401, HandlerName::Unauthorized),
    (402, HandlerName::PaymentRequired),
    (403, HandlerName::Forbidden),
    (404, HandlerName::NotFound),
    (405, HandlerName::MethodNotAllowed),
    (406, HandlerName::NotAcceptable),
    (407, HandlerName::ProxyAuthRequired),
    (408, HandlerName::RequestTimeout),
    (409, HandlerName::Conflict),
    (410, HandlerName::Gone),
    (411, HandlerName::LengthRequired),
    (412, HandlerName::PreconditionFailed),
    (413, HandlerName::ContentTooLarge),
    (414, HandlerName::UriTooLong),
    (415, HandlerName::UnsupportedMediaType),
    (416, HandlerName::RangeNotSatisfiable),
    (417, HandlerName::ExpectationFailed),
    (418, HandlerName::ImATeapot),
    (421, HandlerName::MisdirectedRequest),
    (422, HandlerName::UnprocessableContent),
    (423, HandlerName::Locked),
    (424, HandlerName::FailedDependency),
    (425, HandlerName::TooEarly),
    (426, HandlerName::UpgradeRequired),
    (428, HandlerName::PreconditionRequired),
    (429, HandlerName::TooManyRequests),
    (431, HandlerName::RequestHeaderFieldsTooLarge),
    (451, HandlerName::UnavailableForLegalReasons),
    (500, HandlerName::InternalServerError),
    (501, HandlerName::NotImplemented),
    (502, HandlerName::BadGateway),
    (503, HandlerName::ServiceUnavailable),
    (504, HandlerName::GatewayTimeout),
    (505, HandlerName::HttpVersionNotSupported),
    (506, HandlerName::VariantAlsoNegotiates),
    (507, HandlerName::InsufficientStorage),
    (508, HandlerName::LoopDetected),
    (510, HandlerName::NotExtended),
    (511, HandlerName::NetworkAuthRequired),
];

/// The kind of callback a slot accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Receives a [`Context`](crate::handlers::Context): status slots and `failed`
    Status,
    /// Receives the raw error
    Catch,
    /// Takes no arguments
    Finally,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandlerKind::Status => "status handler",
            HandlerKind::Catch => "catch handler",
            HandlerKind::Finally => "finally handler",
        })
    }
}

impl HandlerName {
    pub const fn as_str(&self) -> &'static str {
        match self {
            HandlerName::BadRequest => "badRequest",
            HandlerName::Unauthorized => "unauthorized",
            HandlerName::PaymentRequired => "paymentRequired",
            HandlerName::Forbidden => "forbidden",
            HandlerName::NotFound => "notFound",
            HandlerName::MethodNotAllowed => "methodNotAllowed",
            HandlerName::NotAcceptable => "notAcceptable",
            HandlerName::ProxyAuthRequired => "proxyAuthRequired",
            HandlerName::RequestTimeout => "requestTimeout",
            HandlerName::Conflict => "conflict",
            HandlerName::Gone => "gone",
            HandlerName::LengthRequired => "lengthRequired",
            HandlerName::PreconditionFailed => "preconditionFailed",
            HandlerName::ContentTooLarge => "contentTooLarge",
            HandlerName::UriTooLong => "uriTooLong",
            HandlerName::UnsupportedMediaType => "unsupportedMediaType",
            HandlerName::RangeNotSatisfiable => "rangeNotSatisfiable",
            HandlerName::ExpectationFailed => "expectationFailed",
            HandlerName::ImATeapot => "imATeapot",
            HandlerName::MisdirectedRequest => "misdirectedRequest",
            HandlerName::UnprocessableContent => "unprocessableContent",
            HandlerName::Locked => "locked",
            HandlerName::FailedDependency => "failedDependency",
            HandlerName::TooEarly => "tooEarly",
            HandlerName::UpgradeRequired => "upgradeRequired",
            HandlerName::PreconditionRequired => "preconditionRequired",
            HandlerName::TooManyRequests => "tooManyRequests",
            HandlerName::RequestHeaderFieldsTooLarge => "requestHeaderFieldsTooLarge",
            HandlerName::UnavailableForLegalReasons => "unavailableForLegalReasons",
            HandlerName::InternalServerError => "internalServerError",
            HandlerName::NotImplemented => "notImplemented",
            HandlerName::BadGateway => "badGateway",
            HandlerName::ServiceUnavailable => "serviceUnavailable",
            HandlerName::GatewayTimeout => "gatewayTimeout",
            HandlerName::HttpVersionNotSupported => "httpVersionNotSupported",
            HandlerName::VariantAlsoNegotiates => "variantAlsoNegotiates",
            HandlerName::InsufficientStorage => "insufficientStorage",
            HandlerName::LoopDetected => "loopDetected",
            HandlerName::NotExtended => "notExtended",
            HandlerName::NetworkAuthRequired => "networkAuthRequired",
            HandlerName::Unknown => "unknown",
            HandlerName::Catch => "catch",
            HandlerName::Finally => "finally",
            HandlerName::Failed => "failed",
        }
    }

    /// Which callback shape this slot accepts
    pub const fn kind(&self) -> HandlerKind {
        match self {
            HandlerName::Catch => HandlerKind::Catch,
            HandlerName::Finally => HandlerKind::Finally,
            _ => HandlerKind::Status,
        }
    }

    /// Numeric status for a status slot, `Unknown` for structural slots
    pub fn status_code(&self) -> StatusCode {
        STATUS_HANDLERS
            .iter()
            .find(|(_, name)| name == self)
            .map(|(code, _)| StatusCode::Code(*code))
            .unwrap_or(StatusCode::Unknown)
    }

    /// Human readable text, e.g. `notFound` -> `Not Found`
    pub fn status_text(&self) -> String {
        to_status_text(self.as_str())
    }

    /// All slot names, status slots first
    pub fn all() -> impl Iterator<Item = HandlerName> {
        STATUS_HANDLERS
            .iter()
            .map(|(_, name)| *name)
            .chain([
                HandlerName::Unknown,
                HandlerName::Catch,
                HandlerName::Finally,
                HandlerName::Failed,
            ])
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown handler name: {0}")]
pub struct UnknownHandlerName(pub String);

impl FromStr for HandlerName {
    type Err = UnknownHandlerName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HandlerName::all()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownHandlerName(s.to_string()))
    }
}

impl Serialize for HandlerName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A classified status: a numeric code from the table, or `unknown`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Code(u16),
    Unknown,
}

impl StatusCode {
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            StatusCode::Code(code) => Some(*code),
            StatusCode::Unknown => None,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Code(code) => write!(f, "{code}"),
            StatusCode::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StatusCode::Code(code) => serializer.serialize_u16(*code),
            StatusCode::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// Anything that can be coerced into the status table's key space.
///
/// Numbers match by value; strings only when they are the canonical decimal
/// rendering of a code (`"404"` matches, `"0404"` and `" 404"` do not).
pub trait StatusKey {
    fn status_key(&self) -> Option<u16>;
}

macro_rules! impl_status_key_for_int {
    ($($ty:ty),*) => {
        $(impl StatusKey for $ty {
            fn status_key(&self) -> Option<u16> {
                u16::try_from(*self).ok()
            }
        })*
    };
}

impl_status_key_for_int!(u16, u32, u64, i32, i64, usize);

impl StatusKey for f64 {
    fn status_key(&self) -> Option<u16> {
        if self.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(self) {
            Some(*self as u16)
        } else {
            None
        }
    }
}

impl StatusKey for str {
    fn status_key(&self) -> Option<u16> {
        let code: u16 = self.parse().ok()?;
        (code.to_string() == self).then_some(code)
    }
}

impl StatusKey for String {
    fn status_key(&self) -> Option<u16> {
        self.as_str().status_key()
    }
}

impl StatusKey for Value {
    fn status_key(&self) -> Option<u16> {
        match self {
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| v.status_key())
                .or_else(|| n.as_f64().and_then(|v| v.status_key())),
            Value::String(s) => s.status_key(),
            _ => None,
        }
    }
}

impl<T: StatusKey + ?Sized> StatusKey for &T {
    fn status_key(&self) -> Option<u16> {
        (**self).status_key()
    }
}

/// Slot name for a status, [`HandlerName::Unknown`] outside the table
pub fn slot_name_for(status: impl StatusKey) -> HandlerName {
    status
        .status_key()
        .and_then(|code| {
            STATUS_HANDLERS
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, name)| *name)
        })
        .unwrap_or(HandlerName::Unknown)
}

/// Whether a status is in the error table
pub fn is_error_status(status: impl StatusKey) -> bool {
    slot_name_for(status) != HandlerName::Unknown
}

/// Inserts a space before each capital and capitalizes the first letter
pub fn to_status_text(handler_name: &str) -> String {
    let mut text = String::with_capacity(handler_name.len() + 4);
    for (i, c) in handler_name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            text.push(' ');
            text.push(c);
        } else if i == 0 {
            text.extend(c.to_uppercase());
        } else {
            text.push(c);
        }
    }
    text
}
