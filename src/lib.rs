//! Declarative status handling for network calls
//!
//! Callers describe modules made of tasks, give each task handlers keyed by
//! HTTP status (`notFound`, `internalServerError`, ...) plus `catch`,
//! `finally` and `failed`, and get back wrapped entry functions. Inside an
//! entry function, [`Lovit::fetch`] runs a request, reads its status and
//! routes an error status to the right handler, so call sites carry no
//! error handling of their own.
//!
//! ```no_run
//! use lovit::{
//!     EntryFunction, FetchConfig, Handlers, HandlerName, Lovit, LovitConfig, ModuleConfig,
//!     Profile, StatusHandler,
//! };
//! use serde_json::Value;
//!
//! # async fn run() -> Result<(), lovit::Error> {
//! let lovit = Lovit::new();
//! let client = lovit.clone();
//!
//! let functions = lovit.configure(
//!     LovitConfig::new().module(
//!         "post",
//!         ModuleConfig::new()
//!             .profile(Profile::new().task(
//!                 "getPosts",
//!                 Handlers::new().on(
//!                     HandlerName::NotFound,
//!                     StatusHandler::new(|ctx| eprintln!("{}: {}", ctx.task, ctx.status_text)),
//!                 ),
//!             ))
//!             .entry_function(
//!                 "getPosts",
//!                 EntryFunction::future(move |_| {
//!                     let client = client.clone();
//!                     async move {
//!                         let config = FetchConfig::builder()
//!                             .key("post.getPosts")
//!                             .url("https://example.com/posts")
//!                             .build();
//!                         Ok::<_, lovit::Failure>(client.fetch(config).await?.into_value())
//!                     }
//!                 }),
//!             ),
//!     ),
//! )?;
//!
//! let outcome = functions.call("getPosts", Value::Null).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod handlers;
mod lovit;
pub mod path;
pub mod shape;
pub mod status;

pub use config::{
    ConfigError, GlobalConfig, LovitConfig, ModuleConfig, Profile, ProfileConfig, Settings,
    create_profile,
};
pub use error::{
    Error, Failure, LovitError, MessageType, Result, ServiceError, Signal, ThrowErrorOptions,
    throw_error,
};
pub use fetch::{FetchConfig, FetchResponse, RequestFn};
pub use handlers::{
    CatchHandler, Context, EntryFunction, FinallyHandler, Handlers, Invocation, Outcome,
    StatusHandler, WrappedEntryFunctions,
};
pub use lovit::{Lovit, configure, fetch, global, reset};
pub use shape::Shape;
pub use status::{HandlerName, StatusCode, StatusPath, is_error_status, slot_name_for};
