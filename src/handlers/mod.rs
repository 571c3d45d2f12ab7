//! Handler resolution and entry function wrapping
//!
//! Handlers are registered per task, per module (shared) and globally. The
//! registry resolves a slot by walking those levels from the most specific.
//! The wrapper runs an entry function and routes its failure through the
//! task's `catch` and `finally`.
//!
//! ## Key Components
//!
//! - [`Registry`] - (module, task, slot) lookup with task > shared > global precedence
//! - [`StatusHandler`], [`CatchHandler`], [`FinallyHandler`] - Sync or async callbacks
//! - [`Context`] - What a status handler learns about the failure
//! - [`WrappedEntryFunction`] - An entry function bound to its `catch` and `finally`
//! - [`Invocation`] - The settled or pending result of a wrapped call
//!
//! ## Example
//!
//! ```rust
//! use lovit::handlers::{EntryFunction, Handlers, StatusHandler};
//! use lovit::status::HandlerName;
//!
//! let handlers = Handlers::new().on(
//!     HandlerName::NotFound,
//!     StatusHandler::new(|ctx| println!("{} not found", ctx.task)),
//! );
//! let entry = EntryFunction::sync(|args| Ok(args));
//! # let _ = (handlers, entry);
//! ```

mod registry;
mod types;
mod wrapper;

pub(crate) use wrapper::Hooks;

pub use registry::{GlobalEntry, ModuleEntry, Registry, RegistryError};
pub use types::{
    BoxFuture, CatchHandler, Context, FinallyHandler, Handler, HandlerOutput, HandlerSet, Handlers,
    StatusHandler,
};
pub use wrapper::{
    EntryFunction, EntryOutput, Invocation, Outcome, WrappedEntryFunction, WrappedEntryFunctions,
};
