use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{BoxFuture, CatchHandler, FinallyHandler, HandlerOutput};
use crate::error::{Error, Failure};

/// What an entry function returns: a result now, or a future of one
pub enum EntryOutput {
    Ready(Result<Value, Failure>),
    Pending(BoxFuture<Result<Value, Failure>>),
}

/// A caller function wrapped by the configuration
#[derive(Clone)]
pub struct EntryFunction(Arc<dyn Fn(Value) -> EntryOutput + Send + Sync>);

impl EntryFunction {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> EntryOutput + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A function that finishes before returning
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Failure> + Send + Sync + 'static,
    {
        Self::new(move |args| EntryOutput::Ready(f(args)))
    }

    /// A function returning a future
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Failure>> + Send + 'static,
    {
        Self::new(move |args| EntryOutput::Pending(Box::pin(f(args))))
    }

    fn call(&self, args: Value) -> EntryOutput {
        (self.0)(args)
    }
}

impl fmt::Debug for EntryFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EntryFunction")
    }
}

/// How a wrapped call ended without an error
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T = Value> {
    /// The entry function returned normally
    Completed(T),
    /// A handler took care of a failure
    Handled,
}

impl<T> Outcome<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Handled => None,
        }
    }
}

/// Result of calling a wrapped entry function.
///
/// Synchronous entry functions settle before `call` returns. Either form can
/// be awaited.
pub enum Invocation {
    Ready(Result<Outcome, Error>),
    Pending(BoxFuture<Result<Outcome, Error>>),
}

impl Invocation {
    pub fn is_pending(&self) -> bool {
        matches!(self, Invocation::Pending(_))
    }

    /// The settled result of a synchronous call, `None` while pending
    pub fn ready(self) -> Option<Result<Outcome, Error>> {
        match self {
            Invocation::Ready(result) => Some(result),
            Invocation::Pending(_) => None,
        }
    }
}

impl IntoFuture for Invocation {
    type Output = Result<Outcome, Error>;
    type IntoFuture = BoxFuture<Result<Outcome, Error>>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Invocation::Ready(result) => Box::pin(async move { result }),
            Invocation::Pending(future) => future,
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Invocation::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// `catch` and `finally` of one task, resolved when the configuration is applied
#[derive(Debug, Clone, Default)]
pub(crate) struct Hooks {
    pub catch: Option<CatchHandler>,
    pub finally: Option<FinallyHandler>,
}

/// An entry function bound to its task's `catch` and `finally`
#[derive(Debug, Clone)]
pub struct WrappedEntryFunction {
    name: String,
    module: String,
    entry: EntryFunction,
    hooks: Hooks,
}

impl WrappedEntryFunction {
    pub(crate) fn new(name: String, module: String, entry: EntryFunction, hooks: Hooks) -> Self {
        Self {
            name,
            module,
            entry,
            hooks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Run the entry function and route its failure through `catch`, then `finally`
    pub fn call(&self, args: Value) -> Invocation {
        debug!(module = %self.module, entry = %self.name, "Calling entry function");

        match self.entry.call(args) {
            EntryOutput::Ready(result) => Invocation::Ready(settle_sync(&self.name, result, &self.hooks)),
            EntryOutput::Pending(future) => {
                let name = self.name.clone();
                let hooks = self.hooks.clone();
                Invocation::Pending(Box::pin(async move {
                    let result = future.await;
                    settle_async(&name, result, &hooks).await
                }))
            }
        }
    }
}

fn sync_misuse(kind: &str) -> Error {
    Error::InvalidUsage(format!(
        "{kind} handler cannot be async when the entry function is synchronous"
    ))
}

fn settle_sync(name: &str, result: Result<Value, Failure>, hooks: &Hooks) -> Result<Outcome, Error> {
    let outcome = match result {
        Ok(value) => Ok(Outcome::Completed(value)),
        Err(Failure::Handled(signal)) => {
            debug!(entry = %name, %signal, "Failure already handled");
            Ok(Outcome::Handled)
        }
        Err(Failure::Error(err)) => match &hooks.catch {
            Some(catch) => match catch.call(err) {
                HandlerOutput::Ready(Ok(())) => Ok(Outcome::Handled),
                HandlerOutput::Ready(Err(err)) => Err(err),
                HandlerOutput::Pending(_) => Err(sync_misuse("Catch")),
            },
            None => {
                warn!(entry = %name, error = %err, "No catch handler, propagating error");
                Err(err)
            }
        },
    };

    if let Some(finally) = &hooks.finally {
        match finally.call() {
            HandlerOutput::Ready(Ok(())) => {}
            HandlerOutput::Ready(Err(err)) => return Err(err),
            HandlerOutput::Pending(_) => return Err(sync_misuse("Finally")),
        }
    }

    outcome
}

async fn settle_async(name: &str, result: Result<Value, Failure>, hooks: &Hooks) -> Result<Outcome, Error> {
    let outcome = match result {
        Ok(value) => Ok(Outcome::Completed(value)),
        Err(Failure::Handled(signal)) => {
            debug!(entry = %name, %signal, "Failure already handled");
            Ok(Outcome::Handled)
        }
        Err(Failure::Error(err)) => match &hooks.catch {
            Some(catch) => catch.call(err).settle().await.map(|()| Outcome::Handled),
            None => {
                warn!(entry = %name, error = %err, "No catch handler, propagating error");
                Err(err)
            }
        },
    };

    if let Some(finally) = &hooks.finally {
        finally.call().settle().await?;
    }

    outcome
}

/// The wrapped entry functions produced by one configuration, by name
#[derive(Debug, Clone, Default)]
pub struct WrappedEntryFunctions(BTreeMap<String, WrappedEntryFunction>);

impl WrappedEntryFunctions {
    pub(crate) fn insert(&mut self, wrapped: WrappedEntryFunction) {
        self.0.insert(wrapped.name.clone(), wrapped);
    }

    pub fn get(&self, name: &str) -> Option<&WrappedEntryFunction> {
        self.0.get(name)
    }

    /// Call an entry function by name
    pub fn call(&self, name: &str, args: Value) -> Invocation {
        match self.get(name) {
            Some(wrapped) => wrapped.call(args),
            None => Invocation::Ready(Err(Error::InvalidUsage(format!(
                "no entry function named \"{name}\""
            )))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
