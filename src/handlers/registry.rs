use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use super::types::{CatchHandler, FinallyHandler, Handler, HandlerSet, StatusHandler};
use crate::status::{ErrorCodes, HandlerKind, HandlerName};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{slot} expects a {expected}, got a {found}")]
    KindMismatch {
        slot: HandlerName,
        expected: HandlerKind,
        found: HandlerKind,
    },
}

/// Handlers of one module: per task, plus shared fallbacks for every task
#[derive(Debug, Clone, Default)]
pub struct ModuleEntry {
    pub tasks: BTreeMap<String, HandlerSet>,
    pub shared: HandlerSet,
}

/// Global fallback handlers and the custom status code table
#[derive(Debug, Clone, Default)]
pub struct GlobalEntry {
    pub handlers: HandlerSet,
    pub codes: ErrorCodes,
}

/// Lookup of (module, task, slot) to handler.
///
/// Resolution tries the task's own handlers, then the module's shared
/// handlers, then the global handlers. It never fails: absence is `None`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: BTreeMap<String, ModuleEntry>,
    global: GlobalEntry,
}

fn check_kind(slot: HandlerName, handler: &Handler) -> Result<(), RegistryError> {
    let expected = slot.kind();
    let found = handler.kind();
    if expected == found {
        Ok(())
    } else {
        Err(RegistryError::KindMismatch {
            slot,
            expected,
            found,
        })
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a handler for one task of a module
    pub fn register(
        &mut self,
        module: &str,
        task: &str,
        slot: HandlerName,
        handler: Handler,
    ) -> Result<(), RegistryError> {
        check_kind(slot, &handler)?;
        self.task_handlers(module, task).insert(slot, handler);
        Ok(())
    }

    /// Declare a task with no handlers of its own yet
    pub fn add_task(&mut self, module: &str, task: &str) {
        self.task_handlers(module, task);
    }

    fn task_handlers(&mut self, module: &str, task: &str) -> &mut HandlerSet {
        self.modules
            .entry(module.to_string())
            .or_default()
            .tasks
            .entry(task.to_string())
            .or_default()
    }

    /// Store a handler used by every task of the module lacking that slot
    pub fn register_shared(
        &mut self,
        module: &str,
        slot: HandlerName,
        handler: Handler,
    ) -> Result<(), RegistryError> {
        check_kind(slot, &handler)?;
        self.modules
            .entry(module.to_string())
            .or_default()
            .shared
            .insert(slot, handler);
        Ok(())
    }

    pub fn register_global(&mut self, slot: HandlerName, handler: Handler) -> Result<(), RegistryError> {
        check_kind(slot, &handler)?;
        self.global.handlers.insert(slot, handler);
        Ok(())
    }

    /// Replace everything registered under `module`
    pub fn replace_module(&mut self, module: impl Into<String>, entry: ModuleEntry) {
        let module = module.into();
        debug!(module = %module, tasks = entry.tasks.len(), "Replacing module handlers");
        self.modules.insert(module, entry);
    }

    pub fn replace_global(&mut self, global: GlobalEntry) {
        self.global = global;
    }

    pub fn has_module(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    pub fn has_task(&self, module: &str, task: &str) -> bool {
        self.modules
            .get(module)
            .is_some_and(|entry| entry.tasks.contains_key(task))
    }

    pub fn resolve(&self, module: &str, task: &str, slot: HandlerName) -> Option<&Handler> {
        let entry = self.modules.get(module);

        entry
            .and_then(|entry| entry.tasks.get(task))
            .and_then(|handlers| handlers.get(slot))
            .or_else(|| entry.and_then(|entry| entry.shared.get(slot)))
            .or_else(|| self.global.handlers.get(slot))
    }

    pub fn resolve_status(&self, module: &str, task: &str, slot: HandlerName) -> Option<&StatusHandler> {
        self.resolve(module, task, slot).and_then(Handler::as_status)
    }

    pub fn resolve_catch(&self, module: &str, task: &str) -> Option<&CatchHandler> {
        self.resolve(module, task, HandlerName::Catch)
            .and_then(Handler::as_catch)
    }

    pub fn resolve_finally(&self, module: &str, task: &str) -> Option<&FinallyHandler> {
        self.resolve(module, task, HandlerName::Finally)
            .and_then(Handler::as_finally)
    }

    pub fn error_codes(&self) -> &ErrorCodes {
        &self.global.codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerOutput;
    use crate::status::StatusCode;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    fn tagged(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> StatusHandler {
        let log = log.clone();
        StatusHandler::new(move |_| log.lock().unwrap().push(tag))
    }

    fn context(slot: HandlerName) -> crate::handlers::Context {
        crate::handlers::Context {
            data: Value::Null,
            response: Value::Null,
            status_text: slot.status_text(),
            status_code: StatusCode::Unknown,
            module: "post".into(),
            task: "getPosts".into(),
            handler: slot,
        }
    }

    fn fire(registry: &Registry, task: &str, slot: HandlerName) {
        let handler = registry
            .resolve_status("post", task, slot)
            .expect("handler should resolve");
        assert!(matches!(handler.call(context(slot)), HandlerOutput::Ready(Ok(()))));
    }

    #[test]
    fn test_precedence_task_then_shared_then_global() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();

        for slot in [HandlerName::NotFound, HandlerName::Failed] {
            registry.register_global(slot, tagged(&log, "global").into()).unwrap();
        }
        registry
            .register_shared("post", HandlerName::NotFound, tagged(&log, "shared").into())
            .unwrap();
        registry
            .register("post", "getPosts", HandlerName::NotFound, tagged(&log, "task").into())
            .unwrap();

        fire(&registry, "getPosts", HandlerName::NotFound);
        fire(&registry, "createPost", HandlerName::NotFound);
        fire(&registry, "getPosts", HandlerName::Failed);

        assert_eq!(*log.lock().unwrap(), vec!["task", "shared", "global"]);
    }

    /// A handler of the kind `slot` takes, recording `tag` when called
    fn tagged_for(slot: HandlerName, log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        let log = log.clone();
        match slot.kind() {
            HandlerKind::Status => StatusHandler::new(move |_| log.lock().unwrap().push(tag)).into(),
            HandlerKind::Catch => CatchHandler::new(move |_| log.lock().unwrap().push(tag)).into(),
            HandlerKind::Finally => FinallyHandler::new(move || log.lock().unwrap().push(tag)).into(),
        }
    }

    fn invoke(handler: &Handler, slot: HandlerName) -> HandlerOutput {
        match handler {
            Handler::Status(handler) => handler.call(context(slot)),
            Handler::Catch(handler) => handler.call(crate::error::Error::other("boom")),
            Handler::Finally(handler) => handler.call(),
        }
    }

    #[test]
    fn test_precedence_holds_for_every_slot() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();

        for slot in HandlerName::all() {
            registry.register_global(slot, tagged_for(slot, &log, "global")).unwrap();
            registry
                .register_shared("post", slot, tagged_for(slot, &log, "shared"))
                .unwrap();
            registry
                .register("post", "getPosts", slot, tagged_for(slot, &log, "task"))
                .unwrap();
        }

        for slot in HandlerName::all() {
            for (module, task, expected) in [
                ("post", "getPosts", "task"),
                ("post", "createPost", "shared"),
                ("user", "login", "global"),
            ] {
                let handler = registry
                    .resolve(module, task, slot)
                    .unwrap_or_else(|| panic!("{slot} should resolve for {module}.{task}"));
                assert!(matches!(invoke(handler, slot), HandlerOutput::Ready(Ok(()))));

                let called = log.lock().unwrap().pop();
                assert_eq!(called, Some(expected), "{slot} for {module}.{task}");
            }
        }
    }

    #[test]
    fn test_structural_slots_follow_same_precedence() {
        let mut registry = Registry::new();
        registry
            .register_global(HandlerName::Finally, FinallyHandler::new(|| ()).into())
            .unwrap();
        registry
            .register_shared("post", HandlerName::Catch, CatchHandler::new(|_| ()).into())
            .unwrap();

        assert!(registry.resolve_catch("post", "getPosts").is_some());
        assert!(registry.resolve_catch("user", "login").is_none());
        assert!(registry.resolve_finally("user", "login").is_some());
    }

    #[test]
    fn test_resolution_never_fails() {
        let registry = Registry::new();
        assert!(registry.resolve("missing", "task", HandlerName::NotFound).is_none());
        assert!(registry.resolve_finally("missing", "task").is_none());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mut registry = Registry::new();
        let result = registry.register(
            "post",
            "getPosts",
            HandlerName::Catch,
            StatusHandler::new(|_| ()).into(),
        );
        assert!(matches!(
            result,
            Err(RegistryError::KindMismatch {
                slot: HandlerName::Catch,
                expected: HandlerKind::Catch,
                found: HandlerKind::Status,
            })
        ));
    }

    #[test]
    fn test_replace_module_drops_previous_tasks() {
        let mut registry = Registry::new();
        registry
            .register("post", "getPosts", HandlerName::NotFound, StatusHandler::new(|_| ()).into())
            .unwrap();
        assert!(registry.has_task("post", "getPosts"));

        registry.replace_module("post", ModuleEntry::default());
        assert!(registry.has_module("post"));
        assert!(!registry.has_task("post", "getPosts"));
    }
}
