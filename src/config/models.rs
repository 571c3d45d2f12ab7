use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::settings::Settings;
use crate::handlers::{EntryFunction, Handlers};
use crate::status::ErrorCodeMapper;

/// Everything handed to `configure`
#[derive(Debug, Clone, Default)]
pub struct LovitConfig {
    pub modules: BTreeMap<String, ModuleConfig>,
    /// Replaces the previous global configuration entirely when present
    pub global: Option<GlobalConfig>,
}

impl LovitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, name: impl Into<String>, module: ModuleConfig) -> Self {
        self.modules.insert(name.into(), module);
        self
    }

    pub fn global(mut self, global: GlobalConfig) -> Self {
        self.global = Some(global);
        self
    }
}

/// One module: its handler profile and the entry functions to wrap.
///
/// An entry function is bound to the task of the same name.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    pub profile: Option<Profile>,
    pub entry_functions: BTreeMap<String, EntryFunction>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn entry_function(mut self, name: impl Into<String>, entry: EntryFunction) -> Self {
        self.entry_functions.insert(name.into(), entry);
        self
    }
}

/// Handlers of a module: per task, plus shared ones for every task
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub name: Option<String>,
    pub tasks: BTreeMap<String, Handlers>,
    pub shared_handlers: Handlers,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, name: impl Into<String>, handlers: Handlers) -> Self {
        self.tasks.insert(name.into(), handlers);
        self
    }

    pub fn shared(mut self, handlers: Handlers) -> Self {
        self.shared_handlers = handlers;
        self
    }
}

/// Input to [`create_profile`]; missing maps default to empty
#[derive(Debug, Clone, Default)]
pub struct ProfileConfig {
    pub name: Option<String>,
    pub tasks: Option<BTreeMap<String, Handlers>>,
    pub shared_handlers: Option<Handlers>,
}

pub fn create_profile(config: ProfileConfig) -> Profile {
    let ProfileConfig {
        name,
        tasks,
        shared_handlers,
    } = config;

    Profile {
        name,
        tasks: tasks.unwrap_or_default(),
        shared_handlers: shared_handlers.unwrap_or_default(),
    }
}

/// Global fallback handlers and the custom status code table
#[derive(Clone, Default)]
pub struct GlobalConfig {
    pub handlers: Handlers,
    pub error_code_map: BTreeMap<String, u16>,
    pub error_code_mapper: Option<ErrorCodeMapper>,
}

impl fmt::Debug for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalConfig")
            .field("handlers", &self.handlers)
            .field("error_code_map", &self.error_code_map)
            .field("error_code_mapper", &self.error_code_mapper.is_some())
            .finish()
    }
}

impl GlobalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the error code map from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            error_code_map: settings.error_code_map.clone(),
            ..Self::default()
        }
    }

    pub fn handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn error_code(mut self, status: impl Into<String>, code: u16) -> Self {
        self.error_code_map.insert(status.into(), code);
        self
    }

    pub fn error_code_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&str) -> Option<u16> + Send + Sync + 'static,
    {
        self.error_code_mapper = Some(Arc::new(mapper));
        self
    }
}
