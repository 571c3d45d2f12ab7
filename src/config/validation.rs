use std::collections::BTreeMap;
use thiserror::Error;

use super::ConfigError;
use super::models::{GlobalConfig, LovitConfig, ModuleConfig, Profile};
use super::settings::Settings;
use crate::fetch::FetchConfig;
use crate::handlers::{Handler, Handlers, Registry, RegistryError};
use crate::shape::Shape;
use crate::status::{HandlerName, is_error_status};

const LOVIT_CONFIG: &str = "Lovit config";
const FETCH_CONFIG: &str = "fetch config";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Timeout must be positive: {field}")]
    ZeroTimeout { field: String },

    #[error("User agent must not be empty")]
    EmptyUserAgent,

    #[error("Default status path must not be empty")]
    EmptyStatusPath,

    #[error("error_code_map entry '{status}' maps to {code}, which is not an error status")]
    NonErrorCode { status: String, code: u16 },
}

/// Validate static settings
pub fn validate_settings(settings: &Settings) -> Result<(), ValidationError> {
    validate_http(settings)?;

    if settings.status.path.trim().is_empty() {
        return Err(ValidationError::EmptyStatusPath);
    }

    for (status, code) in &settings.error_code_map {
        if !is_error_status(*code) {
            return Err(ValidationError::NonErrorCode {
                status: status.clone(),
                code: *code,
            });
        }
    }

    Ok(())
}

fn validate_http(settings: &Settings) -> Result<(), ValidationError> {
    let http = &settings.http;

    for (field, value) in [
        ("http.connect_timeout_ms", http.connect_timeout_ms),
        ("http.request_timeout_ms", http.request_timeout_ms),
    ] {
        if value == 0 {
            return Err(ValidationError::ZeroTimeout {
                field: field.to_string(),
            });
        }
    }

    if http.user_agent.trim().is_empty() {
        return Err(ValidationError::EmptyUserAgent);
    }

    Ok(())
}

/// Validate a configuration before anything is wrapped.
///
/// Every module is checked, and entry function names must be unique across
/// modules since callers look them up by name alone.
pub fn validate(config: &LovitConfig) -> Result<(), ConfigError> {
    if let Some(global) = &config.global {
        validate_global(global)?;
    }

    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();

    for (module_name, module) in &config.modules {
        validate_module(module_name, module)?;

        for entry_name in module.entry_functions.keys() {
            if let Some(first) = owners.insert(entry_name, module_name) {
                return Err(ConfigError::InvalidUsage(format!(
                    "entry function \"{entry_name}\" is defined in both \"{first}\" and \"{module_name}\" modules"
                )));
            }
        }
    }

    Ok(())
}

fn validate_global(global: &GlobalConfig) -> Result<(), ConfigError> {
    register_global(&mut Registry::new(), global)?;

    for (status, code) in &global.error_code_map {
        if !is_error_status(*code) {
            return Err(ConfigError::invalid_type(
                &format!("global.errorCodeMap.{status}"),
                LOVIT_CONFIG,
                "an error status from the status table",
            ));
        }
    }

    Ok(())
}

fn validate_module(module_name: &str, module: &ModuleConfig) -> Result<(), ConfigError> {
    validate_name("module", module_name, &format!("modules.{module_name}"))?;

    if let Some(profile) = &module.profile {
        for task_name in profile.tasks.keys() {
            validate_name(
                "task",
                task_name,
                &format!("modules.{module_name}.profile.tasks.{task_name}"),
            )?;
        }
        register_profile(&mut Registry::new(), module_name, profile)?;
    }

    for entry_name in module.entry_functions.keys() {
        validate_name(
            "entry function",
            entry_name,
            &format!("modules.{module_name}.entryFunctions.{entry_name}"),
        )?;
    }

    Ok(())
}

fn validate_name(what: &str, name: &str, path: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.contains('.') {
        return Err(ConfigError::Incorrect(format!(
            "{what} name \"{name}\" at \"{path}\" in the {LOVIT_CONFIG}, expected a non-empty name without dots"
        )));
    }
    Ok(())
}

/// Register the global handlers of `global` into `registry`
pub(crate) fn register_global(registry: &mut Registry, global: &GlobalConfig) -> Result<(), ConfigError> {
    for (slot, handler, path) in slots(&global.handlers, "global.handlers")? {
        registry
            .register_global(slot, handler)
            .map_err(|err| kind_error(&path, err))?;
    }
    Ok(())
}

/// Register a module's shared and per-task handlers into `registry`
pub(crate) fn register_profile(
    registry: &mut Registry,
    module_name: &str,
    profile: &Profile,
) -> Result<(), ConfigError> {
    let profile_path = format!("modules.{module_name}.profile");

    for (slot, handler, path) in slots(&profile.shared_handlers, &format!("{profile_path}.sharedHandlers"))? {
        registry
            .register_shared(module_name, slot, handler)
            .map_err(|err| kind_error(&path, err))?;
    }

    for (task_name, handlers) in &profile.tasks {
        registry.add_task(module_name, task_name);
        for (slot, handler, path) in slots(handlers, &format!("{profile_path}.tasks.{task_name}"))? {
            registry
                .register(module_name, task_name, slot, handler)
                .map_err(|err| kind_error(&path, err))?;
        }
    }

    Ok(())
}

/// Parse handler names into slots, keeping each handler's config path
fn slots(handlers: &Handlers, path: &str) -> Result<Vec<(HandlerName, Handler, String)>, ConfigError> {
    handlers
        .iter()
        .map(|(name, handler)| {
            let handler_path = format!("{path}.{name}");
            let slot: HandlerName = name.parse().map_err(|_| {
                ConfigError::Incorrect(format!(
                    "handler name \"{name}\" at \"{handler_path}\" in the {LOVIT_CONFIG}"
                ))
            })?;
            Ok::<_, ConfigError>((slot, handler.clone(), handler_path))
        })
        .collect()
}

fn kind_error(path: &str, err: RegistryError) -> ConfigError {
    match err {
        RegistryError::KindMismatch { expected, .. } => {
            ConfigError::invalid_type(path, LOVIT_CONFIG, expected.to_string())
        }
    }
}

/// Validate a fetch descriptor before the request runs
pub fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.key.is_empty() {
        return Err(ConfigError::missing("key", FETCH_CONFIG));
    }

    let well_formed = config
        .key
        .split_once('.')
        .is_some_and(|(module, task)| !module.is_empty() && !task.is_empty() && !task.contains('.'));
    if !well_formed {
        return Err(ConfigError::invalid_type(
            "key",
            FETCH_CONFIG,
            "a \"module.task\" string",
        ));
    }

    let has_url = config.url.as_deref().is_some_and(|url| !url.is_empty());
    match (has_url, config.request_fn.is_some()) {
        (false, false) => {
            return Err(ConfigError::Missing(format!(
                "path: \"url\", \"requestFn\" in the {FETCH_CONFIG}. Provide one of these"
            )));
        }
        (true, true) => {
            return Err(ConfigError::InvalidUsage(format!(
                "provide only one of \"url\" or \"requestFn\" in the {FETCH_CONFIG}"
            )));
        }
        _ => {}
    }

    if let Some(data) = &config.data {
        if !Shape::Object.matches(data) {
            return Err(ConfigError::invalid_type(
                "data",
                FETCH_CONFIG,
                Shape::Object.to_string(),
            ));
        }
    }

    if let Some(status_path) = &config.status_path {
        if status_path.path.is_empty() {
            return Err(ConfigError::missing("statusPath.path", FETCH_CONFIG));
        }

        let has_error_name = status_path
            .error_name
            .as_deref()
            .is_some_and(|name| !name.is_empty());
        if status_path.in_catch_block && !has_error_name {
            return Err(ConfigError::missing("statusPath.errorName", FETCH_CONFIG));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Profile, Settings};
    use crate::error::Error;
    use crate::fetch::RequestFn;
    use crate::handlers::{CatchHandler, EntryFunction, FinallyHandler, StatusHandler};
    use crate::status::StatusPath;
    use serde_json::{Value, json};

    fn entry() -> EntryFunction {
        EntryFunction::sync(|args| Ok(args))
    }

    fn request_fn() -> RequestFn {
        RequestFn::new(|| async { Ok::<Value, Error>(json!({ "status": 200 })) })
    }

    #[test]
    fn test_valid_config() {
        let config = LovitConfig::new()
            .module(
                "post",
                ModuleConfig::new()
                    .profile(
                        Profile::new()
                            .task(
                                "getPosts",
                                Handlers::new().on(HandlerName::NotFound, StatusHandler::new(|_| ())),
                            )
                            .shared(Handlers::new().catch(CatchHandler::new(|_| ()))),
                    )
                    .entry_function("getPosts", entry()),
            )
            .global(
                GlobalConfig::new()
                    .handlers(Handlers::new().finally(FinallyHandler::new(|| ())))
                    .error_code("auth/invalid-email", 400),
            );

        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_unknown_handler_name() {
        let config = LovitConfig::new().module(
            "post",
            ModuleConfig::new().profile(
                Profile::new().task("getPosts", Handlers::new().with("notFnd", StatusHandler::new(|_| ()))),
            ),
        );

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Incorrect(_)));
        assert!(err.to_string().contains("modules.post.profile.tasks.getPosts.notFnd"));
    }

    #[test]
    fn test_handler_kind_must_fit_slot() {
        let config = LovitConfig::new().global(
            GlobalConfig::new().handlers(Handlers::new().with("catch", StatusHandler::new(|_| ()))),
        );

        let err = validate(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type for \"global.handlers.catch\" in the Lovit config. Expected catch handler."
        );
    }

    #[test]
    fn test_register_profile_fills_registry() {
        let profile = Profile::new()
            .task("getPosts", Handlers::new().on(HandlerName::NotFound, StatusHandler::new(|_| ())))
            .task("createPost", Handlers::new())
            .shared(Handlers::new().catch(CatchHandler::new(|_| ())));

        let mut registry = Registry::new();
        register_profile(&mut registry, "post", &profile).unwrap();

        assert!(registry.has_task("post", "createPost"));
        assert!(registry.resolve_status("post", "getPosts", HandlerName::NotFound).is_some());
        assert!(registry.resolve_status("post", "createPost", HandlerName::NotFound).is_none());
        assert!(registry.resolve_catch("post", "createPost").is_some());
    }

    #[test]
    fn test_register_profile_reports_kind_mismatch_path() {
        let profile = Profile::new().task(
            "getPosts",
            Handlers::new().with("finally", CatchHandler::new(|_| ())),
        );

        let err = register_profile(&mut Registry::new(), "post", &profile).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type for \"modules.post.profile.tasks.getPosts.finally\" in the Lovit config. Expected finally handler."
        );
    }

    #[test]
    fn test_every_module_is_validated() {
        // The first module has no shared handlers; the second is still checked.
        let config = LovitConfig::new()
            .module("a", ModuleConfig::new().profile(Profile::new()))
            .module(
                "b",
                ModuleConfig::new().profile(
                    Profile::new().task("t", Handlers::new().with("bogus", StatusHandler::new(|_| ()))),
                ),
            );

        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_entry_function_names() {
        let config = LovitConfig::new()
            .module("post", ModuleConfig::new().entry_function("load", entry()))
            .module("user", ModuleConfig::new().entry_function("load", entry()));

        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUsage(_)));
    }

    #[test]
    fn test_names_without_dots() {
        let config = LovitConfig::new().module("post.v2", ModuleConfig::new());
        assert!(matches!(validate(&config), Err(ConfigError::Incorrect(_))));
    }

    #[test]
    fn test_error_code_map_values_must_be_error_statuses() {
        let config = LovitConfig::new().global(GlobalConfig::new().error_code("ok", 200));
        assert!(matches!(validate(&config), Err(ConfigError::InvalidType { .. })));
    }

    #[test]
    fn test_fetch_config_requires_exactly_one_source() {
        let neither = FetchConfig::builder().key("post.getPosts").build();
        let err = validate_fetch_config(&neither).unwrap_err();
        assert!(err.to_string().contains("Provide one of these"));

        let both = FetchConfig::builder()
            .key("post.getPosts")
            .url("http://localhost/posts")
            .request_fn(request_fn())
            .build();
        assert!(matches!(validate_fetch_config(&both), Err(ConfigError::InvalidUsage(_))));

        let url_only = FetchConfig::builder()
            .key("post.getPosts")
            .url("http://localhost/posts")
            .build();
        assert!(validate_fetch_config(&url_only).is_ok());
    }

    #[test]
    fn test_fetch_config_key_and_data() {
        let bad_key = FetchConfig::builder().key("getPosts").request_fn(request_fn()).build();
        assert!(matches!(
            validate_fetch_config(&bad_key),
            Err(ConfigError::InvalidType { .. })
        ));

        let nested_key = FetchConfig::builder().key("post.get.posts").request_fn(request_fn()).build();
        assert!(matches!(
            validate_fetch_config(&nested_key),
            Err(ConfigError::InvalidType { .. })
        ));

        let bad_data = FetchConfig::builder()
            .key("post.getPosts")
            .request_fn(request_fn())
            .data(Value::from("nope"))
            .build();
        assert_eq!(
            validate_fetch_config(&bad_data).unwrap_err().to_string(),
            "Invalid type for \"data\" in the fetch config. Expected object."
        );
    }

    #[test]
    fn test_fetch_config_catch_block_requires_error_name() {
        let config = FetchConfig::builder()
            .key("user.login")
            .request_fn(request_fn())
            .status_path(StatusPath {
                path: "code".into(),
                in_catch_block: true,
                error_name: None,
            })
            .build();

        assert_eq!(
            validate_fetch_config(&config).unwrap_err(),
            ConfigError::missing("statusPath.errorName", "fetch config")
        );
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }
}
