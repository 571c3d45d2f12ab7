//! The configured instance
//!
//! [`Lovit`] owns the handler registry and the transport. `configure`
//! validates a [`LovitConfig`], builds a new registry snapshot and swaps it
//! in; calls already running keep the snapshot they started with.
//!
//! The free functions [`configure`], [`fetch`] and [`reset`] work on one
//! process-wide instance. Tests and embedders that want isolation create
//! their own with [`Lovit::new`].

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::{debug, info};

use crate::config::{
    ConfigError, GlobalConfig, LovitConfig, Settings, register_global, register_profile, validate,
};
use crate::error::{Error, Failure};
use crate::fetch::{Dispatch, FetchConfig, FetchResponse, HttpConfig, ReqwestTransport, Transport};
use crate::handlers::{
    GlobalEntry, Hooks, ModuleEntry, Registry, WrappedEntryFunction, WrappedEntryFunctions,
};
use crate::status::{ErrorCodes, StatusPath};

struct Inner {
    registry: RwLock<Arc<Registry>>,
    transport: OnceLock<Arc<dyn Transport>>,
    http: HttpConfig,
    status_path: StatusPath,
    /// Custom status codes from settings, under whatever `configure` adds
    base_error_codes: BTreeMap<String, u16>,
}

/// A handler registry plus the means to dispatch requests against it
#[derive(Clone)]
pub struct Lovit {
    inner: Arc<Inner>,
}

impl Default for Lovit {
    fn default() -> Self {
        Self::new()
    }
}

impl Lovit {
    /// An instance with default settings; the HTTP client is built on first use
    pub fn new() -> Self {
        Self::from_parts(HttpConfig::default(), StatusPath::default(), BTreeMap::new())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_parts(
            HttpConfig::from(&settings.http),
            StatusPath::new(settings.status.path.clone()),
            GlobalConfig::from_settings(settings).error_code_map,
        )
    }

    /// An instance sending URL requests through `transport`
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        let lovit = Self::new();
        let _ = lovit.inner.transport.set(Arc::new(transport));
        lovit
    }

    fn from_parts(http: HttpConfig, status_path: StatusPath, base_error_codes: BTreeMap<String, u16>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: RwLock::new(Arc::new(Registry::new())),
                transport: OnceLock::new(),
                http,
                status_path,
                base_error_codes,
            }),
        }
    }

    fn transport(&self) -> Result<Arc<dyn Transport>, Error> {
        if let Some(transport) = self.inner.transport.get() {
            return Ok(transport.clone());
        }

        let built: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&self.inner.http)?);
        // A concurrent first use may have won; keep whichever was stored.
        Ok(self.inner.transport.get_or_init(|| built).clone())
    }

    /// The registry snapshot calls currently resolve against
    pub fn registry(&self) -> Arc<Registry> {
        self.inner.registry.read().clone()
    }

    /// Validate `config`, register its handlers and wrap its entry functions.
    ///
    /// Modules in `config` replace modules of the same name; other modules
    /// stay. The global configuration is always replaced, by an empty one
    /// when `config.global` is `None`. Nothing changes when validation fails.
    pub fn configure(&self, config: LovitConfig) -> Result<WrappedEntryFunctions, ConfigError> {
        validate(&config)?;

        let LovitConfig { modules, global } = config;
        let mut registry = Registry::clone(&self.registry());

        let global = global.unwrap_or_default();
        let mut error_code_map = self.inner.base_error_codes.clone();
        error_code_map.extend(global.error_code_map.clone());
        registry.replace_global(GlobalEntry {
            codes: ErrorCodes::new(error_code_map, global.error_code_mapper.clone()),
            ..GlobalEntry::default()
        });
        register_global(&mut registry, &global)?;

        let mut entries = Vec::new();
        for (module_name, module) in modules {
            registry.replace_module(module_name.clone(), ModuleEntry::default());
            if let Some(profile) = &module.profile {
                register_profile(&mut registry, &module_name, profile)?;
            }
            entries.push((module_name, module.entry_functions));
        }

        let mut wrapped = WrappedEntryFunctions::default();
        for (module_name, entry_functions) in entries {
            for (name, entry) in entry_functions {
                let hooks = Hooks {
                    catch: registry.resolve_catch(&module_name, &name).cloned(),
                    finally: registry.resolve_finally(&module_name, &name).cloned(),
                };
                debug!(
                    module = %module_name,
                    entry = %name,
                    catch = hooks.catch.is_some(),
                    finally = hooks.finally.is_some(),
                    "Wrapping entry function"
                );
                wrapped.insert(WrappedEntryFunction::new(name, module_name.clone(), entry, hooks));
            }
        }

        *self.inner.registry.write() = Arc::new(registry);
        info!(entry_functions = wrapped.len(), "Configuration applied");

        Ok(wrapped)
    }

    /// Drop every registered module and the global configuration
    pub fn reset(&self) {
        *self.inner.registry.write() = Arc::new(Registry::new());
        debug!("Registry reset");
    }

    /// Run a request and check its status.
    ///
    /// An error status is routed to its handler and then reported as
    /// [`Failure::Handled`], which a wrapped entry function turns into
    /// [`Outcome::Handled`](crate::handlers::Outcome::Handled).
    pub async fn fetch(&self, config: FetchConfig) -> Result<FetchResponse, Failure> {
        let transport = match config.url {
            Some(_) => Some(self.transport()?),
            None => None,
        };

        let dispatch = Dispatch {
            registry: self.registry(),
            transport,
            default_status_path: self.inner.status_path.clone(),
        };

        dispatch.run(config).await
    }
}

static GLOBAL: LazyLock<Lovit> = LazyLock::new(Lovit::new);

/// The process-wide instance behind the free functions
pub fn global() -> &'static Lovit {
    &GLOBAL
}

/// [`Lovit::configure`] on the process-wide instance
pub fn configure(config: LovitConfig) -> Result<WrappedEntryFunctions, ConfigError> {
    GLOBAL.configure(config)
}

/// [`Lovit::fetch`] on the process-wide instance
pub async fn fetch(config: FetchConfig) -> Result<FetchResponse, Failure> {
    GLOBAL.fetch(config).await
}

/// [`Lovit::reset`] on the process-wide instance
pub fn reset() {
    GLOBAL.reset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModuleConfig, Profile};
    use crate::handlers::{
        CatchHandler, Context, EntryFunction, FinallyHandler, Handlers, Outcome, StatusHandler,
    };
    use crate::status::{HandlerName, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn push(log: &Log, entry: impl Into<String>) {
        log.lock().unwrap().push(entry.into());
    }

    fn status_handler(log: &Log, tag: &'static str) -> StatusHandler {
        let log = log.clone();
        StatusHandler::new(move |ctx: Context| push(&log, format!("{tag}: {}", ctx.handler)))
    }

    /// An entry function fetching a fixed response through a request function
    fn fetching(lovit: &Lovit, key: &'static str, response: Value) -> EntryFunction {
        let lovit = lovit.clone();
        EntryFunction::future(move |_| {
            let lovit = lovit.clone();
            let response = response.clone();
            async move {
                let config = FetchConfig::builder()
                    .key(key)
                    .request_fn(crate::fetch::RequestFn::new(move || {
                        let response = response.clone();
                        async move { Ok::<Value, Error>(response) }
                    }))
                    .data(json!({ "page": 1 }))
                    .build();
                Ok::<Value, Failure>(lovit.fetch(config).await?.into_value())
            }
        })
    }

    #[tokio::test]
    async fn test_success_status_returns_response() {
        let lovit = Lovit::new();
        let log = Log::default();
        let finally_log = log.clone();

        let functions = lovit
            .configure(
                LovitConfig::new().module(
                    "post",
                    ModuleConfig::new()
                        .profile(
                            Profile::new().task(
                                "getPosts",
                                Handlers::new()
                                    .finally(FinallyHandler::new(move || push(&finally_log, "finally"))),
                            ),
                        )
                        .entry_function("getPosts", fetching(&lovit, "post.getPosts", json!({ "status": 200 }))),
                ),
            )
            .unwrap();

        let outcome = functions.call("getPosts", Value::Null).await.unwrap();
        assert_eq!(outcome, Outcome::Completed(json!({ "status": 200 })));
        assert_eq!(*log.lock().unwrap(), vec!["finally"]);
    }

    #[tokio::test]
    async fn test_error_status_routes_context_then_finally() {
        let lovit = Lovit::new();
        let log = Log::default();
        let contexts = Arc::new(Mutex::new(Vec::<Context>::new()));

        let seen = contexts.clone();
        let finally_log = log.clone();
        let catch_log = log.clone();
        let handlers = Handlers::new()
            .on(
                HandlerName::NotFound,
                StatusHandler::new(move |ctx: Context| seen.lock().unwrap().push(ctx)),
            )
            .catch(CatchHandler::new(move |err| push(&catch_log, format!("catch: {err}"))))
            .finally(FinallyHandler::new(move || push(&finally_log, "finally")));

        let functions = lovit
            .configure(
                LovitConfig::new().module(
                    "post",
                    ModuleConfig::new()
                        .profile(Profile::new().task("getPosts", handlers))
                        .entry_function("getPosts", fetching(&lovit, "post.getPosts", json!({ "status": 404 }))),
                ),
            )
            .unwrap();

        let outcome = functions.call("getPosts", Value::Null).await.unwrap();
        assert!(outcome.is_handled());
        assert_eq!(*log.lock().unwrap(), vec!["finally"]);

        let contexts = contexts.lock().unwrap();
        assert_eq!(contexts.len(), 1);
        let ctx = &contexts[0];
        assert_eq!(ctx.status_code, StatusCode::Code(404));
        assert_eq!(ctx.status_text, "Not Found");
        assert_eq!(ctx.module, "post");
        assert_eq!(ctx.task, "getPosts");
        assert_eq!(ctx.handler, HandlerName::NotFound);
        assert_eq!(ctx.data, json!({ "page": 1 }));
        assert_eq!(ctx.response, json!({ "status": 404 }));
    }

    #[tokio::test]
    async fn test_failed_handles_status_without_specific_handler() {
        let lovit = Lovit::new();
        let log = Log::default();

        let functions = lovit
            .configure(
                LovitConfig::new()
                    .module(
                        "post",
                        ModuleConfig::new()
                            .profile(Profile::new().shared(Handlers::new().failed(status_handler(&log, "shared failed"))))
                            .entry_function("getPosts", fetching(&lovit, "post.getPosts", json!({ "status": 503 }))),
                    )
                    .global(GlobalConfig::new().handlers(Handlers::new().on(
                        HandlerName::ServiceUnavailable,
                        status_handler(&log, "global"),
                    ))),
            )
            .unwrap();

        // The global status handler is more specific than a shared `failed`
        let outcome = functions.call("getPosts", Value::Null).await.unwrap();
        assert!(outcome.is_handled());
        assert_eq!(*log.lock().unwrap(), vec!["global: serviceUnavailable"]);
    }

    #[tokio::test]
    async fn test_custom_status_through_error_code_map() {
        let lovit = Lovit::new();
        let log = Log::default();

        let functions = lovit
            .configure(
                LovitConfig::new()
                    .module(
                        "user",
                        ModuleConfig::new().entry_function(
                            "login",
                            fetching(&lovit, "user.login", json!({ "status": "auth/user-disabled" })),
                        ),
                    )
                    .global(
                        GlobalConfig::new()
                            .handlers(Handlers::new().failed(status_handler(&log, "failed")))
                            .error_code_mapper(|status| status.starts_with("auth/").then_some(403)),
                    ),
            )
            .unwrap();

        functions.call("login", Value::Null).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["failed: forbidden"]);
    }

    #[test]
    fn test_catch_resolved_with_precedence_at_configure_time() {
        let lovit = Lovit::new();
        let log = Log::default();
        let task_log = log.clone();
        let global_log = log.clone();

        let functions = lovit
            .configure(
                LovitConfig::new()
                    .module(
                        "post",
                        ModuleConfig::new()
                            .profile(Profile::new().task(
                                "create",
                                Handlers::new().catch(CatchHandler::new(move |_| push(&task_log, "task catch"))),
                            ))
                            .entry_function("create", EntryFunction::sync(|_| Err(Error::other("boom").into())))
                            .entry_function("remove", EntryFunction::sync(|_| Err(Error::other("boom").into()))),
                    )
                    .global(GlobalConfig::new().handlers(
                        Handlers::new().catch(CatchHandler::new(move |_| push(&global_log, "global catch"))),
                    )),
            )
            .unwrap();

        assert!(functions.call("create", Value::Null).ready().unwrap().unwrap().is_handled());
        assert!(functions.call("remove", Value::Null).ready().unwrap().unwrap().is_handled());
        assert_eq!(*log.lock().unwrap(), vec!["task catch", "global catch"]);
    }

    #[test]
    fn test_invalid_config_changes_nothing() {
        let lovit = Lovit::new();
        lovit
            .configure(LovitConfig::new().module("post", ModuleConfig::new().profile(Profile::new().task("a", Handlers::new()))))
            .unwrap();

        let bad = LovitConfig::new().module("post.v2", ModuleConfig::new());
        assert!(lovit.configure(bad).is_err());
        assert!(lovit.registry().has_task("post", "a"));
    }

    #[test]
    fn test_configure_rejects_handler_of_wrong_kind() {
        let lovit = Lovit::new();
        let config = LovitConfig::new().module(
            "post",
            ModuleConfig::new().profile(
                Profile::new().shared(Handlers::new().with("notFound", FinallyHandler::new(|| ()))),
            ),
        );

        let err = lovit.configure(config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid type for \"modules.post.profile.sharedHandlers.notFound\" in the Lovit config. Expected status handler."
        );
        assert!(!lovit.registry().has_module("post"));
    }

    #[test]
    fn test_reconfigure_replaces_modules_by_name() {
        let lovit = Lovit::new();
        lovit
            .configure(
                LovitConfig::new()
                    .module("post", ModuleConfig::new().profile(Profile::new().task("a", Handlers::new())))
                    .module("user", ModuleConfig::new().profile(Profile::new().task("b", Handlers::new()))),
            )
            .unwrap();

        lovit
            .configure(LovitConfig::new().module("post", ModuleConfig::new().profile(Profile::new().task("c", Handlers::new()))))
            .unwrap();

        let registry = lovit.registry();
        assert!(!registry.has_task("post", "a"));
        assert!(registry.has_task("post", "c"));
        assert!(registry.has_task("user", "b"));

        lovit.reset();
        assert!(!lovit.registry().has_module("user"));
    }

    #[test]
    fn test_settings_error_codes_survive_configure() {
        let mut settings = Settings::default();
        settings.error_code_map.insert("quota".into(), 429);
        let lovit = Lovit::from_settings(&settings);

        lovit
            .configure(LovitConfig::new().global(GlobalConfig::new().error_code("banned", 403)))
            .unwrap();

        let registry = lovit.registry();
        assert_eq!(registry.error_codes().lookup("quota"), Some(429));
        assert_eq!(registry.error_codes().lookup("banned"), Some(403));
    }
}
