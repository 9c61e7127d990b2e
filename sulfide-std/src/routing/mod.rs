//! Request path resolution and dispatch.
//!
//! A request path has the shape
//!
//! ```text
//! /[module/]handler/action/param1/param2/.../paramN
//! ```
//!
//! where every part is optional. The module qualifier is only recognized if a
//! module of that name is loaded. A missing handler falls back to
//! `routing.default_handler`; a missing action falls back to the handler's own
//! default and then to `routing.default_action`.
//!
//! Routing misses (invalid handler name, no handler artifact, no action
//! method and no redirect target) are not errors. They end in the terminal
//! [`Response::RoutingFailed`] after an `error` event, even when the miss
//! happens in a forward whose caller carries on.

mod controller;

pub use controller::{
    ActionResult, Context, Controller, EXECUTING, Handler, IntoActionResult, REDIRECTING,
    action_method,
};

use controller::RequestState;

use crate::{
    artifacts::{ArtifactLoader, Definition, handler_path, handler_type_name, module_handler_path},
    config::ConfigTree,
    hooks::{HookRegistry, Hookable},
    modules::ModuleRegistry,
};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use sulfide_core::{Arg, ConfigError, DispatchError, ForwardError, Parameters, Response};

/// Emitted with the raw path before anything else happens.
pub const REQUESTED: &str = "requested";
/// Emitted with the handler, action and parameters right before dispatch.
pub const DISPATCHING: &str = "dispatching";
/// Emitted, without arguments, on the terminal error path.
pub const ERROR: &str = "error";

/// Redirect bound used when `routing.max_redirects` is absent.
pub const DEFAULT_MAX_REDIRECTS: usize = 8;

fn handler_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("Invalid regex"))
}

/// Whether `name` may be used as a handler name.
///
/// Only ASCII letters, digits, `_`, `.` and `-` are allowed, and the
/// directory aliases `.` and `..` are refused.
pub fn is_valid_handler_name(name: &str) -> bool {
    name != "." && name != ".." && handler_name_pattern().is_match(name)
}

/// A resolved request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// The module qualifier, if the first segment named a loaded module.
    pub module: Option<String>,
    /// The handler name.
    pub handler: String,
    /// The action, if the path named one.
    pub action: Option<String>,
    /// Remaining segments.
    pub parameters: Vec<String>,
}

/// Maps request paths to handlers and drives their dispatch.
pub struct Resolver {
    config: Arc<ConfigTree>,
    modules: Arc<ModuleRegistry>,
    loader: Arc<dyn ArtifactLoader>,
    hooks: Arc<HookRegistry>,
}

impl Resolver {
    /// Create a resolver over the process-wide settings and module registry.
    pub fn new(
        config: Arc<ConfigTree>,
        modules: Arc<ModuleRegistry>,
        loader: Arc<dyn ArtifactLoader>,
    ) -> Self {
        Self {
            config,
            modules,
            loader,
            hooks: HookRegistry::new("core", "routing"),
        }
    }

    /// The settings tree.
    pub fn config(&self) -> &ConfigTree {
        &self.config
    }

    /// The module registry.
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// The redirect bound from `routing.max_redirects`.
    pub fn max_redirects(&self) -> usize {
        self.config
            .get_integer(&["routing", "max_redirects"])
            .ok()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_MAX_REDIRECTS)
    }

    /// Parse `path` into a [`Route`].
    ///
    /// Returns `Ok(None)` if the handler name is not allowed. Nothing is
    /// looked up except loaded module names and the default handler.
    pub fn resolve(&self, path: &str) -> Result<Option<Route>, ConfigError> {
        let mut segments = path.split('/').peekable();
        segments.next_if_eq(&"");

        let module = segments
            .next_if(|s| !s.is_empty() && self.modules.contains(s))
            .map(str::to_owned);

        let handler = match segments.next() {
            Some(s) if !s.is_empty() => s.to_owned(),
            _ => self.config.get_str(&["routing", "default_handler"])?,
        };
        if !is_valid_handler_name(&handler) {
            return Ok(None);
        }

        let action = segments
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        let parameters = segments.map(str::to_owned).collect();

        Ok(Some(Route {
            module,
            handler,
            action,
            parameters,
        }))
    }

    /// Construct the handler `handler`, optionally owned by `module`.
    ///
    /// Returns `Ok(None)` if the artifact does not exist or does not define
    /// the expected handler type. The name must already be validated.
    pub fn instantiate(
        &self,
        handler: &str,
        module: Option<&str>,
    ) -> Result<Option<Box<dyn Handler>>, ConfigError> {
        let path = match module {
            Some(module) => {
                let dir = self.config.get_str(&["paths", "modules"])?;
                module_handler_path(dir, module, handler)
            }
            None => {
                let dir = self.config.get_str(&["routing", "handler_dir"])?;
                handler_path(dir, handler)
            }
        };
        if !self.loader.exists(&path) {
            tracing::debug!(path = %path.display(), "no handler artifact");
            return Ok(None);
        }

        let expected = handler_type_name(handler);
        let found = self.loader.load(&path).into_iter().find_map(|def| match def {
            Definition::Handler { name, factory } if name == expected => Some(factory),
            _ => None,
        });
        if found.is_none() {
            tracing::debug!(path = %path.display(), %expected, "artifact defines no handler type");
        }
        Ok(found.map(|factory| factory()))
    }

    /// Route one request.
    ///
    /// Emits `requested`, resolves the path, instantiates the handler, emits
    /// `dispatching` and dispatches the action. Routing misses return
    /// `Ok(Response::RoutingFailed)`; internal failures return `Err`.
    pub fn route(&self, path: &str) -> Result<Response, DispatchError> {
        let request = RequestState::default();
        let result = self.route_within(&request, path);
        request.finish(result)
    }

    fn route_within(&self, request: &RequestState, path: &str) -> Result<Response, DispatchError> {
        self.hooks.emit(REQUESTED, &[Arg::Text(path)])?;

        let Some(route) = self.resolve(path)? else {
            tracing::debug!(path, "rejected handler name");
            return Err(self.fail(request));
        };
        let Some(handler) = self.instantiate(&route.handler, route.module.as_deref())? else {
            return Err(self.fail(request));
        };

        let action = match route.action {
            Some(action) => action,
            None => match handler.default_action() {
                Some(action) => action.to_owned(),
                None => self.config.get_str(&["routing", "default_action"])?,
            },
        };

        let mut controller = Controller::new(route.handler, route.module, handler);
        controller.set_parameters(Parameters::positional(route.parameters));

        tracing::debug!(
            handler = controller.name(),
            module = controller.module(),
            %action,
            "dispatching"
        );
        self.hooks.emit(
            DISPATCHING,
            &[
                Arg::Handler(controller.handler_ref()),
                Arg::Text(&action),
                Arg::Params(controller.parameters()),
            ],
        )?;
        controller.run(self, request, &action)
    }

    /// Dispatch `action` on the handler `handler` without parsing a path.
    ///
    /// Fails with [`ForwardError::ModuleNotLoaded`] if `module` is given but
    /// not loaded, and with [`ForwardError::HandlerNotFound`] if the handler
    /// name is not allowed or its artifact or type is missing. A routing miss
    /// in the target ends in `Ok(Response::RoutingFailed)`.
    pub fn forward(
        &self,
        handler: &str,
        action: &str,
        module: Option<&str>,
        parameters: Option<Parameters>,
    ) -> Result<Response, DispatchError> {
        let request = RequestState::default();
        let result = self.forward_within(&request, handler, action, module, parameters);
        request.finish(result)
    }

    pub(crate) fn forward_within(
        &self,
        request: &RequestState,
        handler: &str,
        action: &str,
        module: Option<&str>,
        parameters: Option<Parameters>,
    ) -> Result<Response, DispatchError> {
        if request.has_failed() {
            return Err(DispatchError::RoutingFailed);
        }
        if let Some(module) = module {
            if !self.modules.contains(module) {
                return Err(ForwardError::ModuleNotLoaded {
                    module: module.to_owned(),
                    handler: handler.to_owned(),
                    action: action.to_owned(),
                }
                .into());
            }
        }

        let not_found = || ForwardError::HandlerNotFound {
            handler: handler.to_owned(),
            module: module.map(str::to_owned),
            action: action.to_owned(),
        };
        if !is_valid_handler_name(handler) {
            return Err(not_found().into());
        }
        let instance = self.instantiate(handler, module)?.ok_or_else(not_found)?;

        tracing::debug!(handler, module, action, "forwarding");
        let mut controller = Controller::new(handler, module.map(str::to_owned), instance);
        controller.set_parameters(parameters.unwrap_or_default());
        controller.run(self, request, action)
    }

    /// The terminal error path: emit `error` and report the routing failure.
    pub fn route_error(&self) -> Result<Response, DispatchError> {
        let request = RequestState::default();
        let err = self.fail(&request);
        request.finish(Err(err))
    }

    /// Put `request` on the error path. `error` is emitted at most once.
    pub(crate) fn fail(&self, request: &RequestState) -> DispatchError {
        if !request.has_failed() {
            if let Err(err) = self.hooks.emit(ERROR, &[]) {
                return err.into();
            }
            request.mark_failed();
            tracing::warn!("routing error");
        }
        DispatchError::RoutingFailed
    }
}

impl Hookable for Resolver {
    fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("modules", &self.modules)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifacts::Catalog,
        testing::{CountingLoader, RecordingModule},
    };

    struct Blog;

    impl Handler for Blog {
        fn responds_to(&self, method: &str) -> bool {
            method == "doView"
        }

        fn invoke(&mut self, method: &str, cx: &mut Context<'_>) -> Option<ActionResult> {
            (method == "doView").then(|| {
                let id = cx.parameter(0).unwrap_or("none");
                Ok(Response::content(format!("post {id}")))
            })
        }
    }

    struct Home;

    impl Handler for Home {
        fn responds_to(&self, method: &str) -> bool {
            method == "doWelcome"
        }

        fn invoke(&mut self, _method: &str, _cx: &mut Context<'_>) -> Option<ActionResult> {
            Some(Ok(Response::content("welcome")))
        }

        fn default_action(&self) -> Option<&str> {
            Some("welcome")
        }
    }

    fn catalog() -> Catalog {
        Catalog::new()
            .handler("pages/blog/BlogHandler", "BlogHandler", || Blog)
            .handler("pages/home/HomeHandler", "HomeHandler", || Home)
            .handler("pages/wrong/WrongHandler", "Blog", || Blog)
    }

    fn resolver_with(loader: Arc<dyn ArtifactLoader>) -> Resolver {
        let config = Arc::new(ConfigTree::defaults().unwrap());
        let modules = Arc::new(ModuleRegistry::new(config.clone(), loader.clone()));
        Resolver::new(config, modules, loader)
    }

    #[test]
    fn test_handler_name_validation() {
        for ok in ["blog", "Blog_2", "a.b", "x-y", "..."] {
            assert!(is_valid_handler_name(ok), "{ok}");
        }
        for bad in ["", ".", "..", "a/b", "a b", "ünï", "a\0"] {
            assert!(!is_valid_handler_name(bad), "{bad:?}");
        }
    }

    #[test]
    fn test_resolve_handler_action_parameters() {
        let resolver = resolver_with(Arc::new(catalog()));
        let route = resolver.resolve("/blog/view/7").unwrap().unwrap();
        assert_eq!(
            route,
            Route {
                module: None,
                handler: "blog".into(),
                action: Some("view".into()),
                parameters: vec!["7".into()],
            }
        );
    }

    #[test]
    fn test_resolve_root_uses_default_handler() {
        let resolver = resolver_with(Arc::new(catalog()));
        for path in ["/", ""] {
            let route = resolver.resolve(path).unwrap().unwrap();
            assert_eq!(route.handler, "home");
            assert_eq!(route.action, None);
            assert!(route.parameters.is_empty());
        }
    }

    #[test]
    fn test_resolve_module_qualifier_requires_loaded_module() {
        let resolver = resolver_with(Arc::new(catalog()));
        resolver
            .modules()
            .add(RecordingModule::new("EventLogger"))
            .unwrap();

        let route = resolver.resolve("/EventLogger/view").unwrap().unwrap();
        assert_eq!(route.module.as_deref(), Some("EventLogger"));
        assert_eq!(route.handler, "view");

        let route = resolver.resolve("/Other/view").unwrap().unwrap();
        assert_eq!(route.module, None);
        assert_eq!(route.handler, "Other");
    }

    #[test]
    fn test_traversal_rejected_before_lookup() {
        let loader = Arc::new(CountingLoader::new(catalog()));
        let resolver = resolver_with(loader.clone());
        let recorder = RecordingModule::new("audit");
        resolver.hooks().attach("audit", recorder.clone()).unwrap();

        let response = resolver.route("/../etc").unwrap();

        assert!(response.is_routing_failure());
        assert_eq!(loader.lookups(), 0);
        assert_eq!(recorder.methods_named("core_routing_requested"), 1);
        assert_eq!(recorder.methods_named("core_routing_dispatching"), 0);
        assert_eq!(recorder.methods_named("core_routing_error"), 1);
    }

    #[test]
    fn test_route_dispatches_action() {
        let resolver = resolver_with(Arc::new(catalog()));
        let recorder = RecordingModule::new("audit");
        resolver.hooks().attach("audit", recorder.clone()).unwrap();

        let response = resolver.route("/blog/view/7").unwrap();

        assert_eq!(response.body(), "post 7");
        let dispatching = recorder
            .calls()
            .into_iter()
            .find(|c| c.method == "core_routing_dispatching")
            .unwrap();
        assert_eq!(dispatching.args.len(), 3);
        assert_eq!(dispatching.args[1], r#"Text("view")"#);
    }

    #[test]
    fn test_route_root_uses_handler_default_action() {
        let resolver = resolver_with(Arc::new(catalog()));
        assert_eq!(resolver.route("/").unwrap().body(), "welcome");
    }

    #[test]
    fn test_route_missing_or_mistyped_handler_fails() {
        let resolver = resolver_with(Arc::new(catalog()));
        assert!(resolver.route("/nothing").unwrap().is_routing_failure());
        assert!(resolver.route("/wrong").unwrap().is_routing_failure());
        assert!(resolver.route("/blog/edit").unwrap().is_routing_failure());
    }

    #[test]
    fn test_forward_errors() {
        let resolver = resolver_with(Arc::new(catalog()));

        let err = resolver.forward("view", "index", Some("Ghost"), None).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Forward(ForwardError::ModuleNotLoaded { .. })
        ));

        let err = resolver.forward("nothing", "index", None, None).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Forward(ForwardError::HandlerNotFound { .. })
        ));

        let err = resolver.forward("..", "index", None, None).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Forward(ForwardError::HandlerNotFound { .. })
        ));
    }

    /// Forwards to `inner`, discards the outcome and renders anyway.
    struct Stubborn;

    impl Handler for Stubborn {
        fn responds_to(&self, method: &str) -> bool {
            method == "doGo"
        }

        fn invoke(&mut self, _method: &str, cx: &mut Context<'_>) -> Option<ActionResult> {
            let first = cx.forward("blog", "missing", None, None);
            let second = cx.forward("blog", "view", None, None);
            Some(Ok(Response::content(format!(
                "carried on after {} and {}",
                first.is_err(),
                second.is_err()
            ))))
        }
    }

    #[test]
    fn test_routing_miss_in_forward_ends_request() {
        let catalog = catalog().handler("pages/outer/OuterHandler", "OuterHandler", || Stubborn);
        let resolver = resolver_with(Arc::new(catalog));
        let recorder = RecordingModule::new("audit");
        resolver.hooks().attach("audit", recorder.clone()).unwrap();

        let response = resolver.route("/outer/go").unwrap();

        assert_eq!(response, Response::RoutingFailed);
        assert_eq!(recorder.methods_named("core_routing_error"), 1);

        let response = resolver.route("/blog/view/1").unwrap();
        assert_eq!(response.body(), "post 1");
    }

    #[test]
    fn test_route_error_outside_request() {
        let resolver = resolver_with(Arc::new(catalog()));
        assert_eq!(resolver.route_error().unwrap(), Response::RoutingFailed);
        assert_eq!(
            resolver.forward("blog", "edit", None, None).unwrap(),
            Response::RoutingFailed
        );
    }

    #[test]
    fn test_forward_sets_parameters() {
        let resolver = resolver_with(Arc::new(catalog()));
        let response = resolver
            .forward("blog", "view", None, Some(Parameters::positional(["42"])))
            .unwrap();
        assert_eq!(response.body(), "post 42");
    }
}
