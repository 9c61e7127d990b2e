//! Handlers and their per-request controller.
//!
//! A [`Handler`] maps canonical action method names (`doView`) to behavior.
//! A [`Controller`] wraps one handler instance for the lifetime of a single
//! request: it owns the request [`Parameters`], its own hook registry, and
//! runs the dispatch state machine
//!
//! ```text
//! Idle -> Resolving(action) -> Executing(method)
//!                           -> Redirecting(target) -> Resolving(target)
//!                           -> Erroring (terminal routing failure)
//! ```
//!
//! Every controller taking part in one request, the routed one and any it
//! forwards to, shares a [`RequestState`]. Once the error path is taken the
//! request is settled as [`Response::RoutingFailed`], whatever the actions
//! still on the stack return.

use super::Resolver;
use crate::{
    artifacts::ucfirst,
    config::ConfigTree,
    hooks::{HookRegistry, Hookable},
    modules::ModuleRegistry,
};
use std::{cell::Cell, sync::Arc};
use sulfide_core::{
    Arg, BoxError, DispatchError, HandlerRef, ParamKey, Parameters, Response,
};

/// Emitted through a controller's hooks with the method about to run.
pub const EXECUTING: &str = "executing";
/// Emitted through a controller's hooks with the unknown action and its
/// redirect target.
pub const REDIRECTING: &str = "redirecting";

/// What an action produces.
pub type ActionResult = Result<Response, BoxError>;

/// Conversion of an action's return value into an [`ActionResult`].
///
/// Lets `#[sulfide::actions]` methods return a plain body, nothing at all, or
/// any `Result` whose error converts into [`BoxError`].
pub trait IntoActionResult {
    /// Perform the conversion.
    fn into_action_result(self) -> ActionResult;
}

impl<T, E> IntoActionResult for Result<T, E>
where
    T: Into<Response>,
    E: Into<BoxError>,
{
    fn into_action_result(self) -> ActionResult {
        self.map(Into::into).map_err(Into::into)
    }
}

impl IntoActionResult for Response {
    fn into_action_result(self) -> ActionResult {
        Ok(self)
    }
}

impl IntoActionResult for String {
    fn into_action_result(self) -> ActionResult {
        Ok(Response::Content(self))
    }
}

impl IntoActionResult for &'static str {
    fn into_action_result(self) -> ActionResult {
        Ok(Response::content(self))
    }
}

impl IntoActionResult for () {
    fn into_action_result(self) -> ActionResult {
        Ok(Response::Empty)
    }
}

/// The canonical method name for an action: `view` → `doView`.
pub fn action_method(action: &str) -> String {
    format!("do{}", ucfirst(action))
}

/// Executable behavior for resolved actions.
///
/// Implementations are usually generated with `#[sulfide::actions]`, which
/// builds [`Handler::invoke`] as a `match` over the `do_*` methods of an impl
/// block.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Handler`",
    label = "missing `Handler` implementation",
    note = "Annotate the handler's impl block with `#[sulfide::actions]`."
)]
pub trait Handler: Send + 'static {
    /// Whether the handler has a method for `method` (`doView`).
    fn responds_to(&self, method: &str) -> bool;

    /// Run `method`. Returns `None` if there is no such method.
    fn invoke(&mut self, method: &str, cx: &mut Context<'_>) -> Option<ActionResult>;

    /// The action unknown actions are redirected to.
    fn redirect_target(&self) -> Option<&str> {
        None
    }

    /// The action used when the request names none.
    fn default_action(&self) -> Option<&str> {
        None
    }
}

/// State shared by every dispatch within one request.
#[derive(Debug, Default)]
pub(crate) struct RequestState {
    failed: Cell<bool>,
}

impl RequestState {
    pub(crate) fn has_failed(&self) -> bool {
        self.failed.get()
    }

    pub(crate) fn mark_failed(&self) {
        self.failed.set(true);
    }

    /// The request's outcome once its outermost dispatch returned.
    pub(crate) fn finish(
        &self,
        result: Result<Response, DispatchError>,
    ) -> Result<Response, DispatchError> {
        match result {
            _ if self.has_failed() => Ok(Response::RoutingFailed),
            Err(DispatchError::RoutingFailed) => Ok(Response::RoutingFailed),
            other => other,
        }
    }
}

/// What an action can reach while it runs.
pub struct Context<'a> {
    resolver: &'a Resolver,
    request: &'a RequestState,
    handler: &'a str,
    module: Option<&'a str>,
    parameters: &'a mut Parameters,
    hooks: &'a Arc<HookRegistry>,
}

impl<'a> Context<'a> {
    /// A request parameter. Absent parameters are `None`.
    pub fn parameter(&self, key: impl Into<ParamKey>) -> Option<&str> {
        self.parameters.get(key)
    }

    /// All request parameters.
    pub fn parameters(&self) -> &Parameters {
        self.parameters
    }

    /// Set one request parameter.
    pub fn set_parameter(&mut self, key: impl Into<ParamKey>, value: impl Into<String>) {
        self.parameters.set(key, value);
    }

    /// The name of the running handler.
    pub fn handler_name(&self) -> &str {
        self.handler
    }

    /// The module owning the running handler, if any.
    pub fn module(&self) -> Option<&str> {
        self.module
    }

    /// Dispatch `action` on another handler within the current request.
    ///
    /// Fails like [`Resolver::forward`]. In addition, a routing miss in the
    /// target fails with [`DispatchError::RoutingFailed`]; the request then
    /// ends in [`Response::RoutingFailed`] even if the error is discarded.
    pub fn forward(
        &self,
        handler: &str,
        action: &str,
        module: Option<&str>,
        parameters: Option<Parameters>,
    ) -> Result<Response, DispatchError> {
        self.resolver
            .forward_within(self.request, handler, action, module, parameters)
    }

    /// Take the terminal routing-failure path.
    ///
    /// Emits `error` once per request. Return the error from the action; the
    /// request ends in [`Response::RoutingFailed`] regardless.
    pub fn route_error(&self) -> DispatchError {
        self.resolver.fail(self.request)
    }

    /// The settings tree.
    pub fn config(&self) -> &ConfigTree {
        self.resolver.config()
    }

    /// The module registry.
    pub fn modules(&self) -> &ModuleRegistry {
        self.resolver.modules()
    }

    /// The running controller's hooks.
    pub fn hooks(&self) -> &Arc<HookRegistry> {
        self.hooks
    }
}

/// One handler instance bound to one request.
pub struct Controller {
    name: String,
    module: Option<String>,
    handler: Box<dyn Handler>,
    parameters: Parameters,
    hooks: Arc<HookRegistry>,
}

impl Controller {
    /// Wrap a freshly instantiated handler.
    pub fn new(name: impl Into<String>, module: Option<String>, handler: Box<dyn Handler>) -> Self {
        Self {
            name: name.into(),
            module,
            handler,
            parameters: Parameters::new(),
            hooks: HookRegistry::new("core", "handler"),
        }
    }

    /// The handler name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning module, if any.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// The identity carried by routing events.
    pub fn handler_ref(&self) -> HandlerRef<'_> {
        HandlerRef {
            name: &self.name,
            module: self.module.as_deref(),
        }
    }

    /// Replace all parameters.
    pub fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    /// Set one parameter.
    pub fn set_parameter(&mut self, key: impl Into<ParamKey>, value: impl Into<String>) {
        self.parameters.set(key, value);
    }

    /// A parameter. Absent parameters are `None`, never an empty string.
    pub fn parameter(&self, key: impl Into<ParamKey>) -> Option<&str> {
        self.parameters.get(key)
    }

    /// All parameters.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Run `action` as a request of its own.
    ///
    /// An unknown action is redirected to the handler's redirect target, with
    /// the action name prepended to the positional parameters. Without a
    /// target, the resolver's terminal error path is taken. Redirects are
    /// bounded by `routing.max_redirects`.
    pub fn dispatch(&mut self, resolver: &Resolver, action: &str) -> Result<Response, DispatchError> {
        let request = RequestState::default();
        let result = self.run(resolver, &request, action);
        request.finish(result)
    }

    pub(crate) fn run(
        &mut self,
        resolver: &Resolver,
        request: &RequestState,
        action: &str,
    ) -> Result<Response, DispatchError> {
        let limit = resolver.max_redirects();
        let mut action = action.to_owned();
        let mut redirects = 0;

        loop {
            let method = action_method(&action);
            if self.handler.responds_to(&method) {
                tracing::debug!(handler = %self.name, %method, "executing action");
                self.hooks.emit(EXECUTING, &[Arg::Text(&method)])?;

                let mut cx = Context {
                    resolver,
                    request,
                    handler: &self.name,
                    module: self.module.as_deref(),
                    parameters: &mut self.parameters,
                    hooks: &self.hooks,
                };
                return match self.handler.invoke(&method, &mut cx) {
                    Some(Ok(response)) => Ok(response),
                    Some(Err(err)) => Err(action_error(err, &method)),
                    None => Err(resolver.fail(request)),
                };
            }

            let Some(target) = self.handler.redirect_target().map(str::to_owned) else {
                tracing::debug!(handler = %self.name, %method, "no such action");
                return Err(resolver.fail(request));
            };
            if redirects >= limit {
                return Err(DispatchError::RedirectLimit {
                    action: method,
                    limit,
                });
            }
            redirects += 1;

            tracing::debug!(handler = %self.name, from = %action, to = %target, "redirecting action");
            self.hooks
                .emit(REDIRECTING, &[Arg::Text(&action), Arg::Text(&target)])?;
            self.parameters.prepend(std::mem::replace(&mut action, target));
        }
    }
}

impl Hookable for Controller {
    fn hooks(&self) -> &Arc<HookRegistry> {
        &self.hooks
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

fn action_error(err: BoxError, method: &str) -> DispatchError {
    match DispatchError::from(err) {
        DispatchError::Action { action, source } if action.is_empty() => DispatchError::Action {
            action: method.to_owned(),
            source,
        },
        other => other,
    }
}
