//! Procedural macros for Sulfide.
//!
//! - `#[actions]` builds a handler's action table from its `do_*` methods
//! - `#[module]` builds a module's event table from its methods
//!
//! Both generate an explicit `match` from the string key to the method, so
//! nothing is looked up by name at runtime.

use proc_macro::TokenStream;

mod actions;
mod module;

/// Implement `Handler` for the type of an impl block.
///
/// Every method named `do_<snake_case>` becomes the action
/// `do<CamelCase>`: `do_other_action` answers `doOtherAction`, the method the
/// action `otherAction` dispatches to. Action methods take `&mut self` or
/// `&self`, optionally followed by `cx: &mut Context<'_>`, and return anything
/// implementing `IntoActionResult`.
///
/// # Arguments
///
/// - `redirect = "action"`: where unknown actions are redirected
/// - `default = "action"`: the action used when the request names none
/// - `register = "path"`: also register the handler at this artifact path
///   (requires `Default`)
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct BlogHandler;
///
/// #[sulfide::actions(redirect = "view", default = "index")]
/// impl BlogHandler {
///     fn do_index(&mut self) -> &'static str {
///         "all posts"
///     }
///
///     fn do_view(&mut self, cx: &mut Context<'_>) -> ActionResult {
///         let id = cx.parameter(0).ok_or("missing id")?;
///         Ok(Response::content(format!("post {id}")))
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn actions(attr: TokenStream, item: TokenStream) -> TokenStream {
    actions::actions_impl(attr, item)
}

/// Implement `Module` for the type of an impl block.
///
/// Methods named `load` and `unload` become the lifecycle hooks. Every other
/// method taking `&self` and, optionally, `args: &[Arg<'_>]` answers the
/// event method of the same name (`core_routing_requested`). Methods without
/// a return type reply nothing; otherwise they must return `HookReturn`.
///
/// # Arguments
///
/// - `name = "..."`: the module name (defaults to the type name)
/// - `register = "path"`: also register the module entry at this artifact
///   path (requires `Default`)
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct Audit;
///
/// #[sulfide::module(name = "audit")]
/// impl Audit {
///     fn core_routing_requested(&self, args: &[Arg<'_>]) {
///         tracing::info!(path = args[0].as_text(), "request");
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::module_impl(attr, item)
}
