//! The module capability.
//!
//! A module is an independently loadable unit of behavior that subscribes to
//! subjects. Event delivery goes through [`Module::notify`], which maps the full
//! event method name (`namespace_topic_event`) to behavior. The `#[module]`
//! attribute builds that mapping as a `match` over the methods of an impl block.

use crate::{
    arg::{Arg, HookReturn},
    error::BoxError,
};
use std::any::Any;

/// A named module that can be hooked to subjects.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Module`",
    label = "missing `Module` implementation",
    note = "Implement `Module` by hand or annotate an impl block with `#[sulfide::module(name = \"...\")]`."
)]
pub trait Module: Any + Send + Sync {
    /// The unique module name.
    fn name(&self) -> &str;

    /// Called once after the module is registered.
    fn load(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Called once before the module is removed from the registry.
    fn unload(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Deliver an event.
    ///
    /// `method` is `namespace_topic_event`. Unknown methods must be ignored
    /// by returning `Ok(None)`.
    fn notify(&self, method: &str, args: &[Arg<'_>]) -> HookReturn {
        let _ = (method, args);
        Ok(None)
    }

    /// Access the concrete module type.
    fn as_any(&self) -> &dyn Any;
}
