//! Loadable modules.
//!
//! - [`ModuleRegistry`]: loads modules by name and tracks which subjects they
//!   are hooked to
//! - [`EventLogger`]: a built-in module recording every event it receives

mod event_logger;
mod registry;

pub use event_logger::{EVENT_LOGGER, EventLogger, EventRecord, ViewHandler};
pub use registry::{LOADED, ModuleRegistry, REMOVED};
