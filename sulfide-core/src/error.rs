//! Error types for Sulfide.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`SulfideError`] - Top-level error type for all Sulfide operations
//! - [`ConfigError`] - Errors from the configuration tree
//! - [`HookError`] - Errors from subscriber registries and subscribers
//! - [`ModuleError`] - Errors from the module registry
//! - [`ForwardError`] - Errors from handler-to-handler forwarding
//! - [`DispatchError`] - Errors escaping a request dispatch
//!
//! Routing misses (unknown handler, invalid handler name, missing action) end
//! in [`Response::RoutingFailed`]. Inside a request they travel as
//! [`DispatchError::RoutingFailed`] so that nested forwards unwind.
//!
//! [`Response::RoutingFailed`]: crate::Response::RoutingFailed

use std::path::PathBuf;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Sulfide operations.
#[derive(Error, Debug)]
pub enum SulfideError {
    /// An error occurred in the configuration tree.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An error occurred in a subscriber registry.
    #[error("hook error: {0}")]
    Hook(#[from] HookError),

    /// An error occurred in the module registry.
    #[error("module error: {0}")]
    Module(#[from] ModuleError),

    /// An error escaped a request dispatch.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Errors produced by the configuration tree.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A segment of the path is missing, or a scalar was indexed further.
    #[error("configuration setting `{path}` does not exist")]
    KeyNotFound {
        /// The requested path, joined with `.`.
        path: String,
    },

    /// The path already holds a value, or crosses a scalar.
    #[error("configuration values cannot be added at `{path}`: {reason}")]
    KeyConflict {
        /// The target path, joined with `.`.
        path: String,
        /// Which part of the path conflicted.
        reason: &'static str,
    },

    /// The path is empty or contains an empty segment.
    #[error("configuration path `{path}` contains an empty key")]
    InvalidPath {
        /// The offending path, joined with `.`.
        path: String,
    },

    /// The setting exists but does not have the requested type.
    #[error("configuration setting `{path}` is not {expected}")]
    TypeMismatch {
        /// The requested path, joined with `.`.
        path: String,
        /// The expected kind of value.
        expected: &'static str,
    },

    /// A configuration document could not be read.
    #[error("failed to read configuration file {path:?}")]
    Io {
        /// The file that failed to read.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A configuration document is not valid TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors produced by a subject's subscriber registry.
#[derive(Error, Debug)]
pub enum HookError {
    /// A subscriber with this name is already attached.
    #[error("subscriber `{name}` is already hooked to `{subject}`")]
    DuplicateSubscriber {
        /// The subscriber name.
        name: String,
        /// The subject label (`namespace_topic`).
        subject: String,
    },

    /// No subscriber with this name is attached.
    #[error("subscriber `{name}` is not hooked to `{subject}`")]
    SubscriberNotFound {
        /// The subscriber name.
        name: String,
        /// The subject label (`namespace_topic`).
        subject: String,
    },

    /// A subscriber failed while handling an event.
    #[error("subscriber `{name}` failed in `{method}`")]
    Subscriber {
        /// The subscriber name.
        name: String,
        /// The event method that was invoked.
        method: String,
        /// The subscriber's error.
        #[source]
        source: BoxError,
    },
}

/// Errors produced by the module registry.
#[derive(Error, Debug)]
pub enum ModuleError {
    /// The module's entry artifact does not exist, or the module is not loaded.
    #[error("module `{name}` was not found")]
    NotFound {
        /// The module name.
        name: String,
    },

    /// The entry artifact does not define a module type with the expected name.
    #[error("module `{name}` is invalid: {reason}")]
    Invalid {
        /// The module name.
        name: String,
        /// Why the artifact was rejected.
        reason: String,
    },

    /// A module with this name is already registered.
    #[error("module `{name}` is already loaded")]
    Duplicate {
        /// The module name.
        name: String,
    },

    /// The module's `load` or `unload` lifecycle hook failed.
    #[error("module `{name}` failed during {stage}")]
    Lifecycle {
        /// The module name.
        name: String,
        /// `"load"` or `"unload"`.
        stage: &'static str,
        /// The module's error.
        #[source]
        source: BoxError,
    },

    /// Merging the module configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hooking or unhooking the module failed.
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Errors produced when a handler forwards to another handler.
#[derive(Error, Debug)]
pub enum ForwardError {
    /// The module owning the target handler is not loaded.
    #[error("cannot forward `{action}` to `{handler}`: module `{module}` is not loaded")]
    ModuleNotLoaded {
        /// The module name.
        module: String,
        /// The target handler name.
        handler: String,
        /// The target action.
        action: String,
    },

    /// The target handler artifact or its expected type is missing.
    #[error("cannot forward `{action}` to `{handler}`{}: handler not found", module_suffix(.module))]
    HandlerNotFound {
        /// The target handler name.
        handler: String,
        /// The owning module, if any.
        module: Option<String>,
        /// The target action.
        action: String,
    },
}

fn module_suffix(module: &Option<String>) -> String {
    module
        .as_ref()
        .map(|m| format!(" (module `{m}`)"))
        .unwrap_or_default()
}

/// Errors that escape a request dispatch.
///
/// Apart from [`DispatchError::RoutingFailed`], these are internal failures.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A subscriber failed while an event was being emitted.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// A required configuration setting was missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Forwarding to another handler failed.
    #[error(transparent)]
    Forward(#[from] ForwardError),

    /// An action returned an error.
    #[error("action `{action}` failed")]
    Action {
        /// The canonical method name of the action.
        action: String,
        /// The action's error.
        #[source]
        source: BoxError,
    },

    /// Bad-action redirection did not settle within the configured bound.
    #[error("redirect limit of {limit} exceeded while dispatching `{action}`")]
    RedirectLimit {
        /// The action being dispatched when the limit was hit.
        action: String,
        /// The configured bound.
        limit: usize,
    },

    /// The request took the terminal error path.
    ///
    /// Never returned by `Resolver::route`, which reports it as
    /// [`Response::RoutingFailed`](crate::Response::RoutingFailed).
    #[error("routing failed")]
    RoutingFailed,
}

impl From<BoxError> for DispatchError {
    fn from(err: BoxError) -> Self {
        match err.downcast::<DispatchError>() {
            Ok(inner) => *inner,
            Err(other) => DispatchError::Action {
                action: String::new(),
                source: other,
            },
        }
    }
}
