//! # sulfide-core
//!
//! Core traits and types for the Sulfide request-dispatch framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! modules and handlers that don't need the full `sulfide-std` implementation.
//!
//! # Vocabulary
//!
//! - [`Subject`] - anything that owns a subscriber registry and emits events.
//!   Subscribers hold a weak [`SubjectRef`] back to it.
//! - [`Module`] - a named, loadable subscriber. Events reach it through
//!   [`Module::notify`] as `namespace_topic_event` method names.
//! - [`Arg`] - one positional event argument; [`Reply`] - what a subscriber
//!   answers when results are collected.
//! - [`Parameters`] - the per-request parameter store of a handler.
//! - [`Response`] - what a request produced, including the terminal
//!   [`Response::RoutingFailed`].
//!
//! # Error Types
//!
//! - [`SulfideError`] - Top-level error type
//! - [`ConfigError`], [`HookError`], [`ModuleError`], [`ForwardError`] - per component
//! - [`DispatchError`] - internal failures escaping a dispatch

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod arg;
mod error;
mod module;
mod params;
mod response;
mod subject;

// Re-exports
pub use arg::{Arg, HandlerRef, HookReturn, Reply, reply};
pub use error::{
    BoxError, ConfigError, DispatchError, ForwardError, HookError, ModuleError, SulfideError,
};
pub use module::Module;
pub use params::{ParamKey, Parameters};
pub use response::{ROUTING_FAILED_BODY, Response};
pub use subject::{Subject, SubjectId, SubjectRef};
