//! # sulfide-std
//!
//! Standard implementations for the Sulfide request-dispatch framework.
//!
//! This crate provides:
//! - **Settings**: [`ConfigTree`], an append-only, path-addressed TOML tree
//! - **Hooks**: [`HookRegistry`], the per-subject subscriber list
//! - **Modules**: [`ModuleRegistry`] and the built-in [`EventLogger`]
//! - **Artifacts**: [`ArtifactLoader`] and the in-memory [`Catalog`]
//! - **Routing**: [`Resolver`], [`Controller`] and the [`Handler`] capability
//! - **Bootstrap**: [`Application`]
//! - **Collaborators**: [`collab::Database`] and [`collab::TextRenderer`]
//!
//! [`ConfigTree`]: config::ConfigTree
//! [`HookRegistry`]: hooks::HookRegistry
//! [`ModuleRegistry`]: modules::ModuleRegistry
//! [`EventLogger`]: modules::EventLogger
//! [`ArtifactLoader`]: artifacts::ArtifactLoader
//! [`Catalog`]: artifacts::Catalog
//! [`Resolver`]: routing::Resolver
//! [`Controller`]: routing::Controller
//! [`Handler`]: routing::Handler
//! [`Application`]: app::Application

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use sulfide_core;

// Modules
pub mod app;
pub mod artifacts;
pub mod collab;
pub mod config;
pub mod hooks;
pub mod modules;
pub mod routing;
pub mod testing;

pub use inventory;
