//! # sulfide - Modular Request-Dispatch Core
//!
//! `sulfide` maps request paths of the shape
//! `/[module/]handler/action/param1/.../paramN` to handler methods, and lets
//! independently loadable modules observe everything that happens on the way
//! through named events (`core_routing_requested`, `core_modules_loaded`, ...).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sulfide::prelude::*;
//!
//! #[derive(Default)]
//! struct BlogHandler;
//!
//! #[sulfide::actions(redirect = "view", default = "index", register = "pages/blog/BlogHandler")]
//! impl BlogHandler {
//!     fn do_index(&mut self) -> &'static str {
//!         "all posts"
//!     }
//!
//!     fn do_view(&mut self, cx: &mut Context<'_>) -> ActionResult {
//!         let id = cx.parameter(0).ok_or("missing id")?;
//!         Ok(Response::content(format!("post {id}")))
//!     }
//! }
//!
//! let app = Application::with_defaults(Catalog::collected())?;
//! app.boot()?;
//! let response = app.route("/blog/view/7")?;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use sulfide_core::{
    // Events
    Arg,
    // Error types
    BoxError,
    ConfigError,
    DispatchError,
    ForwardError,
    HandlerRef,
    HookError,
    HookReturn,
    // Modules
    Module,
    ModuleError,
    // Parameters
    ParamKey,
    Parameters,
    ROUTING_FAILED_BODY,
    Reply,
    // Response
    Response,
    // Subjects
    Subject,
    SubjectId,
    SubjectRef,
    SulfideError,
    reply,
};

pub use sulfide_std::{
    app::Application,
    artifacts::{ArtifactLoader, Catalog},
    config::ConfigTree,
    hooks::{HookRegistry, Hookable},
    modules::ModuleRegistry,
    routing::{Controller, Handler, Resolver},
};

/// Application bootstrap.
pub mod app {
    pub use sulfide_std::app::Application;
}

/// Handler and module artifacts.
pub mod artifacts {
    #![allow(clippy::wildcard_imports)]
    pub use sulfide_std::artifacts::*;
}

/// Database and template collaborators.
pub mod collab {
    #![allow(clippy::wildcard_imports)]
    pub use sulfide_std::collab::*;
}

/// The settings tree.
pub mod config {
    #![allow(clippy::wildcard_imports)]
    pub use sulfide_std::config::*;
}

/// Subscriber registries.
pub mod hooks {
    #![allow(clippy::wildcard_imports)]
    pub use sulfide_std::hooks::*;
}

/// The module registry and built-in modules.
pub mod modules {
    #![allow(clippy::wildcard_imports)]
    pub use sulfide_std::modules::*;
}

/// Path resolution, handlers and dispatch.
pub mod routing {
    #![allow(clippy::wildcard_imports)]
    pub use sulfide_std::routing::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use sulfide_std::testing::*;
}

/// Prelude module - common imports for Sulfide.
///
/// # Usage
///
/// ```rust,ignore
/// use sulfide::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Bootstrap
        Application,
        // Events
        Arg,
        // Errors
        BoxError,
        Catalog,
        ConfigTree,
        DispatchError,
        // Core traits
        Handler,
        HookRegistry,
        HookReturn,
        Hookable,
        Module,
        Parameters,
        Response,
        reply,
        routing::{ActionResult, Context},
    };
}

#[cfg(feature = "macros")]
pub use sulfide_macros::{actions, module};

pub use sulfide_std::inventory;
