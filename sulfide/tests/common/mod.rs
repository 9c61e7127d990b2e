#![allow(dead_code)]

use std::sync::{Arc, Once};
use sulfide::{
    Application, Catalog, ConfigTree, Handler, Parameters, Response,
    artifacts::{handler_path, module_entry_path},
    routing::{ActionResult, Context},
    testing::CountingLoader,
};

// ============================================================================
// Tracing
// ============================================================================

/// Install a test subscriber once. `RUST_LOG` controls the filter.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Test Handlers
// ============================================================================

/// `doIndex`, `doView`, `doForward` and `doFail`; unknown actions redirect to
/// `view`.
#[derive(Debug, Default)]
pub struct BlogHandler;

impl Handler for BlogHandler {
    fn responds_to(&self, method: &str) -> bool {
        matches!(method, "doIndex" | "doView" | "doForward" | "doFail")
    }

    fn invoke(&mut self, method: &str, cx: &mut Context<'_>) -> Option<ActionResult> {
        let result: ActionResult = match method {
            "doIndex" => Ok(Response::content("blog index")),
            "doView" => Ok(Response::content(format!(
                "view [{}]",
                cx.parameters().positional_values().collect::<Vec<_>>().join(",")
            ))),
            "doForward" => {
                let params = Parameters::positional(["forwarded"]);
                cx.forward("home", "index", None, Some(params))
                    .map_err(Into::into)
            }
            "doFail" => Err("post storage offline".into()),
            _ => return None,
        };
        Some(result)
    }

    fn redirect_target(&self) -> Option<&str> {
        Some("view")
    }
}

/// Only `doIndex`, no redirect target.
#[derive(Debug, Default)]
pub struct HomeHandler;

impl Handler for HomeHandler {
    fn responds_to(&self, method: &str) -> bool {
        method == "doIndex"
    }

    fn invoke(&mut self, method: &str, cx: &mut Context<'_>) -> Option<ActionResult> {
        (method == "doIndex").then(|| {
            Ok(Response::content(format!(
                "home {}",
                cx.parameter(0).unwrap_or("-")
            )))
        })
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// `pages/blog` and `pages/home`.
pub fn site_catalog() -> Catalog {
    Catalog::new()
        .handler(handler_path("pages", "blog"), "BlogHandler", BlogHandler::default)
        .handler(handler_path("pages", "home"), "HomeHandler", HomeHandler::default)
}

/// A catalog with a module entry for `name` that builds `module`.
pub fn with_module<M, F>(catalog: Catalog, name: &str, module: F) -> Catalog
where
    M: sulfide::Module,
    F: Fn() -> M + Send + Sync + 'static,
{
    catalog.module(module_entry_path("modules", name), name, module)
}

/// An application over `catalog` with the bundled defaults.
pub fn app(catalog: Catalog) -> Application {
    init_tracing();
    Application::new(ConfigTree::defaults().unwrap(), catalog)
}

/// An application whose artifact lookups are counted.
pub fn counted_app(catalog: Catalog) -> (Application, Arc<CountingLoader<Catalog>>) {
    init_tracing();
    let loader = Arc::new(CountingLoader::new(catalog));
    let app = Application::new(ConfigTree::defaults().unwrap(), loader.clone());
    (app, loader)
}
