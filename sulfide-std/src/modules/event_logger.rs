//! The built-in `EventLogger` module.
//!
//! Hooked to any number of subjects, it records every event delivered to it.
//! A routing `requested` event starts a new page: what was recorded for the
//! previous request is dropped. Its `view` handler (`/EventLogger/view`) lists
//! what was recorded while the page was being produced.

use crate::{
    artifacts::{ArtifactRegistration, Catalog, module_entry_path, module_handler_path},
    collab::{Renderer, TextRenderer},
    routing::{ActionResult, Context, Handler},
};
use parking_lot::Mutex;
use std::{any::Any, path::Path, sync::Arc};
use sulfide_core::{Arg, HookReturn, Module, Response};

/// The module name.
pub const EVENT_LOGGER: &str = "EventLogger";

const PAGE_START: &str = "core_routing_requested";

const PAGE: &str = "<html><head><title>{{headerTitle}}</title></head>\
<body><h1>{{pageTitle}}</h1>{{pageContent}}</body></html>";

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// The full method name (`core_routing_requested`).
    pub method: String,
    /// Debug renderings of the arguments.
    pub args: Vec<String>,
}

/// Records every event it receives.
#[derive(Debug, Default)]
pub struct EventLogger {
    records: Mutex<Vec<EventRecord>>,
}

impl EventLogger {
    /// Create an empty logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded for the current request, oldest first.
    ///
    /// Before the first request this is whatever was delivered during boot.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Add the module entry and its `view` handler to `catalog`.
    pub fn register(catalog: Catalog, modules_dir: impl AsRef<Path>) -> Catalog {
        let dir = modules_dir.as_ref();
        catalog
            .module(module_entry_path(dir, EVENT_LOGGER), EVENT_LOGGER, EventLogger::new)
            .handler(
                module_handler_path(dir, EVENT_LOGGER, "view"),
                "ViewHandler",
                || ViewHandler,
            )
    }
}

impl Module for EventLogger {
    fn name(&self) -> &str {
        EVENT_LOGGER
    }

    fn notify(&self, method: &str, args: &[Arg<'_>]) -> HookReturn {
        let mut records = self.records.lock();
        if method == PAGE_START {
            records.clear();
        }
        records.push(EventRecord {
            method: method.to_owned(),
            args: args.iter().map(|a| format!("{a:?}")).collect(),
        });
        Ok(None)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lists the events recorded by the loaded [`EventLogger`].
///
/// Unknown actions are redirected to `index`.
#[derive(Debug, Default)]
pub struct ViewHandler;

impl ViewHandler {
    fn do_index(&mut self, cx: &mut Context<'_>) -> ActionResult {
        let logger = cx
            .modules()
            .get_as::<EventLogger>(EVENT_LOGGER)
            .ok_or("the EventLogger module is not loaded")?;

        let mut content = String::from("<ul>");
        for record in logger.records() {
            content.push_str("<li>");
            content.push_str(&escape_html(&record.method));
            content.push_str("<ul>");
            for arg in &record.args {
                content.push_str(&format!("<li>{}</li>", escape_html(arg)));
            }
            content.push_str("</ul></li>");
        }
        content.push_str("</ul>");
        content.push_str(&format!(
            "<p>Parameters: {}</p>",
            escape_html(&format!("{:?}", cx.parameters()))
        ));

        let mut page = TextRenderer::from_config(cx.config())?;
        page.assign("headerTitle", "EventLogger/View/Index".into());
        page.assign("pageTitle", "EventLogger/View/Index".into());
        page.assign("pageContent", content);
        Ok(Response::content(page.render_source(PAGE)))
    }
}

impl Handler for ViewHandler {
    fn responds_to(&self, method: &str) -> bool {
        method == "doIndex"
    }

    fn invoke(&mut self, method: &str, cx: &mut Context<'_>) -> Option<ActionResult> {
        match method {
            "doIndex" => Some(self.do_index(cx)),
            _ => None,
        }
    }

    fn redirect_target(&self) -> Option<&str> {
        Some("index")
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}

fn logger_entry() -> Arc<dyn Module> {
    Arc::new(EventLogger::new())
}

fn view_handler() -> Box<dyn Handler> {
    Box::new(ViewHandler)
}

inventory::submit! {
    ArtifactRegistration::module("modules/EventLogger/module-entry", EVENT_LOGGER, logger_entry)
}

inventory::submit! {
    ArtifactRegistration::handler("modules/EventLogger/ViewHandler", "ViewHandler", view_handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        artifacts::{ArtifactLoader, Definition},
        config::ConfigTree,
        hooks::Hookable,
        modules::ModuleRegistry,
        routing::Resolver,
    };
    use sulfide_core::{DispatchError, ForwardError};

    fn resolver() -> Resolver {
        let config = Arc::new(ConfigTree::defaults().unwrap());
        let loader: Arc<dyn ArtifactLoader> =
            Arc::new(EventLogger::register(Catalog::new(), "modules"));
        let modules = Arc::new(ModuleRegistry::new(config.clone(), loader.clone()));
        Resolver::new(config, modules, loader)
    }

    #[test]
    fn test_view_lists_recorded_events() {
        let resolver = resolver();
        resolver.modules().load(EVENT_LOGGER).unwrap();
        resolver
            .modules()
            .hook(EVENT_LOGGER, resolver.hooks())
            .unwrap();

        let response = resolver.route("/EventLogger/view/index/7").unwrap();
        let body = response.body();

        assert!(body.contains("<title>EventLogger/View/Index</title>"));
        assert!(!body.contains("core_routing_hooked"));
        assert!(body.contains("core_routing_requested"));
        assert!(body.contains("core_routing_dispatching"));
        assert!(body.contains("Text(&quot;/EventLogger/view/index/7&quot;)"));
    }

    #[test]
    fn test_unknown_view_action_redirects_to_index() {
        let resolver = resolver();
        resolver.modules().load(EVENT_LOGGER).unwrap();

        let response = resolver.route("/EventLogger/view/recent").unwrap();
        assert!(response.body().contains("Parameters"));
        assert!(response.body().contains("recent"));
    }

    #[test]
    fn test_view_requires_loaded_module() {
        let resolver = resolver();
        let err = resolver
            .forward("view", "index", Some(EVENT_LOGGER), None)
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Forward(ForwardError::ModuleNotLoaded { .. })
        ));
        assert!(
            resolver
                .route("/EventLogger/view")
                .unwrap()
                .is_routing_failure()
        );
    }

    #[test]
    fn test_records_every_event() {
        let logger = EventLogger::new();
        logger
            .notify("core_routing_requested", &[Arg::Text("/")])
            .unwrap();
        logger.notify("anything_at_all", &[]).unwrap();

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].args, vec![r#"Text("/")"#.to_string()]);
        logger.clear();
        assert!(logger.records().is_empty());
    }

    #[test]
    fn test_new_request_starts_a_new_page() {
        let logger = EventLogger::new();
        logger.notify("core_routing_hooked", &[]).unwrap();
        for path in ["/a", "/b", "/c"] {
            logger
                .notify("core_routing_requested", &[Arg::Text(path)])
                .unwrap();
            logger.notify("core_routing_error", &[]).unwrap();
        }

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].args, vec![r#"Text("/c")"#.to_string()]);
        assert_eq!(records[1].method, "core_routing_error");
    }

    #[test]
    fn test_registered_at_link_time() {
        let catalog = Catalog::collected();
        let defs = catalog.load(Path::new("modules/EventLogger/module-entry"));
        assert!(matches!(defs.as_slice(), [Definition::Module { name, .. }] if name == EVENT_LOGGER));
        assert!(catalog.exists(Path::new("modules/EventLogger/ViewHandler")));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#039;");
    }
}
