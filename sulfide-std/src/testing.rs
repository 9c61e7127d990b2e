//! Testing utilities for Sulfide.
//!
//! This module provides utilities to make testing subjects, modules and
//! routing easier.
//!
//! # Features
//!
//! - [`RecordingModule`]: A module that records every event it receives
//! - [`FailingModule`]: A module that fails on a chosen event or on load
//! - [`CountingLoader`]: An artifact loader wrapper that records lookups

use crate::artifacts::{ArtifactLoader, Definition};
use parking_lot::Mutex;
use std::{
    any::Any,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use sulfide_core::{Arg, BoxError, HookReturn, Module, SubjectId, reply};

// ============================================================================
// Recording Module
// ============================================================================

/// One event delivery seen by a [`RecordingModule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// The full method name (`namespace_topic_event`).
    pub method: String,
    /// Debug renderings of the arguments.
    pub args: Vec<String>,
    /// The subject carried by `hooked`/`unhooked`, if any.
    pub subject: Option<SubjectId>,
}

/// A module that records all events it receives.
///
/// Every event is answered with the module's own name, so collected replies
/// show which subscriber produced them.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingModule::new("audit");
/// resolver.hooks().attach("audit", recorder.clone())?;
///
/// resolver.route("/")?;
///
/// assert_eq!(recorder.methods_named("core_routing_requested"), 1);
/// ```
#[derive(Debug)]
pub struct RecordingModule {
    name: String,
    calls: Mutex<Vec<Call>>,
    loads: AtomicUsize,
    unloads: AtomicUsize,
}

impl RecordingModule {
    /// Create a shared recording module.
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self::unshared(name))
    }

    /// Create a recording module without wrapping it.
    pub fn unshared(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            calls: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
            unloads: AtomicUsize::new(0),
        }
    }

    /// A copy of the recorded calls.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// The recorded method names, in order.
    pub fn methods(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.method.clone()).collect()
    }

    /// How many times `method` was delivered.
    pub fn methods_named(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.method == method).count()
    }

    /// Forget recorded calls.
    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// How many times `load` ran.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// How many times `unload` ran.
    pub fn unload_count(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }
}

impl Module for RecordingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<(), BoxError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unload(&self) -> Result<(), BoxError> {
        self.unloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn notify(&self, method: &str, args: &[Arg<'_>]) -> HookReturn {
        self.calls.lock().push(Call {
            method: method.to_owned(),
            args: args.iter().map(|a| format!("{a:?}")).collect(),
            subject: args.iter().find_map(|a| a.as_subject()).map(|s| s.id()),
        });
        reply(self.name.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Failing Module
// ============================================================================

/// A module that fails on purpose.
#[derive(Debug)]
pub struct FailingModule {
    name: String,
    event: Option<String>,
    fail_load: bool,
}

impl FailingModule {
    /// Fail whenever `event` is delivered, whatever the subject.
    pub fn new(name: &str, event: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            event: Some(event.to_owned()),
            fail_load: false,
        })
    }

    /// Fail in the `load` lifecycle hook.
    pub fn on_load(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            event: None,
            fail_load: true,
        }
    }
}

impl Module for FailingModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<(), BoxError> {
        if self.fail_load {
            return Err(format!("{} refused to load", self.name).into());
        }
        Ok(())
    }

    fn notify(&self, method: &str, _args: &[Arg<'_>]) -> HookReturn {
        match &self.event {
            Some(event) if method.ends_with(&format!("_{event}")) => {
                Err(format!("{} failed on {method}", self.name).into())
            }
            _ => Ok(None),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Counting Loader
// ============================================================================

/// Wraps a loader and records every path it is asked about.
///
/// Useful for asserting that a request was rejected before any artifact
/// lookup happened.
pub struct CountingLoader<L> {
    inner: L,
    paths: Mutex<Vec<PathBuf>>,
    lookups: AtomicUsize,
}

impl<L: ArtifactLoader> CountingLoader<L> {
    /// Wrap `inner`.
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            paths: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Number of `exists` and `load` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Every path looked up, in order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().clone()
    }

    /// Reset the counters.
    pub fn reset(&self) {
        self.lookups.store(0, Ordering::SeqCst);
        self.paths.lock().clear();
    }

    fn record(&self, path: &Path) {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().push(path.to_path_buf());
    }
}

impl<L: ArtifactLoader> ArtifactLoader for CountingLoader<L> {
    fn exists(&self, path: &Path) -> bool {
        self.record(path);
        self.inner.exists(path)
    }

    fn load(&self, path: &Path) -> Vec<Definition> {
        self.record(path);
        self.inner.load(path)
    }
}
