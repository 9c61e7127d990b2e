//! Per-subject subscriber registries.
//!
//! A [`HookRegistry`] belongs to exactly one subject. The subject advertises a
//! `(namespace, topic)` pair; an event `name` is delivered to every subscriber
//! as the method `namespace_topic_name`, in attachment order.
//!
//! # Concurrency
//!
//! The subscriber list is an immutable snapshot behind an [`ArcSwap`]. Emitting
//! loads the current snapshot without locking, so process-wide subjects can be
//! read from many requests at once. Attach and detach serialize on a writer
//! mutex and publish a replacement snapshot.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use sulfide_core::{Arg, HookError, Module, Reply, Subject, SubjectId, SubjectRef};

/// Event delivered to a subscriber right after it is attached.
pub const HOOKED: &str = "hooked";
/// Event delivered to a subscriber right before it is detached.
pub const UNHOOKED: &str = "unhooked";

/// Anything that owns a [`HookRegistry`].
pub trait Hookable {
    /// The subject's registry.
    fn hooks(&self) -> &Arc<HookRegistry>;
}

#[derive(Clone)]
struct Entry {
    name: Arc<str>,
    subscriber: Arc<dyn Module>,
}

/// The subscribers of one subject.
pub struct HookRegistry {
    id: SubjectId,
    label: String,
    prefix: String,
    entries: ArcSwap<Vec<Entry>>,
    writer: Mutex<()>,
    this: Weak<HookRegistry>,
}

impl HookRegistry {
    /// Create the registry for a subject identified by `namespace` and `topic`.
    pub fn new(namespace: &str, topic: &str) -> Arc<Self> {
        let label = format!("{namespace}_{topic}");
        Arc::new_cyclic(|this| Self {
            id: SubjectId::next(),
            prefix: format!("{label}_"),
            label,
            entries: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
            this: this.clone(),
        })
    }

    /// The subject's identifier.
    pub fn id(&self) -> SubjectId {
        self.id
    }

    /// The `namespace_topic` label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The method name an event is delivered as.
    pub fn method_name(&self, event: &str) -> String {
        format!("{}{}", self.prefix, event)
    }

    /// A weak handle to this subject.
    pub fn subject_ref(&self) -> SubjectRef {
        let weak: Weak<dyn Subject> = self.this.clone();
        SubjectRef::new(self.id, self.label.as_str(), weak)
    }

    /// Number of attached subscribers.
    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Whether no subscriber is attached.
    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }

    /// Whether a subscriber with this name is attached.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.load().iter().any(|e| &*e.name == name)
    }

    /// Subscriber names in attachment order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .load()
            .iter()
            .map(|e| e.name.to_string())
            .collect()
    }

    /// Attach a subscriber under `name`, then notify it with `hooked`.
    ///
    /// The notification carries this subject as an [`Arg::Subject`] so the
    /// subscriber can detach itself later. If it fails, the subscriber is
    /// removed again before the error is returned.
    pub fn attach(&self, name: &str, subscriber: Arc<dyn Module>) -> Result<(), HookError> {
        {
            let _guard = self.writer.lock();
            let current = self.entries.load();
            if current.iter().any(|e| &*e.name == name) {
                return Err(HookError::DuplicateSubscriber {
                    name: name.to_owned(),
                    subject: self.label.clone(),
                });
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Entry {
                name: Arc::from(name),
                subscriber: Arc::clone(&subscriber),
            });
            self.entries.store(Arc::new(next));
        }
        tracing::debug!(subject = %self.label, subscriber = name, "subscriber attached");

        let me = self.subject_ref();
        if let Err(err) = self.deliver(name, &*subscriber, HOOKED, &[Arg::Subject(&me)]) {
            self.remove(name);
            tracing::debug!(subject = %self.label, subscriber = name, "attach rolled back");
            return Err(err);
        }
        Ok(())
    }

    /// Notify the named subscriber with `unhooked`, then detach it.
    ///
    /// If the notification fails the subscriber stays attached.
    pub fn detach(&self, name: &str) -> Result<(), HookError> {
        let subscriber = self
            .entries
            .load()
            .iter()
            .find(|e| &*e.name == name)
            .map(|e| Arc::clone(&e.subscriber))
            .ok_or_else(|| HookError::SubscriberNotFound {
                name: name.to_owned(),
                subject: self.label.clone(),
            })?;

        let me = self.subject_ref();
        self.deliver(name, &*subscriber, UNHOOKED, &[Arg::Subject(&me)])?;

        self.remove(name);
        tracing::debug!(subject = %self.label, subscriber = name, "subscriber detached");
        Ok(())
    }

    fn remove(&self, name: &str) {
        let _guard = self.writer.lock();
        let current = self.entries.load();
        let next: Vec<Entry> = current
            .iter()
            .filter(|e| &*e.name != name)
            .cloned()
            .collect();
        self.entries.store(Arc::new(next));
    }

    /// Deliver `event` to every subscriber, discarding replies.
    ///
    /// Returns immediately when nothing is attached. A failing subscriber
    /// aborts the emit and its error propagates.
    pub fn emit(&self, event: &str, args: &[Arg<'_>]) -> Result<(), HookError> {
        let entries = self.entries.load();
        if entries.is_empty() {
            return Ok(());
        }
        let method = self.method_name(event);
        tracing::trace!(subject = %self.label, %method, subscribers = entries.len(), "emit");
        for entry in entries.iter() {
            self.call(entry, &method, args)?;
        }
        Ok(())
    }

    /// Deliver `event` to every subscriber and collect their replies.
    ///
    /// The result has one slot per subscriber, in attachment order; a
    /// subscriber that ignores the event contributes `None`.
    pub fn collect(&self, event: &str, args: &[Arg<'_>]) -> Result<Vec<Option<Reply>>, HookError> {
        let entries = self.entries.load();
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let method = self.method_name(event);
        tracing::trace!(subject = %self.label, %method, subscribers = entries.len(), "collect");
        entries
            .iter()
            .map(|entry| self.call(entry, &method, args))
            .collect()
    }

    fn call(&self, entry: &Entry, method: &str, args: &[Arg<'_>]) -> Result<Option<Reply>, HookError> {
        entry
            .subscriber
            .notify(method, args)
            .map_err(|source| HookError::Subscriber {
                name: entry.name.to_string(),
                method: method.to_owned(),
                source,
            })
    }

    fn deliver(
        &self,
        name: &str,
        subscriber: &dyn Module,
        event: &str,
        args: &[Arg<'_>],
    ) -> Result<Option<Reply>, HookError> {
        let method = self.method_name(event);
        subscriber
            .notify(&method, args)
            .map_err(|source| HookError::Subscriber {
                name: name.to_owned(),
                method,
                source,
            })
    }
}

impl Subject for HookRegistry {
    fn subject_id(&self) -> SubjectId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_attached(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn detach(&self, name: &str) -> Result<(), HookError> {
        HookRegistry::detach(self, name)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("subscribers", &self.names())
            .finish()
    }
}
