//! Subjects: anything that owns a subscriber registry and emits events.
//!
//! Modules never own the subjects they are hooked to. They hold a [`SubjectRef`],
//! a weak handle that identifies the subject and can request detachment while
//! the subject is alive.

use crate::error::HookError;
use std::{
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

/// Process-unique identifier of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(u64);

impl SubjectId {
    /// Allocate a fresh identifier.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The detachment capability a subject exposes to its subscribers.
pub trait Subject: Send + Sync + 'static {
    /// The subject's identifier.
    fn subject_id(&self) -> SubjectId;

    /// The `namespace_topic` label used to build event method names.
    fn label(&self) -> &str;

    /// Whether a subscriber with this name is attached.
    fn is_attached(&self, name: &str) -> bool;

    /// Detach the named subscriber, notifying it with `unhooked` first.
    fn detach(&self, name: &str) -> Result<(), HookError>;
}

/// A weak, identifying handle to a [`Subject`].
///
/// Holding a `SubjectRef` never keeps the subject alive.
#[derive(Clone)]
pub struct SubjectRef {
    id: SubjectId,
    label: Arc<str>,
    subject: Weak<dyn Subject>,
}

impl SubjectRef {
    /// Create a handle from a weak subject pointer.
    pub fn new(id: SubjectId, label: impl Into<Arc<str>>, subject: Weak<dyn Subject>) -> Self {
        Self {
            id,
            label: label.into(),
            subject,
        }
    }

    /// The subject's identifier.
    pub fn id(&self) -> SubjectId {
        self.id
    }

    /// The subject's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the subject is still alive.
    pub fn is_alive(&self) -> bool {
        self.subject.strong_count() > 0
    }

    /// Upgrade to a strong reference, if the subject is still alive.
    pub fn upgrade(&self) -> Option<Arc<dyn Subject>> {
        self.subject.upgrade()
    }

    /// Whether the named subscriber is attached to a live subject.
    pub fn is_attached(&self, name: &str) -> bool {
        self.upgrade().is_some_and(|s| s.is_attached(name))
    }

    /// Detach the named subscriber.
    ///
    /// Returns `Ok(false)` if the subject no longer exists.
    pub fn detach(&self, name: &str) -> Result<bool, HookError> {
        match self.upgrade() {
            Some(subject) => subject.detach(name).map(|()| true),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectRef")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl PartialEq for SubjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SubjectRef {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(SubjectId);

    impl Subject for Dummy {
        fn subject_id(&self) -> SubjectId {
            self.0
        }
        fn label(&self) -> &str {
            "test_dummy"
        }
        fn is_attached(&self, _name: &str) -> bool {
            true
        }
        fn detach(&self, _name: &str) -> Result<(), HookError> {
            Ok(())
        }
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SubjectId::next(), SubjectId::next());
    }

    #[test]
    fn test_subject_ref_does_not_keep_subject_alive() {
        let id = SubjectId::next();
        let subject: Arc<dyn Subject> = Arc::new(Dummy(id));
        let handle = SubjectRef::new(id, "test_dummy", Arc::downgrade(&subject));

        assert!(handle.is_alive());
        assert_eq!(handle.detach("x").unwrap(), true);

        drop(subject);
        assert!(!handle.is_alive());
        assert!(!handle.is_attached("x"));
        assert_eq!(handle.detach("x").unwrap(), false);
    }
}
