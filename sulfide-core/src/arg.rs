//! Event arguments and subscriber replies.
//!
//! Events carry an ordered slice of [`Arg`]s. Subscribers answer with an
//! optional type-erased [`Reply`]; a subscriber that does not know an event
//! answers `Ok(None)`.

use crate::{error::BoxError, params::Parameters, subject::SubjectRef};
use std::{any::Any, fmt};

/// A type-erased value returned by a subscriber.
pub type Reply = Box<dyn Any + Send>;

/// The result of delivering one event to one subscriber.
pub type HookReturn = Result<Option<Reply>, BoxError>;

/// Wrap a value as a subscriber reply.
pub fn reply<T: Any + Send>(value: T) -> HookReturn {
    Ok(Some(Box::new(value)))
}

/// Identity of the handler instance carried by routing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerRef<'a> {
    /// The handler name as it appeared in the route.
    pub name: &'a str,
    /// The owning module, if the handler is module-qualified.
    pub module: Option<&'a str>,
}

/// A single positional event argument.
#[derive(Clone, Copy)]
pub enum Arg<'a> {
    /// A string (paths, action names, module names).
    Text(&'a str),
    /// A parameter store.
    Params(&'a Parameters),
    /// The handler instance being dispatched.
    Handler(HandlerRef<'a>),
    /// The emitting subject (sent with `hooked`/`unhooked`).
    Subject(&'a SubjectRef),
    /// Anything else.
    Any(&'a (dyn Any + Send + Sync)),
}

impl<'a> Arg<'a> {
    /// The string payload, if this is [`Arg::Text`].
    pub fn as_text(&self) -> Option<&'a str> {
        match *self {
            Arg::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The parameters, if this is [`Arg::Params`].
    pub fn as_params(&self) -> Option<&'a Parameters> {
        match *self {
            Arg::Params(p) => Some(p),
            _ => None,
        }
    }

    /// The handler identity, if this is [`Arg::Handler`].
    pub fn as_handler(&self) -> Option<HandlerRef<'a>> {
        match *self {
            Arg::Handler(h) => Some(h),
            _ => None,
        }
    }

    /// The subject handle, if this is [`Arg::Subject`].
    pub fn as_subject(&self) -> Option<&'a SubjectRef> {
        match *self {
            Arg::Subject(s) => Some(s),
            _ => None,
        }
    }

    /// Downcast an [`Arg::Any`] payload.
    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        match *self {
            Arg::Any(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Arg::Params(p) => f.debug_tuple("Params").field(p).finish(),
            Arg::Handler(h) => f.debug_tuple("Handler").field(h).finish(),
            Arg::Subject(s) => f.debug_tuple("Subject").field(&s.label()).finish(),
            Arg::Any(_) => f.write_str("Any(..)"),
        }
    }
}

impl<'a> From<&'a str> for Arg<'a> {
    fn from(s: &'a str) -> Self {
        Arg::Text(s)
    }
}

impl<'a> From<&'a String> for Arg<'a> {
    fn from(s: &'a String) -> Self {
        Arg::Text(s)
    }
}

impl<'a> From<&'a Parameters> for Arg<'a> {
    fn from(p: &'a Parameters) -> Self {
        Arg::Params(p)
    }
}

impl<'a> From<HandlerRef<'a>> for Arg<'a> {
    fn from(h: HandlerRef<'a>) -> Self {
        Arg::Handler(h)
    }
}
