//! The outcome of a dispatch.

/// Body of the terminal routing-failure response.
pub const ROUTING_FAILED_BODY: &str = "Routing error.";

/// What a request produced.
///
/// [`Response::RoutingFailed`] is terminal: it is produced only by the
/// resolver's error path, after the `error` event has been emitted.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// A rendered body.
    Content(String),
    /// The action completed without output.
    Empty,
    /// Routing failed; no handler ran to completion.
    RoutingFailed,
}

impl Response {
    /// Wrap a rendered body.
    pub fn content(body: impl Into<String>) -> Self {
        Response::Content(body.into())
    }

    /// Whether this is the terminal routing failure.
    pub fn is_routing_failure(&self) -> bool {
        matches!(self, Response::RoutingFailed)
    }

    /// The body that would be sent to the client.
    pub fn body(&self) -> &str {
        match self {
            Response::Content(body) => body,
            Response::Empty => "",
            Response::RoutingFailed => ROUTING_FAILED_BODY,
        }
    }
}

impl From<String> for Response {
    fn from(body: String) -> Self {
        Response::Content(body)
    }
}

impl From<&str> for Response {
    fn from(body: &str) -> Self {
        Response::Content(body.to_owned())
    }
}

impl From<()> for Response {
    fn from((): ()) -> Self {
        Response::Empty
    }
}
