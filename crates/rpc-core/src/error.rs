//! Error kinds raised by the invocation engine.

/// A handler-side failure, echoed back to the caller as an exception reply.
///
/// `causes` is non-empty only when this error was built with
/// [`ApiExecutionError::aggregate`] from several inner failures — the
/// first becomes this error's message; `all_causes` exposes every one of
/// them so the dispatcher can feed each individually to the user-exception
/// hook.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiExecutionError {
    pub message: String,
    pub causes: Vec<ApiExecutionError>,
}

impl ApiExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        ApiExecutionError {
            message: message.into(),
            causes: Vec::new(),
        }
    }

    /// Build an aggregate error from several inner failures. Panics if
    /// `errors` is empty — callers only reach for this when a handler
    /// actually collected more than zero failures.
    pub fn aggregate(mut errors: Vec<ApiExecutionError>) -> Self {
        assert!(!errors.is_empty(), "aggregate requires at least one error");
        let first = errors.remove(0);
        let mut causes = vec![first.clone()];
        causes.extend(errors);
        ApiExecutionError {
            message: first.message,
            causes,
        }
    }

    /// Every individual cause this error represents — just itself for an
    /// ordinary error, or each aggregated error in order.
    pub fn all_causes(&self) -> &[ApiExecutionError] {
        if self.causes.is_empty() {
            std::slice::from_ref(self)
        } else {
            &self.causes
        }
    }
}

/// An incoming request named an API this endpoint never registered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("API '{0}' not found")]
pub struct ApiNotFoundError(pub String);

/// Programmer bug: a packet id was parked twice.
#[derive(Debug, Clone, thiserror::Error)]
#[error("packet id {0} is already pending")]
pub struct DuplicateIdError(pub u32);

/// Errors the user-exception hook observes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    ApiNotFound(#[from] ApiNotFoundError),
    #[error(transparent)]
    ApiExecution(#[from] ApiExecutionError),
}

/// Outcome surfaced to an `Invoke<T>` caller.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("remote error: {0}")]
    Remote(String),
    #[error("call timed out")]
    Timeout,
    #[error("connection shut down while the call was pending")]
    Shutdown,
    #[error("endpoint is disconnected")]
    Disconnected,
    #[error(transparent)]
    Duplicate(#[from] DuplicateIdError),
    #[error("failed to encode request: {0}")]
    Encode(rpc_protocol::SerializerError),
    #[error("failed to decode reply: {0}")]
    Decode(rpc_protocol::SerializerError),
}
