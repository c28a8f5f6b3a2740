//! Runtime-tunable knobs for a [`crate::session::Session`].

use std::sync::Arc;
use std::time::Duration;

use rpc_protocol::{JsonSerializer, Serializer};

/// Default pending-call timeout: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration an endpoint is built with. Cloning is cheap — the
/// serializer is held behind an `Arc`.
#[derive(Clone)]
pub struct RpcConfig {
    pub timeout: Duration,
    pub max_frame_bytes: usize,
    pub serializer: Arc<dyn Serializer>,
}

impl RpcConfig {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_frame_bytes: rpc_protocol::DEFAULT_MAX_FRAME_BYTES,
            serializer: Arc::new(JsonSerializer),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    #[must_use]
    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::new()
    }
}
