//! Error types for the bridge engine

/// Result alias used throughout the bridge engine
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error type for bridge operations
///
/// Only [`BridgeError::Configuration`] aborts an engine operation. Everything else is
/// reported at the granularity of one batch ([`BridgeError::ProtocolShape`]) or one
/// call ([`BridgeError::UnknownTarget`], [`BridgeError::Invocation`]).
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Missing collaborator or binding (e.g., no network context, no bundle URL)
    #[error("bridge configuration error: {0}")]
    Configuration(String),
    /// Result document does not have the array-of-three-lists shape
    #[error("unexpected result document: {0}")]
    ProtocolShape(String),
    /// Module or method id is not present in the registry
    #[error("no method {method_id} on module {module_id}")]
    UnknownTarget {
        module_id: serde_json::Value,
        method_id: serde_json::Value,
    },
    /// Native operation rejected its arguments
    #[error(transparent)]
    Invocation(#[from] InvocationError),
    /// Execution channel failure
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// Source provider failure
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Error raised by a native method invocation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvocationError {
    /// Positional argument could not be decoded
    #[error("{module}.{method}: argument {index} {reason}")]
    Argument {
        module: String,
        method: String,
        index: usize,
        reason: String,
    },
    /// Native operation refused the call
    #[error("{module}.{method}: {reason}")]
    Rejected {
        module: String,
        method: String,
        reason: String,
    },
}

/// Error type for execution channel operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Channel could not prepare its script context
    #[error("execution channel init failed: {0}")]
    Init(String),
    /// Script threw or failed to evaluate
    #[error("script error: {0}")]
    Script(String),
    /// Channel is gone (worker thread exited, receiver dropped)
    #[error("execution channel closed")]
    Closed,
}

/// Error type for source loading
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no script URL set")]
    MissingUrl,
    #[error("unsupported script URL scheme \"{0}\"")]
    UnsupportedScheme(String),
    #[error("failed to read {url}: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
