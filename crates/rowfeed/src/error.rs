//! Error types for the record stream.
//!
//! Errors mostly surface at the edges: invalid settings coming from the user,
//! a generator task that is gone, or a missing async runtime.
//!
//! ## Error Cases
//! - `InvalidSettings`: An interval of zero, an oversized batch, or an
//!   unparsable config edit.
//! - `BatchAllocation`: A batch could not be allocated.
//! - `ChannelError`: A message could not reach the generator task.
//! - `RuntimeUnavailable`: No Tokio runtime is available to host the
//!   generator.
//! - `ServiceShutdown`: The operation arrived after teardown.

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for `rowfeed`.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Settings or a config edit were rejected before reaching the generator.
    #[error("Invalid settings: {reason}")]
    InvalidSettings { reason: String },

    /// Memory for a batch of `array_size` records could not be reserved.
    #[error("Cannot allocate a batch of {array_size} records")]
    BatchAllocation { array_size: usize },

    /// Internal channel send/receive failure (e.g., closed channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The generator needs a Tokio runtime and none is running.
    #[error("No async runtime available to host the generator")]
    RuntimeUnavailable,

    /// The controller or generator has already been torn down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}
