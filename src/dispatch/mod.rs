//! Dispatch: the request/response state machine between transports and
//! the upstream executor.
//!
//! Every call ends in an [`ApiResponseEnvelope`]; errors are captured into
//! the envelope and never propagate past the dispatcher.

pub mod dispatcher;
pub mod envelope;
pub mod errors;

// Re-exports for convenience
pub use dispatcher::{BuildError, DispatchState, Dispatcher, ToolCallRequest};
pub use envelope::{ApiResponseEnvelope, EnvelopeError, ErrorCode};
pub use errors::DispatchError;
