//! Error taxonomy shared across the crate.
//!
//! The pipeline builder, the durable sink, and the OTLP sink each have a narrow set of
//! failure modes; rather than a single do-everything error we keep one enum per
//! subsystem so callers can match on what actually went wrong.

use thiserror::Error;

/// Errors raised while building or reconfiguring a [`crate::pipeline::Pipeline`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sink id `{0}` is already registered")]
    DuplicateSink(String),

    #[error("no sink registered with id `{0}`")]
    UnknownSink(String),

    #[error("sampling policy `{policy}` given invalid parameter `{param}`: {reason}")]
    InvalidSamplingParam {
        policy: &'static str,
        param: &'static str,
        reason: String,
    },

    #[error("invalid OTLP endpoint `{0}`: {1}")]
    InvalidEndpoint(String, String),

    #[error("scalar type already registered for capture")]
    DuplicateScalarRegistration,

    #[error("scalar types may only be registered before the first event is captured")]
    RegistrationAfterFirstCapture,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the durable (write-ahead) sink wrapper.
#[derive(Debug, Error)]
pub enum DurableError {
    #[error("failed to create durable sink directory `{path}`: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open segment file `{path}`: {source}")]
    OpenSegment {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write segment record: {0}")]
    Write(std::io::Error),

    #[error("failed to encode event for durable storage: {0}")]
    Encode(#[from] serde_cbor::Error),

    #[error("segment decode failed at offset {offset}: {reason}")]
    Decode { offset: u64, reason: String },

    #[error("downstream sink rejected a replayed event: {0}")]
    Replay(String),
}

/// Errors raised by the OTLP export sink.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export transport error: {0}")]
    Transport(String),

    #[error("export rejected by collector: status={status} message={message}")]
    Rejected { status: i32, message: String },

    #[error("export queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("export sink is closed")]
    Closed,

    #[error("retry budget exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Errors a [`crate::sink::Sink`] can return from `emit`/`flush`/`close`. Wraps the
/// more specific durable/export error types so the pipeline's dispatch loop has one
/// thing to match on regardless of which sink produced it.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("sink is closed")]
    Closed,

    #[error(transparent)]
    Durable(#[from] DurableError),

    #[error(transparent)]
    Export(#[from] ExportError),
}
