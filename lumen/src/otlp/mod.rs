//! OTLP log export: configuration, wire-type conversion, batching, transport, and the
//! [`crate::sink::Sink`] that ties them together.

mod batch;
mod config;
mod convert;
mod sink;
mod transport;

pub use config::{Compression, OtlpConfig, OtlpProtocol};
pub use convert::{captured_value_to_any_value, event_to_log_record};
pub use sink::OtlpSink;
pub use transport::{GrpcTransport, HttpTransport, Transport};
