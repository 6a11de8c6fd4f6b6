pub mod capture;
pub mod enrich;
pub mod error;
pub mod event;
pub mod filter;
pub mod observability;
pub mod otlp;
pub mod pipeline;
pub mod sampling;
pub mod sink;
pub mod template;

pub use error::{ConfigError, DurableError, ExportError, SinkError};
pub use event::{Event, Level, PropertyBag};
pub use pipeline::{Logger, Pipeline, PipelineBuilder};
