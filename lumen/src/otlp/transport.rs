//! The two wire transports OTLP supports: HTTP/protobuf via a blocking `reqwest`
//! client, and gRPC via `tonic`'s generated client. gRPC needs an async executor to
//! drive the HTTP/2 connection, so [`GrpcTransport`] keeps a small dedicated
//! single-threaded `tokio` runtime for exactly that, the same shape as the
//! facilitator's dedicated `Runtime::new()` for its metrics-scrape endpoint — nothing
//! else in this crate depends on an async runtime.

use super::config::{Compression, OtlpConfig};
use crate::error::ExportError;
use opentelemetry_proto::tonic::collector::logs::v1::export_logs_service_client::ExportLogsServiceClient;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::resource::v1::Resource;
use prost::Message;
use std::io::Write;
use std::time::Duration;

pub trait Transport: Send + Sync {
    fn export(&self, records: Vec<LogRecord>) -> Result<(), ExportError>;
}

fn wrap_request(records: Vec<LogRecord>, resource_attributes: &[(String, String)]) -> ExportLogsServiceRequest {
    let resource = Resource {
        attributes: resource_attributes
            .iter()
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: Some(AnyValue {
                    value: Some(any_value::Value::StringValue(v.clone())),
                }),
            })
            .collect(),
        dropped_attributes_count: 0,
    };

    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            resource: Some(resource),
            scope_logs: vec![ScopeLogs {
                scope: Some(InstrumentationScope {
                    name: "lumen".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    attributes: Vec::new(),
                    dropped_attributes_count: 0,
                }),
                log_records: records,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

fn compress(compression: Compression, bytes: Vec<u8>) -> std::io::Result<(Vec<u8>, Option<&'static str>)> {
    match compression {
        Compression::None => Ok((bytes, None)),
        Compression::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&bytes)?;
            Ok((encoder.finish()?, Some("gzip")))
        }
        Compression::Zstd => {
            let compressed = zstd::stream::encode_all(bytes.as_slice(), 0)?;
            Ok((compressed, Some("zstd")))
        }
    }
}

/// OTLP/HTTP transport: POSTs protobuf-encoded requests to `{endpoint}/v1/logs`.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    compression: Compression,
    headers: Vec<(String, String)>,
    resource_attributes: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(config: &OtlpConfig, resource_attributes: Vec<(String, String)>) -> Result<Self, ExportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/v1/logs", config.endpoint.trim_end_matches('/')),
            compression: config.compression,
            headers: config.headers.clone(),
            resource_attributes,
        })
    }
}

impl Transport for HttpTransport {
    fn export(&self, records: Vec<LogRecord>) -> Result<(), ExportError> {
        let request = wrap_request(records, &self.resource_attributes);
        let body = request.encode_to_vec();
        let (body, encoding) = compress(self.compression, body).map_err(|e| ExportError::Transport(e.to_string()))?;

        let mut req = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-protobuf")
            .body(body);
        if let Some(encoding) = encoding {
            req = req.header("Content-Encoding", encoding);
        }
        for (k, v) in &self.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let response = req.send().map_err(|e| ExportError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let status_code = status.as_u16() as i32;
            let message = response.text().unwrap_or_default();
            Err(ExportError::Rejected { status: status_code, message })
        }
    }
}

/// OTLP/gRPC transport. Owns a dedicated single-threaded `tokio` runtime used only to
/// drive `tonic`'s async client from this transport's synchronous `export` call.
pub struct GrpcTransport {
    runtime: tokio::runtime::Runtime,
    endpoint: String,
    headers: Vec<(String, String)>,
    resource_attributes: Vec<(String, String)>,
    timeout: Duration,
}

impl GrpcTransport {
    pub fn new(config: &OtlpConfig, resource_attributes: Vec<(String, String)>) -> Result<Self, ExportError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ExportError::Transport(e.to_string()))?;
        Ok(Self {
            runtime,
            endpoint: config.endpoint.clone(),
            headers: config.headers.clone(),
            resource_attributes,
            timeout: config.timeout,
        })
    }
}

impl Transport for GrpcTransport {
    fn export(&self, records: Vec<LogRecord>) -> Result<(), ExportError> {
        let request = wrap_request(records, &self.resource_attributes);
        let endpoint = self.endpoint.clone();
        let headers = self.headers.clone();
        let timeout = self.timeout;

        self.runtime.block_on(async move {
            let channel = tonic::transport::Channel::from_shared(endpoint.clone())
                .map_err(|e| ExportError::Transport(e.to_string()))?
                .timeout(timeout)
                .connect()
                .await
                .map_err(|e| ExportError::Transport(e.to_string()))?;

            let mut client = ExportLogsServiceClient::new(channel);
            let mut tonic_request = tonic::Request::new(request);
            for (k, v) in &headers {
                if let (Ok(name), Ok(value)) = (
                    tonic::metadata::MetadataKey::from_bytes(k.as_bytes()),
                    v.parse(),
                ) {
                    tonic_request.metadata_mut().insert(name, value);
                }
            }

            client
                .export(tonic_request)
                .await
                .map(|_| ())
                .map_err(|status| ExportError::Rejected {
                    status: status.code() as i32,
                    message: status.message().to_string(),
                })
        })
    }
}
