//! OTLP exporter configuration, including the standard `OTEL_EXPORTER_OTLP_*`
//! environment variable overrides every OTLP exporter in the ecosystem honors.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtlpProtocol {
    Grpc,
    HttpProtobuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

#[derive(Debug, Clone)]
pub struct OtlpConfig {
    pub endpoint: String,
    pub protocol: OtlpProtocol,
    pub compression: Compression,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub max_queue_size: usize,
    pub retry_initial_interval: Duration,
    pub retry_max_interval: Duration,
    pub retry_max_elapsed_time: Duration,
}

impl Default for OtlpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4318".to_string(),
            protocol: OtlpProtocol::HttpProtobuf,
            compression: Compression::Gzip,
            headers: Vec::new(),
            timeout: Duration::from_secs(10),
            batch_size: 512,
            batch_timeout: Duration::from_secs(5),
            max_queue_size: 2048,
            retry_initial_interval: Duration::from_millis(500),
            retry_max_interval: Duration::from_secs(30),
            retry_max_elapsed_time: Duration::from_secs(60),
        }
    }
}

impl OtlpConfig {
    /// Applies `OTEL_EXPORTER_OTLP_*`/`OTEL_EXPORTER_OTLP_LOGS_*` overrides on top of
    /// `self`, the logs-specific variable taking precedence over the generic one, per
    /// the OTLP exporter environment variable specification.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(endpoint) = env_var("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT").or_else(|| env_var("OTEL_EXPORTER_OTLP_ENDPOINT")) {
            self.endpoint = endpoint;
        }
        if let Some(protocol) = env_var("OTEL_EXPORTER_OTLP_LOGS_PROTOCOL").or_else(|| env_var("OTEL_EXPORTER_OTLP_PROTOCOL")) {
            self.protocol = match protocol.as_str() {
                "grpc" => OtlpProtocol::Grpc,
                _ => OtlpProtocol::HttpProtobuf,
            };
        }
        if let Some(compression) = env_var("OTEL_EXPORTER_OTLP_LOGS_COMPRESSION").or_else(|| env_var("OTEL_EXPORTER_OTLP_COMPRESSION")) {
            self.compression = match compression.as_str() {
                "gzip" => Compression::Gzip,
                "zstd" => Compression::Zstd,
                "none" => Compression::None,
                _ => self.compression,
            };
        }
        if let Some(timeout_ms) = env_var("OTEL_EXPORTER_OTLP_LOGS_TIMEOUT")
            .or_else(|| env_var("OTEL_EXPORTER_OTLP_TIMEOUT"))
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(headers) = env_var("OTEL_EXPORTER_OTLP_LOGS_HEADERS").or_else(|| env_var("OTEL_EXPORTER_OTLP_HEADERS")) {
            self.headers = parse_headers(&headers);
        }
        self
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Parses a `key1=value1,key2=value2` header list, the format the OTLP env spec uses.
fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            Some((k.trim().to_string(), v.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod __test__ {
    use super::*;

    #[test]
    fn parses_comma_separated_headers() {
        let headers = parse_headers("api-key=secret, x-env = prod");
        assert_eq!(headers, vec![("api-key".to_string(), "secret".to_string()), ("x-env".to_string(), "prod".to_string())]);
    }
}
