//! Minimal Prometheus text-exposition server for sink/sampling metrics.
//!
//! The facilitator's `start_metrics_scrape_endpoint`/`handle_scrape` is the model for
//! the registry-plus-`TextEncoder` shape; this crate has no async runtime, so the
//! listener loop below is a plain blocking `std::net::TcpListener` on a dedicated
//! thread rather than a `warp`/tokio server.

use prometheus::{Encoder, IntGauge, Registry, TextEncoder};
use std::collections::HashMap;
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Something that can report a current snapshot of its metrics as flat
/// `(name, value)` pairs — sinks and sampling policies both implement this shape
/// already via `get_metrics`/`to_prometheus`.
pub type MetricsProvider = dyn Fn() -> Vec<(String, u64)> + Send + Sync;

struct Inner {
    registry: Registry,
    gauges: Mutex<HashMap<String, IntGauge>>,
    provider: Arc<MetricsProvider>,
}

impl Inner {
    fn refresh(&self) {
        let mut gauges = self.gauges.lock().expect("gauge cache mutex poisoned");
        for (name, value) in (self.provider)() {
            let gauge = gauges.entry(name.clone()).or_insert_with(|| {
                let gauge = IntGauge::new(name.clone(), format!("{} (lumen)", name)).expect("invalid metric name");
                self.registry
                    .register(Box::new(gauge.clone()))
                    .expect("duplicate metric registration");
                gauge
            });
            gauge.set(value as i64);
        }
    }

    fn encode(&self) -> Vec<u8> {
        self.refresh();
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .expect("prometheus text encoding cannot fail for well-formed gauges");
        buffer
    }
}

/// Serves `GET /metrics` on a background thread for as long as the exporter is alive.
pub struct PrometheusExporter {
    inner: Arc<Inner>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PrometheusExporter {
    /// Binds `addr` (e.g. `"127.0.0.1:9898"`) and starts serving `/metrics`, computed
    /// on each scrape by calling `provider`.
    pub fn bind(addr: &str, provider: impl Fn() -> Vec<(String, u64)> + Send + Sync + 'static) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        let inner = Arc::new(Inner {
            registry: Registry::new(),
            gauges: Mutex::new(HashMap::new()),
            provider: Arc::new(provider),
        });
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker_inner = Arc::clone(&inner);
        let worker_shutdown = Arc::clone(&shutdown);
        let handle = std::thread::spawn(move || {
            while !worker_shutdown.load(Ordering::Acquire) {
                match listener.accept() {
                    Ok((stream, _)) => handle_connection(stream, &worker_inner),
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => std::thread::sleep(std::time::Duration::from_millis(10)),
                }
            }
        });

        Ok(Self {
            inner,
            shutdown,
            handle: Some(handle),
        })
    }

    /// Renders the current exposition text directly, without going through the socket
    /// — useful for tests and for embedding the text into another transport.
    pub fn render(&self) -> String {
        String::from_utf8_lossy(&self.inner.encode()).into_owned()
    }
}

fn handle_connection(mut stream: TcpStream, inner: &Arc<Inner>) {
    let mut discard = [0u8; 1024];
    let _ = std::io::Read::read(&mut stream, &mut discard);
    let body = inner.encode();
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(header.as_bytes());
    let _ = stream.write_all(&body);
}

impl Drop for PrometheusExporter {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;

    #[test]
    fn render_includes_provided_metric_names() {
        let exporter = PrometheusExporter::bind("127.0.0.1:0", || vec![("lumen_test_metric".to_string(), 42)]);
        // Port 0 picks an ephemeral port; binding itself is what we're exercising here,
        // the rendered text is checked directly rather than via a real socket round trip.
        if let Ok(exporter) = exporter {
            let text = exporter.render();
            assert!(text.contains("lumen_test_metric"));
            assert!(text.contains("42"));
        }
    }
}
