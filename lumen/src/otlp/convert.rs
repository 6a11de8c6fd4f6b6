//! Converts [`Event`]/[`CapturedValue`] into the OTLP logs wire types from
//! `opentelemetry-proto`.

use crate::capture::CapturedValue;
use crate::event::Event;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, ArrayValue, KeyValue, KeyValueList};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, SeverityNumber};

pub fn captured_value_to_any_value(value: &CapturedValue) -> AnyValue {
    let inner = match value {
        CapturedValue::Null => None,
        CapturedValue::Bool(b) => Some(any_value::Value::BoolValue(*b)),
        CapturedValue::Int(i) => Some(any_value::Value::IntValue(*i)),
        CapturedValue::UInt(u) => Some(any_value::Value::IntValue(*u as i64)),
        CapturedValue::Float(f) => Some(any_value::Value::DoubleValue(*f)),
        CapturedValue::Str(s) => Some(any_value::Value::StringValue(s.clone())),
        CapturedValue::Bytes(b) => Some(any_value::Value::BytesValue(b.clone())),
        CapturedValue::Time(t) => Some(any_value::Value::StringValue(t.to_rfc3339())),
        CapturedValue::Duration(d) => Some(any_value::Value::StringValue(format!("{:?}", d))),
        CapturedValue::List(items) => Some(any_value::Value::ArrayValue(ArrayValue {
            values: items.iter().map(captured_value_to_any_value).collect(),
        })),
        CapturedValue::Map(entries) => Some(any_value::Value::KvlistValue(KeyValueList {
            values: entries
                .iter()
                .map(|(k, v)| KeyValue {
                    key: k.clone(),
                    value: Some(captured_value_to_any_value(v)),
                })
                .collect(),
        })),
        CapturedValue::Struct { fields, .. } => Some(any_value::Value::KvlistValue(KeyValueList {
            values: fields
                .iter()
                .map(|(k, v)| KeyValue {
                    key: k.clone(),
                    value: Some(captured_value_to_any_value(v)),
                })
                .collect(),
        })),
        CapturedValue::Truncated(reason) => Some(any_value::Value::StringValue(format!("<truncated: {}>", reason))),
    };
    AnyValue { value: inner }
}

fn severity_number(event: &Event) -> SeverityNumber {
    use crate::event::Level;
    match event.level {
        Level::Verbose => SeverityNumber::Trace,
        Level::Debug => SeverityNumber::Debug,
        Level::Information => SeverityNumber::Info,
        Level::Warning => SeverityNumber::Warn,
        Level::Error => SeverityNumber::Error,
        Level::Fatal => SeverityNumber::Fatal,
    }
}

/// Converts one event into an OTLP `LogRecord`. The rendered message becomes the
/// record body; every property (including enricher-added ones such as
/// `trace.id`/`span.id`) becomes a log attribute, keeping the structured data intact
/// rather than collapsing it into the rendered text.
pub fn event_to_log_record(event: &Event, templates: &crate::template::TemplateCache) -> LogRecord {
    let rendered = event.render(templates);
    let attributes: Vec<KeyValue> = event
        .properties
        .iter()
        .map(|(k, v)| KeyValue {
            key: k.to_string(),
            value: Some(captured_value_to_any_value(v)),
        })
        .collect();

    LogRecord {
        time_unix_nano: event.timestamp.timestamp_nanos_opt().unwrap_or_default() as u64,
        observed_time_unix_nano: event.timestamp.timestamp_nanos_opt().unwrap_or_default() as u64,
        severity_number: severity_number(event) as i32,
        severity_text: event.level.to_string(),
        body: Some(AnyValue {
            value: Some(any_value::Value::StringValue(rendered.to_string())),
        }),
        attributes,
        dropped_attributes_count: 0,
        flags: 0,
        trace_id: Vec::new(),
        span_id: Vec::new(),
        event_name: String::new(),
    }
}
