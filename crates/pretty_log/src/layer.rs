//! Provides a [`tracing_subscriber::Layer`] ([`PrettyFormattingLayer`]) that renders tracing
//! events with a [`PrettyEncoder`].

use std::{fmt, io::Write};

use serde_json::Value;
use time::OffsetDateTime;
use tracing::{
    Event, Subscriber,
    field::{Field as TracingField, Visit},
};
use tracing_subscriber::{Layer, fmt::MakeWriter, layer::Context, registry::LookupSpan};

use crate::{
    PrettyEncoder,
    config::keys,
    entry::{Caller, LogEntry},
    field::{Field, FieldValue},
};

/// A [`tracing_subscriber::Layer`] that writes every event as one pretty-printed line.
///
/// Event fields are rendered in the order they were recorded; the `message` field becomes the
/// entry message. Each line is written with a single `write_all` call, after which its buffer
/// goes back to the encoder's pool.
#[derive(Debug)]
pub struct PrettyFormattingLayer<W>
where
    W: for<'a> MakeWriter<'a> + 'static,
{
    encoder: PrettyEncoder,
    dst_writer: W,
}

impl<W> PrettyFormattingLayer<W>
where
    W: for<'a> MakeWriter<'a> + 'static,
{
    /// Creates a new [`PrettyFormattingLayer`] rendering with `encoder` into `dst_writer`.
    pub fn new(encoder: PrettyEncoder, dst_writer: W) -> Self {
        Self {
            encoder,
            dst_writer,
        }
    }

    fn entry_for(event: &Event<'_>, message: Option<String>) -> LogEntry {
        let metadata = event.metadata();
        let caller = metadata
            .file()
            .zip(metadata.line())
            .map(|(file, line)| Caller::new(file, line));

        LogEntry {
            level: (*metadata.level()).into(),
            time: OffsetDateTime::now_utc(),
            caller,
            message: message.unwrap_or_else(|| metadata.target().to_string()),
        }
    }
}

impl<S, W> Layer<S> for PrettyFormattingLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let entry = Self::entry_for(event, visitor.message);

        match self.encoder.encode_entry(&entry, &visitor.fields) {
            Ok(line) => {
                let _ = self.dst_writer.make_writer().write_all(line.as_bytes());
            }
            Err(error) => {
                let key = error.key().to_string();
                let reason = error.source_error().to_string();
                let _ = self
                    .dst_writer
                    .make_writer()
                    .write_all(error.into_line().as_bytes());
                tracing::warn!("Failed to marshal log field `{key}`: {reason}");
            }
        }
    }
}

/// Collects event fields in recording order.
#[derive(Debug, Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<Field>,
}

impl FieldVisitor {
    fn record_value(
        &mut self,
        field: &TracingField,
        value: FieldValue,
        as_message: impl FnOnce() -> String,
    ) {
        match field.name() {
            keys::MESSAGE => {
                if self.message.is_none() {
                    self.message = Some(as_message());
                }
            }
            // Skip fields which are already handled
            name if name.starts_with("log.") => (),
            name => {
                let name = name.strip_prefix("r#").unwrap_or(name);
                self.fields.push(Field::new(name, value));
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.record_value(field, FieldValue::Float64(value), || value.to_string());
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.record_value(field, FieldValue::Int(value), || value.to_string());
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.record_value(field, FieldValue::Uint(value), || value.to_string());
    }

    fn record_i128(&mut self, field: &TracingField, value: i128) {
        let field_value = i64::try_from(value).map_or_else(
            |_| FieldValue::Reflected(Value::String(value.to_string())),
            FieldValue::Int,
        );
        self.record_value(field, field_value, || value.to_string());
    }

    fn record_u128(&mut self, field: &TracingField, value: u128) {
        let field_value = u64::try_from(value).map_or_else(
            |_| FieldValue::Reflected(Value::String(value.to_string())),
            FieldValue::Uint,
        );
        self.record_value(field, field_value, || value.to_string());
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.record_value(field, FieldValue::Bool(value), || value.to_string());
    }

    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == keys::MESSAGE {
            self.message = Some(value.to_string()); // `record_str()` is preferred for `message`
        } else {
            self.record_value(field, FieldValue::String(value.to_string()), String::new);
        }
    }

    fn record_bytes(&mut self, field: &TracingField, value: &[u8]) {
        self.record_value(field, FieldValue::Binary(value.to_vec()), || {
            String::from_utf8_lossy(value).into_owned()
        });
    }

    fn record_error(
        &mut self,
        field: &TracingField,
        value: &(dyn std::error::Error + 'static),
    ) {
        let message = value.to_string();
        self.record_value(field, FieldValue::String(message.clone()), || message);
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        self.record_value(
            field,
            FieldValue::Reflected(Value::String(rendered.clone())),
            || rendered,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::{EncoderConfig, format};

    #[derive(Clone, Debug, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            let bytes = self.0.lock().map(|bytes| bytes.clone()).unwrap_or_default();
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Ok(mut bytes) = self.0.lock() {
                bytes.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for SharedBuffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(config: EncoderConfig, emit: impl FnOnce()) -> String {
        let output = SharedBuffer::default();
        let layer = PrettyFormattingLayer::new(PrettyEncoder::new(config), output.clone());
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        output.contents()
    }

    fn quiet_config() -> EncoderConfig {
        EncoderConfig {
            caller_key: None,
            encode_time: format::noop_time,
            ..EncoderConfig::default().with_color(false)
        }
    }

    #[test]
    fn events_render_message_and_fields_in_order() {
        let out = capture(quiet_config(), || {
            tracing::info!(answer = 42, name = "ada", ok = true, ratio = 0.5, "hello world");
        });
        assert_eq!(out, "[INFO  ] hello world answer=42 name=ada ok=true ratio=0.5\n");
    }

    #[test]
    fn debug_and_display_values_are_rendered_as_text() {
        let out = capture(quiet_config(), || {
            let items = vec![1, 2];
            tracing::warn!(items = ?items, path = %"/tmp/x", "check");
        });
        assert_eq!(out, "[WARN  ] check items=[1, 2] path=/tmp/x\n");
    }

    #[test]
    fn trace_events_render_as_debug() {
        let out = capture(quiet_config(), || tracing::trace!("fine-grained"));
        assert_eq!(out, "[DEBUG ] fine-grained\n");
    }

    #[test]
    fn events_without_message_use_the_target() {
        let out = capture(quiet_config(), || {
            tracing::error!(target: "billing", code = 7u64);
        });
        assert_eq!(out, "[ERROR ] billing code=7\n");
    }

    #[test]
    fn caller_is_taken_from_event_metadata() {
        let config = EncoderConfig {
            caller_key: Some(keys::CALLER.to_string()),
            ..quiet_config()
        };
        let out = capture(config, || tracing::info!("located"));
        assert!(out.starts_with("[INFO  ][src/layer.rs:"), "{out}");
        assert!(out.ends_with("] located\n"), "{out}");
    }

    #[test]
    fn each_event_is_one_line() {
        let out = capture(quiet_config(), || {
            for index in 0..3 {
                tracing::info!(index, "tick");
            }
        });
        assert_eq!(
            out,
            "[INFO  ] tick index=0\n[INFO  ] tick index=1\n[INFO  ] tick index=2\n"
        );
    }
}
