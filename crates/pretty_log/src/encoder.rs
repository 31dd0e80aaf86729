//! Provides [`EncoderState`], the per-entry field encoder.
//!
//! Every primitive append first consults [`needs_separator()`] with the last structural byte
//! written, so the same routines serve top-level `key=value` pairs and elements inside `[..]`
//! and `{..}` without threading "first element" flags through recursive marshaling calls.

use std::{fmt, sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    EncodeError,
    buffer::Buffer,
    color,
    config::EncoderConfig,
    field::{ArrayMarshaler, ObjectMarshaler},
    format,
    pool::PooledBuffer,
};

/// Decides whether a comma must precede the next value, given the last structural byte.
///
/// No comma is needed at the start of the line, directly after an opener (`{`, `[`) or after a
/// delimiter (`:`, `,`, ` `, `=`). Anything else, including a completed value, needs one.
pub fn needs_separator(last_structural: Option<u8>) -> bool {
    !matches!(
        last_structural,
        None | Some(b'{' | b'[' | b':' | b',' | b' ' | b'=')
    )
}

/// Recorded after every value, whatever bytes the value itself wrote.
const VALUE_END: u8 = b'v';

/// The state of a single encode operation: the shared configuration and an exclusively owned
/// output buffer.
///
/// An `EncoderState` renders exactly one entry and is then consumed by
/// [`finish()`][EncoderState::finish]. Marshaling callbacks receive it to append array elements
/// or object fields.
#[derive(Debug)]
pub struct EncoderState {
    config: Arc<EncoderConfig>,
    buf: PooledBuffer,
    object_depth: usize,
    last_structural: Option<u8>,
}

impl EncoderState {
    pub(crate) fn new(config: Arc<EncoderConfig>, buf: PooledBuffer) -> Self {
        Self {
            config,
            buf,
            object_depth: 0,
            last_structural: None,
        }
    }

    /// The configuration this state renders with.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// The bytes rendered so far.
    pub fn buffer(&self) -> &Buffer {
        &self.buf
    }

    /// Ends the encode operation, handing over the rendered bytes.
    pub fn finish(self) -> PooledBuffer {
        self.buf
    }

    /// Raw access for decorations that take no part in separation, such as the level tag and
    /// the message.
    pub(crate) fn raw(&mut self) -> &mut Buffer {
        self.buf.buffer_mut()
    }

    /// Appends a structural byte and records it for the next separator check.
    pub(crate) fn append_structural(&mut self, byte: u8) {
        self.raw().append_byte(byte);
        self.last_structural = Some(byte);
    }

    pub(crate) fn append_colored(&mut self, escape: &str, text: fmt::Arguments<'_>) {
        let color = self.config.color;
        let buf = self.raw();
        if color {
            buf.append_str(escape);
        }
        // Writing into a `Buffer` never fails.
        let _ = fmt::Write::write_fmt(buf, text);
        if color {
            buf.append_str(color::CLEAR);
        }
    }

    fn add_element_separator(&mut self) {
        if needs_separator(self.last_structural) {
            self.append_structural(b',');
        }
    }

    fn add_key(&mut self, key: &str) {
        if self.object_depth == 0 {
            self.append_structural(b' ');
        } else {
            self.add_element_separator();
        }
        self.append_colored(color::WHITE, format_args!("{key}"));
        self.append_structural(b'=');
    }

    fn append_value(&mut self, write: impl FnOnce(&mut Buffer)) {
        self.add_element_separator();
        write(self.raw());
        self.last_structural = Some(VALUE_END);
    }

    /// Appends `true` or `false`.
    pub fn append_bool(&mut self, value: bool) {
        self.append_value(|buf| buf.append_bool(value));
    }

    /// Appends a signed integer.
    pub fn append_int(&mut self, value: impl Into<i64>) {
        self.append_value(|buf| buf.append_int(value.into()));
    }

    /// Appends an unsigned integer.
    pub fn append_uint(&mut self, value: impl Into<u64>) {
        self.append_value(|buf| buf.append_uint(value.into()));
    }

    /// Appends a 64-bit float.
    pub fn append_f64(&mut self, value: f64) {
        self.append_value(|buf| buf.append_f64(value));
    }

    /// Appends a 32-bit float.
    pub fn append_f32(&mut self, value: f32) {
        self.append_value(|buf| buf.append_f32(value));
    }

    /// Appends a complex number as `<real>+<imag>i`.
    pub fn append_complex128(&mut self, real: f64, imag: f64) {
        self.append_value(|buf| {
            buf.append_f64(real);
            buf.append_byte(b'+');
            buf.append_f64(imag);
            buf.append_byte(b'i');
        });
    }

    /// Appends a complex number with 32-bit parts as `<real>+<imag>i`.
    pub fn append_complex64(&mut self, real: f32, imag: f32) {
        self.append_value(|buf| {
            buf.append_f32(real);
            buf.append_byte(b'+');
            buf.append_f32(imag);
            buf.append_byte(b'i');
        });
    }

    /// Appends a string verbatim.
    pub fn append_str(&mut self, value: &str) {
        self.append_value(|buf| buf.append_str(value));
    }

    /// Appends bytes verbatim, treating them as text.
    pub fn append_byte_string(&mut self, value: &[u8]) {
        self.append_value(|buf| buf.append_bytes(value));
    }

    /// Appends binary data as standard base64.
    pub fn append_binary(&mut self, value: &[u8]) {
        let encoded = STANDARD.encode(value);
        self.append_value(|buf| buf.append_str(&encoded));
    }

    /// Appends formatted text.
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) {
        self.append_value(|buf| {
            let _ = fmt::Write::write_fmt(buf, args);
        });
    }

    /// Appends a duration through the configured duration formatter, or as integer nanoseconds
    /// if the formatter writes nothing.
    pub fn append_duration(&mut self, value: Duration) {
        self.add_element_separator();
        let tail = self.last_structural;
        let before = self.buf.len();
        let encode_duration = self.config.encode_duration;
        encode_duration(value, self);
        if self.buf.len() == before {
            self.last_structural = tail;
            self.append_uint(format::duration_nanos(value));
        }
        self.last_structural = Some(VALUE_END);
    }

    /// Appends a timestamp through the configured time formatter, or as integer nanoseconds
    /// since the Unix epoch if the formatter writes nothing.
    pub fn append_time(&mut self, value: OffsetDateTime) {
        self.add_element_separator();
        let tail = self.last_structural;
        let before = self.buf.len();
        let encode_time = self.config.encode_time;
        encode_time(value, self);
        if self.buf.len() == before {
            self.last_structural = tail;
            self.append_int(format::unix_nanos(value));
        }
        self.last_structural = Some(VALUE_END);
    }

    /// Appends `[`, lets `marshaler` append the elements, then appends `]`.
    ///
    /// The closing bracket is written even if the marshaler fails; its error is returned
    /// unchanged.
    pub fn append_array(&mut self, marshaler: &dyn ArrayMarshaler) -> Result<(), EncodeError> {
        self.add_element_separator();
        self.append_structural(b'[');
        let result = marshaler.marshal_log_array(self);
        self.append_structural(b']');
        result
    }

    /// Appends `{`, lets `marshaler` add the fields, then appends `}`.
    ///
    /// The closing brace is written even if the marshaler fails; its error is returned
    /// unchanged.
    pub fn append_object(&mut self, marshaler: &dyn ObjectMarshaler) -> Result<(), EncodeError> {
        self.add_element_separator();
        self.append_structural(b'{');
        self.object_depth += 1;
        let result = marshaler.marshal_log_object(self);
        self.object_depth -= 1;
        self.append_structural(b'}');
        result
    }

    /// Appends an arbitrary value: strings verbatim, anything else as compact JSON text.
    pub fn append_reflected(&mut self, value: &Value) {
        match value {
            Value::String(text) => self.append_str(text),
            other => self.append_fmt(format_args!("{other}")),
        }
    }

    /// Appends a JSON value, rendering arrays and objects as nested composites.
    pub fn append_json(&mut self, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Null => self.append_str("null"),
            Value::Bool(value) => self.append_bool(*value),
            Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    self.append_int(value);
                } else if let Some(value) = number.as_u64() {
                    self.append_uint(value);
                } else {
                    self.append_fmt(format_args!("{number}"));
                }
            }
            Value::String(value) => self.append_str(value),
            Value::Array(values) => self.append_array(values)?,
            Value::Object(map) => self.append_object(map)?,
        }
        Ok(())
    }

    /// Adds a boolean field.
    pub fn add_bool(&mut self, key: &str, value: bool) {
        self.add_key(key);
        self.append_bool(value);
    }

    /// Adds a signed integer field.
    pub fn add_int(&mut self, key: &str, value: impl Into<i64>) {
        self.add_key(key);
        self.append_int(value);
    }

    /// Adds an unsigned integer field.
    pub fn add_uint(&mut self, key: &str, value: impl Into<u64>) {
        self.add_key(key);
        self.append_uint(value);
    }

    /// Adds a 64-bit float field.
    pub fn add_f64(&mut self, key: &str, value: f64) {
        self.add_key(key);
        self.append_f64(value);
    }

    /// Adds a 32-bit float field.
    pub fn add_f32(&mut self, key: &str, value: f32) {
        self.add_key(key);
        self.append_f32(value);
    }

    /// Adds a complex number field.
    pub fn add_complex128(&mut self, key: &str, real: f64, imag: f64) {
        self.add_key(key);
        self.append_complex128(real, imag);
    }

    /// Adds a complex number field with 32-bit parts.
    pub fn add_complex64(&mut self, key: &str, real: f32, imag: f32) {
        self.add_key(key);
        self.append_complex64(real, imag);
    }

    /// Adds a string field.
    pub fn add_str(&mut self, key: &str, value: &str) {
        self.add_key(key);
        self.append_str(value);
    }

    /// Adds a raw byte string field.
    pub fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.add_key(key);
        self.append_byte_string(value);
    }

    /// Adds a base64-encoded binary field.
    pub fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.add_key(key);
        self.append_binary(value);
    }

    /// Adds a duration field.
    pub fn add_duration(&mut self, key: &str, value: Duration) {
        self.add_key(key);
        self.append_duration(value);
    }

    /// Adds a timestamp field.
    pub fn add_time(&mut self, key: &str, value: OffsetDateTime) {
        self.add_key(key);
        self.append_time(value);
    }

    /// Adds an array field.
    pub fn add_array(
        &mut self,
        key: &str,
        marshaler: &dyn ArrayMarshaler,
    ) -> Result<(), EncodeError> {
        self.add_key(key);
        self.append_array(marshaler)
    }

    /// Adds an object field.
    pub fn add_object(
        &mut self,
        key: &str,
        marshaler: &dyn ObjectMarshaler,
    ) -> Result<(), EncodeError> {
        self.add_key(key);
        self.append_object(marshaler)
    }

    /// Adds an arbitrary value field.
    pub fn add_reflected(&mut self, key: &str, value: &Value) {
        self.add_key(key);
        self.append_reflected(value);
    }

    /// Adds a JSON value field.
    pub fn add_json(&mut self, key: &str, value: &Value) -> Result<(), EncodeError> {
        self.add_key(key);
        self.append_json(value)
    }

    /// Namespaces are not rendered; subsequent fields stay at the current level.
    pub fn open_namespace(&mut self, _key: &str) {}
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::datetime;

    use super::*;
    use crate::{EncoderConfig, PrettyEncoder, field::Field, format};

    fn plain() -> PrettyEncoder {
        PrettyEncoder::new(EncoderConfig::default().with_color(false))
    }

    fn rendered(encoder: &PrettyEncoder, f: impl FnOnce(&mut EncoderState)) -> String {
        let mut state = encoder.clone_state();
        f(&mut state);
        String::from_utf8_lossy(state.buffer().as_bytes()).into_owned()
    }

    #[test]
    fn separator_table() {
        assert!(!needs_separator(None));
        for byte in [b'{', b'[', b':', b',', b' ', b'='] {
            assert!(!needs_separator(Some(byte)), "{}", char::from(byte));
        }
        for byte in [b'a', b'1', b']', b'}', b'"', b'm'] {
            assert!(needs_separator(Some(byte)), "{}", char::from(byte));
        }
    }

    #[test]
    fn array_elements_are_comma_separated() {
        let out = rendered(&plain(), |enc| {
            let result = enc.append_array(&vec![json!(1), json!("two"), json!(true), json!(4.5)]);
            assert!(result.is_ok());
        });
        assert_eq!(out, "[1,two,true,4.5]");
    }

    #[test]
    fn separator_ignores_how_a_value_starts() {
        let values = vec!["{open", "[bracket", ",comma", "=eq"];
        let out = rendered(&plain(), |enc| {
            assert!(enc.append_array(&values).is_ok());
        });
        assert_eq!(out, "[{open,[bracket,,comma,=eq]");
    }

    #[test]
    fn empty_and_delimiter_terminated_array_elements_keep_their_commas() {
        let cases: [(Vec<&str>, &str); 5] = [
            (vec!["", "x"], "[,x]"),
            (vec!["a,", "b"], "[a,,b]"),
            (vec!["a ", "b"], "[a ,b]"),
            (vec!["k=", "[", "{", "v:"], "[k=,[,{,v:]"),
            (vec!["x", ""], "[x,]"),
        ];
        for (values, expected) in cases {
            let out = rendered(&plain(), |enc| {
                assert!(enc.append_array(&values).is_ok());
            });
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn empty_and_delimiter_terminated_object_members_keep_their_commas() {
        let out = rendered(&plain(), |enc| {
            let value = json!({"k1": "", "k2": "v", "k3": "end,", "k4": "=", "k5": 1});
            assert!(enc.add_json("o", &value).is_ok());
        });
        assert_eq!(out, " o={k1=,k2=v,k3=end,,k4==,k5=1}");
    }

    #[test]
    fn formatter_writing_an_empty_string_still_falls_back_without_a_stray_comma() {
        fn empty_duration(_duration: Duration, enc: &mut EncoderState) {
            enc.append_str("");
        }
        let encoder = PrettyEncoder::new(EncoderConfig {
            encode_duration: empty_duration,
            ..EncoderConfig::default().with_color(false)
        });
        let out = rendered(&encoder, |enc| {
            let durations = vec![Duration::from_nanos(7), Duration::from_nanos(8)];
            assert!(enc.add_array("d", &durations).is_ok());
        });
        assert_eq!(out, " d=[7,8]");
    }

    #[test]
    fn empty_composites() {
        let out = rendered(&plain(), |enc| {
            assert!(enc.append_array(&Vec::<i64>::new()).is_ok());
            assert!(enc.append_object(&serde_json::Map::new()).is_ok());
        });
        assert_eq!(out, "[],{}");
    }

    #[test]
    fn nested_fields_render_without_stray_commas() {
        let encoder = plain();
        let out = rendered(&encoder, |enc| {
            let a = Field::json("a", json!([1, 2]));
            let b = Field::json("b", json!({"x": true}));
            assert!(a.add_to(enc).is_ok());
            assert!(b.add_to(enc).is_ok());
        });
        assert_eq!(out, " a=[1,2] b={x=true}");
    }

    #[test]
    fn objects_separate_their_fields_with_commas() {
        let out = rendered(&plain(), |enc| {
            let value = json!({"k1": "v1", "k2": [1, {"deep": null}], "k3": {}});
            assert!(enc.add_json("obj", &value).is_ok());
        });
        assert_eq!(out, " obj={k1=v1,k2=[1,{deep=null}],k3={}}");
    }

    #[test]
    fn keys_are_highlighted_when_color_is_on() {
        let encoder = PrettyEncoder::new(EncoderConfig::default());
        let out = rendered(&encoder, |enc| enc.add_int("n", 7));
        assert_eq!(out, " \x1b[37mn\x1b[0m=7");
    }

    struct FailsAfterOne;

    impl ArrayMarshaler for FailsAfterOne {
        fn marshal_log_array(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
            enc.append_int(1);
            Err(EncodeError::msg("boom"))
        }
    }

    #[test]
    fn marshaler_error_still_closes_the_array() {
        let out = rendered(&plain(), |enc| {
            let result = enc.append_array(&FailsAfterOne);
            assert!(matches!(result, Err(EncodeError::Message(ref m)) if m == "boom"));
        });
        assert_eq!(out, "[1]");
    }

    #[test]
    fn complex_and_binary() {
        let out = rendered(&plain(), |enc| {
            enc.add_complex128("c", 1.5, -2.0);
            enc.add_complex64("c64", 0.1, 0.2);
            enc.add_binary("bin", b"hello");
            enc.add_byte_string("bytes", b"raw text");
        });
        assert_eq!(out, " c=1.5+-2i c64=0.1+0.2i bin=aGVsbG8= bytes=raw text");
    }

    #[test]
    fn reflected_values_fall_back_to_json_text() {
        let out = rendered(&plain(), |enc| {
            enc.add_reflected("s", &json!("plain"));
            enc.add_reflected("v", &json!({"a": [1]}));
        });
        assert_eq!(out, " s=plain v={\"a\":[1]}");
    }

    #[test]
    fn silent_duration_formatter_falls_back_to_nanoseconds() {
        let encoder = PrettyEncoder::new(EncoderConfig {
            encode_duration: format::noop_duration,
            ..EncoderConfig::default().with_color(false)
        });
        let out = rendered(&encoder, |enc| {
            enc.add_duration("d", Duration::from_micros(3));
        });
        assert_eq!(out, " d=3000");
    }

    #[test]
    fn silent_time_formatter_falls_back_to_epoch_nanoseconds() {
        let encoder = PrettyEncoder::new(EncoderConfig {
            encode_time: format::noop_time,
            ..EncoderConfig::default().with_color(false)
        });
        let out = rendered(&encoder, |enc| {
            enc.add_time("t", datetime!(1970-01-01 00:00:02 UTC));
        });
        assert_eq!(out, " t=2000000000");
    }

    #[test]
    fn durations_and_times_inside_arrays() {
        let encoder = plain();
        let out = rendered(&encoder, |enc| {
            let durations = vec![Duration::from_millis(5), Duration::from_secs(2)];
            assert!(enc.add_array("d", &durations).is_ok());
            let times = vec![datetime!(2024-01-02 03:04:05 UTC)];
            assert!(enc.add_array("t", &times).is_ok());
        });
        assert_eq!(out, " d=[5ms,2s] t=[2024-01-02T03:04:05.000Z]");
    }

    #[test]
    fn namespaces_are_ignored() {
        let out = rendered(&plain(), |enc| {
            enc.open_namespace("ns");
            enc.add_bool("ok", true);
        });
        assert_eq!(out, " ok=true");
    }
}
