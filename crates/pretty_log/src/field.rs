//! Typed key/value fields attached to a log entry, and the marshaling traits composite values
//! implement.

use std::{error::Error, fmt, sync::Arc, time::Duration};

use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{EncodeError, encoder::EncoderState};

/// Populates an array by appending elements to the encoder.
pub trait ArrayMarshaler {
    /// Appends zero or more elements with the `append_*` methods of `enc`.
    fn marshal_log_array(&self, enc: &mut EncoderState) -> Result<(), EncodeError>;
}

/// Populates an object by adding fields to the encoder.
pub trait ObjectMarshaler {
    /// Adds zero or more fields with the `add_*` methods of `enc`.
    fn marshal_log_object(&self, enc: &mut EncoderState) -> Result<(), EncodeError>;
}

/// A value that can be appended as an array element.
///
/// `Vec<T>` is an [`ArrayMarshaler`] for every `T: ArrayElement`.
pub trait ArrayElement {
    /// Appends `self` as one element.
    fn append_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError>;
}

macro_rules! impl_array_element {
    ($method:ident: $($ty:ty),+) => {
        $(
            impl ArrayElement for $ty {
                fn append_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
                    enc.$method(*self);
                    Ok(())
                }
            }
        )+
    };
}

impl_array_element!(append_bool: bool);
impl_array_element!(append_int: i8, i16, i32, i64);
impl_array_element!(append_uint: u8, u16, u32, u64);
impl_array_element!(append_f32: f32);
impl_array_element!(append_f64: f64);
impl_array_element!(append_duration: Duration);
impl_array_element!(append_time: OffsetDateTime);

impl ArrayElement for usize {
    fn append_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        enc.append_uint(u64::try_from(*self).unwrap_or(u64::MAX));
        Ok(())
    }
}

impl ArrayElement for &str {
    fn append_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        enc.append_str(self);
        Ok(())
    }
}

impl ArrayElement for String {
    fn append_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        enc.append_str(self);
        Ok(())
    }
}

impl ArrayElement for Value {
    fn append_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        enc.append_json(self)
    }
}

impl<T: ArrayElement> ArrayElement for Vec<T> {
    fn append_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        enc.append_array(self)
    }
}

impl<T: ArrayElement> ArrayMarshaler for Vec<T> {
    fn marshal_log_array(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        self.iter().try_for_each(|element| element.append_to(enc))
    }
}

impl ObjectMarshaler for Map<String, Value> {
    fn marshal_log_object(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        self.iter()
            .try_for_each(|(key, value)| enc.add_json(key, value))
    }
}

/// Adapts a closure to both marshaling traits.
struct FnMarshaler<F>(F);

impl<F> ArrayMarshaler for FnMarshaler<F>
where
    F: Fn(&mut EncoderState) -> Result<(), EncodeError>,
{
    fn marshal_log_array(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        (self.0)(enc)
    }
}

impl<F> ObjectMarshaler for FnMarshaler<F>
where
    F: Fn(&mut EncoderState) -> Result<(), EncodeError>,
{
    fn marshal_log_object(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        (self.0)(enc)
    }
}

/// The value of a [`Field`].
#[derive(Clone)]
pub enum FieldValue {
    /// A boolean.
    Bool(bool),
    /// A signed integer of any width.
    Int(i64),
    /// An unsigned integer of any width.
    Uint(u64),
    /// A 64-bit float.
    Float64(f64),
    /// A 32-bit float.
    Float32(f32),
    /// A complex number with 64-bit parts.
    Complex128 {
        /// Real part.
        real: f64,
        /// Imaginary part.
        imag: f64,
    },
    /// A complex number with 32-bit parts.
    Complex64 {
        /// Real part.
        real: f32,
        /// Imaginary part.
        imag: f32,
    },
    /// Text, rendered verbatim.
    String(String),
    /// Raw bytes, rendered verbatim as text.
    ByteString(Vec<u8>),
    /// Binary data, rendered as base64.
    Binary(Vec<u8>),
    /// A duration, rendered through the configured duration formatter.
    Duration(Duration),
    /// An absolute time, rendered through the configured time formatter.
    Time(OffsetDateTime),
    /// A nested array.
    Array(Arc<dyn ArrayMarshaler + Send + Sync>),
    /// A nested object.
    Object(Arc<dyn ObjectMarshaler + Send + Sync>),
    /// A JSON value; arrays and objects render as nested composites.
    Json(Value),
    /// An opaque value, rendered as text.
    Reflected(Value),
    /// Opens a namespace. Not rendered.
    Namespace,
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Self::Uint(value) => f.debug_tuple("Uint").field(value).finish(),
            Self::Float64(value) => f.debug_tuple("Float64").field(value).finish(),
            Self::Float32(value) => f.debug_tuple("Float32").field(value).finish(),
            Self::Complex128 { real, imag } => f
                .debug_struct("Complex128")
                .field("real", real)
                .field("imag", imag)
                .finish(),
            Self::Complex64 { real, imag } => f
                .debug_struct("Complex64")
                .field("real", real)
                .field("imag", imag)
                .finish(),
            Self::String(value) => f.debug_tuple("String").field(value).finish(),
            Self::ByteString(value) => f.debug_tuple("ByteString").field(value).finish(),
            Self::Binary(value) => f.debug_tuple("Binary").field(value).finish(),
            Self::Duration(value) => f.debug_tuple("Duration").field(value).finish(),
            Self::Time(value) => f.debug_tuple("Time").field(value).finish(),
            Self::Array(_) => f.write_str("Array(..)"),
            Self::Object(_) => f.write_str("Object(..)"),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Reflected(value) => f.debug_tuple("Reflected").field(value).finish(),
            Self::Namespace => f.write_str("Namespace"),
        }
    }
}

/// A typed key/value pair attached to a log entry.
///
/// Fields render in the order they are supplied; duplicate keys render twice.
#[derive(Clone, Debug)]
pub struct Field {
    /// The field key.
    pub key: String,

    /// The field value.
    pub value: FieldValue,
}

impl Field {
    /// Creates a field from a key and a value.
    pub fn new(key: impl Into<String>, value: FieldValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// A boolean field.
    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, FieldValue::Bool(value))
    }

    /// A signed integer field.
    pub fn int(key: impl Into<String>, value: impl Into<i64>) -> Self {
        Self::new(key, FieldValue::Int(value.into()))
    }

    /// An unsigned integer field.
    pub fn uint(key: impl Into<String>, value: impl Into<u64>) -> Self {
        Self::new(key, FieldValue::Uint(value.into()))
    }

    /// A 64-bit float field.
    pub fn f64(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, FieldValue::Float64(value))
    }

    /// A 32-bit float field.
    pub fn f32(key: impl Into<String>, value: f32) -> Self {
        Self::new(key, FieldValue::Float32(value))
    }

    /// A complex number field with 64-bit parts.
    pub fn complex128(key: impl Into<String>, real: f64, imag: f64) -> Self {
        Self::new(key, FieldValue::Complex128 { real, imag })
    }

    /// A complex number field with 32-bit parts.
    pub fn complex64(key: impl Into<String>, real: f32, imag: f32) -> Self {
        Self::new(key, FieldValue::Complex64 { real, imag })
    }

    /// A string field.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::String(value.into()))
    }

    /// A raw byte string field.
    pub fn byte_string(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, FieldValue::ByteString(value.into()))
    }

    /// A binary field, rendered as base64.
    pub fn binary(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, FieldValue::Binary(value.into()))
    }

    /// A duration field.
    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, FieldValue::Duration(value))
    }

    /// A timestamp field.
    pub fn time(key: impl Into<String>, value: OffsetDateTime) -> Self {
        Self::new(key, FieldValue::Time(value))
    }

    /// An array field.
    pub fn array<M>(key: impl Into<String>, marshaler: M) -> Self
    where
        M: ArrayMarshaler + Send + Sync + 'static,
    {
        Self::new(key, FieldValue::Array(Arc::new(marshaler)))
    }

    /// An array field populated by a closure.
    pub fn array_fn<F>(key: impl Into<String>, marshal: F) -> Self
    where
        F: Fn(&mut EncoderState) -> Result<(), EncodeError> + Send + Sync + 'static,
    {
        Self::new(key, FieldValue::Array(Arc::new(FnMarshaler(marshal))))
    }

    /// An object field.
    pub fn object<M>(key: impl Into<String>, marshaler: M) -> Self
    where
        M: ObjectMarshaler + Send + Sync + 'static,
    {
        Self::new(key, FieldValue::Object(Arc::new(marshaler)))
    }

    /// An object field populated by a closure.
    pub fn object_fn<F>(key: impl Into<String>, marshal: F) -> Self
    where
        F: Fn(&mut EncoderState) -> Result<(), EncodeError> + Send + Sync + 'static,
    {
        Self::new(key, FieldValue::Object(Arc::new(FnMarshaler(marshal))))
    }

    /// A JSON field; arrays and objects render as nested composites.
    pub fn json(key: impl Into<String>, value: Value) -> Self {
        Self::new(key, FieldValue::Json(value))
    }

    /// A field holding any serializable value, rendered as text.
    ///
    /// Values that fail to serialize are rendered as the serialization error message.
    pub fn reflected<T: Serialize + ?Sized>(key: impl Into<String>, value: &T) -> Self {
        let value =
            serde_json::to_value(value).unwrap_or_else(|error| Value::String(error.to_string()));
        Self::new(key, FieldValue::Reflected(value))
    }

    /// A field holding the `Debug` rendering of a value.
    pub fn debug(key: impl Into<String>, value: &(impl fmt::Debug + ?Sized)) -> Self {
        Self::new(key, FieldValue::Reflected(Value::String(format!("{value:?}"))))
    }

    /// An `error` field holding the error message.
    pub fn error(error: &(impl Error + ?Sized)) -> Self {
        Self::string("error", error.to_string())
    }

    /// A namespace marker. Namespaces are not rendered.
    pub fn namespace(key: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Namespace)
    }

    /// Writes ` key=value` into the encoder.
    ///
    /// Only array and object fields can fail, with the error raised by their marshaler.
    pub fn add_to(&self, enc: &mut EncoderState) -> Result<(), EncodeError> {
        let key = self.key.as_str();
        match &self.value {
            FieldValue::Bool(value) => enc.add_bool(key, *value),
            FieldValue::Int(value) => enc.add_int(key, *value),
            FieldValue::Uint(value) => enc.add_uint(key, *value),
            FieldValue::Float64(value) => enc.add_f64(key, *value),
            FieldValue::Float32(value) => enc.add_f32(key, *value),
            FieldValue::Complex128 { real, imag } => enc.add_complex128(key, *real, *imag),
            FieldValue::Complex64 { real, imag } => enc.add_complex64(key, *real, *imag),
            FieldValue::String(value) => enc.add_str(key, value),
            FieldValue::ByteString(value) => enc.add_byte_string(key, value),
            FieldValue::Binary(value) => enc.add_binary(key, value),
            FieldValue::Duration(value) => enc.add_duration(key, *value),
            FieldValue::Time(value) => enc.add_time(key, *value),
            FieldValue::Array(marshaler) => enc.add_array(key, marshaler.as_ref())?,
            FieldValue::Object(marshaler) => enc.add_object(key, marshaler.as_ref())?,
            FieldValue::Json(value) => enc.add_json(key, value)?,
            FieldValue::Reflected(value) => enc.add_reflected(key, value),
            FieldValue::Namespace => enc.open_namespace(key),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use time::macros::datetime;

    use super::*;
    use crate::{EncoderConfig, PrettyEncoder};

    fn rendered(fields: &[Field]) -> (String, Option<EncodeError>) {
        let encoder = PrettyEncoder::new(EncoderConfig::default().with_color(false));
        let mut state = encoder.clone_state();
        let mut first_error = None;
        for field in fields {
            if let Err(error) = field.add_to(&mut state) {
                first_error.get_or_insert(error);
            }
        }
        let out = String::from_utf8_lossy(state.buffer().as_bytes()).into_owned();
        (out, first_error)
    }

    #[derive(Serialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Debug)]
    struct Opaque;

    #[test]
    fn every_primitive_kind() {
        let (out, error) = rendered(&[
            Field::bool("b", true),
            Field::int("i8", -8i8),
            Field::int("i64", i64::MIN),
            Field::uint("u16", 16u16),
            Field::f64("f64", 2.5),
            Field::f32("f32", 0.3),
            Field::string("s", "hello world"),
            Field::byte_string("bs", b"bytes".to_vec()),
            Field::binary("bin", vec![0xde, 0xad, 0xbe, 0xef]),
            Field::duration("d", Duration::from_millis(1_500)),
            Field::time("t", datetime!(2024-01-02 03:04:05 UTC)),
        ]);
        assert!(error.is_none());
        assert_eq!(
            out,
            " b=true i8=-8 i64=-9223372036854775808 u16=16 f64=2.5 f32=0.3 s=hello world \
             bs=bytes bin=3q2+7w== d=1.5s t=2024-01-02T03:04:05.000Z"
        );
    }

    #[test]
    fn duplicate_keys_render_twice_in_order() {
        let (out, _) = rendered(&[Field::int("k", 1), Field::int("k", 2)]);
        assert_eq!(out, " k=1 k=2");
    }

    #[test]
    fn closures_populate_composites() {
        let (out, error) = rendered(&[
            Field::array_fn("list", |enc| {
                enc.append_str("a");
                enc.append_object(&Map::new())?;
                enc.append_uint(3u8);
                Ok(())
            }),
            Field::object_fn("user", |enc| {
                enc.add_str("name", "ada");
                enc.add_array("tags", &vec!["x", "y"])?;
                enc.add_object("empty", &Map::new())
            }),
        ]);
        assert!(error.is_none());
        assert_eq!(out, " list=[a,{},3] user={name=ada,tags=[x,y],empty={}}");
    }

    #[test]
    fn nested_vectors() {
        let (out, _) = rendered(&[Field::array("grid", vec![vec![1i32, 2], vec![], vec![3]])]);
        assert_eq!(out, " grid=[[1,2],[],[3]]");
    }

    #[test]
    fn first_marshaler_error_is_returned_and_structure_kept() {
        let (out, error) = rendered(&[
            Field::object_fn("obj", |enc| {
                enc.add_int("ok", 1);
                Err(EncodeError::msg("first"))
            }),
            Field::array_fn("arr", |_| Err(EncodeError::msg("second"))),
            Field::bool("after", true),
        ]);
        assert_eq!(out, " obj={ok=1} arr=[] after=true");
        assert!(matches!(error, Some(EncodeError::Message(ref m)) if m == "first"));
    }

    #[test]
    fn reflected_debug_and_error_fields() {
        let io_error = std::io::Error::other("disk on fire");
        let (out, _) = rendered(&[
            Field::reflected("point", &Point { x: 1, y: -2 }),
            Field::reflected("name", "plain"),
            Field::debug("opaque", &Opaque),
            Field::error(&io_error),
        ]);
        assert_eq!(
            out,
            " point={\"x\":1,\"y\":-2} name=plain opaque=Opaque error=disk on fire"
        );
    }

    #[test]
    fn namespace_fields_write_nothing() {
        let (out, _) = rendered(&[Field::namespace("ns"), Field::int("n", 1)]);
        assert_eq!(out, " n=1");
    }
}
