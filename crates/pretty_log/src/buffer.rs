//! Provides [`Buffer`], the append-only byte sequence a log line is rendered into.

use std::fmt::{self, Write};

/// Initial capacity of a freshly allocated buffer.
pub(crate) const INITIAL_CAPACITY: usize = 1024;

/// A growable, append-only byte sequence.
///
/// Bytes that have been written are never modified; the only way to shrink a buffer is
/// [`Buffer::reset`], which the pool calls before handing a recycled buffer out again.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    /// Creates an empty buffer with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Creates an empty buffer able to hold `capacity` bytes without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Appends a single byte.
    pub fn append_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Appends raw bytes verbatim.
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Appends a string verbatim. No quoting or escaping is applied.
    pub fn append_str(&mut self, value: &str) {
        self.bytes.extend_from_slice(value.as_bytes());
    }

    /// Appends `true` or `false`.
    pub fn append_bool(&mut self, value: bool) {
        self.append_str(if value { "true" } else { "false" });
    }

    /// Appends a signed integer in base 10.
    pub fn append_int(&mut self, value: i64) {
        self.append_display(value);
    }

    /// Appends an unsigned integer in base 10.
    pub fn append_uint(&mut self, value: u64) {
        self.append_display(value);
    }

    /// Appends a 64-bit float in its shortest round-trip decimal form.
    pub fn append_f64(&mut self, value: f64) {
        if !self.append_non_finite(value.is_nan(), value.is_infinite(), value.is_sign_negative())
        {
            self.append_display(value);
        }
    }

    /// Appends a 32-bit float in its shortest round-trip decimal form.
    ///
    /// Formatting at 32-bit precision keeps `0.1f32` rendered as `0.1` rather than the digits
    /// of its widened 64-bit value.
    pub fn append_f32(&mut self, value: f32) {
        if !self.append_non_finite(value.is_nan(), value.is_infinite(), value.is_sign_negative())
        {
            self.append_display(value);
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the byte at `index`, if it has been written.
    pub fn byte_at(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Returns the most recently written byte.
    pub fn last_byte(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    /// The bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes the buffer can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Consumes the buffer, returning the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Discards the contents while keeping the allocation.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    fn append_display(&mut self, value: impl fmt::Display) {
        // Writing into a `Vec` never fails.
        let _ = write!(self, "{value}");
    }

    fn append_non_finite(&mut self, nan: bool, infinite: bool, negative: bool) -> bool {
        match (nan, infinite, negative) {
            (true, _, _) => self.append_str("NaN"),
            (false, true, false) => self.append_str("+Inf"),
            (false, true, true) => self.append_str("-Inf"),
            (false, false, _) => return false,
        }
        true
    }
}

impl Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s);
        Ok(())
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
