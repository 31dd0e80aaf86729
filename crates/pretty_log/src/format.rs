//! Ready-made [`TimeFormatter`][crate::TimeFormatter]s,
//! [`DurationFormatter`][crate::DurationFormatter]s and
//! [`CallerFormatter`][crate::CallerFormatter]s.
//!
//! A formatter writes through the encoder's append methods, so it inherits the element
//! separator handling. A formatter that writes nothing makes time and duration fields fall back
//! to their raw numeric form.

use std::time::Duration;

use time::{
    OffsetDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::{encoder::EncoderState, entry::Caller};

const ISO8601_DATE_TIME: &[BorrowedFormatItem<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]"
);
const ISO8601_OFFSET: &[BorrowedFormatItem<'_>] =
    format_description!("[offset_hour sign:mandatory][offset_minute]");

/// Nanoseconds since the Unix epoch, saturating at the bounds of `i64`.
pub(crate) fn unix_nanos(time: OffsetDateTime) -> i64 {
    let nanos = time.unix_timestamp_nanos();
    i64::try_from(nanos).unwrap_or(if nanos < 0 { i64::MIN } else { i64::MAX })
}

/// Millisecond-precision ISO-8601, e.g. `2024-01-02T03:04:05.678Z` or
/// `2024-01-02T08:34:05.678+0530`.
pub fn iso8601_time(time: OffsetDateTime, enc: &mut EncoderState) {
    let Ok(mut formatted) = time.format(ISO8601_DATE_TIME) else {
        return;
    };
    if time.offset().is_utc() {
        formatted.push('Z');
    } else if let Ok(offset) = time.format(ISO8601_OFFSET) {
        formatted.push_str(&offset);
    }
    enc.append_str(&formatted);
}

/// RFC 3339 with full sub-second precision.
pub fn rfc3339_time(time: OffsetDateTime, enc: &mut EncoderState) {
    if let Ok(formatted) = time.format(&Rfc3339) {
        enc.append_str(&formatted);
    }
}

/// Floating-point seconds since the Unix epoch.
pub fn epoch_seconds_time(time: OffsetDateTime, enc: &mut EncoderState) {
    enc.append_f64((time - OffsetDateTime::UNIX_EPOCH).as_seconds_f64());
}

/// Floating-point milliseconds since the Unix epoch.
pub fn epoch_millis_time(time: OffsetDateTime, enc: &mut EncoderState) {
    enc.append_f64((time - OffsetDateTime::UNIX_EPOCH).as_seconds_f64() * 1_000.0);
}

/// Integer nanoseconds since the Unix epoch.
pub fn epoch_nanos_time(time: OffsetDateTime, enc: &mut EncoderState) {
    enc.append_int(unix_nanos(time));
}

/// Writes nothing.
pub fn noop_time(_time: OffsetDateTime, _enc: &mut EncoderState) {}

/// Human-readable duration, e.g. `1.5s` or `250ms`.
pub fn string_duration(duration: Duration, enc: &mut EncoderState) {
    enc.append_fmt(format_args!("{duration:?}"));
}

/// Floating-point seconds.
pub fn seconds_duration(duration: Duration, enc: &mut EncoderState) {
    enc.append_f64(duration.as_secs_f64());
}

/// Floating-point milliseconds.
pub fn millis_duration(duration: Duration, enc: &mut EncoderState) {
    enc.append_f64(duration.as_secs_f64() * 1_000.0);
}

/// Integer nanoseconds.
pub fn nanos_duration(duration: Duration, enc: &mut EncoderState) {
    enc.append_uint(duration_nanos(duration));
}

/// Writes nothing.
pub fn noop_duration(_duration: Duration, _enc: &mut EncoderState) {}

/// Nanoseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Last directory and file name with the line number, e.g. `src/lib.rs:42`.
pub fn short_caller(caller: &Caller, enc: &mut EncoderState) {
    enc.append_fmt(format_args!("{}:{}", caller.trimmed_path(), caller.line));
}

/// Full file path with the line number.
pub fn full_caller(caller: &Caller, enc: &mut EncoderState) {
    enc.append_fmt(format_args!("{}:{}", caller.file, caller.line));
}
