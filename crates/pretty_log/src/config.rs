//! Provides [`EncoderConfig`], which selects the sections of a line that are rendered and the
//! functions used to format timestamps, durations and callers.

use std::time::Duration;

use time::OffsetDateTime;

use crate::{encoder::EncoderState, entry::Caller, format};

/// Standard key names for the sections every log line carries.
pub mod keys {
    /// Key for the log message.
    pub const MESSAGE: &str = "message";
    /// Key for the severity tag.
    pub const LEVEL: &str = "level";
    /// Key for the timestamp.
    pub const TIME: &str = "time";
    /// Key for the caller location.
    pub const CALLER: &str = "caller";
}

/// Renders a timestamp into the encoder.
pub type TimeFormatter = fn(OffsetDateTime, &mut EncoderState);

/// Renders a duration into the encoder.
pub type DurationFormatter = fn(Duration, &mut EncoderState);

/// Renders a caller location into the encoder.
pub type CallerFormatter = fn(&Caller, &mut EncoderState);

/// Configuration shared by every encode operation of a [`PrettyEncoder`][crate::PrettyEncoder].
///
/// A section of the line is rendered only if its key is set to a non-empty name.
#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// Key of the message section.
    pub message_key: Option<String>,

    /// Key of the level tag.
    pub level_key: Option<String>,

    /// Key of the timestamp.
    pub time_key: Option<String>,

    /// Key of the caller location.
    pub caller_key: Option<String>,

    /// Whether ANSI color escapes are emitted around the level tag and field keys.
    pub color: bool,

    /// Formats the entry timestamp and time-valued fields.
    pub encode_time: TimeFormatter,

    /// Formats duration-valued fields.
    pub encode_duration: DurationFormatter,

    /// Formats the caller location.
    pub encode_caller: CallerFormatter,
}

impl EncoderConfig {
    /// Configuration with every section displayed, colors on, ISO-8601 timestamps,
    /// human-readable durations and short caller paths.
    pub fn development() -> Self {
        Self {
            message_key: Some(keys::MESSAGE.to_string()),
            level_key: Some(keys::LEVEL.to_string()),
            time_key: Some(keys::TIME.to_string()),
            caller_key: Some(keys::CALLER.to_string()),
            color: true,
            encode_time: format::iso8601_time,
            encode_duration: format::string_duration,
            encode_caller: format::short_caller,
        }
    }

    /// Disables or enables color escapes.
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub(crate) fn displays_message(&self) -> bool {
        is_enabled(self.message_key.as_deref())
    }

    pub(crate) fn displays_level(&self) -> bool {
        is_enabled(self.level_key.as_deref())
    }

    pub(crate) fn displays_time(&self) -> bool {
        is_enabled(self.time_key.as_deref())
    }

    pub(crate) fn displays_caller(&self) -> bool {
        is_enabled(self.caller_key.as_deref())
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn is_enabled(key: Option<&str>) -> bool {
    key.is_some_and(|key| !key.is_empty())
}
