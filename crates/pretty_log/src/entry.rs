//! The log record handed to the encoder: [`LogEntry`], its [`Level`] and optional [`Caller`].

use std::{borrow::Cow, fmt};

use time::OffsetDateTime;

/// Severity of a log entry.
///
/// Levels are ordered by severity. The named constants cover the levels the encoder knows
/// about; any other value is representable and renders as `LEVEL(n)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(i8);

impl Level {
    /// Verbose diagnostics, usually disabled in production.
    pub const DEBUG: Self = Self(-1);
    /// The default severity.
    pub const INFO: Self = Self(0);
    /// More important than info, but not requiring individual attention.
    pub const WARN: Self = Self(1);
    /// High-priority entries.
    pub const ERROR: Self = Self(2);
    /// Severe errors that abort only in development builds.
    pub const DPANIC: Self = Self(3);
    /// Entries that precede a panic.
    pub const PANIC: Self = Self(4);
    /// Entries that precede process exit.
    pub const FATAL: Self = Self(5);

    /// Creates a level from its raw severity value.
    pub const fn from_i8(value: i8) -> Self {
        Self(value)
    }

    /// The raw severity value.
    pub const fn as_i8(self) -> i8 {
        self.0
    }

    /// The upper-case name of a known level.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::DEBUG => Some("DEBUG"),
            Self::INFO => Some("INFO"),
            Self::WARN => Some("WARN"),
            Self::ERROR => Some("ERROR"),
            Self::DPANIC => Some("DPANIC"),
            Self::PANIC => Some("PANIC"),
            Self::FATAL => Some("FATAL"),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so that width and precision flags apply to the level name.
        match self.name() {
            Some(name) => f.pad(name),
            None => f.pad(&format!("LEVEL({})", self.0)),
        }
    }
}

#[cfg(feature = "layer")]
impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Self::ERROR,
            tracing::Level::WARN => Self::WARN,
            tracing::Level::INFO => Self::INFO,
            tracing::Level::DEBUG | tracing::Level::TRACE => Self::DEBUG,
        }
    }
}

/// The source location a log entry was emitted from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    /// Path of the source file.
    pub file: Cow<'static, str>,

    /// Line number within `file`.
    pub line: u32,
}

impl Caller {
    /// Creates a caller from a file path and line number.
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The file path trimmed to its last directory and file name, e.g. `src/lib.rs`.
    pub fn trimmed_path(&self) -> &str {
        let file = self.file.as_ref();
        file.rmatch_indices('/')
            .nth(1)
            .and_then(|(index, _)| file.get(index + 1..))
            .unwrap_or(file)
    }
}

/// A single log record.
///
/// Owned by the logging framework; the encoder only reads it.
#[derive(Clone, Debug)]
pub struct LogEntry {
    /// Severity of the entry.
    pub level: Level,

    /// When the entry was created.
    pub time: OffsetDateTime,

    /// Where the entry was emitted from, if known.
    pub caller: Option<Caller>,

    /// The log message.
    pub message: String,
}

impl LogEntry {
    /// Creates an entry stamped with the current UTC time and no caller.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            time: OffsetDateTime::now_utc(),
            caller: None,
            message: message.into(),
        }
    }

    /// Sets the entry time.
    pub fn with_time(mut self, time: OffsetDateTime) -> Self {
        self.time = time;
        self
    }

    /// Sets the caller.
    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(Level::DEBUG < Level::INFO);
        assert!(Level::INFO < Level::WARN);
        assert!(Level::ERROR < Level::FATAL);
    }

    #[test]
    fn level_display_honours_width_and_precision() {
        assert_eq!(format!("{:<5.5}", Level::INFO), "INFO ");
        assert_eq!(format!("{:<5.5}", Level::WARN), "WARN ");
        assert_eq!(format!("{:<5.5}", Level::ERROR), "ERROR");
        assert_eq!(format!("{:<5.5}", Level::DPANIC), "DPANI");
        assert_eq!(format!("{}", Level::from_i8(9)), "LEVEL(9)");
    }

    #[test]
    fn trimmed_path_keeps_last_two_segments() {
        assert_eq!(Caller::new("/a/b/c/d.rs", 1).trimmed_path(), "c/d.rs");
        assert_eq!(Caller::new("src/lib.rs", 1).trimmed_path(), "src/lib.rs");
        assert_eq!(Caller::new("lib.rs", 1).trimmed_path(), "lib.rs");
    }
}
