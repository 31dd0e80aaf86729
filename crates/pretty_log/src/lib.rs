//! `pretty_log` renders structured log entries as single, human-readable, ANSI-colorized lines
//! for a terminal.
//!
//! It offers:
//! - A [`PrettyEncoder`] that turns a [`LogEntry`] and its ordered [`Field`]s into one line:
//!   `[LEVEL time][caller] message key=value ...`.
//! - A [`BufferPool`] the encoder draws its output buffers from, so that concurrent log calls
//!   reuse allocations without ever sharing a buffer.
//! - A [`PrettyFormattingLayer`] and a central [`build_logging_components`] function to plug the
//!   encoder into the [`tracing`] ecosystem (requires the `layer` feature, enabled by default).
//!
//! # Example
//!
//! ```
//! use pretty_log::{EncoderConfig, Field, Level, LogEntry, PrettyEncoder};
//! use serde_json::json;
//!
//! let encoder = PrettyEncoder::new(EncoderConfig::default().with_color(false));
//! let entry = LogEntry::new(Level::INFO, "user logged in");
//! let fields = [
//!     Field::string("user", "ada"),
//!     Field::json("roles", json!(["admin", "dev"])),
//! ];
//!
//! let line = encoder.encode_entry(&entry, &fields)?;
//! let text = std::str::from_utf8(line.as_bytes())?;
//! assert!(text.starts_with("[INFO  "));
//! assert!(text.ends_with("] user logged in user=ada roles=[admin,dev]\n"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod color;
pub mod format;

mod buffer;
mod config;
mod encoder;
mod entry;
mod field;
#[cfg(feature = "layer")]
mod layer;
mod pool;
mod renderer;

#[cfg(feature = "layer")]
use std::num::NonZeroUsize;

#[cfg(feature = "layer")]
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

#[cfg(feature = "layer")]
pub use self::layer::PrettyFormattingLayer;
pub use self::{
    buffer::Buffer,
    config::{CallerFormatter, DurationFormatter, EncoderConfig, TimeFormatter, keys},
    encoder::{EncoderState, needs_separator},
    entry::{Caller, Level, LogEntry},
    field::{ArrayElement, ArrayMarshaler, Field, FieldValue, ObjectMarshaler},
    pool::{BufferPool, DEFAULT_POOL_CAPACITY, PooledBuffer},
    renderer::PrettyEncoder,
};

/// The error a marshaling callback raises while populating an array or object.
///
/// The encoder never creates these itself; it hands them back to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A plain error message.
    #[error("{0}")]
    Message(String),

    /// An arbitrary error.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl EncodeError {
    /// Creates an error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wraps an arbitrary error.
    pub fn custom(error: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Custom(error.into())
    }
}

/// Returned by [`PrettyEncoder::encode_entry`] when a field failed to marshal.
///
/// Encoding does not stop at the failing field, so the error carries the complete line; the
/// caller decides whether to write it, flag it or drop it.
#[derive(Debug, thiserror::Error)]
#[error("failed to marshal log field `{key}`")]
pub struct EncodeEntryError {
    key: String,
    #[source]
    source: EncodeError,
    line: PooledBuffer,
}

impl EncodeEntryError {
    /// Key of the first field that failed.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The error raised by the first failing field's marshaler.
    pub fn source_error(&self) -> &EncodeError {
        &self.source
    }

    /// The rendered line.
    pub fn line(&self) -> &PooledBuffer {
        &self.line
    }

    /// Takes the rendered line out of the error.
    pub fn into_line(self) -> PooledBuffer {
        self.line
    }
}

/// Errors that can occur while building the logging pipeline.
#[cfg(feature = "layer")]
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Represents an error due to an invalid filtering directive.
    #[error("Failed to parse filtering directive: {0}")]
    InvalidFilteringDirective(#[from] tracing_subscriber::filter::ParseError),
}

/// Configuration for the console logging pipeline.
#[cfg(feature = "layer")]
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum log level for console logs.
    pub level: tracing::Level,

    /// [`EnvFilter`] directive (e.g., `"info,my_crate=debug"`) for filtering log events.
    /// If `None`, only `level` applies.
    pub filtering_directive: Option<String>,

    /// Specifies where to print the effective filtering directive.
    pub print_filtering_directive: DirectivePrintTarget,

    /// How each line is rendered.
    pub encoder: EncoderConfig,

    /// Maximum number of idle buffers kept for reuse.
    pub pool_capacity: NonZeroUsize,
}

#[cfg(feature = "layer")]
impl LoggerConfig {
    /// Development defaults at the specified level: every section displayed, colors on, no
    /// extra filtering directive.
    pub fn new(level: tracing::Level) -> Self {
        Self {
            level,
            filtering_directive: None,
            print_filtering_directive: DirectivePrintTarget::None,
            encoder: EncoderConfig::default(),
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }
}

/// Specifies where (if at all) to print the effective filtering directive during logger setup.
#[cfg(feature = "layer")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectivePrintTarget {
    /// Print to standard output.
    Stdout,

    /// Print to standard error.
    Stderr,

    /// Do not print the directive.
    None,
}

/// Holds the constructed console layer and its worker guard.
/// The layer can be combined with other layers and a [`tracing_subscriber::Registry`]
/// before initializing the global subscriber.
#[cfg(feature = "layer")]
#[allow(missing_debug_implementations)] // The console layer is a `dyn Trait` object
pub struct LoggingComponents {
    /// The console logging layer.
    pub console_log_layer: Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync + 'static>,

    /// Worker guard for the non-blocking standard output writer.
    /// Logs would be written as long as this guard is in scope.
    pub guard: tracing_appender::non_blocking::WorkerGuard,
}

/// A ready-to-use dispatcher writing pretty lines to standard output.
#[cfg(feature = "layer")]
#[allow(missing_debug_implementations)]
pub struct PrettyLogger {
    /// The dispatcher to install, e.g. with [`tracing::dispatcher::set_global_default`].
    pub dispatch: tracing::Dispatch,

    /// Worker guard for the non-blocking standard output writer.
    /// Logs would be written as long as this guard is in scope.
    pub guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Constructs the console logging layer based on the provided [`LoggerConfig`].
///
/// Events passing the filter are rendered by a [`PrettyFormattingLayer`] and written to standard
/// output through a non-blocking writer.
///
/// # Example
///
/// ```
/// use pretty_log::{DirectivePrintTarget, LoggerConfig, build_logging_components};
/// use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
///
/// let config = LoggerConfig {
///     filtering_directive: Some("my_app=debug,info".to_string()),
///     print_filtering_directive: DirectivePrintTarget::None,
///     ..LoggerConfig::new(tracing::Level::INFO)
/// };
///
/// match build_logging_components(config) {
///     Ok(components) => {
///         let _guard = components.guard; // Keep guard in scope
///
///         tracing_subscriber::registry()
///             .with(components.console_log_layer)
///             .init();
///
///         tracing::info!(answer = 42, "Logging initialized successfully!");
///     }
///     Err(e) => eprintln!("Failed to initialize logging: {e}"),
/// }
/// ```
///
/// # Errors
///
/// Returns [`LoggerError`] if the filtering directive is invalid.
#[cfg(feature = "layer")]
pub fn build_logging_components(config: LoggerConfig) -> Result<LoggingComponents, LoggerError> {
    let (non_blocking_stdout, guard) = tracing_appender::non_blocking(std::io::stdout());

    let console_filter_directive = config.filtering_directive.as_deref().unwrap_or_default(); // Using an empty string causes it to use the default directive

    match config.print_filtering_directive {
        #[allow(clippy::print_stdout)]
        DirectivePrintTarget::Stdout => {
            println!(
                "[INFO] {}: Using console filtering directive: {console_filter_directive}",
                env!("CARGO_PKG_NAME")
            );
        }
        #[allow(clippy::print_stderr)]
        DirectivePrintTarget::Stderr => {
            eprintln!(
                "[INFO] {}: Using console filtering directive: {console_filter_directive}",
                env!("CARGO_PKG_NAME")
            );
        }
        DirectivePrintTarget::None => (), // Do nothing
    }

    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .parse(console_filter_directive)?;

    let encoder = PrettyEncoder::with_pool(config.encoder, BufferPool::new(config.pool_capacity));
    let console_log_layer = PrettyFormattingLayer::new(encoder, non_blocking_stdout)
        .with_filter(filter)
        .boxed();

    Ok(LoggingComponents {
        console_log_layer,
        guard,
    })
}

/// Builds a [`PrettyLogger`] that writes events at `level` or above to standard output.
///
/// # Errors
///
/// Returns [`LoggerError`] if the pipeline cannot be constructed.
#[cfg(feature = "layer")]
pub fn new_pretty_logger(level: tracing::Level) -> Result<PrettyLogger, LoggerError> {
    let components = build_logging_components(LoggerConfig::new(level))?;
    let subscriber = tracing_subscriber::registry().with(components.console_log_layer);

    Ok(PrettyLogger {
        dispatch: tracing::Dispatch::new(subscriber),
        guard: components.guard,
    })
}

#[cfg(all(test, feature = "layer"))]
mod tests {
    use super::*;

    #[test]
    fn invalid_directive_is_rejected() {
        let config = LoggerConfig {
            filtering_directive: Some("my_crate=notalevel".to_string()),
            ..LoggerConfig::new(tracing::Level::INFO)
        };
        assert!(matches!(
            build_logging_components(config),
            Err(LoggerError::InvalidFilteringDirective(_))
        ));
    }

    #[test]
    fn pretty_logger_dispatches_events() {
        let logger = new_pretty_logger(tracing::Level::DEBUG);
        assert!(logger.is_ok());
        if let Ok(logger) = logger {
            tracing::dispatcher::with_default(&logger.dispatch, || {
                tracing::debug!(ready = true, "dispatcher wired");
            });
        }
    }
}
