//! Provides [`PrettyEncoder`], which renders one [`LogEntry`] and its fields into a single
//! colorized line:
//!
//! ```text
//! [LEVEL <time>][<caller>] <message> key1=val1 key2=val2
//! ```

use std::sync::Arc;

use crate::{
    EncodeEntryError,
    color,
    config::EncoderConfig,
    encoder::EncoderState,
    entry::LogEntry,
    field::Field,
    pool::{BufferPool, PooledBuffer},
};

/// Width the level name is padded or truncated to.
const LEVEL_WIDTH: usize = 5;

/// Renders log entries into pooled buffers.
///
/// A `PrettyEncoder` is a template: it holds the configuration and the pool, and every call to
/// [`encode_entry()`][PrettyEncoder::encode_entry] works on its own [`EncoderState`] backed by a
/// buffer no other call can see. Cloning is cheap and clones share the pool.
#[derive(Clone, Debug)]
pub struct PrettyEncoder {
    config: Arc<EncoderConfig>,
    pool: BufferPool,
}

impl PrettyEncoder {
    /// Creates an encoder with its own buffer pool.
    pub fn new(config: EncoderConfig) -> Self {
        Self::with_pool(config, BufferPool::default())
    }

    /// Creates an encoder drawing buffers from `pool`.
    pub fn with_pool(config: EncoderConfig, pool: BufferPool) -> Self {
        Self {
            config: Arc::new(config),
            pool,
        }
    }

    /// The configuration entries are rendered with.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// The pool buffers are drawn from.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// A fresh encode state: this encoder's configuration and an empty buffer from the pool.
    pub fn clone_state(&self) -> EncoderState {
        EncoderState::new(Arc::clone(&self.config), self.pool.acquire())
    }

    /// Renders `entry` and `fields` as one newline-terminated line.
    ///
    /// The returned buffer goes back to the pool when dropped, so the caller should drop it as
    /// soon as the line has been written out.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeEntryError`] if an array or object field failed to marshal. Rendering
    /// continues past the failing field, so the error still carries the complete, structurally
    /// closed line.
    pub fn encode_entry(
        &self,
        entry: &LogEntry,
        fields: &[Field],
    ) -> Result<PooledBuffer, EncodeEntryError> {
        let config = Arc::clone(&self.config);
        let mut state = self.clone_state();

        state.append_structural(b'[');
        if config.displays_level() {
            state.append_colored(
                color::color_for(entry.level),
                format_args!("{:<width$.width$}", entry.level, width = LEVEL_WIDTH),
            );
        }
        state.append_structural(b' ');
        if config.displays_time() {
            (config.encode_time)(entry.time, &mut state);
        }
        state.append_structural(b']');

        if let Some(caller) = entry.caller.as_ref().filter(|_| config.displays_caller()) {
            state.append_structural(b'[');
            (config.encode_caller)(caller, &mut state);
            state.append_structural(b']');
        }
        state.append_structural(b' ');

        if config.displays_message() {
            state.raw().append_str(&entry.message);
        }

        let mut failure = None;
        for field in fields {
            if let Err(source) = field.add_to(&mut state) {
                failure.get_or_insert((field.key.clone(), source));
            }
        }

        state.append_structural(b'\n');
        let line = state.finish();

        match failure {
            None => Ok(line),
            Some((key, source)) => Err(EncodeEntryError { key, source, line }),
        }
    }
}

impl Default for PrettyEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}
