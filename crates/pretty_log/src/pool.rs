//! Provides [`BufferPool`], a thread-safe free list of [`Buffer`]s, and [`PooledBuffer`], the
//! scoped handle that hands a buffer back to its pool once the rendered line has been consumed.

use std::{num::NonZeroUsize, ops::Deref, sync::Arc};

use parking_lot::Mutex;

use crate::buffer::{Buffer, INITIAL_CAPACITY};

/// Buffers that grew beyond this capacity are dropped instead of being recycled.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Default number of idle buffers a pool keeps around.
pub const DEFAULT_POOL_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

/// A pool of reusable [`Buffer`]s.
///
/// Cloning a pool is cheap and yields a handle to the same free list. Every
/// [`acquire()`][BufferPool::acquire] hands out a buffer no other caller holds; the buffer goes
/// back to the pool when the returned [`PooledBuffer`] is dropped.
#[derive(Clone, Debug)]
pub struct BufferPool {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    idle: Mutex<Vec<Buffer>>,
    capacity: usize,
}

impl BufferPool {
    /// Creates a pool retaining at most `capacity` idle buffers.
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = usize::from(capacity);
        Self {
            shared: Arc::new(Shared {
                idle: Mutex::new(Vec::with_capacity(capacity)),
                capacity,
            }),
        }
    }

    /// Takes an empty buffer out of the pool, allocating one if none is idle.
    pub fn acquire(&self) -> PooledBuffer {
        let recycled = self.shared.idle.lock().pop();
        PooledBuffer {
            buffer: recycled.unwrap_or_else(Buffer::new),
            pool: Arc::clone(&self.shared),
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.shared.idle.lock().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl Shared {
    fn release(&self, mut buffer: Buffer) {
        if buffer.capacity() > MAX_RETAINED_CAPACITY || buffer.capacity() < INITIAL_CAPACITY {
            return;
        }
        buffer.reset();

        let mut idle = self.idle.lock();
        if idle.len() < self.capacity {
            idle.push(buffer);
        }
    }
}

/// A [`Buffer`] on loan from a [`BufferPool`].
///
/// The holder owns the buffer exclusively. Dropping the handle (or calling
/// [`release()`][PooledBuffer::release]) returns the buffer to the pool it came from, so a sink
/// must keep the handle alive only for as long as it needs the rendered bytes.
#[derive(Debug)]
#[must_use = "dropping the buffer discards the rendered line"]
pub struct PooledBuffer {
    buffer: Buffer,
    pool: Arc<Shared>,
}

impl PooledBuffer {
    /// Mutable access for appending.
    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    /// Returns the buffer to its pool.
    pub fn release(self) {
        drop(self);
    }

    /// Detaches the buffer from its pool and returns its contents.
    pub fn into_vec(mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer).into_bytes()
    }
}

impl Deref for PooledBuffer {
    type Target = Buffer;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_bytes()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buffer));
    }
}
