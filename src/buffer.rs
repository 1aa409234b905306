use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Starting capacity of freshly allocated buffers.
pub const INITIAL_CAPACITY: usize = 1024;

/// Buffers that grew beyond this are not returned to the pool.
pub const MAX_POOLED_CAPACITY: usize = 16 << 10;

const MAX_IDLE_BUFFERS: usize = 64;

static POOL: Lazy<BufferPool> = Lazy::new(BufferPool::new);

/// Byte buffer a single log line is rendered into.
#[derive(Debug, Default)]
pub struct Buffer(Vec<u8>);

impl Buffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Buffer(Vec::with_capacity(capacity))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.0.push(byte);
    }

    pub fn write_str(&mut self, s: &str) {
        self.0.extend_from_slice(s.as_bytes());
    }

    /// Append `s` only when `ok` holds. Used for optional ANSI codes.
    pub fn write_str_if(&mut self, ok: bool, s: &str) {
        if ok {
            self.write_str(s);
        }
    }

    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace a trailing separator with a newline, or append one.
    pub fn terminate_line(&mut self) {
        match self.0.last_mut() {
            Some(last) if *last == b' ' => *last = b'\n',
            _ => self.0.push(b'\n'),
        }
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Buffer::write_str(self, s);
        Ok(())
    }
}

/// Free list of reusable buffers.
///
/// Pooling only saves allocations; a buffer that is never returned is
/// simply dropped.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<Buffer>>,
}

impl BufferPool {
    pub fn new() -> Self {
        BufferPool { free: Mutex::new(Vec::new()) }
    }

    /// Take a recycled buffer, or allocate a new one.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| Buffer::with_capacity(INITIAL_CAPACITY));
        PooledBuffer { buf, pool: self }
    }

    /// Return a buffer. Oversized buffers, and anything beyond the idle
    /// limit, are dropped.
    pub fn release(&self, mut buf: Buffer) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < MAX_IDLE_BUFFERS {
            free.push(buf);
        }
    }

    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A buffer on loan from a [`BufferPool`]; released on drop.
pub struct PooledBuffer<'a> {
    buf: Buffer,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = Buffer;

    fn deref(&self) -> &Buffer {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Buffer {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

/// Acquire a buffer from the process-wide pool.
pub fn acquire() -> PooledBuffer<'static> {
    POOL.acquire()
}
