use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};

/// Destination of rendered lines, shared by a handler and everything
/// derived from it.
///
/// The lock is held only while one finished line is written, so
/// formatting never contends. Rotation, buffering or remote shipping
/// belong to the wrapped writer.
pub struct Sink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Sink {
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Sink { writer: Mutex::new(Box::new(writer)) }
    }

    pub fn stdout() -> Self {
        Sink::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Sink::new(io::stderr())
    }

    /// Write one complete line. The error is returned untouched and never
    /// retried.
    pub fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(line)
    }

    pub fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").finish_non_exhaustive()
    }
}
