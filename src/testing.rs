//! Helpers shared by unit tests.

use crate::value::TextMarshal;
use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

/// In-memory writer whose contents can be read after the handler took
/// ownership of a clone.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that rejects every write.
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct FailingText;

impl TextMarshal for FailingText {
    fn marshal_text(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        Err("cannot marshal".into())
    }
}

pub fn fixed_time() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
}
