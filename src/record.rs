use crate::level::Level;
use crate::value::{Attr, Value};
use chrono::{DateTime, Local};
use std::panic::Location;
use std::path::Path;

/// Key given to values that arrive without a usable key.
pub const BAD_KEY: &str = "!BADKEY";

/// Call site of a log statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub file: &'static str,
    pub line: u32,
    pub function: Option<&'static str>,
}

impl Source {
    pub fn new(file: &'static str, line: u32) -> Self {
        Source { file, line, function: None }
    }

    pub fn with_function(mut self, function: Option<&'static str>) -> Self {
        self.function = function;
        self
    }

    /// `<parent-dir>/<file>`, or just the file name at the top level.
    pub fn short_file(&self) -> String {
        let path = Path::new(self.file);
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy())
            .unwrap_or_else(|| self.file.into());
        match path.parent().and_then(|p| p.file_name()) {
            Some(dir) => format!("{}/{}", dir.to_string_lossy(), file),
            None => file.into_owned(),
        }
    }
}

impl From<&'static Location<'static>> for Source {
    fn from(location: &'static Location<'static>) -> Self {
        Source::new(location.file(), location.line())
    }
}

/// One structured log event.
#[derive(Debug, Clone)]
pub struct Record {
    /// `None` leaves the time out of the line.
    pub time: Option<DateTime<Local>>,
    pub level: Level,
    pub message: String,
    pub source: Option<Source>,
    pub attrs: Vec<Attr>,
}

impl Record {
    /// A record stamped with the current local time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Record {
            time: Some(Local::now()),
            level,
            message: message.into(),
            source: None,
            attrs: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<Source>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn add_attrs(&mut self, attrs: impl IntoIterator<Item = Attr>) {
        self.attrs.extend(attrs);
    }

    /// Add alternating keys and values.
    ///
    /// A string followed by another value forms one attribute. A trailing
    /// string, or a value in key position that is not a string, is kept
    /// under [`BAD_KEY`].
    pub fn add(&mut self, args: impl IntoIterator<Item = Value>) {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let attr = match arg {
                Value::String(key) => match args.next() {
                    Some(value) => Attr::new(key, value),
                    None => Attr::new(BAD_KEY, Value::String(key)),
                },
                other => Attr::new(BAD_KEY, other),
            };
            self.attrs.push(attr);
        }
    }
}
