use crate::buffer;
use crate::format::{Formatter, ReplaceAttr, DEFAULT_TIME_FORMAT};
use crate::level::{Level, LevelVar};
use crate::query::QueryLogLevel;
use crate::record::Record;
use crate::sink::Sink;
use crate::value::Attr;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

/// Options for [`Handler::new`]. The default writes colored lines at
/// `INFO` and above without source locations.
#[derive(Clone)]
pub struct HandlerOptions {
    /// Minimum level. Share a [`LevelVar`] to change it later.
    pub level: LevelVar,
    /// `chrono` strftime pattern; empty selects the default.
    pub time_format: String,
    pub no_color: bool,
    /// Write `<dir>/<file>:<line>` of the call site after the level.
    pub add_source: bool,
    pub replace_attr: Option<ReplaceAttr>,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            level: LevelVar::default(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            no_color: false,
            add_source: false,
            replace_attr: None,
        }
    }
}

impl HandlerOptions {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = LevelVar::new(level);
        self
    }

    pub fn with_replace_attr<F>(mut self, f: F) -> Self
    where
        F: Fn(&[String], Attr) -> Attr + Send + Sync + 'static,
    {
        self.replace_attr = Some(Arc::new(f));
        self
    }
}

/// Structured-log handler writing one colorized text line per record.
///
/// Handlers derived with [`with_attrs`](Handler::with_attrs) or
/// [`with_group`](Handler::with_group) keep writing to the same [`Sink`]
/// and observe the same [`LevelVar`]; their bound attributes and groups
/// are their own.
#[derive(Clone)]
pub struct Handler {
    attrs_prefix: Vec<u8>,
    group_prefix: String,
    groups: Vec<String>,
    sink: Arc<Sink>,
    formatter: Formatter,
    level: LevelVar,
    pub(crate) query_level: QueryLogLevel,
}

impl Handler {
    pub fn new<W>(writer: W, options: HandlerOptions) -> Self
    where
        W: Write + Send + 'static,
    {
        Handler::with_sink(Arc::new(Sink::new(writer)), options)
    }

    /// Build a handler on an existing sink, e.g. to give two differently
    /// configured handlers one output.
    pub fn with_sink(sink: Arc<Sink>, options: HandlerOptions) -> Self {
        Handler {
            attrs_prefix: Vec::new(),
            group_prefix: String::new(),
            groups: Vec::new(),
            sink,
            formatter: Formatter::new(
                options.time_format,
                options.no_color,
                options.add_source,
                options.replace_attr,
            ),
            level: options.level,
            query_level: QueryLogLevel::Info,
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level.level()
    }

    /// Render and write `record`.
    ///
    /// Records below the minimum level are dropped. Only the final write
    /// takes the sink's lock; its error is returned as is.
    pub fn handle(&self, record: &Record) -> io::Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }

        let mut buf = buffer::acquire();
        let written = self.formatter.format(
            &mut buf,
            record,
            &self.attrs_prefix,
            &self.group_prefix,
            &self.groups,
        );
        if !written {
            return Ok(());
        }
        self.sink.write_line(&buf)
    }

    /// A handler that writes `attrs` on every line after the message.
    pub fn with_attrs(&self, attrs: &[Attr]) -> Handler {
        if attrs.is_empty() {
            return self.clone();
        }

        let mut buf = buffer::acquire();
        for attr in attrs {
            self.formatter
                .append_attr(&mut buf, attr.clone(), &self.group_prefix, &self.groups);
        }

        let mut derived = self.clone();
        derived.attrs_prefix.extend_from_slice(&buf);
        derived
    }

    /// A handler that nests every later attribute under `name`.
    pub fn with_group(&self, name: &str) -> Handler {
        if name.is_empty() {
            return self.clone();
        }

        let mut derived = self.clone();
        derived.group_prefix.push_str(name);
        derived.group_prefix.push('.');
        derived.groups.push(name.to_string());
        derived
    }

    pub fn level_var(&self) -> &LevelVar {
        &self.level
    }

    pub fn sink(&self) -> &Arc<Sink> {
        &self.sink
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("attrs_prefix", &String::from_utf8_lossy(&self.attrs_prefix))
            .field("group_prefix", &self.group_prefix)
            .field("groups", &self.groups)
            .field("formatter", &self.formatter)
            .field("level", &self.level.level())
            .field("query_level", &self.query_level)
            .finish()
    }
}
