use crate::env::{
    flag, LOG_ADD_SOURCE_ENV, LOG_FILENAME_PREFIX_ENV, LOG_FILEPATH_ENV, LOG_LEVEL_ENV,
    LOG_MAX_FILES_ENV, LOG_NO_COLOR_ENV, LOG_OUTPUT_ENV, LOG_ROTATION_ENV, LOG_TIME_FORMAT_ENV,
};
use crate::format::DEFAULT_TIME_FORMAT;
use crate::handler::{Handler, HandlerOptions};
use crate::leveled::{LeveledLogger, Severity};
use crate::level::{Level, LevelVar, ParseLevelError};
use crate::query::{format_elapsed, sql_text, QueryLogLevel, QueryTracer};
use crate::record::Record;
use crate::sink::Sink;
use crate::value::{Attr, SharedError, Value};
use chrono::format::{Item, StrftimeItems};
use serde::Deserialize;
use std::error::Error;
use std::io::{self, Write};
use std::panic::Location;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where a [`Logger`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    /// Standard output.
    #[default]
    Console,
    Stderr,
    /// Rolling files under [`Options::filepath`]; never colored.
    File,
}

/// How often file output starts a new file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Configuration of a [`Logger`].
///
/// Deserializable with every field optional, or assembled with the
/// `with_*` builders:
///
/// ```
/// use tinted_log::{Level, Options, Output};
///
/// let options = Options::default()
///     .with_level(Level::DEBUG)
///     .with_output(Output::Stderr);
/// assert!(options.add_source);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub level: Level,
    pub output: Output,
    /// Directory for file output.
    pub filepath: PathBuf,
    /// Files are named `<prefix>.<date>.log`.
    pub filename_prefix: String,
    pub rotation: Rotation,
    /// Rotated files to keep; `0` keeps all.
    pub max_files: usize,
    pub time_format: String,
    pub no_color: bool,
    pub add_source: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            level: Level::INFO,
            output: Output::Console,
            filepath: PathBuf::from("logs"),
            filename_prefix: "app".to_string(),
            rotation: Rotation::Daily,
            max_files: 0,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            no_color: false,
            add_source: true,
        }
    }
}

impl Options {
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn with_filepath(mut self, filepath: impl Into<PathBuf>) -> Self {
        self.filepath = filepath.into();
        self
    }

    pub fn with_filename_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_time_format(mut self, time_format: impl Into<String>) -> Self {
        self.time_format = time_format.into();
        self
    }

    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    pub fn with_add_source(mut self, add_source: bool) -> Self {
        self.add_source = add_source;
        self
    }

    /// Defaults overridden by whichever `LOG_*` variables are set.
    pub fn from_env() -> Result<Options, BuildError> {
        Options::from_vars(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_vars<F>(lookup: F) -> Result<Options, BuildError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let invalid = |var: &'static str, value: &str| BuildError::InvalidEnv {
            var,
            value: value.to_string(),
        };

        let mut options = Options::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            options.level = level.parse()?;
        }
        if let Some(output) = lookup(LOG_OUTPUT_ENV) {
            options.output = match output.trim().to_ascii_lowercase().as_str() {
                "console" | "stdout" => Output::Console,
                "stderr" => Output::Stderr,
                "file" => Output::File,
                _ => return Err(invalid(LOG_OUTPUT_ENV, &output)),
            };
        }
        if let Some(filepath) = lookup(LOG_FILEPATH_ENV) {
            options.filepath = PathBuf::from(filepath);
        }
        if let Some(prefix) = lookup(LOG_FILENAME_PREFIX_ENV) {
            options.filename_prefix = prefix;
        }
        if let Some(rotation) = lookup(LOG_ROTATION_ENV) {
            options.rotation = match rotation.trim().to_ascii_lowercase().as_str() {
                "minutely" => Rotation::Minutely,
                "hourly" => Rotation::Hourly,
                "daily" => Rotation::Daily,
                "never" => Rotation::Never,
                _ => return Err(invalid(LOG_ROTATION_ENV, &rotation)),
            };
        }
        if let Some(max_files) = lookup(LOG_MAX_FILES_ENV) {
            options.max_files = max_files
                .trim()
                .parse()
                .map_err(|_| invalid(LOG_MAX_FILES_ENV, &max_files))?;
        }
        if let Some(time_format) = lookup(LOG_TIME_FORMAT_ENV) {
            options.time_format = time_format;
        }
        if let Some(no_color) = lookup(LOG_NO_COLOR_ENV) {
            options.no_color = flag(&no_color);
        }
        if let Some(add_source) = lookup(LOG_ADD_SOURCE_ENV) {
            options.add_source = flag(&add_source);
        }
        Ok(options)
    }
}

/// Errors from building a [`Logger`].
#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Level(#[from] ParseLevelError),

    #[error("invalid time format: {0:?}")]
    InvalidTimeFormat(String),

    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    #[cfg(feature = "file")]
    #[error("failed to open log file: {0}")]
    Appender(#[from] tracing_appender::rolling::InitError),

    #[error("file output requires the `file` feature")]
    FileFeatureDisabled,
}

/// Grading of traced statements, following the usual ORM logger
/// conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
    pub log_level: QueryLogLevel,
    /// Statements slower than this are written at `WARN`. Zero disables
    /// the check.
    pub slow_threshold: Duration,
    /// Do not report [`RecordNotFound`] errors.
    pub ignore_record_not_found: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            log_level: QueryLogLevel::Warn,
            slow_threshold: Duration::from_millis(200),
            ignore_record_not_found: false,
        }
    }
}

/// Error a data layer returns when a lookup matched nothing. Found
/// anywhere in an error's source chain.
#[derive(thiserror::Error, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[error("record not found")]
pub struct RecordNotFound;

fn is_record_not_found(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<RecordNotFound>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Application-facing logger built from [`Options`].
///
/// Cheap to clone. Loggers derived with [`with_attrs`](Logger::with_attrs)
/// or [`with_group`](Logger::with_group) share output and level with the
/// logger they came from.
#[derive(Debug, Clone)]
pub struct Logger {
    handler: Handler,
    query: QueryConfig,
}

impl Logger {
    pub fn new(options: Options) -> Result<Logger, BuildError> {
        validate_time_format(&options.time_format)?;

        let (sink, no_color) = match options.output {
            Output::Console => (Sink::stdout(), options.no_color),
            Output::Stderr => (Sink::stderr(), options.no_color),
            Output::File => (file_sink(&options)?, true),
        };
        tracing::debug!(
            output = ?options.output,
            level = %options.level,
            "building logger"
        );

        Ok(Logger::from_sink(Arc::new(sink), options, no_color))
    }

    /// Build a logger on `writer`, ignoring [`Options::output`] and the
    /// file settings.
    pub fn with_writer<W>(writer: W, options: Options) -> Result<Logger, BuildError>
    where
        W: Write + Send + 'static,
    {
        validate_time_format(&options.time_format)?;
        let no_color = options.no_color;
        Ok(Logger::from_sink(Arc::new(Sink::new(writer)), options, no_color))
    }

    fn from_sink(sink: Arc<Sink>, options: Options, no_color: bool) -> Logger {
        let handler_options = HandlerOptions {
            level: LevelVar::new(options.level),
            time_format: options.time_format,
            no_color,
            add_source: options.add_source,
            replace_attr: None,
        };
        Logger {
            handler: Handler::with_sink(sink, handler_options),
            query: QueryConfig::default(),
        }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn level(&self) -> Level {
        self.handler.level_var().level()
    }

    /// Change the minimum level of this logger and of every logger that
    /// shares its level, e.g. `"debug"` or `"WARN+2"`.
    pub fn set_level(&self, level: &str) -> Result<(), ParseLevelError> {
        let level: Level = level.parse()?;
        self.handler.level_var().set(level);
        Ok(())
    }

    pub fn with_attrs(&self, attrs: &[Attr]) -> Logger {
        Logger { handler: self.handler.with_attrs(attrs), query: self.query }
    }

    pub fn with_group(&self, name: &str) -> Logger {
        Logger { handler: self.handler.with_group(name), query: self.query }
    }

    pub fn with_query_config(&self, query: QueryConfig) -> Logger {
        Logger { handler: self.handler.clone(), query }
    }

    pub fn query_config(&self) -> &QueryConfig {
        &self.query
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, args: &[Value]) -> io::Result<()> {
        self.write(Level::DEBUG, msg, args, Location::caller())
    }

    #[track_caller]
    pub fn info(&self, msg: &str, args: &[Value]) -> io::Result<()> {
        self.write(Level::INFO, msg, args, Location::caller())
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, args: &[Value]) -> io::Result<()> {
        self.write(Level::WARN, msg, args, Location::caller())
    }

    #[track_caller]
    pub fn error(&self, msg: &str, args: &[Value]) -> io::Result<()> {
        self.write(Level::ERROR, msg, args, Location::caller())
    }

    /// Write at an arbitrary level, e.g. `Level::WARN.offset(2)`.
    #[track_caller]
    pub fn log_at(&self, level: Level, msg: &str, args: &[Value]) -> io::Result<()> {
        self.write(level, msg, args, Location::caller())
    }

    pub fn flush(&self) -> io::Result<()> {
        self.handler.flush()
    }

    fn write(
        &self,
        level: Level,
        msg: &str,
        args: &[Value],
        caller: &'static Location<'static>,
    ) -> io::Result<()> {
        if !self.handler.enabled(level) {
            return Ok(());
        }
        let mut record = Record::new(level, msg).with_source(caller);
        record.add(args.iter().cloned());
        self.handler.handle(&record)
    }

    fn write_attrs(
        &self,
        level: Level,
        msg: String,
        attrs: Vec<Attr>,
        caller: &'static Location<'static>,
    ) -> io::Result<()> {
        let mut record = Record::new(level, msg).with_source(caller);
        record.add_attrs(attrs);
        self.handler.handle(&record)
    }
}

impl LeveledLogger for Logger {
    #[track_caller]
    fn log(&self, severity: Severity, keyvals: &[Value]) -> io::Result<()> {
        self.handler.log(severity, keyvals)
    }
}

impl QueryTracer for Logger {
    fn log_mode(&self, level: QueryLogLevel) -> Self {
        let mut logger = self.clone();
        logger.query.log_level = level;
        logger
    }

    #[track_caller]
    fn info(&self, msg: &str, args: &[Value]) -> io::Result<()> {
        self.query_message(Level::INFO, msg, args, Location::caller())
    }

    #[track_caller]
    fn warn(&self, msg: &str, args: &[Value]) -> io::Result<()> {
        self.query_message(Level::WARN, msg, args, Location::caller())
    }

    #[track_caller]
    fn error(&self, msg: &str, args: &[Value]) -> io::Result<()> {
        self.query_message(Level::ERROR, msg, args, Location::caller())
    }

    /// Errors are written at `ERROR` with the error text as message, slow
    /// statements at `WARN`, and everything else at `INFO` only in
    /// [`QueryLogLevel::Info`] mode.
    #[track_caller]
    fn trace<F>(&self, begin: Instant, fc: F, err: Option<SharedError>) -> io::Result<()>
    where
        F: FnOnce() -> (String, i64),
    {
        let caller = Location::caller();
        let mode = self.query.log_level;
        if mode == QueryLogLevel::Silent {
            return Ok(());
        }

        let elapsed = begin.elapsed();
        let reported_err = err.filter(|e| {
            !(self.query.ignore_record_not_found && is_record_not_found(e.as_ref()))
        });
        let slow = self.query.slow_threshold;

        let (level, msg) = match reported_err {
            Some(e) if mode >= QueryLogLevel::Error => (Level::ERROR, e.to_string()),
            _ if !slow.is_zero() && elapsed > slow && mode >= QueryLogLevel::Warn => {
                (Level::WARN, format!("SLOW SQL >= {:?}", slow))
            }
            _ if mode == QueryLogLevel::Info => (Level::INFO, String::new()),
            _ => return Ok(()),
        };
        if !self.handler.enabled(level) {
            return Ok(());
        }

        let (sql, rows) = fc();
        let attrs = vec![
            Attr::string("elapsed", format_elapsed(elapsed)),
            Attr::string("sql", sql_text(sql, rows)),
        ];
        self.write_attrs(level, msg, attrs, caller)
    }
}

impl Logger {
    fn query_message(
        &self,
        level: Level,
        msg: &str,
        args: &[Value],
        caller: &'static Location<'static>,
    ) -> io::Result<()> {
        if !self.query.log_level.allows(level) {
            return Ok(());
        }
        self.write(level, msg, args, caller)
    }
}

fn validate_time_format(time_format: &str) -> Result<(), BuildError> {
    if StrftimeItems::new(time_format).any(|item| matches!(item, Item::Error)) {
        return Err(BuildError::InvalidTimeFormat(time_format.to_string()));
    }
    Ok(())
}

#[cfg(feature = "file")]
fn file_sink(options: &Options) -> Result<Sink, BuildError> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation as AppenderRotation};

    let rotation = match options.rotation {
        Rotation::Minutely => AppenderRotation::MINUTELY,
        Rotation::Hourly => AppenderRotation::HOURLY,
        Rotation::Daily => AppenderRotation::DAILY,
        Rotation::Never => AppenderRotation::NEVER,
    };
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(options.filename_prefix.clone())
        .filename_suffix("log");
    if options.max_files > 0 {
        builder = builder.max_log_files(options.max_files);
    }
    let appender = builder.build(&options.filepath)?;
    Ok(Sink::new(appender))
}

#[cfg(not(feature = "file"))]
fn file_sink(_options: &Options) -> Result<Sink, BuildError> {
    Err(BuildError::FileFeatureDisabled)
}
