use crate::handler::Handler;
use crate::level::Level;
use crate::record::Record;
use crate::value::{Attr, SharedError, Value};
use serde::Deserialize;
use std::io;
use std::panic::Location;
use std::time::{Duration, Instant};

/// Verbosity of the query-tracing interface, from quietest to loudest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryLogLevel {
    Silent,
    Error,
    Warn,
    Info,
}

impl QueryLogLevel {
    /// Whether a record at `level` passes this mode.
    pub fn allows(self, level: Level) -> bool {
        match self {
            QueryLogLevel::Silent => false,
            QueryLogLevel::Error => level >= Level::ERROR,
            QueryLogLevel::Warn => level >= Level::WARN,
            QueryLogLevel::Info => true,
        }
    }
}

impl Default for QueryLogLevel {
    fn default() -> Self {
        QueryLogLevel::Info
    }
}

/// Logger interface expected by an ORM: plain messages plus a trace
/// call after every statement.
pub trait QueryTracer: Sized {
    /// A copy of this logger using `level` as its query log mode.
    fn log_mode(&self, level: QueryLogLevel) -> Self;

    #[track_caller]
    fn info(&self, msg: &str, args: &[Value]) -> io::Result<()>;

    #[track_caller]
    fn warn(&self, msg: &str, args: &[Value]) -> io::Result<()>;

    #[track_caller]
    fn error(&self, msg: &str, args: &[Value]) -> io::Result<()>;

    /// Record one executed statement. `fc` returns the SQL text and the
    /// affected row count, `-1` when unknown; it is only called if the
    /// statement is going to be written.
    #[track_caller]
    fn trace<F>(&self, begin: Instant, fc: F, err: Option<SharedError>) -> io::Result<()>
    where
        F: FnOnce() -> (String, i64);
}

/// Elapsed time as milliseconds with three decimals, e.g. `12.345ms`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_nanos() as f64 / 1e6)
}

/// SQL text for the log line; `-` when the row count is unknown.
pub fn sql_text(sql: String, rows: i64) -> String {
    if rows == -1 {
        "-".to_string()
    } else {
        sql
    }
}

/// Attributes of one traced statement: `[err] time sql`.
pub fn query_attrs(elapsed: Duration, sql: String, rows: i64, err: Option<SharedError>) -> Vec<Attr> {
    let mut attrs = Vec::with_capacity(3);
    if let Some(err) = err {
        attrs.push(Attr::shared_err(err));
    }
    attrs.push(Attr::string("time", format_elapsed(elapsed)));
    attrs.push(Attr::string("sql", sql_text(sql, rows)));
    attrs
}

impl Handler {
    fn query_message(
        &self,
        level: Level,
        msg: &str,
        args: &[Value],
        caller: &'static Location<'static>,
    ) -> io::Result<()> {
        if !self.query_level.allows(level) || !self.enabled(level) {
            return Ok(());
        }
        let mut record = Record::new(level, "").with_source(caller);
        record.add_attrs([Attr::string("msg", msg)]);
        record.add(args.iter().cloned());
        self.handle(&record)
    }
}

impl QueryTracer for Handler {
    fn log_mode(&self, level: QueryLogLevel) -> Self {
        let mut handler = self.clone();
        handler.query_level = level;
        handler
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

    #[track_caller]
    fn trace<F>(&self, begin: Instant, fc: F, err: Option<SharedError>) -> io::Result<()>
    where
        F: FnOnce() -> (String, i64),
    {
        let caller = Location::caller();
        let passes = match self.query_level {
            QueryLogLevel::Silent => false,
            QueryLogLevel::Error | QueryLogLevel::Warn => err.is_some(),
            QueryLogLevel::Info => true,
        };
        if !passes || !self.enabled(Level::INFO) {
            return Ok(());
        }

        let (sql, rows) = fc();
        let mut record = Record::new(Level::INFO, "").with_source(caller);
        record.add_attrs(query_attrs(begin.elapsed(), sql, rows, err));
        self.handle(&record)
    }
}
