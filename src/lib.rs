//! Colorized, human-readable structured logging.
//!
//! A [`Handler`] renders each [`Record`] as one text line
//!
//! ```text
//! 2024-01-02 03:04:05 INFO src/main.rs:12 Starting server addr=:8080 env=production
//! ```
//!
//! with ANSI colors unless disabled. The same handler can be driven by
//! `tracing` through [`HandlerLayer`], by code expecting a flat key/value
//! logger through [`LeveledLogger`], or by an ORM through
//! [`QueryTracer`]. [`Logger`] builds one from [`Options`] for
//! applications that want a ready-made console or rolling-file logger.

pub mod buffer;
pub mod env;
pub mod format;
pub mod handler;
pub mod init;
pub mod layer;
pub mod level;
pub mod leveled;
pub mod logger;
pub mod query;
pub mod record;
pub mod sink;
pub mod value;

#[cfg(test)]
mod testing;

pub use format::{ReplaceAttr, DEFAULT_TIME_FORMAT};
pub use handler::{Handler, HandlerOptions};
pub use init::{init_tracing, init_tracing_with_options};
pub use layer::HandlerLayer;
pub use level::{Level, LevelVar, ParseLevelError};
pub use leveled::{LeveledLogger, Severity};
pub use logger::{BuildError, Logger, Options, Output, QueryConfig, RecordNotFound, Rotation};
pub use query::{QueryLogLevel, QueryTracer};
pub use record::{Record, Source};
pub use sink::Sink;
pub use value::{Attr, ErrorMessage, SharedError, TextMarshal, Value};
