use crate::level::Level;
use crate::record::Source;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Key used for error attributes created with [`Attr::err`].
pub const ERR_KEY: &str = "err";

/// Error shared between records and the query tracer.
pub type SharedError = Arc<dyn Error + Send + Sync>;

/// Types that know how to render themselves as text for a log line.
///
/// A failing `marshal_text` leaves the field's value empty instead of
/// failing the record.
pub trait TextMarshal: Send + Sync {
    fn marshal_text(&self) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// Typed value of an attribute.
#[derive(Clone, Default)]
pub enum Value {
    /// No value; such fields are omitted from the line.
    #[default]
    Empty,
    String(String),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<FixedOffset>),
    Group(Vec<Attr>),
    /// Rendered as `err=<text>` in its own color.
    Error(SharedError),
    Text(Arc<dyn TextMarshal>),
    Any(Arc<dyn fmt::Display + Send + Sync>),
    /// Only produced for the reserved `level` field passed to a rewrite hook.
    Level(Level),
    /// Only produced for the reserved `source` field passed to a rewrite hook.
    Source(Source),
}

impl Value {
    pub fn is_group(&self) -> bool {
        matches!(self, Value::Group(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => f.write_str("Empty"),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Int64(n) => f.debug_tuple("Int64").field(n).finish(),
            Value::Uint64(n) => f.debug_tuple("Uint64").field(n).finish(),
            Value::Float64(n) => f.debug_tuple("Float64").field(n).finish(),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Duration(d) => f.debug_tuple("Duration").field(d).finish(),
            Value::Time(t) => f.debug_tuple("Time").field(t).finish(),
            Value::Group(attrs) => f.debug_tuple("Group").field(attrs).finish(),
            Value::Error(e) => f.debug_tuple("Error").field(&e.to_string()).finish(),
            Value::Text(_) => f.write_str("Text(..)"),
            Value::Any(v) => f.debug_tuple("Any").field(&v.to_string()).finish(),
            Value::Level(l) => f.debug_tuple("Level").field(l).finish(),
            Value::Source(s) => f.debug_tuple("Source").field(s).finish(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

macro_rules! impl_from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Int64(n as i64)
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Uint64(n as u64)
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64, isize);
impl_from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float64(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float64(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(t: DateTime<Tz>) -> Self {
        Value::Time(t.fixed_offset())
    }
}

impl From<Vec<Attr>> for Value {
    fn from(attrs: Vec<Attr>) -> Self {
        Value::Group(attrs)
    }
}

/// A key paired with a [`Value`].
#[derive(Debug, Clone, Default)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr { key: key.into(), value: value.into() }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attr::new(key, Value::String(value.into()))
    }

    /// A named container; its key becomes a dotted prefix of its children.
    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr::new(key, Value::Group(attrs))
    }

    /// An error highlighted by the handler under the `err` key.
    pub fn err<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Attr::new(ERR_KEY, Value::Error(Arc::new(err)))
    }

    pub fn shared_err(err: SharedError) -> Self {
        Attr::new(ERR_KEY, Value::Error(err))
    }

    pub fn text<T: TextMarshal + 'static>(key: impl Into<String>, value: T) -> Self {
        Attr::new(key, Value::Text(Arc::new(value)))
    }

    /// Anything printable; rendered with its `Display` output.
    pub fn display<T>(key: impl Into<String>, value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Attr::new(key, Value::Any(Arc::new(value)))
    }
}

/// Error whose only content is its message, for errors captured by text.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for ErrorMessage {}
