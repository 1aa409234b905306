//! Rendering of a [`Record`] into one text line.
//!
//! Fields are written in a fixed order: time, level, source, message,
//! the handler's pre-rendered attributes, then the record's attributes.
//! Every field is followed by a space; the last one becomes the newline.

use crate::buffer::Buffer;
use crate::level::Level;
use crate::record::{Record, Source};
use crate::value::{Attr, Value, ERR_KEY};
use chrono::{DateTime, TimeZone};
use std::error::Error;
use std::fmt::{self, Write as _};
use std::sync::Arc;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_FAINT: &str = "\x1b[2m";
const ANSI_RESET_FAINT: &str = "\x1b[22m";
const ANSI_BRIGHT_RED: &str = "\x1b[91m";
const ANSI_BRIGHT_GREEN: &str = "\x1b[92m";
const ANSI_BRIGHT_YELLOW: &str = "\x1b[93m";
const ANSI_BRIGHT_RED_FAINT: &str = "\x1b[91;2m";
const ANSI_BRIGHT_BLUE: &str = "\x1b[34;1m";

/// Reserved keys handed to a [`ReplaceAttr`] hook for the built-in fields.
pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const SOURCE_KEY: &str = "source";
pub const MESSAGE_KEY: &str = "msg";

/// Default `chrono` pattern for timestamps, e.g. `2024-01-02 03:04:05`.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Rewrites an attribute before it is written.
///
/// Receives the names of the enclosing groups and the attribute. Returning
/// an attribute with an empty key drops the field.
pub type ReplaceAttr = Arc<dyn Fn(&[String], Attr) -> Attr + Send + Sync>;

/// Line renderer. Holds only configuration, so it is freely shared.
#[derive(Clone)]
pub struct Formatter {
    time_format: String,
    no_color: bool,
    add_source: bool,
    replace_attr: Option<ReplaceAttr>,
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("time_format", &self.time_format)
            .field("no_color", &self.no_color)
            .field("add_source", &self.add_source)
            .field("replace_attr", &self.replace_attr.is_some())
            .finish()
    }
}

impl Formatter {
    pub fn new(
        time_format: impl Into<String>,
        no_color: bool,
        add_source: bool,
        replace_attr: Option<ReplaceAttr>,
    ) -> Self {
        let time_format = time_format.into();
        Formatter {
            time_format: if time_format.is_empty() {
                DEFAULT_TIME_FORMAT.to_string()
            } else {
                time_format
            },
            no_color,
            add_source,
            replace_attr,
        }
    }

    fn color(&self) -> bool {
        !self.no_color
    }

    /// Render `record` into `buf`. Returns `false` if nothing was written.
    pub fn format(
        &self,
        buf: &mut Buffer,
        record: &Record,
        attrs_prefix: &[u8],
        group_prefix: &str,
        groups: &[String],
    ) -> bool {
        let rep = self.replace_attr.as_deref();

        if let Some(time) = &record.time {
            match rep {
                None => {
                    self.append_time(buf, time);
                    buf.write_byte(b' ');
                }
                Some(rep) => {
                    let attr = rep(&[], Attr::new(TIME_KEY, *time));
                    if !attr.key.is_empty() {
                        match &attr.value {
                            Value::Time(t) => self.append_time(buf, t),
                            other => self.append_value(buf, other, false),
                        }
                        buf.write_byte(b' ');
                    }
                }
            }
        }

        match rep {
            None => {
                self.append_level(buf, record.level);
                buf.write_byte(b' ');
            }
            Some(rep) => {
                let attr = rep(&[], Attr::new(LEVEL_KEY, Value::Level(record.level)));
                if !attr.key.is_empty() {
                    self.append_value(buf, &attr.value, false);
                    buf.write_byte(b' ');
                }
            }
        }

        if self.add_source {
            if let Some(source) = &record.source {
                match rep {
                    None => {
                        self.append_source(buf, source);
                        buf.write_byte(b' ');
                    }
                    Some(rep) => {
                        let attr = rep(&[], Attr::new(SOURCE_KEY, Value::Source(*source)));
                        if !attr.key.is_empty() {
                            self.append_value(buf, &attr.value, false);
                            buf.write_byte(b' ');
                        }
                    }
                }
            }
        }

        // An empty message leaves no gap in the line.
        let before = buf.len();
        match rep {
            None => buf.write_str(&record.message),
            Some(rep) => {
                let attr = rep(&[], Attr::string(MESSAGE_KEY, record.message.as_str()));
                if !attr.key.is_empty() {
                    self.append_value(buf, &attr.value, false);
                }
            }
        }
        if buf.len() > before {
            buf.write_byte(b' ');
        }

        buf.write_bytes(attrs_prefix);

        for attr in &record.attrs {
            self.append_attr(buf, attr.clone(), group_prefix, groups);
        }

        if buf.is_empty() {
            return false;
        }
        buf.terminate_line();
        true
    }

    /// Render one attribute, flattening groups, followed by a separator.
    pub fn append_attr(&self, buf: &mut Buffer, mut attr: Attr, group_prefix: &str, groups: &[String]) {
        if let Some(rep) = &self.replace_attr {
            if !attr.value.is_group() {
                attr = rep(groups, attr);
            }
        }

        match attr.value {
            Value::Empty => {}
            Value::Group(children) => {
                if attr.key.is_empty() {
                    for child in children {
                        self.append_attr(buf, child, group_prefix, groups);
                    }
                } else {
                    let prefix = format!("{}{}.", group_prefix, attr.key);
                    let mut nested = groups.to_vec();
                    nested.push(attr.key);
                    for child in children {
                        self.append_attr(buf, child, &prefix, &nested);
                    }
                }
            }
            _ if attr.key.is_empty() => {}
            Value::Error(err) => {
                self.append_error(buf, err.as_ref(), group_prefix);
                buf.write_byte(b' ');
            }
            value => {
                self.append_key(buf, &attr.key, group_prefix);
                self.append_value(buf, &value, true);
                buf.write_byte(b' ');
            }
        }
    }

    fn append_time<Tz>(&self, buf: &mut Buffer, time: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        buf.write_str_if(self.color(), ANSI_FAINT);
        // An invalid pattern leaves the timestamp truncated rather than failing the line.
        let _ = write!(buf, "{}", time.format(&self.time_format));
        buf.write_str_if(self.color(), ANSI_RESET);
    }

    fn append_level(&self, buf: &mut Buffer, level: Level) {
        let (name, delta) = level.band();
        let color = match name {
            "DEBUG" => ANSI_BRIGHT_BLUE,
            "INFO" => ANSI_BRIGHT_GREEN,
            "WARN" => ANSI_BRIGHT_YELLOW,
            _ => ANSI_BRIGHT_RED,
        };
        buf.write_str_if(self.color(), color);
        buf.write_str(name);
        if delta != 0 {
            let _ = write!(buf, "{:+}", delta);
        }
        buf.write_str_if(self.color(), ANSI_RESET);
    }

    fn append_source(&self, buf: &mut Buffer, source: &Source) {
        buf.write_str_if(self.color(), ANSI_FAINT);
        buf.write_str(&source.short_file());
        let _ = write!(buf, ":{}", source.line);
        buf.write_str_if(self.color(), ANSI_RESET);
    }

    fn append_key(&self, buf: &mut Buffer, key: &str, group_prefix: &str) {
        buf.write_str_if(self.color(), ANSI_FAINT);
        if group_prefix.is_empty() {
            append_string(buf, key, true);
        } else {
            append_string(buf, &format!("{}{}", group_prefix, key), true);
        }
        buf.write_byte(b'=');
        buf.write_str_if(self.color(), ANSI_RESET);
    }

    fn append_error(&self, buf: &mut Buffer, err: &(dyn Error + Send + Sync), group_prefix: &str) {
        buf.write_str_if(self.color(), ANSI_BRIGHT_RED_FAINT);
        append_string(buf, &format!("{}{}", group_prefix, ERR_KEY), true);
        buf.write_byte(b'=');
        buf.write_str_if(self.color(), ANSI_RESET_FAINT);
        append_string(buf, &err.to_string(), true);
        buf.write_str_if(self.color(), ANSI_RESET);
    }

    fn append_value(&self, buf: &mut Buffer, value: &Value, quote: bool) {
        match value {
            Value::String(s) => append_string(buf, s, quote),
            Value::Int64(n) => {
                let _ = write!(buf, "{}", n);
            }
            Value::Uint64(n) => {
                let _ = write!(buf, "{}", n);
            }
            Value::Float64(n) => append_float(buf, *n),
            Value::Bool(b) => buf.write_str(if *b { "true" } else { "false" }),
            Value::Duration(d) => append_string(buf, &format!("{:?}", d), quote),
            Value::Time(t) => append_string(buf, &t.to_string(), quote),
            Value::Level(level) => self.append_level(buf, *level),
            Value::Source(source) => self.append_source(buf, source),
            Value::Text(text) => {
                if let Ok(s) = text.marshal_text() {
                    append_string(buf, &s, quote);
                }
            }
            Value::Error(err) => append_string(buf, &err.to_string(), quote),
            Value::Any(v) => append_string(buf, &v.to_string(), quote),
            Value::Group(_) | Value::Empty => {}
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter::new(DEFAULT_TIME_FORMAT, false, false, None)
    }
}

fn append_string(buf: &mut Buffer, s: &str, quote: bool) {
    if quote && needs_quoting(s) {
        let _ = write!(buf, "{:?}", s);
    } else {
        buf.write_str(s);
    }
}

/// Whether `s` must be quoted to stay a single `key=value` token.
///
/// Besides separators and quotes, any character that is not visible
/// forces quoting, so format characters such as U+202E cannot reorder
/// or hide text in the line.
pub fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || s
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '=' || !is_printable(c))
}

/// Letters, marks, numbers, punctuation, symbols and the ASCII space.
fn is_printable(c: char) -> bool {
    use unicode_general_category::{get_general_category, GeneralCategory as Gc};

    c == ' '
        || !matches!(
            get_general_category(c),
            Gc::Control
                | Gc::Format
                | Gc::Unassigned
                | Gc::PrivateUse
                | Gc::Surrogate
                | Gc::SpaceSeparator
                | Gc::LineSeparator
                | Gc::ParagraphSeparator
        )
}

/// Shortest representation that round-trips. Exponents below -4 or from
/// 6 up switch to `1.5e+06` notation; infinities are `+Inf`/`-Inf`.
fn append_float(buf: &mut Buffer, f: f64) {
    if f.is_nan() {
        buf.write_str("NaN");
        return;
    }
    if f.is_infinite() {
        buf.write_str(if f > 0.0 { "+Inf" } else { "-Inf" });
        return;
    }

    let sci = format!("{:e}", f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if (-4..6).contains(&exp) {
        let _ = write!(buf, "{}", f);
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        let _ = write!(buf, "{}e{}{:02}", mantissa, sign, exp.unsigned_abs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixed_time, FailingText};
    use std::time::Duration;

    fn render(formatter: &Formatter, record: &Record) -> String {
        let mut buf = Buffer::default();
        formatter.format(&mut buf, record, &[], "", &[]);
        String::from_utf8(buf.to_vec()).unwrap()
    }

    fn plain() -> Formatter {
        Formatter::new(DEFAULT_TIME_FORMAT, true, false, None)
    }

    fn record(level: Level, message: &str, attrs: Vec<Attr>) -> Record {
        let mut record = Record::new(level, message);
        record.time = Some(fixed_time());
        record.attrs = attrs;
        record
    }

    fn attrs_only(formatter: &Formatter, attrs: Vec<Attr>) -> String {
        let mut r = record(Level::INFO, "", attrs);
        r.time = None;
        let line = render(formatter, &r);
        line.trim_start_matches("INFO ").to_string()
    }

    #[test]
    fn starting_server_line() {
        let r = record(
            Level::INFO,
            "Starting server",
            vec![Attr::string("addr", ":8080"), Attr::string("env", "production")],
        );
        assert_eq!(
            render(&plain(), &r),
            "2024-01-02 03:04:05 INFO Starting server addr=:8080 env=production\n"
        );
    }

    #[test]
    fn quoting_rules() {
        assert!(!needs_quoting("plain"));
        assert!(!needs_quoting(":8080"));
        assert!(!needs_quoting("ünïcode"));
        assert!(needs_quoting(""));
        assert!(needs_quoting("two words"));
        assert!(needs_quoting("tab\there"));
        assert!(needs_quoting("say\"hi\""));
        assert!(needs_quoting("a=b"));
        assert!(needs_quoting("bell\u{7}"));
        assert!(needs_quoting("a\u{200b}b"));
        assert!(needs_quoting("admin\u{202e}gnp"));
        assert!(needs_quoting("soft\u{ad}hyphen"));
        assert!(needs_quoting("bom\u{feff}"));
        assert!(needs_quoting("nbsp\u{a0}"));
        assert!(!needs_quoting("emoji\u{1f600}"));

        let line = attrs_only(
            &plain(),
            vec![
                Attr::string("empty", ""),
                Attr::string("quote", "say \"hi\""),
                Attr::string("raw", "ok"),
            ],
        );
        assert_eq!(line, "empty=\"\" quote=\"say \\\"hi\\\"\" raw=ok\n");
    }

    #[test]
    fn keys_are_quoted_like_values() {
        let line = attrs_only(&plain(), vec![Attr::string("a key", "v")]);
        assert_eq!(line, "\"a key\"=v\n");
    }

    #[test]
    fn invisible_characters_are_escaped() {
        let line = attrs_only(&plain(), vec![Attr::string("user", "admin\u{202e}gnp")]);
        assert_eq!(line, "user=\"admin\\u{202e}gnp\"\n");
    }

    #[test]
    fn float_notation() {
        let cases = [
            (0.5, "0.5"),
            (3.0, "3"),
            (-0.0, "-0"),
            (123456.0, "123456"),
            (0.0001, "0.0001"),
            (1e6, "1e+06"),
            (1.5e-7, "1.5e-07"),
            (1e21, "1e+21"),
            (0.00001, "1e-05"),
            (-2.5e100, "-2.5e+100"),
            (f64::INFINITY, "+Inf"),
            (f64::NEG_INFINITY, "-Inf"),
            (f64::NAN, "NaN"),
        ];
        for (f, want) in cases {
            let mut buf = Buffer::default();
            append_float(&mut buf, f);
            assert_eq!(String::from_utf8(buf.to_vec()).unwrap(), want, "{:e}", f);
        }
    }

    #[test]
    fn scalar_kinds() {
        let line = attrs_only(
            &plain(),
            vec![
                Attr::new("i", -7i64),
                Attr::new("u", 42u64),
                Attr::new("f", 1.5f64),
                Attr::new("third", 1.0f64 / 3.0),
                Attr::new("b", true),
                Attr::new("d", Duration::from_millis(497)),
                Attr::new("long", Duration::from_millis(1500)),
            ],
        );
        assert_eq!(
            line,
            "i=-7 u=42 f=1.5 third=0.3333333333333333 b=true d=497ms long=1.5s\n"
        );
    }

    #[test]
    fn time_value_is_quoted_canonical_text() {
        let t = fixed_time();
        let expected = format!("at={:?}\n", t.fixed_offset().to_string());
        assert_eq!(attrs_only(&plain(), vec![Attr::new("at", t)]), expected);
    }

    #[test]
    fn group_keys_are_dotted() {
        let line = attrs_only(
            &plain(),
            vec![Attr::group("db", vec![Attr::string("host", "x")])],
        );
        assert_eq!(line, "db.host=x\n");

        let nested = attrs_only(
            &plain(),
            vec![Attr::group(
                "a",
                vec![Attr::group("b", vec![Attr::new("c", 1)]), Attr::new("d", 2)],
            )],
        );
        assert_eq!(nested, "a.b.c=1 a.d=2\n");
    }

    #[test]
    fn unnamed_group_is_flattened() {
        let line = attrs_only(
            &plain(),
            vec![Attr::group("", vec![Attr::new("x", 1), Attr::new("y", 2)])],
        );
        assert_eq!(line, "x=1 y=2\n");
    }

    #[test]
    fn errors_use_fixed_key() {
        let err = crate::value::ErrorMessage("connection reset".to_string());
        let line = attrs_only(
            &plain(),
            vec![Attr::err(err.clone()), Attr::group("db", vec![Attr::err(err)])],
        );
        assert_eq!(line, "err=\"connection reset\" db.err=\"connection reset\"\n");
    }

    #[test]
    fn text_marshal_and_display() {
        struct Id(u32);
        impl crate::value::TextMarshal for Id {
            fn marshal_text(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
                Ok(format!("id-{}", self.0))
            }
        }

        let line = attrs_only(
            &plain(),
            vec![
                Attr::text("id", Id(7)),
                Attr::text("broken", FailingText),
                Attr::display("ip", std::net::Ipv4Addr::LOCALHOST),
            ],
        );
        assert_eq!(line, "id=id-7 broken= ip=127.0.0.1\n");
    }

    #[test]
    fn empty_values_and_keys_are_omitted() {
        let line = attrs_only(
            &plain(),
            vec![
                Attr::new("nothing", Value::Empty),
                Attr::string("", "anonymous"),
                Attr::new("kept", 1),
            ],
        );
        assert_eq!(line, "kept=1\n");
    }

    #[test]
    fn level_bands_in_line() {
        let mut r = record(Level::WARN.offset(2), "", vec![]);
        r.time = None;
        assert_eq!(render(&plain(), &r), "WARN+2\n");

        r.level = Level::ERROR.offset(1);
        assert_eq!(render(&plain(), &r), "ERROR+1\n");

        r.level = Level::WARN;
        assert_eq!(render(&plain(), &r), "WARN\n");
    }

    #[test]
    fn source_is_rendered_when_enabled() {
        let formatter = Formatter::new(DEFAULT_TIME_FORMAT, true, true, None);
        let mut r = record(Level::INFO, "hi", vec![]);
        r.source = Some(Source::new("/srv/app/src/main.rs", 12));
        assert_eq!(render(&formatter, &r), "2024-01-02 03:04:05 INFO src/main.rs:12 hi\n");

        assert_eq!(render(&plain(), &r), "2024-01-02 03:04:05 INFO hi\n");
    }

    #[test]
    fn custom_time_format() {
        let formatter = Formatter::new("%H:%M", true, false, None);
        let r = record(Level::INFO, "hi", vec![]);
        assert_eq!(render(&formatter, &r), "03:04 INFO hi\n");
    }

    #[test]
    fn color_wraps_fields_and_stripping_it_matches_plain() {
        let colored = Formatter::new(DEFAULT_TIME_FORMAT, false, true, None);
        let mut r = record(
            Level::ERROR,
            "DB connection lost",
            vec![
                Attr::err(crate::value::ErrorMessage("reset".to_string())),
                Attr::string("db", "myapp"),
            ],
        );
        r.source = Some(Source::new("src/main.rs", 9));

        let line = render(&colored, &r);
        assert!(line.contains("\x1b[2m2024-01-02 03:04:05\x1b[0m"));
        assert!(line.contains("\x1b[91mERROR\x1b[0m"));
        assert!(line.contains("\x1b[91;2merr=\x1b[22mreset\x1b[0m"));
        assert!(line.contains("\x1b[2mdb=\x1b[0mmyapp"));

        let no_color = Formatter::new(DEFAULT_TIME_FORMAT, true, true, None);
        assert_eq!(strip_ansi(&line), render(&no_color, &r));
        assert!(!render(&no_color, &r).contains('\x1b'));
    }

    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn replace_attr_can_drop_builtin_fields() {
        let rep: ReplaceAttr = Arc::new(|groups: &[String], attr: Attr| {
            if groups.is_empty() && (attr.key == TIME_KEY || attr.key == LEVEL_KEY) {
                Attr::default()
            } else {
                attr
            }
        });
        let formatter = Formatter::new(DEFAULT_TIME_FORMAT, true, false, Some(rep));
        let r = record(Level::INFO, "hi", vec![Attr::new("n", 1)]);
        assert_eq!(render(&formatter, &r), "hi n=1\n");
    }

    #[test]
    fn replace_attr_sees_group_stack() {
        let rep: ReplaceAttr = Arc::new(|groups: &[String], attr: Attr| {
            if attr.key == "password" {
                Attr::string("password", format!("<redacted in {}>", groups.join("/")))
            } else {
                attr
            }
        });
        let formatter = Formatter::new(DEFAULT_TIME_FORMAT, true, false, Some(rep));
        let line = attrs_only(
            &formatter,
            vec![Attr::group(
                "user",
                vec![Attr::group("auth", vec![Attr::string("password", "hunter2")])],
            )],
        );
        assert_eq!(line, "user.auth.password=\"<redacted in user/auth>\"\n");
    }

    #[test]
    fn replaced_level_and_time_keep_their_rendering() {
        let rep: ReplaceAttr = Arc::new(|_: &[String], attr: Attr| match attr.key.as_str() {
            LEVEL_KEY => Attr::new(LEVEL_KEY, Value::Level(Level::ERROR)),
            TIME_KEY => Attr::string(TIME_KEY, "now"),
            _ => attr,
        });
        let formatter = Formatter::new(DEFAULT_TIME_FORMAT, true, false, Some(rep));
        let r = record(Level::INFO, "hi", vec![]);
        assert_eq!(render(&formatter, &r), "now ERROR hi\n");
    }

    #[test]
    fn dropping_everything_writes_nothing() {
        let rep: ReplaceAttr = Arc::new(|_: &[String], _: Attr| Attr::default());
        let formatter = Formatter::new(DEFAULT_TIME_FORMAT, true, false, Some(rep));
        let r = record(Level::INFO, "hi", vec![Attr::new("n", 1)]);
        let mut buf = Buffer::default();
        assert!(!formatter.format(&mut buf, &r, &[], "", &[]));
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_message_leaves_no_gap() {
        let r = record(Level::INFO, "", vec![Attr::string("msg", "hello")]);
        assert_eq!(render(&plain(), &r), "2024-01-02 03:04:05 INFO msg=hello\n");
    }
}
