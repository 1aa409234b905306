use crate::handler::Handler;
use crate::level::Level;
use crate::record::Record;
use crate::value::Value;
use std::io;
use std::panic::Location;

/// Severities of the generic leveled-logger convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    /// Written as `ERROR`. Terminating the process is up to the caller.
    Fatal,
}

impl Severity {
    pub fn level(self) -> Level {
        match self {
            Severity::Debug => Level::DEBUG,
            Severity::Info => Level::INFO,
            Severity::Warn => Level::WARN,
            Severity::Error | Severity::Fatal => Level::ERROR,
        }
    }
}

/// Logger that takes a severity and a flat list of alternating keys and
/// values, e.g. `["msg", "started", "port", 8080]`.
pub trait LeveledLogger {
    #[track_caller]
    fn log(&self, severity: Severity, keyvals: &[Value]) -> io::Result<()>;
}

impl LeveledLogger for Handler {
    #[track_caller]
    fn log(&self, severity: Severity, keyvals: &[Value]) -> io::Result<()> {
        let level = severity.level();
        if !self.enabled(level) {
            return Ok(());
        }
        let mut record = Record::new(level, "").with_source(Location::caller());
        record.add(keyvals.iter().cloned());
        self.handle(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerOptions;
    use crate::testing::Capture;

    fn handler(capture: &Capture, add_source: bool) -> Handler {
        let options = HandlerOptions {
            no_color: true,
            add_source,
            time_format: "%H".to_string(),
            ..Default::default()
        }
        .with_level(Level::DEBUG);
        Handler::new(capture.clone(), options)
    }

    fn without_time(line: &str) -> &str {
        line.split_once(' ').map(|(_, rest)| rest).unwrap_or(line)
    }

    #[test]
    fn keyvals_become_attributes() {
        let capture = Capture::default();
        handler(&capture, false)
            .log(
                Severity::Debug,
                &[
                    "msg".into(),
                    "Starting server".into(),
                    "addr".into(),
                    ":8080".into(),
                ],
            )
            .unwrap();
        assert_eq!(
            without_time(&capture.contents()),
            "DEBUG msg=\"Starting server\" addr=:8080\n"
        );
    }

    #[test]
    fn fatal_is_written_as_error() {
        let capture = Capture::default();
        handler(&capture, false)
            .log(Severity::Fatal, &["msg".into(), "bye".into()])
            .unwrap();
        assert_eq!(without_time(&capture.contents()), "ERROR msg=bye\n");
    }

    #[test]
    fn severity_levels() {
        assert_eq!(Severity::Debug.level(), Level::DEBUG);
        assert_eq!(Severity::Info.level(), Level::INFO);
        assert_eq!(Severity::Warn.level(), Level::WARN);
        assert_eq!(Severity::Error.level(), Level::ERROR);
        assert_eq!(Severity::Fatal.level(), Level::ERROR);
    }

    #[test]
    fn source_points_at_the_caller() {
        let capture = Capture::default();
        let h = handler(&capture, true);
        let line = line!() + 1;
        h.log(Severity::Info, &["k".into(), 1.into()]).unwrap();
        let expected = format!("INFO src/leveled.rs:{} k=1\n", line);
        assert_eq!(without_time(&capture.contents()), expected);
    }

    #[test]
    fn below_minimum_is_skipped() {
        let capture = Capture::default();
        let h = handler(&capture, false);
        h.level_var().set(Level::WARN);
        h.log(Severity::Info, &["k".into(), 1.into()]).unwrap();
        assert!(capture.contents().is_empty());
    }
}
