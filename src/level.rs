use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Severity of a record. Larger is more severe.
///
/// The four named levels sit four apart so custom levels can be placed
/// between them; those render relative to the band below them, e.g.
/// `WARN+2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    pub const fn new(value: i32) -> Self {
        Level(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }

    /// Shift this level by `delta` steps, saturating at the ends of the
    /// range.
    pub const fn offset(self, delta: i32) -> Self {
        Level(self.0.saturating_add(delta))
    }

    /// Name of the band this level falls into and its distance from the
    /// band's canonical level.
    pub fn band(self) -> (&'static str, i32) {
        if self < Level::INFO {
            ("DEBUG", self.0 - Level::DEBUG.0)
        } else if self < Level::WARN {
            ("INFO", self.0 - Level::INFO.0)
        } else if self < Level::ERROR {
            ("WARN", self.0 - Level::WARN.0)
        } else {
            ("ERROR", self.0 - Level::ERROR.0)
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, delta) = self.band();
        f.write_str(name)?;
        if delta != 0 {
            write!(f, "{:+}", delta)?;
        }
        Ok(())
    }
}

/// Returned when a level name cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0:?}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Accepts `DEBUG`, `INFO`, `WARN` or `ERROR` in any case, optionally
    /// followed by a signed offset such as `WARN+2` or `info-1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseLevelError(s.to_string());
        let trimmed = s.trim();
        let (name, offset) = match trimmed.find(|c| c == '+' || c == '-') {
            Some(i) => {
                let delta: i32 = trimmed[i..].parse().map_err(|_| err())?;
                (&trimmed[..i], delta)
            }
            None => (trimmed, 0),
        };

        let base = match name.to_ascii_uppercase().as_str() {
            "DEBUG" => Level::DEBUG,
            "INFO" => Level::INFO,
            "WARN" => Level::WARN,
            "ERROR" => Level::ERROR,
            _ => return Err(err()),
        };
        base.0.checked_add(offset).map(Level).ok_or_else(err)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A minimum level that can be changed after loggers were built.
///
/// Clones share the same cell, so every handler derived from one
/// configuration observes `set` immediately.
#[derive(Debug, Clone)]
pub struct LevelVar(Arc<AtomicI32>);

impl LevelVar {
    pub fn new(level: Level) -> Self {
        LevelVar(Arc::new(AtomicI32::new(level.0)))
    }

    pub fn level(&self) -> Level {
        Level(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: Level) {
        self.0.store(level.0, Ordering::Relaxed);
    }
}

impl Default for LevelVar {
    fn default() -> Self {
        LevelVar::new(Level::INFO)
    }
}

impl From<Level> for LevelVar {
    fn from(level: Level) -> Self {
        LevelVar::new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_and_deltas() {
        assert_eq!(Level::DEBUG.to_string(), "DEBUG");
        assert_eq!(Level::INFO.to_string(), "INFO");
        assert_eq!(Level::WARN.to_string(), "WARN");
        assert_eq!(Level::ERROR.to_string(), "ERROR");

        assert_eq!(Level::WARN.offset(2).to_string(), "WARN+2");
        assert_eq!(Level::ERROR.offset(1).to_string(), "ERROR+1");
        assert_eq!(Level::INFO.offset(-1).to_string(), "DEBUG+3");
        assert_eq!(Level::DEBUG.offset(-4).to_string(), "DEBUG-4");
    }

    #[test]
    fn ordering() {
        assert!(Level::DEBUG < Level::INFO);
        assert!(Level::INFO < Level::WARN);
        assert!(Level::WARN < Level::ERROR);
    }

    #[test]
    fn parse_names_and_offsets() {
        assert_eq!("info".parse::<Level>().unwrap(), Level::INFO);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::WARN);
        assert_eq!("Error+1".parse::<Level>().unwrap(), Level::ERROR.offset(1));
        assert_eq!("debug-2".parse::<Level>().unwrap(), Level::DEBUG.offset(-2));

        assert_eq!(
            "verbose".parse::<Level>(),
            Err(ParseLevelError("verbose".to_string()))
        );
        assert!("WARN+x".parse::<Level>().is_err());
    }

    #[test]
    fn parse_rejects_overflowing_offsets() {
        assert_eq!(
            "ERROR+2147483647".parse::<Level>(),
            Err(ParseLevelError("ERROR+2147483647".to_string()))
        );
        assert!("debug-2147483647".parse::<Level>().is_err());
        assert!("info+99999999999".parse::<Level>().is_err());
        assert_eq!(
            "info+2147483647".parse::<Level>().unwrap(),
            Level::new(i32::MAX)
        );
    }

    #[test]
    fn offset_saturates() {
        assert_eq!(Level::ERROR.offset(i32::MAX), Level::new(i32::MAX));
        assert_eq!(Level::DEBUG.offset(i32::MIN), Level::new(i32::MIN));
    }

    #[test]
    fn level_var_is_shared_between_clones() {
        let var = LevelVar::new(Level::INFO);
        let derived = var.clone();
        derived.set(Level::ERROR);
        assert_eq!(var.level(), Level::ERROR);
    }
}
