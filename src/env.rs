//! Environment variable names read by [`Options::from_env`](crate::logger::Options::from_env).
//!
//! These are purely helpers; the handler itself never touches the
//! environment.

/// Minimum level, e.g. `debug`, `warn+2`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// `console`, `stderr` or `file`.
pub const LOG_OUTPUT_ENV: &str = "LOG_OUTPUT";

/// Directory for file output.
pub const LOG_FILEPATH_ENV: &str = "LOG_FILEPATH";

/// File name prefix for file output.
pub const LOG_FILENAME_PREFIX_ENV: &str = "LOG_FILENAME_PREFIX";

/// `minutely`, `hourly`, `daily` or `never`.
pub const LOG_ROTATION_ENV: &str = "LOG_ROTATION";

/// Number of rotated files to keep; `0` keeps all of them.
pub const LOG_MAX_FILES_ENV: &str = "LOG_MAX_FILES";

/// strftime pattern for the time field.
pub const LOG_TIME_FORMAT_ENV: &str = "LOG_TIME_FORMAT";

/// Any non-empty value other than `0` or `false` disables color.
pub const LOG_NO_COLOR_ENV: &str = "LOG_NO_COLOR";

/// Whether to write call-site locations; `true` or `false`.
pub const LOG_ADD_SOURCE_ENV: &str = "LOG_ADD_SOURCE";

/// Interpret a flag value. Empty, `0`, `false`, `no` and `off` are false.
pub fn flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}
