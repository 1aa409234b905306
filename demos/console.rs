use std::sync::Arc;
use std::time::{Duration, Instant};

use tinted_log::{
    Attr, ErrorMessage, Level, LeveledLogger, Logger, Options, QueryLogLevel, QueryTracer,
    Severity, Value,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log = Logger::new(Options::from_env()?.with_level(Level::DEBUG))?;

    log.info(
        "Starting server",
        &["addr".into(), ":8080".into(), "env".into(), "production".into()],
    )?;
    log.debug(
        "Connected to DB",
        &["db".into(), "myapp".into(), "host".into(), "localhost:5432".into()],
    )?;
    log.warn(
        "Slow request",
        &[
            "method".into(),
            "GET".into(),
            "path".into(),
            "/users".into(),
            "duration".into(),
            Duration::from_millis(497).into(),
        ],
    )?;
    let reset = Value::Error(Arc::new(ErrorMessage("connection reset".into())));
    log.error("DB connection lost", &["err".into(), reset, "db".into(), "myapp".into()])?;
    log.log_at(Level::WARN.offset(2), "custom level", &[])?;

    let request = log.with_group("request").with_attrs(&[Attr::string("id", "a1b2")]);
    request.info("handled", &["status".into(), 200.into()])?;

    log.log(Severity::Info, &["msg".into(), "from a leveled logger".into()])?;

    let db = log.log_mode(QueryLogLevel::Info);
    db.trace(Instant::now(), || ("SELECT * FROM users WHERE id = 1".into(), 1), None)?;

    log.set_level("warn")?;
    log.info("not shown", &[])?;
    request.warn("shown, the level is shared", &[])?;

    log.flush()?;
    Ok(())
}
