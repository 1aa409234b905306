use std::io;
use std::time::Instant;
use tracing::error;

use tinted_log::{init_tracing, Handler, HandlerOptions};

fn main() {
    // Discard output so the run measures formatting, not the terminal.
    let handler = Handler::new(io::sink(), HandlerOptions::default());
    if let Err(e) = init_tracing(handler) {
        eprintln!("failed to install subscriber: {}", e);
        return;
    }

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, path = "/api/users", "default load test error");
    }

    let elapsed = start.elapsed();
    println!(
        "sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
