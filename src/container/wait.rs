use std::time::{Duration, Instant};

use crate::{error::RuntimeError, runtime::Runtime};

/// Exit code reported when the real one is unknown: the wait timed out or
/// errored before the container signalled completion.
pub const EXIT_CODE_UNKNOWN: i64 = -1;

/// Result of one wait on a container.
#[derive(Debug)]
pub struct WaitOutcome {
    pub exit_code: i64,
    pub error: Option<RuntimeError>,
    pub elapsed: Duration,
}

/// Blocks until the container is no longer running.
pub async fn wait<R: Runtime + ?Sized>(runtime: &R, id: &str) -> WaitOutcome {
    let start = Instant::now();
    let result = runtime.wait_not_running(id).await;
    finish(result, start)
}

/// Races the wait against a timer. Exactly one branch wins; the loser is
/// dropped. A fired timer leaves the exit code at [`EXIT_CODE_UNKNOWN`] and
/// does not cancel the underlying wait, so the container may still be running
/// when the caller moves on.
pub async fn wait_with_timeout<R: Runtime + ?Sized>(
    runtime: &R,
    id: &str,
    timeout: Duration,
) -> WaitOutcome {
    let start = Instant::now();
    tokio::select! {
        result = runtime.wait_not_running(id) => finish(result, start),
        _ = tokio::time::sleep(timeout) => WaitOutcome {
            exit_code: EXIT_CODE_UNKNOWN,
            error: None,
            elapsed: start.elapsed(),
        },
    }
}

fn finish(result: Result<i64, RuntimeError>, start: Instant) -> WaitOutcome {
    match result {
        Ok(exit_code) => WaitOutcome {
            exit_code,
            error: None,
            elapsed: start.elapsed(),
        },
        Err(err) => WaitOutcome {
            exit_code: EXIT_CODE_UNKNOWN,
            error: Some(err),
            elapsed: start.elapsed(),
        },
    }
}
