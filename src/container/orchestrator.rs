use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use regex::bytes::Regex;
use tracing::{debug, info, warn};

use super::types::{RunOutput, run_spec, start_spec};
use super::wait;
use crate::error::Error;
use crate::options::Options;
use crate::runtime::Runtime;

/// Grace period handed to the engine when stopping a finished container.
const STOP_GRACE_SECS: i64 = 2;

/// Log lines fetched by the watcher when a container exits non-zero.
const WATCHER_LOG_TAIL: i64 = 10;

/// Drives the lifecycle of one ephemeral container per call: synchronous
/// run-to-completion or asynchronous start with a detached completion
/// watcher.
#[derive(Debug, Clone)]
pub struct Orchestrator<R: Runtime> {
    runtime: Arc<R>,
}

impl<R: Runtime + 'static> Orchestrator<R> {
    pub fn new(runtime: R) -> Self {
        Orchestrator {
            runtime: Arc::new(runtime),
        }
    }

    pub fn with_runtime(runtime: Arc<R>) -> Self {
        Orchestrator { runtime }
    }

    /// Runs the container to completion and returns its exit code and
    /// captured output.
    ///
    /// The wait is bounded by the `timeout` option (seconds; 0 or absent
    /// means unbounded). A fired timeout is not an error: the exit code is
    /// reported as [`wait::EXIT_CODE_UNKNOWN`] and log retrieval and cleanup
    /// still happen. Stop and remove failures after the output is in hand
    /// are logged, never returned.
    pub async fn run(
        &self,
        image: &str,
        name: &str,
        cmd: &[String],
        options: &Options,
        bind_paths: &[String],
    ) -> Result<RunOutput, Error> {
        let build = run_spec(image, cmd, options, bind_paths);

        let id = self
            .runtime
            .create_container(&build.spec, name)
            .await
            .map_err(Error::Create)?;

        let started = Instant::now();
        info!(container_id = %id, cmd = %build.display_cmd, "run docker container");

        self.runtime
            .start_container(&id)
            .await
            .map_err(|source| Error::Start {
                id: id.clone(),
                source,
            })?;

        let timeout = options.timeout_secs();
        let outcome = if timeout > 0 {
            wait::wait_with_timeout(
                self.runtime.as_ref(),
                &id,
                Duration::from_secs(timeout as u64),
            )
            .await
        } else {
            wait::wait(self.runtime.as_ref(), &id).await
        };
        debug!(
            container_id = %id,
            exit_code = outcome.exit_code,
            duration = ?outcome.elapsed,
            "container wait",
        );
        if let Some(source) = outcome.error {
            return Err(Error::Wait { id, source });
        }

        let output = match self.runtime.fetch_logs(&id, None).await {
            Ok(bytes) => strip_ansi(&bytes),
            Err(source) => {
                warn!(container_id = %id, error = %source, "failed to get the logs from container");
                return Err(Error::Logs { id, source });
            }
        };

        if let Err(e) = self.runtime.stop_container(&id, STOP_GRACE_SECS).await {
            warn!(container_id = %id, error = %e, "failed to stop the container");
            return Ok(RunOutput {
                exit_code: outcome.exit_code,
                output,
            });
        }

        if let Err(e) = self.runtime.remove_container(&id, true).await {
            warn!(container_id = %id, error = %e, "failed to remove the container");
        }

        info!(
            image_name = %image,
            container_id = %id,
            container_name = %name,
            exit_code = outcome.exit_code,
            duration = ?started.elapsed(),
            "run docker container successfully",
        );

        Ok(RunOutput {
            exit_code: outcome.exit_code,
            output,
        })
    }

    /// Creates and starts the container, then returns its id immediately.
    ///
    /// A detached watcher task waits unbounded for completion and emits a
    /// structured record with the exit code and duration; on non-zero exit
    /// it also carries the last log lines. The watcher cannot be cancelled
    /// and its outcome is observable only through that record.
    pub async fn start(
        &self,
        image: &str,
        name: &str,
        auto_remove: bool,
        cmd: &[String],
        options: &Options,
        bind_paths: &[String],
    ) -> Result<String, Error> {
        let build = start_spec(image, auto_remove, cmd, options, bind_paths);

        info!(cmd = %build.display_cmd, "start the docker container");
        let started = Instant::now();

        let id = match self.runtime.create_container(&build.spec, name).await {
            Ok(id) => id,
            Err(source) => {
                warn!(container_name = %name, error = %source, "failed to create the container");
                return Err(Error::Create(source));
            }
        };

        if let Err(source) = self.runtime.start_container(&id).await {
            warn!(container_id = %id, error = %source, "failed to start the container");
            return Err(Error::Start { id, source });
        }

        self.spawn_watcher(
            id.clone(),
            image.to_string(),
            name.to_string(),
            build.display_cmd,
        );

        info!(container_id = %id, duration = ?started.elapsed(), "start the docker container successfully");
        Ok(id)
    }

    fn spawn_watcher(&self, id: String, image: String, name: String, display_cmd: String) {
        let runtime = Arc::clone(&self.runtime);
        tokio::spawn(async move {
            let outcome = wait::wait(runtime.as_ref(), &id).await;

            if outcome.exit_code != 0 {
                let excerpt = match runtime.fetch_logs(&id, Some(WATCHER_LOG_TAIL)).await {
                    Ok(bytes) => String::from_utf8_lossy(&strip_ansi(&bytes)).into_owned(),
                    Err(_) => String::new(),
                };
                let wait_error = outcome
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                info!(
                    container_id = %id,
                    exit_code = outcome.exit_code,
                    duration = ?outcome.elapsed,
                    image_name = %image,
                    container_name = %name,
                    cmd = %display_cmd,
                    container_log = %excerpt,
                    error = %wait_error,
                    "docker container stopped",
                );
            } else {
                info!(
                    container_id = %id,
                    exit_code = outcome.exit_code,
                    duration = ?outcome.elapsed,
                    image_name = %image,
                    container_name = %name,
                    cmd = %display_cmd,
                    "docker container stopped",
                );
            }
        });
    }

    /// Fetches container stdout with color codes stripped, optionally
    /// limited to the last `tail` lines.
    pub async fn logs(&self, id: &str, tail: Option<i64>) -> Result<Vec<u8>, Error> {
        match self.runtime.fetch_logs(id, tail).await {
            Ok(bytes) => Ok(strip_ansi(&bytes)),
            Err(source) => Err(Error::Logs {
                id: id.to_string(),
                source,
            }),
        }
    }

    /// Force-removes a container. An empty id is a no-op.
    pub async fn remove(&self, id: &str) -> Result<(), Error> {
        if id.is_empty() {
            return Ok(());
        }

        let started = Instant::now();
        if let Err(source) = self.runtime.remove_container(id, true).await {
            warn!(container_id = %id, error = %source, "failed to remove the container");
            return Err(Error::Remove {
                id: id.to_string(),
                source,
            });
        }

        info!(container_id = %id, duration = ?started.elapsed(), "remove the container successfully");
        Ok(())
    }

    /// Commits the container as a new image reference. Empty id or
    /// reference is a no-op.
    pub async fn commit(&self, id: &str, reference: &str) -> Result<(), Error> {
        if id.is_empty() || reference.is_empty() {
            return Ok(());
        }

        self.runtime
            .commit_container(id, reference)
            .await
            .map_err(|source| Error::Commit {
                id: id.to_string(),
                source,
            })
    }
}

/// Strips ANSI escape sequences (terminal color codes) from captured output.
pub(crate) fn strip_ansi(bytes: &[u8]) -> Vec<u8> {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    let re = ANSI.get_or_init(|| {
        Regex::new(r"(?-u)[\x1b\x9b][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-PRZcf-nqry=><]")
            .unwrap()
    });
    re.replace_all(bytes, &b""[..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::strip_ansi;

    #[test]
    fn strips_color_codes() {
        let colored = b"\x1b[31mred\x1b[0m plain \x1b[1;32mbold green\x1b[0m";
        assert_eq!(strip_ansi(colored), b"red plain bold green".to_vec());
    }

    #[test]
    fn leaves_plain_output_untouched() {
        let plain = b"nothing fancy\nsecond line";
        assert_eq!(strip_ansi(plain), plain.to_vec());
    }

    #[test]
    fn strips_cursor_movement() {
        let moved = b"\x1b[2Jcleared\x1b[H";
        assert_eq!(strip_ansi(moved), b"cleared".to_vec());
    }
}
