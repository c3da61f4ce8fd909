use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use regex::Regex;
use tracing::{info, warn};

use crate::error::Error;
use crate::runtime::Runtime;

/// Matches the ephemeral demo build naming scheme, `demo-<slug>.<hash>`.
fn demo_image_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"demo-([\w\-]+)?\.([a-z\d]+)?").unwrap())
}

/// Periodically evicts stale demo images together with their stopped
/// containers.
///
/// An image is only considered when it carries exactly one repo tag matching
/// the demo pattern and is older than the validity window. Any running
/// referencing container, any stopped one younger than the window, or any
/// failed container removal keeps the image. Callers running `clean` on an
/// overlapping schedule must serialize invocations themselves.
pub struct ImageCleaner<R: Runtime> {
    runtime: Arc<R>,
    invalid_duration: Duration,
    pub force_remove_containers: bool,
}

impl<R: Runtime> ImageCleaner<R> {
    pub fn new(runtime: R, invalid_duration: Duration) -> Self {
        ImageCleaner {
            runtime: Arc::new(runtime),
            invalid_duration,
            force_remove_containers: true,
        }
    }

    pub fn with_runtime(runtime: Arc<R>, invalid_duration: Duration) -> Self {
        ImageCleaner {
            runtime,
            invalid_duration,
            force_remove_containers: true,
        }
    }

    /// One eviction pass over all images. Per-image failures are logged and
    /// never abort the rest of the scan; only the initial image listing is
    /// fatal.
    pub async fn clean(&self) -> Result<(), Error> {
        let images = self
            .runtime
            .list_images(true)
            .await
            .map_err(Error::ImageList)?;

        for image in images {
            if image.repo_tags.len() != 1 || !demo_image_name().is_match(&image.repo_tags[0]) {
                continue;
            }
            if !self.image_needs_remove(&image.id, image.created).await {
                continue;
            }

            match self.runtime.remove_image(&image.id, true, true).await {
                Ok(items) => {
                    info!(
                        id = %image.id,
                        name = %image.repo_tags[0],
                        created = image.created,
                        "removed the image",
                    );
                    for (no, item) in items.iter().enumerate() {
                        info!(
                            no,
                            deleted = item.deleted.as_deref().unwrap_or_default(),
                            untagged = item.untagged.as_deref().unwrap_or_default(),
                            "removed the image response item",
                        );
                    }
                }
                Err(e) => {
                    warn!(
                        id = %image.id,
                        name = %image.repo_tags[0],
                        error = %e,
                        "failed to remove the image",
                    );
                }
            }
        }

        Ok(())
    }

    async fn image_needs_remove(&self, image_id: &str, created: i64) -> bool {
        if age_of(created) < self.invalid_duration {
            return false;
        }

        !self.has_valid_containers(image_id).await
    }

    /// True while anything blocks eviction: a running referencing container,
    /// a stopped one still inside the validity window, or a failed removal
    /// of a stale one. Listing failure counts as blocked.
    async fn has_valid_containers(&self, image_id: &str) -> bool {
        let containers = match self.runtime.list_containers(true).await {
            Ok(containers) => containers,
            Err(e) => {
                warn!(image_id = %image_id, error = %e, "failed to list the docker containers");
                return true;
            }
        };

        let mut removing = Vec::new();
        for container in containers {
            if container.image_id != image_id {
                continue;
            }

            if container.state == "running" {
                return true;
            }

            if age_of(container.created) > self.invalid_duration {
                removing.push(container.id);
            } else {
                return true;
            }
        }

        if self.force_remove_containers {
            let mut all_removed = true;
            for id in &removing {
                if let Err(e) = self.runtime.remove_container(id, true).await {
                    all_removed = false;
                    warn!(id = %id, error = %e, "failed to remove the container");
                }
            }
            if !all_removed {
                return true;
            }
        }

        false
    }
}

fn age_of(created_unix_secs: i64) -> Duration {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    Duration::from_secs(now.saturating_sub(created_unix_secs).max(0) as u64)
}
