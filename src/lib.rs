//! Ephemeral Docker container orchestration.
//!
//! `demobox` launches a container from an image with a declarative option set,
//! waits for (or backgrounds) its completion, retrieves its output, and tears
//! it down. A separate [`ImageCleaner`] evicts stale demo images together with
//! their leftover containers.
//!
//! The Docker daemon is reached through the [`Runtime`] trait; the bundled
//! [`DockerRuntime`] implements it on top of bollard.
//!
//! ```ignore
//! use demobox::{DockerRuntime, Options, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = DockerRuntime::connect()?;
//!     let orchestrator = Orchestrator::new(runtime);
//!
//!     let options = Options::new()
//!         .with_str_list(demobox::options::ENV, ["GREETING=hi"])
//!         .with_int(demobox::options::TIMEOUT, 30);
//!
//!     let outcome = orchestrator
//!         .run("alpine:3.20", "", &["echo".into(), "hi".into()], &options, &[])
//!         .await?;
//!     println!("exit {}: {}", outcome.exit_code, String::from_utf8_lossy(&outcome.output));
//!     Ok(())
//! }
//! ```

pub mod cleaner;
pub mod container;
pub mod error;
pub mod options;
pub mod runtime;

pub use cleaner::ImageCleaner;
pub use container::{EXIT_CODE_UNKNOWN, Orchestrator, RunOutput, WaitOutcome};
pub use error::{Error, RuntimeError};
pub use options::Options;
pub use runtime::{
    ContainerSpec, ContainerSummary, DockerRuntime, ImageSummary, PortSpec, RemovedImage, Runtime,
};
