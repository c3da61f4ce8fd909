// Container lifecycle — synchronous run, asynchronous start with a detached
// watcher, and the bounded/unbounded wait primitive.

pub mod orchestrator;
pub mod types;
pub mod wait;

pub use orchestrator::Orchestrator;
pub use types::RunOutput;
pub use wait::{EXIT_CODE_UNKNOWN, WaitOutcome, wait, wait_with_timeout};
