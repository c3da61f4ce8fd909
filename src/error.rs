use thiserror::Error;

/// Errors surfaced by a [`crate::runtime::Runtime`] implementation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to connect to the container runtime: {0}")]
    Connection(String),

    #[error(transparent)]
    Api(#[from] bollard::errors::Error),

    /// Error reported in the body of a wait response rather than on the
    /// transport itself.
    #[error("container wait reported an error: {0}")]
    Wait(String),

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the orchestrator and the image cleaner.
///
/// A wait timeout is not an error; it is reported through the sentinel
/// exit code [`crate::EXIT_CODE_UNKNOWN`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create the container")]
    Create(#[source] RuntimeError),

    #[error("failed to start the container {id}")]
    Start {
        id: String,
        #[source]
        source: RuntimeError,
    },

    #[error("error while waiting on container {id}")]
    Wait {
        id: String,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to get the logs from container {id}")]
    Logs {
        id: String,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to remove the container {id}")]
    Remove {
        id: String,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to commit the container {id}")]
    Commit {
        id: String,
        #[source]
        source: RuntimeError,
    },

    #[error("failed to list the docker images")]
    ImageList(#[source] RuntimeError),
}
