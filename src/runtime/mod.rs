// Runtime seam — the capability set the orchestrator and cleaner need from a
// container engine, plus the bollard-backed implementation.

pub mod docker;
pub mod types;

pub use docker::DockerRuntime;
pub use types::{
    ContainerSpec, ContainerSummary, ImageSummary, PortSpec, RemovedImage, Runtime,
    parse_port_specs,
};
