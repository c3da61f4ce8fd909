use async_trait::async_trait;

use crate::error::RuntimeError;

/// Everything the orchestrator and the image cleaner need from a container
/// engine. Implemented for Docker by [`super::DockerRuntime`]; tests provide
/// their own mock.
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Creates a container and returns its id. An empty `name` lets the
    /// engine pick one.
    async fn create_container(
        &self,
        spec: &ContainerSpec,
        name: &str,
    ) -> Result<String, RuntimeError>;

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError>;

    async fn stop_container(&self, id: &str, grace_secs: i64) -> Result<(), RuntimeError>;

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError>;

    /// Blocks until the container is no longer running and yields its exit
    /// code. An error reported inside the wait response surfaces as
    /// [`RuntimeError::Wait`].
    async fn wait_not_running(&self, id: &str) -> Result<i64, RuntimeError>;

    /// Raw stdout bytes, optionally limited to the last `tail` lines.
    async fn fetch_logs(&self, id: &str, tail: Option<i64>) -> Result<Vec<u8>, RuntimeError>;

    async fn list_images(&self, all: bool) -> Result<Vec<ImageSummary>, RuntimeError>;

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError>;

    async fn remove_image(
        &self,
        id: &str,
        force: bool,
        prune_children: bool,
    ) -> Result<Vec<RemovedImage>, RuntimeError>;

    async fn commit_container(&self, id: &str, reference: &str) -> Result<(), RuntimeError>;
}

/// Engine-agnostic container creation request, assembled by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    pub image: String,
    pub cmd: Vec<String>,
    pub env: Vec<String>,
    pub tty: bool,
    pub working_dir: Option<String>,
    /// Parsed from the `ports` option; see [`parse_port_specs`].
    pub ports: Vec<PortSpec>,
    /// Bind mounts as (source, target) pairs.
    pub mounts: Vec<(String, String)>,
    pub cpuset: Option<String>,
    /// Hard memory ceiling in bytes.
    pub memory: Option<i64>,
    /// -1 means unlimited swap.
    pub memory_swap: Option<i64>,
    pub extra_hosts: Vec<String>,
    pub network_mode: Option<String>,
    pub auto_remove: bool,
}

/// One parsed port spec: an exposed container port plus its host binding.
/// An empty `host_port` leaves the host side to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    /// `port/proto`, e.g. `"80/tcp"`.
    pub container_port: String,
    pub host_port: String,
}

/// Read-only view over an engine image list entry.
#[derive(Debug, Clone)]
pub struct ImageSummary {
    pub id: String,
    pub repo_tags: Vec<String>,
    /// Creation time, seconds since the Unix epoch.
    pub created: i64,
}

/// Read-only view over an engine container list entry.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: String,
    pub image_id: String,
    /// Engine state string, `"running"` for live containers.
    pub state: String,
    /// Creation time, seconds since the Unix epoch.
    pub created: i64,
}

/// One entry of an image removal response.
#[derive(Debug, Clone, Default)]
pub struct RemovedImage {
    pub deleted: Option<String>,
    pub untagged: Option<String>,
}

/// Parses `hostPort:containerPort[/proto]` or `containerPort[/proto]` specs.
/// Malformed entries are silently dropped rather than failing the call.
pub fn parse_port_specs(specs: &[String]) -> Vec<PortSpec> {
    specs.iter().filter_map(|s| parse_port_spec(s)).collect()
}

fn parse_port_spec(spec: &str) -> Option<PortSpec> {
    let (ports, proto) = match spec.split_once('/') {
        Some((ports, proto)) => (ports, proto),
        None => (spec, "tcp"),
    };
    if !matches!(proto, "tcp" | "udp" | "sctp") {
        return None;
    }

    let (host, container) = match ports.split_once(':') {
        Some((host, container)) => (host, container),
        None => ("", ports),
    };

    container.parse::<u16>().ok()?;
    if !host.is_empty() {
        host.parse::<u16>().ok()?;
    }

    Some(PortSpec {
        container_port: format!("{container}/{proto}"),
        host_port: host.to_string(),
    })
}
