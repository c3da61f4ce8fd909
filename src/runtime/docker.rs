use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        Config, CreateContainerOptions, ListContainersOptions, LogsOptions,
        RemoveContainerOptions, StartContainerOptions, StopContainerOptions, WaitContainerOptions,
    },
    image::{CommitContainerOptions, ListImagesOptions, RemoveImageOptions},
    secret::{HostConfig, Mount, MountTypeEnum, PortBinding},
};
use futures_util::stream::StreamExt;

use super::types::{ContainerSpec, ContainerSummary, ImageSummary, RemovedImage, Runtime};
use crate::error::RuntimeError;

/// Bollard-backed [`Runtime`] talking to the local Docker daemon.
///
/// The connection is established once in [`DockerRuntime::connect`] and the
/// handle is passed explicitly to the orchestrator and cleaner; there is no
/// process-global client.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    /// Connects with the default unix socket settings.
    pub fn connect() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_unix_defaults()
            .map_err(|e| RuntimeError::Connection(e.to_string()))?;
        Ok(DockerRuntime { client })
    }

    /// Wraps an already-connected bollard client.
    pub fn from_client(client: Docker) -> Self {
        DockerRuntime { client }
    }
}

#[async_trait]
impl Runtime for DockerRuntime {
    async fn create_container(
        &self,
        spec: &ContainerSpec,
        name: &str,
    ) -> Result<String, RuntimeError> {
        let options = (!name.is_empty()).then(|| CreateContainerOptions {
            name: name.to_string(),
            ..Default::default()
        });

        let resp = self
            .client
            .create_container(options, container_config(spec))
            .await?;
        Ok(resp.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str, grace_secs: i64) -> Result<(), RuntimeError> {
        self.client
            .stop_container(id, Some(StopContainerOptions { t: grace_secs }))
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        self.client
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn wait_not_running(&self, id: &str) -> Result<i64, RuntimeError> {
        let mut stream = self.client.wait_container(
            id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );

        match stream.next().await {
            Some(Ok(response)) => match response.error {
                Some(err) => Err(RuntimeError::Wait(err.message.unwrap_or_default())),
                None => Ok(response.status_code),
            },
            Some(Err(e)) => Err(RuntimeError::Api(e)),
            None => Err(RuntimeError::Other(
                "wait stream closed without a response".to_string(),
            )),
        }
    }

    async fn fetch_logs(&self, id: &str, tail: Option<i64>) -> Result<Vec<u8>, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            tail: tail.map(|t| t.to_string()).unwrap_or_default(),
            ..Default::default()
        };

        let mut stream = self.client.logs(id, Some(options));
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk?.into_bytes());
        }
        Ok(bytes)
    }

    async fn list_images(&self, all: bool) -> Result<Vec<ImageSummary>, RuntimeError> {
        let images = self
            .client
            .list_images(Some(ListImagesOptions::<String> {
                all,
                ..Default::default()
            }))
            .await?;

        Ok(images
            .into_iter()
            .map(|image| ImageSummary {
                id: image.id,
                repo_tags: image.repo_tags,
                created: image.created,
            })
            .collect())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError> {
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                all,
                ..Default::default()
            }))
            .await?;

        Ok(containers
            .into_iter()
            .map(|container| ContainerSummary {
                id: container.id.unwrap_or_default(),
                image_id: container.image_id.unwrap_or_default(),
                state: container.state.unwrap_or_default(),
                created: container.created.unwrap_or_default(),
            })
            .collect())
    }

    async fn remove_image(
        &self,
        id: &str,
        force: bool,
        prune_children: bool,
    ) -> Result<Vec<RemovedImage>, RuntimeError> {
        let items = self
            .client
            .remove_image(
                id,
                Some(RemoveImageOptions {
                    force,
                    noprune: !prune_children,
                }),
                None,
            )
            .await?;

        Ok(items
            .into_iter()
            .map(|item| RemovedImage {
                deleted: item.deleted,
                untagged: item.untagged,
            })
            .collect())
    }

    async fn commit_container(&self, id: &str, reference: &str) -> Result<(), RuntimeError> {
        let (repo, tag) = split_reference(reference);

        self.client
            .commit_container(
                CommitContainerOptions::<String> {
                    container: id.to_string(),
                    repo,
                    tag,
                    ..Default::default()
                },
                Config::<String>::default(),
            )
            .await?;
        Ok(())
    }
}

/// Splits an image reference into (repository, tag). Only a colon after the
/// last slash separates a tag; a colon inside the registry host portion, as
/// in `registry.example.com:5000/demo`, stays part of the repository.
fn split_reference(reference: &str) -> (String, String) {
    match reference.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
        _ => (reference.to_string(), String::new()),
    }
}

fn container_config(spec: &ContainerSpec) -> Config<String> {
    let mounts: Vec<Mount> = spec
        .mounts
        .iter()
        .map(|(source, target)| Mount {
            typ: Some(MountTypeEnum::BIND),
            source: Some(source.clone()),
            target: Some(target.clone()),
            ..Default::default()
        })
        .collect();

    let mut host_config = HostConfig {
        mounts: (!mounts.is_empty()).then_some(mounts),
        auto_remove: spec.auto_remove.then_some(true),
        extra_hosts: (!spec.extra_hosts.is_empty()).then(|| spec.extra_hosts.clone()),
        network_mode: spec.network_mode.clone(),
        cpuset_cpus: spec.cpuset.clone(),
        memory: spec.memory,
        memory_swap: spec.memory_swap,
        ..Default::default()
    };

    let mut config = Config::<String> {
        image: Some(spec.image.clone()),
        cmd: (!spec.cmd.is_empty()).then(|| spec.cmd.clone()),
        env: (!spec.env.is_empty()).then(|| spec.env.clone()),
        tty: Some(spec.tty),
        working_dir: spec.working_dir.clone(),
        ..Default::default()
    };

    if !spec.ports.is_empty() {
        let mut exposed: HashMap<String, HashMap<(), ()>> = HashMap::new();
        let mut bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        for port in &spec.ports {
            exposed.insert(port.container_port.clone(), HashMap::new());
            bindings
                .entry(port.container_port.clone())
                .or_insert_with(|| Some(Vec::new()))
                .get_or_insert_with(Vec::new)
                .push(PortBinding {
                    host_ip: None,
                    host_port: Some(port.host_port.clone()),
                });
        }
        config.exposed_ports = Some(exposed);
        host_config.port_bindings = Some(bindings);
    }

    config.host_config = Some(host_config);
    config
}
