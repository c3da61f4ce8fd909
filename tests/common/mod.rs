// Shared between the run and cleaner test binaries; each uses a subset.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use demobox::{
    ContainerSpec, ContainerSummary, ImageSummary, RemovedImage, Runtime, RuntimeError,
};

/// In-memory engine double. Records every call in order and can be told to
/// fail a given operation or to never resolve a wait.
#[derive(Default)]
pub struct MockRuntime {
    pub images: Vec<ImageSummary>,
    pub containers: Vec<ContainerSummary>,
    pub exit_code: i64,
    pub wait_forever: bool,
    pub logs: Vec<u8>,
    fail: HashSet<&'static str>,
    calls: Mutex<Vec<String>>,
    specs: Mutex<Vec<ContainerSpec>>,
}

pub const MOCK_ID: &str = "c0ffee";

impl MockRuntime {
    pub fn new() -> Self {
        MockRuntime {
            logs: b"hello\n".to_vec(),
            ..Default::default()
        }
    }

    pub fn failing(mut self, op: &'static str) -> Self {
        self.fail.insert(op);
        self
    }

    pub fn with_exit_code(mut self, code: i64) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_logs(mut self, logs: &[u8]) -> Self {
        self.logs = logs.to_vec();
        self
    }

    pub fn waiting_forever(mut self) -> Self {
        self.wait_forever = true;
        self
    }

    pub fn with_image(mut self, image: ImageSummary) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_container(mut self, container: ContainerSummary) -> Self {
        self.containers.push(container);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, op: &'static str) -> Result<(), RuntimeError> {
        if self.fail.contains(op) {
            Err(RuntimeError::Other(format!("{op} refused")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Runtime for MockRuntime {
    async fn create_container(
        &self,
        spec: &ContainerSpec,
        name: &str,
    ) -> Result<String, RuntimeError> {
        self.record(format!("create:{name}"));
        self.check("create")?;
        self.specs.lock().unwrap().push(spec.clone());
        Ok(MOCK_ID.to_string())
    }

    async fn start_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(format!("start:{id}"));
        self.check("start")
    }

    async fn stop_container(&self, id: &str, grace_secs: i64) -> Result<(), RuntimeError> {
        self.record(format!("stop:{id}:{grace_secs}"));
        self.check("stop")
    }

    async fn remove_container(&self, id: &str, force: bool) -> Result<(), RuntimeError> {
        self.record(format!("remove_container:{id}:{force}"));
        self.check("remove_container")
    }

    async fn wait_not_running(&self, id: &str) -> Result<i64, RuntimeError> {
        self.record(format!("wait:{id}"));
        self.check("wait")?;
        if self.wait_forever {
            std::future::pending::<()>().await;
        }
        Ok(self.exit_code)
    }

    async fn fetch_logs(&self, id: &str, tail: Option<i64>) -> Result<Vec<u8>, RuntimeError> {
        let tail = tail.map(|t| t.to_string()).unwrap_or_else(|| "all".into());
        self.record(format!("logs:{id}:{tail}"));
        self.check("logs")?;
        Ok(self.logs.clone())
    }

    async fn list_images(&self, all: bool) -> Result<Vec<ImageSummary>, RuntimeError> {
        self.record(format!("list_images:{all}"));
        self.check("list_images")?;
        Ok(self.images.clone())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, RuntimeError> {
        self.record(format!("list_containers:{all}"));
        self.check("list_containers")?;
        Ok(self.containers.clone())
    }

    async fn remove_image(
        &self,
        id: &str,
        force: bool,
        prune_children: bool,
    ) -> Result<Vec<RemovedImage>, RuntimeError> {
        self.record(format!("remove_image:{id}:{force}:{prune_children}"));
        self.check("remove_image")?;
        Ok(vec![RemovedImage {
            deleted: Some(id.to_string()),
            untagged: None,
        }])
    }

    async fn commit_container(&self, id: &str, reference: &str) -> Result<(), RuntimeError> {
        self.record(format!("commit:{id}:{reference}"));
        self.check("commit")
    }
}

/// Unix timestamp `secs` seconds in the past.
pub fn ago(secs: u64) -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
        - secs as i64
}
