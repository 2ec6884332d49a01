use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use stacked_errors::{bail, Result};

use crate::{
    engine::{ContainerEngine, ContainerOutput, CreateImageInfo, Effect, LogOutput, PullProgress},
    ContainerSpec,
};

pub(crate) const FAKE_ID: &str = "0123456789ab";

/// Fake engine that records every call by name
#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<ContainerSpec>>,
    /// `None` makes `wait_container` block forever
    pub exit_code: Option<i64>,
    pub pull_hangs: bool,
    pub exists: bool,
    pub fail_create: bool,
    pub fail_stop: bool,
    pub stop_effect: Effect,
    pub remove_effect: Effect,
    pub logs: Vec<LogOutput>,
}

impl RecordingEngine {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

pub(crate) fn stdout(message: &str) -> LogOutput {
    LogOutput::StdOut {
        message: Bytes::copy_from_slice(message.as_bytes()),
    }
}

pub(crate) fn stderr(message: &str) -> LogOutput {
    LogOutput::StdErr {
        message: Bytes::copy_from_slice(message.as_bytes()),
    }
}

#[async_trait]
impl ContainerEngine for RecordingEngine {
    fn pull_image(&self, image: &str) -> PullProgress {
        self.record(format!("pull {image}"));
        if self.pull_hangs {
            return futures::stream::pending().boxed()
        }
        let progress = ["Pulling from gristlabs/grist", "Download complete"].map(|status| {
            Ok(CreateImageInfo {
                status: Some(status.to_owned()),
                ..Default::default()
            })
        });
        futures::stream::iter(progress).boxed()
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        self.record(format!("exists {name}"));
        Ok(self.exists)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        self.record(format!("create {}", spec.name));
        if self.fail_create {
            bail!("Conflict. The container name \"/{}\" is already in use", spec.name)
        }
        self.created.lock().unwrap().push(spec.clone());
        Ok(FAKE_ID.to_owned())
    }

    async fn start_container(&self, container: &str) -> Result<()> {
        self.record(format!("start {container}"));
        Ok(())
    }

    async fn wait_container(&self, container: &str) -> Result<i64> {
        self.record(format!("wait {container}"));
        match self.exit_code {
            Some(code) => Ok(code),
            None => futures::future::pending().await,
        }
    }

    async fn stop_container(&self, container: &str) -> Result<Effect> {
        self.record(format!("stop {container}"));
        if self.fail_stop {
            bail!("stop failed")
        }
        Ok(self.stop_effect)
    }

    async fn remove_container(&self, container: &str, force: bool) -> Result<Effect> {
        if force {
            self.record(format!("remove --force {container}"));
        } else {
            self.record(format!("remove {container}"));
        }
        Ok(self.remove_effect)
    }

    fn container_logs(&self, container: &str) -> ContainerOutput {
        self.record(format!("logs {container}"));
        futures::stream::iter(self.logs.clone().into_iter().map(Ok)).boxed()
    }
}
