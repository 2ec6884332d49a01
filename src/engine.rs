mod bollard_engine;
#[cfg(test)]
pub(crate) mod recording;

use std::pin::Pin;

use async_trait::async_trait;
pub use bollard::{container::LogOutput, secret::CreateImageInfo};
pub use bollard_engine::*;
use stacked_errors::Result;

use crate::ContainerSpec;

pub type PullProgress =
    Pin<Box<dyn futures::stream::Stream<Item = Result<CreateImageInfo>> + Send>>;

pub type ContainerOutput = Pin<Box<dyn futures::stream::Stream<Item = Result<LogOutput>> + Send>>;

/// What a stop or remove request actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    /// The container was running (stop) or existed (remove)
    #[default]
    Changed,
    /// The container was already stopped or already gone
    Unchanged,
}

/// The container engine operations the launcher needs. [BollardEngine] talks to
/// a real docker daemon, tests use a recording fake.
///
/// Containers are addressed by name or by the engine issued id, the engine
/// accepts either.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Starts fetching `image` and returns the progress records. The pull is
    /// finished once the stream ends.
    fn pull_image(&self, image: &str) -> PullProgress;

    /// Returns whether a container called `name` exists in any state
    async fn container_exists(&self, name: &str) -> Result<bool>;

    /// Creates the container and returns its id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    async fn start_container(&self, container: &str) -> Result<()>;

    /// Blocks until the container is no longer running and returns its exit
    /// code. A nonzero exit code is not an error.
    async fn wait_container(&self, container: &str) -> Result<i64>;

    /// Stops the container using the engine's default grace period
    async fn stop_container(&self, container: &str) -> Result<Effect>;

    async fn remove_container(&self, container: &str, force: bool) -> Result<Effect>;

    /// Everything the container wrote to stdout and stderr so far. Does not
    /// follow.
    fn container_logs(&self, container: &str) -> ContainerOutput;
}
