use async_trait::async_trait;
use bollard::{
    container::{
        CreateContainerOptions, LogsOptions, RemoveContainerOptions, WaitContainerOptions,
    },
    errors::Error as BollardError,
    image::CreateImageOptions,
};
use futures::StreamExt;
use stacked_errors::{Result, StackableErr};

use crate::{
    engine::{ContainerEngine, ContainerOutput, Effect, PullProgress},
    ContainerSpec,
};

/// [ContainerEngine] backed by the docker API through [bollard]
#[derive(Debug, Clone)]
pub struct BollardEngine {
    docker: bollard::Docker,
}

impl BollardEngine {
    pub fn new(docker: bollard::Docker) -> Self {
        Self { docker }
    }

    /// Connects using `DOCKER_HOST` or the platform default socket
    pub async fn connect() -> Result<Self> {
        // the connection setup does blocking filesystem work
        let docker =
            tokio::task::spawn_blocking(|| bollard::Docker::connect_with_defaults().stack())
                .await
                .stack()??;
        Ok(Self::new(docker))
    }
}

/// Splits `repo[:tag]` into its repository and tag, defaulting to `latest`.
/// Passing an empty tag to the API would pull every tag of the repository.
pub(crate) fn split_image_ref(image: &str) -> (&str, &str) {
    if image.contains('@') {
        // digests go through `from_image` untouched
        return (image, "")
    }
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..(name_start + i)], &image[(name_start + i + 1)..]),
        None => (image, "latest"),
    }
}

fn status_code(err: &BollardError) -> Option<u16> {
    match err {
        BollardError::DockerResponseServerError { status_code, .. } => Some(*status_code),
        _ => None,
    }
}

#[async_trait]
impl ContainerEngine for BollardEngine {
    fn pull_image(&self, image: &str) -> PullProgress {
        let (from_image, tag) = split_image_ref(image);
        Box::pin(
            self.docker
                .create_image(
                    Some(CreateImageOptions {
                        from_image: from_image.to_owned(),
                        tag: tag.to_owned(),
                        ..Default::default()
                    }),
                    None,
                    None,
                )
                .map(|info| info.stack_err("BollardEngine::pull_image")),
        )
    }

    async fn container_exists(&self, name: &str) -> Result<bool> {
        match self.docker.inspect_container(name, None).await {
            Ok(_) => Ok(true),
            Err(err) if status_code(&err) == Some(404) => Ok(false),
            Err(err) => Err(err).stack_err_with(|| format!("inspect_container({name})")),
        }
    }

    #[tracing::instrument(skip_all,
        fields(
            container.name = %spec.name,
        )
    )]
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: spec.name.clone(),
                    ..Default::default()
                }),
                spec.to_bollard_config(),
            )
            .await
            .stack_err("BollardEngine::create_container")?;
        for warning in &response.warnings {
            tracing::warn!("{warning}");
        }
        tracing::debug!(container.id = %response.id);
        Ok(response.id)
    }

    async fn start_container(&self, container: &str) -> Result<()> {
        self.docker
            .start_container::<String>(container, None)
            .await
            .stack_err_with(|| format!("start_container({container})"))
    }

    async fn wait_container(&self, container: &str) -> Result<i64> {
        let mut wait = self.docker.wait_container(
            container,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );
        let item = wait
            .next()
            .await
            .stack_err_with(|| format!("wait_container({container}) -> stream ended early"))?;
        match item {
            Ok(response) => Ok(response.status_code),
            // nonzero exit codes manifest as a bollard error instead of a response
            Err(BollardError::DockerContainerWaitError { code, error }) => {
                if !error.is_empty() {
                    tracing::debug!("container wait error: {error}");
                }
                Ok(code)
            }
            Err(err) => Err(err).stack_err_with(|| format!("wait_container({container})")),
        }
    }

    async fn stop_container(&self, container: &str) -> Result<Effect> {
        match self.docker.stop_container(container, None).await {
            Ok(()) => Ok(Effect::Changed),
            // 304 is "already stopped", 404 is "no such container"
            Err(err) if matches!(status_code(&err), Some(304 | 404)) => {
                tracing::debug!("stop_container({container}) had no effect: {err}");
                Ok(Effect::Unchanged)
            }
            Err(err) => Err(err).stack_err_with(|| format!("stop_container({container})")),
        }
    }

    async fn remove_container(&self, container: &str, force: bool) -> Result<Effect> {
        match self
            .docker
            .remove_container(
                container,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => Ok(Effect::Changed),
            Err(err) if status_code(&err) == Some(404) => {
                tracing::debug!("remove_container({container}) had no effect: {err}");
                Ok(Effect::Unchanged)
            }
            Err(err) => Err(err).stack_err_with(|| format!("remove_container({container})")),
        }
    }

    fn container_logs(&self, container: &str) -> ContainerOutput {
        Box::pin(
            self.docker
                .logs(
                    container,
                    Some(LogsOptions::<String> {
                        stdout: true,
                        stderr: true,
                        follow: false,
                        ..Default::default()
                    }),
                )
                .map(|output| output.stack_err("BollardEngine::container_logs")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::split_image_ref;

    #[test]
    fn image_refs() {
        assert_eq!(split_image_ref("gristlabs/grist"), ("gristlabs/grist", "latest"));
        assert_eq!(split_image_ref("gristlabs/grist:1.2"), ("gristlabs/grist", "1.2"));
        assert_eq!(
            split_image_ref("localhost:5000/grist"),
            ("localhost:5000/grist", "latest")
        );
        assert_eq!(
            split_image_ref("localhost:5000/grist:dev"),
            ("localhost:5000/grist", "dev")
        );
        assert_eq!(
            split_image_ref("grist@sha256:abcd"),
            ("grist@sha256:abcd", "")
        );
    }
}
