use std::future::Future;

use futures::StreamExt;
use stacked_errors::{Result, StackableErr};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::{
    engine::{ContainerEngine, Effect, LogOutput},
    ContainerSpec,
};

/// Where pull progress and container output end up
#[derive(Debug)]
pub struct Relay<O, E> {
    pub stdout: O,
    pub stderr: E,
}

impl Relay<tokio::io::Stdout, tokio::io::Stderr> {
    /// Relays to the process's own stdout and stderr
    pub fn stdio() -> Self {
        Self {
            stdout: tokio::io::stdout(),
            stderr: tokio::io::stderr(),
        }
    }
}

/// How a [Launcher::run] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The container stopped by itself and its logs were relayed
    Exited { status_code: i64 },
    /// A termination signal arrived while the container was running, it has
    /// been stopped and removed
    TornDown,
    /// A termination signal arrived while the image was being pulled, no
    /// container was created
    Interrupted,
}

/// The notice printed right before a successful exit, green when `colored`
pub fn exit_notice(colored: bool) -> String {
    if colored {
        owo_colors::OwoColorize::green(&"Exiting..").to_string()
    } else {
        "Exiting..".to_owned()
    }
}

/// Drives one container through pull, create, start, and then either its
/// natural exit or a signal triggered teardown.
#[derive(Debug)]
pub struct Launcher<'a, En: ?Sized> {
    engine: &'a En,
    spec: ContainerSpec,
    replace_existing: bool,
}

impl<'a, En: ContainerEngine + ?Sized> Launcher<'a, En> {
    pub fn new(engine: &'a En, spec: ContainerSpec) -> Self {
        Self {
            engine,
            spec,
            replace_existing: false,
        }
    }

    /// If set, a leftover container with the same name is force removed before
    /// creating. Otherwise creation fails on the name conflict.
    pub fn replace_existing(mut self, replace_existing: bool) -> Self {
        self.replace_existing = replace_existing;
        self
    }

    /// Runs the whole lifecycle. `shutdown` resolving is treated as the
    /// termination signal. Any engine error aborts immediately without rolling
    /// back earlier steps.
    ///
    /// Whichever of "container exited" and `shutdown` finishes first decides
    /// the outcome. The signal path never reads logs, the natural exit path
    /// never stops or removes.
    #[tracing::instrument(skip_all,
        fields(
            container.name = %self.spec.name,
        )
    )]
    pub async fn run<O, E>(
        &self,
        shutdown: impl Future<Output = Result<()>>,
        relay: &mut Relay<O, E>,
    ) -> Result<Outcome>
    where
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        tokio::pin!(shutdown);

        // polled in order so that an already finished step wins a tie
        tokio::select! {
            biased;
            res = self.pull_image(&mut relay.stdout) => res.stack()?,
            res = &mut shutdown => {
                res.stack()?;
                info!("interrupted while pulling {}", self.spec.image);
                return Ok(Outcome::Interrupted)
            }
        }

        if self.replace_existing
            && self
                .engine
                .container_exists(&self.spec.name)
                .await
                .stack()?
        {
            info!("removing existing container {}", self.spec.name);
            self.engine
                .remove_container(&self.spec.name, true)
                .await
                .stack()?;
        }

        tracing::debug!("Creating container");
        let id = self
            .engine
            .create_container(&self.spec)
            .await
            .stack_err("Launcher::run -> create")?;

        tracing::debug!("Starting container");
        self.engine
            .start_container(&id)
            .await
            .stack_err("Launcher::run -> start")?;

        let status_code = tokio::select! {
            biased;
            res = self.engine.wait_container(&id) => res.stack_err("Launcher::run -> wait")?,
            res = &mut shutdown => {
                res.stack()?;
                self.teardown().await.stack()?;
                return Ok(Outcome::TornDown)
            }
        };
        info!("container exited with status {status_code}");

        self.relay_logs(&id, relay).await.stack()?;

        Ok(Outcome::Exited { status_code })
    }

    /// Stop then remove, each exactly once. A container that already stopped
    /// or vanished counts as success.
    pub async fn teardown(&self) -> Result<()> {
        info!("Stopping the Grist container...");
        let name = &self.spec.name;
        if self.engine.stop_container(name).await.stack()? == Effect::Unchanged {
            info!("{name} was not running");
        }
        if self.engine.remove_container(name, false).await.stack()? == Effect::Unchanged {
            info!("{name} was already removed");
        }
        Ok(())
    }

    async fn pull_image<O: AsyncWrite + Unpin>(&self, stdout: &mut O) -> Result<()> {
        let mut progress = self.engine.pull_image(&self.spec.image);
        while let Some(info) = progress.next().await {
            let mut line = serde_json::to_vec(&info.stack()?).stack()?;
            line.push(b'\n');
            stdout.write_all(&line).await.stack()?;
        }
        stdout.flush().await.stack()
    }

    async fn relay_logs<O, E>(&self, container: &str, relay: &mut Relay<O, E>) -> Result<()>
    where
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let mut output = self.engine.container_logs(container);
        while let Some(output) = output.next().await {
            match output.stack()? {
                LogOutput::StdErr { message } => {
                    relay.stderr.write_all(&message).await.stack()?;
                }
                LogOutput::StdOut { message } | LogOutput::Console { message } => {
                    relay.stdout.write_all(&message).await.stack()?;
                }
                LogOutput::StdIn { .. } => (),
            }
        }
        relay.stdout.flush().await.stack()?;
        relay.stderr.flush().await.stack()
    }
}
