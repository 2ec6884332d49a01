use stacked_errors::{Result, StackableErr};

/// Listens for SIGINT or SIGTERM (ctrl-c on platforms without unix signals).
///
/// The handlers are installed by [Termination::register], so a signal that
/// arrives before [Termination::recv] is polled is still delivered instead of
/// killing the process.
#[derive(Debug)]
pub struct Termination {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Termination {
    /// Must be called from within a tokio runtime
    pub fn register() -> Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())
                    .stack_err("Termination::register -> SIGINT")?,
                terminate: signal(SignalKind::terminate())
                    .stack_err("Termination::register -> SIGTERM")?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Resolves once the first termination signal arrives
    pub async fn recv(&mut self) -> Result<()> {
        let name = self.recv_named().await.stack()?;
        tracing::info!("received {name}");
        Ok(())
    }

    async fn recv_named(&mut self) -> Result<&'static str> {
        #[cfg(unix)]
        {
            Ok(tokio::select! {
                _ = self.interrupt.recv() => "SIGINT",
                _ = self.terminate.recv() => "SIGTERM",
            })
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c()
                .await
                .stack_err("Failed to wait for ctrlc")?;
            Ok("ctrl-c")
        }
    }
}
