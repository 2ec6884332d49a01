//! Launches the `gristlabs/grist` image as a single named container through
//! the docker API, and tears it down again on SIGINT or SIGTERM.
//!
//! The container engine is abstracted behind [ContainerEngine] so the
//! lifecycle in [Launcher] can be driven against something other than a live
//! docker daemon.

mod config;
mod container_spec;
/// The container engine seam and its [bollard] implementation
pub mod engine;
mod lifecycle;
mod paths;
mod signal;

pub use config::*;
pub use container_spec::*;
pub use engine::{BollardEngine, ContainerEngine, Effect};
pub use lifecycle::*;
pub use paths::*;
pub use signal::*;
/// This reexport helps with dependency wrangling
pub use stacked_errors;
