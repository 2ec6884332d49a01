use std::path::PathBuf;

use stacked_errors::{Result, StackableErr};
use tracing::info;

use crate::paths::{absolute_dir_path, ensure_dir_path};

/// Used for `GRIST_DEFAULT_EMAIL` when no usable email was given
pub const DEFAULT_EMAIL: &str = "test@example.com";
/// Emails shorter than this many bytes are replaced by [DEFAULT_EMAIL]
pub const MIN_EMAIL_LEN: usize = 5;
/// Name of the directory created under the user's home when `--dir` is absent
pub const DEFAULT_DIR_NAME: &str = "grist";

/// Fully resolved launch settings. Nothing in here changes after
/// [LaunchConfig::resolve] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Host directory that gets bind mounted into the container
    pub host_dir: PathBuf,
    /// Passed to the container as `GRIST_DEFAULT_EMAIL`
    pub email: String,
}

impl LaunchConfig {
    /// Resolves the optional `dir` and `email` inputs.
    ///
    /// - An `email` that is missing or shorter than [MIN_EMAIL_LEN] bytes
    ///   becomes [DEFAULT_EMAIL].
    /// - A `dir` that is missing or empty becomes `<home>/grist`, which is
    ///   created if needed. `home` must be `Some` in that case, otherwise this
    ///   returns an error before any container work can happen.
    /// - A given `dir` is only made absolute, it is not checked or created.
    pub async fn resolve(
        dir: Option<PathBuf>,
        email: Option<String>,
        home: Option<PathBuf>,
    ) -> Result<Self> {
        let email = resolve_email(email);

        let host_dir = match dir.filter(|dir| !dir.as_os_str().is_empty()) {
            Some(dir) => absolute_dir_path(dir).stack()?,
            None => {
                let home = home.stack_err(
                    "Did not receive Grist home directory and unable to find user home directory",
                )?;
                let default_dir = ensure_dir_path(home.join(DEFAULT_DIR_NAME))
                    .await
                    .stack_err(
                        "Did not receive Grist home directory and unable to create the default \
                         directory",
                    )?;
                info!("Using default Grist home directory: {}", default_dir.display());
                default_dir
            }
        };
        info!("Mounting: {}", host_dir.display());

        Ok(Self { host_dir, email })
    }
}

fn resolve_email(email: Option<String>) -> String {
    match email {
        Some(email) if email.len() >= MIN_EMAIL_LEN => email,
        _ => {
            info!("Did not specify email, using default: {DEFAULT_EMAIL}");
            DEFAULT_EMAIL.to_owned()
        }
    }
}

/// The current user's home directory, taken from `HOME` (or `USERPROFILE` on
/// windows). Unset and empty both count as unknown.
pub fn user_home_dir() -> Option<PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}
