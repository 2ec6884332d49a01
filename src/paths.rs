use std::path::{Path, PathBuf};

use stacked_errors::{bail, Result, StackableErr};
use tokio::fs;

/// Makes `dir_path` absolute relative to the current directory without
/// touching the filesystem. The engine rejects relative bind mount sources, so
/// every host path goes through this before it reaches a [ContainerSpec].
///
/// [ContainerSpec]: crate::ContainerSpec
pub fn absolute_dir_path(dir_path: impl AsRef<Path>) -> Result<PathBuf> {
    let dir_path = dir_path.as_ref();
    std::path::absolute(dir_path)
        .stack_err_with(|| format!("absolute_dir_path(dir_path: {dir_path:?})"))
}

/// Creates `dir_path` and any missing parents, then checks that it really is a
/// directory. Calling this on an existing directory is a no-op.
///
/// Note: this does not prevent TOCTOU bugs.
pub async fn ensure_dir_path(dir_path: impl AsRef<Path>) -> Result<PathBuf> {
    let dir_path = dir_path.as_ref();
    fs::create_dir_all(dir_path)
        .await
        .stack_err_with(|| format!("ensure_dir_path(dir_path: {dir_path:?}) -> create_dir_all"))?;
    let metadata = fs::metadata(dir_path)
        .await
        .stack_err_with(|| format!("ensure_dir_path(dir_path: {dir_path:?}) -> metadata"))?;
    if !metadata.is_dir() {
        bail!("ensure_dir_path(dir_path: {dir_path:?}) -> is not a directory")
    }
    Ok(dir_path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_dir_path_creates_parents_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");

        assert_eq!(ensure_dir_path(&nested).await.unwrap(), nested);
        assert!(nested.is_dir());
        // second call on an existing directory
        assert_eq!(ensure_dir_path(&nested).await.unwrap(), nested);
    }

    #[tokio::test]
    async fn ensure_dir_path_rejects_files() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not_a_dir");
        std::fs::write(&file, b"").unwrap();

        assert!(ensure_dir_path(&file).await.is_err());
    }

    #[test]
    fn absolute_dir_path_keeps_absolute_paths() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(absolute_dir_path(tmp.path()).unwrap(), tmp.path());
        assert!(absolute_dir_path("relative/dir").unwrap().is_absolute());
    }
}
