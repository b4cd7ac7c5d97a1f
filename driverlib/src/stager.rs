use crate::errors::{DriverError, Result};

use futures::future::{BoxFuture, FutureExt};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Copies an artifact from a location into a local destination file.
pub trait ArtifactTransport: Send + Sync {
    fn fetch<'a>(&'a self, location: &'a str, destination: &'a Path) -> BoxFuture<'a, io::Result<()>>;
}

/// Handles plain paths and `file://` URLs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalTransport;

impl ArtifactTransport for LocalTransport {
    fn fetch<'a>(&'a self, location: &'a str, destination: &'a Path) -> BoxFuture<'a, io::Result<()>> {
        async move {
            let source = match location.split_once("://") {
                None => location,
                Some(("file", path)) => path,
                Some((scheme, _)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::Unsupported,
                        format!("unsupported scheme {:?}", scheme),
                    ))
                }
            };
            fs::copy(source, destination).await.map(|_| ())
        }
        .boxed()
    }
}

/// The file name an artifact is stored under: the last segment of the
/// location's path, ignoring scheme, query and fragment.
pub fn artifact_file_name(location: &str) -> Result<String> {
    let path = location
        .split_once("://")
        .map_or(location, |(_, rest)| rest);
    let path = path.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(DriverError::InvalidArtifactLocation(location.to_string())),
    }
}

/// Creates `root/job_id` if needed and returns its absolute path.
pub async fn create_work_dir(root: &Path, job_id: &str) -> Result<PathBuf> {
    let dir = root.join(job_id);
    if let Err(source) = fs::create_dir_all(&dir).await {
        if !fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(DriverError::CreateWorkDir { path: dir, source });
        }
    }
    match fs::canonicalize(&dir).await {
        Ok(path) => Ok(path),
        Err(source) => Err(DriverError::CreateWorkDir { path: dir, source }),
    }
}

/// Copies the artifact into `work_dir` unless a file of the same name is
/// already there, then checks that it exists. Returns its absolute path.
pub async fn stage_artifact(
    transport: &dyn ArtifactTransport,
    location: &str,
    work_dir: &Path,
) -> Result<PathBuf> {
    let file_name = artifact_file_name(location)?;
    let destination = work_dir.join(&file_name);

    if fs::metadata(&destination).await.is_ok() {
        debug!(artifact = %destination.display(), "artifact already staged");
    } else {
        info!(%location, destination = %destination.display(), "fetching artifact");
        transport
            .fetch(location, &destination)
            .await
            .map_err(|source| DriverError::Transfer {
                location: location.to_string(),
                source,
            })?;
    }

    match fs::canonicalize(&destination).await {
        Ok(path) => Ok(path),
        Err(_) => Err(DriverError::ArtifactMissing {
            file: file_name,
            dir: work_dir.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NoopTransport;

    #[test]
    fn file_names() {
        assert_eq!(artifact_file_name("file:///opt/jobs/app.jar").unwrap(), "app.jar");
        assert_eq!(artifact_file_name("/opt/jobs/app.jar").unwrap(), "app.jar");
        assert_eq!(artifact_file_name("app.jar").unwrap(), "app.jar");
        assert_eq!(
            artifact_file_name("hdfs://nn:8020/jobs/app.jar?v=2#frag").unwrap(),
            "app.jar"
        );
        assert!(matches!(
            artifact_file_name("file:///opt/jobs/"),
            Err(DriverError::InvalidArtifactLocation(_))
        ));
    }

    #[tokio::test]
    async fn creates_nested_work_dir() {
        let root = tempfile::tempdir().unwrap();
        let dir = create_work_dir(root.path(), "driver-1").await.unwrap();
        assert!(dir.is_dir());
        // existing directory is fine
        create_work_dir(root.path(), "driver-1").await.unwrap();
    }

    #[tokio::test]
    async fn work_dir_over_a_file_fails() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("driver-1"), b"not a dir").unwrap();
        let result = create_work_dir(root.path(), "driver-1").await;
        assert!(matches!(result, Err(DriverError::CreateWorkDir { .. })));
    }

    #[tokio::test]
    async fn copies_local_artifact() {
        let source = tempfile::tempdir().unwrap();
        let jar = source.path().join("app.jar");
        std::fs::write(&jar, b"jar bytes").unwrap();
        let work = tempfile::tempdir().unwrap();

        let location = format!("file://{}", jar.display());
        let staged = stage_artifact(&LocalTransport, &location, work.path())
            .await
            .unwrap();

        assert!(staged.is_absolute());
        assert_eq!(staged.file_name().unwrap(), std::ffi::OsStr::new("app.jar"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"jar bytes");
    }

    #[tokio::test]
    async fn skips_fetch_when_already_present() {
        let work = tempfile::tempdir().unwrap();
        std::fs::write(work.path().join("app.jar"), b"cached").unwrap();

        // the source does not exist, so a fetch would fail
        let staged = stage_artifact(&LocalTransport, "/nonexistent/app.jar", work.path())
            .await
            .unwrap();
        assert_eq!(std::fs::read(staged).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn missing_after_fetch_is_an_error() {
        let work = tempfile::tempdir().unwrap();
        let result = stage_artifact(&NoopTransport, "/opt/app.jar", work.path()).await;
        match result {
            Err(DriverError::ArtifactMissing { file, dir }) => {
                assert_eq!(file, "app.jar");
                assert_eq!(dir, work.path());
            }
            other => panic!("expected missing artifact, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn transfer_failure_is_reported() {
        let work = tempfile::tempdir().unwrap();
        let result = stage_artifact(&LocalTransport, "s3://bucket/app.jar", work.path()).await;
        assert!(matches!(result, Err(DriverError::Transfer { .. })));
    }
}
