//! Per-request output files.
//!
//! Every generation gets its own [`TaskId`] and therefore its own file under
//! the results directory. From allocation on the file is owned by an
//! [`ArtifactGuard`], which deletes it when dropped. The HTTP layer moves the
//! guard into the response body, so the file goes away after the last byte was
//! sent or when the client went away.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use axum::body::{Body, Bytes};
use futures::Stream;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};
use uuid::Uuid;
use duet_core::VIDEO_MEDIA_TYPE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone)]
pub struct Artifact {
    pub task_id: TaskId,
    pub path: PathBuf,
    pub media_type: &'static str,
}

impl Artifact {
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// File name suggested to the client in `Content-Disposition`.
    pub fn download_name(&self) -> String {
        format!("motion_{}.mp4", self.task_id)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh task id and the path its video will be written to.
    /// The results directory is created if it does not exist yet.
    pub fn allocate(&self) -> io::Result<Artifact> {
        std::fs::create_dir_all(&self.dir)?;
        let task_id = TaskId::new();
        Ok(Artifact {
            path: self.dir.join(format!("{task_id}.mp4")),
            task_id,
            media_type: VIDEO_MEDIA_TYPE,
        })
    }
}

/// Delete an artifact. A file that is already gone is not an error; any
/// other failure is logged and swallowed.
pub fn remove_artifact(artifact: &Artifact) {
    match std::fs::remove_file(&artifact.path) {
        Ok(()) => debug!(task_id = %artifact.task_id, "removed artifact"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => error!(task_id = %artifact.task_id, path = %artifact.path.display(), "failed to remove artifact: {e}"),
    }
}

/// Owns an artifact on disk and removes it on drop.
#[derive(Debug)]
pub struct ArtifactGuard {
    artifact: Artifact,
}

impl ArtifactGuard {
    pub fn new(artifact: Artifact) -> Self {
        Self { artifact }
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        remove_artifact(&self.artifact);
    }
}

/// Chunked file reader that keeps its artifact alive until the body is dropped.
struct DeliveryStream {
    inner: ReaderStream<tokio::fs::File>,
    sent: u64,
    finished: bool,
    guard: ArtifactGuard,
}

impl Stream for DeliveryStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        match &polled {
            Poll::Ready(Some(Ok(chunk))) => self.sent += chunk.len() as u64,
            Poll::Ready(None) => self.finished = true,
            _ => {}
        }
        polled
    }
}

impl Drop for DeliveryStream {
    fn drop(&mut self) {
        let task_id = self.guard.artifact().task_id;
        if self.finished {
            debug!(%task_id, bytes = self.sent, "artifact delivered");
        } else {
            warn!(%task_id, bytes = self.sent, "artifact delivery aborted");
        }
    }
}

/// Turn a guarded artifact into a streaming response body. The file is
/// deleted when the body is dropped, whether or not it was read to the end.
/// If the file cannot be opened it is removed right away and the error returned.
pub async fn into_body(guard: ArtifactGuard) -> io::Result<Body> {
    let file = tokio::fs::File::open(&guard.artifact().path).await?;
    Ok(Body::from_stream(DeliveryStream {
        inner: ReaderStream::new(file),
        sent: 0,
        finished: false,
        guard,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use futures::StreamExt;

    #[test]
    fn test_task_ids_are_unique() {
        let ids: HashSet<TaskId> = (0..1_000_000).map(|_| TaskId::new()).collect();
        assert_eq!(ids.len(), 1_000_000);
    }

    #[test]
    fn test_allocate_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("results"));

        let first = store.allocate().unwrap();
        let second = store.allocate().unwrap();

        assert!(store.dir().is_dir());
        assert_ne!(first.path, second.path);
        assert_eq!(first.media_type, "video/mp4");
        assert!(!first.exists());
        assert_eq!(first.download_name(), format!("motion_{}.mp4", first.task_id));
    }

    #[test]
    fn test_remove_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactStore::new(dir.path()).allocate().unwrap();
        remove_artifact(&artifact);
        remove_artifact(&artifact);
    }

    #[test]
    fn test_guard_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactStore::new(dir.path()).allocate().unwrap();
        std::fs::write(&artifact.path, b"video").unwrap();

        let guard = ArtifactGuard::new(artifact.clone());
        assert!(artifact.exists());
        drop(guard);
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn test_body_keeps_file_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactStore::new(dir.path()).allocate().unwrap();
        let payload = vec![7u8; 64 * 1024];
        std::fs::write(&artifact.path, &payload).unwrap();

        let mut stream = into_body(ArtifactGuard::new(artifact.clone())).await.unwrap().into_data_stream();
        let mut received = Vec::new();
        while let Some(chunk) = stream.next().await {
            assert!(artifact.exists());
            received.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(received, payload);

        drop(stream);
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn test_abandoned_body_still_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactStore::new(dir.path()).allocate().unwrap();
        std::fs::write(&artifact.path, vec![1u8; 256 * 1024]).unwrap();

        let mut stream = into_body(ArtifactGuard::new(artifact.clone())).await.unwrap().into_data_stream();
        stream.next().await.unwrap().unwrap();
        drop(stream);
        assert!(!artifact.exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = ArtifactStore::new(dir.path()).allocate().unwrap();
        assert!(into_body(ArtifactGuard::new(artifact)).await.is_err());
    }
}
