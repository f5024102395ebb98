/// Workspace Manager - per-run artifact isolation
///
/// Every run gets its own directory `<root>/run-<uuid>` holding the source,
/// binary and class files for that submission. Concurrent runs therefore never
/// share file names, even when a compiler dictates a fixed one (Java's
/// `<ClassName>.java`).
///
/// A [`Workspace`] is released explicitly by the coordinator once the run ends.
/// If that never happens (a panic inside a runner), the drop guard removes the
/// directory instead.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const RUN_DIR_PREFIX: &str = "run-";
const MAX_ALLOCATION_ATTEMPTS: usize = 8;

/// Hands out per-run directories under a shared root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        // Children run with their workspace as cwd, so every path handed to them is absolute.
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh, empty directory for one run.
    pub async fn allocate(&self) -> io::Result<Workspace> {
        fs::create_dir_all(&self.root).await?;

        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let id = Uuid::new_v4();
            let dir = self.root.join(format!("{}{}", RUN_DIR_PREFIX, id));

            match fs::create_dir(&dir).await {
                Ok(()) => {
                    debug!(run_id = %id, dir = %dir.display(), "Workspace allocated");
                    return Ok(Workspace {
                        id,
                        dir,
                        released: false,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not allocate a unique workspace directory",
        ))
    }

    /// Remove run directories last modified more than `max_age` ago.
    ///
    /// Only entries carrying the run prefix are considered. Returns how many were removed.
    pub async fn purge_stale(&self, max_age: Duration) -> io::Result<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(RUN_DIR_PREFIX) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_dir() {
                continue;
            }

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age >= max_age {
                match fs::remove_dir_all(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => warn!(dir = %entry.path().display(), error = %e, "Failed to purge stale workspace"),
                }
            }
        }

        Ok(removed)
    }
}

/// One run's private directory.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `name` inside this workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write a source file into the workspace and return its path.
    pub async fn write_source(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.file(name);
        fs::write(&path, contents).await?;
        Ok(path)
    }

    /// Best-effort removal of a build artifact right after execution.
    pub async fn remove_artifact(&self, name: &str) {
        let path = self.file(name);
        match fs::remove_file(&path).await {
            Ok(()) => debug!(run_id = %self.id, artifact = name, "Artifact removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(run_id = %self.id, artifact = name, error = %e, "Failed to remove artifact"),
        }
    }

    /// Remove every file with the given extension (e.g. all `.class` files, inner classes included).
    pub async fn remove_artifacts_with_extension(&self, extension: &str) {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(_) => return,
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    self.remove_artifact(name).await;
                }
            }
        }
    }

    /// Delete the workspace directory and everything in it.
    pub async fn release(mut self) {
        self.released = true;
        match fs::remove_dir_all(&self.dir).await {
            Ok(()) => debug!(run_id = %self.id, "Workspace released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(run_id = %self.id, error = %e, "Failed to release workspace"),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Not released through the normal path; clean up synchronously.
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(run_id = %self.id, error = %e, "Failed to clean up workspace on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_creates_unique_directories() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());

        let a = manager.allocate().await.unwrap();
        let b = manager.allocate().await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.dir(), b.dir());
        assert!(a.dir().is_dir());
        assert!(b.dir().is_dir());
        assert!(a.dir().starts_with(root.path()));
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let manager = WorkspaceManager::new("codegrade-runs");
        assert!(manager.root().is_absolute());
        assert!(manager.root().ends_with("codegrade-runs"));
    }

    #[tokio::test]
    async fn test_allocate_creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let manager = WorkspaceManager::new(&nested);

        let ws = manager.allocate().await.unwrap();

        assert!(ws.dir().starts_with(&nested));
    }

    #[tokio::test]
    async fn test_release_removes_directory_and_contents() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.allocate().await.unwrap();
        let source = ws.write_source("main.py", "print(1)").await.unwrap();
        assert!(source.exists());
        let dir = ws.dir().to_path_buf();

        ws.release().await;

        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_drop_guard_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.allocate().await.unwrap();
        ws.write_source("Main.java", "class Main {}").await.unwrap();
        let dir = ws.dir().to_path_buf();

        drop(ws);

        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_remove_artifacts_with_extension() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.allocate().await.unwrap();
        ws.write_source("Main.java", "").await.unwrap();
        ws.write_source("Main.class", "").await.unwrap();
        ws.write_source("Main$Inner.class", "").await.unwrap();

        ws.remove_artifacts_with_extension("class").await;

        assert!(ws.file("Main.java").exists());
        assert!(!ws.file("Main.class").exists());
        assert!(!ws.file("Main$Inner.class").exists());
    }

    #[tokio::test]
    async fn test_remove_missing_artifact_is_silent() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.allocate().await.unwrap();

        ws.remove_artifact("main").await;

        assert!(ws.dir().is_dir());
    }

    #[tokio::test]
    async fn test_purge_stale_only_touches_run_directories() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.allocate().await.unwrap();
        let run_dir = ws.dir().to_path_buf();
        std::mem::forget(ws);
        let foreign = root.path().join("keep-me");
        std::fs::create_dir(&foreign).unwrap();

        let removed = manager.purge_stale(Duration::ZERO).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!run_dir.exists());
        assert!(foreign.exists());
    }

    #[tokio::test]
    async fn test_purge_stale_keeps_fresh_directories() {
        let root = tempfile::tempdir().unwrap();
        let manager = WorkspaceManager::new(root.path());
        let ws = manager.allocate().await.unwrap();

        let removed = manager.purge_stale(Duration::from_secs(3600)).await.unwrap();

        assert_eq!(removed, 0);
        assert!(ws.dir().exists());
    }

    #[tokio::test]
    async fn test_purge_stale_on_missing_root() {
        let manager = WorkspaceManager::new("/nonexistent/codegrade-root");
        assert_eq!(manager.purge_stale(Duration::ZERO).await.unwrap(), 0);
    }
}
