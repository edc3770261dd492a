use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use dashshare_core::config::RenderingConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Deletes rendered images from `images_dir` once they outlive their
/// lifetime. Only `.png` files are touched.
#[derive(Clone, Debug)]
pub struct ImageSweeper {
    images_dir: PathBuf,
    lifetime: Duration,
    interval: Duration,
}

impl ImageSweeper {
    pub fn new(images_dir: impl Into<PathBuf>, lifetime: Duration) -> Self {
        Self { images_dir: images_dir.into(), lifetime, interval: SWEEP_INTERVAL.min(lifetime) }
    }

    pub fn from_config(rendering: &RenderingConfig) -> Self {
        Self::new(&rendering.images_dir, Duration::from_secs(rendering.image_lifetime_secs))
    }

    /// Removes every expired image and returns how many were deleted.
    pub async fn sweep_once(&self) -> io::Result<usize> {
        let cutoff = SystemTime::now().checked_sub(self.lifetime).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut entries = match tokio::fs::read_dir(&self.images_dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(error) => return Err(error),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_rendered_image(&path) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() || metadata.modified()? > cutoff {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                // Another sweep or an operator got there first.
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(error),
            }
        }

        Ok(removed)
    }

    /// Sweeps on a fixed interval until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => self.sweep_and_log().await,
                }
            }
        })
    }

    async fn sweep_and_log(&self) {
        match self.sweep_once().await {
            Ok(0) => {}
            Ok(removed) => info!(
                event_name = "render.images.expired",
                correlation_id = "image-sweeper",
                removed,
                images_dir = %self.images_dir.display(),
                "deleted expired rendered images"
            ),
            Err(error) => warn!(
                event_name = "render.images.sweep_failed",
                correlation_id = "image-sweeper",
                error = %error,
                images_dir = %self.images_dir.display(),
                "could not sweep rendered images"
            ),
        }
    }
}

fn is_rendered_image(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("png")
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    use tokio_util::sync::CancellationToken;

    use super::ImageSweeper;

    fn age(path: &std::path::Path, by: Duration) {
        let file = File::options().write(true).open(path).expect("open image");
        file.set_modified(SystemTime::now() - by).expect("set mtime");
    }

    #[tokio::test]
    async fn expired_images_are_deleted_and_fresh_ones_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let old = dir.path().join("old.png");
        let fresh = dir.path().join("fresh.png");
        let notes = dir.path().join("notes.txt");
        for path in [&old, &fresh, &notes] {
            std::fs::write(path, b"x").expect("write file");
        }
        age(&old, Duration::from_secs(2 * 60 * 60));
        age(&notes, Duration::from_secs(2 * 60 * 60));

        let sweeper = ImageSweeper::new(dir.path(), Duration::from_secs(60 * 60));
        let removed = sweeper.sweep_once().await.expect("sweep succeeds");

        assert_eq!(removed, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(notes.exists());
    }

    #[tokio::test]
    async fn missing_images_dir_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sweeper = ImageSweeper::new(dir.path().join("absent"), Duration::from_secs(60));

        assert_eq!(sweeper.sweep_once().await.expect("sweep succeeds"), 0);
    }

    #[tokio::test]
    async fn spawned_sweeper_runs_immediately_and_stops_on_cancel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let old = dir.path().join("old.png");
        std::fs::write(&old, b"x").expect("write file");
        age(&old, Duration::from_secs(120));

        let cancel = CancellationToken::new();
        let handle =
            ImageSweeper::new(dir.path(), Duration::from_secs(60)).spawn(cancel.clone());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while old.exists() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!old.exists());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper stops after cancel")
            .expect("sweeper task does not panic");
    }
}
