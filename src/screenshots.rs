//! Diagnostic screenshots with bounded retention

use crate::browser::GridPage;
use crate::config::Config;
use crate::error::Result;
use chrono::Local;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Saves labelled screenshots and keeps at most `max_files` of them
#[derive(Debug, Clone)]
pub struct ScreenshotKeeper {
    dir: PathBuf,
    max_files: usize,
}

impl ScreenshotKeeper {
    pub fn new(dir: impl Into<PathBuf>, max_files: usize) -> Self {
        Self {
            dir: dir.into(),
            max_files,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.screenshot_dir(), config.screenshots.max_files)
    }

    /// A keeper that never captures
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.max_files > 0
    }

    /// Capture `<label>_<timestamp>.png`. Failures are logged, never returned.
    pub async fn capture<P: GridPage + ?Sized>(&self, page: &mut P, label: &str) -> Option<PathBuf> {
        if !self.is_enabled() {
            return None;
        }

        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("Cannot create screenshot dir {:?}: {}", self.dir, e);
            return None;
        }

        let name = format!("{}_{}.png", label, Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.dir.join(name);

        if let Err(e) = page.screenshot(&path).await {
            warn!("Screenshot '{}' failed: {}", label, e);
            return None;
        }
        debug!("Saved screenshot {:?}", path);

        if let Err(e) = self.prune() {
            warn!("Screenshot cleanup failed: {}", e);
        }

        Some(path)
    }

    /// Delete the oldest screenshots beyond the retention limit
    pub fn prune(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut shots: Vec<(SystemTime, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "png") {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            shots.push((modified, path));
        }

        if shots.len() <= self.max_files {
            return Ok(0);
        }

        shots.sort();
        let excess = shots.len() - self.max_files;
        let mut removed = 0;
        for (_, path) in shots.into_iter().take(excess) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to delete old screenshot {:?}: {}", path, e),
            }
        }

        debug!("Removed {} old screenshots", removed);
        Ok(removed)
    }
}
