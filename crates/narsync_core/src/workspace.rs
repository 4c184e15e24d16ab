//! Removal of intermediate run folders.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PathSettings;

/// Result of a cleanup pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Folders that did not exist.
    pub skipped: Vec<PathBuf>,
    /// Folders that could not be removed, with the error.
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Remove each folder with its contents.
pub fn clean_work_folders<P: AsRef<Path>>(folders: &[P]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for folder in folders {
        let folder = folder.as_ref();
        if !folder.exists() {
            tracing::debug!("Folder doesn't exist: {}", folder.display());
            report.skipped.push(folder.to_path_buf());
            continue;
        }
        match fs::remove_dir_all(folder) {
            Ok(()) => {
                tracing::info!("Removed folder: {}", folder.display());
                report.removed.push(folder.to_path_buf());
            }
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", folder.display(), e);
                report.failed.push((folder.to_path_buf(), e.to_string()));
            }
        }
    }

    tracing::info!(
        "Cleanup: removed {}, skipped {}, failed {}",
        report.removed.len(),
        report.skipped.len(),
        report.failed.len()
    );
    report
}

/// Folders a cleanup pass removes.
///
/// The work folder always; output and run logs only when asked. The
/// synthesis cache is never removed here.
pub fn cleanup_targets(paths: &PathSettings, include_output: bool, include_logs: bool) -> Vec<PathBuf> {
    let mut targets = vec![PathBuf::from(&paths.work_folder)];
    if include_output {
        targets.push(PathBuf::from(&paths.output_folder));
    }
    if include_logs {
        targets.push(PathBuf::from(&paths.logs_folder));
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn removes_existing_and_skips_missing() {
        let dir = tempdir().unwrap();
        let work = dir.path().join("work");
        fs::create_dir_all(work.join("run_1/audio")).unwrap();
        fs::write(work.join("run_1/audio/a.mp3"), b"x").unwrap();
        let missing = dir.path().join("missing");

        let report = clean_work_folders(&[&work, &missing]);

        assert_eq!(report.removed, vec![work.clone()]);
        assert_eq!(report.skipped, vec![missing]);
        assert!(report.is_clean());
        assert!(!work.exists());
    }

    #[test]
    fn output_folder_only_when_requested() {
        let paths = PathSettings::default();
        assert_eq!(cleanup_targets(&paths, false, false), vec![PathBuf::from(".work")]);
        assert_eq!(cleanup_targets(&paths, true, false).len(), 2);

        let everything = cleanup_targets(&paths, true, true);
        assert_eq!(everything.len(), 3);
        assert!(!everything.contains(&PathBuf::from(&paths.cache_folder)));
    }
}
