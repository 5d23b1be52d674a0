//! Staging-then-commit publishing.
//!
//! Artifacts of one operation are first written into a private directory under
//! `<root>/.staging/`. Only when every step has succeeded does [`Staging::commit`]
//! move them into place with one rename per file, so a failing step leaves the
//! previously published artifacts untouched. Dropping an uncommitted staging
//! area deletes whatever it holds.
//!
//! Each rename replaces a whole file. The window between two renames of the
//! same commit is the only point where a reader can observe a fresh artifact
//! next to a stale one.

use super::CatalogLayout;
use crate::error::{CatalogError, Result, ResultExt as _};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
struct StagedFile {
    staged: PathBuf,
    target: PathBuf,
}

/// A private directory collecting the artifacts of one operation.
#[derive(Debug)]
pub struct Staging {
    dir: PathBuf,
    files: Vec<StagedFile>,
    retired: Vec<PathBuf>,
}

impl Staging {
    /// Create a fresh staging directory inside the catalog root.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persist`] if the directory cannot be created.
    pub fn new(layout: &CatalogLayout) -> Result<Self> {
        let dir = layout.staging_root().join(Uuid::new_v4().to_string());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create staging directory {}", dir.display()))?;

        Ok(Self {
            dir,
            files: Vec::new(),
            retired: Vec::new(),
        })
    }

    /// Reserve a staging path that will be published to `target`.
    ///
    /// The caller writes the artifact to the returned path.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persist`] if `target` has no file name or the
    /// same file name was already staged.
    pub fn stage(&mut self, target: PathBuf) -> Result<PathBuf> {
        let file_name = target.file_name().ok_or_else(|| {
            CatalogError::Persist(format!("target {} has no file name", target.display()))
        })?;
        let staged = self.dir.join(file_name);

        if self.files.iter().any(|f| f.staged == staged) {
            return Err(CatalogError::Persist(format!(
                "{} staged twice",
                staged.display()
            )));
        }

        self.files.push(StagedFile {
            staged: staged.clone(),
            target,
        });
        Ok(staged)
    }

    /// Remove `target` at commit time if it exists.
    pub fn retire(&mut self, target: PathBuf) {
        self.retired.push(target);
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Publish every staged file and delete every retired one.
    ///
    /// Returns the published target paths in staging order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Persist`] if a staged file is missing or a
    /// rename fails. Files renamed before the failure stay published.
    pub fn commit(self) -> Result<Vec<PathBuf>> {
        for file in &self.files {
            if !file.staged.exists() {
                return Err(CatalogError::Persist(format!(
                    "staged artifact {} was never written",
                    file.staged.display()
                )));
            }
        }

        let mut published = Vec::with_capacity(self.files.len());
        for file in &self.files {
            if let Some(parent) = file.target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::rename(&file.staged, &file.target).with_context(|| {
                format!("Failed to publish {}", file.target.display())
            })?;
            tracing::debug!("Published {}", file.target.display());
            published.push(file.target.clone());
        }

        for target in &self.retired {
            if target.exists() {
                fs::remove_file(target)
                    .with_context(|| format!("Failed to remove stale {}", target.display()))?;
                tracing::debug!("Removed stale {}", target.display());
            }
        }

        Ok(published)
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        if self.dir.exists()
            && let Err(e) = fs::remove_dir_all(&self.dir)
        {
            tracing::warn!("Failed to clean staging directory {}: {e}", self.dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_publishes_and_cleans_up() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let layout = CatalogLayout::new(temp.path(), "v1");
        let target = layout.profile_path("k");

        let mut staging = Staging::new(&layout)?;
        let staging_dir = staging.dir().to_path_buf();
        let staged = staging.stage(target.clone())?;
        fs::write(&staged, "{}")?;

        let published = staging.commit()?;
        assert_eq!(published, vec![target.clone()]);
        assert_eq!(fs::read_to_string(&target)?, "{}");
        assert!(!staging_dir.exists());
        Ok(())
    }

    #[test]
    fn test_drop_without_commit_leaves_target_untouched() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let layout = CatalogLayout::new(temp.path(), "v1");
        let target = layout.profile_path("k");
        fs::create_dir_all(layout.dataset_dir("k"))?;
        fs::write(&target, "old")?;

        {
            let mut staging = Staging::new(&layout)?;
            let staged = staging.stage(target.clone())?;
            fs::write(&staged, "new")?;
        }

        assert_eq!(fs::read_to_string(&target)?, "old");
        Ok(())
    }

    #[test]
    fn test_unwritten_artifact_fails_commit() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let layout = CatalogLayout::new(temp.path(), "v1");
        let mut staging = Staging::new(&layout)?;
        staging.stage(layout.snapshot_path("k"))?;

        assert!(matches!(staging.commit(), Err(CatalogError::Persist(_))));
        assert!(!layout.snapshot_path("k").exists());
        Ok(())
    }

    #[test]
    fn test_retire_removes_stale_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let layout = CatalogLayout::new(temp.path(), "v1");
        let stale = layout.nice_mapping_path("k");
        fs::create_dir_all(layout.kind_dir("k"))?;
        fs::write(&stale, "original_name,format_hint\n")?;

        let mut staging = Staging::new(&layout)?;
        staging.retire(stale.clone());
        staging.commit()?;

        assert!(!stale.exists());
        Ok(())
    }
}
