use crate::container::ContainerKind;
use crate::error::{BridgeError, Result};
use crate::host::{ExportScope, SceneHost};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Host adapter for containers the real host already produced.
///
/// Import checks that the source really is an FBX container; export copies
/// a staged container to wherever the pipeline asks.
#[derive(Debug, Clone, Default)]
pub struct StagedHost {
    staged: Option<PathBuf>,
}

impl StagedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_staged_export<P: Into<PathBuf>>(mut self, staged: P) -> Self {
        self.staged = Some(staged.into());
        self
    }

    pub fn staged_export(&self) -> Option<&Path> {
        self.staged.as_deref()
    }
}

impl SceneHost for StagedHost {
    fn import_scene(&self, source: &Path) -> Result<()> {
        let kind = ContainerKind::probe(source)?;
        if !kind.is_fbx() {
            return Err(BridgeError::Host {
                message: format!("{} is not an FBX container", source.display()),
            });
        }

        tracing::info!(source = %source.display(), kind = %kind.describe(), "Container ready for import");
        Ok(())
    }

    fn export_scene(&self, destination: &Path, scope: ExportScope) -> Result<()> {
        let staged = self.staged.as_ref().ok_or_else(|| BridgeError::Host {
            message: "no staged export to copy".to_string(),
        })?;

        if scope == ExportScope::Selected {
            tracing::debug!("Staged export is copied as-is; selection was applied when it was staged");
        }

        let mut source = File::open(staged).map_err(|e| BridgeError::Host {
            message: format!("cannot read staged export {}: {}", staged.display(), e),
        })?;

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        // Copy into a sibling temp file first so `destination` only ever
        // appears complete.
        let mut staging = NamedTempFile::new_in(parent)?;
        io::copy(&mut source, staging.as_file_mut())?;
        staging.as_file().sync_all()?;
        staging.persist(destination).map_err(|e| BridgeError::Io(e.error))?;

        tracing::debug!(
            staged = %staged.display(),
            destination = %destination.display(),
            "Copied staged export"
        );
        Ok(())
    }
}
