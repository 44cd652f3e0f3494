use super::report::{Operation, PipelineReport, PipelineRun, PipelineState};
use super::{ExportRequest, PipelineController};
use crate::cache::read_artifact;
use crate::codec::CodecError;
use crate::error::{BridgeError, Result};
use crate::host::SceneHost;
use std::fs;
use std::path::{Path, PathBuf};

impl PipelineController {
    /// Export through the host into a temporary container, merge the selected
    /// cache into it, and only then put a file at the destination.
    pub fn export(&self, request: &ExportRequest, host: &dyn SceneHost) -> Result<PipelineReport> {
        let destination = request.destination_path.as_path();
        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if destination.file_name().is_none() || !parent.is_dir() || destination.is_dir() {
            return Err(BridgeError::InvalidPath {
                path: destination.display().to_string(),
            });
        }

        let temp = self.temporary_path(destination);
        let mut run = PipelineRun::new(Operation::Export, destination);

        run.enter(PipelineState::Exporting);
        tracing::info!(temp = %temp.display(), scope = %request.scope, "Exporting scene");
        if let Err(e) = host.export_scene(&temp, request.scope) {
            discard(&temp);
            return Err(e);
        }
        if !temp.is_file() {
            return Err(BridgeError::Host {
                message: format!("export reported success but {} was not written", temp.display()),
            });
        }

        if let Some(artifact) = self.injection_artifact(request, &mut run) {
            if self.inject(&temp, &artifact, destination, &mut run) {
                return Ok(run.finish());
            }
        }

        self.finalize(&temp, destination, &mut run)?;
        Ok(run.finish())
    }

    /// The artifact to merge, or `None` when the plain export is finalized.
    fn injection_artifact(&self, request: &ExportRequest, run: &mut PipelineRun) -> Option<PathBuf> {
        if !request.inject {
            tracing::debug!("Injection disabled");
            return None;
        }

        let Some(artifact) = request.selected_artifact.clone() else {
            run.warn("No cache selected, exporting without RizomUV data");
            return None;
        };

        if !artifact.is_file() {
            run.warn(format!(
                "Cache {} no longer exists, exporting without RizomUV data",
                artifact.display()
            ));
            return None;
        }

        if self.validate_artifacts {
            if let Err(e) = read_artifact(&artifact) {
                run.warn(format!("{}; exporting without RizomUV data", e));
                return None;
            }
        }

        Some(artifact)
    }

    /// Returns true when the injector produced the destination.
    fn inject(&self, temp: &Path, artifact: &Path, destination: &Path, run: &mut PipelineRun) -> bool {
        run.enter(PipelineState::Injecting);
        tracing::info!(
            artifact = %artifact.display(),
            injector = %self.injector,
            "Injecting RizomUV data"
        );

        let args = [temp.as_os_str(), artifact.as_os_str(), destination.as_os_str()];
        match self.invoker.invoke(&self.injector, args) {
            Ok(result) if result.success() => {
                if destination.is_file() {
                    discard(temp);
                    run.mark_injected(artifact);
                    return true;
                }
                run.warn(format!(
                    "Injector reported success but wrote no {}, keeping the plain export",
                    destination.display()
                ));
            }
            Ok(result) => {
                run.warn(format!(
                    "Injector failed ({}), keeping the plain export",
                    result.failure_detail()
                ));
            }
            Err(CodecError::ExecutableMissing { path }) => {
                run.warn(format!(
                    "Injector not found: {}, exporting without RizomUV data",
                    path.display()
                ));
            }
            Err(e) => {
                run.warn(format!("Injector failed: {}, keeping the plain export", e));
            }
        }

        false
    }

    fn finalize(&self, temp: &Path, destination: &Path, run: &mut PipelineRun) -> Result<()> {
        run.enter(PipelineState::Finalizing);
        if let Err(e) = fs::rename(temp, destination) {
            discard(temp);
            return Err(BridgeError::Io(e));
        }

        tracing::debug!(destination = %destination.display(), "Export finalized");
        Ok(())
    }
}

fn discard(temp: &Path) {
    if !temp.exists() {
        return;
    }
    if let Err(e) = fs::remove_file(temp) {
        tracing::warn!(temp = %temp.display(), error = %e, "Could not remove temporary export");
    }
}
