use super::report::{Operation, PipelineReport, PipelineRun, PipelineState};
use super::{ImportRequest, PipelineController};
use crate::cache::{read_artifact, ArtifactSummary};
use crate::codec::CodecError;
use crate::container::ContainerKind;
use crate::error::{BridgeError, Result};
use crate::host::SceneHost;
use std::path::Path;

impl PipelineController {
    /// Extract the source's RizomUV data into the cache, then hand the
    /// untouched source to the host.
    pub fn import(&self, request: &ImportRequest, host: &dyn SceneHost) -> Result<PipelineReport> {
        let source = request.source_path.as_path();
        if !source.is_file() {
            return Err(BridgeError::InvalidPath {
                path: source.display().to_string(),
            });
        }

        let mut run = PipelineRun::new(Operation::Import, source);

        if request.extract {
            run.enter(PipelineState::Extracting);
            if let Err(reason) = self.extract(source, &mut run) {
                return Ok(run.cancel(reason));
            }
        } else {
            tracing::debug!(source = %source.display(), "Extraction disabled");
        }

        run.enter(PipelineState::Loading);
        host.import_scene(source)?;

        Ok(run.finish())
    }

    /// Runs the extractor. `Err` carries the reason the import is cancelled;
    /// every other problem is recorded as a warning.
    fn extract(&self, source: &Path, run: &mut PipelineRun) -> std::result::Result<(), String> {
        match ContainerKind::probe(source) {
            Ok(ContainerKind::Binary { version }) => {
                tracing::debug!(version, "Binary FBX source");
            }
            Ok(ContainerKind::Ascii) => {
                run.warn(format!(
                    "{} is an ASCII FBX; the extractor expects binary containers",
                    source.display()
                ));
            }
            Ok(ContainerKind::Unknown) => {
                run.warn(format!("{} does not look like an FBX container", source.display()));
            }
            Err(e) => {
                run.warn(format!("Could not read {}: {}", source.display(), e));
            }
        }

        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let artifact = self.store.resolve_artifact_path(&file_name);

        if let Err(e) = self.store.ensure_dir() {
            run.warn(format!(
                "Cache directory {} is unavailable, skipping extraction: {}",
                self.store.root().display(),
                e
            ));
            return Ok(());
        }

        tracing::info!(
            source = %source.display(),
            artifact = %artifact.display(),
            extractor = %self.extractor,
            "Extracting RizomUV data"
        );

        match self.invoker.invoke(&self.extractor, [source.as_os_str(), artifact.as_os_str()]) {
            Ok(result) if result.success() => {
                if artifact.is_file() {
                    run.set_artifact(&artifact);
                    self.log_artifact(&artifact, run);
                } else {
                    run.warn(format!(
                        "Extractor reported success but wrote no cache at {}",
                        artifact.display()
                    ));
                }
            }
            Ok(result) => {
                run.warn(format!("Extractor failed ({})", result.failure_detail()));
            }
            Err(CodecError::ExecutableMissing { path }) => {
                return Err(format!("Extractor not found: {}", path.display()));
            }
            Err(e) => {
                run.warn(format!("Extractor failed: {}", e));
            }
        }

        Ok(())
    }

    fn log_artifact(&self, artifact: &Path, run: &mut PipelineRun) {
        match read_artifact(artifact) {
            Ok(records) => {
                let summary = ArtifactSummary::from_records(&records);
                tracing::info!(
                    document_properties = summary.document_properties,
                    mesh_properties = summary.mesh_properties,
                    meshes = summary.meshes.len(),
                    island_groups = summary.island_group_records,
                    "Cache written"
                );
            }
            Err(e) if self.validate_artifacts => run.warn(e.to_string()),
            Err(e) => tracing::debug!(error = %e, "Cache not decodable, validation disabled"),
        }
    }
}
