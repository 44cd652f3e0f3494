//! Import (extract, then load) and export (export, then inject) sequencing.

mod export;
mod import;
pub mod report;

pub use report::{Operation, OutcomeStatus, PipelineReport, PipelineState};

use crate::cache::CacheStore;
use crate::codec::{CodecCommand, CodecInvoker};
use crate::config::Config;
use crate::error::Result;
use crate::host::{ExportScope, SceneHost};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub source_path: PathBuf,
    pub extract: bool,
}

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub destination_path: PathBuf,
    pub selected_artifact: Option<PathBuf>,
    pub scope: ExportScope,
    pub inject: bool,
}

#[derive(Debug, Clone)]
pub enum PipelineRequest {
    Import(ImportRequest),
    Export(ExportRequest),
}

#[derive(Debug, Clone)]
pub struct PipelineController {
    store: CacheStore,
    invoker: CodecInvoker,
    extractor: CodecCommand,
    injector: CodecCommand,
    temp_suffix: String,
    validate_artifacts: bool,
}

impl PipelineController {
    pub fn new(store: CacheStore, invoker: CodecInvoker, extractor: CodecCommand, injector: CodecCommand) -> Self {
        Self {
            store,
            invoker,
            extractor,
            injector,
            temp_suffix: ".temp.fbx".to_string(),
            validate_artifacts: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CacheStore::new(&config.cache.directory, config.cache.extension.clone()),
            CodecInvoker::new(config.codec_timeout()),
            config.codecs.extractor.clone(),
            config.codecs.injector.clone(),
        )
        .with_temp_suffix(config.export.temp_suffix.clone())
        .with_artifact_validation(config.codecs.validate_artifacts)
    }

    pub fn with_temp_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.temp_suffix = suffix.into();
        self
    }

    pub fn with_artifact_validation(mut self, validate: bool) -> Self {
        self.validate_artifacts = validate;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn run(&self, request: &PipelineRequest, host: &dyn SceneHost) -> Result<PipelineReport> {
        match request {
            PipelineRequest::Import(request) => self.import(request, host),
            PipelineRequest::Export(request) => self.export(request, host),
        }
    }

    /// Where the host writes before injection: the destination plus a marker suffix.
    pub fn temporary_path(&self, destination: &Path) -> PathBuf {
        let mut path = OsString::from(destination.as_os_str());
        path.push(&self.temp_suffix);
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_path() {
        let controller = PipelineController::from_config(&Config::default());
        assert_eq!(
            controller.temporary_path(Path::new("/out/model.fbx")),
            PathBuf::from("/out/model.fbx.temp.fbx")
        );

        let controller = controller.with_temp_suffix(".partial");
        assert_eq!(
            controller.temporary_path(Path::new("model.fbx")),
            PathBuf::from("model.fbx.partial")
        );
    }
}
