pub mod cache;
pub mod cli;
pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod ui;

// Public API re-exports
pub use cache::{ArtifactRecord, ArtifactSummary, CacheEntry, CacheStore};
pub use cli::{CacheCommand, Cli, Commands, OutputFormat};
pub use codec::{CodecCommand, CodecError, CodecInvoker, CodecResult};
pub use config::{CliOverrides, Config};
pub use container::ContainerKind;
pub use error::{BridgeError, Result, UserFriendlyError};
pub use host::{CommandHost, ExportScope, SceneHost, StagedHost};
pub use pipeline::{
    ExportRequest, ImportRequest, OutcomeStatus, PipelineController, PipelineReport,
    PipelineRequest,
};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::io;
use std::path::{Path, PathBuf};
use tokio::task;

/// What the operator asked for on one export. Unset fields fall back to
/// the `[export]` configuration.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub destination: PathBuf,
    pub staged: Option<PathBuf>,
    pub cache: Option<String>,
    pub inject: Option<bool>,
    pub scope: Option<ExportScope>,
}

/// Main library interface: pipeline runs plus cache management
pub struct RizomBridge {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
    controller: PipelineController,
}

impl RizomBridge {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let shutdown = GracefulShutdown::new()?;
        Ok(Self::with_shutdown(config, output_mode, verbose, quiet, shutdown))
    }

    /// Create an instance for testing (no signal handler conflicts)
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self::with_shutdown(config, output_mode, verbose, quiet, GracefulShutdown::new_for_test())
    }

    fn with_shutdown(
        config: Config,
        output_mode: OutputMode,
        verbose: u8,
        quiet: bool,
        shutdown: GracefulShutdown,
    ) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        // Spinners would interleave with machine-readable output.
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let controller = PipelineController::from_config(&config);

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
            controller,
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(config, cli_args.output_mode(), cli_args.verbose, cli_args.quiet)
    }

    /// Extract then load `source`. `extract` overrides `[import] extract`.
    pub async fn import(&self, source: &Path, extract: Option<bool>) -> Result<PipelineReport> {
        self.shutdown.check_shutdown()?;

        let request = ImportRequest {
            source_path: source.to_path_buf(),
            extract: extract.unwrap_or(self.config.import.extract),
        };

        self.output_formatter
            .start_operation(&format!("Importing {}", source.display()));
        self.run_pipeline(PipelineRequest::Import(request), None, "Extracting RizomUV data")
            .await
    }

    pub async fn export(&self, options: &ExportOptions) -> Result<PipelineReport> {
        self.shutdown.check_shutdown()?;

        let inject = options.inject.unwrap_or(self.config.export.inject);
        let selected_artifact = if inject {
            self.select_artifact(options.cache.as_deref(), &options.destination)?
        } else {
            if let Some(selector) = options.cache.as_deref() {
                tracing::warn!(selector, "Cache selector given but injection is disabled");
                self.output_formatter.warning(&format!(
                    "Ignoring --cache {}: injection is disabled in the configuration",
                    selector
                ));
            }
            None
        };

        let request = ExportRequest {
            destination_path: options.destination.clone(),
            selected_artifact,
            scope: options.scope.unwrap_or(self.config.export.scope),
            inject,
        };

        self.output_formatter
            .start_operation(&format!("Exporting {}", options.destination.display()));
        self.run_pipeline(
            PipelineRequest::Export(request),
            options.staged.clone(),
            "Exporting and injecting RizomUV data",
        )
        .await
    }

    async fn run_pipeline(
        &self,
        request: PipelineRequest,
        staged: Option<PathBuf>,
        message: &str,
    ) -> Result<PipelineReport> {
        let controller = self.controller.clone();
        let host = self.build_host(staged);

        let spinner = self.progress_manager.create_spinner(message);
        let result = task::spawn_blocking(move || controller.run(&request, host.as_ref()))
            .await
            .map_err(|e| BridgeError::Io(io::Error::other(format!("Pipeline task failed: {}", e))))
            .and_then(|result| result);

        match &result {
            Ok(report) => ui::progress::finish_spinner(&spinner, report),
            Err(_) => spinner.finish_and_clear(),
        }

        result
    }

    /// Resolve the cache to inject. An explicit selector must match; without
    /// one, the cache named after the destination is used when present.
    pub fn select_artifact(&self, selector: Option<&str>, destination: &Path) -> Result<Option<PathBuf>> {
        let store = self.controller.store();

        if let Some(selector) = selector {
            return store
                .find(selector)
                .map(|entry| Some(entry.artifact_path))
                .ok_or_else(|| BridgeError::CacheEntryNotFound {
                    selector: selector.to_string(),
                });
        }

        let name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match store.find(&name) {
            Some(entry) => {
                self.output_formatter
                    .info(&format!("Using cache {}", entry.display_label()));
                Ok(Some(entry.artifact_path))
            }
            None => {
                tracing::debug!(destination = %destination.display(), "No cache matches the destination name");
                Ok(None)
            }
        }
    }

    /// Configured host commands win; otherwise the staged container is used.
    pub fn build_host(&self, staged: Option<PathBuf>) -> Box<dyn SceneHost> {
        let mut fallback = StagedHost::new();
        if let Some(staged) = staged {
            fallback = fallback.with_staged_export(staged);
        }

        let host_config = &self.config.host;
        if host_config.import_command.is_none() && host_config.export_command.is_none() {
            return Box::new(fallback);
        }

        Box::new(
            CommandHost::new(CodecInvoker::new(self.config.codec_timeout()))
                .with_import_command(host_config.import_command.clone())
                .with_export_command(host_config.export_command.clone())
                .with_fallback(fallback),
        )
    }

    pub fn cache_dir(&self) -> &Path {
        self.controller.store().root()
    }

    pub fn cache_entries(&self) -> Vec<CacheEntry> {
        self.controller.store().list_entries()
    }

    pub fn artifact_path_for(&self, source: &str) -> PathBuf {
        self.controller.store().resolve_artifact_path(source)
    }

    pub fn delete_cache(&self, artifact_file_name: &str) -> bool {
        self.controller.store().delete(artifact_file_name)
    }

    pub fn clear_cache(&self) -> usize {
        self.controller.store().clear()
    }

    pub fn inspect_artifact(&self, selector: &str) -> Result<(CacheEntry, Vec<ArtifactRecord>)> {
        let entry = self
            .controller
            .store()
            .find(selector)
            .ok_or_else(|| BridgeError::CacheEntryNotFound {
                selector: selector.to_string(),
            })?;
        let records = cache::read_artifact(&entry.artifact_path)?;
        Ok((entry, records))
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &BridgeError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rizombridge {} ({}) for {}",
            self.version, self.git_hash, self.target
        )
    }
}
