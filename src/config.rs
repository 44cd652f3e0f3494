use crate::codec::CodecCommand;
use crate::error::{BridgeError, Result};
use crate::host::ExportScope;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheConfig,
    pub codecs: CodecConfig,
    pub import: ImportConfig,
    pub export: ExportConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub directory: PathBuf,
    pub extension: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Seconds a single extractor/injector run may take.
    pub timeout: u64,
    pub validate_artifacts: bool,
    pub extractor: CodecCommand,
    pub injector: CodecCommand,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportConfig {
    pub extract: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub inject: bool,
    pub scope: ExportScope,
    pub temp_suffix: String,
}

/// Commands that stand in for the 3D host. Each is a program followed by
/// arguments; `{path}` and `{scope}` are substituted per call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    pub import_command: Option<Vec<String>>,
    pub export_command: Option<Vec<String>>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: install_dir().join(".cache"),
            extension: "dat".to_string(),
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        let bin = install_dir().join("bin");
        Self {
            timeout: 60,
            validate_artifacts: true,
            extractor: CodecCommand::new(bin.join(format!("ekstraktor{}", std::env::consts::EXE_SUFFIX))),
            injector: CodecCommand::new(bin.join(format!("injektor{}", std::env::consts::EXE_SUFFIX))),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { extract: true }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            inject: true,
            scope: ExportScope::All,
            temp_suffix: ".temp.fbx".to_string(),
        }
    }
}

/// Directory holding the running executable; the cache and codec
/// binaries live relative to it by default.
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BridgeError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| BridgeError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| BridgeError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = [
                    PathBuf::from("rizombridge.toml"),
                    PathBuf::from(".rizombridge.toml"),
                    install_dir().join("rizombridge.toml"),
                ];

                for default_path in &default_paths {
                    if default_path.is_file() {
                        tracing::debug!(path = %default_path.display(), "Using configuration file");
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref cache_dir) = cli_args.cache_dir {
            self.cache.directory = cache_dir.clone();
        }

        if let Some(ref extractor) = cli_args.extractor {
            self.codecs.extractor = CodecCommand::new(extractor.clone());
        }

        if let Some(ref injector) = cli_args.injector {
            self.codecs.injector = CodecCommand::new(injector.clone());
        }

        if let Some(timeout) = cli_args.timeout {
            self.codecs.timeout = timeout;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| BridgeError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| BridgeError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.codecs.timeout == 0 {
            return Err(BridgeError::Config {
                message: "Codec timeout must be greater than 0".to_string(),
            });
        }

        let extension = self.cache.extension.trim_start_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            return Err(BridgeError::Config {
                message: format!("Invalid cache extension: '{}'", self.cache.extension),
            });
        }

        if self.export.temp_suffix.is_empty() {
            return Err(BridgeError::Config {
                message: "Temporary export suffix must not be empty".to_string(),
            });
        }

        for (name, command) in [
            ("import_command", &self.host.import_command),
            ("export_command", &self.host.export_command),
        ] {
            if command.as_ref().is_some_and(|c| c.is_empty()) {
                return Err(BridgeError::Config {
                    message: format!("host.{} must name a program", name),
                });
            }
        }

        Ok(())
    }

    pub fn codec_timeout(&self) -> Duration {
        Duration::from_secs(self.codecs.timeout)
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub cache_dir: Option<PathBuf>,
    pub extractor: Option<PathBuf>,
    pub injector: Option<PathBuf>,
    pub timeout: Option<u64>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_dir(mut self, cache_dir: Option<PathBuf>) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    pub fn with_extractor(mut self, extractor: Option<PathBuf>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_injector(mut self, injector: Option<PathBuf>) -> Self {
        self.injector = injector;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<u64>) -> Self {
        self.timeout = timeout;
        self
    }
}
