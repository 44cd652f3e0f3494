use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::host::ExportScope;
use crate::ui::OutputMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rizombridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Carry RizomUV data through FBX import and export")]
#[command(
    long_about = "rizombridge extracts RizomUV-specific data from FBX files into a cache on import, \
                  and injects a cached copy back into the plain FBX your 3D host exports."
)]
#[command(before_help = "📦 rizombridge - RizomUV FBX bridge")]
#[command(after_help = "EXAMPLES:\n  \
    rizombridge import scenes/crate.fbx\n  \
    rizombridge export out/crate.fbx --from staged/crate.fbx\n  \
    rizombridge export out/crate.fbx --from staged/crate.fbx --cache barrel.fbx --selected\n  \
    rizombridge export out/crate.fbx --from staged/crate.fbx --all\n  \
    rizombridge cache list --output-format json\n  \
    rizombridge --extractor ./bin/ekstraktor --timeout 120 import crate.fbx")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Cache directory (defaults to .cache next to the executable)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Extractor executable
    #[arg(long, global = true)]
    pub extractor: Option<PathBuf>,

    /// Injector executable
    #[arg(long, global = true)]
    pub injector: Option<PathBuf>,

    /// Codec timeout in seconds
    #[arg(
        long,
        global = true,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Time limit for one extractor/injector run (seconds)"
    )]
    pub timeout: Option<u64>,

    /// Output format for results
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract RizomUV data from an FBX into the cache, then load it into the host
    Import {
        /// FBX file to import
        source: PathBuf,

        /// Load the file without extracting its RizomUV data
        #[arg(long)]
        no_extract: bool,
    },

    /// Export through the host and inject a cached artifact into the result
    Export {
        /// Final FBX file to write
        destination: PathBuf,

        /// FBX already exported by the host, used when no host export command is configured
        #[arg(long, value_name = "STAGED")]
        from: Option<PathBuf>,

        /// Cache to inject, by source file name, artifact name or base name
        /// (defaults to the cache matching the destination's name)
        #[arg(long, value_name = "SELECTOR", conflicts_with = "no_inject")]
        cache: Option<String>,

        /// Write the plain export without RizomUV data
        #[arg(long)]
        no_inject: bool,

        /// Export only the selected objects
        #[arg(long, conflicts_with = "all")]
        selected: bool,

        /// Export every object, overriding a configured selected scope
        #[arg(long)]
        all: bool,
    },

    /// Inspect and manage cached artifacts
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },

    /// Write a sample configuration file
    InitConfig {
        /// Where to write it (defaults to rizombridge.toml)
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// List cached artifacts
    List,

    /// Print the artifact path a source FBX maps to
    Path {
        /// Source FBX file name or path
        source: String,
    },

    /// Decode an artifact and show what it holds
    Inspect {
        /// Source file name, artifact name or base name
        selector: String,
    },

    /// Delete one artifact
    Delete {
        /// Artifact file name, e.g. crate.dat
        artifact: String,
    },

    /// Delete every artifact
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<&OutputFormat> for OutputMode {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_cache_dir(self.cache_dir.clone())
            .with_extractor(self.extractor.clone())
            .with_injector(self.injector.clone())
            .with_timeout(self.timeout)
    }

    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(&self.output_format)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

impl Commands {
    /// Export scope requested on the command line, if any.
    pub fn export_scope(&self) -> Option<ExportScope> {
        match self {
            Commands::Export { selected: true, .. } => Some(ExportScope::Selected),
            Commands::Export { all: true, .. } => Some(ExportScope::All),
            _ => None,
        }
    }
}
