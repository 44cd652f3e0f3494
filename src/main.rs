use anyhow::Context;
use clap::Parser;
use console::Term;
use rizombridge::{
    BridgeError, CacheCommand, Cli, Commands, ExportOptions, OutcomeStatus, OutputFormatter,
    OutputMode, PipelineReport, RizomBridge, UserFriendlyError,
};
use std::io::IsTerminal;
use std::path::Path;
use std::process;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbosity_level(), cli.quiet) {
        eprintln!("{:#}", e);
    }
    tracing::debug!("{}", rizombridge::build_info());

    if let Commands::InitConfig { path } = &cli.command {
        return handle_init_config(path.as_deref());
    }

    let bridge = match RizomBridge::from_cli(&cli) {
        Ok(bridge) => bridge,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for_error(&e);
        }
    };

    match &cli.command {
        Commands::Import { source, no_extract } => {
            let extract = no_extract.then_some(false);
            finish_pipeline(&bridge, bridge.import(source, extract).await)
        }
        Commands::Export {
            destination,
            from,
            cache,
            no_inject,
            ..
        } => {
            let options = ExportOptions {
                destination: destination.clone(),
                staged: from.clone(),
                cache: cache.clone(),
                inject: no_inject.then_some(false),
                scope: cli.command.export_scope(),
            };
            finish_pipeline(&bridge, bridge.export(&options).await)
        }
        Commands::Cache { command } => handle_cache_command(&bridge, command),
        Commands::InitConfig { .. } => 0,
    }
}

fn finish_pipeline(bridge: &RizomBridge, result: rizombridge::Result<PipelineReport>) -> i32 {
    match result {
        Ok(report) => {
            bridge.output_formatter().print_pipeline_report(&report);
            match report.status {
                OutcomeStatus::Success => 0,
                OutcomeStatus::SuccessWithWarnings => 2,
                OutcomeStatus::Cancelled => 3,
            }
        }
        Err(e) => {
            bridge.handle_error(&e);
            exit_code_for_error(&e)
        }
    }
}

fn handle_cache_command(bridge: &RizomBridge, command: &CacheCommand) -> i32 {
    let formatter = bridge.output_formatter();

    match command {
        CacheCommand::List => {
            formatter.print_cache_listing(bridge.cache_dir(), &bridge.cache_entries());
            0
        }
        CacheCommand::Path { source } => {
            formatter.print_path(&bridge.artifact_path_for(source));
            0
        }
        CacheCommand::Inspect { selector } => match bridge.inspect_artifact(selector) {
            Ok((entry, records)) => {
                formatter.print_artifact(&entry, &records);
                0
            }
            Err(e) => {
                bridge.handle_error(&e);
                exit_code_for_error(&e)
            }
        },
        CacheCommand::Delete { artifact } => {
            if bridge.delete_cache(artifact) {
                formatter.success(&format!("Deleted {}", artifact));
                0
            } else {
                formatter.error(&format!(
                    "Could not delete {} from {}",
                    artifact,
                    bridge.cache_dir().display()
                ));
                1
            }
        }
        CacheCommand::Clear { yes } => {
            let total = bridge.cache_entries().len();
            if total == 0 {
                formatter.info("Cache is already empty");
                return 0;
            }

            if !yes {
                match confirm(&format!("Delete {} cached artifact(s)?", total)) {
                    Some(true) => {}
                    Some(false) => {
                        formatter.info("Nothing deleted");
                        return 0;
                    }
                    None => {
                        formatter.error("Refusing to clear the cache without --yes when not on a terminal");
                        return 1;
                    }
                }
            }

            let removed = bridge.clear_cache();
            if removed == total {
                formatter.success(&format!("Removed {} cached artifact(s)", removed));
                0
            } else {
                formatter.warning(&format!(
                    "Removed {} of {} cached artifacts; the rest could not be deleted",
                    removed, total
                ));
                2
            }
        }
    }
}

/// Ask a yes/no question on the terminal. `None` when nobody can answer.
fn confirm(question: &str) -> Option<bool> {
    if !std::io::stdin().is_terminal() {
        return None;
    }

    let term = Term::stderr();
    term.write_str(&format!("{} [y/N] ", question)).ok()?;
    let answer = term.read_line().ok()?;
    Some(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn handle_init_config(path: Option<&Path>) -> i32 {
    let config_path = path.unwrap_or_else(|| Path::new("rizombridge.toml"));

    match RizomBridge::generate_sample_config(config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path.display());
            println!("\nTo use this configuration:");
            println!("  rizombridge --config {} import <FBX>", config_path.display());
            println!("\nPoint [codecs] at your extractor and injector binaries.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn exit_code_for_error(error: &BridgeError) -> i32 {
    match error {
        BridgeError::Cancelled => 130,
        BridgeError::InvalidPath { .. } => 4,
        BridgeError::Host { .. } => 5,
        BridgeError::CacheEntryNotFound { .. } => 6,
        _ => 1,
    }
}

fn print_startup_error(error: &BridgeError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

fn setup_logging(verbosity: u8, quiet: bool) -> anyhow::Result<()> {
    let level = match (quiet, verbosity) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::WARN,
        (false, 1) => Level::INFO,
        (false, 2) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    Ok(())
}
