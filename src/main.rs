//! touchgfx-cproject-fix: patches STM32CubeIDE TouchGFX projects
//!
//! Adds the missing source folders, include paths and exclusions to a
//! project's `.cproject` file, and optionally installs the newlib heap shim.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use touchgfx_cproject_fix::config;
use touchgfx_cproject_fix::patch::{self, PatchOptions, PatchReport};

/// Patches an STM32CubeIDE project so TouchGFX builds out of the box.
///
/// Creates a timestamped backup of the `.cproject` file before changing it.
#[derive(Parser, Debug)]
#[command(name = "touchgfx-cproject-fix")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The folder path to your project (where your .cproject file is)
    #[arg(short, long, value_name = "PROJECT_DIR")]
    path: PathBuf,

    /// Skip the newlib heap fix. Details: http://www.nadler.com/embedded/newlibAndFreeRTOS.html
    #[arg(short, long)]
    newlib: bool,

    /// Path to configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &PatchReport) {
    println!("Patching project '{}':", report.project_name);
    if let Some(shim) = &report.installed_shim {
        println!("Added {}", shim.display());
    }
    match &report.backup_path {
        Some(backup) => {
            println!("Backing up project to {}", backup.display());
            println!("Successfully patched!");
        }
        None => println!("No patch required."),
    }
    println!();
}

/// Entry point for touchgfx-cproject-fix.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if let Some(source) = e.source() {
                eprintln!("  Caused by: {source}");
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    println!("STM32CubeIDE TouchGFX project patcher");

    let options = PatchOptions {
        project_dir: args.path,
        apply_newlib_fix: !args.newlib,
    };
    tracing::debug!(?options, "Resolved options");

    match patch::run(&options, &cfg.patch) {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                println!("  Caused by: {cause}");
                source = cause.source();
            }
            println!();
            // Negative codes are part of the tool's interface, which
            // `ExitCode` cannot express.
            std::process::exit(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn path_is_required() {
        assert!(Args::try_parse_from(["touchgfx-cproject-fix"]).is_err());
        assert!(Args::try_parse_from(["touchgfx-cproject-fix", "--newlib"]).is_err());
    }

    #[test]
    fn parses_short_and_long_flags() {
        let args = Args::try_parse_from(["touchgfx-cproject-fix", "-p", "/work/Demo", "-n"]).unwrap();
        assert_eq!(args.path, PathBuf::from("/work/Demo"));
        assert!(args.newlib);

        let args = Args::try_parse_from(["touchgfx-cproject-fix", "--path", "/work/Demo"]).unwrap();
        assert!(!args.newlib);
        assert!(args.config.is_none());
    }

    #[test]
    fn log_level_from_flags() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(2, false, "warn"), Level::DEBUG);
    }
}
