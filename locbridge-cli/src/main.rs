use std::{io, path::PathBuf};

use anyhow::Context;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use locbridge::{Platform, run_hook};
use locbridge_cli::{LoggingProjectCache, Settings, build_config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "locbridge", author, version, about, long_about = None)]
struct Args {
    /// More output (`-v` for debug logs)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Render translations/app/*.json into the native string resources.
    Run {
        /// Root of the hybrid project (where config.xml and platforms/ live)
        #[arg(long, default_value = ".")]
        project_root: PathBuf,

        /// TOML config file; defaults to <project-root>/locbridge.toml when present
        #[arg(long)]
        config: Option<PathBuf>,

        /// Platform to render; repeat for several. Defaults to the platforms/ subdirectories
        #[arg(long = "platform", value_name = "PLATFORM")]
        platforms: Vec<Platform>,

        /// iOS app name; defaults to <name> in config.xml
        #[arg(long)]
        app_name: Option<String>,

        /// Android res directory
        #[arg(long)]
        android_res: Option<PathBuf>,

        /// Locale written to the unsuffixed Android values/ directory
        #[arg(long)]
        default_locale: Option<String>,

        /// Directory holding the <lang>.json translation files
        #[arg(long)]
        translations: Option<PathBuf>,
    },

    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match args.commands {
        Commands::Run {
            project_root,
            config,
            platforms,
            app_name,
            android_res,
            default_locale,
            translations,
        } => {
            let flags = Settings {
                platforms: (!platforms.is_empty()).then_some(platforms),
                app_name,
                android_res,
                default_locale,
                translations,
            };
            let settings = Settings::discover(&project_root, config.as_deref())?.overridden_by(flags);
            let hook_config = build_config(&project_root, &settings)?;

            let report = run_hook(&hook_config, &LoggingProjectCache)
                .context("localization hook failed")?;
            info!(
                "Rendered {} translation file(s) into {} resource file(s)",
                report.sources,
                report.files_written()
            );
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Args::command(), "locbridge", &mut io::stdout());
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
