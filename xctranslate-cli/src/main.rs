use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use xctranslate::{Interrupt, ProviderKind};
use xctranslate_cli::{
    Config, StatusOptions, TranslateOptions, logging, run_status_command, run_translate_command,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,

    /// Configuration file (defaults to xctranslate.toml/.yaml/.yml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug diagnostics (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Machine-translate missing entries of a string catalog, saving as it goes.
    Translate {
        /// The .xcstrings catalog to update
        #[arg(short, long)]
        catalog: Option<String>,

        /// Target language (defaults to the least complete one)
        #[arg(short, long, conflicts_with = "all")]
        lang: Option<String>,

        /// Run every incomplete language, least complete first
        #[arg(long)]
        all: bool,

        /// Maximum number of provider calls for this invocation
        #[arg(long)]
        max: Option<usize>,

        /// Save after this many updated entries
        #[arg(long)]
        checkpoint_every: Option<usize>,

        /// Provider calls kept in flight
        #[arg(long)]
        workers: Option<usize>,

        /// Translation backend: mymemory, google or deepl
        #[arg(long)]
        provider: Option<ProviderKind>,

        /// Override the catalog's source language
        #[arg(long)]
        source_lang: Option<String>,

        /// Show what would be translated without calling the provider or writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show translation coverage per language.
    Status {
        /// The .xcstrings catalog to inspect
        #[arg(short, long)]
        catalog: Option<String>,

        /// Only report this language
        #[arg(short, long)]
        lang: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    let result = match args.commands {
        Commands::Completions { shell } => {
            let mut command = Args::command();
            clap_complete::generate(shell, &mut command, "xctranslate", &mut std::io::stdout());
            Ok(())
        }
        Commands::Status {
            catalog,
            lang,
            json,
        } => Config::load(args.config.as_deref())
            .map_err(|e| e.to_string())
            .and_then(|config| {
                run_status_command(StatusOptions {
                    catalog: config
                        .catalog_path(catalog.as_deref())
                        .display()
                        .to_string(),
                    lang,
                    languages: config.target_languages(),
                    json,
                })
            }),
        Commands::Translate {
            catalog,
            lang,
            all,
            max,
            checkpoint_every,
            workers,
            provider,
            source_lang,
            dry_run,
        } => match Config::load(args.config.as_deref()) {
            Ok(config) => {
                let interrupt = Interrupt::new();
                watch_ctrl_c(interrupt.clone());
                let opts = TranslateOptions {
                    catalog,
                    lang,
                    all,
                    max,
                    checkpoint_every,
                    workers,
                    provider,
                    source_lang,
                    dry_run,
                };
                run_translate_command(opts, &config, interrupt).await
            }
            Err(e) => Err(e.to_string()),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// First Ctrl-C stops the run after a final save; a second one aborts.
fn watch_ctrl_c(interrupt: Interrupt) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("Interrupted; saving progress (press Ctrl-C again to abort)");
        interrupt.trip();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
