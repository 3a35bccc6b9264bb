//! eurogdp CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use eurogdp::{
    commands::{
        cmd_export, cmd_init, cmd_scrape, cmd_status, open_existing_db, print_scrape_stats,
        print_status, ScrapeOptions,
    },
    config::Config,
    error::Result,
    logging::LogConfig,
};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "eurogdp")]
#[command(version, about = "Harvest Eurostat GDP tables into SQLite", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize eurogdp configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Extract the GDP table and store it
    Scrape {
        /// Show the browser window
        #[arg(long)]
        no_headless: bool,

        /// Disable the Chrome sandbox (Docker/CI)
        #[arg(long)]
        no_sandbox: bool,

        /// Export the dataset to this CSV file afterwards
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show database status and recent runs
    Status,

    /// Export stored observations to CSV
    Export {
        /// Output file
        path: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "eurogdp", &mut std::io::stdout());
        return Ok(());
    }

    if let Commands::Init { force } = cli.command {
        console_logging(&cli).install()?;
        // A config path means "initialize next to this file"
        let base_dir = cli
            .config
            .as_deref()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf());
        let config = cmd_init(base_dir, force).await?;

        if cli.json {
            let paths = serde_json::json!({
                "base_dir": config.paths.base_dir,
                "config_file": config.paths.config_file,
                "db_file": config.paths.db_file,
            });
            println!("{}", serde_json::to_string_pretty(&paths)?);
        } else {
            println!(
                "✓ Initialized eurogdp at {}",
                config.paths.base_dir.display()
            );
            println!("  Config: {}", config.paths.config_file.display());
            println!("  Database: {}", config.paths.db_file.display());
        }
        return Ok(());
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            console_logging(&cli).install()?;
            return Err(e);
        }
    };
    LogConfig::from_config(&config, cli.verbose, cli.json).install()?;

    match cli.command {
        Commands::Scrape {
            no_headless,
            no_sandbox,
            csv,
        } => {
            let db = open_existing_db(&config).await?;
            let options = ScrapeOptions {
                headless: no_headless.then_some(false),
                sandbox: no_sandbox.then_some(false),
                csv,
            };

            let result = cmd_scrape(&config, &db, options).await;
            db.close().await;
            let stats = result?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_scrape_stats(&stats);
            }
        }

        Commands::Status => {
            let db = open_existing_db(&config).await?;
            let status = cmd_status(&config, &db).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Export { path } => {
            let db = open_existing_db(&config).await?;
            let rows = cmd_export(&db, &path).await?;

            if cli.json {
                println!("{}", serde_json::json!({ "path": path, "rows": rows }));
            } else {
                println!("✓ Exported {} observations to {}", rows, path.display());
            }
        }

        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load(path),
        None => Config::load_from(None),
    }
}

/// Logging for commands that run before a config is available
fn console_logging(cli: &Cli) -> LogConfig {
    LogConfig {
        level: if cli.verbose { "debug" } else { "info" }.to_string(),
        json: cli.json,
        file: None,
    }
}
