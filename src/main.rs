//! Casa command line.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use casa::config::loader::{load_or_init, ConfigError};
use casa::observability::init_tracing;
use casa::{server, CasaError};

#[derive(Parser)]
#[command(name = "casa", version)]
#[command(about = "Casa is a home automation service backed by MQTT", long_about = None)]
struct Cli {
    /// Config file (default is $HOME/.casa.toml, then ./.casa.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Casa server with an internal message bus
    Server,
    /// Print the effective configuration
    Config {
        /// Print as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("casa: {}", e);
            1
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<i32, CasaError> {
    let loaded = load_or_init(cli.config.as_deref())?;

    match cli.command {
        Commands::Config { json } => {
            let rendered = if json {
                serde_json::to_string_pretty(&loaded.config)?
            } else {
                toml::to_string_pretty(&loaded.config).map_err(ConfigError::from)?
            };
            println!("{}", rendered);
            Ok(0)
        }
        Commands::Server => {
            init_tracing(loaded.config.debug);
            if loaded.created {
                tracing::info!(path = ?loaded.path, "No config file found, wrote defaults");
            }
            tracing::info!(
                path = ?loaded.path,
                cores = loaded.config.cores,
                "casa v{} starting",
                env!("CARGO_PKG_VERSION")
            );

            let runtime = server::build_runtime(loaded.config.cores).map_err(CasaError::Runtime)?;
            runtime.block_on(server::run(loaded))
        }
    }
}
