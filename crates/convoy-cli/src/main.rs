use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "convoy",
    about = "Convoy: declarative multi-service deployment orchestrator",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Converge a stack: bring every service up in dependency order,
    /// gating each wave on health. Exits non-zero if any service fails.
    Deploy {
        /// Path to the stack spec (TOML).
        spec: PathBuf,
        /// Runtime backend to drive (currently: docker).
        #[arg(long, default_value = "docker")]
        runtime: String,
    },
    /// Resolve and print the deployment plan without touching the runtime.
    Plan {
        /// Path to the stack spec (TOML).
        spec: PathBuf,
    },
    /// Print the current runtime state of every service in the stack.
    Status {
        /// Path to the stack spec (TOML).
        spec: PathBuf,
        #[arg(long, default_value = "docker")]
        runtime: String,
    },
    /// Stop every service in reverse dependency order.
    Down {
        /// Path to the stack spec (TOML).
        spec: PathBuf,
        #[arg(long, default_value = "docker")]
        runtime: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("convoy=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy { spec, runtime } => commands::deploy::deploy(&spec, &runtime).await,
        Commands::Plan { spec } => commands::plan::plan(&spec),
        Commands::Status { spec, runtime } => commands::status::status(&spec, &runtime).await,
        Commands::Down { spec, runtime } => commands::down::down(&spec, &runtime).await,
    }
}
