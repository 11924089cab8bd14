mod commands;

use clap::{Args, Parser, Subcommand};
use ferrule_core::{Backend, TargetOverrides};

#[derive(Parser)]
#[command(
    name = "ferrule",
    about = "Package and deploy Python apps to Cloud Functions or Cloud Run"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new ferrule project
    Init {
        /// Project name
        name: String,
    },
    /// Build the deployment archive without deploying
    Package,
    /// Deploy the app and its triggers
    Deploy {
        /// Skip the function/service, only provision triggers
        #[arg(long, conflicts_with = "only_function")]
        skip_function: bool,
        /// Deploy only the function/service, skip triggers
        #[arg(long)]
        only_function: bool,
        /// Upload even if the deployed source is unchanged
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Delete triggers and the function/service
    Destroy {
        /// Also delete the local archive, stored sources and build image
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// GCP project ID (falls back to config, then GOOGLE_PROJECT)
    #[arg(long)]
    project: Option<String>,
    /// GCP region (falls back to config, then GOOGLE_LOCATION)
    #[arg(long)]
    location: Option<String>,
    /// Hosting backend: cloudfunction or cloudrun
    #[arg(long)]
    backend: Option<Backend>,
}

impl From<TargetArgs> for TargetOverrides {
    fn from(args: TargetArgs) -> Self {
        Self {
            project: args.project,
            location: args.location,
            backend: args.backend,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                // arch-lint: allow(no-silent-result-drop) reason="unset or malformed RUST_LOG falls back to info"
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { name } => commands::init(&name)?,
        Commands::Package => commands::package()?,
        Commands::Deploy {
            skip_function,
            only_function,
            force,
            target,
        } => {
            let options = ferrule::DeployOptions {
                skip_function,
                only_function,
                force,
            };
            commands::deploy(options, target.into()).await?
        }
        Commands::Destroy { all, target } => commands::destroy(all, target.into()).await?,
    }

    Ok(())
}
