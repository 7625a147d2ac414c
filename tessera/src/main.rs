use clap::Parser;
use tessera::SqliteRepositoryProvider;
use tessera_core::{
    CodeRepository, PrincipalDirectory, RepositoryProvider,
    repositories::{CodeRepositoryProvider, PrincipalDirectoryProvider},
};
use tracing_subscriber::EnvFilter;

/// Command line interface for Tessera
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "TESSERA_DATABASE_URL")]
    db_url: String,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Delete expired verification codes
    Sweep,
    /// Register an identity so it can request codes
    AddPrincipal {
        /// Email address of the principal
        identity: String,
    },
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("Tessera v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let repositories = SqliteRepositoryProvider::connect(&cli.db_url).await?;

    match cli.command {
        Commands::Migrate => {
            tracing::info!("Running migrations");
            repositories.migrate().await?;
            tracing::info!("Migrations complete");
        }
        Commands::Sweep => {
            let deleted = repositories.code().delete_expired().await?;
            tracing::info!(deleted, "Deleted expired verification codes");
        }
        Commands::AddPrincipal { identity } => {
            tessera_core::validation::validate_email(&identity)?;
            let principal = repositories.principal().resolve_or_create(&identity).await?;
            println!("{} {}", principal.id, principal.identity);
        }
        Commands::Version => {}
    }

    Ok(())
}
