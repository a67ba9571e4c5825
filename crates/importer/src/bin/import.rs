use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use importer::{ImportContext, import_directory, import_file};
use storage::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pitwall-import")]
#[command(about = "Offline competition importer and map baseline maintenance", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a single submission JSON file
    Submit {
        file: PathBuf,

        #[arg(long)]
        validate_only: bool,
    },
    /// Import every submission JSON file in a directory
    BulkImport {
        #[arg(long, default_value = "./imports")]
        directory: PathBuf,

        #[arg(long)]
        validate_only: bool,
    },
    /// Recompute stored expected times, for one map or all of them
    RecomputeBaselines {
        #[arg(long)]
        map_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pitwall_import={log_level},importer={log_level},storage={log_level}")
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Submit {
            file,
            validate_only,
        } => {
            let context = connect_unless(validate_only, cli.database_url.as_deref()).await?;
            tracing::info!("Loading submission from: {}", file.display());
            import_file(&file, context.as_ref()).await?;
            tracing::info!("Done");
        }
        Commands::BulkImport {
            directory,
            validate_only,
        } => {
            tracing::info!("Scanning directory for submission files: {}", directory.display());
            let context = connect_unless(validate_only, cli.database_url.as_deref()).await?;
            let summary = import_directory(&directory, context.as_ref()).await?;
            if !summary.failed.is_empty() {
                return Err(format!("{} file(s) failed to import", summary.failed.len()).into());
            }
        }
        Commands::RecomputeBaselines { map_id } => {
            let context = connect(cli.database_url.as_deref()).await?;
            let failures = context.recompute_baselines(map_id.as_deref()).await?;
            if failures > 0 {
                return Err(format!("{failures} map(s) failed to recompute").into());
            }
        }
    }

    Ok(())
}

async fn connect(database_url: Option<&str>) -> Result<ImportContext, Box<dyn std::error::Error>> {
    let database_url = database_url.ok_or("DATABASE_URL or --database-url is required")?;
    tracing::info!("Connecting to database...");
    let database = Database::new(database_url).await?;
    Ok(ImportContext::new(Arc::new(database)))
}

async fn connect_unless(
    validate_only: bool,
    database_url: Option<&str>,
) -> Result<Option<ImportContext>, Box<dyn std::error::Error>> {
    if validate_only {
        return Ok(None);
    }
    connect(database_url).await.map(Some)
}
