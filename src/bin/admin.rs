//! CLI administration tool for shortstore.
//!
//! Runs storage operations directly against the configured backend without
//! going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Check database name and connectivity
//! cargo run --bin admin -- db check
//!
//! # Show backend, database and table names
//! cargo run --bin admin -- db info
//!
//! # Apply pending migrations
//! cargo run --bin admin -- migrate
//!
//! # List registered and applied migrations
//! cargo run --bin admin -- migrations
//!
//! # Create a short URL
//! cargo run --bin admin -- shorten https://example.com --base https://s.example.com
//!
//! # Resolve a short code
//! cargo run --bin admin -- resolve Xy12abC
//! ```
//!
//! # Environment Variables
//!
//! Same as the server, see [`shortstore::config`]. `DATABASE_URL` is required.
//! Library logs go to stderr, filtered by `RUST_LOG` (default `warn`).

use shortstore::application::services::{SchemaInitializer, ShorteningService};
use shortstore::config::{Config, load_from_env, mask_connection_string};
use shortstore::infrastructure::persistence::table_names::{migrations_table, shortened_table};
use shortstore::infrastructure::persistence::{StorageHandles, connect};
use shortstore::utils::code_generator::CodeGenerator;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

/// CLI tool for managing shortstore.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// Apply pending migrations
    Migrate,

    /// List registered migrations and whether they are applied
    Migrations,

    /// Create a short URL
    Shorten {
        /// Absolute HTTP/HTTPS URL to shorten
        url: String,

        /// Public base of short URLs (scheme and host)
        #[arg(short, long, default_value = "http://localhost:3000")]
        base: String,
    },

    /// Resolve a short code to its original URL
    Resolve {
        /// Short code
        code: String,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Validate the database name and check connectivity
    Check,

    /// Show backend and table information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = load_from_env().context("Invalid configuration")?;

    let handles = connect(&config.storage)
        .await
        .context("Failed to create storage backend")?;

    match cli.command {
        Commands::Db { action } => handle_db_action(action, &config, &handles).await?,
        Commands::Migrate => handle_migrate(&handles).await?,
        Commands::Migrations => handle_migrations(&handles).await?,
        Commands::Shorten { url, base } => handle_shorten(&config, &handles, &url, &base).await?,
        Commands::Resolve { code } => handle_resolve(&config, &handles, &code).await?,
    }

    Ok(())
}

/// Dispatches database commands.
async fn handle_db_action(action: DbAction, config: &Config, handles: &StorageHandles) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database...".bright_blue());

            let initializer = SchemaInitializer::for_backend(handles.schema.clone());
            initializer
                .validate(&CancellationToken::new())
                .await
                .context("Database check failed")?;

            println!("{}", "✅ Database name valid, connection OK".green().bold());
        }
        DbAction::Info => {
            let storage = &config.storage;

            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();
            println!("  Backend:     {}", storage.backend.to_string().bright_white());
            println!(
                "  Connection:  {}",
                mask_connection_string(&storage.connection_string).bright_black()
            );
            println!("  Database:    {}", storage.database_name.cyan());
            println!("  Table:       {}", shortened_table(&storage.table_prefix).cyan());
            println!("  Migrations:  {}", migrations_table(&storage.table_prefix).cyan());
            println!(
                "  Codes:       {} chars from {} symbols",
                storage.code_length,
                storage.alphabet.chars().count()
            );
            println!();
        }
    }

    Ok(())
}

/// Validates the store and applies pending migrations.
async fn handle_migrate(handles: &StorageHandles) -> Result<()> {
    println!("{}", "🛠  Applying migrations".bright_blue().bold());
    println!();

    let initializer = SchemaInitializer::for_backend(handles.schema.clone());
    let report = initializer
        .run(&CancellationToken::new())
        .await
        .context("Migration failed")?;

    for name in &report.skipped {
        println!("  {} {}", "skip ".bright_black(), name.bright_black());
    }
    for name in &report.applied {
        println!("  {} {}", "apply".green(), name.bright_white());
    }

    println!();
    println!("{}", format!("✅ {}", report.summary()).green().bold());
    println!();

    Ok(())
}

/// Lists the registry next to the bookkeeping records.
///
/// Registry names carry the current timestamp, so each registered migration
/// is matched to its applied record by slug.
async fn handle_migrations(handles: &StorageHandles) -> Result<()> {
    println!("{}", "📋 Migrations".bright_blue().bold());
    println!();

    let initializer = SchemaInitializer::for_backend(handles.schema.clone());
    let applied = handles
        .schema
        .applied_migrations()
        .await
        .context("Failed to read applied migrations (has `migrate` been run?)")?;

    let applied_slugs: HashSet<&str> = applied
        .iter()
        .map(|m| slug_of(&m.migration_name))
        .collect();

    println!(
        "  {:<32} {:<36} {}",
        "Migration".bright_white().bold(),
        "Target".bright_white().bold(),
        "Status".bright_white().bold()
    );
    println!("  {}", "─".repeat(78).bright_black());

    for migration in initializer.registry().migrations() {
        let slug = slug_of(&migration.name);
        let status = if applied_slugs.contains(slug) {
            "applied".green()
        } else {
            "pending".yellow()
        };

        println!("  {:<32} {:<36} {}", slug, migration.target.cyan(), status);
    }

    println!();
    if !applied.is_empty() {
        println!("{}", "Applied records:".bright_white());
        for record in &applied {
            println!(
                "  {}  {}",
                record.migration_name,
                record
                    .applied_at
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
                    .bright_black()
            );
        }
        println!();
    }

    Ok(())
}

/// Creates one short URL.
async fn handle_shorten(
    config: &Config,
    handles: &StorageHandles,
    url: &str,
    base: &str,
) -> Result<()> {
    let base = Url::parse(base).context("--base must be an absolute URL")?;
    let host = match (base.host_str(), base.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => anyhow::bail!("--base must include a host"),
    };

    let service = shortening_service(config, handles)?;
    let record = service
        .create_short_url(url, base.scheme(), &host)
        .await
        .context("Failed to create short URL")?;

    println!("{}", "✅ Short URL created".green().bold());
    println!();
    println!("  Code:      {}", record.code.bright_yellow().bold());
    println!("  Short URL: {}", record.short_url.cyan());
    println!("  Original:  {}", record.original_url);
    println!();

    Ok(())
}

/// Resolves one short code.
async fn handle_resolve(config: &Config, handles: &StorageHandles, code: &str) -> Result<()> {
    let service = shortening_service(config, handles)?;

    match service
        .get_original_url(Some(code))
        .await
        .context("Failed to resolve short code")?
    {
        Some(url) => println!("{} {}", code.bright_yellow(), url.cyan()),
        None => println!("{}", format!("❌ No URL for code '{code}'").red()),
    }

    Ok(())
}

fn shortening_service(
    config: &Config,
    handles: &StorageHandles,
) -> Result<ShorteningService<dyn shortstore::domain::repositories::ShortenedUrlRepository>> {
    let generator = CodeGenerator::new(&config.storage.alphabet, config.storage.code_length)?;
    Ok(ShorteningService::new(
        handles.repository.clone(),
        Arc::new(generator),
    ))
}

/// `20240101120000000_add-migration-table` -> `add-migration-table`
fn slug_of(name: &str) -> &str {
    name.split_once('_').map_or(name, |(_, slug)| slug)
}
