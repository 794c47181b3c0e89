use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use entity_sense::{
    CreateWatchListEntityRequest, EmbeddingProvider, EnrollmentService, EntitySenseConfig,
    HashingEmbeddingProvider, OllamaEmbeddingProvider, RiskCategory, ScreeningService,
    SqliteWatchlistStore, ValidatePaymentRequest, WatchlistStore,
};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Screen payment counterparties against a watchlist", long_about = None)]
struct Cli {
    /// TOML config file (defaults apply when missing)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// Use the deterministic offline embedding provider instead of HTTP
    #[clap(long, global = true)]
    offline: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the watchlist database
    Init,

    /// Add one entity to the watchlist
    Enroll {
        #[clap(long)]
        name: String,
        #[clap(long)]
        address: Option<String>,
        #[clap(long)]
        country: Option<String>,
        /// Known account number (repeatable)
        #[clap(long = "account")]
        accounts: Vec<String>,
        #[clap(long)]
        risk_category: RiskCategory,
    },

    /// Bulk enroll from CSV (name,address,country,known_accounts,risk_category)
    Import { csv: PathBuf },

    /// Screen a payee; prints the decision as JSON, exits 2 on BLOCK
    Screen {
        #[clap(long)]
        payee_name: String,
        #[clap(long)]
        payee_address: Option<String>,
        #[clap(long)]
        payee_country: Option<String>,
        #[clap(long)]
        account_number: Option<String>,
    },

    /// List enrolled entries
    List,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "entity_sense=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn build_provider(config: &EntitySenseConfig, offline: bool) -> Result<Arc<dyn EmbeddingProvider>> {
    if offline {
        return Ok(Arc::new(HashingEmbeddingProvider::new(config.embedding_dimension)));
    }
    let provider = OllamaEmbeddingProvider::new(config).context("Failed to build HTTP client")?;
    Ok(Arc::new(provider))
}

fn open_store(config: &EntitySenseConfig) -> Result<Arc<SqliteWatchlistStore>> {
    let store = SqliteWatchlistStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {:?}", config.database_path))?;
    Ok(Arc::new(store))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = EntitySenseConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Init => {
            let store = open_store(&config)?;
            println!("✓ Database ready: {:?} ({} entries)", config.database_path, store.count()?);
        }

        Command::Enroll {
            name,
            address,
            country,
            accounts,
            risk_category,
        } => {
            let service = EnrollmentService::new(build_provider(&config, cli.offline)?, open_store(&config)?, &config);
            let entry = service.enroll(&CreateWatchListEntityRequest {
                name,
                address,
                country,
                known_accounts: Some(accounts),
                risk_category: Some(risk_category),
            })?;
            println!("✓ Enrolled #{} {} [{}]", entry.id, entry.name, entry.risk_category);
        }

        Command::Import { csv } => {
            let service = EnrollmentService::new(build_provider(&config, cli.offline)?, open_store(&config)?, &config);
            let file = File::open(&csv).with_context(|| format!("Failed to open CSV file {:?}", csv))?;
            let enrolled = service.import_csv(file)?;
            println!("✓ Imported {} watchlist entries", enrolled.len());
        }

        Command::Screen {
            payee_name,
            payee_address,
            payee_country,
            account_number,
        } => {
            let service = ScreeningService::new(build_provider(&config, cli.offline)?, open_store(&config)?, &config);
            let decision = service.screen(&ValidatePaymentRequest {
                payee_name,
                payee_address,
                payee_country,
                account_number,
            })?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
            if decision.is_blocked() {
                std::process::exit(2);
            }
        }

        Command::List => {
            let store = open_store(&config)?;
            for entry in store.find_all()? {
                println!(
                    "#{:<5} {:<14} {} | {} | {} | accounts: [{}]",
                    entry.id,
                    entry.risk_category.as_str(),
                    entry.name,
                    entry.address.as_deref().unwrap_or("-"),
                    entry.country.as_deref().unwrap_or("-"),
                    entry.known_accounts.join(", "),
                );
            }
        }
    }

    Ok(())
}
