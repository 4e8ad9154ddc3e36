//! TechHub CLI - catalog browsing, checkout and order tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! th-cli migrate
//!
//! # Browse the catalog
//! th-cli --catalog-file catalog.json catalog --category peripherals
//!
//! # Place an order
//! th-cli --catalog-file catalog.json checkout --owner u1 --item 1x2 --item 2
//!
//! # Show the latest receipt and follow new orders
//! th-cli receipt --owner u1 --follow
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `catalog` - List categories and products
//! - `checkout` - Place an order for a signed-in owner
//! - `receipt` - Show receipts for an owner

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use techhub_storefront::config::StorefrontConfig;
use techhub_storefront::telemetry;

mod commands;

use commands::checkout::{CheckoutArgs, ItemArg};
use commands::receipt::ReceiptArgs;

#[derive(Parser)]
#[command(name = "th-cli")]
#[command(author, version, about = "TechHub storefront CLI tools")]
struct Cli {
    /// Read the catalog from a JSON file instead of `STOREFRONT_CATALOG_URL`
    #[arg(long, global = true)]
    catalog_file: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// List categories and products
    Catalog {
        /// Only products in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only products whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Place an order
    Checkout {
        /// Owner id of the signed-in customer
        #[arg(short, long)]
        owner: String,

        /// Customer email
        #[arg(short, long)]
        email: Option<String>,

        /// Product to buy, as `ID` or `IDxQTY` (repeatable)
        #[arg(short, long = "item", required = true)]
        items: Vec<ItemArg>,
    },
    /// Show receipts
    Receipt {
        /// Owner id of the customer
        #[arg(short, long)]
        owner: String,

        /// Show every order, newest first
        #[arg(short, long)]
        all: bool,

        /// Keep printing receipts as new orders are placed
        #[arg(short, long)]
        follow: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(1);
        }
    };

    // Initialize Sentry before tracing so its layer has a client
    let _sentry_guard = telemetry::init_sentry(&config.sentry);

    if let Err(e) = telemetry::init_tracing(telemetry::DEFAULT_LOG_FILTER, config.log_json) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Failed to initialize logging: {e}");
        }
    }

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, &config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run(config).await?,
        Commands::Catalog { category, search } => {
            let catalog = commands::open_catalog(config, cli.catalog_file.as_deref())?;
            commands::catalog::run(
                catalog.as_ref(),
                category.as_deref(),
                search.as_deref(),
                config.currency,
                cli.json,
            )
            .await?;
        }
        Commands::Checkout {
            owner,
            email,
            items,
        } => {
            let catalog = commands::open_catalog(config, cli.catalog_file.as_deref())?;
            let args = CheckoutArgs {
                owner,
                email,
                items,
                json: cli.json,
            };
            commands::checkout::run(config, catalog, args).await?;
        }
        Commands::Receipt { owner, all, follow } => {
            let args = ReceiptArgs {
                owner,
                all,
                follow,
                json: cli.json,
            };
            commands::receipt::run(config, args).await?;
        }
    }
    Ok(())
}
