//! Apple Nation CLI - search index and cart tools.
//!
//! # Usage
//!
//! ```bash
//! # Build the search index and show its status
//! an-cli index
//!
//! # Search product names
//! an-cli search "iphone pro"
//!
//! # Work with a file-backed cart slot
//! an-cli cart --slot demo add --id 12 --name "iPhone 15" --price 129999 --attr color=Black
//! an-cli cart --slot demo update 12 3
//! an-cli cart --slot demo list
//!
//! # Show the last order placed from a slot
//! an-cli order --slot demo
//! ```
//!
//! Output is JSON on stdout; logs go to stderr (`RUST_LOG` controls verbosity).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use apple_nation_core::{LineKey, ProductId, VariantId};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "an-cli")]
#[command(author, version, about = "Apple Nation CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the search index from the catalog API
    Index,
    /// Search product names
    Search {
        /// Query text (at least 2 characters)
        query: String,
    },
    /// Operate on a cart slot
    Cart {
        /// Directory holding storage slots
        #[arg(long, env = "STOREFRONT_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Slot name (the visitor id on the server)
        #[arg(long, default_value = "cli")]
        slot: String,

        #[command(subcommand)]
        action: CartAction,
    },
    /// Show the last order placed from a slot
    Order {
        /// Directory holding storage slots
        #[arg(long, env = "STOREFRONT_DATA_DIR", default_value = "./data")]
        data_dir: PathBuf,

        /// Slot name (the visitor id on the server)
        #[arg(long, default_value = "cli")]
        slot: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show lines, count and subtotal
    List,
    /// Add a product
    Add {
        /// Product id
        #[arg(long)]
        id: ProductId,

        /// Variant id
        #[arg(long)]
        variant: Option<VariantId>,

        /// Display name
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long, value_parser = commands::cart::parse_price)]
        price: Decimal,

        /// Image URL
        #[arg(long)]
        image: Option<String>,

        /// Attribute as `name=value` (repeatable)
        #[arg(long = "attr", value_parser = commands::cart::parse_attribute)]
        attributes: Vec<(String, String)>,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (non-numeric input becomes 1)
    Update {
        /// Line key (`product` or `product:variant`)
        key: String,
        /// New quantity
        quantity: String,
    },
    /// Remove a line
    Remove {
        /// Line key (`product` or `product:variant`)
        key: String,
    },
    /// Remove every line
    Clear,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apple_nation_storefront=info,an_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Index => commands::search::index().await?,
        Commands::Search { query } => commands::search::search(&query).await?,
        Commands::Cart {
            data_dir,
            slot,
            action,
        } => {
            let mut cart = commands::cart::open(&data_dir, &slot)?;
            match action {
                CartAction::List => {}
                CartAction::Add {
                    id,
                    variant,
                    name,
                    price,
                    image,
                    attributes,
                    quantity,
                } => {
                    let item =
                        commands::cart::new_item(id, variant, name, price, image, attributes);
                    cart.add_item(item, quantity);
                }
                CartAction::Update { key, quantity } => {
                    cart.update_quantity_text(&LineKey::from_raw(key), &quantity);
                }
                CartAction::Remove { key } => cart.remove_item(&LineKey::from_raw(key)),
                CartAction::Clear => cart.clear(),
            }
            commands::print_json(&commands::cart::summary(&cart))?;
        }
        Commands::Order { data_dir, slot } => commands::cart::last_order(&data_dir, &slot)?,
    }
    Ok(())
}
