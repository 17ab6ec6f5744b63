use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tcg_checkout::application::storefront::Storefront;
use tcg_checkout::config::StoreConfig;
use tcg_checkout::domain::order::ShippingDetails;
use tcg_checkout::domain::ports::StoreHandle;
use tcg_checkout::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use tcg_checkout::infrastructure::rocksdb::RocksDBStore;
use tcg_checkout::interfaces::csv::order_writer::OrderWriter;
use tcg_checkout::interfaces::csv::script_reader::{Outcome, ScriptReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue the next IDs for a prefix
    NextId {
        /// Alphabetic prefix such as PROD or ORD
        prefix: String,

        /// How many IDs to issue
        #[arg(short, long, default_value_t = 1)]
        count: u32,
    },
    /// Run a store script and print the placed orders and final stock
    Replay {
        /// Script CSV file (op,user,item,quantity,price)
        script: PathBuf,

        /// Shipping address JSON used for every order in the script
        #[arg(short, long)]
        address: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "tcg_checkout=warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = StoreConfig::from_env().into_diagnostic()?;
    let store = Storefront::new(open_store(cli.db_path)?, &config);

    match cli.command {
        Commands::NextId { prefix, count } => {
            for _ in 0..count {
                println!("{}", store.ids.generate_id(&prefix).await.into_diagnostic()?);
            }
        }
        Commands::Replay { script, address } => replay(&store, script, address).await?,
    }

    Ok(())
}

fn open_store(db_path: Option<PathBuf>) -> Result<StoreHandle> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Arc::new(RocksDBStore::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
            );
            Ok(Arc::new(InMemoryStore::new()))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

async fn replay(store: &Storefront, script: PathBuf, address: PathBuf) -> Result<()> {
    let shipping: ShippingDetails =
        serde_json::from_reader(File::open(address).into_diagnostic()?).into_diagnostic()?;

    let reader = ScriptReader::new(File::open(script).into_diagnostic()?);
    let mut orders = Vec::new();
    for (line, row) in reader.rows().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                error!(line = line + 2, "Error reading script row: {}", e);
                continue;
            }
        };
        match row.apply(store, &shipping).await {
            Ok(Outcome::Order(order)) => orders.push(order),
            Ok(_) => {}
            Err(e) => error!(line = line + 2, op = ?row.op, "Error applying script row: {}", e),
        }
    }

    let variants = store.catalog.list_variants().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(&orders).into_diagnostic()?;
    writer.write_stock(&variants).into_diagnostic()?;

    Ok(())
}
