//! Stockload CLI - validate and serve CSV inventory interchange
//!
//! ```bash
//! stockload inspect stocks.csv      # Sniff encoding/delimiter/header
//! stockload check stocks.csv        # Dry-run validation report (JSON)
//! stockload serve                   # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockload::{run_import, ImportOptions, MemoryStore};

#[derive(Parser)]
#[command(name = "stockload")]
#[command(about = "CSV bulk import/export for inventory records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sniff a CSV file: encoding, delimiter, header, sample rows
    Inspect {
        /// Input CSV file
        input: PathBuf,

        /// Field delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Encoding label (auto-detect if not specified)
        #[arg(short, long)]
        encoding: Option<String>,
    },

    /// Validate a CSV file without touching storage and print the report
    Check {
        /// Input CSV file
        input: PathBuf,

        /// Disable upsert semantics (explicit ids become skips)
        #[arg(long)]
        no_upsert: bool,
    },

    /// Start the HTTP server
    Serve {
        /// Port to listen on (or STOCKLOAD_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { input, delimiter, encoding } => {
            let bytes = std::fs::read(&input)?;
            let info = stockload::inspect(
                &bytes,
                input.file_name().and_then(|n| n.to_str()),
                delimiter,
                encoding.as_deref(),
            )?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Check { input, no_upsert } => {
            let bytes = std::fs::read(&input)?;
            let options = ImportOptions { dry_run: true, upsert: !no_upsert };
            // The CLI has no storage behind it; explicit ids plan against
            // an empty id set.
            let mut store = MemoryStore::new();
            let report = run_import(
                &bytes,
                input.file_name().and_then(|n| n.to_str()),
                options,
                &mut store,
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Serve { port } => {
            let port = port
                .or_else(|| std::env::var("STOCKLOAD_PORT").ok().and_then(|p| p.parse().ok()))
                .unwrap_or(3000);
            stockload::server::start_server(port, MemoryStore::new()).await?;
        }
    }

    Ok(())
}
