use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tally_sync::{
    AmountExtractor, BlobStore, DocumentLocation, ExtractionResult, InvoiceScanner, PdfExtractor,
    StatementUpload, Store, SyncOrchestrator, SyncScheduler, batch_extract, extract_from_bytes,
};
use tracing_subscriber::EnvFilter;

mod config;
mod state;
mod store_json;

use config::Config;
use store_json::{DirBlob, JsonStore};

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Expense-ledger extraction and reconciliation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config under ~/.tally
    Init,

    /// Extract the receipt amount from a single PDF
    Extract {
        /// Fetch the PDF from a URL
        #[arg(long)]
        url: Option<String>,

        /// Read the PDF from a local file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Extract amounts from a file of PDF URLs, one per line
    Batch {
        #[arg(long)]
        urls: PathBuf,
    },

    /// Upload a bank-statement CSV and reconcile it into the ledger
    Upload {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Process pending emails into ledger entries once
    Sync,

    /// Scan stored receipt PDFs (~/.tally/blobs) into the ledger
    Invoices {
        /// Only process blobs under this prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Run sync on an interval until Ctrl-C
    Watch {
        /// Override the configured interval (seconds)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Print the current ledger
    Ledger,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config()?;

    match cli.command {
        Command::Init => {
            config::init_config()?;
        }

        Command::Extract { url, file } => {
            let result = match (url, file) {
                (Some(url), None) => {
                    let extractor = pdf_extractor(&cfg)?;
                    extractor.extract(&DocumentLocation::Url(url)).await
                }
                (None, Some(file)) => {
                    let bytes = std::fs::read(&file)
                        .with_context(|| format!("read {}", file.display()))?;
                    extract_from_bytes(&bytes)
                }
                _ => bail!("pass exactly one of --url or --file"),
            };
            print_extraction(&result);
        }

        Command::Batch { urls } => {
            let text = std::fs::read_to_string(&urls)
                .with_context(|| format!("read {}", urls.display()))?;
            let locations: Vec<DocumentLocation> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| DocumentLocation::Url(line.to_string()))
                .collect();
            if locations.is_empty() {
                bail!("no URLs in {}", urls.display());
            }

            let extractor = pdf_extractor(&cfg)?;
            let results =
                batch_extract(&extractor, &locations, cfg.fetch.max_concurrency).await;

            for (i, (location, result)) in locations.iter().zip(&results).enumerate() {
                match (&result.error, result.success) {
                    (Some(error), _) => {
                        println!("[{}/{}] {} error: {error}", i + 1, results.len(), location.file_name())
                    }
                    (None, true) => {
                        println!("[{}/{}] {} ${:.2}", i + 1, results.len(), location.file_name(), result.amount)
                    }
                    (None, false) => {
                        println!("[{}/{}] {} no amount found", i + 1, results.len(), location.file_name())
                    }
                }
            }
            let ok = results.iter().filter(|r| r.success).count();
            println!("\nBatch complete: {ok}/{} successful", results.len());
        }

        Command::Upload { csv } => {
            let text = std::fs::read_to_string(&csv)
                .with_context(|| format!("read {}", csv.display()))?;
            let upload = StatementUpload::new(json_store()?);
            let summary = upload.upload_csv(&text).await?;
            println!(
                "CSV processed: {} matched, {} new entries added.",
                summary.matched, summary.unmatched
            );
        }

        Command::Sync => {
            let orchestrator = orchestrator(&cfg)?;
            let report = orchestrator.sync_pending().await?;
            for item in &report.results {
                match (&item.error, item.amount) {
                    (Some(error), _) => {
                        println!("{}: error: {error}", item.invoice_number)
                    }
                    (None, Some(amount)) if item.needs_review => {
                        println!("{}: ${amount:.2} (needs manual review)", item.invoice_number)
                    }
                    (None, Some(amount)) => println!("{}: ${amount:.2}", item.invoice_number),
                    (None, None) => println!("{}: skipped", item.invoice_number),
                }
            }
            println!(
                "Ledger synchronized: processed {}/{} pending emails",
                report.processed, report.total
            );
        }

        Command::Invoices { prefix } => {
            let blobs = Arc::new(DirBlob::new(state::blobs_dir()?));
            let extractor = PdfExtractor::new(
                Arc::clone(&blobs) as Arc<dyn BlobStore>,
                Duration::from_secs(cfg.fetch.timeout_secs),
            );
            let scanner =
                InvoiceScanner::new(json_store()?, extractor, cfg.fetch.max_concurrency);
            let report = scanner.process_all(blobs.as_ref(), &prefix).await?;
            for item in &report.details {
                match (&item.error, item.amount) {
                    (Some(error), _) => println!("{}: error: {error}", item.file),
                    (_, Some(amount)) => println!("{}: ${amount:.2}", item.file),
                    _ => println!("{}: skipped", item.file),
                }
            }
            println!(
                "Storage scan complete: {} processed, {} errors",
                report.processed, report.errors
            );
        }

        Command::Watch { interval } => {
            let interval = Duration::from_secs(interval.unwrap_or(cfg.sync.interval_secs));
            let orchestrator = Arc::new(orchestrator(&cfg)?);

            let mut scheduler = SyncScheduler::new();
            scheduler.start(orchestrator, interval);
            println!(
                "Watching for pending emails every {}s (Ctrl-C to stop)",
                interval.as_secs()
            );

            tokio::signal::ctrl_c().await.context("wait for Ctrl-C")?;
            scheduler.stop().await;
            println!("Stopped.");
        }

        Command::Ledger => {
            let entries = json_store()?.ledger().await?;
            if entries.is_empty() {
                println!("Ledger is empty.");
                return Ok(());
            }
            println!(
                "{:<14} {:<12} {:>12} {:<14} {:<24} {}",
                "INVOICE", "DATE", "AMOUNT", "VENDOR", "SOURCE", "DESCRIPTION"
            );
            for e in &entries {
                println!(
                    "{:<14} {:<12} {:>12} {:<14} {:<24} {}",
                    e.invoice_number,
                    e.date.format("%Y-%m-%d"),
                    format!("${:.2}", e.amount),
                    e.vendor,
                    e.source.to_string(),
                    e.description
                );
            }
            println!("\n{} entries", entries.len());
        }
    }

    Ok(())
}

fn json_store() -> Result<JsonStore> {
    Ok(JsonStore::new(state::ensure_tally_home()?))
}

fn pdf_extractor(cfg: &Config) -> Result<PdfExtractor> {
    let blobs: Arc<dyn BlobStore> = Arc::new(DirBlob::new(state::blobs_dir()?));
    Ok(PdfExtractor::new(
        blobs,
        Duration::from_secs(cfg.fetch.timeout_secs),
    ))
}

fn orchestrator(cfg: &Config) -> Result<SyncOrchestrator<JsonStore, PdfExtractor>> {
    Ok(SyncOrchestrator::new(json_store()?, pdf_extractor(cfg)?)
        .with_policy(cfg.failure_policy()?)
        .with_max_concurrency(cfg.fetch.max_concurrency))
}

fn print_extraction(result: &ExtractionResult) {
    if let Some(error) = &result.error {
        println!("Extraction failed: {error}");
        return;
    }
    if result.success {
        println!("Amount: ${:.2}", result.amount);
    } else {
        println!("No amount found.");
    }
    println!("Extracted {} characters of text", result.raw_text.len());
}
