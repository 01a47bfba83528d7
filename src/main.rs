use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use lab_extractor::config::Config;
use lab_extractor::facilities::{self, FACILITIES};
use lab_extractor::logging;
use lab_extractor::ocr::OcrEngine;
use lab_extractor::output;
use lab_extractor::pagetext::{PageTextProvider, PdfTextTool};
use lab_extractor::pipeline::{self, ExtractionPipeline};

#[derive(Parser)]
#[command(name = "lab_extractor")]
#[command(about = "Extracts lab results from per-facility PDF reports into CSV")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract lab results from every PDF under a folder
    Extract {
        /// Folder scanned recursively for PDF files
        input: PathBuf,
        /// Concurrent document workers (defaults to the CPU count)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Report how the PDFs under a folder would be categorized, without processing
    Check {
        /// Folder scanned recursively for PDF files
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Extract { input, workers } => run_extract(&input, workers, &config).await,
        Commands::Check { input } => run_check(&input),
    }
}

fn print_categories(documents: &[PathBuf]) {
    let names: Vec<String> = documents
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect();

    println!("\nFound {} PDF files:", documents.len());
    for facility in FACILITIES.iter() {
        let count = names.iter().filter(|n| facility.matches_filename(n)).count();
        if count > 0 {
            println!("  {}: {} files", facility.name(), count);
        }
    }

    let unrecognized: Vec<&String> = names
        .iter()
        .filter(|n| facilities::facility_for_filename(n).is_none())
        .collect();
    if !unrecognized.is_empty() {
        println!(
            "\n  ⚠️  {} files with unrecognized facility patterns",
            unrecognized.len()
        );
        warn!(count = unrecognized.len(), "unrecognized facility files");
    }
}

async fn run_extract(input: &Path, workers: Option<usize>, config: &Config) -> anyhow::Result<()> {
    info!(input = %input.display(), "extraction starting");

    let ocr = OcrEngine::new(&config.ocr);
    if !ocr.is_available() {
        warn!("OCR command not available");
        println!("⚠️  {} not found. Image-based PDFs may fail.", config.ocr.command);
    }
    if !PdfTextTool::is_available() {
        warn!("pdftotext not available");
        println!("⚠️  pdftotext not found. Text extraction will fail.");
    }

    println!("\nScanning for PDF files...");
    let documents = pipeline::find_documents(input)?;
    if documents.is_empty() {
        println!("No PDF files found in {}.", input.display());
        return Ok(());
    }
    print_categories(&documents);

    let workers = workers.unwrap_or_else(num_cpus::get);
    println!("\nProcessing with {workers} workers...\n");

    let provider: Arc<dyn PageTextProvider> = Arc::new(PdfTextTool);
    let pipeline = ExtractionPipeline::new(provider, Arc::new(ocr), workers);
    let outcome = pipeline.run(documents).await;

    let output_dir = Path::new(&config.output.dir);
    let csv_path = output::write_csv(output_dir, &outcome.records)?;
    let missed_path = output::write_missed_report(output_dir, &outcome)?;
    output::write_summary_json(output_dir, &outcome)?;

    println!("\n{}", "=".repeat(60));
    println!("SUMMARY");
    println!("{}", "=".repeat(60));
    println!(
        "✅ Processed: {} | ⚠️  Skipped: {} | ❌ Errors: {}",
        outcome.processed_count(),
        outcome.skipped_count(),
        outcome.error_count()
    );
    println!("\nResults: {} lab values extracted", outcome.records.len());
    println!("Output:  {}", csv_path.display());
    if let Some(missed) = missed_path {
        println!("Missed:  {}", missed.display());
    }

    info!(
        processed = outcome.processed_count(),
        errors = outcome.error_count(),
        records = outcome.records.len(),
        "extraction complete"
    );
    Ok(())
}

fn run_check(input: &Path) -> anyhow::Result<()> {
    println!("Scanning for PDF files...");
    let documents = pipeline::find_documents(input)?;
    if documents.is_empty() {
        println!("No PDF files found in {}.", input.display());
        return Ok(());
    }
    print_categories(&documents);
    Ok(())
}
