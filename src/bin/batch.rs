use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;

use medical_rag::batch::{discover_pdfs, resolve_named_files, BatchProcessor};
use medical_rag::config::{self, ApiConfig, LogConfig, DEFAULT_BATCH_WORKING_DIR};
use medical_rag::logging;
use medical_rag::providers::OpenAiProvider;

#[derive(Parser, Debug)]
#[command(
    name = "batch-medical-processor",
    about = "Batch process medical textbooks from a data directory",
    after_help = "Examples:\n  \
        batch-medical-processor --all\n  \
        batch-medical-processor --files \"CT and MRI.pdf\" \"Liver imaging.pdf\"\n  \
        batch-medical-processor --all --max-workers 3 --output ./batch_output"
)]
struct Args {
    /// Process every PDF under <data-dir>/raw
    #[arg(long, conflicts_with = "files")]
    all: bool,

    /// Specific PDF file names under <data-dir>/raw
    #[arg(long, num_args = 1..)]
    files: Vec<String>,

    /// Medical data directory (PDFs live under <data-dir>/raw)
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Batch output directory
    #[arg(long, default_value = "./batch_output")]
    output: PathBuf,

    /// RAG storage working directory
    #[arg(long, default_value = DEFAULT_BATCH_WORKING_DIR)]
    working_dir: PathBuf,

    /// Maximum parallel workers (default: MAX_WORKERS or 2)
    #[arg(long)]
    max_workers: Option<usize>,

    /// OpenAI API key (or OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL (or OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Enable verbose debug logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("{}", format!("❌ {e}").red());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    logging::init("batch_medical_processor", args.verbose, &LogConfig::from_env())?;

    if !args.all && args.files.is_empty() {
        bail!("Specify --all or --files");
    }

    let api = ApiConfig::resolve(args.api_key.clone(), args.base_url.clone())?;

    let files = if args.all {
        discover_pdfs(&args.data_dir)?
    } else {
        resolve_named_files(&args.data_dir, &args.files)
    };
    if files.is_empty() {
        bail!("No processable PDF files found");
    }

    let max_workers = args.max_workers.unwrap_or_else(config::default_max_workers);

    println!("🏥 Medical document batch processor starting");
    println!("📚 Files to process: {}", files.len());
    println!("📁 Output directory: {}", args.output.display());
    println!("⚡ Maximum parallel workers: {max_workers}");

    let provider = OpenAiProvider::new(&api);
    let processor = BatchProcessor::new(Box::new(provider), args.working_dir.clone(), max_workers);

    let summary = processor.run(files, &args.output).await?;
    processor.print_summary(&summary);

    let summary_path = args.output.join("batch_summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("📋 Summary written to {}", summary_path.display());

    println!(
        "🎉 Batch processing completed! Total time: {:.2}s",
        summary.total_secs
    );

    if summary.completed == 0 {
        bail!("All documents failed to process");
    }
    Ok(())
}
