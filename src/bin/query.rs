use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;

use medical_rag::config::{ApiConfig, LogConfig};
use medical_rag::logging;
use medical_rag::providers::OpenAiProvider;
use medical_rag::rag::{QueryOptions, RagEngine};
use medical_rag::interactive;

/// Predefined English query examples, grouped the way a radiology reader
/// would probe a processed textbook.
const BASIC_QUERIES: &[&str] = &[
    "What is the main content of this medical textbook?",
    "What imaging techniques are discussed in this document?",
    "What anatomical structures are covered in detail?",
];

const TECHNICAL_QUERIES: &[&str] = &[
    "What are the differences between CT and MRI imaging described in this document?",
    "What are the main radiological findings discussed?",
];

const CLINICAL_QUERIES: &[&str] = &[
    "What clinical scenarios are presented in this textbook?",
    "What diagnostic criteria are mentioned for various conditions?",
];

const REFERENCE_TABLE: &str = "Parameter,Normal_Range,Abnormal_Finding,Clinical_Significance\n\
    Liver_CT_Value,45-65_HU,<45_or_>65_HU,Fatty_liver_or_iron_deposition\n\
    Spleen_Size,Length<12cm,>12cm,Splenomegaly\n\
    Portal_Vein_Diameter,<13mm,>13mm,Portal_hypertension\n\
    Ascites,Absent,Present,Peritoneal_fluid";

#[derive(Parser, Debug)]
#[command(
    name = "medical-rag-query",
    about = "Query an already-processed medical RAG working directory",
    after_help = "Examples:\n  \
        medical-rag-query --working-dir ./rag_storage\n  \
        medical-rag-query --working-dir ./rag_storage --interactive\n  \
        medical-rag-query --working-dir ./rag_storage --query \"What are the main imaging techniques?\""
)]
struct Args {
    /// Working directory with processed data
    #[arg(long)]
    working_dir: PathBuf,

    /// Execute a single query and exit
    #[arg(long)]
    query: Option<String>,

    /// Interactive query mode
    #[arg(long)]
    interactive: bool,

    /// Also run the multimodal reference-table example
    #[arg(long)]
    include_multimodal: bool,

    /// Retrieved chunks per query
    #[arg(long, default_value_t = 4)]
    top_k: usize,

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
    logging::init("medical_rag_query", args.verbose, &LogConfig::from_env())?;

    let api = ApiConfig::resolve(args.api_key.clone(), args.base_url.clone())?;

    println!("🔍 Medical RAG query tool starting");
    println!("📁 Working directory: {}", args.working_dir.display());

    let provider = OpenAiProvider::new(&api);
    let engine = RagEngine::open_existing(&args.working_dir, Box::new(provider))?;
    println!(
        "{}",
        format!("✅ Index loaded: {} chunks, ready for queries", engine.chunk_count()).green()
    );

    let opts = QueryOptions {
        top_k: args.top_k,
        ..QueryOptions::default()
    };

    if let Some(query) = &args.query {
        run_query(&engine, query, opts).await;
    } else if args.interactive {
        interactive::run(&engine, opts).await?;
    } else {
        run_examples(&engine, opts).await;
        if args.include_multimodal {
            run_multimodal_example(&engine, opts).await;
        }
    }

    println!("🎉 Query session completed!");
    Ok(())
}

async fn run_query(engine: &RagEngine, query: &str, opts: QueryOptions) {
    println!("\n🔍 {}", query.bright_yellow());
    match engine.query(query, opts).await {
        Ok(result) => {
            println!("💡 {}", result.answer.bright_green());
            for (i, hit) in result.hits.iter().enumerate() {
                println!(
                    "   [{}] {} page {} (score {:.2})",
                    i + 1,
                    hit.source,
                    hit.page,
                    hit.score
                );
            }
        }
        Err(e) => println!("{}", format!("❌ Query failed: {e}").red()),
    }
}

async fn run_examples(engine: &RagEngine, opts: QueryOptions) {
    println!("\n📚 [Basic Medical Queries]");
    for query in BASIC_QUERIES {
        run_query(engine, query, opts).await;
    }

    println!("\n🔬 [Technical Medical Queries]");
    for query in TECHNICAL_QUERIES {
        run_query(engine, query, opts).await;
    }

    println!("\n🏥 [Clinical Application Queries]");
    for query in CLINICAL_QUERIES {
        run_query(engine, query, opts).await;
    }
}

async fn run_multimodal_example(engine: &RagEngine, opts: QueryOptions) {
    println!("\n🔬 [Multimodal Query Example]: Clinical reference table");
    let question = "Compare this clinical reference table with the imaging criteria \
        mentioned in the document. Are these values consistent with the textbook \
        recommendations?";
    match engine
        .query_with_table(question, REFERENCE_TABLE, "Abdominal CT Reference Values", opts)
        .await
    {
        Ok(result) => println!("💡 {}", result.answer.bright_green()),
        Err(e) => println!("{}", format!("❌ Multimodal query failed: {e}").red()),
    }
}
