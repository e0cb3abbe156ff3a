use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;

use medical_rag::config::{self, ApiConfig, LogConfig};
use medical_rag::document::{DocumentProcessor, ParserKind};
use medical_rag::error::RagError;
use medical_rag::providers::OpenAiProvider;
use medical_rag::rag::{QueryOptions, RagEngine};
use medical_rag::{interactive, logging};

/// Queries run after processing when no explicit query is given, covering
/// the concepts a medical textbook index should be able to answer.
const BASIC_QUERIES: &[&str] = &[
    "What is the main content of this document? What medical topics does it contain?",
    "What imaging examination methods are mentioned in the document?",
    "What important anatomical structures are discussed?",
    "What diseases or pathological conditions are involved in the document?",
];

const IMAGE_QUERIES: &[&str] = &[
    "What do the medical images in the document show? Please describe in detail.",
    "What imaging signs are discussed as key points?",
    "What are the differences and characteristics between CT and MRI images?",
];

const REFERENCE_TABLE: &str = "Test Item,Normal Value,Abnormal Value,Clinical Significance\n\
    Liver CT Value,45-65 HU,<45 or >65 HU,Fatty liver or iron deposition\n\
    Spleen Size,Long axis <12cm,>12cm,Splenomegaly\n\
    Portal Vein Diameter,<13mm,>13mm,Portal hypertension\n\
    Ascites,None,Present,Abdominal fluid accumulation";

#[derive(Parser, Debug)]
#[command(
    name = "medical-rag-processor",
    about = "Process a medical textbook into the RAG index and query it",
    after_help = "Examples:\n  \
        medical-rag-processor --file \"data/raw/CT and MRI of the Whole Body.pdf\"\n  \
        medical-rag-processor --file \"data/raw/Liver imaging.pdf\" --interactive\n  \
        medical-rag-processor --file doc.pdf --output ./medical_output --working-dir ./medical_rag_storage"
)]
struct Args {
    /// Medical PDF or text document path
    #[arg(long)]
    file: PathBuf,

    /// Output directory for parsed content
    #[arg(long, default_value = "./output")]
    output: PathBuf,

    /// RAG storage working directory (default: RAG_WORKING_DIR or ./rag_storage)
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Document parser backend
    #[arg(long, value_enum, default_value = "auto")]
    parser: ParserKind,

    /// Enter interactive query mode after processing
    #[arg(long)]
    interactive: bool,

    /// Run a single query after processing instead of the examples
    #[arg(long)]
    query: Option<String>,

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
    logging::init("medical_rag_processor", args.verbose, &LogConfig::from_env())?;

    let api = ApiConfig::resolve(args.api_key.clone(), args.base_url.clone())?;
    if !args.file.exists() {
        return Err(RagError::FileNotFound(args.file.clone()).into());
    }
    let working_dir = args
        .working_dir
        .clone()
        .unwrap_or_else(config::default_working_dir);

    println!("🏥 Medical RAG processor starting");
    println!("📄 Document: {}", args.file.display());
    println!("📁 Output directory: {}", args.output.display());
    println!("🗂️  Working directory: {}", working_dir.display());

    let processor = DocumentProcessor::new(args.parser);
    let doc = processor.process(&args.file)?;
    let doc_dir = processor.write_output(&doc, &args.output)?;
    println!("📝 Parsed output written to {}", doc_dir.display());

    let provider = OpenAiProvider::new(&api);
    let mut engine = RagEngine::open(&working_dir, Box::new(provider))?;
    let indexed = engine.ingest(&doc).await?;
    println!(
        "{}",
        format!("✅ Document processed: {indexed} chunks indexed").green()
    );

    let opts = QueryOptions::default();
    if let Some(query) = &args.query {
        run_query(&engine, query, opts).await;
    } else if args.interactive {
        interactive::run(&engine, opts).await?;
    } else {
        run_examples(&engine, opts).await;
    }

    println!("🎉 Medical RAG processing completed!");
    Ok(())
}

async fn run_query(engine: &RagEngine, query: &str, opts: QueryOptions) {
    println!("\n🔍 {}", query.bright_yellow());
    match engine.query(query, opts).await {
        Ok(result) => println!("💡 {}", result.answer.bright_green()),
        Err(e) => println!("{}", format!("❌ Query error: {e}").red()),
    }
}

/// Query errors here are reported per query and never abort the run.
async fn run_examples(engine: &RagEngine, opts: QueryOptions) {
    println!("\n🔍 Running medical query examples:");

    println!("\n📚 [Basic Queries]");
    for query in BASIC_QUERIES {
        run_query(engine, query, opts).await;
    }

    println!("\n🖼️  [Image Queries]");
    for query in IMAGE_QUERIES {
        run_query(engine, query, opts).await;
    }

    println!("\n🔬 [Multimodal Query]: Clinical data table");
    let question = "Please compare and analyze this clinical data table \
        with relevant information in the document";
    match engine
        .query_with_table(
            question,
            REFERENCE_TABLE,
            "Abdominal CT Examination Reference Values",
            opts,
        )
        .await
    {
        Ok(result) => println!("💡 {}", result.answer.bright_green()),
        Err(e) => println!("{}", format!("❌ Multimodal query error: {e}").red()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use medical_rag::CompletionProvider;
    use std::fs;

    #[derive(Clone)]
    struct EchoProvider;

    #[async_trait::async_trait]
    impl CompletionProvider for EchoProvider {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }

        async fn complete_multimodal(&self, _system: &str, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32 + 1.0, 1.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32 + 1.0, 1.0]).collect())
        }

        fn embedding_dim(&self) -> usize {
            2
        }

        fn model_info(&self) -> String {
            "echo".to_string()
        }

        fn clone_box(&self) -> Box<dyn CompletionProvider> {
            Box::new(self.clone())
        }
    }

    #[test]
    fn example_pass_covers_image_queries_and_table() {
        assert!(IMAGE_QUERIES
            .iter()
            .any(|q| q.contains("CT and MRI images")));
        assert!(IMAGE_QUERIES.iter().any(|q| q.contains("imaging signs")));
        assert!(REFERENCE_TABLE.contains("Liver CT Value"));
        assert!(REFERENCE_TABLE.contains("Portal Vein Diameter"));
    }

    #[tokio::test]
    async fn example_pass_runs_against_an_ingested_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join("sample.txt");
        fs::write(&doc_path, "CT and MRI findings for the liver and spleen.").unwrap();
        let doc = DocumentProcessor::new(ParserKind::Auto)
            .process(&doc_path)
            .unwrap();

        let mut engine =
            RagEngine::open(&dir.path().join("storage"), Box::new(EchoProvider)).unwrap();
        engine.ingest(&doc).await.unwrap();

        run_examples(&engine, QueryOptions::default()).await;

        let table_answer = engine
            .query_with_table(
                "Please compare this table with the document",
                REFERENCE_TABLE,
                "Abdominal CT Examination Reference Values",
                QueryOptions::default(),
            )
            .await
            .unwrap();
        assert!(table_answer.answer.contains("Liver CT Value"));
    }
}
