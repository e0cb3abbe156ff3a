use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::document::{DocumentProcessor, ParserKind};
use crate::error::RagError;
use crate::providers::CompletionProvider;
use crate::rag::{QueryOptions, RagEngine};

const SMOKE_TEST_QUERY: &str = "What is the main content of this document?";
const SMOKE_ANSWER_PREVIEW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub file_name: String,
    pub status: DocStatus,
    pub processing_secs: f64,
    pub chunks_indexed: usize,
    pub output_dir: Option<PathBuf>,
    pub test_answer: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total_documents: usize,
    pub completed: usize,
    pub failed: usize,
    pub total_secs: f64,
    pub documents: Vec<DocumentReport>,
}

impl BatchSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total_documents == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total_documents as f64 * 100.0
    }
}

/// Drives the per-document pipeline over many files with bounded
/// concurrency. One file's failure never touches the others; every input
/// file gets exactly one report.
pub struct BatchProcessor {
    provider: Box<dyn CompletionProvider>,
    working_dir: PathBuf,
    max_workers: usize,
    parser: ParserKind,
}

impl BatchProcessor {
    pub fn new(
        provider: Box<dyn CompletionProvider>,
        working_dir: PathBuf,
        max_workers: usize,
    ) -> Self {
        Self {
            provider,
            working_dir,
            max_workers: max_workers.max(1),
            parser: ParserKind::Auto,
        }
    }

    pub fn with_parser(mut self, parser: ParserKind) -> Self {
        self.parser = parser;
        self
    }

    pub async fn run(&self, files: Vec<PathBuf>, output_dir: &Path) -> Result<BatchSummary> {
        info!(
            "Batch processing {} documents with {} workers",
            files.len(),
            self.max_workers
        );
        std::fs::create_dir_all(output_dir)?;

        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let progress = ProgressBar::new(files.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut tasks = Vec::with_capacity(files.len());
        for (i, file) in files.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let provider = self.provider.clone();
            let parser = self.parser;
            let doc_working_dir = self.working_dir.join(format!("medical_doc_{i:03}"));
            let output_dir = output_dir.to_path_buf();
            let progress = progress.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let report = process_one(&file, &doc_working_dir, &output_dir, parser, provider).await;
                progress.inc(1);
                report
            }));
        }

        let documents: Vec<DocumentReport> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|task| {
                task.unwrap_or_else(|join_err| DocumentReport {
                    file_name: "<unknown>".to_string(),
                    status: DocStatus::Failed,
                    processing_secs: 0.0,
                    chunks_indexed: 0,
                    output_dir: None,
                    test_answer: None,
                    error: Some(format!("worker panicked: {join_err}")),
                })
            })
            .collect();
        progress.finish_and_clear();

        let completed = documents.iter().filter(|d| d.status == DocStatus::Completed).count();
        let failed = documents.len() - completed;

        Ok(BatchSummary {
            total_documents: documents.len(),
            completed,
            failed,
            total_secs: started.elapsed().as_secs_f64(),
            documents,
        })
    }

    pub fn print_summary(&self, summary: &BatchSummary) {
        println!("\n{}", "=".repeat(80));
        println!("📊 Medical Documents Batch Processing Summary");
        println!("{}", "=".repeat(80));
        println!("📄 Total documents: {}", summary.total_documents);
        println!("✅ Successfully processed: {}", summary.completed.to_string().green());
        println!("❌ Processing failed: {}", summary.failed.to_string().red());
        println!("⏱️  Total time: {:.2}s", summary.total_secs);
        println!("📊 Success rate: {:.1}%", summary.success_rate());

        if summary.completed > 0 {
            let avg: f64 = summary
                .documents
                .iter()
                .filter(|d| d.status == DocStatus::Completed)
                .map(|d| d.processing_secs)
                .sum::<f64>()
                / summary.completed as f64;
            println!("⚡ Average processing time: {avg:.2}s/document");
        }

        println!("\n📋 Detailed results:");
        for doc in &summary.documents {
            match doc.status {
                DocStatus::Completed => {
                    println!(
                        "✅ {}: completed ({:.2}s, {} chunks)",
                        doc.file_name.bright_yellow(),
                        doc.processing_secs,
                        doc.chunks_indexed
                    );
                    if let Some(answer) = &doc.test_answer {
                        println!("   💡 {answer}");
                    }
                }
                DocStatus::Failed => {
                    println!("❌ {}: failed", doc.file_name.bright_yellow());
                    if let Some(err) = &doc.error {
                        println!("   {}", err.red());
                    }
                }
            }
        }
        println!("{}", "=".repeat(80));
    }
}

async fn process_one(
    file: &Path,
    working_dir: &Path,
    output_dir: &Path,
    parser: ParserKind,
    provider: Box<dyn CompletionProvider>,
) -> DocumentReport {
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    let started = Instant::now();

    let mut report = DocumentReport {
        file_name: file_name.clone(),
        status: DocStatus::Failed,
        processing_secs: 0.0,
        chunks_indexed: 0,
        output_dir: None,
        test_answer: None,
        error: None,
    };

    match ingest_document(file, working_dir, output_dir, parser, provider).await {
        Ok((chunks, doc_dir, answer)) => {
            report.status = DocStatus::Completed;
            report.chunks_indexed = chunks;
            report.output_dir = Some(doc_dir);
            report.test_answer = Some(answer);
            info!("✅ Completed: {file_name}");
        }
        Err(e) => {
            report.error = Some(e.to_string());
            error!("❌ Failed: {file_name} - {e}");
        }
    }
    report.processing_secs = started.elapsed().as_secs_f64();
    report
}

async fn ingest_document(
    file: &Path,
    working_dir: &Path,
    output_dir: &Path,
    parser: ParserKind,
    provider: Box<dyn CompletionProvider>,
) -> Result<(usize, PathBuf, String)> {
    let processor = DocumentProcessor::new(parser);
    let doc = processor.process(file)?;
    let doc_dir = processor.write_output(&doc, output_dir)?;

    let mut engine = RagEngine::open(working_dir, provider)?;
    let chunks = engine.ingest(&doc).await?;

    // quick retrieval sanity check against the freshly built index
    let result = engine.query(SMOKE_TEST_QUERY, QueryOptions::default()).await?;
    let mut answer = result.answer;
    if answer.len() > SMOKE_ANSWER_PREVIEW {
        let mut cut = SMOKE_ANSWER_PREVIEW;
        while !answer.is_char_boundary(cut) {
            cut -= 1;
        }
        answer.truncate(cut);
        answer.push_str("...");
    }

    Ok((chunks, doc_dir, answer))
}

/// All PDFs under `<data_dir>/raw`, sorted by name.
pub fn discover_pdfs(data_dir: &Path) -> Result<Vec<PathBuf>, RagError> {
    let raw_dir = data_dir.join("raw");
    if !raw_dir.exists() {
        return Err(RagError::WorkingDirNotFound(raw_dir));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(&raw_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    info!("📚 Found {} PDF files in {}", files.len(), raw_dir.display());
    Ok(files)
}

/// Resolves `--files` names against `<data_dir>/raw`, warning about and
/// skipping anything missing.
pub fn resolve_named_files(data_dir: &Path, names: &[String]) -> Vec<PathBuf> {
    let raw_dir = data_dir.join("raw");
    let mut files = Vec::new();
    for name in names {
        let path = raw_dir.join(name);
        if path.exists() {
            files.push(path);
        } else {
            warn!("⚠️ File does not exist: {}", path.display());
        }
    }
    files
}
