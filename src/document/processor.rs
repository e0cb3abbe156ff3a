use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::document::chunker::{chunk_pages, ChunkOptions, DocumentChunk};
use crate::document::parser::{parse_file, ParsedDocument, ParserKind};
use crate::error::RagError;

/// Parses a document, chunks it for indexing and writes the per-document
/// output folder (parsed content, extracted tables, metadata record).
pub struct DocumentProcessor {
    parser: ParserKind,
    chunk_opts: ChunkOptions,
}

#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub parsed: ParsedDocument,
    pub chunks: Vec<DocumentChunk>,
}

impl DocumentProcessor {
    pub fn new(parser: ParserKind) -> Self {
        Self {
            parser,
            chunk_opts: ChunkOptions::default(),
        }
    }

    pub fn with_chunk_options(mut self, opts: ChunkOptions) -> Self {
        self.chunk_opts = opts;
        self
    }

    pub fn process(&self, path: &Path) -> Result<ProcessedDocument, RagError> {
        let parsed = parse_file(path, self.parser)?;
        let chunks = chunk_pages(&parsed.pages, self.chunk_opts);
        info!(
            "Parsed {}: {} pages, {} chunks",
            parsed.file_name,
            parsed.pages.len(),
            chunks.len()
        );
        Ok(ProcessedDocument { parsed, chunks })
    }

    /// Writes `<output_dir>/<stem>/{content.md, metadata.json, tables/}` and
    /// returns the document folder.
    pub fn write_output(
        &self,
        doc: &ProcessedDocument,
        output_dir: &Path,
    ) -> Result<PathBuf, RagError> {
        let stem = Path::new(&doc.parsed.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let doc_dir = output_dir.join(stem);
        fs::create_dir_all(&doc_dir)?;

        let mut content = String::new();
        for (i, page) in doc.parsed.pages.iter().enumerate() {
            if page.trim().is_empty() {
                continue;
            }
            content.push_str(&format!("## Page {}\n\n{}\n\n", i + 1, page.trim()));
        }
        fs::write(doc_dir.join("content.md"), content)?;

        let metadata = serde_json::to_string_pretty(&doc.parsed.metadata)?;
        fs::write(doc_dir.join("metadata.json"), metadata)?;

        let tables = extract_tables(&doc.parsed.pages);
        if !tables.is_empty() {
            let tables_dir = doc_dir.join("tables");
            fs::create_dir_all(&tables_dir)?;
            for (i, table) in tables.iter().enumerate() {
                fs::write(tables_dir.join(format!("table_{:02}.txt", i + 1)), table)?;
            }
            info!("Extracted {} table(s) from {}", tables.len(), doc.parsed.file_name);
        }

        Ok(doc_dir)
    }
}

/// Heuristic table capture: two or more consecutive lines that each look
/// columnar (pipes, tabs, or runs of multiple spaces) are kept as one table.
fn extract_tables(pages: &[String]) -> Vec<String> {
    let mut tables = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for page in pages {
        for line in page.lines() {
            if looks_columnar(line) {
                current.push(line);
            } else {
                if current.len() >= 2 {
                    tables.push(current.join("\n"));
                }
                current.clear();
            }
        }
        if current.len() >= 2 {
            tables.push(current.join("\n"));
        }
        current.clear();
    }

    tables
}

fn looks_columnar(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    let pipes = trimmed.matches('|').count();
    let tabs = trimmed.matches('\t').count();
    let gaps = trimmed.split("  ").filter(|s| !s.trim().is_empty()).count();
    pipes >= 2 || tabs >= 2 || gaps >= 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processes_and_writes_output_folder() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("liver_imaging.txt");
        fs::write(
            &input,
            "Liver CT values range from 45 to 65 HU in healthy adults.\n\
             Finding | Normal | Abnormal\n\
             CT value | 45-65 HU | <45 HU\n\
             Spleen | <12cm | >12cm\n",
        )
        .unwrap();

        let processor = DocumentProcessor::new(ParserKind::Auto);
        let doc = processor.process(&input).unwrap();
        assert!(!doc.chunks.is_empty());

        let out = dir.path().join("output");
        let doc_dir = processor.write_output(&doc, &out).unwrap();
        assert_eq!(doc_dir, out.join("liver_imaging"));
        assert!(doc_dir.join("content.md").exists());
        assert!(doc_dir.join("metadata.json").exists());
        assert!(doc_dir.join("tables").join("table_01.txt").exists());

        let meta: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(doc_dir.join("metadata.json")).unwrap())
                .unwrap();
        assert_eq!(meta["file_name"], "liver_imaging.txt");
        assert_eq!(meta["page_count"], 1);
    }

    #[test]
    fn prose_lines_are_not_tables() {
        let pages = vec!["Plain prose line.\nAnother plain line.\n".to_string()];
        assert!(extract_tables(&pages).is_empty());
    }

    #[test]
    fn single_columnar_line_is_ignored() {
        let pages = vec!["a | b | c\nprose follows here\n".to_string()];
        assert!(extract_tables(&pages).is_empty());
    }

    #[test]
    fn tab_separated_block_is_captured() {
        let pages = vec!["x\ty\tz\n1\t2\t3\n4\t5\t6\nprose\n".to_string()];
        let tables = extract_tables(&pages);
        assert_eq!(tables.len(), 1);
        assert!(tables[0].contains("1\t2\t3"));
    }
}
