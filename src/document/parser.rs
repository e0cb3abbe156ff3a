use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RagError;

/// Which parser backend to use. `Auto` picks by file extension: PDFs go
/// through the PDF text extractor, `.txt`/`.md` are read directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ParserKind {
    Auto,
    Pdf,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_size: u64,
    pub page_count: usize,
    pub sha256: String,
    pub parser: String,
    pub parsed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub file_name: String,
    /// Page texts in document order. Text documents are a single page.
    pub pages: Vec<String>,
    pub metadata: DocumentMetadata,
}

pub fn parse_file(path: &Path, kind: ParserKind) -> Result<ParsedDocument, RagError> {
    if !path.exists() {
        return Err(RagError::FileNotFound(path.to_path_buf()));
    }

    let kind = match kind {
        ParserKind::Auto => detect_kind(path)?,
        other => other,
    };

    let bytes = fs::read(path)?;
    let text = match kind {
        ParserKind::Pdf => pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| RagError::Parse(format!("{}: {e}", path.display())))?,
        ParserKind::Text => String::from_utf8_lossy(&bytes).into_owned(),
        ParserKind::Auto => unreachable!(),
    };

    let pages = split_pages(&text);
    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(RagError::Parse(format!(
            "no extractable text in {}",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let metadata = DocumentMetadata {
        file_name: file_name.clone(),
        file_size: bytes.len() as u64,
        page_count: pages.len(),
        sha256: hex_digest(&bytes),
        parser: format!("{kind:?}").to_lowercase(),
        parsed_at: Utc::now(),
    };

    Ok(ParsedDocument {
        file_name,
        pages,
        metadata,
    })
}

fn detect_kind(path: &Path) -> Result<ParserKind, RagError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => Ok(ParserKind::Pdf),
        "txt" | "md" => Ok(ParserKind::Text),
        _ => Err(RagError::UnsupportedDocument(path.to_path_buf())),
    }
}

/// Form feeds mark page boundaries in extracted PDF text; anything without
/// them is treated as one page.
fn split_pages(text: &str) -> Vec<String> {
    text.split('\u{c}').map(|p| p.to_string()).collect()
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let result = parse_file(Path::new("/nonexistent/report.pdf"), ParserKind::Auto);
        assert!(matches!(result, Err(RagError::FileNotFound(_))));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.tiff");
        fs::write(&path, b"binary").unwrap();
        let result = parse_file(&path, ParserKind::Auto);
        assert!(matches!(result, Err(RagError::UnsupportedDocument(_))));
    }

    #[test]
    fn text_file_parses_as_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "CT imaging of the liver shows attenuation values.").unwrap();

        let doc = parse_file(&path, ParserKind::Auto).unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.metadata.page_count, 1);
        assert_eq!(doc.metadata.parser, "text");
        assert!(doc.pages[0].contains("attenuation"));
        assert_eq!(doc.metadata.sha256.len(), 64);
    }

    #[test]
    fn form_feed_splits_pages() {
        let pages = split_pages("page one\u{c}page two\u{c}page three");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1], "page two");
    }

    #[test]
    fn empty_document_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"   \n").unwrap();
        let result = parse_file(&path, ParserKind::Auto);
        assert!(matches!(result, Err(RagError::Parse(_))));
    }
}
