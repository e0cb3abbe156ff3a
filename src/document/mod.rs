mod chunker;
mod parser;
mod processor;

pub use chunker::{chunk_pages, ChunkOptions, DocumentChunk};
pub use parser::{parse_file, DocumentMetadata, ParsedDocument, ParserKind};
pub use processor::{DocumentProcessor, ProcessedDocument};
