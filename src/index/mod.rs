mod store;

pub use store::{IndexedChunk, SearchHit, VectorStore};
