pub mod loader;
pub mod splitter;

use crate::models::{Chunk, Document};
use splitter::TextSplitter;

/// Splits every document and tags each piece with its origin. Ids are
/// `doc_{document_index}_chunk_{chunk_index}`, stable for a given directory
/// listing.
pub fn chunk_documents(documents: &[Document], splitter: &TextSplitter) -> Vec<Chunk> {
    documents
        .iter()
        .enumerate()
        .flat_map(|(doc_idx, doc)| {
            splitter
                .split(&doc.content)
                .into_iter()
                .enumerate()
                .map(move |(chunk_idx, content)| Chunk {
                    id: format!("doc_{doc_idx}_chunk_{chunk_idx}"),
                    content,
                    source: doc.source.clone(),
                })
        })
        .collect()
}
