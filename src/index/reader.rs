use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::posting::PostingList;

/// Read-only access to a pre-built inverted index.
///
/// Terms passed to these methods are lexically processed (lowercased,
/// stemmed); the reader performs no analysis of its own. A term or
/// field that does not occur in the corpus is not an error: statistics
/// are zero and posting lists are empty.
pub trait IndexReader: Send + Sync {
    /// Total number of documents in the corpus.
    fn num_docs(&self) -> u32;

    /// Number of documents that contain the field.
    fn doc_count(&self, field: &str) -> Result<u32>;

    /// Total number of term occurrences in all instances of the field.
    fn sum_total_term_freq(&self, field: &str) -> Result<u64>;

    /// Number of documents containing the term in the field (df).
    fn doc_freq(&self, field: &str, term: &str) -> Result<u32>;

    /// Total occurrences of the term in the field across the corpus (ctf).
    fn total_term_freq(&self, field: &str, term: &str) -> Result<u64>;

    /// Length of a field in a document, including stopwords.
    fn field_length(&self, field: &str, docid: DocId) -> Result<u32>;

    /// The full inverted list for a term in a field.
    fn postings(&self, field: &str, term: &str) -> Result<PostingList>;

    /// External (string) document id for an internal document id.
    fn external_id(&self, docid: DocId) -> Result<String>;

    /// Internal document id for an external document id.
    fn internal_id(&self, external_id: &str) -> Result<DocId>;
}
