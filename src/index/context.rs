use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::memory::MemoryIndex;
use crate::index::posting::PostingList;
use crate::index::reader::IndexReader;
use crate::index::sidecar::{
    EXTERNAL_ID_CACHE_FILE, ExternalIdCache, FIELD_LENGTH_CACHE_FILE, FieldLengthCache,
};

/// Per-field corpus statistics, computed once per field and reused by
/// every scoring call in the batch.
#[derive(Debug, Clone, Copy)]
struct FieldStats {
    collection_length: u64,
    avg_length: f64,
}

/// Shared read-only context for query evaluation.
///
/// Owns the index reader, the optional sidecar caches that short-circuit
/// field-length and external-id lookups, and the statistics cache. One
/// context serves an entire batch of queries; query operators borrow it.
pub struct SearchContext {
    reader: Arc<dyn IndexReader>,
    field_lengths: Option<FieldLengthCache>,
    external_ids: Option<ExternalIdCache>,
    field_stats: RwLock<HashMap<String, FieldStats>>,
}

impl SearchContext {
    pub fn new(reader: Arc<dyn IndexReader>) -> Self {
        SearchContext {
            reader,
            field_lengths: None,
            external_ids: None,
            field_stats: RwLock::new(HashMap::new()),
        }
    }

    /// Open an index directory: the serialized index plus, when present,
    /// the two gzipped sidecar caches.
    pub fn open(index_path: &Path) -> Result<SearchContext> {
        let index = MemoryIndex::open(&index_path.join("index.bin"))?;
        let mut context = SearchContext::new(Arc::new(index));

        let flength_path = index_path.join(FIELD_LENGTH_CACHE_FILE);
        match FieldLengthCache::open(&flength_path) {
            Ok(cache) => context.field_lengths = Some(cache),
            Err(e) => log::warn!("cannot open {}: {}", flength_path.display(), e),
        }

        let eid_path = index_path.join(EXTERNAL_ID_CACHE_FILE);
        match ExternalIdCache::open(&eid_path) {
            Ok(cache) => context.external_ids = Some(cache),
            Err(e) => log::warn!("cannot open {}: {}", eid_path.display(), e),
        }

        Ok(context)
    }

    pub fn with_sidecars(
        reader: Arc<dyn IndexReader>,
        field_lengths: Option<FieldLengthCache>,
        external_ids: Option<ExternalIdCache>,
    ) -> Self {
        SearchContext {
            reader,
            field_lengths,
            external_ids,
            field_stats: RwLock::new(HashMap::new()),
        }
    }

    pub fn num_docs(&self) -> u32 {
        self.reader.num_docs()
    }

    pub fn doc_count(&self, field: &str) -> Result<u32> {
        self.reader.doc_count(field)
    }

    pub fn doc_freq(&self, field: &str, term: &str) -> Result<u32> {
        self.reader.doc_freq(field, term)
    }

    pub fn total_term_freq(&self, field: &str, term: &str) -> Result<u64> {
        self.reader.total_term_freq(field, term)
    }

    pub fn postings(&self, field: &str, term: &str) -> Result<PostingList> {
        self.reader.postings(field, term)
    }

    /// Field length, served from the sidecar cache when one is loaded.
    pub fn field_length(&self, field: &str, docid: DocId) -> Result<u32> {
        if let Some(cache) = &self.field_lengths {
            if let Some(length) = cache.field_length(field, docid) {
                return Ok(length);
            }
        }
        self.reader.field_length(field, docid)
    }

    /// External id, served from the sidecar cache when one is loaded.
    pub fn external_id(&self, docid: DocId) -> Result<String> {
        if let Some(cache) = &self.external_ids {
            if let Some(id) = cache.external_id(docid) {
                return Ok(id.to_string());
            }
        }
        self.reader.external_id(docid)
    }

    pub fn internal_id(&self, external_id: &str) -> Result<DocId> {
        self.reader.internal_id(external_id)
    }

    /// Total term occurrences in all instances of the field.
    pub fn collection_length(&self, field: &str) -> Result<u64> {
        Ok(self.field_stats(field)?.collection_length)
    }

    /// Average field length over the documents containing the field.
    pub fn avg_field_length(&self, field: &str) -> Result<f64> {
        Ok(self.field_stats(field)?.avg_length)
    }

    fn field_stats(&self, field: &str) -> Result<FieldStats> {
        // Fast path: already computed for this field.
        {
            let stats = self.field_stats.read();
            if let Some(entry) = stats.get(field) {
                return Ok(*entry);
            }
        }

        let collection_length = self.reader.sum_total_term_freq(field)?;
        let doc_count = self.reader.doc_count(field)?;
        let avg_length = if doc_count > 0 {
            collection_length as f64 / doc_count as f64
        } else {
            0.0
        };
        let entry = FieldStats {
            collection_length,
            avg_length,
        };

        let mut stats = self.field_stats.write();
        stats.insert(field.to_string(), entry);
        Ok(entry)
    }
}
