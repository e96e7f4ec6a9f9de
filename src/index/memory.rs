use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::Token;
use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::posting::PostingList;
use crate::index::reader::IndexReader;

/// An inverted index held fully in memory.
///
/// Documents are appended once, before any query runs; internal docids
/// are assigned densely in insertion order. The index can be persisted
/// with bincode so a batch run opens a pre-built file instead of
/// re-indexing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MemoryIndex {
    /// field -> term -> inverted list
    postings: HashMap<String, HashMap<String, PostingList>>,
    /// field -> per-document field length, indexed by internal docid
    field_lengths: HashMap<String, Vec<u32>>,
    /// field -> number of documents containing the field
    doc_counts: HashMap<String, u32>,
    /// internal docid -> external id
    external_ids: Vec<String>,
    /// Rebuilt from external_ids when an index is opened.
    #[serde(skip)]
    internal_ids: HashMap<String, DocId>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        MemoryIndex::default()
    }

    /// Add a document whose fields are already-processed token streams.
    /// Token positions are the stream offsets 0..n.
    pub fn add_document(&mut self, external_id: &str, fields: &[(&str, Vec<&str>)]) -> Result<DocId> {
        let docid = self.allocate(external_id);

        for (field, terms) in fields {
            let tokens: Vec<Token> = terms
                .iter()
                .enumerate()
                .map(|(position, term)| Token::new(term.to_string(), position as u32))
                .collect();
            self.insert_field(docid, field, &tokens, terms.len() as u32)?;
        }

        Ok(docid)
    }

    /// Add a document of raw text fields, run through an analyzer. The
    /// recorded field length counts every tokenized word, including the
    /// stopwords the filter chain removes.
    pub fn add_analyzed(
        &mut self,
        external_id: &str,
        fields: &[(&str, &str)],
        analyzer: &Analyzer,
    ) -> Result<DocId> {
        let docid = self.allocate(external_id);

        for (field, text) in fields {
            let length = analyzer.tokenizer.tokenize(text).len() as u32;
            let tokens = analyzer.analyze(text);
            self.insert_field(docid, field, &tokens, length)?;
        }

        Ok(docid)
    }

    fn allocate(&mut self, external_id: &str) -> DocId {
        let docid = DocId(self.external_ids.len() as u32);
        self.external_ids.push(external_id.to_string());
        self.internal_ids.insert(external_id.to_string(), docid);
        docid
    }

    fn insert_field(
        &mut self,
        docid: DocId,
        field: &str,
        tokens: &[Token],
        field_length: u32,
    ) -> Result<()> {
        *self.doc_counts.entry(field.to_string()).or_insert(0) += 1;

        let lengths = self.field_lengths.entry(field.to_string()).or_default();
        lengths.resize(docid.value() as usize, 0);
        lengths.push(field_length);

        // Group occurrences by term; BTreeMap keeps term order stable.
        let mut term_positions: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
        for token in tokens {
            term_positions
                .entry(token.text.as_str())
                .or_default()
                .push(token.position);
        }

        let field_postings = self.postings.entry(field.to_string()).or_default();
        for (term, positions) in term_positions {
            field_postings
                .entry(term.to_string())
                .or_insert_with(|| PostingList::new(field))
                .append(docid, positions)?;
        }

        Ok(())
    }

    /// Open a bincode-serialized index file.
    pub fn open(path: &Path) -> Result<MemoryIndex> {
        let file = File::open(path).map_err(|e| {
            Error::index_access(format!("cannot open index {}: {}", path.display(), e))
        })?;
        let mut index: MemoryIndex = bincode::deserialize_from(BufReader::new(file))?;

        index.internal_ids = index
            .external_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), DocId(i as u32)))
            .collect();

        Ok(index)
    }

    /// Persist the index with bincode.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        bincode::serialize_into(BufWriter::new(file), self)?;
        Ok(())
    }
}

impl IndexReader for MemoryIndex {
    fn num_docs(&self) -> u32 {
        self.external_ids.len() as u32
    }

    fn doc_count(&self, field: &str) -> Result<u32> {
        Ok(self.doc_counts.get(field).copied().unwrap_or(0))
    }

    fn sum_total_term_freq(&self, field: &str) -> Result<u64> {
        let sum = self
            .field_lengths
            .get(field)
            .map(|lengths| lengths.iter().map(|&l| l as u64).sum())
            .unwrap_or(0);
        Ok(sum)
    }

    fn doc_freq(&self, field: &str, term: &str) -> Result<u32> {
        let df = self
            .postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|list| list.df())
            .unwrap_or(0);
        Ok(df)
    }

    fn total_term_freq(&self, field: &str, term: &str) -> Result<u64> {
        let ctf = self
            .postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .map(|list| list.ctf())
            .unwrap_or(0);
        Ok(ctf)
    }

    fn field_length(&self, field: &str, docid: DocId) -> Result<u32> {
        if docid.value() >= self.num_docs() {
            return Err(Error::index_access(format!(
                "no document with internal id {}",
                docid
            )));
        }

        let length = self
            .field_lengths
            .get(field)
            .and_then(|lengths| lengths.get(docid.value() as usize))
            .copied()
            .unwrap_or(0);
        Ok(length)
    }

    fn postings(&self, field: &str, term: &str) -> Result<PostingList> {
        let list = self
            .postings
            .get(field)
            .and_then(|terms| terms.get(term))
            .cloned()
            .unwrap_or_else(|| PostingList::new(field));
        Ok(list)
    }

    fn external_id(&self, docid: DocId) -> Result<String> {
        self.external_ids
            .get(docid.value() as usize)
            .cloned()
            .ok_or_else(|| Error::index_access(format!("no document with internal id {}", docid)))
    }

    fn internal_id(&self, external_id: &str) -> Result<DocId> {
        self.internal_ids
            .get(external_id)
            .copied()
            .ok_or_else(|| Error::not_found(format!("no document with external id {}", external_id)))
    }
}
