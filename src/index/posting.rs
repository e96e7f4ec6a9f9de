use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::types::DocId;

/// One document's entry in an inverted list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub docid: DocId,
    pub tf: u32,             // Term frequency in the document field
    pub positions: Vec<u32>, // Ascending token positions, one per occurrence
}

impl Posting {
    pub fn new(docid: DocId, positions: Vec<u32>) -> Self {
        Posting {
            docid,
            tf: positions.len() as u32,
            positions,
        }
    }
}

/// A materialized inverted list: postings in strictly increasing docid
/// order, with document frequency (df) and collection term frequency
/// (ctf) totals. Leaf operators fetch these from the index; compound
/// inverted-list operators build them posting by posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList {
    pub field: String,
    pub postings: Vec<Posting>,
    ctf: u64,
}

impl PostingList {
    pub fn new(field: &str) -> Self {
        PostingList {
            field: field.to_string(),
            postings: Vec::new(),
            ctf: 0,
        }
    }

    /// Append a posting. Postings must arrive in increasing docid order.
    pub fn append(&mut self, docid: DocId, positions: Vec<u32>) -> Result<()> {
        if let Some(last) = self.postings.last() {
            if last.docid >= docid {
                return Err(Error::protocol(format!(
                    "posting for docid {} appended after docid {}",
                    docid, last.docid
                )));
            }
        }

        let posting = Posting::new(docid, positions);
        self.ctf += posting.tf as u64;
        self.postings.push(posting);
        Ok(())
    }

    /// Number of documents in the list.
    pub fn df(&self) -> u32 {
        self.postings.len() as u32
    }

    /// Total term occurrences across the list.
    pub fn ctf(&self) -> u64 {
        self.ctf
    }

    /// Docid of the n'th posting.
    pub fn docid(&self, n: usize) -> DocId {
        self.postings[n].docid
    }

    /// Term frequency in the n'th posting.
    pub fn tf(&self, n: usize) -> u32 {
        self.postings[n].tf
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }
}
