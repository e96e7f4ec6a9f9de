use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::core::error::Result;

/// Placeholder written for queries that retrieved nothing, so every
/// query id appears in the output file.
const NONEXISTENT_DOCID: &str = "Nonexistent_Docid";

/// Write search results in trec_eval input format:
/// `qid Q0 externalId rank score runId`.
pub struct TrecRunWriter {
    writer: BufWriter<File>,
    max_results: usize,
}

impl TrecRunWriter {
    pub fn new(path: &Path, max_results: usize) -> Result<TrecRunWriter> {
        let file = File::create(path)?;
        Ok(TrecRunWriter {
            writer: BufWriter::new(file),
            max_results,
        })
    }

    /// Append one query's ranking.
    pub fn append_query(
        &mut self,
        qid: &str,
        results: &[(f64, String)],
        run_id: &str,
    ) -> Result<()> {
        if results.is_empty() {
            self.write_line(qid, NONEXISTENT_DOCID, 1, 0.0, run_id)?;
        } else {
            for (i, (score, external_id)) in results.iter().take(self.max_results).enumerate() {
                self.write_line(qid, external_id, i + 1, *score, run_id)?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn write_line(
        &mut self,
        qid: &str,
        external_id: &str,
        rank: usize,
        score: f64,
        run_id: &str,
    ) -> Result<()> {
        writeln!(
            self.writer,
            "{} Q0 {} {} {:.12} {}",
            qid, external_id, rank, score, run_id
        )?;
        Ok(())
    }
}
