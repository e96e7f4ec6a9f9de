use std::path::Path;

use crate::core::config::RankerConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::context::SearchContext;
use crate::model::RetrievalModel;
use crate::query::parser::QueryParser;
use crate::search::heap::ResultHeap;

/// A ranking: (score, external id) pairs in ranking order.
pub type Ranking = Vec<(f64, String)>;

pub const DEFAULT_OUTPUT_LENGTH: usize = 1000;

/// First-stage bag-of-words ranker: evaluates each query with the
/// document-at-a-time loop and collects the top n results.
pub struct Ranker {
    model: RetrievalModel,
    parser: QueryParser,
    max_results: usize,
}

impl Ranker {
    pub fn new(config: &RankerConfig) -> Result<Ranker> {
        let model = RetrievalModel::from_config(config)?;
        Ok(Ranker {
            model,
            parser: QueryParser::standard(),
            max_results: config.output_length.unwrap_or(DEFAULT_OUTPUT_LENGTH),
        })
    }

    pub fn with_model(model: RetrievalModel, parser: QueryParser, max_results: usize) -> Ranker {
        Ranker {
            model,
            parser,
            max_results,
        }
    }

    pub fn model(&self) -> &RetrievalModel {
        &self.model
    }

    /// Rank every query. A query that fails to parse or score is
    /// reported and produces an empty ranking; the batch continues.
    /// Index access failures abort the batch.
    pub fn get_rankings(
        &self,
        context: &SearchContext,
        queries: &[(String, String)],
    ) -> Result<Vec<(String, Ranking)>> {
        let mut results = Vec::with_capacity(queries.len());

        for (qid, query) in queries {
            log::info!("{}: {}", qid, query);

            match self.evaluate_query(context, query) {
                Ok(ranking) => results.push((qid.clone(), ranking)),
                Err(e) if e.kind == ErrorKind::IndexAccess => return Err(e),
                Err(e) => {
                    log::warn!("query {} failed: {}", qid, e);
                    results.push((qid.clone(), Vec::new()));
                }
            }
        }

        Ok(results)
    }

    /// Evaluate one query string against the index.
    pub fn evaluate_query(&self, context: &SearchContext, query: &str) -> Result<Ranking> {
        // The model's default operator wraps every query, structured
        // or not; redundant nesting collapses during optimization.
        let wrapped = format!("{}({})", self.model.default_operator(), query);

        let Some(mut q) = self.parser.get_query(&wrapped)? else {
            return Ok(Vec::new());
        };
        log::debug!("    ==> {}", q);

        q.initialize(context, &self.model)?;

        // Each pass of the loop scores one matching document.
        let mut heap = ResultHeap::new(self.max_results);
        while q.has_match(&self.model) {
            let docid = q.get_match()?;
            let score = q.get_score(context, &self.model)?;
            q.advance_past(docid);

            // The common case is a result that doesn't make the top n;
            // reject on score before paying for the external id.
            if heap.would_reject(score) {
                continue;
            }
            heap.add(score, context.external_id(docid)?);
        }

        Ok(heap.into_ranking())
    }
}

/// Read a query file: one `qid: query` pair per line.
pub fn read_queries(path: &Path) -> Result<Vec<(String, String)>> {
    let contents = std::fs::read_to_string(path)?;
    let mut queries = Vec::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (qid, query) = line
            .split_once(':')
            .ok_or_else(|| Error::new(ErrorKind::Parse, format!("malformed query line: {}", line)))?;
        queries.push((qid.trim().to_string(), query.trim().to_string()));
    }

    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DocId;
    use crate::index::memory::MemoryIndex;
    use crate::model::{Bm25Params, IndriParams};
    use std::sync::Arc;

    // A five-document corpus with a single body field:
    //   d1 = "b c", d2 = "b d", d3 = "c d", d4 = "b c b", d5 = "x"
    fn context() -> SearchContext {
        let mut index = MemoryIndex::new();
        index.add_document("d1", &[("body", vec!["b", "c"])]).unwrap();
        index.add_document("d2", &[("body", vec!["b", "d"])]).unwrap();
        index.add_document("d3", &[("body", vec!["c", "d"])]).unwrap();
        index
            .add_document("d4", &[("body", vec!["b", "c", "b"])])
            .unwrap();
        index.add_document("d5", &[("body", vec!["x"])]).unwrap();
        SearchContext::new(Arc::new(index))
    }

    fn ranker(model: RetrievalModel) -> Ranker {
        Ranker::with_model(model, QueryParser::standard(), 1000)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{} != {}", a, b);
    }

    #[test]
    fn test_unranked_boolean_and() {
        let context = context();
        let ranker = ranker(RetrievalModel::UnrankedBoolean);

        let ranking = ranker.evaluate_query(&context, "#AND(b c)").unwrap();
        let ids: Vec<&str> = ranking.iter().map(|r| r.1.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d4"]);
        assert!(ranking.iter().all(|r| r.0 == 1.0));
    }

    #[test]
    fn test_ranked_boolean_or() {
        let context = context();
        let ranker = ranker(RetrievalModel::RankedBoolean);

        // d4 wins on tf_b = 2; the rest tie at 1 and rank by id.
        let ranking = ranker.evaluate_query(&context, "#OR(b c)").unwrap();
        let ids: Vec<&str> = ranking.iter().map(|r| r.1.as_str()).collect();
        assert_eq!(ids, vec!["d4", "d1", "d2", "d3"]);
        assert_eq!(ranking[0].0, 2.0);
        assert_eq!(ranking[1].0, 1.0);
    }

    #[test]
    fn test_ranked_boolean_and_takes_minimum() {
        let context = context();
        let ranker = ranker(RetrievalModel::RankedBoolean);

        // d4 has tf_b = 2 but tf_c = 1; the AND score is the minimum.
        let ranking = ranker.evaluate_query(&context, "#AND(b c)").unwrap();
        assert_eq!(ranking[0], (1.0, "d1".to_string()));
        assert_eq!(ranking[1], (1.0, "d4".to_string()));
    }

    #[test]
    fn test_bm25_sum_scores() {
        let context = context();
        let model = RetrievalModel::Bm25(Bm25Params {
            k_1: 1.2,
            b: 0.75,
            k_3: 0.0,
        });
        let ranker = ranker(model);

        let ranking = ranker.evaluate_query(&context, "#SUM(b c)").unwrap();

        // Both terms occur in 3 of 5 documents; average body length is
        // 10 / 5 = 2.
        let rsj = (6.0_f64 / 3.5).ln();
        let tf_weight = |tf: f64, doclen: f64| {
            tf / (tf + 1.2 * (1.0 - 0.75 + 0.75 * (doclen / 2.0)))
        };
        let expected_d4 = rsj * tf_weight(2.0, 3.0) + rsj * tf_weight(1.0, 3.0);
        let expected_d1 = rsj * tf_weight(1.0, 2.0) + rsj * tf_weight(1.0, 2.0);
        let expected_d2 = rsj * tf_weight(1.0, 2.0);

        assert_eq!(ranking[0].1, "d4");
        assert_close(ranking[0].0, expected_d4);
        assert_eq!(ranking[1].1, "d1");
        assert_close(ranking[1].0, expected_d1);
        // d2 and d3 tie with one matching term each.
        assert_eq!(ranking[2].1, "d2");
        assert_close(ranking[2].0, expected_d2);
        assert_eq!(ranking[3].1, "d3");
        assert!(expected_d4 > expected_d1);
    }

    #[test]
    fn test_bm25_structured_and_is_a_model_mismatch() {
        let context = context();
        let model = RetrievalModel::Bm25(Bm25Params {
            k_1: 1.2,
            b: 0.75,
            k_3: 0.0,
        });
        let ranker = ranker(model);

        // Explicit #AND has no BM25 score path. The batch API reports
        // it and keeps going.
        let err = ranker.evaluate_query(&context, "#AND(b c)").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ModelMismatch);

        let queries = vec![
            ("1".to_string(), "#AND(b c)".to_string()),
            ("2".to_string(), "#SUM(b c)".to_string()),
        ];
        let results = ranker.get_rankings(&context, &queries).unwrap();
        assert!(results[0].1.is_empty());
        assert!(!results[1].1.is_empty());
    }

    #[test]
    fn test_indri_and_is_disjunctive_with_default_scores() {
        let context = context();
        let params = IndriParams {
            mu: 10.0,
            lambda: 0.4,
        };
        let ranker = ranker(RetrievalModel::Indri(params));

        // "z" matches nothing, yet documents containing "b" still
        // match; "z" contributes a default score smoothed from
        // ctf = 0.5.
        let ranking = ranker.evaluate_query(&context, "#AND(b z)").unwrap();
        let ids: Vec<&str> = ranking.iter().map(|r| r.1.as_str()).collect();
        assert_eq!(ids, vec!["d4", "d1", "d2"]);

        // ctf_b = 4, collection length 10, d1 body length 2.
        let p_b: f64 = 4.0 / 10.0;
        let s_b = 0.6 * (1.0 + 10.0 * p_b) / (2.0 + 10.0) + 0.4 * p_b;
        let p_z: f64 = 0.5 / 10.0;
        let s_z = 0.6 * (10.0 * p_z) / (2.0 + 10.0) + 0.4 * p_z;
        let expected_d1 = (s_b * s_z).sqrt();
        let d1 = ranking.iter().find(|r| r.1 == "d1").unwrap();
        assert_close(d1.0, expected_d1);

        // A matched term always beats its own default score.
        assert!(s_b > 0.6 * (10.0 * p_b) / (2.0 + 10.0) + 0.4 * p_b);
    }

    #[test]
    fn test_indri_scores_stay_in_unit_interval() {
        let context = context();
        let params = IndriParams {
            mu: 10.0,
            lambda: 0.4,
        };
        let ranker = ranker(RetrievalModel::Indri(params));

        let ranking = ranker.evaluate_query(&context, "#AND(b c)").unwrap();
        assert!(!ranking.is_empty());
        for (score, _) in &ranking {
            assert!(*score > 0.0 && *score <= 1.0);
        }
    }

    #[test]
    fn test_wand_default_score_on_unmatched_document() {
        let context = context();
        let params = IndriParams {
            mu: 10.0,
            lambda: 0.4,
        };
        let model = RetrievalModel::Indri(params);

        let parser = QueryParser::standard();
        let mut q = parser.get_query("#WAND(0.3 b 0.7 c)").unwrap().unwrap();
        q.initialize(&context, &model).unwrap();

        // d5 = "x" contains neither term; both arguments contribute
        // defaults, weighted by 0.3 and 0.7.
        let d5 = context.internal_id("d5").unwrap();
        let score = q.get_default_score(&context, &params, d5).unwrap();

        let default = |ctf: f64| {
            let p = ctf / 10.0;
            0.6 * (10.0 * p) / (1.0 + 10.0) + 0.4 * p
        };
        let expected = default(4.0).powf(0.3) * default(3.0).powf(0.7);
        assert!((score - expected).abs() < 1e-12);
        assert!(score > 0.0);
    }

    #[test]
    fn test_weight_scaling_leaves_scores_unchanged() {
        let context = context();
        let params = IndriParams {
            mu: 10.0,
            lambda: 0.4,
        };
        let ranker = ranker(RetrievalModel::Indri(params));

        let small = ranker
            .evaluate_query(&context, "#WAND(0.3 b 0.7 c)")
            .unwrap();
        let scaled = ranker
            .evaluate_query(&context, "#WAND(3 b 7 c)")
            .unwrap();

        assert_eq!(small.len(), scaled.len());
        for (a, b) in small.iter().zip(scaled.iter()) {
            assert_eq!(a.1, b.1);
            assert_close(a.0, b.0);
        }

        let wsum_small = ranker
            .evaluate_query(&context, "#WSUM(0.3 b 0.7 c)")
            .unwrap();
        let wsum_scaled = ranker
            .evaluate_query(&context, "#WSUM(30 b 70 c)")
            .unwrap();
        for (a, b) in wsum_small.iter().zip(wsum_scaled.iter()) {
            assert_close(a.0, b.0);
        }
    }

    #[test]
    fn test_docid_iteration_is_strictly_increasing() {
        let context = context();
        let model = RetrievalModel::RankedBoolean;

        let parser = QueryParser::standard();
        let mut q = parser.get_query("#AND(#OR(b c d))").unwrap().unwrap();
        q.initialize(&context, &model).unwrap();

        let mut previous: Option<DocId> = None;
        while q.has_match(&model) {
            let docid = q.get_match().unwrap();
            if let Some(previous) = previous {
                assert!(docid > previous);
            }
            previous = Some(docid);
            q.advance_past(docid);
        }
        assert_eq!(previous, Some(DocId(3)));
    }

    #[test]
    fn test_all_stopword_query_yields_empty_ranking() {
        let context = context();
        let ranker = ranker(RetrievalModel::UnrankedBoolean);

        let ranking = ranker.evaluate_query(&context, "of the").unwrap();
        assert!(ranking.is_empty());
    }

    #[test]
    fn test_bad_query_does_not_stop_the_batch() {
        let context = context();
        let ranker = ranker(RetrievalModel::UnrankedBoolean);

        let queries = vec![
            ("1".to_string(), "#BOGUS(b c)".to_string()),
            ("2".to_string(), "b".to_string()),
        ];
        let results = ranker.get_rankings(&context, &queries).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].1.is_empty());
        assert_eq!(results[1].1.len(), 3); // d1, d2, d4
    }

    #[test]
    fn test_output_length_bounds_the_ranking() {
        let context = context();
        let ranker = Ranker::with_model(
            RetrievalModel::RankedBoolean,
            QueryParser::standard(),
            2,
        );

        let ranking = ranker.evaluate_query(&context, "#OR(b c)").unwrap();
        assert_eq!(ranking.len(), 2);
        // d4 scores 2; the tie at 1 keeps the smallest id.
        assert_eq!(ranking[0].1, "d4");
        assert_eq!(ranking[1].1, "d1");
    }

    #[test]
    fn test_read_queries_format() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queries.qry");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "10: apple pie").unwrap();
        writeln!(file, "11: #AND(crust filling)").unwrap();
        drop(file);

        let queries = read_queries(&path).unwrap();
        assert_eq!(
            queries,
            vec![
                ("10".to_string(), "apple pie".to_string()),
                ("11".to_string(), "#AND(crust filling)".to_string()),
            ]
        );
    }
}
