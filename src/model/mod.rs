use crate::core::config::RankerConfig;
use crate::core::error::{Error, Result};

/// BM25 parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k_1: f64,
    pub b: f64,
    pub k_3: f64,
}

/// Indri two-stage smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndriParams {
    pub mu: f64,
    pub lambda: f64,
}

/// The retrieval model a query is evaluated under. The model selects
/// the score path inside each operator and the default operator that
/// wraps bag-of-words queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetrievalModel {
    UnrankedBoolean,
    RankedBoolean,
    Bm25(Bm25Params),
    Indri(IndriParams),
}

impl RetrievalModel {
    /// Build a model from ranker parameters. Model parameters are
    /// required when their model is selected.
    pub fn from_config(config: &RankerConfig) -> Result<RetrievalModel> {
        match config.retrieval_algorithm.as_str() {
            "UnrankedBoolean" => Ok(RetrievalModel::UnrankedBoolean),
            "RankedBoolean" => Ok(RetrievalModel::RankedBoolean),
            "BM25" => Ok(RetrievalModel::Bm25(Bm25Params {
                k_1: require(config.bm25_k_1, "BM25:k_1")?,
                b: require(config.bm25_b, "BM25:b")?,
                k_3: require(config.bm25_k_3, "BM25:k_3")?,
            })),
            "Indri" => Ok(RetrievalModel::Indri(IndriParams {
                mu: require(config.indri_mu, "Indri:mu")?,
                lambda: require(config.indri_lambda, "Indri:lambda")?,
            })),
            other => Err(Error::config(format!(
                "Unknown retrievalAlgorithm: {}",
                other
            ))),
        }
    }

    /// The operator that wraps unstructured (bag-of-words) queries.
    pub fn default_operator(&self) -> &'static str {
        match self {
            RetrievalModel::UnrankedBoolean => "#AND",
            RetrievalModel::RankedBoolean => "#AND",
            RetrievalModel::Bm25(_) => "#SUM",
            RetrievalModel::Indri(_) => "#AND",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RetrievalModel::UnrankedBoolean => "UnrankedBoolean",
            RetrievalModel::RankedBoolean => "RankedBoolean",
            RetrievalModel::Bm25(_) => "BM25",
            RetrievalModel::Indri(_) => "Indri",
        }
    }
}

fn require(value: Option<f64>, name: &str) -> Result<f64> {
    value.ok_or_else(|| Error::config(format!("Missing parameter {}", name)))
}
