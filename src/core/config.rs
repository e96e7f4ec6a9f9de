use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::core::error::Result;

fn default_run_id() -> String {
    "quandex".to_string()
}

/// Experiment parameters, read from a JSON parameter file. Key names
/// follow the parameter-file conventions of the evaluation tooling
/// (camelCase, and colon-prefixed model parameters inside `ranker`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "indexPath")]
    pub index_path: PathBuf,

    #[serde(rename = "queryFilePath")]
    pub query_file_path: PathBuf,

    #[serde(rename = "trecEvalOutputPath")]
    pub trec_eval_output_path: PathBuf,

    #[serde(rename = "trecEvalOutputLength")]
    pub trec_eval_output_length: usize,

    #[serde(rename = "runId", default = "default_run_id")]
    pub run_id: String,

    pub ranker: RankerConfig,
}

/// First-stage ranker parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankerConfig {
    #[serde(rename = "retrievalAlgorithm")]
    pub retrieval_algorithm: String,

    /// Maximum number of results kept per query. Defaults to 1000.
    #[serde(rename = "outputLength")]
    pub output_length: Option<usize>,

    #[serde(rename = "BM25:k_1")]
    pub bm25_k_1: Option<f64>,

    #[serde(rename = "BM25:b")]
    pub bm25_b: Option<f64>,

    #[serde(rename = "BM25:k_3")]
    pub bm25_k_3: Option<f64>,

    #[serde(rename = "Indri:mu")]
    pub indri_mu: Option<f64>,

    #[serde(rename = "Indri:lambda")]
    pub indri_lambda: Option<f64>,
}

impl Config {
    /// Read a JSON parameter file.
    pub fn load(path: &Path) -> Result<Config> {
        let file = File::open(path)?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }
}
