use std::env;
use std::path::Path;
use std::process;
use std::time::Instant;

use quandex::core::config::Config;
use quandex::core::error::Result;
use quandex::index::context::SearchContext;
use quandex::search::ranker::{Ranker, read_queries};
use quandex::search::trec::TrecRunWriter;

const USAGE: &str = "Usage: quandex <paramFile>";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("{}", USAGE);
        process::exit(1);
    }

    if let Err(e) = run(Path::new(&args[1])) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(param_file: &Path) -> Result<()> {
    let started = Instant::now();

    let config = Config::load(param_file)?;
    let context = SearchContext::open(&config.index_path)?;
    let queries = read_queries(&config.query_file_path)?;

    println!("-- Ranker: {} --", config.ranker.retrieval_algorithm);
    let ranker = Ranker::new(&config.ranker)?;
    let results = ranker.get_rankings(&context, &queries)?;

    let mut writer = TrecRunWriter::new(
        &config.trec_eval_output_path,
        config.trec_eval_output_length,
    )?;
    for (qid, ranking) in &results {
        writer.append_query(qid, ranking, &config.run_id)?;
    }

    println!("Time: {:.3}s", started.elapsed().as_secs_f64());
    Ok(())
}
