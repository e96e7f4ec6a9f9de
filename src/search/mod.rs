pub mod heap;
pub mod ranker;
pub mod trec;
