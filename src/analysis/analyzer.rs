use rust_stemmers::Algorithm;

use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};

/// Text analysis pipeline: a tokenizer followed by a filter chain.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Analyze and keep only the term text. Query parsing works on raw
    /// terms and doesn't care about positions.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }

    /// Lowercasing, English stopword removal, and stemming.
    pub fn standard_english() -> Self {
        Analyzer::new(
            "standard_english".to_string(),
            Box::new(StandardTokenizer::default()),
        )
        .add_filter(Box::new(LowercaseFilter))
        .add_filter(Box::new(StopWordFilter::english()))
        .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }
}

impl Clone for Analyzer {
    fn clone(&self) -> Self {
        Analyzer {
            tokenizer: self.tokenizer.clone_box(),
            filters: self.filters.iter().map(|f| f.clone_box()).collect(),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_english_pipeline() {
        let analyzer = Analyzer::standard_english();

        // "the" is a stopword, "Pies" lowercases and stems to "pie".
        let terms = analyzer.tokenize("The Apple Pies");
        assert_eq!(terms, vec!["appl", "pie"]);
    }

    #[test]
    fn test_stopword_positions_survive() {
        let analyzer = Analyzer::standard_english();

        // Removing "the" leaves a position gap between the neighbors.
        let tokens = analyzer.analyze("apple the crust");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 2);
    }

    #[test]
    fn test_empty_after_analysis() {
        let analyzer = Analyzer::standard_english();
        assert!(analyzer.tokenize("of the").is_empty());
    }
}
