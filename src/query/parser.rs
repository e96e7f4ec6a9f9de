use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, Result};
use crate::query::iop::IopNode;
use crate::query::node::QueryNode;
use crate::query::optimizer::optimize;
use crate::query::sop::{SopKind, SopNode};

/// The closed set of document fields a term may be bound to.
const FIELDS: [&str; 5] = ["body", "title", "url", "keywords", "inlink"];

/// An embarrassingly simplistic parser for the prefix operator
/// language: `#OP(arg arg ...)`, nested, with bare terms written as
/// `term` or `term.field`. The query string is consumed left to right,
/// popping one operator, weight, term, or balanced subquery at a time.
pub struct QueryParser {
    analyzer: Analyzer,
}

impl QueryParser {
    pub fn new(analyzer: Analyzer) -> Self {
        QueryParser { analyzer }
    }

    /// Parser with the standard English analysis chain.
    pub fn standard() -> Self {
        QueryParser::new(Analyzer::standard_english())
    }

    /// Parse a query string into an optimized query tree. Returns None
    /// when the whole query optimizes away (e.g. it was all stopwords).
    pub fn get_query(&self, query: &str) -> Result<Option<QueryNode>> {
        let tree = self.parse_string(query)?;
        Ok(optimize(tree))
    }

    /// An exact parse of the query string, before optimization.
    pub fn parse_string(&self, query: &str) -> Result<QueryNode> {
        let query = query.trim();

        // This parser is sensitive to parenthesis placement, so check
        // for basic errors first: the outermost operator must span the
        // whole string.
        let opens = query.matches('(').count();
        let closes = query.matches(')').count();
        if opens == 0
            || opens != closes
            || balancing_paren(query)? != Some(query.len() - 1)
        {
            return Err(Error::syntax("Missing, unbalanced, or misplaced parentheses"));
        }

        let (operator_name, rest) = match query.split_once('(') {
            Some(parts) => parts,
            None => return Err(Error::syntax("Missing, unbalanced, or misplaced parentheses")),
        };
        let mut tree = create_operator(operator_name.trim())?;

        let rest = match rest.rfind(')') {
            Some(i) => &rest[..i],
            None => return Err(Error::syntax("Missing, unbalanced, or misplaced parentheses")),
        };

        // Each pass consumes one argument: a balanced subquery or a
        // term token (which may analyze into several terms, or none).
        let mut remaining = rest.trim();
        while !remaining.is_empty() {
            let weight = if is_weighted(&tree) {
                let (weight, rest) = pop_weight(remaining)?;
                remaining = rest.trim_start();
                Some(weight)
            } else {
                None
            };

            let qargs = if remaining.starts_with('#') {
                let (subquery, rest) = pop_subquery(remaining)?;
                remaining = rest;
                vec![self.parse_string(subquery)?]
            } else {
                let (token, rest) = pop_term(remaining);
                remaining = rest;
                self.create_terms(token)?
            };
            remaining = remaining.trim_start();

            for q in qargs {
                match weight {
                    Some(weight) => tree.append_weighted_arg(weight, q)?,
                    None => tree.append_arg(q)?,
                }
            }
        }

        Ok(tree)
    }

    /// Create zero or more TERM nodes from one token. The token may
    /// carry a field suffix (`apple.title`), and lexical processing may
    /// split it (`near-death`), drop it (a stopword), or rewrite it
    /// (stemming).
    fn create_terms(&self, token: &str) -> Result<Vec<QueryNode>> {
        let (term, field) = match token.split_once('.') {
            Some((term, field)) => (term, field.to_lowercase()),
            None => (token, "body".to_string()),
        };

        if !FIELDS.contains(&field.as_str()) {
            return Err(Error::syntax(format!("Unknown field {}", token)));
        }

        Ok(self
            .analyzer
            .tokenize(term)
            .into_iter()
            .map(|t| QueryNode::Iop(IopNode::term(&t, &field)))
            .collect())
    }

    /// Lexical processing for raw query text: stopword removal and
    /// stemming, yielding plain term strings.
    pub fn tokenize_string(&self, text: &str) -> Vec<String> {
        self.analyzer.tokenize(text)
    }
}

/// Create the operator a `#name` refers to. Names are case-insensitive;
/// proximity operators carry an integer suffix (`#NEAR/2`).
fn create_operator(name: &str) -> Result<QueryNode> {
    let lower = name.to_lowercase();

    let mut node = if lower == "#or" {
        QueryNode::Sop(SopNode::new(SopKind::Or))
    } else if lower == "#and" {
        QueryNode::Sop(SopNode::new(SopKind::And))
    } else if lower == "#sum" {
        QueryNode::Sop(SopNode::new(SopKind::Sum))
    } else if lower == "#wsum" {
        QueryNode::Sop(SopNode::new(SopKind::WSum { weights: Vec::new() }))
    } else if lower == "#wand" {
        QueryNode::Sop(SopNode::new(SopKind::WAnd { weights: Vec::new() }))
    } else if lower == "#syn" {
        QueryNode::Iop(IopNode::syn())
    } else if let Some(suffix) = lower.strip_prefix("#near/") {
        let distance = suffix
            .parse()
            .map_err(|_| Error::syntax(format!("Unknown query operator {}", name)))?;
        QueryNode::Iop(IopNode::near(distance))
    } else if let Some(suffix) = lower.strip_prefix("#window/") {
        let size = suffix
            .parse()
            .map_err(|_| Error::syntax(format!("Unknown query operator {}", name)))?;
        QueryNode::Iop(IopNode::window(size))
    } else {
        return Err(Error::syntax(format!("Unknown query operator {}", name)));
    };

    node.set_display_name(name.to_uppercase());
    Ok(node)
}

fn is_weighted(node: &QueryNode) -> bool {
    match node {
        QueryNode::Sop(sop) => {
            matches!(sop.kind, SopKind::WSum { .. } | SopKind::WAnd { .. })
        }
        QueryNode::Iop(_) => false,
    }
}

/// Byte index of the right parenthesis that balances the left-most
/// one, or None if there is no parenthesis to balance.
fn balancing_paren(s: &str) -> Result<Option<usize>> {
    let mut depth = 0usize;

    for (i, c) in s.char_indices() {
        if c == '(' {
            depth += 1;
        } else if c == ')' {
            if depth == 0 {
                return Err(Error::syntax("Unbalanced or missing parentheses"));
            }
            depth -= 1;
            if depth == 0 {
                return Ok(Some(i));
            }
        }
    }

    Ok(None)
}

/// Pop a balanced subquery off the head of an argument string, e.g.
/// `#and(a b) c d` -> (`#and(a b)`, ` c d`).
fn pop_subquery(s: &str) -> Result<(&str, &str)> {
    match balancing_paren(s)? {
        // Malformed; let the recursive parse report it.
        None => Ok((s, "")),
        Some(i) => Ok((&s[..i + 1], &s[i + 1..])),
    }
}

/// Pop one whitespace-delimited token off the head of an argument
/// string, e.g. `a b c` -> (`a`, ` b c`).
fn pop_term(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

/// Pop a numeric weight off the head of an argument string, e.g.
/// `3.0 fu 2.0 bar` -> (3.0, ` fu 2.0 bar`).
fn pop_weight(s: &str) -> Result<(f64, &str)> {
    let (token, rest) = pop_term(s);
    if rest.trim().is_empty() {
        return Err(Error::syntax("Missing weight or query argument"));
    }

    let weight = token
        .parse()
        .map_err(|_| Error::syntax(format!("Expected a numeric weight, found {}", token)))?;
    Ok((weight, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokenizer::StandardTokenizer;
    use crate::analysis::filters::lowercase::LowercaseFilter;
    use crate::query::iop::IopKind;
    use crate::query::optimizer::optimize;

    /// A parser whose analyzer only lowercases, so test terms pass
    /// through unchanged.
    fn plain_parser() -> QueryParser {
        let analyzer = Analyzer::new(
            "plain".to_string(),
            Box::new(StandardTokenizer::default()),
        )
        .add_filter(Box::new(LowercaseFilter));
        QueryParser::new(analyzer)
    }

    fn iop(node: &QueryNode) -> &IopNode {
        match node {
            QueryNode::Iop(q) => q,
            QueryNode::Sop(_) => panic!("expected an inverted-list operator"),
        }
    }

    fn sop(node: &QueryNode) -> &SopNode {
        match node {
            QueryNode::Sop(q) => q,
            QueryNode::Iop(_) => panic!("expected a score operator"),
        }
    }

    #[test]
    fn test_terms_are_wrapped_in_implicit_score() {
        let parser = plain_parser();
        let tree = parser.parse_string("#AND(b c)").unwrap();

        let and = sop(&tree);
        assert!(matches!(and.kind, SopKind::And));
        assert_eq!(and.args.len(), 2);
        for arg in &and.args {
            let score = sop(arg);
            assert!(matches!(score.kind, SopKind::Score));
            assert!(matches!(iop(&score.args[0]).kind, IopKind::Term { .. }));
        }
    }

    #[test]
    fn test_operator_names_case_insensitive() {
        let parser = plain_parser();
        assert!(parser.parse_string("#and(b c)").is_ok());
        assert!(parser.parse_string("#Or(b c)").is_ok());
        assert!(parser.parse_string("#sUm(b c)").is_ok());
    }

    #[test]
    fn test_near_window_distance_suffix() {
        let parser = plain_parser();

        let tree = parser.parse_string("#NEAR/2(b c)").unwrap();
        assert!(matches!(iop(&tree).kind, IopKind::Near { distance: 2 }));
        assert_eq!(tree.display_name(), "#NEAR/2");

        let tree = parser.parse_string("#window/15(b c)").unwrap();
        assert!(matches!(iop(&tree).kind, IopKind::Window { size: 15 }));

        assert!(parser.parse_string("#NEAR/x(b c)").is_err());
        assert!(parser.parse_string("#NEARLY/2(b c)").is_err());
    }

    #[test]
    fn test_field_suffix_and_default_field() {
        let parser = plain_parser();
        let tree = parser.parse_string("#AND(b.title c)").unwrap();

        let and = sop(&tree);
        assert_eq!(iop(&sop(&and.args[0]).args[0]).field, "title");
        assert_eq!(iop(&sop(&and.args[1]).args[0]).field, "body");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let parser = plain_parser();
        let err = parser.parse_string("#AND(b.abstract)").unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::Syntax);
    }

    #[test]
    fn test_unbalanced_parens_rejected() {
        let parser = plain_parser();
        assert!(parser.parse_string("#AND(b c").is_err());
        assert!(parser.parse_string("#AND b c)").is_err());
        assert!(parser.parse_string("b c").is_err());
        assert!(parser.parse_string("#AND(b) c)").is_err());
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let parser = plain_parser();
        assert!(parser.parse_string("#BUTNOT(b c)").is_err());
    }

    #[test]
    fn test_nested_subqueries() {
        let parser = plain_parser();
        let tree = parser
            .parse_string("#AND(b #NEAR/1(c d) #OR(e f))")
            .unwrap();

        let and = sop(&tree);
        assert_eq!(and.args.len(), 3);
        // The NEAR subquery is an inverted-list operator, so it gets an
        // implicit SCORE wrapper.
        let near_score = sop(&and.args[1]);
        assert!(matches!(near_score.kind, SopKind::Score));
        assert!(matches!(
            iop(&near_score.args[0]).kind,
            IopKind::Near { distance: 1 }
        ));
        assert!(matches!(sop(&and.args[2]).kind, SopKind::Or));
    }

    #[test]
    fn test_weighted_operator_parses_weight_argument_pairs() {
        let parser = plain_parser();
        let tree = parser.parse_string("#WSUM(0.3 b 0.7 #AND(c d))").unwrap();

        let wsum = sop(&tree);
        let SopKind::WSum { weights } = &wsum.kind else {
            panic!("expected WSUM");
        };
        assert_eq!(weights, &vec![0.3, 0.7]);
        assert_eq!(wsum.args.len(), 2);
    }

    #[test]
    fn test_weighted_operator_missing_argument() {
        let parser = plain_parser();
        assert!(parser.parse_string("#WAND(0.3)").is_err());
        assert!(parser.parse_string("#WAND(b 0.7)").is_err());
    }

    #[test]
    fn test_stopwords_drop_out_of_the_tree() {
        let parser = QueryParser::standard();

        // "of" and "the" analyze to nothing; only one term survives.
        let tree = parser.get_query("#AND(of the crust)").unwrap().unwrap();
        let score = sop(&tree);
        assert!(matches!(score.kind, SopKind::Score));

        // A query of nothing but stopwords optimizes away entirely.
        assert!(parser.get_query("#AND(of the)").unwrap().is_none());
    }

    #[test]
    fn test_optimizer_collapses_single_argument_operators() {
        let parser = plain_parser();

        let tree = parser.get_query("#AND(#AND(b c))").unwrap().unwrap();
        let and = sop(&tree);
        assert!(matches!(and.kind, SopKind::And));
        assert_eq!(and.args.len(), 2);

        // A single-term AND reduces to the term's SCORE wrapper.
        let tree = parser.get_query("#AND(b)").unwrap().unwrap();
        assert!(matches!(sop(&tree).kind, SopKind::Score));
    }

    #[test]
    fn test_optimizer_keeps_weights_aligned() {
        let parser = QueryParser::standard();

        // "the" is a stopword: its argument disappears and so must its
        // weight.
        let tree = parser
            .get_query("#WSUM(0.5 the 0.3 crust 0.2 pie)")
            .unwrap()
            .unwrap();
        let wsum = sop(&tree);
        let SopKind::WSum { weights } = &wsum.kind else {
            panic!("expected WSUM");
        };
        assert_eq!(weights, &vec![0.3, 0.2]);
        assert_eq!(wsum.args.len(), 2);
    }

    #[test]
    fn test_optimizer_idempotent() {
        let parser = plain_parser();

        let tree = parser.parse_string("#AND(#OR(b) #AND(c d) e)").unwrap();
        let once = optimize(tree).unwrap();
        let twice = optimize(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_tokenize_string_applies_lexical_processing() {
        let parser = QueryParser::standard();
        assert_eq!(
            parser.tokenize_string("The Apple Pies"),
            vec!["appl".to_string(), "pie".to_string()]
        );
    }

    #[test]
    fn test_display_round_trip() {
        let parser = plain_parser();
        let tree = parser.parse_string("#AND(b.title #NEAR/2(c d))").unwrap();
        assert_eq!(
            tree.to_string(),
            "#AND(#SCORE(b.title ) #SCORE(#NEAR/2(c.body d.body ) ) )"
        );
    }
}
