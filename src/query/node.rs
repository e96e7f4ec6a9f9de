use std::fmt;

use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::context::SearchContext;
use crate::model::{IndriParams, RetrievalModel};
use crate::query::iop::{IopKind, IopNode};
use crate::query::sop::SopNode;

/// A query operator tree node: either an inverted-list operator or a
/// score operator. The parser returns this one sum type; the DAAT
/// protocol methods dispatch on the family.
///
/// Iteration does not consume: `get_match` may be called repeatedly,
/// and the iterator is advanced explicitly, which lets parent
/// operators skip their children forward during evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Iop(IopNode),
    Sop(SopNode),
}

impl QueryNode {
    /// Append an argument, enforcing the operator typing rules and
    /// inserting implicit SCORE operators where a score operator takes
    /// an inverted-list argument.
    pub fn append_arg(&mut self, arg: QueryNode) -> Result<()> {
        match (self, arg) {
            (QueryNode::Iop(parent), QueryNode::Iop(child)) => parent.append_arg(child),
            (QueryNode::Iop(parent), QueryNode::Sop(child)) => Err(Error::syntax(format!(
                "{} cannot be an argument to {}",
                child.display_name, parent.display_name
            ))),
            (QueryNode::Sop(parent), arg) => parent.append_arg(arg),
        }
    }

    /// Append a weight/argument pair; only weighted score operators
    /// accept these.
    pub fn append_weighted_arg(&mut self, weight: f64, arg: QueryNode) -> Result<()> {
        match self {
            QueryNode::Sop(parent) => parent.append_weighted_arg(weight, arg),
            QueryNode::Iop(parent) => Err(Error::syntax(format!(
                "{} does not take weighted arguments",
                parent.display_name
            ))),
        }
    }

    /// Initialize the operator and its arguments. Must be called once
    /// per query before iteration; inverted-list subtrees materialize
    /// their lists here.
    pub fn initialize(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<()> {
        match self {
            QueryNode::Iop(q) => q.initialize(context),
            QueryNode::Sop(q) => q.initialize(context, model),
        }
    }

    /// Whether a match exists at or after the current position. On
    /// true, the matching docid is cached for `get_match`/`get_score`.
    pub fn has_match(&mut self, model: &RetrievalModel) -> bool {
        match self {
            QueryNode::Iop(q) => q.has_match(),
            QueryNode::Sop(q) => q.has_match(model),
        }
    }

    /// The cached match, if `has_match` last returned true.
    pub fn cached_match(&self) -> Option<DocId> {
        match self {
            QueryNode::Iop(q) => q.current_docid(),
            QueryNode::Sop(q) => q.match_cache(),
        }
    }

    pub fn get_match(&self) -> Result<DocId> {
        self.cached_match()
            .ok_or_else(|| Error::protocol("no matching docid was cached"))
    }

    /// Advance past the docid, clearing the match cache.
    pub fn advance_past(&mut self, docid: DocId) {
        match self {
            QueryNode::Iop(q) => q.advance_past(docid),
            QueryNode::Sop(q) => q.advance_past(docid),
        }
    }

    /// Advance to the smallest docid >= the given one, clearing the
    /// match cache.
    pub fn advance_to(&mut self, docid: DocId) {
        match self {
            QueryNode::Iop(q) => q.advance_to(docid),
            QueryNode::Sop(q) => q.advance_to(docid),
        }
    }

    /// Score the cached match. Only score operators produce scores;
    /// the parser guarantees inverted-list operators are wrapped.
    pub fn get_score(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        match self {
            QueryNode::Iop(_) => Err(Error::protocol(
                "inverted-list operators do not produce scores",
            )),
            QueryNode::Sop(q) => q.get_score(context, model),
        }
    }

    /// Indri score for a document that does not match this operator.
    pub fn get_default_score(
        &mut self,
        context: &SearchContext,
        params: &IndriParams,
        docid: DocId,
    ) -> Result<f64> {
        match self {
            QueryNode::Iop(_) => Err(Error::protocol(
                "inverted-list operators do not produce scores",
            )),
            QueryNode::Sop(q) => q.get_default_score(context, params, docid),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            QueryNode::Iop(q) => &q.display_name,
            QueryNode::Sop(q) => &q.display_name,
        }
    }

    pub fn set_display_name(&mut self, name: String) {
        match self {
            QueryNode::Iop(q) => q.display_name = name,
            QueryNode::Sop(q) => q.display_name = name,
        }
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryNode::Iop(q) => write!(f, "{}", q),
            QueryNode::Sop(q) => write!(f, "{}", q),
        }
    }
}

impl fmt::Display for IopNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let IopKind::Term { term } = &self.kind {
            return write!(f, "{}.{}", term, self.field);
        }

        write!(f, "{}(", self.display_name)?;
        for arg in &self.args {
            write!(f, "{} ", arg)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for SopNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.display_name)?;
        for arg in &self.args {
            write!(f, "{} ", arg)?;
        }
        write!(f, ")")
    }
}
