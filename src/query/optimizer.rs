use crate::query::iop::IopKind;
use crate::query::node::QueryNode;
use crate::query::sop::SopKind;

/// Remove degenerate nodes produced during parsing, for example
/// `#NEAR/1(of the)`, which turns into `#NEAR/1()` after stopword
/// removal, and unnecessary subtrees such as `#AND(#AND(a))`, which
/// reduces to `a`.
///
/// Depth-first: arguments optimize before their parent. An operator
/// whose argument count drops to zero is deleted (None); any operator
/// other than SCORE that is left with a single argument is replaced by
/// that argument. Weighted operators drop the weights of deleted
/// arguments so weights and arguments stay aligned.
pub fn optimize(node: QueryNode) -> Option<QueryNode> {
    match node {
        // Term operators don't benefit from optimization.
        QueryNode::Iop(q) if matches!(q.kind, IopKind::Term { .. }) => Some(QueryNode::Iop(q)),

        QueryNode::Iop(mut q) => {
            let args = std::mem::take(&mut q.args);
            for arg in args {
                if let Some(QueryNode::Iop(optimized)) = optimize(QueryNode::Iop(arg)) {
                    q.args.push(optimized);
                }
            }

            if q.args.is_empty() {
                return None;
            }
            if q.args.len() == 1 {
                return q.args.pop().map(QueryNode::Iop);
            }
            Some(QueryNode::Iop(q))
        }

        QueryNode::Sop(mut q) => {
            let args = std::mem::take(&mut q.args);
            let old_weights = match &mut q.kind {
                SopKind::WSum { weights } | SopKind::WAnd { weights } => {
                    Some(std::mem::take(weights))
                }
                _ => None,
            };

            let mut kept_weights = Vec::new();
            for (i, arg) in args.into_iter().enumerate() {
                if let Some(optimized) = optimize(arg) {
                    q.args.push(optimized);
                    if let Some(weights) = &old_weights {
                        if let Some(weight) = weights.get(i) {
                            kept_weights.push(*weight);
                        }
                    }
                }
            }
            if old_weights.is_some() {
                if let SopKind::WSum { weights } | SopKind::WAnd { weights } = &mut q.kind {
                    *weights = kept_weights;
                }
            }

            if q.args.is_empty() {
                return None;
            }
            // Only SCORE operators keep a single argument.
            if q.args.len() == 1 && !matches!(q.kind, SopKind::Score) {
                return q.args.pop();
            }
            Some(QueryNode::Sop(q))
        }
    }
}
