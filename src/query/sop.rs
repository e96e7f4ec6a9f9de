use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::context::SearchContext;
use crate::model::{Bm25Params, IndriParams, RetrievalModel};
use crate::query::iop::IopNode;
use crate::query::node::QueryNode;

/// Score operator variants. Weighted variants keep their weights in
/// argument order; `append_weighted_arg` keeps the two lists in
/// lockstep.
#[derive(Debug, Clone, PartialEq)]
pub enum SopKind {
    Score,
    And,
    Or,
    Sum,
    WSum { weights: Vec<f64> },
    WAnd { weights: Vec<f64> },
}

/// A score operator. Unlike inverted-list operators, these iterate a
/// virtual list: the next matching document is computed on demand from
/// the argument iterators, and the match is cached until the next
/// advance so `get_match` and `get_score` don't recompute it.
#[derive(Debug, Clone, PartialEq)]
pub struct SopNode {
    pub kind: SopKind,
    pub display_name: String,
    pub args: Vec<QueryNode>,
    match_cache: Option<DocId>,
}

impl SopNode {
    pub fn new(kind: SopKind) -> Self {
        let display_name = match &kind {
            SopKind::Score => "#SCORE",
            SopKind::And => "#AND",
            SopKind::Or => "#OR",
            SopKind::Sum => "#SUM",
            SopKind::WSum { .. } => "#WSUM",
            SopKind::WAnd { .. } => "#WAND",
        }
        .to_string();

        SopNode {
            kind,
            display_name,
            args: Vec::new(),
            match_cache: None,
        }
    }

    /// Append an argument, enforcing the operator typing rules:
    /// SCORE takes exactly one inverted-list argument, and an
    /// inverted-list argument anywhere else is wrapped in an implicit
    /// SCORE so that every child of a score operator produces scores.
    pub fn append_arg(&mut self, arg: QueryNode) -> Result<()> {
        if matches!(self.kind, SopKind::Score) {
            if !self.args.is_empty() {
                return Err(Error::syntax("Score operators can have only one argument"));
            }
            if !matches!(arg, QueryNode::Iop(_)) {
                return Err(Error::syntax(
                    "The argument to a SCORE operator must be an inverted-list operator.",
                ));
            }
            self.args.push(arg);
            return Ok(());
        }

        match arg {
            QueryNode::Iop(iop) => {
                let mut implied = SopNode::new(SopKind::Score);
                implied.args.push(QueryNode::Iop(iop));
                self.args.push(QueryNode::Sop(implied));
            }
            QueryNode::Sop(_) => self.args.push(arg),
        }
        Ok(())
    }

    /// Append a weight/argument pair on a weighted operator.
    pub fn append_weighted_arg(&mut self, weight: f64, arg: QueryNode) -> Result<()> {
        if !matches!(self.kind, SopKind::WSum { .. } | SopKind::WAnd { .. }) {
            return Err(Error::syntax(format!(
                "{} does not take weighted arguments",
                self.display_name
            )));
        }

        self.append_arg(arg)?;
        if let SopKind::WSum { weights } | SopKind::WAnd { weights } = &mut self.kind {
            weights.push(weight);
        }
        Ok(())
    }

    pub fn initialize(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<()> {
        for arg in &mut self.args {
            arg.initialize(context, model)?;
        }
        self.match_cache = None;
        Ok(())
    }

    pub fn match_cache(&self) -> Option<DocId> {
        self.match_cache
    }

    pub fn get_match(&self) -> Result<DocId> {
        self.match_cache
            .ok_or_else(|| Error::protocol("no matching docid was cached"))
    }

    pub fn advance_past(&mut self, docid: DocId) {
        for arg in &mut self.args {
            arg.advance_past(docid);
        }
        self.match_cache = None;
    }

    pub fn advance_to(&mut self, docid: DocId) {
        for arg in &mut self.args {
            arg.advance_to(docid);
        }
        self.match_cache = None;
    }

    pub fn has_match(&mut self, model: &RetrievalModel) -> bool {
        let indri = matches!(model, RetrievalModel::Indri(_));
        match self.kind {
            SopKind::Score => self.has_match_first(model),
            // Indri's AND is disjunctive; missing arguments contribute
            // default scores instead of filtering the document out.
            SopKind::And if indri => self.has_match_min(model),
            SopKind::And => self.has_match_all(model),
            _ => self.has_match_min(model),
        }
    }

    /// Match whatever the first (only) argument matches.
    fn has_match_first(&mut self, model: &RetrievalModel) -> bool {
        self.match_cache = None;

        if let Some(q) = self.args.first_mut() {
            if q.has_match(model) {
                self.match_cache = q.cached_match();
            }
        }
        self.match_cache.is_some()
    }

    /// Match a document that every argument matches.
    fn has_match_all(&mut self, model: &RetrievalModel) -> bool {
        self.match_cache = None;

        if self.args.is_empty() {
            return false;
        }

        // Keep trying until a match is found or no match is possible.
        loop {
            if !self.args[0].has_match(model) {
                return false;
            }
            let Some(docid_0) = self.args[0].cached_match() else {
                return false;
            };

            // The other arguments must reach the first argument's
            // docid; if one lands past it, restart from there.
            let mut restart = None;
            for i in 1..self.args.len() {
                self.args[i].advance_to(docid_0);
                if !self.args[i].has_match(model) {
                    return false;
                }
                let Some(docid_i) = self.args[i].cached_match() else {
                    return false;
                };
                if docid_i != docid_0 {
                    restart = Some(docid_i);
                    break;
                }
            }

            match restart {
                None => {
                    self.match_cache = Some(docid_0);
                    return true;
                }
                Some(docid) => self.args[0].advance_to(docid),
            }
        }
    }

    /// Match the smallest docid any argument matches.
    fn has_match_min(&mut self, model: &RetrievalModel) -> bool {
        self.match_cache = None;

        let mut min_docid: Option<DocId> = None;
        for q in &mut self.args {
            if q.has_match(model) {
                if let Some(docid) = q.cached_match() {
                    min_docid = Some(match min_docid {
                        Some(min) => min.min(docid),
                        None => docid,
                    });
                }
            }
        }

        self.match_cache = min_docid;
        min_docid.is_some()
    }

    pub fn get_score(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        match self.kind {
            SopKind::Score => self.score_leaf(context, model),
            SopKind::And => self.score_and(context, model),
            SopKind::Or => self.score_or(context, model),
            SopKind::Sum => self.score_sum(context, model),
            SopKind::WSum { .. } => self.score_wsum(context, model),
            SopKind::WAnd { .. } => self.score_wand(context, model),
        }
    }

    /// Score for a document assumed to *not* match this operator.
    /// Indri only; other models never reach these call sites because
    /// the Indri parameters are required to make the call.
    pub fn get_default_score(
        &mut self,
        context: &SearchContext,
        params: &IndriParams,
        docid: DocId,
    ) -> Result<f64> {
        match self.kind {
            SopKind::Score => self.default_score_leaf(context, params, docid),
            SopKind::And => {
                let n = self.args.len() as f64;
                let mut product = 1.0;
                for q in &mut self.args {
                    product *= q.get_default_score(context, params, docid)?;
                }
                Ok(product.powf(1.0 / n))
            }
            SopKind::WSum { .. } => {
                let total: f64 = self.weights().iter().sum();
                let mut score = 0.0;
                for i in 0..self.args.len() {
                    let weight = self.weight(i);
                    score += self.args[i].get_default_score(context, params, docid)?
                        * (weight / total);
                }
                Ok(score)
            }
            SopKind::WAnd { .. } => {
                let total: f64 = self.weights().iter().sum();
                let mut product = 1.0;
                for i in 0..self.args.len() {
                    let weight = self.weight(i);
                    product *= self.args[i]
                        .get_default_score(context, params, docid)?
                        .powf(weight / total);
                }
                Ok(product)
            }
            SopKind::Or | SopKind::Sum => Err(Error::model_mismatch(format!(
                "{} does not support the Indri model",
                self.display_name
            ))),
        }
    }

    fn weights(&self) -> &[f64] {
        match &self.kind {
            SopKind::WSum { weights } | SopKind::WAnd { weights } => weights,
            _ => &[],
        }
    }

    fn weight(&self, i: usize) -> f64 {
        self.weights().get(i).copied().unwrap_or(0.0)
    }

    /// The single inverted-list argument of a SCORE operator.
    fn iop_arg(&self) -> Result<&IopNode> {
        match self.args.first() {
            Some(QueryNode::Iop(q)) => Ok(q),
            _ => Err(Error::protocol(
                "SCORE operator without an inverted-list argument",
            )),
        }
    }

    // ---- SCORE ----

    fn score_leaf(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        match model {
            RetrievalModel::UnrankedBoolean => {
                Ok(if self.match_cache.is_some() { 1.0 } else { 0.0 })
            }
            RetrievalModel::RankedBoolean => {
                if self.match_cache.is_none() {
                    return Ok(0.0);
                }
                Ok(self.iop_arg()?.current_posting()?.tf as f64)
            }
            RetrievalModel::Bm25(params) => {
                let params = *params;
                self.score_leaf_bm25(context, &params)
            }
            RetrievalModel::Indri(params) => {
                let params = *params;
                self.score_leaf_indri(context, &params)
            }
        }
    }

    fn score_leaf_bm25(&self, context: &SearchContext, params: &Bm25Params) -> Result<f64> {
        if self.match_cache.is_none() {
            return Ok(0.0);
        }
        let q = self.iop_arg()?;

        // RSJ weight. N is constant across the batch and served from
        // the context's statistics cache.
        let n = context.num_docs() as f64;
        let df = q.df() as f64;
        let rsj_weight = ((n + 1.0) / (df + 0.5)).ln();

        // tf weight with document length normalization.
        let tf = q.current_posting()?.tf as f64;
        let doclen = context.field_length(&q.field, q.get_match()?)? as f64;
        let avg_doclen = context.avg_field_length(&q.field)?;
        let tf_weight = tf / (tf + params.k_1 * ((1.0 - params.b) + params.b * (doclen / avg_doclen)));

        // User weight with qtf = 1.
        let qtf = 1.0;
        let user_weight = (params.k_3 + 1.0) * qtf / (params.k_3 + qtf);

        Ok(rsj_weight * tf_weight * user_weight)
    }

    fn score_leaf_indri(&self, context: &SearchContext, params: &IndriParams) -> Result<f64> {
        if self.match_cache.is_none() {
            return Ok(0.0);
        }
        let q = self.iop_arg()?;

        // Two-stage smoothing.
        let ctf = q.ctf() as f64;
        let length_c = context.collection_length(&q.field)? as f64;
        let p_mle = ctf / length_c;

        let tf = q.current_posting()?.tf as f64;
        let length_d = context.field_length(&q.field, q.get_match()?)? as f64;
        if length_d == 0.0 && params.mu == 0.0 {
            return Ok(0.0);
        }
        Ok((1.0 - params.lambda) * ((tf + params.mu * p_mle) / (length_d + params.mu))
            + params.lambda * p_mle)
    }

    fn default_score_leaf(
        &self,
        context: &SearchContext,
        params: &IndriParams,
        docid: DocId,
    ) -> Result<f64> {
        let q = self.iop_arg()?;

        // Extra smoothing for terms with ctf = 0.
        let mut ctf = q.ctf() as f64;
        if ctf == 0.0 {
            ctf = 0.5;
        }
        let length_c = context.collection_length(&q.field)? as f64;
        let p_mle = ctf / length_c;

        let length_d = context.field_length(&q.field, docid)? as f64;
        if length_d == 0.0 && params.mu == 0.0 {
            return Ok(0.0);
        }
        Ok((1.0 - params.lambda) * ((params.mu * p_mle) / (length_d + params.mu))
            + params.lambda * p_mle)
    }

    // ---- AND ----

    fn score_and(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        match model {
            RetrievalModel::UnrankedBoolean | RetrievalModel::RankedBoolean => {
                self.score_boolean_min(context, model)
            }
            RetrievalModel::Indri(params) => {
                let params = *params;
                self.score_indri_and(context, model, &params)
            }
            RetrievalModel::Bm25(_) => Err(Error::model_mismatch(format!(
                "{} does not support the BM25 model",
                self.display_name
            ))),
        }
    }

    /// Minimum of the scores of the arguments that match here. The
    /// document matches, but not every argument necessarily does, so
    /// each is checked.
    fn score_boolean_min(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        let docid = self.get_match()?;
        let mut min_score: Option<f64> = None;

        for q in &mut self.args {
            if q.has_match(model) && q.cached_match() == Some(docid) {
                let score = q.get_score(context, model)?;
                min_score = Some(match min_score {
                    Some(min) => min.min(score),
                    None => score,
                });
            }
        }

        min_score.ok_or_else(|| Error::protocol("no argument matches the cached docid"))
    }

    /// Geometric mean of argument scores; arguments that don't match
    /// the document contribute their default score.
    fn score_indri_and(
        &mut self,
        context: &SearchContext,
        model: &RetrievalModel,
        params: &IndriParams,
    ) -> Result<f64> {
        let docid = self.get_match()?;
        let n = self.args.len() as f64;
        let mut product = 1.0;

        for q in &mut self.args {
            let score = if q.has_match(model) && q.cached_match() == Some(docid) {
                q.get_score(context, model)?
            } else {
                q.get_default_score(context, params, docid)?
            };
            product *= score;
        }

        Ok(product.powf(1.0 / n))
    }

    // ---- OR ----

    fn score_or(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        match model {
            RetrievalModel::UnrankedBoolean | RetrievalModel::RankedBoolean => {
                let docid = self.get_match()?;
                let mut max_score: Option<f64> = None;

                for q in &mut self.args {
                    if q.has_match(model) && q.cached_match() == Some(docid) {
                        let score = q.get_score(context, model)?;
                        max_score = Some(match max_score {
                            Some(max) => max.max(score),
                            None => score,
                        });
                    }
                }

                max_score.ok_or_else(|| Error::protocol("no argument matches the cached docid"))
            }
            _ => Err(Error::model_mismatch(format!(
                "{} does not support the {} model",
                self.display_name,
                model.name()
            ))),
        }
    }

    // ---- SUM ----

    fn score_sum(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        if !matches!(model, RetrievalModel::Bm25(_)) {
            return Err(Error::model_mismatch(format!(
                "{} does not support the {} model",
                self.display_name,
                model.name()
            )));
        }

        let docid = self.get_match()?;
        let mut score = 0.0;

        for q in &mut self.args {
            if q.has_match(model) && q.cached_match() == Some(docid) {
                score += q.get_score(context, model)?;
            }
        }

        Ok(score)
    }

    // ---- WSUM / WAND ----

    fn score_wsum(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        let RetrievalModel::Indri(params) = model else {
            return Err(Error::model_mismatch(format!(
                "{} does not support the {} model",
                self.display_name,
                model.name()
            )));
        };
        let params = *params;

        let docid = self.get_match()?;
        let total: f64 = self.weights().iter().sum();
        let mut score = 0.0;

        for i in 0..self.args.len() {
            let weight = self.weight(i);
            let q = &mut self.args[i];
            let arg_score = if q.has_match(model) && q.cached_match() == Some(docid) {
                q.get_score(context, model)?
            } else {
                q.get_default_score(context, &params, docid)?
            };
            score += arg_score * (weight / total);
        }

        Ok(score)
    }

    fn score_wand(&mut self, context: &SearchContext, model: &RetrievalModel) -> Result<f64> {
        let RetrievalModel::Indri(params) = model else {
            return Err(Error::model_mismatch(format!(
                "{} does not support the {} model",
                self.display_name,
                model.name()
            )));
        };
        let params = *params;

        let docid = self.get_match()?;
        let total: f64 = self.weights().iter().sum();
        let mut product = 1.0;

        for i in 0..self.args.len() {
            let weight = self.weight(i);
            let q = &mut self.args[i];
            let arg_score = if q.has_match(model) && q.cached_match() == Some(docid) {
                q.get_score(context, model)?
            } else {
                q.get_default_score(context, &params, docid)?
            };
            product *= arg_score.powf(weight / total);
        }

        Ok(product)
    }
}
