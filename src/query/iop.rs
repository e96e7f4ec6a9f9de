use crate::core::error::{Error, Result};
use crate::core::types::DocId;
use crate::index::context::SearchContext;
use crate::index::posting::{Posting, PostingList};

/// Inverted-list operator variants.
#[derive(Debug, Clone, PartialEq)]
pub enum IopKind {
    Term { term: String },
    Syn,
    Near { distance: u32 },
    Window { size: u32 },
}

/// An inverted-list operator. After initialization it owns a fully
/// materialized inverted list; the document and location iterators walk
/// that list, never the argument subtrees.
///
/// The inverted list cannot be produced document-at-a-time because the
/// df and ctf statistics are needed by scoring before iteration starts.
#[derive(Debug, Clone, PartialEq)]
pub struct IopNode {
    pub kind: IopKind,
    pub field: String,
    pub display_name: String,
    pub args: Vec<IopNode>,
    inv_list: PostingList,
    doc_cursor: usize,
    loc_cursor: usize,
}

impl IopNode {
    pub fn term(term: &str, field: &str) -> Self {
        IopNode {
            kind: IopKind::Term {
                term: term.to_string(),
            },
            field: field.to_string(),
            display_name: String::new(),
            args: Vec::new(),
            inv_list: PostingList::new(field),
            doc_cursor: 0,
            loc_cursor: 0,
        }
    }

    pub fn syn() -> Self {
        Self::operator(IopKind::Syn, "#SYN")
    }

    pub fn near(distance: u32) -> Self {
        Self::operator(IopKind::Near { distance }, &format!("#NEAR/{}", distance))
    }

    pub fn window(size: u32) -> Self {
        Self::operator(IopKind::Window { size }, &format!("#WINDOW/{}", size))
    }

    fn operator(kind: IopKind, display_name: &str) -> Self {
        IopNode {
            kind,
            field: String::new(), // set when the first argument arrives
            display_name: display_name.to_string(),
            args: Vec::new(),
            inv_list: PostingList::new(""),
            doc_cursor: 0,
            loc_cursor: 0,
        }
    }

    /// Append an inverted-list argument. All arguments must be in the
    /// same field; the first argument's field propagates to this node.
    pub fn append_arg(&mut self, arg: IopNode) -> Result<()> {
        if matches!(self.kind, IopKind::Term { .. }) {
            return Err(Error::syntax("The TERM operator has no arguments."));
        }

        if self.args.is_empty() {
            self.field = arg.field.clone();
        } else if self.field != arg.field {
            return Err(Error::syntax(
                "Arguments to inverted-list operators must be in the same field.",
            ));
        }

        self.args.push(arg);
        Ok(())
    }

    /// Materialize the inverted list and reset both iterators.
    pub fn initialize(&mut self, context: &SearchContext) -> Result<()> {
        for arg in &mut self.args {
            arg.initialize(context)?;
        }

        self.evaluate(context)?;
        self.doc_cursor = 0;
        self.loc_cursor = 0;
        Ok(())
    }

    fn evaluate(&mut self, context: &SearchContext) -> Result<()> {
        match self.kind {
            IopKind::Term { .. } => self.evaluate_term(context),
            IopKind::Syn => self.evaluate_syn(),
            IopKind::Near { distance } => self.evaluate_near(distance),
            IopKind::Window { size } => self.evaluate_window(size),
        }
    }

    fn evaluate_term(&mut self, context: &SearchContext) -> Result<()> {
        let IopKind::Term { term } = &self.kind else {
            return Err(Error::protocol("evaluate_term on a non-term operator"));
        };
        self.inv_list = context.postings(&self.field, term)?;
        Ok(())
    }

    /// Union of the argument lists, merging per-document positions.
    fn evaluate_syn(&mut self) -> Result<()> {
        let mut result = PostingList::new(&self.field);

        // Each pass merges one document: the smallest docid any
        // argument is currently positioned on.
        loop {
            let min_docid = self.args.iter().filter_map(|q| q.current_docid()).min();
            let Some(min_docid) = min_docid else { break };

            // Duplicate locations across arguments (e.g. #SYN(cat cat
            // dog)) collapse in the dedup below.
            let mut positions = Vec::new();
            for q in &mut self.args {
                if q.current_docid() == Some(min_docid) {
                    positions.extend_from_slice(&q.current_posting()?.positions);
                    q.advance_past(min_docid);
                }
            }

            positions.sort_unstable();
            positions.dedup();
            result.append(min_docid, positions)?;
        }

        self.inv_list = result;
        Ok(())
    }

    /// Ordered proximity: every argument in the same document, each
    /// successive argument within `distance` of the previous one. The
    /// recorded location of a match is its rightmost position.
    fn evaluate_near(&mut self, distance: u32) -> Result<()> {
        let mut result = PostingList::new(&self.field);

        if self.args.is_empty() {
            self.inv_list = result;
            return Ok(());
        }

        while let Some(docid) = match_all(&mut self.args) {
            let mut locations: Vec<u32> = Vec::new();
            let last = self.args.len() - 1;
            let mut i = 0;

            'positions: while i < last {
                if self.args.iter().any(|q| !q.loc_has_match()) {
                    break;
                }

                let Some(loc_i) = self.args[i].current_loc() else {
                    break;
                };

                // Walk argument i+1 forward to argument i's position.
                loop {
                    match self.args[i + 1].current_loc() {
                        Some(loc) if loc < loc_i => self.args[i + 1].loc_advance(),
                        Some(_) => break,
                        None => break 'positions,
                    }
                }
                let Some(loc_next) = self.args[i + 1].current_loc() else {
                    break;
                };

                if loc_next - loc_i <= distance {
                    if i + 1 == last {
                        // A full chain matched; its rightmost position
                        // is the match location.
                        locations.push(loc_next);
                        for q in &mut self.args {
                            q.loc_advance();
                        }
                        i = 0;
                    } else {
                        i += 1;
                    }
                } else {
                    self.args[i].loc_advance();
                    i = i.saturating_sub(1);
                }
            }

            if !locations.is_empty() {
                locations.sort_unstable();
                locations.dedup();
                result.append(docid, locations)?;
            }

            // Position exhaustion anywhere finishes this document for
            // every argument.
            for q in &mut self.args {
                q.advance_past(docid);
            }
        }

        self.inv_list = result;
        Ok(())
    }

    /// Unordered proximity: one position per argument with max - min
    /// strictly less than `size`. Greedy: shrink the span by advancing
    /// whichever argument sits at the minimum position.
    fn evaluate_window(&mut self, size: u32) -> Result<()> {
        let mut result = PostingList::new(&self.field);

        if self.args.is_empty() {
            self.inv_list = result;
            return Ok(());
        }

        while let Some(docid) = match_all(&mut self.args) {
            let mut positions = Vec::new();

            loop {
                let mut min_pos = u32::MAX;
                let mut max_pos = 0u32;
                let mut min_arg = 0usize;
                let mut exhausted = false;

                for (idx, q) in self.args.iter().enumerate() {
                    match q.current_loc() {
                        None => {
                            exhausted = true;
                            break;
                        }
                        Some(pos) => {
                            if pos < min_pos {
                                min_pos = pos;
                                min_arg = idx;
                            }
                            if pos > max_pos {
                                max_pos = pos;
                            }
                        }
                    }
                }
                if exhausted {
                    break;
                }

                if max_pos - min_pos < size {
                    positions.push(max_pos);
                    for q in &mut self.args {
                        q.loc_advance();
                    }
                } else {
                    self.args[min_arg].loc_advance();
                }
            }

            if !positions.is_empty() {
                positions.sort_unstable();
                positions.dedup();
                result.append(docid, positions)?;
            }

            for q in &mut self.args {
                q.advance_past(docid);
            }
        }

        self.inv_list = result;
        Ok(())
    }

    // ---- document iterator ----

    pub fn has_match(&self) -> bool {
        self.doc_cursor < self.inv_list.len()
    }

    pub fn current_docid(&self) -> Option<DocId> {
        self.inv_list.postings.get(self.doc_cursor).map(|p| p.docid)
    }

    pub fn get_match(&self) -> Result<DocId> {
        self.current_docid()
            .ok_or_else(|| Error::protocol("no matching docid was cached"))
    }

    /// The posting the document iterator points at.
    pub fn current_posting(&self) -> Result<&Posting> {
        self.inv_list
            .postings
            .get(self.doc_cursor)
            .ok_or_else(|| Error::protocol("posting requested past the end of the inverted list"))
    }

    pub fn advance_past(&mut self, docid: DocId) {
        while self.doc_cursor < self.inv_list.len() && self.inv_list.docid(self.doc_cursor) <= docid
        {
            self.doc_cursor += 1;
        }
        self.loc_cursor = 0;
    }

    pub fn advance_to(&mut self, docid: DocId) {
        while self.doc_cursor < self.inv_list.len() && self.inv_list.docid(self.doc_cursor) < docid
        {
            self.doc_cursor += 1;
        }
        self.loc_cursor = 0;
    }

    pub fn df(&self) -> u32 {
        self.inv_list.df()
    }

    pub fn ctf(&self) -> u64 {
        self.inv_list.ctf()
    }

    pub fn inverted_list(&self) -> &PostingList {
        &self.inv_list
    }

    // ---- location iterator, valid while a document match is cached ----

    pub fn loc_has_match(&self) -> bool {
        self.inv_list
            .postings
            .get(self.doc_cursor)
            .map(|p| self.loc_cursor < p.positions.len())
            .unwrap_or(false)
    }

    pub fn current_loc(&self) -> Option<u32> {
        self.inv_list
            .postings
            .get(self.doc_cursor)
            .and_then(|p| p.positions.get(self.loc_cursor))
            .copied()
    }

    pub fn loc_advance(&mut self) {
        self.loc_cursor += 1;
    }

    pub fn loc_advance_past(&mut self, loc: u32) {
        while let Some(current) = self.current_loc() {
            if current <= loc {
                self.loc_cursor += 1;
            } else {
                break;
            }
        }
    }
}

/// Advance every argument's document iterator until all point at the
/// same docid. Returns that docid, or None once any argument exhausts.
fn match_all(args: &mut [IopNode]) -> Option<DocId> {
    loop {
        let docid_0 = args.first()?.current_docid()?;

        let mut restart = None;
        for i in 1..args.len() {
            args[i].advance_to(docid_0);
            let docid_i = args[i].current_docid()?;
            if docid_i != docid_0 {
                restart = Some(docid_i);
                break;
            }
        }

        match restart {
            None => return Some(docid_0),
            Some(docid) => args[0].advance_to(docid),
        }
    }
}
