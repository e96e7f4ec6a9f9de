pub mod core;
pub mod analysis;
pub mod index;
pub mod model;
pub mod query;
pub mod search;

/*
Structured-query search over a pre-built inverted index.

    core      Error/Result types, DocId, parameter-file configuration.
    analysis  Tokenizer + filter chain (lowercase, stopwords, stemming).
    index     PostingList, the IndexReader contract, the in-memory
              index, the gzipped sidecar caches, and SearchContext:
              the shared read-only handle + statistics cache that query
              operators borrow during evaluation.
    model     RetrievalModel: UnrankedBoolean, RankedBoolean, BM25,
              Indri, with their parameters and default operators.
    query     The operator tree. IopNode (TERM, SYN, NEAR/k, WINDOW/k)
              materializes an inverted list at initialization and walks
              it with document/location cursors. SopNode (SCORE, AND,
              OR, SUM, WSUM, WAND) iterates lazily, caching the current
              match and scoring it on demand. The parser turns the
              prefix language into a tree; the optimizer prunes it.
    search    The document-at-a-time loop per query, the bounded result
              heap with deterministic tie-breaking, and the trec_eval
              output writer.

Evaluation of one query:

    let mut q = parser.get_query(query)?.unwrap();
    q.initialize(&context, &model)?;
    while q.has_match(&model) {
        let docid = q.get_match()?;
        let score = q.get_score(&context, &model)?;
        q.advance_past(docid);
    }

The docid sequence produced by this loop is strictly increasing, and
get_match/get_score are only legal between a successful has_match and
the next advance.
*/
