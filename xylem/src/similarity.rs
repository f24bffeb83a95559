//! Phase 2: content similarity matching.
//!
//! Nodes left over by the hash phase are bucketed by signature. Within each
//! bucket present on both sides every pair is scored with a Jaccard index over
//! token multisets; pairs above the threshold are committed greedily, best
//! score first, across all buckets.

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::matching::{MatchContext, Matching};
use crate::node::Tree;
use crate::options::MatchOptions;
use crate::signature::NodeSignature;
use crate::text;
use crate::tracing_macros::{debug, trace};

/// Token multiset: token -> occurrence count.
pub type TokenBag = HashMap<String, usize>;

/// Turns a node into the tokens its similarity is measured on.
///
/// Implementations must be deterministic; [`jaccard`] is symmetric, so any
/// tokenizer yields a symmetric score.
pub trait Tokenizer {
    /// Tokens describing node `id` of `tree`.
    fn tokens(&self, tree: &Tree, id: NodeId, options: &MatchOptions) -> TokenBag;
}

/// Default tokenizer.
///
/// - one token per word of the node's text content: its own value plus the
///   values below it, so markup elements compare by their `#text` children
///   (words are normalized under `TextContent::Normalize`)
/// - `@name=value` per attribute
/// - `<label>` per child, so element nodes compare by child-label multiset
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTokenizer;

impl Tokenizer for ContentTokenizer {
    fn tokens(&self, tree: &Tree, id: NodeId, options: &MatchOptions) -> TokenBag {
        let node = tree.get(id);
        let mut bag = TokenBag::default();

        let content = tree.text_content(id);
        for word in text::words(&content, options.text_content) {
            *bag.entry(word.to_string()).or_default() += 1;
        }
        for (name, value) in &node.attributes {
            *bag.entry(format!("@{name}={value}")).or_default() += 1;
        }
        for child in tree.children(id) {
            *bag.entry(format!("<{}>", tree.get(child).label)).or_default() += 1;
        }

        bag
    }
}

/// Multiset Jaccard index: shared occurrences over total occurrences.
///
/// Two empty bags are identical and score 1.0.
pub fn jaccard(a: &TokenBag, b: &TokenBag) -> f64 {
    let mut shared = 0usize;
    let mut total = 0usize;

    for (token, &count_a) in a {
        let count_b = b.get(token).copied().unwrap_or(0);
        shared += count_a.min(count_b);
        total += count_a.max(count_b);
    }
    for (token, &count_b) in b {
        if !a.contains_key(token) {
            total += count_b;
        }
    }

    if total == 0 {
        1.0
    } else {
        shared as f64 / total as f64
    }
}

struct Candidate {
    a: NodeId,
    b: NodeId,
    score: f64,
}

fn unmatched_buckets(
    preorder: &[NodeId],
    is_matched: impl Fn(NodeId) -> bool,
    signature: impl Fn(NodeId) -> NodeSignature,
) -> HashMap<NodeSignature, Vec<NodeId>> {
    let mut buckets: HashMap<NodeSignature, Vec<NodeId>> = HashMap::default();
    for &id in preorder {
        if !is_matched(id) {
            buckets.entry(signature(id)).or_default().push(id);
        }
    }
    buckets
}

/// Run the similarity phase. Returns the number of pairs it added.
pub(crate) fn run(
    ctx: &MatchContext<'_>,
    matching: &mut Matching,
    tokenizer: &dyn Tokenizer,
) -> usize {
    let before = matching.len();
    let options = ctx.options;

    let buckets_a = unmatched_buckets(
        ctx.index_a.preorder(),
        |a| matching.contains_a(a),
        |a| ctx.index_a.signature(a),
    );
    let buckets_b = unmatched_buckets(
        ctx.index_b.preorder(),
        |b| matching.contains_b(b),
        |b| ctx.index_b.signature(b),
    );

    let mut candidates = Vec::new();
    for (signature, nodes_a) in &buckets_a {
        let Some(nodes_b) = buckets_b.get(signature) else {
            continue;
        };
        let bags_b: Vec<TokenBag> = nodes_b
            .iter()
            .map(|&b| tokenizer.tokens(ctx.tree_b, b, options))
            .collect();

        for &a in nodes_a {
            let bag_a = tokenizer.tokens(ctx.tree_a, a, options);
            for (&b, bag_b) in nodes_b.iter().zip(&bags_b) {
                let score = jaccard(&bag_a, bag_b);
                if score > options.similarity_threshold {
                    candidates.push(Candidate { a, b, score });
                }
            }
        }
    }
    debug!(
        buckets_a = buckets_a.len(),
        buckets_b = buckets_b.len(),
        candidates = candidates.len(),
        "similarity candidates"
    );

    // Best score first; document order breaks ties so hash map iteration
    // order never leaks into the result.
    candidates.sort_by(|x, y| {
        y.score
            .total_cmp(&x.score)
            .then_with(|| ctx.index_a.rank(x.a).cmp(&ctx.index_a.rank(y.a)))
            .then_with(|| ctx.index_b.rank(x.b).cmp(&ctx.index_b.rank(y.b)))
    });

    for candidate in candidates {
        if matching.add(candidate.a, candidate.b) {
            trace!(
                a = usize::from(candidate.a),
                b = usize::from(candidate.b),
                score = candidate.score,
                "similarity: match"
            );
        }
    }

    matching.len() - before
}
