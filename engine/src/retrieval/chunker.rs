//! Hierarchical chunking
//!
//! The document is cut into overlapping windows at the coarsest tier, every
//! window is cut again at the next tier, and so on. Tokens are whitespace
//! separated words. Only the finest tier (the leaves) is embedded and searched;
//! the coarser tiers exist so every leaf knows which larger passage it came from.

/// One chunk of the hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Position in the flat node list
    pub id: usize,
    /// Index into the chunk size tiers (0 = coarsest)
    pub tier: usize,
    /// Enclosing node one tier up
    pub parent: Option<usize>,
    pub text: String,
}

/// All tiers of one document, coarsest tier first
#[derive(Debug, Clone, Default)]
pub struct ChunkTree {
    nodes: Vec<Node>,
    depth: usize,
}

impl ChunkTree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes of the finest tier, in document order
    pub fn leaves(&self) -> impl Iterator<Item = &Node> {
        let leaf_tier = self.depth.saturating_sub(1);
        self.nodes.iter().filter(move |n| n.tier == leaf_tier)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Chunk `text` by each size in `tiers` (coarsest first)
///
/// `overlap` is clamped per tier so that a window always advances by more
/// than half its size.
pub fn chunk_hierarchical(text: &str, tiers: &[usize], overlap: usize) -> ChunkTree {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut tree = ChunkTree {
        nodes: Vec::new(),
        depth: tiers.len(),
    };

    if tokens.is_empty() || tiers.is_empty() {
        return tree;
    }

    // (parent id, token range) spans awaiting the next tier
    let mut spans: Vec<(Option<usize>, usize, usize)> = vec![(None, 0, tokens.len())];

    for (tier, &size) in tiers.iter().enumerate() {
        let mut next = Vec::new();

        for (parent, start, end) in spans {
            for (w_start, w_end) in windows(end - start, size, overlap) {
                let id = tree.nodes.len();
                tree.nodes.push(Node {
                    id,
                    tier,
                    parent,
                    text: tokens[start + w_start..start + w_end].join(" "),
                });
                next.push((Some(id), start + w_start, start + w_end));
            }
        }

        spans = next;
    }

    tree
}

/// Window bounds over `len` tokens
fn windows(len: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let size = size.max(1);
    let overlap = overlap.min(size.saturating_sub(1) / 2);
    let step = size - overlap;

    let mut bounds = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        bounds.push((start, end));
        if end == len {
            break;
        }
        start += step;
    }
    bounds
}
