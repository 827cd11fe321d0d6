//! Component A: the depth-first tree traversal engine (spec §4.A).
//!
//! Generic over any node exposing an ordered `children()` sequence — in
//! this crate that's [`crate::cst::Node`], but the engine itself never
//! names that type directly; it only needs [`TreeNode`].

/// A node that can be walked: exposes its ordered children.
pub trait TreeNode: Sized {
    fn children(&self) -> &[Self];
}

impl TreeNode for crate::cst::Node {
    fn children(&self) -> &[Self] {
        Node::children(self)
    }
}

use crate::cst::Node;

/// A visitor over a tree of `N`. `preorder` returns whether to descend into
/// the node's children; `postorder` fires unconditionally on the way back
/// up (even when `preorder` returned `false`, per spec §4.A).
pub trait Visitor<N> {
    /// Called on entry. `spine` is the ordered list of ancestors from the
    /// root down to (but excluding) `node`. Return `false` to skip the
    /// subtree — `postorder` still fires on `node` itself.
    fn preorder(&mut self, _node: &N, _spine: &[&N]) -> bool {
        true
    }

    fn postorder(&mut self, _node: &N, _spine: &[&N]) {}

    /// When set, the engine stops immediately: no further hooks fire and
    /// no further siblings are descended. Checked after every hook and
    /// between siblings (spec's "halt latency" property).
    fn halt(&self) -> bool {
        false
    }
}

/// Depth-first traversal of `root`, invoking `visitor`'s hooks.
pub fn traverse<N: TreeNode>(root: &N, visitor: &mut impl Visitor<N>) {
    let mut spine: Vec<&N> = Vec::new();
    walk(root, &mut spine, visitor);
}

fn walk<'a, N: TreeNode>(node: &'a N, spine: &mut Vec<&'a N>, visitor: &mut impl Visitor<N>) {
    if visitor.halt() {
        return;
    }
    let descend = visitor.preorder(node, spine);
    if visitor.halt() {
        return;
    }
    if descend {
        spine.push(node);
        for child in node.children() {
            walk(child, spine, visitor);
            if visitor.halt() {
                spine.pop();
                return;
            }
        }
        spine.pop();
    }
    if visitor.halt() {
        return;
    }
    visitor.postorder(node, spine);
}

/// Collect every node (by reference) for which `pred` holds.
///
/// Implemented as a direct recursive walk rather than routing through
/// `traverse`'s `Visitor` hooks, since those only borrow a node for the
/// duration of a single call and can't hand back references tied to the
/// root's lifetime `'a`.
pub fn filter<'a, N: TreeNode>(root: &'a N, pred: impl Fn(&N) -> bool) -> Vec<&'a N> {
    fn rec<'a, N: TreeNode>(node: &'a N, pred: &impl Fn(&N) -> bool, out: &mut Vec<&'a N>) {
        if pred(node) {
            out.push(node);
        }
        for child in node.children() {
            rec(child, pred, out);
        }
    }
    let mut out = Vec::new();
    rec(root, &pred, &mut out);
    out
}

/// First node (pre-order) for which `pred` holds.
pub fn find<'a, N: TreeNode>(root: &'a N, pred: impl Fn(&N) -> bool) -> Option<&'a N> {
    fn rec<'a, N: TreeNode>(node: &'a N, pred: &impl Fn(&N) -> bool) -> Option<&'a N> {
        if pred(node) {
            return Some(node);
        }
        for child in node.children() {
            if let Some(found) = rec(child, pred) {
                return Some(found);
            }
        }
        None
    }
    rec(root, &pred)
}

/// Count nodes for which `pred` holds.
pub fn count<N: TreeNode>(root: &N, pred: impl Fn(&N) -> bool) -> usize {
    filter(root, pred).len()
}

/// Find the nearest ancestor (from a spine, innermost first) matching `pred`.
pub fn ancestor<'a, N>(spine: &[&'a N], pred: impl Fn(&N) -> bool) -> Option<&'a N> {
    spine.iter().rev().find(|n| pred(**n)).copied()
}

/// A composite visitor holding N inner visitors, run as a single pass
/// (spec §4.A "MultiVisitor composition"). Per-visitor "skipped-at"
/// bookmarks track which inner visitor opted out of descending into the
/// current node, so its matching `postorder` call can be suppressed-free
/// (postorder still fires on the node itself per spec, only descent is
/// gated) — tracked here purely so future extensions can query it.
pub struct MultiVisitor<'v, N> {
    inner: Vec<&'v mut dyn Visitor<N>>,
    skipped_at: Vec<Option<usize>>,
    halted: bool,
}

impl<'v, N> MultiVisitor<'v, N> {
    pub fn new(inner: Vec<&'v mut dyn Visitor<N>>) -> Self {
        let len = inner.len();
        MultiVisitor { inner, skipped_at: vec![None; len], halted: false }
    }
}

impl<'v, N> Visitor<N> for MultiVisitor<'v, N> {
    fn preorder(&mut self, node: &N, spine: &[&N]) -> bool {
        let mut descend_any = false;
        for (i, v) in self.inner.iter_mut().enumerate() {
            let descend = v.preorder(node, spine);
            if !descend {
                self.skipped_at[i] = Some(self.skipped_at.len());
            }
            descend_any |= descend;
            if v.halt() {
                self.halted = true;
            }
        }
        descend_any
    }

    fn postorder(&mut self, node: &N, spine: &[&N]) {
        for v in self.inner.iter_mut() {
            v.postorder(node, spine);
            if v.halt() {
                self.halted = true;
            }
        }
    }

    fn halt(&self) -> bool {
        self.halted || self.inner.iter().any(|v| v.halt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::{NodeKind, Span};

    fn leaf(kind: NodeKind) -> Node {
        Node::leaf(kind, Span::default())
    }

    fn tree() -> Node {
        Node::new(
            NodeKind::Block,
            Span::default(),
            vec![
                leaf(NodeKind::Unknown),
                Node::new(NodeKind::Block, Span::default(), vec![leaf(NodeKind::Unknown)]),
                leaf(NodeKind::Unknown),
            ],
        )
    }

    struct Counter {
        pre: usize,
        post: usize,
    }
    impl Visitor<Node> for Counter {
        fn preorder(&mut self, _node: &Node, _spine: &[&Node]) -> bool {
            self.pre += 1;
            true
        }
        fn postorder(&mut self, _node: &Node, _spine: &[&Node]) {
            self.post += 1;
        }
    }

    #[test]
    fn visits_every_node_pre_and_post() {
        let t = tree();
        let mut c = Counter { pre: 0, post: 0 };
        traverse(&t, &mut c);
        assert_eq!(c.pre, 5);
        assert_eq!(c.post, 5);
    }

    struct Halter {
        seen: usize,
        limit: usize,
        halted: bool,
    }
    impl Visitor<Node> for Halter {
        fn preorder(&mut self, _node: &Node, _spine: &[&Node]) -> bool {
            self.seen += 1;
            if self.seen >= self.limit {
                self.halted = true;
            }
            true
        }
        fn halt(&self) -> bool {
            self.halted
        }
    }

    #[test]
    fn halt_stops_further_hooks() {
        let t = tree();
        let mut h = Halter { seen: 0, limit: 2, halted: false };
        traverse(&t, &mut h);
        assert_eq!(h.seen, 2);
    }

    #[test]
    fn spine_matches_ancestors() {
        struct SpineCheck {
            ok: bool,
        }
        impl Visitor<Node> for SpineCheck {
            fn preorder(&mut self, node: &Node, spine: &[&Node]) -> bool {
                if matches!(node.kind, NodeKind::Unknown) && spine.len() > 1 {
                    // nested leaf: its immediate parent must be a Block
                    self.ok &= matches!(spine.last().unwrap().kind, NodeKind::Block);
                }
                true
            }
        }
        let t = tree();
        let mut s = SpineCheck { ok: true };
        traverse(&t, &mut s);
        assert!(s.ok);
    }
}
