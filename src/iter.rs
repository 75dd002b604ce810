use std::fmt;
use std::ops::BitOr;

use crate::node::{Node, NodeView};
use crate::tree::AdaptiveRadixTree;

/// Errors surfaced by [`TreeIterator::next`]. Both are ordinary values, never
/// panics: pulling past the end reports [`IterError::Exhausted`], pulling
/// after the tree was structurally mutated reports
/// [`IterError::ConcurrentModification`] once and exhaustion afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterError {
    Exhausted,
    ConcurrentModification,
}

impl fmt::Display for IterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IterError::Exhausted => f.write_str("there are no more nodes in the tree"),
            IterError::ConcurrentModification => {
                f.write_str("concurrent modification has been detected")
            }
        }
    }
}

impl std::error::Error for IterError {}

/// Bit-combinable traversal options: which node kinds to visit and in which
/// direction. The default visits leaves in ascending key order.
///
/// ```
/// use artree::TraverseOptions;
///
/// let opts = TraverseOptions::ALL | TraverseOptions::REVERSE;
/// assert!(opts.wants_internal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraverseOptions(u8);

impl TraverseOptions {
    /// Visit leaf nodes.
    pub const LEAVES: TraverseOptions = TraverseOptions(0b001);
    /// Visit internal nodes.
    pub const INTERNAL: TraverseOptions = TraverseOptions(0b010);
    /// Visit every node.
    pub const ALL: TraverseOptions = TraverseOptions(0b011);
    /// Iterate in descending key order.
    pub const REVERSE: TraverseOptions = TraverseOptions(0b100);

    #[inline]
    pub fn wants_leaves(self) -> bool {
        self.0 & Self::LEAVES.0 != 0
    }

    #[inline]
    pub fn wants_internal(self) -> bool {
        self.0 & Self::INTERNAL.0 != 0
    }

    #[inline]
    pub fn is_reverse(self) -> bool {
        self.0 & Self::REVERSE.0 != 0
    }

    /// An option set with no filter bit visits leaves.
    pub(crate) fn normalized(self) -> Self {
        if self.0 & Self::ALL.0 == 0 {
            self | Self::LEAVES
        } else {
            self
        }
    }
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self::LEAVES
    }
}

impl BitOr for TraverseOptions {
    type Output = TraverseOptions;

    fn bitor(self, rhs: Self) -> Self {
        TraverseOptions(self.0 | rhs.0)
    }
}

/// Edge taken from an internal node to one of its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector {
    /// The reserved slot for the key ending at the node.
    Terminal,
    Byte(u8),
}

/// Position of a per-node child cursor.
#[derive(Debug, Clone, Copy)]
enum ChildCursor {
    Start,
    AtTerminal,
    At(u8),
    Done,
}

/// One stack entry of the walk: the edge that led here from the parent level
/// (`None` for the root) and the cursor over this node's own children.
#[derive(Debug)]
struct Frame {
    edge: Option<Selector>,
    cursor: ChildCursor,
}

/// A stateful preorder cursor over the tree.
///
/// The iterator holds no borrow of the tree; each pull revalidates against the
/// tree it is handed. It captures the tree's version counter at creation, and
/// a pull after any structural mutation reports
/// [`IterError::ConcurrentModification`] exactly once, then exhaustion. Pass
/// the same tree the iterator was created from; the version check guards this
/// on a best-effort basis only.
///
/// `has_next` is non-advancing and idempotent: the next matching node is
/// located eagerly (one-element look-ahead) so callers can probe for more
/// elements without consuming them.
pub struct TreeIterator {
    version: u64,
    options: TraverseOptions,
    frames: Vec<Frame>,
    primed: bool,
    buffered: Option<Vec<Selector>>,
}

impl TreeIterator {
    pub(crate) fn new<V>(tree: &AdaptiveRadixTree<V>, options: TraverseOptions) -> Self {
        let mut it = Self {
            version: tree.version(),
            options: options.normalized(),
            frames: Vec::new(),
            primed: false,
            buffered: None,
        };
        it.buffered = it.peek(tree);
        it
    }

    /// True if a pull would yield a node (not an error).
    pub fn has_next(&self) -> bool {
        self.buffered.is_some()
    }

    /// The next node in the traversal, or the error that ends it.
    pub fn next<'a, V>(
        &mut self,
        tree: &'a AdaptiveRadixTree<V>,
    ) -> Result<NodeView<'a, V>, IterError> {
        let Some(path) = self.buffered.take() else {
            return Err(IterError::Exhausted);
        };
        if self.version != tree.version() {
            self.invalidate();
            return Err(IterError::ConcurrentModification);
        }
        let Some(node) = resolve(tree, &path) else {
            // The version matched, so the buffered path must resolve; treat a
            // failure as exhaustion rather than panicking.
            self.invalidate();
            return Err(IterError::Exhausted);
        };
        self.buffered = self.peek(tree);
        Ok(NodeView::new(node))
    }

    fn invalidate(&mut self) {
        self.frames.clear();
        self.buffered = None;
    }

    /// Advance the raw walk until a node passes the kind filter, returning its
    /// path. The walk state lives in `frames`; the version is already known to
    /// match whenever this is called.
    fn peek<V>(&mut self, tree: &AdaptiveRadixTree<V>) -> Option<Vec<Selector>> {
        loop {
            let path = self.raw_next(tree)?;
            let node = resolve(tree, &path)?;
            let matches = match node {
                Node::Leaf(_) => self.options.wants_leaves(),
                Node::Inner(_) => self.options.wants_internal(),
            };
            if matches {
                return Some(path);
            }
        }
    }

    /// One preorder step: yields the path of the next node, parent before
    /// children, children in ascending (or descending) key-byte order with the
    /// terminal slot as the smallest key.
    fn raw_next<V>(&mut self, tree: &AdaptiveRadixTree<V>) -> Option<Vec<Selector>> {
        if !self.primed {
            self.primed = true;
            tree.root_node()?;
            self.frames.push(Frame {
                edge: None,
                cursor: ChildCursor::Start,
            });
            return Some(Vec::new());
        }

        // Re-resolve the node chain for the current stack. Only the spine of
        // the walk is materialized, never the whole tree.
        let mut chain: Vec<&Node<V>> = Vec::with_capacity(self.frames.len());
        if !self.frames.is_empty() {
            let mut node = tree.root_node()?;
            chain.push(node);
            for frame in &self.frames[1..] {
                let sel = frame.edge?;
                node = child_by_selector(node, sel)?;
                chain.push(node);
            }
        }

        let reverse = self.options.is_reverse();
        loop {
            let frame = self.frames.last_mut()?;
            let node = *chain.last()?;
            match step(node, &mut frame.cursor, reverse) {
                Some(sel) => {
                    self.frames.push(Frame {
                        edge: Some(sel),
                        cursor: ChildCursor::Start,
                    });
                    let path = self
                        .frames
                        .iter()
                        .filter_map(|frame| frame.edge)
                        .collect();
                    return Some(path);
                }
                None => {
                    self.frames.pop();
                    chain.pop();
                }
            }
        }
    }
}

fn child_by_selector<'a, V>(node: &'a Node<V>, sel: Selector) -> Option<&'a Node<V>> {
    let Node::Inner(inner) = node else {
        return None;
    };
    match sel {
        Selector::Terminal => inner.terminal.as_ref(),
        Selector::Byte(byte) => inner.children.seek_child(byte),
    }
}

fn resolve<'a, V>(tree: &'a AdaptiveRadixTree<V>, path: &[Selector]) -> Option<&'a Node<V>> {
    let mut node = tree.root_node()?;
    for &sel in path {
        node = child_by_selector(node, sel)?;
    }
    Some(node)
}

/// Advance a child cursor one position, returning the selector of the child it
/// now rests on. Ascending order yields the terminal slot first; descending
/// order yields it last.
fn step<V>(node: &Node<V>, cursor: &mut ChildCursor, reverse: bool) -> Option<Selector> {
    let Node::Inner(inner) = node else {
        *cursor = ChildCursor::Done;
        return None;
    };

    if !reverse {
        let from = match *cursor {
            ChildCursor::Start => {
                if inner.terminal.is_some() {
                    *cursor = ChildCursor::AtTerminal;
                    return Some(Selector::Terminal);
                }
                None
            }
            ChildCursor::AtTerminal => None,
            ChildCursor::At(byte) => Some(byte),
            ChildCursor::Done => return None,
        };
        match inner.children.seek_next(from) {
            Some((byte, _)) => {
                *cursor = ChildCursor::At(byte);
                Some(Selector::Byte(byte))
            }
            None => {
                *cursor = ChildCursor::Done;
                None
            }
        }
    } else {
        let before = match *cursor {
            ChildCursor::Start => None,
            ChildCursor::At(byte) => Some(byte),
            ChildCursor::AtTerminal | ChildCursor::Done => {
                *cursor = ChildCursor::Done;
                return None;
            }
        };
        match inner.children.seek_prev(before) {
            Some((byte, _)) => {
                *cursor = ChildCursor::At(byte);
                Some(Selector::Byte(byte))
            }
            None => {
                if inner.terminal.is_some() {
                    *cursor = ChildCursor::AtTerminal;
                    Some(Selector::Terminal)
                } else {
                    *cursor = ChildCursor::Done;
                    None
                }
            }
        }
    }
}

/// Borrowing iterator over `(key, value)` pairs in ascending key order.
/// Because it holds the tree borrow for its lifetime, the tree cannot change
/// underneath it.
pub struct Iter<'a, V> {
    tree: &'a AdaptiveRadixTree<V>,
    inner: TreeIterator,
}

impl<'a, V> Iter<'a, V> {
    pub(crate) fn new(tree: &'a AdaptiveRadixTree<V>) -> Self {
        Self {
            tree,
            inner: TreeIterator::new(tree, TraverseOptions::LEAVES),
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let view = self.inner.next(self.tree).ok()?;
        Some((view.key()?, view.value()?))
    }
}
