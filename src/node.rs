use std::fmt;

use crate::mapping::direct_mapping::DirectMapping;
use crate::mapping::indexed_mapping::IndexedMapping;
use crate::mapping::sorted_keyed_mapping::SortedKeyedMapping;
use crate::mapping::NodeMapping;
use crate::prefix::{Prefix, MAX_PREFIX_LEN};

// Occupancy bounds per capacity class, counting byte-keyed children only.
// A Node4 additionally counts its terminal slot towards the lower bound.
pub(crate) const NODE_4_MIN: usize = 2;
pub(crate) const NODE_4_MAX: usize = 4;
pub(crate) const NODE_16_MIN: usize = NODE_4_MAX + 1;
pub(crate) const NODE_16_MAX: usize = 16;
pub(crate) const NODE_48_MIN: usize = NODE_16_MAX + 1;
pub(crate) const NODE_48_MAX: usize = 48;
pub(crate) const NODE_256_MIN: usize = NODE_48_MAX + 1;

/// The capacity class of a node, as reported to traversal callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Node4,
    Node16,
    Node48,
    Node256,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Leaf => "Leaf",
            NodeKind::Node4 => "Node4",
            NodeKind::Node16 => "Node16",
            NodeKind::Node48 => "Node48",
            NodeKind::Node256 => "Node256",
        };
        f.write_str(name)
    }
}

/// Terminal node of the trie: owns a cloned copy of its full key.
pub(crate) struct Leaf<V> {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: V,
}

impl<V> Leaf<V> {
    pub(crate) fn new(key: &[u8], value: V) -> Self {
        Self {
            key: Box::from(key),
            value,
        }
    }

    #[inline]
    pub(crate) fn matches(&self, key: &[u8]) -> bool {
        self.key.len() == key.len() && *self.key == *key
    }

    #[inline]
    pub(crate) fn prefix_matches(&self, prefix: &[u8]) -> bool {
        self.key.starts_with(prefix)
    }
}

pub(crate) enum Node<V> {
    Leaf(Leaf<V>),
    Inner(Box<Inner<V>>),
}

/// An internal node: compressed path prefix, the reserved terminal slot for a
/// child whose key ends exactly at this node, and the byte-keyed children.
pub(crate) struct Inner<V> {
    pub(crate) prefix: Prefix,
    pub(crate) terminal: Option<Node<V>>,
    pub(crate) children: Children<V>,
}

pub(crate) enum Children<V> {
    Node4(SortedKeyedMapping<Node<V>, NODE_4_MAX>),
    Node16(SortedKeyedMapping<Node<V>, NODE_16_MAX>),
    Node48(IndexedMapping<Node<V>, NODE_48_MAX>),
    Node256(DirectMapping<Node<V>>),
}

impl<V> Node<V> {
    #[inline]
    pub(crate) fn new_leaf(key: &[u8], value: V) -> Self {
        Node::Leaf(Leaf::new(key, value))
    }

    #[inline]
    pub(crate) fn new_inner(prefix: Prefix) -> Self {
        Node::Inner(Box::new(Inner::new(prefix)))
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Node::Leaf(_) => NodeKind::Leaf,
            Node::Inner(inner) => match inner.children {
                Children::Node4(_) => NodeKind::Node4,
                Children::Node16(_) => NodeKind::Node16,
                Children::Node48(_) => NodeKind::Node48,
                Children::Node256(_) => NodeKind::Node256,
            },
        }
    }

    pub(crate) fn minimum_leaf(&self) -> Option<&Leaf<V>> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Inner(inner) => inner.minimum_leaf(),
        }
    }

    pub(crate) fn maximum_leaf(&self) -> Option<&Leaf<V>> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Inner(inner) => inner.maximum_leaf(),
        }
    }

    /// Demote an underfull inner node to the previous capacity class. For a
    /// Node4 this collapses the node into its lone remaining child, extending
    /// the child's prefix with this node's prefix and the selecting key byte.
    pub(crate) fn shrink(&mut self) {
        let Node::Inner(inner) = &mut *self else {
            return;
        };
        if matches!(inner.children, Children::Node4(_)) {
            let Some((selector, survivor)) = inner.take_lone_child() else {
                return;
            };
            let survivor = match (selector, survivor) {
                (Some(byte), Node::Inner(mut child)) => {
                    child.prefix = inner.prefix.extended(byte, &child.prefix);
                    Node::Inner(child)
                }
                // A surviving leaf owns its full key, nothing to patch up.
                (_, node) => node,
            };
            *self = survivor;
            return;
        }
        match &mut inner.children {
            Children::Node16(m) => {
                inner.children = Children::Node4(SortedKeyedMapping::from_resized(m));
            }
            Children::Node48(m) => {
                inner.children = Children::Node16(SortedKeyedMapping::from_indexed(m));
            }
            Children::Node256(m) => {
                inner.children = Children::Node48(IndexedMapping::from_direct(m));
            }
            Children::Node4(_) => {}
        }
    }
}

impl<V> Inner<V> {
    pub(crate) fn new(prefix: Prefix) -> Self {
        Self {
            prefix,
            terminal: None,
            children: Children::Node4(SortedKeyedMapping::new()),
        }
    }

    /// Child lookup; `None` selects the terminal slot.
    #[inline]
    pub(crate) fn seek_child(&self, selector: Option<u8>) -> Option<&Node<V>> {
        match selector {
            None => self.terminal.as_ref(),
            Some(byte) => self.children.seek_child(byte),
        }
    }

    #[inline]
    pub(crate) fn seek_child_mut(&mut self, selector: Option<u8>) -> Option<&mut Node<V>> {
        match selector {
            None => self.terminal.as_mut(),
            Some(byte) => self.children.seek_child_mut(byte),
        }
    }

    /// Place a child under the given selector. Byte-keyed inserts grow the
    /// node to the next capacity class when it is full; the terminal slot is
    /// reserved and never competes for capacity.
    pub(crate) fn set_child(&mut self, selector: Option<u8>, child: Node<V>) {
        match selector {
            None => self.terminal = Some(child),
            Some(byte) => {
                if !self.children.has_capacity() {
                    self.grow();
                }
                self.children.add_child(byte, child);
            }
        }
    }

    pub(crate) fn take_child(&mut self, selector: Option<u8>) -> Option<Node<V>> {
        match selector {
            None => self.terminal.take(),
            Some(byte) => self.children.delete_child(byte),
        }
    }

    /// Promote to the next capacity class; prefix and terminal slot carry
    /// over untouched.
    fn grow(&mut self) {
        match &mut self.children {
            Children::Node4(m) => {
                self.children = Children::Node16(SortedKeyedMapping::from_resized(m));
            }
            Children::Node16(m) => {
                self.children = Children::Node48(IndexedMapping::from_sorted(m));
            }
            Children::Node48(m) => {
                self.children = Children::Node256(DirectMapping::from_indexed(m));
            }
            // A Node256 has a slot for every possible key byte.
            Children::Node256(_) => {}
        }
    }

    pub(crate) fn is_underfull(&self) -> bool {
        let keyed = self.children.num_children();
        match self.children {
            Children::Node4(_) => keyed + usize::from(self.terminal.is_some()) < NODE_4_MIN,
            Children::Node16(_) => keyed < NODE_16_MIN,
            Children::Node48(_) => keyed < NODE_48_MIN,
            Children::Node256(_) => keyed < NODE_256_MIN,
        }
    }

    /// Remove and return the last remaining child of a Node4, along with the
    /// key byte that selected it (`None` for the terminal slot).
    fn take_lone_child(&mut self) -> Option<(Option<u8>, Node<V>)> {
        if let Children::Node4(m) = &mut self.children {
            if m.num_children() >= 1 {
                let (byte, child) = m.take_first_child();
                return Some((Some(byte), child));
            }
        }
        self.terminal.take().map(|child| (None, child))
    }

    /// The terminal slot sorts before every byte-keyed child.
    pub(crate) fn minimum_leaf(&self) -> Option<&Leaf<V>> {
        if let Some(t) = &self.terminal {
            return t.minimum_leaf();
        }
        self.children.min_child()?.minimum_leaf()
    }

    pub(crate) fn maximum_leaf(&self) -> Option<&Leaf<V>> {
        if let Some(child) = self.children.max_child() {
            return child.maximum_leaf();
        }
        self.terminal.as_ref()?.maximum_leaf()
    }

    /// First index where `key[offset..]` diverges from this node's logical
    /// prefix. Starts with the stored bytes; once those are exhausted the
    /// comparison continues against the minimum leaf's key, which shares the
    /// node's full prefix.
    pub(crate) fn mismatch_deep(&self, key: &[u8], offset: usize) -> usize {
        let mut idx = self.prefix.mismatch(key, offset);
        if idx < MAX_PREFIX_LEN {
            return idx;
        }
        let Some(leaf) = self.minimum_leaf() else {
            return idx;
        };
        let limit = leaf.key.len().min(key.len()).saturating_sub(offset);
        while idx < limit && leaf.key[offset + idx] == key[offset + idx] {
            idx += 1;
        }
        idx
    }
}

impl<V> Children<V> {
    #[inline]
    pub(crate) fn seek_child(&self, key: u8) -> Option<&Node<V>> {
        match self {
            Children::Node4(m) => m.seek_child(key),
            Children::Node16(m) => m.seek_child(key),
            Children::Node48(m) => m.seek_child(key),
            Children::Node256(m) => m.seek_child(key),
        }
    }

    #[inline]
    pub(crate) fn seek_child_mut(&mut self, key: u8) -> Option<&mut Node<V>> {
        match self {
            Children::Node4(m) => m.seek_child_mut(key),
            Children::Node16(m) => m.seek_child_mut(key),
            Children::Node48(m) => m.seek_child_mut(key),
            Children::Node256(m) => m.seek_child_mut(key),
        }
    }

    fn add_child(&mut self, key: u8, child: Node<V>) {
        match self {
            Children::Node4(m) => m.add_child(key, child),
            Children::Node16(m) => m.add_child(key, child),
            Children::Node48(m) => m.add_child(key, child),
            Children::Node256(m) => m.add_child(key, child),
        }
    }

    fn delete_child(&mut self, key: u8) -> Option<Node<V>> {
        match self {
            Children::Node4(m) => m.delete_child(key),
            Children::Node16(m) => m.delete_child(key),
            Children::Node48(m) => m.delete_child(key),
            Children::Node256(m) => m.delete_child(key),
        }
    }

    #[inline]
    pub(crate) fn num_children(&self) -> usize {
        match self {
            Children::Node4(m) => m.num_children(),
            Children::Node16(m) => m.num_children(),
            Children::Node48(m) => m.num_children(),
            Children::Node256(m) => m.num_children(),
        }
    }

    fn has_capacity(&self) -> bool {
        match self {
            Children::Node4(m) => m.num_children() < m.width(),
            Children::Node16(m) => m.num_children() < m.width(),
            Children::Node48(m) => m.num_children() < m.width(),
            Children::Node256(_) => true,
        }
    }

    fn min_child(&self) -> Option<&Node<V>> {
        match self {
            Children::Node4(m) => m.first_child(),
            Children::Node16(m) => m.first_child(),
            Children::Node48(m) => m.first_child(),
            Children::Node256(m) => m.first_child(),
        }
    }

    fn max_child(&self) -> Option<&Node<V>> {
        match self {
            Children::Node4(m) => m.last_child(),
            Children::Node16(m) => m.last_child(),
            Children::Node48(m) => m.last_child(),
            Children::Node256(m) => m.last_child(),
        }
    }

    /// Smallest (key, child) with key byte strictly greater than `after`.
    pub(crate) fn seek_next(&self, after: Option<u8>) -> Option<(u8, &Node<V>)> {
        match self {
            Children::Node4(m) => m.seek_next(after),
            Children::Node16(m) => m.seek_next(after),
            Children::Node48(m) => m.seek_next(after),
            Children::Node256(m) => m.seek_next(after),
        }
    }

    /// Largest (key, child) with key byte strictly smaller than `before`.
    pub(crate) fn seek_prev(&self, before: Option<u8>) -> Option<(u8, &Node<V>)> {
        match self {
            Children::Node4(m) => m.seek_prev(before),
            Children::Node16(m) => m.seek_prev(before),
            Children::Node48(m) => m.seek_prev(before),
            Children::Node256(m) => m.seek_prev(before),
        }
    }
}

/// Read-only projection of a visited node, handed to traversal callbacks and
/// returned by iterators. `key` and `value` are populated for leaves only.
pub struct NodeView<'a, V> {
    node: &'a Node<V>,
}

impl<V> fmt::Debug for NodeView<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeView")
            .field("kind", &self.kind())
            .field("key", &self.key())
            .finish()
    }
}

impl<'a, V> NodeView<'a, V> {
    pub(crate) fn new(node: &'a Node<V>) -> Self {
        Self { node }
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    pub fn key(&self) -> Option<&'a [u8]> {
        match self.node {
            Node::Leaf(leaf) => Some(&leaf.key),
            Node::Inner(_) => None,
        }
    }

    pub fn value(&self) -> Option<&'a V> {
        match self.node {
            Node::Leaf(leaf) => Some(&leaf.value),
            Node::Inner(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::node::{Inner, Node, NodeKind};
    use crate::prefix::Prefix;

    fn leaf(key: &[u8], value: i32) -> Node<i32> {
        Node::new_leaf(key, value)
    }

    fn value_of(node: &Node<i32>) -> i32 {
        match node {
            Node::Leaf(l) => l.value,
            Node::Inner(_) => panic!("expected a leaf"),
        }
    }

    #[test]
    fn test_add_seek_delete_children() {
        let mut n = Inner::new(Prefix::empty());
        n.set_child(Some(5), leaf(b"e", 1));
        n.set_child(Some(4), leaf(b"d", 2));
        n.set_child(Some(3), leaf(b"c", 3));
        n.set_child(Some(2), leaf(b"b", 4));

        assert_eq!(value_of(n.seek_child(Some(5)).unwrap()), 1);
        assert_eq!(value_of(n.seek_child(Some(2)).unwrap()), 4);
        assert!(n.seek_child(Some(9)).is_none());

        assert!(n.take_child(Some(5)).is_some());
        assert!(n.seek_child(Some(5)).is_none());
        assert_eq!(value_of(n.seek_child(Some(4)).unwrap()), 2);
    }

    #[test]
    fn test_terminal_slot_is_reserved() {
        let mut n = Inner::new(Prefix::empty());
        for byte in 0..4u8 {
            n.set_child(Some(byte), leaf(&[byte], byte as i32));
        }
        // Full byte-keyed capacity; the terminal slot still accepts a child
        // without forcing growth.
        n.set_child(None, leaf(b"", 99));
        assert_eq!(n.children.num_children(), 4);
        assert!(matches!(
            Node::Inner(Box::new(n)).kind(),
            NodeKind::Node4
        ));
    }

    #[test]
    fn test_grow_transitions() {
        let mut node = Node::new_inner(Prefix::empty());
        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        for byte in 0..4u8 {
            inner.set_child(Some(byte), leaf(&[byte], byte as i32));
        }
        assert_eq!(node.kind(), NodeKind::Node4);

        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        inner.set_child(Some(4), leaf(&[4], 4));
        assert_eq!(node.kind(), NodeKind::Node16);

        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        for byte in 5..16u8 {
            inner.set_child(Some(byte), leaf(&[byte], byte as i32));
        }
        assert_eq!(node.kind(), NodeKind::Node16);
        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        inner.set_child(Some(16), leaf(&[16], 16));
        assert_eq!(node.kind(), NodeKind::Node48);

        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        for byte in 17..48u8 {
            inner.set_child(Some(byte), leaf(&[byte], byte as i32));
        }
        assert_eq!(node.kind(), NodeKind::Node48);
        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        inner.set_child(Some(48), leaf(&[48], 48));
        assert_eq!(node.kind(), NodeKind::Node256);

        // Every child still reachable after the reshapes.
        let Node::Inner(inner) = &node else {
            unreachable!()
        };
        for byte in 0..=48u8 {
            assert_eq!(value_of(inner.seek_child(Some(byte)).unwrap()), byte as i32);
        }
    }

    #[test]
    fn test_shrink_transitions() {
        let mut node = Node::new_inner(Prefix::empty());
        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        for byte in 0..49u8 {
            inner.set_child(Some(byte), leaf(&[byte], byte as i32));
        }
        assert_eq!(node.kind(), NodeKind::Node256);

        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        inner.take_child(Some(48));
        assert!(inner.is_underfull());
        node.shrink();
        assert_eq!(node.kind(), NodeKind::Node48);

        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        for byte in 16..48u8 {
            inner.take_child(Some(byte));
        }
        assert!(inner.is_underfull());
        node.shrink();
        assert_eq!(node.kind(), NodeKind::Node16);

        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        for byte in 4..16u8 {
            inner.take_child(Some(byte));
        }
        assert!(inner.is_underfull());
        node.shrink();
        assert_eq!(node.kind(), NodeKind::Node4);

        let Node::Inner(inner) = &node else {
            unreachable!()
        };
        for byte in 0..4u8 {
            assert_eq!(value_of(inner.seek_child(Some(byte)).unwrap()), byte as i32);
        }
    }

    #[test]
    fn test_collapse_into_leaf() {
        let mut node = Node::new_inner(Prefix::new(b"ap", 2));
        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        inner.set_child(Some(b'i'), leaf(b"api", 1));
        inner.take_child(Some(b'i'));
        node.shrink();
        // Nothing left to collapse into; the node is left as-is.
        assert_eq!(node.kind(), NodeKind::Node4);

        let mut node = Node::new_inner(Prefix::new(b"ap", 2));
        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        inner.set_child(Some(b'i'), leaf(b"api", 1));
        node.shrink();
        assert_eq!(node.kind(), NodeKind::Leaf);
        assert_eq!(value_of(&node), 1);
    }

    #[test]
    fn test_collapse_merges_prefixes() {
        // Parent prefix "ab", selector 'X', child prefix "cd".
        let mut child = Inner::new(Prefix::new(b"cd", 2));
        child.set_child(Some(b'1'), leaf(b"abXcd1", 1));
        child.set_child(Some(b'2'), leaf(b"abXcd2", 2));

        let mut node = Node::new_inner(Prefix::new(b"ab", 2));
        let Node::Inner(inner) = &mut node else {
            unreachable!()
        };
        inner.set_child(Some(b'X'), Node::Inner(Box::new(child)));
        node.shrink();

        let Node::Inner(merged) = &node else {
            panic!("expected an inner node")
        };
        assert_eq!(merged.prefix.len(), 5);
        assert_eq!(merged.prefix.stored(), b"abXcd");
        assert_eq!(
            merged.minimum_leaf().map(|l| l.key.as_ref()),
            Some(b"abXcd1".as_ref())
        );
    }

    #[test]
    fn test_minimum_maximum_with_terminal() {
        let mut n = Inner::new(Prefix::new(b"ap", 2));
        n.set_child(Some(b'x'), leaf(b"apx", 1));
        n.set_child(Some(b'c'), leaf(b"apc", 2));
        assert_eq!(n.minimum_leaf().map(|l| l.value), Some(2));
        assert_eq!(n.maximum_leaf().map(|l| l.value), Some(1));

        // The terminal slot ("ap" itself) becomes the minimum.
        n.set_child(None, leaf(b"ap", 3));
        assert_eq!(n.minimum_leaf().map(|l| l.value), Some(3));
        assert_eq!(n.maximum_leaf().map(|l| l.value), Some(1));
    }

    #[test]
    fn test_mismatch_deep_past_storage_cap() {
        let long = b"abcdefghijklmn"; // 14 bytes, 10 stored
        let mut n = Inner::new(Prefix::new(long, long.len()));
        n.set_child(None, leaf(long, 7));

        assert_eq!(n.mismatch_deep(b"abcdefghijklmn", 0), 14);
        assert_eq!(n.mismatch_deep(b"abcdefghijklmX", 0), 13);
        // Divergence within the stored bytes never consults the leaf.
        assert_eq!(n.mismatch_deep(b"abcdefgXijklmn", 0), 7);
        // Shorter query: comparison stops at its end.
        assert_eq!(n.mismatch_deep(b"abcdefghijk", 0), 11);
    }
}
