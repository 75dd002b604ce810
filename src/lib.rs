//! An Adaptive Radix Tree: an in-memory ordered map keyed by arbitrary byte
//! sequences.
//!
//! Internal nodes adapt their fan-out (4/16/48/256 children) to the number of
//! children actually present, and single-child chains are path-compressed, so
//! lookup cost is proportional to key length rather than key-space size.
//!
//! The tree supports point lookup, insert and delete, ordered whole-tree
//! iteration in both directions, and prefix-bounded iteration, all in
//! byte-lexicographic key order. Iterators detect structural mutation through
//! a version counter and surface it as an explicit error value.

pub mod iter;
mod mapping;
mod node;
mod prefix;
pub mod tree;
mod utils;

pub use iter::{Iter, IterError, TraverseOptions, TreeIterator};
pub use node::{NodeKind, NodeView};
pub use tree::AdaptiveRadixTree;
