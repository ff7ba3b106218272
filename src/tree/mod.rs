//! The clustering-feature tree.
//!
//! A height-balanced tree whose leaf entries are clustering features and
//! whose inner nodes carry the aggregate of their subtree:
//!
//! ```text
//!                 [ root: Σ ]
//!                /           \
//!        [ node: Σ ]        [ node: Σ ]
//!        /    |    \          /     \
//!     (cf)  (cf)  (cf)     (cf)    (cf)      <- leaf entries
//! ```
//!
//! ## Insertion
//!
//! A point descends to the nearest child at each level (selection metric,
//! lowest index on ties). At the bottom it either joins the nearest leaf,
//! when the absorption metric is within `threshold²`, or becomes a new leaf.
//! A node that overflows splits around its farthest pair of entries and the
//! split may cascade up to the root, which is the only place the tree grows.
//!
//! ## Rebuild
//!
//! Memory is bounded by a leaf cap. When it is exceeded the tree estimates a
//! larger threshold from the spacing of sibling leaves and re-inserts every
//! leaf as a whole feature, which merges the closest ones:
//!
//! | Heuristic | New threshold² |
//! |-----------|----------------|
//! | `Mean` | (mean of √estimate)² over finite estimates |
//! | `Median` | median estimate, stepping down past `+∞` |
//!
//! The threshold never decreases and a rebuild never increases the number
//! of leaves.

mod cftree;
mod config;
mod iter;
mod node;
mod validate;

#[cfg(feature = "parallel")]
pub use cftree::build_partitioned;
pub use cftree::{CfTree, TreeStats};
pub use config::{CfTreeConfig, MaxLeaves, ThresholdHeuristic};
pub use iter::Leaves;
pub use node::{Entry, Leaf, Node};
pub use validate::{Severity, ValidationIssue, ValidationReport};
