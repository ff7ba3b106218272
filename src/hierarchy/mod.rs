//! Hierarchical clustering over tree leaves.
//!
//! A CF-tree compresses `N` points into `L ≪ N` leaves. Any agglomerative
//! algorithm can then cluster the leaves and report its merges here:
//!
//! ```text
//! points ──insert──▶ CfTree ──leaves──▶ linkage over L leaves
//!                                           │ link(i, d, p)
//!                                           ▼
//!                                    HierarchyBuilder
//!                                           │ complete(leaves, N)
//!                                           ▼
//!                               PointerHierarchy over N ids
//! ```
//!
//! The builder works on dense leaf indices; `complete` expands every leaf
//! into its member ids, so the result covers every original point and can be
//! cut by distance or into `k` clusters.
//!
//! [`leaf_distance_matrix`] produces the condensed matrix most linkage
//! implementations (for example `kodama`) expect.

mod builder;
mod matrix;
mod pointer;

pub use builder::HierarchyBuilder;
pub use matrix::{condensed_index, leaf_distance_matrix, MAX_MATRIX_ITEMS};
pub use pointer::PointerHierarchy;
