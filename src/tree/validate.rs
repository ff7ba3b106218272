//! Structural validation of a CF-tree.
//!
//! Checks the invariants the insertion and rebuild paths maintain:
//! - every node holds between 1 and `capacity` children;
//! - each node's aggregate equals the merge of its children's features
//!   (up to floating point tolerance);
//! - all leaf entries sit at the same depth;
//! - the leaf counter matches the number of reachable leaves;
//! - member ids agree with leaf weights when ids are tracked.
//!
//! ```rust
//! use cftree::{CfTree, CfTreeConfig, SphericalModel};
//!
//! let mut tree = CfTree::new(SphericalModel, &CfTreeConfig::new().with_branching_factor(3)).unwrap();
//! for i in 0..20 {
//!     tree.insert(&[i as f64]).unwrap();
//! }
//! let report = tree.health_check();
//! assert!(report.is_healthy(), "{report}");
//! ```

use std::collections::HashMap;
use std::fmt;

use super::cftree::CfTree;
use super::node::{Entry, Node};
use crate::feature::{CfModel, ClusteringFeature};

/// Relative tolerance for aggregate comparisons.
const TOLERANCE: f64 = 1e-6;

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Something unusual but not necessarily wrong.
    Warning,
    /// A broken invariant.
    Error,
    /// The tree cannot be used safely.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A single validation issue found during a health check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// Child-index path from the root to the offending node, if any.
    pub path: Option<Vec<usize>>,
}

impl ValidationIssue {
    /// Create a new validation issue.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            path: None,
        }
    }

    /// Attach the location of the offending node.
    pub fn at(mut self, path: &[usize]) -> Self {
        self.path = Some(path.to_vec());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " (at {path:?})")?;
        }
        Ok(())
    }
}

/// Report from a health check.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// All issues found.
    pub issues: Vec<ValidationIssue>,
    /// Number of nodes visited.
    pub node_count: usize,
    /// Number of leaf entries reached.
    pub leaf_count: usize,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Add a warning-level issue.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Warning, message));
    }

    /// Add an error-level issue.
    pub fn error(&mut self, message: impl Into<String>) {
        self.add(ValidationIssue::new(Severity::Error, message));
    }

    /// Check if the report contains no errors or critical issues.
    pub fn is_healthy(&self) -> bool {
        !self.issues.iter().any(|i| i.severity >= Severity::Error)
    }

    /// Check if there are any issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Count issues by severity.
    pub fn counts(&self) -> HashMap<Severity, usize> {
        let mut counts = HashMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_default() += 1;
        }
        counts
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return write!(
                f,
                "Validation passed: {} nodes, {} leaves",
                self.node_count, self.leaf_count
            );
        }

        let counts = self.counts();
        let parts: Vec<String> = [
            (Severity::Critical, "critical"),
            (Severity::Error, "errors"),
            (Severity::Warning, "warnings"),
        ]
        .iter()
        .filter_map(|(sev, name)| counts.get(sev).map(|c| format!("{c} {name}")))
        .collect();
        writeln!(f, "Validation report: {}", parts.join(", "))?;

        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= TOLERANCE * (1.0 + a.abs().max(b.abs()))
}

struct Checker<'r, F> {
    report: &'r mut ValidationReport,
    dim: usize,
    store_ids: bool,
    leaf_depth: Option<usize>,
    path: Vec<usize>,
    _feature: core::marker::PhantomData<F>,
}

impl<F: ClusteringFeature> Checker<'_, F> {
    fn check_feature(&mut self, cf: &F, what: &str) {
        if cf.dim() != self.dim {
            self.report.add(
                ValidationIssue::new(
                    Severity::Critical,
                    format!("{what} has dimension {}, expected {}", cf.dim(), self.dim),
                )
                .at(&self.path),
            );
        }
        if cf.is_empty() {
            self.report
                .add(ValidationIssue::new(Severity::Error, format!("{what} is empty")).at(&self.path));
        }
    }

    fn visit(&mut self, node: &Node<F>, depth: usize) {
        self.report.node_count += 1;
        self.check_feature(node.cf(), "node aggregate");
        if node.is_empty() {
            self.report
                .add(ValidationIssue::new(Severity::Error, "node has no children").at(&self.path));
            return;
        }
        if node.len() > node.capacity() {
            self.report.add(
                ValidationIssue::new(
                    Severity::Error,
                    format!("node holds {} children, capacity {}", node.len(), node.capacity()),
                )
                .at(&self.path),
            );
        }

        let mut expected = node.cf().clone();
        expected.reset();
        for (i, child) in node.children().iter().enumerate() {
            expected.merge(child.cf());
            self.path.push(i);
            match child {
                Entry::Leaf(leaf) => {
                    self.report.leaf_count += 1;
                    self.check_feature(leaf.cf(), "leaf");
                    match self.leaf_depth {
                        None => self.leaf_depth = Some(depth),
                        Some(d) if d != depth => self.report.add(
                            ValidationIssue::new(
                                Severity::Error,
                                format!("leaf at depth {depth}, expected {d}"),
                            )
                            .at(&self.path),
                        ),
                        Some(_) => {}
                    }
                    if self.store_ids && leaf.ids().len() != leaf.weight() {
                        self.report.add(
                            ValidationIssue::new(
                                Severity::Error,
                                format!(
                                    "leaf lists {} ids for weight {}",
                                    leaf.ids().len(),
                                    leaf.weight()
                                ),
                            )
                            .at(&self.path),
                        );
                    }
                }
                Entry::Inner(inner) => self.visit(inner, depth + 1),
            }
            self.path.pop();
        }

        let cf = node.cf();
        let consistent = cf.weight() == expected.weight()
            && (0..cf.dim()).all(|i| close(cf.centroid(i), expected.centroid(i)))
            && close(cf.ssd(), expected.ssd());
        if !consistent {
            self.report.add(
                ValidationIssue::new(
                    Severity::Error,
                    format!(
                        "aggregate (weight {}, ssd {}) differs from children (weight {}, ssd {})",
                        cf.weight(),
                        cf.ssd(),
                        expected.weight(),
                        expected.ssd()
                    ),
                )
                .at(&self.path),
            );
        }
    }
}

impl<M: CfModel> CfTree<M> {
    /// Walk the whole tree and report broken invariants.
    pub fn health_check(&self) -> ValidationReport {
        let mut report = ValidationReport::new();
        let Some(root) = self.root() else {
            if self.leaf_count() != 0 {
                report.error(format!("empty tree reports {} leaves", self.leaf_count()));
            }
            return report;
        };

        let mut checker = Checker {
            report: &mut report,
            dim: root.cf().dim(),
            store_ids: self.stores_ids(),
            leaf_depth: None,
            path: Vec::new(),
            _feature: core::marker::PhantomData,
        };
        checker.visit(root, 0);

        if report.leaf_count != self.leaf_count() {
            report.error(format!(
                "leaf counter is {}, but {} leaves are reachable",
                self.leaf_count(),
                report.leaf_count
            ));
        }
        if let Some(cap) = self.leaf_cap() {
            if self.leaf_count() > cap {
                report.warn(format!("{} leaves exceed the cap of {cap}", self.leaf_count()));
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{DiagonalCf, DiagonalModel, FullCovarianceModel};
    use crate::tree::{CfTreeConfig, Leaf};

    #[test]
    fn test_empty_tree_is_clean() {
        let tree = CfTree::new(DiagonalModel, &CfTreeConfig::default()).unwrap();
        let report = tree.health_check();
        assert!(report.is_clean());
        assert_eq!(report.node_count, 0);
    }

    #[test]
    fn test_built_tree_is_healthy() {
        let config = CfTreeConfig::new().with_branching_factor(3).with_threshold(0.5);
        let mut tree = CfTree::new(FullCovarianceModel, &config).unwrap();
        for i in 0..60 {
            let x = i as f64;
            tree.insert(&[x.sin() * 10.0, x.cos() * 10.0, x * 0.1]).unwrap();
        }
        tree.set_leaf_cap(10);
        assert!(tree.rebuild_if_needed().unwrap());
        let report = tree.health_check();
        assert!(report.is_healthy(), "{report}");
        assert_eq!(report.leaf_count, tree.leaf_count());
    }

    #[test]
    fn test_detects_broken_aggregate() {
        let mut tree = CfTree::new(
            DiagonalModel,
            &CfTreeConfig::new().with_branching_factor(2),
        )
        .unwrap();
        for x in [0.0, 5.0, 10.0] {
            tree.insert(&[x]).unwrap();
        }
        let mut broken = tree.clone();
        if let Some(root) = broken.root.as_mut() {
            root.cf.add_point(&[100.0]);
        }
        let report = broken.health_check();
        assert!(!report.is_healthy());
        assert!(report.issues[0].message.contains("aggregate"));
        assert_eq!(report.issues[0].path.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_detects_id_mismatch() {
        let mut cf = DiagonalCf::new(1);
        cf.add_point(&[1.0]);
        cf.add_point(&[2.0]);
        let mut root = Node::new(DiagonalCf::new(1), 4);
        root.add(Entry::Leaf(Leaf::new(cf, vec![0])));

        let mut report = ValidationReport::new();
        let mut checker = Checker {
            report: &mut report,
            dim: 1,
            store_ids: true,
            leaf_depth: None,
            path: Vec::new(),
            _feature: core::marker::PhantomData,
        };
        checker.visit(&root, 0);
        assert_eq!(report.counts().get(&Severity::Error), Some(&1));
        assert!(format!("{report}").contains("1 errors"));
    }
}
