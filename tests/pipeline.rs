//! End-to-end: points -> CF-tree -> linkage over leaves -> pointer hierarchy.

use cftree::{
    leaf_distance_matrix, CfDistance, CfTree, CfTreeConfig, DiagonalModel, HierarchyBuilder,
    Leaf, MaxLeaves, Metric, SphericalModel, ThresholdHeuristic,
};
use kodama::{linkage, Method};
use rand::prelude::*;
use rand_distr::Normal;

/// Three well separated Gaussian blobs, interleaved; returns points and blob labels.
fn blobs(per_blob: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>) {
    let centers = [[0.0, 0.0], [60.0, 0.0], [0.0, 60.0]];
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut points = Vec::new();
    let mut labels = Vec::new();
    for _ in 0..per_blob {
        for (b, c) in centers.iter().enumerate() {
            points.push(vec![c[0] + noise.sample(&mut rng), c[1] + noise.sample(&mut rng)]);
            labels.push(b);
        }
    }
    (points, labels)
}

/// Average linkage over the leaves, reported into a `HierarchyBuilder`.
///
/// kodama labels leaves `0..n` and the cluster formed by step `k` as `n + k`;
/// each cluster is represented by its smallest leaf index.
fn link_leaves<F: cftree::ClusteringFeature>(
    leaves: &[Leaf<F>],
    metric: &dyn CfDistance<F>,
) -> HierarchyBuilder {
    let n = leaves.len();
    let mut condensed = leaf_distance_matrix(leaves, metric).unwrap();
    let dend = linkage(&mut condensed, n, Method::Average);

    let mut rep: Vec<usize> = (0..n).collect();
    let mut builder = HierarchyBuilder::new(n).with_cluster_sizes();
    for step in dend.steps() {
        let (a, b) = (rep[step.cluster1], rep[step.cluster2]);
        let (keep, merged) = (a.min(b), a.max(b));
        builder.link(merged, step.dissimilarity, keep);
        rep.push(keep);
    }
    builder
}

#[test]
fn test_pipeline_recovers_blobs() {
    let (points, truth) = blobs(200, 7);
    let config = CfTreeConfig::new()
        .with_branching_factor(8)
        .with_max_leaves(MaxLeaves::Absolute(40));
    let tree = CfTree::build(DiagonalModel, &config, &points).unwrap();
    assert!(tree.leaf_count() <= 40);
    assert!(tree.health_check().is_healthy());

    let leaves = tree.into_leaves();
    let builder = link_leaves(&leaves, &Metric::CentroidEuclidean);
    assert_eq!(builder.merges(), leaves.len() - 1);

    let hierarchy = builder.complete(&leaves, points.len()).unwrap();
    assert!(hierarchy.is_complete());
    assert_eq!(hierarchy.merge_sequence().len(), points.len() - 1);
    let sizes = hierarchy.cluster_sizes().unwrap();
    assert_eq!(sizes.iter().max(), Some(&points.len()));

    let labels = hierarchy.cut_to_k(3).unwrap();
    for b in 0..3 {
        let first = labels[truth.iter().position(|&t| t == b).unwrap()];
        for (i, &t) in truth.iter().enumerate() {
            if t == b {
                assert_eq!(labels[i], first, "point {i} split from blob {b}");
            }
        }
    }
    let mut distinct = labels.clone();
    distinct.sort_unstable();
    distinct.dedup();
    assert_eq!(distinct, vec![0, 1, 2]);
}

#[test]
fn test_every_point_linked_once() {
    let (points, _) = blobs(50, 11);
    let config = CfTreeConfig::new()
        .with_branching_factor(4)
        .with_max_leaves(MaxLeaves::Relative(0.1));
    let tree = CfTree::build(SphericalModel, &config, &points).unwrap();
    let leaves = tree.into_leaves();
    let hierarchy = link_leaves(&leaves, &Metric::VarianceIncrease)
        .complete(&leaves, points.len())
        .unwrap();

    let roots = hierarchy.roots();
    assert_eq!(roots.len(), 1);
    for i in 0..points.len() {
        if i != roots[0] {
            assert_ne!(hierarchy.parent(i), i);
            assert!(hierarchy.parent_distance(i).is_finite());
        }
    }
    assert_eq!(hierarchy.parent_distance(roots[0]), f64::INFINITY);
}

#[test]
fn test_partial_linkage_is_incomplete() {
    let (points, _) = blobs(20, 3);
    let config = CfTreeConfig::new().with_max_leaves(MaxLeaves::Absolute(10));
    let leaves = CfTree::build(DiagonalModel, &config, &points)
        .unwrap()
        .into_leaves();
    let mut builder = HierarchyBuilder::new(leaves.len());
    builder.link(1, 1.0, 0);
    let hierarchy = builder.complete(&leaves, points.len()).unwrap();
    assert!(!hierarchy.is_complete());
    assert_eq!(hierarchy.roots().len(), leaves.len() - 1);
}

#[test]
fn test_one_split_at_capacity_three() {
    let config = CfTreeConfig::new().with_branching_factor(3);
    let mut tree = CfTree::new(DiagonalModel, &config).unwrap();
    let mut heights = Vec::new();
    for x in [0.0, 10.0, 20.0, 30.0] {
        tree.insert(&[x]).unwrap();
        heights.push(tree.height());
    }
    assert_eq!(heights, vec![1, 1, 1, 2]);
    assert_eq!(tree.leaf_count(), 4);
    assert_eq!(tree.root().unwrap().len(), 2);
}

#[test]
fn test_infinite_threshold_single_leaf() {
    let (points, _) = blobs(40, 5);
    let config = CfTreeConfig::new()
        .with_branching_factor(4)
        .with_threshold(f64::INFINITY);
    let tree = CfTree::build(DiagonalModel, &config, &points).unwrap();
    assert_eq!(tree.leaf_count(), 1);
    let leaf = tree.leaves().next().unwrap();
    assert_eq!(leaf.weight(), points.len());
    assert_eq!(tree.stats().rebuilds, 0);
}

#[test]
fn test_rebuild_is_reproducible() {
    let (points, _) = blobs(100, 23);
    let config = CfTreeConfig::new()
        .with_branching_factor(5)
        .with_max_leaves(MaxLeaves::Absolute(25))
        .with_heuristic(ThresholdHeuristic::Median);
    let a = CfTree::build(DiagonalModel, &config, &points).unwrap();
    let b = CfTree::build(DiagonalModel, &config, &points).unwrap();
    assert_eq!(a.threshold_sq(), b.threshold_sq());
    assert_eq!(a.stats(), b.stats());
    let ids = |t: &CfTree<DiagonalModel>| -> Vec<Vec<usize>> {
        t.leaves().map(|l| l.ids().to_vec()).collect()
    };
    assert_eq!(ids(&a), ids(&b));
}

#[cfg(feature = "parallel")]
#[test]
fn test_partitions_build_independently() {
    let partitions: Vec<Vec<Vec<f64>>> = (0..4).map(|s| blobs(30, s).0).collect();
    let config = CfTreeConfig::new().with_max_leaves(MaxLeaves::Absolute(12));
    let trees = cftree::build_partitioned(&DiagonalModel, &config, &partitions).unwrap();
    assert_eq!(trees.len(), 4);
    for tree in &trees {
        assert_eq!(tree.total_weight(), 90);
        assert!(tree.leaf_count() <= 12);
    }
}
