use cftree::{
    leaf_distance_matrix, CfTree, CfTreeConfig, HierarchyBuilder, MaxLeaves, Metric,
    SphericalModel, ThresholdHeuristic,
};
use kodama::{linkage, Method};
use rand::prelude::*;
use rand_distr::Normal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Points -> CF-tree leaves -> Ward linkage over the leaves -> hierarchy over all points.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cftree=info".parse()?),
        )
        .init();

    let noise = Normal::new(0.0, 1.0)?;
    let mut rng = StdRng::seed_from_u64(7);
    let points: Vec<Vec<f64>> = (0..3_000)
        .map(|i| {
            let shift = (i % 3) as f64 * 20.0;
            vec![shift + noise.sample(&mut rng), noise.sample(&mut rng), shift * 0.5]
        })
        .collect();

    let config = CfTreeConfig::new()
        .with_branching_factor(10)
        .with_max_leaves(MaxLeaves::Relative(0.02))
        .with_heuristic(ThresholdHeuristic::Median);
    let tree = CfTree::build(SphericalModel, &config, &points)?;
    let leaves = tree.into_leaves();
    let n = leaves.len();

    // kodama labels the cluster formed by step k as n + k; keep the smallest
    // leaf index as the representative of every merged cluster.
    let mut condensed = leaf_distance_matrix(&leaves, &Metric::CentroidEuclidean)?;
    let dend = linkage(&mut condensed, n, Method::Ward);
    let mut rep: Vec<usize> = (0..n).collect();
    let mut builder = HierarchyBuilder::new(n).with_cluster_sizes();
    for step in dend.steps() {
        let (a, b) = (rep[step.cluster1], rep[step.cluster2]);
        builder.link(a.max(b), step.dissimilarity, a.min(b));
        rep.push(a.min(b));
    }

    let hierarchy = builder.complete(&leaves, points.len())?;
    println!(
        "{} leaves, {} points, complete={}",
        n,
        hierarchy.len(),
        hierarchy.is_complete()
    );
    for k in [2, 3, 4] {
        let labels = hierarchy.cut_to_k(k)?;
        let mut counts = vec![0usize; k];
        for &l in &labels {
            counts[l] += 1;
        }
        println!("k={k}: cluster sizes {counts:?}");
    }

    Ok(())
}
