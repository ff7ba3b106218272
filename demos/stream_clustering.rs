use cftree::{CfTree, CfTreeConfig, ClusteringFeature, DiagonalModel, MaxLeaves};
use rand::prelude::*;
use rand_distr::Normal;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Stream 20k points from five Gaussian sources into a tree capped at 50 leaves.
    // Run with RUST_LOG=cftree=debug to watch the threshold grow on every rebuild.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cftree=info".parse()?),
        )
        .init();

    let centers = [[0.0, 0.0], [8.0, 1.0], [-5.0, 7.0], [3.0, -9.0], [12.0, 12.0]];
    let noise = Normal::new(0.0, 0.8)?;
    let mut rng = StdRng::seed_from_u64(2024);

    let config = CfTreeConfig::new()
        .with_branching_factor(16)
        .with_max_leaves(MaxLeaves::Absolute(50));
    let mut tree = CfTree::new(DiagonalModel, &config)?;

    for i in 0..20_000 {
        let c = centers[rng.random_range(0..centers.len())];
        tree.insert(&[c[0] + noise.sample(&mut rng), c[1] + noise.sample(&mut rng)])?;
        if tree.rebuild_if_needed()? && tree.stats().rebuilds % 5 == 0 {
            println!(
                "after {:>6} points: {} rebuilds, threshold {:.3}",
                i + 1,
                tree.stats().rebuilds,
                tree.threshold_sq().sqrt()
            );
        }
    }

    println!("{}", tree.health_check());
    println!(
        "leaves={} height={} threshold={:.3}",
        tree.leaf_count(),
        tree.height(),
        tree.threshold_sq().sqrt()
    );

    let mut leaves: Vec<_> = tree.leaves().collect();
    leaves.sort_by_key(|leaf| std::cmp::Reverse(leaf.weight()));
    for leaf in leaves.iter().take(10) {
        let cf = leaf.cf();
        println!(
            "  weight {:>5}  centroid ({:>6.2}, {:>6.2})  rms radius {:.2}",
            cf.weight(),
            cf.centroid(0),
            cf.centroid(1),
            cf.total_variance().sqrt()
        );
    }

    Ok(())
}
