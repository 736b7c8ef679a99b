//! A small, seeded isolation forest for row-level anomaly scoring.

use rand::prelude::*;

const EULER_GAMMA: f64 = 0.577_215_664_9;

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Average path length of an unsuccessful binary-search-tree lookup over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

pub(crate) struct IsolationForest {
    trees: Vec<Node>,
    subsample: usize,
}

impl IsolationForest {
    /// Fit `trees` isolation trees on `rows`, each over a sub-sample of at
    /// most `subsample` rows drawn from a generator seeded with `seed`.
    pub(crate) fn fit(rows: &[Vec<f64>], trees: usize, subsample: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let subsample = subsample.min(rows.len()).max(1);
        let max_depth = (subsample as f64).log2().ceil().max(1.0) as usize;
        let all: Vec<usize> = (0..rows.len()).collect();

        let trees = (0..trees)
            .map(|_| {
                let sample: Vec<usize> = all.choose_multiple(&mut rng, subsample).copied().collect();
                build_tree(rows, sample, 0, max_depth, &mut rng)
            })
            .collect();

        Self { trees, subsample }
    }

    /// Anomaly score in (0, 1]; values near 1 are easy to isolate.
    pub(crate) fn score(&self, point: &[f64]) -> f64 {
        let normalizer = average_path_length(self.subsample);
        if self.trees.is_empty() || normalizer == 0.0 {
            return 0.5;
        }
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| path_length(tree, point, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_depth / normalizer)
    }
}

fn build_tree(
    rows: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let features = rows[indices[0]].len();
    let splittable: Vec<(usize, f64, f64)> = (0..features)
        .filter_map(|feature| {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |acc, &i| {
                let v = rows[i][feature];
                (acc.0.min(v), acc.1.max(v))
            });
            (max > min).then_some((feature, min, max))
        })
        .collect();

    let Some(&(feature, min, max)) = splittable.choose(rng) else {
        return Node::Leaf {
            size: indices.len(),
        };
    };
    // Interpolate instead of sampling the span, which overflows for wide ranges
    let t: f64 = rng.r#gen();
    let threshold = min * (1.0 - t) + max * t;
    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| rows[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(rows, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, point: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if point[*feature] < *threshold {
                path_length(left, point, depth + 1)
            } else {
                path_length(right, point, depth + 1)
            }
        }
    }
}
