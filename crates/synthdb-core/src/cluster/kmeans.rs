//! Seeded k-means over squared Euclidean distance.
//!
//! Initialization is k-means++ driven by a `ChaCha8Rng` seeded from the
//! caller, so identical inputs in identical order always produce identical
//! assignments. Empty clusters are refilled with the point farthest from its
//! current centroid, which guarantees every one of the `k` clusters is
//! non-empty whenever `k <= n`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::error::{ClusterError, ClusterResult};

/// Maximum number of Lloyd iterations.
const MAX_ITERATIONS: usize = 300;

/// Threshold below which total squared distance is treated as zero.
const EPSILON: f32 = 1e-12;

/// Result of a k-means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// One centroid per cluster, same dimension as the input.
    pub centroids: Vec<Vec<f32>>,
    /// Cluster index (0-based) for each input point, in input order.
    pub assignments: Vec<usize>,
    /// Iterations run before convergence or the iteration cap.
    pub iterations: usize,
}

/// Fit `k` clusters over `points`.
///
/// `k` must be in `1..=points.len()` and all points must share one dimension.
#[must_use = "clustering results should be used or the computation is wasted"]
pub fn kmeans(points: &[&[f32]], k: usize, seed: u64) -> ClusterResult<KMeansResult> {
    if points.is_empty() {
        return Err(ClusterError::EmptyVectorSet);
    }
    if k == 0 || k > points.len() {
        return Err(ClusterError::InvalidClusterCount {
            k,
            n: points.len(),
        });
    }
    let dimension = points[0].len();
    for (index, point) in points.iter().enumerate() {
        if point.len() != dimension {
            return Err(ClusterError::DimensionMismatch {
                expected: dimension,
                found: point.len(),
            });
        }
        if point.iter().any(|v| !v.is_finite()) {
            return Err(ClusterError::NonFiniteValue { index });
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = initialize_plus_plus(points, k, &mut rng);
    let mut assignments: Vec<usize> = Vec::new();
    let mut iterations = 0;

    for iteration in 1..=MAX_ITERATIONS {
        iterations = iteration;

        let mut next: Vec<usize> = points
            .iter()
            .map(|p| nearest_centroid(p, &centroids))
            .collect();
        relocate_empty_clusters(points, &centroids, &mut next, k);

        let converged = next == assignments;
        assignments = next;
        centroids = update_centroids(points, &assignments, k, dimension);

        if converged {
            break;
        }
    }

    if iterations == MAX_ITERATIONS {
        tracing::debug!(k, n = points.len(), "k-means hit the iteration cap");
    }

    Ok(KMeansResult {
        centroids,
        assignments,
        iterations,
    })
}

/// Squared Euclidean distance.
pub fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same dimension");
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the centroid closest to `point`; ties resolve to the lowest index.
pub fn nearest_centroid<C: AsRef<[f32]>>(point: &[f32], centroids: &[C]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid.as_ref());
        if d < best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

fn initialize_plus_plus(points: &[&[f32]], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    let n = points.len();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    chosen.push(rng.random_range(0..n));

    while chosen.len() < k {
        let distances: Vec<f32> = points
            .iter()
            .map(|p| {
                chosen
                    .iter()
                    .map(|&c| squared_distance(p, points[c]))
                    .fold(f32::INFINITY, f32::min)
            })
            .collect();
        let total: f32 = distances.iter().sum();

        let pick = if total <= EPSILON {
            // Every remaining point coincides with a chosen one.
            None
        } else {
            let target = rng.random::<f32>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (i, &d) in distances.iter().enumerate() {
                cumulative += d;
                if d > 0.0 && cumulative >= target {
                    pick = Some(i);
                    break;
                }
            }
            pick
        };

        let next = pick
            .filter(|i| !chosen.contains(i))
            .or_else(|| (0..n).rev().find(|i| !chosen.contains(i) && distances[*i] > 0.0))
            .or_else(|| (0..n).find(|i| !chosen.contains(i)));

        match next {
            Some(i) => chosen.push(i),
            None => break,
        }
    }

    chosen.iter().map(|&i| points[i].to_vec()).collect()
}

fn relocate_empty_clusters(
    points: &[&[f32]],
    centroids: &[Vec<f32>],
    assignments: &mut [usize],
    k: usize,
) {
    let mut counts = vec![0usize; k];
    for &a in assignments.iter() {
        counts[a] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let mut donor: Option<(usize, f32)> = None;
        for (i, point) in points.iter().enumerate() {
            let owner = assignments[i];
            if counts[owner] <= 1 {
                continue;
            }
            let d = squared_distance(point, &centroids[owner]);
            if donor.map_or(true, |(_, best)| d > best) {
                donor = Some((i, d));
            }
        }
        if let Some((i, _)) = donor {
            counts[assignments[i]] -= 1;
            assignments[i] = empty;
            counts[empty] = 1;
        }
    }
}

fn update_centroids(
    points: &[&[f32]],
    assignments: &[usize],
    k: usize,
    dimension: usize,
) -> Vec<Vec<f32>> {
    let mut sums = vec![vec![0.0f32; dimension]; k];
    let mut sizes = vec![0usize; k];

    for (point, &cluster) in points.iter().zip(assignments.iter()) {
        for (acc, &v) in sums[cluster].iter_mut().zip(point.iter()) {
            *acc += v;
        }
        sizes[cluster] += 1;
    }

    for (centroid, &size) in sums.iter_mut().zip(sizes.iter()) {
        if size > 0 {
            for v in centroid.iter_mut() {
                *v /= size as f32;
            }
        }
    }
    sums
}
