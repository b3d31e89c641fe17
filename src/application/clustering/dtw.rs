//! Dynamic time warping over 2D trajectories.

use rayon::prelude::*;

fn euclidean(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Cumulative Euclidean cost of the cheapest monotonic, contiguous warping
/// path from the first to the last pair of points.
///
/// Uses two rolling rows of the O(n·m) cost table. An empty sequence is at
/// distance 0 from another empty sequence and infinitely far from anything else.
pub fn dtw_distance(a: &[[f64; 2]], b: &[[f64; 2]]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return if a.is_empty() && b.is_empty() {
            0.0
        } else {
            f64::INFINITY
        };
    }

    let m = b.len();
    let mut prev = vec![0.0; m];
    let mut curr = vec![0.0; m];

    // First row accumulates along b only.
    prev[0] = euclidean(&a[0], &b[0]);
    for j in 1..m {
        prev[j] = prev[j - 1] + euclidean(&a[0], &b[j]);
    }

    for point in a.iter().skip(1) {
        curr[0] = prev[0] + euclidean(point, &b[0]);
        for j in 1..m {
            let best = prev[j].min(curr[j - 1]).min(prev[j - 1]);
            curr[j] = euclidean(point, &b[j]) + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[m - 1]
}

/// Symmetric matrix of pairwise DTW distances, computed in parallel.
pub fn distance_matrix(series: &[Vec<[f64; 2]>]) -> Vec<Vec<f64>> {
    let n = series.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    let distances: Vec<f64> = pairs
        .par_iter()
        .map(|&(i, j)| dtw_distance(&series[i], &series[j]))
        .collect();

    let mut matrix = vec![vec![0.0; n]; n];
    for (&(i, j), d) in pairs.iter().zip(distances) {
        matrix[i][j] = d;
        matrix[j][i] = d;
    }
    matrix
}
