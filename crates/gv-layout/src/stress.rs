//! Smoothing post-passes over a finished layout: stress
//! majorization on graph distances, local spring relaxation, and
//! proximity-graph smoothing.

use crate::delaunay::{delaunay, relative_neighborhood};
use crate::sparse::SparseMatrix;
use crate::spring::{Smoothing, SpringCtrl};

const STRESS_MAXITER: usize = 50;
const SMOOTH_MAXITER: usize = 30;

/// Apply the smoothing mode selected in `ctrl` to `x` in place.
pub fn post_process_smoothing(a: &SparseMatrix, ctrl: &SpringCtrl, x: &mut [f64]) {
    match ctrl.smoothing {
        Smoothing::None => {}
        Smoothing::StressMajorization => stress_majorization(a, ctrl.k, x),
        Smoothing::Spring => spring_smoothing(a, ctrl.k, x),
        Smoothing::Triangle => proximity_smoothing(x, false),
        Smoothing::Rng => proximity_smoothing(x, true),
    }
}

/// Unweighted BFS hop distances from `src`.
fn bfs_distances(a: &SparseMatrix, src: usize) -> Vec<usize> {
    let mut dist = vec![usize::MAX; a.m];
    let mut queue = std::collections::VecDeque::new();
    dist[src] = 0;
    queue.push_back(src);
    while let Some(i) = queue.pop_front() {
        for &j in a.row(i) {
            if dist[j] == usize::MAX {
                dist[j] = dist[i] + 1;
                queue.push_back(j);
            }
        }
    }
    dist
}

/// Stress majorization with weights `1/d²` over graph distances scaled
/// by `K`. Quadratic in n; callers bound the input size.
pub fn stress_majorization(a: &SparseMatrix, k: f64, x: &mut [f64]) {
    let n = a.m;
    if n < 2 {
        return;
    }
    let k = if k > 0.0 { k } else { 1.0 };
    // all-pairs ideal distances
    let mut ideal = vec![0.0f64; n * n];
    for i in 0..n {
        let d = bfs_distances(a, i);
        for j in 0..n {
            ideal[i * n + j] = if d[j] == usize::MAX {
                0.0 // disconnected pairs exert no stress
            } else {
                k * d[j] as f64
            };
        }
    }
    let mut next = vec![0.0f64; 2 * n];
    for _ in 0..STRESS_MAXITER {
        let mut moved = 0.0f64;
        for i in 0..n {
            let mut wsum = 0.0;
            let mut acc = [0.0f64; 2];
            for j in 0..n {
                if j == i {
                    continue;
                }
                let dij = ideal[i * n + j];
                if dij <= 0.0 {
                    continue;
                }
                let w = 1.0 / (dij * dij);
                let dx = x[i * 2] - x[j * 2];
                let dy = x[i * 2 + 1] - x[j * 2 + 1];
                let cur = dx.hypot(dy).max(1e-12);
                acc[0] += w * (x[j * 2] + dij * dx / cur);
                acc[1] += w * (x[j * 2 + 1] + dij * dy / cur);
                wsum += w;
            }
            if wsum > 0.0 {
                next[i * 2] = acc[0] / wsum;
                next[i * 2 + 1] = acc[1] / wsum;
            } else {
                next[i * 2] = x[i * 2];
                next[i * 2 + 1] = x[i * 2 + 1];
            }
        }
        for (xi, ni) in x.iter_mut().zip(&next) {
            moved += (*xi - ni).abs();
            *xi = *ni;
        }
        if moved < 1e-6 * k * n as f64 {
            break;
        }
    }
}

/// Local spring relaxation: each node drifts toward positions at
/// distance `K` from its neighbors.
pub fn spring_smoothing(a: &SparseMatrix, k: f64, x: &mut [f64]) {
    let n = a.m;
    let k = if k > 0.0 { k } else { 1.0 };
    let mut next = vec![0.0f64; 2 * n];
    for _ in 0..SMOOTH_MAXITER {
        for i in 0..n {
            let row = a.row(i);
            if row.is_empty() {
                next[i * 2] = x[i * 2];
                next[i * 2 + 1] = x[i * 2 + 1];
                continue;
            }
            let mut acc = [0.0f64; 2];
            for &j in row {
                let dx = x[i * 2] - x[j * 2];
                let dy = x[i * 2 + 1] - x[j * 2 + 1];
                let d = dx.hypot(dy).max(1e-12);
                acc[0] += x[j * 2] + k * dx / d;
                acc[1] += x[j * 2 + 1] + k * dy / d;
            }
            next[i * 2] = acc[0] / row.len() as f64;
            next[i * 2 + 1] = acc[1] / row.len() as f64;
        }
        // damped update keeps the pass from oscillating
        for (xi, ni) in x.iter_mut().zip(&next) {
            *xi = 0.5 * *xi + 0.5 * ni;
        }
    }
}

/// Move every node toward the centroid of its proximity-graph
/// neighbors (Delaunay triangulation, optionally thinned to the
/// relative neighborhood graph).
pub fn proximity_smoothing(x: &mut [f64], use_rng: bool) {
    let n = x.len() / 2;
    if n < 3 {
        return;
    }
    let pts: Vec<[f64; 2]> = (0..n).map(|i| [x[i * 2], x[i * 2 + 1]]).collect();
    let t = delaunay(&pts);
    let edges = if use_rng {
        relative_neighborhood(&t)
    } else {
        t.edges.clone()
    };
    let mut adj = vec![Vec::new(); n];
    for (u, v) in edges {
        adj[u].push(v);
        adj[v].push(u);
    }
    for i in 0..n {
        if adj[i].len() < 2 {
            continue;
        }
        let mut cx = 0.0;
        let mut cy = 0.0;
        for &j in &adj[i] {
            cx += pts[j][0];
            cy += pts[j][1];
        }
        let m = adj[i].len() as f64;
        x[i * 2] = 0.5 * (pts[i][0] + cx / m);
        x[i * 2 + 1] = 0.5 * (pts[i][1] + cy / m);
    }
}
