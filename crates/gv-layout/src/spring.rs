//! Multilevel spring-electrical layout.
//!
//! Force model: attractive `C^((2-p)/3)/K · ‖xi−xj‖ · (xj−xi)` on
//! edges, repulsive `K^(1-p) · (xi−xj)/‖xi−xj‖^(1-p)` between all
//! pairs, approximated with the Barnes–Hut quad tree above the size
//! cutoff. Moves are unit-normalized and scaled by an adaptively
//! cooled step.

use crate::multilevel::Multilevel;
use crate::quadtree::{QuadTree, exact_repulsive_forces};
use crate::sparse::{SparseMatrix, Values};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const C: f64 = 0.2;
const TOL: f64 = 0.001;
const COOL: f64 = 0.90;
/// Below this many nodes the exact pairwise force is cheaper than the
/// tree.
pub const QUADTREE_CUTOFF: usize = 45;
const BH_THETA: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Smoothing {
    #[default]
    None,
    StressMajorization,
    Spring,
    Triangle,
    Rng,
}

/// Control parameters. `p >= 0` auto-tunes to −1, or −1.8 for
/// power-law graphs; `k < 0` auto-sets to the mean edge length.
#[derive(Debug, Clone)]
pub struct SpringCtrl {
    pub p: f64,
    pub k: f64,
    pub multilevel: bool,
    pub maxiter: usize,
    pub step: f64,
    pub adaptive_cooling: bool,
    pub random_seed: u64,
    pub random_start: bool,
    pub theta: f64,
    pub max_qtree_level: usize,
    pub smoothing: Smoothing,
    /// Negative values scale relative to `K`.
    pub initial_scaling: f64,
}

impl Default for SpringCtrl {
    fn default() -> Self {
        Self {
            p: 0.0,
            k: -1.0,
            multilevel: true,
            maxiter: 500,
            step: 0.1,
            adaptive_cooling: true,
            random_seed: 123,
            random_start: true,
            theta: BH_THETA,
            max_qtree_level: 10,
            smoothing: Smoothing::None,
            initial_scaling: -4.0,
        }
    }
}

// ─── 1-D online optimizer for the quad-tree depth ────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Direction {
    Init,
    Up,
    Down,
}

/// Hill-climbs an integer parameter against an observed cost, probing
/// one step at a time and reversing when the cost rises.
#[derive(Debug)]
struct OnedOptimizer {
    i: usize,
    max_i: usize,
    work: Vec<f64>,
    direction: Direction,
}

impl OnedOptimizer {
    fn new(start: usize, max_i: usize) -> Self {
        Self {
            i: start.min(max_i),
            max_i,
            work: vec![0.0; max_i + 1],
            direction: Direction::Init,
        }
    }

    fn get(&self) -> usize {
        self.i
    }

    fn train(&mut self, work: f64) {
        let i = self.i;
        self.work[i] = work;
        match self.direction {
            Direction::Init => {
                if i == self.max_i {
                    self.direction = Direction::Down;
                    self.i -= 1;
                } else {
                    self.direction = Direction::Up;
                    self.i = (self.i + 1).min(self.max_i);
                }
            }
            Direction::Up => {
                if self.work[i] < self.work[i - 1] && i < self.max_i {
                    self.i = (self.i + 1).min(self.max_i);
                } else {
                    self.i -= 1;
                    self.direction = Direction::Down;
                }
            }
            Direction::Down => {
                if self.work[i] < self.work[i + 1] && i > 0 {
                    self.i -= 1;
                } else {
                    self.i += 1;
                    self.direction = Direction::Up;
                }
            }
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────

pub fn average_edge_length(a: &SparseMatrix, x: &[f64]) -> f64 {
    if a.nnz() == 0 {
        return 1.0;
    }
    let mut total = 0.0;
    for i in 0..a.m {
        for &j in a.row(i) {
            let dx = x[i * 2] - x[j * 2];
            let dy = x[i * 2 + 1] - x[j * 2 + 1];
            total += dx.hypot(dy);
        }
    }
    total / a.nnz() as f64
}

/// A graph is power-law for this engine's purposes when its degree
/// histogram is sharply peaked at degree 1.
pub fn power_law_graph(a: &SparseMatrix) -> bool {
    let m = a.m;
    let mut hist = vec![0usize; m + 1];
    let mut max = 0;
    for i in 0..m {
        let deg = a.row(i).iter().filter(|&&j| j != i).count();
        hist[deg] += 1;
        max = max.max(hist[deg]);
    }
    hist[1] as f64 > 0.8 * max as f64 && hist[1] as f64 > 0.3 * m as f64
}

fn update_step(adaptive: bool, step: f64, fnorm: f64, fnorm0: f64) -> f64 {
    if !adaptive {
        return COOL * step;
    }
    if fnorm >= fnorm0 {
        COOL * step
    } else if fnorm > 0.95 * fnorm0 {
        step
    } else {
        0.99 * step / COOL
    }
}

// ─── Single-level embedding ──────────────────────────────────────────

/// Run the spring-electrical iteration on one adjacency level,
/// updating `x` (interleaved 2-D coordinates) in place. `a` must be
/// symmetric with an empty diagonal.
pub fn spring_electrical_embedding(a: &SparseMatrix, ctrl: &mut SpringCtrl, x: &mut [f64]) {
    let n = a.m;
    if n == 0 || ctrl.maxiter == 0 {
        return;
    }
    debug_assert_eq!(x.len(), 2 * n);

    if ctrl.random_start {
        let mut rng = StdRng::seed_from_u64(ctrl.random_seed);
        for v in x.iter_mut() {
            *v = rng.r#gen::<f64>();
        }
    }
    if ctrl.k < 0.0 {
        ctrl.k = average_edge_length(a, x);
    }
    if ctrl.p >= 0.0 {
        ctrl.p = -1.0;
    }
    let (p, k) = (ctrl.p, ctrl.k);
    let kp = k.powf(1.0 - p);
    let crk = C.powf((2.0 - p) / 3.0) / k;

    let mut optimizer = OnedOptimizer::new(ctrl.max_qtree_level, ctrl.max_qtree_level.max(1));
    let mut force = vec![0.0; 2 * n];
    let mut step = ctrl.step;
    let mut fnorm = 0.0;
    let mut iter = 0;

    loop {
        iter += 1;
        let fnorm0 = fnorm;
        fnorm = 0.0;

        if n >= QUADTREE_CUTOFF {
            let depth = optimizer.get();
            let mut qt = QuadTree::from_points(x, depth);
            let counts = qt.repulsive_forces(x, &mut force, ctrl.theta, p, kp);
            optimizer.train(counts.cell_cell + 0.85 * counts.cell_point + 3.3 * counts.cells);
        } else {
            exact_repulsive_forces(x, &mut force, p, kp);
        }

        // attractive forces along edges
        for i in 0..n {
            for pos in a.ia[i]..a.ia[i + 1] {
                let j = a.ja[pos];
                if j == i {
                    continue;
                }
                let w = match &a.vals {
                    Values::Real(v) => v[pos].abs().max(1e-12),
                    _ => 1.0,
                };
                let dx = x[i * 2] - x[j * 2];
                let dy = x[i * 2 + 1] - x[j * 2 + 1];
                let dist = dx.hypot(dy);
                force[i * 2] -= w * crk * dx * dist;
                force[i * 2 + 1] -= w * crk * dy * dist;
            }
        }

        // unit-normalized move
        for i in 0..n {
            let fx = force[i * 2];
            let fy = force[i * 2 + 1];
            let f = fx.hypot(fy);
            fnorm += f;
            if f > 0.0 {
                x[i * 2] += step * fx / f;
                x[i * 2 + 1] += step * fy / f;
            }
        }

        step = update_step(ctrl.adaptive_cooling, step, fnorm, fnorm0);
        log::trace!("iter {iter}: step {step:.5} fnorm {fnorm:.4} K {k:.4}");
        if step < TOL * k || iter >= ctrl.maxiter {
            break;
        }
    }
    ctrl.max_qtree_level = optimizer.get();
}

// ─── Multilevel driver ───────────────────────────────────────────────

/// Lay out the adjacency `a` (any square matrix; it is symmetrized and
/// stripped of its diagonal here). Returns interleaved coordinates.
pub fn multilevel_spring_electrical(a: &SparseMatrix, ctrl: &mut SpringCtrl) -> Vec<f64> {
    let n = a.m;
    if n == 0 {
        return Vec::new();
    }
    let sym = if a.is_symmetric() && !a.has_diagonal() {
        a.clone()
    } else {
        a.real_adjacency_symmetrized()
    };
    if ctrl.p >= 0.0 {
        ctrl.p = if power_law_graph(&sym) { -1.8 } else { -1.0 };
    }
    if n == 1 {
        return vec![0.0, 0.0];
    }

    let mut rng = StdRng::seed_from_u64(ctrl.random_seed);
    if !ctrl.multilevel {
        let mut x = vec![0.0; 2 * n];
        spring_electrical_embedding(&sym, ctrl, &mut x);
        return x;
    }

    let ml = Multilevel::build(&sym);
    let coarsest = ml.coarsest();
    let mut xc = vec![0.0; 2 * coarsest.m];
    let mut level_ctrl = ctrl.clone();
    spring_electrical_embedding(coarsest, &mut level_ctrl, &mut xc);

    // walk back up, prolongating and refining each finer level
    for li in (0..ml.levels.len()).rev() {
        let fine = if li == 0 { &ml.finest } else { &ml.levels[li - 1].a };
        let mut xf = ml.levels[li].p.mult_dense(&xc, 2);
        // jitter breaks the symmetry of contracted pairs
        let delta = level_ctrl.k * 0.001;
        for v in xf.iter_mut() {
            *v += delta * (rng.r#gen::<f64>() - 0.5);
        }
        level_ctrl.random_start = false;
        level_ctrl.adaptive_cooling = false;
        level_ctrl.k *= 0.5;
        level_ctrl.step = ctrl.step;
        spring_electrical_embedding(fine, &mut level_ctrl, &mut xf);
        xc = xf;
    }
    ctrl.k = level_ctrl.k;
    ctrl.p = level_ctrl.p;
    xc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle(n: usize) -> SparseMatrix {
        let mut triples = Vec::new();
        for i in 0..n {
            let j = (i + 1) % n;
            triples.push((i, j, 1.0));
            triples.push((j, i, 1.0));
        }
        SparseMatrix::from_triples(n, n, &triples)
    }

    fn k4() -> SparseMatrix {
        let mut triples = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                if i != j {
                    triples.push((i, j, 1.0));
                }
            }
        }
        SparseMatrix::from_triples(4, 4, &triples)
    }

    fn spread(x: &[f64]) -> f64 {
        let n = x.len() / 2;
        let mut max = 0.0f64;
        for i in 0..n {
            for j in i + 1..n {
                let d = (x[i * 2] - x[j * 2]).hypot(x[i * 2 + 1] - x[j * 2 + 1]);
                max = max.max(d);
            }
        }
        max
    }

    #[test]
    fn layout_is_deterministic() {
        let a = cycle(12);
        let mut c1 = SpringCtrl::default();
        let mut c2 = SpringCtrl::default();
        let x1 = multilevel_spring_electrical(&a, &mut c1);
        let x2 = multilevel_spring_electrical(&a, &mut c2);
        assert_eq!(x1, x2);
    }

    #[test]
    fn nodes_separate() {
        let a = cycle(8);
        let mut ctrl = SpringCtrl::default();
        let x = multilevel_spring_electrical(&a, &mut ctrl);
        let n = 8;
        for i in 0..n {
            for j in i + 1..n {
                let d = (x[i * 2] - x[j * 2]).hypot(x[i * 2 + 1] - x[j * 2 + 1]);
                assert!(d > 1e-3, "nodes {i} and {j} collapsed");
            }
        }
    }

    #[test]
    fn k4_is_roughly_a_quadrilateral() {
        let mut ctrl = SpringCtrl::default();
        let x = multilevel_spring_electrical(&k4(), &mut ctrl);
        // all pairwise distances within a factor ~2 of each other
        let mut dists = Vec::new();
        for i in 0..4 {
            for j in i + 1..4 {
                dists.push((x[i * 2] - x[j * 2]).hypot(x[i * 2 + 1] - x[j * 2 + 1]));
            }
        }
        let min = dists.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = dists.iter().cloned().fold(0.0, f64::max);
        assert!(min > 0.0);
        assert!(max / min < 2.5, "distance spread {max}/{min}");
    }

    #[test]
    fn large_graph_goes_through_the_tree() {
        let a = cycle(200);
        let mut ctrl = SpringCtrl {
            maxiter: 60,
            ..Default::default()
        };
        let x = multilevel_spring_electrical(&a, &mut ctrl);
        assert_eq!(x.len(), 400);
        assert!(spread(&x) > 1.0);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn auto_p_detects_power_law() {
        // a star: one hub, many leaves of degree 1
        let mut triples = Vec::new();
        for i in 1..40 {
            triples.push((0, i, 1.0));
            triples.push((i, 0, 1.0));
        }
        let a = SparseMatrix::from_triples(40, 40, &triples);
        assert!(power_law_graph(&a));
        let mut ctrl = SpringCtrl {
            maxiter: 10,
            ..Default::default()
        };
        let _ = multilevel_spring_electrical(&a, &mut ctrl);
        assert_eq!(ctrl.p, -1.8);
        assert!(!power_law_graph(&cycle(12)));
    }

    #[test]
    fn optimizer_walks_toward_cheaper_depths() {
        let mut opt = OnedOptimizer::new(5, 10);
        // cost monotonically increasing in depth: should drift to 0
        for _ in 0..30 {
            let d = opt.get();
            opt.train(d as f64);
        }
        assert!(opt.get() <= 1);
    }
}
