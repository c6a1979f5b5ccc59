//! Node-overlap removal over a finished layout.
//!
//! Modes mirror the `overlap` attribute: Voronoi-centroid iteration,
//! uniform scaling searches, force-directed disk relaxation on the
//! Delaunay proximity graph, orthogonal-ordering projection, and a
//! separation-constraint descent. Every mode leaves coordinates
//! untouched on failure and warns instead of erroring.

use crate::delaunay::{delaunay, polygon_centroid, voronoi_cell};
use gv_core::warn_once;

/// Bounding-box growth applied when a Voronoi pass stalls.
const BOX_INCR: f64 = 0.05;
const VORONOI_BUDGET: usize = 100;
const SCALE_STEP: f64 = 1.05;
const SCALE_BUDGET: usize = 200;
const PRISM_BUDGET: usize = 100;
const VPSC_BUDGET: usize = 100;

/// Overlap-removal strategy, parsed from the `overlap` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapMode {
    /// Keep overlaps (`overlap=true`).
    None,
    /// Voronoi-centroid iteration (`overlap=false`).
    #[default]
    Voronoi,
    /// Minimum uniform scale that removes every overlap.
    NScale,
    /// Repeated 5% upscale until clean.
    OScale,
    /// Alias of `NScale` kept for the historical spelling.
    Scale,
    /// Maximum uniform scale ≤ 1 (may legitimately keep the layout).
    Compress,
    /// Force-directed disk relaxation on the proximity graph.
    Prism,
    /// Orthogonal-ordering projection, x then y.
    Ortho,
    /// Separation-constraint quadratic descent.
    Vpsc,
}

impl OverlapMode {
    /// Parse the attribute value; unknown spellings degrade to the
    /// default with one warning.
    pub fn parse(s: &str) -> OverlapMode {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "no" | "voronoi" => OverlapMode::Voronoi,
            "true" | "yes" | "none" => OverlapMode::None,
            "scale" => OverlapMode::Scale,
            "nscale" => OverlapMode::NScale,
            "oscale" => OverlapMode::OScale,
            "compress" => OverlapMode::Compress,
            "prism" | "prism0" => OverlapMode::Prism,
            "ortho" | "orthoxy" | "orthoyx" => OverlapMode::Ortho,
            "vpsc" | "ipsep" => OverlapMode::Vpsc,
            other => {
                warn_once!("unknown overlap mode '{other}', using voronoi");
                OverlapMode::Voronoi
            }
        }
    }
}

/// Node separation margin: `[+]x[,y]`. A `+` prefix adds points on
/// each side; without it the box is scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sep {
    pub additive: bool,
    pub x: f64,
    pub y: f64,
}

impl Default for Sep {
    fn default() -> Self {
        Sep {
            additive: true,
            x: 4.0,
            y: 4.0,
        }
    }
}

impl Sep {
    pub fn parse(s: &str) -> Sep {
        let s = s.trim();
        let (additive, rest) = match s.strip_prefix('+') {
            Some(r) => (true, r),
            None => (false, s),
        };
        let mut parts = rest.splitn(2, ',').map(|p| p.trim().parse::<f64>());
        match parts.next() {
            Some(Ok(x)) => {
                let y = match parts.next() {
                    Some(Ok(y)) => y,
                    Some(Err(_)) => {
                        warn_once!("bad sep value '{s}'");
                        x
                    }
                    None => x,
                };
                Sep { additive, x, y }
            }
            _ => {
                warn_once!("bad sep value '{s}'");
                Sep::default()
            }
        }
    }

    /// Expanded size of a `w × h` box under this margin.
    pub fn expand(&self, w: f64, h: f64) -> (f64, f64) {
        if self.additive {
            (w + 2.0 * self.x, h + 2.0 * self.y)
        } else {
            (w * self.x.max(1.0), h * self.y.max(1.0))
        }
    }
}

fn pair_overlaps(x: &[f64], sizes: &[(f64, f64)], i: usize, j: usize) -> bool {
    let dx = (x[i * 2] - x[j * 2]).abs();
    let dy = (x[i * 2 + 1] - x[j * 2 + 1]).abs();
    dx < (sizes[i].0 + sizes[j].0) / 2.0 && dy < (sizes[i].1 + sizes[j].1) / 2.0
}

/// Count pairwise bounding-box overlaps.
pub fn count_overlaps(x: &[f64], sizes: &[(f64, f64)]) -> usize {
    let n = sizes.len();
    let mut c = 0;
    for i in 0..n {
        for j in i + 1..n {
            if pair_overlaps(x, sizes, i, j) {
                c += 1;
            }
        }
    }
    c
}

/// Remove overlaps of `sizes`-sized boxes centered on `x`, in place.
/// `sizes` are the margin-expanded extents. Returns the remaining
/// overlap count.
pub fn remove_overlap(mode: OverlapMode, x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    let n = sizes.len();
    if n < 2 {
        return 0;
    }
    debug_assert_eq!(x.len(), 2 * n);
    match mode {
        OverlapMode::None => count_overlaps(x, sizes),
        OverlapMode::Voronoi => voronoi_adjust(x, sizes),
        OverlapMode::Scale | OverlapMode::NScale => nscale_adjust(x, sizes),
        OverlapMode::OScale => oscale_adjust(x, sizes),
        OverlapMode::Compress => compress_adjust(x, sizes),
        OverlapMode::Prism => prism_adjust(x, sizes),
        OverlapMode::Ortho => ortho_adjust(x, sizes),
        OverlapMode::Vpsc => vpsc_adjust(x, sizes),
    }
}

// ─── Voronoi ─────────────────────────────────────────────────────────

/// Duplicate sites would degenerate the triangulation; nudge them
/// apart along the dominant axis of the layout.
fn nudge_duplicates(x: &mut [f64], n: usize) {
    let (mut w, mut h) = (0.0f64, 0.0f64);
    for i in 0..n {
        for j in i + 1..n {
            w = w.max((x[i * 2] - x[j * 2]).abs());
            h = h.max((x[i * 2 + 1] - x[j * 2 + 1]).abs());
        }
    }
    let axis = if w >= h { 0 } else { 1 };
    let eps = w.max(h).max(1.0) * 1e-4;
    let mut bumped = 1.0;
    for i in 0..n {
        for j in i + 1..n {
            if x[i * 2] == x[j * 2] && x[i * 2 + 1] == x[j * 2 + 1] {
                x[j * 2 + axis] += eps * bumped;
                bumped += 1.0;
            }
        }
    }
}

fn voronoi_adjust(x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    let n = sizes.len();
    nudge_duplicates(x, n);

    // clipping rectangle: layout bounds padded by the node sizes
    let mut lo = [f64::INFINITY; 2];
    let mut hi = [f64::NEG_INFINITY; 2];
    for i in 0..n {
        lo[0] = lo[0].min(x[i * 2] - sizes[i].0);
        hi[0] = hi[0].max(x[i * 2] + sizes[i].0);
        lo[1] = lo[1].min(x[i * 2 + 1] - sizes[i].1);
        hi[1] = hi[1].max(x[i * 2 + 1] + sizes[i].1);
    }

    let mut prev = count_overlaps(x, sizes);
    if prev == 0 {
        return 0;
    }
    for _ in 0..VORONOI_BUDGET {
        let pts: Vec<[f64; 2]> = (0..n).map(|i| [x[i * 2], x[i * 2 + 1]]).collect();
        let t = delaunay(&pts);
        for i in 0..n {
            let overlapped = (0..n).any(|j| j != i && pair_overlaps(x, sizes, i, j));
            if !overlapped {
                continue;
            }
            let cell = voronoi_cell(&t, i, lo, hi);
            if let Some(c) = polygon_centroid(&cell) {
                x[i * 2] = c[0];
                x[i * 2 + 1] = c[1];
            }
        }
        let now = count_overlaps(x, sizes);
        if now == 0 {
            return 0;
        }
        if now >= prev {
            // stalled: grow the clipping rectangle by 5%
            let w = (hi[0] - lo[0]) * BOX_INCR / 2.0;
            let h = (hi[1] - lo[1]) * BOX_INCR / 2.0;
            lo[0] -= w;
            hi[0] += w;
            lo[1] -= h;
            hi[1] += h;
        }
        prev = now;
    }
    // out of budget: fall back to the scale mode, which always succeeds
    warn_once!("voronoi overlap removal did not converge, scaling instead");
    nscale_adjust(x, sizes)
}

// ─── Uniform scaling ─────────────────────────────────────────────────

fn scale_about_centroid(x: &mut [f64], s: f64) {
    let n = x.len() / 2;
    let cx = (0..n).map(|i| x[i * 2]).sum::<f64>() / n as f64;
    let cy = (0..n).map(|i| x[i * 2 + 1]).sum::<f64>() / n as f64;
    for i in 0..n {
        x[i * 2] = cx + (x[i * 2] - cx) * s;
        x[i * 2 + 1] = cy + (x[i * 2 + 1] - cy) * s;
    }
}

fn oscale_adjust(x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    for _ in 0..SCALE_BUDGET {
        if count_overlaps(x, sizes) == 0 {
            return 0;
        }
        nudge_duplicates(x, sizes.len());
        scale_about_centroid(x, SCALE_STEP);
    }
    count_overlaps(x, sizes)
}

/// The smallest uniform scale ≥ needed by the worst pair. A pair stops
/// overlapping once its x- or y-projection separates, so each pair
/// needs the smaller of its two per-axis scales.
fn required_scale(x: &[f64], sizes: &[(f64, f64)]) -> Option<f64> {
    let n = sizes.len();
    let mut s = 0.0f64;
    for i in 0..n {
        for j in i + 1..n {
            let dx = (x[i * 2] - x[j * 2]).abs();
            let dy = (x[i * 2 + 1] - x[j * 2 + 1]).abs();
            let need_x = (sizes[i].0 + sizes[j].0) / 2.0;
            let need_y = (sizes[i].1 + sizes[j].1) / 2.0;
            let sx = if dx > 0.0 { need_x / dx } else { f64::INFINITY };
            let sy = if dy > 0.0 { need_y / dy } else { f64::INFINITY };
            let pair = sx.min(sy);
            if pair.is_infinite() {
                return None; // coincident centers cannot be separated by scaling
            }
            s = s.max(pair);
        }
    }
    Some(s)
}

fn nscale_adjust(x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    nudge_duplicates(x, sizes.len());
    match required_scale(x, sizes) {
        Some(s) if s > 1.0 => scale_about_centroid(x, s),
        Some(_) => {}
        None => {
            warn_once!("coincident nodes cannot be separated by scaling");
        }
    }
    count_overlaps(x, sizes)
}

fn compress_adjust(x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    match required_scale(x, sizes) {
        Some(s) if s <= 1.0 && s > 0.0 => {
            scale_about_centroid(x, s);
            count_overlaps(x, sizes)
        }
        _ => {
            // compression infeasible: positions stay
            count_overlaps(x, sizes)
        }
    }
}

// ─── Prism (disk relaxation) ─────────────────────────────────────────

fn prism_adjust(x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    let n = sizes.len();
    nudge_duplicates(x, n);
    for _ in 0..PRISM_BUDGET {
        if count_overlaps(x, sizes) == 0 {
            return 0;
        }
        let pts: Vec<[f64; 2]> = (0..n).map(|i| [x[i * 2], x[i * 2 + 1]]).collect();
        let t = delaunay(&pts);
        let mut disp = vec![0.0f64; 2 * n];
        for &(u, v) in &t.edges {
            let dx = x[v * 2] - x[u * 2];
            let dy = x[v * 2 + 1] - x[u * 2 + 1];
            let d = dx.hypot(dy).max(1e-9);
            // required separation treating each box as a rigid disk
            let ru = (sizes[u].0 / 2.0).hypot(sizes[u].1 / 2.0);
            let rv = (sizes[v].0 / 2.0).hypot(sizes[v].1 / 2.0);
            let want = ru + rv;
            if d < want {
                let push = (want - d) / 2.0;
                disp[u * 2] -= push * dx / d;
                disp[u * 2 + 1] -= push * dy / d;
                disp[v * 2] += push * dx / d;
                disp[v * 2 + 1] += push * dy / d;
            }
        }
        if disp.iter().all(|&v| v == 0.0) {
            // proximity graph no longer sees the overlap; scale out
            break;
        }
        for (xi, di) in x.iter_mut().zip(&disp) {
            *xi += di;
        }
    }
    if count_overlaps(x, sizes) > 0 {
        return nscale_adjust(x, sizes);
    }
    0
}

// ─── Orthogonal ordering ─────────────────────────────────────────────

/// One axis of the ortho pass: keep the coordinate ordering, open gaps
/// where adjacent-in-order boxes overlap on both axes.
fn ortho_axis(x: &mut [f64], sizes: &[(f64, f64)], axis: usize) {
    let n = sizes.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| x[a * 2 + axis].total_cmp(&x[b * 2 + axis]));
    for k in 1..n {
        let i = order[k];
        let mut shift = 0.0f64;
        for &j in &order[..k] {
            if !pair_overlaps(x, sizes, i, j) {
                continue;
            }
            let half = if axis == 0 {
                (sizes[i].0 + sizes[j].0) / 2.0
            } else {
                (sizes[i].1 + sizes[j].1) / 2.0
            };
            let gap = x[i * 2 + axis] - x[j * 2 + axis];
            shift = shift.max(half - gap);
        }
        if shift > 0.0 {
            // move this box and everything after it in the ordering
            for &j in &order[k..] {
                x[j * 2 + axis] += shift;
            }
        }
    }
}

fn ortho_adjust(x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    ortho_axis(x, sizes, 0);
    ortho_axis(x, sizes, 1);
    count_overlaps(x, sizes)
}

// ─── VPSC-style constraint descent ───────────────────────────────────

/// Project out violated separation constraints axis by axis, moving
/// both parties half the violation. Infeasibility (budget exhausted)
/// warns and leaves the current positions.
fn vpsc_adjust(x: &mut [f64], sizes: &[(f64, f64)]) -> usize {
    let n = sizes.len();
    nudge_duplicates(x, n);
    for _ in 0..VPSC_BUDGET {
        let mut violated = false;
        for i in 0..n {
            for j in i + 1..n {
                if !pair_overlaps(x, sizes, i, j) {
                    continue;
                }
                violated = true;
                let dx = x[j * 2] - x[i * 2];
                let dy = x[j * 2 + 1] - x[i * 2 + 1];
                let vx = (sizes[i].0 + sizes[j].0) / 2.0 - dx.abs();
                let vy = (sizes[i].1 + sizes[j].1) / 2.0 - dy.abs();
                // resolve along the axis needing the smaller move
                if vx <= vy {
                    let dir = if dx >= 0.0 { 1.0 } else { -1.0 };
                    x[i * 2] -= dir * vx / 2.0;
                    x[j * 2] += dir * vx / 2.0;
                } else {
                    let dir = if dy >= 0.0 { 1.0 } else { -1.0 };
                    x[i * 2 + 1] -= dir * vy / 2.0;
                    x[j * 2 + 1] += dir * vy / 2.0;
                }
            }
        }
        if !violated {
            return 0;
        }
    }
    let left = count_overlaps(x, sizes);
    if left > 0 {
        warn_once!("separation solver did not converge; {left} overlaps remain");
    }
    left
}
