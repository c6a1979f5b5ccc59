//! Whole-layout transforms: normalization rotation, aspect-ratio
//! post-processing, and pre-overlap scaling.

/// Translate the first node to the origin and rotate the layout so the
/// direction of `first_edge` equals `angle_deg`.
pub fn normalize_layout(x: &mut [f64], first_edge: Option<(usize, usize)>, angle_deg: f64) {
    let n = x.len() / 2;
    if n == 0 {
        return;
    }
    let (ox, oy) = (x[0], x[1]);
    for i in 0..n {
        x[i * 2] -= ox;
        x[i * 2 + 1] -= oy;
    }
    let Some((u, v)) = first_edge else { return };
    let dx = x[v * 2] - x[u * 2];
    let dy = x[v * 2 + 1] - x[u * 2 + 1];
    if dx == 0.0 && dy == 0.0 {
        return;
    }
    let rot = angle_deg.to_radians() - dy.atan2(dx);
    let (s, c) = rot.sin_cos();
    for i in 0..n {
        let (px, py) = (x[i * 2], x[i * 2 + 1]);
        x[i * 2] = c * px - s * py;
        x[i * 2 + 1] = s * px + c * py;
    }
}

/// Aspect-ratio adjustment modes for a finished drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AspectMode {
    /// Stretch both axes independently onto the target size.
    Fill { width: f64, height: f64 },
    /// Uniform upscale onto the target, only if both axes would grow.
    Expand { width: f64, height: f64 },
    /// Reach the target `height/width` ratio by growing the smaller
    /// dimension.
    Value(f64),
}

/// Translate the layout to start at the origin, then scale per `mode`.
pub fn apply_aspect(mode: AspectMode, x: &mut [f64]) {
    let n = x.len() / 2;
    if n == 0 {
        return;
    }
    let (mut lox, mut loy) = (f64::INFINITY, f64::INFINITY);
    let (mut hix, mut hiy) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for i in 0..n {
        lox = lox.min(x[i * 2]);
        hix = hix.max(x[i * 2]);
        loy = loy.min(x[i * 2 + 1]);
        hiy = hiy.max(x[i * 2 + 1]);
    }
    for i in 0..n {
        x[i * 2] -= lox;
        x[i * 2 + 1] -= loy;
    }
    let w = (hix - lox).max(1e-12);
    let h = (hiy - loy).max(1e-12);
    let (sx, sy) = match mode {
        AspectMode::Fill { width, height } => (width / w, height / h),
        AspectMode::Expand { width, height } => {
            let (sx, sy) = (width / w, height / h);
            if sx > 1.0 && sy > 1.0 {
                let s = sx.min(sy);
                (s, s)
            } else {
                (1.0, 1.0)
            }
        }
        AspectMode::Value(r) => {
            let r = r.abs().max(1e-12);
            if h / w < r {
                (1.0, r * w / h) // too wide: grow the height
            } else {
                (h / (r * w), 1.0) // too tall: grow the width
            }
        }
    };
    for i in 0..n {
        x[i * 2] *= sx;
        x[i * 2 + 1] *= sy;
    }
}

/// Pre-overlap-removal scaling. A negative `factor` scales relative to
/// the drawing: coordinates grow until the mean edge length is
/// `-factor/2` times the mean node dimension. A positive factor is
/// applied directly.
pub fn initial_scale(x: &mut [f64], sizes: &[(f64, f64)], edges: &[(usize, usize)], factor: f64) {
    if factor == 0.0 || x.is_empty() {
        return;
    }
    let s = if factor > 0.0 {
        factor
    } else {
        if edges.is_empty() || sizes.is_empty() {
            return;
        }
        let mean_edge = edges
            .iter()
            .map(|&(u, v)| (x[u * 2] - x[v * 2]).hypot(x[u * 2 + 1] - x[v * 2 + 1]))
            .sum::<f64>()
            / edges.len() as f64;
        if mean_edge <= 0.0 {
            return;
        }
        let mean_size = sizes.iter().map(|&(w, h)| (w + h) / 2.0).sum::<f64>() / sizes.len() as f64;
        (-factor / 2.0) * mean_size / mean_edge
    };
    for v in x.iter_mut() {
        *v *= s;
    }
}
