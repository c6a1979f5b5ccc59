//! Spline fitting inside box corridors.
//!
//! A corridor is a monotone ordered sequence of axis-aligned boxes in
//! which consecutive boxes share a non-degenerate horizontal edge. The
//! fitter pulls a shortest path taut through the shared windows, fits
//! cubic Béziers over it with subdivision until every piece stays
//! inside the union, and reports the x-extent the spline occupies in
//! each box so callers can shrink boxes for later edges.

use crate::visibility::bezier_eval;
use gv_core::geom::{BoundBox, Point};
use kurbo::{CubicBez, ParamCurve};
use thiserror::Error;

const EDGE_EPS: f64 = 1e-6;
const TAUT_ITERS: usize = 64;
const MAX_SPLIT_DEPTH: usize = 8;

#[derive(Debug, Error, PartialEq)]
pub enum CorridorError {
    #[error("corridor boxes {0} and {1} do not share an edge")]
    BadCorridor(usize, usize),
    #[error("an endpoint lies outside its corridor box")]
    EndpointOutside,
}

/// One endpoint of a corridor path: a point, an optional required
/// tangent angle (radians), and whether that tangent is a hard
/// constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathEnd {
    pub point: Point,
    pub theta: Option<f64>,
    pub constrained: bool,
}

impl PathEnd {
    pub fn free(point: Point) -> PathEnd {
        PathEnd {
            point,
            theta: None,
            constrained: false,
        }
    }
}

/// A fitted corridor spline: cubic control points in 3k+1 form plus
/// the per-box occupied x-extents.
#[derive(Debug, Clone, PartialEq)]
pub struct SplineFit {
    pub ctrl: Vec<Point>,
    pub extents: Vec<(f64, f64)>,
}

/// Horizontal window shared by two consecutive boxes.
#[derive(Debug, Clone, Copy)]
struct Window {
    y: f64,
    lo: f64,
    hi: f64,
}

fn shared_window(a: &BoundBox, b: &BoundBox, ia: usize) -> Result<Window, CorridorError> {
    let y = if (a.ll.y - b.ur.y).abs() < EDGE_EPS {
        a.ll.y
    } else if (a.ur.y - b.ll.y).abs() < EDGE_EPS {
        a.ur.y
    } else {
        return Err(CorridorError::BadCorridor(ia, ia + 1));
    };
    let lo = a.ll.x.max(b.ll.x);
    let hi = a.ur.x.min(b.ur.x);
    if hi - lo < EDGE_EPS {
        return Err(CorridorError::BadCorridor(ia, ia + 1));
    }
    Ok(Window { y, lo, hi })
}

/// Fit a spline from `start` to `end` through `boxes`.
pub fn fit_spline(
    boxes: &[BoundBox],
    start: PathEnd,
    end: PathEnd,
) -> Result<SplineFit, CorridorError> {
    if boxes.is_empty() {
        return Err(CorridorError::EndpointOutside);
    }
    if !boxes[0].contains(start.point) || !boxes[boxes.len() - 1].contains(end.point) {
        return Err(CorridorError::EndpointOutside);
    }
    let mut windows = Vec::with_capacity(boxes.len().saturating_sub(1));
    for i in 0..boxes.len() - 1 {
        windows.push(shared_window(&boxes[i], &boxes[i + 1], i)?);
    }

    let path = taut_path(start.point, end.point, &windows);
    let inside = |p: Point| boxes.iter().any(|b| b.contains(p));
    let mut ctrl = Vec::with_capacity(3 * path.len());
    ctrl.push(path[0]);
    fit_recursive(&path, start, end, &inside, 0, &mut ctrl);

    let extents = occupied_extents(boxes, &ctrl);
    Ok(SplineFit { ctrl, extents })
}

/// Pull the path tight: each interior point slides along its window
/// toward the straight line between its neighbors.
fn taut_path(start: Point, end: Point, windows: &[Window]) -> Vec<Point> {
    let mut pts: Vec<Point> = std::iter::once(start)
        .chain(windows.iter().map(|w| Point::new((w.lo + w.hi) / 2.0, w.y)))
        .chain(std::iter::once(end))
        .collect();
    for _ in 0..TAUT_ITERS {
        let mut moved = 0.0f64;
        for k in 1..pts.len() - 1 {
            let w = windows[k - 1];
            let a = pts[k - 1];
            let b = pts[k + 1];
            let target = if (b.y - a.y).abs() < 1e-12 {
                (a.x + b.x) / 2.0
            } else {
                a.x + (b.x - a.x) * (w.y - a.y) / (b.y - a.y)
            };
            let x = target.clamp(w.lo, w.hi);
            moved += (pts[k].x - x).abs();
            pts[k] = Point::new(x, w.y);
        }
        if moved < 1e-9 {
            break;
        }
    }
    pts
}

/// Fit one cubic over the whole path segment; split at the middle path
/// vertex when a sample escapes the corridor, down to segment level.
fn fit_recursive(
    path: &[Point],
    start: PathEnd,
    end: PathEnd,
    inside: &impl Fn(Point) -> bool,
    depth: usize,
    out: &mut Vec<Point>,
) {
    let a = path[0];
    let b = path[path.len() - 1];
    let chord = a.dist(b).max(1e-12);
    let dir_out = match (start.theta, path.get(1)) {
        (Some(t), _) if start.constrained => Point::new(t.cos(), t.sin()),
        (_, Some(&next)) => (next - a).normalized(),
        _ => (b - a).normalized(),
    };
    let dir_in = match (end.theta, path.len().checked_sub(2).map(|i| path[i])) {
        (Some(t), _) if end.constrained => Point::new(-t.cos(), -t.sin()),
        (_, Some(prev)) => (prev - b).normalized(),
        _ => (a - b).normalized(),
    };
    let c1 = a + dir_out * (chord / 3.0);
    let c2 = b + dir_in * (chord / 3.0);

    let ok = (1..16).all(|k| {
        let t = k as f64 / 16.0;
        inside(bezier_eval(a, c1, c2, b, t))
    });
    if ok || path.len() <= 2 || depth >= MAX_SPLIT_DEPTH {
        if ok || path.len() <= 2 {
            out.extend_from_slice(&[c1, c2, b]);
            return;
        }
        // deep recursion without containment: emit the path verbatim
        for w in path.windows(2) {
            out.extend_from_slice(&[
                w[0].lerp(w[1], 1.0 / 3.0),
                w[0].lerp(w[1], 2.0 / 3.0),
                w[1],
            ]);
        }
        return;
    }
    let mid = path.len() / 2;
    let join = PathEnd::free(path[mid]);
    fit_recursive(&path[..=mid], start, join, inside, depth + 1, out);
    fit_recursive(&path[mid..], join, end, inside, depth + 1, out);
}

/// For every box, the x-range the spline actually sweeps inside it.
/// Boxes the spline never enters report an empty extent at their
/// center.
fn occupied_extents(boxes: &[BoundBox], ctrl: &[Point]) -> Vec<(f64, f64)> {
    let mut ext: Vec<(f64, f64)> = vec![(f64::INFINITY, f64::NEG_INFINITY); boxes.len()];
    let mut k = 0;
    while k + 3 < ctrl.len() {
        let seg = CubicBez::new(
            kurbo::Point::new(ctrl[k].x, ctrl[k].y),
            kurbo::Point::new(ctrl[k + 1].x, ctrl[k + 1].y),
            kurbo::Point::new(ctrl[k + 2].x, ctrl[k + 2].y),
            kurbo::Point::new(ctrl[k + 3].x, ctrl[k + 3].y),
        );
        for s in 0..=24 {
            let p = seg.eval(s as f64 / 24.0);
            let gp = Point::new(p.x, p.y);
            for (b, e) in boxes.iter().zip(ext.iter_mut()) {
                if b.contains(gp) {
                    e.0 = e.0.min(gp.x);
                    e.1 = e.1.max(gp.x);
                }
            }
        }
        k += 3;
    }
    for (b, e) in boxes.iter().zip(ext.iter_mut()) {
        if e.0 > e.1 {
            let c = b.center().x;
            *e = (c, c);
        }
    }
    ext
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack(heights: &[(f64, f64, f64)]) -> Vec<BoundBox> {
        // (lo_x, hi_x, height) boxes stacked downward from y = 0
        let mut y = 0.0;
        heights
            .iter()
            .map(|&(lo, hi, h)| {
                let b = BoundBox::new(Point::new(lo, y - h), Point::new(hi, y));
                y -= h;
                b
            })
            .collect()
    }

    #[test]
    fn straight_corridor_gives_straight_spline() {
        let boxes = stack(&[(0.0, 10.0, 5.0), (0.0, 10.0, 5.0)]);
        let fit = fit_spline(
            &boxes,
            PathEnd::free(Point::new(5.0, -0.5)),
            PathEnd::free(Point::new(5.0, -9.5)),
        )
        .unwrap();
        assert_eq!(fit.ctrl.len() % 3, 1);
        for p in &fit.ctrl {
            assert!((p.x - 5.0).abs() < 1e-6);
        }
    }

    #[test]
    fn spline_stays_inside_the_corridor() {
        // a zig-zag corridor
        let boxes = stack(&[
            (0.0, 4.0, 4.0),
            (2.0, 8.0, 4.0),
            (6.0, 12.0, 4.0),
            (6.0, 8.0, 4.0),
        ]);
        let fit = fit_spline(
            &boxes,
            PathEnd::free(Point::new(1.0, -1.0)),
            PathEnd::free(Point::new(7.0, -15.0)),
        )
        .unwrap();
        let inside = |p: Point| boxes.iter().any(|b| b.contains(p));
        let mut k = 0;
        while k + 3 < fit.ctrl.len() {
            for s in 1..20 {
                let t = s as f64 / 20.0;
                let p = bezier_eval(
                    fit.ctrl[k],
                    fit.ctrl[k + 1],
                    fit.ctrl[k + 2],
                    fit.ctrl[k + 3],
                    t,
                );
                assert!(inside(p), "sample {p:?} escaped the corridor");
            }
            k += 3;
        }
    }

    #[test]
    fn extents_shrink_boxes_for_later_edges() {
        let boxes = stack(&[(0.0, 10.0, 5.0), (0.0, 10.0, 5.0)]);
        let fit = fit_spline(
            &boxes,
            PathEnd::free(Point::new(2.0, -0.5)),
            PathEnd::free(Point::new(2.0, -9.5)),
        )
        .unwrap();
        for (lo, hi) in &fit.extents {
            assert!(*lo >= 1.5 && *hi <= 2.5, "extent ({lo}, {hi})");
        }
    }

    #[test]
    fn touching_boxes_without_overlap_error() {
        let boxes = vec![
            BoundBox::new(Point::new(0.0, 0.0), Point::new(2.0, 2.0)),
            BoundBox::new(Point::new(5.0, -2.0), Point::new(7.0, 0.0)),
        ];
        let err = fit_spline(
            &boxes,
            PathEnd::free(Point::new(1.0, 1.0)),
            PathEnd::free(Point::new(6.0, -1.0)),
        )
        .unwrap_err();
        assert_eq!(err, CorridorError::BadCorridor(0, 1));
    }

    #[test]
    fn endpoint_outside_is_detected() {
        let boxes = stack(&[(0.0, 10.0, 5.0)]);
        let err = fit_spline(
            &boxes,
            PathEnd::free(Point::new(50.0, 50.0)),
            PathEnd::free(Point::new(5.0, -2.0)),
        )
        .unwrap_err();
        assert_eq!(err, CorridorError::EndpointOutside);
    }

    #[test]
    fn constrained_tangent_is_honored() {
        let boxes = stack(&[(0.0, 10.0, 10.0)]);
        let start = PathEnd {
            point: Point::new(5.0, -1.0),
            theta: Some(0.0), // launch horizontally
            constrained: true,
        };
        let fit = fit_spline(&boxes, start, PathEnd::free(Point::new(5.0, -9.0))).unwrap();
        let c1 = fit.ctrl[1];
        let a = fit.ctrl[0];
        assert!((c1.y - a.y).abs() < 1e-9, "tangent not horizontal: {c1:?}");
        assert!(c1.x > a.x);
    }
}
