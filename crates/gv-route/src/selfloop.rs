//! Self-loop arcs and parallel-edge bundles.

use gv_core::geom::Point;
use gv_core::model::Spline;

/// One routed self-loop: the spline and a label anchor beside the arc.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopArc {
    pub spline: Spline,
    pub label_pos: Point,
}

/// Fan `k` self-loops around a node of size `w × h` centered at `c`.
/// Arc `i` bulges to the right of the node at a stepped offset; both
/// endpoints sit on the node boundary, above and below the middle of
/// the right side.
pub fn self_loop_arcs(c: Point, w: f64, h: f64, k: usize) -> Vec<LoopArc> {
    let mut arcs = Vec::with_capacity(k);
    let base = w.max(h) * 0.75;
    let step = base * 0.45;
    for i in 0..k {
        let reach = base + step * i as f64;
        let start = Point::new(c.x + w / 2.0, c.y + h * 0.25);
        let end = Point::new(c.x + w / 2.0, c.y - h * 0.25);
        let c1 = Point::new(c.x + w / 2.0 + reach, c.y + h * 0.45);
        let c2 = Point::new(c.x + w / 2.0 + reach, c.y - h * 0.45);
        arcs.push(LoopArc {
            spline: Spline {
                points: vec![start, c1, c2, end],
                start: None,
                end: Some(end),
            },
            label_pos: Point::new(c.x + w / 2.0 + reach + step * 0.5, c.y),
        });
    }
    arcs
}

/// Copy the primary's routed spline to every sibling of a
/// parallel-edge bundle. Returns the clones, one per sibling.
pub fn bundle_clones(primary: &Spline, siblings: usize) -> Vec<Spline> {
    std::iter::repeat_n(primary.clone(), siblings).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arcs_fan_outward() {
        let arcs = self_loop_arcs(Point::ZERO, 10.0, 6.0, 3);
        assert_eq!(arcs.len(), 3);
        // increasing reach per arc
        for w in arcs.windows(2) {
            assert!(w[1].spline.points[1].x > w[0].spline.points[1].x);
            assert!(w[1].label_pos.x > w[0].label_pos.x);
        }
    }

    #[test]
    fn endpoints_sit_on_the_boundary() {
        let (w, h) = (10.0, 6.0);
        let arcs = self_loop_arcs(Point::ZERO, w, h, 1);
        let s = &arcs[0].spline;
        let first = s.points[0];
        let last = *s.points.last().unwrap();
        assert!((first.x - w / 2.0).abs() < 1e-12);
        assert!((last.x - w / 2.0).abs() < 1e-12);
        assert!(first.y.abs() <= h / 2.0 && last.y.abs() <= h / 2.0);
        // the loop is longer than half the node diameter
        let mut len = 0.0;
        for seg in s.points.windows(2) {
            len += seg[0].dist(seg[1]);
        }
        assert!(len > w / 2.0);
    }

    #[test]
    fn bundles_share_the_primary_spline() {
        let primary = Spline {
            points: vec![Point::ZERO, Point::new(1.0, 1.0)],
            start: None,
            end: None,
        };
        let clones = bundle_clones(&primary, 2);
        assert_eq!(clones.len(), 2);
        assert_eq!(clones[0], primary);
    }
}
