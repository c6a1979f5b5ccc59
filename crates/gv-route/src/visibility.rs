//! Visibility-graph routing: shortest obstacle-avoiding polylines and
//! their smoothing into Bézier chains.

use crate::obstacle::Obstacle;
use gv_core::geom::Point;

/// A visibility configuration, built once per obstacle set and queried
/// per edge.
#[derive(Debug)]
pub struct Visibility {
    obstacles: Vec<Obstacle>,
}

impl Visibility {
    pub fn new(obstacles: Vec<Obstacle>) -> Visibility {
        Visibility { obstacles }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// Shortest polyline from `from` to `to` avoiding every obstacle
    /// that contains neither endpoint. Degrades to the straight
    /// segment (with one warning) when no route exists.
    pub fn route(&self, from: Point, to: Point) -> Vec<Point> {
        // polygons an endpoint is inside of stop being barriers
        let active: Vec<&Obstacle> = self
            .obstacles
            .iter()
            .filter(|ob| !ob.contains(from) && !ob.contains(to))
            .collect();
        if segment_clear(&active, from, to) {
            return vec![from, to];
        }

        // vertex set: endpoints then all obstacle corners
        let mut verts = vec![from, to];
        for ob in &active {
            verts.extend_from_slice(&ob.verts);
        }
        let n = verts.len();
        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for i in 0..n {
            for j in i + 1..n {
                if segment_clear(&active, verts[i], verts[j]) {
                    let w = verts[i].dist(verts[j]);
                    adj[i].push((j, w));
                    adj[j].push((i, w));
                }
            }
        }

        match dijkstra(&adj, 0, 1) {
            Some(path) => path.into_iter().map(|i| verts[i]).collect(),
            None => {
                gv_core::warn_once!("no visibility route between endpoints, using a straight line");
                vec![from, to]
            }
        }
    }

    /// Route and smooth into a cubic Bézier chain that stays clear of
    /// the obstacles.
    pub fn route_spline(&self, from: Point, to: Point) -> Vec<Point> {
        let poly = self.route(from, to);
        let active: Vec<&Obstacle> = self
            .obstacles
            .iter()
            .filter(|ob| !ob.contains(from) && !ob.contains(to))
            .collect();
        smooth_polyline(&poly, |p| active.iter().all(|ob| !ob.contains(p)))
    }
}

/// True when the open segment `a..b` intersects no obstacle edge
/// properly and does not run through an interior.
fn segment_clear(obstacles: &[&Obstacle], a: Point, b: Point) -> bool {
    for ob in obstacles {
        let n = ob.verts.len();
        for i in 0..n {
            let p = ob.verts[i];
            let q = ob.verts[(i + 1) % n];
            if segments_cross(a, b, p, q) {
                return false;
            }
        }
        if ob.contains(a.lerp(b, 0.5)) {
            return false;
        }
    }
    true
}

/// Proper crossing of open segments; shared endpoints do not count.
fn segments_cross(a: Point, b: Point, p: Point, q: Point) -> bool {
    const EPS: f64 = 1e-9;
    let close = |u: Point, v: Point| u.dist(v) < EPS;
    if close(a, p) || close(a, q) || close(b, p) || close(b, q) {
        return false;
    }
    let d1 = (b - a).cross(p - a);
    let d2 = (b - a).cross(q - a);
    let d3 = (q - p).cross(a - p);
    let d4 = (q - p).cross(b - p);
    if ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
    {
        return true;
    }
    false
}

fn dijkstra(adj: &[Vec<(usize, f64)>], src: usize, dst: usize) -> Option<Vec<usize>> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    #[derive(PartialEq)]
    struct Entry(f64, usize);
    impl Eq for Entry {}
    impl PartialOrd for Entry {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for Entry {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.0.total_cmp(&other.0)
        }
    }

    let n = adj.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev = vec![usize::MAX; n];
    let mut heap = BinaryHeap::new();
    dist[src] = 0.0;
    heap.push(Reverse(Entry(0.0, src)));
    while let Some(Reverse(Entry(d, u))) = heap.pop() {
        if d > dist[u] {
            continue;
        }
        if u == dst {
            break;
        }
        for &(v, w) in &adj[u] {
            let nd = d + w;
            if nd < dist[v] {
                dist[v] = nd;
                prev[v] = u;
                heap.push(Reverse(Entry(nd, v)));
            }
        }
    }
    if dist[dst].is_infinite() {
        return None;
    }
    let mut path = vec![dst];
    let mut cur = dst;
    while cur != src {
        cur = prev[cur];
        path.push(cur);
    }
    path.reverse();
    Some(path)
}

/// Smooth a polyline into a cubic Bézier chain (control points in
/// 3k+1 form). Corners get tangent-aligned control points at one third
/// of each incident segment; any piece whose samples violate `clear`
/// collapses back to the straight segment.
pub fn smooth_polyline(poly: &[Point], clear: impl Fn(Point) -> bool) -> Vec<Point> {
    if poly.len() < 2 {
        return poly.to_vec();
    }
    let mut out = Vec::with_capacity(3 * (poly.len() - 1) + 1);
    out.push(poly[0]);
    for i in 0..poly.len() - 1 {
        let a = poly[i];
        let b = poly[i + 1];
        // incoming/outgoing tangents blend across the corner
        let before = if i > 0 { poly[i - 1] } else { a };
        let after = if i + 2 < poly.len() { poly[i + 2] } else { b };
        let t1 = ((b - before).normalized()) * (a.dist(b) / 3.0);
        let t2 = ((a - after).normalized()) * (a.dist(b) / 3.0);
        let (c1, c2) = (a + t1, b + t2);
        if bezier_clear(a, c1, c2, b, &clear) {
            out.extend_from_slice(&[c1, c2, b]);
        } else {
            // straight piece expressed as a degenerate cubic
            out.extend_from_slice(&[a.lerp(b, 1.0 / 3.0), a.lerp(b, 2.0 / 3.0), b]);
        }
    }
    out
}

fn bezier_clear(a: Point, c1: Point, c2: Point, b: Point, clear: &impl Fn(Point) -> bool) -> bool {
    const SAMPLES: usize = 16;
    for k in 1..SAMPLES {
        let t = k as f64 / SAMPLES as f64;
        if !clear(bezier_eval(a, c1, c2, b, t)) {
            return false;
        }
    }
    true
}

pub fn bezier_eval(a: Point, c1: Point, c2: Point, b: Point, t: f64) -> Point {
    let u = 1.0 - t;
    a * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + b * (t * t * t)
}
