//! Delaunay triangulation, Voronoi cells, and the relative
//! neighborhood graph over planar point sets.
//!
//! Bowyer–Watson incremental construction. Degenerate inputs are
//! handled explicitly: fewer than three points yield the single edge or
//! nothing, collinear point sets yield the nearest-neighbor chain
//! along the dominant axis.

/// Result of a triangulation: unique edges and triangle adjacency.
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    pub points: Vec<[f64; 2]>,
    /// Vertex-index triples, counter-clockwise.
    pub triangles: Vec<[usize; 3]>,
    /// Unique undirected edges, `u < v`.
    pub edges: Vec<(usize, usize)>,
}

impl Triangulation {
    /// Neighbor sets as adjacency lists over `edges`.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); self.points.len()];
        for &(u, v) in &self.edges {
            adj[u].push(v);
            adj[v].push(u);
        }
        adj
    }
}

fn dist(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Strictly inside the circumcircle of CCW triangle (a, b, c)?
fn in_circumcircle(a: [f64; 2], b: [f64; 2], c: [f64; 2], p: [f64; 2]) -> bool {
    let (ax, ay) = (a[0] - p[0], a[1] - p[1]);
    let (bx, by) = (b[0] - p[0], b[1] - p[1]);
    let (cx, cy) = (c[0] - p[0], c[1] - p[1]);
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    det > 0.0
}

/// Circumcenter of a non-degenerate triangle.
pub fn circumcenter(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> [f64; 2] {
    let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));
    if d.abs() < 1e-30 {
        return [(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0];
    }
    let a2 = a[0] * a[0] + a[1] * a[1];
    let b2 = b[0] * b[0] + b[1] * b[1];
    let c2 = c[0] * c[0] + c[1] * c[1];
    [
        (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d,
        (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d,
    ]
}

/// Triangulate `points`. Collinearity tolerance is relative to the
/// span of the input.
pub fn delaunay(points: &[[f64; 2]]) -> Triangulation {
    let n = points.len();
    let mut t = Triangulation {
        points: points.to_vec(),
        ..Default::default()
    };
    if n == 0 {
        return t;
    }
    if n == 1 {
        return t;
    }
    if n == 2 {
        t.edges.push((0, 1));
        return t;
    }
    if let Some(chain) = collinear_chain(points) {
        t.edges = chain;
        return t;
    }

    // bounding super-triangle
    let (mut lo, mut hi) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
    for p in points {
        for k in 0..2 {
            lo[k] = lo[k].min(p[k]);
            hi[k] = hi[k].max(p[k]);
        }
    }
    let span = (hi[0] - lo[0]).max(hi[1] - lo[1]).max(1.0);
    let mid = [(lo[0] + hi[0]) / 2.0, (lo[1] + hi[1]) / 2.0];
    let s0 = [mid[0] - 20.0 * span, mid[1] - 10.0 * span];
    let s1 = [mid[0] + 20.0 * span, mid[1] - 10.0 * span];
    let s2 = [mid[0], mid[1] + 20.0 * span];

    let mut verts = points.to_vec();
    verts.extend_from_slice(&[s0, s1, s2]);
    let (i0, i1, i2) = (n, n + 1, n + 2);
    let mut tris: Vec<[usize; 3]> = vec![[i0, i1, i2]];

    for (pi, &p) in points.iter().enumerate() {
        // triangles whose circumcircle contains p
        let mut bad: Vec<usize> = Vec::new();
        for (ti, tri) in tris.iter().enumerate() {
            let (a, b, c) = (verts[tri[0]], verts[tri[1]], verts[tri[2]]);
            if in_circumcircle(a, b, c, p) {
                bad.push(ti);
            }
        }
        // boundary of the cavity: edges of bad triangles not shared by two
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for &ti in &bad {
            let tri = tris[ti];
            for e in 0..3 {
                let (u, v) = (tri[e], tri[(e + 1) % 3]);
                if let Some(pos) = boundary
                    .iter()
                    .position(|&(x, y)| (x, y) == (v, u) || (x, y) == (u, v))
                {
                    boundary.swap_remove(pos);
                } else {
                    boundary.push((u, v));
                }
            }
        }
        for ti in bad.into_iter().rev() {
            tris.swap_remove(ti);
        }
        for (u, v) in boundary {
            // keep CCW orientation
            if cross(verts[u], verts[v], p) > 0.0 {
                tris.push([u, v, pi]);
            } else {
                tris.push([v, u, pi]);
            }
        }
    }

    tris.retain(|tri| tri.iter().all(|&v| v < n));
    let mut edges: Vec<(usize, usize)> = Vec::with_capacity(tris.len() * 3 / 2);
    for tri in &tris {
        for e in 0..3 {
            let (u, v) = (tri[e], tri[(e + 1) % 3]);
            let key = (u.min(v), u.max(v));
            if !edges.contains(&key) {
                edges.push(key);
            }
        }
    }
    edges.sort_unstable();
    t.triangles = tris;
    t.edges = edges;
    t
}

/// If every point lies on one line, return the nearest-neighbor chain
/// sorted along the dominant (non-constant) axis.
fn collinear_chain(points: &[[f64; 2]]) -> Option<Vec<(usize, usize)>> {
    let n = points.len();
    let (mut lo, mut hi) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
    for p in points {
        for k in 0..2 {
            lo[k] = lo[k].min(p[k]);
            hi[k] = hi[k].max(p[k]);
        }
    }
    let span = (hi[0] - lo[0]).max(hi[1] - lo[1]).max(1e-300);
    let tol = span * 1e-12;
    let a = points[0];
    let b = points
        .iter()
        .copied()
        .max_by(|p, q| dist(a, *p).total_cmp(&dist(a, *q)))?;
    if points.iter().any(|&p| cross(a, b, p).abs() > tol * span) {
        return None;
    }
    let axis = if hi[0] - lo[0] >= hi[1] - lo[1] { 0 } else { 1 };
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| points[i][axis].total_cmp(&points[j][axis]));
    Some(order.windows(2).map(|w| (w[0].min(w[1]), w[0].max(w[1]))).collect())
}

/// Relative neighborhood graph: drop edge (u, v) when some common
/// neighbor w has `max(d(u,w), d(v,w)) < d(u,v)`.
pub fn relative_neighborhood(t: &Triangulation) -> Vec<(usize, usize)> {
    let adj = t.adjacency();
    t.edges
        .iter()
        .copied()
        .filter(|&(u, v)| {
            let duv = dist(t.points[u], t.points[v]);
            !adj[u].iter().any(|&w| {
                w != v
                    && adj[v].contains(&w)
                    && dist(t.points[u], t.points[w]).max(dist(t.points[v], t.points[w])) < duv
            })
        })
        .collect()
}

/// Voronoi cell of site `i`, clipped to the rectangle
/// `[lo, hi]`: the intersection of the bisector half-planes with every
/// other site the triangulation links to `i`.
pub fn voronoi_cell(t: &Triangulation, i: usize, lo: [f64; 2], hi: [f64; 2]) -> Vec<[f64; 2]> {
    let mut poly = vec![
        [lo[0], lo[1]],
        [hi[0], lo[1]],
        [hi[0], hi[1]],
        [lo[0], hi[1]],
    ];
    let site = t.points[i];
    let adj = t.adjacency();
    for &j in &adj[i] {
        let other = t.points[j];
        // half-plane of points closer to `site` than `other`
        let mid = [(site[0] + other[0]) / 2.0, (site[1] + other[1]) / 2.0];
        let normal = [other[0] - site[0], other[1] - site[1]];
        poly = clip_halfplane(&poly, mid, normal);
        if poly.is_empty() {
            break;
        }
    }
    poly
}

/// Keep the part of `poly` with `(p - origin)·normal <= 0`.
fn clip_halfplane(poly: &[[f64; 2]], origin: [f64; 2], normal: [f64; 2]) -> Vec<[f64; 2]> {
    let side = |p: [f64; 2]| (p[0] - origin[0]) * normal[0] + (p[1] - origin[1]) * normal[1];
    let mut out = Vec::with_capacity(poly.len() + 1);
    for k in 0..poly.len() {
        let cur = poly[k];
        let nxt = poly[(k + 1) % poly.len()];
        let (sc, sn) = (side(cur), side(nxt));
        if sc <= 0.0 {
            out.push(cur);
        }
        if (sc < 0.0 && sn > 0.0) || (sc > 0.0 && sn < 0.0) {
            let f = sc / (sc - sn);
            out.push([cur[0] + f * (nxt[0] - cur[0]), cur[1] + f * (nxt[1] - cur[1])]);
        }
    }
    out
}

/// Area-weighted centroid of a simple polygon.
pub fn polygon_centroid(poly: &[[f64; 2]]) -> Option<[f64; 2]> {
    if poly.len() < 3 {
        return None;
    }
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for k in 0..poly.len() {
        let p = poly[k];
        let q = poly[(k + 1) % poly.len()];
        let w = p[0] * q[1] - q[0] * p[1];
        area2 += w;
        cx += (p[0] + q[0]) * w;
        cy += (p[1] + q[1]) * w;
    }
    if area2.abs() < 1e-30 {
        return None;
    }
    Some([cx / (3.0 * area2), cy / (3.0 * area2)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_tiny_inputs() {
        assert!(delaunay(&[]).edges.is_empty());
        assert!(delaunay(&[[0.0, 0.0]]).edges.is_empty());
        let two = delaunay(&[[0.0, 0.0], [1.0, 0.0]]);
        assert_eq!(two.edges, vec![(0, 1)]);
    }

    #[test]
    fn unit_square_has_five_edges() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let t = delaunay(&pts);
        assert_eq!(t.triangles.len(), 2);
        assert_eq!(t.edges.len(), 5); // four sides plus one diagonal
        for &(u, v) in &t.edges {
            assert!(u < v && v < 4);
        }
    }

    #[test]
    fn collinear_points_chain() {
        let pts = [[0.0, 0.0], [3.0, 0.0], [1.0, 0.0], [2.0, 0.0]];
        let t = delaunay(&pts);
        assert!(t.triangles.is_empty());
        assert_eq!(t.edges.len(), 3);
        assert!(t.edges.contains(&(0, 2)));
        assert!(t.edges.contains(&(1, 3)));
    }

    #[test]
    fn delaunay_empty_circumcircles() {
        let pts = [
            [0.0, 0.0],
            [2.0, 0.1],
            [4.0, 0.0],
            [1.0, 2.0],
            [3.0, 2.2],
            [2.0, 4.0],
        ];
        let t = delaunay(&pts);
        for tri in &t.triangles {
            let (a, b, c) = (pts[tri[0]], pts[tri[1]], pts[tri[2]]);
            let (a, b, c) = if cross(a, b, c) > 0.0 { (a, b, c) } else { (a, c, b) };
            for (i, p) in pts.iter().enumerate() {
                if tri.contains(&i) {
                    continue;
                }
                assert!(
                    !in_circumcircle(a, b, c, *p),
                    "point {i} inside circumcircle of {tri:?}"
                );
            }
        }
    }

    #[test]
    fn rng_is_subset_of_delaunay() {
        let pts = [
            [0.0, 0.0],
            [1.0, 0.0],
            [0.5, 0.9],
            [2.0, 0.5],
            [1.2, 1.5],
        ];
        let t = delaunay(&pts);
        let rng = relative_neighborhood(&t);
        assert!(!rng.is_empty());
        for e in &rng {
            assert!(t.edges.contains(e));
        }
        assert!(rng.len() <= t.edges.len());
    }

    #[test]
    fn voronoi_cells_contain_their_sites() {
        let pts = [[1.0, 1.0], [3.0, 1.0], [2.0, 3.0], [1.5, 2.0]];
        let t = delaunay(&pts);
        for (i, site) in pts.iter().enumerate() {
            let cell = voronoi_cell(&t, i, [0.0, 0.0], [4.0, 4.0]);
            assert!(cell.len() >= 3, "degenerate cell for site {i}");
            let c = polygon_centroid(&cell).unwrap();
            // the site is closer to its own centroid than any other site
            let dc = dist(*site, c);
            for (j, other) in pts.iter().enumerate() {
                if j != i {
                    assert!(dc <= dist(*other, c) + 1e-9);
                }
            }
        }
    }
}
