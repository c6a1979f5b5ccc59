//! Obstacle polygons: clockwise polygonal approximations of node
//! shapes, expanded by the routing margin.

use gv_core::geom::{BoundBox, Point};

/// Shape category resolved from the `shape` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Rectangles and record shapes use their bounding box.
    Box,
    /// Ellipses are approximated by a circumscribed 8-gon.
    Ellipse,
    /// Regular polygon with an explicit vertex count.
    Polygon(usize),
}

impl ShapeKind {
    pub fn parse(s: &str, sides: Option<usize>) -> ShapeKind {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" | "rect" | "rectangle" | "square" | "record" | "mrecord" | "plaintext"
            | "none" => ShapeKind::Box,
            "ellipse" | "circle" | "oval" | "doublecircle" | "point" | "" => ShapeKind::Ellipse,
            "polygon" => ShapeKind::Polygon(sides.unwrap_or(4).max(3)),
            "triangle" => ShapeKind::Polygon(3),
            "diamond" => ShapeKind::Polygon(4),
            "pentagon" => ShapeKind::Polygon(5),
            "hexagon" => ShapeKind::Polygon(6),
            "septagon" => ShapeKind::Polygon(7),
            "octagon" => ShapeKind::Polygon(8),
            other => {
                gv_core::warn_once!("unknown shape '{other}', treating as ellipse");
                ShapeKind::Ellipse
            }
        }
    }
}

/// Routing margin around a node. Additive margins add points per side,
/// multiplicative ones scale the half-axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margin {
    pub additive: bool,
    pub x: f64,
    pub y: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Margin {
            additive: true,
            x: 3.0,
            y: 3.0,
        }
    }
}

impl Margin {
    fn half_extents(&self, w: f64, h: f64) -> (f64, f64) {
        if self.additive {
            (w / 2.0 + self.x, h / 2.0 + self.y)
        } else {
            (w / 2.0 * self.x.max(1.0), h / 2.0 * self.y.max(1.0))
        }
    }
}

/// A clockwise-ordered obstacle polygon. The shortest-path engine
/// consumes CW polygons, so construction enforces the order.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub verts: Vec<Point>,
}

impl Obstacle {
    /// Polygon for a node of drawable size `w × h` centered at `c`.
    pub fn for_node(c: Point, w: f64, h: f64, shape: ShapeKind, margin: &Margin) -> Obstacle {
        let (hx, hy) = margin.half_extents(w, h);
        let verts = match shape {
            ShapeKind::Box => vec![
                Point::new(c.x - hx, c.y - hy),
                Point::new(c.x - hx, c.y + hy),
                Point::new(c.x + hx, c.y + hy),
                Point::new(c.x + hx, c.y - hy),
            ],
            ShapeKind::Ellipse => {
                // circumscribed octagon: scale so the flats touch the
                // ellipse rather than the corners
                let scale = 1.0 / (std::f64::consts::PI / 8.0).cos();
                regular(c, hx * scale, hy * scale, 8, std::f64::consts::PI / 8.0)
            }
            ShapeKind::Polygon(n) => regular(c, hx, hy, n.max(3), std::f64::consts::FRAC_PI_2),
        };
        let mut ob = Obstacle { verts };
        ob.make_clockwise();
        ob
    }

    pub fn bbox(&self) -> BoundBox {
        let mut bb = BoundBox::EMPTY;
        for &v in &self.verts {
            bb = bb.expand(v);
        }
        bb
    }

    /// Twice the signed area; negative for clockwise vertex order
    /// (y-up convention).
    fn signed_area2(&self) -> f64 {
        let n = self.verts.len();
        let mut a = 0.0;
        for i in 0..n {
            let p = self.verts[i];
            let q = self.verts[(i + 1) % n];
            a += p.x * q.y - q.x * p.y;
        }
        a
    }

    fn make_clockwise(&mut self) {
        if self.signed_area2() > 0.0 {
            self.verts.reverse();
        }
    }

    pub fn is_clockwise(&self) -> bool {
        self.signed_area2() < 0.0
    }

    /// Strict interior test (even-odd rule); boundary points count as
    /// outside.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.verts.len();
        let mut inside = false;
        for i in 0..n {
            let a = self.verts[i];
            let b = self.verts[(i + 1) % n];
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) / (b.y - a.y);
                let xi = a.x + t * (b.x - a.x);
                if p.x < xi {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Point where the ray from the center toward `target` leaves the
    /// polygon, used to pin edge endpoints to the node boundary.
    pub fn boundary_toward(&self, center: Point, target: Point) -> Point {
        let dir = (target - center).normalized();
        if dir == Point::ZERO {
            return center;
        }
        let mut best: Option<f64> = None;
        let n = self.verts.len();
        for i in 0..n {
            let a = self.verts[i];
            let b = self.verts[(i + 1) % n];
            // solve center + t·dir on segment a..b
            let e = b - a;
            let denom = dir.cross(e);
            if denom.abs() < 1e-12 {
                continue;
            }
            let ac = a - center;
            let t = ac.cross(e) / denom;
            let u = ac.cross(dir) / denom;
            if t > 0.0 && (-1e-9..=1.0 + 1e-9).contains(&u)
                && best.is_none_or(|bt| t < bt)
            {
                best = Some(t);
            }
        }
        match best {
            Some(t) => center + dir * t,
            None => center,
        }
    }
}

fn regular(c: Point, hx: f64, hy: f64, n: usize, phase: f64) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let ang = phase + 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            Point::new(c.x + hx * ang.cos(), c.y + hy * ang.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_are_clockwise() {
        let ob = Obstacle::for_node(Point::ZERO, 2.0, 2.0, ShapeKind::Box, &Margin::default());
        assert!(ob.is_clockwise());
        assert_eq!(ob.verts.len(), 4);
    }

    #[test]
    fn additive_margin_expands_per_side() {
        let m = Margin {
            additive: true,
            x: 3.0,
            y: 1.0,
        };
        let ob = Obstacle::for_node(Point::ZERO, 10.0, 4.0, ShapeKind::Box, &m);
        let bb = ob.bbox();
        assert!((bb.width() - 16.0).abs() < 1e-12);
        assert!((bb.height() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn octagon_circumscribes_the_ellipse() {
        let ob = Obstacle::for_node(
            Point::ZERO,
            2.0,
            2.0,
            ShapeKind::Ellipse,
            &Margin {
                additive: true,
                x: 0.0,
                y: 0.0,
            },
        );
        assert_eq!(ob.verts.len(), 8);
        assert!(ob.is_clockwise());
        // every point of the unit circle is inside the octagon
        for k in 0..64 {
            let a = 2.0 * std::f64::consts::PI * k as f64 / 64.0;
            let p = Point::new(0.999 * a.cos(), 0.999 * a.sin());
            assert!(ob.contains(p), "circle point {p:?} escaped");
        }
    }

    #[test]
    fn containment_is_strict() {
        let ob = Obstacle::for_node(Point::ZERO, 2.0, 2.0, ShapeKind::Box, &Margin {
            additive: true,
            x: 0.0,
            y: 0.0,
        });
        assert!(ob.contains(Point::ZERO));
        assert!(!ob.contains(Point::new(5.0, 0.0)));
    }

    #[test]
    fn boundary_point_lies_on_the_ray() {
        let ob = Obstacle::for_node(Point::ZERO, 2.0, 2.0, ShapeKind::Box, &Margin {
            additive: true,
            x: 0.0,
            y: 0.0,
        });
        let p = ob.boundary_toward(Point::ZERO, Point::new(10.0, 0.0));
        assert!((p.x - 1.0).abs() < 1e-9 && p.y.abs() < 1e-9, "{p:?}");
    }
}
