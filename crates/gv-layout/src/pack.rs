//! Packing of component bounding boxes onto one canvas.
//!
//! Two families: grid (`array`) packing with selectable majority,
//! ordering and in-cell alignment, and polyomino packing on a grid
//! whose cell size solves a quadratic area fit, with boxes placed in
//! spiral order around the origin.

use gv_core::geom::{BoundBox, Point};
use std::collections::HashSet;

/// Max average polyomino size; drives the cell-size quadratic.
const POLY_C: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArrayFlags {
    pub column_major: bool,
    /// Keep the caller's order instead of sorting by size.
    pub input_order: bool,
    pub halign: HAlign,
    pub valign: VAlign,
}

/// Granularity of polyomino packing. Bounding rectangles are the
/// covering for every granularity; the distinction picks which boxes
/// the caller hands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Node,
    Clust,
    Graph,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PackMode {
    /// Grid packing; `Some(n)` fixes the column (or row) count.
    Array(ArrayFlags, Option<usize>),
    /// Polyomino packing around the origin.
    Poly(Granularity),
    /// Array packing tuned toward a target `height/width` ratio.
    Aspect(f64),
}

impl Default for PackMode {
    fn default() -> Self {
        PackMode::Poly(Granularity::Graph)
    }
}

/// Parse a `packmode` attribute value. Unknown strings warn and fall
/// back to the default.
pub fn parse_packmode(s: &str) -> PackMode {
    let s = s.trim();
    let low = s.to_ascii_lowercase();
    if low == "node" {
        return PackMode::Poly(Granularity::Node);
    }
    if low == "clust" || low == "cluster" {
        return PackMode::Poly(Granularity::Clust);
    }
    if low == "graph" || low.is_empty() {
        return PackMode::Poly(Granularity::Graph);
    }
    if let Some(rest) = low.strip_prefix("aspect") {
        let ratio = rest
            .strip_prefix('=')
            .and_then(|r| r.parse().ok())
            .unwrap_or(1.0);
        return PackMode::Aspect(ratio);
    }
    if let Some(rest) = low.strip_prefix("array") {
        let mut flags = ArrayFlags::default();
        let mut digits = String::new();
        for c in rest.strip_prefix('_').unwrap_or(rest).chars() {
            match c {
                'c' => flags.column_major = true,
                'u' | 'i' => flags.input_order = true,
                't' => flags.valign = VAlign::Top,
                'b' => flags.valign = VAlign::Bottom,
                'l' => flags.halign = HAlign::Left,
                'r' => flags.halign = HAlign::Right,
                d if d.is_ascii_digit() => digits.push(d),
                '_' => {}
                other => {
                    gv_core::warn_once!("unknown array packing flag '{other}'");
                }
            }
        }
        let size = digits.parse().ok().filter(|&n: &usize| n > 0);
        return PackMode::Array(flags, size);
    }
    gv_core::warn_once!("unknown packmode '{s}', using graph");
    PackMode::default()
}

#[derive(Debug, Clone)]
pub struct PackInfo {
    pub mode: PackMode,
    /// Inter-component margin in points (the `pack` attribute).
    pub margin: f64,
    /// `sortv` keys overriding the default size ordering.
    pub user_order: Option<Vec<f64>>,
}

impl Default for PackInfo {
    fn default() -> Self {
        Self {
            mode: PackMode::default(),
            margin: 8.0,
            user_order: None,
        }
    }
}

/// Pack `boxes`, returning one translation per box. Applying the
/// translations yields pairwise non-overlapping placements; geometry
/// within each box is preserved because only translations are
/// returned.
pub fn pack_boxes(boxes: &[BoundBox], info: &PackInfo) -> Vec<Point> {
    match boxes.len() {
        0 => Vec::new(),
        1 => vec![Point::new(-boxes[0].ll.x, -boxes[0].ll.y)],
        _ => match info.mode {
            PackMode::Array(flags, size) => array_pack(boxes, info, flags, size),
            PackMode::Poly(_) => poly_pack(boxes, info),
            PackMode::Aspect(ratio) => aspect_pack(boxes, info, ratio),
        },
    }
}

/// Default packing order: perimeter (height + width) descending,
/// insertion order on ties; `sortv` keys override ascending.
fn pack_order(boxes: &[BoundBox], info: &PackInfo, input_order: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    if let Some(vals) = &info.user_order {
        order.sort_by(|&a, &b| {
            let va = vals.get(a).copied().unwrap_or(0.0);
            let vb = vals.get(b).copied().unwrap_or(0.0);
            va.total_cmp(&vb).then(a.cmp(&b))
        });
    } else if !input_order {
        order.sort_by(|&a, &b| {
            let pa = boxes[a].width() + boxes[a].height();
            let pb = boxes[b].width() + boxes[b].height();
            pb.total_cmp(&pa).then(a.cmp(&b))
        });
    }
    order
}

// ─── Array packing ───────────────────────────────────────────────────

fn array_pack(
    boxes: &[BoundBox],
    info: &PackInfo,
    flags: ArrayFlags,
    size: Option<usize>,
) -> Vec<Point> {
    let ng = boxes.len();
    let (nc, nr) = {
        let fixed = size.unwrap_or((ng as f64).sqrt().ceil() as usize).max(1);
        let other = ng.div_ceil(fixed);
        if flags.column_major {
            (other, fixed)
        } else {
            (fixed, other)
        }
    };
    let order = pack_order(boxes, info, flags.input_order);

    // cell sizes: column width is its widest member, row height its
    // tallest
    let mut col_w = vec![0.0f64; nc];
    let mut row_h = vec![0.0f64; nr];
    let (mut r, mut c) = (0usize, 0usize);
    let mut cell_of = vec![(0usize, 0usize); ng];
    for &ix in &order {
        col_w[c] = col_w[c].max(boxes[ix].width() + info.margin);
        row_h[r] = row_h[r].max(boxes[ix].height() + info.margin);
        cell_of[ix] = (r, c);
        advance(&mut r, &mut c, nr, nc, flags.column_major);
    }
    // prefix positions; rows run top-down
    let mut col_x = vec![0.0f64; nc + 1];
    for i in 0..nc {
        col_x[i + 1] = col_x[i] + col_w[i];
    }
    let total_h: f64 = row_h.iter().sum();
    let mut row_y = vec![0.0f64; nr + 1];
    row_y[0] = total_h;
    for i in 0..nr {
        row_y[i + 1] = row_y[i] - row_h[i];
    }

    boxes
        .iter()
        .enumerate()
        .map(|(ix, bb)| {
            let (r, c) = cell_of[ix];
            let x = match flags.halign {
                HAlign::Left => col_x[c],
                HAlign::Right => col_x[c + 1] - bb.width(),
                HAlign::Center => (col_x[c] + col_x[c + 1] - bb.width()) / 2.0,
            };
            let y = match flags.valign {
                VAlign::Top => row_y[r] - bb.height(),
                VAlign::Bottom => row_y[r + 1],
                VAlign::Middle => (row_y[r + 1] + row_y[r] - bb.height()) / 2.0,
            };
            Point::new(x - bb.ll.x, y - bb.ll.y)
        })
        .collect()
}

fn advance(r: &mut usize, c: &mut usize, nr: usize, nc: usize, column_major: bool) {
    if column_major {
        *r += 1;
        if *r == nr {
            *r = 0;
            *c += 1;
        }
    } else {
        *c += 1;
        if *c == nc {
            *c = 0;
            *r += 1;
        }
    }
}

// ─── Polyomino packing ───────────────────────────────────────────────

/// Grid step from the quadratic `(C·ng − 1)·l² − Σ(W+H)·l − Σ(W·H)`,
/// keeping the average polyomino under `C` cells.
fn compute_step(boxes: &[BoundBox], margin: f64) -> f64 {
    let ng = boxes.len() as f64;
    let a = POLY_C * ng - 1.0;
    let mut b = 0.0;
    let mut c = 0.0;
    for bb in boxes {
        let w = bb.width() + 2.0 * margin;
        let h = bb.height() + 2.0 * margin;
        b -= w + h;
        c -= w * h;
    }
    let d = (b * b - 4.0 * a * c).max(0.0);
    let root = (-b + d.sqrt()) / (2.0 * a);
    root.max(1.0)
}

struct Poly {
    /// Grid extent in cells.
    w: i64,
    h: i64,
}

fn fits(
    at: (i64, i64),
    poly: &Poly,
    occupied: &HashSet<(i64, i64)>,
) -> bool {
    for dx in 0..poly.w {
        for dy in 0..poly.h {
            if occupied.contains(&(at.0 + dx, at.1 + dy)) {
                return false;
            }
        }
    }
    true
}

fn mark(at: (i64, i64), poly: &Poly, occupied: &mut HashSet<(i64, i64)>) {
    for dx in 0..poly.w {
        for dy in 0..poly.h {
            occupied.insert((at.0 + dx, at.1 + dy));
        }
    }
}

/// Candidate cells in an expanding square spiral around the origin.
fn spiral_place(poly: &Poly, occupied: &HashSet<(i64, i64)>) -> (i64, i64) {
    if fits((0, 0), poly, occupied) {
        return (0, 0);
    }
    for bnd in 1.. {
        let (mut x, mut y) = (0i64, -bnd);
        while x < bnd {
            if fits((x, y), poly, occupied) {
                return (x, y);
            }
            x += 1;
        }
        while y < bnd {
            if fits((x, y), poly, occupied) {
                return (x, y);
            }
            y += 1;
        }
        while x > -bnd {
            if fits((x, y), poly, occupied) {
                return (x, y);
            }
            x -= 1;
        }
        while y > -bnd {
            if fits((x, y), poly, occupied) {
                return (x, y);
            }
            y -= 1;
        }
        while x < 0 {
            if fits((x, y), poly, occupied) {
                return (x, y);
            }
            x += 1;
        }
    }
    unreachable!("spiral search always finds free space")
}

fn poly_pack(boxes: &[BoundBox], info: &PackInfo) -> Vec<Point> {
    let step = compute_step(boxes, info.margin);
    let order = pack_order(boxes, info, false);
    let mut occupied: HashSet<(i64, i64)> = HashSet::new();
    let mut places = vec![Point::ZERO; boxes.len()];
    for (k, &ix) in order.iter().enumerate() {
        let bb = boxes[ix];
        let poly = Poly {
            w: ((bb.width() + 2.0 * info.margin) / step).ceil().max(1.0) as i64,
            h: ((bb.height() + 2.0 * info.margin) / step).ceil().max(1.0) as i64,
        };
        let at = if k == 0 {
            // first placement is centered on the origin
            let centered = (-poly.w / 2, -poly.h / 2);
            if fits(centered, &poly, &occupied) {
                centered
            } else {
                spiral_place(&poly, &occupied)
            }
        } else {
            spiral_place(&poly, &occupied)
        };
        mark(at, &poly, &mut occupied);
        let target = Point::new(at.0 as f64 * step + info.margin, at.1 as f64 * step + info.margin);
        places[ix] = target - bb.ll;
    }
    places
}

fn aspect_pack(boxes: &[BoundBox], info: &PackInfo, ratio: f64) -> Vec<Point> {
    let ng = boxes.len();
    let ratio = ratio.abs().max(1e-6);
    // pick the column count whose grid comes closest to the target
    let mut best: Option<(f64, Vec<Point>)> = None;
    for nc in 1..=ng {
        let places = array_pack(boxes, info, ArrayFlags::default(), Some(nc));
        let mut bb = BoundBox::EMPTY;
        for (p, b) in places.iter().zip(boxes) {
            bb = bb.union(b.translate(*p));
        }
        let got = bb.height() / bb.width().max(1e-12);
        let err = (got - ratio).abs();
        if best.as_ref().is_none_or(|(e, _)| err < *e) {
            best = Some((err, places));
        }
    }
    best.expect("at least one grid candidate").1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes(dims: &[(f64, f64)]) -> Vec<BoundBox> {
        dims.iter()
            .map(|&(w, h)| BoundBox::new(Point::new(0.0, 0.0), Point::new(w, h)))
            .collect()
    }

    fn assert_disjoint(boxes: &[BoundBox], places: &[Point]) {
        let moved: Vec<BoundBox> = boxes
            .iter()
            .zip(places)
            .map(|(b, p)| b.translate(*p))
            .collect();
        for i in 0..moved.len() {
            for j in i + 1..moved.len() {
                assert!(
                    !moved[i].overlaps(&moved[j]),
                    "boxes {i} and {j} overlap: {:?} {:?}",
                    moved[i],
                    moved[j]
                );
            }
        }
    }

    #[test]
    fn packmode_strings() {
        assert_eq!(parse_packmode("graph"), PackMode::Poly(Granularity::Graph));
        assert_eq!(parse_packmode("clust"), PackMode::Poly(Granularity::Clust));
        assert_eq!(parse_packmode("node"), PackMode::Poly(Granularity::Node));
        match parse_packmode("array_c3") {
            PackMode::Array(flags, Some(3)) => assert!(flags.column_major),
            other => panic!("unexpected {other:?}"),
        }
        match parse_packmode("array_bl") {
            PackMode::Array(flags, None) => {
                assert_eq!(flags.valign, VAlign::Bottom);
                assert_eq!(flags.halign, HAlign::Left);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parse_packmode("aspect=2"), PackMode::Aspect(2.0));
    }

    #[test]
    fn array_pack_is_disjoint() {
        let bs = boxes(&[(10.0, 5.0), (3.0, 8.0), (6.0, 6.0), (2.0, 2.0), (7.0, 3.0)]);
        let info = PackInfo::default();
        let places = array_pack(&bs, &info, ArrayFlags::default(), None);
        assert_disjoint(&bs, &places);
    }

    #[test]
    fn poly_pack_is_disjoint_and_centered() {
        let bs = boxes(&[(40.0, 20.0), (10.0, 10.0), (25.0, 5.0), (5.0, 30.0)]);
        let places = pack_boxes(&bs, &PackInfo::default());
        assert_disjoint(&bs, &places);
        // the largest box is placed around the origin
        let biggest = bs[0].translate(places[0]);
        assert!(biggest.ll.x <= 0.0 && biggest.ur.x >= 0.0);
    }

    #[test]
    fn translations_preserve_intra_geometry() {
        // two points in the same box keep their relative offset
        let bs = boxes(&[(10.0, 10.0), (10.0, 10.0)]);
        let places = pack_boxes(&bs, &PackInfo::default());
        let (p, q) = (Point::new(1.0, 2.0), Point::new(4.0, 7.0));
        let moved_p = p + places[0];
        let moved_q = q + places[0];
        assert_eq!(moved_q - moved_p, q - p);
    }

    #[test]
    fn sortv_overrides_order() {
        let bs = boxes(&[(2.0, 2.0), (10.0, 10.0)]);
        let info = PackInfo {
            user_order: Some(vec![0.0, 1.0]),
            ..Default::default()
        };
        let places = pack_boxes(&bs, &info);
        // the small box won first placement and is centered
        let small = bs[0].translate(places[0]);
        assert!(small.ll.x <= 0.0 && small.ur.x >= 0.0, "{small:?}");
        assert_disjoint(&bs, &places);
    }

    #[test]
    fn aspect_mode_reaches_ratio() {
        let bs = boxes(&[(10.0, 10.0); 4]);
        let places = pack_boxes(
            &bs,
            &PackInfo {
                mode: PackMode::Aspect(1.0),
                ..Default::default()
            },
        );
        assert_disjoint(&bs, &places);
        let mut bb = BoundBox::EMPTY;
        for (p, b) in places.iter().zip(&bs) {
            bb = bb.union(b.translate(*p));
        }
        let ratio = bb.height() / bb.width();
        assert!((0.5..=2.0).contains(&ratio), "ratio {ratio}");
    }
}
