//! Integration tests: graph model → adjacency → layout → overlap
//! removal → packing, across the crate's modules.

use gv_core::geom::{BoundBox, Point};
use gv_core::{ROOT, parse_graph};
use gv_layout::adjust::{OverlapMode, Sep, count_overlaps, remove_overlap};
use gv_layout::ccomps::connected_components;
use gv_layout::graph::{NodeIndex, adjacency};
use gv_layout::pack::{PackInfo, pack_boxes};
use gv_layout::quadtree::{QuadTree, exact_repulsive_forces};
use gv_layout::spring::{SpringCtrl, multilevel_spring_electrical};

const NODE: (f64, f64) = (54.0, 36.0);

fn layout(src: &str) -> (gv_core::Graph, NodeIndex, Vec<f64>) {
    let g = parse_graph(src).expect("parse");
    let ix = NodeIndex::new(&g, ROOT);
    let a = adjacency(&g, ROOT, &ix);
    let mut ctrl = SpringCtrl::default();
    let x = multilevel_spring_electrical(&a, &mut ctrl);
    (g, ix, x)
}

#[test]
fn parsed_graph_lays_out_overlap_free() {
    let (_, ix, mut x) = layout("graph { a -- b -- c -- d -- a; a -- c }");
    let sep = Sep::default();
    let sizes: Vec<(f64, f64)> = (0..ix.len()).map(|_| sep.expand(NODE.0, NODE.1)).collect();
    let left = remove_overlap(OverlapMode::Voronoi, &mut x, &sizes);
    assert_eq!(left, 0);
    assert_eq!(count_overlaps(&x, &sizes), 0);
}

#[test]
fn every_overlap_mode_clears_a_dense_cluster() {
    for mode in [
        OverlapMode::Voronoi,
        OverlapMode::NScale,
        OverlapMode::OScale,
        OverlapMode::Prism,
        OverlapMode::Vpsc,
        OverlapMode::Ortho,
    ] {
        let (_, ix, mut x) = layout("digraph { a->b; a->c; a->d; b->c; b->d; c->d }");
        // shrink into guaranteed overlap first
        for v in x.iter_mut() {
            *v *= 0.01;
        }
        let sizes: Vec<(f64, f64)> = (0..ix.len()).map(|_| NODE).collect();
        let left = remove_overlap(mode, &mut x, &sizes);
        assert_eq!(left, 0, "{mode:?} left overlaps");
    }
}

#[test]
fn barnes_hut_approaches_exact_as_theta_shrinks() {
    let (_, _, x) = layout("graph { a--b--c--d--e--f--g--h--a; a--e; b--f }");
    let n = x.len() / 2;
    assert!(n >= 8);
    let mut exact = vec![0.0; x.len()];
    exact_repulsive_forces(&x, &mut exact, -1.0, 1.0);
    let err_at = |theta: f64| {
        let mut qt = QuadTree::from_points(&x, 10);
        let mut approx = vec![0.0; x.len()];
        qt.repulsive_forces(&x, &mut approx, theta, -1.0, 1.0);
        approx
            .iter()
            .zip(&exact)
            .map(|(a, e)| (a - e).abs())
            .fold(0.0f64, f64::max)
    };
    let tight = err_at(0.0);
    assert!(tight < 1e-9, "theta 0 must be exact, err {tight}");
    let loose = err_at(1.2);
    assert!(loose >= tight);
}

#[test]
fn components_lay_out_and_pack_disjointly() {
    let g = parse_graph("digraph { a->b; b->c; x->y }").unwrap();
    let comps = connected_components(&g, ROOT);
    assert_eq!(comps.len(), 2);
    let mut boxes = Vec::new();
    let mut layouts = Vec::new();
    for comp in comps {
        let ix = NodeIndex::of(comp);
        let a = adjacency(&g, ROOT, &ix);
        let mut ctrl = SpringCtrl::default();
        let x = multilevel_spring_electrical(&a, &mut ctrl);
        let mut bb = BoundBox::EMPTY;
        for i in 0..ix.len() {
            bb = bb.union(BoundBox::centered(
                Point::new(x[i * 2], x[i * 2 + 1]),
                NODE.0,
                NODE.1,
            ));
        }
        boxes.push(bb);
        layouts.push((ix, x));
    }
    let shifts = pack_boxes(&boxes, &PackInfo::default());
    let moved: Vec<BoundBox> = boxes
        .iter()
        .zip(&shifts)
        .map(|(b, s)| b.translate(*s))
        .collect();
    assert!(!moved[0].overlaps(&moved[1]));
    // intra-component deltas unchanged by the shift
    let (ix, x) = &layouts[0];
    if ix.len() >= 2 {
        let before = Point::new(x[2] - x[0], x[3] - x[1]);
        let after = Point::new(
            (x[2] + shifts[0].x) - (x[0] + shifts[0].x),
            (x[3] + shifts[0].y) - (x[1] + shifts[0].y),
        );
        assert_eq!(before, after);
    }
}
