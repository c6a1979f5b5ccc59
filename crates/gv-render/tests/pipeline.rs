//! End-to-end pipeline tests: parse → layout → route → pack → render.

use gv_core::geom::{BoundBox, Point};
use gv_core::{Graph, ROOT, emit_graph, parse_graph};
use gv_layout::ccomps::connected_components;
use gv_render::{layout_graph, render_source};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn laid_out(src: &str) -> Graph {
    init_logs();
    let mut g = parse_graph(src).expect("parse");
    layout_graph(&mut g).expect("layout");
    g
}

fn node_box(g: &Graph, name: &str) -> BoundBox {
    let n = g.find_node(name).unwrap();
    let rec = g.node(n);
    BoundBox::centered(rec.pos.expect("node positioned"), rec.size.x, rec.size.y)
}

/// Point satisfies the node's ellipse equation (within 5%).
fn on_ellipse(g: &Graph, name: &str, p: Point) -> bool {
    let n = g.find_node(name).unwrap();
    let rec = g.node(n);
    let c = rec.pos.unwrap();
    let q = ((p.x - c.x) / (rec.size.x / 2.0)).hypot((p.y - c.y) / (rec.size.y / 2.0));
    (q - 1.0).abs() < 0.05
}

/// Point sits on the box frame (within tolerance).
fn on_boundary(bb: &BoundBox, p: Point, tol: f64) -> bool {
    let inside = p.x >= bb.ll.x - tol
        && p.x <= bb.ur.x + tol
        && p.y >= bb.ll.y - tol
        && p.y <= bb.ur.y + tol;
    let strictly_inside = p.x > bb.ll.x + tol
        && p.x < bb.ur.x - tol
        && p.y > bb.ll.y + tol
        && p.y < bb.ur.y - tol;
    inside && !strictly_inside
}

#[test]
fn two_node_digraph_lays_out_and_round_trips() {
    let g = laid_out("digraph { a -> b }");
    let a = g.find_node("a").unwrap();
    let b = g.find_node("b").unwrap();
    let pa = g.node(a).pos.unwrap();
    let pb = g.node(b).pos.unwrap();
    assert!(pa.dist(pb) > 1.0, "nodes must separate");

    let e = g.edges(ROOT).next().unwrap();
    let spline = g.edge(e).spline.as_ref().expect("edge routed");
    let first = spline.points[0];
    let last = *spline.points.last().unwrap();
    // endpoints land on each node's elliptical boundary
    assert!(
        on_ellipse(&g, "a", first) || on_ellipse(&g, "b", first),
        "spline start {first:?} not on a node boundary"
    );
    assert!(
        on_ellipse(&g, "a", last) || on_ellipse(&g, "b", last),
        "spline end {last:?} not on a node boundary"
    );

    // serialize and re-parse: same structure
    let text = emit_graph(&g);
    let g2 = parse_graph(&text).expect("re-parse");
    assert_eq!(g2.node_count(), 2);
    assert_eq!(g2.edge_count(), 1);
    assert!(g2.desc.directed);
}

#[test]
fn strict_triangle_has_sane_aspect() {
    let g = laid_out("strict graph { a -- b -- c -- a }");
    assert_eq!(g.node_count(), 3);
    assert_eq!(g.edge_count(), 3);
    let mut bb = BoundBox::EMPTY;
    for name in ["a", "b", "c"] {
        bb = bb.union(node_box(&g, name));
    }
    let ratio = bb.height() / bb.width();
    assert!(
        (0.5..=2.0).contains(&ratio),
        "triangle bounding box ratio {ratio}"
    );
}

#[test]
fn disconnected_pairs_pack_without_overlap() {
    let g = laid_out("digraph{a;b;c;d; a->b;c->d}");
    let comps = connected_components(&g, ROOT);
    assert_eq!(comps.len(), 2);
    assert!(comps.iter().all(|c| c.len() == 2));

    let bb1 = node_box(&g, "a").union(node_box(&g, "b"));
    let bb2 = node_box(&g, "c").union(node_box(&g, "d"));
    assert!(
        !bb1.overlaps(&bb2),
        "component boxes overlap: {bb1:?} vs {bb2:?}"
    );
}

#[test]
fn packing_preserves_intra_component_geometry() {
    init_logs();
    let src = "digraph{a;b;c;d; a->b;c->d}";
    // lay out with packing disabled, then enabled, and compare deltas
    let mut free = parse_graph(&format!(
        "digraph {{ pack=false; {}",
        &src["digraph{".len()..]
    ))
    .unwrap();
    layout_graph(&mut free).unwrap();
    let packed = laid_out(src);
    for (m, n) in [("a", "b"), ("c", "d")] {
        let dm = {
            let pm = free.node(free.find_node(m).unwrap()).pos.unwrap();
            let pn = free.node(free.find_node(n).unwrap()).pos.unwrap();
            pn - pm
        };
        let dp = {
            let pm = packed.node(packed.find_node(m).unwrap()).pos.unwrap();
            let pn = packed.node(packed.find_node(n).unwrap()).pos.unwrap();
            pn - pm
        };
        assert!(
            (dm.x - dp.x).abs() < 1e-6 && (dm.y - dp.y).abs() < 1e-6,
            "packing changed {m}-{n} offset: {dm:?} vs {dp:?}"
        );
    }
}

#[test]
fn html_table_label_parses_structurally() {
    let g = laid_out(
        r#"digraph { A[label=<<TABLE BORDER="1" CELLBORDER="1"><TR><TD>x</TD><TD>y</TD></TR></TABLE>>] }"#,
    );
    let a = g.find_node("A").unwrap();
    let label = g.node_attr(a, "label").unwrap();
    assert!(label.is_html());
    let tree = gv_core::html::parse_label(&label.as_str()).unwrap();
    let gv_core::html::Label::Table(t) = tree else {
        panic!("expected a table label");
    };
    assert_eq!(t.rows.len(), 1);
    assert_eq!(t.rows[0].cells.len(), 2);
    assert_eq!(t.attrs.border, Some(1));
    assert_eq!(t.attrs.cellborder, Some(1));
}

#[test]
fn k4_with_voronoi_has_no_node_overlap() {
    let g = laid_out("digraph{overlap=voronoi; a;b;c;d; a->b;a->c;a->d;b->c;b->d;c->d}");
    let names = ["a", "b", "c", "d"];
    for i in 0..4 {
        for j in i + 1..4 {
            let bi = node_box(&g, names[i]);
            let bj = node_box(&g, names[j]);
            assert!(
                !bi.overlaps(&bj),
                "{} and {} overlap after voronoi",
                names[i],
                names[j]
            );
        }
    }
}

#[test]
fn self_loop_is_a_fan_arc_on_the_boundary() {
    let g = laid_out("digraph{ a -> a }");
    let e = g.edges(ROOT).next().unwrap();
    let spline = g.edge(e).spline.as_ref().expect("self loop routed");
    let bb = node_box(&g, "a");
    let first = spline.points[0];
    let last = *spline.points.last().unwrap();
    assert!(on_boundary(&bb, first, 1.0), "loop start {first:?}");
    assert!(on_boundary(&bb, last, 1.0), "loop end {last:?}");
    let mut len = 0.0;
    for w in spline.points.windows(2) {
        len += w[0].dist(w[1]);
    }
    assert!(
        len > bb.width().min(bb.height()) / 2.0,
        "loop length {len} too short"
    );
}

#[test]
fn cmapx_output_contains_anchors() {
    init_logs();
    let out = render_source(
        r#"digraph m { a [href="http://example.com/", shape=box]; b; a -> b }"#,
        "cmapx",
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("<map id=\"m\" name=\"m\">"), "{text}");
    assert!(text.contains("href=\"http://example.com/\""), "{text}");
    assert!(text.contains("shape=\"rect\""), "{text}");
    assert!(text.trim_end().ends_with("</map>"));
}

#[test]
fn unknown_format_reports_no_support() {
    init_logs();
    let err = render_source("digraph { a }", "png").unwrap_err();
    assert!(err.to_string().contains("no support"), "{err}");
}

#[test]
fn unknown_layout_engine_is_rejected() {
    init_logs();
    let mut g = parse_graph("digraph { layout=dot; a }").unwrap();
    let err = layout_graph(&mut g).unwrap_err();
    assert!(err.to_string().contains("dot"), "{err}");
}

#[test]
fn splines_line_mode_still_routes() {
    let g = laid_out("digraph { splines=line; a -> b; b -> c }");
    for e in g.edges(ROOT) {
        assert!(g.edge(e).spline.is_some());
    }
}

#[test]
fn parallel_edges_share_the_primary_route() {
    let g = laid_out("digraph { a -> b; a -> b }");
    let splines: Vec<_> = g
        .edges(ROOT)
        .map(|e| g.edge(e).spline.clone().unwrap())
        .collect();
    assert_eq!(splines.len(), 2);
    assert_eq!(splines[0], splines[1]);
}
