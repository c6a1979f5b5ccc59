//! The pipeline driver: selects a layout engine, lays out each
//! connected component, removes overlaps, routes edges, packs the
//! components, and streams the drawing through a resolved plugin.

use crate::device::Sink;
use crate::plugin::{Capabilities, PluginRegistry};
use crate::render::{ObjScope, RenderJob, TextSpan, Transform};
use gv_core::geom::{BoundBox, Point};
use gv_core::model::Spline;
use gv_core::{AttrValue, EdgeId, Graph, NodeId, ROOT};
use gv_layout::adjust::{OverlapMode, Sep, remove_overlap};
use gv_layout::ccomps::components_with_pins;
use gv_layout::graph::{NodeIndex, adjacency};
use gv_layout::pack::{PackInfo, pack_boxes, parse_packmode};
use gv_layout::spring::{Smoothing, SpringCtrl, multilevel_spring_electrical};
use gv_layout::stress::post_process_smoothing;
use gv_layout::transform::{AspectMode, apply_aspect, initial_scale, normalize_layout};
use gv_route::{Margin, Obstacle, ShapeKind, Visibility, self_loop_arcs};
use std::io;
use thiserror::Error;

/// Points per inch; node sizes are declared in inches.
const DPI: f64 = 72.0;
const DEFAULT_WIDTH_IN: f64 = 0.75;
const DEFAULT_HEIGHT_IN: f64 = 0.5;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no support for format '{0}'")]
    NoPlugin(String),
    #[error("layout engine '{0}' is not available")]
    UnknownLayout(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

// ─── Layout ──────────────────────────────────────────────────────────

/// Resolved drawable size of a node, in points.
fn node_size(g: &Graph, n: NodeId) -> Point {
    let w = g
        .node_attr(n, "width")
        .and_then(|v| v.to_double())
        .unwrap_or(DEFAULT_WIDTH_IN)
        .max(0.02);
    let h = g
        .node_attr(n, "height")
        .and_then(|v| v.to_double())
        .unwrap_or(DEFAULT_HEIGHT_IN)
        .max(0.02);
    Point::new(w * DPI, h * DPI)
}

fn spring_ctrl(g: &Graph) -> SpringCtrl {
    let mut ctrl = SpringCtrl::default();
    if let Some(v) = g.graph_attr(ROOT, "maxiter").and_then(|v| v.to_int()) {
        ctrl.maxiter = v.max(0) as usize;
    }
    if let Some(k) = g.graph_attr(ROOT, "K").and_then(|v| v.to_double()) {
        ctrl.k = k;
    }
    if let Some(seed) = g.graph_attr(ROOT, "start").and_then(|v| v.to_int()) {
        ctrl.random_seed = seed as u64;
    }
    ctrl.smoothing = match g
        .graph_attr(ROOT, "smoothing")
        .map(|v| v.as_str().to_ascii_lowercase())
        .as_deref()
    {
        Some("stress") | Some("stress_majorization") => Smoothing::StressMajorization,
        Some("spring") => Smoothing::Spring,
        Some("triangle") => Smoothing::Triangle,
        Some("rng") => Smoothing::Rng,
        _ => Smoothing::None,
    };
    ctrl
}

/// Run the layout pipeline, storing node positions and edge splines in
/// the graph. The `layout` attribute picks the engine; the
/// spring-electrical family is what this toolkit ships.
pub fn layout_graph(g: &mut Graph) -> Result<(), RenderError> {
    let engine = g
        .graph_attr(ROOT, "layout")
        .map(|v| v.as_str())
        .unwrap_or_else(|| "sfdp".to_owned());
    let multilevel = match engine.as_str() {
        "sfdp" => true,
        "fdp" | "neato" | "spring" => false,
        other => return Err(RenderError::UnknownLayout(other.to_owned())),
    };

    for n in g.nodes(ROOT).collect::<Vec<_>>() {
        let size = node_size(g, n);
        g.node_mut(n).size = size;
    }

    let comps = components_with_pins(g, ROOT);
    log::debug!(
        "layout: engine {engine}, {} nodes, {} components",
        g.node_count(),
        comps.len()
    );
    let mut comp_layouts: Vec<(NodeIndex, Vec<f64>)> = Vec::new();
    for comp in &comps {
        let ix = NodeIndex::of(comp.clone());
        let x = layout_component(g, &ix, multilevel);
        comp_layouts.push((ix, x));
    }

    // install component-local coordinates
    for (ix, x) in &comp_layouts {
        for (i, &n) in ix.nodes.iter().enumerate() {
            g.node_mut(n).pos = Some(Point::new(x[i * 2], x[i * 2 + 1]));
        }
    }

    route_edges(g, &comp_layouts);

    if comp_layouts.len() > 1 && pack_enabled(g) {
        pack_components(g, &comp_layouts);
    }

    let bb = drawing_bbox(g);
    g.set_graph_attr(
        ROOT,
        "bb",
        AttrValue::str(&format!("{},{},{},{}", bb.ll.x, bb.ll.y, bb.ur.x, bb.ur.y)),
    );
    Ok(())
}

fn layout_component(g: &Graph, ix: &NodeIndex, multilevel: bool) -> Vec<f64> {
    let n = ix.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0.0, 0.0];
    }
    let a = adjacency(g, ROOT, ix);
    let mut ctrl = spring_ctrl(g);
    ctrl.multilevel = multilevel;
    let mut x = multilevel_spring_electrical(&a, &mut ctrl);
    post_process_smoothing(&a, &ctrl, &mut x);

    // scale up so nodes have room before overlap removal
    let sizes: Vec<(f64, f64)> = ix
        .nodes
        .iter()
        .map(|&m| {
            let s = g.node(m).size;
            (s.x, s.y)
        })
        .collect();
    let edges: Vec<(usize, usize)> = (0..a.m)
        .flat_map(|i| a.row(i).iter().map(move |&j| (i, j)))
        .filter(|&(i, j)| i < j)
        .collect();
    initial_scale(&mut x, &sizes, &edges, ctrl.initial_scaling);

    if let Some(v) = g.graph_attr(ROOT, "normalize") {
        let angle = v.to_double().unwrap_or(0.0);
        let run = v.to_bool().unwrap_or(true) || v.to_double().is_some();
        if run {
            let first_edge = edges.first().copied();
            normalize_layout(&mut x, first_edge, angle);
        }
    }

    let sep = g
        .graph_attr(ROOT, "sep")
        .map(|v| Sep::parse(&v.as_str()))
        .unwrap_or_default();
    let expanded: Vec<(f64, f64)> = sizes.iter().map(|&(w, h)| sep.expand(w, h)).collect();
    let mode = g
        .graph_attr(ROOT, "overlap")
        .map(|v| OverlapMode::parse(&v.as_str()))
        .unwrap_or_default();
    remove_overlap(mode, &mut x, &expanded);

    if let Some(v) = g.graph_attr(ROOT, "ratio") {
        let mode = match v.as_str().to_ascii_lowercase().as_str() {
            "fill" => target_size(g).map(|(w, h)| AspectMode::Fill {
                width: w,
                height: h,
            }),
            "expand" => target_size(g).map(|(w, h)| AspectMode::Expand {
                width: w,
                height: h,
            }),
            _ => v.to_double().map(AspectMode::Value),
        };
        if let Some(mode) = mode {
            apply_aspect(mode, &mut x);
        }
    }
    x
}

/// The `size` attribute, converted to points.
fn target_size(g: &Graph) -> Option<(f64, f64)> {
    let v = g.graph_attr(ROOT, "size")?;
    let s = v.as_str();
    let mut it = s.split(',').map(|p| p.trim().parse::<f64>());
    match (it.next(), it.next()) {
        (Some(Ok(w)), Some(Ok(h))) => Some((w * DPI, h * DPI)),
        (Some(Ok(w)), None) => Some((w * DPI, w * DPI)),
        _ => None,
    }
}

fn pack_enabled(g: &Graph) -> bool {
    match g.graph_attr(ROOT, "pack") {
        Some(v) => v.to_bool().unwrap_or(true) || v.to_int().is_some(),
        None => true,
    }
}

// ─── Routing ─────────────────────────────────────────────────────────

/// Obstacle margin from `esep`, the edge-routing analog of `sep`.
fn route_margin(g: &Graph) -> Margin {
    match g.graph_attr(ROOT, "esep") {
        Some(v) => {
            let sep = Sep::parse(&v.as_str());
            Margin {
                additive: sep.additive,
                x: sep.x,
                y: sep.y,
            }
        }
        None => Margin::default(),
    }
}

fn node_shape(g: &Graph, n: NodeId) -> ShapeKind {
    let shape = g
        .node_attr(n, "shape")
        .map(|v| v.as_str())
        .unwrap_or_default();
    let sides = g
        .node_attr(n, "sides")
        .and_then(|v| v.to_int())
        .map(|v| v.max(3) as usize);
    ShapeKind::parse(&shape, sides)
}

/// Endpoint on the node's drawable boundary, honoring a compass port.
/// Ellipses use the exact conic; other shapes intersect the ray with
/// their polygon.
fn endpoint_of(g: &Graph, n: NodeId, toward: Point, port: Option<gv_core::Port>) -> Point {
    let rec = g.node(n);
    let pos = rec.pos.unwrap_or(Point::ZERO);
    if let Some(compass) = port.and_then(|p| p.compass) {
        let u = compass.unit_offset();
        return Point::new(pos.x + u.x * rec.size.x / 2.0, pos.y + u.y * rec.size.y / 2.0);
    }
    let shape = node_shape(g, n);
    if shape == ShapeKind::Ellipse {
        let d = toward - pos;
        let (rx, ry) = (rec.size.x / 2.0, rec.size.y / 2.0);
        let q = (d.x / rx).hypot(d.y / ry);
        if q > 0.0 {
            return pos + d * (1.0 / q);
        }
        return pos;
    }
    let poly = Obstacle::for_node(
        pos,
        rec.size.x,
        rec.size.y,
        shape,
        &Margin {
            additive: true,
            x: 0.0,
            y: 0.0,
        },
    );
    poly.boundary_toward(pos, toward)
}

fn route_edges(g: &mut Graph, comps: &[(NodeIndex, Vec<f64>)]) {
    let margin = route_margin(g);
    let want_splines = g
        .graph_attr(ROOT, "splines")
        .map(|v| {
            let s = v.as_str().to_ascii_lowercase();
            s != "line" && s != "false" && s != "none"
        })
        .unwrap_or(true);

    for (ix, _) in comps {
        let obstacles: Vec<Obstacle> = ix
            .nodes
            .iter()
            .map(|&n| {
                let rec = g.node(n);
                Obstacle::for_node(
                    rec.pos.unwrap_or(Point::ZERO),
                    rec.size.x,
                    rec.size.y,
                    node_shape(g, n),
                    &margin,
                )
            })
            .collect();
        let vis = Visibility::new(obstacles);

        let edges: Vec<EdgeId> = g
            .edges(ROOT)
            .filter(|&e| ix.ix(g.edge(e).tail).is_some())
            .collect();
        let mut routed: std::collections::HashSet<EdgeId> = Default::default();
        for e in edges {
            if routed.contains(&e) {
                continue;
            }
            let (tail, head) = {
                let er = g.edge(e);
                (er.tail, er.head)
            };
            if tail == head {
                route_self_loops(g, tail, &mut routed);
                continue;
            }
            // the lowest-sequence parallel edge routes; siblings copy
            let bundle = g.parallel_edges(e);
            let primary = bundle[0];
            let (tp, hp) = {
                let er = g.edge(primary);
                (er.tail_port, er.head_port)
            };
            let tail_pos = g.node(tail).pos.unwrap_or(Point::ZERO);
            let head_pos = g.node(head).pos.unwrap_or(Point::ZERO);
            let from = endpoint_of(g, tail, head_pos, tp);
            let to = endpoint_of(g, head, tail_pos, hp);
            let pts = if want_splines {
                vis.route_spline(from, to)
            } else {
                let poly = vis.route(from, to);
                // polyline as degenerate cubics keeps one geometry type
                gv_route::visibility::smooth_polyline(&poly, |_| false)
            };
            let spline = Spline {
                points: pts,
                start: None,
                end: Some(to),
            };
            let mid = spline_midpoint(&spline);
            for &sib in &bundle {
                routed.insert(sib);
                let er = g.edge_mut(sib);
                er.spline = Some(spline.clone());
                er.label_pos = Some(mid);
            }
        }
    }
}

fn route_self_loops(g: &mut Graph, n: NodeId, routed: &mut std::collections::HashSet<EdgeId>) {
    let loops: Vec<EdgeId> = g
        .edges_out(ROOT, n)
        .into_iter()
        .filter(|&e| g.edge(e).head == n)
        .collect();
    let rec = g.node(n);
    let arcs = self_loop_arcs(
        rec.pos.unwrap_or(Point::ZERO),
        rec.size.x,
        rec.size.y,
        loops.len(),
    );
    for (&e, arc) in loops.iter().zip(arcs) {
        routed.insert(e);
        let er = g.edge_mut(e);
        er.spline = Some(arc.spline);
        er.label_pos = Some(arc.label_pos);
    }
}

fn spline_midpoint(s: &Spline) -> Point {
    if s.points.is_empty() {
        return Point::ZERO;
    }
    s.points[s.points.len() / 2]
}

// ─── Packing ─────────────────────────────────────────────────────────

fn component_bbox(g: &Graph, ix: &NodeIndex) -> BoundBox {
    let mut bb = BoundBox::EMPTY;
    for &n in &ix.nodes {
        let rec = g.node(n);
        let pos = rec.pos.unwrap_or(Point::ZERO);
        bb = bb.union(BoundBox::centered(pos, rec.size.x, rec.size.y));
        for e in g.edges_out(ROOT, n) {
            if let Some(spline) = &g.edge(e).spline {
                for &p in &spline.points {
                    bb = bb.expand(p);
                }
            }
        }
    }
    bb
}

fn pack_info(g: &Graph) -> PackInfo {
    let mut info = PackInfo::default();
    if let Some(v) = g.graph_attr(ROOT, "packmode") {
        info.mode = parse_packmode(&v.as_str());
    }
    if let Some(m) = g.graph_attr(ROOT, "pack").and_then(|v| v.to_int()) {
        if m > 1 {
            info.margin = m as f64;
        }
    }
    info
}

/// Shift every component by its packing translation: node positions,
/// spline control and arrow points, and label anchors move together.
fn pack_components(g: &mut Graph, comps: &[(NodeIndex, Vec<f64>)]) {
    let mut info = pack_info(g);
    // sortv on the first node of each component overrides ordering
    let vals: Vec<Option<f64>> = comps
        .iter()
        .map(|(ix, _)| {
            ix.nodes
                .first()
                .and_then(|&n| g.node_attr(n, "sortv"))
                .and_then(|v| v.to_double())
        })
        .collect();
    if vals.iter().any(Option::is_some) {
        info.user_order = Some(
            vals.into_iter()
                .map(|v| v.unwrap_or(f64::INFINITY))
                .collect(),
        );
    }
    let boxes: Vec<BoundBox> = comps.iter().map(|(ix, _)| component_bbox(g, ix)).collect();
    let shifts = pack_boxes(&boxes, &info);
    for ((ix, _), delta) in comps.iter().zip(shifts) {
        for &n in &ix.nodes {
            let rec = g.node_mut(n);
            if let Some(p) = rec.pos.as_mut() {
                *p += delta;
            }
        }
        let edges: Vec<EdgeId> = g
            .edges(ROOT)
            .filter(|&e| ix.ix(g.edge(e).tail).is_some())
            .collect();
        for e in edges {
            let er = g.edge_mut(e);
            if let Some(s) = er.spline.as_mut() {
                for p in s.points.iter_mut() {
                    *p += delta;
                }
                if let Some(p) = s.start.as_mut() {
                    *p += delta;
                }
                if let Some(p) = s.end.as_mut() {
                    *p += delta;
                }
            }
            if let Some(p) = er.label_pos.as_mut() {
                *p += delta;
            }
        }
    }
}

fn drawing_bbox(g: &Graph) -> BoundBox {
    let mut bb = BoundBox::EMPTY;
    for n in g.nodes(ROOT) {
        let rec = g.node(n);
        let pos = rec.pos.unwrap_or(Point::ZERO);
        bb = bb.union(BoundBox::centered(pos, rec.size.x, rec.size.y));
    }
    for e in g.edges(ROOT) {
        if let Some(s) = &g.edge(e).spline {
            for &p in &s.points {
                bb = bb.expand(p);
            }
        }
    }
    if bb.is_empty() {
        BoundBox::new(Point::ZERO, Point::ZERO)
    } else {
        bb
    }
}

// ─── Rendering ───────────────────────────────────────────────────────

/// Render a laid-out graph through the plugin selected by `format`.
/// Returns the output bytes when the sink was an in-memory buffer.
pub fn render_graph(
    g: &Graph,
    registry: &PluginRegistry,
    format: &str,
    sink: Sink,
) -> Result<Option<Vec<u8>>, RenderError> {
    let spec = registry
        .resolve(format)
        .ok_or_else(|| RenderError::NoPlugin(format.to_owned()))?;
    log::debug!("render: format '{format}' resolved to {spec:?}");
    let mut renderer = (spec.make)();
    let mut sink = if spec.caps.contains(Capabilities::COMPRESSED) {
        sink.compressed()
    } else {
        sink
    };

    let bb = drawing_bbox(g);
    let dpi = g
        .graph_attr(ROOT, "dpi")
        .and_then(|v| v.to_double())
        .filter(|d| *d > 0.0)
        .unwrap_or(DPI);
    let rotate90 = g
        .graph_attr(ROOT, "rotate")
        .and_then(|v| v.to_int())
        .is_some_and(|r| r == 90);
    let transform = Transform {
        translate: Point::new(-bb.ll.x, -bb.ll.y),
        zoom: 1.0,
        dpi,
        rotate90,
        offset: Point::ZERO,
    };

    let raw = spec.caps.contains(Capabilities::RAW_COORDS);
    let mut job = RenderJob::new(&mut sink, transform, raw);
    emit(g, renderer.as_mut(), &mut job, bb)?;
    Ok(sink.finish()?)
}

fn emit(
    g: &Graph,
    r: &mut dyn crate::render::Renderer,
    job: &mut RenderJob,
    bb: BoundBox,
) -> Result<(), RenderError> {
    r.begin_job(job)?;
    job.push_scope(ObjScope::Graph);
    r.begin_graph(job, g.name().as_str(), bb)?;

    for sub in g.subgraphs_of(ROOT) {
        let sg = g.subgraph(*sub);
        if !sg.is_cluster() {
            continue;
        }
        job.push_scope(ObjScope::Cluster);
        r.begin_cluster(job, sg.name.as_str())?;
        let cb = cluster_bbox(g, *sub);
        if !cb.is_empty() {
            let pts = [
                job.map(cb.ll),
                job.map(Point::new(cb.ll.x, cb.ur.y)),
                job.map(cb.ur),
                job.map(Point::new(cb.ur.x, cb.ll.y)),
            ];
            r.polygon(job, &pts, false)?;
        }
        r.end_cluster(job)?;
        job.pop_scope();
    }

    r.begin_nodes(job)?;
    for n in g.nodes(ROOT) {
        emit_node(g, r, job, n)?;
    }
    r.end_nodes(job)?;

    r.begin_edges(job)?;
    for e in g.edges(ROOT) {
        emit_edge(g, r, job, e)?;
    }
    r.end_edges(job)?;

    r.end_graph(job)?;
    job.pop_scope();
    r.end_job(job)?;
    Ok(())
}

fn cluster_bbox(g: &Graph, sub: gv_core::GraphId) -> BoundBox {
    let mut bb = BoundBox::EMPTY;
    for n in g.nodes(sub) {
        let rec = g.node(n);
        if let Some(pos) = rec.pos {
            bb = bb.union(BoundBox::centered(pos, rec.size.x, rec.size.y));
        }
    }
    bb
}

fn emit_node(
    g: &Graph,
    r: &mut dyn crate::render::Renderer,
    job: &mut RenderJob,
    n: NodeId,
) -> Result<(), RenderError> {
    let rec = g.node(n);
    let name = rec.name.as_str();
    let pos = rec.pos.unwrap_or(Point::ZERO);
    job.push_scope(ObjScope::Node);
    r.begin_node(job, name)?;
    job.style = g
        .node_attr(n, "style")
        .map(|v| crate::render::parse_style(&v.as_str()))
        .unwrap_or_default();
    job.pen = g
        .node_attr(n, "color")
        .map(|v| crate::color::resolve_color(&v.as_str(), None))
        .unwrap_or_else(crate::color::black);
    if let Some(fc) = g.node_attr(n, "fillcolor") {
        job.fill = crate::color::resolve_color(&fc.as_str(), None);
    }

    let href = g
        .node_attr(n, "href")
        .or_else(|| g.node_attr(n, "URL"))
        .map(|v| v.as_str());
    let tooltip = g.node_attr(n, "tooltip").map(|v| v.as_str());
    if let Some(href) = &href {
        r.begin_anchor(job, href, tooltip.as_deref())?;
        job.push_scope(ObjScope::Anchor);
    }

    let filled = job.style.contains(crate::render::StyleFlags::FILLED);
    match node_shape(g, n) {
        ShapeKind::Ellipse => {
            let c = job.map(pos);
            let s = if job.raw_coords { 1.0 } else { job.transform.scale() };
            r.ellipse(job, c, rec.size.x / 2.0 * s, rec.size.y / 2.0 * s, filled)?;
        }
        shape => {
            let ob = Obstacle::for_node(
                pos,
                rec.size.x,
                rec.size.y,
                shape,
                &Margin {
                    additive: true,
                    x: 0.0,
                    y: 0.0,
                },
            );
            let pts: Vec<Point> = ob.verts.iter().map(|&p| job.map(p)).collect();
            r.polygon(job, &pts, filled)?;
        }
    }

    let font = g
        .node_attr(n, "fontname")
        .map(|v| v.as_str())
        .unwrap_or_else(|| "Times-Roman".to_owned());
    let size = g
        .node_attr(n, "fontsize")
        .and_then(|v| v.to_double())
        .unwrap_or(14.0);
    let at = job.map(pos);
    // default node label is the node's name
    match g.node_attr(n, "label") {
        Some(AttrValue::Html(raw)) => {
            // structured labels emit one textspan per styled run
            if let Ok(tree) = gv_core::html::parse_label(raw.as_str()) {
                job.push_scope(ObjScope::Label);
                for span in html_spans(&tree) {
                    let ts = TextSpan {
                        text: span.text.clone(),
                        font: span.font.face.clone().unwrap_or_else(|| font.clone()),
                        size: span.font.point_size.unwrap_or(size),
                        justify: 0,
                    };
                    r.textspan(job, at, &ts)?;
                }
                job.pop_scope();
            }
        }
        other => {
            let label = other.map(|v| v.as_str()).unwrap_or_else(|| name.to_owned());
            if !label.is_empty() {
                job.push_scope(ObjScope::Label);
                let span = TextSpan {
                    text: label,
                    font,
                    size,
                    justify: 0,
                };
                r.textspan(job, at, &span)?;
                job.pop_scope();
            }
        }
    }

    if href.is_some() {
        job.pop_scope();
        r.end_anchor(job)?;
    }
    r.end_node(job)?;
    job.pop_scope();
    Ok(())
}

fn emit_edge(
    g: &Graph,
    r: &mut dyn crate::render::Renderer,
    job: &mut RenderJob,
    e: EdgeId,
) -> Result<(), RenderError> {
    let er = g.edge(e);
    job.push_scope(ObjScope::Edge);
    r.begin_edge(job, g.node(er.tail).name.as_str(), g.node(er.head).name.as_str())?;
    job.style = g
        .edge_attr(e, "style")
        .map(|v| crate::render::parse_style(&v.as_str()))
        .unwrap_or_default();
    if let Some(s) = &er.spline {
        let pts: Vec<Point> = s.points.iter().map(|&p| job.map(p)).collect();
        r.bezier(job, &pts, g.desc.directed)?;
    }
    if let Some(label) = g.edge_attr(e, "label") {
        if let Some(at) = er.label_pos {
            job.push_scope(ObjScope::Label);
            let span = TextSpan {
                text: label.as_str(),
                font: "Times-Roman".to_owned(),
                size: 14.0,
                justify: 0,
            };
            let at = job.map(at);
            r.textspan(job, at, &span)?;
            job.pop_scope();
        }
    }
    r.end_edge(job)?;
    job.pop_scope();
    Ok(())
}

/// All text runs of a label tree, in document order.
fn html_spans(label: &gv_core::html::Label) -> Vec<gv_core::html::TextSpan> {
    use gv_core::html::{CellContent, Label};
    fn lines(out: &mut Vec<gv_core::html::TextSpan>, ls: &[gv_core::html::TextLine]) {
        for line in ls {
            out.extend(line.spans.iter().cloned());
        }
    }
    fn table(out: &mut Vec<gv_core::html::TextSpan>, t: &gv_core::html::Table) {
        for row in &t.rows {
            for cell in &row.cells {
                match &cell.content {
                    CellContent::Text(ls) => lines(out, ls),
                    CellContent::Table(inner) => table(out, inner),
                    CellContent::Image(_) | CellContent::Empty => {}
                }
            }
        }
    }
    let mut out = Vec::new();
    match label {
        Label::Text(ls) => lines(&mut out, ls),
        Label::Table(t) => table(&mut out, t),
    }
    out
}

/// Parse, lay out, and render a graph source in one call, to an
/// in-memory buffer.
pub fn render_source(
    source: &str,
    format: &str,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut g = gv_core::parse_graph(source)?;
    layout_graph(&mut g)?;
    let registry = PluginRegistry::builtin();
    let out = render_graph(&g, &registry, format, Sink::buffer())?;
    Ok(out.expect("buffer sink returns bytes"))
}
