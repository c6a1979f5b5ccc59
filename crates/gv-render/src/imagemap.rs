//! The image-map device family (`cmap`, `cmapx`, `imap`, `ismap`):
//! renders nothing but anchor shape records.

use crate::render::{ObjScope, RenderJob, Renderer};
use gv_core::geom::{BoundBox, Point};
use gv_core::html::escape_entities;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFlavor {
    /// Client-side map body lines.
    Cmap,
    /// XHTML `<map>` element.
    Cmapx,
    /// Server-side `imap` file.
    Imap,
    /// Old-style `ismap` file.
    Ismap,
}

#[derive(Debug, Clone, PartialEq)]
enum MapShape {
    Rect(BoundBox),
    Circle(Point, f64),
    Poly(Vec<Point>),
}

#[derive(Debug)]
struct Anchor {
    href: String,
    tooltip: Option<String>,
    shapes: Vec<MapShape>,
}

pub struct ImageMapRenderer {
    flavor: MapFlavor,
    current: Option<Anchor>,
}

impl ImageMapRenderer {
    pub fn new(flavor: MapFlavor) -> Self {
        Self {
            flavor,
            current: None,
        }
    }

    fn emit_anchor(&mut self, job: &mut RenderJob, anchor: Anchor) -> io::Result<()> {
        for shape in &anchor.shapes {
            match self.flavor {
                MapFlavor::Cmapx => {
                    let coords = coords_of(shape);
                    let shape_name = shape_name(shape);
                    let title = anchor
                        .tooltip
                        .as_deref()
                        .map(|t| format!(" title=\"{}\"", escape_entities(t)))
                        .unwrap_or_default();
                    writeln!(
                        job.sink,
                        "<area shape=\"{shape_name}\" href=\"{}\"{title} coords=\"{coords}\"/>",
                        escape_entities(&anchor.href)
                    )?;
                }
                MapFlavor::Cmap | MapFlavor::Imap => {
                    writeln!(
                        job.sink,
                        "{} {} {}",
                        shape_name(shape),
                        anchor.href,
                        coords_of(shape)
                    )?;
                }
                MapFlavor::Ismap => {
                    if let MapShape::Rect(bb) = shape {
                        writeln!(
                            job.sink,
                            "rectangle ({},{}) ({},{}) {}",
                            bb.ll.x.round(),
                            bb.ll.y.round(),
                            bb.ur.x.round(),
                            bb.ur.y.round(),
                            anchor.href
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn shape_name(s: &MapShape) -> &'static str {
    match s {
        MapShape::Rect(_) => "rect",
        MapShape::Circle(..) => "circle",
        MapShape::Poly(_) => "poly",
    }
}

fn coords_of(s: &MapShape) -> String {
    match s {
        MapShape::Rect(bb) => format!(
            "{},{},{},{}",
            bb.ll.x.round(),
            bb.ll.y.round(),
            bb.ur.x.round(),
            bb.ur.y.round()
        ),
        MapShape::Circle(c, r) => format!("{},{},{}", c.x.round(), c.y.round(), r.round()),
        MapShape::Poly(pts) => pts
            .iter()
            .map(|p| format!("{},{}", p.x.round(), p.y.round()))
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Axis-aligned quads collapse to `rect` records.
fn classify_polygon(pts: &[Point]) -> MapShape {
    if pts.len() == 4 {
        let mut bb = BoundBox::EMPTY;
        for &p in pts {
            bb = bb.expand(p);
        }
        let on_corner = |p: Point| {
            (p.x == bb.ll.x || p.x == bb.ur.x) && (p.y == bb.ll.y || p.y == bb.ur.y)
        };
        if pts.iter().all(|&p| on_corner(p)) {
            return MapShape::Rect(bb);
        }
    }
    MapShape::Poly(pts.to_vec())
}

impl Renderer for ImageMapRenderer {
    fn begin_graph(&mut self, job: &mut RenderJob, name: &str, _bb: BoundBox) -> io::Result<()> {
        if self.flavor == MapFlavor::Cmapx {
            let id = if name.is_empty() { "G" } else { name };
            writeln!(
                job.sink,
                "<map id=\"{0}\" name=\"{0}\">",
                escape_entities(id)
            )?;
        }
        Ok(())
    }

    fn end_graph(&mut self, job: &mut RenderJob) -> io::Result<()> {
        if self.flavor == MapFlavor::Cmapx {
            writeln!(job.sink, "</map>")?;
        }
        Ok(())
    }

    fn begin_anchor(
        &mut self,
        _job: &mut RenderJob,
        href: &str,
        tooltip: Option<&str>,
    ) -> io::Result<()> {
        self.current = Some(Anchor {
            href: href.to_owned(),
            tooltip: tooltip.map(str::to_owned),
            shapes: Vec::new(),
        });
        Ok(())
    }

    fn end_anchor(&mut self, job: &mut RenderJob) -> io::Result<()> {
        if let Some(anchor) = self.current.take() {
            self.emit_anchor(job, anchor)?;
        }
        Ok(())
    }

    fn polygon(&mut self, job: &mut RenderJob, pts: &[Point], _filled: bool) -> io::Result<()> {
        if job.scope() == Some(ObjScope::Anchor) {
            if let Some(a) = self.current.as_mut() {
                a.shapes.push(classify_polygon(pts));
            }
        }
        Ok(())
    }

    fn ellipse(
        &mut self,
        job: &mut RenderJob,
        center: Point,
        rx: f64,
        _ry: f64,
        _filled: bool,
    ) -> io::Result<()> {
        if job.scope() == Some(ObjScope::Anchor) {
            if let Some(a) = self.current.as_mut() {
                a.shapes.push(MapShape::Circle(center, rx));
            }
        }
        Ok(())
    }
}

/// Non-capturing constructor for the plugin table.
pub fn make_map_renderer(flavor: MapFlavor) -> fn() -> Box<dyn Renderer> {
    match flavor {
        MapFlavor::Cmap => || Box::new(ImageMapRenderer::new(MapFlavor::Cmap)),
        MapFlavor::Cmapx => || Box::new(ImageMapRenderer::new(MapFlavor::Cmapx)),
        MapFlavor::Imap => || Box::new(ImageMapRenderer::new(MapFlavor::Imap)),
        MapFlavor::Ismap => || Box::new(ImageMapRenderer::new(MapFlavor::Ismap)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Sink;
    use crate::render::Transform;

    fn run(flavor: MapFlavor) -> String {
        let mut sink = Sink::buffer();
        let mut job = RenderJob::new(&mut sink, Transform::default(), false);
        let mut r = ImageMapRenderer::new(flavor);
        r.begin_graph(&mut job, "g", BoundBox::EMPTY).unwrap();
        job.push_scope(ObjScope::Node);
        r.begin_anchor(&mut job, "http://example.com/a", Some("tip & more"))
            .unwrap();
        job.push_scope(ObjScope::Anchor);
        r.polygon(
            &mut job,
            &[
                Point::new(0.0, 0.0),
                Point::new(0.0, 10.0),
                Point::new(20.0, 10.0),
                Point::new(20.0, 0.0),
            ],
            false,
        )
        .unwrap();
        job.pop_scope();
        r.end_anchor(&mut job).unwrap();
        job.pop_scope();
        r.end_graph(&mut job).unwrap();
        String::from_utf8(sink.finish().unwrap().unwrap()).unwrap()
    }

    #[test]
    fn cmapx_wraps_in_a_map_element() {
        let out = run(MapFlavor::Cmapx);
        assert!(out.starts_with("<map id=\"g\" name=\"g\">"));
        assert!(out.contains("shape=\"rect\""));
        assert!(out.contains("coords=\"0,0,20,10\""));
        assert!(out.contains("title=\"tip &amp; more\""));
        assert!(out.trim_end().ends_with("</map>"));
    }

    #[test]
    fn cmap_emits_plain_records() {
        let out = run(MapFlavor::Cmap);
        assert_eq!(out.trim(), "rect http://example.com/a 0,0,20,10");
    }

    #[test]
    fn ismap_emits_rectangles() {
        let out = run(MapFlavor::Ismap);
        assert!(out.starts_with("rectangle (0,0) (20,10)"));
    }

    #[test]
    fn geometry_outside_anchor_scope_is_ignored() {
        let mut sink = Sink::buffer();
        let mut job = RenderJob::new(&mut sink, Transform::default(), false);
        let mut r = ImageMapRenderer::new(MapFlavor::Cmap);
        job.push_scope(ObjScope::Node);
        r.polygon(&mut job, &[Point::ZERO, Point::new(1.0, 0.0)], false)
            .unwrap();
        job.pop_scope();
        assert!(sink.finish().unwrap().unwrap().is_empty());
    }

    #[test]
    fn circles_round_trip_center_and_radius() {
        let s = MapShape::Circle(Point::new(5.4, 6.6), 3.2);
        assert_eq!(coords_of(&s), "5,7,3");
        assert_eq!(shape_name(&s), "circle");
    }
}
