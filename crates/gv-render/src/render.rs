//! The renderer interface: one render job is a stream of callbacks
//! from begin-job to end-job, with geometry passed through the job's
//! coordinate transform unless the plugin asked for raw coordinates.

use crate::device::Sink;
use bitflags::bitflags;
use gv_core::geom::{BoundBox, Point};
use peniko::Color;
use std::io;

bitflags! {
    /// Drawing style bits resolved from the `style` attribute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StyleFlags: u16 {
        const DASHED    = 1 << 0;
        const DOTTED    = 1 << 1;
        const BOLD      = 1 << 2;
        const INVISIBLE = 1 << 3;
        const FILLED    = 1 << 4;
        const ROUNDED   = 1 << 5;
        const RADIAL    = 1 << 6;
        const DIAGONALS = 1 << 7;
    }
}

/// Parse a `style` list (comma or space separated).
pub fn parse_style(s: &str) -> StyleFlags {
    let mut flags = StyleFlags::empty();
    for item in s.split([',', ' ']).filter(|i| !i.is_empty()) {
        flags |= match item.trim().to_ascii_lowercase().as_str() {
            "dashed" => StyleFlags::DASHED,
            "dotted" => StyleFlags::DOTTED,
            "bold" => StyleFlags::BOLD,
            "invis" | "invisible" => StyleFlags::INVISIBLE,
            "filled" => StyleFlags::FILLED,
            "rounded" => StyleFlags::ROUNDED,
            "radial" => StyleFlags::RADIAL,
            "diagonals" => StyleFlags::DIAGONALS,
            "solid" => StyleFlags::empty(),
            other => {
                gv_core::warn_once!("unknown style '{other}'");
                StyleFlags::empty()
            }
        };
    }
    flags
}

/// Coordinate transform from layout space to device space: graph
/// translation, zoom, device scale (dpi / 72), optional 90° rotation,
/// then a device-space offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translate: Point,
    pub zoom: f64,
    pub dpi: f64,
    pub rotate90: bool,
    pub offset: Point,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            translate: Point::ZERO,
            zoom: 1.0,
            dpi: 72.0,
            rotate90: false,
            offset: Point::ZERO,
        }
    }
}

impl Transform {
    pub fn scale(&self) -> f64 {
        self.zoom * self.dpi / 72.0
    }

    pub fn apply(&self, p: Point) -> Point {
        let s = self.scale();
        let moved = (p + self.translate) * s;
        let rotated = if self.rotate90 {
            Point::new(-moved.y, moved.x)
        } else {
            moved
        };
        rotated + self.offset
    }
}

/// Current object scope of the callback stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjScope {
    Graph,
    Cluster,
    Node,
    Edge,
    Anchor,
    Label,
}

/// Per-job state threaded through every callback. Lives from
/// begin-job to end-job.
pub struct RenderJob<'a> {
    pub sink: &'a mut Sink,
    pub transform: Transform,
    /// Plugin capability: geometry callbacks receive raw coordinates.
    pub raw_coords: bool,
    pub pen: Color,
    pub fill: Color,
    pub style: StyleFlags,
    scopes: Vec<ObjScope>,
}

impl<'a> RenderJob<'a> {
    pub fn new(sink: &'a mut Sink, transform: Transform, raw_coords: bool) -> RenderJob<'a> {
        RenderJob {
            sink,
            transform,
            raw_coords,
            pen: crate::color::black(),
            fill: crate::color::black(),
            style: StyleFlags::empty(),
            scopes: Vec::new(),
        }
    }

    /// Map a layout point for a geometry callback.
    pub fn map(&self, p: Point) -> Point {
        if self.raw_coords {
            p
        } else {
            self.transform.apply(p)
        }
    }

    pub fn push_scope(&mut self, s: ObjScope) {
        self.scopes.push(s);
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn scope(&self) -> Option<ObjScope> {
        self.scopes.last().copied()
    }
}

/// A text span to draw: the label layer keeps fonts by name only;
/// metric acquisition belongs to external collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub font: String,
    pub size: f64,
    /// -1 left, 0 center, 1 right of the anchor point.
    pub justify: i8,
}

/// The renderer callback surface. Every method defaults to a no-op so
/// devices implement only what they draw.
#[allow(unused_variables)]
pub trait Renderer {
    fn begin_job(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn end_job(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn begin_graph(&mut self, job: &mut RenderJob, name: &str, bb: BoundBox) -> io::Result<()> {
        Ok(())
    }
    fn end_graph(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn begin_cluster(&mut self, job: &mut RenderJob, name: &str) -> io::Result<()> {
        Ok(())
    }
    fn end_cluster(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn begin_nodes(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn end_nodes(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn begin_node(&mut self, job: &mut RenderJob, name: &str) -> io::Result<()> {
        Ok(())
    }
    fn end_node(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn begin_edges(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn end_edges(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn begin_edge(&mut self, job: &mut RenderJob, tail: &str, head: &str) -> io::Result<()> {
        Ok(())
    }
    fn end_edge(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn begin_anchor(
        &mut self,
        job: &mut RenderJob,
        href: &str,
        tooltip: Option<&str>,
    ) -> io::Result<()> {
        Ok(())
    }
    fn end_anchor(&mut self, job: &mut RenderJob) -> io::Result<()> {
        Ok(())
    }
    fn polygon(&mut self, job: &mut RenderJob, pts: &[Point], filled: bool) -> io::Result<()> {
        Ok(())
    }
    fn ellipse(
        &mut self,
        job: &mut RenderJob,
        center: Point,
        rx: f64,
        ry: f64,
        filled: bool,
    ) -> io::Result<()> {
        Ok(())
    }
    fn polyline(&mut self, job: &mut RenderJob, pts: &[Point]) -> io::Result<()> {
        Ok(())
    }
    fn bezier(&mut self, job: &mut RenderJob, pts: &[Point], arrow_end: bool) -> io::Result<()> {
        Ok(())
    }
    fn textspan(&mut self, job: &mut RenderJob, at: Point, span: &TextSpan) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn style_lists_parse() {
        let f = parse_style("bold,dashed filled");
        assert!(f.contains(StyleFlags::BOLD));
        assert!(f.contains(StyleFlags::DASHED));
        assert!(f.contains(StyleFlags::FILLED));
        assert_eq!(parse_style("solid"), StyleFlags::empty());
    }

    #[test]
    fn transform_composition() {
        let t = Transform {
            translate: Point::new(10.0, 0.0),
            zoom: 2.0,
            dpi: 144.0,
            rotate90: false,
            offset: Point::new(1.0, 1.0),
        };
        // scale = 2 × 144/72 = 4
        assert_eq!(t.apply(Point::new(0.0, 0.0)), Point::new(41.0, 1.0));
    }

    #[test]
    fn rotation_turns_ccw() {
        let t = Transform {
            rotate90: true,
            ..Default::default()
        };
        assert_eq!(t.apply(Point::new(1.0, 0.0)), Point::new(0.0, 1.0));
    }

    #[test]
    fn raw_coords_bypass_the_transform() {
        let mut sink = Sink::buffer();
        let t = Transform {
            zoom: 3.0,
            ..Default::default()
        };
        let job = RenderJob::new(&mut sink, t, true);
        assert_eq!(job.map(Point::new(2.0, 2.0)), Point::new(2.0, 2.0));
        let mut sink2 = Sink::buffer();
        let job2 = RenderJob::new(&mut sink2, t, false);
        assert_eq!(job2.map(Point::new(2.0, 2.0)), Point::new(6.0, 6.0));
    }
}
