//! gv-render: the plugin-dispatched render driver and the end-to-end
//! pipeline.
//!
//! [`plugin`] resolves a device/renderer pair from a format string,
//! [`render`] defines the callback stream and coordinate transform,
//! [`color`] resolves color strings, [`device`] owns the output sinks
//! (with gzip wrapping), [`imagemap`] is the in-core device family,
//! and [`driver`] runs parse → layout → route → pack → render.

pub mod color;
pub mod device;
pub mod driver;
pub mod imagemap;
pub mod plugin;
pub mod render;

pub use color::{resolve_color, resolve_color_list};
pub use device::Sink;
pub use driver::{RenderError, layout_graph, render_graph, render_source};
pub use imagemap::MapFlavor;
pub use plugin::{Capabilities, PluginRegistry, PluginSpec};
pub use render::{ObjScope, RenderJob, Renderer, StyleFlags, Transform};
