//! gv-core: the graph data model and both input grammars.
//!
//! A [`model::Graph`] is the shared substrate of the whole toolkit:
//! the parser instantiates it, the layout and routing stages mutate its
//! computed geometry, and the render driver reads it back out.

pub mod attr;
pub mod emitter;
pub mod error;
pub mod geom;
pub mod html;
pub mod id;
pub mod model;
pub mod nodeset;
pub mod observer;
pub mod parser;

pub use attr::{AttrDict, AttrSymbol, AttrValue};
pub use emitter::emit_graph;
pub use error::{LabelError, ParseError};
pub use geom::{BoundBox, Point};
pub use id::{EdgeId, GraphId, Name, NodeId, ObjKind, ROOT};
pub use model::{Compass, EdgeRec, Graph, GraphDesc, NodeRec, Port, Spline, SubgraphRec};
pub use observer::Observer;
pub use parser::parse_graph;
