//! gv-route: obstacle-avoiding edge routing.
//!
//! [`obstacle`] builds clockwise polygons from node shapes,
//! [`visibility`] routes shortest polylines and splines around them,
//! [`corridor`] fits splines inside ordered box corridors, and
//! [`selfloop`] fans self-edges and copies bundle splines.

pub mod corridor;
pub mod obstacle;
pub mod selfloop;
pub mod visibility;

pub use corridor::{CorridorError, PathEnd, SplineFit, fit_spline};
pub use obstacle::{Margin, Obstacle, ShapeKind};
pub use selfloop::{LoopArc, bundle_clones, self_loop_arcs};
pub use visibility::Visibility;
