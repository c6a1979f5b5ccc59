//! gv-layout: geometric layout for the graph model.
//!
//! The sparse/spatial kernel ([`sparse`], [`quadtree`], [`delaunay`])
//! feeds the multilevel spring-electrical engine ([`spring`]), whose
//! output is post-processed by smoothing ([`stress`]), whole-layout
//! transforms ([`transform`]) and overlap removal ([`adjust`]).
//! Disconnected inputs are split by [`ccomps`] and reassembled by
//! [`pack`].

pub mod adjust;
pub mod ccomps;
pub mod delaunay;
pub mod graph;
pub mod multilevel;
pub mod pack;
pub mod quadtree;
pub mod sparse;
pub mod spring;
pub mod stress;
pub mod transform;

pub use adjust::{OverlapMode, Sep, count_overlaps, remove_overlap};
pub use ccomps::{clustered_components, components_with_pins, connected_components};
pub use graph::{NodeIndex, adjacency};
pub use pack::{PackInfo, PackMode, pack_boxes, parse_packmode};
pub use quadtree::QuadTree;
pub use sparse::SparseMatrix;
pub use spring::{Smoothing, SpringCtrl, multilevel_spring_electrical};
pub use transform::{AspectMode, apply_aspect, normalize_layout};
