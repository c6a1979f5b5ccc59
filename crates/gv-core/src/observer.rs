//! Mutation callbacks.
//!
//! A root graph holds a stack of observers dispatched in LIFO order
//! during mutation. `on_init` fires before the created object is
//! returned to the caller; `on_update` fires on every attribute write
//! with the affected symbol name. Dispatch is synchronous and observers
//! may mutate the graph (the stack is detached for the duration of a
//! dispatch, so nested events during a callback go only to observers
//! pushed inside it).

use crate::id::{Name, ObjKind};
use crate::model::Graph;

#[allow(unused_variables)]
pub trait Observer {
    fn on_init(&mut self, g: &mut Graph, kind: ObjKind, id: u64) {}

    fn on_update(&mut self, g: &mut Graph, kind: ObjKind, id: u64, sym: Name) {}

    fn on_delete(&mut self, g: &mut Graph, kind: ObjKind, id: u64) {}
}
