//! The in-memory graph model: a root graph owning arenas of node, edge
//! and subgraph records, id-indexed so the cyclic structure (nodes ↔
//! edges ↔ subgraphs) never holds references.
//!
//! All iteration is in sequence-number (creation) order and is stable
//! across runs given identical input. Objects live until deleted at the
//! root; subgraph-scoped deletion only removes membership.

use crate::attr::{AttrDict, AttrOverrides, AttrValue};
use crate::geom::Point;
use crate::id::{EdgeId, GraphId, IdAllocator, Name, NodeId, ObjKind, ROOT};
use crate::nodeset::IdIndex;
use crate::observer::Observer;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Graph descriptor flags, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphDesc {
    pub directed: bool,
    pub strict: bool,
    pub main: bool,
}

impl GraphDesc {
    pub fn directed() -> Self {
        Self {
            directed: true,
            strict: false,
            main: true,
        }
    }

    pub fn undirected() -> Self {
        Self {
            directed: false,
            strict: false,
            main: true,
        }
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Compass direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compass {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
    Center,
}

impl Compass {
    pub fn parse(s: &str) -> Option<Compass> {
        Some(match s {
            "n" => Compass::N,
            "ne" => Compass::Ne,
            "e" => Compass::E,
            "se" => Compass::Se,
            "s" => Compass::S,
            "sw" => Compass::Sw,
            "w" => Compass::W,
            "nw" => Compass::Nw,
            "c" | "_" => Compass::Center,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Compass::N => "n",
            Compass::Ne => "ne",
            Compass::E => "e",
            Compass::Se => "se",
            Compass::S => "s",
            Compass::Sw => "sw",
            Compass::W => "w",
            Compass::Nw => "nw",
            Compass::Center => "c",
        }
    }

    /// Unit offset from the node center toward this compass point.
    pub fn unit_offset(self) -> Point {
        match self {
            Compass::N => Point::new(0.0, 1.0),
            Compass::Ne => Point::new(1.0, 1.0).normalized(),
            Compass::E => Point::new(1.0, 0.0),
            Compass::Se => Point::new(1.0, -1.0).normalized(),
            Compass::S => Point::new(0.0, -1.0),
            Compass::Sw => Point::new(-1.0, -1.0).normalized(),
            Compass::W => Point::new(-1.0, 0.0),
            Compass::Nw => Point::new(-1.0, 1.0).normalized(),
            Compass::Center => Point::ZERO,
        }
    }
}

/// Named or compass attachment point of an edge endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Port {
    pub name: Option<Name>,
    pub compass: Option<Compass>,
}

/// Computed edge geometry: cubic Bézier control points (3k + 1 of
/// them), with optional arrowhead endpoints the spline points at.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spline {
    pub points: Vec<Point>,
    /// Arrow tip at the tail, when drawn.
    pub start: Option<Point>,
    /// Arrow tip at the head, when drawn.
    pub end: Option<Point>,
}

/// A node record. The primary record lives at the root and is shared by
/// id with every subgraph whose scope contains it.
#[derive(Debug)]
pub struct NodeRec {
    pub id: u64,
    pub seq: u32,
    pub name: Name,
    pub attrs: Vec<AttrValue>,
    pub outs: SmallVec<[EdgeId; 4]>,
    pub ins: SmallVec<[EdgeId; 4]>,
    /// Layout result: center position in points.
    pub pos: Option<Point>,
    /// Resolved drawable size in points (width, height).
    pub size: Point,
}

/// An edge record: `(tail, head)` plus an optional key disambiguating
/// parallel edges. Undirected edges are canonicalized with tail ≤ head.
#[derive(Debug)]
pub struct EdgeRec {
    pub id: u64,
    pub seq: u32,
    pub tail: NodeId,
    pub head: NodeId,
    pub key: Option<Name>,
    pub attrs: Vec<AttrValue>,
    pub tail_port: Option<Port>,
    pub head_port: Option<Port>,
    /// Routing result.
    pub spline: Option<Spline>,
    pub label_pos: Option<Point>,
}

/// A graph or subgraph record. Index 0 of the arena is the root itself.
#[derive(Debug)]
pub struct SubgraphRec {
    pub id: u64,
    pub seq: u32,
    pub name: Name,
    pub parent: Option<GraphId>,
    pub subgraphs: Vec<GraphId>,
    pub attrs: Vec<AttrValue>,
    /// Default overrides this subgraph's view installs, per object kind.
    pub overrides: [AttrOverrides; 3],
    nodes: Vec<NodeId>,
    node_set: IdIndex,
    edges: Vec<EdgeId>,
    edge_set: IdIndex,
}

impl SubgraphRec {
    /// Whether this subgraph is drawn as a cluster.
    pub fn is_cluster(&self) -> bool {
        self.name.as_str().starts_with("cluster")
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, n: NodeId) -> bool {
        self.node_set.get(n.0).is_some()
    }

    pub fn contains_edge(&self, e: EdgeId) -> bool {
        self.edge_set.get(e.0).is_some()
    }
}

/// The root graph: arenas, id indexes, attribute dictionaries, callback
/// stack, and the id/sequence allocation discipline.
pub struct Graph {
    pub desc: GraphDesc,
    nodes: Vec<Option<NodeRec>>,
    edges: Vec<Option<EdgeRec>>,
    graphs: Vec<Option<SubgraphRec>>,
    node_ix: IdIndex,
    edge_ix: IdIndex,
    graph_ix: IdIndex,
    node_by_name: HashMap<Name, NodeId>,
    alloc: IdAllocator,
    pub(crate) dicts: [AttrDict; 3],
    pub(crate) observers: Vec<Box<dyn Observer>>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("desc", &self.desc)
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .field("subgraphs", &(self.graphs.len() - 1))
            .finish()
    }
}

impl Graph {
    /// Create a main graph with the given descriptor and name.
    pub fn open(name: &str, desc: GraphDesc) -> Graph {
        let mut g = Graph {
            desc: GraphDesc { main: true, ..desc },
            nodes: Vec::new(),
            edges: Vec::new(),
            graphs: Vec::new(),
            node_ix: IdIndex::default(),
            edge_ix: IdIndex::default(),
            graph_ix: IdIndex::default(),
            node_by_name: HashMap::new(),
            alloc: IdAllocator::new(),
            dicts: Default::default(),
            observers: Vec::new(),
        };
        let id = g.alloc.alloc_id();
        debug_assert_eq!(id, ROOT.0);
        let seq = g.alloc.alloc_seq(ObjKind::Graph);
        g.graphs.push(Some(SubgraphRec {
            id,
            seq,
            name: Name::intern(name),
            parent: None,
            subgraphs: Vec::new(),
            attrs: Vec::new(),
            overrides: Default::default(),
            nodes: Vec::new(),
            node_set: IdIndex::default(),
            edges: Vec::new(),
            edge_set: IdIndex::default(),
        }));
        g.graph_ix.insert(id, 0);
        g
    }

    pub fn name(&self) -> Name {
        self.subgraph(ROOT).name
    }

    // ─── Record access ───────────────────────────────────────────────

    pub fn node(&self, n: NodeId) -> &NodeRec {
        self.try_node(n).expect("stale node id")
    }

    pub fn node_mut(&mut self, n: NodeId) -> &mut NodeRec {
        let slot = self.node_ix.get(n.0).expect("stale node id");
        self.nodes[slot].as_mut().expect("stale node id")
    }

    pub fn try_node(&self, n: NodeId) -> Option<&NodeRec> {
        self.node_ix.get(n.0).and_then(|s| self.nodes[s].as_ref())
    }

    pub fn edge(&self, e: EdgeId) -> &EdgeRec {
        self.try_edge(e).expect("stale edge id")
    }

    pub fn edge_mut(&mut self, e: EdgeId) -> &mut EdgeRec {
        let slot = self.edge_ix.get(e.0).expect("stale edge id");
        self.edges[slot].as_mut().expect("stale edge id")
    }

    pub fn try_edge(&self, e: EdgeId) -> Option<&EdgeRec> {
        self.edge_ix.get(e.0).and_then(|s| self.edges[s].as_ref())
    }

    pub fn subgraph(&self, g: GraphId) -> &SubgraphRec {
        self.try_subgraph(g).expect("stale graph id")
    }

    pub fn subgraph_mut(&mut self, g: GraphId) -> &mut SubgraphRec {
        let slot = self.graph_ix.get(g.0).expect("stale graph id");
        self.graphs[slot].as_mut().expect("stale graph id")
    }

    pub fn try_subgraph(&self, g: GraphId) -> Option<&SubgraphRec> {
        self.graph_ix.get(g.0).and_then(|s| self.graphs[s].as_ref())
    }

    /// Expected O(1) lookup; answers `None` immediately when `id` falls
    /// outside the observed id range.
    pub fn find_node_by_id(&self, id: u64) -> Option<&NodeRec> {
        self.node_ix.get(id).and_then(|s| self.nodes[s].as_ref())
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_by_name.get(&Name::intern(name)).copied()
    }

    pub fn node_count(&self) -> usize {
        self.node_ix.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_ix.len()
    }

    // ─── Subgraphs ───────────────────────────────────────────────────

    /// Look up or create a subgraph of `parent`. An anonymous subgraph
    /// gets an implicit local name of the form `%N`.
    pub fn open_subgraph(&mut self, parent: GraphId, name: Option<&str>) -> GraphId {
        if let Some(name) = name {
            let key = Name::intern(name);
            if let Some(found) = self.find_subgraph_in(parent, key) {
                return found;
            }
        }
        let id = self.alloc.alloc_id();
        let name = match name {
            Some(n) => Name::intern(n),
            None => Name::intern(&format!("%{id}")),
        };
        let seq = self.alloc.alloc_seq(ObjKind::Graph);
        let attrs = self.materialize_attrs(ObjKind::Graph, parent);
        let slot = self.graphs.len();
        self.graphs.push(Some(SubgraphRec {
            id,
            seq,
            name,
            parent: Some(parent),
            subgraphs: Vec::new(),
            attrs,
            overrides: Default::default(),
            nodes: Vec::new(),
            node_set: IdIndex::default(),
            edges: Vec::new(),
            edge_set: IdIndex::default(),
        }));
        self.graph_ix.insert(id, slot);
        let gid = GraphId(id);
        self.subgraph_mut(parent).subgraphs.push(gid);
        self.notify_init(ObjKind::Graph, id);
        gid
    }

    fn find_subgraph_in(&self, parent: GraphId, name: Name) -> Option<GraphId> {
        self.subgraph(parent)
            .subgraphs
            .iter()
            .copied()
            .find(|&c| self.subgraph(c).name == name)
    }

    /// Child subgraphs in creation order.
    pub fn subgraphs_of(&self, g: GraphId) -> &[GraphId] {
        &self.subgraph(g).subgraphs
    }

    /// Every subgraph record (excluding the root), in creation order.
    pub fn all_subgraphs(&self) -> impl Iterator<Item = GraphId> + '_ {
        self.graphs
            .iter()
            .skip(1)
            .flatten()
            .map(|sg| GraphId(sg.id))
    }

    /// Chain of graphs from `g` up to and including the root.
    pub fn ancestry(&self, g: GraphId) -> Vec<GraphId> {
        let mut chain = vec![g];
        let mut cur = g;
        while let Some(p) = self.subgraph(cur).parent {
            chain.push(p);
            cur = p;
        }
        chain
    }

    // ─── Nodes ───────────────────────────────────────────────────────

    /// Look up a node by name, or insert it into `g` and every ancestor
    /// up to the root.
    pub fn add_node(&mut self, g: GraphId, name: &str) -> NodeId {
        let key = Name::intern(name);
        if let Some(&n) = self.node_by_name.get(&key) {
            self.enroll_node(g, n);
            return n;
        }
        let id = self.alloc.alloc_id();
        let seq = self.alloc.alloc_seq(ObjKind::Node);
        let attrs = self.materialize_attrs(ObjKind::Node, g);
        let slot = self.nodes.len();
        self.nodes.push(Some(NodeRec {
            id,
            seq,
            name: key,
            attrs,
            outs: SmallVec::new(),
            ins: SmallVec::new(),
            pos: None,
            size: Point::ZERO,
        }));
        self.node_ix.insert(id, slot);
        self.node_by_name.insert(key, NodeId(id));
        let n = NodeId(id);
        self.enroll_node(g, n);
        self.notify_init(ObjKind::Node, id);
        n
    }

    /// Add an existing node to `g` and all ancestors, keeping each
    /// membership list sorted by sequence number.
    pub fn enroll_node(&mut self, g: GraphId, n: NodeId) {
        let seq = self.node(n).seq;
        for gid in self.ancestry(g) {
            if self.subgraph(gid).node_set.get(n.0).is_some() {
                continue;
            }
            let at = {
                let sg = self.subgraph(gid);
                let mut lo = 0;
                let mut hi = sg.nodes.len();
                while lo < hi {
                    let mid = (lo + hi) / 2;
                    if self.node(sg.nodes[mid]).seq < seq {
                        lo = mid + 1;
                    } else {
                        hi = mid;
                    }
                }
                lo
            };
            let sg = self.subgraph_mut(gid);
            sg.node_set.insert(n.0, 0);
            sg.nodes.insert(at, n);
        }
    }

    /// Nodes of `g` in sequence-number order.
    pub fn nodes(&self, g: GraphId) -> impl Iterator<Item = NodeId> + '_ {
        self.subgraph(g).nodes.iter().copied()
    }

    /// Delete a node. At the root this removes the record, its incident
    /// edges and fires delete callbacks; at a subgraph it only removes
    /// membership in `g` and its descendants. Returns `false` for a
    /// non-member (deletion of a non-member is not an error).
    pub fn del_node(&mut self, g: GraphId, n: NodeId) -> bool {
        if !self.subgraph(g).contains_node(n) {
            return false;
        }
        let incident: Vec<EdgeId> = self
            .subgraph(g)
            .edges
            .iter()
            .copied()
            .filter(|&e| {
                let er = self.edge(e);
                er.tail == n || er.head == n
            })
            .collect();
        for e in incident {
            self.del_edge(g, e);
        }
        if g == ROOT {
            // Root deletion also drops edges only reachable via adjacency.
            let rec = self.node(n);
            let all: Vec<EdgeId> = rec.outs.iter().chain(rec.ins.iter()).copied().collect();
            for e in all {
                self.del_edge(ROOT, e);
            }
            self.notify_delete(ObjKind::Node, n.0);
            for slot in 0..self.graphs.len() {
                if let Some(sg) = self.graphs[slot].as_mut() {
                    if sg.node_set.remove(n.0).is_some() {
                        sg.nodes.retain(|&m| m != n);
                    }
                }
            }
            let name = self.node(n).name;
            self.node_by_name.remove(&name);
            if let Some(slot) = self.node_ix.remove(n.0) {
                self.nodes[slot] = None;
            }
        } else {
            for gid in self.descendants(g) {
                let sg = self.subgraph_mut(gid);
                if sg.node_set.remove(n.0).is_some() {
                    sg.nodes.retain(|&m| m != n);
                }
            }
        }
        true
    }

    fn descendants(&self, g: GraphId) -> Vec<GraphId> {
        let mut out = vec![g];
        let mut stack = vec![g];
        while let Some(cur) = stack.pop() {
            for &c in &self.subgraph(cur).subgraphs {
                out.push(c);
                stack.push(c);
            }
        }
        out
    }

    // ─── Edges ───────────────────────────────────────────────────────

    /// Create (or in strict mode, find) the edge `(tail, head, key)` in
    /// `g` and all ancestors. Undirected graphs canonicalize the pair
    /// with tail ≤ head.
    pub fn add_edge(
        &mut self,
        g: GraphId,
        tail: NodeId,
        head: NodeId,
        key: Option<&str>,
    ) -> EdgeId {
        let key = key.map(Name::intern);
        let (tail, head) = if !self.desc.directed && tail.0 > head.0 {
            (head, tail)
        } else {
            (tail, head)
        };
        if self.desc.strict {
            if let Some(existing) = self.find_parallel(tail, head, key) {
                self.enroll_edge(g, existing);
                return existing;
            }
        }
        let id = self.alloc.alloc_id();
        let seq = self.alloc.alloc_seq(ObjKind::Edge);
        let attrs = self.materialize_attrs(ObjKind::Edge, g);
        let slot = self.edges.len();
        self.edges.push(Some(EdgeRec {
            id,
            seq,
            tail,
            head,
            key,
            attrs,
            tail_port: None,
            head_port: None,
            spline: None,
            label_pos: None,
        }));
        self.edge_ix.insert(id, slot);
        let e = EdgeId(id);
        self.node_mut(tail).outs.push(e);
        self.node_mut(head).ins.push(e);
        self.enroll_edge(g, e);
        self.notify_init(ObjKind::Edge, id);
        e
    }

    fn find_parallel(&self, tail: NodeId, head: NodeId, key: Option<Name>) -> Option<EdgeId> {
        self.node(tail)
            .outs
            .iter()
            .copied()
            .find(|&e| {
                let er = self.edge(e);
                er.head == head && er.key == key
            })
            .or_else(|| {
                if self.desc.directed {
                    None
                } else {
                    self.node(tail).ins.iter().copied().find(|&e| {
                        let er = self.edge(e);
                        er.tail == head && er.key == key
                    })
                }
            })
    }

    /// All parallel siblings of `e` (same endpoints, any key), primary
    /// first in sequence order.
    pub fn parallel_edges(&self, e: EdgeId) -> Vec<EdgeId> {
        let er = self.edge(e);
        let (tail, head) = (er.tail, er.head);
        let mut bundle: Vec<EdgeId> = self
            .node(tail)
            .outs
            .iter()
            .copied()
            .filter(|&o| self.edge(o).head == head)
            .collect();
        bundle.sort_by_key(|&o| self.edge(o).seq);
        bundle
    }

    fn enroll_edge(&mut self, g: GraphId, e: EdgeId) {
        let (tail, head) = {
            let er = self.edge(e);
            (er.tail, er.head)
        };
        self.enroll_node(g, tail);
        self.enroll_node(g, head);
        let seq = self.edge(e).seq;
        for gid in self.ancestry(g) {
            let seqs: Vec<u32> = self
                .subgraph(gid)
                .edges
                .iter()
                .map(|&x| self.edge(x).seq)
                .collect();
            let sg = self.subgraph_mut(gid);
            if sg.edge_set.get(e.0).is_none() {
                sg.edge_set.insert(e.0, 0);
                let at = seqs.partition_point(|&s| s < seq);
                sg.edges.insert(at, e);
            }
        }
    }

    /// Edges of `g` in sequence order.
    pub fn edges(&self, g: GraphId) -> impl Iterator<Item = EdgeId> + '_ {
        self.subgraph(g).edges.iter().copied()
    }

    /// Out-edges of `n` visible in `g`, in sequence order.
    pub fn edges_out(&self, g: GraphId, n: NodeId) -> Vec<EdgeId> {
        let sg = self.subgraph(g);
        self.node(n)
            .outs
            .iter()
            .copied()
            .filter(|&e| sg.contains_edge(e))
            .collect()
    }

    /// In-edges of `n` visible in `g`, in sequence order.
    pub fn edges_in(&self, g: GraphId, n: NodeId) -> Vec<EdgeId> {
        let sg = self.subgraph(g);
        self.node(n)
            .ins
            .iter()
            .copied()
            .filter(|&e| sg.contains_edge(e))
            .collect()
    }

    /// All edges incident to `n` in `g`, out first, sequence order.
    pub fn edges_all(&self, g: GraphId, n: NodeId) -> Vec<EdgeId> {
        let mut v = self.edges_out(g, n);
        for e in self.edges_in(g, n) {
            // self-loops appear in both adjacency lists
            if !v.contains(&e) {
                v.push(e);
            }
        }
        v.sort_by_key(|&e| self.edge(e).seq);
        v
    }

    pub fn degree(&self, g: GraphId, n: NodeId) -> usize {
        self.edges_all(g, n).len()
    }

    /// Delete an edge from `g` and descendants; at the root the record
    /// is freed and delete callbacks fire. `false` for a non-member.
    pub fn del_edge(&mut self, g: GraphId, e: EdgeId) -> bool {
        if !self.subgraph(g).contains_edge(e) {
            return false;
        }
        if g == ROOT {
            self.notify_delete(ObjKind::Edge, e.0);
            for slot in 0..self.graphs.len() {
                if let Some(sg) = self.graphs[slot].as_mut() {
                    if sg.edge_set.remove(e.0).is_some() {
                        sg.edges.retain(|&x| x != e);
                    }
                }
            }
            let (tail, head) = {
                let er = self.edge(e);
                (er.tail, er.head)
            };
            self.node_mut(tail).outs.retain(|x| *x != e);
            self.node_mut(head).ins.retain(|x| *x != e);
            if let Some(slot) = self.edge_ix.remove(e.0) {
                self.edges[slot] = None;
            }
        } else {
            for gid in self.descendants(g) {
                let sg = self.subgraph_mut(gid);
                if sg.edge_set.remove(e.0).is_some() {
                    sg.edges.retain(|&x| x != e);
                }
            }
        }
        true
    }

    // ─── Attributes ──────────────────────────────────────────────────

    /// Build a fresh value array for a new object of `kind` created in
    /// scope `g`, using the viewpath defaults.
    fn materialize_attrs(&self, kind: ObjKind, g: GraphId) -> Vec<AttrValue> {
        (0..self.dicts[kind.ix()].len())
            .map(|slot| self.effective_default(g, kind, slot))
            .collect()
    }

    /// Viewpath default: first override found walking self → parent →
    /// root, else the symbol's root default.
    pub fn effective_default(&self, g: GraphId, kind: ObjKind, slot: usize) -> AttrValue {
        for gid in self.ancestry(g) {
            if let Some(v) = self.subgraph(gid).overrides[kind.ix()].get(&slot) {
                return *v;
            }
        }
        self.dicts[kind.ix()].by_slot(slot).default
    }

    pub fn dict(&self, kind: ObjKind) -> &AttrDict {
        &self.dicts[kind.ix()]
    }

    /// Register (if new) and set the default of attribute `name` for
    /// `kind` at scope `g`. Registration grows every live object's value
    /// array with the default. Setting `layout` below the root warns and
    /// is a no-op.
    pub fn set_attr_default(&mut self, g: GraphId, kind: ObjKind, name: &str, value: AttrValue) {
        if name == "layout" && g != ROOT {
            crate::warn_once!("layout attribute is only honored on the root graph");
            return;
        }
        let key = Name::intern(name);
        let slot = match self.dicts[kind.ix()].lookup(key) {
            Some(sym) => sym.slot,
            None => {
                let slot = self.dicts[kind.ix()].register(key, value).slot;
                self.grow_values(kind, value);
                slot
            }
        };
        if g == ROOT {
            self.dicts[kind.ix()].set_default(slot, value);
        } else {
            self.subgraph_mut(g).overrides[kind.ix()].insert(slot, value);
        }
        // A graph-kind default also lands on the scope's own record.
        if kind == ObjKind::Graph {
            let sg = self.subgraph_mut(g);
            if slot < sg.attrs.len() {
                sg.attrs[slot] = value;
            } else {
                sg.attrs.resize(slot + 1, value);
            }
            self.notify_update(ObjKind::Graph, g.0, key);
        }
    }

    fn grow_values(&mut self, kind: ObjKind, default: AttrValue) {
        match kind {
            ObjKind::Node => {
                for n in self.nodes.iter_mut().flatten() {
                    n.attrs.push(default);
                }
            }
            ObjKind::Edge => {
                for e in self.edges.iter_mut().flatten() {
                    e.attrs.push(default);
                }
            }
            ObjKind::Graph => {
                for sg in self.graphs.iter_mut().flatten() {
                    sg.attrs.push(default);
                }
            }
        }
    }

    /// Assign a single object's value. Registers the attribute at root
    /// scope with an empty default if it was never declared.
    pub fn set_node_attr(&mut self, n: NodeId, name: &str, value: AttrValue) {
        let slot = self.ensure_slot(ObjKind::Node, name);
        self.node_mut(n).attrs[slot] = value;
        self.notify_update(ObjKind::Node, n.0, Name::intern(name));
    }

    pub fn set_edge_attr(&mut self, e: EdgeId, name: &str, value: AttrValue) {
        let slot = self.ensure_slot(ObjKind::Edge, name);
        self.edge_mut(e).attrs[slot] = value;
        self.notify_update(ObjKind::Edge, e.0, Name::intern(name));
    }

    pub fn set_graph_attr(&mut self, g: GraphId, name: &str, value: AttrValue) {
        if name == "layout" && g != ROOT {
            crate::warn_once!("layout attribute is only honored on the root graph");
            return;
        }
        let slot = self.ensure_slot(ObjKind::Graph, name);
        self.subgraph_mut(g).attrs[slot] = value;
        self.notify_update(ObjKind::Graph, g.0, Name::intern(name));
    }

    fn ensure_slot(&mut self, kind: ObjKind, name: &str) -> usize {
        let key = Name::intern(name);
        match self.dicts[kind.ix()].lookup(key) {
            Some(sym) => sym.slot,
            None => {
                let empty = AttrValue::str("");
                let slot = self.dicts[kind.ix()].register(key, empty).slot;
                self.grow_values(kind, empty);
                slot
            }
        }
    }

    pub fn node_attr(&self, n: NodeId, name: &str) -> Option<AttrValue> {
        let sym = self.dicts[ObjKind::Node.ix()].lookup(Name::intern(name))?;
        Some(self.node(n).attrs[sym.slot])
    }

    pub fn edge_attr(&self, e: EdgeId, name: &str) -> Option<AttrValue> {
        let sym = self.dicts[ObjKind::Edge.ix()].lookup(Name::intern(name))?;
        Some(self.edge(e).attrs[sym.slot])
    }

    pub fn graph_attr(&self, g: GraphId, name: &str) -> Option<AttrValue> {
        let sym = self.dicts[ObjKind::Graph.ix()].lookup(Name::intern(name))?;
        self.subgraph(g).attrs.get(sym.slot).copied()
    }

    // ─── Callbacks ───────────────────────────────────────────────────

    pub fn push_observer(&mut self, obs: Box<dyn Observer>) {
        self.observers.push(obs);
    }

    pub fn pop_observer(&mut self) -> Option<Box<dyn Observer>> {
        self.observers.pop()
    }

    /// Dispatch in LIFO order. Observers receive `&mut Graph`, so nested
    /// mutation during a callback is permitted; the stack is detached
    /// while dispatching.
    fn with_observers(&mut self, f: impl Fn(&mut dyn Observer, &mut Graph)) {
        if self.observers.is_empty() {
            return;
        }
        let mut stack = std::mem::take(&mut self.observers);
        for obs in stack.iter_mut().rev() {
            f(obs.as_mut(), self);
        }
        // Observers pushed during dispatch stay on top of the restored stack.
        let pushed = std::mem::replace(&mut self.observers, stack);
        self.observers.extend(pushed);
    }

    fn notify_init(&mut self, kind: ObjKind, id: u64) {
        self.with_observers(|obs, g| obs.on_init(g, kind, id));
    }

    fn notify_update(&mut self, kind: ObjKind, id: u64, sym: Name) {
        self.with_observers(|obs, g| obs.on_update(g, kind, id, sym));
    }

    fn notify_delete(&mut self, kind: ObjKind, id: u64) {
        self.with_observers(|obs, g| obs.on_delete(g, kind, id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn k3() -> (Graph, NodeId, NodeId, NodeId) {
        let mut g = Graph::open("t", GraphDesc::undirected());
        let a = g.add_node(ROOT, "a");
        let b = g.add_node(ROOT, "b");
        let c = g.add_node(ROOT, "c");
        g.add_edge(ROOT, a, b, None);
        g.add_edge(ROOT, b, c, None);
        g.add_edge(ROOT, c, a, None);
        (g, a, b, c)
    }

    #[test]
    fn lookup_by_id_and_after_delete() {
        let (mut g, a, _, _) = k3();
        let id = g.node(a).id;
        assert_eq!(g.find_node_by_id(id).unwrap().name.as_str(), "a");
        assert!(g.del_node(ROOT, a));
        assert!(g.find_node_by_id(id).is_none());
        assert_eq!(g.find_node("a"), None);
        // non-member deletion is quiet
        assert!(!g.del_node(ROOT, a));
    }

    #[test]
    fn iteration_is_creation_order() {
        let (g, a, b, c) = k3();
        let order: Vec<NodeId> = g.nodes(ROOT).collect();
        assert_eq!(order, vec![a, b, c]);
    }

    #[test]
    fn undirected_edges_canonicalize() {
        let mut g = Graph::open("t", GraphDesc::undirected());
        let a = g.add_node(ROOT, "a");
        let b = g.add_node(ROOT, "b");
        let e = g.add_edge(ROOT, b, a, None);
        let er = g.edge(e);
        assert!(er.tail.0 <= er.head.0);
    }

    #[test]
    fn strict_merges_parallel_edges() {
        let mut g = Graph::open("t", GraphDesc::directed().strict());
        let a = g.add_node(ROOT, "a");
        let b = g.add_node(ROOT, "b");
        let e1 = g.add_edge(ROOT, a, b, None);
        let e2 = g.add_edge(ROOT, a, b, None);
        assert_eq!(e1, e2);
        let e3 = g.add_edge(ROOT, a, b, Some("k"));
        assert_ne!(e1, e3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn subgraph_membership_includes_ancestors() {
        let mut g = Graph::open("t", GraphDesc::directed());
        let s1 = g.open_subgraph(ROOT, Some("cluster_a"));
        let s2 = g.open_subgraph(s1, Some("inner"));
        let n = g.add_node(s2, "x");
        assert!(g.subgraph(s2).contains_node(n));
        assert!(g.subgraph(s1).contains_node(n));
        assert!(g.subgraph(ROOT).contains_node(n));
        assert!(g.subgraph(s1).is_cluster());
        assert!(!g.subgraph(s2).is_cluster());
    }

    #[test]
    fn subgraph_deletion_keeps_root_record() {
        let mut g = Graph::open("t", GraphDesc::directed());
        let s = g.open_subgraph(ROOT, Some("s"));
        let n = g.add_node(s, "x");
        assert!(g.del_node(s, n));
        assert!(!g.subgraph(s).contains_node(n));
        assert!(g.subgraph(ROOT).contains_node(n));
    }

    #[test]
    fn new_attribute_grows_all_objects() {
        let (mut g, a, b, _) = k3();
        g.set_attr_default(ROOT, ObjKind::Node, "shape", AttrValue::str("box"));
        assert_eq!(g.node_attr(a, "shape"), Some(AttrValue::str("box")));
        assert_eq!(g.node_attr(b, "shape"), Some(AttrValue::str("box")));
        g.set_node_attr(b, "shape", AttrValue::str("ellipse"));
        assert_eq!(g.node_attr(a, "shape"), Some(AttrValue::str("box")));
        assert_eq!(g.node_attr(b, "shape"), Some(AttrValue::str("ellipse")));
    }

    #[test]
    fn subgraph_default_shadows_only_its_view() {
        let mut g = Graph::open("t", GraphDesc::directed());
        g.set_attr_default(ROOT, ObjKind::Node, "color", AttrValue::str("black"));
        let s = g.open_subgraph(ROOT, Some("s"));
        g.set_attr_default(s, ObjKind::Node, "color", AttrValue::str("red"));
        let inside = g.add_node(s, "in");
        let outside = g.add_node(ROOT, "out");
        assert_eq!(g.node_attr(inside, "color"), Some(AttrValue::str("red")));
        assert_eq!(g.node_attr(outside, "color"), Some(AttrValue::str("black")));
    }

    #[test]
    fn layout_attr_ignored_below_root() {
        let mut g = Graph::open("t", GraphDesc::directed());
        let s = g.open_subgraph(ROOT, Some("s"));
        g.set_graph_attr(s, "layout", AttrValue::str("sfdp"));
        assert_eq!(g.graph_attr(s, "layout"), None);
        g.set_graph_attr(ROOT, "layout", AttrValue::str("sfdp"));
        assert_eq!(g.graph_attr(ROOT, "layout"), Some(AttrValue::str("sfdp")));
    }

    #[test]
    fn observer_sees_init_and_delete() {
        use std::cell::Cell;
        thread_local! {
            static INITS: Cell<usize> = const { Cell::new(0) };
            static DELS: Cell<usize> = const { Cell::new(0) };
        }
        struct Tally;
        impl Observer for Tally {
            fn on_init(&mut self, _: &mut Graph, _: ObjKind, _: u64) {
                INITS.with(|c| c.set(c.get() + 1));
            }
            fn on_delete(&mut self, _: &mut Graph, _: ObjKind, _: u64) {
                DELS.with(|c| c.set(c.get() + 1));
            }
        }
        let mut g = Graph::open("t", GraphDesc::directed());
        g.push_observer(Box::new(Tally));
        let a = g.add_node(ROOT, "a");
        let b = g.add_node(ROOT, "b");
        g.add_edge(ROOT, a, b, None);
        assert_eq!(INITS.with(|c| c.get()), 3);
        g.del_node(ROOT, b);
        // edge delete fires before the node delete
        assert_eq!(DELS.with(|c| c.get()), 2);
    }
}
