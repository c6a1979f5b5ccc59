//! Bridge between the graph model and the numeric kernel: dense node
//! indexing and weighted adjacency extraction.

use crate::sparse::SparseMatrix;
use gv_core::{Graph, GraphId, NodeId};
use std::collections::HashMap;

/// Dense index over the nodes of one scope, in sequence order.
#[derive(Debug, Clone)]
pub struct NodeIndex {
    pub nodes: Vec<NodeId>,
    map: HashMap<NodeId, usize>,
}

impl NodeIndex {
    pub fn new(g: &Graph, scope: GraphId) -> NodeIndex {
        let nodes: Vec<NodeId> = g.nodes(scope).collect();
        let map = nodes.iter().copied().zip(0..).collect();
        NodeIndex { nodes, map }
    }

    /// Index over an explicit node list (a component).
    pub fn of(nodes: Vec<NodeId>) -> NodeIndex {
        let map = nodes.iter().copied().zip(0..).collect();
        NodeIndex { nodes, map }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ix(&self, n: NodeId) -> Option<usize> {
        self.map.get(&n).copied()
    }
}

/// Symmetric, diagonal-free adjacency of the scope restricted to the
/// indexed nodes. Edge weights come from the `weight` attribute,
/// parallel edges sum.
pub fn adjacency(g: &Graph, scope: GraphId, ix: &NodeIndex) -> SparseMatrix {
    let mut triples = Vec::new();
    for e in g.edges(scope) {
        let er = g.edge(e);
        let (Some(t), Some(h)) = (ix.ix(er.tail), ix.ix(er.head)) else {
            continue;
        };
        if t == h {
            continue;
        }
        let w = g
            .edge_attr(e, "weight")
            .and_then(|v| v.to_double())
            .filter(|w| *w > 0.0)
            .unwrap_or(1.0);
        triples.push((t, h, w));
        triples.push((h, t, w));
    }
    SparseMatrix::from_triples(ix.len(), ix.len(), &triples)
}
