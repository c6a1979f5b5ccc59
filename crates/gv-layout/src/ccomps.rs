//! Connected-component decomposition of a graph, ignoring edge
//! direction. Pinned nodes count as one pre-existing component;
//! the cluster-aware variant collapses top-level clusters first and
//! projects the result back.

use gv_core::{Graph, GraphId, NodeId, ROOT};
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;

/// Partition the nodes of `scope` into connected components, in
/// sequence order within and across components.
pub fn connected_components(g: &Graph, scope: GraphId) -> Vec<Vec<NodeId>> {
    decompose(g, scope, false)
}

/// Like [`connected_components`], but nodes with `pin=true` are fused
/// into a single component regardless of connectivity.
pub fn components_with_pins(g: &Graph, scope: GraphId) -> Vec<Vec<NodeId>> {
    decompose(g, scope, true)
}

fn decompose(g: &Graph, scope: GraphId, honor_pins: bool) -> Vec<Vec<NodeId>> {
    let nodes: Vec<NodeId> = g.nodes(scope).collect();
    let index: HashMap<NodeId, usize> = nodes.iter().copied().zip(0..).collect();
    let mut uf: UnionFind<usize> = UnionFind::new(nodes.len());
    for e in g.edges(scope) {
        let er = g.edge(e);
        if let (Some(&t), Some(&h)) = (index.get(&er.tail), index.get(&er.head)) {
            uf.union(t, h);
        }
    }
    if honor_pins {
        let mut first_pin: Option<usize> = None;
        for (ix, &n) in nodes.iter().enumerate() {
            let pinned = g
                .node_attr(n, "pin")
                .and_then(|v| v.to_bool())
                .unwrap_or(false);
            if pinned {
                match first_pin {
                    Some(p) => {
                        uf.union(p, ix);
                    }
                    None => first_pin = Some(ix),
                }
            }
        }
    }
    group(&nodes, |ix| uf.find(ix))
}

fn group(nodes: &[NodeId], mut rep: impl FnMut(usize) -> usize) -> Vec<Vec<NodeId>> {
    let mut comp_of_rep: HashMap<usize, usize> = HashMap::new();
    let mut comps: Vec<Vec<NodeId>> = Vec::new();
    for (ix, &n) in nodes.iter().enumerate() {
        let r = rep(ix);
        let c = *comp_of_rep.entry(r).or_insert_with(|| {
            comps.push(Vec::new());
            comps.len() - 1
        });
        comps[c].push(n);
    }
    comps
}

/// A component of the cluster-collapsed graph, projected back onto the
/// input: its nodes plus the top-level clusters that intersect it.
#[derive(Debug)]
pub struct ClusteredComponent {
    pub nodes: Vec<NodeId>,
    pub clusters: Vec<GraphId>,
}

/// Cluster-aware decomposition: every top-level cluster is first
/// collapsed into one derived node, components are found on the
/// derived graph, and each result is projected back.
pub fn clustered_components(g: &Graph) -> Vec<ClusteredComponent> {
    let clusters: Vec<GraphId> = g
        .subgraphs_of(ROOT)
        .iter()
        .copied()
        .filter(|&s| g.subgraph(s).is_cluster())
        .collect();

    let nodes: Vec<NodeId> = g.nodes(ROOT).collect();
    let index: HashMap<NodeId, usize> = nodes.iter().copied().zip(0..).collect();
    // derived id: nodes first, then one per cluster
    let mut derived_of: Vec<usize> = (0..nodes.len()).collect();
    for (ci, &c) in clusters.iter().enumerate() {
        for n in g.nodes(c) {
            derived_of[index[&n]] = nodes.len() + ci;
        }
    }
    let mut uf: UnionFind<usize> = UnionFind::new(nodes.len() + clusters.len());
    for e in g.edges(ROOT) {
        let er = g.edge(e);
        uf.union(derived_of[index[&er.tail]], derived_of[index[&er.head]]);
    }

    let mut comp_of_rep: HashMap<usize, usize> = HashMap::new();
    let mut comps: Vec<ClusteredComponent> = Vec::new();
    let mut comp_ix = |rep: usize, comps: &mut Vec<ClusteredComponent>| {
        *comp_of_rep.entry(rep).or_insert_with(|| {
            comps.push(ClusteredComponent {
                nodes: Vec::new(),
                clusters: Vec::new(),
            });
            comps.len() - 1
        })
    };
    for (ix, &n) in nodes.iter().enumerate() {
        let c = comp_ix(uf.find(derived_of[ix]), &mut comps);
        comps[c].nodes.push(n);
    }
    for (ci, &cl) in clusters.iter().enumerate() {
        let c = comp_ix(uf.find(nodes.len() + ci), &mut comps);
        comps[c].clusters.push(cl);
    }
    comps.retain(|c| !c.nodes.is_empty());
    comps
}

#[cfg(test)]
mod tests {
    use super::*;
    use gv_core::parse_graph;

    #[test]
    fn two_pairs_make_two_components() {
        let g = parse_graph("digraph{a;b;c;d; a->b;c->d}").unwrap();
        let comps = connected_components(&g, ROOT);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].len(), 2);
        assert_eq!(comps[1].len(), 2);
        let names: Vec<&str> = comps[0].iter().map(|&n| g.node(n).name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn isolated_nodes_are_singletons() {
        let g = parse_graph("graph { a; b; c -- d }").unwrap();
        let comps = connected_components(&g, ROOT);
        assert_eq!(comps.len(), 3);
    }

    #[test]
    fn pinned_nodes_fuse() {
        let g = parse_graph("digraph { a [pin=true]; b [pin=true]; c }").unwrap();
        let comps = components_with_pins(&g, ROOT);
        assert_eq!(comps.len(), 2);
        assert_eq!(comps.iter().map(Vec::len).max(), Some(2));
    }

    #[test]
    fn clusters_collapse_before_decomposition() {
        // x and y are disconnected but share a cluster
        let g = parse_graph(
            "digraph { subgraph cluster_a { x; y } z; x -> w }",
        )
        .unwrap();
        let comps = clustered_components(&g);
        // {x, y, w, cluster_a} and {z}
        assert_eq!(comps.len(), 2);
        let big = comps.iter().find(|c| c.clusters.len() == 1).unwrap();
        assert_eq!(big.nodes.len(), 3);
        let lone = comps.iter().find(|c| c.clusters.is_empty()).unwrap();
        assert_eq!(g.node(lone.nodes[0]).name.as_str(), "z");
    }
}
