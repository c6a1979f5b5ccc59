//! Integration tests: parse → emit → re-parse round-trip.
//!
//! Verifies that no structure or visible attribute is lost converting
//! graph text → `Graph` → graph text.

use gv_core::{AttrValue, ROOT, emit_graph, parse_graph};

// ─── Helpers ─────────────────────────────────────────────────────────

/// Parse, emit, re-parse, and compare counts, names, and multiplicity.
fn assert_roundtrip_preserves(input: &str) {
    let g1 = parse_graph(input).expect("first parse failed");
    let emitted = emit_graph(&g1);
    let g2 = parse_graph(&emitted).expect("re-parse failed");

    assert_eq!(
        g1.node_count(),
        g2.node_count(),
        "node count mismatch after round-trip.\nOriginal:\n{input}\nEmitted:\n{emitted}"
    );
    assert_eq!(
        g1.edge_count(),
        g2.edge_count(),
        "edge count mismatch after round-trip.\nOriginal:\n{input}\nEmitted:\n{emitted}"
    );
    assert_eq!(g1.desc, g2.desc, "descriptor changed");

    for n1 in g1.nodes(ROOT) {
        let name = g1.node(n1).name;
        let n2 = g2
            .find_node(name.as_str())
            .unwrap_or_else(|| panic!("node {name} lost after round-trip:\n{emitted}"));
        // same multiset of neighbor names
        let mut nbr1: Vec<String> = g1
            .edges_out(ROOT, n1)
            .iter()
            .map(|&e| g1.node(g1.edge(e).head).name.as_str().to_owned())
            .collect();
        let mut nbr2: Vec<String> = g2
            .edges_out(ROOT, n2)
            .iter()
            .map(|&e| g2.node(g2.edge(e).head).name.as_str().to_owned())
            .collect();
        nbr1.sort();
        nbr2.sort();
        assert_eq!(nbr1, nbr2, "out-neighbors of {name} changed:\n{emitted}");
    }
}

// ─── Fixture-based tests ─────────────────────────────────────────────

#[test]
fn roundtrip_minimal() {
    assert_roundtrip_preserves("digraph { a -> b }");
}

#[test]
fn roundtrip_undirected_cycle() {
    assert_roundtrip_preserves("graph { a -- b -- c -- a }");
}

#[test]
fn roundtrip_strict() {
    assert_roundtrip_preserves("strict digraph { a -> b; a -> b; b -> a }");
}

#[test]
fn roundtrip_parallel_edges() {
    assert_roundtrip_preserves("digraph { a -> b; a -> b; a -> b }");
}

#[test]
fn roundtrip_subgraphs_and_clusters() {
    assert_roundtrip_preserves(
        r#"digraph g {
            subgraph cluster_one { a; b; a -> b }
            subgraph cluster_two { c }
            a -> c;
            d;
        }"#,
    );
}

#[test]
fn roundtrip_attr_scopes() {
    assert_roundtrip_preserves(
        r#"digraph {
            graph [pad="0.5"];
            node [shape=box, color=grey];
            edge [weight=2];
            a [color=red, label="hello world"];
            subgraph s { node [shape=circle]; b }
            a -> b [weight=3];
        }"#,
    );
}

#[test]
fn roundtrip_quoting() {
    assert_roundtrip_preserves(
        r#"digraph { "a node" -> "with \"quotes\""; "1.5x" [label="[]{};,"] }"#,
    );
}

#[test]
fn roundtrip_ports() {
    let g1 = parse_graph("digraph { a:out:ne -> b:in }").unwrap();
    let text = emit_graph(&g1);
    let g2 = parse_graph(&text).unwrap();
    let e2 = g2.edges(ROOT).next().unwrap();
    let er = g2.edge(e2);
    assert_eq!(er.tail_port.unwrap().name.unwrap().as_str(), "out");
    assert_eq!(er.head_port.unwrap().name.unwrap().as_str(), "in");
}

#[test]
fn visible_attrs_survive() {
    let g1 = parse_graph("digraph { node [shape=box]; a [shape=ellipse]; b }").unwrap();
    let text = emit_graph(&g1);
    let g2 = parse_graph(&text).unwrap();
    let a = g2.find_node("a").unwrap();
    let b = g2.find_node("b").unwrap();
    assert_eq!(g2.node_attr(a, "shape"), Some(AttrValue::str("ellipse")));
    assert_eq!(g2.node_attr(b, "shape"), Some(AttrValue::str("box")));
}

#[test]
fn defaults_identical_to_parent_are_invisible() {
    let g = parse_graph(
        "digraph { node [shape=box]; subgraph s { node [shape=box]; a } }",
    )
    .unwrap();
    let text = emit_graph(&g);
    // the subgraph's duplicate default must not be re-emitted
    assert_eq!(text.matches("shape=box").count(), 1, "emitted:\n{text}");
}

#[test]
fn bare_graph_assignment_is_an_inherited_default() {
    let src = "digraph { fontname=Courier; subgraph s { a }; b }";
    let g1 = parse_graph(src).unwrap();
    let fontname = |g: &gv_core::Graph| {
        let s = g.subgraphs_of(ROOT)[0];
        (
            g.graph_attr(ROOT, "fontname"),
            g.graph_attr(s, "fontname"),
        )
    };
    // the bare `id=id;` form installs a default the subgraph inherits
    let courier = Some(AttrValue::str("Courier"));
    assert_eq!(fontname(&g1), (courier, courier));

    let emitted = emit_graph(&g1);
    let g2 = parse_graph(&emitted).expect("re-parse failed");
    assert_eq!(
        fontname(&g2),
        (courier, courier),
        "inherited default lost after round-trip:\n{emitted}"
    );
}

#[test]
fn iteration_order_is_stable_across_reparses() {
    let src = "digraph { z; a; m; z -> a; m -> z }";
    let g1 = parse_graph(src).unwrap();
    let names1: Vec<&str> = g1.nodes(ROOT).map(|n| g1.node(n).name.as_str()).collect();
    assert_eq!(names1, vec!["z", "a", "m"]);
    let g2 = parse_graph(src).unwrap();
    let names2: Vec<&str> = g2.nodes(ROOT).map(|n| g2.node(n).name.as_str()).collect();
    assert_eq!(names1, names2);
}
