//! Emitter: `Graph` → graph-definition text that round-trips through
//! the parser up to attribute defaulting.

use crate::attr::AttrValue;
use crate::id::{EdgeId, GraphId, NodeId, ObjKind, ROOT};
use crate::model::{Graph, Port};
use std::collections::HashSet;
use std::fmt::Write;

/// Serialize a graph document in creation order.
#[must_use]
pub fn emit_graph(g: &Graph) -> String {
    let mut w = Writer {
        g,
        out: String::with_capacity(1024),
        written_nodes: HashSet::new(),
        written_edges: HashSet::new(),
    };
    w.document();
    w.out
}

struct Writer<'g> {
    g: &'g Graph,
    out: String,
    written_nodes: HashSet<NodeId>,
    written_edges: HashSet<EdgeId>,
}

impl Writer<'_> {
    fn document(&mut self) {
        if self.g.desc.strict {
            self.out.push_str("strict ");
        }
        self.out
            .push_str(if self.g.desc.directed { "digraph" } else { "graph" });
        let name = self.g.name();
        if !name.is_empty() {
            self.out.push(' ');
            self.out.push_str(&quote(name.as_str()));
        }
        self.out.push_str(" {\n");
        self.defaults(ROOT, 1);
        self.body(ROOT, 1);
        self.out.push_str("}\n");
    }

    /// Attribute statements for the scope: root symbol defaults at the
    /// root, override entries below it. Entries equal to the parent
    /// scope's view stay invisible.
    fn defaults(&mut self, scope: GraphId, depth: usize) {
        for kind in ObjKind::ALL {
            let mut pairs: Vec<(String, AttrValue)> = Vec::new();
            if scope == ROOT {
                for sym in self.g.dict(kind).iter_by_name() {
                    if !sym.print || is_blank(&sym.default) {
                        continue;
                    }
                    // graph-kind root defaults are emitted with the
                    // root's own values below, not twice
                    if kind == ObjKind::Graph {
                        continue;
                    }
                    pairs.push((sym.name.as_str().to_owned(), sym.default));
                }
            } else {
                let sg = self.g.subgraph(scope);
                let parent = sg.parent.expect("non-root has a parent");
                let mut slots: Vec<usize> =
                    sg.overrides[kind.ix()].keys().copied().collect();
                slots.sort_by_key(|&s| self.g.dict(kind).by_slot(s).name.as_str());
                for slot in slots {
                    let v = sg.overrides[kind.ix()][&slot];
                    if self.g.effective_default(parent, kind, slot) == v {
                        continue;
                    }
                    let sym = self.g.dict(kind).by_slot(slot);
                    if !sym.print {
                        continue;
                    }
                    pairs.push((sym.name.as_str().to_owned(), v));
                }
            }
            if kind == ObjKind::Graph {
                // the scope's own attribute values, one assignment each
                for sym in self.g.dict(ObjKind::Graph).iter_by_name() {
                    let Some(v) = self.g.graph_attr(scope, sym.name.as_str()) else {
                        continue;
                    };
                    if is_blank(&v) || !sym.print {
                        continue;
                    }
                    let inherited = match self.g.subgraph(scope).parent {
                        Some(p) => self.g.graph_attr(p, sym.name.as_str()),
                        None => None,
                    };
                    if inherited == Some(v) {
                        continue;
                    }
                    indent(&mut self.out, depth);
                    let _ = writeln!(
                        self.out,
                        "{}={};",
                        quote(sym.name.as_str()),
                        value(&v)
                    );
                }
                continue;
            }
            if !pairs.is_empty() {
                indent(&mut self.out, depth);
                self.out.push_str(kind.label());
                self.out.push_str(" [");
                for (i, (name, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    let _ = write!(self.out, "{}={}", quote(name), value(v));
                }
                self.out.push_str("];\n");
            }
        }
    }

    /// Child subgraphs first (deepest scope owns its objects), then the
    /// scope's unwritten nodes and edges in sequence order.
    fn body(&mut self, scope: GraphId, depth: usize) {
        for &child in self.g.subgraphs_of(scope) {
            let sg = self.g.subgraph(child);
            indent(&mut self.out, depth);
            if sg.name.as_str().starts_with('%') {
                self.out.push_str("subgraph {\n");
            } else {
                let _ = writeln!(self.out, "subgraph {} {{", quote(sg.name.as_str()));
            }
            self.defaults(child, depth + 1);
            self.body(child, depth + 1);
            indent(&mut self.out, depth);
            self.out.push_str("}\n");
        }
        let nodes: Vec<NodeId> = self.g.nodes(scope).collect();
        for n in nodes {
            if self.written_nodes.contains(&n) {
                continue;
            }
            // written here unless a statement below will introduce it
            let pairs = self.node_pairs(scope, n);
            let lonely = self.g.edges_all(scope, n).is_empty();
            if pairs.is_empty() && !lonely {
                continue;
            }
            self.written_nodes.insert(n);
            indent(&mut self.out, depth);
            self.out.push_str(&quote(self.g.node(n).name.as_str()));
            attr_list(&mut self.out, &pairs);
            self.out.push_str(";\n");
        }
        let edges: Vec<EdgeId> = self.g.edges(scope).collect();
        for e in edges {
            if !self.written_edges.insert(e) {
                continue;
            }
            let (tail, head, tail_port, head_port) = {
                let er = self.g.edge(e);
                (er.tail, er.head, er.tail_port, er.head_port)
            };
            self.written_nodes.insert(tail);
            self.written_nodes.insert(head);
            indent(&mut self.out, depth);
            self.out
                .push_str(&endpoint(self.g.node(tail).name.as_str(), &tail_port));
            self.out
                .push_str(if self.g.desc.directed { " -> " } else { " -- " });
            self.out
                .push_str(&endpoint(self.g.node(head).name.as_str(), &head_port));
            let pairs = self.edge_pairs(scope, e);
            attr_list(&mut self.out, &pairs);
            self.out.push_str(";\n");
        }
    }

    /// Local values that differ from the scope's effective defaults.
    fn node_pairs(&self, scope: GraphId, n: NodeId) -> Vec<(String, AttrValue)> {
        let rec = self.g.node(n);
        self.visible_pairs(scope, ObjKind::Node, &rec.attrs)
    }

    fn edge_pairs(&self, scope: GraphId, e: EdgeId) -> Vec<(String, AttrValue)> {
        let rec = self.g.edge(e);
        self.visible_pairs(scope, ObjKind::Edge, &rec.attrs)
    }

    fn visible_pairs(
        &self,
        scope: GraphId,
        kind: ObjKind,
        attrs: &[AttrValue],
    ) -> Vec<(String, AttrValue)> {
        let mut pairs: Vec<(String, AttrValue)> = Vec::new();
        for sym in self.g.dict(kind).iter_by_name() {
            let Some(&v) = attrs.get(sym.slot) else { continue };
            if !sym.print {
                continue;
            }
            if self.g.effective_default(scope, kind, sym.slot) == v {
                continue;
            }
            pairs.push((sym.name.as_str().to_owned(), v));
        }
        pairs
    }

}

fn attr_list(out: &mut String, pairs: &[(String, AttrValue)]) {
    if pairs.is_empty() {
        return;
    }
    out.push_str(" [");
    for (i, (name, v)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}={}", quote(name), value(v));
    }
    out.push(']');
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn is_blank(v: &AttrValue) -> bool {
    matches!(v, AttrValue::Str(s) if s.is_empty())
}

fn endpoint(name: &str, port: &Option<Port>) -> String {
    let mut s = quote(name);
    if let Some(p) = port {
        if let Some(pn) = p.name {
            s.push(':');
            s.push_str(&quote(pn.as_str()));
        }
        if let Some(c) = p.compass {
            s.push(':');
            s.push_str(c.as_str());
        }
    }
    s
}

fn value(v: &AttrValue) -> String {
    match v {
        AttrValue::Html(h) => format!("<{}>", h.as_str()),
        other => quote(&other.as_str()),
    }
}

/// Bare identifiers and numerals pass through; anything else is quoted
/// with `"` escaped.
fn quote(s: &str) -> String {
    if is_bare(s) {
        return s.to_owned();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn is_bare(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let first = s.chars().next().unwrap();
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c as u32 >= 0x80;
    if (first.is_alphabetic() || first == '_' || first as u32 >= 0x80)
        && s.chars().all(is_word)
    {
        // a bare keyword would change meaning when re-parsed
        return !matches!(
            s.to_ascii_lowercase().as_str(),
            "graph" | "digraph" | "subgraph" | "node" | "edge" | "strict"
        );
    }
    // numeral?
    let body = s.strip_prefix('-').unwrap_or(s);
    !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit() || c == '.')
        && body.chars().filter(|&c| c == '.').count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_graph;
    use pretty_assertions::assert_eq;

    #[test]
    fn quoting_rules() {
        assert_eq!(quote("abc"), "abc");
        assert_eq!(quote("a b"), "\"a b\"");
        assert_eq!(quote("3.14"), "3.14");
        assert_eq!(quote("-2"), "-2");
        assert_eq!(quote("node"), "\"node\"");
        assert_eq!(quote("he\"llo"), "\"he\\\"llo\"");
    }

    #[test]
    fn emits_minimal_digraph() {
        let g = parse_graph("digraph g { a -> b }").unwrap();
        let text = emit_graph(&g);
        assert!(text.starts_with("digraph g {"));
        assert!(text.contains("a -> b;"));
    }

    #[test]
    fn round_trip_preserves_structure() {
        let src = r#"strict digraph g {
            node [shape=box];
            a [color=red];
            subgraph cluster_x { b; c }
            a -> b [weight=2];
            b -> c;
        }"#;
        let g1 = parse_graph(src).unwrap();
        let text = emit_graph(&g1);
        let g2 = parse_graph(&text).unwrap();
        assert_eq!(g1.desc, g2.desc);
        assert_eq!(g1.node_count(), g2.node_count());
        assert_eq!(g1.edge_count(), g2.edge_count());
        for n1 in g1.nodes(ROOT) {
            let name = g1.node(n1).name;
            let n2 = g2.find_node(name.as_str()).expect("node survives");
            assert_eq!(
                g1.node_attr(n1, "color"),
                g2.node_attr(n2, "color"),
                "attr mismatch on {name}"
            );
            assert_eq!(g1.node_attr(n1, "shape"), g2.node_attr(n2, "shape"));
        }
        // emission is stable
        assert_eq!(text, emit_graph(&g2));
    }

    #[test]
    fn html_labels_round_trip() {
        let g1 = parse_graph("digraph { a [label=<<B>hi</B>>] }").unwrap();
        let text = emit_graph(&g1);
        assert!(text.contains("label=<<B>hi</B>>"));
        let g2 = parse_graph(&text).unwrap();
        let a = g2.find_node("a").unwrap();
        assert!(g2.node_attr(a, "label").unwrap().is_html());
    }
}
