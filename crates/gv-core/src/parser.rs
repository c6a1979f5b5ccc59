//! Parser for the graph-definition language → `Graph`.
//!
//! Built on `winnow` 0.7 for the token-level pieces; the statement
//! structure is a hand-driven recursive descent that owns the subgraph
//! stack and the pending endpoint sets of edge chains.
//!
//! Accepted grammar:
//!
//! ```text
//! graph := [ "strict" ] ( "graph" | "digraph" ) [ id ] "{" stmts "}"
//! stmt  := node-stmt | edge-stmt | attr-stmt | subg-stmt | id "=" id
//! attr-stmt := ( "graph" | "node" | "edge" ) attr-list
//! edge-stmt := endpoint ( edge-op endpoint )+ [ attr-list ]
//! endpoint  := node-id [ ":" port [ ":" compass ] ] | subg-stmt
//! subg-stmt := [ "subgraph" [ id ] ] "{" stmts "}"
//! ```
//!
//! Keywords are case-insensitive outside quotes. `//`, `/*…*/` and
//! `#…` comments are skipped. Quoted strings concatenate with `+`.
//! A value starting with `<` is an HTML-like label and is handed to the
//! label parser for validation.

use crate::attr::AttrValue;
use crate::error::ParseError;
use crate::html;
use crate::id::{GraphId, NodeId, ObjKind};
use crate::model::{Compass, Graph, GraphDesc, Port};
use winnow::ascii::take_escaped;
use winnow::combinator::alt;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::Parser as _;
use winnow::token::{none_of, one_of, take_till, take_while};

/// Subgraph nesting bound; exceeding it is a parse error.
const MAX_NEST: usize = 5000;

/// Parse one graph document. A failed parse yields no partial graph.
pub fn parse_graph(input: &str) -> Result<Graph, ParseError> {
    let mut p = Parser::new(input);
    p.parse_top()
}

// ─── Tokens ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    /// Identifier, numeral, or quoted string (quotes removed, `+`
    /// concatenation applied).
    Id(String),
    /// Raw HTML-like value without the outer angle brackets.
    Html(String),
    /// Keyword hit on an unquoted identifier.
    Kw(Kw),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Colon,
    Eq,
    /// `->` when true, `--` when false.
    EdgeOp(bool),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kw {
    Graph,
    Digraph,
    Subgraph,
    Node,
    Edge,
    Strict,
}

impl Tok {
    fn show(&self) -> String {
        match self {
            Tok::Id(s) => format!("'{s}'"),
            Tok::Html(_) => "<html label>".into(),
            Tok::Kw(k) => format!("'{}'", kw_str(*k)),
            Tok::LBrace => "'{'".into(),
            Tok::RBrace => "'}'".into(),
            Tok::LBracket => "'['".into(),
            Tok::RBracket => "']'".into(),
            Tok::Semi => "';'".into(),
            Tok::Comma => "','".into(),
            Tok::Colon => "':'".into(),
            Tok::Eq => "'='".into(),
            Tok::EdgeOp(true) => "'->'".into(),
            Tok::EdgeOp(false) => "'--'".into(),
            Tok::Eof => "end of input".into(),
        }
    }
}

fn kw_str(k: Kw) -> &'static str {
    match k {
        Kw::Graph => "graph",
        Kw::Digraph => "digraph",
        Kw::Subgraph => "subgraph",
        Kw::Node => "node",
        Kw::Edge => "edge",
        Kw::Strict => "strict",
    }
}

// ─── Token-level winnow parsers ──────────────────────────────────────

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c as u32 >= 0x80
}

fn lex_bare_id<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., is_id_char).parse_next(input)
}

/// Numerals: `[-]?(.d+ | d+(.d*)?)`.
fn lex_numeral<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    let start = *input;
    let mut len = 0;
    let bytes = start.as_bytes();
    if bytes.get(len) == Some(&b'-') {
        len += 1;
    }
    let digits = |b: &[u8], mut i: usize| {
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };
    if bytes.get(len) == Some(&b'.') {
        let end = digits(bytes, len + 1);
        if end == len + 1 {
            return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
        }
        len = end;
    } else {
        let end = digits(bytes, len);
        if end == len {
            return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
        }
        len = end;
        if bytes.get(len) == Some(&b'.') {
            len = digits(bytes, len + 1);
        }
    }
    let (tok, rest) = start.split_at(len);
    *input = rest;
    Ok(tok)
}

fn lex_quoted(input: &mut &str) -> ModalResult<String> {
    let _ = '"'.parse_next(input)?;
    let body = take_escaped(none_of(['"', '\\']), '\\', one_of(|_: char| true))
        .parse_next(input)?;
    let _ = '"'.parse_next(input)?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('"') => out.push('"'),
                Some('\n') => {} // line continuation
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

/// `<...>` with nesting; returns the body without the outer brackets.
fn lex_html(input: &mut &str) -> ModalResult<String> {
    let _ = '<'.parse_next(input)?;
    let mut depth = 1usize;
    let mut out = String::new();
    loop {
        let chunk = take_till::<_, _, winnow::error::ErrMode<ContextError>>(0.., ['<', '>']).parse_next(input)?;
        out.push_str(chunk);
        match alt(('<'.value(1i32), '>'.value(-1i32))).parse_next(input) {
            Ok(1) => {
                depth += 1;
                out.push('<');
            }
            Ok(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(out);
                }
                out.push('>');
            }
            Err(e) => return Err(e),
        }
    }
}

// ─── Lexer ───────────────────────────────────────────────────────────

struct Lexer<'s> {
    full: &'s str,
    rest: &'s str,
    /// Two most recent token spellings, newest last.
    recent: [String; 2],
}

impl<'s> Lexer<'s> {
    fn new(input: &'s str) -> Self {
        Self {
            full: input,
            rest: input,
            recent: [String::new(), String::new()],
        }
    }

    fn line(&self) -> usize {
        let consumed = self.full.len() - self.rest.len();
        self.full[..consumed].matches('\n').count() + 1
    }

    /// 1-based column of the cursor on its line.
    fn col(&self) -> usize {
        let consumed = self.full.len() - self.rest.len();
        let line_start = self.full[..consumed].rfind('\n').map_or(0, |i| i + 1);
        consumed - line_start + 1
    }

    fn near(&self) -> String {
        let [a, b] = &self.recent;
        if a.is_empty() {
            b.clone()
        } else {
            format!("{a} {b}")
        }
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line(), self.col(), self.near(), message)
    }

    fn skip_trivia(&mut self) {
        loop {
            let before = self.rest.len();
            self.rest = self.rest.trim_start();
            if let Some(r) = self.rest.strip_prefix("//") {
                self.rest = r.split_once('\n').map_or("", |(_, t)| t);
            } else if let Some(r) = self.rest.strip_prefix('#') {
                self.rest = r.split_once('\n').map_or("", |(_, t)| t);
            } else if let Some(r) = self.rest.strip_prefix("/*") {
                self.rest = r.split_once("*/").map_or("", |(_, t)| t);
            }
            if self.rest.len() == before {
                return;
            }
        }
    }

    fn record(&mut self, t: &Tok) {
        self.recent.swap(0, 1);
        self.recent[1] = t.show();
    }

    fn next(&mut self) -> Result<Tok, ParseError> {
        self.skip_trivia();
        // scan on a local cursor so diagnostics can read the lexer
        let mut rest = self.rest;
        let (line, col) = (self.line(), self.col());
        let near = self.near();
        let result = scan(&mut rest, line, col, &near);
        self.rest = rest;
        let tok = result?;
        self.record(&tok);
        Ok(tok)
    }
}

fn scan(input: &mut &str, line: usize, col: usize, near: &str) -> Result<Tok, ParseError> {
    if input.is_empty() {
        return Ok(Tok::Eof);
    }
    if let Some(r) = input.strip_prefix("->") {
        *input = r;
        return Ok(Tok::EdgeOp(true));
    }
    if let Some(r) = input.strip_prefix("--") {
        *input = r;
        return Ok(Tok::EdgeOp(false));
    }
    let c = input.chars().next().unwrap();
    let single = |input: &mut &str, t: Tok| {
        *input = &input[1..];
        Ok(t)
    };
    match c {
        '{' => return single(input, Tok::LBrace),
        '}' => return single(input, Tok::RBrace),
        '[' => return single(input, Tok::LBracket),
        ']' => return single(input, Tok::RBracket),
        ';' => return single(input, Tok::Semi),
        ',' => return single(input, Tok::Comma),
        ':' => return single(input, Tok::Colon),
        '=' => return single(input, Tok::Eq),
        _ => {}
    }
    if c == '<' {
        return lex_html(input)
            .map(Tok::Html)
            .map_err(|_| ParseError::new(line, col, near, "unterminated html string"));
    }
    if c == '"' {
        let mut s = lex_quoted(input)
            .map_err(|_| ParseError::new(line, col, near, "unterminated string"))?;
        // "a" + "b" concatenation
        loop {
            let save = *input;
            skip_trivia_str(input);
            if let Some(r) = input.strip_prefix('+') {
                *input = r;
                skip_trivia_str(input);
                match lex_quoted(input) {
                    Ok(more) => s.push_str(&more),
                    Err(_) => {
                        return Err(ParseError::new(line, col, near, "expected string after '+'"));
                    }
                }
            } else {
                *input = save;
                break;
            }
        }
        return Ok(Tok::Id(s));
    }
    if c == '-' || c == '.' || c.is_ascii_digit() {
        if let Ok(num) = lex_numeral(input) {
            return Ok(Tok::Id(num.to_owned()));
        }
    }
    if is_id_char(c) {
        let word = lex_bare_id(input).expect("leading char checked");
        let kw = match word.to_ascii_lowercase().as_str() {
            "graph" => Some(Kw::Graph),
            "digraph" => Some(Kw::Digraph),
            "subgraph" => Some(Kw::Subgraph),
            "node" => Some(Kw::Node),
            "edge" => Some(Kw::Edge),
            "strict" => Some(Kw::Strict),
            _ => None,
        };
        return Ok(match kw {
            Some(k) => Tok::Kw(k),
            None => Tok::Id(word.to_owned()),
        });
    }
    Err(ParseError::new(
        line,
        col,
        near,
        format!("unexpected character '{c}'"),
    ))
}

fn skip_trivia_str(input: &mut &str) {
    loop {
        let before = input.len();
        *input = input.trim_start();
        if let Some(r) = input.strip_prefix("//") {
            *input = r.split_once('\n').map_or("", |(_, t)| t);
        } else if let Some(r) = input.strip_prefix("/*") {
            *input = r.split_once("*/").map_or("", |(_, t)| t);
        }
        if input.len() == before {
            return;
        }
    }
}

// ─── Recursive descent ───────────────────────────────────────────────

/// An edge endpoint: a single node (with optional port) or the node set
/// of a subgraph.
enum Endpoint {
    Node(NodeId, Option<Port>),
    Sub(GraphId),
}

struct Parser<'s> {
    lx: Lexer<'s>,
    cur: Tok,
    depth: usize,
}

impl<'s> Parser<'s> {
    fn new(input: &'s str) -> Self {
        Self {
            lx: Lexer::new(input),
            cur: Tok::Eof,
            depth: 0,
        }
    }

    fn bump(&mut self) -> Result<(), ParseError> {
        self.cur = self.lx.next()?;
        Ok(())
    }

    fn expect(&mut self, t: Tok) -> Result<(), ParseError> {
        if self.cur == t {
            self.bump()
        } else {
            Err(self
                .lx
                .err(format!("expected {}, found {}", t.show(), self.cur.show())))
        }
    }

    fn parse_top(&mut self) -> Result<Graph, ParseError> {
        self.bump()?;
        let strict = if self.cur == Tok::Kw(Kw::Strict) {
            self.bump()?;
            true
        } else {
            false
        };
        let directed = match self.cur {
            Tok::Kw(Kw::Digraph) => true,
            Tok::Kw(Kw::Graph) => false,
            _ => {
                return Err(self.lx.err(format!(
                    "expected 'graph' or 'digraph', found {}",
                    self.cur.show()
                )));
            }
        };
        self.bump()?;
        let name = match std::mem::replace(&mut self.cur, Tok::Eof) {
            Tok::Id(s) => {
                self.bump()?;
                s
            }
            other => {
                self.cur = other;
                String::new()
            }
        };
        let mut desc = if directed {
            GraphDesc::directed()
        } else {
            GraphDesc::undirected()
        };
        if strict {
            desc = desc.strict();
        }
        let mut g = Graph::open(&name, desc);
        self.expect(Tok::LBrace)?;
        self.parse_stmts(&mut g, crate::id::ROOT)?;
        self.expect(Tok::RBrace)?;
        Ok(g)
    }

    fn parse_stmts(&mut self, g: &mut Graph, scope: GraphId) -> Result<(), ParseError> {
        loop {
            match &self.cur {
                Tok::RBrace | Tok::Eof => return Ok(()),
                Tok::Semi => self.bump()?,
                Tok::Kw(Kw::Graph) | Tok::Kw(Kw::Node) | Tok::Kw(Kw::Edge) => {
                    let kind = match self.cur {
                        Tok::Kw(Kw::Graph) => ObjKind::Graph,
                        Tok::Kw(Kw::Node) => ObjKind::Node,
                        _ => ObjKind::Edge,
                    };
                    self.bump()?;
                    let attrs = self.parse_attr_list()?;
                    for (name, value) in attrs {
                        g.set_attr_default(scope, kind, &name, value);
                    }
                }
                Tok::Kw(Kw::Subgraph) | Tok::LBrace => {
                    let sub = self.parse_subgraph(g, scope)?;
                    self.finish_endpoint_stmt(g, scope, Endpoint::Sub(sub))?;
                }
                Tok::Id(_) => {
                    let name = self.take_id()?;
                    if self.cur == Tok::Eq {
                        self.bump()?;
                        let value = self.take_value()?;
                        // bare assignment is the same default-install as
                        // a `graph [...]` statement
                        g.set_attr_default(scope, ObjKind::Graph, &name, value);
                    } else {
                        let ep = self.parse_node_endpoint(g, scope, name)?;
                        self.finish_endpoint_stmt(g, scope, ep)?;
                    }
                }
                other => {
                    return Err(self
                        .lx
                        .err(format!("unexpected {} in statement list", other.show())));
                }
            }
        }
    }

    fn take_id(&mut self) -> Result<String, ParseError> {
        match std::mem::replace(&mut self.cur, Tok::Eof) {
            Tok::Id(s) => {
                self.bump()?;
                Ok(s)
            }
            other => {
                let e = self
                    .lx
                    .err(format!("expected identifier, found {}", other.show()));
                self.cur = other;
                Err(e)
            }
        }
    }

    /// Attribute value: identifier or HTML string.
    fn take_value(&mut self) -> Result<AttrValue, ParseError> {
        match std::mem::replace(&mut self.cur, Tok::Eof) {
            Tok::Id(s) => {
                self.bump()?;
                Ok(AttrValue::str(&s))
            }
            Tok::Html(s) => {
                self.bump()?;
                Ok(AttrValue::html(&s))
            }
            other => {
                let e = self
                    .lx
                    .err(format!("expected attribute value, found {}", other.show()));
                self.cur = other;
                Err(e)
            }
        }
    }

    fn parse_subgraph(&mut self, g: &mut Graph, scope: GraphId) -> Result<GraphId, ParseError> {
        let mut name = None;
        if self.cur == Tok::Kw(Kw::Subgraph) {
            self.bump()?;
            if let Tok::Id(_) = self.cur {
                name = Some(self.take_id()?);
            }
        }
        let sub = g.open_subgraph(scope, name.as_deref());
        if self.cur == Tok::LBrace {
            self.depth += 1;
            if self.depth > MAX_NEST {
                return Err(self.lx.err("subgraph nesting too deep"));
            }
            self.bump()?;
            self.parse_stmts(g, sub)?;
            self.expect(Tok::RBrace)?;
            self.depth -= 1;
        }
        Ok(sub)
    }

    fn parse_node_endpoint(
        &mut self,
        g: &mut Graph,
        scope: GraphId,
        name: String,
    ) -> Result<Endpoint, ParseError> {
        let n = g.add_node(scope, &name);
        let mut port = None;
        if self.cur == Tok::Colon {
            self.bump()?;
            let first = self.take_id()?;
            if self.cur == Tok::Colon {
                self.bump()?;
                let second = self.take_id()?;
                let compass = Compass::parse(&second).ok_or_else(|| {
                    self.lx.err(format!("'{second}' is not a compass point"))
                })?;
                port = Some(Port {
                    name: Some(crate::id::Name::intern(&first)),
                    compass: Some(compass),
                });
            } else {
                // a single field that names a compass point is one
                port = Some(match Compass::parse(&first) {
                    Some(c) => Port {
                        name: None,
                        compass: Some(c),
                    },
                    None => Port {
                        name: Some(crate::id::Name::intern(&first)),
                        compass: None,
                    },
                });
            }
        }
        Ok(Endpoint::Node(n, port))
    }

    /// After the first endpoint of a statement: either an edge chain or
    /// a plain node/subgraph statement with an optional attribute list.
    fn finish_endpoint_stmt(
        &mut self,
        g: &mut Graph,
        scope: GraphId,
        first: Endpoint,
    ) -> Result<(), ParseError> {
        let mut chain = vec![first];
        while let Tok::EdgeOp(directed) = self.cur {
            if directed != g.desc.directed {
                return Err(self.lx.err(if directed {
                    "'->' is only valid in a digraph"
                } else {
                    "'--' is only valid in an undirected graph"
                }));
            }
            self.bump()?;
            let ep = match &self.cur {
                Tok::Kw(Kw::Subgraph) | Tok::LBrace => {
                    let sub = self.parse_subgraph(g, scope)?;
                    Endpoint::Sub(sub)
                }
                Tok::Id(_) => {
                    let name = self.take_id()?;
                    self.parse_node_endpoint(g, scope, name)?
                }
                other => {
                    return Err(self
                        .lx
                        .err(format!("expected edge endpoint, found {}", other.show())));
                }
            };
            chain.push(ep);
        }
        let attrs = if self.cur == Tok::LBracket {
            self.parse_attr_list()?
        } else {
            Vec::new()
        };
        if chain.len() == 1 {
            // node or bare subgraph statement; ports only bind on edges
            if let Endpoint::Node(n, _) = chain[0] {
                for (name, value) in &attrs {
                    g.set_node_attr(n, name, *value);
                }
            }
            return Ok(());
        }
        // Cartesian product of consecutive endpoint sets
        let mut created = Vec::new();
        for pair in chain.windows(2) {
            let tails = self.endpoint_nodes(g, &pair[0]);
            let heads = self.endpoint_nodes(g, &pair[1]);
            for &(t, tp) in &tails {
                for &(h, hp) in &heads {
                    let e = g.add_edge(scope, t, h, None);
                    let er = g.edge_mut(e);
                    if er.tail_port.is_none() {
                        er.tail_port = tp;
                    }
                    if er.head_port.is_none() {
                        er.head_port = hp;
                    }
                    created.push(e);
                }
            }
        }
        for (name, value) in &attrs {
            for &e in &created {
                g.set_edge_attr(e, name, *value);
            }
        }
        Ok(())
    }

    fn endpoint_nodes(&self, g: &Graph, ep: &Endpoint) -> Vec<(NodeId, Option<Port>)> {
        match ep {
            Endpoint::Node(n, p) => vec![(*n, *p)],
            Endpoint::Sub(sub) => g.nodes(*sub).map(|n| (n, None)).collect(),
        }
    }

    fn parse_attr_list(&mut self) -> Result<Vec<(String, AttrValue)>, ParseError> {
        let mut out = Vec::new();
        while self.cur == Tok::LBracket {
            self.bump()?;
            loop {
                match &self.cur {
                    Tok::RBracket => {
                        self.bump()?;
                        break;
                    }
                    Tok::Semi | Tok::Comma => self.bump()?,
                    Tok::Id(_) => {
                        let name = self.take_id()?;
                        let value = if self.cur == Tok::Eq {
                            self.bump()?;
                            self.take_value()?
                        } else {
                            AttrValue::str("true")
                        };
                        let value = self.validate_label(&name, value);
                        if let Some(value) = value {
                            out.push((name, value));
                        }
                    }
                    other => {
                        return Err(self
                            .lx
                            .err(format!("unexpected {} in attribute list", other.show())));
                    }
                }
            }
        }
        Ok(out)
    }

    /// HTML-marked values go through the label parser; a bad label is
    /// dropped with a warning and does not abort the graph parse.
    fn validate_label(&self, name: &str, value: AttrValue) -> Option<AttrValue> {
        if let AttrValue::Html(raw) = value {
            if let Err(e) = html::parse_label(raw.as_str()) {
                crate::warn_once!(
                    "ignoring malformed label for attribute '{name}' near line {}: {e}",
                    self.lx.line()
                );
                return None;
            }
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ROOT;
    use pretty_assertions::assert_eq;

    #[test]
    fn minimal_digraph() {
        let g = parse_graph("digraph { a -> b }").unwrap();
        assert!(g.desc.directed);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
        let names: Vec<&str> = g.nodes(ROOT).map(|n| g.node(n).name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn strict_cycle_is_three_edges() {
        let g = parse_graph("strict graph { a -- b -- c -- a }").unwrap();
        assert!(!g.desc.directed);
        assert!(g.desc.strict);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn edge_chain_cartesian_product() {
        let g = parse_graph("digraph { a -> {b c} -> d }").unwrap();
        assert_eq!(g.node_count(), 4);
        // a->b, a->c, b->d, c->d
        assert_eq!(g.edge_count(), 4);
        let a = g.find_node("a").unwrap();
        assert_eq!(g.edges_out(ROOT, a).len(), 2);
        let d = g.find_node("d").unwrap();
        assert_eq!(g.edges_in(ROOT, d).len(), 2);
    }

    #[test]
    fn attr_statements_scope_defaults() {
        let g = parse_graph(
            "digraph { node [shape=box]; a; subgraph s { node [shape=circle]; b } c }",
        )
        .unwrap();
        let a = g.find_node("a").unwrap();
        let b = g.find_node("b").unwrap();
        let c = g.find_node("c").unwrap();
        assert_eq!(g.node_attr(a, "shape"), Some(AttrValue::str("box")));
        assert_eq!(g.node_attr(b, "shape"), Some(AttrValue::str("circle")));
        assert_eq!(g.node_attr(c, "shape"), Some(AttrValue::str("box")));
    }

    #[test]
    fn quoted_concat_and_comments() {
        let g = parse_graph(
            "digraph { // line\n /* block */ # preprocessor\n a [label=\"he\" + \"llo\"] }",
        )
        .unwrap();
        let a = g.find_node("a").unwrap();
        assert_eq!(g.node_attr(a, "label"), Some(AttrValue::str("hello")));
    }

    #[test]
    fn keywords_case_insensitive() {
        let g = parse_graph("STRICT DIGRAPH g { a -> b }").unwrap();
        assert!(g.desc.strict);
        assert!(g.desc.directed);
        assert_eq!(g.name().as_str(), "g");
    }

    #[test]
    fn ports_and_compass() {
        let g = parse_graph("digraph { a:out:ne -> b:sw }").unwrap();
        let e = g.edges(ROOT).next().unwrap();
        let er = g.edge(e);
        let tp = er.tail_port.unwrap();
        assert_eq!(tp.name.unwrap().as_str(), "out");
        assert_eq!(tp.compass, Some(Compass::Ne));
        let hp = er.head_port.unwrap();
        assert_eq!(hp.name, None);
        assert_eq!(hp.compass, Some(Compass::Sw));
    }

    #[test]
    fn wrong_edge_op_is_an_error() {
        let e = parse_graph("graph { a -> b }").unwrap_err();
        assert!(e.message.contains("digraph"));
        assert_eq!(e.line, 1);
    }

    #[test]
    fn html_label_reaches_model() {
        let g = parse_graph("digraph { a [label=<<B>hi</B>>] }").unwrap();
        let a = g.find_node("a").unwrap();
        assert!(g.node_attr(a, "label").unwrap().is_html());
    }

    #[test]
    fn bad_html_label_is_dropped_not_fatal() {
        let g = parse_graph("digraph { a [label=<<B>unclosed>] }").unwrap();
        let a = g.find_node("a").unwrap();
        assert_eq!(g.node_attr(a, "label"), None);
    }

    #[test]
    fn error_carries_recent_tokens() {
        let e = parse_graph("digraph { a -> }").unwrap_err();
        assert!(e.near.contains("->"));
    }

    #[test]
    fn anonymous_subgraph_edges() {
        let g = parse_graph("digraph { {a b} -> c }").unwrap();
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn graph_level_assignment_installs_a_default() {
        let g = parse_graph("digraph { rankdir=LR; subgraph s { a } }").unwrap();
        assert_eq!(
            g.graph_attr(ROOT, "rankdir"),
            Some(AttrValue::str("LR"))
        );
        // the bare form is a default, inherited by descendant scopes
        let s = g.subgraphs_of(ROOT)[0];
        assert_eq!(g.graph_attr(s, "rankdir"), Some(AttrValue::str("LR")));
    }
}
