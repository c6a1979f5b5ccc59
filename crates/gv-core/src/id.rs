use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for graph/node/edge/attribute names — fast
/// comparisons, low memory. All name duplication in the model goes
/// through this table.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned name. Internally a `Spur` index — 4 bytes,
/// Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Spur);

impl Name {
    /// Intern a new string, or return the existing key if already interned.
    pub fn intern(s: &str) -> Self {
        Name(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &'static str {
        INTERNER.resolve(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three kinds of attributed objects. Doubles as an index into
/// per-kind dictionaries and sequence counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjKind {
    Graph = 0,
    Node = 1,
    Edge = 2,
}

impl ObjKind {
    pub const ALL: [ObjKind; 3] = [ObjKind::Graph, ObjKind::Node, ObjKind::Edge];

    pub fn ix(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ObjKind::Graph => "graph",
            ObjKind::Node => "node",
            ObjKind::Edge => "edge",
        }
    }
}

macro_rules! object_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

object_id!(
    /// Id of a node record, unique within its root graph.
    NodeId
);
object_id!(
    /// Id of an edge record, unique within its root graph.
    EdgeId
);
object_id!(
    /// Id of a graph or subgraph record. The root graph is always id 0.
    GraphId
);

/// Root-graph id of the main graph record.
pub const ROOT: GraphId = GraphId(0);

/// Sequence numbers are 28-bit creation counters; iteration order is
/// everywhere defined by them.
pub const SEQ_MAX: u32 = (1 << 28) - 1;

/// Hands out object ids and per-kind sequence numbers for one root graph.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_id: u64,
    seq: [u32; 3],
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh id from the shared 64-bit id space.
    pub fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self
            .next_id
            .checked_add(1)
            .unwrap_or_else(|| panic!("object id space exhausted"));
        id
    }

    /// Next sequence number for `kind`. Exhausting the 28-bit space is
    /// fatal, matching the allocation-failure policy.
    pub fn alloc_seq(&mut self, kind: ObjKind) -> u32 {
        let s = self.seq[kind.ix()];
        assert!(s < SEQ_MAX, "sequence counter exhausted for {}", kind.label());
        self.seq[kind.ix()] = s + 1;
        s
    }

    pub fn seq_count(&self, kind: ObjKind) -> u32 {
        self.seq[kind.ix()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = Name::intern("alpha");
        let b = Name::intern("alpha");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "alpha");
    }

    #[test]
    fn sequence_numbers_are_per_kind() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_seq(ObjKind::Node), 0);
        assert_eq!(alloc.alloc_seq(ObjKind::Node), 1);
        assert_eq!(alloc.alloc_seq(ObjKind::Edge), 0);
        assert_eq!(alloc.alloc_seq(ObjKind::Graph), 0);
    }

    #[test]
    fn ids_are_shared_across_kinds() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_id(), 0);
        assert_eq!(alloc.alloc_id(), 1);
    }
}
