//! Dynamic attribute system: per-kind symbol dictionaries with dense
//! value slots, tagged values, and subgraph-level default overrides.

use crate::id::Name;
use std::collections::HashMap;
use std::fmt;

/// A tagged attribute value. Tagging avoids re-parsing numeric and
/// boolean attributes on every read, and carries the HTML-ness of a
/// label in the value itself so reassignment across types is a plain
/// replacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue {
    Str(Name),
    /// An HTML-like label; the raw markup without the outer `<` `>`.
    Html(Name),
    Bool(bool),
    Int(i64),
    Double(f64),
}

impl AttrValue {
    pub fn str(s: &str) -> Self {
        AttrValue::Str(Name::intern(s))
    }

    pub fn html(s: &str) -> Self {
        AttrValue::Html(Name::intern(s))
    }

    pub fn is_html(&self) -> bool {
        matches!(self, AttrValue::Html(_))
    }

    /// String form of the value, as the emitter prints it.
    pub fn as_str(&self) -> String {
        match self {
            AttrValue::Str(n) | AttrValue::Html(n) => n.as_str().to_owned(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Double(d) => {
                if d.fract() == 0.0 && d.abs() < 1e15 {
                    format!("{d:.0}")
                } else {
                    d.to_string()
                }
            }
        }
    }

    pub fn to_double(&self) -> Option<f64> {
        match self {
            AttrValue::Double(d) => Some(*d),
            AttrValue::Int(i) => Some(*i as f64),
            AttrValue::Bool(_) | AttrValue::Html(_) => None,
            AttrValue::Str(n) => n.as_str().trim().parse().ok(),
        }
    }

    pub fn to_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Double(d) => Some(*d as i64),
            AttrValue::Bool(_) | AttrValue::Html(_) => None,
            AttrValue::Str(n) => n.as_str().trim().parse().ok(),
        }
    }

    /// Boolean reading with the usual spellings; numbers read as != 0.
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            AttrValue::Int(i) => Some(*i != 0),
            AttrValue::Double(d) => Some(*d != 0.0),
            AttrValue::Html(_) => None,
            AttrValue::Str(n) => match n.as_str().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                s => s.parse::<i64>().ok().map(|v| v != 0),
            },
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// One dictionary entry per attribute name per object kind.
#[derive(Debug, Clone)]
pub struct AttrSymbol {
    pub name: Name,
    /// Dense index into each object's value array.
    pub slot: usize,
    /// Default installed at registration and returned for objects that
    /// never set the attribute.
    pub default: AttrValue,
    /// Written on serialization?
    pub print: bool,
    /// Not inheritable by nested subgraphs.
    pub fixed: bool,
}

/// Per-kind attribute dictionary held by the root graph. Slot order is
/// registration order; name lookup is O(1).
#[derive(Debug, Default, Clone)]
pub struct AttrDict {
    syms: Vec<AttrSymbol>,
    by_name: HashMap<Name, usize>,
}

impl AttrDict {
    pub fn len(&self) -> usize {
        self.syms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }

    pub fn lookup(&self, name: Name) -> Option<&AttrSymbol> {
        self.by_name.get(&name).map(|&i| &self.syms[i])
    }

    pub fn by_slot(&self, slot: usize) -> &AttrSymbol {
        &self.syms[slot]
    }

    /// Register a new symbol; returns the existing one unchanged if the
    /// name is already present.
    pub fn register(&mut self, name: Name, default: AttrValue) -> &AttrSymbol {
        if let Some(&i) = self.by_name.get(&name) {
            return &self.syms[i];
        }
        let slot = self.syms.len();
        self.syms.push(AttrSymbol {
            name,
            slot,
            default,
            print: true,
            fixed: false,
        });
        self.by_name.insert(name, slot);
        &self.syms[slot]
    }

    pub fn set_default(&mut self, slot: usize, value: AttrValue) {
        self.syms[slot].default = value;
    }

    /// Symbols in slot (registration) order.
    pub fn iter(&self) -> impl Iterator<Item = &AttrSymbol> {
        self.syms.iter()
    }

    /// Symbols sorted by name, for serialization.
    pub fn iter_by_name(&self) -> Vec<&AttrSymbol> {
        let mut v: Vec<_> = self.syms.iter().collect();
        v.sort_by_key(|s| s.name.as_str());
        v
    }
}

/// Default overrides a subgraph installs over its parent's view, keyed
/// by symbol slot. The effective default for a graph is found by walking
/// self → parent → root.
pub type AttrOverrides = HashMap<usize, AttrValue>;
