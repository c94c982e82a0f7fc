//! [`WorkingMemory`] – the host symbol graph commands are read from and
//! results are written to.
//!
//! Memory is a graph of identifiers.  Each identifier owns an ordered list
//! of working-memory elements (WMEs), `(id ^attr value)`, where the value is
//! either another identifier or a constant.
//!
//! Removing a WME whose value is an identifier no other WME points to also
//! removes that identifier's whole subtree, so dropping a result record
//! drops everything written under it.
//!
//! # Example
//!
//! ```rust
//! use svs_runtime::wm::{Symbol, WorkingMemory};
//!
//! let mut wm = WorkingMemory::new();
//! let root = wm.make_id('S');
//! let spec = wm.make_id('F');
//! let link = wm.add(root, "extract", spec);
//! wm.add(spec, "type", "node");
//!
//! assert_eq!(wm.find(spec, "type"), Some(&Symbol::from("node")));
//! wm.remove(link);
//! assert!(!wm.exists(spec));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

// ─────────────────────────────────────────────────────────────────────────────
// Symbols
// ─────────────────────────────────────────────────────────────────────────────

/// An identifier, printed as a letter followed by a number (`S1`, `F3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    letter: char,
    number: u64,
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.letter, self.number)
    }
}

/// A WME value.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Id(Identifier),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Symbol {
    pub fn as_id(&self) -> Option<Identifier> {
        match self {
            Symbol::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Symbol::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a textual representation back into the narrowest constant:
    /// integer, then float, then string.
    pub fn from_text(text: &str) -> Self {
        if let Ok(i) = text.parse::<i64>() {
            Symbol::Int(i)
        } else if let Ok(f) = text.parse::<f64>() {
            Symbol::Float(f)
        } else {
            Symbol::Str(text.to_string())
        }
    }

    fn hash_into(&self, h: &mut DefaultHasher) {
        match self {
            Symbol::Id(_) => 0u8.hash(h),
            Symbol::Int(i) => {
                1u8.hash(h);
                i.hash(h);
            }
            Symbol::Float(f) => {
                2u8.hash(h);
                f.to_bits().hash(h);
            }
            Symbol::Str(s) => {
                3u8.hash(h);
                s.hash(h);
            }
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Id(id) => write!(f, "{id}"),
            Symbol::Int(i) => write!(f, "{i}"),
            Symbol::Float(x) => write!(f, "{x}"),
            Symbol::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<Identifier> for Symbol {
    fn from(v: Identifier) -> Self {
        Symbol::Id(v)
    }
}

impl From<i64> for Symbol {
    fn from(v: i64) -> Self {
        Symbol::Int(v)
    }
}

impl From<f64> for Symbol {
    fn from(v: f64) -> Self {
        Symbol::Float(v)
    }
}

impl From<&str> for Symbol {
    fn from(v: &str) -> Self {
        Symbol::Str(v.to_string())
    }
}

impl From<String> for Symbol {
    fn from(v: String) -> Self {
        Symbol::Str(v)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WMEs
// ─────────────────────────────────────────────────────────────────────────────

/// Handle of one WME.  Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WmeId(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Wme {
    pub handle: WmeId,
    pub id: Identifier,
    pub attr: String,
    pub value: Symbol,
}

// ─────────────────────────────────────────────────────────────────────────────
// WorkingMemory
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct WorkingMemory {
    children: HashMap<Identifier, Vec<Wme>>,
    /// WME handle → identifier holding it.
    owners: HashMap<WmeId, Identifier>,
    next_number: u64,
    next_wme: u64,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh identifier with no children.
    pub fn make_id(&mut self, letter: char) -> Identifier {
        self.next_number += 1;
        let id = Identifier {
            letter: letter.to_ascii_uppercase(),
            number: self.next_number,
        };
        self.children.insert(id, Vec::new());
        id
    }

    pub fn exists(&self, id: Identifier) -> bool {
        self.children.contains_key(&id)
    }

    /// Add `(id ^attr value)`.
    ///
    /// # Panics
    ///
    /// When `id` (or an identifier `value`) does not exist.
    pub fn add(&mut self, id: Identifier, attr: &str, value: impl Into<Symbol>) -> WmeId {
        let value = value.into();
        if let Symbol::Id(v) = value {
            assert!(self.exists(v), "WorkingMemory::add: value {v} does not exist");
        }
        self.next_wme += 1;
        let handle = WmeId(self.next_wme);
        let Some(list) = self.children.get_mut(&id) else {
            panic!("WorkingMemory::add: identifier {id} does not exist");
        };
        list.push(Wme {
            handle,
            id,
            attr: attr.to_string(),
            value,
        });
        self.owners.insert(handle, id);
        handle
    }

    /// Remove a WME, collecting any identifier it leaves unreachable.
    /// Returns `false` when the WME is already gone.
    pub fn remove(&mut self, handle: WmeId) -> bool {
        let Some(owner) = self.owners.remove(&handle) else {
            return false;
        };
        let Some(list) = self.children.get_mut(&owner) else {
            return false;
        };
        let Some(pos) = list.iter().position(|w| w.handle == handle) else {
            return false;
        };
        let wme = list.remove(pos);
        if let Symbol::Id(child) = wme.value {
            self.collect(child);
        }
        true
    }

    fn collect(&mut self, id: Identifier) {
        let referenced = self
            .children
            .values()
            .flatten()
            .any(|w| w.value == Symbol::Id(id));
        if referenced {
            return;
        }
        let Some(list) = self.children.remove(&id) else {
            return;
        };
        for w in list {
            self.owners.remove(&w.handle);
            if let Symbol::Id(child) = w.value {
                self.collect(child);
            }
        }
    }

    /// Children of `id` in insertion order.  Empty for unknown identifiers.
    pub fn children(&self, id: Identifier) -> &[Wme] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, handle: WmeId) -> Option<&Wme> {
        let owner = self.owners.get(&handle)?;
        self.children(*owner).iter().find(|w| w.handle == handle)
    }

    /// Value of the first `^attr` child of `id`.
    pub fn find(&self, id: Identifier, attr: &str) -> Option<&Symbol> {
        self.children(id)
            .iter()
            .find(|w| w.attr == attr)
            .map(|w| &w.value)
    }

    /// Structural hash of the subtree under `root`.  Root-level attributes
    /// named in `skip` are left out.
    ///
    /// Identifier names do not contribute, so rebuilding an identical spec
    /// under fresh identifiers gives the same fingerprint.
    pub fn fingerprint(&self, root: Identifier, skip: &[&str]) -> u64 {
        let mut h = DefaultHasher::new();
        let mut visited = HashSet::new();
        self.hash_subtree(root, skip, &mut visited, &mut h);
        h.finish()
    }

    fn hash_subtree(
        &self,
        id: Identifier,
        skip: &[&str],
        visited: &mut HashSet<Identifier>,
        h: &mut DefaultHasher,
    ) {
        if !visited.insert(id) {
            "<cycle>".hash(h);
            return;
        }
        for w in self.children(id) {
            if skip.contains(&w.attr.as_str()) {
                continue;
            }
            w.attr.hash(h);
            w.value.hash_into(h);
            if let Symbol::Id(child) = w.value {
                self.hash_subtree(child, &[], visited, h);
            }
        }
        "<end>".hash(h);
    }

    /// Indented rendering of the subtree under `root`.
    pub fn dump(&self, root: Identifier) -> String {
        let mut out = String::new();
        let mut visited = HashSet::new();
        self.dump_into(root, 0, &mut visited, &mut out);
        out
    }

    fn dump_into(
        &self,
        id: Identifier,
        depth: usize,
        visited: &mut HashSet<Identifier>,
        out: &mut String,
    ) {
        if !visited.insert(id) {
            return;
        }
        for w in self.children(id) {
            let _ = writeln!(out, "{:indent$}^{} {}", "", w.attr, w.value, indent = depth * 2);
            if let Symbol::Id(child) = w.value {
                self.dump_into(child, depth + 1, visited, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_unique() {
        let mut wm = WorkingMemory::new();
        let a = wm.make_id('s');
        let b = wm.make_id('S');
        assert_ne!(a, b);
        assert!(a.to_string().starts_with('S'));
    }

    #[test]
    fn remove_collects_unreachable_subtree() {
        let mut wm = WorkingMemory::new();
        let root = wm.make_id('S');
        let r = wm.make_id('R');
        let v = wm.make_id('V');
        let link = wm.add(root, "record", r);
        wm.add(r, "value", v);
        let leaf = wm.add(v, "x", 1.5);

        assert!(wm.remove(link));
        assert!(!wm.exists(r));
        assert!(!wm.exists(v));
        assert!(wm.get(leaf).is_none());
        assert!(!wm.remove(link));
    }

    #[test]
    fn shared_identifier_survives() {
        let mut wm = WorkingMemory::new();
        let root = wm.make_id('S');
        let shared = wm.make_id('N');
        let a = wm.add(root, "a", shared);
        wm.add(root, "b", shared);
        wm.remove(a);
        assert!(wm.exists(shared));
    }

    #[test]
    fn fingerprint_skips_root_attrs_and_ignores_id_names() {
        let mut wm = WorkingMemory::new();
        let build = |wm: &mut WorkingMemory| {
            let root = wm.make_id('F');
            let a = wm.make_id('A');
            wm.add(root, "type", "intersect");
            wm.add(root, "a", a);
            wm.add(a, "type", "node");
            wm.add(a, "id", "box");
            root
        };
        let one = build(&mut wm);
        let two = build(&mut wm);
        let skip = ["status", "result"];
        assert_eq!(wm.fingerprint(one, &skip), wm.fingerprint(two, &skip));

        let before = wm.fingerprint(one, &skip);
        wm.add(one, "status", "success");
        assert_eq!(wm.fingerprint(one, &skip), before);

        wm.add(one, "extra", 3_i64);
        assert_ne!(wm.fingerprint(one, &skip), before);
    }

    #[test]
    fn from_text_picks_narrowest() {
        assert_eq!(Symbol::from_text("3"), Symbol::Int(3));
        assert_eq!(Symbol::from_text("0.5"), Symbol::Float(0.5));
        assert_eq!(Symbol::from_text("box"), Symbol::Str("box".to_string()));
    }

    #[test]
    fn dump_indents_children() {
        let mut wm = WorkingMemory::new();
        let root = wm.make_id('S');
        let c = wm.make_id('C');
        wm.add(root, "command", c);
        wm.add(c, "n", 1_i64);
        let text = wm.dump(root);
        assert!(text.contains("^command C"));
        assert!(text.contains("\n  ^n 1"));
    }
}
