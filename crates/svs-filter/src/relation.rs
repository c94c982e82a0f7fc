//! Relation tables: which node tuples satisfied which predicate, and when.
//!
//! Every tuple keeps a list of closed `[start, end]` time intervals.  Adding
//! a tuple at `t` extends an interval ending at `t - 1`, so a relation that
//! keeps holding costs one interval, not one entry per cycle.

use std::collections::BTreeMap;

use svs_types::NodeId;

#[derive(Debug, Clone, Default)]
pub struct Relation {
    arity: usize,
    tuples: BTreeMap<Vec<NodeId>, Vec<(u64, u64)>>,
}

impl Relation {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            tuples: BTreeMap::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Record that `args` held at `time`.
    ///
    /// # Panics
    ///
    /// When `args` does not have the relation's arity.
    pub fn add(&mut self, time: u64, args: &[NodeId]) {
        assert_eq!(
            args.len(),
            self.arity,
            "Relation::add: tuple of arity {} in relation of arity {}",
            args.len(),
            self.arity
        );
        let intervals = self.tuples.entry(args.to_vec()).or_default();
        if let Some(last) = intervals.last_mut() {
            if time >= last.0 && time <= last.1 {
                return;
            }
            if last.1 + 1 == time {
                last.1 = time;
                return;
            }
        }
        intervals.push((time, time));
    }

    pub fn holds_at(&self, time: u64, args: &[NodeId]) -> bool {
        self.tuples
            .get(args)
            .is_some_and(|iv| iv.iter().any(|&(s, e)| s <= time && time <= e))
    }

    /// Tuples holding at `time`, in sorted order.
    pub fn at(&self, time: u64) -> Vec<&[NodeId]> {
        self.tuples
            .iter()
            .filter(|(_, iv)| iv.iter().any(|&(s, e)| s <= time && time <= e))
            .map(|(t, _)| t.as_slice())
            .collect()
    }

    pub fn intervals(&self, args: &[NodeId]) -> &[(u64, u64)] {
        self.tuples.get(args).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct tuples ever recorded.
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

/// Relations by predicate name.
#[derive(Debug, Clone, Default)]
pub struct RelationTable {
    relations: BTreeMap<String, Relation>,
}

impl RelationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn get_or_insert(&mut self, name: &str, arity: usize) -> &mut Relation {
        self.relations
            .entry(name.to_string())
            .or_insert_with(|| Relation::new(arity))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }
}
