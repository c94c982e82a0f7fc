//! [`FilterTable`] – the registry of filter types.
//!
//! Each entry names a filter type and may carry
//!
//! - a **factory** turning a prepared [`FilterInput`] into a [`Filter`], and
//! - a **calc** predicate evaluated over every node tuple of the scene to
//!   maintain the relation tables.
//!
//! The table is built once per driver instance with
//! [`FilterTable::with_builtins`] and passed explicitly to whoever needs it.

use std::collections::{HashMap, HashSet};

use svs_scene::predicates::Predicate;
use svs_scene::{Scene, SceneNode, SharedScene};
use svs_types::NodeId;
use tracing::debug;

use crate::builtin;
use crate::combination::{CombinationGenerator, permutations};
use crate::filter::Filter;
use crate::input::FilterInput;
use crate::relation::RelationTable;

/// Builds a filter of one type around a prepared input.
pub type FilterFactory = Box<dyn Fn(FilterInput) -> Filter>;

pub struct FilterTableEntry {
    pub name: String,
    pub parameters: Vec<String>,
    /// Whether argument order matters to `calc`.
    pub ordered: bool,
    /// Whether `calc` may receive the same node twice.
    pub allow_repeat: bool,
    pub create: Option<FilterFactory>,
    pub calc: Option<Predicate>,
}

impl FilterTableEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            ordered: false,
            allow_repeat: false,
            create: None,
            calc: None,
        }
    }

    pub fn parameters(mut self, names: &[&str]) -> Self {
        self.parameters = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn allow_repeat(mut self, allow: bool) -> Self {
        self.allow_repeat = allow;
        self
    }

    pub fn factory(mut self, f: impl Fn(FilterInput) -> Filter + 'static) -> Self {
        self.create = Some(Box::new(f));
        self
    }

    pub fn calc(mut self, pred: Predicate) -> Self {
        self.calc = Some(pred);
        self
    }
}

impl std::fmt::Debug for FilterTableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterTableEntry")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("ordered", &self.ordered)
            .field("allow_repeat", &self.allow_repeat)
            .field("create", &self.create.is_some())
            .field("calc", &self.calc.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct FilterTable {
    entries: HashMap<String, FilterTableEntry>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding every built-in filter, bound to `scene`.
    pub fn with_builtins(scene: &SharedScene) -> Self {
        let mut table = Self::new();
        builtin::register_builtins(&mut table, scene);
        table
    }

    /// Add or replace the entry under `entry.name`.
    pub fn register(&mut self, entry: FilterTableEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&FilterTableEntry> {
        self.entries.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a filter of type `name`.  `None` for unknown names and for
    /// entries without a factory; the input is dropped in that case.
    pub fn make_filter(&self, name: &str, input: FilterInput) -> Option<Filter> {
        let create = self.entries.get(name)?.create.as_ref()?;
        Some(create(input))
    }

    fn calc_entries(&self) -> impl Iterator<Item = (&FilterTableEntry, Predicate)> {
        let mut entries: Vec<_> = self
            .entries
            .values()
            .filter_map(|e| e.calc.map(|c| (e, c)))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.name.cmp(&b.0.name));
        entries.into_iter()
    }

    /// Every predicate atom that currently holds, e.g. `intersect(a,b)`,
    /// sorted.
    pub fn all_atoms(&self, scene: &Scene) -> Vec<String> {
        let nodes: Vec<&SceneNode> = scene.nodes().iter().collect();
        let mut atoms = Vec::new();
        for (entry, calc) in self.calc_entries() {
            let arity = entry.parameters.len();
            let combos =
                CombinationGenerator::new(nodes.clone(), arity, entry.ordered, entry.allow_repeat);
            for combo in combos {
                if !calc(scene, &combo) {
                    continue;
                }
                let tuples = if entry.ordered {
                    vec![combo]
                } else {
                    permutations(&combo)
                };
                for t in tuples {
                    let args: Vec<&str> = t.iter().map(|n| n.name.as_str()).collect();
                    atoms.push(format!("{}({})", entry.name, args.join(",")));
                }
            }
        }
        atoms.sort();
        atoms.dedup();
        atoms
    }

    /// Record in `out` every relation tuple holding at `time`.
    ///
    /// Tuples without a node in `dirty` are not re-evaluated: they hold at
    /// `time` exactly when they held at `time - 1`.
    pub fn update_relations(
        &self,
        scene: &Scene,
        dirty: &HashSet<NodeId>,
        time: u64,
        out: &mut RelationTable,
    ) {
        let nodes: Vec<&SceneNode> = scene.nodes().iter().collect();
        for (entry, calc) in self.calc_entries() {
            let arity = entry.parameters.len();
            let relation = out.get_or_insert(&entry.name, arity);
            let mut evaluated = 0usize;
            let combos =
                CombinationGenerator::new(nodes.clone(), arity, entry.ordered, entry.allow_repeat);
            for combo in combos {
                let ids: Vec<NodeId> = combo.iter().map(|n| n.id).collect();
                let tuples = if entry.ordered {
                    vec![ids]
                } else {
                    permutations(&ids)
                };

                if !ids_touch(&tuples[0], dirty) {
                    if time > 0 && relation.holds_at(time - 1, &tuples[0]) {
                        for t in &tuples {
                            relation.add(time, t);
                        }
                    }
                    continue;
                }

                evaluated += 1;
                if calc(scene, &combo) {
                    for t in &tuples {
                        relation.add(time, t);
                    }
                }
            }
            debug!(relation = %entry.name, time, evaluated, "relation updated");
        }
    }
}

fn ids_touch(ids: &[NodeId], dirty: &HashSet<NodeId>) -> bool {
    ids.iter().any(|id| dirty.contains(id))
}
