//! Built-in filter behaviours.
//!
//! | Filter | Input | Output |
//! |---|---|---|
//! | `source` | none | whatever the owner pushes into the output |
//! | `const` | none | one fixed value |
//! | `combine` | concat | the first argument of every row, unchanged |
//! | `node` | `id` | reference to the named scene node |
//! | `all_nodes` | none | a reference to every scene node |
//! | `position` / `bbox` | `node` | centre / corners of the node |
//! | `distance` | `a`, `b` | distance between centres |
//! | `intersect` / `contain` / `above` | `a`, `b` | `Bool` predicate result |
//! | `intersect_select` | `a`, `b` | `a` while it intersects `b` |
//!
//! Scene-backed behaviours hold a [`SharedScene`] and borrow it only for
//! the duration of one update.

use std::collections::HashMap;

use svs_scene::predicates::{self, Predicate};
use svs_scene::{Scene, SceneNode, SharedScene};
use svs_types::{NodeId, SvsError};

use crate::change_tracking::ElemId;
use crate::filter::{Filter, FilterBehavior, OutputWriter};
use crate::input::FilterInput;
use crate::params::FilterParams;
use crate::table::{FilterTable, FilterTableEntry};
use crate::value::{FilterValue, NodeRef, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Source / const / pass-through
// ─────────────────────────────────────────────────────────────────────────────

/// Does nothing; the output is written by the filter's owner through
/// [`Filter::output_mut`].
#[derive(Debug, Default)]
pub struct SourceBehavior;

impl FilterBehavior for SourceBehavior {
    fn name(&self) -> &str {
        "source"
    }

    fn update_outputs(
        &mut self,
        _input: &FilterInput,
        _out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        Ok(())
    }
}

/// A filter whose output is fed from outside the pipeline.
pub fn source_filter() -> Filter {
    Filter::new(FilterInput::null(), Box::new(SourceBehavior))
}

struct ConstBehavior {
    value: FilterValue,
}

impl FilterBehavior for ConstBehavior {
    fn name(&self) -> &str {
        "const"
    }

    fn update_outputs(
        &mut self,
        _input: &FilterInput,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        if out.output().is_empty() {
            out.add(self.value.clone(), None);
        }
        Ok(())
    }
}

/// A filter producing exactly one value, forever.
pub fn const_filter(value: FilterValue) -> Filter {
    Filter::new(FilterInput::null(), Box::new(ConstBehavior { value }))
}

/// Republishes the first argument of every row.
#[derive(Debug, Default)]
pub struct PassthruBehavior {
    row2out: HashMap<ElemId, ElemId>,
}

impl FilterBehavior for PassthruBehavior {
    fn name(&self) -> &str {
        "combine"
    }

    fn update_outputs(
        &mut self,
        input: &FilterInput,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        let rows = input.rows();
        for (row, _) in rows.removed() {
            if let Some(o) = self.row2out.remove(&row) {
                out.remove(o);
            }
        }
        for (row, params) in rows.changed() {
            if let (Some(&o), Some(first)) = (self.row2out.get(&row), params.first()) {
                out.set(o, first.value.value().clone());
            }
        }
        for (row, params) in rows.added() {
            if let Some(first) = params.first() {
                let o = out.add(first.value.clone(), Some(row));
                self.row2out.insert(row, o);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.row2out.clear();
    }
}

/// Concatenates every upstream output into one list.
pub fn passthru_filter(input: FilterInput) -> Filter {
    Filter::new(input, Box::new(PassthruBehavior::default()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Per-row computations over the scene
// ─────────────────────────────────────────────────────────────────────────────

/// Computes one output value from one row.
pub type Compute = fn(&Scene, &FilterParams) -> Result<Value, SvsError>;

/// One output per row, recomputed when the row changes.
pub struct MapBehavior {
    name: &'static str,
    scene: SharedScene,
    compute: Compute,
    row2out: HashMap<ElemId, ElemId>,
}

impl MapBehavior {
    pub fn new(name: &'static str, scene: SharedScene, compute: Compute) -> Self {
        Self {
            name,
            scene,
            compute,
            row2out: HashMap::new(),
        }
    }
}

impl FilterBehavior for MapBehavior {
    fn name(&self) -> &str {
        self.name
    }

    fn update_outputs(
        &mut self,
        input: &FilterInput,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        let scene = self.scene.borrow();
        let rows = input.rows();
        for (row, _) in rows.removed() {
            if let Some(o) = self.row2out.remove(&row) {
                out.remove(o);
            }
        }
        for (row, params) in rows.changed() {
            let value = (self.compute)(&scene, params)?;
            if let Some(&o) = self.row2out.get(&row) {
                out.set(o, value);
            }
        }
        for (row, params) in rows.added() {
            let value = (self.compute)(&scene, params)?;
            let o = out.add(FilterValue::new(value), Some(row));
            self.row2out.insert(row, o);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.row2out.clear();
    }
}

/// Decides whether a row's first argument is passed on.
pub type Selector = fn(&Scene, &FilterParams) -> Result<bool, SvsError>;

/// Outputs a row's first argument while the selector holds for the row.
pub struct SelectBehavior {
    name: &'static str,
    scene: SharedScene,
    select: Selector,
    row2out: HashMap<ElemId, ElemId>,
}

impl SelectBehavior {
    pub fn new(name: &'static str, scene: SharedScene, select: Selector) -> Self {
        Self {
            name,
            scene,
            select,
            row2out: HashMap::new(),
        }
    }

    fn apply(
        &mut self,
        scene: &Scene,
        row: ElemId,
        params: &FilterParams,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        let Some(first) = params.first() else {
            return Ok(());
        };
        let keep = (self.select)(scene, params)?;
        match (keep, self.row2out.get(&row).copied()) {
            (true, Some(o)) => {
                out.set(o, first.value.value().clone());
            }
            (true, None) => {
                let o = out.add(first.value.clone(), Some(row));
                self.row2out.insert(row, o);
            }
            (false, Some(o)) => {
                self.row2out.remove(&row);
                out.remove(o);
            }
            (false, None) => {}
        }
        Ok(())
    }
}

impl FilterBehavior for SelectBehavior {
    fn name(&self) -> &str {
        self.name
    }

    fn update_outputs(
        &mut self,
        input: &FilterInput,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        let scene = self.scene.clone();
        let scene = scene.borrow();
        let rows = input.rows();
        for (row, _) in rows.removed() {
            if let Some(o) = self.row2out.remove(&row) {
                out.remove(o);
            }
        }
        for (row, params) in rows.changed().chain(rows.added()) {
            self.apply(&scene, row, params, out)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.row2out.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node references
// ─────────────────────────────────────────────────────────────────────────────

fn node_ref(node: &SceneNode) -> NodeRef {
    NodeRef {
        id: node.id,
        name: node.name.clone(),
    }
}

/// Resolves the `id` argument of each row to a scene node.
///
/// A reference is marked changed whenever the node's geometry version moves,
/// even if the row itself did not change.
pub struct NodeBehavior {
    scene: SharedScene,
    /// row → (output, node version last published)
    row2out: HashMap<ElemId, (ElemId, u64)>,
}

impl NodeBehavior {
    pub fn new(scene: SharedScene) -> Self {
        Self {
            scene,
            row2out: HashMap::new(),
        }
    }
}

fn lookup<'s>(scene: &'s Scene, params: &FilterParams) -> Result<&'s SceneNode, SvsError> {
    let name = params.typed::<String>("id")?;
    scene.node(&name).ok_or(SvsError::NodeNotFound(name))
}

impl FilterBehavior for NodeBehavior {
    fn name(&self) -> &str {
        "node"
    }

    fn update_outputs(
        &mut self,
        input: &FilterInput,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        let scene = self.scene.borrow();
        let rows = input.rows();
        for (row, _) in rows.removed() {
            if let Some((o, _)) = self.row2out.remove(&row) {
                out.remove(o);
            }
        }
        for (row, params) in rows.changed() {
            let node = lookup(&scene, params)?;
            if let Some((o, version)) = self.row2out.get_mut(&row) {
                out.set(*o, node_ref(node));
                *version = node.version;
            }
        }
        for (row, params) in rows.added() {
            let node = lookup(&scene, params)?;
            let o = out.add(FilterValue::from(node_ref(node)), Some(row));
            self.row2out.insert(row, (o, node.version));
        }
        for (row, params) in rows.old() {
            let node = lookup(&scene, params)?;
            if let Some((o, version)) = self.row2out.get_mut(&row) {
                if *version != node.version {
                    *version = node.version;
                    out.change(*o);
                }
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.row2out.clear();
    }
}

/// One reference per scene node, tracking node additions, removals and
/// geometry changes.
pub struct AllNodesBehavior {
    scene: SharedScene,
    known: HashMap<NodeId, (ElemId, u64)>,
}

impl AllNodesBehavior {
    pub fn new(scene: SharedScene) -> Self {
        Self {
            scene,
            known: HashMap::new(),
        }
    }
}

impl FilterBehavior for AllNodesBehavior {
    fn name(&self) -> &str {
        "all_nodes"
    }

    fn update_outputs(
        &mut self,
        _input: &FilterInput,
        out: &mut OutputWriter<'_>,
    ) -> Result<(), SvsError> {
        let scene = self.scene.borrow();

        let gone: Vec<NodeId> = self
            .known
            .keys()
            .filter(|id| scene.node_by_id(**id).is_none())
            .copied()
            .collect();
        for id in gone {
            if let Some((o, _)) = self.known.remove(&id) {
                out.remove(o);
            }
        }

        for node in scene.nodes() {
            match self.known.get_mut(&node.id) {
                Some((o, version)) => {
                    if *version != node.version {
                        *version = node.version;
                        out.change(*o);
                    }
                }
                None => {
                    let o = out.add(FilterValue::from(node_ref(node)), None);
                    self.known.insert(node.id, (o, node.version));
                }
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.known.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Computations
// ─────────────────────────────────────────────────────────────────────────────

fn scene_node<'s>(
    scene: &'s Scene,
    params: &FilterParams,
    name: &str,
) -> Result<&'s SceneNode, SvsError> {
    let r = params.typed::<NodeRef>(name)?;
    scene.node_by_id(r.id).ok_or(SvsError::NodeNotFound(r.name))
}

fn position(scene: &Scene, params: &FilterParams) -> Result<Value, SvsError> {
    let c = scene_node(scene, params, "node")?.bounds.centre();
    Ok(Value::Struct(vec![
        ("x".to_string(), Value::Float(c.x)),
        ("y".to_string(), Value::Float(c.y)),
        ("z".to_string(), Value::Float(c.z)),
    ]))
}

fn bbox(scene: &Scene, params: &FilterParams) -> Result<Value, SvsError> {
    let b = scene_node(scene, params, "node")?.bounds;
    Ok(Value::Struct(vec![
        ("min_x".to_string(), Value::Float(b.min.x)),
        ("min_y".to_string(), Value::Float(b.min.y)),
        ("min_z".to_string(), Value::Float(b.min.z)),
        ("max_x".to_string(), Value::Float(b.max.x)),
        ("max_y".to_string(), Value::Float(b.max.y)),
        ("max_z".to_string(), Value::Float(b.max.z)),
    ]))
}

fn distance(scene: &Scene, params: &FilterParams) -> Result<Value, SvsError> {
    let a = scene_node(scene, params, "a")?;
    let b = scene_node(scene, params, "b")?;
    Ok(Value::Float(predicates::centre_distance(a, b)))
}

fn binary(scene: &Scene, params: &FilterParams, pred: Predicate) -> Result<bool, SvsError> {
    let a = scene_node(scene, params, "a")?;
    let b = scene_node(scene, params, "b")?;
    Ok(pred(scene, &[a, b]))
}

fn intersect(scene: &Scene, params: &FilterParams) -> Result<Value, SvsError> {
    binary(scene, params, predicates::intersect).map(Value::Bool)
}

fn contain(scene: &Scene, params: &FilterParams) -> Result<Value, SvsError> {
    binary(scene, params, predicates::contain).map(Value::Bool)
}

fn above(scene: &Scene, params: &FilterParams) -> Result<Value, SvsError> {
    binary(scene, params, predicates::above).map(Value::Bool)
}

fn intersects(scene: &Scene, params: &FilterParams) -> Result<bool, SvsError> {
    binary(scene, params, predicates::intersect)
}

/// Register every scene-backed filter in `table`.
pub fn register_builtins(table: &mut FilterTable, scene: &SharedScene) {
    let s = scene.clone();
    table.register(
        FilterTableEntry::new("node")
            .parameters(&["id"])
            .factory(move |input| Filter::new(input, Box::new(NodeBehavior::new(s.clone())))),
    );

    let s = scene.clone();
    table.register(
        FilterTableEntry::new("all_nodes").factory(move |input| {
            Filter::new(input, Box::new(AllNodesBehavior::new(s.clone())))
        }),
    );

    // Relation predicates, with whether argument order matters.
    let relations: [(&str, Predicate, bool); 3] = [
        ("intersect", predicates::intersect, false),
        ("contain", predicates::contain, true),
        ("above", predicates::above, true),
    ];
    let maps: [(&'static str, &[&str], Compute); 6] = [
        ("position", &["node"], position),
        ("bbox", &["node"], bbox),
        ("distance", &["a", "b"], distance),
        ("intersect", &["a", "b"], intersect),
        ("contain", &["a", "b"], contain),
        ("above", &["a", "b"], above),
    ];
    for (name, params, compute) in maps {
        let s = scene.clone();
        let mut entry = FilterTableEntry::new(name)
            .parameters(params)
            .factory(move |input| {
                Filter::new(input, Box::new(MapBehavior::new(name, s.clone(), compute)))
            });
        if let Some((_, calc, ordered)) = relations.iter().find(|r| r.0 == name) {
            entry = entry.calc(*calc).ordered(*ordered);
        }
        table.register(entry);
    }

    let s = scene.clone();
    table.register(
        FilterTableEntry::new("intersect_select")
            .parameters(&["a", "b"])
            .factory(move |input| {
                Filter::new(
                    input,
                    Box::new(SelectBehavior::new("intersect_select", s.clone(), intersects)),
                )
            }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use svs_scene::Aabb;
    use svs_types::Vec3;

    fn cube(x: f64, y: f64, z: f64) -> Aabb {
        Aabb::around(Vec3::new(x, y, z), Vec3::new(0.5, 0.5, 0.5))
    }

    fn scene_with(nodes: &[(&str, Aabb)]) -> SharedScene {
        let scene = Scene::new().shared();
        for (name, b) in nodes {
            scene.borrow_mut().add_node(name, *b).unwrap();
        }
        scene
    }

    fn node_filter(scene: &SharedScene, name: &str) -> Filter {
        let mut input = FilterInput::product();
        input.add_param("id", const_filter(FilterValue::from(name)));
        Filter::new(input, Box::new(NodeBehavior::new(scene.clone())))
    }

    #[test]
    fn const_filter_survives_failure_reset() {
        let mut f = const_filter(FilterValue::from(7_i64));
        f.update().unwrap();
        f.update().unwrap();
        assert_eq!(f.output().num_current(), 1);
        f.output_mut().clear();
        f.update().unwrap();
        assert_eq!(f.output().get_current(0).1.get::<i64>(), Some(7));
    }

    #[test]
    fn node_filter_fails_for_missing_node() {
        let scene = scene_with(&[]);
        let mut f = node_filter(&scene, "ghost");
        assert_eq!(
            f.update(),
            Err(SvsError::NodeNotFound("ghost".to_string()))
        );
        assert!(f.output().is_empty());
        assert!(f.status().contains("ghost"));
    }

    #[test]
    fn node_filter_marks_moved_node_changed() {
        let scene = scene_with(&[("box", cube(0.0, 0.0, 0.0))]);
        let mut f = node_filter(&scene, "box");
        f.update().unwrap();
        f.output_mut().clear_changes();

        f.update().unwrap();
        assert_eq!(f.output().num_changed(), 0);

        scene
            .borrow_mut()
            .set_bounds("box", cube(1.0, 0.0, 0.0))
            .unwrap();
        f.update().unwrap();
        assert_eq!(f.output().num_changed(), 1);
    }

    #[test]
    fn all_nodes_tracks_scene() {
        let scene = scene_with(&[("a", cube(0.0, 0.0, 0.0)), ("b", cube(3.0, 0.0, 0.0))]);
        let mut f = Filter::new(
            FilterInput::null(),
            Box::new(AllNodesBehavior::new(scene.clone())),
        );
        f.update().unwrap();
        assert_eq!(f.output().num_current(), 2);
        f.output_mut().clear_changes();

        scene.borrow_mut().remove_node("a").unwrap();
        scene
            .borrow_mut()
            .add_node("c", cube(6.0, 0.0, 0.0))
            .unwrap();
        f.update().unwrap();
        assert_eq!(f.output().num_removed(), 1);
        assert_eq!(f.output().added().count(), 1);
        let names: Vec<String> = f
            .output()
            .current()
            .map(|(_, v)| v.get::<NodeRef>().unwrap().name)
            .collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn position_follows_node() {
        let scene = scene_with(&[("box", cube(1.0, 2.0, 3.0))]);
        let mut input = FilterInput::product();
        input.add_param("node", node_filter(&scene, "box"));
        let mut f = Filter::new(
            input,
            Box::new(MapBehavior::new("position", scene.clone(), position)),
        );
        f.update().unwrap();
        let rep = f.output().get_current(0).1.rep();
        assert_eq!(rep["x"], "1");
        assert_eq!(rep["z"], "3");
        f.output_mut().clear_changes();

        scene
            .borrow_mut()
            .set_bounds("box", cube(5.0, 2.0, 3.0))
            .unwrap();
        f.update().unwrap();
        assert_eq!(f.output().num_changed(), 1);
        assert_eq!(f.output().get_current(0).1.rep()["x"], "5");
    }

    #[test]
    fn intersect_select_withdraws_when_apart() {
        let scene = scene_with(&[("a", cube(0.0, 0.0, 0.0)), ("b", cube(0.5, 0.0, 0.0))]);
        let mut input = FilterInput::product();
        input.add_param("a", node_filter(&scene, "a"));
        input.add_param("b", node_filter(&scene, "b"));
        let mut f = Filter::new(
            input,
            Box::new(SelectBehavior::new("intersect_select", scene.clone(), intersects)),
        );
        f.update().unwrap();
        assert_eq!(f.output().num_current(), 1);
        f.output_mut().clear_changes();

        scene
            .borrow_mut()
            .set_bounds("b", cube(10.0, 0.0, 0.0))
            .unwrap();
        f.update().unwrap();
        assert!(f.output().is_empty());
        assert_eq!(f.output().num_removed(), 1);
    }

    #[test]
    fn passthru_republishes_first_argument() {
        let mut input = FilterInput::concat();
        input.add_param("a", const_filter(FilterValue::from(5_i64)));
        input.add_param("b", const_filter(FilterValue::from("hello")));
        let mut f = passthru_filter(input);
        f.update().unwrap();
        let values: Vec<String> = f.output().current().map(|(_, v)| v.to_string()).collect();
        assert_eq!(values, ["5", "hello"]);
    }
}
