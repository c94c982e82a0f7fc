//! [`Svs`] – the per-agent driver.
//!
//! Each call to [`Svs::cycle`]:
//!
//! 1. **Input** – queued [`SceneUpdate`]s are applied to the scene.  Any
//!    successful update raises the dirty gate and marks the touched node.
//! 2. **Relations** – when enabled, the filter table re-evaluates relation
//!    predicates over tuples touching a dirty node and `^relations-time` is
//!    advanced.
//! 3. **Commands** – commands that appeared under `^command` are created
//!    (raising the gate), vanished ones are dropped, and every live command
//!    is updated.  Continuous extracts skip evaluation while the gate is low.
//! 4. The gate is lowered.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use svs_filter::{FilterTable, RelationTable};
use svs_scene::{Aabb, Scene, SharedScene};
use svs_types::{NodeId, SvsError};
use tracing::{debug, info, warn};

use crate::command::{Command, CommandContext, CommandTable, StatusSlot};
use crate::wm::{Identifier, WmeId, WorkingMemory};

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvsConfig {
    /// Maintain relation tables every cycle.
    pub relations: bool,
}

impl Default for SvsConfig {
    fn default() -> Self {
        Self { relations: true }
    }
}

/// A scene edit arriving from outside the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SceneUpdate {
    Add { name: String, bounds: Aabb },
    Remove { name: String },
    SetBounds { name: String, bounds: Aabb },
}

impl SceneUpdate {
    fn apply(&self, scene: &mut Scene) -> Result<NodeId, SvsError> {
        match self {
            SceneUpdate::Add { name, bounds } => scene.add_node(name, *bounds),
            SceneUpdate::Remove { name } => scene.remove_node(name),
            SceneUpdate::SetBounds { name, bounds } => scene.set_bounds(name, *bounds),
        }
    }
}

struct LiveCommand {
    root: Identifier,
    /// `None` when the name did not resolve; the status says why.
    command: Option<Box<dyn Command>>,
}

pub struct Svs {
    config: SvsConfig,
    scene: SharedScene,
    filters: FilterTable,
    commands: CommandTable,
    relations: RelationTable,
    root: Identifier,
    command_link: Identifier,
    time: u64,
    time_wme: Option<WmeId>,
    dirty: bool,
    dirty_nodes: HashSet<NodeId>,
    pending: Vec<SceneUpdate>,
    live: BTreeMap<WmeId, LiveCommand>,
}

impl Svs {
    /// Create the driver and its `(S ^command C)` link in `wm`.
    pub fn new(wm: &mut WorkingMemory, config: SvsConfig) -> Self {
        let scene = Scene::new().shared();
        let root = wm.make_id('S');
        let command_link = wm.make_id('C');
        wm.add(root, "command", command_link);
        Self {
            config,
            filters: FilterTable::with_builtins(&scene),
            commands: CommandTable::with_builtins(),
            scene,
            relations: RelationTable::new(),
            root,
            command_link,
            time: 0,
            time_wme: None,
            dirty: true,
            dirty_nodes: HashSet::new(),
            pending: Vec::new(),
            live: BTreeMap::new(),
        }
    }

    pub fn root(&self) -> Identifier {
        self.root
    }

    /// Where agents post commands.
    pub fn command_link(&self) -> Identifier {
        self.command_link
    }

    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    pub fn filter_table(&self) -> &FilterTable {
        &self.filters
    }

    pub fn command_table_mut(&mut self) -> &mut CommandTable {
        &mut self.commands
    }

    pub fn relations(&self) -> &RelationTable {
        &self.relations
    }

    /// Number of completed cycles.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Queue a scene edit for the start of the next cycle.
    pub fn queue(&mut self, update: SceneUpdate) {
        self.pending.push(update);
    }

    /// Run one cycle.  See the module docs.
    pub fn cycle(&mut self, wm: &mut WorkingMemory) {
        self.apply_input();
        if self.config.relations {
            self.update_relations(wm);
        }
        self.sync_commands(wm);
        self.update_commands(wm);

        self.dirty = false;
        self.dirty_nodes.clear();
        self.time += 1;
    }

    fn apply_input(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        let mut scene = self.scene.borrow_mut();
        for update in &pending {
            match update.apply(&mut scene) {
                Ok(id) => {
                    self.dirty = true;
                    self.dirty_nodes.insert(id);
                }
                Err(e) => warn!(error = %e, "scene update rejected"),
            }
        }
        if !pending.is_empty() {
            debug!(updates = pending.len(), nodes = scene.len(), "scene input applied");
        }
    }

    fn update_relations(&mut self, wm: &mut WorkingMemory) {
        let scene = self.scene.borrow();
        if self.time == 0 {
            self.dirty_nodes.extend(scene.nodes().iter().map(|n| n.id));
        }
        self.filters
            .update_relations(&scene, &self.dirty_nodes, self.time, &mut self.relations);

        if let Some(old) = self.time_wme.take() {
            wm.remove(old);
        }
        let time = i64::try_from(self.time).unwrap_or(i64::MAX);
        self.time_wme = Some(wm.add(self.root, "relations-time", time));
    }

    /// Create commands for new `^command` children and drop vanished ones.
    fn sync_commands(&mut self, wm: &mut WorkingMemory) {
        let posted: Vec<(WmeId, String, Option<Identifier>)> = wm
            .children(self.command_link)
            .iter()
            .map(|w| (w.handle, w.attr.clone(), w.value.as_id()))
            .collect();
        let present: HashSet<WmeId> = posted.iter().map(|(h, _, _)| *h).collect();

        let before = self.live.len();
        self.live.retain(|handle, _| present.contains(handle));
        if self.live.len() != before {
            debug!(dropped = before - self.live.len(), "commands removed");
        }

        for (handle, name, root) in posted {
            if self.live.contains_key(&handle) {
                continue;
            }
            let Some(root) = root else {
                debug!(command = %name, "command value is not an identifier");
                continue;
            };
            let command = match self.commands.make(&name, root) {
                Ok(cmd) => {
                    info!(command = %name, root = %root, "command created");
                    Some(cmd)
                }
                Err(e) => {
                    warn!(error = %e, "command rejected");
                    StatusSlot::default().set(wm, root, &e.to_string());
                    None
                }
            };
            self.dirty = true;
            self.live.insert(
                handle,
                LiveCommand { root, command },
            );
        }
    }

    fn update_commands(&mut self, wm: &mut WorkingMemory) {
        let mut ctx = CommandContext {
            wm,
            filters: &self.filters,
            dirty: self.dirty,
        };
        for live in self.live.values_mut() {
            if let Some(cmd) = live.command.as_mut() {
                let ok = cmd.update(&mut ctx);
                debug!(command = cmd.name(), root = %live.root, ok, "command updated");
            }
        }
    }
}

impl std::fmt::Debug for Svs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Svs")
            .field("root", &self.root)
            .field("time", &self.time)
            .field("dirty", &self.dirty)
            .field("commands", &self.live.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use svs_types::Vec3;

    fn cube(x: f64) -> Aabb {
        Aabb::around(Vec3::new(x, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.5))
    }

    #[test]
    fn config_defaults_when_fields_missing() {
        let c: SvsConfig = toml::from_str("").unwrap();
        assert!(c.relations);
        let c: SvsConfig = toml::from_str("relations = false").unwrap();
        assert!(!c.relations);
    }

    #[test]
    fn scene_update_wire_format() {
        let u: SceneUpdate = serde_json::from_str(
            r#"{"op":"set_bounds","name":"cup","bounds":{"min":{"x":0,"y":0,"z":0},"max":{"x":1,"y":1,"z":1}}}"#,
        )
        .unwrap();
        assert!(matches!(u, SceneUpdate::SetBounds { ref name, .. } if name == "cup"));
    }

    #[test]
    fn gate_lowered_after_cycle_and_raised_by_input() {
        let mut wm = WorkingMemory::new();
        let mut svs = Svs::new(&mut wm, SvsConfig::default());
        svs.cycle(&mut wm);
        assert!(!svs.is_dirty());

        svs.queue(SceneUpdate::Add {
            name: "a".to_string(),
            bounds: cube(0.0),
        });
        svs.cycle(&mut wm);
        assert_eq!(svs.scene().borrow().len(), 1);
        assert!(!svs.is_dirty());
        assert_eq!(svs.time(), 2);
    }

    #[test]
    fn rejected_update_leaves_gate_low() {
        let mut wm = WorkingMemory::new();
        let mut svs = Svs::new(&mut wm, SvsConfig::default());
        svs.cycle(&mut wm);
        svs.queue(SceneUpdate::Remove {
            name: "ghost".to_string(),
        });
        svs.apply_input();
        assert!(!svs.is_dirty());
    }

    #[test]
    fn relations_time_advances() {
        let mut wm = WorkingMemory::new();
        let mut svs = Svs::new(&mut wm, SvsConfig::default());
        svs.queue(SceneUpdate::Add {
            name: "a".to_string(),
            bounds: cube(0.0),
        });
        svs.queue(SceneUpdate::Add {
            name: "b".to_string(),
            bounds: cube(0.5),
        });
        svs.cycle(&mut wm);
        svs.cycle(&mut wm);
        assert_eq!(
            wm.find(svs.root(), "relations-time").cloned(),
            Some(crate::wm::Symbol::Int(1))
        );
        let intersect = svs.relations().get("intersect").unwrap();
        let scene = svs.scene().borrow();
        let (a, b) = (scene.node("a").unwrap().id, scene.node("b").unwrap().id);
        assert_eq!(intersect.intervals(&[a, b]), [(0, 1)]);
    }

    #[test]
    fn unknown_command_gets_status() {
        let mut wm = WorkingMemory::new();
        let mut svs = Svs::new(&mut wm, SvsConfig::default());
        let c = wm.make_id('F');
        wm.add(svs.command_link(), "levitate", c);
        svs.cycle(&mut wm);
        assert_eq!(
            wm.find(c, "status").and_then(|s| s.as_str()),
            Some("unknown command 'levitate'")
        );
    }
}
