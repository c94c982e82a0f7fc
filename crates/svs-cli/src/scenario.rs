//! Scenario files: a scene, the commands an agent posts, and the scene
//! edits that arrive on later cycles.
//!
//! ```toml
//! [[nodes]]
//! name = "table"
//! bounds = { min = { x = -1, y = -1, z = -0.5 }, max = { x = 1, y = 1, z = 0.5 } }
//!
//! [[commands]]
//! name = "extract"
//! spec = { type = "above", a = { type = "node", id = "cup" }, b = { type = "node", id = "table" } }
//!
//! [[cycles]]
//! updates = [{ op = "remove", name = "cup" }]
//! ```
//!
//! Filter specs are nested tables.  Each key becomes one attribute of a fresh
//! identifier, arrays post the same attribute once per element, and
//! booleans are written as the strings `true`/`false`.

use serde::Deserialize;
use svs_runtime::{Identifier, SceneUpdate, Svs, Symbol, WorkingMemory};
use svs_scene::Aabb;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub bounds: Aabb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Command name, e.g. `extract` or `extract_once`.
    pub name: String,
    pub spec: toml::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CycleSpec {
    #[serde(default)]
    pub updates: Vec<SceneUpdate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub nodes: Vec<NodeSpec>,
    pub commands: Vec<CommandSpec>,
    pub cycles: Vec<CycleSpec>,
}

impl Scenario {
    pub fn from_toml(raw: &str) -> Result<Self, String> {
        toml::from_str(raw).map_err(|e| format!("Failed to parse scenario: {}", e))
    }

    /// Queue the initial scene and post every command under the command
    /// link.  Returns the command roots in posting order.
    pub fn install(
        &self,
        svs: &mut Svs,
        wm: &mut WorkingMemory,
    ) -> Result<Vec<(String, Identifier)>, String> {
        for node in &self.nodes {
            svs.queue(SceneUpdate::Add {
                name: node.name.clone(),
                bounds: node.bounds,
            });
        }
        let mut roots = Vec::with_capacity(self.commands.len());
        for cmd in &self.commands {
            let Symbol::Id(root) = post_value(wm, &cmd.spec)? else {
                return Err(format!("spec of command '{}' must be a table", cmd.name));
            };
            wm.add(svs.command_link(), &cmd.name, root);
            roots.push((cmd.name.clone(), root));
        }
        Ok(roots)
    }

    /// Scene edits for cycle `n`; none once the scripted cycles run out.
    pub fn updates_for(&self, n: usize) -> &[SceneUpdate] {
        self.cycles.get(n).map(|c| c.updates.as_slice()).unwrap_or(&[])
    }
}

/// Write `value` into `wm`, returning the symbol that refers to it.
pub fn post_value(wm: &mut WorkingMemory, value: &toml::Value) -> Result<Symbol, String> {
    Ok(match value {
        toml::Value::Integer(i) => Symbol::Int(*i),
        toml::Value::Float(f) => Symbol::Float(*f),
        toml::Value::String(s) => Symbol::from(s.as_str()),
        toml::Value::Boolean(b) => Symbol::from(b.to_string().as_str()),
        toml::Value::Table(table) => {
            let id = wm.make_id('F');
            for (attr, v) in table {
                let items: &[toml::Value] = match v {
                    toml::Value::Array(items) => items,
                    single => std::slice::from_ref(single),
                };
                for item in items {
                    let sym = post_value(wm, item)?;
                    wm.add(id, attr, sym);
                }
            }
            Symbol::Id(id)
        }
        toml::Value::Array(_) => return Err("nested arrays are not supported".to_string()),
        toml::Value::Datetime(d) => return Err(format!("unsupported datetime value {d}")),
    })
}
