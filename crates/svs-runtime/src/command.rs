//! Commands posted to the `^command` link and the table that creates them.

use std::collections::HashMap;

use svs_filter::FilterTable;
use svs_types::SvsError;

use crate::extract::ExtractCommand;
use crate::wm::{Identifier, WmeId, WorkingMemory};

/// What a command may touch during one update.
pub struct CommandContext<'a> {
    pub wm: &'a mut WorkingMemory,
    pub filters: &'a FilterTable,
    /// Whether anything upstream of every filter changed this cycle.
    pub dirty: bool,
}

/// One live command, bound to the identifier it was posted with.
pub trait Command {
    fn name(&self) -> &str;

    /// Run one cycle.  Returns `false` while the command has no valid
    /// output (bad spec, failed filter).
    fn update(&mut self, ctx: &mut CommandContext<'_>) -> bool;
}

pub type CommandFactory = Box<dyn Fn(Identifier) -> Box<dyn Command>>;

/// Command name → constructor.
#[derive(Default)]
pub struct CommandTable {
    entries: HashMap<String, CommandFactory>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `extract` and `extract_once`.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        table.register("extract", |root| Box::new(ExtractCommand::new(root, false)));
        table.register("extract_once", |root| Box::new(ExtractCommand::new(root, true)));
        table
    }

    pub fn register(&mut self, name: &str, f: impl Fn(Identifier) -> Box<dyn Command> + 'static) {
        self.entries.insert(name.to_string(), Box::new(f));
    }

    /// Create the command `name` rooted at `root`.
    ///
    /// # Errors
    ///
    /// [`SvsError::UnknownCommand`] when nothing is registered under `name`.
    pub fn make(&self, name: &str, root: Identifier) -> Result<Box<dyn Command>, SvsError> {
        let f = self
            .entries
            .get(name)
            .ok_or_else(|| SvsError::UnknownCommand(name.to_string()))?;
        Ok(f(root))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("CommandTable").field("commands", &names).finish()
    }
}

/// The `^status` WME of one command root.  Rewrites only on change.
#[derive(Debug, Default)]
pub struct StatusSlot {
    wme: Option<WmeId>,
    text: String,
}

impl StatusSlot {
    pub fn set(&mut self, wm: &mut WorkingMemory, root: Identifier, text: &str) {
        if self.wme.is_some() && self.text == text {
            return;
        }
        if let Some(old) = self.wme.take() {
            wm.remove(old);
        }
        self.wme = Some(wm.add(root, "status", text));
        self.text = text.to_string();
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_is_an_error() {
        let table = CommandTable::with_builtins();
        let mut wm = WorkingMemory::new();
        let root = wm.make_id('C');
        assert!(table.make("extract", root).is_ok());
        assert_eq!(
            table.make("levitate", root).err(),
            Some(SvsError::UnknownCommand("levitate".to_string()))
        );
    }

    #[test]
    fn status_rewritten_only_on_change() {
        let mut wm = WorkingMemory::new();
        let root = wm.make_id('C');
        let mut status = StatusSlot::default();
        status.set(&mut wm, root, "success");
        let first = wm.children(root)[0].handle;
        status.set(&mut wm, root, "success");
        assert_eq!(wm.children(root)[0].handle, first);

        status.set(&mut wm, root, "failed");
        assert_eq!(wm.children(root).len(), 1);
        assert_eq!(wm.find(root, "status").and_then(|s| s.as_str()), Some("failed"));
    }
}
