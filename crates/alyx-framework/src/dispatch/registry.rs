//! The set of commands belonging to currently loaded plugins.
//!
//! Commands are grouped per plugin so a load or unload swaps a whole group
//! under one write lock. Dispatch only ever sees a complete group or none of
//! it. Groups keep plugin load order, which is the tie-break order for
//! [`select_command`]. An unloaded plugin that is loaded again moves to the
//! end.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::command::Command;

struct CommandGroup {
    plugin_id: String,
    commands: Arc<[Arc<Command>]>,
}

/// Thread-safe store of the commands of loaded plugins.
#[derive(Default)]
pub struct CommandRegistry {
    groups: RwLock<Vec<CommandGroup>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the commands of `plugin_id`, replacing any previous group.
    ///
    /// A replaced group keeps its position; a new group is appended.
    pub fn insert(&self, plugin_id: &str, commands: Vec<Command>) {
        let commands: Arc<[Arc<Command>]> = commands.into_iter().map(Arc::new).collect();
        let mut groups = self.groups.write();
        match groups.iter_mut().find(|g| g.plugin_id == plugin_id) {
            Some(group) => group.commands = commands,
            None => groups.push(CommandGroup {
                plugin_id: plugin_id.to_string(),
                commands,
            }),
        }
    }

    /// Removes the commands of `plugin_id`. Returns how many were removed.
    pub fn remove(&self, plugin_id: &str) -> usize {
        let mut groups = self.groups.write();
        match groups.iter().position(|g| g.plugin_id == plugin_id) {
            Some(pos) => groups.remove(pos).commands.len(),
            None => 0,
        }
    }

    /// Every registered command, in plugin order then declaration order.
    pub fn snapshot(&self) -> Vec<Arc<Command>> {
        self.groups
            .read()
            .iter()
            .flat_map(|g| g.commands.iter().cloned())
            .collect()
    }

    pub fn commands_of(&self, plugin_id: &str) -> Vec<Arc<Command>> {
        self.groups
            .read()
            .iter()
            .find(|g| g.plugin_id == plugin_id)
            .map(|g| g.commands.to_vec())
            .unwrap_or_default()
    }

    pub fn contains_plugin(&self, plugin_id: &str) -> bool {
        self.groups.read().iter().any(|g| g.plugin_id == plugin_id)
    }

    /// Total number of commands.
    pub fn len(&self) -> usize {
        self.groups.read().iter().map(|g| g.commands.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Picks the command for `tokens` out of the current snapshot.
    pub fn select(&self, tokens: &[String]) -> Option<Arc<Command>> {
        select_command(&self.snapshot(), tokens).cloned()
    }
}

/// Returns the matching command with the longest chain.
///
/// Among equally long matches the first in `commands` wins.
pub fn select_command<'a>(commands: &'a [Arc<Command>], tokens: &[String]) -> Option<&'a Arc<Command>> {
    let mut best: Option<&Arc<Command>> = None;
    for command in commands.iter().filter(|c| c.matches(tokens)) {
        if best.is_none_or(|b| command.chain_len() > b.chain_len()) {
            best = Some(command);
        }
    }
    best
}
