//! Ordered command scripts.

use crate::error::{Error, Result};
use crate::types::{Command, CommandId, CommandKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An ordered list of commands making up one run attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_kinds(kinds: impl IntoIterator<Item = CommandKind>) -> Self {
        Self {
            commands: kinds.into_iter().map(Command::new).collect(),
        }
    }

    /// Append a command and return its id
    pub fn push(&mut self, kind: CommandKind) -> CommandId {
        let command = Command::new(kind);
        self.commands.push(command);
        command.id
    }

    pub fn remove(&mut self, id: CommandId) -> Result<Command> {
        let index = self.index_of(id)?;
        Ok(self.commands.remove(index))
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Move the command `from` to the slot currently held by `to`.
    ///
    /// Commands in between shift by one towards the vacated slot.
    pub fn move_command(&mut self, from: CommandId, to: CommandId) -> Result<()> {
        let old_index = self.index_of(from)?;
        let new_index = self.index_of(to)?;
        if old_index != new_index {
            let command = self.commands.remove(old_index);
            self.commands.insert(new_index, command);
        }
        Ok(())
    }

    pub fn index_of(&self, id: CommandId) -> Result<usize> {
        self.commands
            .iter()
            .position(|command| command.id == id)
            .ok_or_else(|| Error::NotFound(format!("command {}", id)))
    }

    pub fn get(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn kinds(&self) -> Vec<CommandKind> {
        self.commands.iter().map(|command| command.kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> + '_ {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl FromIterator<CommandKind> for Script {
    fn from_iter<I: IntoIterator<Item = CommandKind>>(iter: I) -> Self {
        Self::from_kinds(iter)
    }
}

/// Parses comma and/or whitespace separated command tokens
impl FromStr for Script {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(CommandKind::from_str)
            .collect()
    }
}
