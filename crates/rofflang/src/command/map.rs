//! Map type
use super::*;
use std::collections::HashMap;

/// Map from names to commands.
///
/// The map also remembers the built-in commands it was created with,
///     so that the built-in set can be listed after documents have renamed or removed them.
pub struct Map<S> {
    commands: HashMap<Name, Command<S>>,
    built_in_commands: HashMap<Name, BuiltIn<S>>,
}

impl<S> Map<S> {
    pub(crate) fn new(built_in_commands: HashMap<Name, BuiltIn<S>>) -> Map<S> {
        Self {
            commands: built_in_commands
                .iter()
                .map(|(k, v)| (*k, v.cmd.clone()))
                .collect(),
            built_in_commands,
        }
    }

    #[inline]
    pub fn get(&self, name: Name) -> Option<&Command<S>> {
        self.commands.get(&name)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.commands.contains_key(&name)
    }

    /// A snapshot of the macro with the provided name.
    ///
    /// Returns [None] if the name is undefined or refers to a request.
    pub fn get_macro(&self, name: Name) -> Option<Macro> {
        self.get(name).and_then(Command::macro_value)
    }

    pub fn built_in_commands(&self) -> &HashMap<Name, BuiltIn<S>> {
        &self.built_in_commands
    }

    pub fn insert(&mut self, name: Name, cmd: Command<S>) {
        self.commands.insert(name, cmd);
    }

    /// Define `name` as a new macro object, detaching it from any aliases.
    pub fn insert_macro(&mut self, name: Name, m: Macro) {
        self.commands.insert(name, Command::new_macro(m));
    }

    /// Replace the contents of the macro object called `name`.
    ///
    /// Unlike [Map::insert_macro], every alias of the object sees the new contents.
    /// If `name` is undefined or is a request, a new macro object is created.
    pub fn update_macro(&mut self, name: Name, m: Macro) {
        match self.commands.get(&name) {
            Some(Command::Macro(cell)) => {
                *cell.borrow_mut() = m;
            }
            _ => self.insert_macro(name, m),
        }
    }

    pub fn remove(&mut self, name: Name) -> bool {
        self.commands.remove(&name).is_some()
    }

    /// Rename a command. Returns false if `old` is undefined.
    pub fn rename(&mut self, old: Name, new: Name) -> bool {
        match self.commands.remove(&old) {
            None => false,
            Some(cmd) => {
                self.commands.insert(new, cmd);
                true
            }
        }
    }

    /// Make `new` refer to the same object as `old`. Returns false if `old` is undefined.
    pub fn alias(&mut self, new: Name, old: Name) -> bool {
        match self.commands.get(&old) {
            None => false,
            Some(cmd) => {
                let cmd = cmd.clone();
                self.commands.insert(new, cmd);
                true
            }
        }
    }

    /// Iterate over all defined names and their commands.
    pub fn iter(&self) -> impl Iterator<Item = (Name, &Command<S>)> + '_ {
        self.commands.iter().map(|(k, v)| (*k, v))
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
