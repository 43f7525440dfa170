use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;

use crate::domain::control_model::command::command_types::WrapCommandRef;
use crate::domain::control_model::command::complex_command::ComplexCommand;
use crate::domain::control_model::utils::id::CommandUuid;

new_key_type! {
    pub struct CommandKey;
}

/// Active wrap commands.
#[derive(Debug, Default)]
pub struct CommandStore {
    /// Command storage.
    slots: SlotMap<CommandKey, ComplexCommand>,

    /// Index lookup CommandKey using the (type, id) identity of the wrap command.
    ref_index: HashMap<WrapCommandRef, CommandKey>,

    /// Index lookup CommandKey using the UUID of any element command of the wrap command.
    uuid_index: HashMap<CommandUuid, CommandKey>,
}

impl CommandStore {
    pub fn new() -> Self {
        Self { slots: SlotMap::with_key(), ref_index: HashMap::new(), uuid_index: HashMap::new() }
    }

    /// Adds a command to the store.
    ///
    /// # Returns
    /// Returns the CommandKey (internal key of the CommandStore).
    pub fn add(&mut self, command: ComplexCommand) -> CommandKey {
        let wrap_ref = command.wrap_ref();
        let uuids: Vec<CommandUuid> = command.elements().map(|(_, element)| element.command_uuid.clone()).collect();

        let key = self.slots.insert(command);
        self.ref_index.insert(wrap_ref, key);
        for uuid in uuids {
            self.uuid_index.insert(uuid, key);
        }
        key
    }

    pub fn remove(&mut self, wrap_ref: &WrapCommandRef) -> Option<ComplexCommand> {
        let key = self.ref_index.remove(wrap_ref)?;
        let command = self.slots.remove(key)?;

        for (_, element) in command.elements() {
            self.uuid_index.remove(&element.command_uuid);
        }
        Some(command)
    }

    pub fn contains(&self, wrap_ref: &WrapCommandRef) -> bool {
        self.ref_index.contains_key(wrap_ref)
    }

    pub fn get(&self, wrap_ref: &WrapCommandRef) -> Option<&ComplexCommand> {
        let key = self.ref_index.get(wrap_ref)?;
        self.slots.get(*key)
    }

    pub fn get_mut(&mut self, wrap_ref: &WrapCommandRef) -> Option<&mut ComplexCommand> {
        let key = self.ref_index.get(wrap_ref)?;
        self.slots.get_mut(*key)
    }

    pub fn get_by_uuid_mut(&mut self, uuid: &CommandUuid) -> Option<&mut ComplexCommand> {
        let key = self.uuid_index.get(uuid)?;
        self.slots.get_mut(*key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComplexCommand> {
        self.slots.values()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
