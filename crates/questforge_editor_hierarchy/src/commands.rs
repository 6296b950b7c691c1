// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor commands for undo/redo support.
//!
//! Every structural change to the scene is one of these commands, executed
//! or recorded through [`History`](crate::history::History). Multi-entity
//! commands are atomic: either every member applies or the scene is left as
//! it was.

use crate::edit::FieldValue;
use crate::entity::{EntityData, EntityId};
use crate::scene::{SceneData, SceneError};

/// Trait for editor commands that can be undone/redone
pub trait EditorCommand: Send + Sync {
    /// Get a description of this command
    fn description(&self) -> &str;

    /// Apply the command (also used for redo)
    fn execute(&mut self, scene: &mut SceneData) -> Result<(), CommandError>;

    /// Revert the command
    fn undo(&mut self, scene: &mut SceneData) -> Result<(), CommandError>;
}

/// Error type for command execution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Structural scene error
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Entity not found
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

/// Collect the distinct parent groups of `records`, preserving first-seen order
fn parent_groups<'a>(records: impl Iterator<Item = &'a EntityData>) -> Vec<Option<EntityId>> {
    let mut groups = Vec::new();
    for record in records {
        if !groups.contains(&record.parent) {
            groups.push(record.parent);
        }
    }
    groups
}

/// Command to add one or more entities.
///
/// Records must be listed parent-first; each is placed at its `order` within
/// its parent's sibling list, shifting later siblings.
#[derive(Debug, Clone)]
pub struct AddEntitiesCommand {
    /// Entities to insert, parents before children
    pub records: Vec<EntityData>,
    description: String,
}

impl AddEntitiesCommand {
    /// Create a new add command
    pub fn new(records: Vec<EntityData>) -> Self {
        let description = match records.len() {
            1 => "Add Entity".to_string(),
            n => format!("Add {n} Entities"),
        };
        Self {
            records,
            description,
        }
    }

    /// Override the history description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// IDs of the entities this command adds
    pub fn ids(&self) -> Vec<EntityId> {
        self.records.iter().map(|r| r.id).collect()
    }

    fn remove_applied(&self, scene: &mut SceneData, count: usize) {
        for record in self.records[..count].iter().rev() {
            scene.remove_entity(&record.id);
        }
        for parent in parent_groups(self.records[..count].iter()) {
            scene.renumber(parent);
        }
    }
}

impl EditorCommand for AddEntitiesCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        for (applied, record) in self.records.iter().enumerate() {
            let mut data = record.clone();
            data.children.clear();
            if let Err(e) = scene.insert_entity(data) {
                self.remove_applied(scene, applied);
                return Err(e.into());
            }
        }

        for parent in parent_groups(self.records.iter()) {
            scene.renumber(parent);
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        if let Some(missing) = self.records.iter().find(|r| !scene.contains(&r.id)) {
            return Err(CommandError::EntityNotFound(missing.id));
        }
        self.remove_applied(scene, self.records.len());
        Ok(())
    }
}

/// Command to delete entities together with their subtrees
#[derive(Debug, Clone)]
pub struct DeleteEntitiesCommand {
    /// Entities to delete
    pub entities: Vec<EntityId>,
    /// Removed records in render order, captured on execute
    removed: Vec<EntityData>,
    /// Sibling lists of every affected group before removal
    groups: Vec<(Option<EntityId>, Vec<EntityId>)>,
    description: String,
}

impl DeleteEntitiesCommand {
    /// Create a new delete command
    pub fn new(entities: Vec<EntityId>) -> Self {
        let description = match entities.len() {
            1 => "Delete Entity".to_string(),
            n => format!("Delete {n} Entities"),
        };
        Self {
            entities,
            removed: Vec::new(),
            groups: Vec::new(),
            description,
        }
    }

    /// Number of records removed by the last execution
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

impl EditorCommand for DeleteEntitiesCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        if let Some(missing) = self.entities.iter().find(|id| !scene.contains(id)) {
            return Err(CommandError::EntityNotFound(*missing));
        }

        let top_level = scene.top_level(&self.entities);
        let ids = scene.collect_with_descendants(&top_level);

        let mut groups: Vec<(Option<EntityId>, Vec<EntityId>)> = Vec::new();
        for id in &top_level {
            let parent = scene.parent_of(id);
            if !groups.iter().any(|(p, _)| *p == parent) {
                groups.push((parent, scene.group(parent).to_vec()));
            }
        }

        self.removed = ids.iter().filter_map(|id| scene.get(id).cloned()).collect();
        self.groups = groups;

        for id in ids.iter().rev() {
            scene.remove_entity(id);
        }
        for (parent, _) in &self.groups {
            scene.renumber(*parent);
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        scene.restore_subtrees(&self.removed, &self.groups)?;
        Ok(())
    }
}

/// Command to move one entity to a new parent and sibling index
#[derive(Debug, Clone)]
pub struct ReparentCommand {
    /// Entity being moved
    pub entity: EntityId,
    /// New parent (None for root)
    pub new_parent: Option<EntityId>,
    /// Index in the new sibling list, counted after the entity's removal
    pub new_index: usize,
    /// Parent and index before the move, captured on execute
    old: Option<(Option<EntityId>, usize)>,
}

impl ReparentCommand {
    /// Create a new reparent command
    pub fn new(entity: EntityId, new_parent: Option<EntityId>, new_index: usize) -> Self {
        Self {
            entity,
            new_parent,
            new_index,
            old: None,
        }
    }
}

impl EditorCommand for ReparentCommand {
    fn description(&self) -> &str {
        "Reparent Entity"
    }

    fn execute(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        let old_parent = scene
            .get(&self.entity)
            .ok_or(CommandError::EntityNotFound(self.entity))?
            .parent;
        let old_index = scene
            .sibling_index(&self.entity)
            .ok_or(CommandError::EntityNotFound(self.entity))?;

        scene.move_entity(&self.entity, self.new_parent, self.new_index)?;
        self.old = Some((old_parent, old_index));
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        let Some((old_parent, old_index)) = self.old else {
            return Err(CommandError::InvalidOperation(
                "Reparent undone before it was executed".to_string(),
            ));
        };
        scene.move_entity(&self.entity, old_parent, old_index)?;
        Ok(())
    }
}

/// Command to change one entity field
#[derive(Debug, Clone)]
pub struct PropertyEditCommand {
    /// Entity being edited
    pub entity: EntityId,
    /// Value before the edit
    pub before: FieldValue,
    /// Value after the edit
    pub after: FieldValue,
    description: String,
}

impl PropertyEditCommand {
    /// Create a new property edit command
    pub fn new(entity: EntityId, before: FieldValue, after: FieldValue) -> Self {
        let description = match &after {
            FieldValue::Name(name) => format!("Rename to {name}"),
            FieldValue::Position(_) => "Move Entity".to_string(),
        };
        Self {
            entity,
            before,
            after,
            description,
        }
    }

    fn apply(&self, scene: &mut SceneData, value: &FieldValue) -> Result<(), CommandError> {
        let Some(entity) = scene.get_mut(&self.entity) else {
            return Err(CommandError::EntityNotFound(self.entity));
        };
        value.apply(entity);
        Ok(())
    }
}

impl EditorCommand for PropertyEditCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        self.apply(scene, &self.after)
    }

    fn undo(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        self.apply(scene, &self.before)
    }
}

/// Several commands applied and reverted as one history entry
pub struct BatchCommand {
    description: String,
    commands: Vec<Box<dyn EditorCommand>>,
}

impl BatchCommand {
    /// Create an empty batch
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
        }
    }

    /// Append a command; batch members run in insertion order
    pub fn push(&mut self, command: Box<dyn EditorCommand>) {
        self.commands.push(command);
    }

    /// Number of member commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if the batch has no members
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl EditorCommand for BatchCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        for applied in 0..self.commands.len() {
            if let Err(e) = self.commands[applied].execute(scene) {
                for command in self.commands[..applied].iter_mut().rev() {
                    if let Err(rollback) = command.undo(scene) {
                        tracing::error!("Rollback of '{}' failed: {rollback}", command.description());
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    fn undo(&mut self, scene: &mut SceneData) -> Result<(), CommandError> {
        for reverted in (0..self.commands.len()).rev() {
            if let Err(e) = self.commands[reverted].undo(scene) {
                for command in self.commands[reverted + 1..].iter_mut() {
                    if let Err(rollback) = command.execute(scene) {
                        tracing::error!("Rollback of '{}' failed: {rollback}", command.description());
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for BatchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCommand")
            .field("description", &self.description)
            .field("len", &self.commands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::{add, names};

    #[test]
    fn test_add_inserts_at_order_and_shifts() {
        let mut scene = SceneData::new();
        add(&mut scene, "A", None);
        add(&mut scene, "B", None);

        let mut command = AddEntitiesCommand::new(vec![EntityData::new("New").placed(None, 1)]);
        command.execute(&mut scene).unwrap();
        assert_eq!(names(&scene, None), ["A", "New", "B"]);
        scene.check_invariants().unwrap();

        command.undo(&mut scene).unwrap();
        assert_eq!(names(&scene, None), ["A", "B"]);
        scene.check_invariants().unwrap();
    }

    #[test]
    fn test_add_is_atomic() {
        let mut scene = SceneData::new();
        let existing = add(&mut scene, "A", None);
        let before = scene.clone();

        let fresh = EntityData::new("Fresh");
        let clash = EntityData::with_id(existing, "Clash");
        let mut command = AddEntitiesCommand::new(vec![fresh, clash]);
        assert!(command.execute(&mut scene).is_err());
        assert_eq!(scene, before);
    }

    #[test]
    fn test_delete_roundtrip_restores_structure() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", None);
        let c = add(&mut scene, "C", None);
        add(&mut scene, "A1", Some(a));
        add(&mut scene, "A2", Some(a));
        let c1 = add(&mut scene, "C1", Some(c));
        let before = scene.clone();

        let mut command = DeleteEntitiesCommand::new(vec![c1, a, c]);
        command.execute(&mut scene).unwrap();
        assert_eq!(command.removed_count(), 5);
        assert_eq!(scene.roots(), [b]);
        scene.check_invariants().unwrap();

        command.undo(&mut scene).unwrap();
        assert_eq!(scene, before);
        scene.check_invariants().unwrap();

        command.execute(&mut scene).unwrap();
        assert_eq!(scene.entity_count(), 1);
    }

    #[test]
    fn test_reparent_roundtrip() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let q = add(&mut scene, "Q", None);
        add(&mut scene, "B", Some(p));
        let a = add(&mut scene, "A", Some(p));
        add(&mut scene, "C", Some(p));
        let before = scene.clone();

        let mut command = ReparentCommand::new(a, Some(q), 0);
        command.execute(&mut scene).unwrap();
        assert_eq!(names(&scene, Some(p)), ["B", "C"]);
        assert_eq!(names(&scene, Some(q)), ["A"]);

        command.undo(&mut scene).unwrap();
        assert_eq!(scene, before);
    }

    #[test]
    fn test_reparent_into_descendant_fails_cleanly() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", Some(a));
        let before = scene.clone();

        let mut command = ReparentCommand::new(a, Some(b), 0);
        assert!(matches!(
            command.execute(&mut scene),
            Err(CommandError::Scene(SceneError::WouldCreateCycle { .. }))
        ));
        assert_eq!(scene, before);
    }

    #[test]
    fn test_batch_undoes_in_reverse() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", None);
        let before = scene.clone();

        let mut batch = BatchCommand::new("Move 2 Entities");
        batch.push(Box::new(ReparentCommand::new(a, Some(p), 0)));
        batch.push(Box::new(ReparentCommand::new(b, Some(p), 1)));
        batch.execute(&mut scene).unwrap();
        assert_eq!(names(&scene, Some(p)), ["A", "B"]);
        assert_eq!(scene.roots(), [p]);

        batch.undo(&mut scene).unwrap();
        assert_eq!(scene, before);
    }

    #[test]
    fn test_batch_rolls_back_on_failure() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let a = add(&mut scene, "A", None);
        let before = scene.clone();

        let mut batch = BatchCommand::new("Broken");
        batch.push(Box::new(ReparentCommand::new(a, Some(p), 0)));
        batch.push(Box::new(ReparentCommand::new(p, Some(a), 0)));
        assert!(batch.execute(&mut scene).is_err());
        assert_eq!(scene, before);
    }

    #[test]
    fn test_property_edit_roundtrip() {
        let mut scene = SceneData::new();
        let door = add(&mut scene, "Door", None);

        let mut command = PropertyEditCommand::new(
            door,
            FieldValue::Name("Door".to_string()),
            FieldValue::Name("Gate".to_string()),
        );
        assert_eq!(command.description(), "Rename to Gate");
        command.execute(&mut scene).unwrap();
        assert_eq!(scene.get(&door).unwrap().name, "Gate");
        command.undo(&mut scene).unwrap();
        assert_eq!(scene.get(&door).unwrap().name, "Door");
    }
}
