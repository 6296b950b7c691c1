// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-phase field edits.
//!
//! Continuous edits (dragging an entity in the viewport, typing a name)
//! change the live value every frame, but only the value at the start and the
//! value at the end are worth an undo step. An [`EditSession`] snapshots the
//! field when the edit begins and records a single [`PropertyEditCommand`]
//! when the caller commits it.

use crate::commands::{CommandError, PropertyEditCommand};
use crate::entity::{EntityData, EntityId};
use crate::history::{History, HistoryError, StateSnapshot};
use crate::scene::SceneData;
use serde::{Deserialize, Serialize};

/// Entity fields that support undoable edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityField {
    /// Display name
    Name,
    /// Position (x, y, z)
    Position,
}

impl EntityField {
    /// Display name for history descriptions
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityField::Name => "Name",
            EntityField::Position => "Position",
        }
    }
}

/// The value of one [`EntityField`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Display name
    Name(String),
    /// Position (x, y, z)
    Position([f32; 3]),
}

impl FieldValue {
    /// Read the current value of `field` from an entity
    pub fn read(entity: &EntityData, field: EntityField) -> Self {
        match field {
            EntityField::Name => FieldValue::Name(entity.name.clone()),
            EntityField::Position => FieldValue::Position(entity.position),
        }
    }

    /// Which field this value belongs to
    pub fn field(&self) -> EntityField {
        match self {
            FieldValue::Name(_) => EntityField::Name,
            FieldValue::Position(_) => EntityField::Position,
        }
    }

    /// Write this value into an entity
    pub fn apply(&self, entity: &mut EntityData) {
        match self {
            FieldValue::Name(name) => entity.name.clone_from(name),
            FieldValue::Position(position) => entity.position = *position,
        }
    }

    /// Check if this value would be rejected as user input
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Name(name) if name.trim().is_empty())
    }
}

/// An in-progress edit of one entity field
#[derive(Debug, Clone)]
pub struct EditSession {
    entity: EntityId,
    field: EntityField,
    before: StateSnapshot,
}

impl EditSession {
    /// Snapshot the field before any live edits are applied
    pub fn begin(scene: &SceneData, entity: EntityId, field: EntityField) -> Result<Self, HistoryError> {
        let data = scene
            .get(&entity)
            .ok_or(CommandError::EntityNotFound(entity))?;
        let before = StateSnapshot::from_value(&FieldValue::read(data, field))?;
        Ok(Self {
            entity,
            field,
            before,
        })
    }

    /// Entity being edited
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Field being edited
    pub fn field(&self) -> EntityField {
        self.field
    }

    /// The value captured when the edit began
    pub fn before(&self) -> Result<FieldValue, HistoryError> {
        self.before.to_value()
    }

    /// Finish the edit.
    ///
    /// Pushes one command if the value changed. A blank name is rejected: the
    /// captured value is restored and nothing is recorded. Returns whether a
    /// command was recorded.
    pub fn commit(self, scene: &mut SceneData, history: &mut History) -> Result<bool, HistoryError> {
        let entity = scene
            .get_mut(&self.entity)
            .ok_or(CommandError::EntityNotFound(self.entity))?;
        let after = FieldValue::read(entity, self.field);

        if self.before.matches(&after)? {
            return Ok(false);
        }

        let before: FieldValue = self.before.to_value()?;
        if after.is_blank() {
            tracing::debug!("Rejected blank {} for {}", self.field.display_name(), self.entity);
            before.apply(entity);
            return Ok(false);
        }

        history.push(Box::new(PropertyEditCommand::new(self.entity, before, after)));
        Ok(true)
    }

    /// Abandon the edit and restore the captured value
    pub fn cancel(self, scene: &mut SceneData) -> Result<(), HistoryError> {
        let entity = scene
            .get_mut(&self.entity)
            .ok_or(CommandError::EntityNotFound(self.entity))?;
        let before: FieldValue = self.before.to_value()?;
        before.apply(entity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::add;

    #[test]
    fn test_commit_records_single_command() {
        let mut scene = SceneData::new();
        let mut history = History::new();
        let door = add(&mut scene, "Door", None);

        let session = EditSession::begin(&scene, door, EntityField::Position).unwrap();
        // Live edits every frame
        for step in 1..=5 {
            scene.get_mut(&door).unwrap().position = [step as f32, 0.0, 0.0];
        }
        assert!(session.commit(&mut scene, &mut history).unwrap());
        assert_eq!(history.undo_depth(), 1);

        history.undo(&mut scene).unwrap();
        assert_eq!(scene.get(&door).unwrap().position, [0.0, 0.0, 0.0]);
        history.redo(&mut scene).unwrap();
        assert_eq!(scene.get(&door).unwrap().position, [5.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unchanged_edit_records_nothing() {
        let mut scene = SceneData::new();
        let mut history = History::new();
        let door = add(&mut scene, "Door", None);

        let session = EditSession::begin(&scene, door, EntityField::Name).unwrap();
        assert!(!session.commit(&mut scene, &mut history).unwrap());
        assert!(!history.can_undo());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut scene = SceneData::new();
        let mut history = History::new();
        let door = add(&mut scene, "Door", None);

        let session = EditSession::begin(&scene, door, EntityField::Name).unwrap();
        scene.get_mut(&door).unwrap().name = "   ".to_string();
        assert!(!session.commit(&mut scene, &mut history).unwrap());
        assert_eq!(scene.get(&door).unwrap().name, "Door");
        assert!(!history.can_undo());
    }

    #[test]
    fn test_cancel_restores_value() {
        let mut scene = SceneData::new();
        let door = add(&mut scene, "Door", None);

        let session = EditSession::begin(&scene, door, EntityField::Name).unwrap();
        scene.get_mut(&door).unwrap().name = "Gate".to_string();
        session.cancel(&mut scene).unwrap();
        assert_eq!(scene.get(&door).unwrap().name, "Door");
    }
}
