// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor state management.
//!
//! This module ties the open scene, the entity selection and the undo/redo
//! history together. All mutations from the UI go through here so that the
//! dirty flag and the selection stay consistent with the scene.

use crate::commands::{DeleteEntitiesCommand, EditorCommand, PropertyEditCommand};
use crate::edit::{EditSession, EntityField, FieldValue};
use crate::entity::EntityId;
use crate::history::{History, HistoryError};
use crate::scene::SceneData;
use crate::settings::EditorSettings;
use serde::{Deserialize, Serialize};

/// Selection mode for multi-select operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectMode {
    /// Replace current selection
    #[default]
    Set,
    /// Add to current selection (Shift+Click)
    Add,
    /// Remove from current selection (Ctrl+Click)
    Remove,
    /// Toggle in current selection (Ctrl+Shift+Click)
    Toggle,
}

/// Entity selection state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Currently selected entities
    pub entities: Vec<EntityId>,
}

impl Selection {
    /// Create a new empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selection with the given entities
    pub fn with_entities(entities: impl Into<Vec<EntityId>>) -> Self {
        Self {
            entities: entities.into(),
        }
    }

    /// Check if an entity is selected
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains(id)
    }

    /// Add an entity to the selection (idempotent)
    pub fn add(&mut self, id: EntityId) {
        if !self.contains(&id) {
            self.entities.push(id);
        }
    }

    /// Remove an entity from the selection
    pub fn remove(&mut self, id: &EntityId) {
        self.entities.retain(|e| e != id);
    }

    /// Toggle an entity in the selection
    pub fn toggle(&mut self, id: EntityId) {
        if self.contains(&id) {
            self.remove(&id);
        } else {
            self.add(id);
        }
    }

    /// Replace the selection with a single entity
    pub fn set(&mut self, id: EntityId) {
        self.entities.clear();
        self.entities.push(id);
    }

    /// Clear the selection
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Check if the selection is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get the number of selected entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Iterate over selected entities
    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.iter()
    }

    /// Get the primary (most recently selected) entity
    pub fn primary(&self) -> Option<&EntityId> {
        self.entities.last()
    }

    /// Drop entries for which `keep` returns false
    pub fn retain(&mut self, keep: impl FnMut(&EntityId) -> bool) {
        self.entities.retain(keep);
    }
}

/// Main editor state
#[derive(Debug)]
pub struct EditorState {
    /// Current entity selection
    pub selection: Selection,

    /// Current select mode (for multi-select)
    pub select_mode: SelectMode,

    /// Undo/redo history
    pub history: History,

    /// Whether the scene has unsaved changes
    pub dirty: bool,

    scene: Option<SceneData>,
}

impl EditorState {
    /// Create an editor state with an empty scene open
    pub fn new() -> Self {
        Self::with_settings(&EditorSettings::default())
    }

    /// Create an editor state with an empty scene, using `settings`
    pub fn with_settings(settings: &EditorSettings) -> Self {
        Self {
            selection: Selection::new(),
            select_mode: SelectMode::Set,
            history: History::with_max_depth(settings.history_depth),
            dirty: false,
            scene: Some(SceneData::new()),
        }
    }

    /// Create an editor state with no scene open
    pub fn without_scene() -> Self {
        Self {
            scene: None,
            ..Self::new()
        }
    }

    /// Replace the open scene with an empty one
    pub fn new_scene(&mut self) {
        self.open_scene(SceneData::new());
        tracing::info!("Created new scene");
    }

    /// Open an existing scene, discarding selection and history
    pub fn open_scene(&mut self, scene: SceneData) {
        self.selection.clear();
        self.history.clear();
        self.scene = Some(scene);
        self.dirty = false;
    }

    /// Close the open scene
    pub fn close_scene(&mut self) -> Option<SceneData> {
        self.selection.clear();
        self.history.clear();
        self.dirty = false;
        self.scene.take()
    }

    /// The open scene, if any
    pub fn scene(&self) -> Option<&SceneData> {
        self.scene.as_ref()
    }

    /// The open scene for live (non-recorded) edits
    pub fn scene_mut(&mut self) -> Option<&mut SceneData> {
        self.scene.as_mut()
    }

    /// Check if scene has unsaved changes
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Mark the scene as changed
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The primary selected entity, if it still exists in the scene
    pub fn primary_selected(&self) -> Option<EntityId> {
        let id = *self.selection.primary()?;
        self.scene.as_ref()?.contains(&id).then_some(id)
    }

    /// Execute a command and record it. Returns whether it applied.
    pub fn execute(&mut self, command: Box<dyn EditorCommand>) -> bool {
        let Some(scene) = self.scene.as_mut() else {
            tracing::debug!("No scene open; ignoring '{}'", command.description());
            return false;
        };
        let description = command.description().to_string();
        match self.history.execute(command, scene) {
            Ok(()) => {
                self.dirty = true;
                true
            }
            Err(e) => {
                tracing::warn!("'{description}' failed: {e}");
                false
            }
        }
    }

    /// Record a command whose effect is already applied.
    ///
    /// Returns whether it was recorded; nothing is recorded with no scene open.
    pub fn push(&mut self, command: Box<dyn EditorCommand>) -> bool {
        if self.scene.is_none() {
            tracing::debug!("No scene open; not recording '{}'", command.description());
            return false;
        }
        self.history.push(command);
        self.dirty = true;
        true
    }

    /// Undo the last command. Returns whether anything was undone.
    pub fn undo(&mut self) -> bool {
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        let result = self.history.undo(scene);
        self.after_replay("Undo", result)
    }

    /// Redo the last undone command. Returns whether anything was redone.
    pub fn redo(&mut self) -> bool {
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        let result = self.history.redo(scene);
        self.after_replay("Redo", result)
    }

    fn after_replay(&mut self, action: &str, result: Result<String, HistoryError>) -> bool {
        match result {
            Ok(description) => {
                tracing::info!("{action}: {description}");
                self.dirty = true;
                self.prune_selection();
                true
            }
            Err(HistoryError::NothingToUndo | HistoryError::NothingToRedo) => {
                tracing::debug!("{action}: nothing to replay");
                false
            }
            Err(_) => {
                // History already logged and discarded the command
                self.prune_selection();
                false
            }
        }
    }

    /// Drop selection entries that no longer exist in the scene
    pub fn prune_selection(&mut self) {
        match &self.scene {
            Some(scene) => self.selection.retain(|id| scene.contains(id)),
            None => self.selection.clear(),
        }
    }

    /// Select entities based on current select mode
    pub fn select(&mut self, entities: &[EntityId]) {
        match self.select_mode {
            SelectMode::Set => {
                self.selection.clear();
                for id in entities {
                    self.selection.add(*id);
                }
            }
            SelectMode::Add => {
                for id in entities {
                    self.selection.add(*id);
                }
            }
            SelectMode::Remove => {
                for id in entities {
                    self.selection.remove(id);
                }
            }
            SelectMode::Toggle => {
                for id in entities {
                    self.selection.toggle(*id);
                }
            }
        }
    }

    /// Delete selected entities (and their subtrees) as one undo step
    pub fn delete_selected(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let entities = self.selection.entities.clone();
        if !self.delete_entities(entities) {
            return false;
        }
        self.selection.clear();
        true
    }

    /// Delete entities (and their subtrees) as one undo step
    pub fn delete_entities(&mut self, entities: Vec<EntityId>) -> bool {
        let count = entities.len();
        if !self.execute(Box::new(DeleteEntitiesCommand::new(entities))) {
            return false;
        }
        tracing::info!("Deleted {count} entities");
        self.prune_selection();
        true
    }

    /// Rename an entity. Blank and unchanged names record nothing.
    pub fn rename_entity(&mut self, id: EntityId, name: &str) -> bool {
        let Some(entity) = self.scene.as_ref().and_then(|s| s.get(&id)) else {
            return false;
        };
        let after = FieldValue::Name(name.to_string());
        if after.is_blank() {
            tracing::debug!("Rejected blank name for {id}");
            return false;
        }
        let before = FieldValue::read(entity, EntityField::Name);
        if before == after {
            return false;
        }
        self.execute(Box::new(PropertyEditCommand::new(id, before, after)))
    }

    /// Start a two-phase edit of one entity field
    pub fn begin_edit(&self, id: EntityId, field: EntityField) -> Option<EditSession> {
        let scene = self.scene.as_ref()?;
        match EditSession::begin(scene, id, field) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Cannot edit {} of {id}: {e}", field.display_name());
                None
            }
        }
    }

    /// Finish a two-phase edit. Returns whether an undo step was recorded.
    pub fn commit_edit(&mut self, session: EditSession) -> bool {
        let Some(scene) = self.scene.as_mut() else {
            return false;
        };
        match session.commit(scene, &mut self.history) {
            Ok(recorded) => {
                if recorded {
                    self.dirty = true;
                }
                recorded
            }
            Err(e) => {
                tracing::warn!("Failed to commit edit: {e}");
                false
            }
        }
    }

    /// Abandon a two-phase edit, restoring the original value
    pub fn cancel_edit(&mut self, session: EditSession) {
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        if let Err(e) = session.cancel(scene) {
            tracing::warn!("Failed to cancel edit: {e}");
        }
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new()
    }
}
