// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene hierarchy editing core for the `QuestForge` editor.
//!
//! This crate provides everything the hierarchy panel needs to mutate the
//! entity tree safely:
//! - Arena-backed entity tree with ordered sibling groups
//! - Undo/redo history with atomic multi-entity commands
//! - Drop-zone and X-depth resolution for drag-and-drop reparenting
//! - Entity creation and subtree duplication
//!
//! ## Architecture
//!
//! Every structural change goes through an [`EditorCommand`] executed by the
//! [`History`]. The [`DragDropController`] and the [`EntityCreationService`]
//! are the two entry points driven by the UI; neither mutates the scene
//! directly.

pub mod commands;
pub mod creation;
pub mod dragdrop;
pub mod edit;
pub mod entity;
pub mod factory;
pub mod history;
pub mod resolver;
pub mod scene;
pub mod settings;
pub mod state;

pub use commands::{
    AddEntitiesCommand, BatchCommand, CommandError, DeleteEntitiesCommand, EditorCommand,
    PropertyEditCommand, ReparentCommand,
};
pub use creation::EntityCreationService;
pub use dragdrop::{execute_drop, DragDropController, DropIndicator, PointerInput, RowInfo};
pub use edit::{EditSession, EntityField, FieldValue};
pub use entity::{Component, EntityData, EntityId, EntityKind, TemplateId, TemplateLink};
pub use factory::{EntityFactory, StandardEntityFactory, Template};
pub use history::{History, HistoryError, HistoryStats, StateSnapshot};
pub use resolver::{DropTarget, DropZone, InsertPosition, RenderedRow, ResolvedDrop};
pub use scene::{SceneData, SceneError};
pub use settings::{EditorSettings, HierarchySettings, SettingsError};
pub use state::{EditorState, SelectMode, Selection};
