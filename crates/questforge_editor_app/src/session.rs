// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted editing session.
//!
//! Drives the hierarchy core the way the panel would: create, duplicate,
//! drag a row onto another through synthetic row layouts, then undo and
//! redo. Used for smoke-testing the core without a window.

use egui::{pos2, vec2, Pos2, Rect};
use questforge_editor_hierarchy::{
    Component, DragDropController, EditorSettings, EditorState, EntityCreationService, EntityId,
    EntityKind, PointerInput, RowInfo, SceneData, StandardEntityFactory, Template,
};
use serde_json::json;

/// Height of one hierarchy row in the synthetic layout
pub const ROW_HEIGHT: f32 = 20.0;

/// Width of the synthetic hierarchy panel
const PANEL_WIDTH: f32 = 240.0;

/// Lay out every entity as a row, fully expanded, in render order
pub fn layout_rows(scene: &SceneData) -> Vec<RowInfo> {
    scene
        .preorder()
        .into_iter()
        .enumerate()
        .map(|(index, entity)| RowInfo {
            entity,
            rect: Rect::from_min_size(pos2(0.0, index as f32 * ROW_HEIGHT), vec2(PANEL_WIDTH, ROW_HEIGHT)),
            depth: scene.depth(&entity),
            expanded_with_children: !scene.children(&entity).is_empty(),
        })
        .collect()
}

/// Indented outline of the scene, one entity per line
pub fn outline(scene: &SceneData) -> Vec<String> {
    scene
        .preorder()
        .into_iter()
        .filter_map(|id| {
            let entity = scene.get(&id)?;
            Some(format!("{}{} [{}]", "  ".repeat(scene.depth(&id)), entity.name, entity.order))
        })
        .collect()
}

/// Headless editor: state plus the two UI entry points
pub struct ScriptedSession {
    /// Editor state
    pub state: EditorState,
    creation: EntityCreationService,
    drag: DragDropController,
}

impl ScriptedSession {
    /// Create a session with the standard factory and a sample template
    pub fn new(settings: &EditorSettings) -> Self {
        let mut factory = StandardEntityFactory::new();
        factory.register_template(Template::new(
            "chest",
            "Chest",
            vec![Component::new("Loot")
                .with_field("gold", json!(10))
                .with_field("locked", json!(false))],
        ));
        Self {
            state: EditorState::with_settings(settings),
            creation: EntityCreationService::new(Box::new(factory), settings.hierarchy.clone()),
            drag: DragDropController::new(settings.hierarchy.clone()),
        }
    }

    /// Create an empty entity under `parent` and give it a name
    pub fn create_named(&mut self, name: &str, parent: Option<EntityId>) -> Option<EntityId> {
        match parent {
            Some(parent) => self.state.selection.set(parent),
            None => self.state.selection.clear(),
        }
        let id = self.creation.create_empty(&mut self.state)?;
        self.state.rename_entity(id, name);
        Some(id)
    }

    /// Create an entity of `kind` with nothing selected
    pub fn create_typed(&mut self, kind: EntityKind) -> Option<EntityId> {
        self.state.selection.clear();
        self.creation.create_typed(&mut self.state, kind)
    }

    /// Duplicate an entity and its subtree
    pub fn duplicate(&mut self, id: EntityId) -> Option<EntityId> {
        self.creation.duplicate(&mut self.state, id)
    }

    /// Run one panel frame with the given pointer state
    pub fn frame(&mut self, input: PointerInput) -> bool {
        self.drag.begin_frame(&input);
        let Some(scene) = self.state.scene() else {
            return false;
        };
        for row in layout_rows(scene) {
            self.drag.visit_row(scene, &row, &input);
        }
        self.drag.end_frame(&mut self.state, &input)
    }

    /// Drag `entity` and release it at `target`, one frame held then released
    pub fn drag_to(&mut self, entity: EntityId, target: Pos2) -> bool {
        let Some(scene) = self.state.scene() else {
            return false;
        };
        let Some(start) = layout_rows(scene).iter().find(|r| r.entity == entity).map(|r| r.rect.center()) else {
            return false;
        };
        if !self.drag.begin_drag(scene, &self.state.selection, entity, start) {
            return false;
        }
        let held = PointerInput {
            pos: target,
            primary_down: true,
            cancel_down: false,
        };
        self.frame(held);
        self.frame(PointerInput {
            primary_down: false,
            ..held
        })
    }

    /// Row rectangle of an entity in the current layout
    pub fn row_rect(&self, entity: EntityId) -> Option<Rect> {
        let scene = self.state.scene()?;
        layout_rows(scene).into_iter().find(|r| r.entity == entity).map(|r| r.rect)
    }

    /// Log the current outline
    pub fn log_outline(&self, title: &str) {
        let Some(scene) = self.state.scene() else {
            return;
        };
        tracing::info!("{title} ({} entities)", scene.entity_count());
        for line in outline(scene) {
            tracing::info!("  {line}");
        }
    }
}

/// Run the scripted session. Returns whether every step succeeded.
pub fn run(settings: &EditorSettings) -> bool {
    let mut session = ScriptedSession::new(settings);

    let Some(door) = session.create_named("Door", None) else {
        return false;
    };
    let wall = session.create_named("Wall", None);
    let hinge = session.create_named("Hinge", Some(door));
    let lock = session.create_named("Lock", Some(door));
    let label = session.create_typed(EntityKind::UiText);
    if [wall, hinge, lock, label].iter().any(Option::is_none) {
        return false;
    }
    session.log_outline("Created");

    let Some(copy) = session.duplicate(door) else {
        return false;
    };
    session.log_outline("Duplicated Door");

    // Drop Wall onto the middle of Door_copy's row
    let (Some(wall), Some(target)) = (wall, session.row_rect(copy)) else {
        return false;
    };
    session.state.selection.clear();
    if !session.drag_to(wall, target.center()) {
        tracing::warn!("Drag did not apply");
        return false;
    }
    session.log_outline("Moved Wall into Door_copy");

    if !session.state.undo() {
        return false;
    }
    session.log_outline("Undo");
    if !session.state.redo() {
        return false;
    }
    session.log_outline("Redo");

    match session.state.scene() {
        Some(scene) => match scene.check_invariants() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Hierarchy is inconsistent: {e}");
                false
            }
        },
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_session_succeeds() {
        assert!(run(&EditorSettings::default()));
    }

    #[test]
    fn test_outline_indents_children() {
        let mut session = ScriptedSession::new(&EditorSettings::default());
        let door = session.create_named("Door", None).unwrap();
        session.create_named("Hinge", Some(door)).unwrap();
        assert_eq!(
            outline(session.state.scene().unwrap()),
            vec!["Door [0]".to_string(), "  Hinge [0]".to_string()]
        );
    }

    #[test]
    fn test_drag_below_reorders() {
        let mut session = ScriptedSession::new(&EditorSettings::default());
        let a = session.create_named("A", None).unwrap();
        let b = session.create_named("B", None).unwrap();
        session.state.selection.clear();

        let rect = session.row_rect(b).unwrap();
        assert!(session.drag_to(a, pos2(rect.left() + 2.0, rect.bottom() - 1.0)));
        let scene = session.state.scene().unwrap();
        assert_eq!(scene.roots(), &[b, a]);
    }
}
