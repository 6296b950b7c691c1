// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hierarchy drag-and-drop controller.
//!
//! Driven once per frame by the hierarchy panel:
//!
//! ```text
//! begin_frame(input)
//! for each visible row, in render order:
//!     visit_row(scene, row, input)
//! end_frame(state, input)
//! ```
//!
//! Everything learned while visiting rows lives in a per-frame context that
//! `begin_frame` resets, so nothing from one frame leaks into the next.

use crate::commands::{BatchCommand, EditorCommand};
use crate::entity::EntityId;
use crate::resolver::{self, DropTarget, DropZone, RenderedRow, ResolvedDrop};
use crate::scene::SceneData;
use crate::settings::HierarchySettings;
use crate::state::{EditorState, Selection};
use egui::{Pos2, Rect};

/// One visible row of the hierarchy panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowInfo {
    /// Entity shown in the row
    pub entity: EntityId,
    /// Screen rectangle of the row
    pub rect: Rect,
    /// Indentation depth (roots are 0)
    pub depth: usize,
    /// Whether the row is expanded and shows children below it
    pub expanded_with_children: bool,
}

/// Pointer state for the current frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerInput {
    /// Pointer position in screen space
    pub pos: Pos2,
    /// Primary button held
    pub primary_down: bool,
    /// Cancel key (Escape) held
    pub cancel_down: bool,
}

/// Drop feedback for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropIndicator {
    /// Insertion line between rows
    Line {
        /// Vertical position of the line
        y: f32,
        /// Left end of the line, at the target depth's indentation
        x: f32,
        /// Depth the dropped entities will end up at
        depth: usize,
    },
    /// Highlight the row the entities will be parented to
    Highlight(Rect),
}

#[derive(Debug, Clone)]
struct DragSession {
    payload: Vec<EntityId>,
    origin: Pos2,
}

#[derive(Debug, Clone, Default)]
struct FrameContext {
    last_rendered: Option<RenderedRow>,
    hovered: Option<ResolvedDrop>,
    indicator: Option<DropIndicator>,
}

/// Tracks a drag across frames and turns the final drop into commands
#[derive(Debug, Clone)]
pub struct DragDropController {
    settings: HierarchySettings,
    drag: Option<DragSession>,
    cancelled: bool,
    frame: FrameContext,
}

impl DragDropController {
    /// Create an idle controller
    pub fn new(settings: HierarchySettings) -> Self {
        Self {
            settings,
            drag: None,
            cancelled: false,
            frame: FrameContext::default(),
        }
    }

    /// Start dragging `grabbed`.
    ///
    /// The whole selection is dragged if it contains `grabbed`, otherwise
    /// just `grabbed`. Non-editable entities stay behind. Returns whether a
    /// drag started.
    pub fn begin_drag(&mut self, scene: &SceneData, selection: &Selection, grabbed: EntityId, pointer: Pos2) -> bool {
        if self.drag.is_some() || self.cancelled {
            return false;
        }
        let candidates = if selection.contains(&grabbed) {
            selection.entities.clone()
        } else {
            vec![grabbed]
        };
        let payload: Vec<EntityId> = scene
            .visible_order(&candidates)
            .into_iter()
            .filter(|id| scene.get(id).is_some_and(|e| e.editable))
            .collect();
        if payload.is_empty() {
            tracing::debug!("Nothing draggable under {grabbed}");
            return false;
        }

        tracing::debug!("Dragging {} entities", payload.len());
        self.drag = Some(DragSession {
            payload,
            origin: pointer,
        });
        true
    }

    /// Reset per-frame state and latch cancellation
    pub fn begin_frame(&mut self, input: &PointerInput) {
        self.frame = FrameContext::default();
        if self.drag.is_some() && input.cancel_down && !self.cancelled {
            tracing::debug!("Drag cancelled");
            self.cancelled = true;
        }
    }

    /// Visit one rendered row; rows must be visited in render order
    pub fn visit_row(&mut self, scene: &SceneData, row: &RowInfo, input: &PointerInput) {
        let previous = self.frame.last_rendered.replace(RenderedRow {
            entity: row.entity,
            depth: row.depth,
        });
        if self.cancelled || self.frame.hovered.is_some() {
            return;
        }
        let Some(drag) = &self.drag else {
            return;
        };

        let settings = &self.settings;
        let Some(zone) = resolver::classify_zone(
            row.rect,
            input.pos,
            row.expanded_with_children,
            settings.zone_fraction,
        ) else {
            return;
        };
        let origin_x = row.rect.left() + settings.indent_offset;
        let desired = resolver::x_depth(input.pos.x, origin_x, settings.indent_width);
        let Some(resolved) = resolver::resolve_drop(scene, row.entity, row.depth, zone, desired, previous) else {
            return;
        };
        if resolver::plan_moves(scene, &drag.payload, resolved.target).is_empty() {
            tracing::trace!("No valid move for {:?}", resolved.target);
            return;
        }

        let indicator = match zone {
            DropZone::On => DropIndicator::Highlight(row.rect),
            DropZone::Above | DropZone::Below => DropIndicator::Line {
                y: if zone == DropZone::Above {
                    row.rect.top()
                } else {
                    row.rect.bottom()
                },
                x: origin_x + settings.indent_width * resolved.depth as f32,
                depth: resolved.depth,
            },
        };
        self.frame.hovered = Some(resolved);
        self.frame.indicator = Some(indicator);
    }

    /// Finish the frame. On release, ends the drag and performs the drop.
    ///
    /// Returns whether the scene changed.
    pub fn end_frame(&mut self, state: &mut EditorState, input: &PointerInput) -> bool {
        if input.primary_down {
            return false;
        }
        let cancelled = std::mem::take(&mut self.cancelled);
        let Some(drag) = self.drag.take() else {
            return false;
        };
        let hovered = self.frame.hovered.take();
        self.frame.indicator = None;
        if cancelled {
            return false;
        }
        let Some(hovered) = hovered else {
            tracing::debug!("Drag released outside a valid target");
            return false;
        };
        execute_drop(state, &drag.payload, hovered.target)
    }

    /// Indicator to draw this frame
    pub fn indicator(&self) -> Option<&DropIndicator> {
        self.frame.indicator.as_ref()
    }

    /// Drop the pointer is currently over
    pub fn hovered_drop(&self) -> Option<&ResolvedDrop> {
        self.frame.hovered.as_ref()
    }

    /// Check if a drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Check if the current drag was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Entities being dragged, in render order
    pub fn payload(&self) -> &[EntityId] {
        self.drag.as_ref().map(|d| d.payload.as_slice()).unwrap_or(&[])
    }

    /// Pointer position where the drag started
    pub fn drag_origin(&self) -> Option<Pos2> {
        self.drag.as_ref().map(|d| d.origin)
    }
}

/// Move `payload` to `target` as one undo step. Returns whether anything moved.
pub fn execute_drop(state: &mut EditorState, payload: &[EntityId], target: DropTarget) -> bool {
    let Some(scene) = state.scene() else {
        return false;
    };
    let mut moves = resolver::plan_moves(scene, payload, target);
    let count = moves.len();
    let command: Box<dyn EditorCommand> = match count {
        0 => return false,
        1 => Box::new(moves.remove(0)),
        n => {
            let mut batch = BatchCommand::new(format!("Move {n} Entities"));
            for command in moves {
                batch.push(Box::new(command));
            }
            Box::new(batch)
        }
    };
    if !state.execute(command) {
        return false;
    }
    tracing::info!("Moved {count} entities");
    true
}
