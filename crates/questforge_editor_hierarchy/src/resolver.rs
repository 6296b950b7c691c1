// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drop resolution for hierarchy drag-and-drop.
//!
//! Given the row under the pointer, this module decides which drop zone the
//! pointer is in, how deep the user wants to drop (from the horizontal
//! pointer position), which parent and sibling index that means, and whether
//! the move is allowed. It never mutates the scene; the result is a list of
//! [`ReparentCommand`]s for the caller to execute.
//!
//! ## Zones
//!
//! ```text
//! +---------------------------+  top
//! | ABOVE   (y <= f*h)        |
//! |---------------------------|
//! | ON                        |
//! |---------------------------|
//! | BELOW   (y >= (1-f)*h)    |  leaf or collapsed rows only
//! +---------------------------+  bottom
//! ```

use crate::commands::ReparentCommand;
use crate::entity::EntityId;
use crate::scene::SceneData;
use egui::{Pos2, Rect};

/// Default fraction of the row height used by the ABOVE and BELOW zones
pub const DEFAULT_ZONE_FRACTION: f32 = 0.25;

/// Vertical region of a row the pointer is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropZone {
    /// Top band: insert before the row (or after a deeper previous row)
    Above,
    /// Middle: become the row's last child
    On,
    /// Bottom band: insert after the row or one of its ancestors
    Below,
}

/// Where a drop lands, relative to an existing entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Become the previous sibling of the entity
    Before(EntityId),
    /// Become the next sibling of the entity
    After(EntityId),
    /// Become the last child of the entity
    Inside(EntityId),
}

impl DropTarget {
    /// The entity the drop is positioned against
    pub fn anchor(&self) -> EntityId {
        match self {
            DropTarget::Before(id) | DropTarget::After(id) | DropTarget::Inside(id) => *id,
        }
    }
}

/// Parent and sibling index a drop inserts at (before any moves)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertPosition {
    /// New parent (`None` for the root list)
    pub parent: Option<EntityId>,
    /// Index in the parent's sibling list
    pub index: usize,
}

/// A row that was rendered during the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedRow {
    /// Entity shown in the row
    pub entity: EntityId,
    /// Indentation depth of the row
    pub depth: usize,
}

/// Fully resolved drop for one hovered row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDrop {
    /// Zone the pointer is in
    pub zone: DropZone,
    /// Depth the dropped entities will end up at
    pub depth: usize,
    /// Placement relative to an existing entity
    pub target: DropTarget,
}

/// Classify the pointer position within a row.
///
/// Returns `None` if the pointer is outside the row. Zones are tested in the
/// order ABOVE, BELOW, ON; a boundary belongs to the earlier test.
pub fn classify_zone(
    rect: Rect,
    pointer: Pos2,
    expanded_with_children: bool,
    zone_fraction: f32,
) -> Option<DropZone> {
    let height = rect.height();
    if height <= 0.0 || !rect.contains(pointer) {
        return None;
    }
    let edge = height * zone_fraction.clamp(0.0, 0.5);
    let y = pointer.y - rect.top();

    if y <= edge {
        Some(DropZone::Above)
    } else if !expanded_with_children && y >= height - edge {
        Some(DropZone::Below)
    } else {
        Some(DropZone::On)
    }
}

/// Desired tree depth from the pointer's horizontal position.
///
/// `origin_x` is where depth 0 starts (row left plus indent offset). Only
/// whole levels count; anything left of the origin is depth 0.
pub fn x_depth(pointer_x: f32, origin_x: f32, indent_width: f32) -> usize {
    if indent_width <= 0.0 || pointer_x <= origin_x {
        return 0;
    }
    ((pointer_x - origin_x) / indent_width).floor() as usize
}

/// Valid depth range for an ABOVE drop on a row at `row_depth`
pub fn above_depth_range(row_depth: usize, previous: Option<RenderedRow>) -> (usize, usize) {
    let max = previous.map_or(row_depth, |p| p.depth.max(row_depth));
    (row_depth, max)
}

/// Shallowest depth a BELOW drop on `row` can reach.
///
/// Walks up while the current entity is the last of its siblings; stops at
/// the first ancestor with a later sibling, or at a root.
pub fn below_min_depth(scene: &SceneData, row: EntityId, row_depth: usize) -> usize {
    let mut depth = row_depth;
    let mut current = row;
    while depth > 0 && scene.is_last_sibling(&current) {
        let Some(parent) = scene.parent_of(&current) else {
            break;
        };
        current = parent;
        depth -= 1;
    }
    depth
}

fn walk_up(scene: &SceneData, from: EntityId, steps: usize) -> Option<EntityId> {
    let mut current = from;
    for _ in 0..steps {
        current = scene.parent_of(&current)?;
    }
    Some(current)
}

/// Resolve an ABOVE drop at the desired depth
pub fn resolve_above(
    scene: &SceneData,
    row: EntityId,
    row_depth: usize,
    previous: Option<RenderedRow>,
    desired_depth: usize,
) -> Option<(usize, DropTarget)> {
    let (min, max) = above_depth_range(row_depth, previous);
    let depth = desired_depth.clamp(min, max);
    match previous {
        Some(prev) if depth > row_depth => {
            let anchor = walk_up(scene, prev.entity, prev.depth - depth)?;
            Some((depth, DropTarget::After(anchor)))
        }
        _ => Some((row_depth, DropTarget::Before(row))),
    }
}

/// Resolve a BELOW drop at the desired depth
pub fn resolve_below(
    scene: &SceneData,
    row: EntityId,
    row_depth: usize,
    desired_depth: usize,
) -> Option<(usize, DropTarget)> {
    let min = below_min_depth(scene, row, row_depth);
    let depth = desired_depth.clamp(min, row_depth);
    let anchor = walk_up(scene, row, row_depth - depth)?;
    Some((depth, DropTarget::After(anchor)))
}

/// Resolve zone and depth for a hovered row into a drop target
pub fn resolve_drop(
    scene: &SceneData,
    row: EntityId,
    row_depth: usize,
    zone: DropZone,
    desired_depth: usize,
    previous: Option<RenderedRow>,
) -> Option<ResolvedDrop> {
    if !scene.contains(&row) {
        return None;
    }
    let (depth, target) = match zone {
        DropZone::Above => resolve_above(scene, row, row_depth, previous, desired_depth)?,
        DropZone::Below => resolve_below(scene, row, row_depth, desired_depth)?,
        DropZone::On => (row_depth + 1, DropTarget::Inside(row)),
    };
    Some(ResolvedDrop {
        zone,
        depth,
        target,
    })
}

/// Parent and index a target resolves to in the current scene
pub fn insert_position(scene: &SceneData, target: DropTarget) -> Option<InsertPosition> {
    match target {
        DropTarget::Before(anchor) => Some(InsertPosition {
            parent: scene.get(&anchor)?.parent,
            index: scene.sibling_index(&anchor)?,
        }),
        DropTarget::After(anchor) => Some(InsertPosition {
            parent: scene.get(&anchor)?.parent,
            index: scene.sibling_index(&anchor)? + 1,
        }),
        DropTarget::Inside(anchor) => Some(InsertPosition {
            parent: Some(anchor),
            index: scene.get(&anchor)?.children.len(),
        }),
    }
}

/// Check if `entity` may be dropped at `target`
pub fn can_move(scene: &SceneData, entity: EntityId, target: DropTarget) -> bool {
    let Some(data) = scene.get(&entity) else {
        return false;
    };
    if !data.editable {
        tracing::trace!("Rejected drop: {entity} is not editable");
        return false;
    }
    let anchor = target.anchor();
    if entity == anchor || scene.is_ancestor_of(&entity, &anchor) {
        tracing::trace!("Rejected drop: {entity} would become its own ancestor");
        return false;
    }
    if let DropTarget::Inside(parent) = target {
        if !scene.get(&parent).is_some_and(|p| p.editable) {
            tracing::trace!("Rejected drop: {parent} does not accept children");
            return false;
        }
    }
    true
}

/// Plan the reparent commands that drop `payload` at `target`.
///
/// Invalid entities are skipped, as are entities whose ancestor also moves.
/// The rest keep their render order and end up contiguous at the target.
/// Moves that would not change anything are left out, so an empty result
/// means there is nothing to do.
pub fn plan_moves(scene: &SceneData, payload: &[EntityId], target: DropTarget) -> Vec<ReparentCommand> {
    let Some(position) = insert_position(scene, target) else {
        return Vec::new();
    };
    let valid: Vec<EntityId> = payload
        .iter()
        .copied()
        .filter(|id| can_move(scene, *id, target))
        .collect();
    let movers = scene.top_level(&valid);

    let group = scene.group(position.parent);
    let anchor = group
        .get(position.index..)
        .unwrap_or(&[])
        .iter()
        .find(|id| !movers.contains(id))
        .copied();

    let mut simulated = group.to_vec();
    let mut commands = Vec::with_capacity(movers.len());
    for id in movers {
        let current = simulated.iter().position(|s| *s == id);
        simulated.retain(|s| *s != id);
        let index = anchor
            .and_then(|a| simulated.iter().position(|s| *s == a))
            .unwrap_or(simulated.len());
        simulated.insert(index, id);

        if current == Some(index) {
            continue;
        }
        commands.push(ReparentCommand::new(id, position.parent, index));
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::EditorCommand;
    use crate::scene::tests::{add, names};
    use egui::pos2;

    fn row_rect() -> Rect {
        Rect::from_min_max(pos2(0.0, 100.0), pos2(200.0, 120.0))
    }

    fn apply(scene: &mut SceneData, commands: Vec<ReparentCommand>) {
        for mut command in commands {
            command.execute(scene).unwrap();
        }
    }

    #[test]
    fn test_zone_boundaries() {
        let rect = row_rect();
        let f = DEFAULT_ZONE_FRACTION;
        assert_eq!(classify_zone(rect, pos2(10.0, 100.0), false, f), Some(DropZone::Above));
        assert_eq!(classify_zone(rect, pos2(10.0, 105.0), false, f), Some(DropZone::Above));
        assert_eq!(classify_zone(rect, pos2(10.0, 105.5), false, f), Some(DropZone::On));
        assert_eq!(classify_zone(rect, pos2(10.0, 114.5), false, f), Some(DropZone::On));
        assert_eq!(classify_zone(rect, pos2(10.0, 115.0), false, f), Some(DropZone::Below));
        assert_eq!(classify_zone(rect, pos2(10.0, 120.0), false, f), Some(DropZone::Below));
        assert_eq!(classify_zone(rect, pos2(10.0, 121.0), false, f), None);
        assert_eq!(classify_zone(rect, pos2(-1.0, 110.0), false, f), None);
    }

    #[test]
    fn test_expanded_parent_has_no_below() {
        let rect = row_rect();
        let f = DEFAULT_ZONE_FRACTION;
        assert_eq!(classify_zone(rect, pos2(10.0, 118.0), true, f), Some(DropZone::On));
        assert_eq!(classify_zone(rect, pos2(10.0, 102.0), true, f), Some(DropZone::Above));
    }

    #[test]
    fn test_x_depth_floors_and_clamps() {
        assert_eq!(x_depth(-20.0, 0.0, 16.0), 0);
        assert_eq!(x_depth(15.9, 0.0, 16.0), 0);
        assert_eq!(x_depth(16.0, 0.0, 16.0), 1);
        assert_eq!(x_depth(40.0, 8.0, 16.0), 2);
        assert_eq!(x_depth(40.0, 0.0, 0.0), 0);
    }

    #[test]
    fn test_above_clamps_to_previous_depth() {
        // R > A > B > C > D (depth 4), then E at depth 2 under A
        let mut scene = SceneData::new();
        let r = add(&mut scene, "R", None);
        let a = add(&mut scene, "A", Some(r));
        let b = add(&mut scene, "B", Some(a));
        let c = add(&mut scene, "C", Some(b));
        let d = add(&mut scene, "D", Some(c));
        let e = add(&mut scene, "E", Some(a));
        assert_eq!(scene.depth(&d), 4);
        assert_eq!(scene.depth(&e), 2);

        let previous = Some(RenderedRow { entity: d, depth: 4 });
        assert_eq!(above_depth_range(2, previous), (2, 4));

        let (depth, target) = resolve_above(&scene, e, 2, previous, 6).unwrap();
        assert_eq!(depth, 4);
        assert_eq!(target, DropTarget::After(d));

        let (depth, target) = resolve_above(&scene, e, 2, previous, 3).unwrap();
        assert_eq!(depth, 3);
        assert_eq!(target, DropTarget::After(c));

        let (depth, target) = resolve_above(&scene, e, 2, previous, 0).unwrap();
        assert_eq!(depth, 2);
        assert_eq!(target, DropTarget::Before(e));
    }

    #[test]
    fn test_above_first_row_inserts_before() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let (depth, target) = resolve_above(&scene, a, 0, None, 3).unwrap();
        assert_eq!(depth, 0);
        assert_eq!(target, DropTarget::Before(a));
    }

    #[test]
    fn test_below_can_outdent_through_last_children() {
        // P > Q > L (last child of last child), then S a root after P
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let q = add(&mut scene, "Q", Some(p));
        let l = add(&mut scene, "L", Some(q));
        let _s = add(&mut scene, "S", None);

        assert_eq!(below_min_depth(&scene, l, 2), 0);
        assert_eq!(resolve_below(&scene, l, 2, 9).unwrap(), (2, DropTarget::After(l)));
        assert_eq!(resolve_below(&scene, l, 2, 1).unwrap(), (1, DropTarget::After(q)));
        assert_eq!(resolve_below(&scene, l, 2, 0).unwrap(), (0, DropTarget::After(p)));
    }

    #[test]
    fn test_below_stops_at_later_sibling() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let a = add(&mut scene, "A", Some(p));
        let _b = add(&mut scene, "B", Some(p));
        assert_eq!(below_min_depth(&scene, a, 1), 1);
        assert_eq!(resolve_below(&scene, a, 1, 0).unwrap(), (1, DropTarget::After(a)));
    }

    #[test]
    fn test_reparent_after_self() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let _b = add(&mut scene, "B", Some(p));
        let a = add(&mut scene, "A", Some(p));
        let c = add(&mut scene, "C", Some(p));

        let drop = resolve_drop(&scene, c, 1, DropZone::Below, 1, None).unwrap();
        assert_eq!(drop.target, DropTarget::After(c));

        let commands = plan_moves(&scene, &[a], drop.target);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].new_index, 2);

        apply(&mut scene, commands);
        assert_eq!(names(&scene, Some(p)), vec!["B", "C", "A"]);
        let orders: Vec<usize> = scene.children(&p).iter().map(|id| scene.get(id).unwrap().order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let child = add(&mut scene, "Child", Some(p));
        let grandchild = add(&mut scene, "Grandchild", Some(child));

        assert!(!can_move(&scene, p, DropTarget::Inside(grandchild)));
        assert!(!can_move(&scene, p, DropTarget::Inside(p)));
        assert!(!can_move(&scene, p, DropTarget::After(child)));
        assert!(plan_moves(&scene, &[p], DropTarget::Inside(grandchild)).is_empty());
        assert!(can_move(&scene, grandchild, DropTarget::Before(p)));
    }

    #[test]
    fn test_chained_moves_never_create_cycles() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", None);
        let c = add(&mut scene, "C", None);
        let a1 = add(&mut scene, "A1", Some(a));
        let b1 = add(&mut scene, "B1", Some(b));

        // B moves under A1: A > A1 > B > B1
        let commands = plan_moves(&scene, &[b], DropTarget::Inside(a1));
        apply(&mut scene, commands);
        scene.check_invariants().unwrap();
        assert_eq!(scene.depth(&b1), 3);

        // A into its own descendant is rejected and changes nothing
        let before = scene.clone();
        assert!(plan_moves(&scene, &[a], DropTarget::Inside(b1)).is_empty());
        assert!(plan_moves(&scene, &[a1], DropTarget::After(b1)).is_empty());
        assert_eq!(scene, before);

        // C joins B1's group, then B1 is pulled out to the root list
        let commands = plan_moves(&scene, &[c], DropTarget::Before(b1));
        apply(&mut scene, commands);
        scene.check_invariants().unwrap();
        let commands = plan_moves(&scene, &[b1], DropTarget::Before(a));
        apply(&mut scene, commands);
        scene.check_invariants().unwrap();
        assert_eq!(names(&scene, None), vec!["B1", "A"]);

        // Now A may go under B1, taking its whole subtree along
        let commands = plan_moves(&scene, &[a, c], DropTarget::Inside(b1));
        assert_eq!(commands.len(), 1);
        apply(&mut scene, commands);
        scene.check_invariants().unwrap();
        assert_eq!(scene.roots(), &[b1]);
        assert_eq!(scene.depth(&c), 4);

        // Dragging B1 into the moved subtree is still rejected
        assert!(plan_moves(&scene, &[b1], DropTarget::Inside(c)).is_empty());
        scene.check_invariants().unwrap();
    }

    #[test]
    fn test_non_editable_rules() {
        let mut scene = SceneData::new();
        let locked = add(&mut scene, "Locked", None);
        let free = add(&mut scene, "Free", None);
        scene.get_mut(&locked).unwrap().editable = false;

        assert!(!can_move(&scene, locked, DropTarget::After(free)));
        assert!(!can_move(&scene, free, DropTarget::Inside(locked)));
        assert!(can_move(&scene, free, DropTarget::Before(locked)));
    }

    #[test]
    fn test_multi_select_keeps_render_order() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let _b = add(&mut scene, "B", None);
        let c = add(&mut scene, "C", None);
        let d = add(&mut scene, "D", None);

        // Payload given out of order; result follows render order
        let commands = plan_moves(&scene, &[d, c], DropTarget::Before(a));
        assert_eq!(commands.len(), 2);
        apply(&mut scene, commands);
        assert_eq!(names(&scene, None), vec!["C", "D", "A", "B"]);
        scene.check_invariants().unwrap();
    }

    #[test]
    fn test_multi_select_skips_invalid_and_nested() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let child = add(&mut scene, "Child", Some(p));
        let target = add(&mut scene, "Target", Some(p));
        let other = add(&mut scene, "Other", None);

        // P is an ancestor of Target (invalid); Child and Other still move
        let commands = plan_moves(&scene, &[p, child, other], DropTarget::Inside(target));
        assert_eq!(commands.len(), 2);
        apply(&mut scene, commands);
        assert_eq!(names(&scene, Some(target)), vec!["Child", "Other"]);

        // Child moves with its selected parent
        let q = add(&mut scene, "Q", None);
        let inner = add(&mut scene, "Inner", Some(q));
        let commands = plan_moves(&scene, &[q, inner], DropTarget::Before(p));
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].entity, q);
    }

    #[test]
    fn test_noop_move_plans_nothing() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", None);
        assert!(plan_moves(&scene, &[b], DropTarget::After(a)).is_empty());
        assert!(plan_moves(&scene, &[a], DropTarget::Before(b)).is_empty());
        assert_eq!(plan_moves(&scene, &[a], DropTarget::After(b)).len(), 1);
    }
}
