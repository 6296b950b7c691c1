// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene arena and tree invariants.
//!
//! The scene owns every [`EntityData`] record. Entities refer to each other
//! only by [`EntityId`]: `parent` is a back-link, and each sibling group (the
//! root list, or an entity's `children`) is the canonical ordered list for
//! that level of the tree.
//!
//! The primitives here do not record history. Commands in
//! [`crate::commands`] compose them and are responsible for leaving every
//! touched sibling group renumbered to `0..N-1`.

use crate::entity::{EntityData, EntityId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by structural scene operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Entity not found
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Entity with this ID already exists
    #[error("Entity already exists: {0}")]
    DuplicateEntity(EntityId),

    /// Parent referenced by an entity does not exist
    #[error("Parent not found: {0}")]
    ParentNotFound(EntityId),

    /// Reparenting would make an entity its own ancestor
    #[error("Reparenting {entity} under {parent} would create a cycle")]
    WouldCreateCycle {
        /// Entity being moved
        entity: EntityId,
        /// Requested parent
        parent: EntityId,
    },

    /// A structural invariant does not hold
    #[error("Hierarchy invariant violated: {0}")]
    InvariantViolation(String),
}

/// Scene data containing all entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    /// All entities in the scene
    entities: IndexMap<EntityId, EntityData>,
    /// Root sibling group, in order
    roots: Vec<EntityId>,
}

impl SceneData {
    /// Create a new empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an entity by ID
    pub fn get(&self, id: &EntityId) -> Option<&EntityData> {
        self.entities.get(id)
    }

    /// Get a mutable reference to an entity by ID.
    ///
    /// Structural fields (`parent`, `order`, `children`) must only be changed
    /// through the scene methods.
    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut EntityData> {
        self.entities.get_mut(id)
    }

    /// Check if an entity exists
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Total number of entities
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Check if the scene has no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all entities in insertion order
    pub fn entities(&self) -> impl Iterator<Item = &EntityData> {
        self.entities.values()
    }

    /// Root entities, in sibling order
    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    /// Children of an entity, in sibling order
    pub fn children(&self, id: &EntityId) -> &[EntityId] {
        self.entities
            .get(id)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// The sibling group under `parent` (`None` for the root list)
    pub fn group(&self, parent: Option<EntityId>) -> &[EntityId] {
        match parent {
            Some(parent) => self.children(&parent),
            None => &self.roots,
        }
    }

    fn group_mut(&mut self, parent: Option<EntityId>) -> Option<&mut Vec<EntityId>> {
        match parent {
            Some(parent) => self.entities.get_mut(&parent).map(|e| &mut e.children),
            None => Some(&mut self.roots),
        }
    }

    /// Parent of an entity (`None` for roots and unknown IDs)
    pub fn parent_of(&self, id: &EntityId) -> Option<EntityId> {
        self.entities.get(id).and_then(|e| e.parent)
    }

    /// Position of an entity within its sibling list
    pub fn sibling_index(&self, id: &EntityId) -> Option<usize> {
        let entity = self.entities.get(id)?;
        self.group(entity.parent).iter().position(|s| s == id)
    }

    /// Check if no sibling follows this entity
    pub fn is_last_sibling(&self, id: &EntityId) -> bool {
        let Some(entity) = self.entities.get(id) else {
            return false;
        };
        self.group(entity.parent).last() == Some(id)
    }

    /// Depth of an entity (roots are at depth 0)
    pub fn depth(&self, id: &EntityId) -> usize {
        let mut depth = 0;
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            depth += 1;
            assert!(
                depth <= self.entities.len(),
                "cycle detected in entity hierarchy at {id}"
            );
            current = self.parent_of(&parent);
        }
        depth
    }

    /// Walk up from `id` to its ancestor (or itself) at `depth`
    pub fn ancestor_at_depth(&self, id: &EntityId, depth: usize) -> Option<EntityId> {
        let own_depth = self.depth(id);
        if depth > own_depth {
            return None;
        }
        let mut current = *id;
        for _ in 0..own_depth - depth {
            current = self.parent_of(&current)?;
        }
        Some(current)
    }

    /// Check if `ancestor` is a strict ancestor of `id`.
    ///
    /// An entity is never its own ancestor.
    pub fn is_ancestor_of(&self, ancestor: &EntityId, id: &EntityId) -> bool {
        let mut steps = 0;
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if parent == *ancestor {
                return true;
            }
            steps += 1;
            assert!(
                steps <= self.entities.len(),
                "cycle detected in entity hierarchy at {id}"
            );
            current = self.parent_of(&parent);
        }
        false
    }

    /// Insert a record into the arena.
    ///
    /// The record is placed in its parent's sibling list at `data.order`
    /// (clamped to the list length). Its own `children` list is kept as-is.
    /// Siblings are not renumbered.
    pub fn insert_entity(&mut self, data: EntityData) -> Result<(), SceneError> {
        if self.entities.contains_key(&data.id) {
            return Err(SceneError::DuplicateEntity(data.id));
        }
        let id = data.id;
        let parent = data.parent;
        let order = data.order;
        let group = self
            .group_mut(parent)
            .ok_or_else(|| SceneError::ParentNotFound(parent.unwrap_or(id)))?;
        let index = order.min(group.len());
        group.insert(index, id);
        self.entities.insert(id, data);
        Ok(())
    }

    /// Remove a single record from the arena and its sibling list.
    ///
    /// Children are not touched; callers remove subtrees leaf-first.
    pub fn remove_entity(&mut self, id: &EntityId) -> Option<EntityData> {
        let parent = self.entities.get(id)?.parent;
        if let Some(group) = self.group_mut(parent) {
            group.retain(|s| s != id);
        }
        self.entities.shift_remove(id)
    }

    /// Put previously removed subtrees back exactly as they were.
    ///
    /// `records` are inserted into the arena untouched (their `children`
    /// lists included) and each listed sibling group is overwritten with its
    /// saved order, then renumbered. Nothing is changed if any record already
    /// exists or a group's parent is missing.
    pub fn restore_subtrees(
        &mut self,
        records: &[EntityData],
        groups: &[(Option<EntityId>, Vec<EntityId>)],
    ) -> Result<(), SceneError> {
        for record in records {
            if self.entities.contains_key(&record.id) {
                return Err(SceneError::DuplicateEntity(record.id));
            }
        }
        for (parent, _) in groups {
            if let Some(parent) = parent {
                let restored = records.iter().any(|r| r.id == *parent);
                if !restored && !self.entities.contains_key(parent) {
                    return Err(SceneError::ParentNotFound(*parent));
                }
            }
        }

        for record in records {
            self.entities.insert(record.id, record.clone());
        }
        for (parent, saved) in groups {
            if let Some(group) = self.group_mut(*parent) {
                group.clone_from(saved);
            }
            self.renumber(*parent);
        }
        Ok(())
    }

    /// Pure structural pointer update.
    ///
    /// Moves `id` from its old sibling list into the new one, placed after any
    /// sibling whose `order` is not greater than its own. Does not renumber,
    /// validate cycles, or record history.
    pub fn set_parent(&mut self, id: &EntityId, new_parent: Option<EntityId>) -> Result<(), SceneError> {
        let (old_parent, order) = match self.entities.get(id) {
            Some(e) => (e.parent, e.order),
            None => return Err(SceneError::EntityNotFound(*id)),
        };
        if let Some(parent) = new_parent {
            if !self.entities.contains_key(&parent) {
                return Err(SceneError::ParentNotFound(parent));
            }
        }

        if let Some(group) = self.group_mut(old_parent) {
            group.retain(|s| s != id);
        }

        let index = {
            let group = self.group(new_parent);
            group
                .iter()
                .position(|s| self.entities.get(s).is_some_and(|e| e.order > order))
                .unwrap_or(group.len())
        };
        if let Some(group) = self.group_mut(new_parent) {
            group.insert(index, *id);
        }
        if let Some(entity) = self.entities.get_mut(id) {
            entity.parent = new_parent;
        }
        Ok(())
    }

    /// Set the sibling order value of an entity and re-sort its group.
    ///
    /// The sort is stable, so equal orders keep their relative position.
    pub fn set_order(&mut self, id: &EntityId, order: usize) -> Result<(), SceneError> {
        let parent = {
            let Some(entity) = self.entities.get_mut(id) else {
                return Err(SceneError::EntityNotFound(*id));
            };
            entity.order = order;
            entity.parent
        };

        let mut group = self.group(parent).to_vec();
        group.sort_by_key(|s| self.entities.get(s).map_or(usize::MAX, |e| e.order));
        if let Some(slot) = self.group_mut(parent) {
            *slot = group;
        }
        Ok(())
    }

    /// Renumber a sibling group to `0..N-1` in list order
    pub fn renumber(&mut self, parent: Option<EntityId>) {
        let group = self.group(parent).to_vec();
        for (index, id) in group.iter().enumerate() {
            if let Some(entity) = self.entities.get_mut(id) {
                entity.order = index;
            }
        }
    }

    /// Move an entity to `index` in the sibling list of `new_parent`.
    ///
    /// `index` is interpreted after the entity has been removed from its
    /// current list. Both the old and new groups are renumbered.
    pub fn move_entity(
        &mut self,
        id: &EntityId,
        new_parent: Option<EntityId>,
        index: usize,
    ) -> Result<(), SceneError> {
        let old_parent = match self.entities.get(id) {
            Some(e) => e.parent,
            None => return Err(SceneError::EntityNotFound(*id)),
        };
        if let Some(parent) = new_parent {
            if !self.entities.contains_key(&parent) {
                return Err(SceneError::ParentNotFound(parent));
            }
            if parent == *id || self.is_ancestor_of(id, &parent) {
                return Err(SceneError::WouldCreateCycle { entity: *id, parent });
            }
        }

        if let Some(group) = self.group_mut(old_parent) {
            group.retain(|s| s != id);
        }
        if let Some(group) = self.group_mut(new_parent) {
            let index = index.min(group.len());
            group.insert(index, *id);
        }
        if let Some(entity) = self.entities.get_mut(id) {
            entity.parent = new_parent;
        }

        self.renumber(old_parent);
        if old_parent != new_parent {
            self.renumber(new_parent);
        }
        Ok(())
    }

    /// An entity and all of its descendants, in pre-order
    pub fn descendants(&self, id: &EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        if self.entities.contains_key(id) {
            self.push_preorder(id, &mut out);
        }
        out
    }

    fn push_preorder(&self, id: &EntityId, out: &mut Vec<EntityId>) {
        out.push(*id);
        for child in self.children(id) {
            self.push_preorder(child, out);
        }
    }

    /// Every entity in render order (depth-first, siblings in order)
    pub fn preorder(&self) -> Vec<EntityId> {
        let mut out = Vec::with_capacity(self.entities.len());
        for root in &self.roots {
            self.push_preorder(root, &mut out);
        }
        out
    }

    /// Sort IDs by render order, dropping unknown and repeated IDs
    pub fn visible_order(&self, ids: &[EntityId]) -> Vec<EntityId> {
        self.preorder()
            .into_iter()
            .filter(|id| ids.contains(id))
            .collect()
    }

    /// Collect the given entities and all of their descendants.
    ///
    /// Entities that are already covered by a selected ancestor are not
    /// repeated. The result is in render order, so parents precede children.
    pub fn collect_with_descendants(&self, ids: &[EntityId]) -> Vec<EntityId> {
        let mut out = Vec::new();
        for id in self.top_level(ids) {
            self.push_preorder(&id, &mut out);
        }
        out
    }

    /// Filter IDs down to those with no ancestor in the same set, in render order
    pub fn top_level(&self, ids: &[EntityId]) -> Vec<EntityId> {
        self.visible_order(ids)
            .into_iter()
            .filter(|id| !ids.iter().any(|other| self.is_ancestor_of(other, id)))
            .collect()
    }

    /// Validate the parent/child links and sibling numbering of the whole tree
    pub fn check_invariants(&self) -> Result<(), SceneError> {
        self.check_group(None)?;
        for entity in self.entities.values() {
            if self.is_ancestor_of(&entity.id, &entity.id) {
                return Err(SceneError::InvariantViolation(format!(
                    "{} is its own ancestor",
                    entity.id
                )));
            }
            if let Some(parent) = entity.parent {
                if !self.entities.contains_key(&parent) {
                    return Err(SceneError::ParentNotFound(parent));
                }
            }
            self.check_group(Some(entity.id))?;
        }
        if self.preorder().len() != self.entities.len() {
            return Err(SceneError::InvariantViolation(
                "entities unreachable from the root list".to_string(),
            ));
        }
        Ok(())
    }

    fn check_group(&self, parent: Option<EntityId>) -> Result<(), SceneError> {
        for (index, id) in self.group(parent).iter().enumerate() {
            let Some(entity) = self.entities.get(id) else {
                return Err(SceneError::EntityNotFound(*id));
            };
            if entity.parent != parent {
                return Err(SceneError::InvariantViolation(format!(
                    "{} is listed under the wrong parent",
                    entity.id
                )));
            }
            if entity.order != index {
                return Err(SceneError::InvariantViolation(format!(
                    "{} has order {} at index {}",
                    entity.id, entity.order, index
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Insert `name` as the last child of `parent` and renumber.
    pub(crate) fn add(scene: &mut SceneData, name: &str, parent: Option<EntityId>) -> EntityId {
        let order = scene.group(parent).len();
        let data = EntityData::new(name).placed(parent, order);
        let id = data.id;
        scene.insert_entity(data).unwrap();
        scene.renumber(parent);
        id
    }

    pub(crate) fn names(scene: &SceneData, parent: Option<EntityId>) -> Vec<String> {
        scene
            .group(parent)
            .iter()
            .map(|id| scene.get(id).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn test_insert_and_depth() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", Some(a));
        let c = add(&mut scene, "C", Some(b));

        assert_eq!(scene.depth(&a), 0);
        assert_eq!(scene.depth(&c), 2);
        assert_eq!(scene.ancestor_at_depth(&c, 0), Some(a));
        assert_eq!(scene.ancestor_at_depth(&c, 2), Some(c));
        assert_eq!(scene.ancestor_at_depth(&a, 1), None);
        scene.check_invariants().unwrap();
    }

    #[test]
    fn test_is_ancestor_of_is_strict() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", Some(a));

        assert!(scene.is_ancestor_of(&a, &b));
        assert!(!scene.is_ancestor_of(&b, &a));
        assert!(!scene.is_ancestor_of(&a, &a));
    }

    #[test]
    fn test_move_entity_rejects_cycles() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", Some(a));

        let before = scene.clone();
        assert_eq!(
            scene.move_entity(&a, Some(b), 0),
            Err(SceneError::WouldCreateCycle { entity: a, parent: b })
        );
        assert_eq!(
            scene.move_entity(&a, Some(a), 0),
            Err(SceneError::WouldCreateCycle { entity: a, parent: a })
        );
        assert_eq!(scene, before);
    }

    #[test]
    fn test_move_entity_renumbers_both_groups() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let q = add(&mut scene, "Q", None);
        add(&mut scene, "A", Some(p));
        let b = add(&mut scene, "B", Some(p));
        add(&mut scene, "C", Some(p));

        scene.move_entity(&b, Some(q), 0).unwrap();
        assert_eq!(names(&scene, Some(p)), ["A", "C"]);
        assert_eq!(names(&scene, Some(q)), ["B"]);
        scene.check_invariants().unwrap();
    }

    #[test]
    fn test_set_parent_does_not_renumber() {
        let mut scene = SceneData::new();
        let p = add(&mut scene, "P", None);
        let a = add(&mut scene, "A", None);
        add(&mut scene, "X", Some(p));

        // A keeps order 1 and lands after X (order 0)
        scene.set_parent(&a, Some(p)).unwrap();
        assert_eq!(names(&scene, Some(p)), ["X", "A"]);
        assert_eq!(scene.get(&p).unwrap().order, 0);
        assert_eq!(scene.get(&a).unwrap().order, 1);
        assert_eq!(scene.roots(), [p]);
    }

    #[test]
    fn test_set_order_resorts_group() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        add(&mut scene, "B", None);
        add(&mut scene, "C", None);

        scene.set_order(&a, 5).unwrap();
        assert_eq!(names(&scene, None), ["B", "C", "A"]);
        scene.renumber(None);
        assert_eq!(scene.get(&a).unwrap().order, 2);
        scene.check_invariants().unwrap();
    }

    #[test]
    fn test_last_sibling_and_index() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", None);

        assert_eq!(scene.sibling_index(&b), Some(1));
        assert!(scene.is_last_sibling(&b));
        assert!(!scene.is_last_sibling(&a));
    }

    #[test]
    fn test_collect_with_descendants_skips_covered() {
        let mut scene = SceneData::new();
        let a = add(&mut scene, "A", None);
        let b = add(&mut scene, "B", Some(a));
        let c = add(&mut scene, "C", Some(b));
        let d = add(&mut scene, "D", None);

        let collected = scene.collect_with_descendants(&[d, b, a]);
        assert_eq!(collected, vec![a, b, c, d]);
    }
}
