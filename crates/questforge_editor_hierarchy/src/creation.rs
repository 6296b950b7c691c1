// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity creation and duplication.
//!
//! Creation never touches the scene directly: each operation builds the new
//! records up front and records them as one [`AddEntitiesCommand`], so a
//! single undo removes everything it created.

use crate::commands::{AddEntitiesCommand, BatchCommand, EditorCommand};
use crate::entity::{EntityData, EntityId, EntityKind, TemplateLink};
use crate::factory::EntityFactory;
use crate::scene::SceneData;
use crate::settings::HierarchySettings;
use crate::state::EditorState;

/// Creates, and duplicates, entities in the open scene
pub struct EntityCreationService {
    factory: Option<Box<dyn EntityFactory>>,
    settings: HierarchySettings,
}

impl EntityCreationService {
    /// Create a service backed by `factory`
    pub fn new(factory: Box<dyn EntityFactory>, settings: HierarchySettings) -> Self {
        Self {
            factory: Some(factory),
            settings,
        }
    }

    /// Create a service with no factory wired; every operation is a no-op
    pub fn unwired(settings: HierarchySettings) -> Self {
        Self {
            factory: None,
            settings,
        }
    }

    /// Wire (or replace) the factory
    pub fn set_factory(&mut self, factory: Box<dyn EntityFactory>) {
        self.factory = Some(factory);
    }

    /// The wired factory, if any
    pub fn factory(&self) -> Option<&dyn EntityFactory> {
        self.factory.as_deref()
    }

    /// Settings used for naming and placement
    pub fn settings(&self) -> &HierarchySettings {
        &self.settings
    }

    fn wired<'a>(&'a self, state: &'a EditorState, operation: &str) -> Option<(&'a dyn EntityFactory, &'a SceneData)> {
        let Some(factory) = self.factory.as_deref() else {
            tracing::debug!("{operation}: no entity factory wired");
            return None;
        };
        let Some(scene) = state.scene() else {
            tracing::debug!("{operation}: no scene open");
            return None;
        };
        Some((factory, scene))
    }

    /// Parent for new entities: the nearest editable entity at or above the
    /// primary selection, or the root list
    fn creation_parent(state: &EditorState, scene: &SceneData) -> Option<EntityId> {
        let mut current = state.primary_selected();
        while let Some(id) = current {
            if scene.get(&id).is_some_and(|e| e.editable) {
                return Some(id);
            }
            current = scene.parent_of(&id);
        }
        None
    }

    /// Create an empty entity.
    ///
    /// It becomes the last child of the primary selected entity, or the last
    /// root when nothing is selected, and is then selected. A non-editable
    /// selection hands the new entity to its nearest editable ancestor.
    pub fn create_empty(&self, state: &mut EditorState) -> Option<EntityId> {
        let (factory, scene) = self.wired(state, "Create entity")?;
        let parent = Self::creation_parent(state, scene);
        let name = format!("Entity_{}", scene.entity_count() + 1);
        let record = factory
            .build(&EntityKind::Empty, &name)
            .placed(parent, scene.group(parent).len());
        let id = record.id;

        let command = AddEntitiesCommand::new(vec![record]).with_description(format!("Create {name}"));
        if !state.execute(Box::new(command)) {
            return None;
        }
        state.selection.set(id);
        tracing::info!("Created {name}");
        Some(id)
    }

    /// Create an entity of `kind`, adding a container above it if needed.
    ///
    /// For kinds that need a container the selected entity is reused if it
    /// qualifies, then its direct children (or the roots) are searched, and
    /// only then is a new container created. The container and the entity
    /// are recorded as one undo step. The new entity is selected.
    pub fn create_typed(&self, state: &mut EditorState, kind: EntityKind) -> Option<EntityId> {
        let (factory, scene) = self.wired(state, "Create typed entity")?;
        let selected = Self::creation_parent(state, scene);
        let mut records = Vec::with_capacity(2);

        let parent = match factory.container_kind(&kind) {
            None => selected,
            Some(container_kind) => {
                let selected_container = selected
                    .and_then(|id| scene.get(&id))
                    .filter(|e| factory.is_valid_container_for(e, &kind))
                    .map(|e| e.id);
                let nearby_container = || {
                    scene
                        .group(selected)
                        .iter()
                        .filter_map(|id| scene.get(id))
                        .find(|e| factory.is_valid_container_for(e, &kind))
                        .map(|e| e.id)
                };
                match selected_container.or_else(nearby_container) {
                    Some(container) => Some(container),
                    None => {
                        let container = factory
                            .build(&container_kind, container_kind.display_name())
                            .placed(selected, scene.group(selected).len());
                        let container_id = container.id;
                        records.push(container);
                        Some(container_id)
                    }
                }
            }
        };

        let name = kind.display_name();
        let record = factory
            .build(&kind, name)
            .placed(parent, scene.group(parent).len());
        let id = record.id;
        let description = match records.first() {
            Some(container) => format!("Create {name} in new {}", container.name),
            None => format!("Create {name}"),
        };
        records.push(record);

        if !state.execute(Box::new(AddEntitiesCommand::new(records).with_description(description))) {
            return None;
        }
        state.selection.set(id);
        tracing::info!("Created {name}");
        Some(id)
    }

    /// Duplicate an entity and its whole subtree as one undo step.
    ///
    /// The copy is inserted right after the original and selected.
    pub fn duplicate(&self, state: &mut EditorState, original: EntityId) -> Option<EntityId> {
        let (factory, scene) = self.wired(state, "Duplicate")?;
        let Some(source) = scene.get(&original) else {
            tracing::debug!("Duplicate: {original} not found");
            return None;
        };
        let description = format!("Duplicate {}", source.name);
        let records = self.clone_subtree(factory, scene, original);
        let root = records.first()?.id;
        let count = records.len();

        let command = AddEntitiesCommand::new(records).with_description(description);
        if !state.execute(Box::new(command)) {
            return None;
        }
        state.selection.set(root);
        tracing::info!("Duplicated {original} ({count} entities)");
        Some(root)
    }

    /// Duplicate every selected top-level entity as one undo step.
    ///
    /// Returns the root copies, which become the new selection.
    pub fn duplicate_selection(&self, state: &mut EditorState) -> Vec<EntityId> {
        let Some((factory, scene)) = self.wired(state, "Duplicate selection") else {
            return Vec::new();
        };
        let originals = scene.top_level(&state.selection.entities);
        if originals.is_empty() {
            return Vec::new();
        }

        // Later siblings first, so earlier insertion indices stay valid
        let mut batch = BatchCommand::new(format!("Duplicate {} Entities", originals.len()));
        let mut roots = Vec::with_capacity(originals.len());
        for original in originals.iter().rev() {
            let records = self.clone_subtree(factory, scene, *original);
            if let Some(root) = records.first() {
                roots.push(root.id);
                batch.push(Box::new(AddEntitiesCommand::new(records)));
            }
        }
        roots.reverse();

        let command: Box<dyn EditorCommand> = Box::new(batch);
        if !state.execute(command) {
            return Vec::new();
        }
        state.selection.clear();
        for root in &roots {
            state.selection.add(*root);
        }
        tracing::info!("Duplicated {} entities", roots.len());
        roots
    }

    /// Build records for a copy of `original`'s subtree, parents first
    fn clone_subtree(&self, factory: &dyn EntityFactory, scene: &SceneData, original: EntityId) -> Vec<EntityData> {
        let mut out = Vec::new();
        if let Some(source) = scene.get(&original) {
            self.clone_into(factory, scene, source, source.parent, source.order + 1, true, &mut out);
        }
        out
    }

    fn clone_into(
        &self,
        factory: &dyn EntityFactory,
        scene: &SceneData,
        source: &EntityData,
        parent: Option<EntityId>,
        order: usize,
        is_root: bool,
        out: &mut Vec<EntityData>,
    ) {
        let name = if is_root {
            format!("{}{}", source.name, self.settings.copy_suffix)
        } else {
            source.name.clone()
        };
        let mut copy = EntityData::new(name).with_kind(source.kind.clone());
        copy.editable = source.editable;
        copy.position = source.position;
        if is_root {
            for (axis, offset) in copy.position.iter_mut().zip(self.settings.duplicate_offset) {
                *axis += offset;
            }
        }

        match &source.template {
            Some(link) => {
                let mut new_link = TemplateLink::new(link.template.clone());
                for path in factory.overridden_fields(source) {
                    if let Some(value) = link.overrides.get(&path) {
                        new_link.set_override(path, value.clone());
                    }
                }
                copy.components = factory
                    .instantiate_template(&new_link)
                    .unwrap_or_else(|| source.components.iter().map(|c| factory.clone_component(c)).collect());
                copy.template = Some(new_link);
            }
            None => {
                copy.components = source.components.iter().map(|c| factory.clone_component(c)).collect();
            }
        }

        let copy = copy.placed(parent, order);
        let copy_id = copy.id;
        out.push(copy);
        for (index, child) in source.children.iter().enumerate() {
            if let Some(child) = scene.get(child) {
                self.clone_into(factory, scene, child, Some(copy_id), index, false, out);
            }
        }
    }
}

impl std::fmt::Debug for EntityCreationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCreationService")
            .field("wired", &self.factory.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}
