// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity records stored in the scene arena.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for entities in the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an entity was created as.
///
/// The hierarchy core never branches on this directly; placement rules are
/// asked of the [`EntityFactory`](crate::factory::EntityFactory).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityKind {
    /// Plain entity with no components
    #[default]
    Empty,
    /// World-space sprite
    Sprite,
    /// 2D point/area light
    Light,
    /// Tilemap layer
    Tilemap,
    /// Root of a UI tree
    Canvas,
    /// UI image element
    UiImage,
    /// UI text element
    UiText,
    /// UI button element
    UiButton,
}

impl EntityKind {
    /// Default display name for newly created entities of this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Empty => "Entity",
            EntityKind::Sprite => "Sprite",
            EntityKind::Light => "Light",
            EntityKind::Tilemap => "Tilemap",
            EntityKind::Canvas => "Canvas",
            EntityKind::UiImage => "Image",
            EntityKind::UiText => "Text",
            EntityKind::UiButton => "Button",
        }
    }
}

/// An opaque component instance attached to an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Component type name (e.g. `"SpriteRenderer"`)
    pub type_name: String,
    /// Field values keyed by field name
    pub fields: IndexMap<String, serde_json::Value>,
}

impl Component {
    /// Create a component with no fields
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field assignment
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Identifier of a shared entity template
pub type TemplateId = String;

/// Link from an entity to the template it was instantiated from.
///
/// `overrides` holds only the fields whose value diverges from the template,
/// keyed by `"Component.field"` property paths.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateLink {
    /// Template this entity derives from
    pub template: TemplateId,
    /// Locally overridden property values
    pub overrides: IndexMap<String, serde_json::Value>,
}

impl TemplateLink {
    /// Link to a template with no overrides
    pub fn new(template: impl Into<TemplateId>) -> Self {
        Self {
            template: template.into(),
            overrides: IndexMap::new(),
        }
    }

    /// Check if a property is overridden
    pub fn is_overridden(&self, property_path: &str) -> bool {
        self.overrides.contains_key(property_path)
    }

    /// Add or update an override
    pub fn set_override(&mut self, property_path: impl Into<String>, value: serde_json::Value) {
        self.overrides.insert(property_path.into(), value);
    }
}

/// Entity data stored in the scene arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    /// Stable identity
    pub id: EntityId,
    /// Entity name
    pub name: String,
    /// What this entity was created as
    pub kind: EntityKind,
    /// Position (x, y, z); z is the draw layer
    pub position: [f32; 3],
    /// Attached components, in inspector order
    pub components: Vec<Component>,
    /// Template this entity was instantiated from, if any
    pub template: Option<TemplateLink>,
    /// False for template-structural children that must stay in place
    pub editable: bool,
    /// Parent entity (if any). Never an ownership edge.
    pub parent: Option<EntityId>,
    /// Index within the parent's (or the root) sibling list
    pub order: usize,
    /// Child entities, in sibling order
    pub children: Vec<EntityId>,
}

impl EntityData {
    /// Create a new root entity with the given name and a fresh ID
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(EntityId::new(), name)
    }

    /// Create a new root entity with an explicit ID
    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: EntityKind::Empty,
            position: [0.0, 0.0, 0.0],
            components: Vec::new(),
            template: None,
            editable: true,
            parent: None,
            order: 0,
            children: Vec::new(),
        }
    }

    /// Builder-style kind assignment
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }

    /// Builder-style parent and sibling index assignment
    pub fn placed(mut self, parent: Option<EntityId>, order: usize) -> Self {
        self.parent = parent;
        self.order = order;
        self
    }

    /// Check if this entity has a component of the given type
    pub fn has_component(&self, type_name: &str) -> bool {
        self.components.iter().any(|c| c.type_name == type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ids_are_unique() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_entity_is_editable_root() {
        let entity = EntityData::new("Door");
        assert_eq!(entity.name, "Door");
        assert!(entity.editable);
        assert!(entity.parent.is_none());
        assert!(entity.children.is_empty());
    }

    #[test]
    fn test_template_overrides() {
        let mut link = TemplateLink::new("chest");
        assert!(!link.is_overridden("Loot.gold"));
        link.set_override("Loot.gold", serde_json::json!(50));
        assert!(link.is_overridden("Loot.gold"));
    }
}
