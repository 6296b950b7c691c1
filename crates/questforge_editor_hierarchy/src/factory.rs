// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entity construction and template capabilities.
//!
//! The hierarchy core treats components as opaque. Everything that depends
//! on what a component *is* (which kinds need a container ancestor, how a
//! component is cloned, which template fields are overridden) is asked of an
//! [`EntityFactory`].

use crate::entity::{Component, EntityData, EntityKind, TemplateId, TemplateLink};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Component/template system as seen by the hierarchy core
pub trait EntityFactory: Send + Sync {
    /// Build a new root-level record of `kind` with a fresh ID
    fn build(&self, kind: &EntityKind, name: &str) -> EntityData;

    /// Kind of container that must sit above entities of `kind`, if any
    fn container_kind(&self, kind: &EntityKind) -> Option<EntityKind>;

    /// Check if `entity` can directly parent a new entity of `kind`
    fn is_valid_container_for(&self, entity: &EntityData, kind: &EntityKind) -> bool;

    /// Clone one component instance
    fn clone_component(&self, component: &Component) -> Component;

    /// Property paths overridden locally on a template-linked entity
    fn overridden_fields(&self, entity: &EntityData) -> Vec<String>;

    /// Fresh components for a template instance with `link`'s overrides applied.
    ///
    /// Returns `None` if the template is unknown.
    fn instantiate_template(&self, link: &TemplateLink) -> Option<Vec<Component>>;
}

/// A reusable entity template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Template identifier
    pub id: TemplateId,
    /// Display name
    pub name: String,
    /// Default component values
    pub components: Vec<Component>,
}

impl Template {
    /// Create a new template
    pub fn new(id: impl Into<TemplateId>, name: impl Into<String>, components: Vec<Component>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            components,
        }
    }
}

/// Built-in factory for the standard 2D entity kinds
#[derive(Debug, Clone, Default)]
pub struct StandardEntityFactory {
    templates: IndexMap<TemplateId, Template>,
}

impl StandardEntityFactory {
    /// Create a factory with no templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a template
    pub fn register_template(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Look up a template
    pub fn template(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// Build an entity linked to a registered template
    pub fn build_from_template(&self, id: &str) -> Option<EntityData> {
        let template = self.templates.get(id)?;
        let mut entity = EntityData::new(template.name.clone());
        entity.components = template.components.clone();
        entity.template = Some(TemplateLink::new(template.id.clone()));
        Some(entity)
    }

    fn default_components(kind: &EntityKind) -> Vec<Component> {
        let rect = || {
            Component::new("RectTransform")
                .with_field("anchor", json!([0.5, 0.5]))
                .with_field("size", json!([100.0, 30.0]))
        };
        match kind {
            EntityKind::Empty => Vec::new(),
            EntityKind::Sprite => vec![Component::new("SpriteRenderer")
                .with_field("texture", json!(null))
                .with_field("tint", json!("#ffffff"))],
            EntityKind::Light => vec![Component::new("Light2D")
                .with_field("radius", json!(64.0))
                .with_field("intensity", json!(1.0))],
            EntityKind::Tilemap => vec![Component::new("Tilemap").with_field("tile_size", json!(16))],
            EntityKind::Canvas => vec![Component::new("Canvas")
                .with_field("reference_width", json!(640))
                .with_field("reference_height", json!(360))],
            EntityKind::UiImage => vec![rect(), Component::new("UiImage").with_field("texture", json!(null))],
            EntityKind::UiText => vec![rect(), Component::new("UiText").with_field("text", json!("New Text"))],
            EntityKind::UiButton => vec![rect(), Component::new("UiButton").with_field("interactable", json!(true))],
        }
    }
}

impl EntityFactory for StandardEntityFactory {
    fn build(&self, kind: &EntityKind, name: &str) -> EntityData {
        let mut entity = EntityData::new(name).with_kind(kind.clone());
        entity.components = Self::default_components(kind);
        entity
    }

    fn container_kind(&self, kind: &EntityKind) -> Option<EntityKind> {
        match kind {
            EntityKind::UiImage | EntityKind::UiText | EntityKind::UiButton => Some(EntityKind::Canvas),
            _ => None,
        }
    }

    fn is_valid_container_for(&self, entity: &EntityData, kind: &EntityKind) -> bool {
        match self.container_kind(kind) {
            // UI elements live under a canvas or under another UI element
            Some(_) => entity.has_component("Canvas") || entity.has_component("RectTransform"),
            None => true,
        }
    }

    fn clone_component(&self, component: &Component) -> Component {
        component.clone()
    }

    fn overridden_fields(&self, entity: &EntityData) -> Vec<String> {
        entity
            .template
            .as_ref()
            .map(|link| link.overrides.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn instantiate_template(&self, link: &TemplateLink) -> Option<Vec<Component>> {
        let template = self.templates.get(&link.template)?;
        let mut components = template.components.clone();
        for (path, value) in &link.overrides {
            let Some((type_name, field)) = path.split_once('.') else {
                tracing::warn!("Ignoring malformed override path '{path}'");
                continue;
            };
            if let Some(component) = components.iter_mut().find(|c| c.type_name == type_name) {
                component.fields.insert(field.to_string(), value.clone());
            }
        }
        Some(components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chest_factory() -> StandardEntityFactory {
        let mut factory = StandardEntityFactory::new();
        factory.register_template(Template::new(
            "chest",
            "Chest",
            vec![Component::new("Loot")
                .with_field("gold", json!(10))
                .with_field("locked", json!(false))],
        ));
        factory
    }

    #[test]
    fn test_ui_kinds_need_canvas() {
        let factory = StandardEntityFactory::new();
        assert_eq!(factory.container_kind(&EntityKind::UiText), Some(EntityKind::Canvas));
        assert_eq!(factory.container_kind(&EntityKind::Sprite), None);

        let canvas = factory.build(&EntityKind::Canvas, "Canvas");
        let sprite = factory.build(&EntityKind::Sprite, "Sprite");
        assert!(factory.is_valid_container_for(&canvas, &EntityKind::UiButton));
        assert!(!factory.is_valid_container_for(&sprite, &EntityKind::UiButton));
        assert!(factory.is_valid_container_for(&sprite, &EntityKind::Light));
    }

    #[test]
    fn test_instantiate_applies_overrides() {
        let factory = chest_factory();
        let mut link = TemplateLink::new("chest");
        link.set_override("Loot.gold", json!(99));

        let components = factory.instantiate_template(&link).unwrap();
        assert_eq!(components[0].fields["gold"], json!(99));
        assert_eq!(components[0].fields["locked"], json!(false));
    }

    #[test]
    fn test_unknown_template() {
        let factory = StandardEntityFactory::new();
        assert!(factory.instantiate_template(&TemplateLink::new("missing")).is_none());
        assert!(factory.build_from_template("missing").is_none());
    }
}
