// engine_core/src/ecs/entity.rs
use crate::assets::asset_manager::AssetIndex;
use crate::ecs::component::{Component, ComponentId};
use crate::ecs::scene::Scene;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, FromInto};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of an entity, written into saved references.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        EntityId(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(EntityId)
    }
}

/// Placement of an entity. Components read and write it through their ctx.
#[serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Transform {
    #[serde_as(as = "FromInto<[f32; 2]>")]
    pub position: Vec2,
    /// Radians.
    pub rotation: f32,
    #[serde_as(as = "FromInto<[f32; 2]>")]
    pub scale: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

/// A named container owning an ordered list of components.
///
/// The list holds ids into the scene's component table, the scene owns the
/// components themselves.
#[derive(Debug, Clone)]
pub struct GameObject {
    pub id: EntityId,
    pub name: String,
    pub transform: Transform,
    pub(crate) components: Vec<ComponentId>,
    pub(crate) destroyed: bool,
}

impl GameObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(EntityId::new(), name)
    }

    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            transform: Transform::default(),
            components: Vec::new(),
            destroyed: false,
        }
    }

    /// Component ids in attachment order.
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// True once `Scene::destroy_entity` was called and before the sweep.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

pub struct EntityBuilder<'a> {
    pub id: EntityId,
    pub scene: &'a mut Scene,
    pub assets: &'a dyn AssetIndex,
}

impl<'a> EntityBuilder<'a> {
    /// Attach a component. Its create hook runs immediately.
    pub fn with<T>(self, comp: T) -> Self
    where
        T: Component,
    {
        self.scene.add_component(self.id, Box::new(comp), self.assets);
        self
    }

    /// Place the entity.
    pub fn at(self, position: Vec2) -> Self {
        if let Some(entity) = self.scene.entity_mut(self.id) {
            entity.transform.position = position;
        }
        self
    }

    /// Finish the builder and get the `EntityId` back.
    pub fn finish(self) -> EntityId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_parses_from_its_display() {
        let id = EntityId::new();
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("tiles/grass.png".parse::<EntityId>().is_err());
    }

    #[test]
    fn test_transform_serializes_vectors_as_pairs() {
        let transform = Transform {
            position: Vec2::new(1.0, 2.0),
            ..Default::default()
        };
        let value = serde_json::to_value(transform).unwrap();
        assert_eq!(value["position"], serde_json::json!([1.0, 2.0]));
        assert_eq!(value["scale"], serde_json::json!([1.0, 1.0]));

        let partial: Transform = serde_json::from_str(r#"{"position":[3,4]}"#).unwrap();
        assert_eq!(partial.position, Vec2::new(3.0, 4.0));
        assert_eq!(partial.scale, Vec2::ONE);
    }
}
