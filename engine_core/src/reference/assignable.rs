// engine_core/src/reference/assignable.rs
use crate::assets::asset_manager::{AssetHandle, AssetIndex};
use crate::ecs::component::ComponentId;
use crate::ecs::entity::{EntityId, GameObject};
use crate::ecs::scene::Scene;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind tag of a structured reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    Component,
    Entity,
    Asset,
}

/// Object form of a reference, e.g. `{"kind": "Asset", "path": "tiles/grass.png"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RefKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Persisted form of a reference to a component, an entity or an asset.
///
/// Components are written as their bare numeric id, entities as their guid
/// string and assets as a structured object carrying the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssignableRef {
    Number(u64),
    Text(String),
    Structured(StructuredRef),
}

/// A reference resolved against the live scene.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignable {
    Component(ComponentId),
    Entity(EntityId),
    Asset(AssetHandle),
}

/// Anything that can be the target of an `AssignableRef`.
pub trait Referenceable {
    /// Canonical persisted form of a reference to `self`.
    fn to_ref(&self) -> AssignableRef;
}

impl Referenceable for ComponentId {
    fn to_ref(&self) -> AssignableRef {
        AssignableRef::Number(self.0)
    }
}

impl Referenceable for EntityId {
    fn to_ref(&self) -> AssignableRef {
        AssignableRef::Text(self.to_string())
    }
}

impl Referenceable for GameObject {
    fn to_ref(&self) -> AssignableRef {
        self.id.to_ref()
    }
}

impl Referenceable for AssetHandle {
    fn to_ref(&self) -> AssignableRef {
        AssignableRef::asset(self.path.to_string_lossy())
    }
}

impl Referenceable for Assignable {
    fn to_ref(&self) -> AssignableRef {
        match self {
            Assignable::Component(id) => id.to_ref(),
            Assignable::Entity(id) => id.to_ref(),
            Assignable::Asset(handle) => handle.to_ref(),
        }
    }
}

impl AssignableRef {
    pub fn component(id: ComponentId) -> Self {
        id.to_ref()
    }

    pub fn entity(id: EntityId) -> Self {
        id.to_ref()
    }

    pub fn asset(path: impl Into<String>) -> Self {
        AssignableRef::Structured(StructuredRef {
            kind: Some(RefKind::Asset),
            path: Some(path.into()),
            ..Default::default()
        })
    }

    /// Resolves the reference against the live scene and the asset index.
    ///
    /// Candidates are tried in a fixed order: a number is a component id, a
    /// guid string is an entity, any other string (or a guid that matched no
    /// entity) and any object carrying a `path` is an asset, and finally an
    /// object's `kind` with its `id` or `guid`. Returns `None` when nothing
    /// matches.
    pub fn resolve(&self, scene: &Scene, assets: &dyn AssetIndex) -> Option<Assignable> {
        let found = match self {
            AssignableRef::Number(n) => live_component(scene, ComponentId(*n)),
            AssignableRef::Text(text) => text
                .parse::<EntityId>()
                .ok()
                .and_then(|id| live_entity(scene, id))
                .or_else(|| asset(assets, text)),
            AssignableRef::Structured(s) => s
                .path
                .as_deref()
                .and_then(|path| asset(assets, path))
                .or_else(|| match s.kind {
                    Some(RefKind::Component) => s.id.and_then(|id| live_component(scene, ComponentId(id))),
                    Some(RefKind::Entity) => s.guid.and_then(|guid| live_entity(scene, EntityId(guid))),
                    _ => None,
                }),
        };

        if found.is_none() {
            log::debug!("Reference {self} did not resolve.");
        }
        found
    }
}

fn live_component(scene: &Scene, id: ComponentId) -> Option<Assignable> {
    scene.find_component(id).map(|_| Assignable::Component(id))
}

fn live_entity(scene: &Scene, id: EntityId) -> Option<Assignable> {
    scene.entity(id).map(|entity| Assignable::Entity(entity.id))
}

fn asset(assets: &dyn AssetIndex, path: &str) -> Option<Assignable> {
    assets.resolve_asset(path).map(Assignable::Asset)
}

impl fmt::Display for AssignableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignableRef::Number(n) => write!(f, "#{n}"),
            AssignableRef::Text(text) => write!(f, "\"{text}\""),
            AssignableRef::Structured(s) => {
                write!(f, "{{")?;
                if let Some(kind) = s.kind {
                    write!(f, "{kind:?}")?;
                }
                if let Some(id) = s.id {
                    write!(f, " id={id}")?;
                }
                if let Some(guid) = s.guid {
                    write!(f, " guid={guid}")?;
                }
                if let Some(path) = &s.path {
                    write!(f, " path={path}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Assignable {
    /// World position of the target: the entity's own, or the owner's for a
    /// component. Assets have no position.
    pub fn position(&self, scene: &Scene) -> Option<Vec2> {
        let entity = match self {
            Assignable::Entity(id) => *id,
            Assignable::Component(id) => scene.owner_of(*id)?,
            Assignable::Asset(_) => return None,
        };
        scene.entity(entity).map(|e| e.transform.position)
    }

    pub fn as_asset(&self) -> Option<&AssetHandle> {
        match self {
            Assignable::Asset(handle) => Some(handle),
            _ => None,
        }
    }
}
