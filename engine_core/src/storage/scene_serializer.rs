// engine_core/src/storage/scene_serializer.rs
use crate::assets::asset_manager::AssetIndex;
use crate::constants::*;
use crate::ecs::component::{Component, ComponentId};
use crate::ecs::component_registry::{ComponentDescriptor, ComponentRegistry};
use crate::ecs::entity::{EntityId, GameObject, Transform};
use crate::ecs::scene::Scene;
use crate::error::SceneError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Top level of a scene file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub version: u32,
    #[serde(default)]
    pub entities: Vec<EntityNode>,
}

/// One entity. Component nodes are kept raw so the discriminator can be
/// checked before anything else is decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    #[serde(rename = "$id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub components: Vec<Value>,
}

/// A decoded component waiting to be attached.
struct PendingComponent {
    owner: EntityId,
    id: Option<ComponentId>,
    name: String,
    component: Box<dyn Component>,
}

/// Writes the live part of `scene` as a document.
///
/// Entities and components carry their identity under `$id`, so references
/// between them stay plain ids. Fails if a component type is not registered.
pub fn to_document(scene: &Scene, registry: &ComponentRegistry) -> Result<Value, SceneError> {
    let mut entities = Vec::new();

    for entity in scene.live_entities() {
        let mut components = Vec::with_capacity(entity.components().len());
        for id in entity.components() {
            let Some(component) = scene.component_dyn(*id) else {
                continue;
            };
            let type_name = component.type_name();
            let descriptor = registry
                .resolve(type_name)
                .map_err(|_| SceneError::UnknownComponentType(type_name.to_string()))?;

            let fields = (descriptor.to_value)(component).map_err(|source| SceneError::ComponentData {
                type_name: type_name.to_string(),
                source,
            })?;

            let mut node = Map::new();
            node.insert(TYPE_KEY.into(), Value::from(type_name));
            node.insert(ID_KEY.into(), Value::from(id.0));
            node.insert(
                NAME_KEY.into(),
                Value::from(scene.component_name(*id).unwrap_or(type_name)),
            );
            if let Value::Object(fields) = fields {
                node.extend(fields);
            }
            components.push(Value::Object(node));
        }

        entities.push(EntityNode {
            id: Some(entity.id),
            name: entity.name.clone(),
            transform: entity.transform,
            components,
        });
    }

    let document = SceneDocument {
        version: SCENE_FORMAT_VERSION,
        entities,
    };
    Ok(serde_json::to_value(document)?)
}

/// Pretty printed form of `to_document`.
pub fn to_string(scene: &Scene, registry: &ComponentRegistry) -> Result<String, SceneError> {
    let document = to_document(scene, registry)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Builds a new scene from a document.
///
/// The whole graph is materialised first; create hooks run afterwards, in
/// list order, so every reference target already exists when they do.
pub fn from_document(
    document: Value,
    registry: &ComponentRegistry,
    assets: &dyn AssetIndex,
) -> Result<Scene, SceneError> {
    let document: SceneDocument = serde_json::from_value(document)?;
    if document.version != SCENE_FORMAT_VERSION {
        return Err(SceneError::UnsupportedVersion {
            found: document.version,
            expected: SCENE_FORMAT_VERSION,
        });
    }

    let mut scene = Scene::new();
    let mut seen_entities = HashSet::new();
    let mut seen_components = HashSet::new();
    let mut pending = Vec::new();

    for node in document.entities {
        let id = node.id.unwrap_or_default();
        if !seen_entities.insert(id) {
            return Err(SceneError::DuplicateIdentity(id.to_string()));
        }

        for (index, raw) in node.components.into_iter().enumerate() {
            let component = decode_component(raw, &node.name, index, registry)?;
            if let Some(cid) = component.id {
                if !seen_components.insert(cid) {
                    return Err(SceneError::DuplicateIdentity(cid.to_string()));
                }
            }
            pending.push(PendingComponent { owner: id, ..component });
        }

        let mut entity = GameObject::with_id(id, node.name);
        entity.transform = node.transform;
        scene.push_entity(entity);
    }

    // Stored ids are kept, missing ones are allocated above all of them.
    for cid in &seen_components {
        scene.reserve_component_id(*cid);
    }
    for component in pending {
        let id = match component.id {
            Some(id) => id,
            None => scene
                .allocate_component_id()
                .ok_or(SceneError::ComponentIdsExhausted)?,
        };
        scene.attach_loaded(component.owner, id, component.name, component.component);
    }

    let report = scene.recreate_all(assets);
    log::info!(
        "Loaded scene with {} entities and {} components ({} create hooks failed).",
        scene.entity_count(),
        scene.component_count(),
        report.failed
    );
    Ok(scene)
}

/// Parses `text` and builds a scene from it.
pub fn from_str(
    text: &str,
    registry: &ComponentRegistry,
    assets: &dyn AssetIndex,
) -> Result<Scene, SceneError> {
    let document: Value = serde_json::from_str(text)?;
    from_document(document, registry, assets)
}

fn decode_component(
    raw: Value,
    entity: &str,
    index: usize,
    registry: &ComponentRegistry,
) -> Result<PendingComponent, SceneError> {
    let malformed = |reason: &str| SceneError::MalformedNode {
        entity: entity.to_string(),
        index,
        reason: reason.to_string(),
    };

    let Value::Object(mut node) = raw else {
        return Err(malformed("expected an object"));
    };

    // The discriminator comes first; nothing else is looked at without it.
    let type_name = match node.remove(TYPE_KEY) {
        Some(Value::String(name)) => name,
        Some(_) => return Err(malformed("`type` must be a string")),
        None => {
            return Err(SceneError::MissingDiscriminator {
                entity: entity.to_string(),
                index,
            });
        }
    };
    let descriptor = registry
        .resolve(&type_name)
        .map_err(|_| SceneError::UnknownComponentType(type_name.clone()))?;

    let id = match node.remove(ID_KEY) {
        None | Some(Value::Null) => None,
        Some(value) => match value.as_u64() {
            Some(u64::MAX) => return Err(malformed("`$id` is out of range")),
            Some(n) => Some(ComponentId(n)),
            None => return Err(malformed("`$id` must be a non-negative integer")),
        },
    };
    let name = match node.remove(NAME_KEY) {
        Some(Value::String(name)) => name,
        _ => type_name.clone(),
    };

    let fields = fill_fields(descriptor, node, entity);
    let component = (descriptor.from_value)(fields).map_err(|source| SceneError::ComponentData {
        type_name: type_name.clone(),
        source,
    })?;

    Ok(PendingComponent {
        owner: EntityId::default(),
        id,
        name,
        component,
    })
}

/// Lays the stored fields over a blank instance, so fields the file does
/// not mention keep their default. Unknown fields are dropped.
fn fill_fields(descriptor: &ComponentDescriptor, stored: Map<String, Value>, entity: &str) -> Value {
    let blank = (descriptor.factory)();
    let mut value = (descriptor.to_value)(blank.as_ref()).unwrap_or(Value::Null);

    for (key, field) in stored {
        match &mut value {
            Value::Object(defaults)
                if descriptor.field(&key).is_some() || defaults.contains_key(&key) =>
            {
                defaults.insert(key, field);
            }
            _ => log::warn!(
                "Ignoring unknown field `{key}` of `{}` on entity `{entity}`.",
                descriptor.type_name
            ),
        }
    }
    value
}
