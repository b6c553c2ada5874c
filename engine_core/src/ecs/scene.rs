// engine_core/src/ecs/scene.rs
use crate::assets::asset_manager::AssetIndex;
use crate::ecs::component::{Component, ComponentCtx, ComponentId, DrawCtx};
use crate::ecs::component_registry::ComponentRegistry;
use crate::ecs::entity::{EntityBuilder, EntityId, GameObject};
use crate::error::RegistryError;
use crate::rendering::renderer::Renderer;
use crate::*;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Storage cell of one component.
struct ComponentSlot {
    name: String,
    owner: EntityId,
    /// `None` only while one of the component's own hooks is running.
    component: Option<Box<dyn Component>>,
}

/// Number of hook calls made during a traversal, and how many failed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub invoked: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Create,
    Update(f32),
    Destroy,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Create => write!(f, "create"),
            Hook::Update(_) => write!(f, "update"),
            Hook::Destroy => write!(f, "destroy"),
        }
    }
}

/// The live entity/component graph.
///
/// Entities are kept in insertion order. Components live in a flat table
/// keyed by id; an entity only lists the ids it owns and every component
/// records its owner's id.
pub struct Scene {
    entities: Vec<GameObject>,
    components: HashMap<ComponentId, ComponentSlot>,
    next_component_id: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.entities.len())
            .field("components", &self.components.len())
            .field("next_component_id", &self.next_component_id)
            .finish()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
            components: HashMap::new(),
            next_component_id: 1,
        }
    }

    /// Creates an empty entity and returns its id.
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        let entity = GameObject::new(name);
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    /// Creates an entity and returns a builder to attach components.
    pub fn spawn<'a>(&'a mut self, name: impl Into<String>, assets: &'a dyn AssetIndex) -> EntityBuilder<'a> {
        let id = self.create_entity(name);
        EntityBuilder { id, scene: self, assets }
    }

    /// Attaches `component` to `entity` and runs its create hook once.
    ///
    /// Returns `None` when the entity does not exist or is destroyed.
    pub fn add_component(
        &mut self,
        entity: EntityId,
        component: Box<dyn Component>,
        assets: &dyn AssetIndex,
    ) -> Option<ComponentId> {
        let name = component.type_name().to_string();
        self.add_named_component(entity, name, component, assets)
    }

    /// Same as `add_component` with an explicit instance name.
    pub fn add_named_component(
        &mut self,
        entity: EntityId,
        name: impl Into<String>,
        component: Box<dyn Component>,
        assets: &dyn AssetIndex,
    ) -> Option<ComponentId> {
        let name = name.into();
        if self.entity(entity).is_none() {
            onscreen_warn!("Cannot attach '{name}': entity {entity} does not exist.");
            return None;
        }

        let Some(id) = self.allocate_component_id() else {
            onscreen_error!("Cannot attach '{name}': no component ids left.");
            return None;
        };
        if let Some(owner) = self.entity_mut(entity) {
            owner.components.push(id);
        }

        self.components.insert(
            id,
            ComponentSlot {
                name,
                owner: entity,
                component: Some(component),
            },
        );

        self.run_hook(id, assets, Hook::Create);
        Some(id)
    }

    /// Instantiates `type_name` from the registry and attaches it.
    pub fn add_component_by_name(
        &mut self,
        entity: EntityId,
        type_name: &str,
        registry: &ComponentRegistry,
        assets: &dyn AssetIndex,
    ) -> Result<Option<ComponentId>, RegistryError> {
        let component = registry.instantiate(type_name)?;
        Ok(self.add_component(entity, component, assets))
    }

    /// Runs the destroy hook, then detaches the component from `entity`.
    pub fn remove_component(
        &mut self,
        entity: EntityId,
        id: ComponentId,
        assets: &dyn AssetIndex,
    ) -> Option<Box<dyn Component>> {
        match self.components.get(&id) {
            Some(slot) if slot.owner == entity => {}
            _ => return None,
        }

        self.run_hook(id, assets, Hook::Destroy);
        self.detach(id)
    }

    fn detach(&mut self, id: ComponentId) -> Option<Box<dyn Component>> {
        let slot = self.components.remove(&id)?;
        if let Some(owner) = self.entities.iter_mut().find(|e| e.id == slot.owner) {
            owner.components.retain(|c| *c != id);
        }
        slot.component
    }

    /// Marks an entity for removal. It is skipped from now on and removed by
    /// the next sweep.
    pub fn destroy_entity(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.iter_mut().find(|e| e.id == id) {
            entity.destroyed = true;
        }
    }

    /// Removes destroyed entities, running their components' destroy hooks.
    /// Returns the number of entities removed.
    pub fn sweep_destroyed(&mut self, assets: &dyn AssetIndex) -> usize {
        let doomed: Vec<(EntityId, Vec<ComponentId>)> = self
            .entities
            .iter()
            .filter(|e| e.destroyed)
            .map(|e| (e.id, e.components.clone()))
            .collect();

        for (_, components) in &doomed {
            for id in components {
                self.run_hook(*id, assets, Hook::Destroy);
                self.components.remove(id);
            }
        }

        self.entities.retain(|e| !e.destroyed);
        doomed.len()
    }

    /// Runs every component's update hook in list order, then sweeps
    /// destroyed entities.
    pub fn update(&mut self, assets: &dyn AssetIndex, dt: f32) -> TickReport {
        let report = self.run_all(assets, Hook::Update(dt));
        self.sweep_destroyed(assets);
        report
    }

    /// Re-runs every create hook, for example after the whole scene was
    /// loaded or scripts were reloaded.
    pub fn recreate_all(&mut self, assets: &dyn AssetIndex) -> TickReport {
        self.run_all(assets, Hook::Create)
    }

    /// Runs every component's draw hook in list order.
    pub fn draw(&self, assets: &dyn AssetIndex, renderer: &mut dyn Renderer) -> TickReport {
        let mut report = TickReport::default();

        for entity in self.entities.iter().filter(|e| !e.destroyed) {
            for id in &entity.components {
                let Some(slot) = self.components.get(id) else { continue };
                let Some(component) = slot.component.as_ref() else { continue };

                let ctx = DrawCtx::new(self, assets, entity.id, *id);
                report.invoked += 1;
                let result = guarded(|| component.draw(&ctx, &mut *renderer));

                if let Err(reason) = result {
                    report.failed += 1;
                    onscreen_error!(
                        "draw hook of component '{}' on entity '{}' failed: {reason}",
                        slot.name,
                        entity.name
                    );
                }
            }
        }
        report
    }

    fn run_all(&mut self, assets: &dyn AssetIndex, hook: Hook) -> TickReport {
        let mut report = TickReport::default();

        let order: Vec<(EntityId, Vec<ComponentId>)> = self
            .entities
            .iter()
            .filter(|e| !e.destroyed)
            .map(|e| (e.id, e.components.clone()))
            .collect();

        for (entity, components) in order {
            for id in components {
                // Entities destroyed earlier in this pass are skipped.
                if self.entity(entity).is_none() {
                    break;
                }
                if let Some(ok) = self.run_hook(id, assets, hook) {
                    report.invoked += 1;
                    if !ok {
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }

    /// Calls one hook on one component with failure isolation. Returns
    /// `None` if the component is gone, otherwise whether the hook succeeded.
    fn run_hook(&mut self, id: ComponentId, assets: &dyn AssetIndex, hook: Hook) -> Option<bool> {
        let (owner, mut component) = {
            let slot = self.components.get_mut(&id)?;
            (slot.owner, slot.component.take()?)
        };

        let result = {
            let mut ctx = ComponentCtx::new(self, assets, owner, id);
            guarded(|| match hook {
                Hook::Create => component.create(&mut ctx),
                Hook::Update(dt) => component.update(&mut ctx, dt),
                Hook::Destroy => component.destroy(&mut ctx),
            })
        };

        let name = match self.components.get_mut(&id) {
            Some(slot) => {
                slot.component = Some(component);
                slot.name.clone()
            }
            None => component.type_name().to_string(),
        };

        match result {
            Ok(()) => Some(true),
            Err(reason) => {
                let entity_name = self
                    .entities
                    .iter()
                    .find(|e| e.id == owner)
                    .map(|e| e.name.as_str())
                    .unwrap_or("<detached>");
                onscreen_error!(
                    "{hook} hook of component '{name}' on entity '{entity_name}' failed: {reason}"
                );
                Some(false)
            }
        }
    }

    /// Drops every entity and component.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.components.clear();
    }

    // Loading support. The serializer inserts raw state first and runs the
    // create pass once the whole graph exists.

    pub(crate) fn push_entity(&mut self, mut entity: GameObject) {
        entity.components.clear();
        entity.destroyed = false;
        self.entities.push(entity);
    }

    pub(crate) fn attach_loaded(
        &mut self,
        owner: EntityId,
        id: ComponentId,
        name: String,
        component: Box<dyn Component>,
    ) {
        if let Some(entity) = self.entities.iter_mut().find(|e| e.id == owner) {
            entity.components.push(id);
            self.components.insert(
                id,
                ComponentSlot {
                    name,
                    owner,
                    component: Some(component),
                },
            );
            self.reserve_component_id(id);
        }
    }

    /// Hands out the next free id. `u64::MAX` is never issued, so `None`
    /// means the scene ran out of ids.
    pub(crate) fn allocate_component_id(&mut self) -> Option<ComponentId> {
        if self.next_component_id == u64::MAX {
            return None;
        }
        let id = ComponentId(self.next_component_id);
        self.next_component_id += 1;
        Some(id)
    }

    /// Makes sure `id` is never handed out by `allocate_component_id`.
    pub(crate) fn reserve_component_id(&mut self, id: ComponentId) {
        self.next_component_id = self.next_component_id.max(id.0.saturating_add(1));
    }

    // Queries

    /// Every entity in insertion order, including ones awaiting the sweep.
    pub fn entities(&self) -> &[GameObject] {
        &self.entities
    }

    /// Live (not destroyed) entities.
    pub fn live_entities(&self) -> impl Iterator<Item = &GameObject> {
        self.entities.iter().filter(|e| !e.destroyed)
    }

    /// Looks up a live entity.
    pub fn entity(&self, id: EntityId) -> Option<&GameObject> {
        self.entities.iter().find(|e| e.id == id && !e.destroyed)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut GameObject> {
        self.entities.iter_mut().find(|e| e.id == id && !e.destroyed)
    }

    /// First live entity called `name`.
    pub fn find_entity(&self, name: &str) -> Option<&GameObject> {
        self.live_entities().find(|e| e.name == name)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Entity currently owning `id`.
    pub fn owner_of(&self, id: ComponentId) -> Option<EntityId> {
        self.components.get(&id).map(|slot| slot.owner)
    }

    /// Searches the live entities' component lists for `id`.
    pub fn find_component(&self, id: ComponentId) -> Option<(&GameObject, &dyn Component)> {
        let owner = self.live_entities().find(|e| e.components.contains(&id))?;
        let component = self.component_dyn(id)?;
        Some((owner, component))
    }

    pub fn component_dyn(&self, id: ComponentId) -> Option<&dyn Component> {
        self.components.get(&id)?.component.as_deref()
    }

    /// Instance name of a component.
    pub fn component_name(&self, id: ComponentId) -> Option<&str> {
        self.components.get(&id).map(|slot| slot.name.as_str())
    }

    pub fn rename_component(&mut self, id: ComponentId, name: impl Into<String>) {
        if let Some(slot) = self.components.get_mut(&id) {
            slot.name = name.into();
        }
    }

    /// Typed access to a component.
    pub fn component<T: Component>(&self, id: ComponentId) -> Option<&T> {
        let component: &dyn Any = self.component_dyn(id)?.as_any();
        component.downcast_ref::<T>()
    }

    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        let slot = self.components.get_mut(&id)?;
        slot.component.as_mut()?.as_any_mut().downcast_mut::<T>()
    }

    /// First component of type `T` on `entity`.
    pub fn first_component<T: Component>(&self, entity: EntityId) -> Option<(ComponentId, &T)> {
        self.entity(entity)?
            .components
            .iter()
            .find_map(|id| self.component::<T>(*id).map(|c| (*id, c)))
    }

    /// Components of `entity` in list order.
    pub fn components_of(&self, entity: EntityId) -> Vec<(ComponentId, &dyn Component)> {
        let Some(entity) = self.entity(entity) else {
            return Vec::new();
        };
        entity
            .components
            .iter()
            .filter_map(|id| self.component_dyn(*id).map(|c| (*id, c)))
            .collect()
    }
}

/// Runs `f`, turning both errors and panics into a message.
fn guarded<F>(f: F) -> Result<(), String>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("{e:#}")),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}
