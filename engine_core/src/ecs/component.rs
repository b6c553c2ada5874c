// engine_core/src/ecs/component.rs
use crate::assets::asset_manager::AssetIndex;
use crate::ecs::component_registry::ComponentType;
use crate::ecs::entity::{EntityId, GameObject, Transform};
use crate::ecs::scene::Scene;
use crate::reference::assignable::{Assignable, AssignableRef};
use crate::rendering::renderer::Renderer;
use ecs_component::ecs_component;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Numeric component id. Unique within a scene and never reused, so it can
/// be written into saved references.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type name and `Any` access for boxed components.
pub trait ComponentInfo: Any {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: ComponentType> ComponentInfo for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Behaviour attached to an entity. Every hook defaults to doing nothing.
///
/// Hooks may fail; the scene logs the failure with the entity and component
/// names and moves on to the next component.
pub trait Component: ComponentInfo {
    /// Called once when the component is attached, and again for every
    /// component after a scene finished loading.
    fn create(&mut self, _ctx: &mut ComponentCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per fixed step.
    fn update(&mut self, _ctx: &mut ComponentCtx<'_>, _dt: f32) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once per frame.
    fn draw(&self, _ctx: &DrawCtx<'_>, _renderer: &mut dyn Renderer) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when the component is removed or its entity is swept.
    fn destroy(&mut self, _ctx: &mut ComponentCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What a component sees of the scene while one of its mutable hooks runs.
///
/// The component itself is taken out of the scene for the duration of the
/// hook, so it is not reachable through `scene()`.
pub struct ComponentCtx<'a> {
    scene: &'a mut Scene,
    assets: &'a dyn AssetIndex,
    owner: EntityId,
    id: ComponentId,
}

impl<'a> ComponentCtx<'a> {
    pub(crate) fn new(
        scene: &'a mut Scene,
        assets: &'a dyn AssetIndex,
        owner: EntityId,
        id: ComponentId,
    ) -> Self {
        Self { scene, assets, owner, id }
    }

    /// Entity that owns the component.
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Id of the component whose hook is running.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn scene(&self) -> &Scene {
        self.scene
    }

    pub fn assets(&self) -> &dyn AssetIndex {
        self.assets
    }

    pub fn owner_entity(&self) -> Option<&GameObject> {
        self.scene.entity(self.owner)
    }

    /// Copy of the owner's transform.
    pub fn transform(&self) -> Transform {
        self.owner_entity()
            .map(|entity| entity.transform)
            .unwrap_or_default()
    }

    pub fn transform_mut(&mut self) -> Option<&mut Transform> {
        self.scene.entity_mut(self.owner).map(|entity| &mut entity.transform)
    }

    /// First other component of type `T` on the owner.
    pub fn sibling<T: Component>(&self) -> Option<&T> {
        self.scene
            .first_component::<T>(self.owner)
            .map(|(_, component)| component)
    }

    /// Resolves a persisted reference against the live scene.
    pub fn resolve(&self, reference: &AssignableRef) -> Option<Assignable> {
        reference.resolve(self.scene, self.assets)
    }

    /// Marks an entity for removal at the end of the tick.
    pub fn destroy_entity(&mut self, entity: EntityId) {
        self.scene.destroy_entity(entity);
    }
}

/// Read-only view handed to `draw`.
pub struct DrawCtx<'a> {
    scene: &'a Scene,
    assets: &'a dyn AssetIndex,
    owner: EntityId,
    id: ComponentId,
}

impl<'a> DrawCtx<'a> {
    pub(crate) fn new(
        scene: &'a Scene,
        assets: &'a dyn AssetIndex,
        owner: EntityId,
        id: ComponentId,
    ) -> Self {
        Self { scene, assets, owner, id }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn scene(&self) -> &Scene {
        self.scene
    }

    pub fn assets(&self) -> &dyn AssetIndex {
        self.assets
    }

    pub fn transform(&self) -> Transform {
        self.scene
            .entity(self.owner)
            .map(|entity| entity.transform)
            .unwrap_or_default()
    }

    pub fn resolve(&self, reference: &AssignableRef) -> Option<Assignable> {
        reference.resolve(self.scene, self.assets)
    }
}

/// Moves its owner every step.
#[ecs_component]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Component for Velocity {
    fn update(&mut self, ctx: &mut ComponentCtx<'_>, dt: f32) -> anyhow::Result<()> {
        if let Some(transform) = ctx.transform_mut() {
            transform.position.x += self.x * dt;
            transform.position.y += self.y * dt;
        }
        Ok(())
    }
}

/// Moves its owner towards whatever `target` points at.
#[ecs_component]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Follow {
    /// Entity, or component whose owner, to move towards.
    pub target: Option<AssignableRef>,
    /// Pixels per second.
    pub speed: f32,
}

impl Default for Follow {
    fn default() -> Self {
        Self {
            target: None,
            speed: 64.0,
        }
    }
}

impl Component for Follow {
    fn update(&mut self, ctx: &mut ComponentCtx<'_>, dt: f32) -> anyhow::Result<()> {
        // Dangling targets simply leave the owner where it is.
        let Some(target) = self.target.as_ref().and_then(|r| ctx.resolve(r)) else {
            return Ok(());
        };
        let Some(goal) = target.position(ctx.scene()) else {
            return Ok(());
        };
        let step = self.speed * dt;

        if let Some(transform) = ctx.transform_mut() {
            let delta = goal - transform.position;
            if delta.length() <= step {
                transform.position = goal;
            } else {
                transform.position += delta.normalize() * step;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::asset_manager::AssetManager;
    use glam::Vec2;

    #[test]
    fn test_velocity_moves_owner() {
        let assets = AssetManager::default();
        let mut scene = Scene::new();
        let mover = scene
            .spawn("mover", &assets)
            .with(Velocity { x: 10.0, y: -5.0 })
            .finish();

        scene.update(&assets, 0.5);

        let position = scene.entity(mover).unwrap().transform.position;
        assert_eq!(position, Vec2::new(5.0, -2.5));
    }

    #[test]
    fn test_follow_moves_towards_entity_target() {
        let assets = AssetManager::default();
        let mut scene = Scene::new();
        let target = scene.spawn("target", &assets).at(Vec2::new(100.0, 0.0)).finish();
        let follower = scene
            .spawn("follower", &assets)
            .with(Follow {
                target: Some(AssignableRef::entity(target)),
                speed: 10.0,
            })
            .finish();

        scene.update(&assets, 1.0);
        assert_eq!(scene.entity(follower).unwrap().transform.position, Vec2::new(10.0, 0.0));

        // Snaps onto the goal once it is within one step.
        scene.update(&assets, 100.0);
        assert_eq!(scene.entity(follower).unwrap().transform.position, Vec2::new(100.0, 0.0));
    }

    /// Reads its sibling velocity during update.
    #[ecs_component]
    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct SpeedReader {
        #[serde(skip)]
        pub seen: Option<f32>,
    }

    impl Component for SpeedReader {
        fn update(&mut self, ctx: &mut ComponentCtx<'_>, _dt: f32) -> anyhow::Result<()> {
            self.seen = ctx.sibling::<Velocity>().map(|v| v.x);
            Ok(())
        }
    }

    #[test]
    fn test_sibling_lookup_sees_other_components() {
        let assets = AssetManager::default();
        let mut scene = Scene::new();
        let entity = scene
            .spawn("reader", &assets)
            .with(SpeedReader::default())
            .with(Velocity { x: 3.0, y: 0.0 })
            .finish();

        scene.update(&assets, 0.1);

        let (_, reader) = scene.first_component::<SpeedReader>(entity).unwrap();
        assert_eq!(reader.seen, Some(3.0));
    }

    #[test]
    fn test_follow_with_dangling_target_stays_put() {
        let assets = AssetManager::default();
        let mut scene = Scene::new();
        let follower = scene
            .spawn("follower", &assets)
            .with(Follow {
                target: Some(AssignableRef::Number(999)),
                speed: 10.0,
            })
            .finish();

        let report = scene.update(&assets, 1.0);
        assert_eq!(report.failed, 0);
        assert_eq!(scene.entity(follower).unwrap().transform.position, Vec2::ZERO);
    }
}
