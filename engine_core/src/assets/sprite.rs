// engine_core/src/assets/sprite.rs
use crate::assets::asset_manager::AssetId;
use crate::ecs::component::{Component, ComponentCtx, DrawCtx};
use crate::reference::assignable::{Assignable, AssignableRef};
use crate::rendering::renderer::{Rect, Renderer};
use ecs_component::ecs_component;
use serde::{Deserialize, Serialize};

/// Draws a whole texture at its owner's transform.
#[ecs_component]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Sprite {
    /// Texture to draw, usually `{"kind": "Asset", "path": ...}`.
    pub texture: Option<AssignableRef>,
    /// Reference to the texture that was resolved by the AssetManager.
    #[serde(skip)]
    pub texture_id: Option<AssetId>,
}

impl Sprite {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            texture: Some(AssignableRef::asset(path)),
            texture_id: None,
        }
    }
}

impl Component for Sprite {
    fn create(&mut self, ctx: &mut ComponentCtx<'_>) -> anyhow::Result<()> {
        self.texture_id = self
            .texture
            .as_ref()
            .and_then(|texture| ctx.resolve(texture))
            .as_ref()
            .and_then(Assignable::as_asset)
            .map(|handle| handle.id);
        Ok(())
    }

    fn draw(&self, ctx: &DrawCtx<'_>, renderer: &mut dyn Renderer) -> anyhow::Result<()> {
        let Some(id) = self.texture_id else {
            return Ok(());
        };
        // Not loaded yet
        let Some((w, h)) = ctx.assets().texture_size(id) else {
            return Ok(());
        };

        let transform = ctx.transform();
        let (w, h) = (w as f32, h as f32);
        renderer.draw_texture_region(
            id,
            Rect::new(0.0, 0.0, w, h),
            Rect::new(
                transform.position.x,
                transform.position.y,
                w * transform.scale.x,
                h * transform.scale.y,
            ),
            transform.rotation,
        );
        Ok(())
    }
}
