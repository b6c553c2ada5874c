// engine_core/src/rendering/renderer.rs
use crate::assets::asset_manager::AssetId;
use serde::{Deserialize, Serialize};

/// Axis aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Drawing backend the host hands to `Scene::draw`.
pub trait Renderer {
    /// Draws the `source` region of a texture into `dest`, rotated by
    /// `rotation` radians around the destination's centre.
    fn draw_texture_region(&mut self, texture: AssetId, source: Rect, dest: Rect, rotation: f32);
}

/// Renderer that records every call. Used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub calls: Vec<DrawCall>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub texture: AssetId,
    pub source: Rect,
    pub dest: Rect,
    pub rotation: f32,
}

impl Renderer for RecordingRenderer {
    fn draw_texture_region(&mut self, texture: AssetId, source: Rect, dest: Rect, rotation: f32) {
        self.calls.push(DrawCall {
            texture,
            source,
            dest,
            rotation,
        });
    }
}
