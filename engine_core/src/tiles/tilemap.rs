// engine_core/src/tiles/tilemap.rs
use crate::assets::asset_manager::AssetIndex;
use crate::constants::*;
use crate::ecs::component::{Component, ComponentCtx, DrawCtx};
use crate::reference::assignable::{Assignable, AssignableRef};
use crate::rendering::renderer::{Rect, Renderer};
use crate::tiles::autotile::{AtlasLayout, AutotileRuleSet, Direction, NeighbourFlags};
use crate::tiles::tile::{Tile, TileGrid};
use crate::*;
use ecs_component::ecs_component;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// A grid of tiles drawn from one atlas texture, with per-index autotile
/// rules.
///
/// Frames are only computed once the atlas is known. Until the texture is
/// loaded every cell stays pending and nothing is drawn.
#[ecs_component(name = "Tilemap")]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tilemap {
    pub grid: TileGrid,
    /// Pixel size of one cell, in the atlas and in the world.
    pub cell_size: u32,
    /// Atlas texture, usually `{"kind": "Asset", "path": ...}`.
    pub texture: Option<AssignableRef>,
    pub rule_sets: Vec<AutotileRuleSet>,
    #[serde(skip)]
    atlas: Option<AtlasLayout>,
}

impl Default for Tilemap {
    fn default() -> Self {
        Self::new(DEFAULT_TILEMAP_WIDTH, DEFAULT_TILEMAP_HEIGHT)
    }
}

impl Tilemap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            grid: TileGrid::new(width, height),
            cell_size: DEFAULT_CELL_SIZE,
            texture: None,
            rule_sets: Vec::new(),
            atlas: None,
        }
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    /// Insert a tile at a grid coordinate. Out of range coordinates are
    /// ignored.
    pub fn set_tile(&mut self, x: i32, y: i32, tile: Tile) {
        if self.grid.set(x, y, tile) {
            self.update_autotiling(x, y);
        }
    }

    /// Remove a tile from the map.
    pub fn clear_tile(&mut self, x: i32, y: i32) -> Option<Tile> {
        let removed = self.grid.clear(x, y);
        if removed.is_some() {
            self.update_autotiling(x, y);
        }
        removed
    }

    /// Retrieve a tile, returning `None` for empty cells.
    pub fn get_tile(&self, x: i32, y: i32) -> Option<&Tile> {
        self.grid.get(x, y)
    }

    /// Resizes the grid and recomputes every frame. Oversized requests are
    /// logged and ignored.
    pub fn resize(&mut self, width: usize, height: usize) {
        if let Err(e) = self.grid.resize(width, height) {
            onscreen_warn!("Cannot resize tilemap: {e}.");
            return;
        }
        self.rebuild_autotiling();
    }

    /// Rule set for tiles with `index`.
    pub fn rule_set(&self, index: u32) -> Option<&AutotileRuleSet> {
        self.rule_sets.iter().find(|set| set.tile_index == index)
    }

    /// Recomputes `(x, y)` and its 4 orthogonal neighbours.
    pub fn update_autotiling(&mut self, x: i32, y: i32) {
        if self.atlas.is_none() {
            return;
        }
        self.refresh_cell(x, y);
        for direction in Direction::orthogonal() {
            let (dx, dy) = direction.offset();
            let (nx, ny) = (x + dx, y + dy);
            let has_rules = self
                .grid
                .get(nx, ny)
                .is_some_and(|tile| self.rule_set(tile.index).is_some());
            if has_rules {
                self.refresh_cell(nx, ny);
            }
        }
    }

    /// Recomputes every cell.
    pub fn rebuild_autotiling(&mut self) {
        if self.atlas.is_none() {
            return;
        }
        let cells: Vec<(i32, i32)> = self.grid.iter().map(|(x, y, _)| (x, y)).collect();
        for (x, y) in cells {
            self.refresh_cell(x, y);
        }
    }

    fn refresh_cell(&mut self, x: i32, y: i32) {
        let Some(frame) = self.compute_frame(x, y) else {
            return;
        };
        if let Some(tile) = self.grid.get_mut(x, y) {
            tile.frame = Some(frame);
        }
    }

    fn compute_frame(&self, x: i32, y: i32) -> Option<u32> {
        let tile = self.grid.get(x, y)?;
        let Some(set) = self.rule_set(tile.index) else {
            return Some(tile.index);
        };

        // Out of range neighbours count as empty.
        let mut flags = NeighbourFlags::new(|direction: Direction| {
            let (dx, dy) = direction.offset();
            self.grid
                .get(x + dx, y + dy)
                .is_some_and(|neighbour| set.is_family(neighbour.index))
        });
        Some(set.select_frame(&mut flags))
    }

    pub fn atlas(&self) -> Option<&AtlasLayout> {
        self.atlas.as_ref()
    }

    /// Installs the atlas layout and computes every frame.
    pub fn set_atlas(&mut self, atlas: AtlasLayout) {
        self.atlas = Some(atlas);
        self.rebuild_autotiling();
    }

    /// Tries to derive the atlas from the texture reference. Returns `true`
    /// once an atlas is in place.
    fn bind_atlas(&mut self, resolved: Option<Assignable>, assets: &dyn AssetIndex) -> bool {
        if self.atlas.is_some() {
            return true;
        }
        let Some(handle) = resolved.as_ref().and_then(Assignable::as_asset) else {
            return false;
        };
        let Some(size) = assets.texture_size(handle.id) else {
            return false;
        };
        match AtlasLayout::from_texture_size(handle.id, size, self.cell_size) {
            Some(layout) => {
                self.set_atlas(layout);
                true
            }
            None => {
                log::warn!(
                    "Texture {} is smaller than one {}px cell.",
                    handle.path.display(),
                    self.cell_size
                );
                false
            }
        }
    }

    fn try_bind(&mut self, ctx: &ComponentCtx<'_>) {
        if self.atlas.is_some() {
            return;
        }
        let resolved = self.texture.as_ref().and_then(|texture| ctx.resolve(texture));
        self.bind_atlas(resolved, ctx.assets());
    }

    /// Atlas rectangle of the frame shown at `(x, y)`.
    pub fn source_rect(&self, x: i32, y: i32) -> Option<Rect> {
        let atlas = self.atlas.as_ref()?;
        let frame = self.grid.get(x, y)?.frame?;
        Some(atlas.rect(frame))
    }

    /// True if `(x, y)` holds a colliding tile.
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        self.grid.get(x, y).is_some_and(|tile| tile.collision)
    }

    /// True if any cell in the ranges is solid. Out of range cells are
    /// skipped.
    pub fn any_solid_in(&self, x_range: RangeInclusive<i32>, y_range: RangeInclusive<i32>) -> bool {
        x_range
            .into_iter()
            .any(|x| y_range.clone().any(|y| self.is_solid(x, y)))
    }

    /// Grid cell under a point relative to the map origin.
    pub fn pixel_to_grid(&self, pixel: f32) -> i32 {
        (pixel / self.cell_size.max(1) as f32).floor() as i32
    }
}

impl Component for Tilemap {
    fn create(&mut self, ctx: &mut ComponentCtx<'_>) -> anyhow::Result<()> {
        self.try_bind(ctx);
        Ok(())
    }

    fn update(&mut self, ctx: &mut ComponentCtx<'_>, _dt: f32) -> anyhow::Result<()> {
        // Retry until the texture shows up.
        self.try_bind(ctx);
        Ok(())
    }

    fn draw(&self, ctx: &DrawCtx<'_>, renderer: &mut dyn Renderer) -> anyhow::Result<()> {
        let Some(atlas) = self.atlas else {
            return Ok(());
        };
        let transform = ctx.transform();
        let cell = self.cell_size as f32;
        let (w, h) = (cell * transform.scale.x, cell * transform.scale.y);

        for (x, y, tile) in self.grid.iter() {
            let Some(frame) = tile.frame else { continue };
            let dest = Rect::new(
                transform.position.x + x as f32 * w,
                transform.position.y + y as f32 * h,
                w,
                h,
            );
            renderer.draw_texture_region(atlas.texture, atlas.rect(frame), dest, 0.0);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::asset_manager::{AssetId, AssetManager};
    use crate::ecs::scene::Scene;
    use crate::rendering::renderer::RecordingRenderer;
    use crate::tiles::autotile::{AutotileRule, Constraint};

    const GRASS: u32 = 1;
    const INTERIOR: u32 = 4;
    const TOP_EDGE: u32 = 1;
    const LONE: u32 = 0;

    fn grass_rules() -> AutotileRuleSet {
        AutotileRuleSet::new(GRASS, LONE)
            .with_rule(
                AutotileRule::new(TOP_EDGE)
                    .with(Direction::Up, Constraint::MustNotMatch)
                    .with(Direction::Down, Constraint::MustMatch),
            )
            .with_rule(
                AutotileRule::new(INTERIOR)
                    .with(Direction::Up, Constraint::MustMatch)
                    .with(Direction::Down, Constraint::MustMatch)
                    .with(Direction::Left, Constraint::MustMatch)
                    .with(Direction::Right, Constraint::MustMatch),
            )
    }

    fn ready_map(width: usize, height: usize) -> Tilemap {
        let mut map = Tilemap::new(width, height);
        map.rule_sets.push(grass_rules());
        map.set_atlas(AtlasLayout {
            texture: AssetId(1),
            columns: 4,
            cell_size: 16,
        });
        map
    }

    #[test]
    fn test_cell_below_a_gap_picks_the_edge_frame() {
        let mut map = ready_map(5, 5);
        for y in 1..=3 {
            for x in 1..=3 {
                if (x, y) != (2, 1) {
                    map.set_tile(x, y, Tile::new(GRASS));
                }
            }
        }

        assert_eq!(map.get_tile(2, 2).unwrap().frame, Some(TOP_EDGE));

        // Filling the gap turns the centre into an interior cell.
        map.set_tile(2, 1, Tile::new(GRASS));
        assert_eq!(map.get_tile(2, 2).unwrap().frame, Some(INTERIOR));
        assert_ne!(TOP_EDGE, INTERIOR);
    }

    #[test]
    fn test_clearing_a_tile_updates_neighbours() {
        let mut map = ready_map(3, 3);
        map.set_tile(1, 0, Tile::new(GRASS));
        map.set_tile(1, 1, Tile::new(GRASS));
        map.set_tile(1, 2, Tile::new(GRASS));
        assert_eq!(map.get_tile(1, 2).unwrap().frame, Some(LONE));

        map.clear_tile(1, 0);
        assert_eq!(map.get_tile(1, 1).unwrap().frame, Some(TOP_EDGE));
    }

    #[test]
    fn test_edges_of_the_map_count_as_empty() {
        let mut map = ready_map(1, 2);
        map.set_tile(0, 0, Tile::new(GRASS));
        map.set_tile(0, 1, Tile::new(GRASS));

        assert_eq!(map.get_tile(0, 0).unwrap().frame, Some(TOP_EDGE));
    }

    #[test]
    fn test_tiles_without_rules_show_their_index() {
        let mut map = ready_map(2, 2);
        map.set_tile(0, 0, Tile::new(9));

        assert_eq!(map.get_tile(0, 0).unwrap().frame, Some(9));
        assert_eq!(map.source_rect(0, 0), Some(Rect::new(16.0, 32.0, 16.0, 16.0)));
    }

    #[test]
    fn test_out_of_bounds_calls_are_ignored() {
        let mut map = ready_map(2, 2);
        map.set_tile(-1, 0, Tile::new(GRASS));
        map.set_tile(2, 2, Tile::new(GRASS));

        assert!(map.clear_tile(7, 7).is_none());
        assert!(map.get_tile(-1, 0).is_none());
        assert_eq!(map.grid.occupied(), 0);
    }

    #[test]
    fn test_resize_recomputes() {
        let mut map = ready_map(3, 3);
        map.set_tile(0, 0, Tile::new(GRASS));
        map.set_tile(0, 1, Tile::new(GRASS));
        map.set_tile(2, 2, Tile::new(GRASS));

        map.resize(1, 1);

        assert_eq!(map.grid.occupied(), 1);
        assert_eq!(map.get_tile(0, 0).unwrap().frame, Some(LONE));

        map.resize(usize::MAX, usize::MAX);
        assert_eq!((map.width(), map.height()), (1, 1));
        assert_eq!(map.grid.occupied(), 1);
    }

    #[test]
    fn test_collision_queries() {
        let mut map = ready_map(4, 4);
        map.set_tile(2, 2, Tile::solid(7));
        map.set_tile(0, 0, Tile::new(7));

        assert!(map.is_solid(2, 2));
        assert!(!map.is_solid(0, 0));
        assert!(map.any_solid_in(1..=3, 1..=2));
        assert!(!map.any_solid_in(-2..=1, -2..=1));
        assert_eq!(map.pixel_to_grid(40.0), 2);
    }

    #[test]
    fn test_frames_wait_for_the_texture() {
        let mut assets = AssetManager::default();
        let mut scene = Scene::new();

        let mut map = Tilemap::new(4, 4);
        map.texture = Some(AssignableRef::asset("tiles/grass.png"));
        map.rule_sets.push(grass_rules());
        map.set_tile(1, 1, Tile::new(GRASS));
        let entity = scene.spawn("level", &assets).with(map).finish();
        let (id, map) = scene.first_component::<Tilemap>(entity).unwrap();

        // Texture unknown: nothing computed, nothing drawn, nothing failed.
        assert!(map.atlas().is_none());
        assert_eq!(map.get_tile(1, 1).unwrap().frame, None);
        let mut renderer = RecordingRenderer::default();
        assert_eq!(scene.draw(&assets, &mut renderer).failed, 0);
        assert!(renderer.calls.is_empty());

        let texture = assets.insert_texture("tiles/grass.png", 64, 64).unwrap();
        scene.update(&assets, FIXED_DT);

        let map = scene.component::<Tilemap>(id).unwrap();
        assert_eq!(map.atlas().map(|a| a.texture), Some(texture));
        assert_eq!(map.get_tile(1, 1).unwrap().frame, Some(LONE));

        scene.draw(&assets, &mut renderer);
        assert_eq!(renderer.calls.len(), 1);
        assert_eq!(renderer.calls[0].dest, Rect::new(16.0, 16.0, 16.0, 16.0));
    }
}
