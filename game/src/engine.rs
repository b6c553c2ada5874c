// game/src/engine.rs
use engine_core::assets::asset_manager::AssetId;
use engine_core::constants::*;
use engine_core::game::game::Game;
use engine_core::rendering::renderer::{Rect, Renderer};

/// Renderer for headless runs: counts draw calls and traces them.
#[derive(Debug, Default)]
pub struct LogRenderer {
    pub draw_calls: usize,
}

impl Renderer for LogRenderer {
    fn draw_texture_region(&mut self, texture: AssetId, source: Rect, dest: Rect, rotation: f32) {
        self.draw_calls += 1;
        log::trace!("draw {texture:?} {source:?} -> {dest:?} ({rotation} rad)");
    }
}

/// Totals of a headless run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u32,
    pub steps: u32,
    pub failed_updates: usize,
    pub failed_draws: usize,
    pub draw_calls: usize,
}

pub struct Engine {
    pub game: Game,
    pub renderer: LogRenderer,
}

impl Engine {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            renderer: LogRenderer::default(),
        }
    }

    /// Runs `frames` frames of simulated wall time, one `FIXED_DT` each.
    pub fn run(&mut self, frames: u32) -> RunSummary {
        let mut summary = RunSummary::default();

        for frame in 0..frames {
            let report = self.game.tick(FIXED_DT, &mut self.renderer);
            summary.frames += 1;
            summary.steps += report.steps;
            summary.failed_updates += report.update.failed;
            summary.failed_draws += report.draw.failed;

            if frame % 60 == 0 {
                log::debug!(
                    "frame {frame}: {} entities, {} components",
                    self.game.scene.entity_count(),
                    self.game.scene.component_count()
                );
            }
        }

        summary.draw_calls = self.renderer.draw_calls;
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::assets::asset_manager::AssetManager;
    use engine_core::assets::sprite::Sprite;
    use engine_core::ecs::component::Velocity;
    use engine_core::ecs::component_registry::ComponentRegistry;
    use tempfile::TempDir;

    #[test]
    fn test_run_counts_frames_and_draws() {
        let mut assets = AssetManager::default();
        assets.insert_texture("hero.png", 8, 8).unwrap();
        let mut game = Game::new(ComponentRegistry::from_inventory(), assets);
        game.scene
            .spawn("hero", &game.assets)
            .with(Velocity { x: 1.0, y: 0.0 })
            .with(Sprite::new("hero.png"))
            .finish();

        let mut engine = Engine::new(game);
        let summary = engine.run(10);

        assert_eq!(summary.frames, 10);
        assert_eq!(summary.draw_calls, 10);
        assert_eq!(summary.failed_updates, 0);
        assert!(summary.steps >= 9);
    }

    #[test]
    fn test_load_run_and_save_a_scene_file() {
        let dir = TempDir::new().unwrap();
        let start = dir.path().join("start.scene.json");
        let out = dir.path().join("out.scene.json");

        let mut setup = Game::new(ComponentRegistry::from_inventory(), AssetManager::default());
        let mover = setup
            .scene
            .spawn("mover", &setup.assets)
            .with(Velocity { x: 60.0, y: 0.0 })
            .finish();
        setup.save_scene(&start).unwrap();

        let mut game = Game::new(ComponentRegistry::from_inventory(), AssetManager::default());
        game.load_scene(&start).unwrap();
        let mut engine = Engine::new(game);
        let summary = engine.run(30);
        assert_eq!(summary.failed_updates, 0);
        engine.game.save_scene(&out).unwrap();

        let mut reloaded = Game::new(ComponentRegistry::from_inventory(), AssetManager::default());
        reloaded.load_scene(&out).unwrap();
        let entity = reloaded.scene.entity(mover).unwrap();
        assert!(entity.transform.position.x > 0.0);
        assert_eq!(reloaded.scene.component_count(), 1);
        assert!(start.exists());
    }
}
