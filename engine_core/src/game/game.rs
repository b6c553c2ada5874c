// engine_core/src/game/game.rs
use crate::assets::asset_manager::AssetManager;
use crate::constants::*;
use crate::ecs::component_registry::ComponentRegistry;
use crate::ecs::scene::{Scene, TickReport};
use crate::error::SceneError;
use crate::rendering::renderer::Renderer;
use crate::storage::engine_config::EngineConfig;
use crate::storage::scene_storage::{load_scene_file, save_scene_file};
use crate::*;
use std::path::{Path, PathBuf};

/// What one call to `Game::tick` did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Fixed steps run this frame.
    pub steps: u32,
    pub update: TickReport,
    pub draw: TickReport,
}

/// Owns the registry, the assets and the active scene, and drives them.
pub struct Game {
    pub registry: ComponentRegistry,
    pub assets: AssetManager,
    pub scene: Scene,
    accumulator: f32,
    /// Last user facing message.
    status: String,
    /// File the active scene came from or was last saved to.
    scene_path: Option<PathBuf>,
}

impl Game {
    pub fn new(registry: ComponentRegistry, assets: AssetManager) -> Self {
        Self {
            registry,
            assets,
            scene: Scene::new(),
            accumulator: 0.0,
            status: String::new(),
            scene_path: None,
        }
    }

    /// Game with every `#[ecs_component]` registered and assets rooted where
    /// the config says.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            ComponentRegistry::from_inventory(),
            AssetManager::new(&config.assets_root),
        )
    }

    /// Replaces the active scene with the one stored at `path`. On failure
    /// the active scene is left as it was.
    pub fn load_scene(&mut self, path: &Path) -> Result<(), SceneError> {
        match load_scene_file(path, &self.registry, &self.assets) {
            Ok(scene) => {
                self.scene = scene;
                self.accumulator = 0.0;
                self.scene_path = Some(path.to_path_buf());
                self.report(log::Level::Info, format!("Loaded scene '{}'.", path.display()));
                Ok(())
            }
            Err(e) => {
                self.report(
                    log::Level::Error,
                    format!("Could not load scene '{}': {e}", path.display()),
                );
                Err(e)
            }
        }
    }

    /// Writes the active scene to `path`.
    pub fn save_scene(&mut self, path: &Path) -> Result<(), SceneError> {
        match save_scene_file(&self.scene, &self.registry, path) {
            Ok(()) => {
                self.scene_path = Some(path.to_path_buf());
                self.report(log::Level::Info, format!("Saved scene '{}'.", path.display()));
                Ok(())
            }
            Err(e) => {
                self.report(
                    log::Level::Error,
                    format!("Could not save scene '{}': {e}", path.display()),
                );
                Err(e)
            }
        }
    }

    /// Runs as many fixed steps as `frame_dt` allows, then draws once.
    pub fn tick(&mut self, frame_dt: f32, renderer: &mut dyn Renderer) -> FrameReport {
        let mut frame = FrameReport::default();
        self.accumulator = (self.accumulator + frame_dt).min(MAX_ACCUM);

        // Fixed‑step simulation
        while self.accumulator >= FIXED_DT {
            let step = self.scene.update(&self.assets, FIXED_DT);
            frame.update.invoked += step.invoked;
            frame.update.failed += step.failed;
            frame.steps += 1;
            self.accumulator -= FIXED_DT;
        }

        frame.draw = self.scene.draw(&self.assets, renderer);
        frame
    }

    /// Runs every create hook again, e.g. after component code or assets
    /// were reloaded.
    pub fn reload_components(&mut self) -> TickReport {
        let report = self.scene.recreate_all(&self.assets);
        if report.failed > 0 {
            self.report(
                log::Level::Warn,
                format!("{} components failed to reload.", report.failed),
            );
        }
        report
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn scene_path(&self) -> Option<&Path> {
        self.scene_path.as_deref()
    }

    fn report(&mut self, level: log::Level, message: String) {
        match level {
            log::Level::Error => onscreen_error!("{message}"),
            log::Level::Warn => onscreen_warn!("{message}"),
            _ => onscreen_info!("{message}"),
        }
        self.status = message;
    }
}
