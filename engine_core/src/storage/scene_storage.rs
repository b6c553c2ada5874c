// engine_core/src/storage/scene_storage.rs
use crate::assets::asset_manager::AssetIndex;
use crate::constants::SCENE_EXT;
use crate::ecs::component_registry::ComponentRegistry;
use crate::ecs::scene::Scene;
use crate::error::SceneError;
use crate::storage::scene_serializer;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads and builds the scene stored at `path`.
pub fn load_scene_file(
    path: &Path,
    registry: &ComponentRegistry,
    assets: &dyn AssetIndex,
) -> Result<Scene, SceneError> {
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    scene_serializer::from_str(&text, registry, assets)
}

/// Saves `scene` to `path`.
///
/// The document is built in memory and written to a sibling temp file that
/// is then renamed over `path`, so a failed save never leaves a partial file.
pub fn save_scene_file(
    scene: &Scene,
    registry: &ComponentRegistry,
    path: &Path,
) -> Result<(), SceneError> {
    let text = scene_serializer::to_string(scene, registry)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, text).map_err(io_error(&tmp))?;
    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(io_error(path)(source));
    }

    log::info!("Saved scene to {}.", path.display());
    Ok(())
}

/// Scene files directly inside `dir`, sorted by name.
pub fn list_scene_files(dir: &Path) -> Result<Vec<PathBuf>, SceneError> {
    let entries = fs::read_dir(dir).map_err(io_error(dir))?;

    let mut scenes: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(SCENE_EXT))
        })
        .collect();
    scenes.sort();
    Ok(scenes)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> SceneError + use<> {
    let path = path.to_path_buf();
    move |source| SceneError::Io { path, source }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::asset_manager::AssetManager;
    use crate::ecs::component::{Follow, Velocity};
    use crate::ecs::component_registry::ComponentDescriptor;
    use tempfile::TempDir;

    fn velocity_only() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register(ComponentDescriptor::of::<Velocity>()).unwrap();
        registry
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("levels/intro.scene.json");
        let assets = AssetManager::default();
        let registry = velocity_only();
        let mut scene = Scene::new();
        let hero = scene.spawn("hero", &assets).with(Velocity { x: 2.0, y: 0.0 }).finish();

        save_scene_file(&scene, &registry, &path).unwrap();
        let loaded = load_scene_file(&path, &registry, &assets).unwrap();

        assert!(loaded.first_component::<Velocity>(hero).is_some());
        assert!(!temp_path(&path).exists());
        assert_eq!(list_scene_files(&dir.path().join("levels")).unwrap(), vec![path]);
    }

    #[test]
    fn test_failed_save_leaves_existing_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("intro.scene.json");
        let assets = AssetManager::default();
        let registry = velocity_only();

        let mut scene = Scene::new();
        scene.spawn("hero", &assets).with(Velocity::default()).finish();
        save_scene_file(&scene, &registry, &path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // Follow is not registered, so serialising fails before any write.
        scene.spawn("follower", &assets).with(Follow::default()).finish();
        let err = save_scene_file(&scene, &registry, &path).unwrap_err();

        assert!(matches!(err, SceneError::UnknownComponentType(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let assets = AssetManager::default();

        let err = load_scene_file(&dir.path().join("nope.scene.json"), &velocity_only(), &assets).unwrap_err();
        assert!(matches!(err, SceneError::Io { .. }));
    }
}
