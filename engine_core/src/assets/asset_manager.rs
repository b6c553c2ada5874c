// engine_core/src/assets/asset_manager.rs
use crate::constants::ASSETS_FOLDER;
use crate::error::AssetError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Component as PathPart, Path, PathBuf};

/// Opaque handle that the asset manager gives out. Zero means unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct AssetId(pub usize);

/// A resolved asset: its id and normalized path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetHandle {
    pub id: AssetId,
    pub path: PathBuf,
}

/// What the scene needs from the asset side.
pub trait AssetIndex {
    /// Looks up an asset by path.
    fn resolve_asset(&self, path: &str) -> Option<AssetHandle>;

    /// Pixel size of a loaded texture.
    fn texture_size(&self, id: AssetId) -> Option<(u32, u32)>;
}

pub struct AssetManager {
    /// Folder every relative asset path is taken from.
    root: PathBuf,
    path_to_id: HashMap<PathBuf, AssetId>,
    id_to_path: HashMap<AssetId, PathBuf>,
    /// Sizes of textures that were actually loaded.
    texture_sizes: HashMap<AssetId, (u32, u32)>,
    /// Counter for asset ids. Starts from 1.
    next_id: usize,
}

impl Default for AssetManager {
    fn default() -> Self {
        Self::new(ASSETS_FOLDER)
    }
}

impl AssetManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            path_to_id: HashMap::new(),
            id_to_path: HashMap::new(),
            texture_sizes: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Turns `path` into the key used by the maps: forward slashes, no `.`
    /// segments and relative to the assets root.
    pub fn normalize_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let raw = path.as_ref().to_string_lossy().trim().replace('\\', "/");
        let path = Path::new(&raw);
        let path = path.strip_prefix(&self.root).unwrap_or(path);

        path.components()
            .filter(|part| !matches!(part, PathPart::CurDir))
            .collect()
    }

    /// Assigns an id to `path` without loading anything. Registering the same
    /// path again returns the same id.
    pub fn register(&mut self, path: impl AsRef<Path>) -> Result<AssetId, AssetError> {
        let path = self.normalize_path(path);
        if path.as_os_str().is_empty() {
            return Err(AssetError::EmptyPath);
        }

        // Already known, reuse the same id
        if let Some(&id) = self.path_to_id.get(&path) {
            return Ok(id);
        }

        let id = AssetId(self.next_id);
        self.next_id += 1;

        self.path_to_id.insert(path.clone(), id);
        self.id_to_path.insert(id, path);
        Ok(id)
    }

    /// Reads a texture's dimensions from the assets folder and registers it.
    pub fn load_texture(&mut self, path: impl AsRef<Path>) -> Result<AssetId, AssetError> {
        let rel = self.normalize_path(path);
        if rel.as_os_str().is_empty() {
            return Err(AssetError::EmptyPath);
        }

        let full = self.root.join(&rel);
        let (w, h) = image::image_dimensions(&full).map_err(|source| AssetError::Texture {
            path: full.clone(),
            source,
        })?;

        let id = self.register(&rel)?;
        self.texture_sizes.insert(id, (w, h));
        log::debug!("Loaded texture {} ({w}x{h}) as {:?}.", rel.display(), id);
        Ok(id)
    }

    /// Registers a texture whose size is already known, e.g. one created in
    /// memory by the host.
    pub fn insert_texture(
        &mut self,
        path: impl AsRef<Path>,
        width: u32,
        height: u32,
    ) -> Result<AssetId, AssetError> {
        let id = self.register(path)?;
        self.texture_sizes.insert(id, (width, height));
        Ok(id)
    }

    /// Loads every `.png` below the assets root. Returns how many loaded;
    /// failures are logged and skipped.
    pub fn load_folder(&mut self) -> usize {
        let mut pending = vec![self.root.clone()];
        let mut loaded = 0;

        while let Some(dir) = pending.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Cannot read asset folder {}: {e}.", dir.display());
                    continue;
                }
            };
            for path in entries.filter_map(Result::ok).map(|entry| entry.path()) {
                if path.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png")) {
                    match self.load_texture(&path) {
                        Ok(_) => loaded += 1,
                        Err(e) => log::warn!("{e}"),
                    }
                }
            }
        }
        loaded
    }

    /// True when the texture behind `id` is loaded.
    pub fn contains(&self, id: AssetId) -> bool {
        self.texture_sizes.contains_key(&id)
    }

    /// Returns the id for `path` or `None` if it was never registered.
    pub fn get_or_none(&self, path: impl AsRef<Path>) -> Option<AssetId> {
        self.path_to_id.get(&self.normalize_path(path)).copied()
    }

    pub fn path_of(&self, id: AssetId) -> Option<&Path> {
        self.id_to_path.get(&id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.id_to_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_path.is_empty()
    }
}

impl AssetIndex for AssetManager {
    fn resolve_asset(&self, path: &str) -> Option<AssetHandle> {
        let path = self.normalize_path(path);
        let id = *self.path_to_id.get(&path)?;
        Some(AssetHandle { id, path })
    }

    fn texture_size(&self, id: AssetId) -> Option<(u32, u32)> {
        self.texture_sizes.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path() {
        let assets = AssetManager::new("assets");
        assert_eq!(assets.normalize_path("./tiles/grass.png"), PathBuf::from("tiles/grass.png"));
        assert_eq!(assets.normalize_path("assets/tiles/grass.png"), PathBuf::from("tiles/grass.png"));
        assert_eq!(assets.normalize_path(" tiles\\grass.png "), PathBuf::from("tiles/grass.png"));
    }

    #[test]
    fn test_register_reuses_ids() {
        let mut assets = AssetManager::default();
        let first = assets.register("tiles/grass.png").unwrap();
        let again = assets.register("./tiles/grass.png").unwrap();
        let other = assets.register("tiles/path.png").unwrap();

        assert_eq!(first, AssetId(1));
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert!(matches!(assets.register("   "), Err(AssetError::EmptyPath)));

        // Registered but not loaded.
        assert!(!assets.contains(first));
        assert_eq!(assets.texture_size(first), None);
    }

    #[test]
    fn test_load_texture_reads_dimensions() {
        let dir = TempDir::new().unwrap();
        let image = image::RgbaImage::new(48, 32);
        image.save(dir.path().join("atlas.png")).unwrap();

        let mut assets = AssetManager::new(dir.path());
        let id = assets.load_texture("atlas.png").unwrap();

        assert!(assets.contains(id));
        assert_eq!(assets.texture_size(id), Some((48, 32)));
        assert_eq!(assets.resolve_asset("atlas.png").unwrap().id, id);
    }

    #[test]
    fn test_load_folder_walks_subfolders() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("tiles")).unwrap();
        image::RgbaImage::new(32, 16).save(dir.path().join("tiles/grass.png")).unwrap();
        image::RgbaImage::new(8, 8).save(dir.path().join("hero.png")).unwrap();
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut assets = AssetManager::new(dir.path());

        assert_eq!(assets.load_folder(), 2);
        let grass = assets.resolve_asset("tiles/grass.png").unwrap();
        assert_eq!(assets.texture_size(grass.id), Some((32, 16)));
    }

    #[test]
    fn test_load_missing_texture_fails_without_registering() {
        let dir = TempDir::new().unwrap();
        let mut assets = AssetManager::new(dir.path());

        let err = assets.load_texture("missing.png").unwrap_err();
        assert!(matches!(err, AssetError::Texture { .. }));
        assert!(assets.get_or_none("missing.png").is_none());
    }
}
