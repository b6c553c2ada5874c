// engine_core/src/constants.rs

/// 60Hz simulation.
pub const FIXED_DT: f32 = 1.0 / 60.0;
/// Protects against long freezes.
pub const MAX_ACCUM: f32 = 0.5; 

/// Default width and height, in cells, of a freshly created tilemap.
pub const DEFAULT_TILEMAP_WIDTH: usize = 16;
pub const DEFAULT_TILEMAP_HEIGHT: usize = 10;

/// Default pixel size of one atlas cell.
/// Largest width or height a tile grid may have.
pub const MAX_GRID_SIDE: usize = 4096;

pub const DEFAULT_CELL_SIZE: u32 = 16;

/// Version written into every scene document.
pub const SCENE_FORMAT_VERSION: u32 = 1;

/// Key of the component discriminator in a scene document.
pub const TYPE_KEY: &str = "type";

/// Key of the identity marker carried by entity and component nodes.
pub const ID_KEY: &str = "$id";

/// Key of a component's instance name.
pub const NAME_KEY: &str = "$name";

/// Extension of scene files.
pub const SCENE_EXT: &str = "scene.json";

/// Name of the engine config .ron file.
pub const CONFIG_RON: &str = "engine_config.ron";

/// Base name of the rotating log files.
pub const LOG_BASENAME: &str = "scene_engine";

/// Name of the assets folder.
pub const ASSETS_FOLDER: &str = "assets";
