pub mod assets;
pub mod constants;
pub mod ecs;
pub mod error;
pub mod game;
pub mod logging;
pub mod reference;
pub mod rendering;
pub mod storage;
pub mod tiles;

