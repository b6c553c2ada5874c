pub mod asset_manager;
pub mod sprite;
