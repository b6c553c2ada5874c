pub mod engine_config;
pub mod scene_serializer;
pub mod scene_storage;
