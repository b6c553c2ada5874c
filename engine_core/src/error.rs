// engine_core/src/error.rs
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the component registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A descriptor with the same type name is already registered.
    #[error("component type `{0}` is already registered")]
    DuplicateType(String),

    /// No descriptor is registered under the type name.
    #[error("unknown component type `{0}`")]
    UnknownType(String),
}

/// Errors raised while reading or writing a scene.
///
/// Every variant is fatal to the operation that produced it. Unresolved
/// references are not errors and never show up here.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The document is not valid JSON or does not have the scene layout.
    #[error("malformed scene document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported scene version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// A component node has no `type` field.
    #[error("component #{index} of entity `{entity}` has no `type` discriminator")]
    MissingDiscriminator { entity: String, index: usize },

    /// A component node names a type the registry does not know.
    #[error("unknown component type `{0}`")]
    UnknownComponentType(String),

    /// A component node has the wrong shape.
    #[error("component #{index} of entity `{entity}` is malformed: {reason}")]
    MalformedNode {
        entity: String,
        index: usize,
        reason: String,
    },

    /// The fields of a component could not be converted.
    #[error("invalid data for component `{type_name}`: {source}")]
    ComponentData {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },

    /// Stored ids leave no room for the components that need a new one.
    #[error("no component ids left to assign")]
    ComponentIdsExhausted,

    /// Two nodes carry the same identity marker.
    #[error("identity `{0}` appears more than once")]
    DuplicateIdentity(String),

    #[error("i/o error on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised by the asset manager.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("empty asset path")]
    EmptyPath,

    #[error("failed to read texture `{}`: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Error)]
pub enum TileError {
    #[error("a {width}x{height} tile grid exceeds the {max} cell side limit")]
    GridTooLarge { width: usize, height: usize, max: usize },
}
