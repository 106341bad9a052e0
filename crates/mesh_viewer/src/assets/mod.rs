//! Asset loading: OBJ meshes, MTL materials and texture images

pub mod image_loader;
pub mod materials;
pub mod obj_loader;

pub use image_loader::ImageData;
pub use materials::{Material, MaterialLibrary, MaterialValue, MtlError, MtlParser};
pub use obj_loader::{Geometry, GeometryData, ObjData, ObjError, ObjLoader};

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to decode asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
