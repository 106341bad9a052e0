//! Scene bootstrap
//!
//! Everything between parsed assets and the first frame:
//!
//! ```text
//! OBJ + MTL text ──► MaterialResolver ──► assembler ──► parts
//!        │                 ▲
//!        │           TextureTable
//!        └──► Extents ──► CameraPlan
//! ```

pub mod assembler;
pub mod extents;
pub mod loader;
pub mod material_resolver;
pub mod texture_table;

pub use assembler::{assemble, vertex_attributes, Part};
pub use extents::{CameraPlan, Extents};
pub use loader::Scene;
pub use material_resolver::{default_template, MaterialResolver};
pub use texture_table::{TextureTable, DEFAULT_WHITE_KEY, LABEL_TEXTURE_KEY};

use crate::assets::{AssetError, MtlError, ObjError};
use crate::render::RenderError;
use std::path::PathBuf;
use thiserror::Error;

/// Scene bootstrap errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// The mesh file could not be read or parsed
    #[error("Failed to load mesh {path}: {source}")]
    Mesh {
        /// Mesh file
        path: PathBuf,
        /// Underlying error
        source: ObjError,
    },

    /// A material library could not be read
    #[error("Failed to read material library {path}: {source}")]
    MaterialLibraryIo {
        /// Library file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Material library text was malformed
    #[error("Failed to parse material libraries: {0}")]
    MaterialLibrary(#[from] MtlError),

    /// A required texture could not be loaded
    #[error("Failed to load texture: {0}")]
    Texture(#[from] AssetError),

    /// The backend rejected an upload
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The mesh contains no vertex positions
    #[error("Mesh {0} contains no geometry")]
    EmptyScene(PathBuf),
}
