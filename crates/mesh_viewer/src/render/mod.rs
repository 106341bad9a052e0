//! # Rendering System
//!
//! The render loop talks to the GPU only through [`RenderBackend`]:
//!
//! - **api**: the backend trait, resource handles and uniform blocks
//! - **primitives**: the perspective [`Camera`]
//! - **frame_loop**: [`FrameRenderer`], one call per displayed frame
//! - **headless**: [`RecordingBackend`], an in-memory backend for tests and
//!   runs without a display
//! - **vulkan** (feature `vulkan`): GLFW window plus Vulkan backend

pub mod api;
pub mod frame_loop;
pub mod headless;
pub mod primitives;

/// Vulkan backend implementation
#[cfg(feature = "vulkan")]
pub mod vulkan;

pub use api::{
    BackendResult, BufferHandle, ColorAttribute, FrameStatus, MaterialUniforms, RenderBackend, SharedUniforms,
    TextureHandle, VertexAttributes,
};
pub use frame_loop::FrameRenderer;
pub use headless::{RecordedCall, RecordingBackend};
pub use primitives::Camera;

use thiserror::Error;

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Missing graphics drivers, no suitable device or a window that could not
    /// be created.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// A GPU resource could not be created
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A handle did not name a live resource
    #[error("Invalid resource handle: {0}")]
    InvalidHandle(String),

    /// Backend-specific error
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
