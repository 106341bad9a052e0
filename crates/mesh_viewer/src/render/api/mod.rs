//! Public rendering API
//!
//! The backend trait, resource handles and the uniform blocks exchanged with
//! backends.

pub mod render_backend;

pub use render_backend::{
    BackendResult, BufferHandle, ColorAttribute, FrameStatus, MaterialUniforms, RenderBackend, SharedUniforms,
    TextureHandle, VertexAttributes,
};
