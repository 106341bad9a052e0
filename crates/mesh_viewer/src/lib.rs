//! # Mesh Viewer
//!
//! Loads a textured OBJ mesh with its MTL materials, frames it with a
//! perspective camera and spins it about the vertical axis.
//!
//! ## Features
//!
//! - **OBJ/MTL loading**: geometry split per material, texture maps resolved
//!   with a label-texture fallback
//! - **Automatic framing**: the mesh is recentered on the origin and the
//!   camera placed to fit its bounding box
//! - **Backend-agnostic loop**: a headless recording backend for tests, and a
//!   Vulkan backend behind the `vulkan` feature
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mesh_viewer::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ViewerConfig::default().with_model_path("resources/model.obj");
//!     let mut backend = RecordingBackend::new(1280, 720);
//!
//!     let scene = Scene::load(&config, &mut backend)?;
//!     let mut frame = FrameRenderer::new(&scene.camera, &config.camera, &config.lighting, 1280.0 / 720.0);
//!
//!     let mut timer = Timer::new();
//!     for _ in 0..3 {
//!         timer.update();
//!         frame.render_frame(&mut backend, &scene.parts, timer.total_time())?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for viewer users
pub mod prelude {
    pub use crate::{
        assets::{Geometry, ImageData, Material, MaterialValue, ObjLoader, MtlParser},
        config::{Config, ViewerConfig},
        foundation::{
            math::{Mat4, Mat4Ext, Vec3},
            time::{Stopwatch, Timer},
        },
        render::{Camera, FrameRenderer, FrameStatus, RecordingBackend, RenderBackend, RenderError},
        scene::{CameraPlan, Extents, MaterialResolver, Part, Scene, SceneError, TextureTable},
    };

    #[cfg(feature = "vulkan")]
    pub use crate::render::vulkan::VulkanBackend;
}
