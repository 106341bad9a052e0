//! # Viewer Configuration
//!
//! One aggregate, [`ViewerConfig`], with a section per subsystem:
//!
//! - **window**: title and initial size
//! - **assets**: model path, fallback label texture, texture preloading
//! - **materials**: default template and the global overrides
//! - **camera** / **lighting**: framing field of view and light direction
//! - **renderer**: Vulkan backend settings
//! - **engine**: logging

use super::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level viewer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Asset locations
    pub assets: AssetConfig,
    /// Material defaults and overrides
    pub materials: MaterialConfig,
    /// Camera settings
    pub camera: CameraConfig,
    /// Light settings
    pub lighting: LightingConfig,
    /// Rendering backend settings
    pub renderer: RendererConfig,
    /// Logging and engine behaviour
    pub engine: EngineConfig,
}

impl ViewerConfig {
    /// Replace the model path, keeping everything else
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets.model_path = path.into();
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if !(1.0..180.0).contains(&self.camera.fov_degrees) {
            return Err(ConfigError::Invalid(format!(
                "camera.fov_degrees must be in [1, 180), got {}",
                self.camera.fov_degrees
            )));
        }

        if self.lighting.direction.iter().all(|c| *c == 0.0) {
            return Err(ConfigError::Invalid("lighting.direction must be non-zero".to_string()));
        }

        self.renderer.validate()
    }
}

impl Config for ViewerConfig {}

/// Window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Initial width in pixels
    pub width: u32,
    /// Initial height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Mesh Viewer".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Asset locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// OBJ file to display
    pub model_path: PathBuf,
    /// Texture bound to every unresolved texture-map reference
    pub label_texture: PathBuf,
    /// Decode texture files named by materials when they exist on disk
    pub load_material_textures: bool,
}

impl AssetConfig {
    /// Directory used to resolve `mtllib` references
    pub fn model_dir(&self) -> &Path {
        self.model_path.parent().unwrap_or_else(|| Path::new(""))
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("resources/model.obj"),
            label_texture: PathBuf::from("resources/leather3.png"),
            load_material_textures: true,
        }
    }
}

/// Material defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Values layered under every resolved material
    pub template: MaterialTemplateConfig,
    /// Values forced onto every parsed material
    pub overrides: MaterialOverrides,
}

/// Default material template values
///
/// The diffuse and specular maps of the template are always the 1x1 white
/// texture; only the scalar and color parts are configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialTemplateConfig {
    /// Diffuse color
    pub diffuse: [f32; 3],
    /// Ambient color
    pub ambient: [f32; 3],
    /// Specular color
    pub specular: [f32; 3],
    /// Specular exponent
    pub shininess: f32,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
}

impl Default for MaterialTemplateConfig {
    fn default() -> Self {
        Self {
            diffuse: [1.0, 1.0, 1.0],
            ambient: [0.0, 0.0, 0.0],
            specular: [1.0, 1.0, 1.0],
            shininess: 400.0,
            opacity: 1.0,
        }
    }
}

/// Values forced onto every parsed material, replacing what the MTL says
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialOverrides {
    /// Forced specular exponent
    pub shininess: Option<f32>,
    /// Forced specular color
    pub specular: Option<[f32; 3]>,
}

impl Default for MaterialOverrides {
    fn default() -> Self {
        Self {
            shininess: Some(25.0),
            specular: Some([1.0, 1.0, 1.0]),
        }
    }
}

/// Camera settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { fov_degrees: 60.0 }
    }
}

/// Directional light settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Direction towards the light; normalized before use
    pub direction: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            direction: [-1.0, 3.0, 5.0],
        }
    }
}

/// # Shader Configuration
///
/// Compiled SPIR-V locations for the mesh pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: PathBuf,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: PathBuf,
}

impl ShaderConfig {
    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.vertex_shader_path, &self.fragment_shader_path] {
            if !path.exists() {
                return Err(ConfigError::Invalid(format!("shader not found: {}", path.display())));
            }
        }
        Ok(())
    }
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            vertex_shader_path: PathBuf::from("target/shaders/mesh.vert.spv"),
            fragment_shader_path: PathBuf::from("target/shaders/mesh.frag.spv"),
        }
    }
}

/// # Renderer Configuration
///
/// Application metadata and tuning for the Vulkan backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Shader configuration
    pub shaders: ShaderConfig,
    /// Maximum frames in flight
    pub max_frames_in_flight: usize,
    /// Whether to enable Vulkan validation layers; `None` follows the build type
    pub enable_validation: Option<bool>,
    /// Clear color (RGBA)
    pub clear_color: [f32; 4],
}

impl RendererConfig {
    /// Validation layers requested for this run
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the renderer settings
    ///
    /// Shader paths are checked by the backend when it loads them, so headless
    /// runs do not need compiled shaders on disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        if !(1..=8).contains(&self.max_frames_in_flight) {
            return Err(ConfigError::Invalid(format!(
                "max_frames_in_flight must be in 1..=8, got {}",
                self.max_frames_in_flight
            )));
        }

        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            application_name: "Mesh Viewer".to_string(),
            shaders: ShaderConfig::default(),
            max_frames_in_flight: 2,
            enable_validation: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults_match_viewer_constants() {
        let config = ViewerConfig::default();

        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.lighting.direction, [-1.0, 3.0, 5.0]);
        assert_eq!(config.materials.template.shininess, 400.0);
        assert_eq!(config.materials.overrides.shininess, Some(25.0));
        assert_eq!(config.materials.overrides.specular, Some([1.0, 1.0, 1.0]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[assets]
model_path = "models/watch.obj"

[window]
width = 640
"#
        )
        .unwrap();

        let config = ViewerConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.assets.model_path, PathBuf::from("models/watch.obj"));
        assert_eq!(config.assets.model_dir(), Path::new("models"));
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.materials.template.opacity, 1.0);
    }

    #[test]
    fn test_ron_round_trip() {
        let file = Builder::new().suffix(".ron").tempfile().unwrap();
        let config = ViewerConfig::default().with_model_path("scene.obj");

        config.save_to_file(file.path()).unwrap();
        let loaded = ViewerConfig::load_from_file(file.path()).unwrap();

        assert_eq!(loaded.assets.model_path, PathBuf::from("scene.obj"));
        assert_eq!(loaded.renderer.max_frames_in_flight, 2);
    }

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    #[test]
    fn test_shipped_config_and_label_texture() {
        let config = ViewerConfig::load_from_file(workspace_root().join("viewer.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.assets.label_texture, AssetConfig::default().label_texture);
        assert_eq!(config.materials.overrides.shininess, Some(25.0));

        let label = workspace_root().join(&config.assets.label_texture);
        assert!(label.is_file(), "missing {}", label.display());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = Builder::new().suffix(".json").tempfile().unwrap();
        let result = ViewerConfig::load_from_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ViewerConfig::default();
        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.lighting.direction = [0.0, 0.0, 0.0];
        assert!(config.validate().is_err());

        let mut config = ViewerConfig::default();
        config.renderer.max_frames_in_flight = 0;
        assert!(config.validate().is_err());
    }
}
