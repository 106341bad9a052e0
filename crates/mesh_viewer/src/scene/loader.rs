//! Scene loading from disk
//!
//! Bootstrap is one-shot: any failure to read the mesh, its material
//! libraries or the label texture aborts loading. Material textures that are
//! missing or undecodable only degrade to the label fallback.

use super::assembler::{assemble, Part};
use super::extents::{CameraPlan, Extents};
use super::material_resolver::{default_template, MaterialResolver};
use super::texture_table::{TextureTable, LABEL_TEXTURE_KEY};
use super::SceneError;
use crate::assets::image_loader::decode_all;
use crate::assets::{AssetError, MaterialLibrary, MtlParser, ObjLoader};
use crate::config::ViewerConfig;
use crate::foundation::time::Stopwatch;
use crate::render::api::RenderBackend;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Opaque white used for the template's texture maps
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// A loaded, ready-to-draw scene
#[derive(Debug)]
pub struct Scene {
    /// Drawable parts in draw order
    pub parts: Vec<Part>,
    /// Bounds of the untransformed mesh
    pub extents: Extents,
    /// Camera framing derived from the extents
    pub camera: CameraPlan,
    /// Texture table after material resolution
    pub textures: TextureTable,
}

impl Scene {
    /// Load the configured model, its materials and textures, uploading
    /// everything through `backend`.
    pub fn load<B>(config: &ViewerConfig, backend: &mut B) -> Result<Self, SceneError>
    where
        B: RenderBackend + ?Sized,
    {
        let stopwatch = Stopwatch::start_new();
        let model_path = &config.assets.model_path;
        let model_dir = config.assets.model_dir();

        log::info!("Loading model {}", model_path.display());
        let obj = ObjLoader::load_obj(model_path).map_err(|source| SceneError::Mesh {
            path: model_path.clone(),
            source,
        })?;

        let extents =
            Extents::from_geometries(&obj.geometries).ok_or_else(|| SceneError::EmptyScene(model_path.clone()))?;
        let camera = CameraPlan::from_extents(&extents);
        log::info!(
            "Extents min {:?} max {:?}; camera at {:?}, radius {:.4}, clip [{:.4}, {:.4}]",
            extents.min.as_slice(),
            extents.max.as_slice(),
            camera.position.as_slice(),
            camera.radius,
            camera.near,
            camera.far
        );

        let library = load_material_library(model_dir, &obj.material_libs)?;

        let textures = load_textures(config, model_dir, &library, backend)?;

        let template = default_template(&config.materials.template, textures.default_white());
        let mut resolver = MaterialResolver::new(textures, template, config.materials.overrides.clone());
        resolver.resolve_library(library);

        let parts = assemble(backend, &obj.geometries, &resolver)?;

        log::info!(
            "Scene ready: {} parts, {} texture entries ({:.1} ms)",
            parts.len(),
            resolver.textures().len(),
            stopwatch.elapsed_millis()
        );

        Ok(Self {
            parts,
            extents,
            camera,
            textures: resolver.textures().clone(),
        })
    }
}

/// Read every `mtllib` relative to the model directory and parse them as one
/// library
fn load_material_library(model_dir: &Path, libs: &[String]) -> Result<MaterialLibrary, SceneError> {
    let texts = libs
        .iter()
        .map(|lib| {
            let path = model_dir.join(lib);
            log::debug!("Reading material library {}", path.display());
            std::fs::read_to_string(&path).map_err(|source| SceneError::MaterialLibraryIo { path, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let library = MtlParser::parse(&texts.join("\n"))?;
    log::info!("Parsed {} materials from {} libraries", library.len(), libs.len());
    Ok(library)
}

/// Decode the label texture and any material textures in parallel, then
/// upload them and build the texture table
fn load_textures<B>(
    config: &ViewerConfig,
    model_dir: &Path,
    library: &MaterialLibrary,
    backend: &mut B,
) -> Result<TextureTable, SceneError>
where
    B: RenderBackend + ?Sized,
{
    let mut files = vec![(LABEL_TEXTURE_KEY.to_string(), config.assets.label_texture.clone())];
    if config.assets.load_material_textures {
        files.extend(material_texture_files(model_dir, library));
    }

    let mut decoded = decode_all(&files).into_iter();

    // The label texture is first and must load
    let Some((_, label_image)) = decoded.next() else {
        return Err(AssetError::NotFound(config.assets.label_texture.display().to_string()).into());
    };
    let label_image = label_image?;
    let label = backend.create_texture(&label_image)?;
    let white = backend.create_solid_texture(WHITE)?;
    let mut table = TextureTable::new(label, white);

    for (key, image) in decoded {
        match image {
            Ok(image) => {
                let handle = backend.create_texture(&image)?;
                table.insert(key, handle);
            }
            Err(e) => log::warn!("Texture '{}' unavailable, label fallback applies: {}", key, e),
        }
    }

    log::info!("Loaded {} textures", table.len());
    Ok(table)
}

/// Distinct texture filenames referenced by the library that exist on disk
fn material_texture_files(model_dir: &Path, library: &MaterialLibrary) -> Vec<(String, PathBuf)> {
    let names: BTreeSet<&str> = library
        .values()
        .flat_map(|material| material.texture_filenames())
        .filter(|name| *name != LABEL_TEXTURE_KEY)
        .collect();

    names
        .into_iter()
        .filter_map(|name| {
            let path = model_dir.join(name);
            if path.exists() {
                Some((name.to_string(), path))
            } else {
                log::debug!("Texture file {} not found", path.display());
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::materials::keys;
    use crate::render::api::ColorAttribute;
    use crate::render::headless::RecordingBackend;
    use std::fs;

    const MODEL: &str = r#"
mtllib watch.mtl
v -1 -1 -1
v 1 -1 -1
v 1 1 1
v -1 1 1
vt 0 0
vt 1 0
vt 1 1
usemtl Strap
f 1/1 2/2 3/3
usemtl Face
f 1/1 3/3 4/3
usemtl Unknown
f 2 3 4
"#;

    const MATERIALS: &str = r#"
newmtl Strap
Kd 0.3 0.2 0.1
map_Kd strap.png

newmtl Face
Kd 1 1 1
map_Kd face.png
map_Ks strap.png
"#;

    fn write_png(path: &Path, color: [u8; 4]) {
        image::RgbaImage::from_pixel(2, 2, image::Rgba(color)).save(path).unwrap();
    }

    fn scene_dir() -> (tempfile::TempDir, ViewerConfig) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("watch.obj"), MODEL).unwrap();
        fs::write(dir.path().join("watch.mtl"), MATERIALS).unwrap();
        write_png(&dir.path().join("leather.png"), [90, 60, 30, 255]);
        write_png(&dir.path().join("face.png"), [10, 20, 30, 255]);

        let mut config = ViewerConfig::default().with_model_path(dir.path().join("watch.obj"));
        config.assets.label_texture = dir.path().join("leather.png");
        (dir, config)
    }

    #[test]
    fn test_load_scene_end_to_end() {
        let (_dir, config) = scene_dir();
        let mut backend = RecordingBackend::new(800, 600);

        let scene = Scene::load(&config, &mut backend).unwrap();

        assert_eq!(scene.parts.len(), 3);
        assert_eq!(backend.buffer_count(), 3);
        // label + white + face.png
        assert_eq!(backend.texture_count(), 3);

        let label = scene.textures.fallback();
        let face = scene.textures.get("face.png").unwrap();
        assert_ne!(face, label);

        // strap.png has no file, so both references share the label fallback
        assert_eq!(scene.textures.get("strap.png"), Some(label));
        assert_eq!(scene.parts[0].uniforms.diffuse_map, label);
        assert_eq!(scene.parts[1].uniforms.diffuse_map, face);
        assert_eq!(scene.parts[1].uniforms.specular_map, label);

        // Unknown material is the template
        assert_eq!(scene.parts[2].uniforms.diffuse_map, scene.textures.default_white());
        assert_eq!(scene.parts[2].material.scalar(keys::SHININESS), Some(400.0));

        assert_eq!(scene.extents.min.as_slice(), &[-1.0, -1.0, -1.0]);
        assert!(scene.camera.near < scene.camera.far);
        assert_eq!(backend.buffer(scene.parts[0].buffer).unwrap().color, ColorAttribute::Constant([1.0; 4]));
    }

    #[test]
    fn test_material_textures_can_be_disabled() {
        let (_dir, mut config) = scene_dir();
        config.assets.load_material_textures = false;
        let mut backend = RecordingBackend::new(800, 600);

        let scene = Scene::load(&config, &mut backend).unwrap();

        assert_eq!(backend.texture_count(), 2);
        assert_eq!(scene.textures.get("face.png"), Some(scene.textures.fallback()));
    }

    #[test]
    fn test_default_label_texture_loads_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("tri.obj"), "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();

        let mut config = ViewerConfig::default().with_model_path(dir.path().join("tri.obj"));
        let workspace = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        config.assets.label_texture = workspace.join(&config.assets.label_texture);
        let mut backend = RecordingBackend::new(640, 480);

        let scene = Scene::load(&config, &mut backend).unwrap();

        assert_eq!(scene.parts.len(), 1);
        let label = backend.texture(scene.textures.fallback()).unwrap();
        assert!(label.width > 1 && label.height > 1);
    }

    #[test]
    fn test_missing_label_texture_aborts() {
        let (dir, mut config) = scene_dir();
        config.assets.label_texture = dir.path().join("nope.png");
        let mut backend = RecordingBackend::new(800, 600);

        let result = Scene::load(&config, &mut backend);
        assert!(matches!(result, Err(SceneError::Texture(_))));
    }

    #[test]
    fn test_missing_material_library_aborts() {
        let (dir, config) = scene_dir();
        fs::remove_file(dir.path().join("watch.mtl")).unwrap();
        let mut backend = RecordingBackend::new(800, 600);

        let result = Scene::load(&config, &mut backend);
        assert!(matches!(result, Err(SceneError::MaterialLibraryIo { .. })));
    }

    #[test]
    fn test_model_without_faces_is_empty_scene() {
        let (dir, config) = scene_dir();
        fs::write(dir.path().join("watch.obj"), "v 0 0 0\n").unwrap();
        let mut backend = RecordingBackend::new(800, 600);

        let result = Scene::load(&config, &mut backend);
        assert!(matches!(result, Err(SceneError::EmptyScene(_))));
    }
}
