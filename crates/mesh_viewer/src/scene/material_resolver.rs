//! Material resolution
//!
//! Turns the parsed material library into render-ready materials:
//!
//! 1. every `*Map` filename is swapped for a texture handle from the
//!    [`TextureTable`], falling back to the label texture;
//! 2. the configured overrides (shininess, specular) are forced on;
//! 3. per geometry, the result is shallow-merged over the default template.

use super::texture_table::TextureTable;
use crate::assets::materials::{keys, Material, MaterialLibrary, MaterialValue};
use crate::config::{MaterialOverrides, MaterialTemplateConfig};
use crate::foundation::math::Vec3;
use crate::render::api::{MaterialUniforms, TextureHandle};
use std::collections::HashMap;

/// Build the default material template
///
/// Both texture maps point at the 1x1 white texture.
pub fn default_template(config: &MaterialTemplateConfig, white: TextureHandle) -> Material {
    Material::new()
        .with(keys::DIFFUSE, MaterialValue::Color(Vec3::from(config.diffuse)))
        .with(keys::DIFFUSE_MAP, MaterialValue::Texture(white))
        .with(keys::AMBIENT, MaterialValue::Color(Vec3::from(config.ambient)))
        .with(keys::SPECULAR, MaterialValue::Color(Vec3::from(config.specular)))
        .with(keys::SPECULAR_MAP, MaterialValue::Texture(white))
        .with(keys::SHININESS, MaterialValue::Scalar(config.shininess))
        .with(keys::OPACITY, MaterialValue::Scalar(config.opacity))
}

/// Resolves parsed materials against textures and the default template
///
/// The resolver owns the texture table because resolution writes fallback
/// entries into it. Once [`MaterialResolver::resolve_library`] has run, the
/// resolver is only read.
#[derive(Debug, Clone)]
pub struct MaterialResolver {
    textures: TextureTable,
    template: Material,
    overrides: MaterialOverrides,
    materials: HashMap<String, Material>,
}

impl MaterialResolver {
    /// Create a resolver with no materials yet
    pub fn new(textures: TextureTable, template: Material, overrides: MaterialOverrides) -> Self {
        Self {
            textures,
            template,
            overrides,
            materials: HashMap::new(),
        }
    }

    /// Resolve texture references and apply overrides for every material
    pub fn resolve_library(&mut self, library: MaterialLibrary) {
        let mut fallbacks = 0usize;

        for (name, mut material) in library {
            for (key, value) in material.texture_maps_mut() {
                let MaterialValue::Map(filename) = value else {
                    continue;
                };

                if !self.textures.contains(filename) {
                    log::debug!("Material '{}' {}: '{}' falls back to label texture", name, key, filename);
                    fallbacks += 1;
                }
                *value = MaterialValue::Texture(self.textures.get_or_insert_fallback(filename));
            }

            if let Some(shininess) = self.overrides.shininess {
                material.set(keys::SHININESS, MaterialValue::Scalar(shininess));
            }
            if let Some(specular) = self.overrides.specular {
                material.set(keys::SPECULAR, MaterialValue::Color(Vec3::from(specular)));
            }

            self.materials.insert(name, material);
        }

        log::info!(
            "Resolved {} materials ({} texture references fell back)",
            self.materials.len(),
            fallbacks
        );
    }

    /// The material a geometry referencing `name` draws with
    ///
    /// Unknown names yield the default template unchanged.
    pub fn material_for(&self, name: &str) -> Material {
        match self.materials.get(name) {
            Some(material) => material.layered_over(&self.template),
            None => {
                log::debug!("Material '{}' not in library; using default template", name);
                self.template.clone()
            }
        }
    }

    /// Flatten a resolved material into the values the shaders consume
    ///
    /// Values missing or of the wrong kind fall back to the template, and
    /// textures to the white texture.
    pub fn uniforms(&self, material: &Material) -> MaterialUniforms {
        let color = |key: &str, default: Vec3| {
            material.color(key).or_else(|| self.template.color(key)).unwrap_or(default)
        };
        let scalar = |key: &str, default: f32| {
            material.scalar(key).or_else(|| self.template.scalar(key)).unwrap_or(default)
        };
        let texture = |key: &str| {
            material
                .texture(key)
                .or_else(|| self.template.texture(key))
                .unwrap_or_else(|| self.textures.default_white())
        };

        MaterialUniforms {
            diffuse: color(keys::DIFFUSE, Vec3::new(1.0, 1.0, 1.0)),
            diffuse_map: texture(keys::DIFFUSE_MAP),
            ambient: color(keys::AMBIENT, Vec3::zeros()),
            emissive: color(keys::EMISSIVE, Vec3::zeros()),
            specular: color(keys::SPECULAR, Vec3::new(1.0, 1.0, 1.0)),
            specular_map: texture(keys::SPECULAR_MAP),
            shininess: scalar(keys::SHININESS, 400.0),
            opacity: scalar(keys::OPACITY, 1.0),
        }
    }

    /// Resolved (not yet template-merged) material by name
    pub fn resolved(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// The default template
    pub fn template(&self) -> &Material {
        &self.template
    }

    /// The texture table, including fallback entries added during resolution
    pub fn textures(&self) -> &TextureTable {
        &self.textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MtlParser;
    use crate::scene::texture_table::LABEL_TEXTURE_KEY;
    use slotmap::SlotMap;

    struct Fixture {
        resolver: MaterialResolver,
        label: TextureHandle,
        white: TextureHandle,
        wood: TextureHandle,
    }

    fn fixture() -> Fixture {
        let mut handles: SlotMap<TextureHandle, ()> = SlotMap::with_key();
        let label = handles.insert(());
        let white = handles.insert(());
        let wood = handles.insert(());

        let mut textures = TextureTable::new(label, white);
        textures.insert("wood.png", wood);

        let template = default_template(&MaterialTemplateConfig::default(), white);
        Fixture {
            resolver: MaterialResolver::new(textures, template, MaterialOverrides::default()),
            label,
            white,
            wood,
        }
    }

    const LIBRARY: &str = r#"
newmtl Strap
Kd 0.2 0.1 0.05
Ks 0.0 0.0 0.0
Ns 96
map_Kd missing.png

newmtl Face
Kd 1 1 1
map_Kd wood.png
map_Ns missing.png

newmtl Sparse
"#;

    #[test]
    fn test_empty_library_gives_template() {
        let f = fixture();
        assert_eq!(f.resolver.material_for("foo"), *f.resolver.template());
    }

    #[test]
    fn test_template_values() {
        let f = fixture();
        let template = f.resolver.template();

        assert_eq!(template.color(keys::DIFFUSE), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(template.texture(keys::DIFFUSE_MAP), Some(f.white));
        assert_eq!(template.color(keys::AMBIENT), Some(Vec3::zeros()));
        assert_eq!(template.color(keys::SPECULAR), Some(Vec3::new(1.0, 1.0, 1.0)));
        assert_eq!(template.texture(keys::SPECULAR_MAP), Some(f.white));
        assert_eq!(template.scalar(keys::SHININESS), Some(400.0));
        assert_eq!(template.scalar(keys::OPACITY), Some(1.0));
    }

    #[test]
    fn test_overrides_replace_source_values() {
        let mut f = fixture();
        f.resolver.resolve_library(MtlParser::parse(LIBRARY).unwrap());

        for name in ["Strap", "Face", "Sparse"] {
            let material = f.resolver.resolved(name).unwrap();
            assert_eq!(material.scalar(keys::SHININESS), Some(25.0));
            assert_eq!(material.color(keys::SPECULAR), Some(Vec3::new(1.0, 1.0, 1.0)));
        }
    }

    #[test]
    fn test_missing_texture_memoized_to_single_fallback_entry() {
        let mut f = fixture();
        let before = f.resolver.textures().len();

        f.resolver.resolve_library(MtlParser::parse(LIBRARY).unwrap());

        let strap = f.resolver.material_for("Strap");
        let face = f.resolver.material_for("Face");

        assert_eq!(strap.texture(keys::DIFFUSE_MAP), Some(f.label));
        assert_eq!(face.texture(keys::SPECULAR_MAP), Some(f.label));
        assert_eq!(face.texture(keys::DIFFUSE_MAP), Some(f.wood));

        assert_eq!(f.resolver.textures().len(), before + 1);
        assert_eq!(f.resolver.textures().get("missing.png"), Some(f.label));
        assert_eq!(f.resolver.textures().get(LABEL_TEXTURE_KEY), Some(f.label));
    }

    #[test]
    fn test_sparse_material_is_completed_by_template() {
        let mut f = fixture();
        f.resolver.resolve_library(MtlParser::parse(LIBRARY).unwrap());

        let material = f.resolver.material_for("Sparse");
        for key in [keys::DIFFUSE, keys::AMBIENT, keys::SPECULAR, keys::SHININESS, keys::OPACITY] {
            assert!(material.contains(key), "missing {}", key);
        }
        assert_eq!(material.texture(keys::DIFFUSE_MAP), Some(f.white));
        // Overridden shininess wins over the template's 400
        assert_eq!(material.scalar(keys::SHININESS), Some(25.0));
    }

    #[test]
    fn test_merge_keeps_source_colors() {
        let mut f = fixture();
        f.resolver.resolve_library(MtlParser::parse(LIBRARY).unwrap());

        let uniforms = f.resolver.uniforms(&f.resolver.material_for("Strap"));

        assert_eq!(uniforms.diffuse, Vec3::new(0.2, 0.1, 0.05));
        assert_eq!(uniforms.diffuse_map, f.label);
        assert_eq!(uniforms.specular_map, f.white);
        assert_eq!(uniforms.emissive, Vec3::zeros());
        assert_eq!(uniforms.shininess, 25.0);
        assert_eq!(uniforms.opacity, 1.0);
    }
}
