//! Material property maps
//!
//! A [`Material`] is an open mapping from property name to value, as produced
//! by the MTL parser. Properties whose name ends in [`TEXTURE_MAP_SUFFIX`] hold
//! a texture filename until material resolution swaps it for a texture handle.

pub mod mtl_parser;

pub use mtl_parser::{MtlError, MtlParser};

use crate::foundation::math::Vec3;
use crate::render::api::TextureHandle;
use std::collections::{BTreeMap, HashMap};

/// Property name suffix marking a texture reference
pub const TEXTURE_MAP_SUFFIX: &str = "Map";

/// Well-known property names
pub mod keys {
    /// Diffuse color
    pub const DIFFUSE: &str = "diffuse";
    /// Diffuse texture
    pub const DIFFUSE_MAP: &str = "diffuseMap";
    /// Ambient color
    pub const AMBIENT: &str = "ambient";
    /// Ambient texture
    pub const AMBIENT_MAP: &str = "ambientMap";
    /// Specular color
    pub const SPECULAR: &str = "specular";
    /// Specular texture
    pub const SPECULAR_MAP: &str = "specularMap";
    /// Emissive color
    pub const EMISSIVE: &str = "emissive";
    /// Specular exponent
    pub const SHININESS: &str = "shininess";
    /// Opacity in `[0, 1]`
    pub const OPACITY: &str = "opacity";
    /// Opacity texture
    pub const OPACITY_MAP: &str = "opacityMap";
    /// Normal/bump texture
    pub const NORMAL_MAP: &str = "normalMap";
    /// Index of refraction
    pub const OPTICAL_DENSITY: &str = "opticalDensity";
    /// Illumination model
    pub const ILLUM: &str = "illum";
}

/// A single material property value
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialValue {
    /// Scalar such as shininess or opacity
    Scalar(f32),
    /// RGB color
    Color(Vec3),
    /// Unresolved texture filename
    Map(String),
    /// Resolved texture
    Texture(TextureHandle),
}

/// Named property map describing one material
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Material {
    properties: BTreeMap<String, MaterialValue>,
}

/// Parsed materials keyed by name
pub type MaterialLibrary = HashMap<String, Material>;

impl Material {
    /// Create an empty material
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, returning the material for chaining
    pub fn with(mut self, key: impl Into<String>, value: MaterialValue) -> Self {
        self.set(key, value);
        self
    }

    /// Set a property, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: MaterialValue) {
        self.properties.insert(key.into(), value);
    }

    /// Look up a property
    pub fn get(&self, key: &str) -> Option<&MaterialValue> {
        self.properties.get(key)
    }

    /// Whether a property is present
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the material has no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over properties in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaterialValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Mutable access to every texture-map property
    pub fn texture_maps_mut(&mut self) -> impl Iterator<Item = (&str, &mut MaterialValue)> {
        self.properties
            .iter_mut()
            .filter(|(key, _)| key.ends_with(TEXTURE_MAP_SUFFIX))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Filenames referenced by unresolved texture-map properties
    pub fn texture_filenames(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|(key, _)| key.ends_with(TEXTURE_MAP_SUFFIX))
            .filter_map(|(_, value)| match value {
                MaterialValue::Map(filename) => Some(filename.as_str()),
                _ => None,
            })
    }

    /// Color property, if present and a color
    pub fn color(&self, key: &str) -> Option<Vec3> {
        match self.get(key)? {
            MaterialValue::Color(color) => Some(*color),
            _ => None,
        }
    }

    /// Scalar property, if present and a scalar
    pub fn scalar(&self, key: &str) -> Option<f32> {
        match self.get(key)? {
            MaterialValue::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    /// Texture property, if present and resolved
    pub fn texture(&self, key: &str) -> Option<TextureHandle> {
        match self.get(key)? {
            MaterialValue::Texture(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Shallow merge: every property of `self` overrides the same property of
    /// `base`; properties only in `base` are kept.
    pub fn layered_over(&self, base: &Material) -> Material {
        let mut merged = base.clone();
        merged
            .properties
            .extend(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layered_over_is_shallow_and_overriding() {
        let base = Material::new()
            .with(keys::DIFFUSE, MaterialValue::Color(Vec3::new(1.0, 1.0, 1.0)))
            .with(keys::OPACITY, MaterialValue::Scalar(1.0));
        let top = Material::new()
            .with(keys::DIFFUSE, MaterialValue::Color(Vec3::new(0.5, 0.0, 0.0)))
            .with(keys::EMISSIVE, MaterialValue::Color(Vec3::zeros()));

        let merged = top.layered_over(&base);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.color(keys::DIFFUSE), Some(Vec3::new(0.5, 0.0, 0.0)));
        assert_eq!(merged.scalar(keys::OPACITY), Some(1.0));
        assert!(merged.contains(keys::EMISSIVE));
    }

    #[test]
    fn test_texture_filenames_only_lists_unresolved_maps() {
        let material = Material::new()
            .with(keys::DIFFUSE_MAP, MaterialValue::Map("wood.png".to_string()))
            .with(keys::SPECULAR_MAP, MaterialValue::Texture(TextureHandle::default()))
            .with(keys::DIFFUSE, MaterialValue::Color(Vec3::zeros()));

        let names: Vec<&str> = material.texture_filenames().collect();
        assert_eq!(names, vec!["wood.png"]);
    }

    #[test]
    fn test_typed_getters_reject_wrong_kind() {
        let material = Material::new().with(keys::SHININESS, MaterialValue::Scalar(25.0));

        assert_eq!(material.scalar(keys::SHININESS), Some(25.0));
        assert_eq!(material.color(keys::SHININESS), None);
        assert_eq!(material.texture(keys::SHININESS), None);
    }
}
