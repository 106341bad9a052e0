//! Scene assembly: one drawable part per geometry

use super::material_resolver::MaterialResolver;
use crate::assets::materials::Material;
use crate::assets::{Geometry, GeometryData};
use crate::render::api::{BackendResult, BufferHandle, ColorAttribute, MaterialUniforms, RenderBackend, VertexAttributes};

/// Color used when a geometry has no usable per-vertex color
pub const DEFAULT_VERTEX_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// One drawable unit: a vertex buffer plus the material it draws with
#[derive(Debug, Clone)]
pub struct Part {
    /// Material name the geometry referenced
    pub material_name: String,
    /// Resolved material, template merged in
    pub material: Material,
    /// Shader-ready material values
    pub uniforms: MaterialUniforms,
    /// Uploaded vertex buffer
    pub buffer: BufferHandle,
    /// Vertices in the buffer
    pub vertex_count: usize,
}

/// Build the attribute set uploaded for a geometry
///
/// Per-vertex color is used only when it covers every vertex; anything else
/// becomes a constant white value.
pub fn vertex_attributes(data: &GeometryData) -> VertexAttributes {
    let color = if !data.color.is_empty() && data.color.len() == data.position.len() {
        ColorAttribute::PerVertex {
            components: 3,
            data: data.color.clone(),
        }
    } else {
        if !data.color.is_empty() {
            log::warn!(
                "Ignoring vertex colors: {} values for {} position values",
                data.color.len(),
                data.position.len()
            );
        }
        ColorAttribute::Constant(DEFAULT_VERTEX_COLOR)
    };

    VertexAttributes {
        position: data.position.clone(),
        normal: data.normal.clone(),
        texcoord: data.texcoord.clone(),
        color,
    }
}

/// Upload every geometry and pair it with its resolved material
///
/// Parts come back in geometry order, which is also the draw order.
pub fn assemble<B>(backend: &mut B, geometries: &[Geometry], resolver: &MaterialResolver) -> BackendResult<Vec<Part>>
where
    B: RenderBackend + ?Sized,
{
    geometries
        .iter()
        .map(|geometry| {
            let attributes = vertex_attributes(&geometry.data);
            let buffer = backend.create_vertex_buffer(&attributes)?;
            let material = resolver.material_for(&geometry.material);

            Ok(Part {
                material_name: geometry.material.clone(),
                uniforms: resolver.uniforms(&material),
                material,
                buffer,
                vertex_count: attributes.vertex_count(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::materials::keys;
    use crate::config::{MaterialOverrides, MaterialTemplateConfig};
    use crate::render::headless::RecordingBackend;
    use crate::scene::material_resolver::default_template;
    use crate::scene::texture_table::TextureTable;

    fn geometry(material: &str, data: GeometryData) -> Geometry {
        Geometry {
            object: None,
            groups: Vec::new(),
            material: material.to_string(),
            data,
        }
    }

    fn triangle() -> GeometryData {
        GeometryData {
            position: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            ..GeometryData::default()
        }
    }

    fn resolver(backend: &mut RecordingBackend) -> MaterialResolver {
        let label = backend.create_solid_texture([128, 64, 0, 255]).unwrap();
        let white = backend.create_solid_texture([255, 255, 255, 255]).unwrap();
        MaterialResolver::new(
            TextureTable::new(label, white),
            default_template(&MaterialTemplateConfig::default(), white),
            MaterialOverrides::default(),
        )
    }

    #[test]
    fn test_missing_color_becomes_constant() {
        let attributes = vertex_attributes(&triangle());
        assert_eq!(attributes.color, ColorAttribute::Constant([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(attributes.vertex_count(), 3);
    }

    #[test]
    fn test_matching_color_is_per_vertex() {
        let mut data = triangle();
        data.color = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

        let attributes = vertex_attributes(&data);
        assert!(matches!(attributes.color, ColorAttribute::PerVertex { components: 3, .. }));
    }

    #[test]
    fn test_mismatched_color_becomes_constant() {
        let mut data = triangle();
        data.color = vec![1.0, 0.0, 0.0];

        let attributes = vertex_attributes(&data);
        assert_eq!(attributes.color, ColorAttribute::Constant(DEFAULT_VERTEX_COLOR));
    }

    #[test]
    fn test_parts_follow_geometry_order() {
        let mut backend = RecordingBackend::new(640, 480);
        let resolver = resolver(&mut backend);
        let geometries = vec![geometry("b", triangle()), geometry("a", triangle()), geometry("b", triangle())];

        let parts = assemble(&mut backend, &geometries, &resolver).unwrap();

        let names: Vec<&str> = parts.iter().map(|p| p.material_name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "b"]);
        assert_eq!(backend.buffer_count(), 3);
        assert_ne!(parts[0].buffer, parts[2].buffer);
        assert!(parts.iter().all(|p| p.vertex_count == 3));
        // Unknown names fall back to the template
        assert_eq!(parts[1].material.scalar(keys::SHININESS), Some(400.0));
        assert_eq!(backend.buffer(parts[0].buffer).unwrap().color, ColorAttribute::Constant(DEFAULT_VERTEX_COLOR));
    }
}
