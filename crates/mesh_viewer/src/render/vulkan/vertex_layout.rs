//! Interleaved vertex format for the mesh pipeline

use crate::render::api::VertexAttributes;
use ash::vk;
use bytemuck::{Pod, Zeroable};
use std::mem::{offset_of, size_of};

/// One interleaved vertex as read by `mesh.vert`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    /// location 0
    pub position: [f32; 3],
    /// location 1
    pub normal: [f32; 3],
    /// location 2
    pub texcoord: [f32; 2],
    /// location 3
    pub color: [f32; 4],
}

impl MeshVertex {
    /// Interleave separate attribute arrays
    ///
    /// Missing normals and texture coordinates read as zero.
    pub fn interleave(attributes: &VertexAttributes) -> Vec<Self> {
        (0..attributes.vertex_count())
            .map(|i| Self {
                position: read(&attributes.position, i),
                normal: read(&attributes.normal, i),
                texcoord: read(&attributes.texcoord, i),
                color: attributes.color.rgba(i),
            })
            .collect()
    }
}

fn read<const N: usize>(data: &[f32], index: usize) -> [f32; N] {
    let mut out = [0.0; N];
    if let Some(values) = data.get(index * N..(index + 1) * N) {
        out.copy_from_slice(values);
    }
    out
}

/// Vulkan vertex input description for [`MeshVertex`]
pub struct VulkanVertexLayout;

impl VulkanVertexLayout {
    /// Single per-vertex binding
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<MeshVertex>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position, normal, texcoord and color attributes
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 4] {
        let attribute = |location, format, offset: usize| vk::VertexInputAttributeDescription {
            binding: 0,
            location,
            format,
            offset: offset as u32,
        };

        [
            attribute(0, vk::Format::R32G32B32_SFLOAT, offset_of!(MeshVertex, position)),
            attribute(1, vk::Format::R32G32B32_SFLOAT, offset_of!(MeshVertex, normal)),
            attribute(2, vk::Format::R32G32_SFLOAT, offset_of!(MeshVertex, texcoord)),
            attribute(3, vk::Format::R32G32B32A32_SFLOAT, offset_of!(MeshVertex, color)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::ColorAttribute;

    #[test]
    fn test_interleave_fills_missing_attributes() {
        let attributes = VertexAttributes {
            position: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            normal: Vec::new(),
            texcoord: vec![0.5, 0.25, 1.0, 0.0],
            color: ColorAttribute::Constant([1.0; 4]),
        };

        let vertices = MeshVertex::interleave(&attributes);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[1].position, [4.0, 5.0, 6.0]);
        assert_eq!(vertices[1].normal, [0.0; 3]);
        assert_eq!(vertices[1].texcoord, [1.0, 0.0]);
        assert_eq!(vertices[0].color, [1.0; 4]);
    }

    #[test]
    fn test_layout_matches_struct() {
        assert_eq!(size_of::<MeshVertex>(), 48);
        let offsets: Vec<u32> = VulkanVertexLayout::attribute_descriptions().iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 32]);
    }
}
