//! Descriptor set layouts, pools and writes

use super::context::{VulkanError, VulkanResult};
use ash::{vk, Device};

/// Builder for descriptor set layouts
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
}

impl DescriptorSetLayoutBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::UNIFORM_BUFFER, stage_flags)
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(binding, vk::DescriptorType::COMBINED_IMAGE_SAMPLER, stage_flags)
    }

    fn add(mut self, binding: u32, descriptor_type: vk::DescriptorType, stage_flags: vk::ShaderStageFlags) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1)
                .stage_flags(stage_flags)
                .build(),
        );
        self
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder().bindings(&self.bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }.map_err(VulkanError::Api)?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
        })
    }
}

/// Descriptor set layout with RAII cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool for uniform buffers and combined image samplers
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
    capacity: u32,
    allocated: u32,
}

impl DescriptorPool {
    /// Create a pool for `max_sets` sets of up to one uniform buffer and
    /// `samplers_per_set` samplers each
    pub fn new(device: Device, max_sets: u32, samplers_per_set: u32) -> VulkanResult<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: max_sets,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: max_sets * samplers_per_set.max(1),
            },
        ];

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self {
            pool,
            device,
            capacity: max_sets,
            allocated: 0,
        })
    }

    /// Whether another set can be allocated
    pub fn has_capacity(&self) -> bool {
        self.allocated < self.capacity
    }

    /// Allocate one set with `layout`
    pub fn allocate(&mut self, layout: vk::DescriptorSetLayout) -> VulkanResult<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let set = unsafe { self.device.allocate_descriptor_sets(&alloc_info) }
            .map_err(VulkanError::Api)?
            .pop()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "descriptor pool returned no set".to_string(),
            })?;
        self.allocated += 1;
        Ok(set)
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

enum PendingWrite {
    Buffer(u32, vk::DescriptorBufferInfo),
    Image(u32, vk::DescriptorImageInfo),
}

/// Collects writes for one descriptor set and applies them together
pub struct DescriptorSetWriter {
    descriptor_set: vk::DescriptorSet,
    pending: Vec<PendingWrite>,
}

impl DescriptorSetWriter {
    /// Start writing `descriptor_set`
    pub fn new(descriptor_set: vk::DescriptorSet) -> Self {
        Self {
            descriptor_set,
            pending: Vec::new(),
        }
    }

    /// Write a uniform buffer range
    pub fn write_buffer(mut self, binding: u32, buffer: vk::Buffer, range: vk::DeviceSize) -> Self {
        self.pending.push(PendingWrite::Buffer(
            binding,
            vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range,
            },
        ));
        self
    }

    /// Write a shader-readable image and its sampler
    pub fn write_image(mut self, binding: u32, image_view: vk::ImageView, sampler: vk::Sampler) -> Self {
        self.pending.push(PendingWrite::Image(
            binding,
            vk::DescriptorImageInfo {
                sampler,
                image_view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
        ));
        self
    }

    /// Apply all writes
    pub fn update(self, device: &Device) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .pending
            .iter()
            .map(|pending| {
                let write = vk::WriteDescriptorSet::builder()
                    .dst_set(self.descriptor_set)
                    .dst_array_element(0);
                match pending {
                    PendingWrite::Buffer(binding, info) => write
                        .dst_binding(*binding)
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(std::slice::from_ref(info))
                        .build(),
                    PendingWrite::Image(binding, info) => write
                        .dst_binding(*binding)
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(std::slice::from_ref(info))
                        .build(),
                }
            })
            .collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}
