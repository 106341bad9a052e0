//! Vulkan implementation of [`RenderBackend`]
//!
//! Descriptor set 0 holds the shared uniform block and is updated once per
//! frame in flight. Set 1 holds a material block plus the diffuse and
//! specular samplers; sets are cached per distinct material so parts with
//! identical materials reuse one set. The world matrix travels as a vertex
//! push constant.

use super::buffer::{UniformBuffer, VertexBuffer};
use super::commands::{CommandPool, CommandRecorder};
use super::context::{VulkanContext, VulkanError, VulkanResult};
use super::descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
use super::framebuffer::{DepthBuffer, Framebuffer};
use super::render_pass::RenderPass;
use super::shader::{GraphicsPipeline, PipelineLayout, ShaderModule};
use super::sync::{FrameSync, Semaphore};
use super::texture::Texture;
use super::vertex_layout::MeshVertex;
use super::window::Window;
use crate::assets::ImageData;
use crate::config::ViewerConfig;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::api::{
    BackendResult, BufferHandle, FrameStatus, MaterialUniforms, RenderBackend, SharedUniforms, TextureHandle,
    VertexAttributes,
};
use crate::render::RenderError;
use ash::vk;
use bytemuck::{Pod, Zeroable};
use slotmap::SlotMap;
use std::collections::HashMap;

const MATERIAL_SETS_PER_POOL: u32 = 64;
const WORLD_PUSH_CONSTANT_SIZE: u32 = 64;

/// Shared uniform block, std140
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct SharedBlock {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    light_direction: [f32; 4],
    view_world_position: [f32; 4],
}

impl From<&SharedUniforms> for SharedBlock {
    fn from(uniforms: &SharedUniforms) -> Self {
        Self {
            view: uniforms.view.into(),
            projection: uniforms.projection.into(),
            light_direction: extend(uniforms.light_direction, 0.0),
            view_world_position: extend(uniforms.view_world_position, 1.0),
        }
    }
}

/// Material uniform block, std140
///
/// `specular.w` carries the shininess and `params.x` the opacity.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
struct MaterialBlock {
    diffuse: [f32; 4],
    ambient: [f32; 4],
    emissive: [f32; 4],
    specular: [f32; 4],
    params: [f32; 4],
}

impl From<&MaterialUniforms> for MaterialBlock {
    fn from(material: &MaterialUniforms) -> Self {
        Self {
            diffuse: extend(material.diffuse, 1.0),
            ambient: extend(material.ambient, 1.0),
            emissive: extend(material.emissive, 1.0),
            specular: extend(material.specular, material.shininess),
            params: [material.opacity, 0.0, 0.0, 0.0],
        }
    }
}

fn extend(v: Vec3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

/// Bit pattern of a material block plus its textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MaterialKey {
    block: [u32; 20],
    diffuse_map: TextureHandle,
    specular_map: TextureHandle,
}

impl MaterialKey {
    fn new(block: &MaterialBlock, material: &MaterialUniforms) -> Self {
        Self {
            block: bytemuck::cast(*block),
            diffuse_map: material.diffuse_map,
            specular_map: material.specular_map,
        }
    }
}

struct MaterialSet {
    _uniforms: UniformBuffer<MaterialBlock>,
    descriptor_set: vk::DescriptorSet,
}

struct FrameResources {
    recorder: CommandRecorder,
    sync: FrameSync,
    shared_uniforms: UniformBuffer<SharedBlock>,
    shared_set: vk::DescriptorSet,
}

/// Swapchain-sized resources, rebuilt on resize
struct SurfaceResources {
    framebuffers: Vec<Framebuffer>,
    _depth_buffer: DepthBuffer,
    render_finished: Vec<Semaphore>,
}

impl SurfaceResources {
    fn new(context: &VulkanContext, render_pass: &RenderPass) -> VulkanResult<Self> {
        let device = context.raw_device();
        let swapchain = context.swapchain()?;
        let extent = swapchain.extent();

        let depth_buffer = DepthBuffer::new(device.clone(), &context.physical_device, extent)?;
        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass.handle(),
                    &[view, depth_buffer.image_view()],
                    extent,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;
        let render_finished = (0..swapchain.image_count())
            .map(|_| Semaphore::new(device.clone()))
            .collect::<VulkanResult<Vec<_>>>()?;

        Ok(Self {
            framebuffers,
            _depth_buffer: depth_buffer,
            render_finished,
        })
    }
}

/// GLFW window plus Vulkan renderer
///
/// Fields drop in declaration order, so every GPU resource is released
/// before the context and the window goes last.
pub struct VulkanBackend {
    material_sets: HashMap<MaterialKey, MaterialSet>,
    material_pools: Vec<DescriptorPool>,
    frames: Vec<FrameResources>,
    _shared_pool: DescriptorPool,
    buffers: SlotMap<BufferHandle, VertexBuffer>,
    textures: SlotMap<TextureHandle, Texture>,
    depth_pipeline: GraphicsPipeline,
    overlay_pipeline: GraphicsPipeline,
    pipeline_layout: PipelineLayout,
    material_layout: DescriptorSetLayout,
    _shared_layout: DescriptorSetLayout,
    surface: Option<SurfaceResources>,
    render_pass: RenderPass,
    command_pool: CommandPool,
    context: VulkanContext,
    window: Window,

    surface_size: (u32, u32),
    surface_dirty: bool,
    clear_color: [f32; 4],
    current_frame: usize,
    image_index: Option<u32>,
    depth_test: bool,
    bound_pipeline: Option<vk::Pipeline>,
}

impl VulkanBackend {
    /// Open a window and initialize Vulkan from `config`
    pub fn new(config: &ViewerConfig) -> BackendResult<Self> {
        let renderer = &config.renderer;
        let mut window = Window::new(&config.window.title, config.window.width, config.window.height)
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;
        let context = VulkanContext::new(&mut window, &renderer.application_name, renderer.validation_enabled())?;
        let device = context.raw_device();

        let render_pass = RenderPass::new_forward_pass(device.clone(), context.swapchain()?.format().format)?;
        let surface = SurfaceResources::new(&context, &render_pass)?;
        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;

        let shared_layout = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .build(&device)?;
        let material_layout = DescriptorSetLayoutBuilder::new()
            .add_uniform_buffer(0, vk::ShaderStageFlags::FRAGMENT)
            .add_combined_image_sampler(1, vk::ShaderStageFlags::FRAGMENT)
            .add_combined_image_sampler(2, vk::ShaderStageFlags::FRAGMENT)
            .build(&device)?;
        let pipeline_layout = PipelineLayout::new(
            device.clone(),
            &[shared_layout.handle(), material_layout.handle()],
            WORLD_PUSH_CONSTANT_SIZE,
        )?;

        let vertex_shader = ShaderModule::from_file(device.clone(), &renderer.shaders.vertex_shader_path)?;
        let fragment_shader = ShaderModule::from_file(device.clone(), &renderer.shaders.fragment_shader_path)?;
        let depth_pipeline = GraphicsPipeline::new(
            device.clone(),
            render_pass.handle(),
            &pipeline_layout,
            &vertex_shader,
            &fragment_shader,
            true,
        )?;
        let overlay_pipeline = GraphicsPipeline::new(
            device.clone(),
            render_pass.handle(),
            &pipeline_layout,
            &vertex_shader,
            &fragment_shader,
            false,
        )?;

        let frame_count = renderer.max_frames_in_flight as u32;
        let mut shared_pool = DescriptorPool::new(device.clone(), frame_count, 0)?;
        let command_buffers = command_pool.allocate_command_buffers(frame_count)?;
        let frames = command_buffers
            .into_iter()
            .map(|command_buffer| {
                let shared_uniforms = UniformBuffer::new(device.clone(), &context.physical_device)?;
                let shared_set = shared_pool.allocate(shared_layout.handle())?;
                DescriptorSetWriter::new(shared_set)
                    .write_buffer(0, shared_uniforms.handle(), shared_uniforms.range())
                    .update(&device);
                Ok::<_, VulkanError>(FrameResources {
                    recorder: CommandRecorder::new(device.clone(), command_buffer),
                    sync: FrameSync::new(device.clone())?,
                    shared_uniforms,
                    shared_set,
                })
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let surface_size = window.framebuffer_size();
        log::info!(
            "Vulkan backend ready: {}x{}, {} frames in flight",
            surface_size.0,
            surface_size.1,
            frames.len()
        );

        Ok(Self {
            material_sets: HashMap::new(),
            material_pools: Vec::new(),
            frames,
            _shared_pool: shared_pool,
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            depth_pipeline,
            overlay_pipeline,
            pipeline_layout,
            material_layout,
            _shared_layout: shared_layout,
            surface: Some(surface),
            render_pass,
            command_pool,
            context,
            window,
            surface_size,
            surface_dirty: false,
            clear_color: renderer.clear_color,
            current_frame: 0,
            image_index: None,
            depth_test: true,
            bound_pipeline: None,
        })
    }

    /// Poll window events
    pub fn poll_events(&mut self) {
        self.window.process_events();
    }

    /// Whether the window was asked to close
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    fn recreate_surface(&mut self) -> VulkanResult<()> {
        let (width, height) = self.surface_size;
        log::debug!("Recreating swapchain at {}x{}", width, height);

        self.context.wait_idle()?;
        self.surface = None;
        self.context.recreate_swapchain(vk::Extent2D { width, height })?;
        self.surface = Some(SurfaceResources::new(&self.context, &self.render_pass)?);
        self.surface_dirty = false;
        Ok(())
    }

    fn surface_resources(&self) -> VulkanResult<&SurfaceResources> {
        self.surface.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "surface resources missing".to_string(),
        })
    }

    fn recording_frame(&mut self, operation: &str) -> BackendResult<&mut FrameResources> {
        if self.image_index.is_none() {
            return Err(RenderError::RenderingFailed(format!("{} called outside of a frame", operation)));
        }
        Ok(&mut self.frames[self.current_frame])
    }

    fn selected_pipeline(&self) -> vk::Pipeline {
        if self.depth_test {
            self.depth_pipeline.handle()
        } else {
            self.overlay_pipeline.handle()
        }
    }

    fn bind_selected_pipeline(&mut self) {
        let pipeline = self.selected_pipeline();
        if self.bound_pipeline != Some(pipeline) {
            self.frames[self.current_frame].recorder.bind_pipeline(pipeline);
            self.bound_pipeline = Some(pipeline);
        }
    }

    fn material_set(&mut self, material: &MaterialUniforms) -> BackendResult<vk::DescriptorSet> {
        let block = MaterialBlock::from(material);
        let key = MaterialKey::new(&block, material);
        if let Some(set) = self.material_sets.get(&key) {
            return Ok(set.descriptor_set);
        }

        let diffuse = self
            .textures
            .get(material.diffuse_map)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{:?}", material.diffuse_map)))?;
        let specular = self
            .textures
            .get(material.specular_map)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{:?}", material.specular_map)))?;

        let device = self.context.raw_device();
        if !self.material_pools.last().is_some_and(DescriptorPool::has_capacity) {
            self.material_pools
                .push(DescriptorPool::new(device.clone(), MATERIAL_SETS_PER_POOL, 2)?);
        }
        let pool = self
            .material_pools
            .last_mut()
            .ok_or_else(|| RenderError::ResourceCreationFailed("no material descriptor pool".to_string()))?;
        let descriptor_set = pool.allocate(self.material_layout.handle())?;

        let uniforms = UniformBuffer::new(device.clone(), &self.context.physical_device)?;
        uniforms.update(&block)?;
        DescriptorSetWriter::new(descriptor_set)
            .write_buffer(0, uniforms.handle(), uniforms.range())
            .write_image(1, diffuse.image_view(), diffuse.sampler())
            .write_image(2, specular.image_view(), specular.sampler())
            .update(&device);

        log::debug!("Created material descriptor set #{}", self.material_sets.len() + 1);
        self.material_sets.insert(
            key,
            MaterialSet {
                _uniforms: uniforms,
                descriptor_set,
            },
        );
        Ok(descriptor_set)
    }

    fn submit_and_present(&mut self, image_index: u32) -> VulkanResult<()> {
        let device = self.context.raw_device();
        let frame = &mut self.frames[self.current_frame];
        frame.recorder.end()?;

        let surface = self.surface_resources()?;
        let render_finished = surface
            .render_finished
            .get(image_index as usize)
            .map(Semaphore::handle)
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: format!("no semaphore for swapchain image {}", image_index),
            })?;

        let frame = &self.frames[self.current_frame];
        let wait_semaphores = [frame.sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [frame.recorder.handle()];
        let signal_semaphores = [render_finished];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device
                .queue_submit(
                    self.context.graphics_queue(),
                    &[submit_info.build()],
                    frame.sync.in_flight.handle(),
                )
                .map_err(VulkanError::Api)?;
        }

        let swapchains = [self.context.swapchain()?.handle()];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&signal_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.context
                .device
                .swapchain_loader
                .queue_present(self.context.present_queue(), &present_info)
        };
        match result {
            Ok(false) => {}
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => self.surface_dirty = true,
            Err(e) => return Err(VulkanError::Api(e)),
        }

        self.current_frame = (self.current_frame + 1) % self.frames.len();
        Ok(())
    }
}

impl RenderBackend for VulkanBackend {
    fn create_texture(&mut self, image: &ImageData) -> BackendResult<TextureHandle> {
        let texture = Texture::from_image_data(
            self.context.raw_device(),
            &self.context.physical_device,
            &self.command_pool,
            self.context.graphics_queue(),
            image,
        )?;
        Ok(self.textures.insert(texture))
    }

    fn create_vertex_buffer(&mut self, attributes: &VertexAttributes) -> BackendResult<BufferHandle> {
        let vertices = MeshVertex::interleave(attributes);
        if vertices.is_empty() {
            return Err(RenderError::ResourceCreationFailed("empty vertex buffer".to_string()));
        }
        let buffer = VertexBuffer::new(self.context.raw_device(), &self.context.physical_device, &vertices)?;
        log::debug!("Uploaded vertex buffer with {} vertices", buffer.vertex_count());
        Ok(self.buffers.insert(buffer))
    }

    fn display_size(&self) -> (u32, u32) {
        self.window.framebuffer_size()
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn resize_surface(&mut self, width: u32, height: u32) -> BackendResult<()> {
        if self.surface_size != (width, height) {
            self.surface_size = (width, height);
            self.surface_dirty = true;
        }
        Ok(())
    }

    fn begin_frame(&mut self) -> BackendResult<FrameStatus> {
        if self.image_index.is_some() {
            return Err(RenderError::RenderingFailed("begin_frame called twice".to_string()));
        }
        let (width, height) = self.surface_size;
        if width == 0 || height == 0 {
            return Ok(FrameStatus::Skipped);
        }
        if self.surface_dirty {
            self.recreate_surface()?;
        }

        let frame = &self.frames[self.current_frame];
        frame.sync.in_flight.wait(u64::MAX)?;

        let acquired = unsafe {
            self.context.device.swapchain_loader.acquire_next_image(
                self.context.swapchain()?.handle(),
                u64::MAX,
                frame.sync.image_available.handle(),
                vk::Fence::null(),
            )
        };
        let image_index = match acquired {
            Ok((index, _suboptimal)) => index,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                self.surface_dirty = true;
                return Ok(FrameStatus::Skipped);
            }
            Err(e) => return Err(VulkanError::Api(e).into()),
        };
        frame.sync.in_flight.reset()?;

        let extent = self.context.swapchain()?.extent();
        let framebuffer = self
            .surface_resources()?
            .framebuffers
            .get(image_index as usize)
            .map(Framebuffer::handle)
            .ok_or_else(|| RenderError::RenderingFailed(format!("no framebuffer for image {}", image_index)))?;
        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];

        let render_pass = self.render_pass.handle();
        let recorder = &mut self.frames[self.current_frame].recorder;
        recorder.begin()?;
        recorder.begin_render_pass(
            render_pass,
            framebuffer,
            vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            },
            &clear_values,
        )?;

        self.image_index = Some(image_index);
        self.bound_pipeline = None;
        Ok(FrameStatus::Ready)
    }

    fn set_viewport(&mut self, x: u32, y: u32, width: u32, height: u32) {
        match self.recording_frame("set_viewport") {
            Ok(frame) => frame.recorder.set_viewport(x, y, width, height),
            Err(e) => log::warn!("{}", e),
        }
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        if self.image_index.is_some() {
            self.bind_selected_pipeline();
        }
    }

    fn set_shared_uniforms(&mut self, uniforms: &SharedUniforms) -> BackendResult<()> {
        let layout = self.pipeline_layout.handle();
        let frame = self.recording_frame("set_shared_uniforms")?;
        frame.shared_uniforms.update(&SharedBlock::from(uniforms))?;
        let set = frame.shared_set;
        frame.recorder.bind_descriptor_set(layout, 0, set);
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferHandle) -> BackendResult<()> {
        let handle = self
            .buffers
            .get(buffer)
            .map(VertexBuffer::handle)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{:?}", buffer)))?;
        self.recording_frame("bind_vertex_buffer")?
            .recorder
            .bind_vertex_buffer(handle);
        Ok(())
    }

    fn set_part_uniforms(&mut self, world: &Mat4, material: &MaterialUniforms) -> BackendResult<()> {
        self.recording_frame("set_part_uniforms")?;
        self.bind_selected_pipeline();
        let set = self.material_set(material)?;

        let layout = self.pipeline_layout.handle();
        let recorder = &mut self.frames[self.current_frame].recorder;
        recorder.bind_descriptor_set(layout, 1, set);
        recorder.push_constants(layout, vk::ShaderStageFlags::VERTEX, bytemuck::cast_slice(world.as_slice()));
        Ok(())
    }

    fn draw(&mut self, buffer: BufferHandle) -> BackendResult<()> {
        let vertex_count = self
            .buffers
            .get(buffer)
            .map(VertexBuffer::vertex_count)
            .ok_or_else(|| RenderError::InvalidHandle(format!("{:?}", buffer)))?;
        self.recording_frame("draw")?;
        self.bind_selected_pipeline();
        self.frames[self.current_frame].recorder.draw(vertex_count);
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        let image_index = self
            .image_index
            .take()
            .ok_or_else(|| RenderError::RenderingFailed("end_frame called outside of a frame".to_string()))?;
        self.submit_and_present(image_index)?;
        Ok(())
    }
}

impl Drop for VulkanBackend {
    fn drop(&mut self) {
        if let Err(e) = self.context.wait_idle() {
            log::error!("Failed to wait for device idle during shutdown: {}", e);
        }
        log::debug!(
            "Releasing {} textures, {} buffers, {} material sets",
            self.textures.len(),
            self.buffers.len(),
            self.material_sets.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material() -> MaterialUniforms {
        MaterialUniforms {
            diffuse: Vec3::new(0.5, 0.25, 1.0),
            diffuse_map: TextureHandle::default(),
            ambient: Vec3::zeros(),
            emissive: Vec3::zeros(),
            specular: Vec3::new(1.0, 1.0, 1.0),
            specular_map: TextureHandle::default(),
            shininess: 25.0,
            opacity: 0.75,
        }
    }

    #[test]
    fn test_gpu_blocks_have_std140_sizes() {
        assert_eq!(std::mem::size_of::<SharedBlock>(), 160);
        assert_eq!(std::mem::size_of::<MaterialBlock>(), 80);
    }

    #[test]
    fn test_material_block_packs_shininess_and_opacity() {
        let block = MaterialBlock::from(&material());
        assert_eq!(block.diffuse, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(block.specular, [1.0, 1.0, 1.0, 25.0]);
        assert_eq!(block.params[0], 0.75);
    }

    #[test]
    fn test_identical_materials_share_a_key() {
        let a = material();
        let mut b = material();
        assert_eq!(
            MaterialKey::new(&MaterialBlock::from(&a), &a),
            MaterialKey::new(&MaterialBlock::from(&b), &b)
        );

        b.opacity = 0.5;
        assert_ne!(
            MaterialKey::new(&MaterialBlock::from(&a), &a),
            MaterialKey::new(&MaterialBlock::from(&b), &b)
        );
    }

    #[test]
    fn test_shared_block_is_column_major() {
        let uniforms = SharedUniforms {
            light_direction: Vec3::y(),
            view: Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0)),
            projection: Mat4::identity(),
            view_world_position: Vec3::new(0.0, 0.0, 4.0),
        };
        let block = SharedBlock::from(&uniforms);
        assert_eq!(block.view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(block.light_direction, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(block.view_world_position, [0.0, 0.0, 4.0, 1.0]);
    }
}
