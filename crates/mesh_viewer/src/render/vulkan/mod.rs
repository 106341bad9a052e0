//! Vulkan rendering backend
//!
//! Low-level Vulkan wrappers with RAII cleanup plus [`VulkanBackend`], the
//! [`RenderBackend`](crate::render::RenderBackend) implementation that draws
//! into a GLFW window.

pub mod backend;
pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor_set;
pub mod framebuffer;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod texture;
pub mod vertex_layout;
pub mod window;

pub use backend::VulkanBackend;
pub use buffer::{Buffer, UniformBuffer, VertexBuffer};
pub use commands::{CommandPool, CommandRecorder};
pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult};
pub use descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
pub use framebuffer::{DepthBuffer, Framebuffer};
pub use render_pass::RenderPass;
pub use shader::{GraphicsPipeline, PipelineLayout, ShaderModule};
pub use swapchain::Swapchain;
pub use sync::{Fence, FrameSync, Semaphore};
pub use texture::Texture;
pub use vertex_layout::{MeshVertex, VulkanVertexLayout};
pub use window::{Window, WindowError};
