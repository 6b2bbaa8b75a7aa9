use crate::{
    error::Result,
    graphics::{
        backend::Backend,
        command_allocator::CommandAllocator,
        device::Device,
        upload_buffer::{BufferUsage, UploadBuffer},
    },
    scene::constants::{MaterialConstants, ObjectConstants, PassConstants, Vertex},
};

/// Element counts of the per-frame upload buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameResourceDesc {
    pub pass_count: usize,
    pub object_count: usize,
    /// Zero skips the material buffer.
    pub material_count: usize,
    /// Vertices rewritten by the CPU every frame. Zero skips the buffer.
    pub dynamic_vertex_count: usize,
}

/// Everything the CPU writes while recording one frame.
///
/// The allocator cannot be reset and the constant buffers cannot be
/// rewritten until the GPU has finished the commands that reference them,
/// so each frame in flight owns its own set.
pub struct FrameResource<B: Backend> {
    allocator: CommandAllocator<B>,
    pub pass_constants: UploadBuffer<PassConstants, B>,
    pub object_constants: UploadBuffer<ObjectConstants, B>,
    pub material_constants: Option<UploadBuffer<MaterialConstants, B>>,
    pub dynamic_vertices: Option<UploadBuffer<Vertex, B>>,
    /// Fence value of the last submission recorded with this resource;
    /// zero until first use.
    fence_value: u64,
}

impl<B: Backend> FrameResource<B> {
    pub fn new(device: &Device<B>, desc: &FrameResourceDesc) -> Result<Self> {
        let allocator = device.create_command_allocator()?;
        let pass_constants = device.create_constant_buffer(desc.pass_count)?;
        let object_constants = device.create_constant_buffer(desc.object_count)?;
        let material_constants = match desc.material_count {
            0 => None,
            count => Some(device.create_constant_buffer(count)?),
        };
        let dynamic_vertices = match desc.dynamic_vertex_count {
            0 => None,
            count => Some(device.create_upload_buffer(count, BufferUsage::Upload)?),
        };

        Ok(Self {
            allocator,
            pass_constants,
            object_constants,
            material_constants,
            dynamic_vertices,
            fence_value: 0,
        })
    }

    pub fn allocator(&self) -> &CommandAllocator<B> {
        &self.allocator
    }

    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    pub fn is_submitted(&self) -> bool {
        self.fence_value != 0
    }

    pub fn stamp(&mut self, fence_value: u64) {
        debug_assert!(
            fence_value > self.fence_value,
            "fence value {fence_value} does not advance past {}",
            self.fence_value
        );
        self.fence_value = fence_value;
    }
}
