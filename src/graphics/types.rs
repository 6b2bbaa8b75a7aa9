#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexFormat {
    #[default]
    U16,
    U32,
}

impl IndexFormat {
    pub const fn byte_size(self) -> usize {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuBufferHandle(pub u64);

/// Root parameter slots shared by the draw payloads.
pub mod root_slot {
    pub const OBJECT: u32 = 0;
    pub const PASS: u32 = 1;
    pub const MATERIAL: u32 = 2;
}
