use std::collections::HashMap;

use crate::graphics::types::{GpuBufferHandle, IndexFormat};

/// Draw arguments of one mesh packed into a shared vertex/index buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmeshGeometry {
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
}

#[derive(Clone, Debug)]
pub struct MeshGeometry {
    pub name: String,
    pub vertex_buffer: GpuBufferHandle,
    pub index_buffer: GpuBufferHandle,
    pub vertex_stride: u32,
    pub vertex_buffer_size: u32,
    pub index_format: IndexFormat,
    pub index_buffer_size: u32,
    pub draw_args: HashMap<String, SubmeshGeometry>,
}

impl MeshGeometry {
    pub fn new(
        name: impl Into<String>,
        vertex_buffer: GpuBufferHandle,
        index_buffer: GpuBufferHandle,
        vertex_stride: u32,
        index_format: IndexFormat,
    ) -> Self {
        Self {
            name: name.into(),
            vertex_buffer,
            index_buffer,
            vertex_stride,
            vertex_buffer_size: 0,
            index_format,
            index_buffer_size: 0,
            draw_args: HashMap::new(),
        }
    }

    pub fn with_submesh(mut self, name: impl Into<String>, submesh: SubmeshGeometry) -> Self {
        self.draw_args.insert(name.into(), submesh);
        self
    }

    pub fn with_sizes(mut self, vertex_buffer_size: u32, index_buffer_size: u32) -> Self {
        self.vertex_buffer_size = vertex_buffer_size;
        self.index_buffer_size = index_buffer_size;
        self
    }

    pub fn submesh(&self, name: &str) -> Option<&SubmeshGeometry> {
        self.draw_args.get(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(usize);

/// Owns every mesh; render items refer to meshes by [`GeometryId`].
#[derive(Debug, Default)]
pub struct GeometryRegistry {
    meshes: Vec<MeshGeometry>,
    by_name: HashMap<String, GeometryId>,
}

impl GeometryRegistry {
    pub fn insert(&mut self, mesh: MeshGeometry) -> GeometryId {
        let id = GeometryId(self.meshes.len());
        self.by_name.insert(mesh.name.clone(), id);
        self.meshes.push(mesh);
        id
    }

    pub fn get(&self, id: GeometryId) -> &MeshGeometry {
        &self.meshes[id.0]
    }

    pub fn find(&self, name: &str) -> Option<GeometryId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{GeometryRegistry, MeshGeometry, SubmeshGeometry};
    use crate::graphics::types::{GpuBufferHandle, IndexFormat};

    #[test]
    fn lookup_by_name_and_submesh() {
        let mut registry = GeometryRegistry::default();
        let id = registry.insert(
            MeshGeometry::new(
                "shapes",
                GpuBufferHandle(1),
                GpuBufferHandle(2),
                32,
                IndexFormat::U16,
            )
            .with_submesh(
                "box",
                SubmeshGeometry {
                    index_count: 36,
                    start_index: 0,
                    base_vertex: 0,
                },
            ),
        );

        assert_eq!(registry.find("shapes"), Some(id));
        assert_eq!(registry.get(id).submesh("box").unwrap().index_count, 36);
        assert!(registry.get(id).submesh("sphere").is_none());
        assert_eq!(registry.len(), 1);
    }
}
