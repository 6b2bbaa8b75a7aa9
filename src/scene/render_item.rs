use glam::Mat4;

use crate::{
    frame::{DirtyCounter, DirtyTracked},
    graphics::types::PrimitiveTopology,
};

use super::{
    constants::ObjectConstants,
    geometry::{GeometryId, SubmeshGeometry},
    material::MaterialId,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderItemId(pub(super) usize);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderLayer {
    #[default]
    Opaque,
    AlphaTested,
    Transparent,
}

#[derive(Clone, Debug)]
pub struct RenderItem {
    world: Mat4,
    tex_transform: Mat4,
    cb_index: usize,
    dirty: DirtyCounter,
    pub geometry: GeometryId,
    pub submesh: SubmeshGeometry,
    pub material: Option<MaterialId>,
    pub topology: PrimitiveTopology,
    pub layer: RenderLayer,
    /// Vertices come from the current frame resource instead of the mesh.
    pub dynamic_vertices: bool,
}

#[derive(Clone, Debug)]
pub struct RenderItemDesc {
    pub geometry: GeometryId,
    pub submesh: String,
    pub world: Mat4,
    pub tex_transform: Mat4,
    pub material: Option<MaterialId>,
    pub topology: PrimitiveTopology,
    pub layer: RenderLayer,
    pub dynamic_vertices: bool,
}

impl RenderItemDesc {
    pub fn new(geometry: GeometryId, submesh: impl Into<String>) -> Self {
        Self {
            geometry,
            submesh: submesh.into(),
            world: Mat4::IDENTITY,
            tex_transform: Mat4::IDENTITY,
            material: None,
            topology: PrimitiveTopology::TriangleList,
            layer: RenderLayer::Opaque,
            dynamic_vertices: false,
        }
    }

    pub fn with_world(mut self, world: Mat4) -> Self {
        self.world = world;
        self
    }

    pub fn with_tex_transform(mut self, tex_transform: Mat4) -> Self {
        self.tex_transform = tex_transform;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_layer(mut self, layer: RenderLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_dynamic_vertices(mut self) -> Self {
        self.dynamic_vertices = true;
        self
    }
}

impl RenderItem {
    pub(super) fn new(
        desc: RenderItemDesc,
        submesh: SubmeshGeometry,
        cb_index: usize,
        frames_in_flight: usize,
    ) -> Self {
        Self {
            world: desc.world,
            tex_transform: desc.tex_transform,
            cb_index,
            dirty: DirtyCounter::dirty(frames_in_flight),
            geometry: desc.geometry,
            submesh,
            material: desc.material,
            topology: desc.topology,
            layer: desc.layer,
            dynamic_vertices: desc.dynamic_vertices,
        }
    }

    pub fn world(&self) -> Mat4 {
        self.world
    }

    pub fn tex_transform(&self) -> Mat4 {
        self.tex_transform
    }

    pub fn cb_index(&self) -> usize {
        self.cb_index
    }

    pub fn dirty(&self) -> DirtyCounter {
        self.dirty
    }

    pub(super) fn set_world(&mut self, world: Mat4, frames_in_flight: usize) {
        self.world = world;
        self.dirty.mark(frames_in_flight);
    }

    pub(super) fn set_tex_transform(&mut self, tex_transform: Mat4, frames_in_flight: usize) {
        self.tex_transform = tex_transform;
        self.dirty.mark(frames_in_flight);
    }

    pub(super) fn mark_dirty(&mut self, frames_in_flight: usize) {
        self.dirty.mark(frames_in_flight);
    }
}

impl DirtyTracked for RenderItem {
    type Constants = ObjectConstants;

    fn dirty_counter(&mut self) -> &mut DirtyCounter {
        &mut self.dirty
    }

    fn constant_buffer_index(&self) -> usize {
        self.cb_index
    }

    fn pack(&self) -> ObjectConstants {
        ObjectConstants {
            world: self.world,
            tex_transform: self.tex_transform,
        }
    }
}
