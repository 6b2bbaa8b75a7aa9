use glam::{Mat4, Vec3, Vec4};

use crate::frame::{DirtyCounter, DirtyTracked};

use super::constants::MaterialConstants;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(super) usize);

#[derive(Clone, Debug)]
pub struct Material {
    name: String,
    cb_index: usize,
    /// Index of the diffuse texture SRV, if textured.
    pub diffuse_srv_heap_index: Option<usize>,
    pub diffuse_albedo: Vec4,
    pub fresnel_r0: Vec3,
    pub roughness: f32,
    pub mat_transform: Mat4,
    dirty: DirtyCounter,
}

impl Material {
    pub(super) fn new(name: String, cb_index: usize, frames_in_flight: usize) -> Self {
        let defaults = MaterialConstants::default();

        Self {
            name,
            cb_index,
            diffuse_srv_heap_index: None,
            diffuse_albedo: defaults.diffuse_albedo,
            fresnel_r0: defaults.fresnel_r0,
            roughness: defaults.roughness,
            mat_transform: defaults.mat_transform,
            dirty: DirtyCounter::dirty(frames_in_flight),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cb_index(&self) -> usize {
        self.cb_index
    }

    pub fn dirty(&self) -> DirtyCounter {
        self.dirty
    }

    pub(super) fn mark_dirty(&mut self, frames_in_flight: usize) {
        self.dirty.mark(frames_in_flight);
    }
}

impl DirtyTracked for Material {
    type Constants = MaterialConstants;

    fn dirty_counter(&mut self) -> &mut DirtyCounter {
        &mut self.dirty
    }

    fn constant_buffer_index(&self) -> usize {
        self.cb_index
    }

    fn pack(&self) -> MaterialConstants {
        MaterialConstants {
            diffuse_albedo: self.diffuse_albedo,
            fresnel_r0: self.fresnel_r0,
            roughness: self.roughness,
            mat_transform: self.mat_transform,
        }
    }
}
