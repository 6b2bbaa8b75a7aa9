pub mod constants;
mod geometry;
mod material;
mod render_item;

use std::collections::HashMap;

use glam::Mat4;
use tracing::{debug, trace};

use crate::{
    error::{Error, Result},
    frame::{upload_dirty, FrameResource, FrameResourceDesc},
    graphics::backend::Backend,
};

pub use geometry::*;
pub use material::*;
pub use render_item::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub objects: usize,
    pub materials: usize,
}

/// Drawable items and materials of one application, with the geometry they
/// reference.
///
/// Every entity carries a dirty counter armed with the ring length the scene
/// was created for. [`Scene::upload`] refreshes stale entities in whichever
/// frame resource is current.
#[derive(Debug)]
pub struct Scene {
    frames_in_flight: usize,
    object_capacity: usize,
    material_capacity: usize,

    geometries: GeometryRegistry,
    materials: Vec<Material>,
    material_names: HashMap<String, MaterialId>,
    items: Vec<RenderItem>,
}

impl Scene {
    pub fn new(frames_in_flight: usize, object_capacity: usize, material_capacity: usize) -> Self {
        Self {
            frames_in_flight,
            object_capacity,
            material_capacity,
            geometries: GeometryRegistry::default(),
            materials: Vec::new(),
            material_names: HashMap::new(),
            items: Vec::new(),
        }
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    pub fn object_capacity(&self) -> usize {
        self.object_capacity
    }

    pub fn material_capacity(&self) -> usize {
        self.material_capacity
    }

    /// Sizes per-frame buffers to hold every entity this scene can own.
    pub fn frame_resource_desc(&self, pass_count: usize) -> FrameResourceDesc {
        FrameResourceDesc {
            pass_count,
            object_count: self.object_capacity,
            material_count: self.material_capacity,
            dynamic_vertex_count: 0,
        }
    }

    pub fn geometries(&self) -> &GeometryRegistry {
        &self.geometries
    }

    pub fn add_geometry(&mut self, mesh: MeshGeometry) -> GeometryId {
        debug!(name = %mesh.name, submeshes = mesh.draw_args.len(), "geometry registered");
        self.geometries.insert(mesh)
    }

    pub fn add_material(&mut self, name: impl Into<String>) -> Result<MaterialId> {
        let name = name.into();

        if self.material_names.contains_key(&name) {
            return Err(Error::Config(format!("material `{name}` already exists")));
        }

        if self.materials.len() >= self.material_capacity {
            return Err(Error::CapacityExceeded {
                kind: "material",
                capacity: self.material_capacity,
            });
        }

        let id = MaterialId(self.materials.len());
        self.materials
            .push(Material::new(name.clone(), id.0, self.frames_in_flight));
        self.material_names.insert(name, id);

        Ok(id)
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn find_material(&self, name: &str) -> Option<MaterialId> {
        self.material_names.get(name).copied()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn update_material(&mut self, id: MaterialId, f: impl FnOnce(&mut Material)) {
        let material = &mut self.materials[id.0];
        f(material);
        material.mark_dirty(self.frames_in_flight);
    }

    pub fn add_render_item(&mut self, desc: RenderItemDesc) -> Result<RenderItemId> {
        if self.items.len() >= self.object_capacity {
            return Err(Error::CapacityExceeded {
                kind: "render item",
                capacity: self.object_capacity,
            });
        }

        let mesh = self.geometries.get(desc.geometry);
        let submesh = *mesh
            .submesh(&desc.submesh)
            .ok_or_else(|| Error::UnknownSubmesh {
                geometry: mesh.name.clone(),
                submesh: desc.submesh.clone(),
            })?;

        let id = RenderItemId(self.items.len());
        self.items
            .push(RenderItem::new(desc, submesh, id.0, self.frames_in_flight));

        Ok(id)
    }

    pub fn item(&self, id: RenderItemId) -> &RenderItem {
        &self.items[id.0]
    }

    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn items_in_layer(&self, layer: RenderLayer) -> impl Iterator<Item = &RenderItem> {
        self.items.iter().filter(move |item| item.layer == layer)
    }

    pub fn set_world(&mut self, id: RenderItemId, world: Mat4) {
        self.items[id.0].set_world(world, self.frames_in_flight);
    }

    pub fn set_tex_transform(&mut self, id: RenderItemId, tex_transform: Mat4) {
        self.items[id.0].set_tex_transform(tex_transform, self.frames_in_flight);
    }

    /// Re-arms every entity, e.g. after the frame resources were recreated.
    pub fn mark_all_dirty(&mut self) {
        for item in &mut self.items {
            item.mark_dirty(self.frames_in_flight);
        }

        for material in &mut self.materials {
            material.mark_dirty(self.frames_in_flight);
        }
    }

    /// Copies stale object and material constants into `frame`.
    ///
    /// Must only be called on the frame resource handed out by the last ring
    /// advance, which the GPU is guaranteed to be done with.
    pub fn upload<B: Backend>(&mut self, frame: &mut FrameResource<B>) -> UploadStats {
        let objects = upload_dirty(self.items.iter_mut(), &mut frame.object_constants);

        let materials = match frame.material_constants.as_mut() {
            Some(buffer) => upload_dirty(self.materials.iter_mut(), buffer),
            None => {
                debug_assert!(
                    self.materials.is_empty(),
                    "frame resource has no material buffer"
                );
                0
            }
        };

        trace!(objects, materials, "scene constants uploaded");

        UploadStats { objects, materials }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3, Vec4};

    use super::{MeshGeometry, RenderItemDesc, RenderLayer, Scene, SubmeshGeometry};
    use crate::{
        frame::FrameRing,
        graphics::{
            device::Device,
            soft::{SoftBackend, SoftDevice},
            types::{GpuBufferHandle, IndexFormat},
        },
        Error,
    };

    const FRAMES: usize = 3;

    fn scene() -> Scene {
        let mut scene = Scene::new(FRAMES, 4, 2);
        scene.add_geometry(
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
        scene
    }

    fn ring(scene: &Scene) -> (Device<SoftBackend>, FrameRing<SoftBackend>) {
        let device = SoftDevice::manual().unwrap().into_device();
        let fence = device.create_fence().unwrap();
        let ring = FrameRing::new(
            &device,
            fence,
            scene.frames_in_flight(),
            &scene.frame_resource_desc(1),
            None,
        )
        .unwrap();
        (device, ring)
    }

    #[test]
    fn changed_item_reaches_every_frame_resource() {
        let mut scene = scene();
        let shapes = scene.geometries().find("shapes").unwrap();
        let item = scene
            .add_render_item(RenderItemDesc::new(shapes, "box"))
            .unwrap();
        let (_device, mut ring) = ring(&scene);

        for _ in 0..FRAMES {
            scene.upload(ring.advance().unwrap());
        }
        assert!(!scene.item(item).dirty().is_dirty());

        let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        scene.set_world(item, world);
        assert_eq!(scene.item(item).dirty().remaining(), FRAMES);

        for _ in 0..FRAMES {
            let stats = scene.upload(ring.advance().unwrap());
            assert_eq!(stats.objects, 1);
        }

        assert_eq!(scene.item(item).dirty().remaining(), 0);
        for frame in ring.iter() {
            assert_eq!(frame.object_constants.read(item.0).world, world);
        }
    }

    #[test]
    fn repeated_changes_do_not_stack() {
        let mut scene = scene();
        let shapes = scene.geometries().find("shapes").unwrap();
        let item = scene
            .add_render_item(RenderItemDesc::new(shapes, "box"))
            .unwrap();

        scene.set_world(item, Mat4::from_scale(Vec3::splat(2.0)));
        scene.set_world(item, Mat4::from_scale(Vec3::splat(3.0)));

        assert_eq!(scene.item(item).dirty().remaining(), FRAMES);
    }

    #[test]
    fn unchanged_item_is_uploaded_once_per_frame_resource() {
        let mut scene = scene();
        let shapes = scene.geometries().find("shapes").unwrap();
        scene
            .add_render_item(RenderItemDesc::new(shapes, "box"))
            .unwrap();
        let (_device, mut ring) = ring(&scene);

        for _ in 0..FRAMES * 4 {
            scene.upload(ring.advance().unwrap());
        }

        for frame in ring.iter() {
            assert_eq!(frame.object_constants.copy_count(), 1);
        }
    }

    #[test]
    fn material_changes_propagate() {
        let mut scene = scene();
        let grass = scene.add_material("grass").unwrap();
        let (_device, mut ring) = ring(&scene);

        for _ in 0..FRAMES {
            assert_eq!(scene.upload(ring.advance().unwrap()).materials, 1);
        }

        let albedo = Vec4::new(0.2, 0.6, 0.2, 1.0);
        scene.update_material(grass, |material| material.diffuse_albedo = albedo);

        for _ in 0..FRAMES {
            scene.upload(ring.advance().unwrap());
        }

        for frame in ring.iter() {
            let buffer = frame.material_constants.as_ref().unwrap();
            assert_eq!(buffer.read(0).diffuse_albedo, albedo);
        }
        assert_eq!(scene.find_material("grass"), Some(grass));
    }

    #[test]
    fn mark_all_dirty_rearms_everything() {
        let mut scene = scene();
        let shapes = scene.geometries().find("shapes").unwrap();
        let item = scene
            .add_render_item(RenderItemDesc::new(shapes, "box"))
            .unwrap();
        let water = scene.add_material("water").unwrap();
        let (_device, mut ring) = ring(&scene);

        for _ in 0..FRAMES {
            scene.upload(ring.advance().unwrap());
        }

        scene.mark_all_dirty();
        assert_eq!(scene.item(item).dirty().remaining(), FRAMES);
        assert_eq!(scene.material(water).dirty().remaining(), FRAMES);
    }

    #[test]
    fn setup_errors() {
        let mut scene = scene();
        let shapes = scene.geometries().find("shapes").unwrap();

        let err = scene
            .add_render_item(RenderItemDesc::new(shapes, "torus"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownSubmesh { .. }));

        scene.add_material("a").unwrap();
        assert!(matches!(scene.add_material("a"), Err(Error::Config(_))));
        scene.add_material("b").unwrap();
        assert!(matches!(
            scene.add_material("c"),
            Err(Error::CapacityExceeded { capacity: 2, .. })
        ));
    }

    #[test]
    fn layers_filter_items() {
        let mut scene = scene();
        let shapes = scene.geometries().find("shapes").unwrap();
        scene
            .add_render_item(RenderItemDesc::new(shapes, "box"))
            .unwrap();
        scene
            .add_render_item(
                RenderItemDesc::new(shapes, "box").with_layer(RenderLayer::Transparent),
            )
            .unwrap();

        assert_eq!(scene.items_in_layer(RenderLayer::Opaque).count(), 1);
        assert_eq!(scene.items_in_layer(RenderLayer::Transparent).count(), 1);
        assert_eq!(scene.items_in_layer(RenderLayer::AlphaTested).count(), 0);
    }
}
