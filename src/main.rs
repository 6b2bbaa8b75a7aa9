use std::time::Duration;

use frame_ring::{
    camera::OrbitCamera,
    config::RendererConfig,
    graphics::{
        soft::{SoftBackend, SoftCommand, SoftDevice},
        types::{root_slot, GpuBufferHandle, IndexFormat},
    },
    input::{InputSnapshot, MouseButtons},
    logging::init_logging,
    renderer::{DrawContext, DrawPayload, Renderer, UpdateContext},
    scene::{
        constants::Vertex, MeshGeometry, RenderItemDesc, RenderItemId, RenderLayer, Scene,
        SubmeshGeometry,
    },
    Result,
};
use glam::{Mat4, Vec2, Vec3, Vec4};
use tracing::info;

const FRAMES: u64 = 300;
const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

const WAVE_ROWS: usize = 32;
const WAVE_COLS: usize = 32;
const WAVE_SPACING: f32 = 0.5;

struct ShapesPayload {
    camera: OrbitCamera,
    spinner: RenderItemId,
}

impl DrawPayload<SoftBackend> for ShapesPayload {
    fn update(&mut self, ctx: UpdateContext<'_, SoftBackend>) -> Result<()> {
        self.camera.update(ctx.input);
        let camera = self.camera.camera();

        ctx.pass
            .set_camera(camera.view, camera.proj(), camera.eye, camera.near, camera.far);
        ctx.pass.set_render_target_size(WIDTH, HEIGHT);
        ctx.pass.ambient_light = Vec4::new(0.25, 0.25, 0.35, 1.0);
        ctx.pass.lights[0].direction = Vec3::new(0.577, -0.577, 0.577);
        ctx.pass.lights[0].strength = Vec3::splat(0.6);

        // Only the spinner changes after setup; everything else uploads once
        // per frame resource.
        let angle = ctx.timer.total_secs();
        ctx.scene.set_world(
            self.spinner,
            Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)) * Mat4::from_rotation_y(angle),
        );

        if let Some(vertices) = ctx.dynamic_vertices {
            for row in 0..WAVE_ROWS {
                for col in 0..WAVE_COLS {
                    vertices.copy_data(row * WAVE_COLS + col, &wave_vertex(row, col, angle));
                }
            }
        }

        Ok(())
    }

    fn draw(&mut self, ctx: DrawContext<'_, SoftBackend>) -> Result<()> {
        let list = ctx.list.raw();

        list.record(SoftCommand::ClearRenderTarget {
            back_buffer: ctx.back_buffer,
            color: [0.69, 0.77, 0.87, 1.0],
        })?;
        list.record(SoftCommand::SetConstantBufferView {
            slot: root_slot::PASS,
            address: ctx.frame.pass_constants.gpu_address(0),
        })?;

        for (layer, pso) in [
            (RenderLayer::Opaque, "opaque"),
            (RenderLayer::AlphaTested, "alpha_tested"),
            (RenderLayer::Transparent, "transparent"),
        ] {
            list.record(SoftCommand::SetPipelineState(pso.into()))?;

            for item in ctx.scene.items_in_layer(layer) {
                let mesh = ctx.scene.geometries().get(item.geometry);

                list.record(SoftCommand::SetVertexBuffer(ctx.vertex_buffer(item)?))?;
                list.record(SoftCommand::SetIndexBuffer(mesh.index_buffer))?;
                list.record(SoftCommand::SetPrimitiveTopology(item.topology))?;
                list.record(SoftCommand::SetConstantBufferView {
                    slot: root_slot::OBJECT,
                    address: ctx.frame.object_constants.gpu_address(item.cb_index()),
                })?;

                if let (Some(material), Some(buffer)) =
                    (item.material, ctx.frame.material_constants.as_ref())
                {
                    let cb_index = ctx.scene.material(material).cb_index();
                    list.record(SoftCommand::SetConstantBufferView {
                        slot: root_slot::MATERIAL,
                        address: buffer.gpu_address(cb_index),
                    })?;
                }

                list.record(SoftCommand::DrawIndexed {
                    index_count: item.submesh.index_count,
                    start_index: item.submesh.start_index,
                    base_vertex: item.submesh.base_vertex,
                })?;
            }
        }

        Ok(())
    }
}

fn wave_vertex(row: usize, col: usize, t: f32) -> Vertex {
    let half_width = (WAVE_COLS - 1) as f32 * WAVE_SPACING * 0.5;
    let half_depth = (WAVE_ROWS - 1) as f32 * WAVE_SPACING * 0.5;
    let x = col as f32 * WAVE_SPACING - half_width;
    let z = row as f32 * WAVE_SPACING - half_depth;

    let (dx, dz) = (0.5 * x + t, 0.5 * z + t);
    let y = 0.3 * dx.sin() * dz.cos();
    let normal = Vec3::new(-0.15 * dx.cos() * dz.cos(), 1.0, 0.15 * dx.sin() * dz.sin());

    Vertex::new(
        Vec3::new(x, y, z),
        normal.normalize(),
        Vec2::new(
            col as f32 / (WAVE_COLS - 1) as f32,
            row as f32 / (WAVE_ROWS - 1) as f32,
        ),
    )
}

fn build_scene(config: &RendererConfig) -> Result<(Scene, RenderItemId)> {
    let mut scene = Scene::new(
        config.frames_in_flight,
        config.object_capacity,
        config.material_capacity,
    );

    let submesh = |index_count, start_index, base_vertex| SubmeshGeometry {
        index_count,
        start_index,
        base_vertex,
    };
    let shapes = scene.add_geometry(
        MeshGeometry::new(
            "shapes",
            GpuBufferHandle(1),
            GpuBufferHandle(2),
            32,
            IndexFormat::U16,
        )
        .with_submesh("box", submesh(36, 0, 0))
        .with_submesh("grid", submesh(3_174, 36, 24))
        .with_submesh("sphere", submesh(2_280, 3_210, 649))
        .with_submesh("cylinder", submesh(1_200, 5_490, 1_050)),
    );
    let waves = scene.add_geometry(
        MeshGeometry::new(
            "waves",
            GpuBufferHandle(3),
            GpuBufferHandle(4),
            size_of::<Vertex>() as u32,
            IndexFormat::U32,
        )
        .with_submesh(
            "grid",
            submesh(((WAVE_ROWS - 1) * (WAVE_COLS - 1) * 6) as u32, 0, 0),
        ),
    );

    let bricks = scene.add_material("bricks")?;
    let stone = scene.add_material("stone")?;
    let water = scene.add_material("water")?;
    scene.update_material(bricks, |m| {
        m.diffuse_albedo = Vec4::new(0.6, 0.3, 0.2, 1.0);
        m.roughness = 0.1;
    });
    scene.update_material(water, |m| {
        m.diffuse_albedo = Vec4::new(0.0, 0.2, 0.6, 0.5);
        m.fresnel_r0 = Vec3::splat(0.1);
        m.roughness = 0.0;
    });

    scene.add_render_item(RenderItemDesc::new(shapes, "grid").with_material(stone))?;
    let spinner = scene.add_render_item(RenderItemDesc::new(shapes, "box").with_material(bricks))?;

    for i in 0..5 {
        let z = -10.0 + i as f32 * 5.0;
        for x in [-5.0, 5.0] {
            scene.add_render_item(
                RenderItemDesc::new(shapes, "cylinder")
                    .with_world(Mat4::from_translation(Vec3::new(x, 1.5, z)))
                    .with_material(bricks),
            )?;
            scene.add_render_item(
                RenderItemDesc::new(shapes, "sphere")
                    .with_world(Mat4::from_translation(Vec3::new(x, 3.5, z)))
                    .with_material(stone)
                    .with_layer(RenderLayer::AlphaTested),
            )?;
        }
    }

    scene.add_render_item(
        RenderItemDesc::new(waves, "grid")
            .with_world(Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0)))
            .with_material(water)
            .with_layer(RenderLayer::Transparent)
            .with_dynamic_vertices(),
    )?;

    Ok((scene, spinner))
}

/// Drags the camera in a slow circle.
fn scripted_input() -> impl FnMut() -> InputSnapshot {
    let mut frame = 0u32;

    move || {
        frame += 1;
        let t = frame as f32 * 0.05;

        InputSnapshot {
            mouse_position: Vec2::new(t.cos(), t.sin()) * 40.0,
            buttons: MouseButtons::LEFT,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    init_logging();

    let config = RendererConfig::from_env()?.with_dynamic_vertex_count(WAVE_ROWS * WAVE_COLS);
    info!(?config, "starting");

    let soft = SoftDevice::threaded(Duration::from_millis(4), Duration::from_millis(12))?;
    let gpu = soft.gpu();
    let swapchain = soft.create_swapchain(config.swapchain_buffers)?;
    let device = soft.into_device();
    let swapchain = device.create_swapchain(swapchain);

    let (scene, spinner) = build_scene(&config)?;
    let mut payload = ShapesPayload {
        camera: OrbitCamera::new(15.0, 150.0, WIDTH as f32 / HEIGHT as f32),
        spinner,
    };

    let mut renderer = Renderer::new(device, swapchain, scene, &config)?;
    renderer.flush()?;
    renderer.run(&mut payload, &mut scripted_input(), FRAMES)?;
    renderer.flush()?;

    let stats = renderer.ring().stats();
    let log = gpu.log();
    info!(
        frames = renderer.frames_rendered(),
        rotations = stats.rotations,
        waits = stats.waits,
        blocked = ?stats.blocked,
        "ring stats"
    );
    info!(
        lists = log.lists,
        draws = log.draws,
        last_signaled = log.last_signaled,
        "gpu stats"
    );

    Ok(())
}
