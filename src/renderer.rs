//! The per-frame render loop.
//!
//! A frame moves `Idle -> Recording -> Submitted -> Presented -> Idle`.
//! The only blocking point is the ring advance at the start of `Recording`.

use tracing::{debug, error, info, trace};

use crate::{
    config::RendererConfig,
    error::{Error, Result},
    frame::{FrameResource, FrameResourceDesc, FrameRing},
    game_timer::{FrameStats, GameTimer},
    graphics::{
        backend::Backend, command_list::CommandList, command_queue::CommandQueue, device::Device,
        swapchain::Swapchain, types::GpuBufferHandle, upload_buffer::UploadBuffer,
    },
    input::{InputProvider, InputSnapshot},
    scene::{
        constants::{PassConstants, Vertex},
        RenderItem, Scene,
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameState {
    #[default]
    Idle,
    Recording,
    Submitted,
    Presented,
}

/// What a payload may touch before recording. Everything here is uploaded
/// into the current slot.
pub struct UpdateContext<'a, B: Backend> {
    pub scene: &'a mut Scene,
    pub pass: &'a mut PassConstants,
    pub dynamic_vertices: Option<&'a mut UploadBuffer<Vertex, B>>,
    pub input: &'a InputSnapshot,
    pub timer: &'a GameTimer,
}

pub struct DrawContext<'a, B: Backend> {
    pub list: &'a CommandList<B>,
    pub frame: &'a FrameResource<B>,
    pub back_buffer: usize,
    pub scene: &'a Scene,
}

impl<B: Backend> DrawContext<'_, B> {
    /// The current slot's dynamic vertices for items flagged with them,
    /// otherwise the mesh's static vertex buffer.
    pub fn vertex_buffer(&self, item: &RenderItem) -> Result<GpuBufferHandle> {
        if !item.dynamic_vertices {
            return Ok(self.scene.geometries().get(item.geometry).vertex_buffer);
        }

        self.frame
            .dynamic_vertices
            .as_ref()
            .map(|buffer| GpuBufferHandle(buffer.gpu_address(0)))
            .ok_or_else(|| {
                Error::Config("render item uses dynamic vertices but the ring has none".into())
            })
    }
}

/// Per-application drawing, layered on top of the frame loop.
pub trait DrawPayload<B: Backend> {
    fn update(&mut self, ctx: UpdateContext<'_, B>) -> Result<()>;

    fn draw(&mut self, ctx: DrawContext<'_, B>) -> Result<()>;
}

pub struct Renderer<B: Backend> {
    device: Device<B>,
    queue: CommandQueue<B>,
    ring: FrameRing<B>,
    list: CommandList<B>,
    swapchain: Swapchain<B>,
    scene: Scene,
    pass_constants: PassConstants,

    state: FrameState,
    /// Last value handed to a signal; zero before the first one.
    fence_value: u64,
    frames_rendered: u64,
    fence_timeout: Option<std::time::Duration>,
    /// Set when a submitted frame could not be signaled; cleared by `flush`.
    unsignaled: bool,

    timer: GameTimer,
    frame_stats: FrameStats,
}

impl<B: Backend> Renderer<B> {
    pub fn new(
        device: Device<B>,
        swapchain: Swapchain<B>,
        scene: Scene,
        config: &RendererConfig,
    ) -> Result<Self> {
        config.validate()?;

        if scene.frames_in_flight() != config.frames_in_flight {
            return Err(Error::Config(format!(
                "scene tracks {} frames in flight but the ring has {}",
                scene.frames_in_flight(),
                config.frames_in_flight
            )));
        }

        if scene.object_capacity() != config.object_capacity
            || scene.material_capacity() != config.material_capacity
        {
            return Err(Error::Config(format!(
                "scene holds {} objects and {} materials, expected {} and {}",
                scene.object_capacity(),
                scene.material_capacity(),
                config.object_capacity,
                config.material_capacity
            )));
        }

        if swapchain.buffer_count() != config.swapchain_buffers {
            return Err(Error::Config(format!(
                "swap chain has {} buffers, expected {}",
                swapchain.buffer_count(),
                config.swapchain_buffers
            )));
        }

        let queue = device.create_command_queue()?;
        let fence = device.create_fence()?;
        let desc = FrameResourceDesc {
            dynamic_vertex_count: config.dynamic_vertex_count,
            ..scene.frame_resource_desc(config.pass_count)
        };
        let ring = FrameRing::new(
            &device,
            fence,
            config.frames_in_flight,
            &desc,
            config.fence_timeout,
        )?;
        let list = device.create_command_list(ring.current().allocator())?;

        info!(
            frames_in_flight = config.frames_in_flight,
            swapchain_buffers = config.swapchain_buffers,
            "renderer created"
        );

        Ok(Self {
            device,
            queue,
            ring,
            list,
            swapchain,
            scene,
            pass_constants: PassConstants::default(),
            state: FrameState::Idle,
            fence_value: 0,
            frames_rendered: 0,
            fence_timeout: config.fence_timeout,
            unsignaled: false,
            timer: GameTimer::new(),
            frame_stats: FrameStats::default(),
        })
    }

    pub fn device(&self) -> &Device<B> {
        &self.device
    }

    pub fn queue(&self) -> &CommandQueue<B> {
        &self.queue
    }

    pub fn ring(&self) -> &FrameRing<B> {
        &self.ring
    }

    pub fn swapchain(&self) -> &Swapchain<B> {
        &self.swapchain
    }

    pub fn command_list(&self) -> &CommandList<B> {
        &self.list
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn pass_constants(&self) -> &PassConstants {
        &self.pass_constants
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn timer(&self) -> &GameTimer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut GameTimer {
        &mut self.timer
    }

    /// Records, submits and presents one frame.
    ///
    /// On failure the command list is left closed and the loop returns to
    /// `Idle`; the error is not retried.
    pub fn render_frame(
        &mut self,
        payload: &mut impl DrawPayload<B>,
        input: &mut impl InputProvider,
    ) -> Result<()> {
        debug_assert_eq!(self.state, FrameState::Idle, "frame already in progress");

        let result = self.try_render_frame(payload, input);

        if let Err(err) = &result {
            error!(%err, state = ?self.state, "frame failed");
            self.list.close_after_error();
            self.state = FrameState::Idle;
        }

        result
    }

    pub fn run(
        &mut self,
        payload: &mut impl DrawPayload<B>,
        input: &mut impl InputProvider,
        frames: u64,
    ) -> Result<()> {
        for _ in 0..frames {
            self.render_frame(payload, input)?;
        }

        Ok(())
    }

    fn try_render_frame(
        &mut self,
        payload: &mut impl DrawPayload<B>,
        input: &mut impl InputProvider,
    ) -> Result<()> {
        // A slot whose list never got a fence value cannot be reused safely.
        if self.unsignaled {
            return Err(Error::UnsignaledSubmission);
        }

        self.timer.tick();
        if let Some(sample) = self.frame_stats.record(self.timer.total_time()) {
            info!(fps = sample.fps, ms_per_frame = sample.ms_per_frame, "frame stats");
        }
        let snapshot = input.snapshot();

        // Idle -> Recording
        let frame = self.ring.advance()?;

        self.pass_constants
            .set_time(self.timer.total_secs(), self.timer.delta_secs());
        payload.update(UpdateContext {
            scene: &mut self.scene,
            pass: &mut self.pass_constants,
            dynamic_vertices: frame.dynamic_vertices.as_mut(),
            input: &snapshot,
            timer: &self.timer,
        })?;

        let uploaded = self.scene.upload(frame);
        frame.pass_constants.copy_data(0, &self.pass_constants);

        frame.allocator().reset()?;
        self.list.reset(frame.allocator())?;
        self.transition(FrameState::Recording);
        trace!(
            slot = self.ring.cursor(),
            objects = uploaded.objects,
            materials = uploaded.materials,
            "recording"
        );

        // Recording -> Submitted
        payload.draw(DrawContext {
            list: &self.list,
            frame: self.ring.current(),
            back_buffer: self.swapchain.current_back_buffer(),
            scene: &self.scene,
        })?;
        self.list.close()?;
        self.queue.execute(&self.list)?;
        self.transition(FrameState::Submitted);

        // Submitted -> Presented. The list is on the GPU now, so the slot is
        // signaled and stamped whether or not present succeeds.
        let presented = self.swapchain.present();
        if presented.is_ok() {
            self.transition(FrameState::Presented);
        }

        // Presented -> Idle
        self.fence_value += 1;
        if let Err(err) = self.queue.signal(self.ring.fence(), self.fence_value) {
            self.unsignaled = true;
            return Err(err);
        }
        self.ring.current_mut().stamp(self.fence_value);
        presented?;

        self.frames_rendered += 1;
        self.transition(FrameState::Idle);

        Ok(())
    }

    /// Blocks until the GPU has finished all submitted work.
    ///
    /// Used after setup uploads and at shutdown, never per frame.
    pub fn flush(&mut self) -> Result<()> {
        self.fence_value += 1;
        self.queue.signal(self.ring.fence(), self.fence_value)?;
        self.ring
            .fence()
            .wait_on_cpu(self.fence_value, self.fence_timeout)?;
        self.unsignaled = false;

        debug!(fence_value = self.fence_value, "queue flushed");
        Ok(())
    }

    fn transition(&mut self, to: FrameState) {
        trace!(from = ?self.state, ?to, "frame state");
        self.state = to;
    }
}

impl<B: Backend> Drop for Renderer<B> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            error!(%err, "failed to flush GPU work on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use glam::{Vec2, Vec3};

    use super::{DrawContext, DrawPayload, FrameState, Renderer, UpdateContext};
    use crate::{
        config::RendererConfig,
        error::Result,
        graphics::{
            soft::{SoftBackend, SoftCommand, SoftDevice},
            types::{GpuBufferHandle, IndexFormat},
        },
        input::InputSnapshot,
        scene::{constants::Vertex, MeshGeometry, RenderItemDesc, Scene, SubmeshGeometry},
        Error,
    };

    #[derive(Default)]
    struct Clear {
        updates: u32,
        fail_draw: bool,
    }

    impl DrawPayload<SoftBackend> for Clear {
        fn update(&mut self, _ctx: UpdateContext<'_, SoftBackend>) -> Result<()> {
            self.updates += 1;
            Ok(())
        }

        fn draw(&mut self, ctx: DrawContext<'_, SoftBackend>) -> Result<()> {
            ctx.list.raw().record(SoftCommand::ClearRenderTarget {
                back_buffer: ctx.back_buffer,
                color: [0.0; 4],
            })?;

            if self.fail_draw {
                return Err(Error::device("draw", "payload failure"));
            }

            Ok(())
        }
    }

    fn renderer_with_latency(config: &RendererConfig, latency: Duration) -> Renderer<SoftBackend> {
        let soft = SoftDevice::threaded(latency, Duration::ZERO).unwrap();
        let swapchain = soft.create_swapchain(config.swapchain_buffers).unwrap();
        let device = soft.into_device();
        let swapchain = device.create_swapchain(swapchain);
        let scene = Scene::new(
            config.frames_in_flight,
            config.object_capacity,
            config.material_capacity,
        );

        Renderer::new(device, swapchain, scene, config).unwrap()
    }

    fn renderer(config: &RendererConfig) -> Renderer<SoftBackend> {
        renderer_with_latency(config, Duration::ZERO)
    }

    fn no_input() -> InputSnapshot {
        InputSnapshot::default()
    }

    #[test]
    fn fence_values_strictly_increase() {
        let config = RendererConfig::default();
        let mut renderer = renderer(&config);
        let mut payload = Clear::default();
        let mut input = no_input;

        let mut stamps = Vec::new();
        for _ in 0..7 {
            renderer.render_frame(&mut payload, &mut input).unwrap();
            stamps.push(renderer.ring().current().fence_value());
            assert_eq!(renderer.state(), FrameState::Idle);
        }

        assert_eq!(stamps, [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(payload.updates, 7);
        assert_eq!(renderer.swapchain().presented(), 7);
        assert_eq!(renderer.swapchain().current_back_buffer(), 7 % 2);
    }

    #[test]
    fn failed_draw_leaves_list_closed() {
        let config = RendererConfig::default();
        let mut renderer = renderer(&config);
        let mut payload = Clear {
            fail_draw: true,
            ..Default::default()
        };

        let err = renderer
            .render_frame(&mut payload, &mut no_input)
            .err()
            .unwrap();

        assert!(matches!(err, Error::Device { op: "draw", .. }));
        assert!(!renderer.command_list().is_recording());
        assert_eq!(renderer.state(), FrameState::Idle);
        assert_eq!(renderer.fence_value(), 0);

        payload.fail_draw = false;
        renderer.render_frame(&mut payload, &mut no_input).unwrap();
        assert_eq!(renderer.fence_value(), 1);
    }

    #[test]
    fn failed_present_still_fences_the_submitted_slot() {
        let config = RendererConfig::default().with_fence_timeout(Some(Duration::from_secs(5)));
        let mut renderer = renderer_with_latency(&config, Duration::from_millis(30));
        let mut payload = Clear::default();

        renderer.render_frame(&mut payload, &mut no_input).unwrap();

        renderer.swapchain().raw().fail_next_present();
        let err = renderer
            .render_frame(&mut payload, &mut no_input)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Device { op: "present", .. }));
        assert_eq!(renderer.state(), FrameState::Idle);
        assert_eq!(renderer.ring().current().fence_value(), 2);
        assert_eq!(renderer.swapchain().presented(), 1);

        // Reusing slot 1 three frames later must wait for its list instead of
        // resetting an allocator the GPU is still reading.
        for _ in 0..6 {
            renderer.render_frame(&mut payload, &mut no_input).unwrap();
        }

        assert_eq!(renderer.fence_value(), 8);
        assert_eq!(renderer.frames_rendered(), 7);
    }

    #[test]
    fn failed_signal_blocks_rendering_until_flushed() {
        let config = RendererConfig::default();
        let mut renderer = renderer(&config);
        let mut payload = Clear::default();

        renderer.render_frame(&mut payload, &mut no_input).unwrap();

        renderer.queue().raw().fail_next_signal();
        let err = renderer
            .render_frame(&mut payload, &mut no_input)
            .err()
            .unwrap();
        assert!(matches!(err, Error::Device { op: "signal", .. }));
        assert_eq!(renderer.ring().current().fence_value(), 0);

        let err = renderer
            .render_frame(&mut payload, &mut no_input)
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnsignaledSubmission));
        assert_eq!(payload.updates, 2);

        renderer.flush().unwrap();
        renderer.render_frame(&mut payload, &mut no_input).unwrap();
        assert_eq!(renderer.frames_rendered(), 2);
    }

    #[test]
    fn cpu_lead_is_capped_when_the_gpu_lags() {
        let config = RendererConfig::default().with_fence_timeout(Some(Duration::from_secs(5)));
        let frames_in_flight = config.frames_in_flight as u64;
        let mut renderer = renderer_with_latency(&config, Duration::from_millis(20));
        let mut payload = Clear::default();

        for _ in 0..10 {
            renderer.render_frame(&mut payload, &mut no_input).unwrap();

            let completed = renderer.ring().fence().get_completed_value();
            assert!(renderer.fence_value() - completed <= frames_in_flight);
        }

        assert!(renderer.ring().stats().waits > 0);
        assert!(renderer.ring().stats().blocked > Duration::ZERO);
    }

    #[test]
    fn rejects_mismatched_scene() {
        let config = RendererConfig::default();
        let soft = SoftDevice::manual().unwrap();
        let swapchain = soft.create_swapchain(config.swapchain_buffers).unwrap();
        let device = soft.into_device();
        let swapchain = device.create_swapchain(swapchain);
        let scene = Scene::new(
            config.frames_in_flight + 1,
            config.object_capacity,
            config.material_capacity,
        );

        let err = Renderer::new(device, swapchain, scene, &config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_scene_capacities_other_than_configured() {
        let config = RendererConfig::default();

        for (objects, materials) in [
            (config.object_capacity / 2, config.material_capacity),
            (config.object_capacity, config.material_capacity + 1),
        ] {
            let soft = SoftDevice::manual().unwrap();
            let swapchain = soft.create_swapchain(config.swapchain_buffers).unwrap();
            let device = soft.into_device();
            let swapchain = device.create_swapchain(swapchain);
            let scene = Scene::new(config.frames_in_flight, objects, materials);

            let err = Renderer::new(device, swapchain, scene, &config).err().unwrap();
            assert!(matches!(err, Error::Config(_)));
        }
    }

    #[test]
    fn flush_waits_for_all_work() {
        let config = RendererConfig::default();
        let mut renderer = renderer(&config);

        renderer
            .render_frame(&mut Clear::default(), &mut no_input)
            .unwrap();
        renderer.flush().unwrap();

        let fence = renderer.ring().fence();
        assert_eq!(fence.get_completed_value(), renderer.fence_value());
    }

    const WAVE_VERTICES: usize = 4;

    #[derive(Default)]
    struct Waves {
        frame: u32,
        bound: Vec<GpuBufferHandle>,
    }

    impl DrawPayload<SoftBackend> for Waves {
        fn update(&mut self, ctx: UpdateContext<'_, SoftBackend>) -> Result<()> {
            self.frame += 1;
            let vertices = ctx.dynamic_vertices.unwrap();
            let x = self.frame as f32;

            for i in 0..WAVE_VERTICES {
                let position = Vec3::new(x, i as f32, 0.0);
                vertices.copy_data(i, &Vertex::new(position, Vec3::Y, Vec2::ZERO));
            }

            Ok(())
        }

        fn draw(&mut self, ctx: DrawContext<'_, SoftBackend>) -> Result<()> {
            for item in ctx.scene.items() {
                self.bound.push(ctx.vertex_buffer(item)?);
            }

            Ok(())
        }
    }

    #[test]
    fn dynamic_vertices_are_written_only_into_the_current_slot() {
        let config = RendererConfig::default().with_dynamic_vertex_count(WAVE_VERTICES);
        let soft = SoftDevice::threaded(Duration::ZERO, Duration::ZERO).unwrap();
        let swapchain = soft.create_swapchain(config.swapchain_buffers).unwrap();
        let device = soft.into_device();
        let swapchain = device.create_swapchain(swapchain);

        let mut scene = Scene::new(
            config.frames_in_flight,
            config.object_capacity,
            config.material_capacity,
        );
        let grid = scene.add_geometry(
            MeshGeometry::new(
                "waves",
                GpuBufferHandle(1),
                GpuBufferHandle(2),
                size_of::<Vertex>() as u32,
                IndexFormat::U32,
            )
            .with_submesh(
                "grid",
                SubmeshGeometry {
                    index_count: 6,
                    start_index: 0,
                    base_vertex: 0,
                },
            ),
        );
        scene
            .add_render_item(RenderItemDesc::new(grid, "grid").with_dynamic_vertices())
            .unwrap();

        let mut renderer = Renderer::new(device, swapchain, scene, &config).unwrap();
        let mut payload = Waves::default();
        let mut visits = vec![0u64; config.frames_in_flight];

        for frame in 1..=7u32 {
            renderer.render_frame(&mut payload, &mut no_input).unwrap();
            visits[renderer.ring().cursor()] += 1;

            for (slot, resource) in renderer.ring().iter().enumerate() {
                let vertices = resource.dynamic_vertices.as_ref().unwrap();
                assert_eq!(vertices.stride(), size_of::<Vertex>());
                assert_eq!(vertices.copy_count(), visits[slot] * WAVE_VERTICES as u64);
            }

            let current = renderer.ring().current().dynamic_vertices.as_ref().unwrap();
            assert_eq!(current.read(0).position.x, frame as f32);
            assert_eq!(
                payload.bound.last(),
                Some(&GpuBufferHandle(current.gpu_address(0)))
            );
        }

        assert_eq!(visits, [3, 2, 2]);
    }
}
