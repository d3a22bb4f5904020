use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use hecs::{DynamicBundle, Entity};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::camera::PerspectiveCamera;
use crate::clock::Clock;
use crate::ecs::MeshId;
use crate::error::{Error, Result};
use crate::geometry::RawGeometry;
use crate::gpu::{GpuContext, Viewport};
use crate::light::{AmbientLight, PointLight};
use crate::material::{Color, MaterialId, MaterialParam, Materials, StandardMaterial};
use crate::mesh_pass::MeshPass;
use crate::overlay::Overlay;
use crate::scene::Scene;
use crate::texture::{CubeTextureLoader, EnvMapId, EnvironmentMaps};
use crate::ui::{ControlPanel, MaterialBinding};

/// Context provided during app setup.
pub struct SetupContext<'a> {
    pub gpu: &'a GpuContext,
    camera: &'a mut PerspectiveCamera,
    scene: &'a mut Scene,
    mesh_pass: &'a mut MeshPass,
    env_maps: &'a mut EnvironmentMaps,
    panel: &'a mut ControlPanel,
    environment_dir: &'a Path,
}

impl SetupContext<'_> {
    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.gpu.width()
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.gpu.height()
    }

    pub fn aspect(&self) -> f32 {
        self.gpu.aspect()
    }

    pub fn camera(&mut self) -> &mut PerspectiveCamera {
        self.camera
    }

    /// Replace the camera. Its aspect is forced to the surface's.
    pub fn set_camera(&mut self, camera: PerspectiveCamera) {
        *self.camera = camera;
        self.camera.set_aspect(self.gpu.aspect());
    }

    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }

    pub fn ambient_light(&mut self, color: Color, intensity: f32) {
        self.scene
            .set_ambient_light(AmbientLight::new(color, intensity));
    }

    pub fn point_light(&mut self, light: PointLight) {
        self.scene.set_point_light(light);
    }

    /// Directory environment maps are loaded from, as configured in
    /// [`AppConfig::environment_dir`].
    pub fn environment_dir(&self) -> &Path {
        self.environment_dir
    }

    /// Start loading a cubemap in the background.
    ///
    /// The id is usable immediately; until the faces arrive, materials
    /// referencing it reflect a black environment.
    pub fn load_cube_texture(&mut self, paths: [PathBuf; 6]) -> EnvMapId {
        let label = paths[0]
            .parent()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "cubemap".to_string());
        log::debug!("Loading cubemap from {label}");
        self.env_maps
            .add_pending(label, CubeTextureLoader::load(paths))
    }

    /// Add a material to the shared library.
    pub fn add_material(&mut self, material: StandardMaterial) -> MaterialId {
        self.scene.materials().borrow_mut().add(material)
    }

    /// A slider binding for one parameter of a library material.
    pub fn material_binding(&self, id: MaterialId, param: MaterialParam) -> MaterialBinding {
        MaterialBinding::new(Rc::clone(self.scene.materials()), id, param)
    }

    /// Upload geometry and return its handle.
    pub fn add_mesh(&mut self, geometry: &RawGeometry) -> MeshId {
        let mesh = geometry.upload(self.gpu);
        self.mesh_pass.add_mesh(mesh)
    }

    pub fn mesh_sphere(&mut self, radius: f32, width_segments: u32, height_segments: u32) -> MeshId {
        self.add_mesh(&RawGeometry::sphere(radius, width_segments, height_segments))
    }

    pub fn mesh_torus(
        &mut self,
        radius: f32,
        tube: f32,
        radial_segments: u32,
        tubular_segments: u32,
    ) -> MeshId {
        self.add_mesh(&RawGeometry::torus(
            radius,
            tube,
            radial_segments,
            tubular_segments,
        ))
    }

    pub fn mesh_plane(&mut self, width: f32, height: f32) -> MeshId {
        self.add_mesh(&RawGeometry::plane(width, height))
    }

    /// Spawn a scene object.
    pub fn spawn(&mut self, components: impl DynamicBundle) -> Entity {
        self.scene.spawn(components)
    }

    /// The on-screen control panel.
    pub fn gui(&mut self) -> &mut ControlPanel {
        self.panel
    }
}

/// Context provided each frame.
pub struct Frame<'a> {
    /// GPU context for advanced rendering.
    pub gpu: &'a GpuContext,
    /// Current camera state.
    pub camera: &'a mut PerspectiveCamera,
    /// Total elapsed time in seconds.
    pub time: f32,
    /// Delta time since last frame in seconds.
    pub dt: f32,
    /// Index of this frame, starting at 0.
    pub frame: u64,
    scene: &'a mut Scene,
}

impl Frame<'_> {
    /// Screen width in pixels.
    pub fn width(&self) -> u32 {
        self.gpu.width()
    }

    /// Screen height in pixels.
    pub fn height(&self) -> u32 {
        self.gpu.height()
    }

    pub fn aspect(&self) -> f32 {
        self.gpu.aspect()
    }

    pub fn scene(&mut self) -> &mut Scene {
        self.scene
    }

    /// Apply every [`Spin`](crate::Spin) for this frame's elapsed time.
    pub fn animate(&mut self) {
        self.scene.animate(self.time);
    }
}

/// Configuration for the app window and renderer.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// 4x MSAA when supported.
    pub antialias: bool,
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
    pub background: Color,
    pub environment_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "lustre".to_string(),
            width: 1280,
            height: 720,
            antialias: true,
            vsync: true,
            background: Color::BLACK,
            environment_dir: PathBuf::from("textures/environmentMaps/0"),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    pub fn vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn environment_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.environment_dir = dir.into();
        self
    }

    /// Requested MSAA sample count.
    pub fn sample_count(&self) -> u32 {
        if self.antialias { 4 } else { 1 }
    }
}

/// Run an app with setup and frame closures.
///
/// # Example
/// ```no_run
/// lustre::run(|ctx| {
///     let sphere = ctx.mesh_sphere(0.5, 32, 32);
///     let material = ctx.add_material(lustre::StandardMaterial::new());
///     ctx.spawn((lustre::Transform::new(), lustre::RenderMesh::new(sphere, material)));
///
///     move |frame| {
///         frame.animate();
///     }
/// })
/// .unwrap();
/// ```
pub fn run<S, F>(setup: S) -> Result<()>
where
    S: FnOnce(&mut SetupContext) -> F + 'static,
    F: FnMut(&mut Frame) + 'static,
{
    run_with_config(AppConfig::default(), setup)
}

/// Run an app with custom configuration.
///
/// Blocks until the window is closed. Fails if the window or the GPU
/// context cannot be created, or if presenting runs out of memory.
pub fn run_with_config<S, F>(config: AppConfig, setup: S) -> Result<()>
where
    S: FnOnce(&mut SetupContext) -> F + 'static,
    F: FnMut(&mut Frame) + 'static,
{
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = LustreApp {
        state: AppState::Pending {
            config,
            setup: Some(Box::new(move |ctx: &mut SetupContext| {
                Box::new(setup(ctx)) as Box<dyn FnMut(&mut Frame)>
            })),
        },
        error: None,
    };

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ResizeOutcome {
    Resized,
    Unchanged,
    /// Zero-sized; the window is minimized.
    Minimized,
}

/// Apply a window resize to the viewport and keep the camera aspect in step.
fn resize_view(
    viewport: &mut Viewport,
    camera: &mut PerspectiveCamera,
    width: u32,
    height: u32,
) -> ResizeOutcome {
    if width == 0 || height == 0 {
        return ResizeOutcome::Minimized;
    }
    if !viewport.resize(width, height) {
        return ResizeOutcome::Unchanged;
    }
    camera.set_aspect(viewport.aspect());
    ResizeOutcome::Resized
}

type SetupFn = Box<dyn FnOnce(&mut SetupContext) -> Box<dyn FnMut(&mut Frame)>>;

struct LustreApp {
    state: AppState,
    /// First fatal error; ends the event loop.
    error: Option<Error>,
}

enum AppState {
    Pending {
        config: AppConfig,
        setup: Option<SetupFn>,
    },
    Running(Box<Running>),
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    overlay: Overlay,
    mesh_pass: MeshPass,
    env_maps: EnvironmentMaps,
    scene: Scene,
    camera: PerspectiveCamera,
    panel: ControlPanel,
    clock: Clock,
    frame_fn: Box<dyn FnMut(&mut Frame)>,
    /// No redraws while set.
    minimized: bool,
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: &AppConfig, setup: SetupFn) -> Result<Self> {
        let window_attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone(), config.sample_count(), config.vsync)?;

        let overlay = Overlay::new(&gpu, &window);
        let mut mesh_pass = MeshPass::new(&gpu);
        let mut env_maps = EnvironmentMaps::new();

        let mut scene = Scene::new(Rc::new(RefCell::new(Materials::new())));
        scene.background = config.background;

        let mut camera = PerspectiveCamera::default();
        camera.set_aspect(gpu.aspect());
        let mut panel = ControlPanel::default();

        let frame_fn = {
            let mut ctx = SetupContext {
                gpu: &gpu,
                camera: &mut camera,
                scene: &mut scene,
                mesh_pass: &mut mesh_pass,
                env_maps: &mut env_maps,
                panel: &mut panel,
                environment_dir: &config.environment_dir,
            };
            setup(&mut ctx)
        };

        log::info!(
            "Setup complete: {} objects, {} meshes, {} materials",
            scene.object_count(),
            mesh_pass.mesh_count(),
            scene.materials().borrow().len()
        );

        Ok(Self {
            window,
            gpu,
            overlay,
            mesh_pass,
            env_maps,
            scene,
            camera,
            panel,
            clock: Clock::new(),
            frame_fn,
            minimized: false,
        })
    }

    fn resize(&mut self, event_loop: &ActiveEventLoop, width: u32, height: u32) {
        match resize_view(self.gpu.viewport_mut(), &mut self.camera, width, height) {
            ResizeOutcome::Minimized => {
                if !self.minimized {
                    log::debug!("Window minimized, pausing redraws");
                    self.minimized = true;
                    event_loop.set_control_flow(ControlFlow::Wait);
                }
                return;
            }
            ResizeOutcome::Resized => {
                self.gpu.reconfigure();
                log::debug!("Resized to {width}x{height}");
            }
            ResizeOutcome::Unchanged => {}
        }

        if self.minimized {
            log::debug!("Window restored, resuming redraws");
            self.minimized = false;
            event_loop.set_control_flow(ControlFlow::Poll);
            self.window.request_redraw();
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let time = self.clock.tick();
        let dt = self.clock.delta();

        if self.env_maps.poll(&self.gpu) {
            log::info!("Environment map ready");
        }

        let mut frame = Frame {
            gpu: &self.gpu,
            camera: &mut self.camera,
            time,
            dt,
            frame: self.clock.frames().saturating_sub(1),
            scene: &mut self.scene,
        };
        (self.frame_fn)(&mut frame);

        self.render(time)
    }

    fn render(&mut self, time: f32) -> Result<()> {
        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out acquiring the next frame, skipping");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.mesh_pass.render(
            &self.gpu,
            &mut encoder,
            &view,
            &self.scene,
            &self.camera,
            &self.env_maps,
            time,
        );

        let overlay_buffers =
            self.overlay
                .render(&self.gpu, &self.window, &mut encoder, &view, &self.panel);

        self.gpu
            .queue
            .submit(overlay_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        self.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

impl LustreApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for LustreApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let AppState::Pending { config, setup } = &mut self.state else {
            return;
        };
        let Some(setup) = setup.take() else {
            return;
        };

        match Running::start(event_loop, config, setup) {
            Ok(running) => {
                running.window.request_redraw();
                self.state = AppState::Running(Box::new(running));
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let AppState::Running(running) = &mut self.state else {
            return;
        };

        running.overlay.on_window_event(&running.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                running.resize(event_loop, size.width, size.height);
            }
            WindowEvent::RedrawRequested if running.minimized => {}
            WindowEvent::RedrawRequested => {
                let result = running.redraw();
                running.window.request_redraw();
                if let Err(err) = result {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AppConfig::default();
        assert_eq!(config.title, "lustre");
        assert_eq!((config.width, config.height), (1280, 720));
        assert_eq!(config.background, Color::BLACK);
        assert_eq!(config.sample_count(), 4);
        assert_eq!(
            config.environment_dir,
            PathBuf::from("textures/environmentMaps/0")
        );
    }

    #[test]
    fn antialias_off_disables_msaa() {
        let config = AppConfig::new().antialias(false).size(640, 480).vsync(false);
        assert_eq!(config.sample_count(), 1);
        assert_eq!((config.width, config.height), (640, 480));
        assert!(!config.vsync);
    }

    #[test]
    fn resize_keeps_camera_aspect_in_step() {
        let mut viewport = Viewport::new(1280, 720);
        let mut camera = PerspectiveCamera::new(50.0, viewport.aspect(), 0.01, 100.0);

        for (width, height) in [(1920, 1080), (500, 1000), (333, 777)] {
            assert_eq!(
                resize_view(&mut viewport, &mut camera, width, height),
                ResizeOutcome::Resized
            );
            assert_eq!(viewport, Viewport::new(width, height));
            assert!((camera.aspect - width as f32 / height as f32).abs() < 1e-6);
        }

        assert_eq!(
            resize_view(&mut viewport, &mut camera, 333, 777),
            ResizeOutcome::Unchanged
        );
    }

    #[test]
    fn minimize_leaves_viewport_and_aspect_alone() {
        let mut viewport = Viewport::new(800, 400);
        let mut camera = PerspectiveCamera::new(50.0, viewport.aspect(), 0.01, 100.0);
        let projection = camera.projection_matrix();

        for (width, height) in [(0, 0), (0, 400), (800, 0)] {
            assert_eq!(
                resize_view(&mut viewport, &mut camera, width, height),
                ResizeOutcome::Minimized
            );
        }
        assert_eq!(viewport, Viewport::new(800, 400));
        assert_eq!(camera.aspect, 2.0);
        assert_eq!(camera.projection_matrix(), projection);
    }
}
