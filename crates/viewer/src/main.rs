//! Terrain viewer - procedural terrain, planted assets and cascaded shadow maps.

mod config;
mod controls;
mod world;

use anyhow::Result;
use input::InputState;
use renderer::{CameraInput, FlyCamera, FrameStats, GpuBuffer, RenderSettings, Scene, SceneRenderer};
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowId},
};

use crate::config::ViewerConfig;
use crate::controls::{apply_key, shadow_megabytes, Control};

const TITLE: &str = "Terrain Viewer";

/// Everything that lives once the window exists.
struct ViewerState {
    renderer: SceneRenderer,
    scene: Scene<GpuBuffer>,
    input: InputState,
    started: Instant,
    last_report: Duration,
}

impl ViewerState {
    async fn new(window: Arc<Window>, config: &ViewerConfig) -> Result<Self> {
        let mut renderer = SceneRenderer::new(window, config.shadows.cascades()).await?;
        *renderer.settings_mut() = RenderSettings::from(&config.render);

        let world = world::build_world(renderer.device(), config)?;
        renderer.camera = FlyCamera::new(world.camera_start);
        let (width, height) = renderer.dimensions();
        renderer.camera.set_aspect(width, height);

        log::info!(
            "Shadow maps: {} cascades at {}x{} ({:.1} MB)",
            renderer.cascade_count(),
            renderer.shadow_resolution(),
            renderer.shadow_resolution(),
            shadow_megabytes(renderer.shadow_resolution(), renderer.cascade_count())
        );

        Ok(Self {
            renderer,
            scene: world.scene,
            input: InputState::new(),
            started: Instant::now(),
            last_report: Duration::ZERO,
        })
    }

    /// Handle a window event. Returns true if the app should exit.
    fn handle_window_event(&mut self, event: WindowEvent) -> bool {
        match event {
            WindowEvent::CloseRequested => true,
            WindowEvent::Resized(size) => {
                self.renderer.resize(size);
                false
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.input.process_keyboard(key, event.state);
                    if key == KeyCode::Escape && event.state.is_pressed() {
                        self.set_pointer_capture(false);
                    }
                }
                false
            }
            WindowEvent::MouseInput { state, .. } => {
                if state.is_pressed() && !self.input.is_cursor_locked() {
                    self.set_pointer_capture(true);
                }
                false
            }
            WindowEvent::Focused(false) => {
                self.set_pointer_capture(false);
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.input.process_scroll(delta);
                false
            }
            WindowEvent::RedrawRequested => {
                self.frame();
                false
            }
            _ => false,
        }
    }

    /// Handle device events (raw mouse motion).
    fn handle_device_event(&mut self, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.process_mouse_motion(delta);
        }
    }

    fn set_pointer_capture(&mut self, captured: bool) {
        let window = &self.renderer.window;
        if captured {
            let _ = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        } else {
            let _ = window.set_cursor_grab(CursorGrabMode::None);
        }
        window.set_cursor_visible(!captured);
        self.input.set_cursor_locked(captured);
    }

    fn apply_controls(&mut self) {
        let keys: Vec<KeyCode> = self.input.pressed_keys().collect();
        for key in keys {
            let resolution = self.renderer.shadow_resolution();
            match apply_key(key, self.renderer.settings_mut(), resolution) {
                Some(Control::Toggled(name, on)) => log::info!("{}: {}", name, if on { "on" } else { "off" }),
                Some(Control::PreviewCascade(i)) => log::info!("Previewing cascade {}", i),
                Some(Control::ShadowResolution(next)) if next != resolution => {
                    match self.renderer.set_shadow_resolution(next) {
                        Ok(()) => log::info!(
                            "Shadow maps now {:.1} MB",
                            shadow_megabytes(next, self.renderer.cascade_count())
                        ),
                        Err(e) => log::error!("{}; keeping {}x{}", e, resolution, resolution),
                    }
                }
                Some(Control::ShadowResolution(_)) | None => {}
            }
        }
    }

    /// One tick of the frame pump.
    fn frame(&mut self) {
        self.apply_controls();

        let movement = self.input.movement();
        let camera_input = CameraInput {
            forward: movement.forward,
            backward: movement.backward,
            left: movement.left,
            right: movement.right,
            ascend: movement.ascend,
            descend: movement.descend,
            zoom_modifier: movement.zoom_modifier,
            look_delta: self.input.pointer_delta(),
            scroll_delta: self.input.scroll_delta(),
        };
        self.input.end_frame();

        let timestamp = self.started.elapsed();
        match self.renderer.render_frame(&mut self.scene, &camera_input, timestamp) {
            Ok(stats) => self.report(timestamp, &stats),
            Err(e) => log::error!("Render error: {}", e),
        }
    }

    fn report(&mut self, timestamp: Duration, stats: &FrameStats) {
        if timestamp.saturating_sub(self.last_report) < Duration::from_secs(1) {
            return;
        }
        self.last_report = timestamp;
        let summary = format!(
            "{:.0} fps | {:.2} ms | {} triangles",
            stats.fps,
            stats.frame_cost.as_secs_f64() * 1000.0,
            stats.triangles
        );
        self.renderer.window.set_title(&format!("{} | {}", TITLE, summary));
        log::info!("{}", summary);
    }
}

/// Application handler for winit.
struct App {
    config: ViewerConfig,
    state: Option<ViewerState>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title(TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ));

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(ViewerState::new(window.clone(), &self.config)) {
            Ok(state) => {
                self.state = Some(state);
                window.request_redraw();
            }
            Err(e) => {
                log::error!("Failed to initialize viewer: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let Some(state) = &mut self.state {
            if state.handle_window_event(event) {
                event_loop.exit();
            }
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        if let Some(state) = &mut self.state {
            state.handle_device_event(event);
        }
    }

    // One redraw per display tick; the renderer never schedules its own frames.
    fn about_to_wait(&mut self, _: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.renderer.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("Terrain Viewer");
    println!("  Click        - capture pointer    Escape - release");
    println!("  WASD         - move               Space/Shift - up/down");
    println!("  Scroll       - speed              Ctrl+Scroll - zoom");
    println!("  F1 wireframe  F2 normals  F3 flat  F4 shadows  F5 flashlight");
    println!("  F6 frustums  F7 lock shadows  F8 cascade tint  F9 light view  F10 preview");
    println!("  1-4 preview cascade  =/- shadow resolution");

    let config = ViewerConfig::load();
    log::info!("Starting {}", TITLE);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App { config, state: None };
    event_loop.run_app(&mut app)?;

    Ok(())
}
