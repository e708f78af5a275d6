use anyhow::{Context, Result};
use pixels::{Pixels, SurfaceTexture};
use rand::rngs::ThreadRng;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vsearch_core::ExperimentState;
use vsearch_experiment::{ExperimentEvent, ExperimentStateMachine, RngSource};
use vsearch_render::{SceneView, SkiaRenderer};
use vsearch_timing::{HighPrecisionTimer, unix_millis};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

pub type Session = ExperimentStateMachine<HighPrecisionTimer, RngSource<ThreadRng>>;

const FINISHED_NOTICE: &str = "Experiment finished for this participant!";

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    experiment: Session,
    renderer: Option<SkiaRenderer>,
    font: Option<Vec<u8>>,
    export_dir: PathBuf,
    windowed: bool,
    cursor: (f32, f32),
    exported: usize,
    notice: Option<&'static str>,
    should_exit: bool,
}

impl App {
    pub fn new(experiment: Session, font: Option<Vec<u8>>, windowed: bool) -> Self {
        let export_dir = experiment.config.log.export_dir.clone();
        Self {
            window: None,
            pixels: None,
            experiment,
            renderer: None,
            font,
            export_dir,
            windowed,
            cursor: (0.0, 0.0),
            exported: 0,
            notice: None,
            should_exit: false,
        }
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        info!(
            os = std::env::consts::OS,
            arch = std::env::consts::ARCH,
            participant = self.experiment.participant(),
            "starting session; Enter to begin, Space when found, S to save, Esc to quit"
        );
        // A single-row design may already be finished before the first frame.
        self.after_event();

        event_loop.run_app(&mut self).map_err(Into::into)
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let mut attributes = Window::default_attributes()
            .with_title("Visual Search")
            .with_resizable(self.windowed);

        if self.windowed {
            attributes = attributes.with_inner_size(LogicalSize::new(1024.0, 768.0));
        } else {
            let monitor = event_loop
                .primary_monitor()
                .or_else(|| event_loop.available_monitors().next())
                .context("no monitor available")?;
            if let Some(rate) = monitor.refresh_rate_millihertz() {
                debug!(hz = rate as f64 / 1000.0, "monitor refresh rate");
            }
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(Some(monitor))));
        }

        let window = Arc::new(event_loop.create_window(attributes)?);
        let size = window.inner_size();
        info!(
            width = size.width,
            height = size.height,
            scale = window.scale_factor(),
            "display configured"
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);

        let mut renderer = SkiaRenderer::new(
            size.width,
            size.height,
            self.experiment.config.stimulus.placeholder_size,
        )?;
        if let Some(bytes) = self.font.take() {
            renderer = renderer.with_font_bytes(bytes)?;
        }
        self.renderer = Some(renderer);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let view = SceneView {
            state: self.experiment.state(),
            layout: self.experiment.layout(),
            progress: self.experiment.trial_progress(),
            notice: self.notice,
        };
        let stats = renderer.render_frame(&view, pixels.frame_mut())?;
        pixels.render()?;

        debug!(
            state = ?view.state,
            shapes = stats.shapes,
            draw_ms = stats.draw.as_secs_f64() * 1e3,
            copy_ms = stats.copy.as_secs_f64() * 1e3,
            "frame"
        );
        Ok(())
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn dispatch(&mut self, event: ExperimentEvent) {
        if self.experiment.handle_event(event) {
            self.after_event();
            self.request_redraw();
        }
    }

    /// Saves the log and raises the notice the first time the session is
    /// seen finished.
    fn after_event(&mut self) {
        if self.experiment.is_finished() && self.notice.is_none() {
            self.notice = Some(FINISHED_NOTICE);
            self.export();
        }
    }

    fn export(&mut self) {
        let log = self.experiment.log();
        if log.is_empty() {
            info!("nothing to export yet");
            return;
        }
        match log.export(&self.export_dir, self.experiment.participant(), unix_millis()) {
            Ok(path) => {
                self.exported = log.len();
                info!(path = %path.display(), records = log.len(), "log exported");
            }
            Err(e) => error!(error = %e, "log export failed"),
        }
    }

    fn handle_key(&mut self, key: PhysicalKey, event_loop: &ActiveEventLoop) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        match code {
            KeyCode::Enter | KeyCode::NumpadEnter => self.dispatch(ExperimentEvent::EnterPressed),
            KeyCode::Space => self.dispatch(ExperimentEvent::SpacePressed),
            KeyCode::KeyS => self.export(),
            KeyCode::Escape => self.cleanup_and_exit(event_loop),
            _ => {}
        }
    }

    fn handle_click(&mut self) {
        if !self.experiment.state().accepts_clicks() {
            return;
        }
        let (Some(renderer), Some(layout)) = (self.renderer.as_ref(), self.experiment.layout())
        else {
            return;
        };
        match renderer.hit_test(layout, self.cursor) {
            Some(index) => self.dispatch(ExperimentEvent::PlaceholderClicked(index)),
            None => debug!(x = self.cursor.0, y = self.cursor.1, "click outside placeholders"),
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize surface");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize buffer");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                error!(error = %e, "failed to resize canvas");
            }
        }
        info!(width = new_size.width, height = new_size.height, "display resized");
        self.request_redraw();
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if self.experiment.log().len() > self.exported {
            self.export();
        }
        if self.experiment.state() != ExperimentState::Finished {
            warn!(
                recorded = self.experiment.log().len(),
                "session closed before the participant finished"
            );
        }
        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                error!(error = %e, "failed to create window and surface");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    error!(error = %e, "render failed");
                    self.cleanup_and_exit(event_loop);
                }
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state.is_pressed() && !event.repeat =>
            {
                self.handle_key(event.physical_key, event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.handle_click(),
            WindowEvent::Resized(size) => self.handle_resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    self.handle_resize(size);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
