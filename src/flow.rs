//! Application event loop.
//!
//! [`run`] opens the window, creates the [`Context`] and a [`Scene`], and
//! drives a [`GraphicsFlow`] through its lifecycle:
//!
//! 1. `on_init` once, after the device exists; load models and build nodes here
//! 2. window events are converted to [`InputEvent`]s and queued
//! 3. every frame the queue is drained in arrival order: the camera and
//!    `on_event` see each event, `Escape` ends the loop and resizes
//!    reconfigure the surface
//! 4. `on_update` with the frame time
//! 5. the render cache is rebuilt if the scene changed, buffers are
//!    uploaded and the frame is drawn and presented

use std::sync::Arc;

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::KeyCode,
    window::Window,
};

use crate::{
    config::Config,
    context::Context,
    input::{EventQueue, InputEvent},
    scene::Scene,
};

/// A program built on the engine.
#[allow(async_fn_in_trait)]
pub trait GraphicsFlow {
    /// Called once before the first frame. An error ends the event loop.
    async fn on_init(&mut self, ctx: &mut Context, scene: &mut Scene) -> anyhow::Result<()>;

    /// Called for every queued input event, after the camera saw it.
    fn on_event(&mut self, _ctx: &Context, _scene: &mut Scene, _event: &InputEvent) {}

    /// Called every frame with the time since the previous frame.
    fn on_update(&mut self, _ctx: &Context, _scene: &mut Scene, _dt: Duration) {}
}

struct AppState {
    ctx: Context,
    scene: Scene,
}

struct App<F: GraphicsFlow> {
    async_runtime: tokio::runtime::Runtime,
    config: Config,
    flow: F,
    state: Option<AppState>,
    events: EventQueue,
    last_time: Instant,
    /// Startup failure, returned from [`run`] once the loop has ended.
    init_error: Option<anyhow::Error>,
}

impl<F: GraphicsFlow> App<F> {
    fn new(config: Config, flow: F) -> anyhow::Result<Self> {
        let events = EventQueue::new(config.event_queue_size);
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            config,
            flow,
            state: None,
            events,
            last_time: Instant::now(),
            init_error: None,
        })
    }

    /// Keep the first startup error; the loop is ended by the caller.
    fn fail(&mut self, error: anyhow::Error) {
        log::error!("Initialization failed: {error:#}");
        self.init_error.get_or_insert(error);
    }

    fn finish(self) -> anyhow::Result<()> {
        match self.init_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn init(&mut self, window: Arc<Window>) -> anyhow::Result<AppState> {
        let Self {
            async_runtime,
            config,
            flow,
            ..
        } = self;
        async_runtime.block_on(async {
            let mut ctx = Context::new(window, config).await?;
            ctx.reconfigure();
            let mut scene = Scene::new(config.limits);
            flow.on_init(&mut ctx, &mut scene).await?;
            if let Some(faces) = &config.skybox {
                let Context {
                    device,
                    queue,
                    renderer,
                    ..
                } = &mut ctx;
                if let Err(e) = renderer.load_skybox(device, queue, faces).await {
                    log::error!("Cannot load skybox: {e:#}");
                }
            }
            Ok::<_, anyhow::Error>(AppState { ctx, scene })
        })
    }

    /// Drain input, update, rebuild and draw. Returns `false` to end the loop.
    fn frame(&mut self) -> bool {
        let Some(state) = &mut self.state else {
            return true;
        };
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();

        let events: Vec<InputEvent> = self.events.drain().collect();
        for event in &events {
            match *event {
                InputEvent::Keyboard {
                    key: KeyCode::Escape,
                    pressed: true,
                } => return false,
                InputEvent::Resize { width, height } => state.ctx.resize(width, height),
                _ => (),
            }
            state.ctx.renderer.process_event(event);
            self.flow.on_event(&state.ctx, &mut state.scene, event);
        }

        state.ctx.renderer.update(dt);
        self.flow.on_update(&state.ctx, &mut state.scene, dt);

        if let Err(e) = state.scene.build_cache() {
            log::error!("Cannot rebuild the render cache: {e}");
        }
        state.scene.write_to_buffers(
            &state.ctx.device,
            &state.ctx.queue,
            &state.ctx.renderer.scene_bind_group_layout,
        );

        match state.ctx.render(&state.scene) {
            Ok(()) => (),
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => state.ctx.reconfigure(),
            Err(e) => log::error!("Unable to render {e}"),
        }
        state.ctx.window.request_redraw();
        true
    }
}

impl<F: GraphicsFlow> ApplicationHandler for App<F> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.fail(anyhow::anyhow!("Cannot create a window: {e}"));
                event_loop.exit();
                return;
            }
        };

        match self.init(window) {
            Ok(state) => {
                state.ctx.window.request_redraw();
                self.state = Some(state);
                self.last_time = Instant::now();
            }
            Err(e) => {
                self.fail(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if !self.frame() {
                    event_loop.exit();
                }
            }
            event => {
                if let Some(input) = InputEvent::from_window_event(&event)
                    && !self.events.push(input)
                {
                    log::debug!("Input queue full, {} events dropped", self.events.dropped());
                }
            }
        }
    }
}

/// Open a window and run `flow` until the window closes or `Escape` is pressed.
///
/// Fails when the window, device or `on_init` fails at startup.
pub fn run<F: GraphicsFlow>(config: Config, flow: F) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, flow)?;
    event_loop.run_app(&mut app)?;
    app.finish()
}
