//! Application event loop.
//!
//! [`run`] opens the window (the page's `.webgl` canvas on the web), sets up
//! the GPU and the scene asynchronously, then drives one animation frame per
//! redraw:
//! 1. Forward window input to the orbit controller
//! 2. Advance the orbit clock and match the surface to the window size
//! 3. Swap in textures that finished loading
//! 4. Render shadows, scene and bloom, present
//! 5. Request the next redraw

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    camera,
    config::SceneConfig,
    context::Context,
    controls::OrbitController,
    frame,
    render::Renderer,
    solar_system::SolarSystem,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Everything that exists once setup has finished.
#[derive(Debug)]
pub struct AppState {
    pub ctx: Context,
    pub renderer: Renderer,
    pub system: SolarSystem,
    pub controller: OrbitController,
    pub config: SceneConfig,
    start: Instant,
}

impl AppState {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let config = SceneConfig::load().await?;
        let ctx = Context::new(window).await?;

        let system = SolarSystem::new(&config);
        let (camera, projection) = camera::from_config(&config.camera);
        let controller =
            OrbitController::new(config.controls.clone(), camera.target, ctx.config.height);
        let renderer = Renderer::new(&ctx, &config, &system, camera, projection);

        Ok(Self {
            ctx,
            renderer,
            system,
            controller,
            config,
            start: Instant::now(),
        })
    }

    /// Advances the scene to the current time and draws it.
    fn redraw(&mut self) -> Result<(), wgpu::SurfaceError> {
        let time_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        let camera = &mut self.renderer.camera;
        let update = frame::update(
            time_ms,
            self.config.animation.slowdown,
            &mut self.ctx,
            &mut self.system,
            &mut camera.camera,
            &mut camera.projection,
            &mut self.controller,
        );
        if update.resized {
            self.renderer.resize(&self.ctx);
        }

        self.renderer.poll_textures(&self.ctx);
        self.renderer.render(&self.ctx, &self.system)
    }
}

pub enum FlowEvent {
    /// Setup finished, successfully or not.
    Initialized(anyhow::Result<Box<AppState>>),
}

impl std::fmt::Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowEvent::Initialized(result) => f
                .debug_tuple("Initialized")
                .field(&result.is_ok())
                .finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    initializing: bool,
    /// Fatal error that ended the loop, returned from [`run`].
    error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            state: None,
            initializing: false,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.initializing {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Orrery");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_SELECTOR: &str = ".webgl";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document
                .query_selector(CANVAS_SELECTOR)
                .unwrap_throw()
                .unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        self.initializing = true;

        let proxy = self.proxy.clone();
        let init_future = async move {
            let result = AppState::new(window).await.map(Box::new);
            if proxy.send_event(FlowEvent::Initialized(result)).is_err() {
                log::warn!("Event loop closed before setup finished");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        self.async_runtime.block_on(init_future);

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(init_future);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(Ok(state)) => {
                self.initializing = false;
                log::info!("Scene ready");
                state.ctx.window.request_redraw();
                self.state = Some(*state);
            }
            FlowEvent::Initialized(Err(e)) => {
                self.initializing = false;
                self.fail(event_loop, e.context("setting up the scene failed"));
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.controller.handle_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            // The next frame picks the new size up
            WindowEvent::Resized(_) => state.ctx.window.request_redraw(),
            WindowEvent::RedrawRequested => {
                match state.redraw() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.ctx.reconfigure();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        let error = anyhow::anyhow!("the GPU ran out of memory");
                        return self.fail(event_loop, error);
                    }
                    Err(e) => log::warn!("Skipped a frame: {e}"),
                }
                state.ctx.window.request_redraw();
            }
            _ => {}
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
