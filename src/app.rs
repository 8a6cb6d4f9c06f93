//! Window and event loop
//!
//! [`SolarisApp`] owns the winit event loop. The window, the render engine and
//! the [`SceneHost`] are created on the first `resumed` event; every redraw
//! runs one host frame. Startup failures are stored and returned from
//! [`SolarisApp::run`] once the loop has exited.

use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::{
    config::AppConfig,
    error::{Result, SolarisError},
    gfx::RenderEngine,
    scene::{SceneHost, SceneKind},
};

/// Pixels per wheel line for touchpads reporting pixel deltas
const PIXELS_PER_LINE: f64 = 120.0;

/// Used when no monitor is reported and the native size was requested
const FALLBACK_SIZE: PhysicalSize<u32> = PhysicalSize::new(1280, 720);

pub struct SolarisApp {
    event_loop: EventLoop<()>,
    app_state: AppState,
}

struct AppState {
    config: AppConfig,
    initial: SceneKind,
    window: Option<Arc<Window>>,
    host: Option<SceneHost<RenderEngine>>,
    fatal: Option<SolarisError>,
}

impl SolarisApp {
    /// Creates the event loop; the window opens once the loop starts
    pub fn new(config: AppConfig, initial: SceneKind) -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| SolarisError::Window(e.to_string()))?;

        Ok(Self {
            event_loop,
            app_state: AppState {
                config,
                initial,
                window: None,
                host: None,
                fatal: None,
            },
        })
    }

    /// Runs until Escape, window close or a fatal error
    pub fn run(mut self) -> Result<()> {
        self.event_loop.set_control_flow(ControlFlow::Poll);
        self.event_loop
            .run_app(&mut self.app_state)
            .map_err(|e| SolarisError::Window(e.to_string()))?;

        match self.app_state.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn window_attributes(&self, event_loop: &ActiveEventLoop) -> WindowAttributes {
        let window_config = &self.config.window;
        let size = if window_config.wants_native_size() {
            event_loop
                .primary_monitor()
                .map(|monitor| monitor.size())
                .unwrap_or(FALLBACK_SIZE)
        } else {
            PhysicalSize::new(window_config.width, window_config.height)
        };

        WindowAttributes::default()
            .with_title(window_config.title.clone())
            .with_inner_size(size)
            .with_decorations(!window_config.undecorated)
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window = event_loop
            .create_window(self.window_attributes(event_loop))
            .map_err(|e| SolarisError::Window(e.to_string()))?;
        let window_handle = Arc::new(window);
        self.window = Some(window_handle.clone());

        let size = window_handle.inner_size();
        log::info!("window opened at {}x{}", size.width, size.height);

        let engine = pollster::block_on(RenderEngine::new(window_handle, &self.config.window))?;
        let host = SceneHost::new(engine, self.config.clone(), self.initial)?;
        self.host = Some(host);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: SolarisError) {
        log::error!("{}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(host) = self.host.as_mut() else {
            return;
        };

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                host.backend_mut().resize(width, height);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_LINE) as f32,
                };
                host.backend_mut().handle_mouse_wheel(lines);
            }
            WindowEvent::RedrawRequested => {
                host.frame();
                if host.backend().close_requested() {
                    event_loop.exit();
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        // scene resources go back to the engine before the engine itself drops
        if let Some(mut host) = self.host.take() {
            host.shutdown();
        }
        self.window = None;
    }
}
