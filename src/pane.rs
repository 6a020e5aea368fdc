use std::{fmt::Formatter, sync::Arc};

use wgpu::{CreateSurfaceError, RequestAdapterError, RequestDeviceError};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    error::{EventLoopError, OsError},
    event::{StartCause, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    device_context::DeviceConfig,
    platform::{resolve_with_protocol, PlatformError, Protocol, WindowInfo},
    renderer::{Renderer, RendererInit},
    window::{create_winit_window, drawable_size, surface_size, WindowConfig},
    PaneApp,
};

type AppCreateFn = Box<dyn FnOnce(&mut PaneContext) -> Box<dyn PaneApp>>;

/// [`Pane`] opens a window, hands its native handles to the [`Renderer`] and drives your
/// [`PaneApp`] from winit's event loop, one frame per loop iteration.
pub struct Pane {
    config: PaneConfig,
    app_create_fn: Option<AppCreateFn>,
    running: Option<Running>,
    error: Option<PaneError>,
}

struct Running {
    app: Box<dyn PaneApp>,
    context: PaneContext,
}

impl Pane {
    /// Runs until the window is closed. Startup failures are returned after the event loop
    /// has shut down.
    pub fn run(
        config: PaneConfig,
        app_create_fn: impl FnOnce(&mut PaneContext) -> Box<dyn PaneApp> + 'static,
    ) -> Result<(), PaneError> {
        let event_loop = match EventLoop::new() {
            Ok(e) => e,
            Err(e) => return Err(PaneError::EventLoopError(e)),
        };
        let mut pane = Pane {
            config,
            app_create_fn: Some(Box::new(app_create_fn)),
            running: None,
            error: None,
        };
        event_loop
            .run_app(&mut pane)
            .map_err(PaneError::EventLoopError)?;
        match pane.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: PaneError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for Pane {
    fn new_events(&mut self, event_loop: &ActiveEventLoop, _cause: StartCause) {
        // Ensure we're poll
        if event_loop.control_flow() != ControlFlow::Poll {
            event_loop.set_control_flow(ControlFlow::Poll);
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.running.is_some() || self.error.is_some() {
            return;
        }
        let Some(app_create_fn) = self.app_create_fn.take() else {
            return;
        };
        match PaneContext::new(event_loop, &self.config) {
            Ok(mut context) => {
                let mut app = app_create_fn(&mut context);
                app.start(event_loop, &mut context);
                self.running = Some(Running {
                    app,
                    context,
                });
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(Running {
            app,
            context,
        }) = self.running.as_mut()
        else {
            return;
        };
        app.window_input(context, event_loop, window_id, &event);

        if window_id != context.window.id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => context.exit(),
            WindowEvent::Resized(physical_size) => context.resize(physical_size),
            WindowEvent::ScaleFactorChanged {
                ..
            } => {
                let size = context.window.inner_size();
                context.resize(size);
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(Running {
            app,
            context,
        }) = self.running.as_mut()
        else {
            return;
        };
        if context.exit {
            event_loop.exit();
            return;
        }
        app.update(context);

        let result = context.renderer.frame();
        context.window.request_redraw();
        if let Err(e) = result {
            self.fail(event_loop, e);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(Running {
            mut app,
            mut context,
        }) = self.running.take()
        {
            app.end(&mut context);
            context.shutdown();
        }
    }
}

/// Configuration of the window and device.
#[derive(Debug, Clone, Default)]
pub struct PaneConfig {
    pub device_config: DeviceConfig,
    pub window_config: WindowConfig,
}

impl PaneConfig {
    /// Default window with device settings taken from `WGPU_*` env vars.
    pub fn from_env() -> Self {
        Self {
            device_config: DeviceConfig::from_env(),
            window_config: WindowConfig::default(),
        }
    }
}

#[derive(Debug)]
pub enum PaneError {
    EventLoopError(EventLoopError),
    WindowError(OsError),
    PlatformError(PlatformError),
    SurfaceError(CreateSurfaceError),
    AdapterError(RequestAdapterError),
    DeviceError(RequestDeviceError),
    SurfaceLost(wgpu::SurfaceError),
    NoSurfaceFormat,
}

impl std::fmt::Display for PaneError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaneError::EventLoopError(e) => format!("EventLoopError: {}", e),
            PaneError::WindowError(e) => format!("WindowError: {}", e),
            PaneError::PlatformError(e) => format!("PlatformError: {}", e),
            PaneError::SurfaceError(e) => format!("SurfaceError: {}", e),
            PaneError::AdapterError(e) => format!("AdapterError: {}", e),
            PaneError::DeviceError(e) => format!("DeviceError: {}", e),
            PaneError::SurfaceLost(e) => format!("SurfaceLost: {}", e),
            PaneError::NoSurfaceFormat => "NoSurfaceFormat: surface reports no formats".to_owned(),
        };
        write!(f, "{}", s)
    }
}

impl std::error::Error for PaneError {}

impl From<PlatformError> for PaneError {
    fn from(e: PlatformError) -> Self {
        PaneError::PlatformError(e)
    }
}

/// The runtime context accessible through [`PaneApp`].
pub struct PaneContext {
    // Declared before `window`: the surface must be dropped while the native window is alive.
    renderer: Renderer,
    window: Arc<Window>,
    window_config: WindowConfig,
    protocol: Protocol,
    exit: bool,
}

impl PaneContext {
    fn new(event_loop: &ActiveEventLoop, config: &PaneConfig) -> Result<Self, PaneError> {
        let window_config = config.window_config.clone();
        let window = create_winit_window(event_loop, &window_config)?;

        let info = WindowInfo::query(window.as_ref())?;
        let (protocol, platform_data) = resolve_with_protocol(&info, &window_config.protocols)?;

        let [width, height] = surface_size(window.inner_size(), &window_config);
        // SAFETY: the renderer is stored next to the window it was created for and is dropped
        // first, see field order.
        let renderer = unsafe {
            Renderer::new(RendererInit {
                protocol,
                platform_data,
                device_config: config.device_config.clone(),
                width,
                height,
                present_mode: window_config.present_mode,
            })?
        };

        Ok(Self {
            renderer,
            window,
            window_config,
            protocol,
            exit: false,
        })
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Display protocol the window's handles were resolved for.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn exit(&mut self) {
        self.exit = true;
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some([width, height]) = drawable_size(size) {
            self.renderer
                .reset(width, height, self.window_config.present_mode);
        }
    }

    fn shutdown(self) {
        let PaneContext {
            renderer,
            window,
            ..
        } = self;
        renderer.shutdown();
        drop(window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_errors_convert_and_display() {
        let error: PaneError = PlatformError::NullWindowHandle(Protocol::Wayland).into();
        assert!(matches!(error, PaneError::PlatformError(_)));
        assert_eq!(
            error.to_string(),
            "PlatformError: Wayland window handle is null"
        );
    }

    #[test]
    fn default_config_resolves_every_protocol() {
        let config = PaneConfig::default();
        assert_eq!(config.window_config.protocols, Protocol::ALL.to_vec());
    }
}
