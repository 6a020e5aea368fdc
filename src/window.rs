use std::sync::Arc;

use wgpu::PresentMode;
use winit::{
    dpi::{LogicalPosition, LogicalSize, PhysicalPosition, PhysicalSize},
    event_loop::ActiveEventLoop,
    monitor::MonitorHandle,
    window::Window,
};

use crate::{platform::Protocol, PaneError};

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    /// Logical width, scaled by the monitor's DPI factor.
    pub width: u32,
    pub height: u32,
    pub pos: WindowPos,
    pub resizable: bool,
    pub present_mode: PresentMode,
    /// Display protocols the window's native handles may be resolved for.
    pub protocols: Vec<Protocol>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "pane".to_string(),
            width: 1280,
            height: 720,
            pos: WindowPos::Centered,
            resizable: true,
            present_mode: PresentMode::AutoVsync,
            protocols: Protocol::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WindowPos {
    Centered,
    Maximized,
    Pos(PhysicalPosition<i32>),
}

pub fn create_winit_window(
    event_loop: &ActiveEventLoop,
    config: &WindowConfig,
) -> Result<Arc<Window>, PaneError> {
    let mut window_attributes = Window::default_attributes()
        .with_inner_size(LogicalSize::new(config.width, config.height))
        .with_title(config.title.as_str())
        .with_resizable(config.resizable)
        .with_visible(true);

    window_attributes = match config.pos {
        WindowPos::Maximized => window_attributes.with_maximized(true),
        WindowPos::Pos(pos) => window_attributes.with_position(pos),
        WindowPos::Centered => {
            if let Some(monitor) = event_loop.primary_monitor() {
                window_attributes.with_position(get_centered_window_position(
                    &monitor,
                    config.width,
                    config.height,
                ))
            } else {
                window_attributes
            }
        }
    };

    match event_loop.create_window(window_attributes) {
        Ok(w) => Ok(Arc::new(w)),
        Err(e) => Err(PaneError::WindowError(e)),
    }
}

pub fn get_centered_window_position(
    monitor: &MonitorHandle,
    window_width: u32,
    window_height: u32,
) -> LogicalPosition<i32> {
    let size: LogicalSize<i32> = monitor.size().to_logical(monitor.scale_factor());
    centered_position(size, window_width, window_height)
}

fn centered_position(
    monitor_size: LogicalSize<i32>,
    window_width: u32,
    window_height: u32,
) -> LogicalPosition<i32> {
    let lt_x = monitor_size.width / 2 - window_width as i32 / 2;
    let lt_y = monitor_size.height / 2 - window_height as i32 / 2;
    LogicalPosition::new(lt_x, lt_y)
}

/// `None` for sizes a surface can't be configured with. Minimized windows report 0x0.
pub fn drawable_size(size: PhysicalSize<u32>) -> Option<[u32; 2]> {
    if size.width == 0 || size.height == 0 {
        None
    } else {
        Some([size.width, size.height])
    }
}

/// Backbuffer size for `size`. Degenerate sizes fall back to the configured window size.
pub fn surface_size(size: PhysicalSize<u32>, config: &WindowConfig) -> [u32; 2] {
    drawable_size(size).unwrap_or([config.width, config.height])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centers_window_on_monitor() {
        let pos = centered_position(LogicalSize::new(1920, 1080), 1280, 720);
        assert_eq!(pos, LogicalPosition::new(320, 180));
    }

    #[test]
    fn oversized_window_goes_negative() {
        let pos = centered_position(LogicalSize::new(800, 600), 1280, 720);
        assert_eq!(pos, LogicalPosition::new(-240, -60));
    }

    #[test]
    fn zero_size_falls_back_to_config() {
        let config = WindowConfig::default();
        assert_eq!(surface_size(PhysicalSize::new(0, 600), &config), [1280, 720]);
        assert_eq!(surface_size(PhysicalSize::new(2560, 1440), &config), [2560, 1440]);
    }

    #[test]
    fn default_config_enables_all_protocols() {
        let config = WindowConfig::default();
        assert_eq!(config.protocols, vec![Protocol::X11, Protocol::Wayland]);
        assert_eq!(config.present_mode, PresentMode::AutoVsync);
        assert!(config.resizable);
    }

    #[test]
    fn degenerate_sizes_are_not_drawable() {
        assert_eq!(drawable_size(PhysicalSize::new(0, 0)), None);
        assert_eq!(drawable_size(PhysicalSize::new(800, 0)), None);
        assert_eq!(drawable_size(PhysicalSize::new(0, 600)), None);
        assert_eq!(drawable_size(PhysicalSize::new(800, 600)), Some([800, 600]));
    }
}
