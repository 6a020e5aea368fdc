pub mod color;
pub mod device_context;
mod pane;
mod pane_app;

pub mod pipelines;
pub mod platform;
pub mod renderer;
pub mod window;

pub use raw_window_handle;
pub use wgpu;
pub use winit;

pub use crate::{pane::*, pane_app::*};
