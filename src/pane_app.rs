use winit::{event::WindowEvent, event_loop::ActiveEventLoop, window::WindowId};

use crate::PaneContext;

/// A trait to define all stages of your Pane app. Each function here is run at a specific stage
/// within winit event loop.
pub trait PaneApp {
    /// Run once the window and renderer are up
    fn start(&mut self, _event_loop: &ActiveEventLoop, _context: &mut PaneContext) {}
    /// Run on each window event from winit
    fn window_input(
        &mut self,
        _context: &mut PaneContext,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        _event: &WindowEvent,
    ) {
    }
    /// Run each frame before the renderer submits, called within winit's `about_to_wait`.
    fn update(&mut self, _context: &mut PaneContext) {}
    /// Run at exit
    fn end(&mut self, _context: &mut PaneContext) {}
}
