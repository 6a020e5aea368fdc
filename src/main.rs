use std::process::ExitCode;

use pane::{
    color::{animated_clear_color, FRAME_STEP},
    renderer::ClearFlags,
    winit::event_loop::ActiveEventLoop,
    Pane, PaneApp, PaneConfig, PaneContext,
};

fn config() -> PaneConfig {
    let mut config = PaneConfig::from_env();
    config.window_config.title = "wgpu + winit minimal".to_string();
    config
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Pane::run(config(), |_| Box::new(HelloPane::default())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pane: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Default)]
struct HelloPane {
    t: f32,
    backend: String,
    protocol: String,
}

impl PaneApp for HelloPane {
    fn start(&mut self, _event_loop: &ActiveEventLoop, context: &mut PaneContext) {
        self.backend = context.renderer().backend_name();
        self.protocol = context.protocol().to_string();
    }

    fn update(&mut self, context: &mut PaneContext) {
        self.t += FRAME_STEP;
        let clear = animated_clear_color(self.t);

        let renderer = context.renderer_mut();
        let [width, height] = renderer.resolution();
        renderer.set_view_rect(
            0,
            0,
            0,
            width.min(u16::MAX as u32) as u16,
            height.min(u16::MAX as u32) as u16,
        );
        renderer.set_view_clear(0, ClearFlags::COLOR | ClearFlags::DEPTH, clear, 1.0, 0);
        renderer.touch(0);

        renderer.dbg_text_clear(0);
        renderer.dbg_text_print(2, 1, 0x0f, "Hello, wgpu!");
        renderer.dbg_text_print(2, 2, 0x0e, &format!("Renderer: {}", self.backend));
        renderer.dbg_text_print(2, 3, 0x0a, &format!("Res: {}x{}", width, height));
        renderer.dbg_text_print(2, 4, 0x07, &format!("Protocol: {}", self.protocol));
    }
}
