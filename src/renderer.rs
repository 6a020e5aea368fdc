use std::collections::BTreeMap;

use bitflags::bitflags;
use wgpu::{
    CompositeAlphaMode, Device, LoadOp, Operations, PresentMode, StoreOp, Surface,
    SurfaceConfiguration, TextureFormat, TextureView,
};

use winit::dpi::PhysicalSize;

use crate::{
    color::rgba_to_color,
    device_context::{DeviceConfig, DeviceContext},
    pipelines::{DebugTextGrid, DebugTextPipeline},
    platform::{PlatformData, Protocol},
    window::drawable_size,
    PaneError,
};

pub type ViewId = u16;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

bitflags! {
    /// Which attachments a view clears at the start of its pass.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
    pub struct ClearFlags: u8 {
        const COLOR = 1;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ViewRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl ViewRect {
    /// Clip the rect to a `target_width` x `target_height` backbuffer. `None` when nothing is left.
    pub fn clamped(self, target_width: u32, target_height: u32) -> Option<[u32; 4]> {
        let x = (self.x as u32).min(target_width);
        let y = (self.y as u32).min(target_height);
        let width = (self.width as u32).min(target_width - x);
        let height = (self.height as u32).min(target_height - y);
        if width == 0 || height == 0 {
            return None;
        }
        Some([x, y, width, height])
    }
}

#[derive(Debug, Copy, Clone)]
struct View {
    rect: Option<ViewRect>,
    clear: ClearFlags,
    rgba: u32,
    depth: f32,
    stencil: u32,
    touched: bool,
}

impl Default for View {
    fn default() -> Self {
        View {
            rect: None,
            clear: ClearFlags::empty(),
            rgba: 0x000000ff,
            depth: 1.0,
            stencil: 0,
            touched: false,
        }
    }
}

/// Everything [`Renderer::new`] needs.
#[derive(Debug, Clone)]
pub struct RendererInit {
    pub protocol: Protocol,
    pub platform_data: PlatformData,
    pub device_config: DeviceConfig,
    pub width: u32,
    pub height: u32,
    pub present_mode: PresentMode,
}

/// Immediate frame API over one window surface: configure views, write debug text, then
/// [`Renderer::frame`] to submit and present.
pub struct Renderer {
    debug_text: DebugTextPipeline,
    text_grid: DebugTextGrid,
    depth_view: TextureView,
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,
    context: DeviceContext,
    views: BTreeMap<ViewId, View>,
    frame_count: u32,
}

impl Renderer {
    /// Creates the device and surface for the window described by `init.platform_data`.
    ///
    /// # Safety
    ///
    /// The native window and display behind `init.platform_data` must outlive the renderer.
    pub unsafe fn new(init: RendererInit) -> Result<Renderer, PaneError> {
        let target = init.platform_data.surface_target(init.protocol)?;
        let (context, surface) = unsafe { DeviceContext::with_surface(&init.device_config, target)? };

        let capabilities = surface.get_capabilities(context.adapter());
        // Packed colors are written as-is, so prefer a linear format
        let format = match capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
        {
            Some(format) => format,
            None => return Err(PaneError::NoSurfaceFormat),
        };
        let surface_config = SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: init.width.max(1),
            height: init.height.max(1),
            present_mode: init.present_mode,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(context.device(), &surface_config);
        log::debug!(
            "Surface configured: {:?} {}x{} {:?}",
            format,
            surface_config.width,
            surface_config.height,
            surface_config.present_mode
        );

        let depth_view =
            create_depth_view(context.device(), surface_config.width, surface_config.height);
        let debug_text = DebugTextPipeline::new(context.device(), context.queue(), format);
        let text_grid = DebugTextGrid::new(surface_config.width, surface_config.height);
        log::info!("Renderer selected: {}", context.backend_name());

        Ok(Renderer {
            debug_text,
            text_grid,
            depth_view,
            surface,
            surface_config,
            context,
            views: BTreeMap::new(),
            frame_count: 0,
        })
    }

    pub fn backend_name(&self) -> String {
        self.context.backend_name()
    }

    /// Current backbuffer size in pixels.
    pub fn resolution(&self) -> [u32; 2] {
        [self.surface_config.width, self.surface_config.height]
    }

    pub fn set_view_rect(&mut self, view: ViewId, x: u16, y: u16, width: u16, height: u16) {
        self.views.entry(view).or_default().rect = Some(ViewRect {
            x,
            y,
            width,
            height,
        });
    }

    /// Set what `view` clears to. `rgba` is packed `0xRRGGBBAA`.
    pub fn set_view_clear(
        &mut self,
        view: ViewId,
        flags: ClearFlags,
        rgba: u32,
        depth: f32,
        stencil: u32,
    ) {
        let view = self.views.entry(view).or_default();
        view.clear = flags;
        view.rgba = rgba;
        view.depth = depth;
        view.stencil = stencil;
    }

    /// Submit `view` in the next frame even if nothing is drawn to it, so its clear runs.
    pub fn touch(&mut self, view: ViewId) {
        self.views.entry(view).or_default().touched = true;
    }

    pub fn dbg_text_clear(&mut self, attr: u8) {
        self.text_grid.clear(attr);
    }

    /// Print `text` at a text cell. `attr` is VGA style: low nibble foreground, high background.
    pub fn dbg_text_print(&mut self, column: u32, row: u32, attr: u8, text: &str) {
        self.text_grid.print(column, row, attr, text);
    }

    /// Encode every touched view and the debug text, then submit and present. Blocks according
    /// to the present mode. Returns the number of frames presented so far.
    pub fn frame(&mut self) -> Result<u32, PaneError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(PaneError::SurfaceLost(wgpu::SurfaceError::OutOfMemory));
            }
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                log::warn!("Surface outdated, reconfiguring");
                self.surface
                    .configure(self.context.device(), &self.surface_config);
                return Ok(self.frame_count);
            }
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                return Ok(self.frame_count);
            }
        };
        let [width, height] = self.resolution();
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Commands"),
                });

        let passes = view_passes(&self.views);
        for pass in &passes {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("View Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: Operations {
                        load: pass.color,
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: pass.depth,
                        store: StoreOp::Store,
                    }),
                    stencil_ops: Some(Operations {
                        load: pass.stencil,
                        store: StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some([x, y, w, h]) = pass.rect.and_then(|r| r.clamped(width, height)) {
                rpass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
                rpass.set_scissor_rect(x, y, w, h);
            }
        }

        self.debug_text.prepare(
            self.context.device(),
            self.context.queue(),
            &self.text_grid,
            [width, height],
        );
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Debug Text Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: Operations {
                        load: overlay_load(&passes),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.debug_text.draw(&mut rpass);
        }

        self.context.queue().submit(Some(encoder.finish()));
        frame.present();

        end_frame(&mut self.views);
        self.frame_count = self.frame_count.wrapping_add(1);
        Ok(self.frame_count)
    }

    /// Reconfigure the backbuffer after a resize. Zero sizes are ignored.
    pub fn reset(&mut self, width: u32, height: u32, present_mode: PresentMode) {
        let Some([width, height]) = drawable_size(PhysicalSize::new(width, height)) else {
            log::debug!("Ignoring reset to {}x{}", width, height);
            return;
        };
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface_config.present_mode = present_mode;
        self.surface
            .configure(self.context.device(), &self.surface_config);
        self.depth_view = create_depth_view(self.context.device(), width, height);
        self.text_grid.resize(width, height);
    }

    pub fn shutdown(self) {
        log::info!(
            "Renderer shut down after {} frames ({})",
            self.frame_count,
            self.backend_name()
        );
    }
}

/// Attachment load ops for one touched view, in submission order.
#[derive(Debug, Copy, Clone, PartialEq)]
struct ViewPass {
    rect: Option<ViewRect>,
    color: LoadOp<wgpu::Color>,
    depth: LoadOp<f32>,
    stencil: LoadOp<u32>,
}

/// Touched views in id order. Attachments a view doesn't clear are loaded.
fn view_passes(views: &BTreeMap<ViewId, View>) -> Vec<ViewPass> {
    views
        .values()
        .filter(|view| view.touched)
        .map(|view| ViewPass {
            rect: view.rect,
            color: if view.clear.contains(ClearFlags::COLOR) {
                LoadOp::Clear(rgba_to_color(view.rgba))
            } else {
                LoadOp::Load
            },
            depth: if view.clear.contains(ClearFlags::DEPTH) {
                LoadOp::Clear(view.depth)
            } else {
                LoadOp::Load
            },
            stencil: if view.clear.contains(ClearFlags::STENCIL) {
                LoadOp::Clear(view.stencil)
            } else {
                LoadOp::Load
            },
        })
        .collect()
}

/// A fresh swapchain texture has undefined contents until some pass writes it.
fn overlay_load(passes: &[ViewPass]) -> LoadOp<wgpu::Color> {
    if passes.is_empty() {
        LoadOp::Clear(wgpu::Color::BLACK)
    } else {
        LoadOp::Load
    }
}

/// Views must be touched again to be submitted next frame.
fn end_frame(views: &mut BTreeMap<ViewId, View>) {
    for view in views.values_mut() {
        view.touched = false;
    }
}

fn create_depth_view(device: &Device, width: u32, height: u32) -> TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rect_is_clipped_to_target() {
        let rect = ViewRect {
            x: 100,
            y: 50,
            width: 2000,
            height: 2000,
        };
        assert_eq!(rect.clamped(1280, 720), Some([100, 50, 1180, 670]));
    }

    #[test]
    fn view_rect_outside_target_is_empty() {
        let rect = ViewRect {
            x: 1280,
            y: 0,
            width: 10,
            height: 10,
        };
        assert_eq!(rect.clamped(1280, 720), None);
        assert_eq!(ViewRect::default().clamped(1280, 720), None);
    }

    #[test]
    fn clear_flags_combine() {
        let flags = ClearFlags::COLOR | ClearFlags::DEPTH;
        assert!(flags.contains(ClearFlags::COLOR));
        assert!(!flags.contains(ClearFlags::STENCIL));
    }

    fn view(clear: ClearFlags, touched: bool) -> View {
        View {
            clear,
            rgba: 0xff_00_00_ff,
            depth: 0.5,
            stencil: 7,
            touched,
            ..Default::default()
        }
    }

    #[test]
    fn untouched_views_are_skipped() {
        let mut views = BTreeMap::new();
        for (id, touched) in [(3, true), (1, false), (0, true)] {
            let mut v = view(ClearFlags::DEPTH, touched);
            v.depth = id as f32;
            views.insert(id, v);
        }
        let depths: Vec<LoadOp<f32>> = view_passes(&views).iter().map(|p| p.depth).collect();
        assert_eq!(depths, vec![LoadOp::Clear(0.0), LoadOp::Clear(3.0)]);
    }

    #[test]
    fn clears_only_flagged_attachments() {
        let mut views = BTreeMap::new();
        views.insert(0, view(ClearFlags::COLOR | ClearFlags::DEPTH, true));
        views.insert(1, view(ClearFlags::STENCIL, true));
        views.insert(2, view(ClearFlags::empty(), true));
        let passes = view_passes(&views);

        assert!(matches!(passes[0].color, LoadOp::Clear(c) if c == wgpu::Color::RED));
        assert!(matches!(passes[0].depth, LoadOp::Clear(d) if d == 0.5));
        assert!(matches!(passes[0].stencil, LoadOp::Load));

        assert!(matches!(passes[1].color, LoadOp::Load));
        assert!(matches!(passes[1].depth, LoadOp::Load));
        assert!(matches!(passes[1].stencil, LoadOp::Clear(7)));

        assert!(matches!(passes[2].color, LoadOp::Load));
        assert!(matches!(passes[2].depth, LoadOp::Load));
        assert!(matches!(passes[2].stencil, LoadOp::Load));
    }

    #[test]
    fn touched_flags_reset_after_frame() {
        let mut views = BTreeMap::new();
        views.insert(0, view(ClearFlags::COLOR, true));
        views.insert(1, view(ClearFlags::COLOR, true));
        assert_eq!(view_passes(&views).len(), 2);

        end_frame(&mut views);
        assert!(view_passes(&views).is_empty());
        // Settings survive, only the touch is consumed
        assert_eq!(views[&0].clear, ClearFlags::COLOR);
    }

    #[test]
    fn overlay_clears_when_no_view_ran() {
        assert!(matches!(overlay_load(&[]), LoadOp::Clear(c) if c == wgpu::Color::BLACK));

        let mut views = BTreeMap::new();
        views.insert(0, view(ClearFlags::empty(), true));
        assert!(matches!(overlay_load(&view_passes(&views)), LoadOp::Load));
    }
}
