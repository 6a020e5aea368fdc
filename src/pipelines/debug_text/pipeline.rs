use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use wgpu::{
    util::DeviceExt, BindGroup, Buffer, Device, Queue, RenderPass, RenderPipeline, TextureFormat,
};

use crate::pipelines::{DebugTextGrid, GlyphInstance, CELL_HEIGHT, CELL_WIDTH};

/// Glyphs per atlas row. The atlas holds the 128 ASCII code points.
pub const ATLAS_COLUMNS: u32 = 16;
pub const ATLAS_ROWS: u32 = 8;
/// Source glyph size in the atlas.
pub const GLYPH_SIZE: u32 = 8;

/// Renders a [`DebugTextGrid`] over the current render target.
pub struct DebugTextPipeline {
    pipeline: RenderPipeline,
    globals: Buffer,
    bind_group: BindGroup,
    instances: Buffer,
    instance_capacity: usize,
    instance_count: u32,
}

impl DebugTextPipeline {
    pub fn new(device: &Device, queue: &Queue, target_format: TextureFormat) -> DebugTextPipeline {
        let atlas = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Debug Text Atlas"),
                size: wgpu::Extent3d {
                    width: ATLAS_COLUMNS * GLYPH_SIZE,
                    height: ATLAS_ROWS * GLYPH_SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TextureFormat::R8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &build_glyph_atlas(),
        );
        let atlas_view = atlas.create_view(&wgpu::TextureViewDescriptor::default());
        let globals = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Debug Text Globals"),
            contents: bytemuck::cast_slice(&[DebugTextGlobals::new([1, 1])]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let pipeline = Self::new_render_pipeline(device, wgpu::ColorTargetState {
            format: target_format,
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Debug Text Bind Group"),
            layout: &pipeline.get_bind_group_layout(0),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
            ],
        });
        let instance_capacity = 256;
        let instances = Self::create_instance_buffer(device, instance_capacity);
        Self {
            pipeline,
            globals,
            bind_group,
            instances,
            instance_capacity,
            instance_count: 0,
        }
    }

    pub fn new_render_pipeline(
        device: &Device,
        color_target_state: wgpu::ColorTargetState,
    ) -> RenderPipeline {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Debug Text Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float {
                            filterable: false,
                        },
                    },
                    count: None,
                },
            ],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Debug Text Shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("debug_text.wgsl"))),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Debug Text Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Debug Text Render Pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[GlyphInstance::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(color_target_state)],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    fn create_instance_buffer(device: &Device, capacity: usize) -> Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Debug Text Instances"),
            size: (capacity * size_of::<GlyphInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Upload the grid contents for a target of `resolution` pixels.
    pub fn prepare(
        &mut self,
        device: &Device,
        queue: &Queue,
        grid: &DebugTextGrid,
        resolution: [u32; 2],
    ) {
        let instances = grid.instances();
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instances = Self::create_instance_buffer(device, self.instance_capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.instances, 0, bytemuck::cast_slice(&instances));
        }
        queue.write_buffer(
            &self.globals,
            0,
            bytemuck::cast_slice(&[DebugTextGlobals::new(resolution)]),
        );
        self.instance_count = instances.len() as u32;
    }

    pub fn draw(&self, rpass: &mut RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.bind_group, &[]);
        rpass.set_vertex_buffer(0, self.instances.slice(..));
        rpass.draw(0..6, 0..self.instance_count);
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct DebugTextGlobals {
    pub resolution: [f32; 2],
    pub cell_size: [f32; 2],
}

impl DebugTextGlobals {
    pub fn new(resolution: [u32; 2]) -> DebugTextGlobals {
        DebugTextGlobals {
            resolution: [resolution[0].max(1) as f32, resolution[1].max(1) as f32],
            cell_size: [CELL_WIDTH as f32, CELL_HEIGHT as f32],
        }
    }
}

/// Rasterize ASCII from `font8x8` into a single channel atlas of [`ATLAS_COLUMNS`] x
/// [`ATLAS_ROWS`] glyphs. Glyph `c` sits at cell `(c % 16, c / 16)`.
pub fn build_glyph_atlas() -> Vec<u8> {
    let width = (ATLAS_COLUMNS * GLYPH_SIZE) as usize;
    let mut atlas = vec![0u8; width * (ATLAS_ROWS * GLYPH_SIZE) as usize];
    for code in 0..ATLAS_COLUMNS * ATLAS_ROWS {
        let Some(bitmap) = char::from_u32(code).and_then(|c| BASIC_FONTS.get(c)) else {
            continue;
        };
        let origin_x = ((code % ATLAS_COLUMNS) * GLYPH_SIZE) as usize;
        let origin_y = ((code / ATLAS_COLUMNS) * GLYPH_SIZE) as usize;
        for (y, &bits) in bitmap.iter().enumerate() {
            for x in 0..GLYPH_SIZE as usize {
                // Bit 0 is the leftmost pixel
                if (bits >> x) & 1 == 1 {
                    atlas[(origin_y + y) * width + origin_x + x] = 255;
                }
            }
        }
    }
    atlas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph_coverage(atlas: &[u8], code: u32) -> usize {
        let width = (ATLAS_COLUMNS * GLYPH_SIZE) as usize;
        let origin_x = ((code % ATLAS_COLUMNS) * GLYPH_SIZE) as usize;
        let origin_y = ((code / ATLAS_COLUMNS) * GLYPH_SIZE) as usize;
        (0..GLYPH_SIZE as usize)
            .flat_map(|y| (0..GLYPH_SIZE as usize).map(move |x| (x, y)))
            .filter(|(x, y)| atlas[(origin_y + y) * width + origin_x + x] != 0)
            .count()
    }

    #[test]
    fn atlas_has_expected_size() {
        assert_eq!(build_glyph_atlas().len(), 128 * 64);
    }

    #[test]
    fn printable_glyphs_have_pixels() {
        let atlas = build_glyph_atlas();
        assert_eq!(glyph_coverage(&atlas, b' ' as u32), 0);
        for c in [b'A', b'g', b'0', b'!', b':'] {
            assert!(glyph_coverage(&atlas, c as u32) > 0, "{} is empty", c as char);
        }
    }

    #[test]
    fn globals_never_divide_by_zero() {
        let globals = DebugTextGlobals::new([0, 0]);
        assert_eq!(globals.resolution, [1.0, 1.0]);
        assert_eq!(globals.cell_size, [8.0, 16.0]);
    }
}
