use bytemuck::{Pod, Zeroable};

use crate::color::unpack_rgba;

/// Pixel width of one text cell.
pub const CELL_WIDTH: u32 = 8;
/// Pixel height of one text cell. Glyph rows are doubled to fill it.
pub const CELL_HEIGHT: u32 = 16;

/// 16 color VGA palette, `0xRRGGBBAA`. Index 0 is transparent so it can serve as "no background".
pub const PALETTE: [u32; 16] = [
    0x00000000, // black (transparent)
    0x0000aaff, // blue
    0x00aa00ff, // green
    0x00aaaaff, // cyan
    0xaa0000ff, // red
    0xaa00aaff, // magenta
    0xaa5500ff, // brown
    0xaaaaaaff, // light gray
    0x555555ff, // dark gray
    0x5555ffff, // light blue
    0x55ff55ff, // light green
    0x55ffffff, // light cyan
    0xff5555ff, // light red
    0xff55ffff, // light magenta
    0xffff55ff, // yellow
    0xffffffff, // white
];

/// One character cell. `attr` is VGA style: low nibble foreground, high nibble background.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cell {
    pub glyph: u8,
    pub attr: u8,
}

impl Cell {
    pub fn blank(attr: u8) -> Cell {
        Cell {
            glyph: b' ',
            attr,
        }
    }

    fn is_visible(&self) -> bool {
        self.glyph != b' ' || self.attr >> 4 != 0
    }
}

/// Per-cell data consumed by the debug text shader.
#[repr(C)]
#[derive(Default, Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    pub position: [f32; 2],
    pub glyph: u32,
    pub _pad: u32,
    pub foreground: [f32; 4],
    pub background: [f32; 4],
}

impl GlyphInstance {
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<GlyphInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Uint32,
                },
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: 16 + size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// CPU side text buffer laid over the backbuffer in fixed size cells.
#[derive(Debug, Clone)]
pub struct DebugTextGrid {
    columns: u32,
    rows: u32,
    clear_attr: u8,
    cells: Vec<Cell>,
}

impl DebugTextGrid {
    /// Grid covering a `width` x `height` pixel target.
    pub fn new(width: u32, height: u32) -> DebugTextGrid {
        let columns = width / CELL_WIDTH;
        let rows = height / CELL_HEIGHT;
        DebugTextGrid {
            columns,
            rows,
            clear_attr: 0,
            cells: vec![Cell::blank(0); (columns * rows) as usize],
        }
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Resize to a new target. Contents are cleared with the last clear attribute.
    pub fn resize(&mut self, width: u32, height: u32) {
        let attr = self.clear_attr;
        *self = DebugTextGrid::new(width, height);
        self.clear(attr);
    }

    pub fn clear(&mut self, attr: u8) {
        self.clear_attr = attr;
        self.cells.fill(Cell::blank(attr));
    }

    /// Write `text` starting at `column`, `row`. Text past the right edge is dropped, characters
    /// outside printable ASCII become `?`.
    pub fn print(&mut self, column: u32, row: u32, attr: u8, text: &str) {
        if row >= self.rows {
            return;
        }
        let start = (row * self.columns) as usize;
        for (col, ch) in (column..self.columns).zip(text.chars()) {
            let glyph = if ch.is_ascii_graphic() || ch == ' ' {
                ch as u8
            } else {
                b'?'
            };
            self.cells[start + col as usize] = Cell {
                glyph,
                attr,
            };
        }
    }

    pub fn cell(&self, column: u32, row: u32) -> Option<Cell> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        self.cells.get((row * self.columns + column) as usize).copied()
    }

    /// Visible cells, ready for upload.
    pub fn instances(&self) -> Vec<GlyphInstance> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_visible())
            .map(|(i, cell)| {
                let column = i as u32 % self.columns;
                let row = i as u32 / self.columns;
                GlyphInstance {
                    position: [(column * CELL_WIDTH) as f32, (row * CELL_HEIGHT) as f32],
                    glyph: cell.glyph as u32,
                    _pad: 0,
                    foreground: unpack_rgba(PALETTE[(cell.attr & 0x0f) as usize]),
                    background: unpack_rgba(PALETTE[(cell.attr >> 4) as usize]),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_follows_resolution() {
        let grid = DebugTextGrid::new(1280, 720);
        assert_eq!(grid.columns(), 160);
        assert_eq!(grid.rows(), 45);
    }

    #[test]
    fn print_writes_cells() {
        let mut grid = DebugTextGrid::new(1280, 720);
        grid.print(2, 1, 0x0f, "Hi");
        assert_eq!(grid.cell(2, 1), Some(Cell {
            glyph: b'H',
            attr: 0x0f
        }));
        assert_eq!(grid.cell(3, 1).map(|c| c.glyph), Some(b'i'));
        assert_eq!(grid.cell(4, 1), Some(Cell::blank(0)));
    }

    #[test]
    fn print_clips_at_edges() {
        let mut grid = DebugTextGrid::new(32, 32);
        grid.print(2, 0, 0x0e, "abcdef");
        assert_eq!(grid.cell(3, 0).map(|c| c.glyph), Some(b'b'));
        assert_eq!(grid.cell(4, 0), None);
        grid.print(0, 2, 0x0e, "out of bounds");
        assert_eq!(grid.instances().len(), 2);
    }

    #[test]
    fn non_ascii_is_replaced() {
        let mut grid = DebugTextGrid::new(64, 16);
        grid.print(0, 0, 0x0a, "é\t");
        assert_eq!(grid.cell(0, 0).map(|c| c.glyph), Some(b'?'));
        assert_eq!(grid.cell(1, 0).map(|c| c.glyph), Some(b'?'));
    }

    #[test]
    fn clear_resets_text_and_keeps_background_cells() {
        let mut grid = DebugTextGrid::new(64, 32);
        grid.print(0, 0, 0x0f, "x");
        grid.clear(0);
        assert!(grid.instances().is_empty());
        grid.clear(0x10);
        assert_eq!(grid.instances().len(), (grid.columns() * grid.rows()) as usize);
    }

    #[test]
    fn instances_carry_palette_colors() {
        let mut grid = DebugTextGrid::new(64, 32);
        grid.print(1, 1, 0x2e, "A");
        let instances = grid.instances();
        assert_eq!(instances.len(), 1);
        let instance = instances[0];
        assert_eq!(instance.position, [8.0, 16.0]);
        assert_eq!(instance.glyph, b'A' as u32);
        assert_eq!(instance.foreground, unpack_rgba(PALETTE[0x0e]));
        assert_eq!(instance.background, unpack_rgba(PALETTE[0x02]));
    }

    #[test]
    fn resize_clears_with_last_attr() {
        let mut grid = DebugTextGrid::new(64, 32);
        grid.clear(0x01);
        grid.print(0, 0, 0x0f, "x");
        grid.resize(16, 16);
        assert_eq!(grid.columns(), 2);
        assert_eq!(grid.cell(0, 0), Some(Cell::blank(0x01)));
    }

    #[test]
    fn instance_layout_matches_shader_offsets() {
        assert_eq!(size_of::<GlyphInstance>(), 48);
    }
}
