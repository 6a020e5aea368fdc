mod grid;
mod pipeline;

pub use grid::*;
pub use pipeline::*;
