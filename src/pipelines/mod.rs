mod debug_text;

pub use debug_text::*;
