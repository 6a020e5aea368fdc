/// Time step fed into [`animated_clear_color`] each frame, roughly 60 fps.
pub const FRAME_STEP: f32 = 0.016;

/// Slowly cycling background color at time `t`, packed as `0xRRGGBBAA`.
pub fn animated_clear_color(t: f32) -> u32 {
    let r = 0.2 + 0.2 * (0.5 + 0.5 * (t * 1.0).sin());
    let g = 0.2 + 0.2 * (0.5 + 0.5 * (t * 1.7).sin());
    let b = 0.4 + 0.4 * (0.5 + 0.5 * (t * 2.3).sin());
    pack_rgba([r, g, b, 1.0])
}

/// Packs normalized channels into `0xRRGGBBAA`, truncating each to a byte.
pub fn pack_rgba(rgba: [f32; 4]) -> u32 {
    let [r, g, b, a] = rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8 as u32);
    (r << 24) | (g << 16) | (b << 8) | a
}

pub fn unpack_rgba(rgba: u32) -> [f32; 4] {
    rgba.to_be_bytes().map(|c| c as f32 / 255.0)
}

pub fn rgba_to_color(rgba: u32) -> wgpu::Color {
    let [r, g, b, a] = unpack_rgba(rgba).map(f64::from);
    wgpu::Color {
        r,
        g,
        b,
        a,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn starts_at_mid_range() {
        // sin(0) = 0, so every channel sits halfway through its range
        let color = animated_clear_color(0.0);
        assert_eq!(color, 0x4c_4c_99_ff);
    }

    #[test]
    fn alpha_is_always_opaque() {
        let mut t = 0.0;
        for _ in 0..500 {
            assert_eq!(animated_clear_color(t) & 0xff, 0xff);
            t += FRAME_STEP;
        }
    }

    #[test]
    fn channels_stay_in_range() {
        let mut t = 0.0;
        for _ in 0..2000 {
            let [r, g, b, _] = unpack_rgba(animated_clear_color(t));
            assert!((0.19..=0.41).contains(&r));
            assert!((0.19..=0.41).contains(&g));
            assert!((0.39..=0.81).contains(&b));
            t += FRAME_STEP;
        }
    }

    #[test]
    fn converts_packed_color() {
        let color = rgba_to_color(0xff_00_80_ff);
        assert_relative_eq!(color.r, 1.0);
        assert_relative_eq!(color.g, 0.0);
        assert_relative_eq!(color.b, 128.0 / 255.0, epsilon = 1e-6);
        assert_relative_eq!(color.a, 1.0);
    }
}
