//! Display colors for detection overlays.

use crate::detection::Rgb;

/// Fixed color for face detections.
pub const FACE_COLOR: Rgb = Rgb(0, 255, 0);

/// Number of distinct hues in the object palette; class ids beyond it fall
/// back to white.
const PALETTE_SIZE: usize = 20;

/// Fallback color for class ids outside the palette.
const FALLBACK_COLOR: Rgb = Rgb(255, 255, 255);

/// Display color for an object class id.
pub fn object_class_color(class_id: usize) -> Rgb {
    if class_id < PALETTE_SIZE {
        hsv_to_rgb(class_id as f64 / PALETTE_SIZE as f64, 0.7, 0.9)
    } else {
        FALLBACK_COLOR
    }
}

/// Convert HSV (all components in [0, 1]) to an 8-bit RGB triple.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let i = (h * 6.0).floor();
    let f = h * 6.0 - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);

    let (r, g, b) = match (i as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Rgb((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}
