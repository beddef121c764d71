use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

pub type Rgb = [u8; 3];

pub const GRAY: Rgb = [160, 160, 160];

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Rgb {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    [
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    ]
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_to_rgb((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

/// Blue → red ramp for a value in `[0, 1]` (used for the z axis of 3-D charts).
pub fn gradient(t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    hsl_to_rgb(240.0 * (1.0 - t as f32), 0.8, 0.5)
}

// ---------------------------------------------------------------------------
// Color mapping: category label → colour
// ---------------------------------------------------------------------------

/// Maps category labels (bar chart categories, box groups) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Rgb>,
    default_color: Rgb,
}

impl ColorMap {
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let palette = generate_palette(labels.len());
        let mapping = labels
            .iter()
            .zip(palette)
            .map(|(label, c)| (label.as_ref().to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: GRAY,
        }
    }

    pub fn color_for(&self, label: &str) -> Rgb {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}
