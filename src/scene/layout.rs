//! Resolution-independent layout maths for the menu

/// Ratio of the current screen height to the design height
pub fn scaling_factor(screen_height: u32, reference_resolution: u32) -> f32 {
    screen_height as f32 / reference_resolution as f32
}

/// Scales a design-time integer metric, truncating like an unsigned store
pub fn scale_metric(value: u32, factor: f32) -> u32 {
    (value as f32 * factor) as u32
}

/// Font size and glyph spacing at the current resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub size: u32,
    pub spacing: u32,
}

impl FontMetrics {
    pub fn scaled(size: u32, spacing: u32, factor: f32) -> Self {
        Self {
            size: scale_metric(size, factor),
            spacing: scale_metric(spacing, factor),
        }
    }
}

/// Where and how large the background image is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundPlacement {
    pub scale: f32,
    pub position: [f32; 2],
}

/// Fits the image to the screen height and centers it horizontally
pub fn background_placement(
    screen_width: u32,
    screen_height: u32,
    image_width: u32,
    image_height: u32,
) -> BackgroundPlacement {
    let scale = screen_height as f32 / image_height as f32;
    let x = (screen_width as f32 - image_width as f32 * scale) / 2.0;
    BackgroundPlacement {
        scale,
        position: [x, 0.0],
    }
}

/// Horizontally centered position for a block of the given width
pub fn centered_x(screen_width: u32, width: f32) -> f32 {
    (screen_width as f32 - width) / 2.0
}
