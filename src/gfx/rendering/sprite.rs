//! Textured 2D quads in normalized device coordinates
//!
//! Positions come in as pixels with a top-left origin. When the pass targets a
//! render target the quad is mirrored vertically so the target keeps a
//! bottom-left origin, the same as the 3D path does with `FLIP_Y_MATRIX`.

use crate::gfx::backend::{Color, Rectangle};

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl SpriteVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Pixel size of the pass a quad is drawn into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Set for render targets, which keep a bottom-left origin
    pub flip_y: bool,
}

impl Viewport {
    pub fn new(width: u32, height: u32, flip_y: bool) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            flip_y,
        }
    }

    fn to_ndc(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let ndc_x = x / self.width * 2.0 - 1.0;
        let ndc_y = if self.flip_y {
            y / self.height * 2.0 - 1.0
        } else {
            1.0 - y / self.height * 2.0
        };
        [ndc_x, ndc_y]
    }
}

/// Two triangles sampling `source` of a `texture_size` texture into `dest`
///
/// A negative source width or height mirrors the sampled region on that axis.
/// `rotation` is in degrees, clockwise on screen, around the top-left corner
/// of `dest`.
pub fn textured_quad(
    texture_size: [u32; 2],
    source: Rectangle,
    dest: Rectangle,
    rotation: f32,
    tint: Color,
    viewport: Viewport,
) -> [SpriteVertex; 6] {
    let tex_w = texture_size[0].max(1) as f32;
    let tex_h = texture_size[1].max(1) as f32;

    let mut u0 = source.x / tex_w;
    let mut u1 = (source.x + source.width.abs()) / tex_w;
    let mut v0 = source.y / tex_h;
    let mut v1 = (source.y + source.height.abs()) / tex_h;
    if source.width < 0.0 {
        std::mem::swap(&mut u0, &mut u1);
    }
    if source.height < 0.0 {
        std::mem::swap(&mut v0, &mut v1);
    }

    let (sin, cos) = rotation.to_radians().sin_cos();
    let corner = |dx: f32, dy: f32| -> [f32; 2] {
        [
            dest.x + dx * cos - dy * sin,
            dest.y + dx * sin + dy * cos,
        ]
    };

    let color = tint.to_array();
    let vertex = |point: [f32; 2], uv: [f32; 2]| SpriteVertex {
        position: viewport.to_ndc(point),
        uv,
        color,
    };

    let top_left = vertex(corner(0.0, 0.0), [u0, v0]);
    let top_right = vertex(corner(dest.width, 0.0), [u1, v0]);
    let bottom_left = vertex(corner(0.0, dest.height), [u0, v1]);
    let bottom_right = vertex(corner(dest.width, dest.height), [u1, v1]);

    [
        top_left,
        bottom_left,
        top_right,
        top_right,
        bottom_left,
        bottom_right,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: Rectangle = Rectangle::new(0.0, 0.0, 100.0, 50.0);

    #[test]
    fn test_full_screen_quad_covers_ndc() {
        let quad = textured_quad(
            [100, 50],
            FULL,
            FULL,
            0.0,
            Color::WHITE,
            Viewport::new(100, 50, false),
        );

        assert_eq!(quad[0].position, [-1.0, 1.0]);
        assert_eq!(quad[0].uv, [0.0, 0.0]);
        assert_eq!(quad[5].position, [1.0, -1.0]);
        assert_eq!(quad[5].uv, [1.0, 1.0]);
    }

    #[test]
    fn test_negative_height_mirrors_v() {
        let source = Rectangle::new(0.0, 0.0, 100.0, -50.0);
        let quad = textured_quad(
            [100, 50],
            source,
            FULL,
            0.0,
            Color::WHITE,
            Viewport::new(100, 50, false),
        );

        assert_eq!(quad[0].uv, [0.0, 1.0]);
        assert_eq!(quad[5].uv, [1.0, 0.0]);
    }

    #[test]
    fn test_render_target_viewport_is_bottom_left() {
        let quad = textured_quad(
            [100, 50],
            FULL,
            FULL,
            0.0,
            Color::WHITE,
            Viewport::new(100, 50, true),
        );

        // pixel row 0 lands at the bottom of clip space
        assert_eq!(quad[0].position, [-1.0, -1.0]);
        assert_eq!(quad[5].position, [1.0, 1.0]);
    }

    #[test]
    fn test_rotation_pivots_on_top_left() {
        let dest = Rectangle::new(10.0, 10.0, 20.0, 10.0);
        let quad = textured_quad(
            [20, 10],
            Rectangle::new(0.0, 0.0, 20.0, 10.0),
            dest,
            90.0,
            Color::WHITE,
            Viewport::new(100, 100, false),
        );

        assert_eq!(quad[0].position, Viewport::new(100, 100, false).to_ndc([10.0, 10.0]));
        // the right edge swings down
        let right = quad[2].position;
        let expected = Viewport::new(100, 100, false).to_ndc([10.0, 30.0]);
        assert!((right[0] - expected[0]).abs() < 1e-5);
        assert!((right[1] - expected[1]).abs() < 1e-5);
    }

    #[test]
    fn test_tint_is_normalized() {
        let quad = textured_quad(
            [1, 1],
            Rectangle::new(0.0, 0.0, 1.0, 1.0),
            Rectangle::new(0.0, 0.0, 1.0, 1.0),
            0.0,
            Color::BLACK,
            Viewport::new(1, 1, false),
        );
        assert!(quad.iter().all(|v| v.color == [0.0, 0.0, 0.0, 1.0]));
    }
}
