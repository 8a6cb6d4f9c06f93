//! Reference grid on the XZ plane, drawn as a line list

use crate::gfx::backend::Color;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl LineVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<LineVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Line list for a grid of `slices` cells per side centered on the origin
///
/// The two lines through the origin use [`Color::GRID_AXIS`].
pub fn grid_lines(slices: u32, spacing: f32) -> Vec<LineVertex> {
    let half = (slices / 2) as i32;
    let extent = half as f32 * spacing;
    let mut vertices = Vec::with_capacity((2 * half as usize + 1) * 4);

    for i in -half..=half {
        let color = if i == 0 {
            Color::GRID_AXIS
        } else {
            Color::GRID_LINE
        }
        .to_array();
        let offset = i as f32 * spacing;

        for position in [
            [offset, 0.0, -extent],
            [offset, 0.0, extent],
            [-extent, 0.0, offset],
            [extent, 0.0, offset],
        ] {
            vertices.push(LineVertex { position, color });
        }
    }

    vertices
}
