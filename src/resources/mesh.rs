use std::f32::consts::PI;

use crate::data_structures::model;

/// Builds a UV sphere centred on the origin.
///
/// Vertices are laid out row by row from the north pole (+Y) to the south
/// pole, each row holding `width_segments + 1` vertices so the texture seam
/// gets its own column. `tex_coords` run left to right around the sphere and
/// top to bottom from pole to pole. Degenerate triangles at the poles are
/// skipped.
pub fn sphere(
    radius: f32,
    width_segments: u32,
    height_segments: u32,
) -> (Vec<model::ModelVertex>, Vec<u32>) {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    let mut grid = Vec::with_capacity(height_segments as usize + 1);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        // Centre the texture on the pole vertices
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };

        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let theta = v * PI;

            let normal = [
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(model::ModelVertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                tex_coords: [u + u_offset, v],
                normal,
            });
            row.push(vertices.len() as u32 - 1);
        }
        grid.push(row);
    }

    let mut indices = Vec::with_capacity((6 * width_segments * (height_segments - 1)) as usize);
    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];

            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    (vertices, indices)
}
