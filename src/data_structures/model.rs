//! Meshes, materials and the draw helpers that bind them.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::{config::hex_to_linear_rgb, data_structures::texture::Texture};

/// Phong specular colour and shininess shared by every material.
const SPECULAR: u32 = 0x111111;
const SHININESS: f32 = 30.0;

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
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
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Indexed geometry living on the GPU.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl Mesh {
    pub fn new(device: &wgpu::Device, name: &str, vertices: &[ModelVertex], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Vertex Buffer", name)),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{:?} Index Buffer", name)),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: name.to_string(),
            vertex_buffer,
            index_buffer,
            num_elements: indices.len() as u32,
        }
    }
}

/// Phong parameters uploaded per material.
///
/// `emissive` is multiplied with the emissive map; `flags.x` is 1.0 when the
/// material receives shadows.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 4],
    pub emissive: [f32; 4],
    pub specular: [f32; 4],
    pub flags: [f32; 4],
}

impl MaterialUniform {
    /// `color` and `emissive` are linear RGB. Specular and shininess are the
    /// usual Phong defaults.
    pub fn new(color: [f32; 3], emissive: [f32; 3], receive_shadow: bool) -> Self {
        let specular = hex_to_linear_rgb(SPECULAR);
        Self {
            color: [color[0], color[1], color[2], 1.0],
            emissive: [emissive[0], emissive[1], emissive[2], 1.0],
            specular: [specular[0], specular[1], specular[2], SHININESS],
            flags: [if receive_shadow { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// Uniform + emissive map bound together at group 0 of the phong pipeline.
#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub uniform: MaterialUniform,
    pub buffer: wgpu::Buffer,
    pub emissive_map: Texture,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        uniform: MaterialUniform,
        emissive_map: Texture,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Material Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = mk_material_bind_group(device, name, &buffer, &emissive_map, layout);
        Self {
            name: name.to_string(),
            uniform,
            buffer,
            emissive_map,
            bind_group,
        }
    }

    /// Swaps the placeholder for a freshly loaded emissive map.
    pub fn set_emissive_map(
        &mut self,
        device: &wgpu::Device,
        emissive_map: Texture,
        layout: &wgpu::BindGroupLayout,
    ) {
        self.bind_group =
            mk_material_bind_group(device, &self.name, &self.buffer, &emissive_map, layout);
        self.emissive_map = emissive_map;
    }
}

fn mk_material_bind_group(
    device: &wgpu::Device,
    name: &str,
    buffer: &wgpu::Buffer,
    emissive_map: &Texture,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&emissive_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&emissive_map.sampler),
            },
        ],
        label: Some(name),
    })
}

pub trait DrawModel<'a> {
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        instances: Range<u32>,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );

    /// Geometry only, for depth passes whose bind groups are already set.
    fn draw_mesh_depth(&mut self, mesh: &'a Mesh, instances: Range<u32>);
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh_instanced(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        instances: Range<u32>,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }

    fn draw_mesh_depth(&mut self, mesh: &'b Mesh, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_uniform_is_std140_friendly() {
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }

    #[test]
    fn specular_is_decoded_like_every_other_colour() {
        let uniform = MaterialUniform::new([1.0; 3], [0.0; 3], true);
        let expected = hex_to_linear_rgb(0x111111);
        assert_eq!(&uniform.specular[..3], &expected[..]);
        // 0x11 is about 0.0056 in linear space, not 0x11 / 255
        assert!((uniform.specular[0] - 0.005_605).abs() < 1e-5);
        assert_eq!(uniform.specular[3], 30.0);
    }

    #[test]
    fn receive_shadow_flag_is_encoded() {
        assert_eq!(MaterialUniform::new([1.0; 3], [0.0; 3], true).flags[0], 1.0);
        assert_eq!(MaterialUniform::new([1.0; 3], [0.0; 3], false).flags[0], 0.0);
    }

    #[test]
    fn vertex_layout_covers_whole_vertex() {
        let desc = ModelVertex::desc();
        assert_eq!(desc.array_stride, 8 * 4);
        assert_eq!(desc.attributes.len(), 3);
    }
}
