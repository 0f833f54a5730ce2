use wgpu::util::DeviceExt;

use crate::{
    config::{hex_to_linear_rgb, LightingConfig},
    pipelines::shadow::{self, ShadowMap},
};

/// Point light, ambient light and the shadow cube's face matrices.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    /// Point light colour premultiplied by its intensity.
    pub color: [f32; 4],
    /// Ambient colour premultiplied by its intensity.
    pub ambient: [f32; 4],
    /// x: shadows enabled, y: bias towards the light, z: PCF step in texels
    /// of the unit cube face.
    pub shadow: [f32; 4],
    pub face_view_proj: [[[f32; 4]; 4]; shadow::FACES],
}

impl LightUniform {
    pub fn new(config: &LightingConfig, shadow_map_size: u32) -> Self {
        let [r, g, b] = hex_to_linear_rgb(config.color);
        let [x, y, z] = config.point_position;
        let point = config.point_intensity;
        let ambient = config.ambient_intensity;
        let faces = shadow::face_view_projs(config);
        Self {
            position: [x, y, z, 1.0],
            color: [r * point, g * point, b * point, 1.0],
            ambient: [r * ambient, g * ambient, b * ambient, 1.0],
            shadow: [
                if config.cast_shadow { 1.0 } else { 0.0 },
                config.shadow_bias,
                2.0 / shadow_map_size.max(1) as f32,
                0.0,
            ],
            face_view_proj: faces.map(|m| m.into()),
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, config: &LightingConfig, shadow_map: &ShadowMap) -> Self {
        let uniform = LightUniform::new(config, shadow_map.size);
        let buffer = mk_buffer(device, uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, shadow_map);
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::Cube,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    shadow_map: &ShadowMap,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.cube_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}
