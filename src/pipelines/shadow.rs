//! Omnidirectional shadows for the point light.
//!
//! The scene's depth as seen from the light is rendered into the six faces of
//! a depth cube map. Every face has its own view-projection whose NDC lines up
//! with the cube map's sampling convention, so the phong shader can look a
//! fragment up by its direction from the light and compare it against depth
//! computed with the same matrix.

use cgmath::{InnerSpace, Matrix, Matrix4, Point3, Vector3, Vector4};
use wgpu::util::DeviceExt;

use crate::{
    config::LightingConfig,
    data_structures::{
        instance::InstanceRaw,
        model::{DrawModel, Mesh, ModelVertex, Vertex},
        texture::Texture,
    },
};

pub const FACES: usize = 6;

/// `(forward, right, up)` per face in cube map order: +X, -X, +Y, -Y, +Z, -Z.
const FACE_BASES: [([f32; 3], [f32; 3], [f32; 3]); FACES] = [
    ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
];

/// Index of the cube face a direction from the light falls on (major axis).
pub fn shadow_face(direction: Vector3<f32>) -> usize {
    let a = Vector3::new(direction.x.abs(), direction.y.abs(), direction.z.abs());
    if a.x >= a.y && a.x >= a.z {
        if direction.x > 0.0 { 0 } else { 1 }
    } else if a.y >= a.z {
        if direction.y > 0.0 { 2 } else { 3 }
    } else if direction.z > 0.0 {
        4
    } else {
        5
    }
}

/// 90° perspective view-projection of one cube face, with depth in `[0, 1]`.
pub fn face_view_proj(face: usize, light: Point3<f32>, near: f32, far: f32) -> Matrix4<f32> {
    let (forward, right, up) = FACE_BASES[face % FACES];
    let (forward, right, up) = (
        Vector3::from(forward),
        Vector3::from(right),
        Vector3::from(up),
    );
    let origin = Vector3::new(light.x, light.y, light.z);
    let a = far / (far - near);
    let b = -far * near / (far - near);

    let row = |axis: Vector3<f32>, scale: f32, offset: f32| {
        Vector4::new(
            axis.x * scale,
            axis.y * scale,
            axis.z * scale,
            -axis.dot(origin) * scale + offset,
        )
    };
    Matrix4::from_cols(
        row(right, 1.0, 0.0),
        row(up, 1.0, 0.0),
        row(forward, a, b),
        row(forward, 1.0, 0.0),
    )
    .transpose()
}

pub fn face_view_projs(config: &LightingConfig) -> [Matrix4<f32>; FACES] {
    let light = Point3::from(config.point_position);
    std::array::from_fn(|face| face_view_proj(face, light, config.shadow_near, config.shadow_far))
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FaceUniform {
    view_proj: [[f32; 4]; 4],
}

/// One shadow caster: a mesh and the index of its instance in the instance buffer.
pub struct ShadowCaster<'a> {
    pub mesh: &'a Mesh,
    pub instance: u32,
}

#[derive(Debug)]
pub struct ShadowMap {
    pub enabled: bool,
    pub size: u32,
    #[allow(unused)]
    texture: wgpu::Texture,
    /// Cube view sampled by the phong shader.
    pub cube_view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    face_views: Vec<wgpu::TextureView>,
    face_bind_groups: Vec<wgpu::BindGroup>,
    pipeline: wgpu::RenderPipeline,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device, config: &LightingConfig) -> Self {
        // A disabled shadow map still has to be bound, keep it tiny
        let size = if config.cast_shadow {
            config.shadow_map_size.max(1)
        } else {
            1
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_cube_texture"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: FACES as u32,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Texture::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let cube_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow_cube_view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let face_views = (0..FACES as u32)
            .map(|layer| {
                texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("shadow_face_view"),
                    dimension: Some(wgpu::TextureViewDimension::D2),
                    base_array_layer: layer,
                    array_layer_count: Some(1),
                    ..Default::default()
                })
            })
            .collect();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let face_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow_face_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let face_bind_groups = face_view_projs(config)
            .iter()
            .map(|view_proj| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Shadow Face Buffer"),
                    contents: bytemuck::cast_slice(&[FaceUniform {
                        view_proj: (*view_proj).into(),
                    }]),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("shadow_face_bind_group"),
                    layout: &face_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();

        let pipeline = mk_shadow_pipeline(device, &face_layout);

        Self {
            enabled: config.cast_shadow,
            size,
            texture,
            cube_view,
            sampler,
            face_views,
            face_bind_groups,
            pipeline,
        }
    }

    /// Renders every caster into all six faces.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        instance_buffer: &wgpu::Buffer,
        casters: &[ShadowCaster<'_>],
    ) {
        if !self.enabled {
            return;
        }
        for (view, bind_group) in self.face_views.iter().zip(&self.face_bind_groups) {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.set_vertex_buffer(1, instance_buffer.slice(..));
            for caster in casters {
                pass.draw_mesh_depth(caster.mesh, caster.instance..caster.instance + 1);
            }
        }
    }
}

fn mk_shadow_pipeline(
    device: &wgpu::Device,
    face_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[face_layout],
        immediate_size: 0,
    });
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Shadow Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[ModelVertex::desc(), InstanceRaw::desc()],
            compilation_options: Default::default(),
        },
        // The faces are mirrored relative to a regular camera, so culling
        // "back" faces drops the ones facing the light.
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: None,
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(m: &Matrix4<f32>, p: Vector3<f32>) -> (Vector3<f32>, f32) {
        let clip = *m * p.extend(1.0);
        (clip.truncate() / clip.w, clip.w)
    }

    #[test]
    fn major_axis_picks_the_face() {
        assert_eq!(shadow_face(Vector3::new(3.0, 1.0, -2.0)), 0);
        assert_eq!(shadow_face(Vector3::new(-3.0, 1.0, -2.0)), 1);
        assert_eq!(shadow_face(Vector3::new(0.1, 5.0, 0.0)), 2);
        assert_eq!(shadow_face(Vector3::new(0.1, -5.0, 0.0)), 3);
        assert_eq!(shadow_face(Vector3::new(0.0, 0.5, 1.0)), 4);
        assert_eq!(shadow_face(Vector3::new(0.0, 0.5, -1.0)), 5);
    }

    #[test]
    fn chosen_face_contains_the_direction() {
        let config = LightingConfig::default();
        let faces = face_view_projs(&config);
        let steps = [-1.0f32, -0.6, -0.2, 0.3, 0.7, 1.0];
        for &x in &steps {
            for &y in &steps {
                for &z in &steps {
                    let p = Vector3::new(x, y, z).normalize() * 20.0;
                    let (ndc, w) = project(&faces[shadow_face(p)], p);
                    assert!(w > 0.0);
                    assert!(ndc.x.abs() <= 1.0 + 1e-5 && ndc.y.abs() <= 1.0 + 1e-5);
                    assert!(ndc.z >= 0.0 && ndc.z <= 1.0);
                }
            }
        }
    }

    #[test]
    fn faces_follow_cube_map_orientation() {
        let faces = face_view_projs(&LightingConfig::default());
        // +X face: s follows -z and t follows -y
        let (ndc, _) = project(&faces[0], Vector3::new(10.0, 5.0, -5.0));
        assert!((ndc.x - 0.5).abs() < 1e-5);
        assert!((ndc.y - 0.5).abs() < 1e-5);
        // +Y face: s follows +x and t follows +z
        let (ndc, _) = project(&faces[2], Vector3::new(5.0, 10.0, 5.0));
        assert!((ndc.x - 0.5).abs() < 1e-5);
        assert!((ndc.y + 0.5).abs() < 1e-5);
    }

    #[test]
    fn depth_spans_near_to_far() {
        let config = LightingConfig::default();
        let m = face_view_proj(4, Point3::new(0.0, 0.0, 0.0), config.shadow_near, config.shadow_far);
        let (near, _) = project(&m, Vector3::new(0.0, 0.0, config.shadow_near));
        let (far, _) = project(&m, Vector3::new(0.0, 0.0, config.shadow_far));
        assert!(near.z.abs() < 1e-4);
        assert!((far.z - 1.0).abs() < 1e-4);
    }
}
