//! Bloom post-processing for the HDR scene.
//!
//! The scene is rendered into an HDR target. A bright-pass extracts everything
//! above the luminance threshold into a half-resolution target, which is then
//! blurred down a chain of [`MIP_LEVELS`] progressively smaller targets with a
//! separable gaussian that widens at every level. The composite pass adds the
//! weighted levels on top of the scene and writes the result to the surface.

use wgpu::util::DeviceExt;

use crate::{
    config::BloomConfig,
    data_structures::texture::{self, Texture},
    pipelines::basic,
};

pub const MIP_LEVELS: usize = 5;

/// Gaussian kernel size (and sigma) per blur level.
pub const KERNEL_SIZES: [u32; MIP_LEVELS] = [3, 5, 7, 9, 11];

const BLOOM_FACTORS: [f32; MIP_LEVELS] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Weight of blur level `level` in the composite. `radius` 0 favours the
/// sharp levels, 1 the wide ones.
pub fn bloom_factor(level: usize, radius: f32) -> f32 {
    let f = BLOOM_FACTORS[level];
    f + (1.2 - f - f) * radius
}

/// Size of blur level `level` for a `size` sized scene. Level 0 is half the
/// scene size, every further level halves again.
pub fn mip_size(size: [u32; 2], level: usize) -> [u32; 2] {
    let mut s = [size[0] as f32, size[1] as f32];
    for _ in 0..=level {
        s = s.map(|v| (v / 2.0).round());
    }
    s.map(|v| v.max(1.0) as u32)
}

/// Uniform shared by every bloom pass; each pass only reads its own fields.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BloomParams {
    pub direction: [f32; 2],
    pub kernel_radius: f32,
    pub threshold: f32,
    pub smooth_width: f32,
    pub strength: f32,
    pub texel_size: [f32; 2],
    pub factors: [[f32; 4]; 2],
}

impl BloomParams {
    fn high_pass(config: &BloomConfig) -> Self {
        Self {
            threshold: config.threshold,
            smooth_width: config.smooth_width,
            ..Default::default()
        }
    }

    fn blur(direction: [f32; 2], level: usize, size: [u32; 2]) -> Self {
        let [w, h] = mip_size(size, level);
        Self {
            direction,
            kernel_radius: KERNEL_SIZES[level] as f32,
            texel_size: [1.0 / w as f32, 1.0 / h as f32],
            ..Default::default()
        }
    }

    fn composite(config: &BloomConfig) -> Self {
        let f = |level| bloom_factor(level, config.radius);
        Self {
            strength: config.strength,
            factors: [[f(0), f(1), f(2), f(3)], [f(4), 0.0, 0.0, 0.0]],
            ..Default::default()
        }
    }
}

const BLUR_X: [f32; 2] = [1.0, 0.0];
const BLUR_Y: [f32; 2] = [0.0, 1.0];

/// Parameters of every pass in execution order: high pass, a horizontal and
/// a vertical blur per level, composite.
pub fn pass_params(config: &BloomConfig, size: [u32; 2]) -> Vec<BloomParams> {
    let mut params = vec![BloomParams::high_pass(config)];
    for level in 0..MIP_LEVELS {
        params.push(BloomParams::blur(BLUR_X, level, size));
        params.push(BloomParams::blur(BLUR_Y, level, size));
    }
    params.push(BloomParams::composite(config));
    params
}

/// Size-dependent render targets and the bind groups reading them.
#[derive(Debug)]
struct Targets {
    hdr: Texture,
    bright: Texture,
    horizontal: Vec<Texture>,
    vertical: Vec<Texture>,
    hdr_input: wgpu::BindGroup,
    /// Inputs of the horizontal and vertical pass of each level.
    blur_inputs: Vec<(wgpu::BindGroup, wgpu::BindGroup)>,
    composite_input: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct Bloom {
    config: BloomConfig,
    format: wgpu::TextureFormat,
    size: [u32; 2],
    sampler: wgpu::Sampler,
    texture_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    high_pass_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    params: Vec<(wgpu::Buffer, wgpu::BindGroup)>,
    targets: Targets,
}

impl Bloom {
    /// `format` is used for the scene and every blur target, `surface_format`
    /// for the composite output.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        surface_format: wgpu::TextureFormat,
        size: [u32; 2],
        config: BloomConfig,
    ) -> Self {
        let params_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_params_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = basic::mk_texture_bind_group_layout(device, "bloom_texture_bind_group_layout");
        let composite_layout = mk_composite_layout(device);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("bloom.wgsl").into()),
        });
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("bloom_composite.wgsl").into()),
        });

        let blur_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Pipeline Layout"),
            bind_group_layouts: &[&params_layout, &texture_layout],
            immediate_size: 0,
        });
        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Bloom Composite Pipeline Layout"),
                bind_group_layouts: &[&params_layout, &composite_layout],
                immediate_size: 0,
            });

        let high_pass_pipeline = basic::mk_fullscreen_pipeline(
            device,
            &shader,
            &blur_layout,
            "fs_high_pass",
            format,
            None,
            "Bloom High Pass Pipeline",
        );
        let blur_pipeline = basic::mk_fullscreen_pipeline(
            device,
            &shader,
            &blur_layout,
            "fs_blur",
            format,
            None,
            "Bloom Blur Pipeline",
        );
        let composite_pipeline = basic::mk_fullscreen_pipeline(
            device,
            &composite_shader,
            &composite_pipeline_layout,
            "fs_composite",
            surface_format,
            None,
            "Bloom Composite Pipeline",
        );

        let params = pass_params(&config, size)
            .into_iter()
            .map(|p| {
                let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Bloom Params Buffer"),
                    contents: bytemuck::cast_slice(&[p]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("bloom_params_bind_group"),
                    layout: &params_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffer.as_entire_binding(),
                    }],
                });
                (buffer, bind_group)
            })
            .collect();

        let sampler = texture::create_clamped_sampler(device);
        let targets = mk_targets(device, size, format, &sampler, &texture_layout, &composite_layout);

        Self {
            config,
            format,
            size,
            sampler,
            texture_layout,
            composite_layout,
            high_pass_pipeline,
            blur_pipeline,
            composite_pipeline,
            params,
            targets,
        }
    }

    /// The target the scene pass renders into.
    pub fn hdr_view(&self) -> &wgpu::TextureView {
        &self.targets.hdr.view
    }

    /// Recreates every target for the new size and refreshes the blur texel sizes.
    pub fn resize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, size: [u32; 2]) {
        if size == self.size || size[0] == 0 || size[1] == 0 {
            return;
        }
        self.size = size;
        self.targets = mk_targets(
            device,
            size,
            self.format,
            &self.sampler,
            &self.texture_layout,
            &self.composite_layout,
        );
        for ((buffer, _), p) in self.params.iter().zip(pass_params(&self.config, size)) {
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[p]));
        }
        log::debug!("Resized bloom targets to {}x{}", size[0], size[1]);
    }

    /// Runs every bloom pass and writes the composited frame to `output`.
    pub fn execute(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let t = &self.targets;
        let params = |pass: usize| &self.params[pass].1;

        run_pass(
            encoder,
            "Bloom High Pass",
            &self.high_pass_pipeline,
            params(0),
            &t.hdr_input,
            &t.bright.view,
        );
        for (level, (h_input, v_input)) in t.blur_inputs.iter().enumerate() {
            run_pass(
                encoder,
                "Bloom Blur H",
                &self.blur_pipeline,
                params(1 + 2 * level),
                h_input,
                &t.horizontal[level].view,
            );
            run_pass(
                encoder,
                "Bloom Blur V",
                &self.blur_pipeline,
                params(2 + 2 * level),
                v_input,
                &t.vertical[level].view,
            );
        }
        run_pass(
            encoder,
            "Bloom Composite",
            &self.composite_pipeline,
            params(1 + 2 * MIP_LEVELS),
            &t.composite_input,
            output,
        );
    }
}

fn run_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    pipeline: &wgpu::RenderPipeline,
    params: &wgpu::BindGroup,
    input: &wgpu::BindGroup,
    target: &wgpu::TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, params, &[]);
    pass.set_bind_group(1, input, &[]);
    pass.draw(0..3, 0..1);
}

fn mk_targets(
    device: &wgpu::Device,
    size: [u32; 2],
    format: wgpu::TextureFormat,
    sampler: &wgpu::Sampler,
    texture_layout: &wgpu::BindGroupLayout,
    composite_layout: &wgpu::BindGroupLayout,
) -> Targets {
    let hdr = Texture::create_render_target(device, size, format, "hdr_target");
    let bright = Texture::create_render_target(device, mip_size(size, 0), format, "bloom_bright");
    let horizontal: Vec<_> = (0..MIP_LEVELS)
        .map(|level| Texture::create_render_target(device, mip_size(size, level), format, "bloom_blur_h"))
        .collect();
    let vertical: Vec<_> = (0..MIP_LEVELS)
        .map(|level| Texture::create_render_target(device, mip_size(size, level), format, "bloom_blur_v"))
        .collect();

    let input = |view: &wgpu::TextureView, label: &str| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    };

    let hdr_input = input(&hdr.view, "bloom_hdr_input");
    let blur_inputs = (0..MIP_LEVELS)
        .map(|level| {
            let source = if level == 0 {
                &bright.view
            } else {
                &vertical[level - 1].view
            };
            (
                input(source, "bloom_blur_h_input"),
                input(&horizontal[level].view, "bloom_blur_v_input"),
            )
        })
        .collect();

    let mut entries: Vec<_> = std::iter::once(&hdr.view)
        .chain(vertical.iter().map(|t| &t.view))
        .enumerate()
        .map(|(binding, view)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: wgpu::BindingResource::TextureView(view),
        })
        .collect();
    entries.push(wgpu::BindGroupEntry {
        binding: (MIP_LEVELS + 1) as u32,
        resource: wgpu::BindingResource::Sampler(sampler),
    });
    let composite_input = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bloom_composite_input"),
        layout: composite_layout,
        entries: &entries,
    });

    Targets {
        hdr,
        bright,
        horizontal,
        vertical,
        hdr_input,
        blur_inputs,
        composite_input,
    }
}

/// The HDR scene and every blur level, then one sampler.
fn mk_composite_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let mut entries: Vec<_> = (0..=MIP_LEVELS as u32)
        .map(|binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        })
        .collect();
    entries.push(wgpu::BindGroupLayoutEntry {
        binding: (MIP_LEVELS + 1) as u32,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    });
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("bloom_composite_bind_group_layout"),
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_match_the_shader_layout() {
        assert_eq!(std::mem::size_of::<BloomParams>(), 64);
    }

    #[test]
    fn radius_blends_towards_wide_levels() {
        for level in 0..MIP_LEVELS {
            assert!((bloom_factor(level, 0.0) - BLOOM_FACTORS[level]).abs() < 1e-6);
            assert!((bloom_factor(level, 1.0) - (1.2 - BLOOM_FACTORS[level])).abs() < 1e-6);
        }
        // Default radius still favours the sharpest level
        assert!(bloom_factor(0, 0.4) > bloom_factor(4, 0.4));
        assert!((bloom_factor(0, 0.4) - 0.68).abs() < 1e-6);
    }

    #[test]
    fn mip_sizes_halve_and_round() {
        assert_eq!(mip_size([1024, 768], 0), [512, 384]);
        assert_eq!(mip_size([1024, 768], 4), [32, 24]);
        assert_eq!(mip_size([801, 3], 0), [401, 2]);
        assert_eq!(mip_size([801, 3], 4), [26, 1]);
    }

    #[test]
    fn one_params_block_per_pass() {
        let config = BloomConfig::default();
        let params = pass_params(&config, [1024, 768]);
        assert_eq!(params.len(), 2 + 2 * MIP_LEVELS);

        assert_eq!(params[0].threshold, config.threshold);
        assert_eq!(params[0].smooth_width, config.smooth_width);

        for level in 0..MIP_LEVELS {
            let h = params[1 + 2 * level];
            let v = params[2 + 2 * level];
            assert_eq!(h.direction, BLUR_X);
            assert_eq!(v.direction, BLUR_Y);
            assert_eq!(h.kernel_radius, KERNEL_SIZES[level] as f32);
            assert_eq!(h.texel_size, v.texel_size);
        }
        assert_eq!(params[1].texel_size, [1.0 / 512.0, 1.0 / 384.0]);

        let composite = params.last().unwrap();
        assert_eq!(composite.strength, config.strength);
        assert!((composite.factors[1][0] - bloom_factor(4, config.radius)).abs() < 1e-6);
    }
}
