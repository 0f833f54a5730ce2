use crate::{
    data_structures::texture::{self, Texture},
    pipelines::basic,
};

/// Full-viewport background image, drawn first in the scene pass.
///
/// Nothing is drawn until an image has been set, so the clear colour shows
/// through while it loads (or if it never does).
#[derive(Debug)]
pub struct Background {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    image: Option<(Texture, wgpu::BindGroup)>,
}

impl Background {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self {
        let layout = basic::mk_texture_bind_group_layout(device, "background_bind_group_layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Background Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("background.wgsl").into()),
        });
        let pipeline = basic::mk_fullscreen_pipeline(
            device,
            &shader,
            &pipeline_layout,
            "fs_background",
            color_format,
            Some(Texture::DEPTH_FORMAT),
            "Background Pipeline",
        );
        Self {
            pipeline,
            layout,
            image: None,
        }
    }

    pub fn set_image(&mut self, device: &wgpu::Device, mut image: Texture) {
        // Stretched over the viewport, so never wrap
        image.sampler = texture::create_clamped_sampler(device);
        let bind_group =
            basic::mk_texture_bind_group(device, &self.layout, &image, "background_bind_group");
        self.image = Some((image, bind_group));
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if let Some((_, bind_group)) = &self.image {
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}
