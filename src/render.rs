//! Frame rendering.
//!
//! [`Renderer`] owns every GPU resource of the scene and records one frame
//! as: shadow cube passes, the HDR scene pass (background, then every body),
//! then the bloom chain which writes the final image to the surface.

use std::iter;

use crate::{
    camera::{Camera, CameraResources, Projection},
    config::SceneConfig,
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        model::{DrawModel, Material, Mesh},
        scene_graph::{MaterialId, Renderable},
        texture::Texture,
    },
    pipelines::{
        background::Background,
        basic,
        bloom::Bloom,
        light::LightResources,
        shadow::{ShadowCaster, ShadowMap},
    },
    resources::{self, mesh, PendingImage},
    solar_system::{SolarSystem, SPHERE},
};

/// Where a texture goes once it has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextureSlot {
    EmissiveMap(MaterialId),
    Background,
}

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

#[derive(Debug)]
pub struct Renderer {
    pub camera: CameraResources,
    light: LightResources,
    shadow: ShadowMap,
    background: Background,
    bloom: Bloom,
    phong_pipeline: wgpu::RenderPipeline,
    material_layout: wgpu::BindGroupLayout,
    /// Indexed by [`crate::data_structures::scene_graph::GeometryId`].
    meshes: Vec<Mesh>,
    /// Indexed by [`MaterialId`].
    materials: Vec<Material>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    pending: Vec<(TextureSlot, PendingImage)>,
}

impl Renderer {
    /// Uploads the scene and starts loading every texture it references.
    ///
    /// On native this must run inside the tokio runtime the loads are spawned on.
    pub fn new(
        ctx: &Context,
        config: &SceneConfig,
        system: &SolarSystem,
        camera: Camera,
        projection: Projection,
    ) -> Self {
        let device = &ctx.device;
        let material_layout = resources::texture::material_layout(device);
        let camera = CameraResources::new(device, camera, projection);
        let shadow = ShadowMap::new(device, &config.lighting);
        let light = LightResources::new(device, &config.lighting, &shadow);

        let phong_pipeline = basic::mk_phong_pipeline(
            device,
            ctx.hdr_format,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
        );
        let background = Background::new(device, ctx.hdr_format);
        let bloom = Bloom::new(
            device,
            ctx.hdr_format,
            ctx.config.format,
            ctx.size(),
            config.bloom.clone(),
        );

        let bodies = &config.bodies;
        let (vertices, indices) = mesh::sphere(
            bodies.sphere_radius,
            bodies.width_segments,
            bodies.height_segments,
        );
        let mut meshes = Vec::new();
        meshes.insert(SPHERE.0, Mesh::new(device, "sphere", &vertices, &indices));

        let mut pending = Vec::new();
        let materials = system
            .materials
            .iter()
            .enumerate()
            .map(|(i, desc)| {
                // Black until the map arrives so nothing glows in the meantime
                let placeholder = match &desc.emissive_map {
                    Some(file_name) => {
                        pending.push((
                            TextureSlot::EmissiveMap(MaterialId(i)),
                            resources::request_image(file_name),
                        ));
                        BLACK
                    }
                    None => WHITE,
                };
                let emissive_map =
                    Texture::create_solid_colour(placeholder, &desc.name, device, &ctx.queue);
                Material::new(device, &desc.name, desc.uniform(), emissive_map, &material_layout)
            })
            .collect();
        pending.push((
            TextureSlot::Background,
            resources::request_image(&config.textures.background),
        ));

        let instance_capacity = system.graph.renderables().count().max(1);
        let instance_buffer = mk_instance_buffer(device, instance_capacity);

        Self {
            camera,
            light,
            shadow,
            background,
            bloom,
            phong_pipeline,
            material_layout,
            meshes,
            materials,
            instance_buffer,
            instance_capacity,
            pending,
        }
    }

    /// Number of textures still loading.
    pub fn pending_textures(&self) -> usize {
        self.pending.len()
    }

    /// Follows the surface to its new size.
    pub fn resize(&mut self, ctx: &Context) {
        self.bloom.resize(&ctx.device, &ctx.queue, ctx.size());
    }

    /// Swaps in every texture that finished loading since the last call.
    /// Failed loads are logged and keep their placeholder.
    pub fn poll_textures(&mut self, ctx: &Context) {
        let mut finished = Vec::new();
        self.pending.retain_mut(|(slot, pending)| match pending.poll() {
            Some(result) => {
                finished.push((*slot, pending.file_name.clone(), result));
                false
            }
            None => true,
        });

        for (slot, file_name, result) in finished {
            let image = match result {
                Ok(image) => image,
                Err(e) => {
                    log::error!("Failed to load {file_name}: {e:#}");
                    continue;
                }
            };
            let texture = Texture::from_image(&ctx.device, &ctx.queue, &image, Some(&file_name));
            match slot {
                TextureSlot::EmissiveMap(id) => match self.materials.get_mut(id.0) {
                    Some(material) => {
                        material.set_emissive_map(&ctx.device, texture, &self.material_layout)
                    }
                    None => log::warn!("{file_name} loaded for unknown material {id:?}"),
                },
                TextureSlot::Background => self.background.set_image(&ctx.device, texture),
            }
            log::info!(
                "Loaded {file_name} ({}x{}), {} still loading",
                image.width(),
                image.height(),
                self.pending_textures()
            );
        }
    }

    pub fn render(&mut self, ctx: &Context, system: &SolarSystem) -> Result<(), wgpu::SurfaceError> {
        self.camera.write_to_buffer(&ctx.queue);
        let renderables: Vec<Renderable> = system.graph.renderables().collect();
        self.upload_instances(ctx, &renderables);

        let output = ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let casters: Vec<ShadowCaster> = renderables
            .iter()
            .enumerate()
            .filter(|(_, r)| r.cast_shadow)
            .filter_map(|(i, r)| {
                Some(ShadowCaster {
                    mesh: self.meshes.get(r.geometry.0)?,
                    instance: i as u32,
                })
            })
            .collect();
        self.shadow
            .render(&mut encoder, &self.instance_buffer, &casters);

        {
            let mut scene_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.bloom.hdr_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            self.background.draw(&mut scene_pass);

            scene_pass.set_pipeline(&self.phong_pipeline);
            scene_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (i, renderable) in renderables.iter().enumerate() {
                let (Some(mesh), Some(material)) = (
                    self.meshes.get(renderable.geometry.0),
                    self.materials.get(renderable.material.0),
                ) else {
                    log::warn!("Skipping {:?}: unknown geometry or material", renderable.id);
                    continue;
                };
                let i = i as u32;
                scene_pass.draw_mesh_instanced(
                    mesh,
                    material,
                    i..i + 1,
                    &self.camera.bind_group,
                    &self.light.bind_group,
                );
            }
        }

        self.bloom.execute(&mut encoder, &view);

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn upload_instances(&mut self, ctx: &Context, renderables: &[Renderable]) {
        let raws: Vec<InstanceRaw> = renderables.iter().map(Renderable::to_raw).collect();
        if raws.len() > self.instance_capacity {
            self.instance_capacity = raws.len();
            self.instance_buffer = mk_instance_buffer(&ctx.device, self.instance_capacity);
        }
        ctx.queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&raws));
    }
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
