//! wgpu renderer
//!
//! A frame is two passes recorded into one command encoder and submitted
//! once. The shadow pass renders scene depth from a dedicated orthographic
//! camera into an offscreen texture and yields the light view-projection
//! matrix; the forward pass binds that texture through a comparison sampler
//! and shades the scene from the main camera.
//!
//! Each pass plans the same depth-first traversal of the graph, uploads
//! uniforms for every visited node, then replays the plan as indexed draws.
//! GPU resources are resolved through [`cache::GpuCache`] on first use and
//! reused afterwards.

mod cache;
mod layouts;

pub use layouts::{SHADOW_DEPTH_FORMAT, SURFACE_DEPTH_FORMAT};

use crate::scene::{Camera, DrawList, Node, Scene};
use crate::{RendererConfig, Shading};
use cache::GpuCache;
use glam::Mat4;
use layouts::Pipelines;
use std::sync::Arc;
use thiserror::Error;

/// Clear color of the forward pass, a light sky blue
const SKY_COLOR: wgpu::Color = wgpu::Color {
    r: 0.835,
    g: 0.957,
    b: 1.0,
    a: 1.0,
};

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no suitable graphics adapter found")]
    AdapterNotFound,

    #[error("failed to create rendering surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),

    #[error("failed to acquire graphics device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    #[error("failed to acquire surface frame: {0}")]
    SurfaceAcquire(#[from] wgpu::SurfaceError),

    #[error("node '{0}' not found in scene")]
    NodeNotFound(String),

    #[error("node '{node}' has no {component} component")]
    MissingComponent {
        node: String,
        component: &'static str,
    },

    #[error("GPU record missing for an entity referenced during pass recording")]
    MissingRecord,
}

/// Combined view-projection of the shadow camera, the matrix that maps world
/// space into the shadow map
pub(crate) fn light_view_projection(camera: &Camera, global: Mat4) -> Mat4 {
    camera.projection_matrix() * Camera::view_from_global(global)
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    pipelines: Pipelines,
    cache: GpuCache,
    shadow_view: wgpu::TextureView,
    shadow_sampler: wgpu::Sampler,
    shadow_map_view_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
    shading: Shading,
    show_shadow_map: bool,
}

impl Renderer {
    /// Create the device, surface, pipelines and shadow targets. Once this
    /// returns, the renderer is fully ready; there is no partially
    /// initialized state to observe.
    pub async fn initialize(
        window: Arc<winit::window::Window>,
        config: &RendererConfig,
    ) -> Result<Self, RendererError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::AdapterNotFound)?;
        log::info!("using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("main device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(caps.formats[0]);

        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if config.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            desired_maximum_frame_latency: 2,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
        };
        surface.configure(&device, &surface_config);

        let pipelines = Pipelines::build(&device, surface_format);

        let shadow_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow map"),
            size: wgpu::Extent3d {
                width: config.shadow_map_size,
                height: config.shadow_map_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_view = shadow_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow comparison sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::Less),
            ..Default::default()
        });

        // plain nearest sampler for the grayscale debug view
        let shadow_map_view_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow map view sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let shadow_map_view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow map view bind group"),
            layout: &pipelines.layouts.shadow_map_view,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&shadow_map_view_sampler),
                },
            ],
        });

        let depth_view =
            create_depth_target(&device, surface_config.width, surface_config.height);
        let depth_size = (surface_config.width, surface_config.height);

        log::info!(
            "renderer initialized: {}x{} surface, {}x{} shadow map",
            surface_config.width,
            surface_config.height,
            config.shadow_map_size,
            config.shadow_map_size
        );

        Ok(Self {
            device,
            queue,
            surface,
            surface_config,
            pipelines,
            cache: GpuCache::new(),
            shadow_view,
            shadow_sampler,
            shadow_map_view_bind_group,
            depth_view,
            depth_size,
            shading: config.shading,
            show_shadow_map: config.show_shadow_map,
        })
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub fn shading(&self) -> Shading {
        self.shading
    }

    /// Switch the forward shading model; takes effect next frame
    pub fn set_shading(&mut self, shading: Shading) {
        self.shading = shading;
    }

    pub fn show_shadow_map(&self) -> bool {
        self.show_shadow_map
    }

    /// When enabled, the next frames display the shadow depth texture as
    /// grayscale instead of the shaded scene
    pub fn set_show_shadow_map(&mut self, show: bool) {
        self.show_shadow_map = show;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        log::debug!("surface resized to {}x{}", width, height);
    }

    /// Render one frame: shadow pass, then forward pass, one submission.
    /// The nodes are looked up by name; the shadow camera must carry an
    /// orthographic camera component and the light node a directional light.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        camera: &str,
        shadow_camera: &str,
        light: &str,
    ) -> Result<(), RendererError> {
        let camera_node = find_node(scene, camera)?;
        let shadow_node = find_node(scene, shadow_camera)?;
        let light_node = find_node(scene, light)?;

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // skip the frame, the surface comes back reconfigured
                self.surface.configure(&self.device, &self.surface_config);
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        let light_vp = self.render_shadow_map(&mut encoder, scene, shadow_node, light_node)?;
        if self.show_shadow_map {
            self.render_shadow_map_view(&mut encoder, &view);
        } else {
            self.render(&mut encoder, &view, scene, camera_node, light_node, light_vp)?;
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Depth-only pass into the shadow map from the shadow camera's point of
    /// view. Returns the light view-projection matrix for the forward pass.
    pub fn render_shadow_map(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        shadow_camera: &Node,
        light: &Node,
    ) -> Result<Mat4, RendererError> {
        let camera = component(shadow_camera, shadow_camera.camera.as_ref(), "camera")?;
        let light_component = component(light, light.light.as_ref(), "light")?;
        let global = scene
            .global_matrix(shadow_camera.id())
            .ok_or_else(|| RendererError::NodeNotFound(shadow_camera.name.clone()))?;

        let camera_data = camera.uniform_data(global);
        let light_vp = light_view_projection(camera, global);

        let plan = DrawList::plan(&scene.root);
        self.prepare_draws(&plan);

        let camera_record = self
            .cache
            .camera(&self.device, &self.pipelines.layouts, camera);
        self.queue.write_buffer(
            &camera_record.uniform_buffer,
            0,
            bytemuck::bytes_of(&camera_data),
        );

        let light_record =
            self.cache
                .light_shadow(&self.device, &self.pipelines.layouts, light_component);
        self.queue.write_buffer(
            &light_record.uniform_buffer,
            0,
            bytemuck::bytes_of(&light_component.uniform_data()),
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.shadow_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.shadow);
        let camera_record = self
            .cache
            .camera_record(camera.id())
            .ok_or(RendererError::MissingRecord)?;
        pass.set_bind_group(0, &camera_record.bind_group, &[]);
        let light_record = self
            .cache
            .light_shadow_record(light_component.id())
            .ok_or(RendererError::MissingRecord)?;
        pass.set_bind_group(1, &light_record.bind_group, &[]);

        self.record_draws(&mut pass, &plan)?;
        Ok(light_vp)
    }

    /// Forward color pass from the main camera, sampling the shadow map
    /// rendered earlier in the same encoder.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        scene: &Scene,
        camera_node: &Node,
        light: &Node,
        light_view_projection: Mat4,
    ) -> Result<(), RendererError> {
        let camera = component(camera_node, camera_node.camera.as_ref(), "camera")?;
        let light_component = component(light, light.light.as_ref(), "light")?;
        let global = scene
            .global_matrix(camera_node.id())
            .ok_or_else(|| RendererError::NodeNotFound(camera_node.name.clone()))?;
        let camera_data = camera.uniform_data(global);

        // the depth target tracks the surface size, recreated only on change
        let surface_size = (self.surface_config.width, self.surface_config.height);
        if self.depth_size != surface_size {
            self.depth_view = create_depth_target(&self.device, surface_size.0, surface_size.1);
            self.depth_size = surface_size;
        }

        let plan = DrawList::plan(&scene.root);
        self.prepare_draws(&plan);

        let camera_record = self
            .cache
            .camera(&self.device, &self.pipelines.layouts, camera);
        self.queue.write_buffer(
            &camera_record.uniform_buffer,
            0,
            bytemuck::bytes_of(&camera_data),
        );

        let light_record = self.cache.light(
            &self.device,
            &self.pipelines.layouts,
            light_component,
            &self.shadow_view,
            &self.shadow_sampler,
        );
        self.queue.write_buffer(
            &light_record.uniform_buffer,
            0,
            bytemuck::bytes_of(&light_component.uniform_data()),
        );
        self.queue.write_buffer(
            &light_record.matrix_buffer,
            0,
            bytemuck::bytes_of(&light_view_projection),
        );

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("forward pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(SKY_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(match self.shading {
            Shading::PerFragment => &self.pipelines.lit_per_fragment,
            Shading::PerVertex => &self.pipelines.lit_per_vertex,
        });
        let camera_record = self
            .cache
            .camera_record(camera.id())
            .ok_or(RendererError::MissingRecord)?;
        pass.set_bind_group(0, &camera_record.bind_group, &[]);
        let light_record = self
            .cache
            .light_record(light_component.id())
            .ok_or(RendererError::MissingRecord)?;
        pass.set_bind_group(1, &light_record.bind_group, &[]);

        self.record_draws(&mut pass, &plan)
    }

    /// Debug view: draw the shadow depth texture over the whole surface as
    /// grayscale, replacing the shaded scene for this frame
    pub fn render_shadow_map_view(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadow map view pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipelines.shadow_map_view);
        pass.set_bind_group(0, &self.shadow_map_view_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Resolve GPU records for every visited node and upload the per-node
    /// and per-material uniforms. Every node gets one model-uniform write
    /// whether or not it carries a model; only primitives cost draws. Runs
    /// before the render pass opens so the pass itself only reads the cache.
    fn prepare_draws(&mut self, plan: &DrawList<'_>) {
        for item in &plan.items {
            let record = self
                .cache
                .node(&self.device, &self.pipelines.layouts, item.node);
            self.queue.write_buffer(
                &record.uniform_buffer,
                0,
                bytemuck::bytes_of(&item.uniform_data()),
            );

            let Some(model) = item.node.model.as_ref() else {
                continue;
            };
            for primitive in &model.primitives {
                self.cache.mesh(&self.device, &primitive.mesh);
                let material = self.cache.material(
                    &self.device,
                    &self.queue,
                    &self.pipelines.layouts,
                    &primitive.material,
                );
                self.queue.write_buffer(
                    &material.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&primitive.material.uniform_data()),
                );
            }
        }
    }

    /// Replay the plan, binding the per-node group at slot 2 for every
    /// visited node and issuing indexed draws with the per-material group at
    /// slot 3 for each primitive
    fn record_draws<'p>(
        &'p self,
        pass: &mut wgpu::RenderPass<'p>,
        plan: &DrawList<'_>,
    ) -> Result<(), RendererError> {
        for item in &plan.items {
            let node = self
                .cache
                .node_record(item.node.id())
                .ok_or(RendererError::MissingRecord)?;
            pass.set_bind_group(2, &node.bind_group, &[]);

            let Some(model) = item.node.model.as_ref() else {
                continue;
            };
            for primitive in &model.primitives {
                let mesh = self
                    .cache
                    .mesh_record(primitive.mesh.id())
                    .ok_or(RendererError::MissingRecord)?;
                let material = self
                    .cache
                    .material_record(primitive.material.id())
                    .ok_or(RendererError::MissingRecord)?;
                pass.set_bind_group(3, &material.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        Ok(())
    }
}

fn find_node<'s>(scene: &'s Scene, name: &str) -> Result<&'s Node, RendererError> {
    scene
        .find(name)
        .ok_or_else(|| RendererError::NodeNotFound(name.to_string()))
}

fn component<'n, T>(
    node: &Node,
    component: Option<&'n T>,
    kind: &'static str,
) -> Result<&'n T, RendererError> {
    component.ok_or_else(|| RendererError::MissingComponent {
        node: node.name.clone(),
        component: kind,
    })
}

fn create_depth_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("surface depth"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Projection;
    use glam::{Vec3, Vec4};

    #[test]
    fn light_view_projection_multiplies_projection_by_view() {
        let camera = Camera::new(Projection::orthographic(20.0, 20.0, -50.0, 50.0));
        let global = Mat4::from_translation(Vec3::new(0.0, 10.0, 0.0));
        let vp = light_view_projection(&camera, global);
        let expected = camera.projection_matrix() * global.inverse();
        assert!(vp
            .to_cols_array()
            .iter()
            .zip(expected.to_cols_array().iter())
            .all(|(a, b)| (a - b).abs() < 1e-5));
    }

    #[test]
    fn light_view_projection_maps_volume_center_into_clip_space() {
        let camera = Camera::new(Projection::orthographic(10.0, 10.0, -10.0, 10.0));
        let vp = light_view_projection(&camera, Mat4::IDENTITY);
        let p = vp * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
        // orthographic_rh maps near..far onto 0..1
        assert!((p.z - 0.5).abs() < 1e-5);
    }

    #[test]
    fn error_messages_name_the_node() {
        let err = RendererError::NodeNotFound("Sun".to_string());
        assert_eq!(err.to_string(), "node 'Sun' not found in scene");

        let err = RendererError::MissingComponent {
            node: "Camera".to_string(),
            component: "camera",
        };
        assert!(err.to_string().contains("Camera"));
    }
}
