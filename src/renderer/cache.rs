//! GPU resource cache
//!
//! Side tables mapping scene entity identity to GPU-side records (uniform
//! buffers, bind groups, mesh buffers, textures, samplers). A record is
//! created on the first reference to its entity and reused for the process
//! lifetime; there is no eviction. Only the rendering thread touches the
//! cache, so no locking is involved.

use crate::renderer::layouts::BindGroupLayouts;
use crate::resources::{AddressMode, FilterMode, Material, Mesh, SamplerDesc, TextureData};
use crate::scene::{Camera, DirectionalLight, Node};
use crate::EntityId;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Uniform buffer sizes, the bit-exact shader contract
const CAMERA_UNIFORM_SIZE: u64 = 128; // view at 0, projection at 64
const LIGHT_UNIFORM_SIZE: u64 = 32; // color at 0 (padded), direction at 16
const LIGHT_MATRIX_UNIFORM_SIZE: u64 = 64; // one 4x4 matrix
const MODEL_UNIFORM_SIZE: u64 = 128; // model at 0, normal at 64
const MATERIAL_UNIFORM_SIZE: u64 = 16; // base color factor

/// Per-node record: model uniform + bind group for slot 2
pub struct NodeGpu {
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Per-camera record: view/projection uniform + bind group for slot 0
pub struct CameraGpu {
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Forward-pass light record: light uniform, light view-projection uniform,
/// and a bind group that also references the shadow map and its comparison
/// sampler (slot 1)
pub struct LightGpu {
    pub uniform_buffer: wgpu::Buffer,
    pub matrix_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Shadow-pass light record: color/direction uniform only (slot 1)
pub struct LightShadowGpu {
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Per-material record: base factor uniform + bind group for slot 3
pub struct MaterialGpu {
    pub uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// Per-mesh record: vertex and index buffers
pub struct MeshGpu {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

struct TextureGpu {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

#[derive(Default)]
pub struct GpuCache {
    nodes: HashMap<EntityId, NodeGpu>,
    cameras: HashMap<EntityId, CameraGpu>,
    lights: HashMap<EntityId, LightGpu>,
    lights_shadow: HashMap<EntityId, LightShadowGpu>,
    materials: HashMap<EntityId, MaterialGpu>,
    meshes: HashMap<EntityId, MeshGpu>,
    textures: HashMap<EntityId, TextureGpu>,
    samplers: HashMap<SamplerDesc, wgpu::Sampler>,
}

fn create_uniform_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl GpuCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve-or-create the model record for a node
    pub fn node(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        node: &Node,
    ) -> &NodeGpu {
        self.nodes.entry(node.id()).or_insert_with(|| {
            let uniform_buffer = create_uniform_buffer(device, "model uniform", MODEL_UNIFORM_SIZE);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("model bind group"),
                layout: &layouts.model,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            NodeGpu {
                uniform_buffer,
                bind_group,
            }
        })
    }

    /// Resolve-or-create the record for a camera component
    pub fn camera(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        camera: &Camera,
    ) -> &CameraGpu {
        self.cameras.entry(camera.id()).or_insert_with(|| {
            let uniform_buffer = create_uniform_buffer(device, "camera uniform", CAMERA_UNIFORM_SIZE);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("camera bind group"),
                layout: &layouts.camera,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            CameraGpu {
                uniform_buffer,
                bind_group,
            }
        })
    }

    /// Resolve-or-create the forward-pass record for a light. The bind group
    /// references the shadow depth texture and comparison sampler, so the
    /// shadow map view must outlive the cache.
    pub fn light(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        light: &DirectionalLight,
        shadow_view: &wgpu::TextureView,
        shadow_sampler: &wgpu::Sampler,
    ) -> &LightGpu {
        self.lights.entry(light.id()).or_insert_with(|| {
            let uniform_buffer = create_uniform_buffer(device, "light uniform", LIGHT_UNIFORM_SIZE);
            let matrix_buffer = create_uniform_buffer(
                device,
                "light view-projection uniform",
                LIGHT_MATRIX_UNIFORM_SIZE,
            );
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("light bind group"),
                layout: &layouts.light,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: matrix_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(shadow_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(shadow_sampler),
                    },
                ],
            });
            LightGpu {
                uniform_buffer,
                matrix_buffer,
                bind_group,
            }
        })
    }

    /// Resolve-or-create the shadow-pass record for a light
    pub fn light_shadow(
        &mut self,
        device: &wgpu::Device,
        layouts: &BindGroupLayouts,
        light: &DirectionalLight,
    ) -> &LightShadowGpu {
        self.lights_shadow.entry(light.id()).or_insert_with(|| {
            let uniform_buffer =
                create_uniform_buffer(device, "light shadow uniform", LIGHT_UNIFORM_SIZE);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("light shadow bind group"),
                layout: &layouts.light_shadow,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            LightShadowGpu {
                uniform_buffer,
                bind_group,
            }
        })
    }

    /// Resolve-or-create the record for a material, materializing its base
    /// texture and sampler on the way
    pub fn material(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &BindGroupLayouts,
        material: &Material,
    ) -> &MaterialGpu {
        if !self.materials.contains_key(&material.id()) {
            self.texture(device, queue, &material.base_texture);
            self.sampler(device, material.sampler);

            let view = &self.textures[&material.base_texture.id()].view;
            let sampler = &self.samplers[&material.sampler];

            let uniform_buffer =
                create_uniform_buffer(device, "material uniform", MATERIAL_UNIFORM_SIZE);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("material bind group"),
                layout: &layouts.material,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });

            self.materials.insert(
                material.id(),
                MaterialGpu {
                    uniform_buffer,
                    bind_group,
                },
            );
        }
        &self.materials[&material.id()]
    }

    /// Resolve-or-create vertex/index buffers for a mesh
    pub fn mesh(&mut self, device: &wgpu::Device, mesh: &Mesh) -> &MeshGpu {
        self.meshes.entry(mesh.id()).or_insert_with(|| {
            log::debug!(
                "uploading mesh '{}' ({} vertices, {} indices)",
                mesh.name,
                mesh.vertex_count(),
                mesh.index_count()
            );
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} vertex buffer", mesh.name)),
                contents: mesh.vertex_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} index buffer", mesh.name)),
                contents: mesh.index_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });
            MeshGpu {
                vertex_buffer,
                index_buffer,
                index_count: mesh.index_count(),
            }
        })
    }

    fn texture(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &TextureData) {
        self.textures.entry(data.id()).or_insert_with(|| {
            let size = wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            };
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&data.name),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            queue.write_texture(
                texture.as_image_copy(),
                &data.data,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * data.width),
                    rows_per_image: Some(data.height),
                },
                size,
            );
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            TextureGpu { texture, view }
        });
    }

    fn sampler(&mut self, device: &wgpu::Device, desc: SamplerDesc) {
        self.samplers.entry(desc).or_insert_with(|| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("material sampler"),
                address_mode_u: address_mode(desc.address_mode_u),
                address_mode_v: address_mode(desc.address_mode_v),
                mag_filter: filter_mode(desc.mag_filter),
                min_filter: filter_mode(desc.min_filter),
                ..Default::default()
            })
        });
    }

    // Lookup-only accessors for pass recording; records must have been
    // resolved during the prepare walk.

    pub fn node_record(&self, id: EntityId) -> Option<&NodeGpu> {
        self.nodes.get(&id)
    }

    pub fn camera_record(&self, id: EntityId) -> Option<&CameraGpu> {
        self.cameras.get(&id)
    }

    pub fn light_record(&self, id: EntityId) -> Option<&LightGpu> {
        self.lights.get(&id)
    }

    pub fn light_shadow_record(&self, id: EntityId) -> Option<&LightShadowGpu> {
        self.lights_shadow.get(&id)
    }

    pub fn material_record(&self, id: EntityId) -> Option<&MaterialGpu> {
        self.materials.get(&id)
    }

    pub fn mesh_record(&self, id: EntityId) -> Option<&MeshGpu> {
        self.meshes.get(&id)
    }
}

fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}
