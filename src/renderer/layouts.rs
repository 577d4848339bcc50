//! Bind-group layouts and render pipelines
//!
//! Built once during initialization. Four bind groups at fixed slots in
//! every pass: 0 = camera, 1 = light, 2 = model, 3 = material. The light
//! layout has two variants: the forward one carries the shadow depth
//! texture and comparison sampler in addition to the uniforms, the shadow
//! one carries only the light uniform.

use crate::resources::Vertex;

/// Format of the offscreen shadow depth texture
pub const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Format of the surface-sized depth+stencil texture for the forward pass
pub const SURFACE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3, // position
    1 => Float32x2, // texcoords
    2 => Float32x3, // normal
];

fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: Vertex::STRIDE,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// The four bind-group layouts, the narrower shadow-pass light variant, and
/// the single-group layout of the shadow-map debug view
pub struct BindGroupLayouts {
    pub camera: wgpu::BindGroupLayout,
    pub light: wgpu::BindGroupLayout,
    pub light_shadow: wgpu::BindGroupLayout,
    pub model: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub shadow_map_view: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    fn build(device: &wgpu::Device) -> Self {
        let both = wgpu::ShaderStages::VERTEX_FRAGMENT;

        let camera = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera bind group layout"),
            entries: &[uniform_entry(0, both)],
        });

        let light = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light bind group layout"),
            entries: &[
                // color + direction
                uniform_entry(0, both),
                // light view-projection matrix
                uniform_entry(1, both),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: both,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: both,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let light_shadow = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light shadow bind group layout"),
            entries: &[uniform_entry(0, both)],
        });

        let model = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("model bind group layout"),
            entries: &[uniform_entry(0, both)],
        });

        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material bind group layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shadow_map_view = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow map view bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        Self {
            camera,
            light,
            light_shadow,
            model,
            material,
            shadow_map_view,
        }
    }
}

/// Compiled pipelines and their layouts. Construction is the Ready barrier:
/// once this exists, every pipeline exists.
pub struct Pipelines {
    pub layouts: BindGroupLayouts,
    pub shadow: wgpu::RenderPipeline,
    pub lit_per_fragment: wgpu::RenderPipeline,
    pub lit_per_vertex: wgpu::RenderPipeline,
    pub shadow_map_view: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn build(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let layouts = BindGroupLayouts::build(device);

        let shadow_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/shadow.wgsl").into()),
        });
        let per_fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lambert per-fragment shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../shaders/lambert_per_fragment.wgsl").into(),
            ),
        });
        let per_vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lambert per-vertex shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../shaders/lambert_per_vertex.wgsl").into(),
            ),
        });
        let shadow_map_view_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow map view shader"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("../shaders/shadow_map_view.wgsl").into(),
            ),
        });

        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow pipeline layout"),
            bind_group_layouts: &[
                &layouts.camera,
                &layouts.light_shadow,
                &layouts.model,
                &layouts.material,
            ],
            push_constant_ranges: &[],
        });

        let forward_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("forward pipeline layout"),
            bind_group_layouts: &[
                &layouts.camera,
                &layouts.light,
                &layouts.model,
                &layouts.material,
            ],
            push_constant_ranges: &[],
        });

        // Depth-only: no fragment stage, no color targets
        let shadow = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow pipeline"),
            layout: Some(&shadow_layout),
            vertex: wgpu::VertexState {
                module: &shadow_module,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[vertex_buffer_layout()],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SHADOW_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let lit_per_fragment = Self::build_lit(
            device,
            "lit per-fragment pipeline",
            &per_fragment_module,
            &forward_layout,
            surface_format,
        );
        let lit_per_vertex = Self::build_lit(
            device,
            "lit per-vertex pipeline",
            &per_vertex_module,
            &forward_layout,
            surface_format,
        );

        // Debug view: fullscreen triangle over the shadow depth texture,
        // no vertex buffers, no depth attachment
        let shadow_map_view_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("shadow map view pipeline layout"),
                bind_group_layouts: &[&layouts.shadow_map_view],
                push_constant_ranges: &[],
            });
        let shadow_map_view = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow map view pipeline"),
            layout: Some(&shadow_map_view_layout),
            vertex: wgpu::VertexState {
                module: &shadow_map_view_module,
                entry_point: "vertex",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shadow_map_view_module,
                entry_point: "fragment",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        log::info!("render pipelines compiled (shadow, per-fragment, per-vertex, debug view)");

        Self {
            layouts,
            shadow,
            lit_per_fragment,
            lit_per_vertex,
            shadow_map_view,
        }
    }

    fn build_lit(
        device: &wgpu::Device,
        label: &str,
        module: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: "vertex",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[vertex_buffer_layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: "fragment",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SURFACE_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        })
    }
}
