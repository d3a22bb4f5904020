//! 3D mesh rendering pass with depth testing, MSAA and PBR materials.
//!
//! [`MeshPass`] owns every GPU resource needed to draw a [`Scene`]: the
//! uploaded meshes, the pipeline, uniform buffers, one bind group per
//! material, and the multisampled color and depth targets.
//!
//! # Architecture
//!
//! The pipeline uses three bind groups:
//! - **Group 0**: Frame uniforms (view-projection, camera position, time, lights)
//! - **Group 1**: Model uniforms (model and normal matrix), one slot per
//!   object addressed with a dynamic offset
//! - **Group 2**: Material uniforms, environment cubemap and its sampler
//!
//! # Targets
//!
//! With MSAA enabled the scene renders into a multisampled color texture that
//! resolves into the frame's surface view. The color and depth targets follow
//! the surface size and are recreated lazily after a resize.

use std::num::NonZeroU64;

use crate::camera::PerspectiveCamera;
use crate::ecs::MeshId;
use crate::gpu::GpuContext;
use crate::light::LightUniforms;
use crate::material::{MaterialUniforms, Materials};
use crate::mesh::{Mesh, Vertex3d};
use crate::scene::{DrawItem, Scene};
use crate::texture::{CubeTexture, EnvMapId, EnvironmentMaps};

const PBR_SHADER: &str = include_str!("shaders/pbr.wgsl");
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const INITIAL_MODEL_CAPACITY: usize = 16;

/// Per-frame uniforms shared by every draw.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FrameUniforms {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// xyz = camera position in world space, w = elapsed seconds.
    pub camera_pos: [f32; 4],
    pub lights: LightUniforms,
}

/// Per-object uniforms.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ModelUniforms {
    /// Model matrix (object to world space transformation).
    pub model: [[f32; 4]; 4],
    /// Normal matrix (inverse transpose of model matrix) for correct normal transformation.
    pub normal_matrix: [[f32; 4]; 4],
}

impl ModelUniforms {
    pub fn new(model: glam::Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

/// Round `size` up to a multiple of `alignment`.
pub(crate) fn aligned_stride(size: u64, alignment: u64) -> u64 {
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

/// GPU state for one material.
struct MaterialSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    env_map: Option<EnvMapId>,
    generation: u64,
    has_env_map: bool,
}

struct RenderTargets {
    size: (u32, u32),
    msaa_view: Option<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
}

/// Draws the scene's meshes.
///
/// # Pipeline Configuration
///
/// - Back-face culling enabled (counter-clockwise front faces)
/// - Opaque output (no blending)
/// - Depth write and Less-than comparison
pub struct MeshPass {
    pipeline: wgpu::RenderPipeline,
    meshes: Vec<Mesh>,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_stride: u64,
    model_capacity: usize,

    material_layout: wgpu::BindGroupLayout,
    material_slots: Vec<MaterialSlot>,
    env_sampler: wgpu::Sampler,
    placeholder_env: CubeTexture,

    targets: RenderTargets,
}

impl MeshPass {
    /// Creates the pass, its pipeline and targets sized to the surface.
    pub fn new(gpu: &GpuContext) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("PBR Shader"),
            source: wgpu::ShaderSource::Wgsl(PBR_SHADER.into()),
        });

        // Frame uniform buffer (group 0)
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        // Model uniform buffer (group 1), one aligned slot per object
        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Model Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<ModelUniforms>() as u64),
                },
                count: None,
            }],
        });

        let model_stride = aligned_stride(
            std::mem::size_of::<ModelUniforms>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let (model_buffer, model_bind_group) =
            Self::create_model_buffer(device, &model_layout, model_stride, INITIAL_MODEL_CAPACITY);

        // Material bind group layout (group 2)
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
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
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
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

        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder_env = CubeTexture::solid(gpu, [0, 0, 0, 255], "Placeholder Environment");

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &model_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: gpu.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let targets = Self::create_targets(gpu);

        Self {
            pipeline,
            meshes: Vec::new(),
            frame_buffer,
            frame_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_stride,
            model_capacity: INITIAL_MODEL_CAPACITY,
            material_layout,
            material_slots: Vec::new(),
            env_sampler,
            placeholder_env,
            targets,
        }
    }

    /// Store an uploaded mesh and return its handle.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        self.meshes.push(mesh);
        id
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    fn create_model_buffer(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Model Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ModelUniforms>() as u64),
                }),
            }],
        });

        (buffer, bind_group)
    }

    fn create_targets(gpu: &GpuContext) -> RenderTargets {
        let size = wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
            depth_or_array_layers: 1,
        };

        let msaa_view = (gpu.sample_count > 1).then(|| {
            gpu.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("MSAA Color Texture"),
                    size,
                    mip_level_count: 1,
                    sample_count: gpu.sample_count,
                    dimension: wgpu::TextureDimension::D2,
                    format: gpu.config.format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let depth_view = gpu
            .device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("Depth Texture"),
                size,
                mip_level_count: 1,
                sample_count: gpu.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default());

        RenderTargets {
            size: (gpu.width(), gpu.height()),
            msaa_view,
            depth_view,
        }
    }

    /// Ensures the color and depth targets match the current surface size.
    pub fn ensure_target_size(&mut self, gpu: &GpuContext) {
        if self.targets.size != (gpu.width(), gpu.height()) {
            log::debug!("Recreating scene targets at {}x{}", gpu.width(), gpu.height());
            self.targets = Self::create_targets(gpu);
        }
    }

    fn ensure_model_capacity(&mut self, gpu: &GpuContext, count: usize) {
        if count <= self.model_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        let (buffer, bind_group) =
            Self::create_model_buffer(&gpu.device, &self.model_layout, self.model_stride, capacity);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_capacity = capacity;
    }

    /// Bring material bind groups and uniforms in line with the library.
    fn sync_materials(&mut self, gpu: &GpuContext, materials: &Materials, env_maps: &EnvironmentMaps) {
        for (id, material) in materials.iter() {
            let texture = material.env_map.and_then(|env| env_maps.get(env));
            let has_env_map = texture.is_some();

            let stale = match self.material_slots.get(id.0) {
                Some(slot) => {
                    slot.env_map != material.env_map
                        || slot.generation != env_maps.generation()
                        || slot.has_env_map != has_env_map
                }
                None => true,
            };

            if stale {
                let buffer = match self.material_slots.get(id.0) {
                    Some(slot) => slot.buffer.clone(),
                    None => gpu.device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some("Material Uniforms"),
                        size: std::mem::size_of::<MaterialUniforms>() as u64,
                        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    }),
                };

                let view = &texture.unwrap_or(&self.placeholder_env).view;
                let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Material Bind Group"),
                    layout: &self.material_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&self.env_sampler),
                        },
                    ],
                });

                let slot = MaterialSlot {
                    buffer,
                    bind_group,
                    env_map: material.env_map,
                    generation: env_maps.generation(),
                    has_env_map,
                };
                if id.0 < self.material_slots.len() {
                    self.material_slots[id.0] = slot;
                } else {
                    self.material_slots.push(slot);
                }
            }

            let uniforms = MaterialUniforms::from_material(material, has_env_map);
            gpu.queue.write_buffer(
                &self.material_slots[id.0].buffer,
                0,
                bytemuck::bytes_of(&uniforms),
            );
        }
    }

    fn write_models(&mut self, gpu: &GpuContext, items: &[DrawItem]) {
        self.ensure_model_capacity(gpu, items.len());

        let stride = self.model_stride as usize;
        let mut staging = vec![0u8; stride * items.len()];
        for (chunk, item) in staging.chunks_exact_mut(stride).zip(items) {
            let uniforms = ModelUniforms::new(item.model);
            let bytes = bytemuck::bytes_of(&uniforms);
            chunk[..bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            gpu.queue.write_buffer(&self.model_buffer, 0, &staging);
        }
    }

    /// Records the scene into `encoder`, clearing to the scene background and
    /// leaving the final image in `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        scene: &Scene,
        camera: &PerspectiveCamera,
        env_maps: &EnvironmentMaps,
        time: f32,
    ) {
        self.ensure_target_size(gpu);

        let frame_uniforms = FrameUniforms {
            view_proj: camera.view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(time).to_array(),
            lights: LightUniforms::from(&scene.lights),
        };
        gpu.queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame_uniforms));

        self.sync_materials(gpu, &scene.materials().borrow(), env_maps);

        let items = scene.draw_list();
        self.write_models(gpu, &items);

        let (view, resolve_target, store) = match &self.targets.msaa_view {
            Some(msaa) => (msaa, Some(target), wgpu::StoreOp::Discard),
            None => (target, None, wgpu::StoreOp::Store),
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(scene.background.to_wgpu()),
                    store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for (i, item) in items.iter().enumerate() {
            let Some(mesh) = self.meshes.get(item.mesh.0) else {
                log::warn!("Skipping draw of unknown mesh {:?}", item.mesh);
                continue;
            };
            let Some(material) = self.material_slots.get(item.material.0) else {
                log::warn!("Skipping draw with unknown material {:?}", item.material);
                continue;
            };

            let offset = (i as u64 * self.model_stride) as u32;
            render_pass.set_bind_group(1, &self.model_bind_group, &[offset]);
            render_pass.set_bind_group(2, &material.bind_group, &[]);

            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    fn parse_shader() -> naga::Module {
        let module = naga::front::wgsl::parse_str(PBR_SHADER).expect("pbr.wgsl should parse");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .expect("pbr.wgsl should validate");
        module
    }

    #[test]
    fn shader_exposes_vs_and_fs() {
        let module = parse_shader();
        let stages: Vec<_> = module
            .entry_points
            .iter()
            .map(|ep| (ep.name.as_str(), ep.stage))
            .collect();
        assert!(stages.contains(&("vs", naga::ShaderStage::Vertex)));
        assert!(stages.contains(&("fs", naga::ShaderStage::Fragment)));
    }

    #[test]
    fn environment_lights_both_specular_and_diffuse() {
        let module = parse_shader();
        let fs = module
            .entry_points
            .iter()
            .find(|ep| ep.name == "fs")
            .expect("fragment entry point");

        // One reflection lookup plus one irradiance lookup along the normal.
        let samples = fs
            .function
            .expressions
            .iter()
            .filter(|(_, expr)| matches!(expr, naga::Expression::ImageSample { .. }))
            .count();
        assert_eq!(samples, 2);
    }

    #[test]
    fn stride_respects_alignment() {
        assert_eq!(aligned_stride(128, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(257, 256), 512);
        assert_eq!(aligned_stride(128, 64), 128);
        assert_eq!(aligned_stride(100, 0), 100);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let uniforms = ModelUniforms::new(model);
        let normal = Mat4::from_cols_array_2d(&uniforms.normal_matrix);
        let n = normal.transform_vector3(Vec3::X);
        assert!((n.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 128);
        assert_eq!(std::mem::size_of::<FrameUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 144);
    }
}
