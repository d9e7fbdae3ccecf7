//! Scene renderer: owns the wgpu state and records the shadow, main and preview passes.

use crate::{
    camera::{CameraInput, CameraUniform, FlyCamera},
    device::GpuBuffer,
    error::ResourceError,
    frame::{plan_frame, FramePass, FrameStats, ShadowAnchor},
    mesh::MeshBuffers,
    pipeline::{
        create_depth_pipeline,
        create_frame_bind_group_layout,
        create_light_bind_group_layout,
        create_line_pipeline,
        create_model_bind_group_layout,
        create_pipeline_layout,
        create_preview_bind_group_layout,
        create_preview_pipeline,
        create_scene_pipeline,
        create_shader_module,
        create_shadow_sample_bind_group_layout,
        DepthBindings,
        PreviewBindings,
        SceneBindings,
    },
    preview::{PreviewUniform, ShadowmapPreviewQuad},
    scene::{DrawItem, Scene},
    settings::RenderSettings,
    shadow::{
        bias_matrix, create_shadow_sampler, CascadeConfig, CascadeFrustum, LightUniform, ShadowCascades, SunLight,
        DEFAULT_SHADOW_RESOLUTION, MAX_CASCADES,
    },
    texture::Texture,
    uniform_cache::{Program, ShaderLibrary, UniformCache},
};
use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use engine_core::{FrameClock, ModelRaw};
use glam::Mat4;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Depth offset applied in the shader on top of the pipeline's slope bias.
const SHADOW_DEPTH_BIAS: f32 = 0.0002;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.53,
    g: 0.72,
    b: 0.92,
    a: 1.0,
};

/// Scene lighting uniform (must match scene.wgsl Lighting).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightingUniform {
    pub sun_direction: [f32; 4],
    /// rgb = colour, a = ambient
    pub sun_color: [f32; 4],
    /// x = diffuse, y = cascade count, z = shadow texel size, w = depth bias
    pub params: [f32; 4],
    /// x = flat shading, y = shadows disabled, z = flashlight, w = cascade tint
    pub toggles: [f32; 4],
    pub bias: [[f32; 4]; 4],
    pub cascade_projection: [[[f32; 4]; 4]; MAX_CASCADES],
    pub cascade_view: [[[f32; 4]; 4]; MAX_CASCADES],
}

fn flag(on: bool) -> f32 {
    if on {
        1.0
    } else {
        0.0
    }
}

impl LightingUniform {
    pub fn new(sun: &SunLight, settings: &RenderSettings, frusta: &[CascadeFrustum], resolution: u32) -> Self {
        let mut uniform = Self {
            sun_direction: sun.direction.normalize_or_zero().extend(0.0).to_array(),
            sun_color: sun.color.extend(sun.ambient).to_array(),
            params: [
                sun.diffuse,
                frusta.len().min(MAX_CASCADES) as f32,
                1.0 / resolution.max(1) as f32,
                SHADOW_DEPTH_BIAS,
            ],
            toggles: [
                flag(settings.flat_shading),
                flag(!settings.shadows_enabled),
                flag(settings.flashlight),
                flag(settings.show_cascades),
            ],
            bias: bias_matrix().to_cols_array_2d(),
            cascade_projection: [Mat4::IDENTITY.to_cols_array_2d(); MAX_CASCADES],
            cascade_view: [Mat4::IDENTITY.to_cols_array_2d(); MAX_CASCADES],
        };
        for (i, frustum) in frusta.iter().take(MAX_CASCADES).enumerate() {
            uniform.cascade_projection[i] = frustum.projection.to_cols_array_2d();
            uniform.cascade_view[i] = frustum.view.to_cols_array_2d();
        }
        uniform
    }
}

/// Distance between consecutive model slots in the dynamic uniform buffer.
pub fn model_stride(alignment: u32) -> u64 {
    let size = std::mem::size_of::<ModelRaw>() as u64;
    let alignment = alignment.max(1) as u64;
    size.div_ceil(alignment) * alignment
}

/// Model matrices for every draw, one aligned slot each, bound with a dynamic offset.
struct ModelUniforms {
    buffer: wgpu::Buffer,
    stride: u64,
    capacity: usize,
    scene_bind_group: wgpu::BindGroup,
    depth_bind_group: wgpu::BindGroup,
}

impl ModelUniforms {
    fn new(
        device: &wgpu::Device,
        scene_layout: &wgpu::BindGroupLayout,
        depth_layout: &wgpu::BindGroupLayout,
        scene_binding: u32,
        depth_binding: u32,
        capacity: usize,
    ) -> Self {
        let stride = model_stride(device.limits().min_uniform_buffer_offset_alignment);
        let capacity = capacity.max(1);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind = |layout: &wgpu::BindGroupLayout, binding: u32, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<ModelRaw>() as u64),
                    }),
                }],
            })
        };
        let scene_bind_group = bind(scene_layout, scene_binding, "Scene Model Bind Group");
        let depth_bind_group = bind(depth_layout, depth_binding, "Depth Model Bind Group");
        Self {
            buffer,
            stride,
            capacity,
            scene_bind_group,
            depth_bind_group,
        }
    }

    fn offset(&self, slot: u32) -> u32 {
        (slot as u64 * self.stride) as u32
    }

    fn write(&self, queue: &wgpu::Queue, matrices: &[Mat4]) {
        let mut bytes = vec![0u8; self.stride as usize * matrices.len()];
        for (slot, matrix) in matrices.iter().enumerate() {
            let start = slot * self.stride as usize;
            let raw = ModelRaw::from_matrix(*matrix);
            bytes[start..start + std::mem::size_of::<ModelRaw>()].copy_from_slice(bytemuck::bytes_of(&raw));
        }
        queue.write_buffer(&self.buffer, 0, &bytes);
    }
}

/// Main renderer state.
pub struct SceneRenderer {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    pub window: Arc<Window>,
    adapter_name: String,

    pub camera: FlyCamera,
    pub sun: SunLight,
    settings: RenderSettings,
    clock: FrameClock,
    anchor: ShadowAnchor,

    // Shader reflection
    scene_bindings: SceneBindings,
    depth_bindings: DepthBindings,
    preview_bindings: PreviewBindings,

    // Pipelines
    scene_pipeline: wgpu::RenderPipeline,
    wireframe_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    depth_pipeline: wgpu::RenderPipeline,
    preview_pipeline: wgpu::RenderPipeline,

    // Per-frame uniforms
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    lighting_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    scene_model_layout: wgpu::BindGroupLayout,
    depth_model_layout: wgpu::BindGroupLayout,
    models: ModelUniforms,

    // Cascaded shadow maps
    cascade_config: CascadeConfig,
    cascades: ShadowCascades,
    shadow_sampler: wgpu::Sampler,
    shadow_sample_layout: wgpu::BindGroupLayout,
    shadow_sample_bind_group: wgpu::BindGroup,
    light_buffers: Vec<wgpu::Buffer>,
    light_bind_groups: Vec<wgpu::BindGroup>,
    frustum_line_buffer: wgpu::Buffer,
    frustum_line_count: u32,

    // Shadow-map preview
    preview_layout: wgpu::BindGroupLayout,
    preview: ShadowmapPreviewQuad,

    // Depth buffer
    depth_texture: Texture,
}

impl SceneRenderer {
    /// Create a renderer for the given window with the given cascade table.
    pub async fn new(window: Arc<Window>, cascade_config: CascadeConfig) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("Failed to find suitable GPU adapter"))?;

        let adapter_name = adapter.get_info().name;
        log::info!("Using GPU: {:?}", adapter_name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no supported formats"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        // Mailbox when available, otherwise vsync.
        let present_mode = surface_caps
            .present_modes
            .iter()
            .find(|m| matches!(m, wgpu::PresentMode::Mailbox))
            .copied()
            .unwrap_or(wgpu::PresentMode::AutoVsync);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        // Every binding below is located through the shader reflection cache.
        let mut uniforms = UniformCache::new(ShaderLibrary::load()?);
        let scene_bindings = SceneBindings::locate(&mut uniforms)?;
        let depth_bindings = DepthBindings::locate(&mut uniforms)?;
        let preview_bindings = PreviewBindings::locate(&mut uniforms)?;

        let frame_layout = create_frame_bind_group_layout(
            &device,
            &scene_bindings,
            std::mem::size_of::<CameraUniform>(),
            std::mem::size_of::<LightingUniform>(),
        );
        let shadow_sample_layout = create_shadow_sample_bind_group_layout(&device, &scene_bindings);
        let scene_model_layout = create_model_bind_group_layout(&device, scene_bindings.model, "Scene Model Layout");
        let depth_model_layout = create_model_bind_group_layout(&device, depth_bindings.model, "Depth Model Layout");
        let light_layout =
            create_light_bind_group_layout(&device, depth_bindings.light, std::mem::size_of::<LightUniform>());
        let preview_layout =
            create_preview_bind_group_layout(&device, &preview_bindings, std::mem::size_of::<PreviewUniform>());

        let scene_layout = create_pipeline_layout(
            &device,
            Program::Scene,
            vec![
                (scene_bindings.frame_group(), &frame_layout),
                (scene_bindings.shadow_group(), &shadow_sample_layout),
                (scene_bindings.model_group(), &scene_model_layout),
            ],
        )?;
        let depth_layout = create_pipeline_layout(
            &device,
            Program::Depth,
            vec![
                (depth_bindings.light.group, &light_layout),
                (depth_bindings.model.group, &depth_model_layout),
            ],
        )?;
        let preview_pipeline_layout =
            create_pipeline_layout(&device, Program::Preview, vec![(preview_bindings.group(), &preview_layout)])?;

        let scene_shader = create_shader_module(&device, Program::Scene);
        let depth_shader = create_shader_module(&device, Program::Depth);
        let preview_shader = create_shader_module(&device, Program::Preview);

        let scene_pipeline = create_scene_pipeline(
            &device,
            &scene_layout,
            &scene_shader,
            surface_format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let wireframe_pipeline = create_scene_pipeline(
            &device,
            &scene_layout,
            &scene_shader,
            surface_format,
            wgpu::PrimitiveTopology::LineList,
        );
        let line_pipeline = create_line_pipeline(&device, &scene_layout, &scene_shader, surface_format);
        let depth_pipeline = create_depth_pipeline(&device, &depth_layout, &depth_shader);
        let preview_pipeline =
            create_preview_pipeline(&device, &preview_pipeline_layout, &preview_shader, surface_format);

        // Camera and lighting
        let mut camera = FlyCamera::default();
        camera.set_aspect(config.width, config.height);
        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sun = SunLight::default();
        let settings = RenderSettings::default();
        let lighting = LightingUniform::new(&sun, &settings, &[], cascade_config.resolution());
        let lighting_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting Buffer"),
            contents: bytemuck::cast_slice(&[lighting]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: scene_bindings.camera.binding,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: scene_bindings.lighting.binding,
                    resource: lighting_buffer.as_entire_binding(),
                },
            ],
        });

        let models = ModelUniforms::new(
            &device,
            &scene_model_layout,
            &depth_model_layout,
            scene_bindings.model.binding,
            depth_bindings.model.binding,
            64,
        );

        // Cascades: fall back to the default resolution if the configured one is rejected.
        let mut cascade_config = cascade_config;
        let cascades = match ShadowCascades::try_new(&device, &cascade_config) {
            Ok(cascades) => cascades,
            Err(e) => {
                log::error!("{e}; falling back to {DEFAULT_SHADOW_RESOLUTION}");
                cascade_config = cascade_config.with_resolution(DEFAULT_SHADOW_RESOLUTION)?;
                ShadowCascades::try_new(&device, &cascade_config)?
            }
        };
        let shadow_sampler = create_shadow_sampler(&device);
        let shadow_sample_bind_group = create_shadow_sample_bind_group(
            &device,
            &shadow_sample_layout,
            &scene_bindings,
            &cascades,
            &shadow_sampler,
        );

        let light_buffers: Vec<wgpu::Buffer> = (0..cascade_config.count())
            .map(|_| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Cascade Light Buffer"),
                    contents: bytemuck::cast_slice(&[LightUniform {
                        view_proj: Mat4::IDENTITY.to_cols_array_2d(),
                    }]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
            })
            .collect();
        let light_bind_groups = light_buffers
            .iter()
            .map(|buffer| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Cascade Light Bind Group"),
                    layout: &light_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: depth_bindings.light.binding,
                        resource: buffer.as_entire_binding(),
                    }],
                })
            })
            .collect();
        let frustum_line_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Frustum Lines"),
            size: (MAX_CASCADES * 24 * std::mem::size_of::<[f32; 3]>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let preview = ShadowmapPreviewQuad::new(
            &device,
            &preview_layout,
            &preview_bindings,
            &cascades,
            config.width,
            config.height,
        );

        let depth_texture = Texture::create_depth_texture(&device, config.width, config.height, "Depth Texture");

        log::info!(
            "Renderer ready: {} cascades at {}x{}, {} shader bindings resolved",
            cascades.count(),
            cascades.resolution(),
            cascades.resolution(),
            uniforms.len()
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            adapter_name,
            camera,
            sun,
            settings,
            clock: FrameClock::new(),
            anchor: ShadowAnchor::default(),
            scene_bindings,
            depth_bindings,
            preview_bindings,
            scene_pipeline,
            wireframe_pipeline,
            line_pipeline,
            depth_pipeline,
            preview_pipeline,
            camera_uniform,
            camera_buffer,
            lighting_buffer,
            frame_bind_group,
            scene_model_layout,
            depth_model_layout,
            models,
            cascade_config,
            cascades,
            shadow_sampler,
            shadow_sample_layout,
            shadow_sample_bind_group,
            light_buffers,
            light_bind_groups,
            frustum_line_buffer,
            frustum_line_count: 0,
            preview_layout,
            preview,
            depth_texture,
        })
    }

    /// Handle window resize. The old depth target stays in use if the new one is rejected.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.camera.set_aspect(new_size.width, new_size.height);
        match Texture::try_create_depth_texture(&self.device, new_size.width, new_size.height, "Depth Texture") {
            Ok(texture) => {
                let (width, height) = texture.size();
                log::debug!("Depth target now {width}x{height}");
                self.depth_texture = texture;
            }
            Err(e) => log::error!("{e}; keeping the previous depth target"),
        }
        self.preview.resize(&self.queue, new_size.width, new_size.height);
    }

    /// Reallocate every cascade at `resolution`. On failure the current cascades stay bound
    /// and the error is returned for the caller to report.
    pub fn set_shadow_resolution(&mut self, resolution: u32) -> Result<(), ResourceError> {
        let config = match self.cascade_config.with_resolution(resolution) {
            Ok(config) => config,
            Err(e) => {
                return Err(ResourceError::Validation {
                    label: "Shadow Cascades".to_string(),
                    message: e.to_string(),
                })
            }
        };
        let cascades = ShadowCascades::try_new(&self.device, &config)?;
        self.shadow_sample_bind_group = create_shadow_sample_bind_group(
            &self.device,
            &self.shadow_sample_layout,
            &self.scene_bindings,
            &cascades,
            &self.shadow_sampler,
        );
        self.preview
            .rebind(&self.device, &self.preview_layout, &self.preview_bindings, &cascades);
        self.cascades = cascades;
        self.cascade_config = config;
        log::info!("Shadow maps reallocated at {resolution}x{resolution}");
        Ok(())
    }

    /// Render one frame at host time `timestamp`. Never schedules another frame.
    pub fn render_frame(
        &mut self,
        scene: &mut Scene<GpuBuffer>,
        input: &CameraInput,
        timestamp: Duration,
    ) -> Result<FrameStats> {
        let started = Instant::now();
        let dt = self.clock.begin(timestamp);

        // 1. Input, then animation so the shadow and colour passes see the same transforms.
        self.camera.integrate(input, dt);
        scene.animate(dt);

        let matrices = scene.model_matrices();
        self.ensure_model_capacity(matrices.len());
        self.models.write(&self.queue, &matrices);

        let frusta = self.update_cascades();
        self.update_frame_uniforms(&frusta);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(self.finish_frame(timestamp, started, 0));
            }
            Err(e) => {
                log::error!("Failed to acquire frame: {e}");
                return Ok(self.finish_frame(timestamp, started, 0));
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let draws = scene.draw_list();
        for pass in plan_frame(&self.settings, self.cascades.count()) {
            match pass {
                FramePass::Shadow(i) => self.record_shadow_pass(&mut encoder, i, &draws),
                FramePass::Main => self.record_main_pass(&mut encoder, &view, &draws),
                FramePass::Preview => self.record_preview_pass(&mut encoder, &view),
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(self.finish_frame(timestamp, started, scene.triangle_count()))
    }

    fn finish_frame(&mut self, timestamp: Duration, started: Instant, triangles: u64) -> FrameStats {
        self.clock.end(timestamp + started.elapsed());
        FrameStats {
            delta_seconds: self.clock.delta_seconds(),
            fps: self.clock.fps(),
            frame_cost: self.clock.frame_cost(),
            triangles,
        }
    }

    fn ensure_model_capacity(&mut self, slots: usize) {
        if slots <= self.models.capacity {
            return;
        }
        let capacity = slots.next_power_of_two();
        log::debug!("Growing model uniforms to {capacity} slots");
        self.models = ModelUniforms::new(
            &self.device,
            &self.scene_model_layout,
            &self.depth_model_layout,
            self.scene_bindings.model.binding,
            self.depth_bindings.model.binding,
            capacity,
        );
    }

    /// Compute this frame's cascade frustums and upload their light matrices and overlay lines.
    fn update_cascades(&mut self) -> Vec<CascadeFrustum> {
        let anchor = self.anchor.update(self.settings.lock_shadows, self.camera.position);
        let frusta: Vec<CascadeFrustum> = (0..self.cascade_config.count())
            .map(|i| self.cascade_config.frustum(i, anchor, self.sun.direction))
            .collect();
        for (buffer, frustum) in self.light_buffers.iter().zip(&frusta) {
            self.queue
                .write_buffer(buffer, 0, bytemuck::cast_slice(&[LightUniform::new(frustum)]));
        }

        self.frustum_line_count = 0;
        if self.settings.shadows_enabled && self.settings.show_shadow_frustums {
            let lines: Vec<[f32; 3]> = frusta.iter().flat_map(CascadeFrustum::line_vertices).collect();
            self.queue
                .write_buffer(&self.frustum_line_buffer, 0, bytemuck::cast_slice(&lines));
            self.frustum_line_count = lines.len() as u32;
        }
        frusta
    }

    fn update_frame_uniforms(&mut self, frusta: &[CascadeFrustum]) {
        let preview = frusta.get(self.settings.preview_cascade.min(frusta.len().saturating_sub(1)));
        match preview {
            Some(frustum) if self.settings.view_shadow_projection => {
                self.camera_uniform.update_with(&self.camera, frustum.view_projection())
            }
            _ => self.camera_uniform.update(&self.camera),
        }
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[self.camera_uniform]));

        let lighting = LightingUniform::new(&self.sun, &self.settings, frusta, self.cascades.resolution());
        self.queue
            .write_buffer(&self.lighting_buffer, 0, bytemuck::cast_slice(&[lighting]));
    }

    fn record_shadow_pass(&self, encoder: &mut wgpu::CommandEncoder, cascade: usize, draws: &[DrawItem<'_, GpuBuffer>]) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Cascade Pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.cascades.layer_view(cascade),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.depth_pipeline);
        pass.set_bind_group(self.depth_bindings.light.group, &self.light_bind_groups[cascade], &[]);
        for item in draws {
            pass.set_bind_group(
                self.depth_bindings.model.group,
                &self.models.depth_bind_group,
                &[self.models.offset(item.slot)],
            );
            for mesh in &item.meshes {
                pass.set_vertex_buffer(0, mesh.positions.slice(..));
                pass.draw(0..mesh.vertex_count, 0..1);
            }
        }
    }

    fn record_main_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        draws: &[DrawItem<'_, GpuBuffer>],
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let bindings = &self.scene_bindings;
        pass.set_bind_group(bindings.frame_group(), &self.frame_bind_group, &[]);
        pass.set_bind_group(bindings.shadow_group(), &self.shadow_sample_bind_group, &[]);

        pass.set_pipeline(if self.settings.wireframe {
            &self.wireframe_pipeline
        } else {
            &self.scene_pipeline
        });
        for item in draws {
            pass.set_bind_group(bindings.model_group(), &self.models.scene_bind_group, &[self.models.offset(item.slot)]);
            for mesh in &item.meshes {
                set_scene_buffers(&mut pass, mesh);
                pass.draw(0..mesh.vertex_count, 0..1);
            }
        }

        if self.settings.show_normals {
            pass.set_pipeline(&self.line_pipeline);
            for item in draws {
                pass.set_bind_group(bindings.model_group(), &self.models.scene_bind_group, &[self.models.offset(item.slot)]);
                for mesh in &item.meshes {
                    if let Some(lines) = mesh.lines.as_ref().filter(|_| mesh.line_count > 0) {
                        pass.set_vertex_buffer(0, lines.slice(..));
                        pass.draw(0..mesh.line_count, 0..1);
                    }
                }
            }
        }

        if self.frustum_line_count > 0 {
            // Frustum corners are already in world space; slot 0 is the identity.
            pass.set_pipeline(&self.line_pipeline);
            pass.set_bind_group(bindings.model_group(), &self.models.scene_bind_group, &[self.models.offset(0)]);
            pass.set_vertex_buffer(0, self.frustum_line_buffer.slice(..));
            pass.draw(0..self.frustum_line_count, 0..1);
        }
    }

    fn record_preview_pass(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Preview Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.preview_pipeline);
        self.preview
            .draw(&mut pass, self.preview_bindings.group(), self.settings.preview_cascade);
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.settings
    }

    /// Name of the GPU in use.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn shadow_resolution(&self) -> u32 {
        self.cascades.resolution()
    }

    pub fn cascade_count(&self) -> usize {
        self.cascades.count()
    }

    /// Get window dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Access the device for mesh creation.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
}

fn set_scene_buffers(pass: &mut wgpu::RenderPass<'_>, mesh: &MeshBuffers<GpuBuffer>) {
    pass.set_vertex_buffer(crate::vertex::POSITION_SLOT, mesh.positions.slice(..));
    pass.set_vertex_buffer(crate::vertex::NORMAL_SLOT, mesh.normals.slice(..));
    pass.set_vertex_buffer(crate::vertex::COLOR_SLOT, mesh.colors.slice(..));
}

fn create_shadow_sample_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    bindings: &SceneBindings,
    cascades: &ShadowCascades,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Shadow Sample Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: bindings.shadow_maps.binding,
                resource: wgpu::BindingResource::TextureView(cascades.array_view()),
            },
            wgpu::BindGroupEntry {
                binding: bindings.shadow_sampler.binding,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shadow::{cascade_frustum, default_sun_direction};
    use glam::Vec3;

    #[test]
    fn model_slots_respect_offset_alignment() {
        assert_eq!(std::mem::size_of::<ModelRaw>(), 128);
        assert_eq!(model_stride(256), 256);
        assert_eq!(model_stride(64), 128);
        assert_eq!(model_stride(0), 128);
    }

    #[test]
    fn lighting_uniform_matches_shader_layout() {
        // 4 vec4s, the bias matrix and two arrays of four matrices.
        assert_eq!(std::mem::size_of::<LightingUniform>(), 4 * 16 + 64 + 2 * 4 * 64);
    }

    #[test]
    fn lighting_uniform_carries_toggles_and_cascades() {
        let settings = RenderSettings {
            shadows_enabled: false,
            flashlight: true,
            ..Default::default()
        };
        let frusta: Vec<CascadeFrustum> = [100.0, 200.0]
            .into_iter()
            .map(|h| cascade_frustum(Vec3::ZERO, default_sun_direction(), h, 0.01, 1000.0))
            .collect();
        let uniform = LightingUniform::new(&SunLight::default(), &settings, &frusta, 2048);
        assert_eq!(uniform.toggles, [0.0, 1.0, 1.0, 0.0]);
        assert_eq!(uniform.params[1], 2.0);
        assert_eq!(uniform.params[2], 1.0 / 2048.0);
        assert_eq!(uniform.sun_color[3], 0.2);
        assert_eq!(uniform.cascade_projection[1], frusta[1].projection.to_cols_array_2d());
        assert_eq!(uniform.cascade_view[2], Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(uniform.bias, bias_matrix().to_cols_array_2d());
    }
}
