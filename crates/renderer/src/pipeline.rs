//! Bind group layouts and render pipelines.
//!
//! Every binding index and group number comes from the uniform cache, so the layouts follow
//! whatever the WGSL declares.

use crate::error::RenderError;
use crate::texture::Texture;
use crate::uniform_cache::{Program, UniformCache, UniformLocation, UniformResolver};
use crate::vertex::{position_layout, scene_layouts, PreviewVertex};
use engine_core::ModelRaw;

fn same_group(program: Program, members: &[(&'static str, UniformLocation)]) -> Result<u32, RenderError> {
    let group = members[0].1.group;
    if members.iter().all(|(_, loc)| loc.group == group) {
        Ok(group)
    } else {
        Err(RenderError::BindingGroupMismatch {
            program: program.name(),
            names: members.iter().map(|(name, _)| *name).collect(),
        })
    }
}

/// Located bindings of the scene program.
#[derive(Debug, Clone, Copy)]
pub struct SceneBindings {
    pub camera: UniformLocation,
    pub lighting: UniformLocation,
    pub shadow_maps: UniformLocation,
    pub shadow_sampler: UniformLocation,
    pub model: UniformLocation,
}

impl SceneBindings {
    pub fn locate<R: UniformResolver>(cache: &mut UniformCache<R>) -> Result<Self, RenderError> {
        let p = Program::Scene;
        let bindings = Self {
            camera: cache.require(p, "camera")?,
            lighting: cache.require(p, "lighting")?,
            shadow_maps: cache.require(p, "shadow_maps")?,
            shadow_sampler: cache.require(p, "shadow_sampler")?,
            model: cache.require(p, "model")?,
        };
        same_group(p, &[("camera", bindings.camera), ("lighting", bindings.lighting)])?;
        same_group(p, &[("shadow_maps", bindings.shadow_maps), ("shadow_sampler", bindings.shadow_sampler)])?;
        Ok(bindings)
    }

    /// Group holding camera and lighting.
    pub fn frame_group(&self) -> u32 {
        self.camera.group
    }

    pub fn shadow_group(&self) -> u32 {
        self.shadow_maps.group
    }

    pub fn model_group(&self) -> u32 {
        self.model.group
    }
}

/// Located bindings of the depth program.
#[derive(Debug, Clone, Copy)]
pub struct DepthBindings {
    pub light: UniformLocation,
    pub model: UniformLocation,
}

impl DepthBindings {
    pub fn locate<R: UniformResolver>(cache: &mut UniformCache<R>) -> Result<Self, RenderError> {
        Ok(Self {
            light: cache.require(Program::Depth, "light")?,
            model: cache.require(Program::Depth, "model")?,
        })
    }
}

/// Located bindings of the preview program.
#[derive(Debug, Clone, Copy)]
pub struct PreviewBindings {
    pub preview: UniformLocation,
    pub shadow_map: UniformLocation,
}

impl PreviewBindings {
    pub fn locate<R: UniformResolver>(cache: &mut UniformCache<R>) -> Result<Self, RenderError> {
        let p = Program::Preview;
        let bindings = Self {
            preview: cache.require(p, "preview")?,
            shadow_map: cache.require(p, "shadow_map")?,
        };
        same_group(p, &[("preview", bindings.preview), ("shadow_map", bindings.shadow_map)])?;
        Ok(bindings)
    }

    pub fn group(&self) -> u32 {
        self.preview.group
    }
}

/// Sort `(group, layout)` pairs into pipeline-layout order. Groups must be exactly `0..n`.
pub fn ordered_layouts<T>(program: Program, mut groups: Vec<(u32, T)>) -> Result<Vec<T>, RenderError> {
    groups.sort_by_key(|(group, _)| *group);
    if groups.iter().enumerate().any(|(i, (group, _))| *group != i as u32) {
        return Err(RenderError::GroupGap {
            program: program.name(),
            groups: groups.iter().map(|(group, _)| *group).collect(),
        });
    }
    Ok(groups.into_iter().map(|(_, layout)| layout).collect())
}

pub fn create_pipeline_layout(
    device: &wgpu::Device,
    program: Program,
    groups: Vec<(u32, &wgpu::BindGroupLayout)>,
) -> Result<wgpu::PipelineLayout, RenderError> {
    let layouts = ordered_layouts(program, groups)?;
    Ok(device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(program.name()),
        bind_group_layouts: &layouts,
        push_constant_ranges: &[],
    }))
}

pub fn create_shader_module(device: &wgpu::Device, program: Program) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(program.name()),
        source: wgpu::ShaderSource::Wgsl(program.source().into()),
    })
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, dynamic: bool, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: wgpu::BufferSize::new(size as u64),
        },
        count: None,
    }
}

/// Camera + lighting uniforms of the scene program.
pub fn create_frame_bind_group_layout(
    device: &wgpu::Device,
    bindings: &SceneBindings,
    camera_size: usize,
    lighting_size: usize,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Frame Bind Group Layout"),
        entries: &[
            uniform_entry(
                bindings.camera.binding,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                false,
                camera_size,
            ),
            uniform_entry(bindings.lighting.binding, wgpu::ShaderStages::FRAGMENT, false, lighting_size),
        ],
    })
}

/// Cascade depth array plus comparison sampler.
pub fn create_shadow_sample_bind_group_layout(device: &wgpu::Device, bindings: &SceneBindings) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Shadow Sample Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: bindings.shadow_maps.binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: bindings.shadow_sampler.binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
    })
}

/// Per-draw model matrices, addressed by dynamic offset.
pub fn create_model_bind_group_layout(device: &wgpu::Device, location: UniformLocation, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[uniform_entry(
            location.binding,
            wgpu::ShaderStages::VERTEX,
            true,
            std::mem::size_of::<ModelRaw>(),
        )],
    })
}

/// One cascade's light matrix for the depth pass.
pub fn create_light_bind_group_layout(device: &wgpu::Device, location: UniformLocation, size: usize) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Light Bind Group Layout"),
        entries: &[uniform_entry(location.binding, wgpu::ShaderStages::VERTEX, false, size)],
    })
}

/// Preview transform plus one cascade layer.
pub fn create_preview_bind_group_layout(device: &wgpu::Device, bindings: &PreviewBindings, size: usize) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Preview Bind Group Layout"),
        entries: &[
            uniform_entry(bindings.preview.binding, wgpu::ShaderStages::VERTEX, false, size),
            wgpu::BindGroupLayoutEntry {
                binding: bindings.shadow_map.binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
        ],
    })
}

fn depth_state(write: bool, bias: wgpu::DepthBiasState) -> Option<wgpu::DepthStencilState> {
    Some(wgpu::DepthStencilState {
        format: Texture::DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias,
    })
}

/// Lit scene pipeline. `topology` is `LineList` for the wireframe draw mode.
pub fn create_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    let buffers = scene_layouts();
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(match topology {
            wgpu::PrimitiveTopology::LineList => "Scene Wireframe Pipeline",
            _ => "Scene Pipeline",
        }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_state(true, wgpu::DepthBiasState::default()),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Unlit line overlays (normals, cascade frustums). Shares the scene program's layout.
pub fn create_line_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Line Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_line"),
            buffers: &[position_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_line"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::LineList,
            ..Default::default()
        },
        depth_stencil: depth_state(true, wgpu::DepthBiasState::default()),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Depth-only cascade pipeline with slope-scaled bias against acne.
pub fn create_depth_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Depth Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[position_layout()],
            compilation_options: Default::default(),
        },
        fragment: None,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: depth_state(
            true,
            wgpu::DepthBiasState {
                constant: 2,
                slope_scale: 2.0,
                clamp: 0.0,
            },
        ),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Preview quad, drawn over the finished frame without depth.
pub fn create_preview_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Shadow Preview Pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[PreviewVertex::layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniform_cache::ShaderLibrary;
    use std::collections::HashMap;

    struct FixedResolver(HashMap<&'static str, UniformLocation>);

    impl UniformResolver for FixedResolver {
        fn resolve(&self, _program: Program, name: &str) -> Option<UniformLocation> {
            self.0.get(name).copied()
        }
    }

    fn at(group: u32, binding: u32) -> UniformLocation {
        UniformLocation { group, binding }
    }

    #[test]
    fn shipped_shaders_have_consistent_groups() {
        let mut cache = UniformCache::new(ShaderLibrary::load().unwrap());
        let scene = SceneBindings::locate(&mut cache).unwrap();
        let groups = [scene.frame_group(), scene.shadow_group(), scene.model_group()];
        let mut sorted = groups.to_vec();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);

        let depth = DepthBindings::locate(&mut cache).unwrap();
        assert_ne!(depth.light.group, depth.model.group);
        let preview = PreviewBindings::locate(&mut cache).unwrap();
        assert_eq!(preview.group(), 0);
    }

    #[test]
    fn split_frame_group_is_rejected() {
        let resolver = FixedResolver(HashMap::from([
            ("camera", at(0, 0)),
            ("lighting", at(3, 1)),
            ("shadow_maps", at(1, 0)),
            ("shadow_sampler", at(1, 1)),
            ("model", at(2, 0)),
        ]));
        let mut cache = UniformCache::new(resolver);
        assert!(matches!(
            SceneBindings::locate(&mut cache),
            Err(RenderError::BindingGroupMismatch { names, .. }) if names == vec!["camera", "lighting"]
        ));
    }

    #[test]
    fn layouts_are_ordered_by_group() {
        let ordered = ordered_layouts(Program::Scene, vec![(2, "model"), (0, "frame"), (1, "shadow")]).unwrap();
        assert_eq!(ordered, vec!["frame", "shadow", "model"]);
        assert!(matches!(
            ordered_layouts(Program::Depth, vec![(0, "light"), (2, "model")]),
            Err(RenderError::GroupGap { groups, .. }) if groups == vec![0, 2]
        ));
    }

    #[test]
    fn missing_binding_is_reported() {
        let mut cache = UniformCache::new(FixedResolver(HashMap::from([("light", at(0, 0))])));
        assert!(matches!(
            DepthBindings::locate(&mut cache),
            Err(RenderError::MissingBinding { name: "model", .. })
        ));
    }
}
