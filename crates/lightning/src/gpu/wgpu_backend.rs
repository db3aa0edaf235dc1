use std::borrow::Cow;
use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::error::EffectError;

use super::backend::{
    BufferHandle, DrawOutcome, GraphicsBackend, ProgramHandle, ShaderHandle, ShaderStage,
    UniformSlot, UniformValue,
};
use super::context::GpuContext;
use super::uniforms::FrameUniforms;

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const UNIFORM_BLOCK_SIZE: u64 = std::mem::size_of::<FrameUniforms>() as u64;

struct CompiledShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
}

struct LinkedProgram {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uniforms: FrameUniforms,
}

/// [`GraphicsBackend`] that renders into a window surface through wgpu.
///
/// Shaders go through wgpu's GLSL frontend. Validation errors are captured
/// with error scopes and returned as diagnostic text instead of reaching the
/// device's uncaptured-error handler. If the device could not be created,
/// every call is a no-op and [`GraphicsBackend::check_support`] reports why.
pub struct WgpuBackend {
    context: Result<GpuContext, String>,
    next_id: u32,
    shaders: HashMap<u32, CompiledShader>,
    programs: HashMap<u32, LinkedProgram>,
    buffers: HashMap<u32, wgpu::Buffer>,
}

impl WgpuBackend {
    /// Creates a surface for `window` and requests a device for it.
    ///
    /// Failure is deferred: the returned backend reports it from
    /// `check_support` so the effect can degrade to rendering nothing.
    pub fn connect(window: impl wgpu::WindowHandle + 'static, size: PhysicalSize<u32>) -> Self {
        let context = GpuContext::new(window, size).map_err(|err| {
            tracing::warn!("GPU initialisation failed: {err:#}");
            format!("{err:#}")
        });
        Self {
            context,
            next_id: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
        }
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    fn device(&self) -> Result<&wgpu::Device, String> {
        self.context
            .as_ref()
            .map(|context| &context.device)
            .map_err(Clone::clone)
    }
}

/// Runs `create` inside a validation error scope and returns its first error.
fn scoped<T>(device: &wgpu::Device, create: impl FnOnce() -> T) -> Result<T, String> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(value),
    }
}

impl GraphicsBackend for WgpuBackend {
    fn check_support(&self) -> Result<(), EffectError> {
        self.context
            .as_ref()
            .map(|_| ())
            .map_err(|reason| EffectError::UnsupportedBackend(reason.clone()))
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        let device = self.device()?;
        let naga_stage = match stage {
            ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
        };
        let module = scoped(device, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    ShaderStage::Vertex => "lightning quad vertex",
                    ShaderStage::Fragment => "lightning field fragment",
                }),
                source: wgpu::ShaderSource::Glsl {
                    shader: Cow::Owned(source.to_owned()),
                    stage: naga_stage,
                    defines: &[],
                },
            })
        })?;
        let id = self.allocate();
        self.shaders.insert(id, CompiledShader { stage, module });
        Ok(ShaderHandle(id))
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if self.shaders.remove(&shader.0).is_none() {
            tracing::trace!(shader = shader.0, "delete of unknown shader ignored");
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        let context = self.context.as_ref().map_err(Clone::clone)?;
        let device = &context.device;
        let vertex = self
            .shaders
            .get(&vertex.0)
            .filter(|shader| shader.stage == ShaderStage::Vertex)
            .ok_or_else(|| format!("no vertex shader with id {}", vertex.0))?;
        let fragment = self
            .shaders
            .get(&fragment.0)
            .filter(|shader| shader.stage == ShaderStage::Fragment)
            .ok_or_else(|| format!("no fragment shader with id {}", fragment.0))?;

        let linked = scoped(device, || {
            let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("lightning params layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(UNIFORM_BLOCK_SIZE),
                    },
                    count: None,
                }],
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("lightning pipeline layout"),
                bind_group_layouts: &[&uniform_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("lightning pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some("main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &QUAD_ATTRIBUTES,
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: context.config.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            });
            let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("lightning params"),
                size: UNIFORM_BLOCK_SIZE,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lightning params bind group"),
                layout: &uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            LinkedProgram {
                pipeline,
                uniform_buffer,
                bind_group,
                uniforms: FrameUniforms::zeroed(),
            }
        })?;

        let id = self.allocate();
        self.programs.insert(id, linked);
        Ok(ProgramHandle(id))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(linked) = self.programs.remove(&program.0) {
            linked.uniform_buffer.destroy();
        }
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> BufferHandle {
        let id = self.allocate();
        if let Ok(context) = &self.context {
            let buffer = context.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lightning quad"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            self.buffers.insert(id, buffer);
        }
        BufferHandle(id)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = self.buffers.remove(&buffer.0) {
            buffer.destroy();
        }
    }

    fn uniform_slot(&mut self, program: ProgramHandle, name: &str) -> UniformSlot {
        if !self.programs.contains_key(&program.0) {
            return UniformSlot::Unbound;
        }
        FrameUniforms::block_offset(name)
            .map(UniformSlot::Bound)
            .unwrap_or(UniformSlot::Unbound)
    }

    fn write_uniform(&mut self, program: ProgramHandle, slot: u32, value: UniformValue) {
        if let Some(linked) = self.programs.get_mut(&program.0) {
            linked.uniforms.write(slot, value);
        }
    }

    fn configure_backing(&mut self, size: PhysicalSize<u32>) {
        if let Ok(context) = self.context.as_mut() {
            context.resize(size);
        }
    }

    fn draw(
        &mut self,
        program: ProgramHandle,
        buffer: BufferHandle,
        viewport: PhysicalSize<u32>,
        vertex_count: u32,
    ) -> DrawOutcome {
        let Ok(context) = self.context.as_mut() else {
            return DrawOutcome::Skipped;
        };
        let (Some(linked), Some(quad)) = (self.programs.get(&program.0), self.buffers.get(&buffer.0))
        else {
            return DrawOutcome::Skipped;
        };

        let frame = match context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                context.reconfigure();
                return DrawOutcome::Skipped;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("surface out of memory; skipping frame");
                return DrawOutcome::Skipped;
            }
            Err(err) => {
                tracing::warn!("surface unavailable: {err:?}");
                return DrawOutcome::Skipped;
            }
        };

        context
            .queue
            .write_buffer(&linked.uniform_buffer, 0, bytemuck::bytes_of(&linked.uniforms));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lightning encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lightning pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let width = viewport.width.clamp(1, context.config.width);
            let height = viewport.height.clamp(1, context.config.height);
            render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
            render_pass.set_pipeline(&linked.pipeline);
            render_pass.set_bind_group(0, &linked.bind_group, &[]);
            render_pass.set_vertex_buffer(0, quad.slice(..));
            render_pass.draw(0..vertex_count, 0..1);
        }

        context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(width = viewport.width, height = viewport.height, "presented frame");
        DrawOutcome::Presented
    }
}
