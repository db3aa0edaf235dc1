use std::collections::HashMap;

use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::error::EffectError;

use super::backend::{
    BufferHandle, DrawOutcome, GraphicsBackend, ProgramHandle, ShaderHandle, ShaderStage,
    UniformSlot,
};
use super::uniforms::{FrameUniforms, UNIFORM_NAMES};

/// Two triangles spanning normalised device coordinates.
pub const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

/// One live set of GPU objects: both shader stages, the linked program, the
/// full-screen quad and the resolved uniform slots.
///
/// A set is built whole or not at all; partial failures delete whatever was
/// already created. [`ShaderProgram::release`] consumes the set so it can
/// only be released once.
#[derive(Debug)]
pub struct ShaderProgram {
    vertex: ShaderHandle,
    fragment: ShaderHandle,
    program: ProgramHandle,
    quad: Option<BufferHandle>,
    uniforms: HashMap<&'static str, UniformSlot>,
    released: bool,
}

impl ShaderProgram {
    /// Compiles, links, uploads the quad and resolves uniforms.
    pub fn build(
        backend: &mut dyn GraphicsBackend,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, EffectError> {
        let vertex = Self::compile(backend, vertex_source, ShaderStage::Vertex)?;
        let fragment = match Self::compile(backend, fragment_source, ShaderStage::Fragment) {
            Ok(fragment) => fragment,
            Err(err) => {
                backend.delete_shader(vertex);
                return Err(err);
            }
        };
        let program = match Self::link(backend, vertex, fragment) {
            Ok(program) => program,
            Err(err) => {
                backend.delete_shader(fragment);
                backend.delete_shader(vertex);
                return Err(err);
            }
        };

        let mut built = Self {
            vertex,
            fragment,
            program,
            quad: None,
            uniforms: HashMap::new(),
            released: false,
        };
        built.bind_quad(backend);
        built.uniforms = Self::resolve_uniforms(backend, program, &UNIFORM_NAMES);
        debug!(
            program = program.0,
            unbound = built.unbound_uniforms().len(),
            "acquired lightning shader resources"
        );
        Ok(built)
    }

    pub fn compile(
        backend: &mut dyn GraphicsBackend,
        source: &str,
        stage: ShaderStage,
    ) -> Result<ShaderHandle, EffectError> {
        backend
            .compile_shader(stage, source)
            .map_err(|log| EffectError::Compile { stage, log })
    }

    pub fn link(
        backend: &mut dyn GraphicsBackend,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, EffectError> {
        backend
            .link_program(vertex, fragment)
            .map_err(|log| EffectError::Link { log })
    }

    /// Uploads the static quad. A second call is a no-op.
    pub fn bind_quad(&mut self, backend: &mut dyn GraphicsBackend) {
        if self.quad.is_none() {
            self.quad = Some(backend.create_vertex_buffer(&QUAD_VERTICES));
        }
    }

    pub fn resolve_uniforms(
        backend: &mut dyn GraphicsBackend,
        program: ProgramHandle,
        names: &[&'static str],
    ) -> HashMap<&'static str, UniformSlot> {
        names
            .iter()
            .map(|&name| (name, backend.uniform_slot(program, name)))
            .collect()
    }

    pub fn uniform_slot(&self, name: &str) -> UniformSlot {
        self.uniforms
            .get(name)
            .copied()
            .unwrap_or(UniformSlot::Unbound)
    }

    pub fn unbound_uniforms(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .uniforms
            .iter()
            .filter(|(_, slot)| matches!(slot, UniformSlot::Unbound))
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Writes every frame uniform; unbound names are skipped.
    pub fn set_frame_uniforms(&self, backend: &mut dyn GraphicsBackend, frame: &FrameUniforms) {
        for (name, value) in frame.named_values() {
            if let UniformSlot::Bound(slot) = self.uniform_slot(name) {
                backend.write_uniform(self.program, slot, value);
            }
        }
    }

    pub fn draw(
        &self,
        backend: &mut dyn GraphicsBackend,
        viewport: PhysicalSize<u32>,
    ) -> DrawOutcome {
        match self.quad {
            Some(quad) => backend.draw(self.program, quad, viewport, QUAD_VERTICES.len() as u32),
            None => DrawOutcome::Skipped,
        }
    }

    /// Deletes the program, both stages and the quad.
    pub fn release(mut self, backend: &mut dyn GraphicsBackend) {
        backend.delete_program(self.program);
        backend.delete_shader(self.fragment);
        backend.delete_shader(self.vertex);
        if let Some(quad) = self.quad.take() {
            backend.delete_buffer(quad);
        }
        self.released = true;
        debug!(program = self.program.0, "released lightning shader resources");
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                program = self.program.0,
                "shader resources dropped without release; GPU objects leak until the context is destroyed"
            );
        }
    }
}
