use std::fmt;

use winit::dpi::PhysicalSize;

use crate::error::EffectError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Resolved location of a named uniform.
///
/// `Unbound` is the sentinel for names the compiled program does not expose
/// (typically optimised out); writes to it are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    Bound(u32),
    Unbound,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
}

/// Result of a single draw submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Presented,
    /// The backend could not present this frame (lost or outdated surface);
    /// the next tick tries again with freshly computed dimensions.
    Skipped,
}

/// Minimal graphics API surface the shader path needs.
///
/// Compile and link failures are reported as the backend's diagnostic text;
/// [`crate::gpu::ShaderProgram`] wraps them into [`EffectError`]s.
pub trait GraphicsBackend {
    /// Checks whether the host can run this backend at all. Called once per
    /// activation, before any resource is created.
    fn check_support(&self) -> Result<(), EffectError>;

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;

    fn delete_shader(&mut self, shader: ShaderHandle);

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String>;

    fn delete_program(&mut self, program: ProgramHandle);

    /// Uploads a static buffer of 2D positions.
    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> BufferHandle;

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn uniform_slot(&mut self, program: ProgramHandle, name: &str) -> UniformSlot;

    fn write_uniform(&mut self, program: ProgramHandle, slot: u32, value: UniformValue);

    /// Resizes the backing store the draws land in.
    fn configure_backing(&mut self, size: PhysicalSize<u32>);

    fn draw(
        &mut self,
        program: ProgramHandle,
        buffer: BufferHandle,
        viewport: PhysicalSize<u32>,
        vertex_count: u32,
    ) -> DrawOutcome;
}
