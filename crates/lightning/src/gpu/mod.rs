//! GPU path of the lightning effect.
//!
//! The path is split along the same seams the draw itself has:
//! - `backend` is the narrow trait every graphics API is driven through
//!   (compile, link, buffers, uniform slots, draw). `wgpu_backend` is the
//!   production implementation; tests drive a recording double.
//! - `shaders` holds the GLSL for the full-screen quad and the domain-warped
//!   noise field.
//! - `uniforms` mirrors the std140 parameter block and knows each uniform's
//!   name and offset.
//! - `program` owns one compiled/linked resource set and is the only place
//!   that creates or deletes backend objects.
//! - `reference` evaluates the fragment program on the CPU.

mod backend;
mod context;
mod program;
pub mod reference;
pub mod shaders;
mod uniforms;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod recording;

pub use backend::{
    BufferHandle, DrawOutcome, GraphicsBackend, ProgramHandle, ShaderHandle, ShaderStage,
    UniformSlot, UniformValue,
};
pub use program::{ShaderProgram, QUAD_VERTICES};
pub use uniforms::{FrameUniforms, UNIFORM_NAMES};
pub use wgpu_backend::WgpuBackend;
