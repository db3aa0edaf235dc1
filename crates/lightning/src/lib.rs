//! Procedural lightning background.
//!
//! Two independent rendering strategies share one externally driven unit,
//! [`EffectInstance`]:
//!
//! ```text
//!   host event loop (winit RedrawRequested / headless driver)
//!          │ tick(now)
//!          ▼
//!   EffectInstance ──▶ FrameScheduler ──▶ SurfaceManager::resize()
//!          │                                     │
//!          ├─ shader path ─▶ ShaderProgram ─▶ GraphicsBackend (wgpu)
//!          │                   └─▶ FrameUniforms ─▶ GLSL fbm field
//!          │
//!          └─ bolt path ──▶ BoltField ─▶ BoltGenerator ─▶ Canvas (tiny-skia)
//! ```
//!
//! The shader path evaluates a domain-warped fractal noise field per pixel on
//! the GPU; [`gpu::reference`] evaluates the same program on the CPU. The bolt
//! path spawns, ages and retires jagged strokes with glow and forks.
//!
//! Everything runs on the caller's thread. An instance owns its backend or
//! canvas, so any number of instances can run side by side, and
//! [`EffectInstance::dispose`] (or drop) releases every resource it acquired.

pub mod bolts;
mod effect;
mod error;
pub mod gpu;
pub mod noise;
pub mod runtime;
pub mod surface;
mod types;

pub use bolts::{Bolt, BoltField, BoltGenerator, Canvas, PixmapCanvas};
pub use effect::{EffectInstance, TickOutcome};
pub use error::EffectError;
pub use gpu::{GraphicsBackend, WgpuBackend};
pub use surface::{SurfaceManager, SurfaceState, ViewportMetrics};
pub use types::{
    ColorParseError, EffectConfig, EffectKind, MotionPreference, Rgba, DEFAULT_BOLT_LIFETIME,
    FROZEN_SHADER_PHASE,
};
