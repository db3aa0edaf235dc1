//! CPU bolt path: stochastic jagged strokes that spawn, fade and retire.
//!
//! ```text
//!   BoltField::render_frame
//!        │ clear + ambient overlay
//!        ├─▶ Bolt::advance ──▶ Retired? drop : BoltGenerator::jagged_path ─▶ Canvas::stroke
//!        └─▶ spawn_probability ─▶ BoltGenerator::spawn ─▶ drawn at full opacity
//! ```

use std::time::Duration;

mod canvas;
mod field;
mod generator;

#[cfg(test)]
pub(crate) mod recording;

pub use canvas::{Canvas, PixmapCanvas, Point, StrokeStyle};
pub use field::{BoltField, FrameReport};
pub use generator::BoltGenerator;

/// Forks are only drawn when a bolt's fork weight exceeds this.
pub const FORK_THRESHOLD: f32 = 0.3;

/// One lightning strike.
#[derive(Debug, Clone, PartialEq)]
pub struct Bolt {
    pub start: Point,
    pub end: Point,
    /// Number of straight pieces in the path; the path has `segments + 1` points.
    pub segments: u32,
    pub age: Duration,
    pub lifetime: Duration,
    pub thickness: f32,
    /// Fractional fork weight in `[0, 2)`.
    pub forks: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoltPhase {
    Aging,
    Retired,
}

impl Bolt {
    /// `1 - age / lifetime`; zero-length lifetimes are already spent.
    pub fn opacity(&self) -> f32 {
        self.remaining() as f32
    }

    fn remaining(&self) -> f64 {
        if self.lifetime.is_zero() {
            return 0.0;
        }
        1.0 - self.age.as_nanos() as f64 / self.lifetime.as_nanos() as f64
    }

    /// Ages the bolt by one frame. A retired bolt must not be drawn again.
    pub fn advance(&mut self, elapsed: Duration) -> BoltPhase {
        self.age = self.age.saturating_add(elapsed);
        if self.remaining() <= 0.0 {
            BoltPhase::Retired
        } else {
            BoltPhase::Aging
        }
    }

    pub fn fork_count(&self) -> u32 {
        if self.forks > FORK_THRESHOLD {
            self.forks.floor() as u32
        } else {
            0
        }
    }
}

/// Chance of spawning a bolt on a frame that took `elapsed`:
/// `clamp(frequency * clamp(intensity, 0, 1) * seconds, 0, 1)`.
///
/// Non-finite or negative inputs yield `0`.
pub fn spawn_probability(frequency: f32, intensity: f32, elapsed: Duration) -> f32 {
    let rate = frequency * intensity.clamp(0.0, 1.0);
    let probability = rate * elapsed.as_secs_f32();
    if probability.is_finite() {
        probability.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
