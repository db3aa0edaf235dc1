use std::time::Duration;

use rand::prelude::*;
use winit::dpi::LogicalSize;

use crate::types::EffectConfig;

use super::canvas::Point;
use super::Bolt;

/// Maximum jitter of an interior path point, in logical pixels.
const JITTER: f32 = 15.0;
const FORK_SPREAD_X: f32 = 120.0;
const FORK_DROP_Y: f32 = 80.0;

/// Seeded source of bolt geometry.
///
/// Every random decision the bolt path makes goes through one generator, so
/// two effects built with the same seed and driven with the same frame times
/// draw identical frames.
#[derive(Debug, Clone)]
pub struct BoltGenerator {
    rng: StdRng,
}

impl BoltGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Draws one uniform sample and compares it against `probability`.
    pub fn should_spawn(&mut self, probability: f32) -> bool {
        self.rng.gen::<f32>() < probability
    }

    /// A fresh bolt from the top edge towards the lower part of `surface`.
    ///
    /// Returns `None` under reduced motion: that mode never creates bolts.
    pub fn spawn(&mut self, surface: LogicalSize<f64>, config: &EffectConfig) -> Option<Bolt> {
        if config.reduced_motion() {
            return None;
        }
        let width = surface.width as f32;
        let height = surface.height as f32;
        let start = Point::new(self.rng.gen::<f32>() * width, 0.0);
        let end = Point::new(
            self.rng.gen::<f32>() * width,
            height * (0.6 + self.rng.gen::<f32>() * 0.35),
        );
        let segments = self.rng.gen_range(6..=13);
        let lifetime = self.lifetime(config.bolt_lifetime);
        Some(Bolt {
            start,
            end,
            segments,
            age: Duration::ZERO,
            lifetime,
            thickness: 1.0 + self.rng.gen::<f32>() * 2.0,
            forks: self.rng.gen::<f32>() * 2.0,
        })
    }

    fn lifetime(&mut self, (min, max): (Duration, Duration)) -> Duration {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        min + (max - min).mul_f64(self.rng.gen::<f64>())
    }

    /// `segments + 1` points from start to end. Endpoints stay pinned;
    /// interior points are pushed up to `±15·(1−t)` px sideways and
    /// `±15·t` px along the vertical axis.
    pub fn jagged_path(&mut self, bolt: &Bolt) -> Vec<Point> {
        let segments = bolt.segments.max(1);
        (0..=segments)
            .map(|index| {
                if index == 0 {
                    return bolt.start;
                }
                if index == segments {
                    return bolt.end;
                }
                let t = index as f32 / segments as f32;
                let base = bolt.start.lerp(bolt.end, t);
                let dx = (self.rng.gen::<f32>() - 0.5) * 2.0 * JITTER * (1.0 - t);
                let dy = (self.rng.gen::<f32>() - 0.5) * 2.0 * JITTER * t;
                Point::new(base.x + dx, base.y + dy)
            })
            .collect()
    }

    /// A short branch from a random interior point of `path`.
    pub fn fork(&mut self, path: &[Point]) -> Option<[Point; 2]> {
        if path.len() < 3 {
            return None;
        }
        let span = path.len().saturating_sub(4).max(3);
        let index = (2 + self.rng.gen_range(0..span)).min(path.len() - 1);
        let origin = path[index];
        let tip = Point::new(
            origin.x + (self.rng.gen::<f32>() - 0.5) * FORK_SPREAD_X,
            origin.y + self.rng.gen::<f32>() * FORK_DROP_Y,
        );
        Some([origin, tip])
    }
}
