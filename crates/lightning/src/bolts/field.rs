use std::time::Duration;

use crate::surface::SurfaceState;
use crate::types::{EffectConfig, Rgba};

use super::canvas::{Canvas, StrokeStyle};
use super::generator::BoltGenerator;
use super::{spawn_probability, Bolt, BoltPhase};

const OVERLAY_ALPHA: f32 = 0.06;
const GLOW_ALPHA: f32 = 0.22;
const GLOW_EXTRA_WIDTH: f32 = 6.0;
const GLOW_WIDTH_SCALE: f32 = 0.7;
const GLOW_BLUR: f32 = 30.0;
const FORK_ALPHA_SCALE: f32 = 0.6;
const FORK_ALPHA_MAX: f32 = 0.8;
const FORK_WIDTH_SCALE: f32 = 0.6;

/// What one call to [`BoltField::render_frame`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub drawn: usize,
    pub retired: usize,
    pub spawned: bool,
}

/// The live bolt collection of one effect and the generator feeding it.
#[derive(Debug, Clone)]
pub struct BoltField {
    bolts: Vec<Bolt>,
    generator: BoltGenerator,
}

impl BoltField {
    pub fn new(generator: BoltGenerator) -> Self {
        Self {
            bolts: Vec::new(),
            generator,
        }
    }

    pub fn live(&self) -> &[Bolt] {
        &self.bolts
    }

    pub fn insert(&mut self, bolt: Bolt) {
        self.bolts.push(bolt);
    }

    /// Drops every live bolt and returns how many there were.
    pub fn discard(&mut self) -> usize {
        let count = self.bolts.len();
        self.bolts.clear();
        count
    }

    /// Draws one active frame.
    ///
    /// Order: clear, ambient overlay, age and draw every surviving bolt, then
    /// maybe spawn one and draw it at full opacity.
    pub fn render_frame(
        &mut self,
        canvas: &mut dyn Canvas,
        surface: &SurfaceState,
        config: &EffectConfig,
        elapsed: Duration,
    ) -> FrameReport {
        let mut report = FrameReport::default();
        let intensity = config.intensity.max(0.0);

        canvas.clear();
        canvas.fill_rect(
            0.0,
            0.0,
            surface.logical.width as f32,
            surface.logical.height as f32,
            Rgba::new(0.0, 0.0, 0.0, OVERLAY_ALPHA * intensity),
        );

        let generator = &mut self.generator;
        self.bolts.retain_mut(|bolt| match bolt.advance(elapsed) {
            BoltPhase::Retired => {
                report.retired += 1;
                false
            }
            BoltPhase::Aging => {
                draw_bolt(generator, canvas, bolt, config);
                report.drawn += 1;
                true
            }
        });

        let probability = spawn_probability(config.frequency, config.intensity, elapsed);
        if self.generator.should_spawn(probability) {
            if let Some(bolt) = self.generator.spawn(surface.logical, config) {
                draw_bolt(&mut self.generator, canvas, &bolt, config);
                report.drawn += 1;
                report.spawned = true;
                self.bolts.push(bolt);
            }
        }

        report
    }
}

fn draw_bolt(
    generator: &mut BoltGenerator,
    canvas: &mut dyn Canvas,
    bolt: &Bolt,
    config: &EffectConfig,
) {
    let opacity = bolt.opacity().min(1.0);
    let path = generator.jagged_path(bolt);

    canvas.stroke(
        &path,
        &StrokeStyle {
            color: config.color,
            alpha: opacity * GLOW_ALPHA,
            width: (bolt.thickness + GLOW_EXTRA_WIDTH) * GLOW_WIDTH_SCALE,
            glow: GLOW_BLUR * config.intensity.max(0.0),
        },
    );
    canvas.stroke(
        &path,
        &StrokeStyle {
            color: Rgba::WHITE,
            alpha: opacity,
            width: bolt.thickness,
            glow: 0.0,
        },
    );

    let fork_style = StrokeStyle {
        color: Rgba::WHITE,
        alpha: (bolt.opacity() * FORK_ALPHA_SCALE).min(FORK_ALPHA_MAX),
        width: bolt.thickness * FORK_WIDTH_SCALE,
        glow: 0.0,
    };
    for _ in 0..bolt.fork_count() {
        if let Some(branch) = generator.fork(&path) {
            canvas.stroke(&branch, &fork_style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolts::canvas::Point;
    use crate::bolts::recording::{strokes, CanvasOp, RecordingCanvas};
    use crate::surface::ViewportMetrics;
    use crate::types::MotionPreference;

    fn surface() -> SurfaceState {
        SurfaceState::from_metrics(ViewportMetrics::new(400.0, 300.0, 2.0))
    }

    fn bolt(lifetime_ms: u64, forks: f32) -> Bolt {
        Bolt {
            start: Point::new(100.0, 0.0),
            end: Point::new(140.0, 240.0),
            segments: 8,
            age: Duration::ZERO,
            lifetime: Duration::from_millis(lifetime_ms),
            thickness: 2.0,
            forks,
        }
    }

    fn quiet() -> EffectConfig {
        EffectConfig {
            frequency: 0.0,
            ..EffectConfig::bolts()
        }
    }

    #[test]
    fn frame_starts_with_clear_and_overlay() {
        let mut field = BoltField::new(BoltGenerator::new(1));
        let mut canvas = RecordingCanvas::new();
        let log = canvas.log();
        let config = quiet();
        field.render_frame(&mut canvas, &surface(), &config, Duration::from_millis(16));

        let ops = log.borrow();
        assert_eq!(ops[0], CanvasOp::Clear);
        match &ops[1] {
            CanvasOp::FillRect {
                width,
                height,
                color,
                ..
            } => {
                assert_eq!((*width, *height), (400.0, 300.0));
                assert!((color.a - 0.06 * config.intensity).abs() < 1e-6);
            }
            other => panic!("expected overlay, got {other:?}"),
        }
    }

    #[test]
    fn aged_bolt_draws_glow_then_core_at_expected_opacity() {
        let mut field = BoltField::new(BoltGenerator::new(2));
        field.insert(bolt(400, 0.0));
        let mut canvas = RecordingCanvas::new();
        let log = canvas.log();
        let config = quiet();
        let report =
            field.render_frame(&mut canvas, &surface(), &config, Duration::from_millis(100));
        assert_eq!(report.drawn, 1);

        let strokes = strokes(&log);
        assert_eq!(strokes.len(), 2);
        let (glow_path, glow) = &strokes[0];
        let (core_path, core) = &strokes[1];
        assert_eq!(glow_path, core_path);
        assert_eq!(glow.color, config.color);
        assert!((glow.alpha - 0.75 * 0.22).abs() < 1e-6);
        assert!((glow.width - 8.0 * 0.7).abs() < 1e-6);
        assert!((glow.glow - 30.0 * config.intensity).abs() < 1e-6);
        assert_eq!(core.color, Rgba::WHITE);
        assert!((core.alpha - 0.75).abs() < 1e-6);
        assert_eq!(core.width, 2.0);
    }

    #[test]
    fn spent_bolt_is_removed_without_drawing() {
        let mut field = BoltField::new(BoltGenerator::new(3));
        field.insert(bolt(400, 0.0));
        let mut canvas = RecordingCanvas::new();
        let log = canvas.log();
        let config = quiet();

        field.render_frame(&mut canvas, &surface(), &config, Duration::from_millis(100));
        log.borrow_mut().clear();
        let report =
            field.render_frame(&mut canvas, &surface(), &config, Duration::from_millis(300));
        assert_eq!(report.retired, 1);
        assert!(field.live().is_empty());
        assert!(strokes(&log).is_empty());
    }

    #[test]
    fn forks_are_thinner_and_dimmer() {
        let mut field = BoltField::new(BoltGenerator::new(4));
        field.insert(bolt(1000, 1.5));
        let mut canvas = RecordingCanvas::new();
        let log = canvas.log();
        field.render_frame(&mut canvas, &surface(), &quiet(), Duration::from_millis(500));

        let strokes = strokes(&log);
        assert_eq!(strokes.len(), 3);
        let (branch, style) = &strokes[2];
        assert_eq!(branch.len(), 2);
        assert!((style.alpha - 0.3).abs() < 1e-6);
        assert!((style.width - 1.2).abs() < 1e-6);
    }

    #[test]
    fn certain_spawn_is_drawn_at_full_opacity() {
        let mut field = BoltField::new(BoltGenerator::new(5));
        let mut canvas = RecordingCanvas::new();
        let log = canvas.log();
        let config = EffectConfig {
            frequency: 1000.0,
            intensity: 1.0,
            ..EffectConfig::bolts()
        };
        let report =
            field.render_frame(&mut canvas, &surface(), &config, Duration::from_millis(16));
        assert!(report.spawned);
        assert_eq!(field.live().len(), 1);
        assert_eq!(field.live()[0].age, Duration::ZERO);
        let core = &strokes(&log)[1].1;
        assert_eq!(core.alpha, 1.0);
    }

    #[test]
    fn reduced_motion_only_clears() {
        let mut field = BoltField::new(BoltGenerator::new(6));
        let mut canvas = RecordingCanvas::new();
        let log = canvas.log();
        let config = EffectConfig {
            frequency: 1000.0,
            motion: MotionPreference::Reduced,
            ..EffectConfig::bolts()
        };
        for _ in 0..20 {
            field.render_frame(&mut canvas, &surface(), &config, Duration::from_millis(16));
        }
        assert!(field.live().is_empty());
        assert!(strokes(&log).is_empty());
    }

    #[test]
    fn discard_drops_everything() {
        let mut field = BoltField::new(BoltGenerator::new(7));
        field.insert(bolt(400, 0.0));
        field.insert(bolt(500, 0.0));
        assert_eq!(field.discard(), 2);
        assert!(field.live().is_empty());
    }
}
