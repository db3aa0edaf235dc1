//! Headless rendering into a PNG.
//!
//! The bolt path runs a real [`EffectInstance`] over a tiny-skia canvas with
//! simulated frame times. The shader path has no GPU here, so the last frame
//! is evaluated with the CPU reference of the fragment program.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::RgbaImage;
use lightning::bolts::{Canvas, PixmapCanvas, Point, StrokeStyle};
use lightning::gpu::{reference, FrameUniforms};
use lightning::{EffectInstance, EffectKind, Rgba, SurfaceState, ViewportMetrics};
use winit::dpi::PhysicalSize;

use crate::bootstrap::{parse_surface_size, resolve_effect, ResolvedEffect};
use crate::cli::SnapshotArgs;

pub fn snapshot(args: SnapshotArgs) -> Result<()> {
    let (width, height) = parse_surface_size(&args.surface)?;
    if !(args.scale.is_finite() && args.scale > 0.0) {
        anyhow::bail!("scale must be a positive number");
    }
    let kind = EffectKind::from(args.mode);
    let resolved = resolve_effect(&args.effect, kind)?;
    let metrics = ViewportMetrics::new(width as f64, height as f64, args.scale);
    let physical = SurfaceState::from_metrics(metrics).physical;
    let frame_time = Duration::from_millis(args.frame_ms);

    let pixels = match kind {
        EffectKind::Bolts => render_bolts(resolved, metrics, args.frames, frame_time)?,
        EffectKind::Shader => render_shader(&resolved, physical, args.frames, frame_time),
    };

    let image = RgbaImage::from_raw(physical.width, physical.height, pixels)
        .context("rendered pixel buffer does not match the surface size")?;
    image
        .save(&args.out)
        .with_context(|| format!("failed to write snapshot {}", args.out.display()))?;
    tracing::info!(
        mode = %kind,
        frames = args.frames,
        width = physical.width,
        height = physical.height,
        "snapshot written to {}",
        args.out.display()
    );
    Ok(())
}

fn render_bolts(
    resolved: ResolvedEffect,
    metrics: ViewportMetrics,
    frames: u32,
    frame_time: Duration,
) -> Result<Vec<u8>> {
    let physical = SurfaceState::from_metrics(metrics).physical;
    let canvas = PixmapCanvas::new(physical).context("failed to allocate snapshot canvas")?;
    let canvas = SharedCanvas(Rc::new(RefCell::new(canvas)));

    let mut effect = EffectInstance::bolts(
        resolved.config,
        metrics,
        Box::new(canvas.clone()),
        resolved.seed,
    );
    effect.start().context("failed to start bolt effect")?;

    let origin = Instant::now();
    let mut peak = 0usize;
    for frame in 0..frames {
        effect.tick(origin + frame_time * frame);
        peak = peak.max(effect.live_bolts().len());
    }
    tracing::debug!(peak_live_bolts = peak, "bolt simulation finished");
    effect.dispose();

    let pixels = canvas.0.borrow().to_rgba8();
    Ok(pixels)
}

fn render_shader(
    resolved: &ResolvedEffect,
    physical: PhysicalSize<u32>,
    frames: u32,
    frame_time: Duration,
) -> Vec<u8> {
    let time = resolved
        .config
        .shader_time((frame_time * frames).as_secs_f32());
    let uniforms = FrameUniforms::new(&resolved.config, time, physical);
    reference::render_field(&uniforms, physical.width, physical.height)
}

/// Lets the snapshot keep reading pixels from a canvas the effect owns.
#[derive(Clone)]
struct SharedCanvas(Rc<RefCell<PixmapCanvas>>);

impl Canvas for SharedCanvas {
    fn resize_backing(&mut self, size: PhysicalSize<u32>) {
        self.0.borrow_mut().resize_backing(size);
    }

    fn set_scale(&mut self, scale: f32) {
        self.0.borrow_mut().set_scale(scale);
    }

    fn clear(&mut self) {
        self.0.borrow_mut().clear();
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        self.0.borrow_mut().fill_rect(x, y, width, height, color);
    }

    fn stroke(&mut self, points: &[Point], style: &StrokeStyle) {
        self.0.borrow_mut().stroke(points, style);
    }
}
