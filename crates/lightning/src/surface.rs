//! Logical versus physical backing-store dimensions.

use winit::dpi::{LogicalSize, PhysicalSize};

/// Viewport size as reported by the host, before any rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    pub logical: LogicalSize<f64>,
    pub scale_factor: f64,
}

impl ViewportMetrics {
    pub fn new(width: f64, height: f64, scale_factor: f64) -> Self {
        Self {
            logical: LogicalSize::new(width, height),
            scale_factor,
        }
    }

    /// Metrics for a window that reports its size in physical pixels, as winit does.
    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        let scale = device_pixel_ratio(scale_factor);
        Self {
            logical: size.to_logical(scale),
            scale_factor,
        }
    }
}

/// Dimensions of the backing store an effect draws into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceState {
    pub logical: LogicalSize<f64>,
    /// Always `>= 1`.
    pub device_pixel_ratio: f64,
    /// `round(logical * dpr)`, never smaller than one pixel per axis.
    pub physical: PhysicalSize<u32>,
}

impl SurfaceState {
    pub fn from_metrics(metrics: ViewportMetrics) -> Self {
        let dpr = device_pixel_ratio(metrics.scale_factor);
        let width = sanitize_extent(metrics.logical.width);
        let height = sanitize_extent(metrics.logical.height);
        Self {
            logical: LogicalSize::new(width, height),
            device_pixel_ratio: dpr,
            physical: PhysicalSize::new(physical_extent(width, dpr), physical_extent(height, dpr)),
        }
    }

    pub fn aspect(&self) -> f64 {
        self.physical.width as f64 / self.physical.height as f64
    }
}

fn device_pixel_ratio(scale_factor: f64) -> f64 {
    if scale_factor.is_finite() {
        scale_factor.max(1.0)
    } else {
        1.0
    }
}

fn sanitize_extent(extent: f64) -> f64 {
    if extent.is_finite() {
        extent.max(0.0)
    } else {
        0.0
    }
}

fn physical_extent(logical: f64, dpr: f64) -> u32 {
    (logical * dpr).round().clamp(1.0, u32::MAX as f64) as u32
}

/// Reconciles the latest viewport metrics with the current backing store.
///
/// The host reports new metrics through [`SurfaceManager::observe`] whenever
/// it likes; [`SurfaceManager::resize`] is cheap and may be called every
/// frame. The backing store only needs touching when `resize` returns a new
/// state.
#[derive(Debug, Clone)]
pub struct SurfaceManager {
    latest: ViewportMetrics,
    current: Option<SurfaceState>,
}

impl SurfaceManager {
    pub fn new(metrics: ViewportMetrics) -> Self {
        Self {
            latest: metrics,
            current: None,
        }
    }

    /// Records new viewport metrics without recomputing anything.
    pub fn observe(&mut self, metrics: ViewportMetrics) {
        self.latest = metrics;
    }

    /// Recomputes dimensions from the latest metrics.
    ///
    /// Returns the new state when the physical size or pixel ratio changed
    /// since the last applied state, `None` otherwise.
    pub fn resize(&mut self) -> Option<SurfaceState> {
        let next = SurfaceState::from_metrics(self.latest);
        let unchanged = self.current.is_some_and(|current| {
            current.physical == next.physical
                && current.device_pixel_ratio == next.device_pixel_ratio
                && current.logical == next.logical
        });
        if unchanged {
            return None;
        }
        tracing::debug!(
            width = next.physical.width,
            height = next.physical.height,
            dpr = next.device_pixel_ratio,
            "resized backing store"
        );
        self.current = Some(next);
        Some(next)
    }

    /// Forgets the applied state so the next [`Self::resize`] reports it again.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Last applied state, or what the latest metrics would produce if none
    /// has been applied yet.
    pub fn state(&self) -> SurfaceState {
        self.current
            .unwrap_or_else(|| SurfaceState::from_metrics(self.latest))
    }
}
