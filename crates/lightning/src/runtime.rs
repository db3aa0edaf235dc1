//! Per-instance render loop state.
//!
//! The loop is cooperative: the host calls [`crate::EffectInstance::tick`]
//! once per display refresh (for winit, on `RedrawRequested`) and asks
//! [`crate::EffectInstance::wants_frame`] whether to schedule another. Nothing
//! here blocks or spawns threads.

use std::time::{Duration, Instant};

use crate::bolts::{Bolt, BoltField};
use crate::gpu::ShaderProgram;

const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// Timing of one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTick {
    pub now: Instant,
    /// Time since the previous tick of this loop; zero on the first.
    pub elapsed: Duration,
    pub frame_index: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct FrameStats {
    window_start: Option<Instant>,
    frames: u32,
}

impl FrameStats {
    /// Counts a frame; returns the rate once per [`STATS_INTERVAL`].
    fn record(&mut self, now: Instant) -> Option<f64> {
        let start = *self.window_start.get_or_insert(now);
        self.frames = self.frames.saturating_add(1);
        let window = now.saturating_duration_since(start);
        if window < STATS_INTERVAL {
            return None;
        }
        let fps = self.frames as f64 / window.as_secs_f64();
        self.window_start = Some(now);
        self.frames = 0;
        Some(fps)
    }
}

/// Computes per-frame elapsed time and carries the cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    last_timestamp: Option<Instant>,
    cancelled: bool,
    frame_count: u64,
    stats: FrameStats,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a frame at `now`. Returns `None` once cancelled so a tick that
    /// was already queued does nothing.
    pub fn begin(&mut self, now: Instant) -> Option<FrameTick> {
        if self.cancelled {
            return None;
        }
        let elapsed = self
            .last_timestamp
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_timestamp = Some(now);
        let tick = FrameTick {
            now,
            elapsed,
            frame_index: self.frame_count,
        };
        self.frame_count = self.frame_count.saturating_add(1);
        Some(tick)
    }

    /// Closes a frame and logs throughput once per second.
    pub fn finish(&mut self, tick: &FrameTick, live_bolts: usize) {
        if let Some(fps) = self.stats.record(tick.now) {
            tracing::debug!(
                fps = format_args!("{fps:.1}"),
                frames = self.frame_count,
                live_bolts,
                "frame stats"
            );
        }
    }

    /// Stops the loop. Calling it again has no effect.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Registration for host resize notifications.
///
/// While attached, a notification is applied to the backing store
/// immediately instead of waiting for the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeListener {
    attached: bool,
}

impl ResizeListener {
    pub fn attach() -> Self {
        Self { attached: true }
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Resources a running loop owns.
#[derive(Debug)]
pub enum LoopResources {
    /// `None` between a context loss and the next successful re-acquire.
    Shader(Option<ShaderProgram>),
    Bolts(BoltField),
}

/// Everything one active effect loop owns.
#[derive(Debug)]
pub struct RenderLoopHandle {
    pub scheduler: FrameScheduler,
    pub listener: ResizeListener,
    pub resources: LoopResources,
}

impl RenderLoopHandle {
    pub fn new(resources: LoopResources) -> Self {
        Self {
            scheduler: FrameScheduler::new(),
            listener: ResizeListener::attach(),
            resources,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.scheduler.is_cancelled()
    }

    pub fn live_bolts(&self) -> &[Bolt] {
        match &self.resources {
            LoopResources::Bolts(field) => field.live(),
            LoopResources::Shader(_) => &[],
        }
    }

    /// Cancels the loop and detaches the listener, then hands the resources
    /// back so the owner can release them against its backend.
    pub fn teardown(mut self) -> LoopResources {
        self.scheduler.cancel();
        self.listener.detach();
        self.resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolts::BoltGenerator;

    #[test]
    fn first_tick_has_zero_elapsed() {
        let mut scheduler = FrameScheduler::new();
        let t0 = Instant::now();
        let tick = scheduler.begin(t0).expect("tick");
        assert_eq!(tick.elapsed, Duration::ZERO);
        assert_eq!(tick.frame_index, 0);

        let tick = scheduler.begin(t0 + Duration::from_millis(16)).expect("tick");
        assert_eq!(tick.elapsed, Duration::from_millis(16));
        assert_eq!(tick.frame_index, 1);
    }

    #[test]
    fn clock_going_backwards_yields_zero() {
        let mut scheduler = FrameScheduler::new();
        let t0 = Instant::now() + Duration::from_secs(1);
        scheduler.begin(t0);
        let tick = scheduler.begin(t0 - Duration::from_millis(5)).expect("tick");
        assert_eq!(tick.elapsed, Duration::ZERO);
    }

    #[test]
    fn cancellation_is_idempotent_and_final() {
        let mut scheduler = FrameScheduler::new();
        let t0 = Instant::now();
        scheduler.begin(t0);
        scheduler.cancel();
        scheduler.cancel();
        assert!(scheduler.is_cancelled());
        assert!(scheduler.begin(t0 + Duration::from_millis(16)).is_none());
        assert_eq!(scheduler.frame_count(), 1);
    }

    #[test]
    fn stats_report_once_per_second() {
        let mut stats = FrameStats::default();
        let t0 = Instant::now();
        let reports: Vec<_> = (0..=120)
            .filter_map(|i| stats.record(t0 + Duration::from_micros(i * 16_667)))
            .collect();
        assert_eq!(reports.len(), 2);
        assert!((reports[0] - 61.0).abs() < 1.5, "{reports:?}");
    }

    #[test]
    fn teardown_cancels_and_detaches() {
        let mut handle =
            RenderLoopHandle::new(LoopResources::Bolts(BoltField::new(BoltGenerator::new(1))));
        assert!(handle.listener.is_attached());
        handle.scheduler.begin(Instant::now());
        assert!(handle.is_running());
        let resources = handle.teardown();
        assert!(matches!(resources, LoopResources::Bolts(_)));
    }
}
