use std::time::{Duration, Instant};

use crate::bolts::{Bolt, BoltField, BoltGenerator, Canvas};
use crate::error::EffectError;
use crate::gpu::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};
use crate::gpu::{DrawOutcome, FrameUniforms, GraphicsBackend, ShaderProgram};
use crate::runtime::{LoopResources, RenderLoopHandle};
use crate::surface::{SurfaceManager, SurfaceState, ViewportMetrics};
use crate::types::{EffectConfig, EffectKind};

/// What a call to [`EffectInstance::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was drawn.
    Drawn,
    /// The canvas path is inactive and only cleared its surface.
    Cleared,
    /// The backend could not present; dimensions are recomputed next tick.
    Skipped,
    /// No loop is running: inactive shader path, failed activation or disposed.
    Stopped,
}

enum Target {
    Gpu(Box<dyn GraphicsBackend>),
    Canvas(Box<dyn Canvas>),
}

/// One independently running lightning background.
///
/// An instance owns its drawing target, its configuration and at most one
/// [`RenderLoopHandle`]. Instances share nothing, so any number can run side
/// by side.
///
/// The shader path tears its loop down while inactive and rebuilds it on
/// reactivation. The canvas path keeps its loop running while inactive so
/// the surface is cleared every frame instead of freezing on the last image.
pub struct EffectInstance {
    target: Target,
    config: EffectConfig,
    surface: SurfaceManager,
    handle: Option<RenderLoopHandle>,
    /// Consumed when the canvas loop is created.
    generator: Option<BoltGenerator>,
    /// Origin of shader time; set on the first shader tick and kept across reactivation.
    time_origin: Option<Instant>,
    last_error: Option<EffectError>,
    started: bool,
    disposed: bool,
}

impl EffectInstance {
    /// GPU noise-field effect drawing through `backend`.
    pub fn shader(
        config: EffectConfig,
        metrics: ViewportMetrics,
        backend: Box<dyn GraphicsBackend>,
    ) -> Self {
        Self::with_target(Target::Gpu(backend), config, metrics, None)
    }

    /// CPU bolt effect drawing onto `canvas` with a generator seeded from `seed`.
    pub fn bolts(
        config: EffectConfig,
        metrics: ViewportMetrics,
        canvas: Box<dyn Canvas>,
        seed: Option<u64>,
    ) -> Self {
        let generator = match seed {
            Some(seed) => BoltGenerator::new(seed),
            None => BoltGenerator::from_entropy(),
        };
        Self::with_target(Target::Canvas(canvas), config, metrics, Some(generator))
    }

    fn with_target(
        target: Target,
        config: EffectConfig,
        metrics: ViewportMetrics,
        generator: Option<BoltGenerator>,
    ) -> Self {
        Self {
            target,
            config,
            surface: SurfaceManager::new(metrics),
            handle: None,
            generator,
            time_origin: None,
            last_error: None,
            started: false,
            disposed: false,
        }
    }

    pub fn kind(&self) -> EffectKind {
        match self.target {
            Target::Gpu(_) => EffectKind::Shader,
            Target::Canvas(_) => EffectKind::Bolts,
        }
    }

    pub fn config(&self) -> &EffectConfig {
        &self.config
    }

    pub fn surface(&self) -> SurfaceState {
        self.surface.state()
    }

    /// Error that aborted the most recent activation, if any.
    pub fn last_error(&self) -> Option<&EffectError> {
        self.last_error.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(RenderLoopHandle::is_running)
    }

    /// Whether the host should schedule another tick.
    pub fn wants_frame(&self) -> bool {
        !self.disposed && self.is_running()
    }

    pub fn live_bolts(&self) -> &[Bolt] {
        self.handle
            .as_ref()
            .map(RenderLoopHandle::live_bolts)
            .unwrap_or(&[])
    }

    /// Starts the render loop.
    ///
    /// For the shader path this checks backend support and builds the GPU
    /// resource set; either failure is returned, recorded in
    /// [`Self::last_error`] and leaves the instance drawing nothing. An
    /// inactive shader instance starts its loop when it is activated.
    pub fn start(&mut self) -> Result<(), EffectError> {
        if self.disposed || self.handle.is_some() {
            return Ok(());
        }
        self.started = true;
        match self.target {
            Target::Gpu(_) if self.config.active => self.activate_shader(),
            Target::Gpu(_) => Ok(()),
            Target::Canvas(_) => {
                let generator = self
                    .generator
                    .take()
                    .unwrap_or_else(BoltGenerator::from_entropy);
                self.surface.invalidate();
                self.handle = Some(RenderLoopHandle::new(LoopResources::Bolts(
                    BoltField::new(generator),
                )));
                tracing::debug!(kind = %self.kind(), "render loop started");
                Ok(())
            }
        }
    }

    /// Switches the effect on or off.
    pub fn set_active(&mut self, active: bool) -> Result<(), EffectError> {
        if self.disposed || self.config.active == active {
            return Ok(());
        }
        self.config.active = active;
        tracing::debug!(kind = %self.kind(), active, "effect activity changed");
        match self.target {
            Target::Gpu(_) if active => {
                if self.started && self.handle.is_none() {
                    self.activate_shader()
                } else {
                    Ok(())
                }
            }
            Target::Gpu(_) => {
                self.teardown();
                Ok(())
            }
            Target::Canvas(_) => {
                if !active {
                    if let Some(LoopResources::Bolts(field)) =
                        self.handle.as_mut().map(|handle| &mut handle.resources)
                    {
                        let dropped = field.discard();
                        tracing::debug!(dropped, "discarded live bolts");
                    }
                }
                Ok(())
            }
        }
    }

    /// Replaces the configuration. Everything but `active` lands on the next
    /// tick without restarting the loop; a change of `active` is applied as
    /// by [`Self::set_active`].
    pub fn set_config(&mut self, config: EffectConfig) -> Result<(), EffectError> {
        let active = config.active;
        self.config = EffectConfig {
            active: self.config.active,
            ..config
        };
        self.set_active(active)
    }

    /// Records new viewport metrics. While a loop is running the backing store
    /// is resized right away; otherwise on the next tick.
    pub fn notify_resize(&mut self, metrics: ViewportMetrics) {
        self.surface.observe(metrics);
        let attached = self
            .handle
            .as_ref()
            .is_some_and(|handle| handle.listener.is_attached());
        if attached && !self.disposed {
            self.apply_resize();
        }
    }

    /// The graphics context was lost: drop the live resource set now and
    /// rebuild it on the next tick.
    pub fn notify_context_lost(&mut self) {
        let Target::Gpu(backend) = &mut self.target else {
            self.surface.invalidate();
            return;
        };
        if let Some(RenderLoopHandle {
            resources: LoopResources::Shader(slot),
            ..
        }) = self.handle.as_mut()
        {
            if let Some(program) = slot.take() {
                tracing::debug!("graphics context lost; releasing shader resources");
                program.release(backend.as_mut());
            }
        }
        self.surface.invalidate();
    }

    /// Runs one frame at `now`.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.disposed {
            return TickOutcome::Stopped;
        }
        let Some(frame) = self.handle.as_mut().and_then(|handle| handle.scheduler.begin(now))
        else {
            return TickOutcome::Stopped;
        };
        self.apply_resize();

        let outcome = match self.kind() {
            EffectKind::Shader => self.draw_shader(now),
            EffectKind::Bolts => self.draw_bolts(frame.elapsed),
        };

        if let Some(handle) = self.handle.as_mut() {
            let live = handle.live_bolts().len();
            handle.scheduler.finish(&frame, live);
        }
        outcome
    }

    /// Stops the loop and releases everything the instance owns. Safe to call
    /// more than once; also runs on drop.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.teardown();
        self.disposed = true;
        tracing::debug!(kind = %self.kind(), "effect disposed");
    }

    fn activate_shader(&mut self) -> Result<(), EffectError> {
        let Target::Gpu(backend) = &mut self.target else {
            return Ok(());
        };
        if let Err(err) = backend.check_support() {
            tracing::warn!("lightning shader disabled: {err}");
            self.last_error = Some(err.clone());
            return Err(err);
        }
        let program = match ShaderProgram::build(backend.as_mut(), VERTEX_SHADER, FRAGMENT_SHADER) {
            Ok(program) => program,
            Err(err) => {
                tracing::error!(
                    log = err.diagnostic_log().unwrap_or_default(),
                    "lightning shader activation failed: {err}"
                );
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };
        self.last_error = None;
        self.surface.invalidate();
        self.handle = Some(RenderLoopHandle::new(LoopResources::Shader(Some(program))));
        tracing::debug!(kind = %EffectKind::Shader, "render loop started");
        Ok(())
    }

    /// Cancels the loop, detaches the listener, then releases resources.
    fn teardown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match (handle.teardown(), &mut self.target) {
            (LoopResources::Shader(Some(program)), Target::Gpu(backend)) => {
                program.release(backend.as_mut());
            }
            (LoopResources::Bolts(mut field), _) => {
                field.discard();
            }
            _ => {}
        }
        tracing::debug!(kind = %self.kind(), "render loop stopped");
    }

    fn apply_resize(&mut self) {
        let Some(state) = self.surface.resize() else {
            return;
        };
        match &mut self.target {
            Target::Gpu(backend) => backend.configure_backing(state.physical),
            Target::Canvas(canvas) => {
                canvas.resize_backing(state.physical);
                canvas.set_scale(state.device_pixel_ratio as f32);
            }
        }
    }

    fn draw_shader(&mut self, now: Instant) -> TickOutcome {
        let (Target::Gpu(backend), Some(handle)) = (&mut self.target, self.handle.as_mut()) else {
            return TickOutcome::Stopped;
        };
        let LoopResources::Shader(slot) = &mut handle.resources else {
            return TickOutcome::Stopped;
        };

        if slot.is_none() {
            match ShaderProgram::build(backend.as_mut(), VERTEX_SHADER, FRAGMENT_SHADER) {
                Ok(program) => {
                    tracing::debug!("re-acquired shader resources after context loss");
                    *slot = Some(program);
                }
                Err(err) => {
                    tracing::error!(
                        log = err.diagnostic_log().unwrap_or_default(),
                        "lightning shader re-acquire failed: {err}"
                    );
                    self.last_error = Some(err);
                    self.teardown();
                    return TickOutcome::Stopped;
                }
            }
        }
        let Some(program) = slot.as_ref() else {
            return TickOutcome::Stopped;
        };

        let origin = *self.time_origin.get_or_insert(now);
        let time = self
            .config
            .shader_time(now.saturating_duration_since(origin).as_secs_f32());
        let physical = self.surface.state().physical;
        let frame = FrameUniforms::new(&self.config, time, physical);
        program.set_frame_uniforms(backend.as_mut(), &frame);
        match program.draw(backend.as_mut(), physical) {
            DrawOutcome::Presented => TickOutcome::Drawn,
            DrawOutcome::Skipped => {
                self.surface.invalidate();
                TickOutcome::Skipped
            }
        }
    }

    fn draw_bolts(&mut self, elapsed: Duration) -> TickOutcome {
        let (Target::Canvas(canvas), Some(handle)) = (&mut self.target, self.handle.as_mut())
        else {
            return TickOutcome::Stopped;
        };
        if !self.config.active {
            canvas.clear();
            return TickOutcome::Cleared;
        }
        let LoopResources::Bolts(field) = &mut handle.resources else {
            return TickOutcome::Stopped;
        };
        let state = self.surface.state();
        field.render_frame(canvas.as_mut(), &state, &self.config, elapsed);
        TickOutcome::Drawn
    }
}

impl Drop for EffectInstance {
    fn drop(&mut self) {
        self.dispose();
    }
}
