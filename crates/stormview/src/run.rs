use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use lightning::{EffectInstance, EffectKind, TickOutcome, ViewportMetrics, WgpuBackend};
use tracing_subscriber::EnvFilter;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::bootstrap::{parse_surface_size, resolve_effect};
use crate::cli::{Cli, Command, EffectArgs, RunArgs};
use crate::snapshot;

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing();

    match cli.command {
        Command::Run(args) => run_window(args),
        Command::Snapshot(args) => snapshot::snapshot(args),
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Opens a window and drives the shader effect from winit redraws.
///
/// Every `RedrawRequested` runs one tick; the next redraw is requested only
/// while the effect wants frames, so an inactive effect leaves the loop idle.
///
/// Keys: `Space` toggles the effect, `R` reloads the config file, `Esc` quits.
/// If the shader cannot start the window still opens blank; toggling `Space`
/// off and on again retries the activation.
fn run_window(args: RunArgs) -> Result<()> {
    let resolved = resolve_effect(&args.effect, EffectKind::Shader)?;
    let (width, height) = parse_surface_size(&args.window)?;

    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window = WindowBuilder::new()
        .with_title("Stormview")
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let backend = WgpuBackend::connect(window.clone(), window.inner_size());
    let mut effect = EffectInstance::shader(resolved.config, metrics_of(&window), Box::new(backend));
    start_effect(&mut effect);
    tracing::info!(
        width,
        height,
        scale = window.scale_factor(),
        active = effect.config().active,
        "lightning window ready"
    );
    window.request_redraw();

    let effect_args = args.effect;
    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                        effect.notify_resize(metrics_of(&window));
                        window.request_redraw();
                    }
                    WindowEvent::KeyboardInput { event, .. }
                        if event.state == ElementState::Pressed && !event.repeat =>
                    {
                        match event.logical_key.as_ref() {
                            Key::Named(NamedKey::Escape) => elwt.exit(),
                            Key::Named(NamedKey::Space) => {
                                let active = !effect.config().active;
                                if let Err(err) = effect.set_active(active) {
                                    tracing::error!("failed to toggle effect: {err}");
                                }
                            }
                            Key::Character("r") | Key::Character("R") => {
                                reload(&mut effect, &effect_args);
                            }
                            _ => {}
                        }
                        window.request_redraw();
                    }
                    WindowEvent::RedrawRequested => match effect.tick(Instant::now()) {
                        TickOutcome::Drawn | TickOutcome::Cleared | TickOutcome::Skipped => {
                            if effect.wants_frame() {
                                window.request_redraw();
                            }
                        }
                        TickOutcome::Stopped => {
                            tracing::trace!("effect idle; no redraw scheduled");
                        }
                    },
                    _ => {}
                },
                Event::LoopExiting => {
                    effect.dispose();
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

/// Starts the effect. A backend that cannot run the shader is not fatal: the
/// error is logged and the window stays open with nothing drawn.
fn start_effect(effect: &mut EffectInstance) {
    if let Err(err) = effect.start() {
        tracing::error!("lightning shader unavailable; window stays blank: {err}");
    }
}

fn metrics_of(window: &Window) -> ViewportMetrics {
    ViewportMetrics::from_physical(window.inner_size(), window.scale_factor())
}

fn reload(effect: &mut EffectInstance, args: &EffectArgs) {
    match resolve_effect(args, EffectKind::Shader) {
        Ok(resolved) => {
            if let Err(err) = effect.set_config(resolved.config) {
                tracing::error!("failed to apply reloaded config: {err}");
            } else {
                tracing::info!("effect config reloaded");
            }
        }
        Err(err) => tracing::warn!("keeping current config: {err:#}"),
    }
}
