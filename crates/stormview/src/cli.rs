use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use lightning::{EffectKind, Rgba};

#[derive(Parser, Debug)]
#[command(
    name = "stormview",
    author,
    version,
    about = "Procedural lightning background renderer"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a window and render the GPU lightning field until it is closed.
    Run(RunArgs),
    /// Render a number of frames headlessly and write the last one as a PNG.
    Snapshot(SnapshotArgs),
}

/// Effect settings shared by every command. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct EffectArgs {
    /// Effect configuration TOML file.
    #[arg(long, value_name = "PATH", env = "STORMVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base hue in degrees, `[0, 360)`.
    #[arg(long)]
    pub hue: Option<f32>,

    /// Animation speed multiplier.
    #[arg(long)]
    pub speed: Option<f32>,

    /// Brightness and spawn-rate multiplier, `[0, 1]`.
    #[arg(long)]
    pub intensity: Option<f32>,

    /// Spatial frequency of the noise field.
    #[arg(long)]
    pub size: Option<f32>,

    /// Horizontal shift of the noise domain.
    #[arg(long, allow_hyphen_values = true)]
    pub x_offset: Option<f32>,

    /// Approximate bolts per second at full intensity.
    #[arg(long)]
    pub frequency: Option<f32>,

    /// Bolt glow colour (e.g. `#a8fff7`).
    #[arg(long, value_name = "HEX", value_parser = parse_color)]
    pub color: Option<Rgba>,

    /// Honour a reduced-motion preference: no bolts, frozen shader time.
    #[arg(long)]
    pub reduced_motion: bool,

    /// Seed for the bolt generator.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "1280x720")]
    pub window: String,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub effect: EffectArgs,

    /// Which rendering path to run.
    #[arg(long, value_enum, default_value_t = Mode::Bolts)]
    pub mode: Mode,

    /// Number of frames to simulate before capturing.
    #[arg(long, default_value_t = 60)]
    pub frames: u32,

    /// Simulated time between frames.
    #[arg(long, value_name = "MILLISECONDS", default_value_t = 16)]
    pub frame_ms: u64,

    /// Logical surface size (e.g. `640x360`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "640x360")]
    pub surface: String,

    /// Device pixel ratio; the PNG is `surface × scale` pixels.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f64,

    /// Output PNG path.
    #[arg(long, value_name = "PATH")]
    pub out: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Bolts,
    Shader,
}

impl From<Mode> for EffectKind {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Bolts => EffectKind::Bolts,
            Mode::Shader => EffectKind::Shader,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_color(value: &str) -> Result<Rgba, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("colour must not be empty".to_string());
    }
    Rgba::from_hex(trimmed).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_flags_parse() {
        let cli = Cli::try_parse_from([
            "stormview",
            "snapshot",
            "--mode",
            "shader",
            "--frames",
            "3",
            "--surface",
            "320x200",
            "--scale",
            "2",
            "--hue",
            "120",
            "--size",
            "1.5",
            "--x-offset",
            "-0.5",
            "--out",
            "frame.png",
        ])
        .expect("parse");
        let Command::Snapshot(args) = cli.command else {
            panic!("expected snapshot command");
        };
        assert_eq!(args.mode, Mode::Shader);
        assert_eq!(args.frames, 3);
        assert_eq!(args.surface, "320x200");
        assert_eq!(args.scale, 2.0);
        assert_eq!(args.effect.hue, Some(120.0));
        assert_eq!(args.effect.size, Some(1.5));
        assert_eq!(args.effect.x_offset, Some(-0.5));
    }

    #[test]
    fn colour_flag_is_validated() {
        assert_eq!(parse_color("#fff"), Ok(Rgba::WHITE));
        assert!(parse_color("").is_err());
        assert!(parse_color("#zz0000").is_err());
    }
}
