use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    str::FromStr,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cue_capture::DeviceSelector;
use cue_core::{Settings, Vector2};
use cue_logger::{CueLogger, JsonFileSink};
use cue_physics::Motion;
use log::{LevelFilter, Log};

use crate::commands::{
    capture::{capture, CaptureArgs},
    geometry::{contact, cushion, predict},
    logs::show_log,
    solve::solve,
};

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Solve a·x⁴ + b·x³ + c·x² + d·x + e = 0 and print the four roots.
    #[clap(name = "solve")]
    Solve {
        #[clap(allow_negative_numbers = true)]
        a: f64,
        #[clap(allow_negative_numbers = true)]
        b: f64,
        #[clap(allow_negative_numbers = true)]
        c: f64,
        #[clap(allow_negative_numbers = true)]
        d: f64,
        #[clap(allow_negative_numbers = true)]
        e: f64,
    },

    /// Estimate how an offset of the struck ball changes the contact.
    #[clap(name = "contact")]
    Contact {
        /// Center of the ball to be struck, as `x,y` in mm
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true)]
        ball: Vector2,
        /// Where the struck ball should go
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true)]
        target: Vector2,
        /// Where the incoming ball starts
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true)]
        start: Vector2,
        /// Offset of the struck ball, eg. the detection uncertainty
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true, default_value = "0,0")]
        offset: Vector2,
        /// Ball radius in mm. Defaults to the table settings.
        #[clap(long)]
        radius: Option<f64>,
    },

    /// Predict when two balls under constant acceleration first touch.
    #[clap(name = "predict")]
    Predict {
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true)]
        p1: Vector2,
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true, default_value = "0,0")]
        v1: Vector2,
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true, default_value = "0,0")]
        a1: Vector2,
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true)]
        p2: Vector2,
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true, default_value = "0,0")]
        v2: Vector2,
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true, default_value = "0,0")]
        a2: Vector2,
    },

    /// Find the first cushion a ball reaches.
    #[clap(name = "cushion")]
    Cushion {
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true)]
        position: Vector2,
        #[clap(long, value_parser = parse_point, allow_hyphen_values = true)]
        direction: Vector2,
        /// Initial speed in mm/s. The ball then rolls with friction.
        #[clap(long)]
        speed: Option<f64>,
    },

    /// Open a camera and read frames from it.
    #[clap(name = "capture")]
    Capture {
        /// `synthetic[:name]`, `gige:<mac>`, `usb3:<serial>` or `depth:<serial>`
        #[clap(long, value_parser = parse_device, default_value = "synthetic")]
        device: DeviceSelector,
        /// How long to capture, in seconds
        #[clap(long, default_value = "5.0")]
        duration: f64,
        /// Read from the background recording thread instead of pulling
        /// frames on demand
        #[clap(long, default_value = "false", action)]
        record: bool,
        #[clap(long, default_value = "640")]
        width: usize,
        #[clap(long, default_value = "480")]
        height: usize,
        /// Frame interval of the synthetic camera, in milliseconds
        #[clap(long, default_value = "33")]
        frame_interval_ms: u64,
    },

    /// Print the records of a log file.
    #[clap(name = "logs")]
    Logs {
        path: PathBuf,
        /// Only show records at this level or more severe
        #[clap(long, default_value = "trace")]
        level: log::Level,
    },
}

#[derive(Debug, Parser)]
#[command(name = "cue")]
pub struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(long, short = 'f', default_value = "cue-settings.json")]
    pub settings_file: PathBuf,

    #[clap(long, default_value = "info")]
    pub log_level: String,

    /// Write structured logs to this file. `auto` picks a timestamped file in
    /// the local data directory.
    #[clap(long)]
    pub log_file: Option<String>,
}

impl Cli {
    pub async fn start(self) -> ExitCode {
        let logger = match self.setup_logging() {
            Ok(logger) => logger,
            Err(err) => {
                eprintln!("Failed to set up logging: {:#}", err);
                return ExitCode::FAILURE;
            }
        };

        let result = self.run().await;
        logger.flush();
        match result {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Error: {:#}", err);
                ExitCode::FAILURE
            }
        }
    }

    async fn run(self) -> Result<()> {
        match self.command {
            Command::Solve { a, b, c, d, e } => solve(a, b, c, d, e),
            Command::Logs { path, level } => show_log(&path, level),
            Command::Contact {
                ball,
                target,
                start,
                offset,
                radius,
            } => {
                let radius = match radius {
                    Some(radius) => radius,
                    None => load_settings(&self.settings_file)?.table.ball_radius,
                };
                contact(ball, target, start, offset, radius)
            }
            Command::Predict {
                p1,
                v1,
                a1,
                p2,
                v2,
                a2,
            } => {
                let settings = load_settings(&self.settings_file)?;
                predict(
                    &Motion::new(p1, v1, a1),
                    &Motion::new(p2, v2, a2),
                    settings.table.ball_diameter(),
                    &settings.physics,
                )
            }
            Command::Cushion {
                position,
                direction,
                speed,
            } => {
                let settings = load_settings(&self.settings_file)?;
                cushion(
                    position,
                    direction,
                    speed,
                    &settings.table,
                    &settings.physics,
                )
            }
            Command::Capture {
                device,
                duration,
                record,
                width,
                height,
                frame_interval_ms,
            } => {
                let settings = load_settings(&self.settings_file)?;
                capture(
                    &settings.capture,
                    CaptureArgs {
                        device,
                        duration,
                        record,
                        width,
                        height,
                        frame_interval_ms,
                    },
                )
                .await
            }
        }
    }

    /// Sets up console output and, if requested, the structured log file.
    fn setup_logging(&self) -> Result<&'static CueLogger> {
        let level = LevelFilter::from_str(&self.log_level)
            .with_context(|| format!("Invalid log level: {}", self.log_level))?;
        let stdout_env = env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .format_module_path(false)
            .build();

        let mut logger = CueLogger::with_env_logger(stdout_env);
        if let Some(path) = self.log_file_path()? {
            println!("Saving logs to {}", path.display());
            logger = logger.with_sink(JsonFileSink::open(&path)?);
        }
        Ok(logger.install(level.max(LevelFilter::Debug)))
    }

    /// Returns the path of the log file, making sure its directory exists.
    fn log_file_path(&self) -> Result<Option<PathBuf>> {
        match self.log_file.as_deref() {
            None => Ok(None),
            Some("auto") => {
                let time = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
                let filename = format!("cue-{time}.jsonl");
                let dir = dirs::data_local_dir()
                    .map(|p| p.join("cue"))
                    .unwrap_or_else(|| PathBuf::from("logs"));
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
                Ok(Some(dir.join(filename)))
            }
            Some(path) => Ok(Some(PathBuf::from(path))),
        }
    }
}

fn load_settings(path: &Path) -> Result<Settings> {
    Settings::load_or_insert(path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))
}

/// Parses `x,y` into a vector.
fn parse_point(input: &str) -> Result<Vector2, String> {
    let (x, y) = input
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{input}`"))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|err| format!("invalid coordinate `{s}`: {err}"))
    };
    Ok(Vector2::new(parse(x)?, parse(y)?))
}

fn parse_device(input: &str) -> Result<DeviceSelector, String> {
    let (kind, id) = input.split_once(':').unwrap_or((input, ""));
    let id = id.trim().to_owned();
    match kind.to_lowercase().as_str() {
        "synthetic" if id.is_empty() => Ok(DeviceSelector::Synthetic {
            name: "synthetic".into(),
        }),
        "synthetic" => Ok(DeviceSelector::Synthetic { name: id }),
        _ if id.is_empty() => Err(format!("missing device id in `{input}`")),
        "gige" => Ok(DeviceSelector::GigE { mac: id }),
        "usb3" => Ok(DeviceSelector::Usb3 { serial: id }),
        "depth" => Ok(DeviceSelector::Depth { serial: id }),
        _ => Err(format!("unknown device kind `{kind}`")),
    }
}
