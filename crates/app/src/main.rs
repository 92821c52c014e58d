mod rig;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use avatar_mocap_core::{
    session, AppConfig, MocapError, PlaybackState, Result, SessionStore, Studio,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::rig::{SyntheticRig, TracingSink};

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.global.resolve()?;

    match cli.command {
        Commands::Record {
            duration,
            rate,
            output,
            name,
        } => run_record(config, duration, rate, output, name),
        Commands::Play { path, speed } => run_play(config, path, speed),
        Commands::Inspect { path } => run_inspect(&path),
        Commands::List { dir } => run_list(&config, dir),
    }
}

fn run_record(
    mut config: AppConfig,
    duration: f32,
    rate: Option<f32>,
    output: Option<PathBuf>,
    name: Option<String>,
) -> Result<()> {
    if let Some(rate) = rate {
        config.capture.rate = rate;
    }
    if let Some(output) = output {
        config.capture.output_dir = output.to_string_lossy().into_owned();
    }
    if let Some(name) = name {
        config.capture.base_name = name;
    }

    tracing::info!(duration, rate = config.capture.rate, "recording synthetic rig");

    let source = SyntheticRig {
        legs: config.rig.leg_rotation,
    };
    let mut studio = Studio::new(&config, source, TracingSink::default())?;

    // Simulated clock: the upstream loop runs at the configured tick rate.
    let step = 1.0 / f64::from(config.playback.tick_rate);
    let mut now = 0.0;
    studio.start_capture(now)?;
    while now < f64::from(duration) {
        now += step;
        studio.tick(now)?;
    }
    studio.stop_capture();

    let path = studio.save_capture()?;
    println!("{}", path.display());
    Ok(())
}

fn run_play(config: AppConfig, path: Option<PathBuf>, speed: Option<f32>) -> Result<()> {
    let source = SyntheticRig {
        legs: config.rig.leg_rotation,
    };
    let mut studio = Studio::new(&config, source, TracingSink::default())?;

    let path = match path {
        Some(path) => path,
        None => match studio.store().latest()? {
            Some(path) => {
                tracing::info!(path = %path.display(), "playing most recent session");
                path
            }
            None => {
                let dir = studio.store().dir().to_path_buf();
                return Err(MocapError::io(
                    dir,
                    io::Error::new(io::ErrorKind::NotFound, "no saved sessions"),
                ));
            }
        },
    };
    studio.load(&path)?;
    if let Some(speed) = speed {
        studio.set_speed(speed)?;
    }

    let tick = Duration::from_secs_f32(1.0 / config.playback.tick_rate);
    let clock = Instant::now();
    studio.play(0.0)?;

    while studio.playback().state() == PlaybackState::Playing {
        std::thread::sleep(tick);
        studio.tick(clock.elapsed().as_secs_f64())?;
    }

    let status = studio.playback_status();
    tracing::info!(
        frames = studio.sink().frames(),
        fields = studio.sink().fields(),
        wall_seconds = clock.elapsed().as_secs_f32(),
        "playback finished"
    );
    println!(
        "played {}/{} frames ({:.2}s at {:.1}x)",
        status.index, status.frame_count, status.total_duration, status.speed
    );
    Ok(())
}

fn run_inspect(path: &Path) -> Result<()> {
    let session = session::load(path)?;

    println!("captured:  {}", session.capture_date());
    println!("start:     {:.3}s", session.capture_start_time());
    println!("frames:    {}", session.frame_count());
    println!("duration:  {:.3}s", session.total_duration());
    match session.average_interval() {
        Some(interval) if interval > 0.0 => {
            println!("interval:  {:.4}s (~{:.1} fps)", interval, 1.0 / interval)
        }
        _ => println!("interval:  n/a"),
    }
    let legs = session
        .frames()
        .iter()
        .any(|frame| frame.pose.right_upper_leg_rotation.is_some());
    println!("legs:      {}", if legs { "yes" } else { "no" });
    Ok(())
}

fn run_list(config: &AppConfig, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| PathBuf::from(&config.capture.output_dir));
    let store = SessionStore::new(dir, config.capture.base_name.as_str());

    let sessions = store.list()?;
    if sessions.is_empty() {
        tracing::info!(dir = %store.dir().display(), "no saved sessions");
    }
    for path in sessions {
        println!("{}", path.display());
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Avatar motion capture recorder and player", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Capture and replay the four leg rotations.
    #[arg(long, global = true)]
    leg_rotation: bool,
}

impl GlobalArgs {
    fn resolve(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if self.leg_rotation {
            config.rig.leg_rotation = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a synthetic rig using simulated time and save the session.
    Record {
        /// Length of the recording in seconds.
        #[arg(short, long, default_value_t = 3.0)]
        duration: f32,
        /// Capture rate in frames per second.
        #[arg(short, long)]
        rate: Option<f32>,
        /// Directory the session is written to.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Base name of the saved file.
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Replay a saved session in real time. Defaults to the newest session
    /// in the capture directory.
    Play {
        path: Option<PathBuf>,
        /// Playback speed factor.
        #[arg(short, long)]
        speed: Option<f32>,
    },
    /// Print a summary of a saved session.
    Inspect { path: PathBuf },
    /// List saved sessions.
    List {
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}
