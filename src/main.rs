//! Headless terrain streaming driver
//!
//! Flies a camera over the generated terrain, streams chunks around it and
//! logs engine diagnostics. Set `RUST_LOG=terrastream=debug` for per-chunk events.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec3;

use terrastream::{
    DEFAULT_SEED, DeviceClass, FlyCamera, TerrainEngine, TerrainHeightSource, TerrainSettings, WorldManifest,
    load_manifest, save_manifest,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Device {
    Desktop,
    Mobile,
}

impl From<Device> for DeviceClass {
    fn from(device: Device) -> Self {
        match device {
            Device::Desktop => DeviceClass::Desktop,
            Device::Mobile => DeviceClass::Mobile,
        }
    }
}

/// Procedural terrain streaming engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// World seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u32,

    /// Pick a random seed instead of `--seed`
    #[arg(long, default_value_t = false)]
    random_seed: bool,

    /// Hardware preset
    #[arg(long, value_enum, default_value_t = Device::Desktop)]
    device: Device,

    /// Synthesis worker threads (0 = synthesize on the main thread)
    #[arg(long)]
    workers: Option<usize>,

    /// Load seed and settings from a world manifest
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Write the seed and settings to a world manifest before running
    #[arg(long)]
    save_manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fly over the terrain and stream chunks
    Fly {
        /// Number of frames to simulate
        #[arg(long, default_value_t = 600)]
        frames: u32,

        /// Flight speed in world units per second
        #[arg(long, default_value_t = 40.0)]
        speed: f32,

        /// Simulated frame time in seconds
        #[arg(long, default_value_t = 1.0 / 60.0)]
        dt: f64,

        /// Yaw change per second, in radians
        #[arg(long, default_value_t = 0.05)]
        turn_rate: f32,
    },
    /// Print height, slope, color and biome at a point
    Sample {
        #[arg(long, allow_hyphen_values = true)]
        x: f64,
        #[arg(long, allow_hyphen_values = true)]
        z: f64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let (seed, mut settings) = match &args.manifest {
        Some(path) => {
            let manifest = load_manifest(path)?;
            tracing::info!(path = %path.display(), seed = manifest.seed, "loaded world manifest");
            (manifest.seed, manifest.settings)
        }
        None => (
            if args.random_seed {
                rand::random::<u32>()
            } else {
                args.seed
            },
            TerrainSettings::for_device(args.device.into()),
        ),
    };
    if let Some(workers) = args.workers {
        settings.streaming.worker_count = Some(workers);
    }

    if let Some(path) = &args.save_manifest {
        save_manifest(path, &WorldManifest::new(seed, settings.clone()))?;
    }

    let mut engine = TerrainEngine::new(seed, settings)?;

    match args.command.unwrap_or(Command::Fly {
        frames: 600,
        speed: 40.0,
        dt: 1.0 / 60.0,
        turn_rate: 0.05,
    }) {
        Command::Sample { x, z } => {
            let height = engine.height(x, z);
            let color = engine.color(height, x, z);
            println!("seed    {}", seed);
            println!("height  {:.3}", height);
            println!("slope   {:.4}", engine.slope(x, z));
            println!("color   [{:.3}, {:.3}, {:.3}]", color[0], color[1], color[2]);
            let biome = engine.biome(x, z);
            let overlay = biome.overlay_color();
            println!(
                "biome   {:?} (overlay [{:.2}, {:.2}, {:.2}])",
                biome, overlay[0], overlay[1], overlay[2]
            );
        }
        Command::Fly {
            frames,
            speed,
            dt,
            turn_rate,
        } => fly(&mut engine, frames, speed, dt, turn_rate),
    }

    Ok(())
}

fn fly(engine: &mut TerrainEngine, frames: u32, speed: f32, dt: f64, turn_rate: f32) {
    let mut camera = FlyCamera::new(Vec3::ZERO, 0.0, -0.25);
    camera.position.y = engine.height(0.0, 0.0).max(engine.water_level()) as f32 + 60.0;

    let started = Instant::now();
    for frame in 0..frames {
        let report = engine.frame(&camera, &camera, dt);
        if report.failed > 0 {
            tracing::debug!(frame, failed = report.failed, "chunks failed to synthesize");
        }

        if frame % 120 == 0 {
            let d = engine.diagnostics();
            tracing::info!(
                frame,
                x = camera.position.x,
                z = camera.position.z,
                resident = d.resident,
                pending = d.pending,
                capacity = d.capacity,
                visible = d.visible,
                pool_hit_rate = d.pool_hit_rate,
                idle = d.idle_buffers,
                synthesis_ms = d.synthesis.average_ms,
                "streaming"
            );
        }

        camera.turn(turn_rate * dt as f32);
        camera.advance(dt as f32, speed);
        camera.follow_terrain(&*engine, 60.0);
    }

    let d = engine.diagnostics();
    tracing::info!(
        frames,
        wall_ms = started.elapsed().as_secs_f64() * 1000.0,
        resident = d.resident,
        pool_hits = d.pool_hits,
        pool_misses = d.pool_misses,
        synthesized = d.synthesis.total_chunks,
        "flight finished"
    );
}
