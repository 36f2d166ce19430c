use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, debug, info};
use rand_distr::{Distribution, Normal};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use radio_reachability::common::{Scene, load_scene};
use radio_reachability::control::EngineConfig;
use radio_reachability::simulation::{
    ListenedInfo, ParticipantId, Position3D, ReachabilityEngine, SystemClock, TangentOverrides,
};

#[derive(Parser)]
#[command(name = "radio-reachability", version, about = "Evaluate who hears whom in a radio voice session")]
struct Cli {
    /// Trace every per-pair decision.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate every listener/speaker pair of a scene once and print what is heard.
    Evaluate {
        #[arg(long)]
        scene: PathBuf,
        /// Engine configuration (defaults to config.toml next to the scene).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Only evaluate this listener.
        #[arg(long)]
        listener: Option<u32>,
    },
    /// Run routing passes on reader threads while a writer moves everyone around.
    Soak {
        #[arg(long)]
        scene: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Simulation frames the writer advances through.
        #[arg(long, default_value_t = 1000)]
        ticks: u64,
        /// Number of reader threads.
        #[arg(long, default_value_t = 4)]
        readers: usize,
        /// Standard deviation of the position jitter in meters.
        #[arg(long, default_value_t = 2.0)]
        jitter: f32,
    },
}

fn load_config(explicit: Option<&Path>, scene_path: &Path) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return EngineConfig::load(path).with_context(|| format!("loading config {}", path.display()));
    }
    let default_path = EngineConfig::config_path_from_scene(scene_path);
    if default_path.exists() {
        EngineConfig::load(&default_path).with_context(|| format!("loading config {}", default_path.display()))
    } else {
        info!("No {} found, using default configuration", default_path.display());
        Ok(EngineConfig::default())
    }
}

fn load_inputs(scene_path: &Path, config_path: Option<&Path>) -> Result<(Scene, EngineConfig)> {
    let scene = load_scene(scene_path).with_context(|| format!("loading scene {}", scene_path.display()))?;
    let config = load_config(config_path, scene_path)?;
    Ok((scene, config))
}

fn describe(entry: &ListenedInfo) -> String {
    let mut line = format!(
        "{:?} over {:?} via {} (volume {:.2}, {:?})",
        entry.on, entry.over, entry.radio_id, entry.volume, entry.stereo_mode
    );
    if let Some(position) = entry.position_override {
        line.push_str(&format!(" at ({:.1}, {:.1}, {:.1})", position.x, position.y, position.z));
    }
    if let Some(relay) = &entry.relay {
        line.push_str(&format!(
            " relayed by antenna {} (loss {:.2})",
            relay.antenna().antenna_id,
            relay.connection_loss()
        ));
    }
    line
}

fn evaluate(scene_path: &Path, config_path: Option<&Path>, listener: Option<u32>) -> Result<()> {
    let (scene, config) = load_inputs(scene_path, config_path)?;
    let clock = SystemClock::new();
    let runtime = scene.build_runtime(&clock);
    let engine = ReachabilityEngine::new(&config, &runtime.frequencies, &runtime.relays, &runtime.roster, &clock);

    let listeners = match listener {
        Some(id) => {
            let id = ParticipantId(id);
            if runtime.roster.get(id).is_none() {
                bail!("listener {} is not part of the scene", id);
            }
            vec![id]
        }
        None => runtime.roster.ids(),
    };

    for id in listeners {
        let routes = engine.route_for_listener(id, TangentOverrides::NONE);
        println!("listener {}: hears {} participant(s)", id, routes.len());
        for route in routes {
            for entry in &route.heard {
                println!("  {} <- {}", route.speaker, describe(entry));
            }
        }
    }
    Ok(())
}

fn soak(scene_path: &Path, config_path: Option<&Path>, ticks: u64, readers: usize, jitter: f32) -> Result<()> {
    let (scene, config) = load_inputs(scene_path, config_path)?;
    let normal = Normal::new(0.0_f32, jitter).context("invalid jitter")?;
    let clock = SystemClock::new();
    let runtime = scene.build_runtime(&clock);
    let engine = ReachabilityEngine::new(&config, &runtime.frequencies, &runtime.relays, &runtime.roster, &clock);
    let listeners = runtime.roster.ids();

    let done = AtomicBool::new(false);
    let passes = AtomicU64::new(0);
    let entries = AtomicU64::new(0);
    let started = Instant::now();

    info!("Soak: {} ticks, {} readers, {} participants", ticks, readers, listeners.len());

    thread::scope(|s| {
        for _ in 0..readers {
            s.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    for &id in &listeners {
                        let heard: usize = engine
                            .route_for_listener(id, TangentOverrides::NONE)
                            .iter()
                            .map(|route| route.heard.len())
                            .sum();
                        entries.fetch_add(heard as u64, Ordering::Relaxed);
                    }
                    passes.fetch_add(1, Ordering::Relaxed);
                }
            });
        }

        let mut rng = rand::thread_rng();
        for tick in 0..ticks {
            let frame = clock.advance_frame();
            for spec in &scene.participants {
                let Some(participant) = runtime.roster.get(spec.id) else {
                    continue;
                };
                let offset = Position3D::new(normal.sample(&mut rng), normal.sample(&mut rng), 0.0);
                participant.update_from_packet(&spec.packet_at(spec.packet.position + offset), &clock);
            }
            if tick % 100 == 0 {
                debug!("frame {}: {} passes so far", frame, passes.load(Ordering::Relaxed));
            }
        }
        done.store(true, Ordering::Release);
    });

    let elapsed = started.elapsed();
    println!(
        "{} ticks in {:.2?}: {} routing passes, {} entries heard",
        ticks,
        elapsed,
        passes.load(Ordering::Relaxed),
        entries.load(Ordering::Relaxed)
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(
            Some("radio_reachability"),
            if cli.verbose { LevelFilter::Trace } else { LevelFilter::Debug },
        )
        .parse_default_env()
        .init();

    info!("Starting up");

    match cli.command {
        Command::Evaluate { scene, config, listener } => evaluate(&scene, config.as_deref(), listener),
        Command::Soak {
            scene,
            config,
            ticks,
            readers,
            jitter,
        } => soak(&scene, config.as_deref(), ticks, readers, jitter),
    }
}
