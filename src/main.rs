// Planetarium command line driver
// Runs the engine headless against a catalog file and prints renderer snapshots

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use planetarium::{
    load_catalog, AppState, EngineConfig, RenderHandle, RenderSink, SystemCoordinator, Vector3,
};

#[derive(Parser)]
#[command(name = "planetarium")]
#[command(about = "Keplerian orbit propagation and visual-state engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step the system a fixed number of frames and print the final snapshot
    Simulate {
        #[arg(short, long, default_value = "data/celestial-data.json")]
        catalog: PathBuf,
        #[arg(short, long, default_value = "600")]
        frames: u32,
        /// Wall-clock seconds per frame
        #[arg(short, long, default_value = "0.016")]
        delta: f64,
        #[arg(long)]
        time_scale: Option<f64>,
        #[arg(long)]
        trail_length: Option<u32>,
        /// Camera position as "x,y,z" in display units
        #[arg(long, default_value = "0,0,100")]
        camera: String,
        #[arg(long)]
        highlight: Option<String>,
        #[arg(long, default_value = "false")]
        pretty: bool,
    },

    /// Print the validated catalog
    Inspect {
        #[arg(short, long, default_value = "data/celestial-data.json")]
        catalog: PathBuf,
    },

    /// Run the real-time frame loop for a while and print the snapshot
    Run {
        #[arg(short, long, default_value = "data/celestial-data.json")]
        catalog: PathBuf,
        #[arg(short, long, default_value = "2.0")]
        seconds: f64,
        #[arg(long)]
        time_scale: Option<f64>,
        #[arg(long, default_value = "0,0,100")]
        camera: String,
    },
}

fn parse_vector(raw: &str) -> Result<Vector3> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("invalid vector {raw:?}"))?;
    if parts.len() != 3 {
        bail!("expected x,y,z, got {raw:?}");
    }
    Ok(Vector3::new(parts[0], parts[1], parts[2]))
}

fn build_system(
    catalog: &Path,
    time_scale: Option<f64>,
    camera: &str,
) -> Result<SystemCoordinator> {
    let config = EngineConfig::from_env().context("reading configuration")?;
    let descriptors = load_catalog(catalog)
        .with_context(|| format!("loading catalog {}", catalog.display()))?;
    let mut system = SystemCoordinator::new(descriptors, &config)?;
    if let Some(scale) = time_scale {
        system.set_time_scale(scale);
    }
    system.set_camera_position(parse_vector(camera)?);
    Ok(system)
}

struct LogSink;

impl RenderSink for LogSink {
    fn release(&mut self, handle: RenderHandle, name: &str) {
        tracing::debug!("Released render handle {} ({})", handle.0, name);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            catalog,
            frames,
            delta,
            time_scale,
            trail_length,
            camera,
            highlight,
            pretty,
        } => {
            let mut system = build_system(&catalog, time_scale, &camera)?;
            if let Some(length) = trail_length {
                system.set_trail_length(length);
            }
            if let Some(name) = highlight {
                system.set_body_highlight(&name, true)?;
            }

            let mut anomalies = 0;
            for _ in 0..frames {
                anomalies += system.advance(delta).anomalies.len();
            }
            if anomalies > 0 {
                tracing::warn!("{} non-finite body updates during the run", anomalies);
            }

            let snapshot = system.to_snapshot();
            let json = if pretty {
                serde_json::to_string_pretty(&snapshot)?
            } else {
                serde_json::to_string(&snapshot)?
            };
            println!("{json}");
            system.teardown(&mut LogSink);
        }

        Commands::Inspect { catalog } => {
            let descriptors = load_catalog(&catalog)
                .with_context(|| format!("loading catalog {}", catalog.display()))?;
            for d in &descriptors {
                println!("== {}", d.name);
                println!("{}", d.info());
                match &d.orbital_elements {
                    Some(el) => println!(
                        "Orbit: a={} e={} i={}° period={}",
                        el.semi_major_axis, el.eccentricity, el.inclination, el.orbital_period
                    ),
                    None => println!("Orbit: none"),
                }
                println!();
            }
        }

        Commands::Run {
            catalog,
            seconds,
            time_scale,
            camera,
        } => {
            if !seconds.is_finite() {
                bail!("--seconds must be finite, got {seconds}");
            }
            let system = build_system(&catalog, time_scale, &camera)?;
            let app = AppState::new(system);
            app.start();
            thread::sleep(Duration::from_secs_f64(seconds.max(0.0)));
            app.stop();
            println!("{}", serde_json::to_string_pretty(&app.snapshot())?);
            app.teardown(&mut LogSink);
        }
    }

    Ok(())
}
