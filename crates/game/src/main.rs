//! Skyflight - headless procedural sky simulation.
//!
//! Flies a scripted path through the mist particle field and the volumetric
//! cloud clusters at a fixed step, logging what the sky is doing.

mod config;
mod flight;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use engine_core::Time;
use sky::{
    color_from_hex, BillboardInstance, ClusterField, DirectionalLight, ParticleField, ParticleInstance,
    PuffInstance,
};

use config::{default_config_path, SkyConfig};
use flight::FlightPath;

/// Command line: `skyflight [--config <path>] [--write-config]`.
#[derive(Debug, PartialEq)]
struct Args {
    config_path: PathBuf,
    write_config: bool,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut parsed = Self {
            config_path: default_config_path(),
            write_config: false,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config_path = PathBuf::from(path);
                }
                "--write-config" => parsed.write_config = true,
                other => bail!("unknown argument `{}`", other),
            }
        }
        Ok(parsed)
    }
}

/// Both sky systems plus the reusable instance buffers the renderer would read.
struct Simulation {
    config: SkyConfig,
    flight: FlightPath,
    particles: ParticleField,
    clusters: ClusterField,
    sunset_applied: bool,
    particle_instances: Vec<ParticleInstance>,
    puff_instances: Vec<PuffInstance>,
    billboard_instances: Vec<BillboardInstance>,
}

impl Simulation {
    fn new(config: SkyConfig) -> Result<Self> {
        let light = DirectionalLight {
            position: config.sun_position,
            ..Default::default()
        };
        let particles = ParticleField::new(config.particles.clone()).context("particle field")?;
        let mut clusters = ClusterField::new(config.clusters.clone(), Some(light)).context("cloud clusters")?;
        if let Some(path) = &config.detail_model {
            clusters.load_detail_model(path.clone());
        }
        let mut billboard_instances = Vec::new();
        clusters.write_billboard_instances(&mut billboard_instances);

        Ok(Self {
            flight: FlightPath::new(config.flight.clone()),
            config,
            particles,
            clusters,
            sunset_applied: false,
            particle_instances: Vec::new(),
            puff_instances: Vec::new(),
            billboard_instances,
        })
    }

    /// One frame: move the reference point, advance both fields, refill buffers.
    fn step(&mut self, dt: f32, elapsed: f32) {
        self.flight.advance(dt);
        let reference = self.flight.position();

        if !self.sunset_applied && self.config.sunset_at.is_some_and(|t| elapsed >= t) {
            self.clusters.set_atmosphere(
                Some(color_from_hex(self.config.sunset_sun_color)),
                Some(color_from_hex(self.config.sunset_ambient_color)),
            );
            self.sunset_applied = true;
            log::info!("Sunset at {:.1}s", elapsed);
        }

        self.particles.set_reference_point(reference);
        self.particles.update(dt);
        self.clusters.update(reference, dt);

        self.particles.write_instances(&mut self.particle_instances);
        self.clusters.write_puff_instances(&mut self.puff_instances);
    }

    fn log_stats(&self, elapsed: f32) {
        let stats = self.clusters.stats();
        let p = self.flight.position();
        log::info!(
            "t={:.1}s pos=({:.0}, {:.0}, {:.0}) mist {}/{} resting | clouds {} visible, {} fading, {} puffs, {} billboards",
            elapsed,
            p.x,
            p.y,
            p.z,
            self.particles.resting_count(),
            self.particle_instances.len(),
            stats.visible,
            stats.fading_out,
            self.puff_instances.len(),
            self.billboard_instances.len(),
        );
    }
}

fn run(config: SkyConfig) -> Result<()> {
    let frames = config.frames;
    let stats_interval = config.stats_interval.max(0.0);
    let mut time = Time::fixed_hz(config.tick_rate);
    let mut sim = Simulation::new(config)?;

    let mut next_stats = 0.0;
    let mut recycled = 0usize;
    for _ in 0..frames {
        time.update();
        let elapsed = time.elapsed_seconds();
        sim.step(time.delta_seconds(), elapsed);
        recycled += sim.clusters.stats().recycled;
        if elapsed >= next_stats {
            sim.log_stats(elapsed);
            next_stats = elapsed + stats_interval;
        }
    }

    log::info!(
        "Flew {} frames ({:.1}s simulated), {} clusters recycled",
        time.frame_count(),
        time.elapsed_seconds(),
        recycled
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse(std::env::args().skip(1))?;
    let config = SkyConfig::load(&args.config_path);
    if args.write_config {
        config.save(&args.config_path)?;
        log::info!("Wrote config to {}", args.config_path.display());
        return Ok(());
    }

    log::info!("Starting Skyflight");
    run(config)
}
