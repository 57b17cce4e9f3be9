//! rfs-node — run a swarm of agents against simulated hardware.
//!
//! Spawns `--drones` agents on one in-process coordination bus, plants a
//! simulated emitter, and lets the swarm find it: the agents partition scan
//! bands, raise a violation, elect a LEAD, and fly the pursuit formation.
//! Ends after `--duration` seconds (0 = run until Ctrl-C) and reports each
//! agent's final role and target estimate against the true emitter position.

mod sim;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rfs_core::{DroneId, FrequencyHz};
use rfs_swarm::{AgentConfig, AgentHandle, Bus, GradientPredictor, SwarmAgent};

use sim::{Emitter, SimSdr, SimVehicle};

/// Swarm node: simulated drones hunting a simulated emitter.
#[derive(Parser, Debug)]
#[command(name = "rfs-node", version, about)]
struct Cli {
    /// Agent configuration file; created with defaults when missing.
    #[arg(short, long, default_value = "agent.json")]
    config: PathBuf,

    /// Number of simulated drones.
    #[arg(short, long, default_value_t = 4)]
    drones: usize,

    /// Emitter frequency in MHz.
    #[arg(long, default_value_t = 100.0)]
    emitter_mhz: f64,

    /// Emitter offset from the home location, metres east.
    #[arg(long, default_value_t = 500.0)]
    emitter_offset_m: f64,

    /// How long to run, seconds (0 = until Ctrl-C).
    #[arg(long, default_value_t = 60)]
    duration: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let base = AgentConfig::load_or_create(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let home = base.flight.home_location;
    let emitter = Emitter {
        location:  home.destination(cli.emitter_offset_m, std::f64::consts::FRAC_PI_2),
        frequency: FrequencyHz::from_mhz(cli.emitter_mhz),
        power:     1.0,
    };
    info!(
        frequency = %emitter.frequency,
        location = %emitter.location,
        "emitter planted"
    );

    let bus = Bus::new();
    let mut agents: Vec<(SwarmAgent, AgentHandle)> = Vec::with_capacity(cli.drones);

    for i in 0..cli.drones {
        let drone_id = DroneId::from(format!("drone{}", i + 1));
        let mut config = base.clone();
        config.drone_id = drone_id.clone();

        // Stagger starting positions so the swarm does not spawn stacked.
        let start = home.destination(50.0 * i as f64, 0.0);
        let vehicle = SimVehicle::new(start, config.flight.speed);
        let sdr = SimSdr::new(drone_id.as_str(), Arc::clone(&vehicle), emitter, i as u64);

        let agent = SwarmAgent::new(
            config,
            vehicle,
            sdr,
            Arc::new(GradientPredictor),
            bus.clone(),
        );
        let handle = agent.start().await.context("starting agent")?;
        agents.push((agent, handle));
    }

    if cli.duration == 0 {
        tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    } else {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(cli.duration)) => {}
            result = tokio::signal::ctrl_c() => result.context("waiting for Ctrl-C")?,
        }
    }

    for (agent, handle) in agents {
        let (drone_id, role, estimate) = {
            let state = agent.state();
            let state = state.read().await;
            (state.drone_id.clone(), state.role, state.target_location)
        };
        match estimate {
            Some(estimate) => {
                let error_m = estimate.surface_distance_m(emitter.location);
                info!(%drone_id, ?role, %estimate, error_m, "final state");
            }
            None => info!(%drone_id, ?role, "final state, no target estimate"),
        }
        handle.stop().await;
    }
    Ok(())
}
