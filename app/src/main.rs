use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use snn::{Simulation, SimulationConfig, SpikeWriter, render};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Simulate a Brunel network of LIF neurons and write its spike log.
#[derive(Parser, Debug)]
#[command(name = "brunel", version, long_about = None)]
struct Args {
    /// TOML configuration file; built-in defaults otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulation length (ms)
    #[arg(long)]
    t_stop: Option<f64>,

    /// Simulation step (ms)
    #[arg(long)]
    dt: Option<f64>,

    /// Relative strength of inhibition
    #[arg(short, long)]
    g: Option<f64>,

    /// External drive relative to threshold
    #[arg(long)]
    eta: Option<f64>,

    /// Number of excitatory neurons
    #[arg(long)]
    excitatory: Option<usize>,

    /// Number of inhibitory neurons
    #[arg(long)]
    inhibitory: Option<usize>,

    /// Seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Spike log destination
    #[arg(short, long, default_value = "spikes.txt")]
    output: PathBuf,

    /// Also write the network topology: PNG (needs Graphviz) for a `.png`
    /// path, DOT source otherwise
    #[arg(long)]
    dump_topology: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Args {
    fn apply(&self, config: &mut SimulationConfig) {
        if let Some(t_stop) = self.t_stop {
            config.t_stop_ms = t_stop;
        }
        if let Some(dt) = self.dt {
            config.dt = dt;
        }
        if let Some(g) = self.g {
            config.g = g;
        }
        if let Some(eta) = self.eta {
            config.eta = eta;
        }
        if let Some(excitatory) = self.excitatory {
            config.excitatory = excitatory;
        }
        if let Some(inhibitory) = self.inhibitory {
            config.inhibitory = inhibitory;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    args.apply(&mut config);

    let mut sim = Simulation::new(&config).context("invalid simulation configuration")?;
    info!(
        ce = sim.ce(),
        ci = sim.ci(),
        delay_steps = sim.delay_steps(),
        refractory_steps = sim.refractory_steps(),
        ji = sim.ji(),
        external_rate = sim.external_rate(),
        "parameters derived"
    );

    if let Some(path) = &args.dump_topology {
        let topology = sim.network().topology();
        let bytes = if path.extension().is_some_and(|ext| ext == "png") {
            render::to_neato_png(topology).context("graphviz rendering failed")?
        } else {
            render::to_dot(topology).into_bytes()
        };
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "topology written");
    }

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut writer = SpikeWriter::new(BufWriter::new(file));

    sim.run(&mut writer)?;
    writer.flush()?;
    sim.network().log_state();

    info!(spikes = writer.written(), path = %args.output.display(), "done");
    Ok(())
}
