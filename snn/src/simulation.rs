use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::network::{Network, NetworkParams};
use crate::spike_log::SpikeSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Finished,
}

/// Drives a [`Network`] through ticks `1..=t_stop`.
pub struct Simulation {
    params: NetworkParams,
    network: Network,
    clock: u64,
    t_stop: u64,
    state: RunState,
}

impl Simulation {
    /// Validate `config`, then build the network from its seed (or OS entropy).
    pub fn new(config: &SimulationConfig) -> Result<Self> {
        config.validate()?;
        let params = config.network_params();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let network = Network::new(&params, rng);
        Ok(Self::with_network(params, network, config.t_stop_steps()))
    }

    pub fn with_network(params: NetworkParams, network: Network, t_stop: u64) -> Self {
        Self {
            params,
            network,
            clock: 0,
            t_stop,
            state: RunState::NotStarted,
        }
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    /// Last completed tick.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn t_stop(&self) -> u64 {
        self.t_stop
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn ce(&self) -> usize {
        self.params.ce
    }

    pub fn ci(&self) -> usize {
        self.params.ci
    }

    pub fn delay_steps(&self) -> u32 {
        self.params.neuron.delay_steps
    }

    pub fn refractory_steps(&self) -> u32 {
        self.params.neuron.refractory_steps
    }

    pub fn ji(&self) -> f64 {
        self.params.neuron.ji
    }

    pub fn resistance(&self) -> f64 {
        self.params.neuron.r
    }

    pub fn external_rate(&self) -> f64 {
        self.params.external_rate
    }

    /// Run one tick, returning how many neurons spiked in it. Returns
    /// `Ok(None)` once the horizon is reached.
    pub fn step<S: SpikeSink + ?Sized>(&mut self, sink: &mut S) -> Result<Option<usize>> {
        if self.clock >= self.t_stop {
            self.state = RunState::Finished;
            return Ok(None);
        }

        self.state = RunState::Running;
        self.clock += 1;
        let spikes = self.network.tick(self.clock, sink)?;

        if self.clock == self.t_stop {
            self.state = RunState::Finished;
        }
        Ok(Some(spikes))
    }

    /// Run to the horizon, returning the number of spikes emitted.
    pub fn run<S: SpikeSink + ?Sized>(&mut self, sink: &mut S) -> Result<u64> {
        info!(
            neurons = self.network.len(),
            ticks = self.t_stop,
            dt = self.network.dt(),
            "simulation started"
        );

        let progress_every = (self.t_stop / 10).max(1);
        let mut spikes = 0u64;
        while let Some(emitted) = self.step(sink)? {
            spikes += emitted as u64;
            if self.clock % progress_every == 0 {
                debug!(tick = self.clock, spikes, "progress");
            }
        }

        info!(ticks = self.clock, spikes, "simulation finished");
        Ok(spikes)
    }
}
