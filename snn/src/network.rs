use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, trace, warn};

use crate::drive::ExternalDrive;
use crate::error::{Result, SnnError};
use crate::neuron::{Neuron, NeuronParams};
use crate::spike_log::{SpikeRecord, SpikeSink};
use crate::topology::Topology;

/// Everything needed to assemble a [`Network`].
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkParams {
    /// NE
    pub excitatory: usize,
    /// NI
    pub inhibitory: usize,
    /// Excitatory in-degree per neuron
    pub ce: usize,
    /// Inhibitory in-degree per neuron
    pub ci: usize,
    /// Mean exogenous events per neuron per step
    pub external_rate: f64,
    pub neuron: NeuronParams,
}

impl NetworkParams {
    /// Unconnected population with default neuron constants.
    pub fn new(excitatory: usize, inhibitory: usize) -> Self {
        Self {
            excitatory,
            inhibitory,
            ce: 0,
            ci: 0,
            external_rate: 2.0,
            neuron: NeuronParams::default(),
        }
    }
}

/// Population of LIF neurons wired by a [`Topology`], advanced in lock step.
///
/// Per tick, neurons are advanced in index order, each drawing its external
/// input from the shared generator. A spiking neuron is logged and its weight
/// queued into every target's delay buffer before the next index is advanced.
pub struct Network {
    neurons: Vec<Neuron>,
    topology: Topology,
    drive: ExternalDrive,
    rng: StdRng,
    dt: f64,
    time: u64,
}

impl Network {
    /// Topology is drawn from `rng` first; the same generator then feeds the
    /// external drive.
    pub fn new(params: &NetworkParams, mut rng: StdRng) -> Self {
        let topology = Topology::build(
            params.excitatory,
            params.inhibitory,
            params.ce,
            params.ci,
            &mut rng,
        );
        let neurons = (0..topology.len())
            .map(|i| Neuron::new(topology.kind_of(i), params.neuron))
            .collect();

        info!(
            excitatory = params.excitatory,
            inhibitory = params.inhibitory,
            synapses = topology.edge_len(),
            "network built"
        );

        Self {
            neurons,
            topology,
            drive: ExternalDrive::new(params.external_rate),
            rng,
            dt: params.neuron.dt,
            time: 0,
        }
    }

    pub fn seeded(params: &NetworkParams, seed: u64) -> Self {
        Self::new(params, StdRng::seed_from_u64(seed))
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn excitatory_count(&self) -> usize {
        self.topology.excitatory()
    }

    pub fn inhibitory_count(&self) -> usize {
        self.topology.inhibitory()
    }

    /// Last tick the whole population was advanced to.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn external_rate(&self) -> f64 {
        self.drive.rate()
    }

    pub fn neuron(&self, index: usize) -> Option<&Neuron> {
        self.neurons.get(index)
    }

    pub fn neuron_mut(&mut self, index: usize) -> Option<&mut Neuron> {
        self.neurons.get_mut(index)
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Manually wire `source -> target`, outside random construction.
    pub fn add_connection(&mut self, source: usize, target: usize) -> Result<()> {
        self.topology.add_edge(source, target)
    }

    /// Number of `source -> target` edges.
    pub fn is_connected(&self, source: usize, target: usize) -> usize {
        self.topology.edge_count(source, target)
    }

    /// Deliver a spike of `source` emitted at `tick` to all of its targets.
    pub fn send_signals(&mut self, source: usize, tick: u64) -> Result<()> {
        if source >= self.neurons.len() {
            return Err(SnnError::NeuronOutOfRange {
                index: source,
                population: self.neurons.len(),
            });
        }
        self.propagate(source, tick);
        Ok(())
    }

    /// Advance every neuron to `tick`, reporting spikes to `sink`.
    /// Returns the number of spikes emitted during the tick.
    pub fn tick<S: SpikeSink + ?Sized>(&mut self, tick: u64, sink: &mut S) -> Result<usize> {
        let mut spikes = 0;
        for i in 0..self.neurons.len() {
            let events = self.drive.sample(&mut self.rng);
            if self.neurons[i].advance(tick, events) {
                self.emit(i, tick, sink)?;
                spikes += 1;
            }
        }

        if self.same_tick_delivery() {
            spikes += self.settle(tick, sink)?;
        }

        self.time = tick;
        Ok(spikes)
    }

    /// Dump every neuron's potential and spike count at trace level.
    pub fn log_state(&self) {
        let time_ms = self.time as f64 * self.dt;
        for (i, neuron) in self.neurons.iter().enumerate() {
            trace!(
                neuron = i,
                time_ms,
                potential = neuron.potential(),
                spikes = neuron.spike_count(),
                "neuron state"
            );
        }
    }

    /// With zero delay a spike can land in a slot its target already consumed
    /// this tick.
    fn same_tick_delivery(&self) -> bool {
        self.neurons
            .first()
            .is_some_and(|n| n.params().delay_steps == 0)
    }

    /// Re-apply same-tick weight until a full pass produces no spike. A neuron
    /// spikes at most once per tick, so `len + 1` passes always suffice.
    fn settle<S: SpikeSink + ?Sized>(&mut self, tick: u64, sink: &mut S) -> Result<usize> {
        let mut total = 0;
        for pass in 0..=self.neurons.len() {
            let mut fired = 0;
            for i in 0..self.neurons.len() {
                if self.neurons[i].apply_pending_signal() {
                    self.emit(i, tick, sink)?;
                    fired += 1;
                }
            }
            if fired == 0 {
                if pass > 0 {
                    debug!(tick, passes = pass, spikes = total, "same-tick cascade settled");
                }
                return Ok(total);
            }
            total += fired;
        }

        warn!(tick, spikes = total, "settling pass limit reached");
        Ok(total)
    }

    fn emit<S: SpikeSink + ?Sized>(&mut self, source: usize, tick: u64, sink: &mut S) -> Result<()> {
        sink.record(SpikeRecord::new(tick, self.dt, source))?;
        self.propagate(source, tick);
        Ok(())
    }

    fn propagate(&mut self, source: usize, tick: u64) {
        let kind = self.neurons[source].kind();
        let Self {
            neurons, topology, ..
        } = self;
        for &target in topology.targets(source) {
            neurons[target as usize].receive_signal(tick, kind);
        }
    }
}
