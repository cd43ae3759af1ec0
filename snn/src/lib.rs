//! Brunel-style recurrent network of leaky integrate-and-fire neurons.
//!
//! Fixed-step simulation: every tick each neuron relaxes analytically, takes in
//! the synaptic weight that has finished its conduction delay plus a Poisson
//! external drive, and spikes when it crosses threshold. Spikes are queued
//! into the delay buffers of the neuron's targets and logged as
//! `<time_ms>\t<neuron_index>`.

pub mod config;
pub mod drive;
pub mod error;
pub mod network;
pub mod neuron;
pub mod render;
pub mod simulation;
pub mod spike_log;
pub mod topology;

pub use config::SimulationConfig;
pub use drive::ExternalDrive;
pub use error::{Result, SnnError};
pub use network::{Network, NetworkParams};
pub use neuron::{Neuron, NeuronKind, NeuronParams};
pub use simulation::{RunState, Simulation};
pub use spike_log::{NullSink, SpikeRecord, SpikeSink, SpikeWriter};
pub use topology::Topology;
