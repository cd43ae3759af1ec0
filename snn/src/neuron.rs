//! Leaky integrate-and-fire unit with a circular conduction-delay buffer.
//!
//! Between inputs the membrane relaxes analytically towards `Iext·R`:
//!
//! ```text
//! V(t + n·dt) = e^(-n·dt/τ)·V(t) + Iext·R·(1 - e^(-n·dt/τ))
//! ```
//!
//! Synaptic and external events are added on top in units of `J` (mV).
//! Incoming spikes are parked in `buffer`, one slot per delay step, and surface
//! when the cursor reaches their slot.

/// Identity of a neuron, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeuronKind {
    Excitatory,
    Inhibitory,
}

impl NeuronKind {
    pub fn is_excitatory(self) -> bool {
        matches!(self, NeuronKind::Excitatory)
    }
}

/// Biophysical constants shared by every neuron of a population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronParams {
    /// Integration step (ms)
    pub dt: f64,
    /// Conduction delay in steps
    pub delay_steps: u32,
    /// Refractory window in steps
    pub refractory_steps: u32,
    /// Firing threshold (mV), must be exceeded strictly
    pub v_thr: f64,
    /// Initial and refractory potential (mV)
    pub v_reset: f64,
    /// Weight of an excitatory spike, in multiples of `j`
    pub je: f64,
    /// Weight of an inhibitory spike, in multiples of `j` (negative)
    pub ji: f64,
    /// Potential step per unit of weight (mV)
    pub j: f64,
    /// Membrane time constant (ms)
    pub tau: f64,
    /// Membrane resistance
    pub r: f64,
    /// Constant external current
    pub i_ext: f64,
}

impl Default for NeuronParams {
    fn default() -> Self {
        Self {
            dt: 0.1,
            delay_steps: 15,
            refractory_steps: 20,
            v_thr: 20.0,
            v_reset: 0.0,
            je: 1.0,
            ji: -5.0,
            j: 0.1,
            tau: 20.0,
            r: 20.0,
            i_ext: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Neuron {
    kind: NeuronKind,
    params: NeuronParams,
    /// Membrane potential (mV)
    v: f64,
    refractory: bool,
    /// Last tick this neuron was advanced to
    time: u64,
    spike_times: Vec<u64>,
    /// Pending synaptic weight per future tick, `delay_steps + 1` slots
    buffer: Vec<f64>,
    /// Slot of `time` in `buffer`
    cursor: usize,
}

impl Neuron {
    pub fn new(kind: NeuronKind, params: NeuronParams) -> Self {
        Self {
            kind,
            v: params.v_reset,
            refractory: false,
            time: 0,
            spike_times: Vec::new(),
            buffer: vec![0.0; params.delay_steps as usize + 1],
            cursor: 0,
            params,
        }
    }

    pub fn kind(&self) -> NeuronKind {
        self.kind
    }

    pub fn params(&self) -> &NeuronParams {
        &self.params
    }

    pub fn potential(&self) -> f64 {
        self.v
    }

    pub fn is_refractory(&self) -> bool {
        self.refractory
    }

    /// Tick the neuron was last advanced to.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn spike_count(&self) -> usize {
        self.spike_times.len()
    }

    pub fn spike_times(&self) -> &[u64] {
        &self.spike_times
    }

    pub fn last_spike(&self) -> Option<u64> {
        self.spike_times.last().copied()
    }

    pub fn external_current(&self) -> f64 {
        self.params.i_ext
    }

    pub fn set_external_current(&mut self, i_ext: f64) {
        self.params.i_ext = i_ext;
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Weight currently parked in `slot` of the delay buffer.
    pub fn pending_signal(&self, slot: usize) -> Option<f64> {
        self.buffer.get(slot).copied()
    }

    /// Advance to `tick` with `external_events` exogenous excitatory inputs.
    /// Returns whether the neuron spiked at `tick`.
    ///
    /// Ticks must be non-decreasing.
    pub fn advance(&mut self, tick: u64, external_events: u32) -> bool {
        debug_assert!(tick >= self.time, "ticks must move forward");
        let elapsed = tick.saturating_sub(self.time);

        self.shift_cursor(elapsed);
        self.integrate(tick, elapsed, external_events);
        self.time = tick;

        if self.v > self.params.v_thr {
            self.fire(tick);
            return true;
        }
        false
    }

    /// Potential after relaxing for `steps` steps with no input.
    pub fn relaxed_potential(&self, steps: u64) -> f64 {
        let p = &self.params;
        let factor = (-(steps as f64 * p.dt) / p.tau).exp();
        factor * self.v + p.i_ext * p.r * (1.0 - factor)
    }

    /// Queue a spike emitted by a `source_kind` neuron at `source_tick`.
    ///
    /// The slot offset is `delay_steps + (source_tick - time)`, so a receiver
    /// that has not yet been advanced to `source_tick` writes one slot further
    /// ahead than one that has. Its cursor also lags by one slot, so both
    /// surface the weight at `source_tick + delay_steps`.
    pub fn receive_signal(&mut self, source_tick: u64, source_kind: NeuronKind) {
        let len = self.buffer.len() as i64;
        let offset = i64::from(self.params.delay_steps) + (source_tick as i64 - self.time as i64);
        let slot = (self.cursor as i64 + offset).rem_euclid(len) as usize;
        self.buffer[slot] += self.weight_of(source_kind);
    }

    /// Apply weight that landed in the current slot after this neuron was
    /// already advanced. Only reachable with zero conduction delay.
    pub fn apply_pending_signal(&mut self) -> bool {
        let pending = std::mem::take(&mut self.buffer[self.cursor]);
        if self.refractory {
            return false;
        }

        self.v += self.params.j * pending;
        if self.v > self.params.v_thr {
            self.fire(self.time);
            return true;
        }
        false
    }

    fn weight_of(&self, kind: NeuronKind) -> f64 {
        match kind {
            NeuronKind::Excitatory => self.params.je,
            NeuronKind::Inhibitory => self.params.ji,
        }
    }

    fn shift_cursor(&mut self, elapsed: u64) {
        let len = self.buffer.len();
        let target = (self.cursor + (elapsed % len as u64) as usize) % len;

        // Weight due on skipped ticks is folded into the new current slot.
        let skipped = elapsed.saturating_sub(1).min(len as u64 - 1) as usize;
        for back in 1..=skipped {
            let slot = (target + len - back) % len;
            let pending = std::mem::take(&mut self.buffer[slot]);
            self.buffer[target] += pending;
        }

        self.cursor = target;
    }

    fn integrate(&mut self, tick: u64, elapsed: u64, external_events: u32) {
        if self.refractory {
            let since_spike = self.last_spike().map_or(u64::MAX, |s| tick - s);
            if since_spike >= u64::from(self.params.refractory_steps) {
                self.refractory = false;
            }
        }

        // Drained whether or not it is applied.
        let pending = std::mem::take(&mut self.buffer[self.cursor]);
        if !self.refractory {
            let j = self.params.j;
            self.v = self.relaxed_potential(elapsed) + j * pending + j * f64::from(external_events);
        }
    }

    fn fire(&mut self, tick: u64) {
        self.spike_times.push(tick);
        self.refractory = true;
        self.v = self.params.v_reset;
    }
}
