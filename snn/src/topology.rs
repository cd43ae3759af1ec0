use rand::Rng;

use crate::error::{Result, SnnError};
use crate::neuron::NeuronKind;

/// Directed multigraph of outgoing connections, stored as CSR.
///
/// Indices `[0, excitatory)` are excitatory nodes, the rest inhibitory.
/// Self loops and repeated edges are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    excitatory: usize,
    inhibitory: usize,
    /// Targets of node i are `receiver[out_offset[i]..out_offset[i + 1]]`
    out_offset: Vec<usize>,
    receiver: Vec<u32>,
}

impl Topology {
    /// Population without any connection.
    pub fn empty(excitatory: usize, inhibitory: usize) -> Self {
        Self {
            excitatory,
            inhibitory,
            out_offset: vec![0; excitatory + inhibitory + 1],
            receiver: Vec::new(),
        }
    }

    /// Fixed in-degree random graph: every node receives `ce` sources drawn
    /// uniformly from the excitatory range and `ci` from the inhibitory range,
    /// independently and with replacement.
    ///
    /// Each source lists its targets in ascending order.
    pub fn build<R: Rng + ?Sized>(
        excitatory: usize,
        inhibitory: usize,
        ce: usize,
        ci: usize,
        rng: &mut R,
    ) -> Self {
        let n = excitatory + inhibitory;
        let ce = if excitatory == 0 { 0 } else { ce };
        let ci = if inhibitory == 0 { 0 } else { ci };
        let in_degree = ce + ci;
        if in_degree == 0 {
            return Self::empty(excitatory, inhibitory);
        }

        // Draw order: target-major, excitatory draws first.
        let mut sources = Vec::with_capacity(n * in_degree);
        for _target in 0..n {
            for _ in 0..ce {
                sources.push(rng.random_range(0..excitatory) as u32);
            }
            for _ in 0..ci {
                sources.push(rng.random_range(excitatory..n) as u32);
            }
        }

        // CSR prefix
        let mut out_offset = vec![0usize; n + 1];
        for &source in &sources {
            out_offset[source as usize + 1] += 1;
        }
        for i in 0..n {
            out_offset[i + 1] += out_offset[i];
        }

        let mut next = out_offset[..n].to_vec();
        let mut receiver = vec![0u32; sources.len()];
        for (draw, &source) in sources.iter().enumerate() {
            let slot = &mut next[source as usize];
            receiver[*slot] = (draw / in_degree) as u32;
            *slot += 1;
        }

        Self {
            excitatory,
            inhibitory,
            out_offset,
            receiver,
        }
    }

    pub fn len(&self) -> usize {
        self.excitatory + self.inhibitory
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn excitatory(&self) -> usize {
        self.excitatory
    }

    pub fn inhibitory(&self) -> usize {
        self.inhibitory
    }

    pub fn kind_of(&self, node: usize) -> NeuronKind {
        if node < self.excitatory {
            NeuronKind::Excitatory
        } else {
            NeuronKind::Inhibitory
        }
    }

    /// Total number of edges.
    pub fn edge_len(&self) -> usize {
        self.receiver.len()
    }

    /// Targets of `source` in insertion order; empty when out of range.
    pub fn targets(&self, source: usize) -> &[u32] {
        if source >= self.len() {
            return &[];
        }
        &self.receiver[self.out_offset[source]..self.out_offset[source + 1]]
    }

    pub fn out_degree(&self, source: usize) -> usize {
        self.targets(source).len()
    }

    /// Append `target` to the outgoing list of `source`.
    pub fn add_edge(&mut self, source: usize, target: usize) -> Result<()> {
        for index in [source, target] {
            if index >= self.len() {
                return Err(SnnError::NeuronOutOfRange {
                    index,
                    population: self.len(),
                });
            }
        }

        let at = self.out_offset[source + 1];
        self.receiver.insert(at, target as u32);
        for offset in &mut self.out_offset[source + 1..] {
            *offset += 1;
        }
        Ok(())
    }

    /// Multiplicity of the edge `source -> target`.
    pub fn edge_count(&self, source: usize, target: usize) -> usize {
        self.targets(source)
            .iter()
            .filter(|&&t| t as usize == target)
            .count()
    }

    /// Number of (excitatory, inhibitory) edges arriving at `target`.
    pub fn in_degree(&self, target: usize) -> (usize, usize) {
        let mut excitatory = 0;
        let mut inhibitory = 0;
        for source in 0..self.len() {
            let count = self.edge_count(source, target);
            match self.kind_of(source) {
                NeuronKind::Excitatory => excitatory += count,
                NeuronKind::Inhibitory => inhibitory += count,
            }
        }
        (excitatory, inhibitory)
    }
}
