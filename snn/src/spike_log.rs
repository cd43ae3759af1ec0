//! Spike records and the tab-separated spike log.
//!
//! One line per spike, in emission order: `<time_ms>\t<neuron_index>`.

use std::io::{self, Write};

/// Resolution the log times are rounded to before printing (1 ns).
const TIME_RESOLUTION: f64 = 1e6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeRecord {
    pub tick: u64,
    pub time_ms: f64,
    pub neuron: usize,
}

impl SpikeRecord {
    pub fn new(tick: u64, dt: f64, neuron: usize) -> Self {
        Self {
            tick,
            time_ms: tick as f64 * dt,
            neuron,
        }
    }
}

/// Consumer of the spikes emitted by a network.
pub trait SpikeSink {
    fn record(&mut self, spike: SpikeRecord) -> io::Result<()>;
}

impl SpikeSink for Vec<SpikeRecord> {
    fn record(&mut self, spike: SpikeRecord) -> io::Result<()> {
        self.push(spike);
        Ok(())
    }
}

/// Discards everything; used when only the neuron state matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SpikeSink for NullSink {
    fn record(&mut self, _spike: SpikeRecord) -> io::Result<()> {
        Ok(())
    }
}

/// Writes spikes as `<time_ms>\t<neuron_index>\n`.
pub struct SpikeWriter<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> SpikeWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Lines written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SpikeSink for SpikeWriter<W> {
    fn record(&mut self, spike: SpikeRecord) -> io::Result<()> {
        writeln!(self.out, "{}\t{}", log_time(spike.time_ms), spike.neuron)?;
        self.written += 1;
        Ok(())
    }
}

/// `tick * dt` carries float noise (`3 * 0.1 = 0.30000000000000004`); snap it
/// to the log resolution so it prints as `0.3`.
pub fn log_time(time_ms: f64) -> f64 {
    (time_ms * TIME_RESOLUTION).round() / TIME_RESOLUTION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_tab_separated_lines() {
        let mut writer = SpikeWriter::new(Vec::new());
        writer.record(SpikeRecord::new(3, 0.1, 7)).unwrap();
        writer.record(SpikeRecord::new(924, 0.1, 12499)).unwrap();
        writer.record(SpikeRecord::new(10, 0.1, 0)).unwrap();

        assert_eq!(writer.written(), 3);
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(text, "0.3\t7\n92.4\t12499\n1\t0\n");
    }

    #[test]
    fn vec_sink_keeps_order() {
        let mut sink = Vec::new();
        sink.record(SpikeRecord::new(2, 0.5, 1)).unwrap();
        sink.record(SpikeRecord::new(2, 0.5, 0)).unwrap();
        assert_eq!(sink.iter().map(|s| s.neuron).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(sink[0].time_ms, 1.0);
    }
}
