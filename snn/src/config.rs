//! Simulation configuration.
//!
//! High-level knobs (population sizes, `g`, `eta`, millisecond windows) as
//! read from TOML, plus derivation of the per-step quantities the engine runs on:
//!
//! ```text
//! JI            = -g · JE
//! R             = τ / C
//! external_rate = η · Vthr · dt / (J · τ)
//! steps(ms)     = round(ms · 1000) / round(dt · 1000)
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SnnError};
use crate::network::NetworkParams;
use crate::neuron::NeuronParams;

/// Millisecond quantities are converted to steps at 1 µs precision.
const STEP_PRECISION: f64 = 1000.0;

/// Slack, in units of 1 µs, for `dt` to count as lying on the µs grid.
const GRID_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Simulated length (ms)
    pub t_stop_ms: f64,
    /// Integration step (ms)
    pub dt: f64,
    /// Relative strength of inhibition, JI = -g·JE
    pub g: f64,
    /// External drive relative to the rate needed to reach threshold
    pub eta: f64,
    pub excitatory: usize,
    pub inhibitory: usize,
    /// Excitatory in-degree, NE / 10 when absent
    pub ce: Option<usize>,
    /// Inhibitory in-degree, NI / 10 when absent
    pub ci: Option<usize>,
    pub delay_ms: f64,
    pub refractory_ms: f64,
    pub v_thr: f64,
    pub v_reset: f64,
    pub je: f64,
    pub j: f64,
    pub tau: f64,
    pub capacitance: f64,
    /// Fixed seed for a reproducible run; drawn from the OS otherwise
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_stop_ms: 1000.0,
            dt: 0.1,
            g: 5.0,
            eta: 2.0,
            excitatory: 10_000,
            inhibitory: 2_500,
            ce: None,
            ci: None,
            delay_ms: 1.5,
            refractory_ms: 2.0,
            v_thr: 20.0,
            v_reset: 0.0,
            je: 1.0,
            j: 0.1,
            tau: 20.0,
            capacitance: 1.0,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every constraint, reporting all violations at once.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<(&str, String)> = Vec::new();

        if !(self.t_stop_ms >= 0.0 && self.t_stop_ms.is_finite()) {
            errors.push(("t_stop_ms", "simulation length can not be negative".into()));
        }
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            errors.push(("dt", "simulation step has to be strictly positive".into()));
        } else {
            let scaled = self.dt * STEP_PRECISION;
            if scaled.round() < 1.0 {
                errors.push(("dt", format!("must be at least {} ms", 1.0 / STEP_PRECISION)));
            } else if (scaled - scaled.round()).abs() > GRID_TOLERANCE {
                errors.push(("dt", format!("must be a multiple of {} ms", 1.0 / STEP_PRECISION)));
            }
        }
        if !(self.g > 0.0) {
            errors.push(("g", "has to be strictly positive".into()));
        }
        if !(self.eta >= 0.0) {
            errors.push(("eta", "can not be negative".into()));
        }
        if self.excitatory == 0 {
            errors.push(("excitatory", "population must not be empty".into()));
        }
        if self.inhibitory == 0 {
            errors.push(("inhibitory", "population must not be empty".into()));
        }
        if self.excitatory.saturating_add(self.inhibitory) > u32::MAX as usize {
            errors.push(("excitatory", "population exceeds u32 indexing".into()));
        }
        if self.ce() > self.excitatory {
            errors.push(("ce", format!("exceeds the {} excitatory neurons", self.excitatory)));
        }
        if self.ci() > self.inhibitory {
            errors.push(("ci", format!("exceeds the {} inhibitory neurons", self.inhibitory)));
        }
        if !(self.delay_ms >= 0.0) {
            errors.push(("delay_ms", "can not be negative".into()));
        }
        if !(self.refractory_ms >= 0.0) {
            errors.push(("refractory_ms", "can not be negative".into()));
        }
        for (field, value) in [("tau", self.tau), ("capacitance", self.capacitance), ("j", self.j)] {
            if !(value > 0.0) {
                errors.push((field, "has to be strictly positive".into()));
            }
        }

        if errors.is_empty() {
            return Ok(());
        }
        let fields = errors.iter().map(|(f, _)| *f).collect::<Vec<_>>().join(", ");
        let reasons = errors
            .iter()
            .map(|(f, r)| format!("{f}: {r}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(SnnError::invalid(&fields, reasons))
    }

    pub fn ce(&self) -> usize {
        self.ce.unwrap_or(self.excitatory / 10)
    }

    pub fn ci(&self) -> usize {
        self.ci.unwrap_or(self.inhibitory / 10)
    }

    /// Whole steps in `ms`, truncated.
    pub fn steps(&self, ms: f64) -> u64 {
        let span = (ms * STEP_PRECISION).round() as u64;
        let step = (self.dt * STEP_PRECISION).round() as u64;
        span.checked_div(step).unwrap_or(0)
    }

    pub fn delay_steps(&self) -> u32 {
        self.steps(self.delay_ms).min(u64::from(u32::MAX)) as u32
    }

    pub fn refractory_steps(&self) -> u32 {
        self.steps(self.refractory_ms).min(u64::from(u32::MAX)) as u32
    }

    /// Simulation horizon in ticks.
    pub fn t_stop_steps(&self) -> u64 {
        self.steps(self.t_stop_ms)
    }

    pub fn ji(&self) -> f64 {
        -self.g * self.je
    }

    pub fn resistance(&self) -> f64 {
        self.tau / self.capacitance
    }

    pub fn external_rate(&self) -> f64 {
        self.eta * self.v_thr * self.dt / (self.j * self.tau)
    }

    pub fn network_params(&self) -> NetworkParams {
        for (field, ms) in [
            ("delay_ms", self.delay_ms),
            ("refractory_ms", self.refractory_ms),
            ("t_stop_ms", self.t_stop_ms),
        ] {
            let span = (ms * STEP_PRECISION).round() as u64;
            let step = (self.dt * STEP_PRECISION).round() as u64;
            if step > 0 && span % step != 0 {
                warn!(field, ms, dt = self.dt, "not a whole number of steps, truncating");
            }
        }

        NetworkParams {
            excitatory: self.excitatory,
            inhibitory: self.inhibitory,
            ce: self.ce(),
            ci: self.ci(),
            external_rate: self.external_rate(),
            neuron: NeuronParams {
                dt: self.dt,
                delay_steps: self.delay_steps(),
                refractory_steps: self.refractory_steps(),
                v_thr: self.v_thr,
                v_reset: self.v_reset,
                je: self.je,
                ji: self.ji(),
                j: self.j,
                tau: self.tau,
                r: self.resistance(),
                i_ext: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn brunel(g: f64, eta: f64) -> SimulationConfig {
        SimulationConfig {
            t_stop_ms: 0.0,
            g,
            eta,
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn derived_constants() {
        let config = brunel(4.5, 0.9);
        assert!(config.validate().is_ok());

        assert_eq!(config.ce(), 1000);
        assert_eq!(config.ci(), 250);
        assert_eq!(config.delay_steps(), 15);
        assert_eq!(config.refractory_steps(), 20);
        assert_eq!(config.t_stop_steps(), 0);
        assert_eq!(config.ji(), -4.5);
        assert_eq!(config.resistance(), 20.0);
        assert!((config.external_rate() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn network_params_carry_derived_values() {
        let params = brunel(5.0, 2.0).network_params();
        assert_eq!(params.excitatory, 10_000);
        assert_eq!(params.inhibitory, 2_500);
        assert_eq!((params.ce, params.ci), (1000, 250));
        assert_eq!(params.neuron.delay_steps, 15);
        assert_eq!(params.neuron.ji, -5.0);
        assert!((params.external_rate - 2.0).abs() < 1e-12);
    }

    #[test]
    fn steps_round_before_dividing() {
        let config = SimulationConfig {
            dt: 0.1,
            t_stop_ms: 2.3,
            ..SimulationConfig::default()
        };
        assert_eq!(config.t_stop_steps(), 23);

        let fine = SimulationConfig {
            dt: 0.05,
            ..SimulationConfig::default()
        };
        assert_eq!(fine.delay_steps(), 30);
        assert_eq!(fine.refractory_steps(), 40);
        assert_eq!(fine.t_stop_steps(), 20_000);
    }

    #[test]
    fn explicit_in_degrees_override_defaults() {
        let config = SimulationConfig {
            ce: Some(3),
            ci: Some(0),
            ..SimulationConfig::default()
        };
        assert_eq!((config.ce(), config.ci()), (3, 0));
    }

    #[test]
    fn rejects_invalid_values_all_at_once() {
        let config = SimulationConfig {
            t_stop_ms: -1.0,
            dt: 0.0,
            g: 0.0,
            eta: -0.5,
            ..SimulationConfig::default()
        };
        match config.validate() {
            Err(SnnError::InvalidConfig { field, reason }) => {
                assert_eq!(field, "t_stop_ms, dt, g, eta");
                assert!(reason.contains("strictly positive"));
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        let empty = SimulationConfig {
            inhibitory: 0,
            ..SimulationConfig::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn rejects_in_degree_above_population() {
        let config = SimulationConfig {
            excitatory: 10,
            inhibitory: 5,
            ce: Some(500),
            ci: Some(90),
            ..SimulationConfig::default()
        };
        match config.validate() {
            Err(SnnError::InvalidConfig { field, reason }) => {
                assert_eq!(field, "ce, ci");
                assert!(reason.contains("10 excitatory"));
                assert!(reason.contains("5 inhibitory"));
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        let full = SimulationConfig {
            excitatory: 10,
            inhibitory: 5,
            ce: Some(10),
            ci: Some(5),
            ..SimulationConfig::default()
        };
        assert!(full.validate().is_ok());
    }

    #[test]
    fn rejects_dt_off_the_microsecond_grid() {
        let config = SimulationConfig {
            dt: 0.0015,
            t_stop_ms: 3.0,
            ..SimulationConfig::default()
        };
        match config.validate() {
            Err(SnnError::InvalidConfig { field, reason }) => {
                assert_eq!(field, "dt");
                assert!(reason.contains("multiple of 0.001 ms"));
            }
            other => panic!("expected InvalidConfig, got {other:?}"),
        }

        for dt in [0.1, 0.05, 0.001, 0.25] {
            let config = SimulationConfig {
                dt,
                ..SimulationConfig::default()
            };
            assert!(config.validate().is_ok(), "dt = {dt}");
        }
    }

    #[test]
    fn parses_partial_toml() {
        let config = SimulationConfig::from_toml_str(
            r#"
            t_stop_ms = 250.0
            g = 4.5
            eta = 0.9
            excitatory = 800
            inhibitory = 200
            seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.t_stop_ms, 250.0);
        assert_eq!(config.excitatory, 800);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.dt, 0.1);
        assert_eq!(config.ce(), 80);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = SimulationConfig::from_toml_str("gg = 1.0").unwrap_err();
        assert!(matches!(err, SnnError::ConfigParse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dt = 0.5\ndelay_ms = 1.5").unwrap();

        let config = SimulationConfig::load(file.path()).unwrap();
        assert_eq!(config.dt, 0.5);
        assert_eq!(config.delay_steps(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimulationConfig::load(Path::new("/nonexistent/brunel.toml")).unwrap_err();
        assert!(matches!(err, SnnError::Io(_)));
    }
}
