use rand::Rng;
use rand_distr::{Distribution, Poisson};

/// Background input: the number of exogenous excitatory events a neuron
/// receives in one step, Poisson distributed with mean `rate`.
#[derive(Debug, Clone)]
pub struct ExternalDrive {
    rate: f64,
    dist: Option<Poisson<f64>>,
}

impl ExternalDrive {
    /// A non-positive or non-finite rate yields a silent drive.
    pub fn new(rate: f64) -> Self {
        let dist = if rate > 0.0 && rate.is_finite() {
            Poisson::new(rate).ok()
        } else {
            None
        };
        Self { rate, dist }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Draw one step's event count. A silent drive never touches `rng`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match &self.dist {
            Some(dist) => dist.sample(rng) as u32,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn silent_drive_yields_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        for rate in [0.0, -1.0, f64::NAN] {
            let drive = ExternalDrive::new(rate);
            assert!((0..100).all(|_| drive.sample(&mut rng) == 0));
        }
    }

    #[test]
    fn sample_mean_tracks_rate() {
        let mut rng = StdRng::seed_from_u64(2024);
        let drive = ExternalDrive::new(2.0);
        let draws = 10_000;
        let total: u64 = (0..draws).map(|_| u64::from(drive.sample(&mut rng))).sum();
        let mean = total as f64 / draws as f64;
        assert!((mean - 2.0).abs() < 0.1, "mean {mean}");
    }
}
