//! Duration sources for stochastic activity lengths.
//!
//! Anything implementing [`Sample`] can be passed to
//! [`Context::do_activity`](crate::Context::do_activity). Negative samples
//! are retried by the activity machinery, never filtered here, so sources
//! with support below zero (e.g. [`Normal`]) behave as truncated at zero.
//!
//! All stock sources are backed by a ChaCha generator so that a run seeded
//! with [`seeded`](Uniform::seeded) constructors replays identically.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution;

use crate::error::{Error, Result};

/// A source of stochastic durations.
pub trait Sample {
    /// Draws the next value. Repeated calls may return different values.
    fn sample(&mut self) -> f64;
}

/// Duration argument accepted by activity primitives: either a fixed value
/// or a source to draw from.
pub enum Dur<'a> {
    /// A fixed duration. Negative values are a usage error.
    Fixed(f64),
    /// A duration drawn from a source, redrawn until non-negative.
    Random(&'a mut dyn Sample),
}

impl From<f64> for Dur<'static> {
    fn from(value: f64) -> Self {
        Dur::Fixed(value)
    }
}

impl<'a, S: Sample> From<&'a mut S> for Dur<'a> {
    fn from(source: &'a mut S) -> Self {
        Dur::Random(source)
    }
}

impl<'a> From<&'a mut dyn Sample> for Dur<'a> {
    fn from(source: &'a mut dyn Sample) -> Self {
        Dur::Random(source)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub f64);

impl Sample for Constant {
    fn sample(&mut self) -> f64 {
        self.0
    }
}

/// Uniform distribution over `[low, high)`.
pub struct Uniform {
    distr: rand_distr::Uniform<f64>,
    rng: ChaCha8Rng,
}

impl Uniform {
    /// Constructs a uniform source with a generator seeded from entropy.
    pub fn new(low: f64, high: f64) -> Result<Self> {
        Self::with_rng(low, high, ChaCha8Rng::from_entropy())
    }

    /// Constructs a uniform source with a fixed seed for reproducible runs.
    pub fn seeded(low: f64, high: f64, seed: u64) -> Result<Self> {
        Self::with_rng(low, high, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(low: f64, high: f64, rng: ChaCha8Rng) -> Result<Self> {
        if low >= high {
            return Err(Error::InvalidDistribution(format!(
                "uniform: low {} is not below high {}",
                low, high
            )));
        }
        Ok(Self {
            distr: rand_distr::Uniform::new(low, high),
            rng,
        })
    }
}

impl Sample for Uniform {
    fn sample(&mut self) -> f64 {
        self.distr.sample(&mut self.rng)
    }
}

/// Triangular distribution with the given minimum, mode, and maximum.
pub struct Triangular {
    distr: rand_distr::Triangular<f64>,
    rng: ChaCha8Rng,
}

impl Triangular {
    /// Constructs a triangular source with a generator seeded from entropy.
    pub fn new(min: f64, mode: f64, max: f64) -> Result<Self> {
        Self::with_rng(min, mode, max, ChaCha8Rng::from_entropy())
    }

    /// Constructs a triangular source with a fixed seed.
    pub fn seeded(min: f64, mode: f64, max: f64, seed: u64) -> Result<Self> {
        Self::with_rng(min, mode, max, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(min: f64, mode: f64, max: f64, rng: ChaCha8Rng) -> Result<Self> {
        let distr = rand_distr::Triangular::new(min, max, mode)
            .map_err(|err| Error::InvalidDistribution(format!("triangular: {}", err)))?;
        Ok(Self { distr, rng })
    }
}

impl Sample for Triangular {
    fn sample(&mut self) -> f64 {
        self.distr.sample(&mut self.rng)
    }
}

/// Normal distribution with the given mean and standard deviation.
pub struct Normal {
    distr: rand_distr::Normal<f64>,
    rng: ChaCha8Rng,
}

impl Normal {
    /// Constructs a normal source with a generator seeded from entropy.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        Self::with_rng(mean, std_dev, ChaCha8Rng::from_entropy())
    }

    /// Constructs a normal source with a fixed seed.
    pub fn seeded(mean: f64, std_dev: f64, seed: u64) -> Result<Self> {
        Self::with_rng(mean, std_dev, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(mean: f64, std_dev: f64, rng: ChaCha8Rng) -> Result<Self> {
        if std_dev < 0.0 {
            return Err(Error::InvalidDistribution(format!(
                "normal: negative standard deviation {}",
                std_dev
            )));
        }
        let distr = rand_distr::Normal::new(mean, std_dev)
            .map_err(|err| Error::InvalidDistribution(format!("normal: {}", err)))?;
        Ok(Self { distr, rng })
    }
}

impl Sample for Normal {
    fn sample(&mut self) -> f64 {
        self.distr.sample(&mut self.rng)
    }
}

/// Exponential distribution with the given mean.
pub struct Exponential {
    distr: rand_distr::Exp<f64>,
    rng: ChaCha8Rng,
}

impl Exponential {
    /// Constructs an exponential source with a generator seeded from entropy.
    pub fn new(mean: f64) -> Result<Self> {
        Self::with_rng(mean, ChaCha8Rng::from_entropy())
    }

    /// Constructs an exponential source with a fixed seed.
    pub fn seeded(mean: f64, seed: u64) -> Result<Self> {
        Self::with_rng(mean, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(mean: f64, rng: ChaCha8Rng) -> Result<Self> {
        if mean <= 0.0 {
            return Err(Error::InvalidDistribution(format!(
                "exponential: non-positive mean {}",
                mean
            )));
        }
        let distr = rand_distr::Exp::new(1.0 / mean)
            .map_err(|err| Error::InvalidDistribution(format!("exponential: {}", err)))?;
        Ok(Self { distr, rng })
    }
}

impl Sample for Exponential {
    fn sample(&mut self) -> f64 {
        self.distr.sample(&mut self.rng)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dur_conversions() {
        assert!(matches!(Dur::from(1.5), Dur::Fixed(_)));
        let mut constant = Constant(2.0);
        assert!(matches!(Dur::from(&mut constant), Dur::Random(_)));
        let dynamic: &mut dyn Sample = &mut constant;
        assert!(matches!(Dur::from(dynamic), Dur::Random(_)));
    }

    #[test]
    fn test_constant() {
        let mut source = Constant(4.5);
        assert_eq!(source.sample(), 4.5);
        assert_eq!(source.sample(), 4.5);
    }

    #[test]
    fn test_seeded_sources_replay() {
        let mut a = Uniform::seeded(1.0, 2.0, 17).unwrap();
        let mut b = Uniform::seeded(1.0, 2.0, 17).unwrap();
        for _ in 0..10 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_uniform_range() {
        let mut source = Uniform::seeded(3.0, 4.0, 1).unwrap();
        for _ in 0..100 {
            let value = source.sample();
            assert!((3.0..4.0).contains(&value));
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Uniform::seeded(2.0, 1.0, 0).is_err());
        assert!(Normal::seeded(0.0, -1.0, 0).is_err());
        assert!(Exponential::seeded(0.0, 0).is_err());
        assert!(Triangular::seeded(5.0, 1.0, 2.0, 0).is_err());
    }

    #[test]
    fn test_triangular_range() {
        let mut source = Triangular::seeded(1.0, 2.0, 4.0, 7).unwrap();
        for _ in 0..100 {
            let value = source.sample();
            assert!((1.0..=4.0).contains(&value));
        }
    }
}
