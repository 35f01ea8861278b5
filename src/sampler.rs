use anyhow::{Result, bail};
use rand::prelude::*;
use rand_distr::{Bernoulli, Exp, Gamma, LogNormal, Normal, Poisson, Uniform};
use serde::{Deserialize, Serialize};

/// Probability distribution of a model parameter.
///
/// In TOML a distribution is written as an inline table tagged by `dist`,
/// e.g. `t = { dist = "normal", mean = 1.0, std_dev = 0.5 }`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "dist", rename_all = "snake_case")]
pub enum Dist {
    Normal { mean: f64, std_dev: f64 },
    LogNormal { mu: f64, sigma: f64 },
    Uniform { low: f64, high: f64 },
    Exponential { lambda: f64 },
    Gamma { shape: f64, scale: f64 },
    /// Yields `1.0` with probability `p` and `0.0` otherwise.
    Bernoulli { p: f64 },
    Poisson { lambda: f64 },
}

impl Dist {
    /// Check that the distribution parameters are valid.
    pub fn check(&self) -> Result<()> {
        match *self {
            Dist::Normal { mean, std_dev } => drop(Normal::new(mean, std_dev)?),
            Dist::LogNormal { mu, sigma } => drop(LogNormal::new(mu, sigma)?),
            Dist::Uniform { low, high } => drop(Uniform::<f64>::new(low, high)?),
            Dist::Exponential { lambda } => drop(Exp::new(lambda)?),
            Dist::Gamma { shape, scale } => drop(Gamma::new(shape, scale)?),
            Dist::Bernoulli { p } => drop(Bernoulli::new(p)?),
            Dist::Poisson { lambda } => drop(Poisson::new(lambda)?),
        }
        Ok(())
    }

    /// Smallest and largest values the distribution can yield.
    pub fn support(&self) -> (f64, f64) {
        match *self {
            Dist::Normal { .. } => (f64::NEG_INFINITY, f64::INFINITY),
            Dist::LogNormal { .. } | Dist::Exponential { .. } | Dist::Gamma { .. } => {
                (0.0, f64::INFINITY)
            }
            Dist::Uniform { low, high } => (low, high),
            Dist::Bernoulli { .. } => (0.0, 1.0),
            Dist::Poisson { .. } => (0.0, f64::INFINITY),
        }
    }

    fn sample_n<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<f64>> {
        let vals = match *self {
            Dist::Normal { mean, std_dev } => draw(Normal::new(mean, std_dev)?, k, rng),
            Dist::LogNormal { mu, sigma } => draw(LogNormal::new(mu, sigma)?, k, rng),
            Dist::Uniform { low, high } => draw(Uniform::<f64>::new(low, high)?, k, rng),
            Dist::Exponential { lambda } => draw(Exp::new(lambda)?, k, rng),
            Dist::Gamma { shape, scale } => draw(Gamma::new(shape, scale)?, k, rng),
            Dist::Bernoulli { p } => {
                let dist = Bernoulli::new(p)?;
                (0..k)
                    .map(|_| if dist.sample(rng) { 1.0 } else { 0.0 })
                    .collect()
            }
            Dist::Poisson { lambda } => draw(Poisson::new(lambda)?, k, rng),
        };
        if let Some(val) = vals.iter().find(|val| !val.is_finite()) {
            bail!("{self:?} produced a non-finite draw {val}");
        }
        Ok(vals)
    }
}

fn draw<D, R>(dist: D, k: usize, rng: &mut R) -> Vec<f64>
where
    D: Distribution<f64>,
    R: Rng + ?Sized,
{
    (0..k).map(|_| dist.sample(rng)).collect()
}

/// Model parameter: either a fixed value or a distribution.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Fixed(f64),
    Dist(Dist),
}

impl Param {
    /// Draw `k` samples. A fixed value is broadcast, a distribution is sampled independently.
    pub fn sample_n<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Result<Vec<f64>> {
        match self {
            Param::Fixed(val) => Ok(vec![*val; k]),
            Param::Dist(dist) => dist.sample_n(k, rng),
        }
    }

    /// Draw a single sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        let vals = self.sample_n(1, rng)?;
        Ok(vals[0])
    }
}

impl From<f64> for Param {
    fn from(val: f64) -> Self {
        Param::Fixed(val)
    }
}

impl From<Dist> for Param {
    fn from(dist: Dist) -> Self {
        Param::Dist(dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;

    #[test]
    fn fixed_value_is_broadcast() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let vals = Param::Fixed(2.5).sample_n(4, &mut rng).unwrap();
        assert_eq!(vals, vec![2.5; 4]);
    }

    #[test]
    fn distribution_draws_are_independent() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let param = Param::Dist(Dist::Uniform {
            low: 0.0,
            high: 1.0,
        });
        let vals = param.sample_n(64, &mut rng).unwrap();
        assert_eq!(vals.len(), 64);
        assert!(vals.iter().all(|&val| (0.0..1.0).contains(&val)));
        assert!(vals.windows(2).any(|pair| pair[0] != pair[1]));
    }

    #[test]
    fn bernoulli_yields_indicators() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let vals = Param::Dist(Dist::Bernoulli { p: 0.5 })
            .sample_n(200, &mut rng)
            .unwrap();
        assert!(vals.iter().all(|&val| val == 0.0 || val == 1.0));
        assert!(vals.contains(&0.0));
        assert!(vals.contains(&1.0));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let dist = Dist::Normal {
            mean: 0.0,
            std_dev: -1.0,
        };
        assert!(dist.check().is_err());
        assert!(Param::Dist(dist).sample_n(3, &mut rng).is_err());
        assert!(Dist::Bernoulli { p: 1.5 }.check().is_err());
        assert!(
            Dist::Uniform {
                low: 2.0,
                high: 1.0
            }
            .check()
            .is_err()
        );
    }

    #[test]
    fn same_seed_same_draws() {
        let param = Param::Dist(Dist::LogNormal {
            mu: 0.0,
            sigma: 0.5,
        });
        let mut rng_a = ChaCha12Rng::seed_from_u64(5);
        let mut rng_b = ChaCha12Rng::seed_from_u64(5);
        assert_eq!(
            param.sample_n(16, &mut rng_a).unwrap(),
            param.sample_n(16, &mut rng_b).unwrap()
        );
    }

    #[test]
    fn deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Table {
            a: Param,
            b: Param,
            c: Param,
        }
        let table: Table = toml::from_str(
            "a = 1.5\nb = 3\nc = { dist = \"normal\", mean = 1.0, std_dev = 0.25 }\n",
        )
        .unwrap();
        assert_eq!(table.a, Param::Fixed(1.5));
        assert_eq!(table.b, Param::Fixed(3.0));
        assert_eq!(
            table.c,
            Param::Dist(Dist::Normal {
                mean: 1.0,
                std_dev: 0.25
            })
        );
    }
}
