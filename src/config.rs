use crate::economics::CruisingCost;
use crate::sampler::{Dist, Param};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::{Bound, RangeBounds},
    path::Path,
};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use. Every key is optional;
/// missing keys take the values of [`Config::default`].
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub preferences: Preferences,
    pub characteristics: Characteristics,
    pub model: ModelParams,
    pub output: OutputParams,
}

/// Driver preference parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Preferences {
    /// Parking duration (hours).
    pub t: Param,
    /// Expected search time (hours).
    pub c: Param,
    /// Number of occupants.
    pub n: Param,
    /// Value of time ($/person/hour).
    pub v: Param,
}

/// Parking market and driver characteristic parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Characteristics {
    /// Curb price ($/hour).
    pub p: Param,
    /// Off-street price ($/hour).
    pub m: Param,
    /// Fuel cost of cruising ($/hour).
    pub f: Param,
    /// Arrivals per minute (0 or 1).
    pub ar: Param,
    /// Curb capacity.
    pub cpk: Param,
    /// Minimum parking duration (hours).
    pub mint: Param,
    /// Minimum search time (hours).
    pub minc: Param,
    /// Minimum value of time ($/person/hour).
    pub minv: Param,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelParams {
    /// Simulated horizon (minutes).
    pub model_time: usize,
    /// Initial fraction of occupied curb spaces.
    pub init_occup: f64,
    /// Remaining cruising time (minutes) at or below which a cruiser gives up.
    pub tired_margin: f64,
    /// Billing interval (minutes); every started interval is charged in full.
    pub price_interval: f64,
    pub cruising_cost: CruisingCost,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputParams {
    /// Number of Monte Carlo runs per batch.
    pub n_runs: usize,
    /// Batch seed; drawn at random when absent.
    pub seed: Option<u64>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            t: Param::Dist(Dist::LogNormal {
                mu: 0.0,
                sigma: 0.5,
            }),
            c: Param::Dist(Dist::Exponential { lambda: 10.0 }),
            n: Param::Fixed(1.0),
            v: Param::Dist(Dist::Normal {
                mean: 13.0,
                std_dev: 4.0,
            }),
        }
    }
}

impl Default for Characteristics {
    fn default() -> Self {
        Self {
            p: Param::Fixed(1.0),
            m: Param::Fixed(6.0),
            f: Param::Fixed(1.0),
            ar: Param::Dist(Dist::Bernoulli { p: 0.5 }),
            cpk: Param::Fixed(25.0),
            mint: Param::Fixed(0.25),
            minc: Param::Fixed(0.0),
            minv: Param::Fixed(1.0),
        }
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            model_time: 600,
            init_occup: 0.9,
            tired_margin: 5.0,
            price_interval: 60.0,
            cruising_cost: CruisingCost::Hourly,
        }
    }
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            n_runs: 100,
            seed: None,
        }
    }
}

impl Config {
    /// Start a [`ConfigBuilder`] from the default configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            cfg: Config::default(),
        }
    }

    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Check every parameter against its domain.
    pub fn validate(&self) -> Result<()> {
        let pre = &self.preferences;
        check_floored(&pre.t).context("invalid parking duration")?;
        check_floored(&pre.c).context("invalid search time")?;
        check_param(&pre.n, 1.0..).context("invalid number of occupants")?;
        check_floored(&pre.v).context("invalid value of time")?;

        let chr = &self.characteristics;
        check_param(&chr.p, 0.0..).context("invalid curb price")?;
        check_param(&chr.m, 0.0..).context("invalid off-street price")?;
        check_param(&chr.f, 0.0..).context("invalid fuel cost")?;
        check_param(&chr.ar, 0.0..).context("invalid arrival parameter")?;
        check_param(&chr.cpk, 0.0..).context("invalid curb capacity")?;
        check_param(&chr.mint, (Bound::Excluded(0.0), Bound::Unbounded))
            .context("invalid minimum parking duration")?;
        check_param(&chr.minc, 0.0..).context("invalid minimum search time")?;
        check_param(&chr.minv, 0.0..).context("invalid minimum value of time")?;

        let mdl = &self.model;
        check_num(mdl.model_time, 1..).context("invalid model time")?;
        check_num(mdl.init_occup, 0.0..=1.0).context("invalid initial occupancy")?;
        check_num(mdl.tired_margin, 0.0..).context("invalid tired margin")?;
        check_num(mdl.price_interval, (Bound::Excluded(0.0), Bound::Unbounded))
            .context("invalid price interval")?;

        check_num(self.output.n_runs, 1..).context("invalid number of runs")?;

        Ok(())
    }
}

/// Builder for [`Config`], starting from the defaults and validating on [`ConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    cfg: Config,
}

impl ConfigBuilder {
    pub fn t(mut self, t: impl Into<Param>) -> Self {
        self.cfg.preferences.t = t.into();
        self
    }

    pub fn c(mut self, c: impl Into<Param>) -> Self {
        self.cfg.preferences.c = c.into();
        self
    }

    pub fn n(mut self, n: impl Into<Param>) -> Self {
        self.cfg.preferences.n = n.into();
        self
    }

    pub fn v(mut self, v: impl Into<Param>) -> Self {
        self.cfg.preferences.v = v.into();
        self
    }

    pub fn p(mut self, p: impl Into<Param>) -> Self {
        self.cfg.characteristics.p = p.into();
        self
    }

    pub fn m(mut self, m: impl Into<Param>) -> Self {
        self.cfg.characteristics.m = m.into();
        self
    }

    pub fn f(mut self, f: impl Into<Param>) -> Self {
        self.cfg.characteristics.f = f.into();
        self
    }

    pub fn ar(mut self, ar: impl Into<Param>) -> Self {
        self.cfg.characteristics.ar = ar.into();
        self
    }

    pub fn cpk(mut self, cpk: impl Into<Param>) -> Self {
        self.cfg.characteristics.cpk = cpk.into();
        self
    }

    pub fn mint(mut self, mint: impl Into<Param>) -> Self {
        self.cfg.characteristics.mint = mint.into();
        self
    }

    pub fn minc(mut self, minc: impl Into<Param>) -> Self {
        self.cfg.characteristics.minc = minc.into();
        self
    }

    pub fn minv(mut self, minv: impl Into<Param>) -> Self {
        self.cfg.characteristics.minv = minv.into();
        self
    }

    pub fn model_time(mut self, model_time: usize) -> Self {
        self.cfg.model.model_time = model_time;
        self
    }

    pub fn init_occup(mut self, init_occup: f64) -> Self {
        self.cfg.model.init_occup = init_occup;
        self
    }

    pub fn tired_margin(mut self, tired_margin: f64) -> Self {
        self.cfg.model.tired_margin = tired_margin;
        self
    }

    pub fn price_interval(mut self, price_interval: f64) -> Self {
        self.cfg.model.price_interval = price_interval;
        self
    }

    pub fn cruising_cost(mut self, cruising_cost: CruisingCost) -> Self {
        self.cfg.model.cruising_cost = cruising_cost;
        self
    }

    pub fn n_runs(mut self, n_runs: usize) -> Self {
        self.cfg.output.n_runs = n_runs;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.cfg.output.seed = Some(seed);
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<Config> {
        self.cfg.validate().context("failed to validate config")?;
        Ok(self.cfg)
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_param<R>(param: &Param, range: R) -> Result<()>
where
    R: RangeBounds<f64> + Debug,
{
    match param {
        Param::Fixed(val) => check_num(*val, range),
        Param::Dist(dist) => {
            dist.check().context("invalid distribution parameters")?;
            // Every value the distribution can yield must be in range.
            let (low, high) = dist.support();
            if !range.contains(&low) || !range.contains(&high) {
                bail!("distribution support must be in the range {range:?}, but is [{low}, {high}]");
            }
            Ok(())
        }
    }
}

// Floored parameters may take any value: the floor bounds them after sampling.
fn check_floored(param: &Param) -> Result<()> {
    match param {
        Param::Fixed(val) => {
            if !val.is_finite() {
                bail!("number must be finite, but is {val}");
            }
            Ok(())
        }
        Param::Dist(dist) => dist.check().context("invalid distribution parameters"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::builder().build().is_ok());
    }

    #[test]
    fn negative_price_is_rejected() {
        let err = Config::builder().p(-1.0).build().unwrap_err();
        assert!(format!("{err:#}").contains("invalid curb price"));
    }

    #[test]
    fn unbounded_price_distribution_is_rejected() {
        let err = Config::builder()
            .m(Dist::Normal {
                mean: 5.0,
                std_dev: 1.0,
            })
            .build()
            .unwrap_err();
        assert!(format!("{err:#}").contains("invalid off-street price"));
    }

    #[test]
    fn floored_parameters_accept_unbounded_distributions() {
        let cfg = Config::builder()
            .t(Dist::Normal {
                mean: 1.0,
                std_dev: 2.0,
            })
            .build();
        assert!(cfg.is_ok());
    }

    #[test]
    fn domain_violations_are_rejected() {
        assert!(Config::builder().n(0.5).build().is_err());
        assert!(Config::builder().cpk(-2.0).build().is_err());
        assert!(Config::builder().mint(0.0).build().is_err());
        assert!(Config::builder().model_time(0).build().is_err());
        assert!(Config::builder().init_occup(1.5).build().is_err());
        assert!(Config::builder().init_occup(-0.1).build().is_err());
        assert!(Config::builder().price_interval(0.0).build().is_err());
        assert!(Config::builder().n_runs(0).build().is_err());
        assert!(
            Config::builder()
                .ar(Dist::Bernoulli { p: 2.0 })
                .build()
                .is_err()
        );
    }

    #[test]
    fn first_violation_is_reported() {
        let err = Config::builder().p(-1.0).m(-1.0).build().unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("invalid curb price"));
        assert!(!msg.contains("invalid off-street price"));
    }

    #[test]
    fn partial_toml_takes_defaults() {
        let cfg: Config = toml::from_str(
            "[characteristics]\n\
             p = 2.0\n\
             ar = { dist = \"bernoulli\", p = 0.25 }\n\
             [model]\n\
             model_time = 120\n\
             cruising_cost = \"search\"\n",
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.characteristics.p, Param::Fixed(2.0));
        assert_eq!(cfg.characteristics.ar, Param::Dist(Dist::Bernoulli { p: 0.25 }));
        assert_eq!(cfg.characteristics.m, Characteristics::default().m);
        assert_eq!(cfg.model.model_time, 120);
        assert_eq!(cfg.model.cruising_cost, CruisingCost::Search);
        assert_eq!(cfg.model.tired_margin, 5.0);
        assert_eq!(cfg.preferences, Preferences::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<Config, _> = toml::from_str("[model]\nhorizon = 10\n");
        assert!(res.is_err());
    }
}
