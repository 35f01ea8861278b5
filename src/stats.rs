use serde::{Deserialize, Serialize};

/// Online mean and variance (Welford).
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SteadyStateReport {
    /// First minute index kept after discarding the warm-up.
    pub i_equil: usize,
    /// Mean over the kept minutes.
    pub mean: f64,
}

/// Estimate the steady-state level of a series.
///
/// The warm-up is chosen with the marginal standard error rule among the
/// truncation points `0, n/2^k, ...`, never discarding more than half the series.
pub fn steady_state(series: &[f64]) -> SteadyStateReport {
    let n_vals = series.len();
    if n_vals < 2 {
        return SteadyStateReport {
            i_equil: 0,
            mean: mean(series),
        };
    }

    let mut i_equil = 0;
    let mut min_mse = f64::INFINITY;
    let mut cut = n_vals / 2;
    loop {
        let tail = &series[cut..];
        let n_tail = tail.len() as f64;
        let mse = variance(tail) * (n_tail - 1.0) / (n_tail * n_tail);
        if mse <= min_mse {
            min_mse = mse;
            i_equil = cut;
        }
        if cut == 0 {
            break;
        }
        cut /= 2;
    }

    SteadyStateReport {
        i_equil,
        mean: mean(&series[i_equil..]),
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn variance(vals: &[f64]) -> f64 {
    if vals.len() < 2 {
        return 0.0;
    }
    let mean = mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (vals.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_mean_and_std_dev() {
        let mut acc = Accumulator::new();
        for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert!((report.mean - 5.0).abs() < 1e-12);
        assert!((report.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn accumulator_with_one_value() {
        let mut acc = Accumulator::new();
        acc.add(3.0);
        let report = acc.report();
        assert_eq!(report.mean, 3.0);
        assert!(report.std_dev.is_nan());
    }

    #[test]
    fn flat_series_keeps_everything() {
        let report = steady_state(&[4.0; 64]);
        assert_eq!(report.i_equil, 0);
        assert_eq!(report.mean, 4.0);
    }

    #[test]
    fn warm_up_is_discarded() {
        let mut series: Vec<f64> = (0..32).map(|i| i as f64).collect();
        series.extend(std::iter::repeat_n(32.0, 96));
        let report = steady_state(&series);
        assert!(report.i_equil >= 32);
        assert_eq!(report.mean, 32.0);
    }
}
