use crate::model::{FIELD_NAMES, N_FIELDS};
use crate::stats::{Accumulator, AccumulatorReport, SteadyStateReport, steady_state};
use anyhow::{Result, bail};
use ndarray::{Array3, Axis};
use serde::{Deserialize, Serialize};

/// Number of instantaneous count fields, which lead every row.
const N_CURRENT_FIELDS: usize = 3;

/// Summary of one state field across the runs of a batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldReport {
    pub field: String,
    /// Mean over runs, per minute.
    pub mean: Vec<f64>,
    /// Standard deviation over runs, per minute.
    pub std_dev: Vec<f64>,
    /// Distribution over runs of the value at the last minute.
    pub last: AccumulatorReport,
    /// Steady-state level of the mean, for instantaneous counts.
    pub steady_state: Option<SteadyStateReport>,
}

/// Per-minute, per-field statistics over Monte Carlo runs.
pub struct Analyzer {
    n_minutes: usize,
    acc_mat: Vec<[Accumulator; N_FIELDS]>,
}

impl Analyzer {
    pub fn new(n_minutes: usize) -> Self {
        let mut acc_mat = Vec::new();
        acc_mat.resize_with(n_minutes, Default::default);
        Self { n_minutes, acc_mat }
    }

    /// Add every run of a `[n_minutes, N_FIELDS, n_runs]` batch.
    pub fn add_batch(&mut self, results: &Array3<f64>) -> Result<()> {
        let (n_minutes, n_fields, _) = results.dim();
        if n_minutes != self.n_minutes || n_fields != N_FIELDS {
            bail!(
                "batch shape must be [{}, {N_FIELDS}, _], but is {:?}",
                self.n_minutes,
                results.dim()
            );
        }
        for lane in results.axis_iter(Axis(2)) {
            for (accs, row) in self.acc_mat.iter_mut().zip(lane.outer_iter()) {
                for (acc, &val) in accs.iter_mut().zip(row.iter()) {
                    acc.add(val);
                }
            }
        }
        Ok(())
    }

    pub fn report(&self) -> Vec<FieldReport> {
        (0..N_FIELDS)
            .map(|i_field| {
                let reports: Vec<_> = self
                    .acc_mat
                    .iter()
                    .map(|accs| accs[i_field].report())
                    .collect();
                let mean: Vec<_> = reports.iter().map(|rep| rep.mean).collect();
                let std_dev = reports.iter().map(|rep| rep.std_dev).collect();
                let last = match self.acc_mat.last() {
                    Some(accs) => accs[i_field].report(),
                    None => Accumulator::new().report(),
                };
                let steady_state = (i_field < N_CURRENT_FIELDS).then(|| steady_state(&mean));
                FieldReport {
                    field: FIELD_NAMES[i_field].to_string(),
                    mean,
                    std_dev,
                    last,
                    steady_state,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_over_runs() {
        let mut results = Array3::zeros((4, N_FIELDS, 2));
        for i_min in 0..4 {
            results[[i_min, 0, 0]] = 1.0;
            results[[i_min, 0, 1]] = 3.0;
            results[[i_min, 6, 0]] = i_min as f64;
            results[[i_min, 6, 1]] = i_min as f64;
        }
        let mut analyzer = Analyzer::new(4);
        analyzer.add_batch(&results).unwrap();
        let reports = analyzer.report();

        assert_eq!(reports.len(), N_FIELDS);
        assert_eq!(reports[0].field, "curb_current");
        assert_eq!(reports[0].mean, vec![2.0; 4]);
        assert!((reports[0].std_dev[0] - 2.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(reports[0].steady_state.as_ref().unwrap().mean, 2.0);

        assert_eq!(reports[6].field, "curb_revenue");
        assert_eq!(reports[6].last.mean, 3.0);
        assert!(reports[6].steady_state.is_none());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut analyzer = Analyzer::new(4);
        assert!(analyzer.add_batch(&Array3::zeros((5, N_FIELDS, 1))).is_err());
        assert!(analyzer.add_batch(&Array3::zeros((4, 3, 1))).is_err());
    }
}
