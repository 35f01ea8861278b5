//! Monte Carlo batches of independent simulation runs.

use crate::config::Config;
use crate::engine::simulate;
use crate::model::{N_FIELDS, State, trajectory_matrix};
use anyhow::{Context, Result, bail};
use ndarray::{Array3, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Random stream of run `i_run` in the batch seeded with `seed`.
///
/// Every run gets its own ChaCha stream, so results do not depend on scheduling.
pub fn run_rng(seed: u64, i_run: usize) -> ChaCha12Rng {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    rng.set_stream(i_run as u64);
    rng
}

/// Single run of a batch.
pub fn simulate_run(cfg: &Config, seed: u64, i_run: usize) -> Result<Vec<State>> {
    simulate(cfg, run_rng(seed, i_run))
}

pub struct MonteCarlo<'a> {
    cfg: &'a Config,
    seed: u64,
    /// Once set, no further runs are started.
    cancel: AtomicBool,
}

impl<'a> MonteCarlo<'a> {
    pub fn new(cfg: &'a Config, seed: u64) -> Self {
        Self {
            cfg,
            seed,
            cancel: AtomicBool::new(false),
        }
    }

    /// Perform `n_runs` runs on the current rayon pool.
    ///
    /// Returns a tensor of shape `[model_time, N_FIELDS, n_runs]`.
    pub fn perform_batch(&self, n_runs: usize) -> Result<Array3<f64>> {
        let n_minutes = self.cfg.model.model_time;
        let mut results = Array3::zeros((n_minutes, N_FIELDS, n_runs));
        let n_done = AtomicUsize::new(0);

        results
            .axis_iter_mut(Axis(2))
            .into_par_iter()
            .enumerate()
            .try_for_each(|(i_run, mut lane)| -> Result<()> {
                if self.cancel.load(Ordering::Relaxed) {
                    bail!("batch cancelled before run {i_run}");
                }

                let trajectory = simulate_run(self.cfg, self.seed, i_run)
                    .inspect_err(|_| self.cancel.store(true, Ordering::Relaxed))
                    .with_context(|| format!("failed to perform run {i_run}"))?;
                lane.assign(&trajectory_matrix(&trajectory));

                let n_done = n_done.fetch_add(1, Ordering::Relaxed) + 1;
                let progress = 100.0 * n_done as f64 / n_runs as f64;
                log::info!("completed {progress:06.2}%");

                Ok(())
            })?;

        Ok(results)
    }
}
