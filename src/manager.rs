use crate::analysis::Analyzer;
use crate::config::Config;
use crate::monte_carlo::MonteCarlo;
use anyhow::{Context, Result};
use glob::glob;
use ndarray::Array3;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Monte Carlo batch as stored on disk.
#[derive(Serialize, Deserialize)]
pub struct Batch {
    pub seed: u64,
    /// Tensor of shape `[model_time, N_FIELDS, n_runs]`.
    pub results: Array3<f64>,
}

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    /// Perform a Monte Carlo batch and save it in a new run directory.
    pub fn create_run(&self, seed: Option<u64>) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let seed = seed
            .or(self.cfg.output.seed)
            .unwrap_or_else(rand::random);
        log::info!("batch seed {seed}");

        let results = MonteCarlo::new(&self.cfg, seed)
            .perform_batch(self.cfg.output.n_runs)
            .context("failed to perform batch")?;

        let batch_file = self.batch_file(run_idx);
        save_msgpack(&batch_file, &Batch { seed, results })
            .with_context(|| format!("failed to save {batch_file:?}"))?;
        log::info!("saved {batch_file:?}");

        Ok(())
    }

    /// Summarize every saved batch.
    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let batch_file = self.batch_file(run_idx);
            let batch: Batch = load_msgpack(&batch_file)
                .with_context(|| format!("failed to load {batch_file:?}"))?;

            let mut analyzer = Analyzer::new(self.cfg.model.model_time);
            analyzer
                .add_batch(&batch.results)
                .with_context(|| format!("failed to analyze {batch_file:?}"))?;
            let reports = analyzer.report();

            for report in &reports {
                log::info!(
                    "run {run_idx:04} {}: {:.3} +- {:.3}",
                    report.field,
                    report.last.mean,
                    report.last.std_dev
                );
            }

            let results_file = self.results_file(run_idx);
            save_msgpack(&results_file, &reports)
                .with_context(|| format!("failed to save {results_file:?}"))?;
        }

        Ok(())
    }

    /// Remove every run directory.
    pub fn clean_sim(&self) -> Result<()> {
        for run_dir in self.run_dirs().context("failed to list run dirs")? {
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn run_dirs(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let run_dirs = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .collect();
        Ok(run_dirs)
    }

    fn count_run_dirs(&self) -> Result<usize> {
        Ok(self.run_dirs()?.len())
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn batch_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("batch.msgpack")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }
}

fn save_msgpack<T: Serialize>(file: &Path, val: &T) -> Result<()> {
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write_named(&mut writer, val).context("failed to serialize value")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn load_msgpack<T: for<'de> Deserialize<'de>>(file: &Path) -> Result<T> {
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    decode::from_read(&mut reader).context("failed to deserialize value")
}
