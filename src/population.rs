use crate::config::Config;
use crate::economics::{cruising_cost, curb_saving, max_cruising_time};
use crate::model::Agent;
use crate::sampler::Param;
use anyhow::{Context, Result};
use rand::Rng;

/// Agent table of one simulation run, ordered by arrival minute.
#[derive(Debug, Clone)]
pub struct Population {
    agt_vec: Vec<Agent>,
    fallback_cpk: f64,
}

impl Population {
    /// Generate the agents arriving over the model horizon.
    pub fn generate<R: Rng + ?Sized>(cfg: &Config, rng: &mut R) -> Result<Self> {
        let pre = &cfg.preferences;
        let chr = &cfg.characteristics;
        let mdl = &cfg.model;

        // Minute `i_min + 1` has an arrival if its indicator is positive.
        let indicators = chr
            .ar
            .sample_n(mdl.model_time, rng)
            .context("failed to sample arrivals")?;
        let arrt: Vec<usize> = indicators
            .iter()
            .enumerate()
            .filter(|(_, ind)| **ind > 0.0)
            .map(|(i_min, _)| i_min + 1)
            .collect();
        let n_clamped = indicators.iter().filter(|ind| **ind > 1.0).count();
        if n_clamped > 0 {
            log::warn!("{n_clamped} minutes drew more than one arrival, counting one each");
        }

        let n_agt = arrt.len();
        let mut sample = |param: &Param, name: &str| {
            param
                .sample_n(n_agt, rng)
                .with_context(|| format!("failed to sample {name}"))
        };
        let t = sample(&pre.t, "t")?;
        let c = sample(&pre.c, "c")?;
        let n = sample(&pre.n, "n")?;
        let v = sample(&pre.v, "v")?;
        let p = sample(&chr.p, "p")?;
        let m = sample(&chr.m, "m")?;
        let f = sample(&chr.f, "f")?;
        let ar = sample(&chr.ar, "ar")?;
        let cpk = sample(&chr.cpk, "cpk")?;
        let mint = sample(&chr.mint, "mint")?;
        let minc = sample(&chr.minc, "minc")?;
        let minv = sample(&chr.minv, "minv")?;

        let mut agt_vec = Vec::with_capacity(n_agt);
        for i_agt in 0..n_agt {
            let t = t[i_agt].max(mint[i_agt]);
            let c = c[i_agt].max(minc[i_agt]);
            let v = v[i_agt].max(minv[i_agt]);

            let psav = curb_saving(t, m[i_agt], p[i_agt]);
            let ccost = cruising_cost(mdl.cruising_cost, n[i_agt], v, f[i_agt], c);

            agt_vec.push(Agent {
                p: p[i_agt],
                m: m[i_agt],
                t,
                c,
                n: n[i_agt],
                v,
                f: f[i_agt],
                ar: ar[i_agt],
                cpk: cpk[i_agt],
                mint: mint[i_agt],
                minc: minc[i_agt],
                minv: minv[i_agt],
                psav,
                ccost,
                mct: max_cruising_time(psav, ccost),
                tmin: 60.0 * t,
                arrt: arrt[i_agt],
            });
        }

        // Capacity for runs without arrivals.
        let fallback_cpk = chr.cpk.sample(rng).context("failed to sample cpk")?;

        Ok(Self {
            agt_vec,
            fallback_cpk,
        })
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agt_vec
    }

    /// Curb capacity seen by the agent at `i_agt`, or by the last agent past the end.
    pub fn capacity(&self, i_agt: usize) -> usize {
        match self.agt_vec.get(i_agt).or(self.agt_vec.last()) {
            Some(agt) => agt.capacity(),
            None => self.fallback_cpk.round().max(0.0) as usize,
        }
    }
}
