use crate::config::Config;
use crate::economics::stay_revenue;
use crate::model::State;
use crate::population::Population;
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Bernoulli;

/// Remaining durations indexed by entry minute.
///
/// Vehicles entering in the same minute share one entry, and `live` lists the
/// occupied entry minutes in ascending order.
#[derive(Debug, Clone)]
struct SlotTracker {
    slots: Vec<Option<f64>>,
    live: Vec<usize>,
}

impl SlotTracker {
    fn new(n_minutes: usize) -> Self {
        Self {
            slots: vec![None; n_minutes + 1],
            live: Vec::new(),
        }
    }

    /// Record a stay starting at `minute`, adding to any earlier entry of that minute.
    fn occupy(&mut self, minute: usize, remaining: f64) {
        let slot = &mut self.slots[minute];
        match slot {
            Some(prev) => *prev += remaining,
            None => {
                *slot = Some(remaining);
                if let Err(pos) = self.live.binary_search(&minute) {
                    self.live.insert(pos, minute);
                }
            }
        }
    }

    fn vacate(&mut self, minute: usize) -> Option<f64> {
        let remaining = self.slots[minute].take();
        if let Ok(pos) = self.live.binary_search(&minute) {
            self.live.remove(pos);
        }
        remaining
    }

    fn decay(&mut self) {
        for &minute in &self.live {
            if let Some(remaining) = &mut self.slots[minute] {
                *remaining -= 1.0;
            }
        }
    }

    /// Clear expired entries and return how many there were.
    fn release_expired(&mut self) -> usize {
        let slots = &mut self.slots;
        let n_live = self.live.len();
        self.live.retain(|&minute| {
            let expired = slots[minute].is_some_and(|remaining| remaining <= 0.0);
            if expired {
                slots[minute] = None;
            }
            !expired
        });
        n_live - self.live.len()
    }

    /// Entry minutes of the occupied slots whose remaining time satisfies `pred`.
    fn select<F: Fn(f64) -> bool>(&self, pred: F) -> Vec<usize> {
        self.live
            .iter()
            .copied()
            .filter(|&minute| self.slots[minute].is_some_and(&pred))
            .collect()
    }
}

/// Simulation engine.
///
/// Holds the configuration, agent table, live parking state, slot trackers and
/// random number generator of one run.
pub struct Engine<'a> {
    cfg: &'a Config,
    pop: Population,
    rng: ChaCha12Rng,

    state: State,

    curb: SlotTracker,
    offstreet: SlotTracker,
    cruising: SlotTracker,

    /// Index of the next agent to arrive.
    next_agt: usize,
    /// Agent entering at each minute.
    agt_by_minute: Vec<Option<usize>>,
}

impl<'a> Engine<'a> {
    /// Create a new `Engine` with a freshly generated population.
    pub fn generate_initial_condition(cfg: &'a Config, mut rng: ChaCha12Rng) -> Result<Self> {
        let pop = Population::generate(cfg, &mut rng).context("failed to generate population")?;

        let n_minutes = cfg.model.model_time;
        let mut agt_by_minute = vec![None; n_minutes + 1];
        for (i_agt, agt) in pop.agents().iter().enumerate() {
            agt_by_minute[agt.arrt] = Some(i_agt);
        }

        let init_curb = (cfg.model.init_occup * pop.capacity(0) as f64).round() as usize;

        Ok(Self {
            cfg,
            pop,
            rng,
            state: State::new(init_curb),
            curb: SlotTracker::new(n_minutes),
            offstreet: SlotTracker::new(n_minutes),
            cruising: SlotTracker::new(n_minutes),
            next_agt: 0,
            agt_by_minute,
        })
    }

    /// Perform the simulation and return one state snapshot per minute.
    pub fn perform_simulation(&mut self) -> Result<Vec<State>> {
        let n_minutes = self.cfg.model.model_time;
        let mut trajectory = Vec::with_capacity(n_minutes);
        for minute in 1..=n_minutes {
            self.perform_step(minute)
                .with_context(|| format!("failed to perform step at minute {minute}"))?;
            trajectory.push(self.state);
        }
        Ok(trajectory)
    }

    fn perform_step(&mut self, minute: usize) -> Result<()> {
        // Age every parked and cruising vehicle by one minute.
        self.curb.decay();
        self.offstreet.decay();
        self.cruising.decay();

        self.release_departures();

        let arrival = self.arriving_agent(minute)?;

        let backfilled = self
            .backfill_curb(minute, arrival.is_some())
            .context("failed to backfill curb")?;

        if let Some(i_agt) = arrival {
            self.allocate_arrival(minute, i_agt, backfilled);
        }

        self.resolve_tired_cruisers(minute)
            .context("failed to resolve tired cruisers")?;

        self.curb.release_expired();
        self.offstreet.release_expired();
        self.cruising.release_expired();

        self.state.cruising_total_time += self.state.cruising_current as f64 / 60.0;

        Ok(())
    }

    fn release_departures(&mut self) {
        let n_curb = self.curb.release_expired();
        self.state.curb_current = self.state.curb_current.saturating_sub(n_curb);

        let n_offstreet = self.offstreet.release_expired();
        self.state.offstreet_current = self.state.offstreet_current.saturating_sub(n_offstreet);
    }

    fn arriving_agent(&self, minute: usize) -> Result<Option<usize>> {
        let Some(agt) = self.pop.agents().get(self.next_agt) else {
            return Ok(None);
        };
        if agt.arrt < minute {
            bail!(
                "agent {} arriving at minute {} was never allocated",
                self.next_agt,
                agt.arrt
            );
        }
        Ok((agt.arrt == minute).then_some(self.next_agt))
    }

    fn capacity(&self) -> usize {
        self.pop.capacity(self.next_agt)
    }

    /// Let a waiting cruiser take a free curb space. Returns whether one did.
    fn backfill_curb(&mut self, minute: usize, arrival: bool) -> Result<bool> {
        if self.state.curb_current >= self.capacity() {
            return Ok(false);
        }

        let eligible = self.cruising.select(|remaining| remaining >= 0.0);
        if eligible.is_empty() {
            return Ok(false);
        }

        // Cruisers compete with this minute's arrival, if any, for the space.
        let n_eligible = eligible.len() as f64;
        let prob_cruiser = n_eligible / (n_eligible + if arrival { 1.0 } else { 0.0 });
        if !Bernoulli::new(prob_cruiser)?.sample(&mut self.rng) {
            return Ok(false);
        }

        let &entry_minute = eligible
            .choose(&mut self.rng)
            .context("failed to choose a cruiser")?;
        self.cruising.vacate(entry_minute);
        let i_agt = self.agt_by_minute[entry_minute]
            .with_context(|| format!("no agent entered cruising at minute {entry_minute}"))?;
        let agt = self.pop.agents()[i_agt];

        self.state.cruising_current = self
            .state
            .cruising_current
            .checked_sub(1)
            .context("cruising count underflow")?;

        self.curb.occupy(minute, agt.tmin);
        self.state.curb_current += 1;
        self.state.curb_total += 1;
        self.state.curb_revenue += stay_revenue(agt.tmin, agt.p, self.cfg.model.price_interval);

        Ok(true)
    }

    fn allocate_arrival(&mut self, minute: usize, i_agt: usize, backfilled: bool) {
        let capacity = self.capacity();
        let agt = self.pop.agents()[i_agt];
        let price_interval = self.cfg.model.price_interval;

        if agt.p <= agt.m && !backfilled && self.state.curb_current < capacity {
            self.curb.occupy(minute, agt.tmin);
            self.state.curb_current += 1;
            self.state.curb_total += 1;
            self.state.curb_revenue += stay_revenue(agt.tmin, agt.p, price_interval);
        } else if agt.m < agt.p {
            self.offstreet.occupy(minute, agt.tmin);
            self.state.offstreet_current += 1;
            self.state.offstreet_total += 1;
            self.state.offstreet_revenue += stay_revenue(agt.tmin, agt.m, price_interval);
        } else if agt.mct >= 0.0 {
            self.cruising.occupy(minute, agt.mct);
            self.state.cruising_current += 1;
        } else {
            log::debug!("agent {i_agt} dropped with maximum cruising time {}", agt.mct);
        }

        self.next_agt = (self.next_agt + 1).min(self.pop.agents().len());
    }

    /// Send every cruiser out of patience off-street, as one group.
    fn resolve_tired_cruisers(&mut self, minute: usize) -> Result<()> {
        let tired_margin = self.cfg.model.tired_margin;
        let tired = self.cruising.select(|remaining| remaining <= tired_margin);
        if tired.is_empty() {
            return Ok(());
        }

        let price_interval = self.cfg.model.price_interval;
        let mut duration = 0.0;
        let mut revenue = 0.0;
        for &entry_minute in &tired {
            self.cruising.vacate(entry_minute);
            let i_agt = self.agt_by_minute[entry_minute]
                .with_context(|| format!("no agent entered cruising at minute {entry_minute}"))?;
            let agt = self.pop.agents()[i_agt];
            duration += agt.tmin;
            revenue += stay_revenue(agt.tmin, agt.m, price_interval);
        }

        let n_tired = tired.len();
        self.offstreet.occupy(minute, duration);
        self.state.offstreet_current += n_tired;
        self.state.offstreet_total += n_tired;
        self.state.offstreet_revenue += revenue;
        self.state.cruising_current = self
            .state
            .cruising_current
            .checked_sub(n_tired)
            .context("cruising count underflow")?;

        Ok(())
    }
}

/// Run one simulation on its own stream and return the trajectory.
pub fn simulate(cfg: &Config, rng: ChaCha12Rng) -> Result<Vec<State>> {
    let mut engine = Engine::generate_initial_condition(cfg, rng)
        .context("failed to generate initial condition")?;
    engine.perform_simulation()
}
