use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Agent of the simulation: one driver arriving at a given minute.
///
/// Prices and costs are hourly, `t` and `c` are in hours,
/// `mct`, `tmin` and `arrt` are in minutes.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Agent {
    pub p: f64,
    pub m: f64,
    pub t: f64,
    pub c: f64,
    pub n: f64,
    pub v: f64,
    pub f: f64,
    pub ar: f64,
    pub cpk: f64,
    pub mint: f64,
    pub minc: f64,
    pub minv: f64,

    /// Curb saving.
    pub psav: f64,
    /// Cruising cost.
    pub ccost: f64,
    /// Maximum cruising time.
    pub mct: f64,
    /// Parking duration.
    pub tmin: f64,
    /// Arrival minute.
    pub arrt: usize,
}

impl Agent {
    /// Curb capacity perceived by the agent.
    pub fn capacity(&self) -> usize {
        self.cpk.round().max(0.0) as usize
    }
}

/// Number of fields in a [`State`] row.
pub const N_FIELDS: usize = 8;

/// Names of the [`State`] fields, in row order.
pub const FIELD_NAMES: [&str; N_FIELDS] = [
    "curb_current",
    "offstreet_current",
    "cruising_current",
    "curb_total",
    "offstreet_total",
    "cruising_total_time",
    "curb_revenue",
    "offstreet_revenue",
];

/// Aggregate parking state of the simulation at a given minute.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
pub struct State {
    /// Vehicles currently parked at the curb.
    pub curb_current: usize,
    /// Vehicles currently parked off-street.
    pub offstreet_current: usize,
    /// Vehicles currently cruising.
    pub cruising_current: usize,

    /// Vehicles parked at the curb so far.
    pub curb_total: usize,
    /// Vehicles parked off-street so far.
    pub offstreet_total: usize,
    /// Vehicle-hours spent cruising so far.
    pub cruising_total_time: f64,

    pub curb_revenue: f64,
    pub offstreet_revenue: f64,
}

impl State {
    /// Initial state with `curb_current` occupied curb spaces.
    pub fn new(curb_current: usize) -> Self {
        Self {
            curb_current,
            ..Self::default()
        }
    }

    /// Fields in [`FIELD_NAMES`] order.
    pub fn to_row(&self) -> [f64; N_FIELDS] {
        [
            self.curb_current as f64,
            self.offstreet_current as f64,
            self.cruising_current as f64,
            self.curb_total as f64,
            self.offstreet_total as f64,
            self.cruising_total_time,
            self.curb_revenue,
            self.offstreet_revenue,
        ]
    }
}

/// Matrix view of a trajectory, shape `[n_minutes, N_FIELDS]`.
pub fn trajectory_matrix(trajectory: &[State]) -> Array2<f64> {
    let mut mat = Array2::zeros((trajectory.len(), N_FIELDS));
    for (mut row, state) in mat.rows_mut().into_iter().zip(trajectory) {
        row.assign(&ndarray::aview1(&state.to_row()));
    }
    mat
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_follows_field_order() {
        let state = State {
            curb_current: 1,
            offstreet_current: 2,
            cruising_current: 3,
            curb_total: 4,
            offstreet_total: 5,
            cruising_total_time: 6.0,
            curb_revenue: 7.0,
            offstreet_revenue: 8.0,
        };
        assert_eq!(state.to_row(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut live = State::new(3);
        let mut trajectory = Vec::new();
        trajectory.push(live);
        live.curb_current += 1;
        trajectory.push(live);
        assert_eq!(trajectory[0].curb_current, 3);
        assert_eq!(trajectory[1].curb_current, 4);
    }

    #[test]
    fn matrix_has_one_row_per_minute() {
        let trajectory = vec![State::new(1), State::new(2), State::new(5)];
        let mat = trajectory_matrix(&trajectory);
        assert_eq!(mat.dim(), (3, N_FIELDS));
        assert_eq!(mat[[2, 0]], 5.0);
        assert_eq!(mat[[1, 7]], 0.0);
    }
}
