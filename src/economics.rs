//! Parking economics of a single driver.
//!
//! Prices, fuel costs and values of time are hourly; durations are in hours
//! unless the name says otherwise.

use serde::{Deserialize, Serialize};

/// How the cost of cruising is charged against the curb saving.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CruisingCost {
    /// Hourly cost of cruising, `f + n * v`.
    #[default]
    Hourly,
    /// Cost of one expected search of length `c`, `c * (f + n * v)`.
    Search,
}

/// Money saved by parking `t` hours at the curb price `p` instead of the off-street price `m`.
pub fn curb_saving(t: f64, m: f64, p: f64) -> f64 {
    t * (m - p)
}

/// Cost of cruising for `n` occupants valuing their time at `v`, with fuel cost `f`.
pub fn cruising_cost(policy: CruisingCost, n: f64, v: f64, f: f64, c: f64) -> f64 {
    match policy {
        CruisingCost::Hourly => f + n * v,
        CruisingCost::Search => c * (f + n * v),
    }
}

/// Longest cruise, in whole minutes, that the curb saving pays for.
pub fn max_cruising_time(psav: f64, ccost: f64) -> f64 {
    (60.0 * psav / ccost).round()
}

/// Revenue of one stay, billing every started price interval in full.
pub fn stay_revenue(duration_min: f64, price: f64, price_interval: f64) -> f64 {
    (duration_min / price_interval).ceil() * price
}
