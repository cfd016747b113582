//! Feed rate to color mapping for speed-colored extrusions.
//!
//! The map is primed once with every distinct extrusion speed of a file. Each
//! speed gets a hue by its rank: the slowest of M speeds receives the slow
//! (blue) end of the gradient, the fastest the fast (red) end, and the Nth
//! receives the Nth of M evenly spaced hues. After priming the table is only
//! read, so a speed keeps its color for the rest of the session.

use layerview_core::{thread_safe_rw, Rgba, ThreadSafeRw};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

const SLOW_HUE: f64 = 0.66;
const FAST_HUE: f64 = 0.0;
const SATURATION: f64 = 0.99;
const LIGHTNESS: f64 = 0.49;

/// One legend entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpeedColor {
    /// Feed rate in mm/min
    pub speed: f64,
    pub color: Rgba,
}

/// Read-mostly speed → color lookup table
#[derive(Debug, Clone)]
pub struct SpeedColorMap {
    table: ThreadSafeRw<Vec<SpeedColor>>,
}

impl Default for SpeedColorMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedColorMap {
    pub fn new() -> Self {
        Self {
            table: thread_safe_rw(Vec::new()),
        }
    }

    /// Map primed with `speeds`
    pub fn primed(speeds: impl IntoIterator<Item = f64>) -> Self {
        let map = Self::new();
        map.prime(speeds);
        map
    }

    /// Replace the table with colors for the distinct positive `speeds`
    pub fn prime(&self, speeds: impl IntoIterator<Item = f64>) {
        let mut distinct: Vec<f64> = speeds
            .into_iter()
            .filter(|s| s.is_finite() && *s > 0.0)
            .collect();
        distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        distinct.dedup();

        let count = distinct.len();
        let table: Vec<SpeedColor> = distinct
            .into_iter()
            .enumerate()
            .map(|(rank, speed)| SpeedColor {
                speed,
                color: color_for_rank(rank, count),
            })
            .collect();

        debug!("Primed speed color map with {} speeds", table.len());
        *self.table.write() = table;
    }

    /// Color for a feed rate. Non-positive speeds map to black.
    ///
    /// A speed that was not primed is colored by the rank it would have
    /// without being added to the table.
    pub fn color_for_speed(&self, speed: f64) -> Rgba {
        if !speed.is_finite() || speed <= 0.0 {
            return Rgba::BLACK;
        }

        let table = self.table.read();
        match table.binary_search_by(|entry| {
            entry
                .speed
                .partial_cmp(&speed)
                .unwrap_or(Ordering::Less)
        }) {
            Ok(found) => table[found].color,
            Err(rank) => color_for_rank(rank, table.len() + 1),
        }
    }

    /// All primed speeds in ascending order
    pub fn legend(&self) -> Vec<SpeedColor> {
        self.table.read().clone()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

fn color_for_rank(rank: usize, count: usize) -> Rgba {
    let hue = if count <= 1 {
        SLOW_HUE
    } else {
        SLOW_HUE + (FAST_HUE - SLOW_HUE) * rank as f64 / (count - 1) as f64
    };
    Rgba::from_hsl(hue, SATURATION, LIGHTNESS)
}
