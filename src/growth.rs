use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Month-on-month change (in percent) beyond which a cell is flagged.
pub const GROWTH_THRESHOLD_PCT: f64 = 5.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Flat,
}

/// Percentage change from `previous` to `current`; `None` when there is no
/// base to compare against.
pub fn growth_percent(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

pub fn annotate(current: f64, previous: f64) -> Direction {
    annotate_with_threshold(current, previous, GROWTH_THRESHOLD_PCT)
}

pub fn annotate_with_threshold(current: f64, previous: f64, threshold_pct: f64) -> Direction {
    match growth_percent(current, previous) {
        None if current > 0.0 => Direction::Up,
        None => Direction::Flat,
        Some(pct) if pct > threshold_pct => Direction::Up,
        Some(pct) if pct < -threshold_pct => Direction::Down,
        Some(_) => Direction::Flat,
    }
}

/// Annotates every cell against the column before it in display order.
/// The first column has nothing to compare with and is always flat.
pub fn annotate_series(cells: &[f64]) -> Vec<Direction> {
    let mut directions = Vec::with_capacity(cells.len());
    if !cells.is_empty() {
        directions.push(Direction::Flat);
    }
    directions.extend(cells.windows(2).map(|pair| annotate(pair[1], pair[0])));
    directions
}
