//! Lap statistics shared by seeding, standings and insights.

use std::collections::BTreeMap;

use crate::record::{Lap, Race};
use crate::types::PilotId;

/// A run of consecutive valid laps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LapWindow {
    /// Summed lap lengths of the window.
    pub sum: f64,
    /// Race time when the last lap of the window ended.
    pub race_time_at_end: Option<f64>,
}

impl LapWindow {
    /// Race time spent before the window started, if positive.
    ///
    /// Only defined when `0 < sum < race_time_at_end`.
    pub fn hole_shot(&self) -> Option<f64> {
        let end = self.race_time_at_end?;
        (self.sum > 0.0 && self.sum < end).then(|| end - self.sum)
    }
}

/// Valid laps of a race per pilot, each list in lap-number order.
pub fn valid_laps_by_pilot(race: &Race) -> BTreeMap<&PilotId, Vec<&Lap>> {
    let mut by_pilot: BTreeMap<&PilotId, Vec<&Lap>> = BTreeMap::new();
    for lap in race.laps.iter().filter(|l| l.is_valid()) {
        by_pilot.entry(&lap.pilot_id).or_default().push(lap);
    }
    for laps in by_pilot.values_mut() {
        laps.sort_by_key(|l| l.lap_number);
    }
    by_pilot
}

/// Every window of `size` consecutive laps.
pub fn windows<'a>(laps: &'a [&'a Lap], size: usize) -> impl Iterator<Item = LapWindow> + 'a {
    let size = size.max(1);
    laps.windows(size).map(|window| LapWindow {
        sum: window.iter().map(|l| l.length).sum(),
        race_time_at_end: window.last().and_then(|l| l.race_time),
    })
}

/// The window with the smallest sum. The earliest wins a tie.
pub fn best_window(laps: &[&Lap], size: usize) -> Option<LapWindow> {
    windows(laps, size).fold(None, |best: Option<LapWindow>, window| match best {
        Some(b) if b.sum <= window.sum => Some(b),
        _ => Some(window),
    })
}

/// The single fastest lap length.
pub fn fastest(laps: &[&Lap]) -> Option<f64> {
    laps.iter().map(|l| l.length).reduce(f64::min)
}

#[expect(clippy::cast_precision_loss, reason = "lap counts are small")]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Coefficient of variation as a percentage: population std-dev / mean × 100.
///
/// Needs at least two values.
#[expect(clippy::cast_precision_loss, reason = "lap counts are small")]
pub fn consistency(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    if avg <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt() / avg * 100.0)
}
