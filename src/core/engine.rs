//! Recipe engine: distributes the total volume across ingredients.
//!
//! Liquids without a finite amount split whatever volume is left after the
//! percentage liquids and the solids' displacement are accounted for.
//! Displacement only feeds that remainder; a solid's own row is simply
//! concentration × total volume.

use super::precision::display_amount;
use super::types::{Liquid, RecipeState};
use serde::Serialize;
use std::fmt;

/// Which block of the output a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineGroup {
    /// Liquid with no amount; receives a share of the remainder.
    Fill,
    /// Liquid given as a percentage of total volume.
    Percentage,
    Solid,
}

/// One row of computed output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeLine {
    pub name: String,
    pub amount: f64,
    pub units: String,
    pub group: LineGroup,
}

impl RecipeLine {
    /// Amount rounded to four significant digits.
    pub fn display_amount(&self) -> String {
        display_amount(self.amount)
    }
}

impl fmt::Display for RecipeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.name, self.display_amount(), self.units)
    }
}

/// Intermediate volumes, exposed for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VolumeBreakdown {
    pub solids_displacement: f64,
    pub percentage_volume: f64,
    pub remainder: f64,
    pub fill_count: usize,
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Unset solid fields propagate as NaN.
fn or_nan(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

fn total_volume(state: &RecipeState) -> Option<f64> {
    if state.liquids.is_empty() || state.solids.is_empty() {
        return None;
    }
    finite(state.total_volume)
}

/// Split liquids into (fill, percentage) groups, keeping insertion order.
fn partition_liquids(state: &RecipeState) -> (Vec<&Liquid>, Vec<(&Liquid, f64)>) {
    let mut fill = Vec::new();
    let mut percentage = Vec::new();
    for liquid in state.liquids.values() {
        match finite(liquid.amount) {
            Some(pct) => percentage.push((liquid, pct)),
            None => fill.push(liquid),
        }
    }
    (fill, percentage)
}

/// Intermediate volumes, or `None` when the recipe produces no output.
pub fn breakdown(state: &RecipeState) -> Option<VolumeBreakdown> {
    let volume = total_volume(state)?;
    let (fill, percentage) = partition_liquids(state);
    Some(breakdown_parts(state, volume, fill.len(), &percentage))
}

fn breakdown_parts(
    state: &RecipeState,
    volume: f64,
    fill_count: usize,
    percentage: &[(&Liquid, f64)],
) -> VolumeBreakdown {
    let solids_displacement: f64 = state
        .solids
        .values()
        .map(|s| or_nan(s.amount) * volume * or_nan(s.displacement))
        .sum();
    let percentage_volume: f64 = percentage.iter().map(|(_, pct)| (pct / 100.0) * volume).sum();
    let remainder = volume - (solids_displacement + percentage_volume);

    VolumeBreakdown {
        solids_displacement,
        percentage_volume,
        remainder,
        fill_count,
    }
}

/// Compute the dispensed amount of every ingredient.
///
/// Empty when the total volume is unset or either ingredient list is empty.
/// Rows are ordered: fill liquids, percentage liquids, solids; each block in
/// insertion order.
pub fn compute_recipe(state: &RecipeState) -> Vec<RecipeLine> {
    let Some(volume) = total_volume(state) else {
        return Vec::new();
    };

    let (fill, percentage) = partition_liquids(state);
    let parts = breakdown_parts(state, volume, fill.len(), &percentage);

    let mut lines = Vec::with_capacity(state.liquids.len() + state.solids.len());

    let share = parts.remainder / fill.len() as f64;
    for liquid in &fill {
        lines.push(RecipeLine {
            name: liquid.name.clone(),
            amount: share,
            units: state.volume_units.clone(),
            group: LineGroup::Fill,
        });
    }

    for (liquid, pct) in &percentage {
        lines.push(RecipeLine {
            name: liquid.name.clone(),
            amount: volume * (pct / 100.0),
            units: state.volume_units.clone(),
            group: LineGroup::Percentage,
        });
    }

    for solid in state.solids.values() {
        lines.push(RecipeLine {
            name: solid.name.clone(),
            amount: volume * or_nan(solid.amount),
            units: state.mass_units.clone(),
            group: LineGroup::Solid,
        });
    }

    tracing::debug!(
        rows = lines.len(),
        remainder = parts.remainder,
        fill = parts.fill_count,
        "recipe computed"
    );
    lines
}
