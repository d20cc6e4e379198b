#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Proportional weight adaptation for the weighted policy.
//!
//! Between benchmark rounds each adaptable weight is nudged against fixed
//! damage-per-use and usage-share thresholds, clamped, and the four weights are
//! rescaled to a constant budget. The controller keeps no memory beyond the
//! weight vector itself.

use skirmish_core::{ActionCategory, WeightVector};
use skirmish_system_telemetry::RoundStats;
use tracing::{debug, info};

/// Sum of the four adaptable weights after every pass.
pub const WEIGHT_BUDGET: f32 = 300.0;
/// Lower clamp applied before renormalization.
pub const MIN_WEIGHT: f32 = 10.0;
/// Upper clamp applied before renormalization.
pub const MAX_WEIGHT: f32 = 300.0;
/// Magnitude of a single nudge.
pub const STEP: f32 = 15.0;

const EFFECTIVE_DAMAGE_PER_USE: f32 = 20.0;
const INEFFECTIVE_DAMAGE_PER_USE: f32 = 10.0;
const RARE_USAGE_PERCENT: f32 = 20.0;
const HEAVY_USAGE_PERCENT: f32 = 50.0;

/// Nudge for one category given its damage per use and usage share.
///
/// Effective but rarely used abilities gain [`STEP`]; ineffective but heavily
/// used abilities lose it.
#[must_use]
pub fn nudge(damage_per_use: f32, usage_percent: f32) -> f32 {
    if damage_per_use > EFFECTIVE_DAMAGE_PER_USE && usage_percent < RARE_USAGE_PERCENT {
        STEP
    } else if damage_per_use < INEFFECTIVE_DAMAGE_PER_USE && usage_percent > HEAVY_USAGE_PERCENT {
        -STEP
    } else {
        0.0
    }
}

/// Applies one nudge, rounds to a whole weight and clamps to [`MIN_WEIGHT`, `MAX_WEIGHT`].
#[must_use]
pub fn clamp_step(weight: f32, adjustment: f32) -> f32 {
    (weight + adjustment).round().clamp(MIN_WEIGHT, MAX_WEIGHT)
}

/// Adjusts and clamps each adaptable weight, then rescales them to [`WEIGHT_BUDGET`].
///
/// Returns `false` when the clamped weights summed to zero and rescaling was skipped.
pub fn adapt(weights: &mut WeightVector, stats: &RoundStats) -> bool {
    for category in ActionCategory::ADAPTABLE {
        let adjustment = nudge(stats.damage_per_use(category), stats.usage_percent(category));
        let adjusted = clamp_step(weights.get(category), adjustment);
        debug!(%category, adjustment, adjusted, "weight nudged");
        weights.set(category, adjusted);
    }

    let renormalized = renormalize(weights);
    info!(
        melee = weights.melee,
        ranged = weights.ranged,
        reload = weights.reload,
        aoe = weights.aoe,
        "weights adapted"
    );
    renormalized
}

/// Scales the four adaptable weights so they sum to [`WEIGHT_BUDGET`]; the finisher is untouched.
///
/// A zero sum is left as is and reported with `false`.
pub fn renormalize(weights: &mut WeightVector) -> bool {
    let sum = weights.adaptable_sum();
    if sum == 0.0 {
        return false;
    }
    let scale = WEIGHT_BUDGET / sum;
    for category in ActionCategory::ADAPTABLE {
        weights.set(category, weights.get(category) * scale);
    }
    true
}
