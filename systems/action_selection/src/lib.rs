#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-tick action selection for the autonomous actor.
//!
//! Two policies read the arena through [`ArenaQuery`] and emit at most one
//! ability request plus one movement command per tick:
//!
//! * [`RulePolicy`] sorts eligible abilities into priority buckets and picks
//!   uniformly inside the best non-empty bucket.
//! * [`WeightedPolicy`] multiplies configured weights by situational factors
//!   and executes the highest score.

use std::{ops::Range, time::Duration};

use rand::Rng;
use skirmish_core::{
    config::seconds, ActionCategory, ArenaConfig, ArenaQuery, Command, ControlSource, SimTime,
    WeightScales, WeightVector,
};
use tracing::debug;

const RANGED_DISTANCE_FACTOR: f32 = 0.75;
const MELEE_PROXIMITY_FACTOR: f32 = 1.25;

/// Ranges and tuning shared by both policies.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionSettings {
    /// Half-width of the melee detection box.
    pub melee_range: f32,
    /// Half-width of the ranged detection box.
    pub ranged_range: f32,
    /// Portion of a round during which the rule policy only advances.
    pub opening_window: Duration,
    /// Situational multipliers of the weighted policy.
    pub scales: WeightScales,
    /// Range the weighted policy draws its opening-shot threshold from.
    pub opening_shots: Range<u32>,
}

impl SelectionSettings {
    /// Extracts the selection settings from an arena configuration.
    #[must_use]
    pub fn from_config(config: &ArenaConfig) -> Self {
        Self {
            melee_range: config.player.melee_range,
            ranged_range: config.player.ranged_range,
            opening_window: seconds(config.autoplay.movement_duration),
            scales: config.weight_scales,
            opening_shots: config.autoplay.opening_shots_min..config.autoplay.opening_shots_max,
        }
    }
}

/// Eligible ability together with its weighted score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionCandidate {
    /// Ability to request.
    pub category: ActionCategory,
    /// Weight after situational multipliers.
    pub score: f32,
}

/// Priority-bucket policy with a seeded tie-break inside the winning bucket.
#[derive(Clone, Debug)]
pub struct RulePolicy {
    settings: SelectionSettings,
}

impl RulePolicy {
    /// Creates the policy.
    #[must_use]
    pub fn new(settings: SelectionSettings) -> Self {
        Self { settings }
    }

    /// Emits the commands for this tick.
    ///
    /// `round_start` anchors the opening window in which the actor only
    /// advances toward the nearest enemy.
    pub fn decide<Q, R>(&self, arena: &Q, round_start: SimTime, rng: &mut R, out: &mut Vec<Command>)
    where
        Q: ArenaQuery + ?Sized,
        R: Rng + ?Sized,
    {
        let contact = arena.contact_occupied();
        let in_opening = arena.now().saturating_since(round_start) < self.settings.opening_window;
        if !contact && in_opening {
            approach_nearest(arena, out);
            return;
        }

        let buckets = self.buckets(arena);
        let Some(bucket) = buckets.iter().find(|bucket| !bucket.is_empty()) else {
            approach_or_hold(arena, contact, out);
            return;
        };

        let category = bucket[rng.gen_range(0..bucket.len())];
        debug!(%category, options = bucket.len(), "rule policy selected ability");
        out.push(autonomous(category));
    }

    /// Eligible abilities in high, mid and low priority order.
    #[must_use]
    pub fn buckets<Q>(&self, arena: &Q) -> [Vec<ActionCategory>; 3]
    where
        Q: ArenaQuery + ?Sized,
    {
        let origin = arena.actor().position;
        let melee_targets = !arena
            .detect_in_range(origin, self.settings.melee_range)
            .is_empty();
        let ranged_targets = !arena
            .detect_in_range(origin, self.settings.ranged_range)
            .is_empty();
        let ready = |category: ActionCategory| !arena.cooldown_active(category.cooldown_key());

        let mut high = Vec::new();
        let mut mid = Vec::new();
        let mut low = Vec::new();
        if melee_targets && ready(ActionCategory::Melee) {
            high.push(ActionCategory::Melee);
        }
        if melee_targets && ready(ActionCategory::Aoe) {
            mid.push(ActionCategory::Aoe);
        }
        if ranged_targets && ready(ActionCategory::Ranged) {
            low.push(ActionCategory::Ranged);
        }
        if ready(ActionCategory::Reload) {
            low.push(ActionCategory::Reload);
        }
        [high, mid, low]
    }
}

/// Weighted-scoring policy with per-session opening-shot tracking.
#[derive(Clone, Debug)]
pub struct WeightedPolicy {
    settings: SelectionSettings,
    shots_fired: u32,
    opening_shots: u32,
}

impl WeightedPolicy {
    /// Creates the policy; call [`WeightedPolicy::begin_session`] before the first decision.
    #[must_use]
    pub fn new(settings: SelectionSettings) -> Self {
        let opening_shots = settings.opening_shots.start;
        Self {
            settings,
            shots_fired: 0,
            opening_shots,
        }
    }

    /// Resets the shot counter and draws a fresh opening-shot threshold.
    pub fn begin_session<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.shots_fired = 0;
        let range = self.settings.opening_shots.clone();
        self.opening_shots = if range.is_empty() {
            range.start
        } else {
            rng.gen_range(range)
        };
        debug!(opening_shots = self.opening_shots, "weighted session started");
    }

    /// Shots requested since the session began.
    #[must_use]
    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    /// Shots required before the policy starts advancing.
    #[must_use]
    pub fn opening_shots(&self) -> u32 {
        self.opening_shots
    }

    /// Emits the commands for this tick.
    pub fn decide<Q>(&mut self, arena: &Q, weights: &WeightVector, out: &mut Vec<Command>)
    where
        Q: ArenaQuery + ?Sized,
    {
        let alive = arena.alive_enemies();
        if alive.is_empty() {
            out.push(Command::HoldPosition);
            return;
        }

        let contact = arena.contact_occupied();
        let best = self
            .candidates(arena, weights)
            .into_iter()
            .max_by(|a, b| {
                a.score
                    .total_cmp(&b.score)
                    .then(b.category.tie_rank().cmp(&a.category.tie_rank()))
            });

        let Some(best) = best else {
            approach_or_hold(arena, contact, out);
            return;
        };

        debug!(category = %best.category, score = best.score, "weighted policy selected ability");
        out.push(autonomous(best.category));
        if best.category == ActionCategory::Ranged {
            self.shots_fired = self.shots_fired.saturating_add(1);
        }

        if !contact && self.shots_fired >= self.opening_shots {
            approach_nearest(arena, out);
        }
    }

    /// Eligible abilities with their situational scores, in evaluation order.
    #[must_use]
    pub fn candidates<Q>(&self, arena: &Q, weights: &WeightVector) -> Vec<ActionCandidate>
    where
        Q: ArenaQuery + ?Sized,
    {
        let actor = arena.actor();
        let alive = arena.alive_enemies();
        let Some(nearest) = arena.nearest_alive(actor.position, &alive) else {
            return Vec::new();
        };
        let scales = self.settings.scales;

        let mut melee = weights.melee;
        let mut ranged = weights.ranged;
        let mut reload = weights.reload;
        let mut aoe = weights.aoe;
        if actor.position.distance(nearest.position) > self.settings.melee_range {
            ranged *= scales.ranged * RANGED_DISTANCE_FACTOR;
        } else {
            melee *= scales.melee * MELEE_PROXIMITY_FACTOR;
        }
        aoe *= scales.aoe;
        if actor.ammo <= 1 {
            reload *= scales.reload;
        }

        let melee_targets = !arena
            .detect_in_range(actor.position, self.settings.melee_range)
            .is_empty();
        let ranged_targets = !arena
            .detect_in_range(actor.position, self.settings.ranged_range)
            .is_empty();
        let cooling = |category: ActionCategory| arena.cooldown_active(category.cooldown_key());

        let mut candidates = Vec::new();
        if melee_targets && !cooling(ActionCategory::Melee) {
            candidates.push(ActionCandidate {
                category: ActionCategory::Melee,
                score: melee,
            });
        }
        if melee_targets && !cooling(ActionCategory::Aoe) {
            candidates.push(ActionCandidate {
                category: ActionCategory::Aoe,
                score: aoe,
            });
        }
        if ranged_targets && !cooling(ActionCategory::Ranged) && actor.ammo > 0 {
            candidates.push(ActionCandidate {
                category: ActionCategory::Ranged,
                score: ranged,
            });
        }
        if actor.ammo <= 2
            && !cooling(ActionCategory::Reload)
            && (cooling(ActionCategory::Ranged) || actor.ammo == 0)
        {
            candidates.push(ActionCandidate {
                category: ActionCategory::Reload,
                score: reload,
            });
        }
        candidates
    }
}

fn autonomous(category: ActionCategory) -> Command {
    Command::UseAbility {
        category,
        source: ControlSource::Autonomous,
    }
}

fn approach_nearest<Q>(arena: &Q, out: &mut Vec<Command>)
where
    Q: ArenaQuery + ?Sized,
{
    let origin = arena.actor().position;
    match arena.nearest_alive(origin, &arena.alive_enemies()) {
        Some(target) => out.push(Command::MoveToward { enemy: target.id }),
        None => out.push(Command::HoldPosition),
    }
}

fn approach_or_hold<Q>(arena: &Q, contact: bool, out: &mut Vec<Command>)
where
    Q: ArenaQuery + ?Sized,
{
    if contact {
        out.push(Command::HoldPosition);
    } else {
        approach_nearest(arena, out);
    }
}
