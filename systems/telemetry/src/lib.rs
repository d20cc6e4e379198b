#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Telemetry aggregator that turns arena events into round and run rows.
//!
//! The aggregator is owned by the round orchestrator and passed around by
//! reference. Ability usage and damage arrive through [`Telemetry::handle`];
//! outcomes, health percentages and round timing are recorded explicitly at
//! round boundaries.

use std::{io, time::Duration};

use skirmish_core::{
    ActionCategory, ActorSnapshot, AiLabel, EnemySnapshot, Event, RoundOutcome, WaveDefinition,
};
use tracing::{info, warn};

mod rows;

pub use rows::{RoundRow, RowSink, RunRow, WriterSink, ROUND_HEADER, RUN_HEADER};

/// Per-round ability counters read by the weight adaptation controller.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RoundStats {
    uses: [u32; 5],
    damage: [f32; 5],
}

impl RoundStats {
    /// Returns a copy with `category` set to the provided use count and damage.
    #[must_use]
    pub fn with_usage(mut self, category: ActionCategory, uses: u32, damage: f32) -> Self {
        self.uses[slot(category)] = uses;
        self.damage[slot(category)] = damage;
        self
    }

    /// Number of times `category` was performed.
    #[must_use]
    pub fn uses(&self, category: ActionCategory) -> u32 {
        self.uses[slot(category)]
    }

    /// Damage dealt by `category`.
    #[must_use]
    pub fn damage(&self, category: ActionCategory) -> f32 {
        self.damage[slot(category)]
    }

    /// Abilities performed across every category.
    #[must_use]
    pub fn total_uses(&self) -> u32 {
        self.uses.iter().sum()
    }

    /// Share of all uses that went to `category`, in percent; zero when nothing was used.
    #[must_use]
    pub fn usage_percent(&self, category: ActionCategory) -> f32 {
        let total = self.total_uses();
        if total == 0 {
            return 0.0;
        }
        self.uses(category) as f32 / total as f32 * 100.0
    }

    /// Damage per use of `category`; zero when unused.
    #[must_use]
    pub fn damage_per_use(&self, category: ActionCategory) -> f32 {
        match self.uses(category) {
            0 => 0.0,
            uses => self.damage(category) / uses as f32,
        }
    }

    fn record_use(&mut self, category: ActionCategory) {
        self.uses[slot(category)] = self.uses[slot(category)].saturating_add(1);
    }

    fn record_damage(&mut self, category: ActionCategory, amount: f32) {
        self.damage[slot(category)] += amount;
    }
}

fn slot(category: ActionCategory) -> usize {
    match category {
        ActionCategory::Melee => 0,
        ActionCategory::Ranged => 1,
        ActionCategory::Aoe => 2,
        ActionCategory::Reload => 3,
        ActionCategory::Finisher => 4,
    }
}

/// Accumulates counters between flushes and writes rows to an optional sink.
#[derive(Default)]
pub struct Telemetry {
    sink: Option<Box<dyn RowSink>>,
    sink_error: Option<io::Error>,
    ai: AiLabel,
    category: String,
    composition: String,
    round: RoundStats,
    player_health_percent: f32,
    enemy_health_percent: f32,
    wins: u32,
    losses: u32,
    round_time: Duration,
    run: RunTotals,
    baseline_ratings: Vec<f32>,
    compared_rows: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct RunTotals {
    wins: u32,
    losses: u32,
    damage: [f32; 5],
    perfect_reloads: u32,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("sink_attached", &self.sink.is_some())
            .field("ai", &self.ai)
            .field("round", &self.round)
            .field("wins", &self.wins)
            .field("losses", &self.losses)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl Telemetry {
    /// Creates an aggregator without a sink; flushes still compute rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an aggregator that writes every row to `sink`.
    #[must_use]
    pub fn with_sink(sink: Box<dyn RowSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Replaces the current sink.
    pub fn attach_sink(&mut self, sink: Box<dyn RowSink>) {
        self.sink = Some(sink);
    }

    /// Consumes arena events and counts ability usage, damage and perfect reloads.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AbilityUsed { category } => self.record_use(*category),
                Event::DamageDealt {
                    category, amount, ..
                } => self.record_damage(*category, *amount),
                Event::PerfectReloadConsumed => {
                    self.run.perfect_reloads = self.run.perfect_reloads.saturating_add(1);
                }
                _ => {}
            }
        }
    }

    /// Counts one use of `category`.
    pub fn record_use(&mut self, category: ActionCategory) {
        self.round.record_use(category);
    }

    /// Adds damage dealt by `category` to the round and run totals.
    pub fn record_damage(&mut self, category: ActionCategory, amount: f32) {
        self.round.record_damage(category, amount);
        self.run.damage[slot(category)] += amount;
    }

    /// Counts a won or lost round.
    pub fn record_outcome(&mut self, outcome: RoundOutcome) {
        match outcome {
            RoundOutcome::Win => {
                self.wins = self.wins.saturating_add(1);
                self.run.wins = self.run.wins.saturating_add(1);
            }
            RoundOutcome::Loss => {
                self.losses = self.losses.saturating_add(1);
                self.run.losses = self.run.losses.saturating_add(1);
            }
        }
    }

    /// Adds the actor's and the round enemies' remaining health percentages.
    pub fn record_health(&mut self, actor: &ActorSnapshot, enemies: &[EnemySnapshot]) {
        if actor.max_health > 0.0 {
            self.player_health_percent += actor.health.max(0.0) / actor.max_health * 100.0;
        }

        let (remaining, total) = enemies.iter().fold((0.0, 0.0), |(remaining, total), enemy| {
            (remaining + enemy.health.max(0.0), total + enemy.max_health)
        });
        if total > 0.0 {
            self.enemy_health_percent += remaining / total * 100.0;
        }
    }

    /// Stores the duration of the round that just ended.
    pub fn set_round_time(&mut self, elapsed: Duration) {
        self.round_time = elapsed;
    }

    /// Labels the rows that follow with the controlling AI and the wave's columns.
    pub fn set_wave(&mut self, ai: AiLabel, wave: &WaveDefinition) {
        self.ai = ai;
        self.category = wave.category_label().to_owned();
        self.composition = wave.composition_label();
    }

    /// Label of the rows currently being aggregated.
    #[must_use]
    pub fn ai(&self) -> AiLabel {
        self.ai
    }

    /// Counters of the round currently being aggregated.
    #[must_use]
    pub fn round_stats(&self) -> RoundStats {
        self.round
    }

    /// Rounds won since the last round flush.
    #[must_use]
    pub fn wins(&self) -> u32 {
        self.wins
    }

    /// Rounds lost since the last round flush.
    #[must_use]
    pub fn losses(&self) -> u32 {
        self.losses
    }

    /// Writes the round-row header.
    pub fn write_round_header(&mut self) {
        self.emit(ROUND_HEADER);
    }

    /// Builds, writes and returns the round row, then zeroes the round counters.
    ///
    /// `benchmark_rounds` carries the benchmark round count; the rating is
    /// averaged over it and win percentage uses it as the denominator. Outside
    /// the benchmark the rating is the raw health difference and the
    /// denominator is wins plus losses.
    pub fn flush_round(&mut self, benchmark_rounds: Option<u32>) -> RoundRow {
        let health_rating = self.player_health_percent - self.enemy_health_percent;
        let (rating, rounds) = match benchmark_rounds {
            Some(rounds) => (health_rating / rounds.max(1) as f32, rounds),
            None => (health_rating, self.wins.saturating_add(self.losses)),
        };

        let rating_delta = match self.ai {
            AiLabel::Random => {
                self.baseline_ratings.push(rating);
                0.0
            }
            AiLabel::Smart => {
                let baseline = self.baseline_ratings.get(self.compared_rows).copied();
                self.compared_rows += 1;
                baseline.map_or(0.0, |baseline| rating - baseline)
            }
            AiLabel::Manual => 0.0,
        };

        let win_percent = if rounds > 0 {
            self.wins as f32 / rounds as f32 * 100.0
        } else {
            0.0
        };

        let row = RoundRow {
            ai: self.ai.as_str().to_owned(),
            category: self.category.clone(),
            composition: self.composition.clone(),
            rating,
            rating_delta,
            wins: self.wins,
            losses: self.losses,
            win_percent,
            round_time: self.round_time.as_secs_f32(),
            usage: [
                self.round.usage_percent(ActionCategory::Melee),
                self.round.usage_percent(ActionCategory::Ranged),
                self.round.usage_percent(ActionCategory::Reload),
                self.round.usage_percent(ActionCategory::Aoe),
            ],
        };

        info!(
            ai = row.ai.as_str(),
            composition = row.composition.as_str(),
            rating = row.rating,
            wins = row.wins,
            losses = row.losses,
            "wave telemetry flushed"
        );
        self.emit(&row.to_string());
        self.reset_round_counts();
        row
    }

    /// Builds, writes and returns the run summary, then zeroes the run totals.
    pub fn flush_run(&mut self, total_time: Duration) -> RunRow {
        let melee_damage = self.run.damage[slot(ActionCategory::Melee)];
        let ranged_damage = self.run.damage[slot(ActionCategory::Ranged)];
        let aoe_damage = self.run.damage[slot(ActionCategory::Aoe)];
        let total_damage = melee_damage + ranged_damage + aoe_damage;
        let seconds = total_time.as_secs_f32();
        let damage_per_second = if seconds > 0.0 {
            total_damage / seconds
        } else {
            0.0
        };

        let row = RunRow {
            rounds: self.run.wins.saturating_add(self.run.losses),
            wins: self.run.wins,
            losses: self.run.losses,
            total_time: seconds,
            damage_per_second,
            total_damage,
            melee_damage,
            ranged_damage,
            aoe_damage,
            perfect_reloads: self.run.perfect_reloads,
        };

        info!(
            rounds = row.rounds,
            wins = row.wins,
            losses = row.losses,
            dps = row.damage_per_second,
            "run summary flushed"
        );
        self.emit(RUN_HEADER);
        self.emit(&row.to_string());
        self.run = RunTotals::default();
        row
    }

    /// Zeroes the round counters without writing a row.
    pub fn reset_round_counts(&mut self) {
        self.round = RoundStats::default();
        self.player_health_percent = 0.0;
        self.enemy_health_percent = 0.0;
        self.wins = 0;
        self.losses = 0;
    }

    /// Zeroes every counter and forgets baseline ratings; the sink stays attached.
    pub fn reset(&mut self) {
        self.reset_round_counts();
        self.round_time = Duration::ZERO;
        self.run = RunTotals::default();
        self.baseline_ratings.clear();
        self.compared_rows = 0;
    }

    /// Flushes the sink and reports the first write failure, if any.
    pub fn flush_sink(&mut self) -> io::Result<()> {
        if let Some(error) = self.sink_error.take() {
            return Err(error);
        }
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    fn emit(&mut self, line: &str) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        if let Err(error) = sink.append_row(line) {
            warn!(%error, "telemetry sink rejected a row");
            if self.sink_error.is_none() {
                self.sink_error = Some(error);
            }
        }
    }
}
