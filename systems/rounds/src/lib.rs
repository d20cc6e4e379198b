#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Round orchestration for Skirmish.
//!
//! A [`Session`] owns the arena, the telemetry aggregator and the autoplay
//! machine. It advances waves, counts benchmark rounds, books wins and losses
//! and hands the weighted policy's weights to the adaptation controller at
//! round boundaries.

mod progress;

use std::{collections::VecDeque, time::Duration};

use skirmish_core::{
    config::seconds, AiLabel, ArenaConfig, Command, ControlMode, EnemyId, Event, GameMode,
    RoundOutcome, SpawnLayout, WaveSets,
};
use skirmish_system_adaptation::adapt;
use skirmish_system_autoplay::{Autoplay, Transition};
use skirmish_system_telemetry::Telemetry;
use skirmish_system_timers::Stopwatch;
use skirmish_world::{apply, query, World};
use tracing::{debug, info, warn};

pub use progress::{Milestone, WaveProgress, WaveStart};

/// Result of one finished round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoundRecord {
    /// Game mode the round was played in.
    pub mode: GameMode,
    /// Index of the wave within the mode's list.
    pub wave: usize,
    /// Benchmark rounds already completed for the wave before this one.
    pub round: u32,
    /// Label of the controlling AI.
    pub ai: AiLabel,
    /// Whether the actor cleared the wave.
    pub outcome: RoundOutcome,
}

/// Arena plus the systems that drive it, advanced one tick at a time.
#[derive(Debug)]
pub struct Session {
    world: World,
    telemetry: Telemetry,
    autoplay: Autoplay,
    waves: WaveSets,
    layout: SpawnLayout,
    runs_per_wave: u32,
    progress: WaveProgress,
    run_clock: Stopwatch,
    round_clock: Stopwatch,
    spawn_queue: VecDeque<String>,
    active: Vec<EnemyId>,
    round_live: bool,
    records: Vec<RoundRecord>,
}

impl Session {
    /// Creates an idle session; call [`Session::switch_mode`] to start playing.
    #[must_use]
    pub fn new(config: &ArenaConfig, telemetry: Telemetry) -> Self {
        Self {
            world: World::new(config),
            telemetry,
            autoplay: Autoplay::new(config),
            waves: config.waves.clone(),
            layout: config.layout,
            runs_per_wave: config.telemetry_runs,
            progress: WaveProgress::new(&config.waves, GameMode::Normal, config.telemetry_runs),
            run_clock: Stopwatch::default(),
            round_clock: Stopwatch::default(),
            spawn_queue: VecDeque::new(),
            active: Vec::new(),
            round_live: false,
            records: Vec::new(),
        }
    }

    /// Arena being played.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Telemetry aggregator.
    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Mutable telemetry access, used to attach or flush sinks.
    pub fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }

    /// Autoplay machine.
    #[must_use]
    pub fn autoplay(&self) -> &Autoplay {
        &self.autoplay
    }

    /// Wave bookkeeping of the current mode.
    #[must_use]
    pub fn progress(&self) -> &WaveProgress {
        &self.progress
    }

    /// Rounds finished since the session was created.
    #[must_use]
    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// Spawn entries queued for the current round but not yet placed.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.spawn_queue.len()
    }

    /// Enemies of the current round that are still standing.
    #[must_use]
    pub fn active_enemies(&self) -> &[EnemyId] {
        &self.active
    }

    /// Whether the last wave of a run has been played.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.autoplay.is_finished()
    }

    /// Starts `mode` from its first wave, discarding the round in progress.
    ///
    /// The benchmark hands the actor to the rule policy at fast speed.
    pub fn switch_mode(&mut self, mode: GameMode) {
        info!(?mode, "game mode switched");
        let _ = self.execute(Command::ClearEnemies);
        self.active.clear();
        self.round_live = false;
        self.telemetry.reset();
        self.autoplay.set_finished(false);
        self.run_clock.restart(query::now(&self.world));
        self.progress = WaveProgress::new(&self.waves, mode, self.runs_per_wave);
        self.telemetry.write_round_header();
        let _ = self.execute(Command::ResetActor);

        if mode == GameMode::Telemetry {
            let mut commands = Vec::new();
            let _ = self.autoplay.enable_rule(self.actor_alive(), &mut commands);
            self.execute_all(commands);
        }

        self.start_next_wave();
    }

    /// Restarts the current mode from its first wave.
    pub fn restart(&mut self) {
        self.switch_mode(self.progress.mode());
    }

    /// Cycles the rule policy through off, normal and fast.
    pub fn toggle_rule(&mut self) -> Transition {
        let mut commands = Vec::new();
        let transition = self.autoplay.toggle_rule(self.actor_alive(), &mut commands);
        self.execute_all(commands);
        transition
    }

    /// Cycles the weighted policy through off, normal and fast.
    pub fn toggle_weighted(&mut self) -> Transition {
        let mut commands = Vec::new();
        let transition = self
            .autoplay
            .toggle_weighted(self.actor_alive(), &mut commands);
        self.execute_all(commands);
        transition
    }

    /// Applies an external command, such as manual input, and reacts to its events.
    pub fn submit(&mut self, command: Command) -> Vec<Event> {
        self.execute(command)
    }

    /// Advances the arena by `dt` scaled by the autoplay speed, then runs the active policy.
    pub fn tick(&mut self, dt: Duration) {
        if self.autoplay.is_finished() {
            return;
        }

        let scaled = seconds(dt.as_secs_f32() * self.autoplay.time_scale());
        let _ = self.execute(Command::Tick { dt: scaled });

        let mut commands = Vec::new();
        self.autoplay.tick(&self.world, &mut commands);
        self.execute_all(commands);
    }

    fn actor_alive(&self) -> bool {
        !query::actor(&self.world).is_dead()
    }

    fn execute_all(&mut self, commands: Vec<Command>) {
        for command in commands {
            let _ = self.execute(command);
        }
    }

    fn execute(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        apply(&mut self.world, command, &mut events);
        self.telemetry.handle(&events);

        for event in &events {
            let resolved = match event {
                Event::EnemyDefeated { enemy } => self.enemy_defeated(*enemy),
                Event::ActorDefeated => self.actor_defeated(),
                _ => false,
            };
            if resolved {
                break;
            }
        }
        events
    }

    fn start_next_wave(&mut self) {
        let Some(start) = self.progress.begin() else {
            self.flush_run();
            self.finish();
            return;
        };

        if start.fresh {
            let _ = self.execute(Command::ClearEnemies);
        } else {
            for enemy in query::enemies(&self.world) {
                let _ = self.execute(Command::DespawnEnemy { enemy: enemy.id });
            }
        }
        self.active.clear();

        let now = query::now(&self.world);
        self.round_clock.restart(now);
        self.autoplay.restart_round(now);

        let ai = self.progress.ai_label();
        if self.progress.at_midpoint() {
            let _ = self.autoplay.init_weights();
        }
        self.telemetry.set_wave(ai, &start.definition);
        info!(
            wave = self.progress.wave_index(),
            round = self.progress.round(),
            ai = ai.as_str(),
            composition = %start.definition.composition_label(),
            "wave started"
        );

        self.spawn_queue.clear();
        self.spawn_queue
            .extend(start.definition.spawn_order().map(str::to_owned));
        debug!(queued = self.spawn_queue.len(), "spawn queue filled");

        let mut index = 0;
        while let Some(template) = self.spawn_queue.pop_front() {
            let position = self.layout.position(index);
            index += 1;
            let events = self.execute(Command::SpawnEnemy { template, position });
            self.active
                .extend(events.iter().filter_map(|event| match event {
                    Event::EnemySpawned { enemy, .. } => Some(*enemy),
                    _ => None,
                }));
        }

        self.round_live = true;
        if self.active.is_empty() {
            warn!(wave = self.progress.wave_index(), "wave spawned no enemies");
            self.resolve_round(RoundOutcome::Win);
        }
    }

    fn enemy_defeated(&mut self, enemy: EnemyId) -> bool {
        if !self.round_live {
            return false;
        }
        let Some(index) = self.active.iter().position(|id| *id == enemy) else {
            return false;
        };
        let _ = self.active.remove(index);
        debug!(%enemy, remaining = self.active.len(), "enemy defeated");
        if !self.active.is_empty() {
            return false;
        }

        if self.progress.is_benchmark() {
            self.record_health();
        }
        self.resolve_round(RoundOutcome::Win);
        true
    }

    fn actor_defeated(&mut self) -> bool {
        if !self.round_live {
            return false;
        }
        self.record_health();
        self.resolve_round(RoundOutcome::Loss);
        true
    }

    fn record_health(&mut self) {
        let actor = query::actor(&self.world);
        let enemies = query::enemies(&self.world);
        self.telemetry.record_health(&actor, &enemies);
    }

    fn resolve_round(&mut self, outcome: RoundOutcome) {
        self.round_live = false;
        self.telemetry.record_outcome(outcome);
        self.telemetry
            .set_round_time(self.round_clock.elapsed(query::now(&self.world)));
        self.records.push(RoundRecord {
            mode: self.progress.mode(),
            wave: self.progress.wave_index(),
            round: self.progress.round(),
            ai: self.progress.ai_label(),
            outcome,
        });
        info!(
            wave = self.progress.wave_index(),
            round = self.progress.round(),
            ?outcome,
            "round finished"
        );

        if self.progress.is_benchmark() {
            let wave_done = self.progress.complete_round();
            if self.autoplay.control_mode() == ControlMode::Weighted {
                let stats = self.telemetry.round_stats();
                let _ = adapt(self.autoplay.weights_mut(), &stats);
            }
            let _ = self.execute(Command::ResetActor);
            if wave_done {
                self.wave_reset();
            } else {
                self.start_next_wave();
            }
            return;
        }

        let _ = self.telemetry.flush_round(None);
        let _ = self.execute(Command::ResetActor);
        if outcome == RoundOutcome::Win {
            let _ = self.progress.advance();
        }
        self.start_next_wave();
    }

    fn wave_reset(&mut self) {
        let _ = self
            .telemetry
            .flush_round(Some(self.progress.runs_per_wave()));

        match self.progress.advance() {
            Milestone::Continue => {}
            Milestone::Midpoint => {
                self.flush_run();
                let mut commands = Vec::new();
                let _ = self
                    .autoplay
                    .enable_weighted(self.actor_alive(), &mut commands);
                self.execute_all(commands);
                self.run_clock.restart(query::now(&self.world));
            }
            Milestone::Finished => {
                self.flush_run();
                self.finish();
                return;
            }
        }
        self.start_next_wave();
    }

    fn flush_run(&mut self) {
        let total = self.run_clock.elapsed(query::now(&self.world));
        let _ = self.telemetry.flush_run(total);
    }

    fn finish(&mut self) {
        let _ = self.execute(Command::ClearEnemies);
        self.active.clear();
        self.round_live = false;
        self.autoplay.set_finished(true);
        info!(mode = ?self.progress.mode(), rounds = self.records.len(), "run finished");
    }
}
