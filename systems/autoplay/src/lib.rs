#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Autoplay mode state machine.
//!
//! The machine owns both selection policies and the weight vector they read.
//! Transitions run the exit hook of the old state before the enter hook of the
//! new one; the hooks emit the commands that hand the actor to or take it away
//! from the policies.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skirmish_core::{ArenaConfig, ArenaQuery, Command, ControlMode, SimTime, WeightVector};
use skirmish_system_action_selection::{RulePolicy, SelectionSettings, WeightedPolicy};
use tracing::{debug, info, warn};

const POLICY_STREAM: u64 = 0x9e37_79b9_7f4a_7c15;

/// Which policy currently owns the actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AutoplayState {
    /// External input drives the actor.
    #[default]
    Off,
    /// Priority-bucket policy.
    Rule,
    /// Weighted-scoring policy.
    Weighted,
}

impl AutoplayState {
    /// Control mode reported to the rest of the session.
    #[must_use]
    pub const fn control_mode(self) -> ControlMode {
        match self {
            Self::Off => ControlMode::Manual,
            Self::Rule => ControlMode::Rule,
            Self::Weighted => ControlMode::Weighted,
        }
    }
}

/// Time rate selector orthogonal to the state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AutoplaySpeed {
    /// Regular rate, used while autoplay is off.
    #[default]
    Off,
    /// Normal autoplay rate.
    Normal,
    /// Fast autoplay rate.
    Fast,
}

impl AutoplaySpeed {
    const fn next(self) -> Self {
        match self {
            Self::Off => Self::Normal,
            Self::Normal => Self::Fast,
            Self::Fast => Self::Off,
        }
    }
}

/// Result of a transition request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The machine was already in the requested state.
    Unchanged,
    /// Exit and enter hooks ran.
    Switched {
        /// State that was left.
        from: AutoplayState,
        /// State that was entered.
        to: AutoplayState,
    },
    /// The actor is defeated; nothing changed.
    Refused,
}

type Hook = fn(&mut Autoplay, &mut Vec<Command>);

struct StateHooks {
    enter: Hook,
    exit: Hook,
}

fn hooks(state: AutoplayState) -> StateHooks {
    match state {
        AutoplayState::Off => StateHooks {
            enter: Autoplay::idle,
            exit: Autoplay::idle,
        },
        AutoplayState::Rule => StateHooks {
            enter: Autoplay::enter_rule,
            exit: Autoplay::release_actor,
        },
        AutoplayState::Weighted => StateHooks {
            enter: Autoplay::enter_weighted,
            exit: Autoplay::release_actor,
        },
    }
}

/// Time rates applied per speed.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Rates {
    regular: f32,
    normal: f32,
    fast: f32,
}

/// Mode state machine and per-tick driver of the active policy.
#[derive(Debug)]
pub struct Autoplay {
    state: AutoplayState,
    speed: AutoplaySpeed,
    rule: RulePolicy,
    weighted: WeightedPolicy,
    weights: WeightVector,
    rule_reload_chance: f32,
    weighted_reload_chance: f32,
    rates: Rates,
    round_start: SimTime,
    finished: bool,
    rng: ChaCha8Rng,
}

impl Autoplay {
    /// Creates a machine in the `Off` state.
    #[must_use]
    pub fn new(config: &ArenaConfig) -> Self {
        let settings = SelectionSettings::from_config(config);
        Self {
            state: AutoplayState::Off,
            speed: AutoplaySpeed::Off,
            rule: RulePolicy::new(settings.clone()),
            weighted: WeightedPolicy::new(settings),
            weights: config.weights,
            rule_reload_chance: config.autoplay.rule_reload_chance,
            weighted_reload_chance: config.autoplay.weighted_reload_chance,
            rates: Rates {
                regular: config.autoplay.regular_speed,
                normal: config.autoplay.normal_speed,
                fast: config.autoplay.fast_speed,
            },
            round_start: SimTime::ZERO,
            finished: false,
            rng: ChaCha8Rng::seed_from_u64(config.seed ^ POLICY_STREAM),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AutoplayState {
        self.state
    }

    /// Current speed.
    #[must_use]
    pub fn speed(&self) -> AutoplaySpeed {
        self.speed
    }

    /// Control mode derived from the current state.
    #[must_use]
    pub fn control_mode(&self) -> ControlMode {
        self.state.control_mode()
    }

    /// Weights read by the weighted policy.
    #[must_use]
    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    /// Mutable access for the adaptation controller between rounds.
    pub fn weights_mut(&mut self) -> &mut WeightVector {
        &mut self.weights
    }

    /// Installs the baseline weights when none were configured.
    pub fn init_weights(&mut self) -> bool {
        let applied = self.weights.init_if_unset();
        if applied {
            info!(weights = ?self.weights, "weights initialized");
        }
        applied
    }

    /// Restarts the rule policy's opening window at `now`.
    pub fn restart_round(&mut self, now: SimTime) {
        self.round_start = now;
    }

    /// Start of the current opening window.
    #[must_use]
    pub fn round_start(&self) -> SimTime {
        self.round_start
    }

    /// Marks the benchmark run complete; the time rate drops to zero.
    pub fn set_finished(&mut self, finished: bool) {
        self.finished = finished;
    }

    /// Whether the benchmark run is complete.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Simulation rate multiplier for the current speed.
    #[must_use]
    pub fn time_scale(&self) -> f32 {
        if self.finished {
            return 0.0;
        }
        match self.speed {
            AutoplaySpeed::Off => self.rates.regular,
            AutoplaySpeed::Normal => self.rates.normal,
            AutoplaySpeed::Fast => self.rates.fast,
        }
    }

    /// Moves to `target`, running exit then enter hooks.
    ///
    /// A request for the current state is a no-op; a request while the actor
    /// is defeated is refused. Entering a policy from `Off` starts it at normal
    /// speed and entering `Off` stops it, so state and speed never disagree.
    pub fn switch(
        &mut self,
        target: AutoplayState,
        actor_alive: bool,
        out: &mut Vec<Command>,
    ) -> Transition {
        if target == self.state {
            return Transition::Unchanged;
        }
        if !actor_alive {
            warn!(from = ?self.state, to = ?target, "mode switch refused while actor is defeated");
            return Transition::Refused;
        }

        let from = self.state;
        (hooks(from).exit)(self, out);
        self.state = target;
        self.speed = match (target, self.speed) {
            (AutoplayState::Off, _) => AutoplaySpeed::Off,
            (_, AutoplaySpeed::Off) => AutoplaySpeed::Normal,
            (_, speed) => speed,
        };
        (hooks(target).enter)(self, out);
        info!(?from, to = ?target, "autoplay state changed");
        Transition::Switched { from, to: target }
    }

    /// Cycles the rule policy through off, normal and fast.
    pub fn toggle_rule(&mut self, actor_alive: bool, out: &mut Vec<Command>) -> Transition {
        self.toggle(AutoplayState::Rule, actor_alive, out)
    }

    /// Cycles the weighted policy through off, normal and fast.
    pub fn toggle_weighted(&mut self, actor_alive: bool, out: &mut Vec<Command>) -> Transition {
        self.toggle(AutoplayState::Weighted, actor_alive, out)
    }

    /// Hands the actor to the rule policy at fast speed.
    pub fn enable_rule(&mut self, actor_alive: bool, out: &mut Vec<Command>) -> Transition {
        self.enable(AutoplayState::Rule, actor_alive, out)
    }

    /// Hands the actor to the weighted policy at fast speed.
    pub fn enable_weighted(&mut self, actor_alive: bool, out: &mut Vec<Command>) -> Transition {
        self.enable(AutoplayState::Weighted, actor_alive, out)
    }

    /// Returns control to external input.
    pub fn disable(&mut self, actor_alive: bool, out: &mut Vec<Command>) -> Transition {
        let transition = self.switch(AutoplayState::Off, actor_alive, out);
        if transition != Transition::Refused {
            self.speed = AutoplaySpeed::Off;
        }
        transition
    }

    /// Runs the active policy for this tick.
    pub fn tick<Q>(&mut self, arena: &Q, out: &mut Vec<Command>)
    where
        Q: ArenaQuery + ?Sized,
    {
        if self.speed == AutoplaySpeed::Off || arena.actor().is_dead() {
            return;
        }
        match self.state {
            AutoplayState::Off => {}
            AutoplayState::Rule => {
                self.rule.decide(arena, self.round_start, &mut self.rng, out);
            }
            AutoplayState::Weighted => self.weighted.decide(arena, &self.weights, out),
        }
    }

    fn toggle(
        &mut self,
        target: AutoplayState,
        actor_alive: bool,
        out: &mut Vec<Command>,
    ) -> Transition {
        let speed = self.speed.next();
        let state = match speed {
            AutoplaySpeed::Off => AutoplayState::Off,
            AutoplaySpeed::Normal | AutoplaySpeed::Fast => target,
        };
        let transition = self.switch(state, actor_alive, out);
        if transition != Transition::Refused {
            self.speed = speed;
            debug!(?speed, ?state, "autoplay toggled");
        }
        transition
    }

    fn enable(
        &mut self,
        target: AutoplayState,
        actor_alive: bool,
        out: &mut Vec<Command>,
    ) -> Transition {
        let transition = self.switch(target, actor_alive, out);
        if transition != Transition::Refused {
            self.speed = AutoplaySpeed::Fast;
        }
        transition
    }

    fn enter_rule(&mut self, out: &mut Vec<Command>) {
        out.push(Command::SetAutonomousControl {
            enabled: true,
            perfect_reload_chance: self.rule_reload_chance,
        });
    }

    fn enter_weighted(&mut self, out: &mut Vec<Command>) {
        self.weighted.begin_session(&mut self.rng);
        out.push(Command::SetAutonomousControl {
            enabled: true,
            perfect_reload_chance: self.weighted_reload_chance,
        });
    }

    fn release_actor(&mut self, out: &mut Vec<Command>) {
        out.push(Command::SetAutonomousControl {
            enabled: false,
            perfect_reload_chance: 0.0,
        });
    }

    fn idle(&mut self, _out: &mut Vec<Command>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> Autoplay {
        Autoplay::new(&ArenaConfig::default())
    }

    #[test]
    fn toggle_cycles_off_normal_fast_off() {
        let mut autoplay = machine();
        let mut out = Vec::new();

        assert_eq!(
            autoplay.toggle_rule(true, &mut out),
            Transition::Switched {
                from: AutoplayState::Off,
                to: AutoplayState::Rule
            }
        );
        assert_eq!(autoplay.speed(), AutoplaySpeed::Normal);
        assert_eq!(
            out,
            vec![Command::SetAutonomousControl {
                enabled: true,
                perfect_reload_chance: 0.3
            }]
        );

        out.clear();
        assert_eq!(autoplay.toggle_rule(true, &mut out), Transition::Unchanged);
        assert_eq!(autoplay.speed(), AutoplaySpeed::Fast);
        assert!(out.is_empty());

        assert_eq!(
            autoplay.toggle_rule(true, &mut out),
            Transition::Switched {
                from: AutoplayState::Rule,
                to: AutoplayState::Off
            }
        );
        assert_eq!(autoplay.speed(), AutoplaySpeed::Off);
        assert_eq!(
            out,
            vec![Command::SetAutonomousControl {
                enabled: false,
                perfect_reload_chance: 0.0
            }]
        );
    }

    #[test]
    fn switching_policies_exits_before_entering() {
        let mut autoplay = machine();
        let mut out = Vec::new();
        let _ = autoplay.enable_rule(true, &mut out);
        out.clear();

        let transition = autoplay.enable_weighted(true, &mut out);
        assert_eq!(
            transition,
            Transition::Switched {
                from: AutoplayState::Rule,
                to: AutoplayState::Weighted
            }
        );
        assert_eq!(
            out,
            vec![
                Command::SetAutonomousControl {
                    enabled: false,
                    perfect_reload_chance: 0.0
                },
                Command::SetAutonomousControl {
                    enabled: true,
                    perfect_reload_chance: 0.6
                },
            ]
        );
        assert_eq!(autoplay.control_mode(), ControlMode::Weighted);
    }

    #[test]
    fn defeated_actor_cannot_change_mode() {
        let mut autoplay = machine();
        let mut out = Vec::new();

        assert_eq!(autoplay.toggle_weighted(false, &mut out), Transition::Refused);
        assert_eq!(autoplay.state(), AutoplayState::Off);
        assert_eq!(autoplay.speed(), AutoplaySpeed::Off);
        assert!(out.is_empty());
    }

    #[test]
    fn same_state_switch_is_a_no_op() {
        let mut autoplay = machine();
        let mut out = Vec::new();
        assert_eq!(
            autoplay.switch(AutoplayState::Off, false, &mut out),
            Transition::Unchanged
        );
        assert!(out.is_empty());
    }

    #[test]
    fn time_scale_follows_speed_and_finish() {
        let mut config = ArenaConfig::default();
        config.autoplay.regular_speed = 1.0;
        config.autoplay.normal_speed = 2.0;
        config.autoplay.fast_speed = 5.0;
        let mut autoplay = Autoplay::new(&config);
        let mut out = Vec::new();

        assert_eq!(autoplay.time_scale(), 1.0);
        let _ = autoplay.toggle_rule(true, &mut out);
        assert_eq!(autoplay.time_scale(), 2.0);
        let _ = autoplay.toggle_rule(true, &mut out);
        assert_eq!(autoplay.time_scale(), 5.0);

        autoplay.set_finished(true);
        assert_eq!(autoplay.time_scale(), 0.0);
    }

    #[test]
    fn init_weights_only_applies_to_untuned_vectors() {
        let mut autoplay = machine();
        assert!(autoplay.init_weights());
        assert_eq!(*autoplay.weights(), WeightVector::BASELINE);

        autoplay.weights_mut().melee = 120.0;
        assert!(!autoplay.init_weights());
        assert_eq!(autoplay.weights().melee, 120.0);
    }
}
