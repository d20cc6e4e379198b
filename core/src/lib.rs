#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish combat engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative arena, and pure systems. Systems submit [`Command`] values
//! describing desired mutations, the arena executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for the telemetry
//! and round systems to react to deterministically. Decision systems never
//! touch the arena directly; they read it through the [`ArenaQuery`] trait.

use std::{fmt, ops::Add, time::Duration};

use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{
    ArenaConfig, AutoplayConfig, ConfigError, EnemyTemplate, PlayerConfig, SpawnLayout,
    WaveSets, WeightScales,
};
pub use glam::Vec2;

/// Monotonic simulation timestamp measured from the start of the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(Duration);

impl SimTime {
    /// Timestamp at the very start of the session.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Creates a timestamp from an elapsed duration.
    #[must_use]
    pub const fn from_duration(elapsed: Duration) -> Self {
        Self(elapsed)
    }

    /// Creates a timestamp from fractional seconds. Negative values clamp to zero.
    #[must_use]
    pub fn from_secs_f64(seconds: f64) -> Self {
        Self(Duration::from_secs_f64(seconds.max(0.0)))
    }

    /// Elapsed duration since the start of the session.
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Elapsed seconds since the start of the session.
    #[must_use]
    pub fn as_secs_f32(&self) -> f32 {
        self.0.as_secs_f32()
    }

    /// Time that passed between `earlier` and `self`, saturating at zero.
    #[must_use]
    pub fn saturating_since(self, earlier: SimTime) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0.saturating_add(rhs))
    }
}

/// Unique identifier assigned to an enemy entity by the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enemy_{}", self.0)
    }
}

/// Closed set of abilities the controlled actor can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    /// Close-range strike against a single target.
    Melee,
    /// Projectile that consumes one round of ammunition.
    Ranged,
    /// Area sweep that damages every enemy near the actor.
    Aoe,
    /// Refills ammunition after a short delay.
    Reload,
    /// Execution move; currently only arms its cooldown.
    Finisher,
}

impl ActionCategory {
    /// Every category in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Melee,
        Self::Ranged,
        Self::Aoe,
        Self::Reload,
        Self::Finisher,
    ];

    /// Categories whose weights participate in adaptation and renormalization.
    pub const ADAPTABLE: [Self; 4] = [Self::Melee, Self::Ranged, Self::Reload, Self::Aoe];

    /// Cooldown registry key that gates the ability.
    #[must_use]
    pub const fn cooldown_key(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Ranged => "ranged",
            Self::Aoe => "aoe",
            Self::Reload => "reload",
            Self::Finisher => "finisher",
        }
    }

    /// Fixed priority used to settle equal weighted scores; lower ranks win.
    #[must_use]
    pub const fn tie_rank(self) -> u8 {
        match self {
            Self::Melee => 0,
            Self::Aoe => 1,
            Self::Ranged => 2,
            Self::Reload => 3,
            Self::Finisher => 4,
        }
    }
}

impl fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cooldown_key())
    }
}

/// Per-category preference weights consumed by the weighted policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightVector {
    /// Weight for [`ActionCategory::Melee`].
    pub melee: f32,
    /// Weight for [`ActionCategory::Ranged`].
    pub ranged: f32,
    /// Weight for [`ActionCategory::Reload`].
    pub reload: f32,
    /// Weight for [`ActionCategory::Aoe`].
    pub aoe: f32,
    /// Weight for [`ActionCategory::Finisher`].
    pub finisher: f32,
}

impl WeightVector {
    /// Weights installed when the weighted policy first runs without tuning.
    pub const BASELINE: Self = Self {
        melee: 80.0,
        ranged: 60.0,
        reload: 50.0,
        aoe: 40.0,
        finisher: 20.0,
    };

    /// Returns the weight assigned to the provided category.
    #[must_use]
    pub const fn get(&self, category: ActionCategory) -> f32 {
        match category {
            ActionCategory::Melee => self.melee,
            ActionCategory::Ranged => self.ranged,
            ActionCategory::Aoe => self.aoe,
            ActionCategory::Reload => self.reload,
            ActionCategory::Finisher => self.finisher,
        }
    }

    /// Overwrites the weight assigned to the provided category.
    pub fn set(&mut self, category: ActionCategory, value: f32) {
        let slot = match category {
            ActionCategory::Melee => &mut self.melee,
            ActionCategory::Ranged => &mut self.ranged,
            ActionCategory::Aoe => &mut self.aoe,
            ActionCategory::Reload => &mut self.reload,
            ActionCategory::Finisher => &mut self.finisher,
        };
        *slot = value;
    }

    /// Sum of the four adaptable weights; the finisher is excluded.
    #[must_use]
    pub fn adaptable_sum(&self) -> f32 {
        ActionCategory::ADAPTABLE
            .iter()
            .map(|category| self.get(*category))
            .sum()
    }

    /// Installs [`WeightVector::BASELINE`] when the vector was never tuned.
    ///
    /// Returns `true` when the baseline was applied.
    pub fn init_if_unset(&mut self) -> bool {
        if self.melee > 0.0 {
            return false;
        }
        *self = Self::BASELINE;
        true
    }
}

/// Game modes that select which wave list the orchestrator plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Single, group and mixed waves back to back.
    #[default]
    Normal,
    /// Group waves only.
    Group,
    /// Mixed waves only.
    Mixed,
    /// Benchmark run that repeats every wave and compares both policies.
    Telemetry,
}

/// Who is currently steering the controlled actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControlMode {
    /// External input drives the actor.
    #[default]
    Manual,
    /// Priority-bucket policy.
    Rule,
    /// Weighted-scoring policy.
    Weighted,
}

/// Label written into telemetry rows describing the controlling AI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AiLabel {
    /// Rounds played outside the benchmark.
    #[default]
    Manual,
    /// Benchmark rounds driven by the rule-based policy.
    Random,
    /// Benchmark rounds driven by the weighted policy.
    Smart,
}

impl AiLabel {
    /// Column text used in telemetry rows.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "Manual",
            Self::Random => "Random",
            Self::Smart => "Smart",
        }
    }
}

/// Result of a completed round from the actor's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundOutcome {
    /// Every enemy of the round was defeated.
    Win,
    /// The actor was defeated.
    Loss,
}

/// Origin of an ability or movement request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ControlSource {
    /// Request produced by an adapter from player input.
    Manual,
    /// Request produced by an autoplay policy.
    Autonomous,
}

/// Reasons an ability request may be rejected by the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AbilityRejection {
    /// The ability's cooldown key is still active.
    CoolingDown,
    /// Ranged attack requested with an empty magazine.
    OutOfAmmo,
    /// Reload requested while a reload is already in flight.
    AlreadyReloading,
    /// Manual request ignored while autonomous control is enabled.
    AutonomousControl,
    /// The actor is defeated.
    ActorDefeated,
}

/// One group of identical enemies within a wave.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveEntry {
    /// Name of the enemy template to spawn.
    pub template: String,
    /// Number of copies of the template.
    pub count: u32,
    /// Category label reported in telemetry rows.
    pub category: String,
}

impl WaveEntry {
    /// Creates a new wave entry.
    #[must_use]
    pub fn new(template: impl Into<String>, count: u32, category: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            count,
            category: category.into(),
        }
    }
}

/// Immutable description of the enemies spawned together for one round.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveDefinition {
    /// Groups spawned in order.
    pub entries: Vec<WaveEntry>,
}

impl WaveDefinition {
    /// Creates a wave from its entries.
    #[must_use]
    pub fn new(entries: Vec<WaveEntry>) -> Self {
        Self { entries }
    }

    /// Total number of enemies spawned by the wave.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| usize::try_from(entry.count).unwrap_or(usize::MAX))
            .fold(0, usize::saturating_add)
    }

    /// Template names in spawn order, one per enemy.
    pub fn spawn_order(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().flat_map(|entry| {
            std::iter::repeat(entry.template.as_str())
                .take(usize::try_from(entry.count).unwrap_or(0))
        })
    }

    /// Category column: the single entry's category, otherwise `Mixed`.
    #[must_use]
    pub fn category_label(&self) -> &str {
        match self.entries.as_slice() {
            [only] => only.category.as_str(),
            _ => "Mixed",
        }
    }

    /// Composition column such as `3xGolem/2xHarpy`.
    #[must_use]
    pub fn composition_label(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}x{}", entry.count, entry.template))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Immutable representation of a single enemy used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier assigned by the arena.
    pub id: EnemyId,
    /// Position on the lane (`x`) and depth axis (`y`).
    pub position: Vec2,
    /// Remaining health.
    pub health: f32,
    /// Health at spawn.
    pub max_health: f32,
}

impl EnemySnapshot {
    /// Reports whether the enemy can still be targeted.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}

/// Immutable representation of the controlled actor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSnapshot {
    /// Position on the lane (`x`) and depth axis (`y`).
    pub position: Vec2,
    /// Remaining health.
    pub health: f32,
    /// Health restored by a reset.
    pub max_health: f32,
    /// Rounds left in the magazine.
    pub ammo: u32,
    /// Magazine capacity.
    pub max_ammo: u32,
    /// Whether an autoplay policy currently owns the actor.
    pub autonomous: bool,
}

impl ActorSnapshot {
    /// Reports whether the actor has been defeated.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

/// Read-only queries the decision systems issue against the arena.
///
/// Implementations must not mutate state; stale or dead entities are never
/// reported as targets.
pub trait ArenaQuery {
    /// Current simulation time.
    fn now(&self) -> SimTime;

    /// Snapshot of the controlled actor.
    fn actor(&self) -> ActorSnapshot;

    /// Living enemies inside the detection box of half-width `range` around `origin`.
    fn detect_in_range(&self, origin: Vec2, range: f32) -> Vec<EnemySnapshot>;

    /// Whether a living enemy occupies the actor's contact box.
    fn contact_occupied(&self) -> bool;

    /// Every living enemy in identifier order.
    fn alive_enemies(&self) -> Vec<EnemySnapshot>;

    /// Whether the cooldown registered under `key` is still running.
    fn cooldown_active(&self, key: &str) -> bool;

    /// Closest living candidate to `origin`; equal distances keep the lowest identifier.
    fn nearest_alive(&self, origin: Vec2, candidates: &[EnemySnapshot]) -> Option<EnemySnapshot> {
        candidates
            .iter()
            .filter(|candidate| candidate.is_alive())
            .min_by(|a, b| {
                origin
                    .distance_squared(a.position)
                    .total_cmp(&origin.distance_squared(b.position))
                    .then(a.id.cmp(&b.id))
            })
            .cloned()
    }
}

/// Commands that express all permissible arena mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Spawns an enemy built from a named template.
    SpawnEnemy {
        /// Template name from the arena roster.
        template: String,
        /// Spawn position.
        position: Vec2,
    },
    /// Removes an enemy from the arena.
    DespawnEnemy {
        /// Enemy to remove.
        enemy: EnemyId,
    },
    /// Removes every enemy from the arena.
    ClearEnemies,
    /// Asks the actor to perform an ability.
    UseAbility {
        /// Ability to perform.
        category: ActionCategory,
        /// Whether the request came from input or a policy.
        source: ControlSource,
    },
    /// Steers the autonomous actor toward an enemy along the lane.
    MoveToward {
        /// Enemy to approach.
        enemy: EnemyId,
    },
    /// Stops autonomous movement.
    HoldPosition,
    /// Steers the actor from external input.
    ManualMove {
        /// Lane direction; the sign is used, zero stops.
        direction: f32,
    },
    /// Hands the actor to or takes it away from an autoplay policy.
    SetAutonomousControl {
        /// Whether policies own the actor.
        enabled: bool,
        /// Probability that an autonomous reload becomes a perfect reload.
        perfect_reload_chance: f32,
    },
    /// Restores the actor to its start state and clears every cooldown.
    ResetActor,
}

/// Events broadcast by the arena after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an enemy entered the arena.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Template the enemy was built from.
        template: String,
        /// Spawn position.
        position: Vec2,
    },
    /// Confirms that an enemy left the arena.
    EnemyDespawned {
        /// Identifier of the removed enemy.
        enemy: EnemyId,
    },
    /// Confirms that an ability was performed and its cooldown armed.
    AbilityUsed {
        /// Ability that was performed.
        category: ActionCategory,
    },
    /// Reports that an ability request was refused.
    AbilityRejected {
        /// Ability that was requested.
        category: ActionCategory,
        /// Why the request was refused.
        reason: AbilityRejection,
    },
    /// Reports damage applied to an enemy by an ability.
    DamageDealt {
        /// Ability that dealt the damage.
        category: ActionCategory,
        /// Enemy that received the damage.
        enemy: EnemyId,
        /// Health actually removed.
        amount: f32,
    },
    /// Announces that an enemy's health reached zero.
    EnemyDefeated {
        /// Defeated enemy.
        enemy: EnemyId,
    },
    /// Reports damage applied to the actor by an enemy attack.
    ActorDamaged {
        /// Attacking enemy.
        enemy: EnemyId,
        /// Health removed.
        amount: f32,
    },
    /// Announces that the actor's health reached zero.
    ActorDefeated,
    /// A shot consumed the bonus granted by a perfect reload.
    PerfectReloadConsumed,
    /// The magazine was refilled.
    ReloadCompleted,
    /// The actor was restored to its start state.
    ActorReset,
    /// Autonomous control was switched on or off.
    AutonomousControlChanged {
        /// Whether policies now own the actor.
        enabled: bool,
    },
}
