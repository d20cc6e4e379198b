//! Arena configuration loaded from TOML.
//!
//! Every section carries serde defaults, so a configuration file only needs to
//! mention the values it overrides. [`ArenaConfig::default`] is a complete,
//! playable arena.

use std::{collections::HashSet, time::Duration};

use glam::Vec2;
use serde::Deserialize;
use thiserror::Error;

use crate::{ActionCategory, GameMode, WaveDefinition, WaveEntry, WeightVector};

/// Longest cooldown, delay or reload accepted from a configuration, seconds.
pub const MAX_SECONDS: f32 = 3_600.0;

/// Largest time rate accepted for any autoplay speed.
pub const MAX_TIME_SCALE: f32 = 100.0;

/// Errors raised while loading or validating an [`ArenaConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("failed to parse arena config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A wave references a template missing from the roster.
    #[error("wave references unknown enemy template `{0}`")]
    UnknownTemplate(String),
    /// Two roster entries share a name.
    #[error("duplicate enemy template `{0}`")]
    DuplicateTemplate(String),
    /// None of the wave sets contain a wave.
    #[error("arena config defines no waves")]
    NoWaves,
    /// A distance, speed or health value is zero or negative.
    #[error("`{field}` must be positive, found {value}")]
    NonPositive {
        /// Dotted path of the offending field.
        field: String,
        /// Value found in the configuration.
        value: f32,
    },
    /// A duration or time rate is not finite or exceeds its ceiling.
    #[error("`{field}` must be a finite value no greater than {max}, found {value}")]
    OutOfRange {
        /// Dotted path of the offending field.
        field: String,
        /// Value found in the configuration.
        value: f32,
        /// Largest accepted value.
        max: f32,
    },
    /// An enemy's attack delay bounds are inverted.
    #[error("enemy `{name}` has min attack delay {min} above max {max}")]
    InvertedAttackDelay {
        /// Template name.
        name: String,
        /// Lower bound in seconds.
        min: f32,
        /// Upper bound in seconds.
        max: f32,
    },
    /// The opening-shots range contains no integers.
    #[error("opening shots range {min}..{max} is empty")]
    EmptyOpeningShots {
        /// Inclusive lower bound.
        min: u32,
        /// Exclusive upper bound.
        max: u32,
    },
}

/// Complete description of an arena, its actor, roster and waves.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Seed for every random stream in the session.
    pub seed: u64,
    /// Rounds played per wave in the telemetry benchmark.
    pub telemetry_runs: u32,
    /// Stats of the controlled actor.
    pub player: PlayerConfig,
    /// Autoplay driver tuning.
    pub autoplay: AutoplayConfig,
    /// Situational multipliers applied by the weighted policy.
    pub weight_scales: WeightScales,
    /// Initial weights for the weighted policy.
    pub weights: WeightVector,
    /// Spawn grid and actor start position.
    pub layout: SpawnLayout,
    /// Enemy templates referenced by waves.
    pub enemies: Vec<EnemyTemplate>,
    /// Wave lists per game mode.
    pub waves: WaveSets,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_cafe_f00d_d00d,
            telemetry_runs: 3,
            player: PlayerConfig::default(),
            autoplay: AutoplayConfig::default(),
            weight_scales: WeightScales::default(),
            weights: WeightVector::default(),
            layout: SpawnLayout::default(),
            enemies: default_roster(),
            waves: WaveSets::builtin(),
        }
    }
}

impl ArenaConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-references and value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for template in &self.enemies {
            if !names.insert(template.name.as_str()) {
                return Err(ConfigError::DuplicateTemplate(template.name.clone()));
            }
            positive(&format!("enemies.{}.max_health", template.name), template.max_health)?;
            positive(&format!("enemies.{}.attack_range", template.name), template.attack_range)?;
            for (field, value) in [
                ("attack_cooldown", template.attack_cooldown),
                ("min_attack_delay", template.min_attack_delay),
                ("max_attack_delay", template.max_attack_delay),
            ] {
                at_most(&format!("enemies.{}.{field}", template.name), value, MAX_SECONDS)?;
            }
            if template.min_attack_delay > template.max_attack_delay {
                return Err(ConfigError::InvertedAttackDelay {
                    name: template.name.clone(),
                    min: template.min_attack_delay,
                    max: template.max_attack_delay,
                });
            }
        }

        let player = &self.player;
        positive("player.max_health", player.max_health)?;
        positive("player.melee_range", player.melee_range)?;
        positive("player.ranged_range", player.ranged_range)?;
        positive("player.aoe_range", player.aoe_range)?;
        positive("player.contact_range", player.contact_range)?;
        positive("player.depth_band", player.depth_band)?;
        at_most("player.melee_cooldown", player.melee_cooldown, MAX_SECONDS)?;
        at_most("player.ranged_cooldown", player.ranged_cooldown, MAX_SECONDS)?;
        at_most("player.reload_cooldown", player.reload_cooldown, MAX_SECONDS)?;
        at_most("player.aoe_cooldown", player.aoe_cooldown, MAX_SECONDS)?;
        at_most("player.finisher_cooldown", player.finisher_cooldown, MAX_SECONDS)?;
        at_most("player.reload_duration", player.reload_duration, MAX_SECONDS)?;

        let autoplay = &self.autoplay;
        positive("autoplay.normal_speed", autoplay.normal_speed)?;
        positive("autoplay.fast_speed", autoplay.fast_speed)?;
        at_most("autoplay.regular_speed", autoplay.regular_speed, MAX_TIME_SCALE)?;
        at_most("autoplay.normal_speed", autoplay.normal_speed, MAX_TIME_SCALE)?;
        at_most("autoplay.fast_speed", autoplay.fast_speed, MAX_TIME_SCALE)?;
        at_most("autoplay.movement_duration", autoplay.movement_duration, MAX_SECONDS)?;
        if autoplay.opening_shots_min >= autoplay.opening_shots_max {
            return Err(ConfigError::EmptyOpeningShots {
                min: autoplay.opening_shots_min,
                max: autoplay.opening_shots_max,
            });
        }

        if self.waves.wave_list(GameMode::Normal).is_empty() {
            return Err(ConfigError::NoWaves);
        }

        for wave in self.waves.wave_list(GameMode::Normal) {
            for entry in &wave.entries {
                if !names.contains(entry.template.as_str()) {
                    return Err(ConfigError::UnknownTemplate(entry.template.clone()));
                }
            }
        }

        Ok(())
    }

    /// Looks up a roster entry by name.
    #[must_use]
    pub fn template(&self, name: &str) -> Option<&EnemyTemplate> {
        self.enemies.iter().find(|template| template.name == name)
    }
}

fn positive(field: &str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive {
            field: field.to_owned(),
            value,
        })
    }
}

fn at_most(field: &str, value: f32, max: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field: field.to_owned(),
            value,
            max,
        })
    }
}

/// Converts configured seconds into a duration.
///
/// Negatives and NaN map to zero; values too large for a [`Duration`] saturate.
#[must_use]
pub fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Stats of the controlled actor.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Health restored on reset.
    pub max_health: f32,
    /// Magazine capacity.
    pub max_ammo: u32,
    /// Lane speed in world units per second.
    pub move_speed: f32,
    /// Half-width of the melee detection box.
    pub melee_range: f32,
    /// Half-width of the ranged detection box.
    pub ranged_range: f32,
    /// Half-width of the AOE hit box.
    pub aoe_range: f32,
    /// Half-width of the contact box that stops autonomous movement.
    pub contact_range: f32,
    /// Full depth of every detection box.
    pub depth_band: f32,
    /// Maximum distance a projectile travels.
    pub projectile_travel: f32,
    /// Damage of a melee strike.
    pub melee_damage: f32,
    /// Damage of a projectile.
    pub ranged_damage: f32,
    /// Damage applied to each enemy caught by the AOE.
    pub aoe_damage: f32,
    /// Cooldown after a melee strike, seconds.
    pub melee_cooldown: f32,
    /// Cooldown after a shot, seconds.
    pub ranged_cooldown: f32,
    /// Cooldown after starting a reload, seconds.
    pub reload_cooldown: f32,
    /// Cooldown after an AOE sweep, seconds.
    pub aoe_cooldown: f32,
    /// Cooldown after a finisher, seconds.
    pub finisher_cooldown: f32,
    /// Time until a reload refills the magazine, seconds.
    pub reload_duration: f32,
    /// Damage multiplier of the first shot after a perfect reload.
    pub perfect_reload_bonus: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: 10.0,
            max_ammo: 6,
            move_speed: 4.0,
            melee_range: 1.5,
            ranged_range: 8.0,
            aoe_range: 2.0,
            contact_range: 0.8,
            depth_band: 3.0,
            projectile_travel: 10.0,
            melee_damage: 25.0,
            ranged_damage: 15.0,
            aoe_damage: 12.0,
            melee_cooldown: 1.0,
            ranged_cooldown: 0.5,
            reload_cooldown: 2.0,
            aoe_cooldown: 3.0,
            finisher_cooldown: 5.0,
            reload_duration: 1.5,
            perfect_reload_bonus: 1.5,
        }
    }
}

impl PlayerConfig {
    /// Cooldown armed after the provided ability.
    #[must_use]
    pub fn cooldown(&self, category: ActionCategory) -> Duration {
        seconds(match category {
            ActionCategory::Melee => self.melee_cooldown,
            ActionCategory::Ranged => self.ranged_cooldown,
            ActionCategory::Aoe => self.aoe_cooldown,
            ActionCategory::Reload => self.reload_cooldown,
            ActionCategory::Finisher => self.finisher_cooldown,
        })
    }
}

/// Autoplay driver tuning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AutoplayConfig {
    /// Time rate while autoplay is off.
    pub regular_speed: f32,
    /// Time rate while autoplay runs at normal speed.
    pub normal_speed: f32,
    /// Time rate while autoplay runs at fast speed.
    pub fast_speed: f32,
    /// Opening window, seconds, during which the rule policy only advances.
    pub movement_duration: f32,
    /// Perfect-reload probability under the rule policy.
    pub rule_reload_chance: f32,
    /// Perfect-reload probability under the weighted policy.
    pub weighted_reload_chance: f32,
    /// Inclusive lower bound of the opening-shots draw.
    pub opening_shots_min: u32,
    /// Exclusive upper bound of the opening-shots draw.
    pub opening_shots_max: u32,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            regular_speed: 1.0,
            normal_speed: 1.0,
            fast_speed: 3.0,
            movement_duration: 1.0,
            rule_reload_chance: 0.3,
            weighted_reload_chance: 0.6,
            opening_shots_min: 2,
            opening_shots_max: 6,
        }
    }
}

/// Situational multipliers of the weighted policy, one per adaptable ability.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WeightScales {
    /// Applied with the 1.25 melee bonus when a target is within melee range.
    pub melee: f32,
    /// Applied with the 0.75 ranged factor when every target is out of melee range.
    pub ranged: f32,
    /// Applied when ammunition is nearly exhausted.
    pub reload: f32,
    /// Applied whenever a living target exists.
    pub aoe: f32,
}

impl Default for WeightScales {
    fn default() -> Self {
        Self {
            melee: 1.0,
            ranged: 1.0,
            reload: 1.0,
            aoe: 1.0,
        }
    }
}

/// Spawn grid and actor start position.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpawnLayout {
    /// Position of the first enemy in the grid.
    pub enemy_start: Vec2,
    /// Depth offset between grid columns.
    pub z_offset: f32,
    /// Lane offset between grid rows.
    pub back_row_offset: f32,
    /// Position the actor returns to on reset.
    pub player_start: Vec2,
}

impl Default for SpawnLayout {
    fn default() -> Self {
        Self {
            enemy_start: Vec2::new(8.0, 0.0),
            z_offset: 1.0,
            back_row_offset: 1.5,
            player_start: Vec2::ZERO,
        }
    }
}

impl SpawnLayout {
    /// Grid position of the `index`-th enemy: three columns per row, rows step back along the lane.
    #[must_use]
    pub fn position(&self, index: usize) -> Vec2 {
        let row = index / 3;
        let depth = match index % 3 {
            1 => self.enemy_start.y - self.z_offset,
            2 => self.enemy_start.y + self.z_offset,
            _ => self.enemy_start.y,
        };
        let lane = self.enemy_start.x - row as f32 * self.back_row_offset;
        Vec2::new(lane, depth)
    }
}

/// Generic enemy template; archetype behaviour lives outside the core.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EnemyTemplate {
    /// Name referenced by waves and composition labels.
    pub name: String,
    /// Health at spawn.
    pub max_health: f32,
    /// Lane speed in world units per second.
    pub move_speed: f32,
    /// Lane distance at which the enemy stops and attacks.
    pub attack_range: f32,
    /// Damage per attack.
    pub attack_damage: f32,
    /// Seconds between attacks.
    pub attack_cooldown: f32,
    /// Lower bound of the delay before the first attack, seconds.
    #[serde(default)]
    pub min_attack_delay: f32,
    /// Upper bound of the delay before the first attack, seconds.
    #[serde(default)]
    pub max_attack_delay: f32,
}

impl EnemyTemplate {
    fn new(
        name: &str,
        max_health: f32,
        move_speed: f32,
        attack_range: f32,
        attack_damage: f32,
        attack_cooldown: f32,
        delay: (f32, f32),
    ) -> Self {
        Self {
            name: name.to_owned(),
            max_health,
            move_speed,
            attack_range,
            attack_damage,
            attack_cooldown,
            min_attack_delay: delay.0,
            max_attack_delay: delay.1,
        }
    }
}

fn default_roster() -> Vec<EnemyTemplate> {
    vec![
        EnemyTemplate::new("Golem", 120.0, 1.2, 1.2, 2.0, 2.5, (0.5, 1.5)),
        EnemyTemplate::new("Harpy", 50.0, 2.5, 1.0, 1.0, 1.2, (0.2, 0.8)),
        EnemyTemplate::new("Snake", 60.0, 2.0, 1.0, 1.0, 1.5, (0.2, 0.8)),
        EnemyTemplate::new("Mushroom", 70.0, 1.5, 1.0, 1.0, 2.0, (0.5, 1.0)),
        EnemyTemplate::new("DarkMage", 80.0, 1.0, 4.0, 2.0, 3.0, (1.0, 2.0)),
    ]
}

/// Wave lists per game mode.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WaveSets {
    /// One enemy type per wave.
    pub single: Vec<WaveDefinition>,
    /// Several copies of one enemy type per wave.
    pub group: Vec<WaveDefinition>,
    /// Several enemy types per wave.
    pub mixed: Vec<WaveDefinition>,
}

impl WaveSets {
    /// Built-in waves matching the default roster.
    #[must_use]
    pub fn builtin() -> Self {
        let wave = |entries: &[(&str, u32, &str)]| {
            WaveDefinition::new(
                entries
                    .iter()
                    .map(|(template, count, category)| WaveEntry::new(*template, *count, *category))
                    .collect(),
            )
        };
        Self {
            single: vec![
                wave(&[("Golem", 1, "Tank")]),
                wave(&[("Harpy", 1, "Flyer")]),
                wave(&[("Snake", 1, "Poison")]),
                wave(&[("Mushroom", 1, "Support")]),
                wave(&[("DarkMage", 1, "Caster")]),
            ],
            group: vec![
                wave(&[("Harpy", 3, "Flyer")]),
                wave(&[("Snake", 3, "Poison")]),
            ],
            mixed: vec![
                wave(&[("Golem", 1, "Tank"), ("Mushroom", 2, "Support")]),
                wave(&[("Harpy", 2, "Flyer"), ("DarkMage", 1, "Caster")]),
            ],
        }
    }

    /// Waves played by `mode`; the benchmark plays the full list twice.
    #[must_use]
    pub fn wave_list(&self, mode: GameMode) -> Vec<WaveDefinition> {
        let base: Vec<WaveDefinition> = self
            .single
            .iter()
            .chain(&self.group)
            .chain(&self.mixed)
            .cloned()
            .collect();
        match mode {
            GameMode::Group => self.group.clone(),
            GameMode::Mixed => self.mixed.clone(),
            GameMode::Telemetry => base.iter().chain(&base).cloned().collect(),
            GameMode::Normal => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ArenaConfig::default()
            .validate()
            .expect("built-in arena validates");
    }

    #[test]
    fn empty_waves_are_rejected() {
        let config = ArenaConfig {
            waves: WaveSets::default(),
            ..ArenaConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoWaves)));
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config = ArenaConfig::from_toml_str(
            r#"
            seed = 7
            telemetry_runs = 2

            [player]
            max_ammo = 4

            [[waves.single]]
            entries = [{ template = "Golem", count = 2, category = "Tank" }]
            "#,
        )
        .expect("valid config");

        assert_eq!(config.seed, 7);
        assert_eq!(config.telemetry_runs, 2);
        assert_eq!(config.player.max_ammo, 4);
        assert_eq!(config.player.max_health, PlayerConfig::default().max_health);
        assert_eq!(config.waves.single.len(), 1);
        assert_eq!(config.waves.single[0].total_count(), 2);
    }

    #[test]
    fn unknown_template_is_reported() {
        let error = ArenaConfig::from_toml_str(
            r#"
            [[waves.group]]
            entries = [{ template = "Dragon", count = 1, category = "Boss" }]
            "#,
        )
        .expect_err("dragon is not in the roster");
        assert!(matches!(error, ConfigError::UnknownTemplate(name) if name == "Dragon"));
    }

    #[test]
    fn malformed_toml_surfaces_parse_error() {
        let error = ArenaConfig::from_toml_str("seed = [").expect_err("malformed");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn telemetry_list_doubles_base_waves() {
        let waves = WaveSets::builtin();
        let base = waves.wave_list(GameMode::Normal);
        let telemetry = waves.wave_list(GameMode::Telemetry);
        assert_eq!(base.len(), 9);
        assert_eq!(telemetry.len(), 18);
        assert_eq!(telemetry[0], telemetry[9]);
        assert_eq!(waves.wave_list(GameMode::Group).len(), 2);
    }

    #[test]
    fn oversized_time_rate_is_rejected() {
        let error = ArenaConfig::from_toml_str("[autoplay]\nfast_speed = 1e25\n")
            .expect_err("fast speed is far above the ceiling");
        assert!(matches!(
            error,
            ConfigError::OutOfRange { ref field, .. } if field == "autoplay.fast_speed"
        ));
    }

    #[test]
    fn oversized_cooldown_is_rejected() {
        let error = ArenaConfig::from_toml_str("[player]\nmelee_cooldown = 1e30\n")
            .expect_err("melee cooldown is far above the ceiling");
        assert!(matches!(
            error,
            ConfigError::OutOfRange { ref field, .. } if field == "player.melee_cooldown"
        ));
    }

    #[test]
    fn infinite_enemy_cooldown_is_rejected() {
        let mut config = ArenaConfig::default();
        config.enemies[0].attack_cooldown = f32::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn seconds_saturates_instead_of_panicking() {
        assert_eq!(seconds(1e30), Duration::MAX);
        assert_eq!(seconds(f32::INFINITY), Duration::MAX);
        assert_eq!(seconds(-2.0), Duration::ZERO);
        assert_eq!(seconds(f32::NAN), Duration::ZERO);
        assert_eq!(seconds(1.5), Duration::from_millis(1500));
    }

    #[test]
    fn spawn_grid_uses_three_columns() {
        let layout = SpawnLayout {
            enemy_start: Vec2::new(10.0, 0.0),
            z_offset: 1.0,
            back_row_offset: 2.0,
            player_start: Vec2::ZERO,
        };
        assert_eq!(layout.position(0), Vec2::new(10.0, 0.0));
        assert_eq!(layout.position(1), Vec2::new(10.0, -1.0));
        assert_eq!(layout.position(2), Vec2::new(10.0, 1.0));
        assert_eq!(layout.position(3), Vec2::new(8.0, 0.0));
        assert_eq!(layout.position(5), Vec2::new(8.0, 1.0));
    }
}
