#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative arena state for Skirmish.
//!
//! The arena is a lane (`x`) with a shallow depth band (`y` of [`Vec2`]). It
//! owns the controlled actor, every spawned enemy, the simulation clock and the
//! cooldown registry. All mutations flow through [`apply`].

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{
    config::seconds, AbilityRejection, ActionCategory, ActorSnapshot, ArenaConfig, ArenaQuery,
    Command, ControlSource, EnemyId, EnemySnapshot, EnemyTemplate, Event, PlayerConfig, SimTime,
    Vec2,
};
use skirmish_system_timers::CooldownRegistry;
use tracing::{debug, warn};

const LANE_EPSILON: f32 = 1e-4;

/// Represents the authoritative arena state.
#[derive(Debug)]
pub struct World {
    player: PlayerConfig,
    roster: Vec<EnemyTemplate>,
    player_start: Vec2,
    clock: SimTime,
    cooldowns: CooldownRegistry,
    rng: ChaCha8Rng,
    actor: Actor,
    enemies: Vec<Enemy>,
    next_enemy_id: u32,
}

impl World {
    /// Creates an arena from the provided configuration with the actor at its start position.
    #[must_use]
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            actor: Actor::fresh(&config.player, config.layout.player_start),
            player: config.player.clone(),
            roster: config.enemies.clone(),
            player_start: config.layout.player_start,
            clock: SimTime::ZERO,
            cooldowns: CooldownRegistry::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            enemies: Vec::new(),
            next_enemy_id: 0,
        }
    }

    fn template(&self, name: &str) -> Option<&EnemyTemplate> {
        self.roster.iter().find(|template| template.name == name)
    }

    fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|enemy| enemy.id == id)
    }

    fn in_box(&self, origin: Vec2, range: f32, position: Vec2) -> bool {
        (position.x - origin.x).abs() <= range
            && (position.y - origin.y).abs() <= self.player.depth_band / 2.0
    }

    fn spawn(&mut self, template_name: &str, position: Vec2, out_events: &mut Vec<Event>) {
        let Some(template) = self.template(template_name).cloned() else {
            warn!(template = template_name, "ignoring spawn of unknown enemy template");
            return;
        };

        let delay = if template.max_attack_delay > template.min_attack_delay {
            self.rng
                .gen_range(template.min_attack_delay..template.max_attack_delay)
        } else {
            template.min_attack_delay
        };

        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.saturating_add(1);
        self.enemies.push(Enemy {
            id,
            position,
            health: template.max_health,
            ready_at: self.clock + seconds(delay),
            template,
        });
        out_events.push(Event::EnemySpawned {
            enemy: id,
            template: template_name.to_owned(),
            position,
        });
    }

    fn despawn(&mut self, id: EnemyId, out_events: &mut Vec<Event>) {
        let Some(index) = self.enemies.iter().position(|enemy| enemy.id == id) else {
            return;
        };
        let enemy = self.enemies.remove(index);
        self.cooldowns.clear(&enemy.id.to_string());
        out_events.push(Event::EnemyDespawned { enemy: id });
    }

    fn use_ability(
        &mut self,
        category: ActionCategory,
        source: ControlSource,
        out_events: &mut Vec<Event>,
    ) {
        if let Err(reason) = self.check_ability(category, source) {
            debug!(%category, ?reason, "ability rejected");
            out_events.push(Event::AbilityRejected { category, reason });
            return;
        }

        self.cooldowns
            .start_timer(category.cooldown_key(), self.player.cooldown(category), self.clock);
        out_events.push(Event::AbilityUsed { category });

        match category {
            ActionCategory::Melee => self.strike_melee(out_events),
            ActionCategory::Ranged => self.fire_projectile(out_events),
            ActionCategory::Aoe => self.sweep_area(out_events),
            ActionCategory::Reload => self.begin_reload(),
            ActionCategory::Finisher => {}
        }
    }

    fn check_ability(
        &self,
        category: ActionCategory,
        source: ControlSource,
    ) -> Result<(), AbilityRejection> {
        if self.actor.is_dead() {
            return Err(AbilityRejection::ActorDefeated);
        }
        if source == ControlSource::Manual && self.actor.autonomous {
            return Err(AbilityRejection::AutonomousControl);
        }
        if self.cooldowns.is_active(category.cooldown_key(), self.clock) {
            return Err(AbilityRejection::CoolingDown);
        }
        match category {
            ActionCategory::Ranged if self.actor.ammo == 0 => Err(AbilityRejection::OutOfAmmo),
            ActionCategory::Reload if self.actor.reload_until.is_some() => {
                Err(AbilityRejection::AlreadyReloading)
            }
            _ => Ok(()),
        }
    }

    fn strike_melee(&mut self, out_events: &mut Vec<Event>) {
        let candidates = self.detect_in_range(self.actor.position, self.player.melee_range);
        let Some(target) = self.select_melee_target(&candidates) else {
            return;
        };
        self.damage_enemy(target, ActionCategory::Melee, self.player.melee_damage, out_events);
    }

    /// Lowest health first, then nearest, then a seeded coin among exact ties.
    fn select_melee_target(&mut self, candidates: &[EnemySnapshot]) -> Option<EnemyId> {
        let lowest = candidates
            .iter()
            .map(|candidate| candidate.health)
            .min_by(f32::total_cmp)?;
        let weakest: Vec<&EnemySnapshot> = candidates
            .iter()
            .filter(|candidate| candidate.health == lowest)
            .collect();

        let origin = self.actor.position;
        let nearest = weakest
            .iter()
            .map(|candidate| origin.distance(candidate.position))
            .min_by(f32::total_cmp)?;
        let closest: Vec<EnemyId> = weakest
            .iter()
            .filter(|candidate| origin.distance(candidate.position) == nearest)
            .map(|candidate| candidate.id)
            .collect();

        match closest.len() {
            0 => None,
            1 => closest.first().copied(),
            len => closest.get(self.rng.gen_range(0..len)).copied(),
        }
    }

    fn fire_projectile(&mut self, out_events: &mut Vec<Event>) {
        let mut damage = self.player.ranged_damage;
        if self.actor.perfect_reload {
            self.actor.perfect_reload = false;
            damage *= self.player.perfect_reload_bonus;
            out_events.push(Event::PerfectReloadConsumed);
        }
        self.actor.ammo = self.actor.ammo.saturating_sub(1);

        let origin = self.actor.position;
        let facing = self.actor.facing;
        let travel = self.player.projectile_travel;
        let half_band = self.player.depth_band / 2.0;
        let target = self
            .enemies
            .iter()
            .filter(|enemy| enemy.is_alive())
            .filter(|enemy| (enemy.position.y - origin.y).abs() <= half_band)
            .map(|enemy| (enemy.id, (enemy.position.x - origin.x) * facing))
            .filter(|(_, ahead)| *ahead >= 0.0 && *ahead <= travel)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(id, _)| id);

        if let Some(target) = target {
            self.damage_enemy(target, ActionCategory::Ranged, damage, out_events);
        }
    }

    fn sweep_area(&mut self, out_events: &mut Vec<Event>) {
        let targets: Vec<EnemyId> = self
            .detect_in_range(self.actor.position, self.player.aoe_range)
            .into_iter()
            .map(|snapshot| snapshot.id)
            .collect();
        for target in targets {
            self.damage_enemy(target, ActionCategory::Aoe, self.player.aoe_damage, out_events);
        }
    }

    fn begin_reload(&mut self) {
        self.actor.reload_until = Some(self.clock + seconds(self.player.reload_duration));
        if self.actor.autonomous {
            self.actor.perfect_reload = self.rng.gen::<f32>() < self.actor.perfect_reload_chance;
        }
    }

    fn damage_enemy(
        &mut self,
        target: EnemyId,
        category: ActionCategory,
        damage: f32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(enemy) = self.enemy_mut(target) else {
            return;
        };
        if !enemy.is_alive() {
            return;
        }
        let amount = damage.min(enemy.health);
        enemy.health -= amount;
        let defeated = !enemy.is_alive();
        out_events.push(Event::DamageDealt {
            category,
            enemy: target,
            amount,
        });
        if defeated {
            out_events.push(Event::EnemyDefeated { enemy: target });
        }
    }

    fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock + dt;
        out_events.push(Event::TimeAdvanced { dt });

        if let Some(until) = self.actor.reload_until {
            if self.clock >= until {
                self.actor.reload_until = None;
                self.actor.ammo = self.player.max_ammo;
                out_events.push(Event::ReloadCompleted);
            }
        }

        let elapsed = dt.as_secs_f32();
        if !self.actor.is_dead() {
            let direction = if self.actor.autonomous {
                self.actor.stride.take().unwrap_or(0.0)
            } else {
                self.actor.manual_direction
            };
            self.actor.position.x += direction * self.player.move_speed * elapsed;
        }

        self.advance_enemies(elapsed, out_events);
    }

    fn advance_enemies(&mut self, elapsed: f32, out_events: &mut Vec<Event>) {
        let now = self.clock;
        for enemy in self.enemies.iter_mut().filter(|enemy| enemy.is_alive()) {
            if self.actor.is_dead() {
                break;
            }

            let offset = self.actor.position.x - enemy.position.x;
            let distance = offset.abs();
            if distance > enemy.template.attack_range {
                let step = (enemy.template.move_speed * elapsed)
                    .min(distance - enemy.template.attack_range);
                enemy.position.x += offset.signum() * step;
                continue;
            }

            let key = enemy.id.to_string();
            if now < enemy.ready_at || self.cooldowns.is_active(&key, now) {
                continue;
            }

            self.cooldowns
                .start_timer(key, seconds(enemy.template.attack_cooldown), now);
            let amount = enemy.template.attack_damage.min(self.actor.health);
            self.actor.health -= amount;
            out_events.push(Event::ActorDamaged {
                enemy: enemy.id,
                amount,
            });
            if self.actor.is_dead() {
                self.actor.health = 0.0;
                self.actor.stride = None;
                self.actor.manual_direction = 0.0;
                out_events.push(Event::ActorDefeated);
            }
        }
    }

    fn move_toward(&mut self, target: EnemyId) {
        let Some(enemy) = self.enemies.iter().find(|enemy| enemy.id == target) else {
            warn!(enemy = %target, "ignoring move toward unknown enemy");
            return;
        };
        if !enemy.is_alive() {
            warn!(enemy = %target, "ignoring move toward defeated enemy");
            return;
        }
        let offset = enemy.position.x - self.actor.position.x;
        if !self.actor.autonomous || self.contact_occupied() {
            self.actor.stride = None;
            return;
        }
        if offset.abs() <= LANE_EPSILON {
            self.actor.stride = None;
            return;
        }
        let direction = offset.signum();
        self.actor.facing = direction;
        self.actor.stride = Some(direction);
    }

    fn reset_actor(&mut self) {
        let autonomous = self.actor.autonomous;
        let chance = self.actor.perfect_reload_chance;
        self.actor = Actor::fresh(&self.player, self.player_start);
        self.actor.autonomous = autonomous;
        self.actor.perfect_reload_chance = chance;
        self.cooldowns.clear_all();
    }
}

impl ArenaQuery for World {
    fn now(&self) -> SimTime {
        self.clock
    }

    fn actor(&self) -> ActorSnapshot {
        query::actor(self)
    }

    fn detect_in_range(&self, origin: Vec2, range: f32) -> Vec<EnemySnapshot> {
        self.enemies
            .iter()
            .filter(|enemy| enemy.is_alive() && self.in_box(origin, range, enemy.position))
            .map(Enemy::snapshot)
            .collect()
    }

    fn contact_occupied(&self) -> bool {
        !self
            .detect_in_range(self.actor.position, self.player.contact_range)
            .is_empty()
    }

    fn alive_enemies(&self) -> Vec<EnemySnapshot> {
        self.enemies
            .iter()
            .filter(|enemy| enemy.is_alive())
            .map(Enemy::snapshot)
            .collect()
    }

    fn cooldown_active(&self, key: &str) -> bool {
        self.cooldowns.is_active(key, self.clock)
    }
}

/// Applies the provided command to the arena, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.advance(dt, out_events),
        Command::SpawnEnemy { template, position } => world.spawn(&template, position, out_events),
        Command::DespawnEnemy { enemy } => world.despawn(enemy, out_events),
        Command::ClearEnemies => {
            let ids: Vec<EnemyId> = world.enemies.iter().map(|enemy| enemy.id).collect();
            for id in ids {
                world.despawn(id, out_events);
            }
        }
        Command::UseAbility { category, source } => world.use_ability(category, source, out_events),
        Command::MoveToward { enemy } => world.move_toward(enemy),
        Command::HoldPosition => world.actor.stride = None,
        Command::ManualMove { direction } => {
            if world.actor.autonomous {
                debug!("manual movement ignored under autonomous control");
                return;
            }
            world.actor.manual_direction = if direction > 0.0 {
                1.0
            } else if direction < 0.0 {
                -1.0
            } else {
                0.0
            };
            if world.actor.manual_direction != 0.0 {
                world.actor.facing = world.actor.manual_direction;
            }
        }
        Command::SetAutonomousControl {
            enabled,
            perfect_reload_chance,
        } => {
            world.actor.autonomous = enabled;
            world.actor.perfect_reload_chance = perfect_reload_chance.clamp(0.0, 1.0);
            world.actor.stride = None;
            world.actor.manual_direction = 0.0;
            out_events.push(Event::AutonomousControlChanged { enabled });
        }
        Command::ResetActor => {
            world.reset_actor();
            out_events.push(Event::ActorReset);
        }
    }
}

/// Query functions that provide read-only access to the arena state.
pub mod query {
    use std::time::Duration;

    use skirmish_core::{ActorSnapshot, EnemyId, EnemySnapshot, SimTime};

    use super::{Enemy, World};

    /// Current simulation time.
    #[must_use]
    pub fn now(world: &World) -> SimTime {
        world.clock
    }

    /// Snapshot of the controlled actor.
    #[must_use]
    pub fn actor(world: &World) -> ActorSnapshot {
        ActorSnapshot {
            position: world.actor.position,
            health: world.actor.health,
            max_health: world.player.max_health,
            ammo: world.actor.ammo,
            max_ammo: world.player.max_ammo,
            autonomous: world.actor.autonomous,
        }
    }

    /// Every enemy still present in the arena, defeated or not, in identifier order.
    #[must_use]
    pub fn enemies(world: &World) -> Vec<EnemySnapshot> {
        world.enemies.iter().map(Enemy::snapshot).collect()
    }

    /// Snapshot of a single enemy, if it is still present.
    #[must_use]
    pub fn enemy(world: &World, id: EnemyId) -> Option<EnemySnapshot> {
        world
            .enemies
            .iter()
            .find(|enemy| enemy.id == id)
            .map(Enemy::snapshot)
    }

    /// Whether a reload is in flight.
    #[must_use]
    pub fn is_reloading(world: &World) -> bool {
        world.actor.reload_until.is_some()
    }

    /// Whether the next shot carries the perfect-reload bonus.
    #[must_use]
    pub fn perfect_reload_pending(world: &World) -> bool {
        world.actor.perfect_reload
    }

    /// Time left on the cooldown registered under `key`.
    #[must_use]
    pub fn cooldown_remaining(world: &World, key: &str) -> Duration {
        world.cooldowns.time_remaining(key, world.clock)
    }
}

#[derive(Clone, Debug)]
struct Actor {
    position: Vec2,
    health: f32,
    ammo: u32,
    facing: f32,
    manual_direction: f32,
    stride: Option<f32>,
    autonomous: bool,
    perfect_reload_chance: f32,
    perfect_reload: bool,
    reload_until: Option<SimTime>,
}

impl Actor {
    fn fresh(player: &PlayerConfig, position: Vec2) -> Self {
        Self {
            position,
            health: player.max_health,
            ammo: player.max_ammo,
            facing: 1.0,
            manual_direction: 0.0,
            stride: None,
            autonomous: false,
            perfect_reload_chance: 0.0,
            perfect_reload: false,
            reload_until: None,
        }
    }

    fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

#[derive(Clone, Debug)]
struct Enemy {
    id: EnemyId,
    template: EnemyTemplate,
    position: Vec2,
    health: f32,
    ready_at: SimTime,
}

impl Enemy {
    fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            position: self.position,
            health: self.health,
            max_health: self.template.max_health,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ArenaConfig {
        let mut config = ArenaConfig::default();
        config.enemies = vec![EnemyTemplate {
            name: "Dummy".to_owned(),
            max_health: 30.0,
            move_speed: 0.0,
            attack_range: 1.0,
            attack_damage: 4.0,
            attack_cooldown: 1.0,
            min_attack_delay: 0.0,
            max_attack_delay: 0.0,
        }];
        config
    }

    fn spawn(world: &mut World, x: f32, y: f32) -> EnemyId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                template: "Dummy".to_owned(),
                position: Vec2::new(x, y),
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::EnemySpawned { enemy, .. }] => *enemy,
            other => panic!("unexpected events: {other:?}"),
        }
    }

    fn use_ability(world: &mut World, category: ActionCategory) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::UseAbility {
                category,
                source: ControlSource::Manual,
            },
            &mut events,
        );
        events
    }

    fn tick(world: &mut World, seconds: f32) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::Tick {
                dt: Duration::from_secs_f32(seconds),
            },
            &mut events,
        );
        events
    }

    #[test]
    fn detection_box_respects_depth_band() {
        let mut world = World::new(&arena());
        let near = spawn(&mut world, 1.0, 0.5);
        let _deep = spawn(&mut world, 1.0, 5.0);
        let _far = spawn(&mut world, 4.0, 0.0);

        let detected = world.detect_in_range(Vec2::ZERO, 1.5);
        assert_eq!(
            detected.iter().map(|enemy| enemy.id).collect::<Vec<_>>(),
            vec![near]
        );
    }

    #[test]
    fn unknown_template_spawns_nothing() {
        let mut world = World::new(&arena());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                template: "Dragon".to_owned(),
                position: Vec2::ZERO,
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert!(query::enemies(&world).is_empty());
    }

    #[test]
    fn melee_prefers_lowest_health_target() {
        let mut world = World::new(&arena());
        let healthy = spawn(&mut world, 1.0, 0.0);
        let wounded = spawn(&mut world, 1.2, 0.0);
        world.enemy_mut(wounded).expect("spawned").health = 10.0;

        let events = use_ability(&mut world, ActionCategory::Melee);
        assert!(events.contains(&Event::DamageDealt {
            category: ActionCategory::Melee,
            enemy: wounded,
            amount: 10.0,
        }));
        assert!(events.contains(&Event::EnemyDefeated { enemy: wounded }));
        assert_eq!(query::enemy(&world, healthy).expect("present").health, 30.0);
    }

    #[test]
    fn abilities_gate_on_their_cooldown() {
        let mut world = World::new(&arena());
        let first = use_ability(&mut world, ActionCategory::Melee);
        assert_eq!(
            first,
            vec![Event::AbilityUsed {
                category: ActionCategory::Melee
            }]
        );

        let second = use_ability(&mut world, ActionCategory::Melee);
        assert_eq!(
            second,
            vec![Event::AbilityRejected {
                category: ActionCategory::Melee,
                reason: AbilityRejection::CoolingDown,
            }]
        );

        let _ = tick(&mut world, 1.0);
        let third = use_ability(&mut world, ActionCategory::Melee);
        assert_eq!(third.len(), 1);
        assert!(matches!(third[0], Event::AbilityUsed { .. }));
    }

    #[test]
    fn ranged_spends_ammo_and_refuses_when_empty() {
        let mut config = arena();
        config.player.max_ammo = 1;
        let mut world = World::new(&config);
        let target = spawn(&mut world, 5.0, 0.0);

        let events = use_ability(&mut world, ActionCategory::Ranged);
        assert!(events.contains(&Event::DamageDealt {
            category: ActionCategory::Ranged,
            enemy: target,
            amount: 15.0,
        }));
        assert_eq!(query::actor(&world).ammo, 0);

        let _ = tick(&mut world, 1.0);
        let refused = use_ability(&mut world, ActionCategory::Ranged);
        assert_eq!(
            refused,
            vec![Event::AbilityRejected {
                category: ActionCategory::Ranged,
                reason: AbilityRejection::OutOfAmmo,
            }]
        );
    }

    #[test]
    fn projectile_ignores_enemies_behind_the_actor() {
        let mut world = World::new(&arena());
        let _behind = spawn(&mut world, -2.0, 0.0);
        let events = use_ability(&mut world, ActionCategory::Ranged);
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::DamageDealt { .. })));
    }

    #[test]
    fn aoe_hits_every_enemy_in_range() {
        let mut world = World::new(&arena());
        let first = spawn(&mut world, 1.0, 0.0);
        let second = spawn(&mut world, -1.5, 1.0);
        let _outside = spawn(&mut world, 3.0, 0.0);

        let events = use_ability(&mut world, ActionCategory::Aoe);
        let hit: Vec<EnemyId> = events
            .iter()
            .filter_map(|event| match event {
                Event::DamageDealt { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        assert_eq!(hit, vec![first, second]);
    }

    #[test]
    fn reload_refills_after_its_duration() {
        let mut world = World::new(&arena());
        world.actor.ammo = 0;

        let started = use_ability(&mut world, ActionCategory::Reload);
        assert!(started.contains(&Event::AbilityUsed {
            category: ActionCategory::Reload
        }));
        assert!(query::is_reloading(&world));

        let early = tick(&mut world, 1.0);
        assert!(!early.contains(&Event::ReloadCompleted));

        let done = tick(&mut world, 0.5);
        assert!(done.contains(&Event::ReloadCompleted));
        assert_eq!(query::actor(&world).ammo, world.player.max_ammo);
    }

    #[test]
    fn guaranteed_perfect_reload_boosts_next_shot() {
        let mut world = World::new(&arena());
        let target = spawn(&mut world, 3.0, 0.0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetAutonomousControl {
                enabled: true,
                perfect_reload_chance: 1.0,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::UseAbility {
                category: ActionCategory::Reload,
                source: ControlSource::Autonomous,
            },
            &mut events,
        );
        assert!(query::perfect_reload_pending(&world));

        events.clear();
        apply(
            &mut world,
            Command::UseAbility {
                category: ActionCategory::Ranged,
                source: ControlSource::Autonomous,
            },
            &mut events,
        );
        assert!(events.contains(&Event::PerfectReloadConsumed));
        assert!(events.contains(&Event::DamageDealt {
            category: ActionCategory::Ranged,
            enemy: target,
            amount: 22.5,
        }));
    }

    #[test]
    fn manual_requests_are_ignored_under_autonomous_control() {
        let mut world = World::new(&arena());
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetAutonomousControl {
                enabled: true,
                perfect_reload_chance: 0.0,
            },
            &mut events,
        );
        apply(&mut world, Command::ManualMove { direction: 1.0 }, &mut events);
        let _ = tick(&mut world, 1.0);
        assert_eq!(query::actor(&world).position, Vec2::ZERO);

        let refused = use_ability(&mut world, ActionCategory::Aoe);
        assert_eq!(
            refused,
            vec![Event::AbilityRejected {
                category: ActionCategory::Aoe,
                reason: AbilityRejection::AutonomousControl,
            }]
        );
    }

    #[test]
    fn enemies_walk_into_range_and_attack() {
        let mut config = arena();
        config.enemies[0].move_speed = 2.0;
        config.player.max_health = 8.0;
        let mut world = World::new(&config);
        let attacker = spawn(&mut world, 3.0, 0.0);

        let _ = tick(&mut world, 0.5);
        assert_eq!(query::enemy(&world, attacker).expect("present").position.x, 2.0);

        let _ = tick(&mut world, 1.0);
        assert_eq!(query::enemy(&world, attacker).expect("present").position.x, 1.0);

        let strike = tick(&mut world, 0.1);
        assert!(strike.contains(&Event::ActorDamaged {
            enemy: attacker,
            amount: 4.0,
        }));

        let _ = tick(&mut world, 0.5);
        let finishing = tick(&mut world, 0.5);
        assert!(finishing.contains(&Event::ActorDefeated));
        assert!(query::actor(&world).is_dead());

        let silent = tick(&mut world, 5.0);
        assert!(!silent
            .iter()
            .any(|event| matches!(event, Event::ActorDamaged { .. } | Event::ActorDefeated)));
    }

    #[test]
    fn move_toward_steps_once_per_request() {
        let mut world = World::new(&arena());
        let target = spawn(&mut world, 5.0, 0.0);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetAutonomousControl {
                enabled: true,
                perfect_reload_chance: 0.0,
            },
            &mut events,
        );
        apply(&mut world, Command::MoveToward { enemy: target }, &mut events);
        let _ = tick(&mut world, 0.25);
        assert_eq!(query::actor(&world).position.x, 1.0);

        let _ = tick(&mut world, 0.25);
        assert_eq!(query::actor(&world).position.x, 1.0);
    }

    #[test]
    fn reset_restores_actor_and_clears_cooldowns() {
        let mut world = World::new(&arena());
        let _ = use_ability(&mut world, ActionCategory::Aoe);
        world.actor.health = 2.0;
        world.actor.ammo = 1;
        world.actor.position = Vec2::new(3.0, 0.0);

        let mut events = Vec::new();
        apply(&mut world, Command::ResetActor, &mut events);

        assert_eq!(events, vec![Event::ActorReset]);
        let actor = query::actor(&world);
        assert_eq!(actor.health, actor.max_health);
        assert_eq!(actor.ammo, actor.max_ammo);
        assert_eq!(actor.position, Vec2::ZERO);
        assert!(!world.cooldown_active("aoe"));
    }

    #[test]
    fn clear_enemies_despawns_everything() {
        let mut world = World::new(&arena());
        let first = spawn(&mut world, 1.0, 0.0);
        let second = spawn(&mut world, 2.0, 0.0);

        let mut events = Vec::new();
        apply(&mut world, Command::ClearEnemies, &mut events);
        assert_eq!(
            events,
            vec![
                Event::EnemyDespawned { enemy: first },
                Event::EnemyDespawned { enemy: second },
            ]
        );
        assert!(query::enemies(&world).is_empty());
    }
}
