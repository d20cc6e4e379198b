use std::time::Duration;

use skirmish_core::{ArenaConfig, ArenaQuery, Command, ControlSource, Event, Vec2};
use skirmish_system_autoplay::{Autoplay, AutoplaySpeed, AutoplayState, Transition};
use skirmish_world::{apply, query, World};

fn drive(world: &mut World, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        apply(world, command, &mut events);
    }
    events
}

#[test]
fn off_state_emits_nothing() {
    let config = ArenaConfig::default();
    let world = World::new(&config);
    let mut autoplay = Autoplay::new(&config);

    let mut out = Vec::new();
    autoplay.tick(&world, &mut out);
    assert!(out.is_empty());
}

#[test]
fn rule_autoplay_advances_then_fights() {
    let config = ArenaConfig::default();
    let mut world = World::new(&config);
    let mut autoplay = Autoplay::new(&config);

    let mut out = Vec::new();
    let _ = autoplay.enable_rule(true, &mut out);
    let _ = drive(
        &mut world,
        vec![Command::SpawnEnemy {
            template: "Golem".to_owned(),
            position: Vec2::new(3.0, 0.0),
        }],
    );
    let events = drive(&mut world, out);
    assert!(events.contains(&Event::AutonomousControlChanged { enabled: true }));
    assert!(query::actor(&world).autonomous);
    autoplay.restart_round(world.now());

    let mut out = Vec::new();
    autoplay.tick(&world, &mut out);
    assert!(matches!(out.as_slice(), [Command::MoveToward { .. }]));
    let _ = drive(&mut world, out);
    let _ = drive(
        &mut world,
        vec![Command::Tick {
            dt: Duration::from_millis(250),
        }],
    );
    assert!(query::actor(&world).position.x > 0.0);

    let _ = drive(
        &mut world,
        vec![Command::Tick {
            dt: Duration::from_secs(1),
        }],
    );
    let mut out = Vec::new();
    autoplay.tick(&world, &mut out);
    assert!(out.iter().any(|command| matches!(
        command,
        Command::UseAbility {
            source: ControlSource::Autonomous,
            ..
        }
    )));
}

#[test]
fn disabling_returns_control_to_input() {
    let config = ArenaConfig::default();
    let mut world = World::new(&config);
    let mut autoplay = Autoplay::new(&config);

    let mut out = Vec::new();
    let _ = autoplay.enable_weighted(true, &mut out);
    let _ = autoplay.disable(true, &mut out);
    let _ = drive(&mut world, out);

    assert_eq!(autoplay.state(), AutoplayState::Off);
    assert!(!query::actor(&world).autonomous);
}

#[test]
fn direct_switch_keeps_speed_in_step_with_state() {
    let config = ArenaConfig::default();
    let mut world = World::new(&config);
    let mut autoplay = Autoplay::new(&config);
    let _ = drive(
        &mut world,
        vec![Command::SpawnEnemy {
            template: "Golem".to_owned(),
            position: Vec2::new(3.0, 0.0),
        }],
    );

    let mut out = Vec::new();
    let transition = autoplay.switch(AutoplayState::Rule, true, &mut out);
    assert!(matches!(transition, Transition::Switched { .. }));
    assert_eq!(autoplay.speed(), AutoplaySpeed::Normal);
    let _ = drive(&mut world, out);

    let mut out = Vec::new();
    autoplay.tick(&world, &mut out);
    assert!(!out.is_empty(), "a running policy emits commands");

    let mut out = Vec::new();
    let _ = autoplay.switch(AutoplayState::Off, true, &mut out);
    assert_eq!(autoplay.speed(), AutoplaySpeed::Off);
    let _ = drive(&mut world, out);

    let mut out = Vec::new();
    autoplay.tick(&world, &mut out);
    assert!(out.is_empty());
}

#[test]
fn switching_policies_keeps_the_current_speed() {
    let config = ArenaConfig::default();
    let mut autoplay = Autoplay::new(&config);

    let mut out = Vec::new();
    let _ = autoplay.enable_rule(true, &mut out);
    assert_eq!(autoplay.speed(), AutoplaySpeed::Fast);

    let _ = autoplay.switch(AutoplayState::Weighted, true, &mut out);
    assert_eq!(autoplay.state(), AutoplayState::Weighted);
    assert_eq!(autoplay.speed(), AutoplaySpeed::Fast);
}
