use std::{cell::RefCell, io, rc::Rc, time::Duration};

use skirmish_core::{
    ActorSnapshot, AiLabel, EnemyId, EnemySnapshot, RoundOutcome, Vec2, WaveDefinition, WaveEntry,
};
use skirmish_system_telemetry::{RowSink, Telemetry, ROUND_HEADER, RUN_HEADER};

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<String>>>);

impl RowSink for Recorder {
    fn append_row(&mut self, row: &str) -> io::Result<()> {
        self.0.borrow_mut().push(row.to_owned());
        Ok(())
    }
}

struct Broken;

impl RowSink for Broken {
    fn append_row(&mut self, _row: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
}

fn actor(health: f32) -> ActorSnapshot {
    ActorSnapshot {
        position: Vec2::ZERO,
        health,
        max_health: 10.0,
        ammo: 6,
        max_ammo: 6,
        autonomous: true,
    }
}

fn enemy(health: f32) -> EnemySnapshot {
    EnemySnapshot {
        id: EnemyId::new(0),
        position: Vec2::ZERO,
        health,
        max_health: 100.0,
    }
}

fn golem_wave() -> WaveDefinition {
    WaveDefinition::new(vec![WaveEntry::new("Golem", 1, "Tank")])
}

#[test]
fn benchmark_rows_average_rating_and_compare_against_baseline() {
    let recorder = Recorder::default();
    let mut telemetry = Telemetry::with_sink(Box::new(recorder.clone()));
    telemetry.write_round_header();

    telemetry.set_wave(AiLabel::Random, &golem_wave());
    telemetry.record_health(&actor(5.0), &[enemy(0.0)]);
    telemetry.record_outcome(RoundOutcome::Win);
    telemetry.record_health(&actor(0.0), &[enemy(50.0)]);
    telemetry.record_outcome(RoundOutcome::Loss);
    telemetry.set_round_time(Duration::from_millis(2500));
    let random = telemetry.flush_round(Some(2));
    assert_eq!(random.rating, 0.0);
    assert_eq!(random.rating_delta, 0.0);
    assert_eq!(random.win_percent, 50.0);

    telemetry.set_wave(AiLabel::Smart, &golem_wave());
    telemetry.record_health(&actor(8.0), &[enemy(0.0)]);
    telemetry.record_outcome(RoundOutcome::Win);
    telemetry.record_health(&actor(6.0), &[enemy(0.0)]);
    telemetry.record_outcome(RoundOutcome::Win);
    let smart = telemetry.flush_round(Some(2));
    assert_eq!(smart.rating, 70.0);
    assert_eq!(smart.rating_delta, 70.0);
    assert_eq!(smart.win_percent, 100.0);

    let rows = recorder.0.borrow();
    assert_eq!(rows[0], ROUND_HEADER);
    assert_eq!(
        rows[1],
        "Random, Tank, 1xGolem, 0.0%, 0.0%, 1, 1, 50%, 2.5, 0.0%, 0.0%, 0.0%, 0.0%"
    );
    assert!(rows[2].starts_with("Smart, Tank, 1xGolem, 70.0%, 70.0%, 2, 0, 100%"));
}

#[test]
fn manual_rows_use_raw_health_difference() {
    let mut telemetry = Telemetry::new();
    telemetry.set_wave(
        AiLabel::Manual,
        &WaveDefinition::new(vec![
            WaveEntry::new("Golem", 1, "Tank"),
            WaveEntry::new("Harpy", 2, "Flyer"),
        ]),
    );
    telemetry.record_health(&actor(0.0), &[enemy(25.0), enemy(75.0)]);
    telemetry.record_outcome(RoundOutcome::Loss);

    let row = telemetry.flush_round(None);
    assert_eq!(row.category, "Mixed");
    assert_eq!(row.composition, "1xGolem/2xHarpy");
    assert_eq!(row.rating, -50.0);
    assert_eq!(row.win_percent, 0.0);
}

#[test]
fn run_summary_is_preceded_by_its_header() {
    let recorder = Recorder::default();
    let mut telemetry = Telemetry::with_sink(Box::new(recorder.clone()));
    telemetry.record_outcome(RoundOutcome::Win);
    let _ = telemetry.flush_round(None);
    let run = telemetry.flush_run(Duration::from_secs(4));
    assert_eq!(run.rounds, 1);

    let rows = recorder.0.borrow();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], RUN_HEADER);
    assert_eq!(rows[2], "1, 1, 0, 4.00, 0.00, 0.0, 0.0, 0.0, 0.0, 0");
}

#[test]
fn sink_failures_surface_on_flush() {
    let mut telemetry = Telemetry::with_sink(Box::new(Broken));
    telemetry.write_round_header();
    let error = telemetry.flush_sink().expect_err("write failed earlier");
    assert_eq!(error.kind(), io::ErrorKind::Other);
    assert!(telemetry.flush_sink().is_ok());
}
