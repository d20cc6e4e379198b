//! Row layouts written by the telemetry aggregator.
//!
//! Column order and count are consumed by external spreadsheets; keep the
//! headers and the `Display` implementations in lockstep.

use std::{
    fmt,
    io::{self, Write},
};

/// Header written whenever the game mode changes.
pub const ROUND_HEADER: &str = "AI TYPE, CATEGORY, ENEMIES, RATING, DIFF, WINS, LOSSES, WIN %, \
ROUND TIME, MELEE %, RANGED %, RELOAD %, AOE %";

/// Header written before every run summary row.
pub const RUN_HEADER: &str = "TOTAL ROUNDS, TOTAL WINS, TOTAL LOSSES, TOTAL TIME, DPS, \
TOTAL DAMAGE, MELEE DAMAGE, RANGED DAMAGE, AOE DAMAGE, PERFECT RELOAD COUNT";

/// Aggregated results of one wave.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundRow {
    /// Controlling AI label.
    pub ai: String,
    /// Category column of the wave.
    pub category: String,
    /// Composition column such as `3xGolem/2xHarpy`.
    pub composition: String,
    /// Health-percent rating.
    pub rating: f32,
    /// Rating minus the baseline rating recorded for the same wave slot.
    pub rating_delta: f32,
    /// Rounds won.
    pub wins: u32,
    /// Rounds lost.
    pub losses: u32,
    /// Wins as a percentage of rounds played.
    pub win_percent: f32,
    /// Duration of the last round in seconds.
    pub round_time: f32,
    /// Usage share of melee, ranged, reload and AOE, in percent.
    pub usage: [f32; 4],
}

impl fmt::Display for RoundRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [melee, ranged, reload, aoe] = self.usage;
        write!(
            f,
            "{}, {}, {}, {:.1}%, {:.1}%, {}, {}, {:.0}%, {:.1}, {:.1}%, {:.1}%, {:.1}%, {:.1}%",
            self.ai,
            self.category,
            self.composition,
            self.rating,
            self.rating_delta,
            self.wins,
            self.losses,
            self.win_percent,
            self.round_time,
            melee,
            ranged,
            reload,
            aoe,
        )
    }
}

/// Aggregated results of a whole run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunRow {
    /// Rounds won plus rounds lost.
    pub rounds: u32,
    /// Rounds won.
    pub wins: u32,
    /// Rounds lost.
    pub losses: u32,
    /// Run duration in seconds.
    pub total_time: f32,
    /// Total damage divided by run duration; zero when no time elapsed.
    pub damage_per_second: f32,
    /// Melee, ranged and AOE damage combined.
    pub total_damage: f32,
    /// Damage dealt by melee strikes.
    pub melee_damage: f32,
    /// Damage dealt by projectiles.
    pub ranged_damage: f32,
    /// Damage dealt by AOE sweeps.
    pub aoe_damage: f32,
    /// Shots that consumed a perfect-reload bonus.
    pub perfect_reloads: u32,
}

impl fmt::Display for RunRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {:.2}, {:.2}, {:.1}, {:.1}, {:.1}, {:.1}, {}",
            self.rounds,
            self.wins,
            self.losses,
            self.total_time,
            self.damage_per_second,
            self.total_damage,
            self.melee_damage,
            self.ranged_damage,
            self.aoe_damage,
            self.perfect_reloads,
        )
    }
}

/// Destination for formatted telemetry rows.
pub trait RowSink {
    /// Appends one row.
    fn append_row(&mut self, row: &str) -> io::Result<()>;

    /// Pushes buffered rows to their destination.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes one row per line into any [`Write`] implementation.
#[derive(Debug)]
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    /// Wraps the provided writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RowSink for WriterSink<W> {
    fn append_row(&mut self, row: &str) -> io::Result<()> {
        writeln!(self.writer, "{row}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
