use skirmish_core::{AiLabel, GameMode, WaveDefinition, WaveSets};

/// Wave about to be played.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveStart {
    /// Enemies to spawn for this round.
    pub definition: WaveDefinition,
    /// Whether this is the first round of the wave rather than a benchmark repeat.
    pub fresh: bool,
}

/// Boundary reached after a wave was advanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    /// More waves follow in the same half.
    Continue,
    /// The benchmark crossed from the rule-policy half into the weighted half.
    Midpoint,
    /// Every wave was played.
    Finished,
}

/// Wave index and benchmark round bookkeeping for one game mode.
#[derive(Clone, Debug)]
pub struct WaveProgress {
    mode: GameMode,
    waves: Vec<WaveDefinition>,
    index: usize,
    round: u32,
    runs_per_wave: u32,
    cached: Option<WaveDefinition>,
}

impl WaveProgress {
    /// Starts at the first wave of the list `mode` plays.
    #[must_use]
    pub fn new(sets: &WaveSets, mode: GameMode, runs_per_wave: u32) -> Self {
        Self {
            mode,
            waves: sets.wave_list(mode),
            index: 0,
            round: 0,
            runs_per_wave: runs_per_wave.max(1),
            cached: None,
        }
    }

    /// Game mode being played.
    #[must_use]
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Whether the benchmark rules apply.
    #[must_use]
    pub fn is_benchmark(&self) -> bool {
        self.mode == GameMode::Telemetry
    }

    /// Index of the current wave.
    #[must_use]
    pub fn wave_index(&self) -> usize {
        self.index
    }

    /// Benchmark rounds completed for the current wave.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Rounds each benchmark wave is played.
    #[must_use]
    pub fn runs_per_wave(&self) -> u32 {
        self.runs_per_wave
    }

    /// Number of waves in the list.
    #[must_use]
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// First wave of the weighted half.
    #[must_use]
    pub fn midpoint(&self) -> usize {
        self.waves.len() / 2
    }

    /// Whether the current wave is the first one played by the weighted policy.
    #[must_use]
    pub fn at_midpoint(&self) -> bool {
        self.is_benchmark() && self.index == self.midpoint()
    }

    /// Whether every wave has been played.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.index >= self.waves.len()
    }

    /// Label written on the rows of the current wave.
    #[must_use]
    pub fn ai_label(&self) -> AiLabel {
        match self.mode {
            GameMode::Telemetry if self.index >= self.midpoint() => AiLabel::Smart,
            GameMode::Telemetry => AiLabel::Random,
            GameMode::Normal | GameMode::Group | GameMode::Mixed => AiLabel::Manual,
        }
    }

    /// Returns the wave for the next round, or `None` once the list is exhausted.
    ///
    /// Benchmark repeats reuse the definition captured on the wave's first round.
    pub fn begin(&mut self) -> Option<WaveStart> {
        let current = self.waves.get(self.index)?.clone();
        let fresh = !self.is_benchmark() || self.round == 0;
        if !self.is_benchmark() {
            return Some(WaveStart {
                definition: current,
                fresh,
            });
        }

        if self.round == 0 {
            self.cached = Some(current.clone());
        }
        let definition = self.cached.clone().unwrap_or(current);
        Some(WaveStart { definition, fresh })
    }

    /// Counts a finished benchmark round; returns `true` once the wave has been played enough.
    pub fn complete_round(&mut self) -> bool {
        self.round = self.round.saturating_add(1);
        self.round >= self.runs_per_wave
    }

    /// Moves to the next wave and reports the boundary crossed.
    pub fn advance(&mut self) -> Milestone {
        self.index += 1;
        self.round = 0;
        self.cached = None;
        if self.is_exhausted() {
            Milestone::Finished
        } else if self.at_midpoint() {
            Milestone::Midpoint
        } else {
            Milestone::Continue
        }
    }
}
