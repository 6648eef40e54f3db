//! Staged playback of a fake generation pipeline.
//!
//! [`GenerationRun`] is a pure state machine advanced one [`GenerationRun::tick`]
//! at a time; [`ticker`] drives it on a cancellable timer.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub mod ticker;

pub const INITIAL_LINE: &str = "[INFO] Initializing project generation...";

pub const SCRIPT: [&str; 10] = [
    "[INFO] Starting project generation...",
    "[INFO] Analyzing prompt and extracting requirements...",
    "[INFO] Building project specification...",
    "[INFO] Generating code structure...",
    "[INFO] Creating main application files...",
    "[INFO] Setting up dependencies...",
    "[INFO] Writing configuration files...",
    "[INFO] Validating generated code...",
    "[INFO] Running tests...",
    "[INFO] Project generation completed successfully!",
];

pub const STEP_LABELS: [&str; 3] = ["Understanding Prompt", "Generating Skeleton", "Validating"];

/// Progress increments per band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    /// +5 until 90, then +2.
    #[default]
    Standard,
    /// +8 until 90, then +5.
    Fast,
}

impl Pace {
    fn increment(&self, progress: u32) -> u32 {
        let coarse = progress < 90;
        match (self, coarse) {
            (Pace::Standard, true) => 5,
            (Pace::Standard, false) => 2,
            (Pace::Fast, true) => 8,
            (Pace::Fast, false) => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
}

/// Wizard step for a progress value.
pub fn step_for(progress: u32) -> u8 {
    match progress {
        0..=29 => 1,
        30..=59 => 2,
        _ => 3,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRun {
    pub run_id: u32,
    pub state: RunState,
    pub step_index: u8,
    #[serde(skip)]
    accumulated: u32,
    pub log: Vec<String>,
    #[serde(skip)]
    script_pos: usize,
    #[serde(skip)]
    pace: Pace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_request: Option<String>,
    pub ticks: u32,
}

impl GenerationRun {
    pub fn new(run_id: u32, pace: Pace) -> Self {
        Self {
            run_id,
            state: RunState::Idle,
            step_index: 1,
            accumulated: 0,
            log: Vec::new(),
            script_pos: 0,
            pace,
            change_request: None,
            ticks: 0,
        }
    }

    /// Enter `Running` with a fresh log. The change request is recorded on
    /// the run; the script played back does not depend on it.
    pub fn start(&mut self, change_request: Option<String>) {
        self.state = RunState::Running;
        self.step_index = 1;
        self.accumulated = 0;
        self.script_pos = 0;
        self.ticks = 0;
        self.log = vec![INITIAL_LINE.to_string()];
        self.change_request = change_request;
    }

    /// Displayed progress, clamped to 0..=100.
    pub fn progress(&self) -> u32 {
        self.accumulated.min(100)
    }

    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Advance one clock period. Returns the new state; ticks outside
    /// `Running` change nothing.
    pub fn tick(&mut self) -> RunState {
        if self.state != RunState::Running {
            return self.state;
        }
        self.ticks += 1;

        if let Some(line) = SCRIPT.get(self.script_pos) {
            self.log.push(line.to_string());
            self.script_pos += 1;
        }

        if self.accumulated >= 100 {
            self.accumulated = 100;
            self.step_index = 3;
            self.state = RunState::Completed;
            return self.state;
        }

        // band is taken before the increment
        let step = step_for(self.accumulated);
        self.accumulated += self.pace.increment(self.accumulated);
        self.step_index = self.step_index.max(step);
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(run: &mut GenerationRun) -> Vec<(u32, u8, usize)> {
        let mut trace = Vec::new();
        while run.tick() != RunState::Completed {
            trace.push((run.progress(), run.step_index, run.log.len()));
            assert!(run.ticks < 1000, "runaway simulation");
        }
        trace.push((run.progress(), run.step_index, run.log.len()));
        trace
    }

    #[test]
    fn idle_run_ignores_ticks() {
        let mut run = GenerationRun::new(1, Pace::Standard);
        assert_eq!(run.tick(), RunState::Idle);
        assert!(run.log.is_empty());
        assert_eq!(run.ticks, 0);
    }

    #[test]
    fn standard_pace_full_playback() {
        let mut run = GenerationRun::new(9, Pace::Standard);
        run.start(None);
        assert_eq!((run.progress(), run.step_index), (0, 1));
        assert_eq!(run.log, vec![INITIAL_LINE]);

        let trace = run_to_end(&mut run);
        assert_eq!(trace.len(), 24);
        assert_eq!(run.progress(), 100);
        assert_eq!(run.step_index, 3);
        assert!(run.is_completed());

        let mut expected = vec![INITIAL_LINE.to_string()];
        expected.extend(SCRIPT.iter().map(|s| s.to_string()));
        assert_eq!(run.log, expected);
    }

    #[test]
    fn fast_pace_clamps_overshoot() {
        let mut run = GenerationRun::new(9, Pace::Fast);
        run.start(None);
        let trace = run_to_end(&mut run);
        // 12 ticks to 96, one more overshoots to 101, then completion
        assert_eq!(trace.len(), 14);
        assert!(trace.iter().all(|(p, _, _)| *p <= 100));
        assert_eq!(run.progress(), 100);
        assert_eq!(run.log.len(), 1 + SCRIPT.len());
    }

    #[test]
    fn progress_step_and_log_are_monotonic() {
        for pace in [Pace::Standard, Pace::Fast] {
            let mut run = GenerationRun::new(1, pace);
            run.start(None);
            let trace = run_to_end(&mut run);
            for w in trace.windows(2) {
                assert!(w[0].0 <= w[1].0);
                assert!(w[0].1 <= w[1].1);
                assert!(w[0].2 <= w[1].2);
            }
        }
    }

    #[test]
    fn steps_follow_bands() {
        let mut run = GenerationRun::new(1, Pace::Standard);
        run.start(None);
        let mut seen = Vec::new();
        while run.tick() == RunState::Running {
            seen.push((run.progress(), run.step_index));
        }
        // step 2 starts on the tick after progress reaches 30
        assert!(seen.contains(&(30, 1)));
        assert!(seen.contains(&(35, 2)));
        assert!(seen.contains(&(65, 3)));
        assert_eq!(step_for(0), 1);
        assert_eq!(step_for(59), 2);
        assert_eq!(step_for(95), 3);
    }

    #[test]
    fn completed_run_is_frozen() {
        let mut run = GenerationRun::new(1, Pace::Fast);
        run.start(None);
        run_to_end(&mut run);
        let before = run.clone();
        assert_eq!(run.tick(), RunState::Completed);
        assert_eq!(run, before);
    }

    #[test]
    fn change_request_does_not_alter_script() {
        let mut plain = GenerationRun::new(1, Pace::Standard);
        plain.start(None);
        run_to_end(&mut plain);

        let mut changed = GenerationRun::new(1, Pace::Standard);
        changed.start(Some("add dark mode".into()));
        run_to_end(&mut changed);

        assert_eq!(plain.log, changed.log);
        assert_eq!(changed.change_request.as_deref(), Some("add dark mode"));
    }

    #[test]
    fn restart_discards_previous_run() {
        let mut run = GenerationRun::new(1, Pace::Standard);
        run.start(None);
        for _ in 0..5 {
            run.tick();
        }
        run.start(None);
        assert_eq!((run.progress(), run.step_index, run.log.len()), (0, 1, 1));
    }
}
