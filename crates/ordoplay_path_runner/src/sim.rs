// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless fixed-step simulation of one path mover.

use crate::settings::{EnableToggle, RunnerError, RunnerSettings};
use ordoplay_path_sequencer::{
    Body, CommandKind, FixedStepClock, KinematicBody, PathMover, Pattern, PatternLibrary, Point2,
    ReferenceFrame, SequencerPhase, Transform2,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;

/// One line of trace output
#[derive(Debug, Clone, Serialize)]
pub struct TraceSample {
    /// Fixed tick number
    pub tick: u64,
    /// Simulated time at the end of the tick
    pub time: f32,
    /// Body position
    pub x: f32,
    /// Body position
    pub y: f32,
    /// Sequencer phase
    pub phase: SequencerPhase,
    /// Current pattern index
    pub pattern: usize,
    /// Whether the body is hazardous
    pub hazardous: bool,
    /// Last command kind issued this tick
    pub command: Option<CommandKind>,
}

/// Totals for a finished session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Fixed ticks simulated
    pub ticks: u64,
    /// Kinematic moves issued
    pub moves: usize,
    /// Teleports issued
    pub teleports: usize,
    /// Body position at the end
    pub final_position: Point2,
    /// Sequencer phase at the end
    pub final_phase: SequencerPhase,
}

/// A mover, its body and a clock
pub struct Simulation {
    mover: PathMover,
    body: KinematicBody,
    clock: FixedStepClock,
    reference_frame: Option<Transform2>,
    frame_time: f32,
    duration: f32,
    sample_every: u32,
    toggles: Vec<EnableToggle>,
}

impl Simulation {
    /// Build a session from settings and a pattern library
    pub fn new(settings: &RunnerSettings, library: &PatternLibrary) -> Result<Self, RunnerError> {
        settings.validate()?;

        let patterns: Arc<[Pattern]> = if settings.playlist.is_empty() {
            library.all()
        } else {
            library.playlist(settings.playlist.as_slice())
        };

        if patterns.is_empty() {
            tracing::warn!("No patterns to play; the mover will stay idle");
        }

        let mut toggles = settings.toggles.clone();
        toggles.sort_by(|a, b| a.time.total_cmp(&b.time));

        Ok(Self {
            mover: PathMover::new(patterns, settings.approach, settings.playback),
            body: KinematicBody::new(settings.start_position),
            clock: FixedStepClock::new(settings.fixed_step()),
            reference_frame: settings.reference_frame,
            frame_time: settings.frame_time,
            duration: settings.duration,
            sample_every: settings.sample_every,
            toggles,
        })
    }

    /// Run to completion, writing JSON lines to `out`
    pub fn run(mut self, out: &mut dyn Write) -> Result<RunSummary, RunnerError> {
        let step = self.clock.step();
        let mut elapsed = 0.0f32;
        let mut sim_time = 0.0f32;
        let mut tick = 0u64;
        let mut moves = 0usize;
        let mut teleports = 0usize;
        let mut next_toggle = 0usize;

        self.mover.set_enabled(true);

        while elapsed < self.duration {
            elapsed += self.frame_time;
            let steps = self.clock.advance(self.frame_time);

            for _ in 0..steps {
                sim_time += step;
                tick += 1;

                while let Some(toggle) = self.toggles.get(next_toggle) {
                    if toggle.time > sim_time {
                        break;
                    }
                    tracing::info!(time = toggle.time, enabled = toggle.enabled, "Toggling mover");
                    self.mover.set_enabled(toggle.enabled);
                    next_toggle += 1;
                }

                let frame = self.reference_frame.as_ref().map(|f| f as &dyn ReferenceFrame);
                self.mover.fixed_update(step, &mut self.body, frame);

                let commands = self.body.take_commands();
                for command in &commands {
                    match command.kind {
                        CommandKind::Move => moves += 1,
                        CommandKind::Teleport => teleports += 1,
                    }
                }

                if tick % u64::from(self.sample_every) == 0 {
                    let sequencer = self.mover.sequencer();
                    let position = self.body.position();
                    let sample = TraceSample {
                        tick,
                        time: sim_time,
                        x: position.x,
                        y: position.y,
                        phase: sequencer.phase(),
                        pattern: sequencer.state().pattern_index,
                        hazardous: sequencer.is_hazardous(),
                        command: commands.last().map(|c| c.kind),
                    };
                    serde_json::to_writer(&mut *out, &sample)?;
                    writeln!(out)?;
                }
            }
        }

        let summary = RunSummary {
            ticks: tick,
            moves,
            teleports,
            final_position: self.body.position(),
            final_phase: self.mover.sequencer().phase(),
        };

        tracing::info!(
            ticks = summary.ticks,
            moves = summary.moves,
            teleports = summary.teleports,
            x = summary.final_position.x,
            y = summary.final_position.y,
            phase = ?summary.final_phase,
            "Simulation finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordoplay_path_sequencer::{CoordinateSpace, PlaybackOptions, Segment};

    fn library() -> PatternLibrary {
        let mut library = PatternLibrary::new();
        library
            .insert(
                "dash",
                Pattern::new()
                    .with_pre_delay(0.0)
                    .with_segment(Segment::new(Point2::ZERO, Point2::new(1.0, 0.0)).with_duration(1.0)),
            )
            .unwrap();
        library
            .insert(
                "orbit",
                Pattern::new()
                    .with_pre_delay(0.0)
                    .with_space(CoordinateSpace::RelativeToReference)
                    .with_segment(Segment::new(Point2::ZERO, Point2::new(0.0, 1.0)).with_duration(1.0)),
            )
            .unwrap();
        library
    }

    fn settings() -> RunnerSettings {
        RunnerSettings {
            playlist: vec!["dash".to_string()],
            tick_rate: 4.0,
            frame_time: 0.25,
            duration: 2.0,
            start_position: Point2::ZERO,
            playback: PlaybackOptions {
                looping: false,
                rest_between_patterns: 0.0,
            },
            reference_frame: None,
            ..RunnerSettings::default()
        }
    }

    fn lines(out: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_one_pass_run() {
        let sim = Simulation::new(&settings(), &library()).unwrap();
        let mut out = Vec::new();
        let summary = sim.run(&mut out).unwrap();

        assert_eq!(summary.ticks, 8);
        assert_eq!(summary.moves, 4);
        assert_eq!(summary.teleports, 0);
        assert_eq!(summary.final_position, Point2::new(1.0, 0.0));
        assert_eq!(summary.final_phase, SequencerPhase::Stopped);

        let trace = lines(&out);
        assert_eq!(trace.len(), 8);
        assert_eq!(trace[0]["phase"], "Traveling");
        assert_eq!(trace[0]["command"], "Move");
        assert_eq!(trace[0]["x"], 0.25);
        assert_eq!(trace[7]["phase"], "Stopped");
        assert!(trace[7]["command"].is_null());
    }

    #[test]
    fn test_toggle_stops_mover() {
        let mut settings = settings();
        settings.toggles = vec![EnableToggle {
            time: 0.5,
            enabled: false,
        }];

        let sim = Simulation::new(&settings, &library()).unwrap();
        let summary = sim.run(&mut std::io::sink()).unwrap();

        assert_eq!(summary.moves, 1);
        assert_eq!(summary.final_position, Point2::new(0.25, 0.0));
        assert_eq!(summary.final_phase, SequencerPhase::Stopped);
    }

    #[test]
    fn test_reenable_restarts_playback() {
        let mut settings = settings();
        settings.duration = 3.0;
        settings.toggles = vec![
            EnableToggle {
                time: 0.5,
                enabled: false,
            },
            EnableToggle {
                time: 1.0,
                enabled: true,
            },
        ];

        let sim = Simulation::new(&settings, &library()).unwrap();
        let summary = sim.run(&mut std::io::sink()).unwrap();

        // Re-enabled at (0.25, 0): glides back to the start, then runs the pass
        assert_eq!(summary.final_position, Point2::new(1.0, 0.0));
        assert_eq!(summary.final_phase, SequencerPhase::Stopped);
    }

    #[test]
    fn test_relative_pattern_uses_reference_frame() {
        let mut settings = settings();
        settings.playlist = vec!["orbit".to_string()];
        settings.start_position = Point2::new(5.0, 5.0);
        settings.reference_frame = Some(Transform2::from_position(Point2::new(5.0, 5.0)));

        let sim = Simulation::new(&settings, &library()).unwrap();
        let summary = sim.run(&mut std::io::sink()).unwrap();
        assert_eq!(summary.final_position, Point2::new(5.0, 6.0));
    }

    #[test]
    fn test_sampling_interval() {
        let mut settings = settings();
        settings.sample_every = 4;

        let sim = Simulation::new(&settings, &library()).unwrap();
        let mut out = Vec::new();
        sim.run(&mut out).unwrap();
        assert_eq!(lines(&out).len(), 2);
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let mut no_sampling = settings();
        no_sampling.sample_every = 0;
        assert!(matches!(
            Simulation::new(&no_sampling, &library()),
            Err(RunnerError::InvalidSetting { name: "sample_every", .. })
        ));

        let mut bad_frame = settings();
        bad_frame.frame_time = f32::NAN;
        assert!(Simulation::new(&bad_frame, &library()).is_err());
    }

    #[test]
    fn test_unknown_playlist_stays_idle() {
        let mut settings = settings();
        settings.playlist = vec!["missing".to_string()];

        let sim = Simulation::new(&settings, &library()).unwrap();
        let summary = sim.run(&mut std::io::sink()).unwrap();
        assert_eq!(summary.moves, 0);
        assert_eq!(summary.final_phase, SequencerPhase::Idle);
    }
}
