// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host-side glue: enable/disable lifecycle and fixed-step timing.
//!
//! [`PathMover`] is the component a game object owns: enabling it restarts
//! playback from the first pattern, disabling it cancels playback.
//! [`FixedStepClock`] turns variable frame times into fixed simulation ticks.

use crate::body::Body;
use crate::pattern::Pattern;
use crate::resolve::ReferenceFrame;
use crate::sequencer::{ApproachSettings, PathSequencer, PlaybackOptions};
use std::sync::Arc;

/// Maximum fixed steps per frame before the backlog is dropped
pub const MAX_STEPS_PER_FRAME: u32 = 8;

/// Default simulation step (50 Hz)
pub const DEFAULT_FIXED_STEP: f32 = 0.02;

/// Pattern playback component with an enable/disable lifecycle
#[derive(Debug, Clone)]
pub struct PathMover {
    sequencer: PathSequencer,
    patterns: Arc<[Pattern]>,
    options: PlaybackOptions,
    enabled: bool,
}

impl PathMover {
    /// Create a disabled mover
    pub fn new(patterns: Arc<[Pattern]>, approach: ApproachSettings, options: PlaybackOptions) -> Self {
        Self {
            sequencer: PathSequencer::new(approach),
            patterns,
            options,
            enabled: false,
        }
    }

    /// Whether the mover is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the mover.
    ///
    /// Only transitions have an effect: enabling restarts playback from
    /// pattern 0, disabling cancels it.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.restart();
        } else {
            self.sequencer.stop();
        }
    }

    /// Restart playback from pattern 0 without toggling
    pub fn restart(&mut self) {
        self.sequencer.start_with(Arc::clone(&self.patterns), self.options);
    }

    /// Replace the pattern list; used from the next restart
    pub fn set_patterns(&mut self, patterns: Arc<[Pattern]>) {
        self.patterns = patterns;
    }

    /// Playback options
    pub fn options(&self) -> &PlaybackOptions {
        &self.options
    }

    /// Change looping for the current run and later ones
    pub fn set_looping(&mut self, looping: bool) {
        self.options.looping = looping;
        self.sequencer.set_looping(looping);
    }

    /// The underlying sequencer
    pub fn sequencer(&self) -> &PathSequencer {
        &self.sequencer
    }

    /// Advance one fixed simulation tick
    pub fn fixed_update(&mut self, dt: f32, body: &mut dyn Body, frame: Option<&dyn ReferenceFrame>) {
        if self.enabled {
            self.sequencer.tick(dt, body, frame);
        }
    }
}

/// Fixed-timestep accumulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepClock {
    step: f32,
    accumulated: f32,
    /// Multiplier applied to frame time
    pub time_scale: f32,
}

impl FixedStepClock {
    /// Create a clock with a step in seconds
    pub fn new(step: f32) -> Self {
        let step = if step.is_finite() && step > 0.0 {
            step
        } else {
            tracing::warn!(step, "Invalid fixed step, using default");
            DEFAULT_FIXED_STEP
        };
        Self {
            step,
            accumulated: 0.0,
            time_scale: 1.0,
        }
    }

    /// Fixed step in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Fraction of a step accumulated but not yet simulated
    pub fn alpha(&self) -> f32 {
        self.accumulated / self.step
    }

    /// Add frame time and return the number of fixed steps to run
    pub fn advance(&mut self, frame_time: f32) -> u32 {
        if !frame_time.is_finite() || frame_time <= 0.0 {
            return 0;
        }

        self.accumulated += frame_time * self.time_scale;

        let mut steps = 0;
        while self.accumulated >= self.step {
            self.accumulated -= self.step;
            steps += 1;

            // Drop the backlog rather than spiral
            if steps >= MAX_STEPS_PER_FRAME {
                tracing::debug!("Fixed step backlog dropped");
                self.accumulated = 0.0;
                break;
            }
        }

        steps
    }
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_STEP)
    }
}
