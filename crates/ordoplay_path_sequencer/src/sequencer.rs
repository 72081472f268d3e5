// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pattern playback state machine.
//!
//! A [`PathSequencer`] walks a list of patterns segment by segment:
//! pre-delay, optional approach to the segment start, the eased travel
//! glide, post-wait, and a rest between patterns. It is driven entirely by
//! [`PathSequencer::tick`]; time only passes when the host ticks it.

use crate::body::Body;
use crate::glide::GlideTask;
use crate::math::Point2;
use crate::pattern::{CoordinateSpace, Pattern};
use crate::resolve::{resolve, ReferenceFrame};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Lowest approach speed used when the configured speed is not positive
pub const MIN_APPROACH_SPEED: f32 = 0.0001;

/// Unique identifier for a sequencer instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequencerId(pub Uuid);

impl SequencerId {
    /// Create a new random sequencer ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SequencerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequencerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How the body gets to a segment start it is not already at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ApproachMode {
    /// Teleport to the start
    Snap,
    /// Glide over [`ApproachSettings::duration`]
    #[default]
    GlideByDuration,
    /// Glide at [`ApproachSettings::speed`]
    GlideBySpeed,
    /// Start the segment from wherever the body is
    ContinueFromCurrent,
}

impl ApproachMode {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snap => "Snap",
            Self::GlideByDuration => "Glide (duration)",
            Self::GlideBySpeed => "Glide (speed)",
            Self::ContinueFromCurrent => "Continue from current",
        }
    }
}

/// Approach behavior shared by every segment a sequencer plays
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApproachSettings {
    /// Approach mode
    pub mode: ApproachMode,
    /// Glide time for [`ApproachMode::GlideByDuration`]
    pub duration: f32,
    /// Glide speed for [`ApproachMode::GlideBySpeed`]
    pub speed: f32,
    /// Ease power for approach glides
    pub ease_power: f32,
    /// Wait after arriving (not used by [`ApproachMode::ContinueFromCurrent`])
    pub wait_after: f32,
    /// Whether approach glides are hazardous
    pub hazardous: bool,
    /// Distance under which the body already counts as at the start
    pub snap_epsilon: f32,
}

impl Default for ApproachSettings {
    fn default() -> Self {
        Self {
            mode: ApproachMode::GlideByDuration,
            duration: 0.25,
            speed: 12.0,
            ease_power: 0.35,
            wait_after: 0.0,
            hazardous: true,
            snap_epsilon: 0.01,
        }
    }
}

impl ApproachSettings {
    /// Settings with the given mode and default tuning
    pub fn with_mode(mode: ApproachMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Looping and rest options for a playback run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackOptions {
    /// Keep cycling through the patterns
    pub looping: bool,
    /// Wait after each pattern
    pub rest_between_patterns: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            looping: true,
            rest_between_patterns: 0.5,
        }
    }
}

/// Observable phase of a sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SequencerPhase {
    /// Not started, or about to begin the current pattern
    #[default]
    Idle,
    /// Waiting out the pattern's pre-delay
    PreDelay,
    /// Bringing the body to the segment start
    Approaching,
    /// Gliding along the segment
    Traveling,
    /// Waiting after a segment
    PostWait,
    /// Waiting between patterns
    Resting,
    /// Cancelled, or a non-looping pass finished
    Stopped,
}

/// Mutable playback state, reset on every start except for the last known position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerState {
    /// Index of the current pattern
    pub pattern_index: usize,
    /// Index of the current segment within the pattern
    pub segment_index: usize,
    /// Last position read from or commanded to the body
    pub current_position: Point2,
    /// Approach mode in use
    pub approach_mode: ApproachMode,
    /// Whether playback is active
    pub running: bool,
    /// Current phase
    pub phase: SequencerPhase,
}

impl SequencerState {
    fn new(approach_mode: ApproachMode) -> Self {
        Self {
            pattern_index: 0,
            segment_index: 0,
            current_position: Point2::ZERO,
            approach_mode,
            running: false,
            phase: SequencerPhase::Idle,
        }
    }
}

/// Internal step of the state machine; finer grained than [`SequencerPhase`]
#[derive(Debug, Clone, Copy)]
enum Step {
    Idle,
    PreDelay { remaining: f32 },
    BeginSegment,
    Approach { glide: GlideTask, travel_from: Point2, travel_to: Point2 },
    ApproachWait { remaining: f32, travel_from: Point2, travel_to: Point2 },
    Travel { glide: GlideTask },
    PostWait { remaining: f32 },
    Rest { remaining: f32 },
    Stopped,
}

impl Step {
    fn phase(&self) -> SequencerPhase {
        match self {
            Step::Idle => SequencerPhase::Idle,
            Step::PreDelay { .. } => SequencerPhase::PreDelay,
            Step::BeginSegment | Step::Approach { .. } | Step::ApproachWait { .. } => {
                SequencerPhase::Approaching
            }
            Step::Travel { .. } => SequencerPhase::Traveling,
            Step::PostWait { .. } => SequencerPhase::PostWait,
            Step::Rest { .. } => SequencerPhase::Resting,
            Step::Stopped => SequencerPhase::Stopped,
        }
    }
}

/// Consume up to `remaining` seconds of `budget`.
///
/// Returns the time still left to wait, or `None` when the wait is over.
fn consume(remaining: f32, budget: &mut f32) -> Option<f32> {
    if remaining.is_nan() || remaining <= *budget {
        *budget -= remaining.max(0.0);
        None
    } else {
        let left = remaining - *budget;
        *budget = 0.0;
        Some(left)
    }
}

/// Body wrapper that remembers the last commanded position
struct Tracked<'a> {
    body: &'a mut dyn Body,
    last: &'a mut Point2,
}

impl Body for Tracked<'_> {
    fn position(&self) -> Point2 {
        self.body.position()
    }

    fn set_position(&mut self, position: Point2) {
        *self.last = position;
        self.body.set_position(position);
    }

    fn move_position(&mut self, position: Point2) {
        *self.last = position;
        self.body.move_position(position);
    }
}

/// Plays patterns on a body, one tick at a time
#[derive(Debug, Clone)]
pub struct PathSequencer {
    id: SequencerId,
    approach: ApproachSettings,
    patterns: Arc<[Pattern]>,
    looping: bool,
    rest_between_patterns: f32,
    state: SequencerState,
    step: Step,
}

impl PathSequencer {
    /// Create an idle sequencer
    pub fn new(approach: ApproachSettings) -> Self {
        Self {
            id: SequencerId::new(),
            approach,
            patterns: Arc::from(Vec::<Pattern>::new()),
            looping: true,
            rest_between_patterns: 0.0,
            state: SequencerState::new(approach.mode),
            step: Step::Idle,
        }
    }

    /// Sequencer ID
    pub fn id(&self) -> SequencerId {
        self.id
    }

    /// Current state
    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> SequencerPhase {
        self.state.phase
    }

    /// Whether playback is active
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Patterns being played
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Approach settings
    pub fn approach(&self) -> &ApproachSettings {
        &self.approach
    }

    /// Replace the approach settings; takes effect from the next approach
    pub fn set_approach(&mut self, approach: ApproachSettings) {
        self.approach = approach;
        self.state.approach_mode = approach.mode;
    }

    /// Whether playback loops
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Change looping mid-run.
    ///
    /// Turning looping off lets the run continue until it wraps back to
    /// pattern 0.
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Whether the body is in a glide that should deal contact damage
    pub fn is_hazardous(&self) -> bool {
        match &self.step {
            Step::Approach { glide, .. } | Step::Travel { glide } => glide.hazardous,
            _ => false,
        }
    }

    /// Begin playback from pattern 0, cancelling any run in progress.
    ///
    /// With no patterns the sequencer stays idle.
    pub fn start(&mut self, patterns: Arc<[Pattern]>, looping: bool, rest_between_patterns: f32) {
        if self.state.running {
            tracing::debug!(sequencer = %self.id, "Restarting playback");
        }

        self.patterns = patterns;
        self.looping = looping;
        self.rest_between_patterns = rest_between_patterns.max(0.0);
        // The body has not moved since the last tick
        let current_position = self.state.current_position;
        self.state = SequencerState {
            current_position,
            ..SequencerState::new(self.approach.mode)
        };
        self.step = Step::Idle;

        if self.patterns.is_empty() {
            tracing::debug!(sequencer = %self.id, "No patterns, staying idle");
            return;
        }

        self.state.running = true;
        tracing::info!(
            sequencer = %self.id,
            patterns = self.patterns.len(),
            looping,
            "Started path playback"
        );
    }

    /// Start with options from configuration
    pub fn start_with(&mut self, patterns: Arc<[Pattern]>, options: PlaybackOptions) {
        self.start(patterns, options.looping, options.rest_between_patterns);
    }

    /// Cancel playback immediately.
    ///
    /// Any glide in flight is dropped; the body keeps its last commanded
    /// position.
    pub fn stop(&mut self) {
        if self.step.phase() == SequencerPhase::Stopped && !self.state.running {
            return;
        }
        self.state.running = false;
        self.set_step(Step::Stopped);
        tracing::info!(sequencer = %self.id, "Stopped path playback");
    }

    fn set_step(&mut self, step: Step) {
        let phase = step.phase();
        if phase != self.state.phase {
            tracing::debug!(
                sequencer = %self.id,
                pattern = self.state.pattern_index,
                segment = self.state.segment_index,
                from = ?self.state.phase,
                to = ?phase,
                "Phase change"
            );
            self.state.phase = phase;
        }
        self.step = step;
    }

    /// Move to the next pattern. Returns false when the run is over.
    fn advance_pattern(&mut self) -> bool {
        self.state.pattern_index = (self.state.pattern_index + 1) % self.patterns.len();
        self.state.segment_index = 0;

        if self.looping || self.state.pattern_index != 0 {
            self.set_step(Step::Idle);
            true
        } else {
            self.state.running = false;
            self.set_step(Step::Stopped);
            tracing::info!(sequencer = %self.id, "Pattern pass complete");
            false
        }
    }

    /// Advance playback by `dt` seconds.
    ///
    /// Time left over when a phase ends flows into the next one. Each glide
    /// samples at most once per tick. Non-positive or non-finite `dt` is
    /// ignored.
    pub fn tick(&mut self, dt: f32, body: &mut dyn Body, frame: Option<&dyn ReferenceFrame>) {
        if !self.state.running || !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let patterns = Arc::clone(&self.patterns);
        let mut last = self.state.current_position;
        let mut body = Tracked {
            body,
            last: &mut last,
        };

        let mut budget = dt;
        let mut pattern_budget = budget;
        let mut stalled = 0usize;

        loop {
            let pattern = &patterns[self.state.pattern_index];

            match self.step {
                Step::Idle => {
                    pattern_budget = budget;
                    if pattern.is_empty() {
                        tracing::debug!(
                            sequencer = %self.id,
                            pattern = self.state.pattern_index,
                            "Empty pattern, skipping"
                        );
                        if !self.advance_pattern() {
                            break;
                        }
                        stalled += 1;
                        if stalled >= patterns.len() {
                            break;
                        }
                        continue;
                    }
                    if pattern.space == CoordinateSpace::RelativeToReference
                        && frame.is_none()
                    {
                        tracing::warn!(
                            sequencer = %self.id,
                            pattern = self.state.pattern_index,
                            "Relative pattern without a reference frame, using world space"
                        );
                    }
                    *body.last = body.position();
                    self.state.segment_index = 0;
                    tracing::debug!(
                        sequencer = %self.id,
                        pattern = self.state.pattern_index,
                        pattern_id = %pattern.id,
                        "Starting pattern"
                    );
                    self.set_step(Step::PreDelay {
                        remaining: pattern.pre_delay,
                    });
                }

                Step::PreDelay { remaining } => {
                    if let Some(left) = consume(remaining, &mut budget) {
                        self.step = Step::PreDelay { remaining: left };
                        break;
                    }
                    *body.last = body.position();
                    self.set_step(Step::BeginSegment);
                }

                Step::BeginSegment => {
                    let segment = &pattern.segments[self.state.segment_index];
                    let start = resolve(segment.start, pattern.space, frame);
                    let end = resolve(segment.end, pattern.space, frame);
                    let current = *body.last;
                    let distance = current.distance(start);

                    if distance <= self.approach.snap_epsilon {
                        self.begin_travel(start, end);
                        continue;
                    }

                    tracing::debug!(
                        sequencer = %self.id,
                        mode = self.approach.mode.name(),
                        distance,
                        "Approaching segment start"
                    );

                    match self.approach.mode {
                        ApproachMode::Snap => {
                            body.set_position(start);
                            self.after_approach(start, end);
                        }
                        ApproachMode::ContinueFromCurrent => {
                            self.begin_travel(current, end);
                        }
                        ApproachMode::GlideByDuration => {
                            let glide = GlideTask::new(current, start, self.approach.duration, self.approach.ease_power)
                                .with_hazard(self.approach.hazardous);
                            self.set_step(Step::Approach {
                                glide,
                                travel_from: start,
                                travel_to: end,
                            });
                        }
                        ApproachMode::GlideBySpeed => {
                            if self.approach.speed <= 0.0 {
                                tracing::warn!(
                                    sequencer = %self.id,
                                    speed = self.approach.speed,
                                    "Non-positive approach speed, clamping"
                                );
                            }
                            let duration = distance / self.approach.speed.max(MIN_APPROACH_SPEED);
                            let glide = GlideTask::new(current, start, duration, self.approach.ease_power)
                                .with_hazard(self.approach.hazardous);
                            self.set_step(Step::Approach {
                                glide,
                                travel_from: start,
                                travel_to: end,
                            });
                        }
                    }
                }

                Step::Approach {
                    mut glide,
                    travel_from,
                    travel_to,
                } => {
                    if !glide.is_instant() && budget <= 0.0 {
                        break;
                    }
                    match glide.step(budget, &mut body) {
                        Some(leftover) => {
                            budget = leftover;
                            self.after_approach(travel_from, travel_to);
                        }
                        None => {
                            self.step = Step::Approach {
                                glide,
                                travel_from,
                                travel_to,
                            };
                            break;
                        }
                    }
                }

                Step::ApproachWait {
                    remaining,
                    travel_from,
                    travel_to,
                } => {
                    if let Some(left) = consume(remaining, &mut budget) {
                        self.step = Step::ApproachWait {
                            remaining: left,
                            travel_from,
                            travel_to,
                        };
                        break;
                    }
                    self.begin_travel(travel_from, travel_to);
                }

                Step::Travel { mut glide } => {
                    if !glide.is_instant() && budget <= 0.0 {
                        break;
                    }
                    match glide.step(budget, &mut body) {
                        Some(leftover) => {
                            budget = leftover;
                            *body.last = glide.to;
                            let post_wait = pattern.segments[self.state.segment_index].post_wait;
                            self.set_step(Step::PostWait { remaining: post_wait });
                        }
                        None => {
                            self.step = Step::Travel { glide };
                            break;
                        }
                    }
                }

                Step::PostWait { remaining } => {
                    if let Some(left) = consume(remaining, &mut budget) {
                        self.step = Step::PostWait { remaining: left };
                        break;
                    }
                    if self.state.segment_index + 1 < pattern.segments.len() {
                        self.state.segment_index += 1;
                        self.set_step(Step::BeginSegment);
                    } else {
                        self.set_step(Step::Rest {
                            remaining: self.rest_between_patterns,
                        });
                    }
                }

                Step::Rest { remaining } => {
                    if let Some(left) = consume(remaining, &mut budget) {
                        self.step = Step::Rest { remaining: left };
                        break;
                    }
                    if !self.advance_pattern() {
                        break;
                    }
                    // A whole pass of patterns that took no time ends the tick
                    if budget == pattern_budget {
                        stalled += 1;
                        if stalled >= patterns.len() {
                            break;
                        }
                    } else {
                        stalled = 0;
                    }
                }

                Step::Stopped => break,
            }
        }

        self.state.current_position = last;
    }

    /// Wait after an approach, or go straight to travel
    fn after_approach(&mut self, travel_from: Point2, travel_to: Point2) {
        if self.approach.wait_after > 0.0 {
            self.set_step(Step::ApproachWait {
                remaining: self.approach.wait_after,
                travel_from,
                travel_to,
            });
        } else {
            self.begin_travel(travel_from, travel_to);
        }
    }

    fn begin_travel(&mut self, from: Point2, to: Point2) {
        let pattern = &self.patterns[self.state.pattern_index];
        let segment = &pattern.segments[self.state.segment_index];
        let duration = segment.travel_time(from, to);
        let glide = GlideTask::new(from, to, duration, segment.ease_power);
        self.set_step(Step::Travel { glide });
    }
}

impl Default for PathSequencer {
    fn default() -> Self {
        Self::new(ApproachSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{CommandKind, KinematicBody};
    use crate::math::Transform2;
    use crate::pattern::Segment;

    const DT: f32 = 0.25;

    fn p(x: f32, y: f32) -> Point2 {
        Point2::new(x, y)
    }

    fn line(from: Point2, to: Point2) -> Pattern {
        Pattern::new()
            .with_pre_delay(0.0)
            .with_segment(Segment::new(from, to).with_duration(1.0))
    }

    fn run(seq: &mut PathSequencer, body: &mut KinematicBody, ticks: usize) {
        for _ in 0..ticks {
            seq.tick(DT, body, None);
        }
    }

    fn positions(body: &KinematicBody) -> Vec<Point2> {
        body.commands().iter().map(|c| c.position).collect()
    }

    #[test]
    fn test_segments_chain_without_approach() {
        let pattern = Pattern::new()
            .with_pre_delay(0.0)
            .with_segment(Segment::new(p(0.0, 0.0), p(10.0, 0.0)).with_duration(1.0).with_post_wait(0.25))
            .with_segment(Segment::new(p(10.0, 0.0), p(10.0, 10.0)).with_duration(1.0));

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![pattern]), false, 0.0);

        run(&mut seq, &mut body, 4);
        assert_eq!(seq.phase(), SequencerPhase::PostWait);
        assert_eq!(body.position(), p(10.0, 0.0));

        // Post-wait tick: no motion
        run(&mut seq, &mut body, 1);
        assert_eq!(body.commands().len(), 4);

        run(&mut seq, &mut body, 4);
        assert_eq!(
            positions(&body),
            vec![
                p(2.5, 0.0),
                p(5.0, 0.0),
                p(7.5, 0.0),
                p(10.0, 0.0),
                p(10.0, 2.5),
                p(10.0, 5.0),
                p(10.0, 7.5),
                p(10.0, 10.0),
            ]
        );
        assert_eq!(body.count(CommandKind::Teleport), 0);
        assert_eq!(seq.phase(), SequencerPhase::Stopped);
        assert!(!seq.is_running());
    }

    #[test]
    fn test_fractional_post_wait_carries_into_next_glide() {
        let pattern = Pattern::new()
            .with_pre_delay(0.0)
            .with_segment(Segment::new(p(0.0, 0.0), p(1.0, 0.0)).with_duration(0.5).with_post_wait(0.1))
            .with_segment(Segment::new(p(1.0, 0.0), p(2.0, 0.0)).with_duration(0.5));

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![pattern]), false, 0.0);

        run(&mut seq, &mut body, 2);
        assert_eq!(body.position(), p(1.0, 0.0));

        // 0.1 of wait, then 0.15 into the second glide
        run(&mut seq, &mut body, 1);
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert!(body.position().x > 1.0 && body.position().x < 1.5);

        run(&mut seq, &mut body, 2);
        assert_eq!(body.position(), p(2.0, 0.0));
        assert_eq!(body.count(CommandKind::Teleport), 0);
    }

    #[test]
    fn test_non_looping_plays_every_pattern_once() {
        let patterns: Arc<[Pattern]> = Arc::from(vec![
            line(p(0.0, 0.0), p(1.0, 0.0)),
            line(p(1.0, 0.0), p(2.0, 0.0)),
            line(p(2.0, 0.0), p(3.0, 0.0)),
        ]);

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(patterns, false, 0.0);

        let mut visited = Vec::new();
        let mut ticks = 0;
        while seq.is_running() && ticks < 100 {
            let index = seq.state().pattern_index;
            if visited.last() != Some(&index) {
                visited.push(index);
            }
            seq.tick(DT, &mut body, None);
            ticks += 1;
        }

        assert_eq!(visited, vec![0, 1, 2]);
        assert_eq!(seq.phase(), SequencerPhase::Stopped);
        assert_eq!(body.position(), p(3.0, 0.0));
        // 4 samples per pattern, nothing after stopping
        assert_eq!(body.commands().len(), 12);
    }

    #[test]
    fn test_looping_wraps_around() {
        let patterns: Arc<[Pattern]> = Arc::from(vec![
            line(p(0.0, 0.0), p(1.0, 0.0)),
            line(p(1.0, 0.0), p(0.0, 0.0)),
        ]);

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(patterns, true, 0.0);

        run(&mut seq, &mut body, 12);
        assert!(seq.is_running());
        assert_eq!(seq.state().pattern_index, 1);
        assert_eq!(body.position(), p(1.0, 0.0));

        // Turning looping off finishes the current pass only
        seq.set_looping(false);
        run(&mut seq, &mut body, 20);
        assert_eq!(seq.phase(), SequencerPhase::Stopped);
        assert_eq!(body.position(), p(0.0, 0.0));
    }

    #[test]
    fn test_rest_between_patterns() {
        let patterns: Arc<[Pattern]> = Arc::from(vec![
            line(p(0.0, 0.0), p(1.0, 0.0)),
            line(p(1.0, 0.0), p(2.0, 0.0)),
        ]);

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(patterns, true, 0.5);

        run(&mut seq, &mut body, 4);
        assert_eq!(seq.phase(), SequencerPhase::Resting);
        assert_eq!(seq.state().pattern_index, 0);

        run(&mut seq, &mut body, 2);
        assert_eq!(body.commands().len(), 4);

        run(&mut seq, &mut body, 1);
        assert_eq!(seq.state().pattern_index, 1);
        assert_eq!(body.commands().len(), 5);
    }

    #[test]
    fn test_pre_delay_holds_motion() {
        let pattern = line(p(0.0, 0.0), p(1.0, 0.0)).with_pre_delay(0.5);
        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![pattern]), true, 0.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(seq.phase(), SequencerPhase::PreDelay);
        run(&mut seq, &mut body, 1);
        assert!(body.commands().is_empty());
        run(&mut seq, &mut body, 1);
        assert_eq!(positions(&body), vec![p(0.25, 0.0)]);
    }

    #[test]
    fn test_stop_mid_glide_keeps_last_sample() {
        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        run(&mut seq, &mut body, 2);
        seq.stop();

        assert_eq!(seq.phase(), SequencerPhase::Stopped);
        assert_eq!(seq.state().current_position, p(5.0, 0.0));
        assert_eq!(body.position(), p(5.0, 0.0));

        run(&mut seq, &mut body, 10);
        assert_eq!(body.commands().len(), 2);
    }

    #[test]
    fn test_stop_during_pre_delay_reports_body_position() {
        let pattern = line(p(0.0, 0.0), p(1.0, 0.0)).with_pre_delay(1.0);
        let mut body = KinematicBody::new(p(5.0, 5.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![pattern.clone()]), true, 0.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(seq.phase(), SequencerPhase::PreDelay);
        seq.stop();

        assert_eq!(seq.state().current_position, body.position());
        assert_eq!(seq.state().current_position, p(5.0, 5.0));
        assert!(body.commands().is_empty());

        // A restart keeps the last known position until the next read
        seq.start(Arc::from(vec![pattern]), true, 0.0);
        assert_eq!(seq.state().current_position, p(5.0, 5.0));
    }

    #[test]
    fn test_restart_resets_to_first_pattern() {
        let patterns: Arc<[Pattern]> = Arc::from(vec![
            line(p(0.0, 0.0), p(1.0, 0.0)),
            line(p(1.0, 0.0), p(2.0, 0.0)),
        ]);

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::clone(&patterns), true, 0.0);
        run(&mut seq, &mut body, 6);
        assert_eq!(seq.state().pattern_index, 1);

        seq.start(patterns, true, 0.0);
        assert_eq!(seq.state().pattern_index, 0);
        assert_eq!(seq.phase(), SequencerPhase::Idle);
        assert!(seq.is_running());
    }

    #[test]
    fn test_no_patterns_never_starts() {
        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(Vec::<Pattern>::new()), true, 0.5);

        assert!(!seq.is_running());
        run(&mut seq, &mut body, 5);
        assert_eq!(seq.phase(), SequencerPhase::Idle);
        assert!(body.commands().is_empty());
    }

    #[test]
    fn test_empty_pattern_is_skipped() {
        let patterns: Arc<[Pattern]> = Arc::from(vec![
            Pattern::new().with_pre_delay(5.0),
            line(p(0.0, 0.0), p(1.0, 0.0)),
        ]);

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(patterns, false, 3.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(seq.state().pattern_index, 1);
        assert_eq!(positions(&body), vec![p(0.25, 0.0)]);
    }

    #[test]
    fn test_all_empty_patterns_do_not_spin() {
        let patterns: Arc<[Pattern]> = Arc::from(vec![Pattern::new(), Pattern::new()]);
        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(patterns, true, 0.0);

        run(&mut seq, &mut body, 3);
        assert!(seq.is_running());
        assert!(body.commands().is_empty());
    }

    #[test]
    fn test_zero_time_pattern_does_not_spin() {
        // Speed-driven segment over zero distance takes no time
        let pattern = Pattern::new()
            .with_pre_delay(0.0)
            .with_segment(Segment::new(p(0.0, 0.0), p(0.0, 0.0)).with_speed(5.0));
        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![pattern]), true, 0.0);

        run(&mut seq, &mut body, 2);
        assert!(seq.is_running());
        assert_eq!(body.count(CommandKind::Teleport), 2);
    }

    #[test]
    fn test_snap_approach() {
        let mut body = KinematicBody::new(p(-5.0, 0.0));
        let mut seq = PathSequencer::new(ApproachSettings::with_mode(ApproachMode::Snap));
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(body.commands()[0].kind, CommandKind::Teleport);
        assert_eq!(positions(&body), vec![p(0.0, 0.0), p(2.5, 0.0)]);
    }

    #[test]
    fn test_snap_approach_waits_after() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::Snap);
        settings.wait_after = 0.5;

        let mut body = KinematicBody::new(p(-5.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        run(&mut seq, &mut body, 2);
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert_eq!(positions(&body), vec![p(0.0, 0.0)]);

        run(&mut seq, &mut body, 1);
        assert_eq!(body.position(), p(2.5, 0.0));
    }

    #[test]
    fn test_continue_from_current_skips_approach_and_wait() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::ContinueFromCurrent);
        settings.wait_after = 0.5;

        let mut body = KinematicBody::new(p(-5.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        run(&mut seq, &mut body, 1);
        // Travels from (-5, 0) instead of the authored start
        assert_eq!(positions(&body), vec![p(-1.25, 0.0)]);
        assert_eq!(body.count(CommandKind::Teleport), 0);
    }

    #[test]
    fn test_glide_by_duration_approach() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::GlideByDuration);
        settings.duration = 0.5;
        settings.ease_power = 1.0;
        settings.hazardous = false;

        let mut body = KinematicBody::new(p(-5.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(seq.phase(), SequencerPhase::Approaching);
        assert!(!seq.is_hazardous());

        run(&mut seq, &mut body, 2);
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert!(seq.is_hazardous());
        assert_eq!(positions(&body), vec![p(-2.5, 0.0), p(0.0, 0.0), p(2.5, 0.0)]);
    }

    #[test]
    fn test_glide_by_speed_approach() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::GlideBySpeed);
        settings.speed = 10.0;
        settings.ease_power = 1.0;

        let mut body = KinematicBody::new(p(-5.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        // 5 units at 10 units/s: two ticks of approach
        run(&mut seq, &mut body, 3);
        assert_eq!(positions(&body), vec![p(-2.5, 0.0), p(0.0, 0.0), p(2.5, 0.0)]);
    }

    #[test]
    fn test_zero_approach_speed_is_clamped() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::GlideBySpeed);
        settings.speed = 0.0;

        let mut body = KinematicBody::new(p(-5.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(seq.phase(), SequencerPhase::Approaching);
        assert!(body.position().is_finite());
        assert!(body.position().x >= -5.0 && body.position().x < 0.0);
    }

    fn gapped() -> Arc<[Pattern]> {
        Arc::from(vec![Pattern::new()
            .with_pre_delay(0.0)
            .with_segment(Segment::new(p(0.0, 0.0), p(1.0, 0.0)).with_duration(1.0))
            .with_segment(Segment::new(p(3.0, 0.0), p(4.0, 0.0)).with_duration(1.0))])
    }

    #[test]
    fn test_snap_between_segments() {
        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::new(ApproachSettings::with_mode(ApproachMode::Snap));
        seq.start(gapped(), false, 0.0);

        run(&mut seq, &mut body, 4);
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert_eq!(seq.state().segment_index, 1);
        assert_eq!(body.count(CommandKind::Teleport), 1);
        assert_eq!(body.commands()[4].kind, CommandKind::Teleport);

        run(&mut seq, &mut body, 1);
        assert_eq!(
            positions(&body),
            vec![p(0.25, 0.0), p(0.5, 0.0), p(0.75, 0.0), p(1.0, 0.0), p(3.0, 0.0), p(3.25, 0.0)]
        );
    }

    #[test]
    fn test_snap_between_segments_waits_after() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::Snap);
        settings.wait_after = 0.5;

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(gapped(), false, 0.0);

        run(&mut seq, &mut body, 6);
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert_eq!(body.position(), p(3.0, 0.0));
        assert_eq!(body.commands().len(), 5);

        run(&mut seq, &mut body, 1);
        assert_eq!(body.position(), p(3.25, 0.0));
    }

    #[test]
    fn test_glide_between_segments() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::GlideByDuration);
        settings.duration = 0.5;
        settings.ease_power = 1.0;
        settings.hazardous = false;

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(gapped(), false, 0.0);

        run(&mut seq, &mut body, 5);
        assert_eq!(seq.phase(), SequencerPhase::Approaching);
        assert_eq!(seq.state().segment_index, 1);
        assert!(!seq.is_hazardous());

        run(&mut seq, &mut body, 2);
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert!(seq.is_hazardous());
        assert_eq!(
            positions(&body),
            vec![p(0.25, 0.0), p(0.5, 0.0), p(0.75, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0), p(3.25, 0.0)]
        );
        assert_eq!(body.count(CommandKind::Teleport), 0);
    }

    #[test]
    fn test_continue_from_current_between_segments() {
        let mut settings = ApproachSettings::with_mode(ApproachMode::ContinueFromCurrent);
        settings.wait_after = 0.5;

        // Speed-timed second leg: 3 units from the previous end at 2 units/s
        let pattern = Pattern::new()
            .with_pre_delay(0.0)
            .with_segment(Segment::new(p(0.0, 0.0), p(1.0, 0.0)).with_duration(1.0))
            .with_segment(Segment::new(p(3.0, 0.0), p(4.0, 0.0)).with_speed(2.0));

        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::new(settings);
        seq.start(Arc::from(vec![pattern]), false, 0.0);

        run(&mut seq, &mut body, 5);
        // No wait after the skipped approach
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert!(body.position().x > 1.0 && body.position().x < 3.0);

        run(&mut seq, &mut body, 4);
        assert_eq!(seq.phase(), SequencerPhase::Traveling);
        assert!(body.position().x < 4.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(body.position(), p(4.0, 0.0));
        assert_eq!(seq.phase(), SequencerPhase::Stopped);
        assert_eq!(body.count(CommandKind::Teleport), 0);
    }

    #[test]
    fn test_within_epsilon_skips_approach() {
        let mut body = KinematicBody::new(p(0.005, 0.0));
        let mut seq = PathSequencer::new(ApproachSettings::with_mode(ApproachMode::Snap));
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(10.0, 0.0))]), true, 0.0);

        run(&mut seq, &mut body, 1);
        assert_eq!(body.count(CommandKind::Teleport), 0);
        assert_eq!(positions(&body), vec![p(2.5, 0.0)]);
    }

    #[test]
    fn test_relative_pattern_follows_reference_frame() {
        let pattern = line(p(0.0, 0.0), p(10.0, 0.0)).with_space(CoordinateSpace::RelativeToReference);
        let frame = Transform2::from_position(p(100.0, 50.0));

        let mut body = KinematicBody::new(p(100.0, 50.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![pattern.clone()]), true, 0.0);
        seq.tick(DT, &mut body, Some(&frame));
        assert_eq!(body.position(), p(102.5, 50.0));

        // Without a frame the points are used as world positions
        let mut body = KinematicBody::new(p(0.0, 0.0));
        seq.start(Arc::from(vec![pattern]), true, 0.0);
        seq.tick(DT, &mut body, None);
        assert_eq!(body.position(), p(2.5, 0.0));
    }

    #[test]
    fn test_ignores_bad_delta() {
        let mut body = KinematicBody::new(p(0.0, 0.0));
        let mut seq = PathSequencer::default();
        seq.start(Arc::from(vec![line(p(0.0, 0.0), p(1.0, 0.0))]), true, 0.0);

        seq.tick(0.0, &mut body, None);
        seq.tick(-1.0, &mut body, None);
        seq.tick(f32::NAN, &mut body, None);
        assert!(body.commands().is_empty());
    }
}
