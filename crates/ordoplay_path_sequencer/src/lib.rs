// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timed path playback for OrdoPlay.
//!
//! This crate drives a movable body through authored attack patterns:
//! - Eased point-to-point glides
//! - Duration, speed or fallback segment timing
//! - Approach strategies for reaching a segment start
//! - World or reference-relative coordinates
//! - Looping and one-pass pattern playback
//!
//! ## Architecture
//!
//! Playback is a tick-driven state machine. The host owns the body and
//! calls [`PathSequencer::tick`] once per fixed simulation step; the
//! sequencer reads the body's position and commands new ones. Nothing runs
//! between ticks, and stopping simply drops the in-flight glide.

pub mod body;
pub mod easing;
pub mod glide;
pub mod host;
pub mod math;
pub mod pattern;
pub mod resolve;
pub mod sequencer;

pub use body::{Body, BodyCommand, CommandKind, KinematicBody};
pub use easing::ease;
pub use glide::GlideTask;
pub use host::{FixedStepClock, PathMover};
pub use math::{Point2, Transform2};
pub use pattern::{CoordinateSpace, Pattern, PatternError, PatternId, PatternLibrary, Segment};
pub use resolve::{resolve, ReferenceFrame};
pub use sequencer::{
    ApproachMode, ApproachSettings, PathSequencer, PlaybackOptions, SequencerId, SequencerPhase,
    SequencerState,
};
