// SPDX-License-Identifier: MIT OR Apache-2.0
//! Authored attack patterns: segments, patterns and pattern libraries.

use crate::math::Point2;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Travel time used when a segment has neither a duration nor a speed
pub const FALLBACK_SEGMENT_DURATION: f32 = 0.5;

/// Default wait before a pattern's first segment
pub const DEFAULT_PRE_DELAY: f32 = 0.25;

/// Unique identifier for a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub Uuid);

impl PatternId {
    /// Create a new random pattern ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Coordinate space segment points are authored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CoordinateSpace {
    /// Points are world positions
    #[default]
    World,
    /// Points are local to the sequencer's reference frame
    RelativeToReference,
}

/// One point-to-point leg of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Segment {
    /// Start point in the pattern's space
    pub start: Point2,
    /// End point in the pattern's space
    pub end: Point2,
    /// Exact travel time in seconds (authoritative when > 0)
    pub duration: f32,
    /// Travel speed in units/second (used when `duration` is 0)
    pub speed: f32,
    /// Wait after reaching the end point
    pub post_wait: f32,
    /// Ease power for the glide
    pub ease_power: f32,
}

impl Segment {
    /// Create a segment with fallback timing and linear easing
    pub fn new(start: Point2, end: Point2) -> Self {
        Self {
            start,
            end,
            duration: 0.0,
            speed: 0.0,
            post_wait: 0.0,
            ease_power: 1.0,
        }
    }

    /// Set an exact travel time
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    /// Set a travel speed
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Set the wait after arrival
    pub fn with_post_wait(mut self, post_wait: f32) -> Self {
        self.post_wait = post_wait;
        self
    }

    /// Set the ease power
    pub fn with_ease_power(mut self, ease_power: f32) -> Self {
        self.ease_power = ease_power;
        self
    }

    /// Travel time between two resolved endpoints.
    ///
    /// A positive `duration` wins; otherwise a positive `speed` gives
    /// `distance / speed`; otherwise [`FALLBACK_SEGMENT_DURATION`].
    pub fn travel_time(&self, from: Point2, to: Point2) -> f32 {
        if self.duration > 0.0 {
            self.duration
        } else if self.speed > 0.0 {
            from.distance(to) / self.speed
        } else {
            FALLBACK_SEGMENT_DURATION
        }
    }
}

impl Default for Segment {
    fn default() -> Self {
        Self::new(Point2::ZERO, Point2::ZERO)
    }
}

/// An ordered sequence of segments played as one attack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pattern {
    /// Unique pattern ID
    #[serde(skip)]
    pub id: PatternId,
    /// Wait before the first segment (telegraph time)
    pub pre_delay: f32,
    /// Space the segment points are authored in
    pub space: CoordinateSpace,
    /// Segments in playback order
    pub segments: Vec<Segment>,
}

impl Pattern {
    /// Create an empty world-space pattern
    pub fn new() -> Self {
        Self {
            id: PatternId::new(),
            pre_delay: DEFAULT_PRE_DELAY,
            space: CoordinateSpace::World,
            segments: Vec::new(),
        }
    }

    /// Set the pre-delay
    pub fn with_pre_delay(mut self, pre_delay: f32) -> Self {
        self.pre_delay = pre_delay;
        self
    }

    /// Set the coordinate space
    pub fn with_space(mut self, space: CoordinateSpace) -> Self {
        self.space = space;
        self
    }

    /// Append a segment
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// A pattern without segments does nothing
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check authored values.
    ///
    /// `name` is only used to label the error.
    pub fn validate(&self, name: &str) -> Result<(), PatternError> {
        check_timing(name, None, "pre_delay", self.pre_delay)?;

        for (index, segment) in self.segments.iter().enumerate() {
            check_timing(name, Some(index), "duration", segment.duration)?;
            check_timing(name, Some(index), "speed", segment.speed)?;
            check_timing(name, Some(index), "post_wait", segment.post_wait)?;

            if !(segment.ease_power.is_finite() && segment.ease_power > 0.0) {
                return Err(PatternError::InvalidEasePower {
                    pattern: name.to_string(),
                    segment: index,
                    power: segment.ease_power,
                });
            }
            if !segment.start.is_finite() || !segment.end.is_finite() {
                return Err(PatternError::NonFinitePoint {
                    pattern: name.to_string(),
                    segment: index,
                });
            }
        }

        Ok(())
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new()
    }
}

fn check_timing(
    pattern: &str,
    segment: Option<usize>,
    field: &'static str,
    value: f32,
) -> Result<(), PatternError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PatternError::NegativeTiming {
            pattern: pattern.to_string(),
            segment,
            field,
            value,
        })
    }
}

/// Error loading or validating patterns
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// Failed to read a pattern file
    #[error("Failed to read pattern file: {0}")]
    Io(#[from] std::io::Error),

    /// RON syntax or shape error
    #[error("Failed to parse patterns: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Failed to write patterns back out
    #[error("Failed to serialize patterns: {0}")]
    Serialize(#[from] ron::Error),

    /// Ease power must be a positive finite number
    #[error("Pattern '{pattern}' segment {segment}: ease power {power} must be positive")]
    InvalidEasePower {
        /// Pattern name
        pattern: String,
        /// Segment index
        segment: usize,
        /// Offending power
        power: f32,
    },

    /// Durations, speeds and waits must be non-negative
    #[error("Pattern '{pattern}' {location}: {field} = {value} must be a non-negative number", location = segment_label(.segment))]
    NegativeTiming {
        /// Pattern name
        pattern: String,
        /// Segment index, or `None` for pattern-level fields
        segment: Option<usize>,
        /// Field name
        field: &'static str,
        /// Offending value
        value: f32,
    },

    /// Segment endpoints must be finite
    #[error("Pattern '{pattern}' segment {segment}: endpoint is not finite")]
    NonFinitePoint {
        /// Pattern name
        pattern: String,
        /// Segment index
        segment: usize,
    },

    /// Two patterns share a name
    #[error("Duplicate pattern name: {0}")]
    DuplicateName(String),
}

fn segment_label(segment: &Option<usize>) -> String {
    match segment {
        Some(index) => format!("segment {index}"),
        None => "header".to_string(),
    }
}

/// On-disk form of a pattern library: names in authoring order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PatternFile {
    patterns: Vec<(String, Pattern)>,
}

/// Named patterns in authoring order
#[derive(Debug, Clone, Default)]
pub struct PatternLibrary {
    patterns: IndexMap<String, Pattern>,
}

impl PatternLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern under a unique name
    pub fn insert(&mut self, name: impl Into<String>, pattern: Pattern) -> Result<(), PatternError> {
        let name = name.into();
        if self.patterns.contains_key(&name) {
            return Err(PatternError::DuplicateName(name));
        }
        self.patterns.insert(name, pattern);
        Ok(())
    }

    /// Remove a pattern, keeping the order of the rest
    pub fn remove(&mut self, name: &str) -> Option<Pattern> {
        self.patterns.shift_remove(name)
    }

    /// Get a pattern by name
    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    /// Iterate `(name, pattern)` in authoring order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Pattern)> {
        self.patterns.iter().map(|(name, pattern)| (name.as_str(), pattern))
    }

    /// Number of patterns
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the library holds no patterns
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Validate every pattern
    pub fn validate(&self) -> Result<(), PatternError> {
        for (name, pattern) in &self.patterns {
            pattern.validate(name)?;
        }
        Ok(())
    }

    /// All patterns in authoring order, shareable across sequencers
    pub fn all(&self) -> Arc<[Pattern]> {
        self.patterns.values().cloned().collect()
    }

    /// Patterns for the given names, in the given order.
    ///
    /// Unknown names are skipped.
    pub fn playlist<S: AsRef<str>>(&self, names: &[S]) -> Arc<[Pattern]> {
        names
            .iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let pattern = self.patterns.get(name);
                if pattern.is_none() {
                    tracing::warn!(pattern = name, "Unknown pattern in playlist, skipping");
                }
                pattern.cloned()
            })
            .collect()
    }

    /// Parse and validate a RON pattern library
    pub fn from_ron_str(source: &str) -> Result<Self, PatternError> {
        let file: PatternFile = ron::from_str(source)?;
        let mut library = Self::new();
        for (name, pattern) in file.patterns {
            library.insert(name, pattern)?;
        }
        library.validate()?;
        Ok(library)
    }

    /// Load a RON pattern library from disk
    pub fn load(path: &Path) -> Result<Self, PatternError> {
        let source = std::fs::read_to_string(path)?;
        let library = Self::from_ron_str(&source)?;
        tracing::info!(path = %path.display(), count = library.len(), "Loaded pattern library");
        Ok(library)
    }

    /// Serialize to pretty RON
    pub fn to_ron_string(&self) -> Result<String, PatternError> {
        let file = PatternFile {
            patterns: self
                .patterns
                .iter()
                .map(|(name, pattern)| (name.clone(), pattern.clone()))
                .collect(),
        };
        Ok(ron::ser::to_string_pretty(&file, ron::ser::PrettyConfig::default())?)
    }
}
