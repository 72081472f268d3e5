// SPDX-License-Identifier: MIT OR Apache-2.0
//! The movable body a sequencer drives.

use crate::math::Point2;
use serde::{Deserialize, Serialize};

/// Position interface the sequencer reads and commands
pub trait Body {
    /// Current position
    fn position(&self) -> Point2;

    /// Authoritative placement (teleport)
    fn set_position(&mut self, position: Point2);

    /// Kinematic move, integrated by the host's physics step
    fn move_position(&mut self, position: Point2);
}

/// Kind of positional command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Instant placement
    Teleport,
    /// Kinematic move
    Move,
}

/// A positional command issued to a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyCommand {
    /// Command kind
    pub kind: CommandKind,
    /// Commanded position
    pub position: Point2,
}

/// Kinematic body that applies moves immediately and keeps a command log
#[derive(Debug, Clone, Default)]
pub struct KinematicBody {
    position: Point2,
    commands: Vec<BodyCommand>,
}

impl KinematicBody {
    /// Create a body at a position
    pub fn new(position: Point2) -> Self {
        Self {
            position,
            commands: Vec::new(),
        }
    }

    /// Commands issued since the last drain
    pub fn commands(&self) -> &[BodyCommand] {
        &self.commands
    }

    /// Take and clear the command log
    pub fn take_commands(&mut self) -> Vec<BodyCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of commands of a kind
    pub fn count(&self, kind: CommandKind) -> usize {
        self.commands.iter().filter(|c| c.kind == kind).count()
    }

    fn record(&mut self, kind: CommandKind, position: Point2) {
        self.position = position;
        self.commands.push(BodyCommand { kind, position });
    }
}

impl Body for KinematicBody {
    fn position(&self) -> Point2 {
        self.position
    }

    fn set_position(&mut self, position: Point2) {
        self.record(CommandKind::Teleport, position);
    }

    fn move_position(&mut self, position: Point2) {
        self.record(CommandKind::Move, position);
    }
}
