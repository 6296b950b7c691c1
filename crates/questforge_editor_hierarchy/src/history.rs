// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history.
//!
//! A single linear transaction log of [`EditorCommand`]s. Recording a new
//! command discards everything that could have been redone.

use crate::commands::{CommandError, EditorCommand};
use crate::scene::SceneData;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// A command failed while being applied, undone or redone
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Serialized copy of a value, taken before an edit begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Serialized state
    pub data: Vec<u8>,
    /// Timestamp when snapshot was taken
    pub timestamp: u64,
    /// Size in bytes
    pub size: usize,
}

impl StateSnapshot {
    /// Create a new state snapshot
    pub fn new(data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            data,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            size,
        }
    }

    /// Create from serializable value
    pub fn from_value<T: Serialize>(value: &T) -> Result<Self> {
        let data = bincode::serialize(value)?;
        Ok(Self::new(data))
    }

    /// Deserialize to value
    pub fn to_value<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        Ok(bincode::deserialize(&self.data)?)
    }

    /// Check if this snapshot holds the same bytes as `value` would serialize to
    pub fn matches<T: Serialize>(&self, value: &T) -> Result<bool> {
        Ok(bincode::serialize(value)? == self.data)
    }
}

/// History statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    /// Total commands in undo stack
    pub undo_count: usize,
    /// Total commands in redo stack
    pub redo_count: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
pub struct History {
    /// Undo stack, oldest first
    undo_stack: VecDeque<Box<dyn EditorCommand>>,
    /// Redo stack, oldest first
    redo_stack: VecDeque<Box<dyn EditorCommand>>,
    /// Maximum history depth
    max_depth: usize,
}

impl History {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_depth(MAX_HISTORY)
    }

    /// Create with custom maximum depth
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Change the maximum depth, dropping the oldest entries if needed
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth.max(1);
        self.enforce_limit();
    }

    /// Apply a fresh command and record it
    pub fn execute(&mut self, mut command: Box<dyn EditorCommand>, scene: &mut SceneData) -> Result<()> {
        command.execute(scene)?;
        tracing::debug!("Executed '{}'", command.description());
        self.record(command);
        Ok(())
    }

    /// Record a command whose effect the caller has already applied
    pub fn push(&mut self, command: Box<dyn EditorCommand>) {
        tracing::debug!("Recorded '{}'", command.description());
        self.record(command);
    }

    fn record(&mut self, command: Box<dyn EditorCommand>) {
        if !self.redo_stack.is_empty() {
            tracing::debug!("Discarding {} redo entries", self.redo_stack.len());
            self.redo_stack.clear();
        }
        self.undo_stack.push_back(command);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        while self.undo_stack.len() > self.max_depth {
            if let Some(old) = self.undo_stack.pop_front() {
                tracing::debug!("History full, dropping '{}'", old.description());
            }
        }
    }

    /// Undo the last command, returning its description.
    ///
    /// A command that fails to undo has already rolled back its own partial
    /// work; it is dropped from the history and the error is returned.
    pub fn undo(&mut self, scene: &mut SceneData) -> Result<String> {
        let mut command = self
            .undo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToUndo)?;

        if let Err(e) = command.undo(scene) {
            tracing::error!("Undo of '{}' failed, discarding it: {e}", command.description());
            return Err(e.into());
        }

        let description = command.description().to_string();
        self.redo_stack.push_back(command);
        Ok(description)
    }

    /// Redo the last undone command, returning its description
    pub fn redo(&mut self, scene: &mut SceneData) -> Result<String> {
        let mut command = self
            .redo_stack
            .pop_back()
            .ok_or(HistoryError::NothingToRedo)?;

        if let Err(e) = command.execute(scene) {
            tracing::error!("Redo of '{}' failed, discarding it: {e}", command.description());
            return Err(e.into());
        }

        let description = command.description().to_string();
        self.undo_stack.push_back(command);
        Ok(description)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get undo stack depth
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get redo stack depth
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Get history statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            max_depth: self.max_depth,
        }
    }

    /// Get description of next undo command
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|c| c.description())
    }

    /// Get description of next redo command
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|c| c.description())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for History {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("undo", &self.undo_depth())
            .field("redo", &self.redo_depth())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
