//! Controller stages.
//!
//! A stage reads the attributes it requires from a `ClusterEvent` and records its own outputs
//! on the same event. Stages are sequenced explicitly by their caller; a stage invoked without
//! its required attributes fails with `Error::MissingAttributes`, which aborts the pass.

mod best_possible;
#[cfg(test)]
mod best_possible_test;
mod messages;
mod resources;
mod task_assignment;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{BestPossibleStateOutput, ClusterSnapshot, Message, Resource};

pub use best_possible::{compute_best_possible_state, BestPossibleStateStage};
pub use messages::{generate_messages, MessageGenerationStage};
pub use resources::ResourceComputationStage;
pub use task_assignment::{MessageStore, TaskAssignmentStage};

/// A single stage of a controller pass.
pub trait Stage {
    /// The name of this stage, used for logging.
    fn name(&self) -> &'static str;

    /// Process the given event.
    fn process(&self, event: &mut ClusterEvent) -> Result<()>;
}

/// The attributes shared between the stages of one controller pass.
#[derive(Debug, Default)]
pub struct ClusterEvent {
    /// The name of the change which triggered this pass.
    pub name: String,
    /// The cluster snapshot this pass operates on.
    pub snapshot: Option<Arc<ClusterSnapshot>>,
    /// All managed resources.
    pub resources: Option<Vec<Resource>>,
    /// The computed target states.
    pub best_possible_state: Option<BestPossibleStateOutput>,
    /// Per-resource failures recorded during this pass.
    ///
    /// Resources listed here were excluded from the pass's outputs.
    pub resource_errors: Vec<Error>,
    /// The transition messages generated for this pass.
    pub messages: Option<Vec<Message>>,
}

impl ClusterEvent {
    /// Create a new event for the given snapshot.
    pub fn new(name: impl Into<String>, snapshot: Arc<ClusterSnapshot>) -> Self {
        Self {
            name: name.into(),
            snapshot: Some(snapshot),
            ..Default::default()
        }
    }
}
