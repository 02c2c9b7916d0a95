//! State transition messages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An instruction for a worker to move a partition from one state to another.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// The unique ID of this message.
    ///
    /// Every instruction gets a fresh ID, even when it repeats an earlier transition.
    pub id: Uuid,
    /// The worker which is to perform the transition.
    pub tgt_name: String,
    /// The resource of the partition.
    pub resource: String,
    /// The partition to transition.
    pub partition: String,
    /// The state the worker is expected to be in.
    pub from_state: String,
    /// The state the worker is to move to.
    pub to_state: String,
    /// The state model governing the transition.
    pub state_model_def: String,
}

impl Message {
    /// Create a new transition message.
    pub fn new(tgt_name: &str, resource: &str, partition: &str, from_state: &str, to_state: &str, state_model_def: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            tgt_name: tgt_name.into(),
            resource: resource.into(),
            partition: partition.into(),
            from_state: from_state.into(),
            to_state: to_state.into(),
            state_model_def: state_model_def.into(),
        }
    }

    /// Check if both messages instruct the same worker to make the same transition, ignoring IDs.
    pub fn is_same_transition(&self, other: &Message) -> bool {
        self.tgt_name == other.tgt_name
            && self.resource == other.resource
            && self.partition == other.partition
            && self.from_state == other.from_state
            && self.to_state == other.to_state
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repeated_transitions_get_distinct_ids() {
        let m0 = Message::new("a", "db", "db_0", "OFFLINE", "SLAVE", "MasterSlave");
        let m1 = Message::new("a", "db", "db_0", "OFFLINE", "SLAVE", "MasterSlave");
        let m2 = Message::new("a", "db", "db_0", "SLAVE", "MASTER", "MasterSlave");

        assert_ne!(m0.id, m1.id, "expected each instruction to carry its own ID");
        assert!(m0.is_same_transition(&m1), "expected identical transitions to match");
        assert!(!m0.is_same_transition(&m2), "expected distinct transitions not to match");
    }
}
