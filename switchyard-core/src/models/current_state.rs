//! Current state, the states last reported by workers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The states reported for one resource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCurrentState {
    /// The state model workers recorded when they took on this resource's partitions.
    ///
    /// This survives deletion of the resource's configuration and is what allows a deleted
    /// resource to still be drained.
    #[serde(default)]
    pub state_model_def: Option<String>,
    /// Reported states by partition, then by worker.
    #[serde(default)]
    pub partitions: BTreeMap<String, BTreeMap<String, String>>,
}

/// The states last reported by workers across all resources.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct CurrentStateSnapshot {
    resources: BTreeMap<String, ResourceCurrentState>,
}

impl CurrentStateSnapshot {
    /// Record the state reported by a worker for a partition.
    pub fn set_state(&mut self, resource: &str, partition: &str, worker: &str, state: &str) {
        self.resources
            .entry(resource.into())
            .or_default()
            .partitions
            .entry(partition.into())
            .or_default()
            .insert(worker.into(), state.into());
    }

    /// Record the state model reported for a resource.
    pub fn set_state_model_def(&mut self, resource: &str, state_model: &str) {
        self.resources.entry(resource.into()).or_default().state_model_def = Some(state_model.into());
    }

    /// The worker to state map reported for a partition.
    pub fn current_state_map(&self, resource: &str, partition: &str) -> Option<&BTreeMap<String, String>> {
        self.resources.get(resource).and_then(|res| res.partitions.get(partition))
    }

    /// The state reported by a worker for a partition.
    pub fn state(&self, resource: &str, partition: &str, worker: &str) -> Option<&str> {
        self.current_state_map(resource, partition)
            .and_then(|states| states.get(worker))
            .map(String::as_str)
    }

    /// The state model recorded for a resource.
    pub fn state_model_def(&self, resource: &str) -> Option<&str> {
        self.resources.get(resource).and_then(|res| res.state_model_def.as_deref())
    }

    /// Iterate over all resources which have reported state.
    pub fn resources(&self) -> impl Iterator<Item = (&String, &ResourceCurrentState)> {
        self.resources.iter()
    }
}
