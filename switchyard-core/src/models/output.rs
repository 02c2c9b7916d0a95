//! Best-possible state output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Target states by resource, then partition, then worker.
///
/// Ordered maps are used throughout so that identical inputs serialize identically.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BestPossibleStateOutput {
    resources: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
}

impl BestPossibleStateOutput {
    /// Record the target state map of a partition, replacing any prior map.
    pub fn set_state(&mut self, resource: &str, partition: &str, states: BTreeMap<String, String>) {
        self.resources.entry(resource.into()).or_default().insert(partition.into(), states);
    }

    /// The target state map of a partition.
    pub fn state_map(&self, resource: &str, partition: &str) -> Option<&BTreeMap<String, String>> {
        self.resources.get(resource).and_then(|partitions| partitions.get(partition))
    }

    /// The target state of a worker for a partition.
    pub fn state(&self, resource: &str, partition: &str, worker: &str) -> Option<&str> {
        self.state_map(resource, partition)
            .and_then(|states| states.get(worker))
            .map(String::as_str)
    }

    /// The target state maps of all partitions of a resource.
    pub fn resource(&self, resource: &str) -> Option<&BTreeMap<String, BTreeMap<String, String>>> {
        self.resources.get(resource)
    }

    /// Merge another output into this one.
    ///
    /// Each (resource, partition) key is expected to be written by exactly one side; should
    /// both sides hold the same key, the entry from `other` wins.
    pub fn merge(&mut self, other: BestPossibleStateOutput) {
        for (resource, partitions) in other.resources {
            self.resources.entry(resource).or_default().extend(partitions);
        }
    }

    /// Iterate over all resources of this output.
    pub fn resources(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, BTreeMap<String, String>>)> {
        self.resources.iter()
    }

    /// Check if this output holds no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
