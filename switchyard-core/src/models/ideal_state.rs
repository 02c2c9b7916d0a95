//! Ideal state, the declared configuration of a managed resource.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The preference list sentinel meaning "every live worker, in membership order".
pub const PREFERENCE_LIST_ALL_LIVE: &str = "";

/// The way the target state of a resource's partitions is determined.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssignmentMode {
    /// Target states are computed from preference lists and the state model.
    Auto,
    /// Target states are declared explicitly per partition and passed through as-is.
    Customized,
}

impl Default for AssignmentMode {
    fn default() -> Self {
        Self::Auto
    }
}

/// The declared configuration of a managed resource.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// The name of the resource.
    pub name: String,
    /// The name of the state model governing this resource's partitions.
    pub state_model_def_ref: String,
    /// How target states are determined.
    #[serde(default)]
    pub mode: AssignmentMode,
    /// The number of partitions, used only when no per-partition fields are declared.
    #[serde(default)]
    pub num_partitions: Option<u32>,
    /// Candidate workers per partition, in priority order.
    #[serde(default)]
    pub preference_lists: BTreeMap<String, Vec<String>>,
    /// Explicit worker to state maps per partition, used in `CUSTOMIZED` mode.
    #[serde(default)]
    pub instance_state_maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl ResourceConfig {
    /// The declared preference list of the given partition, if any.
    pub fn preference_list(&self, partition: &str) -> Option<&[String]> {
        self.preference_lists.get(partition).map(Vec::as_slice)
    }

    /// The explicit worker to state map of the given partition, if any.
    pub fn instance_state_map(&self, partition: &str) -> Option<&BTreeMap<String, String>> {
        self.instance_state_maps.get(partition)
    }

    /// All partitions named by this config.
    ///
    /// Partitions named in either per-partition field are included. When neither field names
    /// any partition, `num_partitions` partitions named `{resource}_{i}` are generated.
    pub fn partitions(&self) -> Vec<String> {
        let mut partitions: Vec<String> = self.preference_lists.keys().chain(self.instance_state_maps.keys()).cloned().collect();
        partitions.sort();
        partitions.dedup();
        if partitions.is_empty() {
            if let Some(count) = self.num_partitions {
                partitions = (0..count).map(|idx| format!("{}_{}", self.name, idx)).collect();
            }
        }
        partitions
    }
}

/// The configuration of a resource as seen by a single computation pass.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceEntry<'a> {
    /// The resource is declared.
    Present(&'a ResourceConfig),
    /// The resource's configuration is gone, but replicas may still be held by workers.
    ///
    /// The state model reference comes from the current state records, if one was recorded.
    Deleted { state_model_ref: Option<&'a str> },
}

impl<'a> ResourceEntry<'a> {
    /// The name of the state model governing the resource, if known.
    pub fn state_model_ref(&self) -> Option<&'a str> {
        match self {
            Self::Present(config) => Some(config.state_model_def_ref.as_str()),
            Self::Deleted { state_model_ref } => *state_model_ref,
        }
    }

    /// The assignment mode of the resource. Deleted resources are always drained in `AUTO` mode.
    pub fn mode(&self) -> AssignmentMode {
        match self {
            Self::Present(config) => config.mode,
            Self::Deleted { .. } => AssignmentMode::Auto,
        }
    }
}
