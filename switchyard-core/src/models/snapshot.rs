//! Cluster snapshots.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CurrentStateSnapshot, ResourceConfig, ResourceEntry, StateModelDefinition};

/// An immutable view of the cluster, as assembled from the coordination medium.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    /// The names of all live workers, in membership order.
    pub live_instances: Vec<String>,
    /// The declared configuration of all resources.
    #[serde(default)]
    pub ideal_states: Vec<ResourceConfig>,
    /// All known state models.
    #[serde(default)]
    pub state_model_defs: Vec<StateModelDefinition>,
    /// The states last reported by workers.
    ///
    /// Required, even when no worker has reported anything.
    pub current_state: CurrentStateSnapshot,
}

impl ClusterSnapshot {
    /// Parse a snapshot from YAML (or JSON) text, validating its structure.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let snapshot: Self = serde_yaml::from_str(text).map_err(|err| Error::InvalidInput(format!("malformed cluster snapshot: {}", err)))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Validate that names which must be unique are unique.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = first_duplicate(self.live_instances.iter().map(String::as_str)) {
            return Err(Error::InvalidInput(format!("live instance '{}' is listed more than once", name)));
        }
        if let Some(name) = first_duplicate(self.ideal_states.iter().map(|config| config.name.as_str())) {
            return Err(Error::InvalidInput(format!("ideal state '{}' is declared more than once", name)));
        }
        if let Some(name) = first_duplicate(self.state_model_defs.iter().map(|def| def.name())) {
            return Err(Error::InvalidInput(format!("state model '{}' is declared more than once", name)));
        }
        Ok(())
    }

    /// The declared configuration of a resource, or its deleted form.
    pub fn resource_entry(&self, resource: &str) -> ResourceEntry<'_> {
        match self.ideal_states.iter().find(|config| config.name == resource) {
            Some(config) => ResourceEntry::Present(config),
            None => ResourceEntry::Deleted {
                state_model_ref: self.current_state.state_model_def(resource),
            },
        }
    }

    /// Compute the set of managed resources.
    ///
    /// Every declared resource is managed, along with every resource which workers still report
    /// state for, so that resources whose configuration has been deleted are drained.
    pub fn resources(&self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self
            .ideal_states
            .iter()
            .map(|config| Resource {
                name: config.name.clone(),
                partitions: config.partitions().into_iter().collect(),
            })
            .collect();
        for (name, current) in self.current_state.resources() {
            let idx = match resources.iter().position(|res| &res.name == name) {
                Some(idx) => idx,
                None => {
                    resources.push(Resource {
                        name: name.clone(),
                        partitions: Default::default(),
                    });
                    resources.len() - 1
                }
            };
            resources[idx].partitions.extend(current.partitions.keys().cloned());
        }
        resources.sort_by(|a, b| a.name.cmp(&b.name));
        resources
    }
}

/// A managed resource and all of its partitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    /// The name of the resource.
    pub name: String,
    /// The keys of all of the resource's partitions.
    pub partitions: BTreeSet<String>,
}

fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}
