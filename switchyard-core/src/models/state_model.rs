//! State model definitions.
//!
//! A state model is an ordered list of states, highest priority first, along with a capacity
//! specifier per state bounding how many workers may hold that state for a single partition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CapacityError;

/// The state a worker is asked to move to when it holds a partition it no longer belongs to.
pub const STATE_DROPPED: &str = "DROPPED";
/// The reserved state reported by a worker whose replica has failed.
pub const STATE_ERROR: &str = "ERROR";
/// The initial state used when a state model does not declare one.
pub const STATE_OFFLINE: &str = "OFFLINE";
/// The capacity sentinel resolving to the size of the partition's candidate list.
pub const CAPACITY_REPLICA_COUNT: &str = "R";
/// The capacity sentinel resolving to the size of the live worker set.
pub const CAPACITY_ALL_LIVE: &str = "N";

/// A decoded capacity specifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateCapacity {
    /// An explicit upper bound.
    Exact(usize),
    /// Bounded by the number of candidates for the partition.
    ReplicaCount,
    /// Bounded by the number of live workers in the cluster.
    AllLive,
}

impl StateCapacity {
    /// Decode a capacity specifier from its record form.
    pub fn parse(value: &str) -> Result<Self, CapacityError> {
        match value.trim() {
            CAPACITY_REPLICA_COUNT => Ok(Self::ReplicaCount),
            CAPACITY_ALL_LIVE => Ok(Self::AllLive),
            val => val.parse().map(Self::Exact).map_err(|_| CapacityError::Invalid { value: value.into() }),
        }
    }

    /// Resolve this specifier into a concrete bound.
    ///
    /// `AllLive` uses the global live count, not the count of live candidates.
    pub fn resolve(&self, candidate_count: usize, live_count: usize) -> usize {
        match self {
            Self::Exact(count) => *count,
            Self::ReplicaCount => candidate_count,
            Self::AllLive => live_count,
        }
    }
}

/// Resolve the capacity of a state for one partition.
pub fn resolve_capacity(spec: &StateSpec, candidate_count: usize, live_count: usize) -> Result<usize, CapacityError> {
    spec.capacity
        .as_ref()
        .map(|capacity| capacity.resolve(candidate_count, live_count))
        .map_err(Clone::clone)
}

/// A state of a state model along with its decoded capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateSpec {
    /// The name of the state.
    pub name: String,
    /// The decoded capacity, or the reason it could not be decoded.
    ///
    /// Decode failures are retained rather than rejected so that a single bad specifier only
    /// disables its own state.
    pub capacity: Result<StateCapacity, CapacityError>,
}

/// The record form of a state model, as found in a cluster snapshot.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateModelRecord {
    /// The name of the state model.
    pub name: String,
    /// All states of the model, highest priority first.
    pub states: Vec<String>,
    /// Capacity specifiers by state name: an integer, `R` or `N`.
    #[serde(default)]
    pub counts: BTreeMap<String, String>,
    /// The state a worker holds before it has ever reported one.
    #[serde(default)]
    pub initial_state: Option<String>,
}

/// A state model with its capacity specifiers decoded.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "StateModelRecord", into = "StateModelRecord")]
pub struct StateModelDefinition {
    name: String,
    initial_state: String,
    states: Vec<StateSpec>,
}

impl StateModelDefinition {
    /// The name of this state model.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The state a worker is considered to hold when it has not reported any.
    pub fn initial_state(&self) -> &str {
        &self.initial_state
    }

    /// All states of this model in descending priority order.
    pub fn states(&self) -> &[StateSpec] {
        &self.states
    }

    /// Get the spec of the named state.
    pub fn state(&self, name: &str) -> Option<&StateSpec> {
        self.states.iter().find(|state| state.name == name)
    }
}

impl TryFrom<StateModelRecord> for StateModelDefinition {
    type Error = String;

    fn try_from(record: StateModelRecord) -> Result<Self, Self::Error> {
        if record.name.is_empty() {
            return Err("state model name may not be empty".into());
        }
        let mut states: Vec<StateSpec> = Vec::with_capacity(record.states.len());
        for name in record.states {
            if states.iter().any(|state| state.name == name) {
                return Err(format!("state '{}' is declared more than once in state model '{}'", name, record.name));
            }
            let capacity = match record.counts.get(&name) {
                Some(value) => StateCapacity::parse(value),
                None => Err(CapacityError::Missing),
            };
            states.push(StateSpec { name, capacity });
        }
        Ok(Self {
            name: record.name,
            initial_state: record.initial_state.unwrap_or_else(|| STATE_OFFLINE.into()),
            states,
        })
    }
}

impl From<StateModelDefinition> for StateModelRecord {
    fn from(def: StateModelDefinition) -> Self {
        let mut counts = BTreeMap::new();
        let mut states = Vec::with_capacity(def.states.len());
        for spec in def.states {
            let count = match spec.capacity {
                Ok(StateCapacity::Exact(count)) => Some(count.to_string()),
                Ok(StateCapacity::ReplicaCount) => Some(CAPACITY_REPLICA_COUNT.into()),
                Ok(StateCapacity::AllLive) => Some(CAPACITY_ALL_LIVE.into()),
                Err(CapacityError::Invalid { value }) => Some(value),
                Err(CapacityError::Missing) => None,
            };
            if let Some(count) = count {
                counts.insert(spec.name.clone(), count);
            }
            states.push(spec.name);
        }
        Self {
            name: def.name,
            states,
            counts,
            initial_state: Some(def.initial_state),
        }
    }
}

/// Look up a state model by name.
pub fn lookup_state_model<'a>(name: &str, defs: &'a [StateModelDefinition]) -> Option<&'a StateModelDefinition> {
    defs.iter().find(|def| def.name == name)
}
