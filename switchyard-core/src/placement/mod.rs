//! Best-possible state computation.
//!
//! For a single partition, target states are assigned greedily: states are visited in
//! descending priority and each state claims the earliest ranked candidates which are live, not
//! quarantined and not yet claimed, up to the state's capacity. A candidate is claimed by at
//! most one state. Identical inputs always produce identical assignments, which keeps the
//! control loop from oscillating between targets.

mod preference;

use std::collections::{BTreeMap, HashSet};

use crate::models::{resolve_capacity, StateModelDefinition, STATE_DROPPED, STATE_ERROR};

pub use preference::resolve_preference_list;

/// The set of live workers of a snapshot.
#[derive(Clone, Debug)]
pub struct LiveSet<'a> {
    members: HashSet<&'a str>,
}

impl<'a> LiveSet<'a> {
    /// Create a new instance.
    pub fn new(live_instances: &'a [String]) -> Self {
        Self {
            members: live_instances.iter().map(String::as_str).collect(),
        }
    }

    /// Check if the given worker is live.
    pub fn contains(&self, worker: &str) -> bool {
        self.members.contains(worker)
    }

    /// The number of live workers.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if there are no live workers.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Compute the target state map of one partition.
///
/// - Workers reporting state for the partition which are not candidates are sent to `DROPPED`.
///   With no candidates at all, only those `DROPPED` entries are returned.
/// - Workers reporting `ERROR` are quarantined and receive no new state.
/// - States whose capacity cannot be resolved are skipped, and the remaining states proceed.
/// - Candidates left unclaimed once every state has been visited receive no entry, leaving
///   whatever state they hold untouched.
#[tracing::instrument(level = "trace", skip(def, candidates, live, current))]
pub fn compute_best_state(
    resource: &str, partition: &str, def: &StateModelDefinition, candidates: Option<&[String]>, live: &LiveSet<'_>, current: Option<&BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut target = BTreeMap::new();

    // Drop replicas held by workers which are no longer candidates.
    if let Some(current) = current {
        for worker in current.keys() {
            let is_candidate = candidates.map(|list| list.contains(worker)).unwrap_or(false);
            if !is_candidate {
                target.insert(worker.clone(), STATE_DROPPED.to_string());
            }
        }
    }
    let candidates = match candidates {
        Some(candidates) => candidates,
        None => return target,
    };

    let mut assigned = vec![false; candidates.len()];
    for state in def.states() {
        let capacity = match resolve_capacity(state, candidates.len(), live.len()) {
            Ok(capacity) => capacity,
            Err(err) => {
                tracing::error!(resource, partition, state = %state.name, error = %err, "invalid capacity for state, skipping state");
                continue;
            }
        };

        let mut count = 0;
        for (idx, worker) in candidates.iter().enumerate() {
            if count >= capacity {
                break;
            }
            if assigned[idx] || !live.contains(worker) || is_quarantined(current, worker) {
                continue;
            }
            // A worker listed more than once is only ever claimed by its first entry.
            if target.contains_key(worker) {
                continue;
            }
            target.insert(worker.clone(), state.name.clone());
            assigned[idx] = true;
            count += 1;
        }
    }
    target
}

/// Check if the given worker last reported `ERROR` for the partition.
fn is_quarantined(current: Option<&BTreeMap<String, String>>, worker: &str) -> bool {
    current
        .and_then(|states| states.get(worker))
        .map(|state| state == STATE_ERROR)
        .unwrap_or(false)
}
