//! Best-possible state stage.
//!
//! For every managed resource, resolve the resource's configuration and state model, then
//! compute the target state of each of its partitions. Resources are independent of each other;
//! a resource which cannot be computed is reported and left out of the output, while all other
//! resources proceed.

use crate::error::{Error, Result};
use crate::models::{lookup_state_model, AssignmentMode, BestPossibleStateOutput, ClusterSnapshot, Resource, ResourceEntry};
use crate::placement::{compute_best_state, resolve_preference_list, LiveSet};
use crate::stages::{ClusterEvent, Stage};

/// A stage computing the best possible state of every managed resource.
#[derive(Clone, Copy, Debug, Default)]
pub struct BestPossibleStateStage;

impl Stage for BestPossibleStateStage {
    fn name(&self) -> &'static str {
        "best_possible_state"
    }

    #[tracing::instrument(level = "debug", skip(self, event), fields(event = %event.name))]
    fn process(&self, event: &mut ClusterEvent) -> Result<()> {
        let (snapshot, resources) = match (&event.snapshot, &event.resources) {
            (Some(snapshot), Some(resources)) => (snapshot, resources),
            _ => return Err(Error::MissingAttributes("SNAPSHOT|RESOURCES")),
        };
        let (output, errors) = compute_best_possible_state(snapshot, resources);
        event.best_possible_state = Some(output);
        event.resource_errors.extend(errors);
        Ok(())
    }
}

/// Compute the best possible state of the given resources.
///
/// Returns the computed output along with an error for each resource which was skipped.
pub fn compute_best_possible_state(snapshot: &ClusterSnapshot, resources: &[Resource]) -> (BestPossibleStateOutput, Vec<Error>) {
    let live = LiveSet::new(&snapshot.live_instances);
    if live.is_empty() {
        tracing::warn!("no live instances, only drops will be computed");
    }
    let (mut output, mut errors) = (BestPossibleStateOutput::default(), vec![]);
    for resource in resources {
        match compute_resource(snapshot, &live, resource) {
            Ok(resource_output) => output.merge(resource_output),
            Err(err) => {
                tracing::error!(resource = %resource.name, error = %err, "skipping resource for this pass");
                errors.push(err);
            }
        }
    }
    (output, errors)
}

/// Compute the target states of all partitions of one resource.
#[tracing::instrument(level = "debug", skip(snapshot, live, resource), fields(resource = %resource.name))]
fn compute_resource(snapshot: &ClusterSnapshot, live: &LiveSet<'_>, resource: &Resource) -> Result<BestPossibleStateOutput> {
    // The resource's configuration may be gone, in which case its state model must come from
    // what workers recorded when they took on its partitions.
    let entry = snapshot.resource_entry(&resource.name);
    if let ResourceEntry::Deleted { .. } = entry {
        tracing::info!(resource = %resource.name, "resource does not exist anymore, dropping its partitions");
    }
    let state_model = entry.state_model_ref().ok_or_else(|| Error::MissingStateModelRef {
        resource: resource.name.clone(),
    })?;
    let def = lookup_state_model(state_model, &snapshot.state_model_defs).ok_or_else(|| Error::UnknownStateModel {
        resource: resource.name.clone(),
        state_model: state_model.into(),
    })?;

    let mut output = BestPossibleStateOutput::default();
    for partition in resource.partitions.iter() {
        let current = snapshot.current_state.current_state_map(&resource.name, partition);
        let states = match (&entry, entry.mode()) {
            // Explicit overrides are passed through without any capacity or priority checks.
            (ResourceEntry::Present(config), AssignmentMode::Customized) => config.instance_state_map(partition).cloned().unwrap_or_default(),
            (ResourceEntry::Present(config), AssignmentMode::Auto) => {
                let candidates = resolve_preference_list(partition, config, &snapshot.live_instances);
                compute_best_state(&resource.name, partition, def, candidates.as_deref(), live, current)
            }
            (ResourceEntry::Deleted { .. }, _) => compute_best_state(&resource.name, partition, def, None, live, current),
        };
        output.set_state(&resource.name, partition, states);
    }
    Ok(output)
}
