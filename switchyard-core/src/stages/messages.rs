use crate::error::{Error, Result};
use crate::models::{lookup_state_model, BestPossibleStateOutput, ClusterSnapshot, Message};
use crate::placement::LiveSet;
use crate::stages::{ClusterEvent, Stage};

/// A stage generating transition messages from the difference between target and current state.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageGenerationStage;

impl Stage for MessageGenerationStage {
    fn name(&self) -> &'static str {
        "message_generation"
    }

    #[tracing::instrument(level = "debug", skip(self, event), fields(event = %event.name))]
    fn process(&self, event: &mut ClusterEvent) -> Result<()> {
        let (snapshot, output) = match (&event.snapshot, &event.best_possible_state) {
            (Some(snapshot), Some(output)) => (snapshot, output),
            _ => return Err(Error::MissingAttributes("SNAPSHOT|BEST_POSSIBLE_STATE")),
        };
        let messages = generate_messages(snapshot, output);
        tracing::debug!(messages = messages.len(), "generated transition messages");
        event.messages = Some(messages);
        Ok(())
    }
}

/// Generate a message for every live worker whose target state differs from its current state.
///
/// A worker with no reported state is taken to be in its state model's initial state. Messages
/// are never addressed to workers which are not live, as they cannot act on them.
pub fn generate_messages(snapshot: &ClusterSnapshot, output: &BestPossibleStateOutput) -> Vec<Message> {
    let live = LiveSet::new(&snapshot.live_instances);
    let mut messages = vec![];
    for (resource, partitions) in output.resources() {
        let def = match snapshot
            .resource_entry(resource)
            .state_model_ref()
            .and_then(|name| lookup_state_model(name, &snapshot.state_model_defs))
        {
            Some(def) => def,
            None => {
                tracing::warn!(%resource, "no state model found for resource with target states, skipping");
                continue;
            }
        };
        for (partition, targets) in partitions {
            for (worker, target) in targets {
                let current = snapshot.current_state.state(resource, partition, worker);
                if current == Some(target.as_str()) {
                    continue;
                }
                if !live.contains(worker) {
                    tracing::debug!(%resource, %partition, %worker, "skipping transition for worker which is not live");
                    continue;
                }
                let from = current.unwrap_or_else(|| def.initial_state());
                messages.push(Message::new(worker, resource, partition, from, target, def.name()));
            }
        }
    }
    messages
}
